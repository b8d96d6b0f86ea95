// src/utils/config.rs
//
// Run configuration. Read once per binary (env, then CLI overrides) and
// passed by reference into every pipeline.

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use log::info;
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use crate::utils::progress_bars::progress_config::ProgressConfig;

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_MIN_PHONE_VALID_PERCENT: f64 = 40.0;

/// Flags shared by every binary.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Compute and report everything without touching the database
    #[arg(long)]
    pub dry_run: bool,

    /// Rows per multi-row INSERT (overrides BATCH_SIZE)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Write run statistics as pretty JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
}

impl DbConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("POSTGRES_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_env("POSTGRES_PORT", 5432)?,
            dbname: env::var("POSTGRES_DB").unwrap_or_else(|_| "epsteinfiles_ard".to_string()),
            user: env::var("POSTGRES_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: env::var("POSTGRES_PASSWORD").unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaggerBackend {
    Lexicon,
    None,
}

impl FromStr for TaggerBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "lexicon" => Ok(TaggerBackend::Lexicon),
            "none" => Ok(TaggerBackend::None),
            other => Err(anyhow!("unknown name tagger '{}' (expected lexicon|none)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneBackend {
    LibPhoneNumber,
    None,
}

impl FromStr for PhoneBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "libphonenumber" => Ok(PhoneBackend::LibPhoneNumber),
            "none" => Ok(PhoneBackend::None),
            other => Err(anyhow!(
                "unknown phone backend '{}' (expected libphonenumber|none)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub db: DbConfig,
    pub batch_size: usize,
    pub dry_run: bool,
    pub name_tagger: TaggerBackend,
    pub phone_backend: PhoneBackend,
    pub min_phone_valid_percent: f64,
    pub report_path: Option<PathBuf>,
    pub progress: ProgressConfig,
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{}='{}' is invalid: {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            db: DbConfig::from_env().context("Invalid database configuration")?,
            batch_size: parse_env("BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            dry_run: false,
            name_tagger: parse_env("NAME_TAGGER", TaggerBackend::Lexicon)?,
            phone_backend: parse_env("PHONE_BACKEND", PhoneBackend::LibPhoneNumber)?,
            min_phone_valid_percent: parse_env(
                "MIN_PHONE_VALID_PERCENT",
                DEFAULT_MIN_PHONE_VALID_PERCENT,
            )?,
            report_path: None,
            progress: ProgressConfig::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Environment first, then command-line flags.
    pub fn load(args: &CliArgs) -> Result<Self> {
        Self::from_env()?.with_cli(args)
    }

    pub fn with_cli(mut self, args: &CliArgs) -> Result<Self> {
        self.dry_run = self.dry_run || args.dry_run;
        if let Some(batch_size) = args.batch_size {
            self.batch_size = batch_size;
        }
        if args.report.is_some() {
            self.report_path = args.report.clone();
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("Batch size must be at least 1");
        }
        if !(0.0..=100.0).contains(&self.min_phone_valid_percent) {
            bail!(
                "MIN_PHONE_VALID_PERCENT must be within 0..=100, got {}",
                self.min_phone_valid_percent
            );
        }
        Ok(())
    }

    pub fn log_config(&self) {
        info!("⚙️  Configuration:");
        info!("   • Database: {}@{}:{}/{}", self.db.user, self.db.host, self.db.port, self.db.dbname);
        info!("   • Batch size: {}", self.batch_size);
        info!("   • Dry run: {}", self.dry_run);
        info!("   • Name tagger: {:?}", self.name_tagger);
        info!("   • Phone backend: {:?}", self.phone_backend);
        info!("   • Phone validity warning below: {:.1}%", self.min_phone_valid_percent);
        if let Some(path) = &self.report_path {
            info!("   • Report: {}", path.display());
        }
    }
}

#[cfg(test)]
impl PipelineConfig {
    /// Defaults without reading the environment.
    pub fn for_tests() -> Self {
        Self {
            db: DbConfig {
                host: "127.0.0.1".to_string(),
                port: 5432,
                dbname: "epsteinfiles_ard".to_string(),
                user: "postgres".to_string(),
                password: String::new(),
            },
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: true,
            name_tagger: TaggerBackend::Lexicon,
            phone_backend: PhoneBackend::LibPhoneNumber,
            min_phone_valid_percent: DEFAULT_MIN_PHONE_VALID_PERCENT,
            report_path: None,
            progress: ProgressConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::with_env_vars;

    #[test]
    fn test_backend_names() {
        assert_eq!("Lexicon".parse::<TaggerBackend>().unwrap(), TaggerBackend::Lexicon);
        assert_eq!(" none ".parse::<TaggerBackend>().unwrap(), TaggerBackend::None);
        assert!("crf".parse::<TaggerBackend>().is_err());
        assert_eq!(
            "libphonenumber".parse::<PhoneBackend>().unwrap(),
            PhoneBackend::LibPhoneNumber
        );
        assert!("twilio".parse::<PhoneBackend>().is_err());
    }

    #[test]
    fn test_cli_overrides_env_values() {
        let base = PipelineConfig::for_tests();
        let args = CliArgs {
            dry_run: true,
            batch_size: Some(25),
            report: Some(PathBuf::from("/tmp/report.json")),
        };
        let config = base.with_cli(&args).unwrap();
        assert_eq!(config.batch_size, 25);
        assert!(config.dry_run);
        assert_eq!(config.report_path, Some(PathBuf::from("/tmp/report.json")));
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let args = CliArgs {
            batch_size: Some(0),
            ..Default::default()
        };
        assert!(PipelineConfig::for_tests().with_cli(&args).is_err());
    }

    #[test]
    fn test_env_parsing() {
        let config = with_env_vars(
            &[("MIN_PHONE_VALID_PERCENT", "55.5"), ("NAME_TAGGER", "none")],
            PipelineConfig::from_env,
        )
        .unwrap();
        assert_eq!(config.min_phone_valid_percent, 55.5);
        assert_eq!(config.name_tagger, TaggerBackend::None);

        let invalid = with_env_vars(
            &[("MIN_PHONE_VALID_PERCENT", "lots")],
            PipelineConfig::from_env,
        );
        assert!(invalid.is_err());
    }

    #[test]
    fn test_progress_settings_come_from_env() {
        let config = with_env_vars(&[("PROGRESS_ENABLED", "false")], PipelineConfig::from_env)
            .unwrap();
        assert!(!config.progress.enabled);
    }
}
