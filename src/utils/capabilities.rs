// src/utils/capabilities.rs
//
// Optional external capabilities, chosen once from configuration. Call sites
// receive trait objects and never check availability themselves.

use log::info;
use std::sync::Arc;

use crate::identity::tagger::{LexiconTagger, NameTagger, UnavailableTagger};
use crate::normalization::phone::{LibPhoneNumber, NoPhoneParser, PhoneParser};
use crate::utils::config::{PhoneBackend, PipelineConfig, TaggerBackend};

#[derive(Clone)]
pub struct Capabilities {
    pub phone: Arc<dyn PhoneParser>,
    pub tagger: Arc<dyn NameTagger>,
}

impl Default for Capabilities {
    /// Fallback-only: every phone is invalid, every name uses the fallback chain.
    fn default() -> Self {
        Self {
            phone: Arc::new(NoPhoneParser),
            tagger: Arc::new(UnavailableTagger),
        }
    }
}

impl Capabilities {
    pub fn from_config(config: &PipelineConfig) -> Self {
        let phone: Arc<dyn PhoneParser> = match config.phone_backend {
            PhoneBackend::LibPhoneNumber => Arc::new(LibPhoneNumber),
            PhoneBackend::None => Arc::new(NoPhoneParser),
        };
        let tagger: Arc<dyn NameTagger> = match config.name_tagger {
            TaggerBackend::Lexicon => Arc::new(LexiconTagger),
            TaggerBackend::None => Arc::new(UnavailableTagger),
        };
        Self { phone, tagger }
    }

    pub fn log_capabilities(&self) {
        info!("🧩 Phone parser: {}", self.phone.backend());
        info!("🧩 Name tagger: {}", self.tagger.backend());
    }
}
