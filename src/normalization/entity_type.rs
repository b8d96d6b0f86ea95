// src/normalization/entity_type.rs
use crate::models::normalized::EntityType;
use crate::models::raw::RawContactRecord;

/// The subset of a directory row the classifier looks at.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifierInput<'a> {
    pub name: &'a str,
    pub company_text: &'a str,
    pub first_name: &'a str,
    pub surname: &'a str,
}

impl<'a> ClassifierInput<'a> {
    pub fn from_record(record: &'a RawContactRecord) -> Self {
        Self {
            name: record.name.as_deref().unwrap_or(""),
            company_text: record.company_text.as_deref().unwrap_or(""),
            first_name: record.first_name.as_deref().unwrap_or(""),
            surname: record.surname.as_deref().unwrap_or(""),
        }
    }

    fn has_personal_name(&self) -> bool {
        !self.first_name.is_empty() || !self.surname.is_empty()
    }
}

/// True when a name field names more than one person (`A & B`, `A and B`).
pub fn has_multi_person_separator(name: &str) -> bool {
    name.contains(" & ") || name.to_lowercase().contains(" and ")
}

type ClassifierRule = fn(&ClassifierInput<'_>) -> bool;

fn is_organization(row: &ClassifierInput<'_>) -> bool {
    !row.company_text.is_empty() && !row.has_personal_name()
}

fn is_household(row: &ClassifierInput<'_>) -> bool {
    has_multi_person_separator(row.name)
}

fn is_individual(row: &ClassifierInput<'_>) -> bool {
    row.has_personal_name()
}

/// Ordered rule table; the first predicate that holds decides the type.
pub const ENTITY_RULES: &[(EntityType, ClassifierRule)] = &[
    (EntityType::Organization, is_organization),
    (EntityType::Household, is_household),
    (EntityType::Individual, is_individual),
];

pub fn classify_entity_type(input: &ClassifierInput<'_>) -> EntityType {
    ENTITY_RULES
        .iter()
        .find(|(_, rule)| rule(input))
        .map(|(entity_type, _)| *entity_type)
        .unwrap_or(EntityType::Unknown)
}
