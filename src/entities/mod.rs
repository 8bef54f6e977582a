//! SeaORM entities for the six tables the console manages.

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

pub mod department;
pub mod emergency_alert;
pub mod hospital;
pub mod medical_record;
pub mod patient;
pub mod practitioner;

/// Set-like list of short strings stored as a JSON array column
/// (specialties, equipment, symptoms, allergies, chronic conditions).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct StringList(pub Vec<String>);

impl StringList {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for StringList {
    fn from(items: Vec<String>) -> Self {
        StringList(items)
    }
}
