use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::badge::BadgeVariant;

/// Severity of an alert or a visit. Deliberately unordered.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "critical")]
    Critical,
}

impl Severity {
    pub fn badge(&self) -> BadgeVariant {
        match self {
            Severity::Critical | Severity::High => BadgeVariant::Destructive,
            Severity::Medium | Severity::Low => BadgeVariant::Secondary,
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Medium
    }
}

/// How the patient came to the hospital.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum VisitType {
    #[sea_orm(string_value = "emergency")]
    Emergency,
    #[sea_orm(string_value = "outpatient")]
    Outpatient,
    #[sea_orm(string_value = "inpatient")]
    Inpatient,
    #[sea_orm(string_value = "follow-up")]
    FollowUp,
}

impl Default for VisitType {
    fn default() -> Self {
        VisitType::Emergency
    }
}
