use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::badge::BadgeVariant;

/// Kind of incident an emergency alert tracks.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertType {
    #[sea_orm(string_value = "bed_shortage")]
    BedShortage,
    #[sea_orm(string_value = "equipment_failure")]
    EquipmentFailure,
    #[sea_orm(string_value = "staff_shortage")]
    StaffShortage,
    #[sea_orm(string_value = "patient_emergency")]
    PatientEmergency,
    #[sea_orm(string_value = "disaster")]
    Disaster,
}

impl AlertType {
    /// Human label shown next to the alert.
    pub fn label(&self) -> &'static str {
        match self {
            AlertType::BedShortage => "Bed Shortage",
            AlertType::EquipmentFailure => "Equipment Failure",
            AlertType::StaffShortage => "Staff Shortage",
            AlertType::PatientEmergency => "Patient Emergency",
            AlertType::Disaster => "Disaster",
        }
    }
}

impl Default for AlertType {
    fn default() -> Self {
        AlertType::PatientEmergency
    }
}

/// Lifecycle of an alert. Only moves forward.
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
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "acknowledged")]
    Acknowledged,
    #[sea_orm(string_value = "resolved")]
    Resolved,
}

/// Operator action on an alert.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertAction {
    Acknowledge,
    Resolve,
}

impl AlertAction {
    pub fn target(&self) -> AlertStatus {
        match self {
            AlertAction::Acknowledge => AlertStatus::Acknowledged,
            AlertAction::Resolve => AlertStatus::Resolved,
        }
    }
}

impl AlertStatus {
    pub fn can_transition_to(&self, next: AlertStatus) -> bool {
        matches!(
            (self, next),
            (AlertStatus::Active, AlertStatus::Acknowledged)
                | (AlertStatus::Active, AlertStatus::Resolved)
                | (AlertStatus::Acknowledged, AlertStatus::Resolved)
        )
    }

    /// Actions an operator may take from this status; empty once resolved.
    pub fn available_actions(&self) -> Vec<AlertAction> {
        match self {
            AlertStatus::Active => vec![AlertAction::Acknowledge, AlertAction::Resolve],
            AlertStatus::Acknowledged => vec![AlertAction::Resolve],
            AlertStatus::Resolved => Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertStatus::Resolved)
    }

    pub fn badge(&self) -> BadgeVariant {
        match self {
            AlertStatus::Active => BadgeVariant::Destructive,
            AlertStatus::Acknowledged => BadgeVariant::Secondary,
            AlertStatus::Resolved => BadgeVariant::Default,
        }
    }
}

impl Default for AlertStatus {
    fn default() -> Self {
        AlertStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use test_case::test_case;

    #[test_case(AlertStatus::Active, AlertStatus::Acknowledged, true)]
    #[test_case(AlertStatus::Active, AlertStatus::Resolved, true)]
    #[test_case(AlertStatus::Acknowledged, AlertStatus::Resolved, true)]
    #[test_case(AlertStatus::Acknowledged, AlertStatus::Active, false)]
    #[test_case(AlertStatus::Resolved, AlertStatus::Active, false)]
    #[test_case(AlertStatus::Resolved, AlertStatus::Acknowledged, false)]
    #[test_case(AlertStatus::Active, AlertStatus::Active, false)]
    #[test_case(AlertStatus::Resolved, AlertStatus::Resolved, false)]
    fn transitions_only_move_forward(from: AlertStatus, to: AlertStatus, allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn resolved_exposes_no_actions() {
        assert!(AlertStatus::Resolved.available_actions().is_empty());
        assert_eq!(
            AlertStatus::Active.available_actions(),
            vec![AlertAction::Acknowledge, AlertAction::Resolve]
        );
        for status in [AlertStatus::Active, AlertStatus::Acknowledged] {
            for action in status.available_actions() {
                assert!(status.can_transition_to(action.target()));
            }
        }
    }

    #[test]
    fn alert_type_wire_names() {
        assert_eq!(AlertType::BedShortage.to_string(), "bed_shortage");
        assert_eq!(
            AlertType::from_str("equipment_failure").unwrap(),
            AlertType::EquipmentFailure
        );
        assert_eq!(
            serde_json::to_value(AlertType::PatientEmergency).unwrap(),
            "patient_emergency"
        );
        assert_eq!(AlertType::StaffShortage.label(), "Staff Shortage");
    }
}
