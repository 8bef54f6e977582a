use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::facility::HospitalStatus;

/// Visual emphasis the console applies to a status chip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BadgeVariant {
    Default,
    Secondary,
    Destructive,
}

/// Badge for a hospital card.
///
/// Anything but `active` is destructive; otherwise occupancy of 90% or more is
/// destructive and 75% or more secondary. A hospital without capacity has no
/// occupancy and keeps the default badge.
pub fn hospital_badge(status: HospitalStatus, bed_capacity: i32, available_beds: i32) -> BadgeVariant {
    if status != HospitalStatus::Active {
        return BadgeVariant::Destructive;
    }
    match crate::services::analytics::occupancy_rate(bed_capacity, available_beds) {
        Some(rate) if rate >= 0.90 => BadgeVariant::Destructive,
        Some(rate) if rate >= 0.75 => BadgeVariant::Secondary,
        _ => BadgeVariant::Default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(HospitalStatus::Maintenance, 100, 90, BadgeVariant::Destructive)]
    #[case(HospitalStatus::Inactive, 0, 0, BadgeVariant::Destructive)]
    #[case(HospitalStatus::Active, 100, 10, BadgeVariant::Destructive)]
    #[case(HospitalStatus::Active, 100, 25, BadgeVariant::Secondary)]
    #[case(HospitalStatus::Active, 100, 26, BadgeVariant::Default)]
    #[case(HospitalStatus::Active, 0, 0, BadgeVariant::Default)]
    fn hospital_badges(
        #[case] status: HospitalStatus,
        #[case] capacity: i32,
        #[case] available: i32,
        #[case] expected: BadgeVariant,
    ) {
        assert_eq!(hospital_badge(status, capacity, available), expected);
    }
}
