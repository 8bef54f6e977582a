use std::str::FromStr;

use crate::errors::ServiceError;

pub mod alerts;
pub mod analytics;
pub mod departments;
pub mod exports;
pub mod hospitals;
pub mod insights;
pub mod medical_records;
pub mod patients;
pub mod practitioners;
pub mod settings;

/// Parses an optional list filter. Blank or `all` means no filter.
pub fn parse_filter<T: FromStr>(field: &str, value: Option<&str>) -> Result<Option<T>, ServiceError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("all") => Ok(None),
        Some(v) => T::from_str(&v.to_lowercase())
            .map(Some)
            .map_err(|_| ServiceError::ValidationError(format!("Unknown {} filter: {}", field, v))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertStatus, Severity};
    use assert_matches::assert_matches;

    #[test]
    fn all_and_blank_mean_unfiltered() {
        assert_eq!(parse_filter::<AlertStatus>("status", Some("all")).unwrap(), None);
        assert_eq!(parse_filter::<AlertStatus>("status", Some(" ")).unwrap(), None);
        assert_eq!(parse_filter::<AlertStatus>("status", None).unwrap(), None);
    }

    #[test]
    fn parses_known_values_case_insensitively() {
        assert_eq!(
            parse_filter::<Severity>("severity", Some("Critical")).unwrap(),
            Some(Severity::Critical)
        );
        assert_matches!(
            parse_filter::<Severity>("severity", Some("urgent")),
            Err(ServiceError::ValidationError(_))
        );
    }
}
