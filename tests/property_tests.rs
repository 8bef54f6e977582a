//! Property-based tests for the derived metrics and input normalisation.
//!
//! These run against the pure helpers, so each case is cheap and proptest can
//! explore far more inputs than the API tests do.

use chrono::{Duration, NaiveDate};
use edhms_api::{
    db::query_builder::escape_like,
    forms::{comma_list, TagListEditor},
    models::{hospital_badge, BadgeVariant, HospitalStatus},
    services::{
        analytics::{as_percent, daily_admissions, occupancy_rate},
        insights::strip_code_fences,
    },
};
use proptest::prelude::*;

fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..3650).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default() + Duration::days(offset)
    })
}

fn tag_strategy() -> impl Strategy<Value = String> {
    prop_oneof!["[A-Za-z]{1,12}", "\\s*", " [A-Za-z]{1,8} "]
}

// Property: occupancy is defined exactly when there is capacity
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn occupancy_stays_in_unit_range_for_consistent_rows(
        (capacity, available) in (1i32..10_000).prop_flat_map(|c| (Just(c), 0..=c))
    ) {
        let rate = occupancy_rate(capacity, available).expect("capacity is positive");
        prop_assert!((0.0..=1.0).contains(&rate));

        let percent = as_percent(Some(rate)).expect("rate present");
        prop_assert!((0.0..=100.0).contains(&percent));
        // One decimal place
        prop_assert!(((percent * 10.0).round() - percent * 10.0).abs() < 1e-6);
    }

    #[test]
    fn zero_capacity_has_no_occupancy(capacity in -100i32..=0, available in -100i32..100) {
        prop_assert_eq!(occupancy_rate(capacity, available), None);
        prop_assert_eq!(hospital_badge(HospitalStatus::Active, capacity, available), BadgeVariant::Default);
    }

    #[test]
    fn inactive_hospitals_are_always_destructive(capacity in 0i32..1000, available in 0i32..1000) {
        for status in [HospitalStatus::Inactive, HospitalStatus::Maintenance] {
            prop_assert_eq!(hospital_badge(status, capacity, available), BadgeVariant::Destructive);
        }
    }
}

// Property: daily admissions cover every day of the window exactly once
proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn daily_admissions_cover_the_window(
        start in date_strategy(),
        span in 0i64..120,
        visits in prop::collection::vec(0i64..200, 0..60),
    ) {
        let end = start + Duration::days(span);
        let dates: Vec<NaiveDate> = visits.iter().map(|d| start + Duration::days(*d)).collect();

        let days = daily_admissions(start, end, dates.iter().copied());

        prop_assert_eq!(days.len() as i64, span + 1);
        prop_assert_eq!(days.first().map(|d| d.date), Some(start));
        prop_assert_eq!(days.last().map(|d| d.date), Some(end));
        prop_assert!(days.windows(2).all(|w| w[1].date == w[0].date + Duration::days(1)));

        let inside = dates.iter().filter(|d| **d >= start && **d <= end).count();
        let counted: u32 = days.iter().map(|d| d.count).sum();
        prop_assert_eq!(counted as usize, inside);
    }
}

// Property: list inputs and tags never keep blanks or duplicates
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn comma_lists_are_trimmed_and_non_empty(text in "[a-z ,]{0,40}") {
        for item in comma_list(&text) {
            prop_assert!(!item.is_empty());
            prop_assert_eq!(item.trim(), item.as_str());
            prop_assert!(!item.contains(','));
        }
    }

    #[test]
    fn tag_editor_holds_unique_trimmed_values(values in prop::collection::vec(tag_strategy(), 0..20)) {
        let tags = TagListEditor::from_values(&values).into_vec();

        let mut seen = std::collections::HashSet::new();
        for tag in &tags {
            prop_assert!(!tag.is_empty());
            prop_assert_eq!(tag.trim(), tag.as_str());
            prop_assert!(seen.insert(tag.clone()), "duplicate tag {}", tag);
        }
        for value in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
            prop_assert!(tags.iter().any(|t| t == value));
        }
    }

    #[test]
    fn like_escaping_leaves_no_bare_wildcards(term in "[a-z%_\\\\]{0,20}") {
        let escaped = escape_like(&term);
        let mut chars = escaped.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                prop_assert!(chars.next().is_some(), "dangling escape in {}", escaped);
            } else {
                prop_assert!(c != '%' && c != '_', "bare wildcard in {}", escaped);
            }
        }
    }

    #[test]
    fn fence_stripping_recovers_the_payload(body in "\\{\"[a-z]{1,8}\": [0-9]{1,4}\\}") {
        let fenced = format!("```json\n{}\n```", body);
        prop_assert_eq!(strip_code_fences(&fenced), body.as_str());
        prop_assert_eq!(strip_code_fences(&body), body.as_str());
    }
}
