//! Derived metrics for the dashboard and the analytics screen.
//!
//! The aggregation functions are pure so they can be exercised without a
//! database; [`AnalyticsService`] only fetches rows and hands them over.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use tracing::instrument;
use utoipa::ToSchema;

use crate::{
    db::DbPool,
    entities::{emergency_alert, hospital, medical_record, patient},
    errors::ServiceError,
    models::{AlertStatus, AlertType, VisitType},
    services::alerts::{AlertService, AlertView},
};

const DASHBOARD_ALERT_LIMIT: u64 = 10;

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
pub enum TimeRange {
    #[serde(rename = "24h")]
    #[strum(serialize = "24h")]
    Day,
    #[default]
    #[serde(rename = "7d")]
    #[strum(serialize = "7d")]
    Week,
    #[serde(rename = "30d")]
    #[strum(serialize = "30d")]
    Month,
    #[serde(rename = "90d")]
    #[strum(serialize = "90d")]
    Quarter,
}

impl TimeRange {
    pub fn duration(&self) -> Duration {
        match self {
            TimeRange::Day => Duration::hours(24),
            TimeRange::Week => Duration::days(7),
            TimeRange::Month => Duration::days(30),
            TimeRange::Quarter => Duration::days(90),
        }
    }

    /// `[now - range, now]`
    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now - self.duration(), now)
    }
}

/// Fraction of capacity in use. `None` when there is no capacity; values
/// outside `[0, 1]` pass through for inconsistent rows.
pub fn occupancy_rate(bed_capacity: i32, available_beds: i32) -> Option<f64> {
    if bed_capacity <= 0 {
        return None;
    }
    let capacity = f64::from(bed_capacity);
    Some((capacity - f64::from(available_beds)) / capacity)
}

/// Rate as a percentage rounded to one decimal.
pub fn as_percent(rate: Option<f64>) -> Option<f64> {
    rate.map(|r| (r * 1000.0).round() / 10.0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DailyCount {
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub count: u32,
}

/// One zeroed entry per calendar day in `start..=end`, counting visits that
/// fall on each day. Visits outside the range are ignored.
pub fn daily_admissions<I>(start: NaiveDate, end: NaiveDate, visit_dates: I) -> Vec<DailyCount>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut days: BTreeMap<NaiveDate, u32> = start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|day| (day, 0))
        .collect();

    for date in visit_dates {
        if let Some(count) = days.get_mut(&date) {
            *count += 1;
        }
    }

    days.into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

pub fn alerts_by_type<'a, I>(alerts: I) -> BTreeMap<AlertType, u64>
where
    I: IntoIterator<Item = &'a emergency_alert::Model>,
{
    alerts.into_iter().fold(BTreeMap::new(), |mut acc, alert| {
        *acc.entry(alert.alert_type).or_insert(0) += 1;
        acc
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HospitalPerformance {
    pub id: uuid::Uuid,
    pub name: String,
    /// Percentage; `null` when the hospital has no capacity.
    pub occupancy_rate: Option<f64>,
    pub available_beds: i32,
    pub total_beds: i32,
    pub alert_count: u64,
}

pub fn hospital_performance(
    hospitals: &[hospital::Model],
    alerts: &[emergency_alert::Model],
) -> Vec<HospitalPerformance> {
    hospitals
        .iter()
        .map(|h| HospitalPerformance {
            id: h.id,
            name: h.name.clone(),
            occupancy_rate: as_percent(occupancy_rate(h.bed_capacity, h.available_beds)),
            available_beds: h.available_beds,
            total_beds: h.bed_capacity,
            alert_count: alerts.iter().filter(|a| a.hospital_id == h.id).count() as u64,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub total_patients: u64,
    pub total_hospitals: u64,
    pub total_beds: i64,
    pub available_beds: i64,
    /// Percentage across all hospitals; `null` without any capacity.
    pub bed_occupancy_rate: Option<f64>,
    pub active_alerts: u64,
    pub emergency_visits: u64,
    #[schema(value_type = Object)]
    pub alerts_by_type: BTreeMap<AlertType, u64>,
    pub daily_admissions: Vec<DailyCount>,
    pub hospital_performance: Vec<HospitalPerformance>,
}

/// Aggregates rows already restricted to the window `[start, end]`.
pub fn build_report(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    total_patients: u64,
    hospitals: &[hospital::Model],
    records: &[medical_record::Model],
    alerts: &[emergency_alert::Model],
) -> AnalyticsReport {
    let total_beds: i64 = hospitals.iter().map(|h| i64::from(h.bed_capacity)).sum();
    let available_beds: i64 = hospitals.iter().map(|h| i64::from(h.available_beds)).sum();
    let bed_occupancy_rate = if total_beds > 0 {
        as_percent(Some((total_beds - available_beds) as f64 / total_beds as f64))
    } else {
        None
    };

    AnalyticsReport {
        total_patients,
        total_hospitals: hospitals.len() as u64,
        total_beds,
        available_beds,
        bed_occupancy_rate,
        active_alerts: alerts
            .iter()
            .filter(|a| a.status == AlertStatus::Active)
            .count() as u64,
        emergency_visits: records
            .iter()
            .filter(|r| r.visit_type == VisitType::Emergency)
            .count() as u64,
        alerts_by_type: alerts_by_type(alerts),
        daily_admissions: daily_admissions(
            start.date_naive(),
            end.date_naive(),
            records.iter().map(|r| r.visit_date.date_naive()),
        ),
        hospital_performance: hospital_performance(hospitals, alerts),
    }
}

/// Downloadable analytics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsExport {
    pub generated_at: DateTime<Utc>,
    pub time_range: TimeRange,
    pub metrics: AnalyticsReport,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_hospitals: u64,
    pub total_patients: u64,
    pub available_beds: i64,
    pub active_alerts: Vec<AlertView>,
    #[schema(value_type = Vec<Object>)]
    pub hospitals: Vec<hospital::Model>,
}

#[derive(Clone)]
pub struct AnalyticsService {
    db_pool: Arc<DbPool>,
    alerts: AlertService,
}

impl AnalyticsService {
    pub fn new(db_pool: Arc<DbPool>, alerts: AlertService) -> Self {
        Self { db_pool, alerts }
    }

    #[instrument(skip(self))]
    pub async fn report(&self, range: TimeRange) -> Result<AnalyticsReport, ServiceError> {
        let db = self.db_pool.as_ref();
        let (start, end) = range.window(Utc::now());

        let hospitals = hospital::Entity::find()
            .order_by_asc(hospital::Column::Name)
            .all(db)
            .await?;
        let total_patients = patient::Entity::find().count(db).await?;
        let records = medical_record::Entity::find()
            .filter(medical_record::Column::VisitDate.between(start, end))
            .all(db)
            .await?;
        let alerts = emergency_alert::Entity::find()
            .filter(emergency_alert::Column::CreatedAt.between(start, end))
            .all(db)
            .await?;

        Ok(build_report(start, end, total_patients, &hospitals, &records, &alerts))
    }

    pub async fn export(&self, range: TimeRange) -> Result<AnalyticsExport, ServiceError> {
        Ok(AnalyticsExport {
            generated_at: Utc::now(),
            time_range: range,
            metrics: self.report(range).await?,
        })
    }

    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<DashboardSummary, ServiceError> {
        let db = self.db_pool.as_ref();
        let hospitals = hospital::Entity::find()
            .order_by_asc(hospital::Column::Name)
            .all(db)
            .await?;
        let total_patients = patient::Entity::find().count(db).await?;
        let active_alerts = self.alerts.latest_active(DASHBOARD_ALERT_LIMIT).await?;

        Ok(DashboardSummary {
            total_hospitals: hospitals.len() as u64,
            total_patients,
            available_beds: hospitals.iter().map(|h| i64::from(h.available_beds)).sum(),
            active_alerts,
            hospitals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{entities::StringList, models::{HospitalStatus, Severity}};
    use proptest::prelude::*;
    use std::str::FromStr;
    use uuid::Uuid;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn hospital(capacity: i32, available: i32) -> hospital::Model {
        let now = Utc::now();
        hospital::Model {
            id: Uuid::new_v4(),
            name: format!("H{}", capacity),
            address: "addr".into(),
            phone: "555".into(),
            email: None,
            emergency_contact: "911".into(),
            bed_capacity: capacity,
            available_beds: available,
            specialties: StringList::default(),
            status: HospitalStatus::Active,
            latitude: None,
            longitude: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn alert(hospital_id: Uuid, alert_type: AlertType, status: AlertStatus) -> emergency_alert::Model {
        let now = Utc::now();
        emergency_alert::Model {
            id: Uuid::new_v4(),
            hospital_id,
            patient_id: None,
            alert_type,
            severity: Severity::High,
            title: "t".into(),
            description: "d".into(),
            status,
            created_by: None,
            resolved_by: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn occupancy_undefined_without_capacity() {
        assert_eq!(occupancy_rate(0, 0), None);
        assert_eq!(occupancy_rate(-5, 3), None);
        assert_eq!(occupancy_rate(100, 25), Some(0.75));
        // Inconsistent rows stay representable.
        assert_eq!(occupancy_rate(10, 20), Some(-1.0));
        assert_eq!(as_percent(Some(2.0 / 3.0)), Some(66.7));
        assert_eq!(as_percent(None), None);
    }

    #[test]
    fn three_day_window_with_one_visit() {
        let counts = daily_admissions(day(1), day(3), [day(2)]);
        assert_eq!(counts.iter().map(|c| c.count).collect::<Vec<_>>(), [0, 1, 0]);
        assert_eq!(counts[0].date, day(1));
        assert_eq!(counts[2].date, day(3));
    }

    #[test]
    fn visits_outside_window_are_ignored() {
        let counts = daily_admissions(day(5), day(6), [day(4), day(5), day(5), day(7)]);
        assert_eq!(counts.iter().map(|c| c.count).collect::<Vec<_>>(), [2, 0]);
        assert!(daily_admissions(day(6), day(5), [day(5)]).is_empty());
    }

    #[test]
    fn report_aggregates_rows() {
        let a = hospital(100, 10);
        let b = hospital(0, 0);
        let alerts = vec![
            alert(a.id, AlertType::BedShortage, AlertStatus::Active),
            alert(a.id, AlertType::BedShortage, AlertStatus::Resolved),
            alert(b.id, AlertType::Disaster, AlertStatus::Active),
        ];
        let end = Utc::now();
        let start = end - Duration::days(2);

        let report = build_report(start, end, 7, &[a.clone(), b.clone()], &[], &alerts);

        assert_eq!(report.total_patients, 7);
        assert_eq!(report.total_beds, 100);
        assert_eq!(report.available_beds, 10);
        assert_eq!(report.bed_occupancy_rate, Some(90.0));
        assert_eq!(report.active_alerts, 2);
        assert_eq!(report.alerts_by_type[&AlertType::BedShortage], 2);
        assert_eq!(report.alerts_by_type[&AlertType::Disaster], 1);
        assert_eq!(report.daily_admissions.len(), 3);

        let perf_b = report
            .hospital_performance
            .iter()
            .find(|p| p.id == b.id)
            .unwrap();
        assert_eq!(perf_b.occupancy_rate, None);
        assert_eq!(perf_b.alert_count, 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["alertsByType"]["bed_shortage"], 2);
        assert!(json["bedOccupancyRate"].is_number());
    }

    #[test]
    fn time_range_wire_names() {
        assert_eq!(TimeRange::from_str("24h").unwrap(), TimeRange::Day);
        assert_eq!(TimeRange::Quarter.to_string(), "90d");
        assert_eq!(TimeRange::default(), TimeRange::Week);
        assert_eq!(serde_json::to_value(TimeRange::Month).unwrap(), "30d");
        let now = Utc::now();
        assert_eq!(TimeRange::Week.window(now).0, now - Duration::days(7));
    }

    proptest! {
        #[test]
        fn occupancy_in_unit_interval_when_consistent(capacity in 1i32..10_000, used in 0i32..10_000) {
            let available = capacity - used.min(capacity);
            let rate = occupancy_rate(capacity, available).unwrap();
            prop_assert!((0.0..=1.0).contains(&rate));
        }

        #[test]
        fn occupancy_never_nan(capacity in any::<i32>(), available in any::<i32>()) {
            if let Some(rate) = occupancy_rate(capacity, available) {
                prop_assert!(rate.is_finite());
            }
        }

        #[test]
        fn one_entry_per_day(len in 0i64..120, offsets in proptest::collection::vec(0i64..200, 0..50)) {
            let start = day(1);
            let end = start + Duration::days(len);
            let visits: Vec<NaiveDate> = offsets.iter().map(|o| start + Duration::days(*o)).collect();
            let counts = daily_admissions(start, end, visits.iter().copied());
            prop_assert_eq!(counts.len() as i64, len + 1);
            let inside = offsets.iter().filter(|o| **o <= len).count() as u32;
            prop_assert_eq!(counts.iter().map(|c| c.count).sum::<u32>(), inside);
        }
    }
}
