use sea_orm::{EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    commands::{
        patients::{AdmissionOutcome, AdmitPatientCommand, UpdatePatientCommand},
        Command,
    },
    db::{DbPool, SearchBuilder},
    entities::patient,
    errors::ServiceError,
    events::EventSender,
};

/// Row count the intake form asks for when looking up an existing patient.
pub const INTAKE_LOOKUP_LIMIT: u64 = 5;

/// No cap unless the caller asks for one; an explicit zero still returns a row.
pub fn effective_limit(requested: Option<u64>) -> Option<u64> {
    requested.map(|limit| limit.max(1))
}

#[derive(Clone)]
pub struct PatientService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl PatientService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Case-insensitive lookup over name, business id and phone.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        term: Option<&str>,
        limit: Option<u64>,
    ) -> Result<Vec<patient::Model>, ServiceError> {
        let mut query = patient::Entity::find()
            .order_by_asc(patient::Column::Name)
            .limit(effective_limit(limit));
        if let Some(condition) = SearchBuilder::new(term)
            .column(patient::Column::Name)
            .column(patient::Column::PatientId)
            .column(patient::Column::Phone)
            .build()
        {
            query = query.filter(condition);
        }
        Ok(query.all(self.db_pool.as_ref()).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<patient::Model, ServiceError> {
        patient::Entity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Patient {} not found", id)))
    }

    #[instrument(skip(self, command))]
    pub async fn admit(&self, command: AdmitPatientCommand) -> Result<AdmissionOutcome, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self, command))]
    pub async fn update(&self, command: UpdatePatientCommand) -> Result<patient::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_db, test_events};
    use rstest::rstest;

    #[rstest]
    #[case(None, None)]
    #[case(Some(0), Some(1))]
    #[case(Some(INTAKE_LOOKUP_LIMIT), Some(5))]
    #[case(Some(500), Some(500))]
    fn limit_applies_only_when_asked(#[case] requested: Option<u64>, #[case] expected: Option<u64>) {
        assert_eq!(effective_limit(requested), expected);
    }

    #[tokio::test]
    async fn search_matches_name_id_or_phone() {
        let db = memory_db().await;
        let (events, _rx) = test_events();
        let service = PatientService::new(db, events);

        for (id, name, phone) in [
            ("PAT-100", "Ada Lovelace", "555-1000"),
            ("PAT-200", "Grace Hopper", "555-2000"),
            ("XYZ-300", "Alan Turing", "555-3000"),
        ] {
            service
                .admit(AdmitPatientCommand {
                    patient_id: Some(id.into()),
                    name: name.into(),
                    phone: Some(phone.into()),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let hits = service.search(Some("pat-"), None).await.unwrap();
        assert_eq!(hits.len(), 2);
        let hits = service.search(Some("HOPPER"), None).await.unwrap();
        assert_eq!(hits[0].patient_id, "PAT-200");
        let hits = service.search(Some("3000"), None).await.unwrap();
        assert_eq!(hits[0].name, "Alan Turing");
        assert_eq!(service.search(None, Some(2)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn search_returns_every_match_without_a_limit() {
        let db = memory_db().await;
        let (events, _rx) = test_events();
        let service = PatientService::new(db, events);

        for n in 0..8 {
            service
                .admit(AdmitPatientCommand {
                    patient_id: Some(format!("PAT-5{}", n)),
                    name: format!("Sam Garcia {}", n),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        assert_eq!(service.search(Some("garcia"), None).await.unwrap().len(), 8);
        assert_eq!(
            service
                .search(Some("garcia"), Some(INTAKE_LOOKUP_LIMIT))
                .await
                .unwrap()
                .len(),
            5
        );
    }
}
