//! Fixtures shared by unit tests.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::{
    db::{self, DbConfig, DbPool},
    events::{Event, EventSender},
};

/// Migrated in-memory SQLite pool. One connection, otherwise every
/// connection would see its own empty database.
pub async fn memory_db() -> Arc<DbPool> {
    let pool = db::establish_connection_with_config(&DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    })
    .await
    .expect("in-memory sqlite");
    db::run_migrations(&pool).await.expect("migrations");
    Arc::new(pool)
}

pub fn test_events() -> (Arc<EventSender>, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(64);
    (Arc::new(EventSender::new(tx)), rx)
}
