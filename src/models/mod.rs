//! Enumerated column types and the status-to-badge mapping shared by views.

pub mod alert;
pub mod badge;
pub mod clinical;
pub mod facility;

pub use alert::{AlertAction, AlertStatus, AlertType};
pub use badge::{hospital_badge, BadgeVariant};
pub use clinical::{Severity, VisitType};
pub use facility::HospitalStatus;
