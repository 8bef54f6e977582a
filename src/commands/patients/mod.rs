pub mod admit_patient_command;
pub mod update_patient_command;

pub use admit_patient_command::{AdmissionOutcome, AdmitPatientCommand};
pub use update_patient_command::UpdatePatientCommand;
