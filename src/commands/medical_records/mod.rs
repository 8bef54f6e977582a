pub mod create_medical_record_command;
pub mod discharge_medical_record_command;

pub use create_medical_record_command::CreateMedicalRecordCommand;
pub use discharge_medical_record_command::DischargeMedicalRecordCommand;
