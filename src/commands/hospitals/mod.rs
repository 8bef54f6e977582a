pub mod delete_hospital_command;
pub mod save_hospital_command;

pub use delete_hospital_command::DeleteHospitalCommand;
pub use save_hospital_command::SaveHospitalCommand;
