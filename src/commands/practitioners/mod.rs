pub mod save_practitioner_command;
pub mod update_availability_command;

pub use save_practitioner_command::SavePractitionerCommand;
pub use update_availability_command::UpdateAvailabilityCommand;
