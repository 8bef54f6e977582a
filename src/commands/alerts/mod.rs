pub mod save_alert_command;
pub mod transition_alert_command;

pub use save_alert_command::SaveAlertCommand;
pub use transition_alert_command::TransitionAlertCommand;
