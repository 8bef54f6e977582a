pub mod save_department_command;

pub use save_department_command::SaveDepartmentCommand;
