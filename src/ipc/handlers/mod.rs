pub mod attendance;
pub mod core;
pub mod records;
pub mod settings;
pub mod students;
