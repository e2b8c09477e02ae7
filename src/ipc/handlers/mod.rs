pub mod core;
pub mod forms;
pub mod lessons;
pub mod setup;
pub mod students;
pub mod text;
