pub mod cases;
pub mod reports;
pub mod tasks;
pub mod workflows;
