pub mod assignment;
pub mod generator;
pub mod history;
pub mod progress;
