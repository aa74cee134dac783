pub mod catalog;
pub mod error;
pub mod layout;
pub mod native;
pub mod report;
pub mod target;
pub mod types;
