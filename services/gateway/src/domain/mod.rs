pub mod code;
pub mod repository;
pub mod types;
