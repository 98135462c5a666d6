pub mod catalog;
pub mod mapping;
pub mod models;
