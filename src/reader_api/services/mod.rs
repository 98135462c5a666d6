pub mod health;
pub mod library;
pub mod session;
