pub mod auth;
pub mod core;
pub mod status;
pub mod ticket;
pub mod user;
pub mod workflow;
