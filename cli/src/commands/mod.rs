pub mod configuration;
pub mod session;
pub mod tickets;
pub mod work;
