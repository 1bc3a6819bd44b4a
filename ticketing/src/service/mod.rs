pub mod cache_service;
pub mod dashboard;
pub mod problem_log;
pub mod session_service;
pub mod ticket_service;
pub mod timer_service;
