pub mod catalog;
pub mod geo;
pub mod handle_health;
pub mod users;
