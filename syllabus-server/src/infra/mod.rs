pub mod app_state;
pub mod cache;
pub mod cors;
pub mod errors;
pub mod extract;
pub mod response;
