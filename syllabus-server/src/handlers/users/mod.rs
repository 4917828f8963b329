pub mod handle_users;
