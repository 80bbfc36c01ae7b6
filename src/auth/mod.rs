pub mod handlers;
pub mod notify;
pub mod password;
pub mod session;
pub mod tokens;
