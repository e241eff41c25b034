pub mod auth;
pub mod json_body;

pub use auth::RequireAdmin;
pub use json_body::JsonBody;
