pub mod admin;

pub use admin::{AuthAdmin, ADMIN_TOKEN_HEADER};
