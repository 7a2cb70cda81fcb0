//! Credential sources and session cookie persistence

pub mod cookies;
pub mod credentials;

pub use cookies::CookieStore;
pub use credentials::Credentials;
