//! Credential checks, session login and the auth gates.

pub mod credentials;
pub mod handlers;
pub mod middleware;
pub mod password;

pub use credentials::Credentials;
pub use middleware::{
    authenticate, basic_auth, is_authenticated, require_login, with_authenticated,
    AUTHENTICATED_KEY,
};
