pub mod auth;
pub mod config;
pub mod csrf;
pub mod error;
pub mod filters;
pub mod flash;
pub mod handlers;
pub mod mail;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod tasks;
pub mod validation;
pub mod version;
pub mod view;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
