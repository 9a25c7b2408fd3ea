//! Command-line and environment configuration.
//!
//! Every flag has an environment fallback; a `.env` file in the working
//! directory is loaded before parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::auth::Credentials;
use crate::validation;

// ==================== Server ====================

/// How long an idle session stays valid.
pub const SESSION_LIFETIME_HOURS: i64 = 24;

/// Upper bound on draining requests and background tasks at shutdown.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session";

// ==================== Mail ====================

pub const DEFAULT_CONTACT_RECIPIENT: &str = "Recipient <recipient@example.com>";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("--auth-email must be a valid email address")]
    AuthEmail,

    #[error("--auth-password-hash is not a valid argon2 PHC string: {0}")]
    PasswordHash(argon2::password_hash::Error),

    #[error("--send-email requires --{0}")]
    MissingSmtp(&'static str),
}

#[derive(Clone, Parser)]
#[command(name = "webstart", version, about = "Server-rendered web starter", long_about = None)]
pub struct Config {
    /// Interface to listen on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Development mode: panic traces in responses and debug logging
    #[arg(long, env = "DEV")]
    pub dev: bool,

    /// Email address allowed to sign in
    #[arg(long, env = "AUTH_EMAIL")]
    pub auth_email: String,

    /// Argon2id PHC hash of the password (see the hash-password binary)
    #[arg(long, env = "AUTH_PASSWORD_HASH", hide_env_values = true)]
    pub auth_password_hash: String,

    /// Deliver email over SMTP instead of logging it
    #[arg(long, env = "SEND_EMAIL")]
    pub send_email: bool,

    #[arg(long, env = "SMTP_HOST")]
    pub smtp_host: Option<String>,

    #[arg(long, env = "SMTP_PORT")]
    pub smtp_port: Option<u16>,

    #[arg(long, env = "SMTP_USERNAME")]
    pub smtp_username: Option<String>,

    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: Option<String>,

    /// Sender mailbox, e.g. `Site <noreply@example.com>`
    #[arg(long, env = "SMTP_FROM")]
    pub smtp_from: Option<String>,

    /// Mailbox receiving contact-form messages
    #[arg(long, env = "CONTACT_RECIPIENT", default_value = DEFAULT_CONTACT_RECIPIENT)]
    pub contact_recipient: String,

    /// Directory served under /static/
    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,
}

/// Resolved SMTP settings, present only when sending is enabled.
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl Config {
    /// `host:port` for display; IPv6 hosts are bracketed.
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        if !validation::is_email(&self.auth_email) {
            return Err(ConfigError::AuthEmail);
        }
        Credentials::new(&self.auth_email, &self.auth_password_hash)
            .map_err(ConfigError::PasswordHash)
    }

    /// `None` unless `--send-email` is set; then every SMTP flag is required.
    pub fn smtp(&self) -> Result<Option<SmtpSettings>, ConfigError> {
        if !self.send_email {
            return Ok(None);
        }

        fn required<T: Clone>(value: &Option<T>, flag: &'static str) -> Result<T, ConfigError> {
            value.clone().ok_or(ConfigError::MissingSmtp(flag))
        }

        Ok(Some(SmtpSettings {
            host: required(&self.smtp_host, "smtp-host")?,
            port: required(&self.smtp_port, "smtp-port")?,
            username: required(&self.smtp_username, "smtp-username")?,
            password: required(&self.smtp_password, "smtp-password")?,
            from: required(&self.smtp_from, "smtp-from")?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::cheap_hash;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Config, clap::Error> {
        let mut argv = vec!["webstart"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv)
    }

    fn default_of(id: &str) -> Vec<String> {
        Config::command()
            .get_arguments()
            .find(|arg| arg.get_id() == id)
            .map(|arg| {
                arg.get_default_values()
                    .iter()
                    .map(|v| v.to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_declared_defaults() {
        assert_eq!(default_of("host"), ["0.0.0.0"]);
        assert_eq!(default_of("port"), ["8000"]);
        assert_eq!(default_of("static_dir"), ["static"]);
        assert_eq!(default_of("contact_recipient"), [DEFAULT_CONTACT_RECIPIENT]);
    }

    #[test]
    fn test_defaults() {
        let hash = cheap_hash("password");
        let config = parse(&[
            "--auth-email",
            "admin@example.com",
            "--auth-password-hash",
            hash.as_str(),
        ])
        .unwrap();

        // HOST and PORT from the surrounding environment win over defaults
        if std::env::var_os("HOST").is_none() {
            assert_eq!(config.host, "0.0.0.0");
        }
        if std::env::var_os("PORT").is_none() {
            assert_eq!(config.port, 8000);
        }
        assert!(!config.send_email);
        assert_eq!(config.contact_recipient, DEFAULT_CONTACT_RECIPIENT);
        assert!(config.credentials().is_ok());
        assert!(config.smtp().unwrap().is_none());
    }

    #[test]
    fn test_address_formatting() {
        let hash = cheap_hash("password");
        let config = parse(&[
            "--auth-email",
            "admin@example.com",
            "--auth-password-hash",
            hash.as_str(),
            "--host",
            "0.0.0.0",
            "--port",
            "8000",
        ])
        .unwrap();
        assert_eq!(config.address(), "0.0.0.0:8000");
    }

    #[test]
    fn test_malformed_port_is_a_parse_error() {
        let result = parse(&[
            "--auth-email",
            "admin@example.com",
            "--auth-password-hash",
            "x",
            "--smtp-port",
            "abc",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_bad_hash() {
        let config = parse(&[
            "--auth-email",
            "admin@example.com",
            "--auth-password-hash",
            "plaintext",
        ])
        .unwrap();
        assert!(matches!(
            config.credentials(),
            Err(ConfigError::PasswordHash(_))
        ));
    }

    #[test]
    fn test_rejects_bad_auth_email() {
        let hash = cheap_hash("password");
        let config = parse(&["--auth-email", "admin", "--auth-password-hash", hash.as_str()]).unwrap();
        assert!(matches!(config.credentials(), Err(ConfigError::AuthEmail)));
    }

    #[test]
    fn test_send_email_requires_smtp_flags() {
        let config = parse(&[
            "--auth-email",
            "admin@example.com",
            "--auth-password-hash",
            "x",
            "--send-email",
            "--smtp-host",
            "smtp.example.com",
            "--smtp-port",
            "587",
        ])
        .unwrap();
        assert!(matches!(
            config.smtp(),
            Err(ConfigError::MissingSmtp("smtp-username"))
        ));
    }

    #[test]
    fn test_ipv6_address() {
        let config = parse(&[
            "--auth-email",
            "a@example.com",
            "--auth-password-hash",
            "x",
            "--host",
            "::1",
            "--port",
            "9000",
        ])
        .unwrap();
        assert_eq!(config.address(), "[::1]:9000");
    }
}
