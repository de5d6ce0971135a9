//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::middleware::CsrfConfig;
use crate::session::SessionConfig;

/// Server-rendered snippet sharing.
#[derive(Clone, Debug, Parser)]
#[command(name = "snipbox", about = "Server-rendered snippet sharing", long_about = None)]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "SNIPBOX_ADDR", default_value = "0.0.0.0:4000")]
    pub addr: SocketAddr,

    /// Put error detail and traces in 500 responses.
    #[arg(long, env = "SNIPBOX_DEBUG")]
    pub debug: bool,

    /// Directory holding `base.html`, `partials/` and `pages/`.
    #[arg(long, env = "SNIPBOX_TEMPLATES", default_value = "ui/html")]
    pub templates: PathBuf,

    /// Absolute session lifetime.
    #[arg(long, env = "SNIPBOX_SESSION_LIFETIME_HOURS", default_value_t = 12)]
    pub session_lifetime_hours: i64,

    /// Sliding inactivity timeout; unset keeps only the absolute lifetime.
    #[arg(long, env = "SNIPBOX_SESSION_IDLE_MINUTES")]
    pub session_idle_minutes: Option<i64>,

    /// Drop the `Secure` cookie attribute, for plain-HTTP local development.
    #[arg(long, env = "SNIPBOX_INSECURE_COOKIES")]
    pub insecure_cookies: bool,
}

impl Config {
    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            lifetime: chrono::Duration::hours(self.session_lifetime_hours),
            idle_timeout: self.session_idle_minutes.map(chrono::Duration::minutes),
            secure: !self.insecure_cookies,
            ..SessionConfig::default()
        }
    }

    pub fn csrf(&self) -> CsrfConfig {
        CsrfConfig {
            secure: !self.insecure_cookies,
            ..CsrfConfig::default()
        }
    }
}
