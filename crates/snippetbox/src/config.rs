use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use snippetbox_http::codec::DEFAULT_MAX_BODY_SIZE;
use snippetbox_web::session::SessionConfig;

/// A small site for sharing text snippets.
#[derive(Parser, Debug)]
#[command(name = "snippetbox", version, about, long_about = None)]
pub struct Config {
    /// HTTP network address
    #[arg(long, env = "SNIPPETBOX_ADDR", default_value = "0.0.0.0:4000")]
    pub addr: String,

    /// Directory served under /static/
    #[arg(long, env = "SNIPPETBOX_STATIC_DIR", default_value = "./ui/static")]
    pub static_dir: PathBuf,

    /// Idle lifetime of a session
    #[arg(long, env = "SNIPPETBOX_SESSION_LIFETIME_SECS", default_value_t = 12 * 60 * 60)]
    pub session_lifetime_secs: u64,

    /// Send session cookies without the Secure attribute, for plain HTTP
    #[arg(long, env = "SNIPPETBOX_INSECURE_COOKIES")]
    pub insecure_cookies: bool,

    /// Largest request body accepted
    #[arg(long, env = "SNIPPETBOX_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_SIZE)]
    pub max_body_bytes: u64,

    /// How long shutdown waits for open connections
    #[arg(long, env = "SNIPPETBOX_DRAIN_TIMEOUT_SECS", default_value_t = 10)]
    pub drain_timeout_secs: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "SNIPPETBOX_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            lifetime: Duration::from_secs(self.session_lifetime_secs),
            secure: !self.insecure_cookies,
            ..SessionConfig::default()
        }
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["snippetbox"]).unwrap();

        assert_eq!(config.addr, "0.0.0.0:4000");
        assert_eq!(config.static_dir, PathBuf::from("./ui/static"));
        assert_eq!(config.max_body_bytes, 1024 * 1024);

        let session = config.session_config();
        assert_eq!(session.cookie_name, "session");
        assert_eq!(session.lifetime, Duration::from_secs(43_200));
        assert!(session.secure);
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "snippetbox",
            "--addr",
            "127.0.0.1:8080",
            "--insecure-cookies",
            "--session-lifetime-secs",
            "60",
            "--drain-timeout-secs",
            "2",
        ])
        .unwrap();

        assert_eq!(config.addr, "127.0.0.1:8080");
        assert!(!config.session_config().secure);
        assert_eq!(config.session_config().lifetime, Duration::from_secs(60));
        assert_eq!(config.drain_timeout(), Duration::from_secs(2));
    }
}
