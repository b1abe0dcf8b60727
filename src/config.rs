use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::hn_client::DEFAULT_ENDPOINT;
use crate::session::{SearchMode, SessionOptions, DEFAULT_TERM, SEARCH_KEY};

/// Search Hacker News stories from the terminal.
#[derive(Debug, Clone, Parser)]
#[command(name = "hacker_stories", version, about)]
pub struct Config {
    /// Search endpoint; the URL-encoded term is appended to it
    #[arg(long, env = "HACKER_STORIES_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// When to fetch and where to filter
    #[arg(long, env = "HACKER_STORIES_MODE", value_enum, default_value_t = SearchMode::RemoteNonEmpty)]
    pub mode: SearchMode,

    /// Settings database (defaults to ~/.hacker_stories/settings.db)
    #[arg(long, env = "HACKER_STORIES_DB")]
    pub db: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Search term used when nothing has been persisted yet
    #[arg(long, default_value = DEFAULT_TERM)]
    pub default_term: String,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            endpoint: self.endpoint.clone(),
            mode: self.mode,
            storage_key: SEARCH_KEY.to_string(),
            default_term: self.default_term.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        for var in ["HACKER_STORIES_ENDPOINT", "HACKER_STORIES_MODE", "HACKER_STORIES_DB"] {
            std::env::remove_var(var);
        }

        let config = Config::try_parse_from(["hacker_stories"]).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.mode, SearchMode::RemoteNonEmpty);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert!(config.db.is_none());

        let options = config.session_options();
        assert_eq!(options.storage_key, "Search");
        assert_eq!(options.default_term, "React");
    }

    #[test]
    fn parses_flags() {
        let config = Config::try_parse_from([
            "hacker_stories",
            "--mode",
            "local",
            "--endpoint",
            "http://localhost:9000/search?q=",
            "--db",
            "/tmp/settings.db",
            "--timeout-secs",
            "5",
            "-v",
        ])
        .unwrap();

        assert_eq!(config.mode, SearchMode::Local);
        assert_eq!(config.endpoint, "http://localhost:9000/search?q=");
        assert_eq!(config.db, Some(PathBuf::from("/tmp/settings.db")));
        assert_eq!(config.timeout_secs, 5);
        assert!(config.verbose);
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Config::try_parse_from(["hacker_stories", "--mode", "offline"]).is_err());
    }
}
