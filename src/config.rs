use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime settings. A `.env` file, then the environment, then command line flags on top.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: String,
    pub token: Option<String>,
    /// `EnvFilter` directive for the log file.
    pub log_filter: String,
    pub log_dir: Option<PathBuf>,
    pub autosave_debounce: Duration,
    /// How long a committed field ignores upstream echoes.
    pub grace_window: Duration,
    pub essay_debounce: Duration,
    pub poll_every_secs: u64,
    pub request_timeout: Duration,
    pub audio_countdown_secs: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8000/api".to_string(),
            token: None,
            log_filter: "info".to_string(),
            log_dir: None,
            autosave_debounce: Duration::from_millis(800),
            grace_window: Duration::from_millis(2000),
            essay_debounce: Duration::from_secs(3),
            poll_every_secs: 15,
            request_timeout: Duration::from_secs(20),
            audio_countdown_secs: 5,
        }
    }
}

impl Config {
    /// Reads `.env` from the working directory when there is one. Variables
    /// already set in the environment win.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    pub fn load_from(path: &Path) -> Self {
        dotenvy::from_path(path).ok();
        Self::from_env()
    }

    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            api_url: std::env::var("IELTSROOM_API_URL").unwrap_or(default.api_url),
            token: std::env::var("IELTSROOM_TOKEN").ok().filter(|t| !t.is_empty()),
            log_filter: std::env::var("IELTSROOM_LOG").unwrap_or(default.log_filter),
            log_dir: default.log_dir,
            autosave_debounce: env_parse::<u64>("IELTSROOM_AUTOSAVE_MS")
                .map(Duration::from_millis)
                .unwrap_or(default.autosave_debounce),
            grace_window: env_parse::<u64>("IELTSROOM_GRACE_MS")
                .map(Duration::from_millis)
                .unwrap_or(default.grace_window),
            essay_debounce: default.essay_debounce,
            poll_every_secs: env_parse("IELTSROOM_POLL_SECS")
                .filter(|s| *s > 0)
                .unwrap_or(default.poll_every_secs),
            request_timeout: env_parse::<u64>("IELTSROOM_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(default.request_timeout),
            audio_countdown_secs: env_parse("IELTSROOM_AUDIO_COUNTDOWN_SECS")
                .unwrap_or(default.audio_countdown_secs),
        }
    }

    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_env_file_is_read() {
        let path = std::env::temp_dir().join(format!("ieltsroom-{}.env", std::process::id()));
        fs::write(&path, "IELTSROOM_AUDIO_COUNTDOWN_SECS=9\nIELTSROOM_POLL_SECS=0\n").unwrap();

        let config = Config::load_from(&path);
        fs::remove_file(&path).unwrap();

        assert_eq!(config.audio_countdown_secs, 9);
        assert_eq!(config.poll_every_secs, 15);
    }

    #[test]
    fn test_missing_env_file_keeps_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/ieltsroom.env"));
        assert_eq!(config.base_url(), config.api_url.trim_end_matches('/'));
        assert_eq!(config.essay_debounce, Duration::from_secs(3));
    }
}
