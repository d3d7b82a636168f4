use std::{env, path::PathBuf};

/// Engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Root directory; every database is a subdirectory of it
    pub data_dir: PathBuf,
    pub cache_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            cache_enabled: false,
        }
    }
}

impl Config {
    /// Defaults overlaid with `NEXADB_DATA_DIR` and `NEXADB_CACHE_ENABLED`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = env::var("NEXADB_DATA_DIR") {
            config.data_dir = expand_home(&dir, env::var("HOME").ok().as_deref());
        }
        if let Ok(flag) = env::var("NEXADB_CACHE_ENABLED") {
            config.cache_enabled = parse_flag(&flag);
        }
        config
    }
}

fn expand_home(path: &str, home: Option<&str>) -> PathBuf {
    match (path.strip_prefix('~'), home) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
            PathBuf::from(format!("{}{}", home, rest))
        }
        _ => PathBuf::from(path),
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}
