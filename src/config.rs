use std::path::PathBuf;

pub const STORE_ENV: &str = "LIVEPULSE_STORE";
pub const ROSTER_ENV: &str = "LIVEPULSE_ROSTER";
pub const DEFAULT_STORE: &str = "feedback.csv";
pub const DEFAULT_ROSTER: &str = "students.csv";
pub const DEFAULT_RECENT: usize = 10;

/// Runtime settings; paths are handed to the store and roster explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub store_path: PathBuf,
    pub roster_path: PathBuf,
}

impl Config {
    /// Explicit flags win over the environment, which wins over defaults.
    pub fn resolve(store: Option<PathBuf>, roster: Option<PathBuf>) -> Self {
        Self::resolve_with(store, roster, |key| std::env::var_os(key).map(PathBuf::from))
    }

    fn resolve_with(
        store: Option<PathBuf>,
        roster: Option<PathBuf>,
        env: impl Fn(&str) -> Option<PathBuf>,
    ) -> Self {
        Config {
            store_path: store
                .or_else(|| env(STORE_ENV))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE)),
            roster_path: roster
                .or_else(|| env(ROSTER_ENV))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ROSTER)),
        }
    }
}
