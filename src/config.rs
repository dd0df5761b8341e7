use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "smartops.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: String,
    pub database_path: PathBuf,
    pub csv_mirror: Option<PathBuf>,
    pub refresh_interval_secs: u64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".into(),
            database_path: PathBuf::from("database.db"),
            csv_mirror: None,
            refresh_interval_secs: 3,
            log_filter: "info".into(),
        }
    }
}

/// Keys accepted in `smartops.toml`; all optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    bind_addr: Option<String>,
    database_path: Option<PathBuf>,
    csv_mirror: Option<PathBuf>,
    refresh_interval_secs: Option<u64>,
    log_filter: Option<String>,
}

impl Settings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    fn apply_file(&mut self, file: FileSettings) {
        if let Some(v) = file.bind_addr {
            self.bind_addr = v;
        }
        if let Some(v) = file.database_path {
            self.database_path = v;
        }
        if let Some(v) = file.csv_mirror {
            self.csv_mirror = Some(v);
        }
        if let Some(v) = file.refresh_interval_secs {
            self.refresh_interval_secs = v;
        }
        if let Some(v) = file.log_filter {
            self.log_filter = v;
        }
    }

    /// Apply `SMARTOPS_*` overrides from `lookup` (normally `std::env::var`).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("SMARTOPS_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = lookup("SMARTOPS_DATABASE_PATH") {
            self.database_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("SMARTOPS_CSV_MIRROR") {
            self.csv_mirror = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("SMARTOPS_REFRESH_SECS") {
            if let Ok(parsed) = v.parse::<u64>() {
                self.refresh_interval_secs = parsed;
            }
        }
        if let Some(v) = lookup("SMARTOPS_LOG") {
            self.log_filter = v;
        }
    }
}

/// Defaults, then the config file if present, then the environment.
///
/// An unparseable file is skipped and its error handed back, since the log
/// filter comes from these settings and logging is not up yet.
pub fn load_settings(config_file: &Path) -> (Settings, Option<toml::de::Error>) {
    let mut settings = Settings::default();
    let mut file_error = None;

    if let Ok(raw) = fs::read_to_string(config_file) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => settings.apply_file(file_cfg),
            Err(e) => file_error = Some(e),
        }
    }

    settings.apply_env(|key| std::env::var(key).ok());
    (settings, file_error)
}
