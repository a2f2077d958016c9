//! # acconfig
//!
//! YAML configuration for AudioCloud.
//!
//! Defaults are compiled in (`audiocloud.yaml`); a `config.yaml` in the
//! configuration directory overrides them key by key, and
//! `AUDIOCLOUD_CONFIG__SECTION__KEY=value` environment variables override
//! both. Keys are case-insensitive. The application reads one process-wide
//! instance through [`get_config`].
//!
//! ```no_run
//! use acconfig::get_config;
//!
//! let config = get_config();
//!
//! let interval = config.get_poll_interval_ms()?;
//! let backend = config.get_player_backend()?;
//!
//! config.set_poll_interval_ms(500)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

mod tree;

use anyhow::{anyhow, bail, Context, Result};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{debug, info, warn};

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("audiocloud.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load AudioCloud configuration"));
}

const ENV_CONFIG_DIR: &str = "AUDIOCLOUD_CONFIG";
const ENV_PREFIX: &str = "AUDIOCLOUD_CONFIG__";
const CONFIG_DIR_NAME: &str = ".audiocloud";

const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_MEDIA_DIR: &str = "media";
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;

/// Getter/setter pair for an integer entry, `$default` when absent or malformed
macro_rules! impl_u64_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<u64> {
            match self.get_value($path)? {
                Value::Number(n) => Ok(n.as_u64().unwrap_or($default)),
                Value::String(s) => Ok(s.trim().parse().unwrap_or($default)),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: u64) -> Result<()> {
            self.set_value($path, Value::Number(Number::from(value)))
        }
    };
}

/// Getter/setter pair for a boolean entry
macro_rules! impl_bool_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            match self.get_value($path)? {
                Value::Bool(b) => Ok(b),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Which media backend the player should drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerBackendKind {
    /// Clock-driven simulation, no audio output.
    #[default]
    Simulated,
    /// Real audio output through rodio.
    Rodio,
}

impl FromStr for PlayerBackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "simulated" => Ok(PlayerBackendKind::Simulated),
            "rodio" => Ok(PlayerBackendKind::Rodio),
            other => Err(anyhow!("Unknown player backend '{}'", other)),
        }
    }
}

impl PlayerBackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerBackendKind::Simulated => "simulated",
            PlayerBackendKind::Rodio => "rodio",
        }
    }
}

/// AudioCloud settings, backed by `config.yaml` in the config directory.
///
/// Values are read from an in-memory YAML document; every setter writes the
/// whole document back to disk.
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Config {
    /// Candidate directories, most specific first.
    fn candidate_dirs(directory: &str) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if !directory.is_empty() {
            candidates.push(PathBuf::from(directory));
        }
        if let Some(from_env) = env::var_os(ENV_CONFIG_DIR) {
            debug!(env_var = ENV_CONFIG_DIR, path = ?from_env, "Config directory from environment");
            candidates.push(PathBuf::from(from_env));
        }
        candidates.push(PathBuf::from(CONFIG_DIR_NAME));
        if let Some(home) = home_dir() {
            candidates.push(home.join(CONFIG_DIR_NAME));
        }
        candidates
    }

    fn pick_config_dir(directory: &str) -> PathBuf {
        let mut candidates = Self::candidate_dirs(directory);
        // An explicit or env-provided directory is used even if it does not exist yet
        let explicit = !directory.is_empty() || env::var_os(ENV_CONFIG_DIR).is_some();
        if explicit {
            return candidates.swap_remove(0);
        }
        candidates
            .into_iter()
            .find(|dir| dir.is_dir())
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR_NAME))
    }

    /// Creates `dir` if needed and checks it can be listed and written to.
    fn ensure_usable(dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create config directory {}", dir.display()))?;
        if !dir.is_dir() {
            bail!("{} is not a directory", dir.display());
        }

        let probe = dir.join(".audiocloud_probe");
        fs::write(&probe, b"")
            .and_then(|_| fs::remove_file(&probe))
            .with_context(|| format!("Config directory {} is not writable", dir.display()))?;
        fs::read_dir(dir)
            .with_context(|| format!("Config directory {} is not readable", dir.display()))?;
        Ok(())
    }

    /// Resolves the configuration directory and makes sure it is usable.
    ///
    /// Lookup order: `directory` when not empty, `$AUDIOCLOUD_CONFIG`, then
    /// an existing `./.audiocloud` or `~/.audiocloud`. Falls back to
    /// `./.audiocloud`, which is created.
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir = Self::pick_config_dir(directory);
        Self::ensure_usable(&dir)?;
        Ok(dir.to_string_lossy().into_owned())
    }

    /// Builds the configuration of `directory` (see [`Config::config_dir`]).
    ///
    /// The embedded defaults are overlaid with `config.yaml` when it exists,
    /// then with `AUDIOCLOUD_CONFIG__SECTION__KEY` variables. The result is
    /// written back to `config.yaml`.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        let path = Path::new(&config_dir)
            .join("config.yaml")
            .to_string_lossy()
            .into_owned();
        info!(config_dir = %config_dir, "Using config directory");

        let mut document = tree::lowercase_keys(
            serde_yaml::from_str(DEFAULT_CONFIG).context("Embedded default config is invalid")?,
        );

        match fs::read_to_string(&path) {
            Ok(text) => {
                let user: Value = serde_yaml::from_str(&text)
                    .with_context(|| format!("Cannot parse {}", path))?;
                // An empty file parses as null and must not wipe the defaults
                if !user.is_null() {
                    tree::merge(&mut document, tree::lowercase_keys(user));
                }
                info!(config_file = %path, "Loaded config file");
            }
            Err(_) => info!(config_file = %path, "No config file, using defaults"),
        }

        for (name, key_path, value) in tree::env_overrides(ENV_PREFIX, env::vars()) {
            let key_path: Vec<&str> = key_path.iter().map(String::as_str).collect();
            match tree::insert(&mut document, &key_path, value) {
                Ok(()) => debug!(env_var = %name, "Applied configuration override"),
                Err(err) => warn!(env_var = %name, error = %err, "Ignoring configuration override"),
            }
        }

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(document),
        };
        config.save()?;
        Ok(config)
    }

    /// Directory holding `config.yaml`
    pub fn dir(&self) -> &str {
        &self.config_dir
    }

    /// Writes the current document to `config.yaml`.
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.lock_data()?)?;
        fs::write(&self.path, yaml).with_context(|| format!("Cannot write {}", self.path))?;
        Ok(())
    }

    fn lock_data(&self) -> Result<MutexGuard<'_, Value>> {
        self.data
            .lock()
            .map_err(|_| anyhow!("Configuration mutex poisoned"))
    }

    /// Stores `value` under `path` (e.g. `&["player", "poll_interval_ms"]`)
    /// and saves the file.
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        tree::insert(&mut *self.lock_data()?, path, value)?;
        self.save()
    }

    /// Value stored under `path`; an error if there is none.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        tree::lookup(&*self.lock_data()?, path).cloned()
    }

    /// Absolute paths are kept, relative ones are taken from the config directory.
    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.config_dir).join(path)
        }
    }

    impl_u64_config!(
        get_poll_interval_ms,
        set_poll_interval_ms,
        &["player", "poll_interval_ms"],
        DEFAULT_POLL_INTERVAL_MS
    );

    impl_bool_config!(
        get_log_enable_console,
        set_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    /// Media backend used by the player
    ///
    /// Unknown values fall back to the simulated backend with a warning.
    pub fn get_player_backend(&self) -> Result<PlayerBackendKind> {
        match self.get_value(&["player", "backend"]) {
            Ok(Value::String(s)) => match s.parse() {
                Ok(kind) => Ok(kind),
                Err(err) => {
                    warn!(error = %err, "Using the simulated backend");
                    Ok(PlayerBackendKind::default())
                }
            },
            _ => Ok(PlayerBackendKind::default()),
        }
    }

    pub fn set_player_backend(&self, kind: PlayerBackendKind) -> Result<()> {
        self.set_value(
            &["player", "backend"],
            Value::String(kind.as_str().to_string()),
        )
    }

    /// Directory that audio references are resolved against, relative to the
    /// config directory unless absolute.
    pub fn get_media_dir(&self) -> Result<PathBuf> {
        let dir = match self.get_value(&["player", "media_dir"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => s,
            _ => DEFAULT_MEDIA_DIR.to_string(),
        };
        Ok(self.resolve_path(&dir))
    }

    pub fn set_media_dir(&self, dir: String) -> Result<()> {
        self.set_value(&["player", "media_dir"], Value::String(dir))
    }

    /// Optional external catalog manifest
    ///
    /// `None` means the embedded catalog is used.
    pub fn get_catalog_manifest(&self) -> Result<Option<PathBuf>> {
        match self.get_value(&["catalog", "manifest"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Ok(Some(self.resolve_path(&s))),
            _ => Ok(None),
        }
    }

    pub fn set_catalog_manifest(&self, manifest: Option<String>) -> Result<()> {
        let value = match manifest {
            Some(path) => Value::String(path),
            None => Value::Null,
        };
        self.set_value(&["catalog", "manifest"], value)
    }

    /// Minimum log level
    pub fn get_log_min_level(&self) -> Result<String> {
        match self.get_value(&["host", "logger", "min_level"])? {
            Value::String(s) => Ok(s),
            _ => Ok(DEFAULT_LOG_MIN_LEVEL.to_string()),
        }
    }

    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(&["host", "logger", "min_level"], Value::String(level))
    }
}

/// Process-wide configuration, loaded on first use from the default
/// directory lookup.
///
/// # Panics
///
/// Panics on first access if the configuration directory cannot be prepared.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}
