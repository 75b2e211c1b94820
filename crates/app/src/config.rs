use std::{env, fmt, path::PathBuf, str::FromStr};

use tracing::info;

pub const DEFAULT_DB_URL: &str = "sqlite://dev.sqlite3";
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug)]
pub enum ConfigError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    Invalid { key: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ConfigError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ConfigError::Invalid { key, raw } => write!(f, "invalid {key} value: {raw}"),
            ConfigError::InvalidDbUrl { raw } => write!(f, "invalid database url: {raw}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Runtime settings: environment first, then command-line overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_url: String,
    pub bind: String,
    pub port: u16,
    pub catalog: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.to_string(),
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            catalog: None,
        }
    }
}

impl Config {
    /// Read `EDU_DB_URL`, `EDU_BIND` and `EDU_PORT`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a variable is set but unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            db_url: normalize_sqlite_url(&try_load("EDU_DB_URL", DEFAULT_DB_URL.to_string())?),
            bind: try_load("EDU_BIND", DEFAULT_BIND.to_string())?,
            port: try_load("EDU_PORT", DEFAULT_PORT)?,
            catalog: None,
        })
    }

    /// Apply `--db`, `--bind`, `--port` and `--catalog` flags on top of `self`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for unknown flags or bad values.
    pub fn apply_args(
        mut self,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ConfigError> {
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ConfigError::InvalidDbUrl { raw: value });
                    }
                    self.db_url = normalize_sqlite_url(&value);
                }
                "--bind" => self.bind = require_value(args, "--bind")?,
                "--port" => {
                    let value = require_value(args, "--port")?;
                    self.port = value.parse().map_err(|_| ConfigError::Invalid {
                        key: "--port",
                        raw: value.clone(),
                    })?;
                }
                "--catalog" => self.catalog = Some(PathBuf::from(require_value(args, "--catalog")?)),
                _ => return Err(ConfigError::UnknownArg(arg)),
            }
        }
        Ok(self)
    }

    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ConfigError> {
    args.next().ok_or(ConfigError::MissingValue { flag })
}

fn try_load<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, raw }),
        Err(_) => {
            info!("{key} not set, using default");
            Ok(default)
        }
    }
}

/// Turns relative sqlite paths into absolute `sqlite://` URLs.
#[must_use]
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Make sure the database file and its directory exist before connecting.
///
/// # Errors
///
/// Returns an error if the URL is not a file URL or the file cannot be created.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ConfigError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ConfigError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}
