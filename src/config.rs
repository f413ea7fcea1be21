use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// environment variable naming the directory holding `rcn` and `rcn2`
pub const COWAN_DIR_VAR: &str = "COWAN_DIR";

/// environment variable naming the directory holding `ttrcg` and its
/// auxiliary `rcg_cfp7*` files
pub const TTMULT_VAR: &str = "TTMULT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("neither COWAN_DIR nor TTMULT is set")]
    Unset,

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Config holds the installation directories of the two program families and
/// the directory in which the stages run. It is built once by the caller and
/// handed to every [crate::stage::Stage], so nothing in the library reads the
/// process environment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// directory containing the `rcn` and `rcn2` executables
    pub cowan_dir: PathBuf,

    /// directory containing `ttrcg` and `rcg_cfp72`, `rcg_cfp73`, `rcg_cfp74`
    pub ttmult_dir: PathBuf,

    /// directory holding `<name>.*` and the `fort.*` slots
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    pub fn new(
        cowan_dir: impl Into<PathBuf>,
        ttmult_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            cowan_dir: cowan_dir.into(),
            ttmult_dir: ttmult_dir.into(),
            work_dir: default_work_dir(),
        }
    }

    /// use a single installation directory for all three programs
    pub fn unified(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self::new(dir.clone(), dir)
    }

    pub fn with_work_dir(self, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            ..self
        }
    }

    /// build a Config from [COWAN_DIR_VAR] and [TTMULT_VAR]. if only one of them
    /// is set, it is used for both families
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(
            std::env::var_os(COWAN_DIR_VAR).map(PathBuf::from),
            std::env::var_os(TTMULT_VAR).map(PathBuf::from),
        )
    }

    fn from_vars(
        cowan: Option<PathBuf>,
        ttmult: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        match (cowan, ttmult) {
            (Some(c), Some(t)) => Ok(Self::new(c, t)),
            (Some(d), None) | (None, Some(d)) => Ok(Self::unified(d)),
            (None, None) => Err(ConfigError::Unset),
        }
    }

    /// load a JSON config file like
    /// ```json
    /// {"cowan_dir": "bin", "ttmult_dir": "/opt/ttmult/bin"}
    /// ```
    /// relative installation directories are taken relative to the directory
    /// containing `path`, while `work_dir` is left alone
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_owned(),
                source,
            })?;
        let mut config: Self =
            serde_json::from_str(&contents).map_err(|source| {
                ConfigError::Parse {
                    path: path.to_owned(),
                    source,
                }
            })?;
        if let Some(base) = path.parent() {
            config.cowan_dir = base.join(&config.cowan_dir);
            config.ttmult_dir = base.join(&config.ttmult_dir);
        }
        Ok(config)
    }
}
