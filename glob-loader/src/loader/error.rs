use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExpandError {
    #[error("Invalid pattern '{pattern}'. {error}")]
    Pattern {
        pattern: String,
        #[source]
        error: glob::PatternError,
    },
    #[error("Unable to read {}. {error}", .error.path().display())]
    Walk {
        #[from]
        error: glob::GlobError,
    },
    #[error("'{0}' did not match any files")]
    NoMatch(String),
}

#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Unable to read module. {0}")]
    Io(#[from] std::io::Error),
    #[error("Unable to parse YAML. {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Unable to parse JSON. {0}")]
    Json(#[from] serde_json::Error),
    #[error("No loader registered for extension '{0}'")]
    UnsupportedExtension(String),
    #[error("Load did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("Load task panicked. {0}")]
    Panicked(String),
}

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error(transparent)]
    Expansion(#[from] ExpandError),
    #[error("'{pattern}' matched {count} files")]
    NotUnique { pattern: String, count: usize },
    #[error("Unable to load {}. {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: ModuleError,
    },
    #[error("Unable to determine the working dir. {0}")]
    WorkingDir(std::io::Error),
    #[error("Invalid load options. {0}")]
    InvalidOptions(String),
}

impl LoaderError {
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, LoaderError::NotUnique { .. })
    }
}
