use super::error::ExpandError;
use glob::MatchOptions;
use mockall::automock;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The only options the expander ever sees. Self-exclusion and uniqueness are
/// applied to the resulting list and never reach this struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandOptions {
    pub strict: bool,
    pub working_dir: PathBuf,
}

#[automock]
pub trait PatternExpander: Send + Sync {
    fn expand(
        &self,
        patterns: &[String],
        options: &ExpandOptions,
    ) -> Result<Vec<PathBuf>, ExpandError>;
}

#[derive(Debug, Default)]
pub struct DefaultPatternExpander {}

impl PatternExpander for DefaultPatternExpander {
    /// Matches every pattern in turn. Files already produced by an earlier
    /// pattern are not repeated.
    fn expand(
        &self,
        patterns: &[String],
        options: &ExpandOptions,
    ) -> Result<Vec<PathBuf>, ExpandError> {
        let mut seen = BTreeSet::new();
        let mut files = Vec::new();

        for pattern in patterns {
            let glob_path = make_absolute(&options.working_dir, pattern);
            debug!("Expanding {} as {}", pattern, glob_path);

            let paths = glob::glob_with(&glob_path, match_options()).map_err(|error| {
                ExpandError::Pattern {
                    pattern: pattern.clone(),
                    error,
                }
            })?;

            let mut matched = 0;
            for entry in paths {
                let path = match entry {
                    Ok(path) => path,
                    Err(e) if options.strict => return Err(e.into()),
                    Err(e) => {
                        warn!(target: "user", "Skipping unreadable path {}. {}", e.path().display(), e.error());
                        continue;
                    }
                };

                if !path.is_file() {
                    continue;
                }

                matched += 1;
                let path = path_clean::clean(&path);
                if seen.insert(path.clone()) {
                    files.push(path);
                }
            }

            if matched == 0 {
                if options.strict {
                    return Err(ExpandError::NoMatch(pattern.clone()));
                }
                debug!("Pattern {} did not match any files", pattern);
            }
        }

        Ok(files)
    }
}

/// Wildcards never match a leading `.`, so dotfiles are only loaded when the
/// pattern names them.
fn match_options() -> MatchOptions {
    MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    }
}

/// Joins a relative `glob` onto `base_dir`. The base is escaped so brackets or
/// wildcards in directory names match literally.
pub(crate) fn make_absolute(base_dir: &Path, glob: &str) -> String {
    let expanded_glob = shellexpand::tilde(glob);
    let glob_buf = PathBuf::from(expanded_glob.to_string());
    if glob_buf.is_absolute() {
        glob_buf.display().to_string()
    } else {
        let base = glob::Pattern::escape(&base_dir.to_string_lossy());
        Path::new(&base).join(glob_buf).display().to_string()
    }
}

/// Absolute, lexically cleaned form of `path`, used to compare against matches.
pub(crate) fn absolute_path(base_dir: &Path, path: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).to_string();
    let path = PathBuf::from(expanded);
    if path.is_absolute() {
        path_clean::clean(&path)
    } else {
        path_clean::clean(base_dir.join(path))
    }
}
