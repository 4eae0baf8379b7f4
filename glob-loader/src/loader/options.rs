use derive_builder::Builder;
use itertools::Itertools;
use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use strum::{Display as StrumDisplay, EnumString};

/// One glob, or an ordered list of globs, handed to the expander as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern(Vec<String>);

impl Pattern {
    pub fn patterns(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for Pattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.iter().join(","))
    }
}

impl From<&str> for Pattern {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl From<String> for Pattern {
    fn from(value: String) -> Self {
        Self(vec![value])
    }
}

impl From<&String> for Pattern {
    fn from(value: &String) -> Self {
        Self(vec![value.clone()])
    }
}

impl From<Vec<String>> for Pattern {
    fn from(value: Vec<String>) -> Self {
        Self(value)
    }
}

impl From<Vec<&str>> for Pattern {
    fn from(value: Vec<&str>) -> Self {
        Self(value.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Pattern {
    fn from(value: &[&str]) -> Self {
        Self(value.iter().map(|x| x.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Pattern {
    fn from(value: [&str; N]) -> Self {
        Self(value.iter().map(|x| x.to_string()).collect())
    }
}

pub type PathComparator = dyn Fn(&Path, &Path) -> Ordering + Send + Sync;

#[derive(Clone, Default)]
pub enum SortOrder {
    /// Keep the order the expander produced.
    #[default]
    Unsorted,
    /// Byte-wise path order.
    Alphanumeric,
    Custom(Arc<PathComparator>),
}

impl SortOrder {
    pub fn custom<F>(comparator: F) -> Self
    where
        F: Fn(&Path, &Path) -> Ordering + Send + Sync + 'static,
    {
        SortOrder::Custom(Arc::new(comparator))
    }
}

impl Debug for SortOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Unsorted => write!(f, "Unsorted"),
            SortOrder::Alphanumeric => write!(f, "Alphanumeric"),
            SortOrder::Custom(_) => write!(f, "Custom(<comparator>)"),
        }
    }
}

/// What happens when a single module fails to load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, StrumDisplay, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop the whole run and return the failure.
    #[default]
    Abort,
    /// Hand the failure to the callback and move on to the next file.
    Skip,
}

#[derive(Debug, Clone, Default, Builder)]
#[builder(default, build_fn(validate = "Self::validate"))]
pub struct LoadOptions {
    /// Fail when a pattern matches nothing, or a path can't be read while matching.
    #[builder(setter(into))]
    pub strict: bool,
    /// Maximum number of modules loading at once. `None` loads one after another.
    #[builder(setter(into, strip_option))]
    pub limit: Option<usize>,
    #[builder(setter(into))]
    pub sort: SortOrder,
    /// More than one match is reported as an error instead of being loaded.
    #[builder(setter(into))]
    pub unique: bool,
    /// Path of the calling module, dropped from the matches.
    #[builder(setter(into, strip_option))]
    pub exclude_self: Option<PathBuf>,
    /// Base for relative patterns. Defaults to the process working dir.
    #[builder(setter(into, strip_option))]
    pub working_dir: Option<PathBuf>,
    #[builder(setter(into))]
    pub on_error: FailurePolicy,
    #[builder(setter(into, strip_option))]
    pub load_timeout: Option<Duration>,
}

impl LoadOptions {
    pub fn builder() -> LoadOptionsBuilder {
        LoadOptionsBuilder::default()
    }
}

impl LoadOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(Some(0)) = self.limit {
            return Err("limit must be greater than zero".to_string());
        }
        if let Some(Some(timeout)) = self.load_timeout {
            if timeout.is_zero() {
                return Err("load_timeout must be greater than zero".to_string());
            }
        }
        Ok(())
    }
}
