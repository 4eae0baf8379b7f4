use super::error::LoaderError;
use super::options::{Pattern, SortOrder};
use std::path::{Path, PathBuf};

/// Removes the first entry equal to `self_path`. Later duplicates stay.
pub(crate) fn exclude_self(files: &mut Vec<PathBuf>, self_path: &Path) -> bool {
    match files.iter().position(|file| file == self_path) {
        Some(index) => {
            files.remove(index);
            true
        }
        None => false,
    }
}

pub(crate) fn check_unique(pattern: &Pattern, files: &[PathBuf]) -> Result<(), LoaderError> {
    if files.len() > 1 {
        return Err(LoaderError::NotUnique {
            pattern: pattern.to_string(),
            count: files.len(),
        });
    }
    Ok(())
}

pub(crate) fn apply_order(files: &mut [PathBuf], sort: &SortOrder) {
    match sort {
        SortOrder::Unsorted => {}
        SortOrder::Alphanumeric => files.sort(),
        SortOrder::Custom(comparator) => files.sort_by(|a, b| comparator(a, b)),
    }
}
