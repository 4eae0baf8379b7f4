use lazy_static::lazy_static;
use std::sync::Arc;

mod api;
mod error;
mod expand;
mod filters;
mod module;
mod options;

use api::{LoadResult, Loader};
use error::LoaderError;
use module::{CachingLoader, Manifest, ManifestLoader};
use options::{LoadOptions, Pattern};

pub mod prelude {
    pub use super::api::{LoadResult, LoadedModule, Loader};
    pub use super::error::{ExpandError, LoaderError, ModuleError};
    pub use super::expand::{
        DefaultPatternExpander, ExpandOptions, MockPatternExpander, PatternExpander,
    };
    pub use super::module::{
        CachingLoader, Manifest, ManifestLoader, MockModuleLoader, ModuleLoader,
    };
    pub use super::options::{
        FailurePolicy, LoadOptions, LoadOptionsBuilder, PathComparator, Pattern, SortOrder,
    };
    pub use super::{load, shared_manifests};
}

lazy_static! {
    static ref SHARED_MANIFESTS: Arc<CachingLoader<ManifestLoader>> =
        Arc::new(CachingLoader::new(ManifestLoader::default()));
}

/// The process-wide manifest loader used by [`load`]. Every path it has
/// loaded stays cached for the life of the process.
pub fn shared_manifests() -> Arc<CachingLoader<ManifestLoader>> {
    Arc::clone(&SHARED_MANIFESTS)
}

/// Loads manifests matching `pattern` through the process-wide cache and
/// calls `callback` for each one. See [`Loader::load`].
pub async fn load<P, F>(pattern: P, options: LoadOptions, callback: F) -> Result<(), LoaderError>
where
    P: Into<Pattern>,
    F: FnMut(LoadResult<Arc<Manifest>>),
{
    Loader::from_shared(shared_manifests())
        .load(pattern, options, callback)
        .await
}
