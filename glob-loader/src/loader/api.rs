use super::error::{LoaderError, ModuleError};
use super::expand::{absolute_path, DefaultPatternExpander, ExpandOptions, PatternExpander};
use super::filters::{apply_order, check_unique, exclude_self};
use super::module::ModuleLoader;
use super::options::{FailurePolicy, LoadOptions, Pattern};
use educe::Educe;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info_span, warn, Instrument, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

/// A module handed to the load callback.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModule<T> {
    pub exports: T,
    pub path: PathBuf,
}

pub type LoadResult<T> = Result<LoadedModule<T>, LoaderError>;

/// Loads running on their own tasks, oldest first. Dropping the window aborts
/// whatever is still running, so a dropped `load` future stops its loads too.
struct Window<T> {
    tasks: VecDeque<(PathBuf, JoinHandle<Result<T, ModuleError>>)>,
}

impl<T> Window<T> {
    fn with_capacity(limit: usize) -> Self {
        Self {
            tasks: VecDeque::with_capacity(limit),
        }
    }

    fn len(&self) -> usize {
        self.tasks.len()
    }

    fn push(&mut self, path: PathBuf, handle: JoinHandle<Result<T, ModuleError>>) {
        self.tasks.push_back((path, handle));
    }

    /// Waits for the oldest load. The handle stays in the window while it is
    /// awaited so it is still aborted if this future is dropped.
    async fn next(&mut self) -> Option<(PathBuf, Result<T, ModuleError>)> {
        let (_, handle) = self.tasks.front_mut()?;
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(ModuleError::Panicked(e.to_string())),
        };
        self.tasks.pop_front().map(|(path, _)| (path, result))
    }
}

impl<T> Drop for Window<T> {
    fn drop(&mut self) {
        for (path, handle) in &self.tasks {
            if !handle.is_finished() {
                debug!("Cancelling load of {}", path.display());
                handle.abort();
            }
        }
    }
}

#[derive(Educe)]
#[educe(Debug)]
pub struct Loader<L>
where
    L: ModuleLoader,
{
    #[educe(Debug(ignore))]
    expander: Arc<dyn PatternExpander>,
    #[educe(Debug(ignore))]
    modules: Arc<L>,
}

impl<L> Loader<L>
where
    L: ModuleLoader + 'static,
{
    pub fn new(modules: L) -> Self {
        Self::from_shared(Arc::new(modules))
    }

    /// Builds a loader around a module loader that is shared with other callers,
    /// so anything it caches is shared too.
    pub fn from_shared(modules: Arc<L>) -> Self {
        Self {
            expander: Arc::new(DefaultPatternExpander::default()),
            modules,
        }
    }

    pub fn with_expander(mut self, expander: Arc<dyn PatternExpander>) -> Self {
        self.expander = expander;
        self
    }

    /// Loads every module matching `pattern` with default options.
    pub async fn each<P, F>(&self, pattern: P, callback: F) -> Result<(), LoaderError>
    where
        P: Into<Pattern>,
        F: FnMut(LoadResult<L::Exports>),
    {
        self.load(pattern, LoadOptions::default(), callback).await
    }

    /// Loads every matching module without delivering it anywhere.
    pub async fn require<P>(&self, pattern: P, options: LoadOptions) -> Result<(), LoaderError>
    where
        P: Into<Pattern>,
    {
        self.load(pattern, options, |_| {}).await
    }

    /// Expands `pattern`, filters and orders the matches according to `options`,
    /// then loads each file and calls `callback` with the result, in list order.
    ///
    /// Resolves once the last callback has returned. Expansion failures, and load
    /// failures under [`FailurePolicy::Abort`], resolve to an error. A uniqueness
    /// violation is handed to the callback and nothing is loaded.
    pub async fn load<P, F>(
        &self,
        pattern: P,
        options: LoadOptions,
        mut callback: F,
    ) -> Result<(), LoaderError>
    where
        P: Into<Pattern>,
        F: FnMut(LoadResult<L::Exports>),
    {
        let pattern = pattern.into();
        let expand_options = ExpandOptions {
            strict: options.strict,
            working_dir: resolve_working_dir(options.working_dir.as_deref())?,
        };

        let mut files = match self.expander.expand(pattern.patterns(), &expand_options) {
            Ok(files) => files,
            Err(e) => {
                error!(target: "user", "Unable to expand '{}'. {}", pattern, e);
                return Err(e.into());
            }
        };
        debug!("'{}' matched {} files", pattern, files.len());

        if let Some(self_path) = &options.exclude_self {
            let self_path = absolute_path(&expand_options.working_dir, self_path);
            if exclude_self(&mut files, &self_path) {
                debug!("Excluded {} from matches", self_path.display());
            }
        }

        if options.unique {
            if let Err(e) = check_unique(&pattern, &files) {
                warn!(target: "user", "{}", e);
                callback(Err(e));
                return Ok(());
            }
        }

        apply_order(&mut files, &options.sort);

        let span = info_span!("load", "indicatif.pb_show" = true);
        span.pb_set_length(files.len() as u64);
        span.pb_set_message(&format!("loading {}", pattern));

        match options.limit {
            None => {
                self.load_sequential(files, &options, &mut callback)
                    .instrument(span)
                    .await
            }
            Some(limit) => {
                self.load_windowed(files, limit, &options, &mut callback)
                    .instrument(span)
                    .await
            }
        }
    }

    async fn load_sequential<F>(
        &self,
        files: Vec<PathBuf>,
        options: &LoadOptions,
        callback: &mut F,
    ) -> Result<(), LoaderError>
    where
        F: FnMut(LoadResult<L::Exports>),
    {
        for path in files {
            let result = load_one(self.modules.as_ref(), &path, options.load_timeout).await;
            deliver(path, result, options.on_error, callback)?;
        }

        Ok(())
    }

    /// Keeps up to `limit` loads running. Results are taken from the front of the
    /// window, so callbacks still see files in list order.
    async fn load_windowed<F>(
        &self,
        files: Vec<PathBuf>,
        limit: usize,
        options: &LoadOptions,
        callback: &mut F,
    ) -> Result<(), LoaderError>
    where
        F: FnMut(LoadResult<L::Exports>),
    {
        let mut pending = files.into_iter();
        let mut window = Window::with_capacity(limit);

        loop {
            while window.len() < limit {
                let Some(path) = pending.next() else {
                    break;
                };
                let modules = Arc::clone(&self.modules);
                let task_path = path.clone();
                let timeout = options.load_timeout;
                let handle = tokio::spawn(
                    async move { load_one(modules.as_ref(), &task_path, timeout).await }
                        .in_current_span(),
                );
                window.push(path, handle);
            }

            let Some((path, result)) = window.next().await else {
                break;
            };
            deliver(path, result, options.on_error, callback)?;
        }

        Ok(())
    }
}

/// The directory patterns are resolved against. Always absolute, so matches are too.
fn resolve_working_dir(dir: Option<&Path>) -> Result<PathBuf, LoaderError> {
    match dir {
        Some(dir) if dir.is_absolute() => Ok(dir.to_path_buf()),
        Some(dir) => {
            let current = std::env::current_dir().map_err(LoaderError::WorkingDir)?;
            Ok(path_clean::clean(current.join(dir)))
        }
        None => std::env::current_dir().map_err(LoaderError::WorkingDir),
    }
}

async fn load_one<L>(
    modules: &L,
    path: &Path,
    timeout: Option<Duration>,
) -> Result<L::Exports, ModuleError>
where
    L: ModuleLoader,
{
    match timeout {
        None => modules.load_module(path).await,
        Some(after) => match tokio::time::timeout(after, modules.load_module(path)).await {
            Ok(result) => result,
            Err(_) => Err(ModuleError::TimedOut(after)),
        },
    }
}

fn deliver<T, F>(
    path: PathBuf,
    result: Result<T, ModuleError>,
    policy: FailurePolicy,
    callback: &mut F,
) -> Result<(), LoaderError>
where
    F: FnMut(LoadResult<T>),
{
    Span::current().pb_inc(1);
    match result {
        Ok(exports) => {
            debug!("Loaded {}", path.display());
            callback(Ok(LoadedModule { exports, path }));
            Ok(())
        }
        Err(source) => {
            let error = LoaderError::Load { path, source };
            match policy {
                FailurePolicy::Abort => {
                    error!(target: "user", "{}", error);
                    Err(error)
                }
                FailurePolicy::Skip => {
                    warn!(target: "user", "{}, skipping", error);
                    callback(Err(error));
                    Ok(())
                }
            }
        }
    }
}
