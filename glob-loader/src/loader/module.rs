use super::error::ModuleError;
use async_trait::async_trait;
use educe::Educe;
use mockall::automock;
use serde::{Deserialize, Serialize};
use serde_yaml::{Deserializer, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, instrument};

/// Turns a file into the value handed to load callbacks.
///
/// Implementations decide what "loading" means. Any caching of already
/// loaded paths belongs to the implementation, see [`CachingLoader`].
#[automock(type Exports = String;)]
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    type Exports: Send + Sync + 'static;

    async fn load_module(&self, path: &Path) -> Result<Self::Exports, ModuleError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub documents: Vec<Value>,
}

impl Manifest {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Looks `key` up in the first document that defines it.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.documents.iter().find_map(|doc| doc.get(key))
    }
}

/// Loads YAML (`.yaml`, `.yml`, possibly multi-document) and JSON manifests.
#[derive(Debug, Default)]
pub struct ManifestLoader {}

#[async_trait]
impl ModuleLoader for ManifestLoader {
    type Exports = Manifest;

    #[instrument(skip_all, fields(module.path = %path.display()))]
    async fn load_module(&self, path: &Path) -> Result<Manifest, ModuleError> {
        let extension = path
            .extension()
            .map(|x| x.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let contents = match extension.as_str() {
            "yaml" | "yml" | "json" => tokio::fs::read_to_string(path).await?,
            _ => return Err(ModuleError::UnsupportedExtension(extension)),
        };

        let documents = if extension == "json" {
            vec![serde_json::from_str::<Value>(&contents)?]
        } else {
            let mut documents = Vec::new();
            for doc in Deserializer::from_str(&contents) {
                let value = Value::deserialize(doc)?;
                if !value.is_null() {
                    documents.push(value);
                }
            }
            documents
        };

        debug!("Loaded {} documents", documents.len());
        Ok(Manifest { documents })
    }
}

/// Wraps a loader so every path is loaded at most once per instance.
///
/// Concurrent requests for the same path wait on the first one. A failed load
/// is not remembered, so the next request tries again.
#[derive(Educe)]
#[educe(Debug)]
pub struct CachingLoader<L>
where
    L: ModuleLoader,
{
    #[educe(Debug(ignore))]
    inner: L,
    #[educe(Debug(ignore))]
    cache: Mutex<BTreeMap<PathBuf, Arc<OnceCell<Arc<L::Exports>>>>>,
}

impl<L> CachingLoader<L>
where
    L: ModuleLoader,
{
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            cache: Mutex::new(BTreeMap::new()),
        }
    }

    /// Paths with a successfully loaded value.
    pub async fn cached_paths(&self) -> Vec<PathBuf> {
        let cache = self.cache.lock().await;
        cache
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(path, _)| path.clone())
            .collect()
    }
}

#[async_trait]
impl<L> ModuleLoader for CachingLoader<L>
where
    L: ModuleLoader,
{
    type Exports = Arc<L::Exports>;

    async fn load_module(&self, path: &Path) -> Result<Arc<L::Exports>, ModuleError> {
        let cell = {
            let mut cache = self.cache.lock().await;
            Arc::clone(cache.entry(path.to_path_buf()).or_default())
        };

        if cell.initialized() {
            debug!("Using cached module for {}", path.display());
        }

        let exports = cell
            .get_or_try_init(|| async { self.inner.load_module(path).await.map(Arc::new) })
            .await?;

        Ok(Arc::clone(exports))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn create_test_file(temp_dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let file_path = temp_dir.path().join(name);
        fs::write(&file_path, content).unwrap();
        file_path
    }

    mod manifest_loader {
        use super::*;

        #[tokio::test]
        async fn test_loads_multi_document_yaml() {
            let temp_dir = tempdir().unwrap();
            let path = create_test_file(
                &temp_dir,
                "handlers.yaml",
                "name: first\n---\nname: second\n",
            );

            let manifest = ManifestLoader::default().load_module(&path).await.unwrap();

            assert_eq!(2, manifest.documents.len());
            assert_eq!(Some(&Value::from("first")), manifest.get("name"));
        }

        #[tokio::test]
        async fn test_loads_json() {
            let temp_dir = tempdir().unwrap();
            let path = create_test_file(&temp_dir, "handler.json", r#"{"name": "json"}"#);

            let manifest = ManifestLoader::default().load_module(&path).await.unwrap();

            assert_eq!(1, manifest.documents.len());
            assert_eq!(Some(&Value::from("json")), manifest.get("name"));
        }

        #[tokio::test]
        async fn test_empty_yaml_has_no_documents() {
            let temp_dir = tempdir().unwrap();
            let path = create_test_file(&temp_dir, "empty.yml", "");

            let manifest = ManifestLoader::default().load_module(&path).await.unwrap();

            assert!(manifest.is_empty());
        }

        #[tokio::test]
        async fn test_unsupported_extension() {
            let temp_dir = tempdir().unwrap();
            let path = create_test_file(&temp_dir, "handler.txt", "text");

            let result = ManifestLoader::default().load_module(&path).await;

            assert!(matches!(result, Err(ModuleError::UnsupportedExtension(ext)) if ext == "txt"));
        }

        #[tokio::test]
        async fn test_invalid_yaml() {
            let temp_dir = tempdir().unwrap();
            let path = create_test_file(&temp_dir, "broken.yaml", "name: [unclosed");

            let result = ManifestLoader::default().load_module(&path).await;

            assert!(matches!(result, Err(ModuleError::Yaml(_))));
        }

        #[tokio::test]
        async fn test_missing_file() {
            let result = ManifestLoader::default()
                .load_module(Path::new("/nonexistent/handler.yaml"))
                .await;

            assert!(matches!(result, Err(ModuleError::Io(_))));
        }
    }

    mod caching_loader {
        use super::*;

        #[tokio::test]
        async fn test_repeated_path_is_loaded_once() {
            let mut inner = MockModuleLoader::new();
            inner
                .expect_load_module()
                .times(1)
                .returning(|path| Ok(path.display().to_string()));

            let loader = CachingLoader::new(inner);
            let first = loader.load_module(Path::new("/a.yaml")).await.unwrap();
            let second = loader.load_module(Path::new("/a.yaml")).await.unwrap();

            assert!(Arc::ptr_eq(&first, &second));
            assert_eq!("/a.yaml", first.as_str());
            assert_eq!(vec![PathBuf::from("/a.yaml")], loader.cached_paths().await);
        }

        #[tokio::test]
        async fn test_distinct_paths_are_cached_separately() {
            let mut inner = MockModuleLoader::new();
            inner
                .expect_load_module()
                .times(2)
                .returning(|path| Ok(path.display().to_string()));

            let loader = CachingLoader::new(inner);
            let a = loader.load_module(Path::new("/a.yaml")).await.unwrap();
            let b = loader.load_module(Path::new("/b.yaml")).await.unwrap();

            assert_ne!(a, b);
            assert_eq!(2, loader.cached_paths().await.len());
        }

        #[tokio::test]
        async fn test_failure_is_not_cached() {
            let mut inner = MockModuleLoader::new();
            let mut seq = mockall::Sequence::new();
            inner
                .expect_load_module()
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| {
                    Err(ModuleError::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "missing",
                    )))
                });
            inner
                .expect_load_module()
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok("loaded".to_string()));

            let loader = CachingLoader::new(inner);
            assert!(loader.load_module(Path::new("/a.yaml")).await.is_err());
            assert!(loader.cached_paths().await.is_empty());

            let value = loader.load_module(Path::new("/a.yaml")).await.unwrap();
            assert_eq!("loaded", value.as_str());
        }
    }
}
