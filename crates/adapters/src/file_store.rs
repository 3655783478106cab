//! YAML file-tree config store.
//!
//! Layout:
//! - default collection: `<root>/<name>.yml`
//! - named collection `a.b`: `<root>/a/b/<name>.yml`

use config_ignore_domain::{CollectionId, ConfigName, ConfigTree};
use config_ignore_ports::ConfigStore;
use config_ignore_shared::{ErrorClass, ErrorCode, ErrorEnvelope, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File extension of stored objects.
pub const OBJECT_EXTENSION: &str = "yml";

const MAX_COLLECTION_DEPTH: usize = 8;

/// Errors produced by the file store.
#[derive(Debug, Error)]
pub enum FileStoreError {
    /// IO failures while interacting with the filesystem.
    #[error("failed to {operation} {}", path.display())]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A stored object is not valid YAML.
    #[error("invalid YAML in {}", path.display())]
    Yaml {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml_ng::Error,
    },
    /// An object could not be encoded as YAML.
    #[error("failed to encode {name} as YAML")]
    Encode {
        /// Object name.
        name: String,
        /// Underlying YAML error.
        source: serde_yaml_ng::Error,
    },
    /// The store root is missing or not a directory.
    #[error("store root {} is not a directory", path.display())]
    MissingRoot {
        /// Configured root.
        path: PathBuf,
    },
}

impl From<FileStoreError> for ErrorEnvelope {
    fn from(error: FileStoreError) -> Self {
        let message = error.to_string();
        match error {
            FileStoreError::Io {
                operation,
                path,
                source,
            } => {
                let cause = Self::from(source);
                let mut envelope =
                    Self::unexpected(ErrorCode::new("store", "io"), message, cause.class)
                        .with_metadata("operation", operation)
                        .with_metadata("path", path.display().to_string());
                envelope.metadata.extend(cause.metadata);
                envelope
            },
            FileStoreError::Yaml { path, source } => {
                Self::expected(ErrorCode::new("store", "invalid_yaml"), message)
                    .with_metadata("path", path.display().to_string())
                    .with_metadata("cause", source.to_string())
            },
            FileStoreError::Encode { name, source } => Self::unexpected(
                ErrorCode::new("store", "encode"),
                message,
                ErrorClass::NonRetriable,
            )
            .with_metadata("name", name)
            .with_metadata("cause", source.to_string()),
            FileStoreError::MissingRoot { path } => {
                Self::expected(ErrorCode::new("store", "missing_root"), message)
                    .with_metadata("path", path.display().to_string())
            },
        }
    }
}

/// Config store backed by a directory of YAML files.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    root: PathBuf,
    collection: CollectionId,
}

impl FileConfigStore {
    /// Open an existing store directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, FileStoreError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(FileStoreError::MissingRoot { path: root });
        }
        Ok(Self::at(root))
    }

    /// Open a store directory, creating it when missing.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, FileStoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| FileStoreError::Io {
            operation: "create store root",
            path: root.clone(),
            source,
        })?;
        Ok(Self::at(root))
    }

    fn at(root: PathBuf) -> Self {
        Self {
            root,
            collection: CollectionId::Default,
        }
    }

    /// Directory holding this handle's collection.
    #[must_use]
    pub fn collection_dir(&self) -> PathBuf {
        collection_dir(&self.root, &self.collection)
    }

    fn object_path(&self, name: &ConfigName) -> PathBuf {
        self.collection_dir()
            .join(format!("{name}.{OBJECT_EXTENSION}"))
    }

    fn list_names(&self) -> Result<Vec<ConfigName>, FileStoreError> {
        let dir = self.collection_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(FileStoreError::Io {
                    operation: "list",
                    path: dir,
                    source,
                });
            },
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| FileStoreError::Io {
                operation: "list",
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(stem) = object_stem(&path) else {
                continue;
            };
            match ConfigName::parse(stem) {
                Ok(name) => names.push(name),
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "skipping file with invalid object name");
                },
            }
        }
        names.sort();
        Ok(names)
    }

    fn read_object(&self, name: &ConfigName) -> Result<Option<ConfigTree>, FileStoreError> {
        let path = self.object_path(name);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(FileStoreError::Io {
                    operation: "read",
                    path,
                    source,
                });
            },
        };
        let tree = serde_yaml_ng::from_str::<ConfigTree>(&contents)
            .map_err(|source| FileStoreError::Yaml { path, source })?;
        Ok(Some(tree))
    }

    fn write_object(&self, name: &ConfigName, data: &ConfigTree) -> Result<(), FileStoreError> {
        let encoded = serde_yaml_ng::to_string(data).map_err(|source| FileStoreError::Encode {
            name: name.to_string(),
            source,
        })?;

        let dir = self.collection_dir();
        fs::create_dir_all(&dir).map_err(|source| FileStoreError::Io {
            operation: "create collection directory",
            path: dir,
            source,
        })?;

        // Write to a sibling temp file, then rename into place.
        let path = self.object_path(name);
        let temp_path = path.with_extension(format!("{OBJECT_EXTENSION}.tmp"));
        fs::write(&temp_path, encoded).map_err(|source| FileStoreError::Io {
            operation: "write",
            path: temp_path.clone(),
            source,
        })?;
        fs::rename(&temp_path, &path).map_err(|source| FileStoreError::Io {
            operation: "replace",
            path,
            source,
        })
    }

    fn delete_object(&self, name: &ConfigName) -> Result<bool, FileStoreError> {
        let path = self.object_path(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(FileStoreError::Io {
                operation: "delete",
                path,
                source,
            }),
        }
    }

    fn list_collections(&self) -> Result<Vec<CollectionId>, FileStoreError> {
        let mut found = Vec::new();
        walk_collections(&self.root, &mut Vec::new(), &mut found)?;
        found.sort();
        Ok(found)
    }
}

impl ConfigStore for FileConfigStore {
    fn collection(&self) -> &CollectionId {
        &self.collection
    }

    fn list_all(&self) -> Result<Vec<ConfigName>> {
        Ok(self.list_names()?)
    }

    fn read(&self, name: &ConfigName) -> Result<Option<ConfigTree>> {
        Ok(self.read_object(name)?)
    }

    fn write(&self, name: &ConfigName, data: &ConfigTree) -> Result<()> {
        Ok(self.write_object(name, data)?)
    }

    fn delete(&self, name: &ConfigName) -> Result<bool> {
        Ok(self.delete_object(name)?)
    }

    fn exists(&self, name: &ConfigName) -> Result<bool> {
        Ok(self.object_path(name).is_file())
    }

    fn collections(&self) -> Result<Vec<CollectionId>> {
        Ok(self.list_collections()?)
    }

    fn scoped(&self, collection: &CollectionId) -> Box<dyn ConfigStore> {
        Box::new(Self {
            root: self.root.clone(),
            collection: collection.clone(),
        })
    }
}

fn collection_dir(root: &Path, collection: &CollectionId) -> PathBuf {
    match collection.as_named() {
        None => root.to_path_buf(),
        Some(named) => named
            .split('.')
            .fold(root.to_path_buf(), |dir, segment| dir.join(segment)),
    }
}

fn object_stem(path: &Path) -> Option<&str> {
    let file_name = path.file_name()?.to_str()?;
    file_name
        .strip_suffix(OBJECT_EXTENSION)?
        .strip_suffix('.')
        .filter(|stem| !stem.is_empty())
}

fn walk_collections(
    dir: &Path,
    segments: &mut Vec<String>,
    found: &mut Vec<CollectionId>,
) -> Result<(), FileStoreError> {
    if segments.len() >= MAX_COLLECTION_DEPTH {
        return Ok(());
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(FileStoreError::Io {
                operation: "list collections",
                path: dir.to_path_buf(),
                source,
            });
        },
    };

    for entry in entries {
        let entry = entry.map_err(|source| FileStoreError::Io {
            operation: "list collections",
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(segment) = path
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|segment| is_collection_segment(segment))
        else {
            continue;
        };
        segments.push(segment.to_owned());
        if contains_objects(&path) {
            if let Ok(collection) = CollectionId::parse(segments.join(".")) {
                found.push(collection);
            }
        }
        walk_collections(&path, segments, found)?;
        segments.pop();
    }
    Ok(())
}

/// A directory maps to one collection segment only when it round-trips
/// through `collection_dir`; dotted names would resolve elsewhere.
fn is_collection_segment(segment: &str) -> bool {
    !segment.contains('.') && CollectionId::parse(segment).is_ok()
}

fn contains_objects(dir: &Path) -> bool {
    fs::read_dir(dir).is_ok_and(|entries| {
        entries
            .filter_map(std::result::Result::ok)
            .any(|entry| {
                let path = entry.path();
                path.is_file() && object_stem(&path).is_some()
            })
    })
}
