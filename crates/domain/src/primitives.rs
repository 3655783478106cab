//! Domain primitives with validated constructors.

use config_ignore_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Maximum length of a configuration object name.
pub const MAX_CONFIG_NAME_LENGTH: usize = 250;

const FORBIDDEN_NAME_CHARS: [char; 9] = [':', '?', '*', '<', '>', '"', '\'', '/', '\\'];

/// Validation failures for domain primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// `ConfigName` is empty after trimming.
    EmptyConfigName {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
    /// `ConfigName` is longer than [`MAX_CONFIG_NAME_LENGTH`].
    ConfigNameTooLong {
        /// Length of the trimmed input.
        length: usize,
    },
    /// `ConfigName` contains whitespace or a reserved character.
    InvalidConfigName {
        /// Trimmed name that failed validation.
        input: String,
    },
    /// `CollectionId` is empty after trimming.
    EmptyCollectionId {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
    /// `CollectionId` violates the allowed pattern.
    InvalidCollectionId {
        /// Trimmed collection id that failed validation.
        input: String,
    },
    /// `KeyPath` is empty or has an empty segment.
    InvalidKeyPath {
        /// Raw key path input.
        input: String,
    },
}

impl PrimitiveError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyConfigName { .. }
            | Self::ConfigNameTooLong { .. }
            | Self::InvalidConfigName { .. } => ErrorCode::new("domain", "invalid_config_name"),
            Self::EmptyCollectionId { .. } | Self::InvalidCollectionId { .. } => {
                ErrorCode::new("domain", "invalid_collection_id")
            },
            Self::InvalidKeyPath { .. } => ErrorCode::new("domain", "invalid_key_path"),
        }
    }
}

impl fmt::Display for PrimitiveError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyConfigName { .. } => formatter.write_str("ConfigName must be non-empty"),
            Self::ConfigNameTooLong { length } => write!(
                formatter,
                "ConfigName must be at most {MAX_CONFIG_NAME_LENGTH} characters (got {length})"
            ),
            Self::InvalidConfigName { .. } => formatter.write_str(
                "ConfigName must not contain whitespace or any of : ? * < > \" ' / \\",
            ),
            Self::EmptyCollectionId { .. } => {
                formatter.write_str("CollectionId must be non-empty")
            },
            Self::InvalidCollectionId { .. } => formatter
                .write_str("CollectionId must be dot-separated segments of [a-zA-Z0-9_-]"),
            Self::InvalidKeyPath { .. } => {
                formatter.write_str("KeyPath must be dot-separated non-empty segments")
            },
        }
    }
}

impl std::error::Error for PrimitiveError {}

impl From<PrimitiveError> for ErrorEnvelope {
    fn from(error: PrimitiveError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());
        match error {
            PrimitiveError::EmptyConfigName { input_length }
            | PrimitiveError::EmptyCollectionId { input_length } => {
                envelope.with_metadata("input_length", input_length.to_string())
            },
            PrimitiveError::ConfigNameTooLong { length } => {
                envelope.with_metadata("length", length.to_string())
            },
            PrimitiveError::InvalidConfigName { input }
            | PrimitiveError::InvalidCollectionId { input }
            | PrimitiveError::InvalidKeyPath { input } => envelope.with_metadata("input", input),
        }
    }
}

/// Name of a configuration object (e.g. `system.site`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConfigName(Box<str>);

impl ConfigName {
    /// Parse a configuration object name.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let raw = input.as_ref();
        let Some(trimmed) = trimmed_non_empty(raw) else {
            return Err(PrimitiveError::EmptyConfigName {
                input_length: raw.len(),
            });
        };

        let length = trimmed.chars().count();
        if length > MAX_CONFIG_NAME_LENGTH {
            return Err(PrimitiveError::ConfigNameTooLong { length });
        }

        if trimmed
            .chars()
            .any(|ch| ch.is_whitespace() || FORBIDDEN_NAME_CHARS.contains(&ch))
        {
            return Err(PrimitiveError::InvalidConfigName {
                input: trimmed.to_owned(),
            });
        }

        Ok(Self(trimmed.to_owned().into_boxed_str()))
    }

    /// Access the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when the name starts with `prefix`.
    #[must_use]
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl AsRef<str> for ConfigName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for ConfigName {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ConfigName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<String> for ConfigName {
    type Error = PrimitiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ConfigName> for String {
    fn from(value: ConfigName) -> Self {
        value.0.into_string()
    }
}

/// Identifier of a store collection.
///
/// The default collection is a distinct variant; stores never report it from
/// `collections()`, so callers can always prepend it without double-processing.
/// `Default` orders before every named collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CollectionId {
    /// The unnamed primary collection.
    #[default]
    Default,
    /// A named override collection (e.g. `language.fr`).
    Named(Box<str>),
}

impl CollectionId {
    /// Parse a named collection identifier.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let raw = input.as_ref();
        let Some(trimmed) = trimmed_non_empty(raw) else {
            return Err(PrimitiveError::EmptyCollectionId {
                input_length: raw.len(),
            });
        };

        if !is_valid_collection_id(trimmed) {
            return Err(PrimitiveError::InvalidCollectionId {
                input: trimmed.to_owned(),
            });
        }

        Ok(Self::Named(trimmed.to_owned().into_boxed_str()))
    }

    /// Returns true for the default collection.
    #[must_use]
    pub const fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }

    /// Returns the collection name, or `None` for the default collection.
    #[must_use]
    pub fn as_named(&self) -> Option<&str> {
        match self {
            Self::Default => None,
            Self::Named(name) => Some(name),
        }
    }

    /// Stable string form; the default collection is the empty string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.as_named().unwrap_or("")
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => formatter.write_str("(default)"),
            Self::Named(name) => formatter.write_str(name),
        }
    }
}

impl TryFrom<String> for CollectionId {
    type Error = PrimitiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            Ok(Self::Default)
        } else {
            Self::parse(value)
        }
    }
}

impl From<CollectionId> for String {
    fn from(value: CollectionId) -> Self {
        match value {
            CollectionId::Default => Self::new(),
            CollectionId::Named(name) => name.into_string(),
        }
    }
}

/// Dot-delimited path into a configuration tree (e.g. `page.front`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyPath(Vec<Box<str>>);

impl KeyPath {
    /// Parse a dot-delimited key path.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let raw = input.as_ref();
        let segments: Vec<Box<str>> = raw.split('.').map(Box::from).collect();
        if raw.is_empty() || segments.iter().any(|segment| segment.is_empty()) {
            return Err(PrimitiveError::InvalidKeyPath {
                input: raw.to_owned(),
            });
        }
        Ok(Self(segments))
    }

    /// Path segments from root to leaf. Never empty.
    #[must_use]
    pub fn segments(&self) -> &[Box<str>] {
        &self.0
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.0 {
            if !first {
                formatter.write_str(".")?;
            }
            formatter.write_str(segment)?;
            first = false;
        }
        Ok(())
    }
}

impl TryFrom<String> for KeyPath {
    type Error = PrimitiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<KeyPath> for String {
    fn from(value: KeyPath) -> Self {
        value.to_string()
    }
}

/// Direction of a synchronization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    /// External snapshot is applied to the active store.
    Import,
    /// Active store is captured into a snapshot.
    Export,
}

impl SyncDirection {
    /// Stable identifier used in logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Export => "export",
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

fn trimmed_non_empty(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn is_valid_collection_id(candidate: &str) -> bool {
    candidate.split('.').all(|segment| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    })
}
