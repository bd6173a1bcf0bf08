//! What one generation run is asked to do.

use crate::error::CertgenError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Identifier naming every scratch file of a run and the published objects.
///
/// A fresh UUID v4 unless the caller supplies one; supplied ids are limited
/// to `[A-Za-z0-9_-]{1,128}` so they are safe in file names and keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactId(String);

impl ArtifactId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn parse(id: impl Into<String>) -> Result<Self, CertgenError> {
        let id = id.into();
        let valid = (1..=128).contains(&id.len())
            && id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if valid {
            Ok(Self(id))
        } else {
            Err(CertgenError::InvalidArtifactId { id })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArtifactId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ArtifactId {
    type Error = CertgenError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<ArtifactId> for String {
    fn from(id: ArtifactId) -> Self {
        id.0
    }
}

/// Placeholder token → value, iterated in sorted token order.
///
/// Tokens are matched literally; `{{…}}` is only a convention. Empty tokens
/// are refused because they would match everywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldValues(BTreeMap<String, String>);

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one token.
    pub fn insert(
        &mut self,
        token: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Option<String>, CertgenError> {
        let token = token.into();
        if token.is_empty() {
            return Err(CertgenError::Config(
                "placeholder tokens must not be empty".into(),
            ));
        }
        Ok(self.0.insert(token, value.into()))
    }

    /// Builder-style [`FieldValues::insert`].
    pub fn with(
        mut self,
        token: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, CertgenError> {
        self.insert(token, value)?;
        Ok(self)
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.0.get(token).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge `other` into `self`; entries of `other` win.
    pub fn extend(&mut self, other: FieldValues) {
        self.0.extend(other.0);
    }

    /// Parse a JSON object of string values.
    pub fn from_json(json: &str) -> Result<Self, CertgenError> {
        let map: BTreeMap<String, String> = serde_json::from_str(json).map_err(|e| {
            CertgenError::Config(format!("field values must be a JSON object of strings: {e}"))
        })?;
        Self::try_from(map)
    }

    /// Read a JSON object of string values from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CertgenError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            CertgenError::Config(format!("cannot read fields file '{}': {e}", path.display()))
        })?;
        Self::from_json(&json)
    }
}

impl TryFrom<BTreeMap<String, String>> for FieldValues {
    type Error = CertgenError;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        if map.contains_key("") {
            return Err(CertgenError::Config(
                "placeholder tokens must not be empty".into(),
            ));
        }
        Ok(Self(map))
    }
}

impl<'de> Deserialize<'de> for FieldValues {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, String>::deserialize(deserializer)?;
        FieldValues::try_from(map).map_err(serde::de::Error::custom)
    }
}

/// One certificate to generate. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Storage key of the template deck.
    pub template_key: String,
    pub fields: FieldValues,
    /// Fixed id for the run; a fresh UUID is used when absent.
    #[serde(default)]
    pub artifact_id: Option<ArtifactId>,
}

impl GenerationRequest {
    pub fn new(template_key: impl Into<String>, fields: FieldValues) -> Self {
        Self {
            template_key: template_key.into(),
            fields,
            artifact_id: None,
        }
    }

    pub fn with_artifact_id(mut self, id: ArtifactId) -> Self {
        self.artifact_id = Some(id);
        self
    }
}
