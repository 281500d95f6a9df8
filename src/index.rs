//! The type index: which resource types exist, at which API versions, and where
//! their type definitions live.
//!
//! The published `index.json` looks like:
//! ```json
//! {
//!   "resources": {
//!     "Microsoft.Storage/storageAccounts@2023-01-01": { "$ref": "storage/microsoft.storage/2023-01-01/types.json#/120" }
//!   },
//!   "resourceFunctions": {
//!     "microsoft.storage/storageaccounts": {
//!       "2023-01-01": [{ "$ref": "storage/microsoft.storage/2023-01-01/types.json#/140" }]
//!     }
//!   }
//! }
//! ```
//! Other top-level keys are ignored.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::TypeLoadError;
use crate::types::CrossFileTypeReference;

/// Path of the index document relative to the store root.
pub const INDEX_PATH: &str = "index.json";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexDocument {
    #[serde(default)]
    resources: IndexMap<String, CrossFileTypeReference>,
    #[serde(default)]
    resource_functions: IndexMap<String, IndexMap<String, Vec<CrossFileTypeReference>>>,
}

/// All API versions published for one resource type.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceIndexEntry {
    /// Resource type name with its published casing.
    pub name: String,
    /// `(api version, root reference)` pairs in index order.
    pub versions: Vec<(String, CrossFileTypeReference)>,
}

impl ResourceIndexEntry {
    pub fn api_versions(&self) -> impl Iterator<Item = &str> {
        self.versions.iter().map(|(version, _)| version.as_str())
    }

    /// Root reference for `api_version` (case-insensitive).
    pub fn reference(&self, api_version: &str) -> Option<&CrossFileTypeReference> {
        self.versions
            .iter()
            .find(|(version, _)| version.eq_ignore_ascii_case(api_version))
            .map(|(_, reference)| reference)
    }
}

/// Parsed, immutable type index. Lookups ignore ASCII case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeIndex {
    resources: IndexMap<String, ResourceIndexEntry>,
    resource_functions: HashMap<String, HashMap<String, Vec<CrossFileTypeReference>>>,
}

impl TypeIndex {
    /// Parse the JSON index document fetched from `url`.
    ///
    /// # Errors
    ///
    /// Returns `TypeLoadError::TypeParse` if the body is not a valid index.
    pub fn parse(content: &str, url: &str) -> Result<Self, TypeLoadError> {
        let document: IndexDocument =
            serde_json::from_str(content).map_err(|e| TypeLoadError::TypeParse {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Self::from_document(document).map_err(|message| TypeLoadError::TypeParse {
            url: url.to_string(),
            message,
        })
    }

    fn from_document(document: IndexDocument) -> Result<Self, String> {
        let mut resources: IndexMap<String, ResourceIndexEntry> = IndexMap::new();
        for (key, reference) in document.resources {
            let (name, version) = key
                .split_once('@')
                .ok_or_else(|| format!("resource key \"{}\" is missing an @apiVersion", key))?;
            if name.is_empty() || version.is_empty() {
                return Err(format!("resource key \"{}\" is malformed", key));
            }

            let entry = resources
                .entry(name.to_ascii_lowercase())
                .or_insert_with(|| ResourceIndexEntry {
                    name: name.to_string(),
                    versions: Vec::new(),
                });
            if entry.reference(version).is_none() {
                entry
                    .versions
                    .push((version.to_string(), reference.rebase(INDEX_PATH)));
            }
        }

        let mut resource_functions: HashMap<String, HashMap<String, Vec<CrossFileTypeReference>>> =
            HashMap::new();
        for (name, versions) in document.resource_functions {
            let by_version = resource_functions
                .entry(name.to_ascii_lowercase())
                .or_default();
            for (version, references) in versions {
                by_version
                    .entry(version.to_ascii_lowercase())
                    .or_default()
                    .extend(references.iter().map(|r| r.rebase(INDEX_PATH)));
            }
        }

        Ok(Self {
            resources,
            resource_functions,
        })
    }

    /// Look up a resource type by name (case-insensitive).
    pub fn resource(&self, name: &str) -> Option<&ResourceIndexEntry> {
        self.resources.get(&name.to_ascii_lowercase())
    }

    /// Resource type names with their published casing, in index order.
    pub fn resource_names(&self) -> impl Iterator<Item = &str> {
        self.resources.values().map(|entry| entry.name.as_str())
    }

    /// Resource function references published for one resource type and API version.
    pub fn resource_functions(&self, name: &str, api_version: &str) -> &[CrossFileTypeReference] {
        self.resource_functions
            .get(&name.to_ascii_lowercase())
            .and_then(|by_version| by_version.get(&api_version.to_ascii_lowercase()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of distinct resource types.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
