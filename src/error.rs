//! Error types for type index loading and resource type resolution.

use thiserror::Error;

use crate::types::{CrossFileTypeReference, TypeKind};

/// Errors while fetching, caching, or resolving Bicep types.
#[derive(Debug, Error)]
pub enum TypeLoadError {
    // IO errors (exit code 3)
    #[error("failed to fetch {url}: status code {status}")]
    RemoteFetch { url: String, status: u16 },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("failed to deserialize types from {url}: {message}")]
    TypeParse { url: String, message: String },

    #[error("unable to locate type at index {} in \"{}\" ({len} types available)", .reference.index, .reference.relative_path)]
    InvalidReference {
        reference: CrossFileTypeReference,
        len: usize,
    },

    #[error("type found at reference {reference} is not a {expected} (found {found})")]
    TypeMismatch {
        reference: CrossFileTypeReference,
        expected: TypeKind,
        found: TypeKind,
    },

    // Lookup errors (exit code 2)
    #[error("resource type '{name}' not found in the type index")]
    UnknownResourceType { name: String },

    #[error("api version '{version}' not found for resource type '{name}'")]
    UnknownApiVersion { name: String, version: String },

    #[error("no api versions available for resource type '{name}'")]
    NoVersionsAvailable { name: String },

    #[error("invalid api version \"{version}\": expected YYYY-MM-DD with an optional -suffix")]
    InvalidApiVersion { version: String },

    #[error("operation cancelled")]
    Cancelled,
}

impl TypeLoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            TypeLoadError::RemoteFetch { .. } => 3,
            #[cfg(feature = "remote")]
            TypeLoadError::Network { .. } => 3,
            TypeLoadError::Cancelled => 130,
            _ => 2,
        }
    }

    /// True for errors raised by the transport rather than by the type data.
    pub fn is_transport(&self) -> bool {
        self.exit_code() == 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        let err = TypeLoadError::RemoteFetch {
            url: "https://example.com/index.json".into(),
            status: 404,
        };
        assert_eq!(err.exit_code(), 3);
        assert!(err.is_transport());

        let err = TypeLoadError::UnknownResourceType {
            name: "Microsoft.Foo/bars".into(),
        };
        assert_eq!(err.exit_code(), 2);
        assert!(!err.is_transport());

        assert_eq!(TypeLoadError::Cancelled.exit_code(), 130);
    }

    #[test]
    fn invalid_reference_display() {
        let err = TypeLoadError::InvalidReference {
            reference: CrossFileTypeReference::new("foo/types.json", 12),
            len: 3,
        };
        assert_eq!(
            err.to_string(),
            "unable to locate type at index 12 in \"foo/types.json\" (3 types available)"
        );
    }

    #[test]
    fn type_mismatch_display() {
        let err = TypeLoadError::TypeMismatch {
            reference: CrossFileTypeReference::new("foo/types.json", 1),
            expected: TypeKind::ResourceFunction,
            found: TypeKind::Object,
        };
        assert_eq!(
            err.to_string(),
            "type found at reference foo/types.json#/1 is not a ResourceFunctionType (found ObjectType)"
        );
    }

    #[test]
    fn remote_fetch_display_carries_url_and_status() {
        let err = TypeLoadError::RemoteFetch {
            url: "https://example.com/a/types.json".into(),
            status: 500,
        };
        assert_eq!(
            err.to_string(),
            "failed to fetch https://example.com/a/types.json: status code 500"
        );
    }
}
