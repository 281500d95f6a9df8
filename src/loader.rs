//! Cached loading of the type index and of individual type nodes.
//!
//! [`TypeLoader`] sits between the graph resolver and the network. The index is
//! cached under a single key; nodes are cached per reference and per role
//! (resource, resource function, generic). A [`LoadSession`] scopes one resolution
//! request: it carries the caller's cancellation token and remembers the files
//! already parsed during that request, so several indices into one file cost a
//! single fetch. The session memo is dropped with the request and never outlives it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheRole, TypeCache};
use crate::cancel::CancellationToken;
use crate::error::TypeLoadError;
use crate::fetcher::RemoteTypeFetcher;
use crate::index::TypeIndex;
use crate::types::{CrossFileTypeReference, TypeNode};

#[cfg(feature = "remote")]
use crate::config::LoaderConfig;
#[cfg(feature = "remote")]
use crate::fetcher::ReqwestTransport;

/// Per-request state for a sequence of loads.
pub struct LoadSession<'a> {
    cancel: &'a CancellationToken,
    files: HashMap<String, Arc<Vec<Arc<TypeNode>>>>,
}

impl<'a> LoadSession<'a> {
    pub fn new(cancel: &'a CancellationToken) -> Self {
        Self {
            cancel,
            files: HashMap::new(),
        }
    }

    pub fn cancel(&self) -> &CancellationToken {
        self.cancel
    }

    /// Number of distinct files fetched during this session.
    pub fn fetched_files(&self) -> usize {
        self.files.len()
    }
}

/// Loads the type index and type nodes through a shared [`TypeCache`].
#[derive(Clone)]
pub struct TypeLoader {
    fetcher: RemoteTypeFetcher,
    cache: Arc<TypeCache>,
}

impl fmt::Debug for TypeLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeLoader")
            .field("base_url", &self.fetcher.base_url())
            .field("cached_entries", &self.cache.len())
            .finish()
    }
}

impl TypeLoader {
    pub fn new(fetcher: RemoteTypeFetcher, cache: Arc<TypeCache>) -> Self {
        Self { fetcher, cache }
    }

    /// Build a loader that talks to `config.base_url` over HTTP.
    ///
    /// # Errors
    ///
    /// Returns `TypeLoadError::Network` if the HTTP client cannot be constructed.
    #[cfg(feature = "remote")]
    pub fn from_config(config: &LoaderConfig, cache: Arc<TypeCache>) -> Result<Self, TypeLoadError> {
        let transport =
            ReqwestTransport::new(config.http_timeout()).map_err(|source| TypeLoadError::Network {
                url: config.base_url.clone(),
                source,
            })?;
        let fetcher = RemoteTypeFetcher::new(config.base_url.clone(), Arc::new(transport));
        Ok(Self::new(fetcher, cache))
    }

    pub fn fetcher(&self) -> &RemoteTypeFetcher {
        &self.fetcher
    }

    pub fn cache(&self) -> &Arc<TypeCache> {
        &self.cache
    }

    /// The type index, from cache when fresh, otherwise fetched and cached.
    ///
    /// # Errors
    ///
    /// Returns `TypeLoadError::RemoteFetch` or `TypeLoadError::TypeParse` when the
    /// index cannot be retrieved; nothing is cached in that case.
    pub fn load_index(&self, cancel: &CancellationToken) -> Result<Arc<TypeIndex>, TypeLoadError> {
        if let Some(index) = self.cache.index() {
            return Ok(index);
        }

        let index = Arc::new(self.fetcher.fetch_index(cancel)?);
        cancel.ensure_not_cancelled()?;
        self.cache.store_index(index.clone());
        Ok(index)
    }

    /// Load a node that must be a `ResourceType`.
    pub fn load_resource_type(
        &self,
        reference: &CrossFileTypeReference,
        session: &mut LoadSession<'_>,
    ) -> Result<Arc<TypeNode>, TypeLoadError> {
        self.load_as(CacheRole::Resource, reference, session)
    }

    /// Load a node that must be a `ResourceFunctionType`.
    pub fn load_resource_function_type(
        &self,
        reference: &CrossFileTypeReference,
        session: &mut LoadSession<'_>,
    ) -> Result<Arc<TypeNode>, TypeLoadError> {
        self.load_as(CacheRole::ResourceFunction, reference, session)
    }

    /// Load a node of any kind.
    pub fn load_type(
        &self,
        reference: &CrossFileTypeReference,
        session: &mut LoadSession<'_>,
    ) -> Result<Arc<TypeNode>, TypeLoadError> {
        self.load_as(CacheRole::Generic, reference, session)
    }

    fn load_as(
        &self,
        role: CacheRole,
        reference: &CrossFileTypeReference,
        session: &mut LoadSession<'_>,
    ) -> Result<Arc<TypeNode>, TypeLoadError> {
        if let Some(node) = self.cache.get_type(role, reference) {
            return Ok(node);
        }

        let node = self.load_from_remote(reference, session)?;
        if let Some(expected) = role.expected_kind() {
            if node.kind() != expected {
                return Err(TypeLoadError::TypeMismatch {
                    reference: reference.clone(),
                    expected,
                    found: node.kind(),
                });
            }
        }

        session.cancel.ensure_not_cancelled()?;
        self.cache.store_type(role, reference, node.clone());
        Ok(node)
    }

    fn load_from_remote(
        &self,
        reference: &CrossFileTypeReference,
        session: &mut LoadSession<'_>,
    ) -> Result<Arc<TypeNode>, TypeLoadError> {
        let memoized = session.files.get(&reference.relative_path).cloned();
        let nodes = match memoized {
            Some(nodes) => {
                debug!(path = %reference.relative_path, "reusing file fetched earlier in this request");
                nodes
            }
            None => {
                let fetched = self
                    .fetcher
                    .fetch_types(&reference.relative_path, session.cancel)?;
                let nodes = Arc::new(fetched.into_iter().map(Arc::new).collect::<Vec<_>>());
                session
                    .files
                    .insert(reference.relative_path.clone(), nodes.clone());
                nodes
            }
        };

        nodes
            .get(reference.index)
            .cloned()
            .ok_or_else(|| TypeLoadError::InvalidReference {
                reference: reference.clone(),
                len: nodes.len(),
            })
    }
}
