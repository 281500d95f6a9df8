//! Resource graph resolution: from a resource type name and API version to the
//! closed set of type nodes reachable from it.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, info};

use crate::cancel::CancellationToken;
use crate::error::TypeLoadError;
use crate::index::{ResourceIndexEntry, TypeIndex};
use crate::loader::{LoadSession, TypeLoader};
use crate::types::{CrossFileTypeReference, ResolvedType, TypesDefinitionResult};

/// Walks the cross-file type graph of one resource.
#[derive(Debug, Clone)]
pub struct ResourceGraphResolver {
    loader: TypeLoader,
}

impl ResourceGraphResolver {
    pub fn new(loader: TypeLoader) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &TypeLoader {
        &self.loader
    }

    /// All API versions the index lists for `resource_type`.
    ///
    /// # Errors
    ///
    /// Returns `TypeLoadError::UnknownResourceType` if the index has no such resource.
    pub fn get_resource_api_versions(
        &self,
        resource_type: &str,
        cancel: &CancellationToken,
    ) -> Result<BTreeSet<String>, TypeLoadError> {
        let index = self.loader.load_index(cancel)?;
        let entry = find_resource(&index, resource_type)?;
        Ok(entry.api_versions().map(str::to_string).collect())
    }

    /// Every resource type name in the index, sorted case-insensitively.
    pub fn list_resource_types(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, TypeLoadError> {
        let index = self.loader.load_index(cancel)?;
        let mut names: Vec<String> = index.resource_names().map(str::to_string).collect();
        names.sort_by_key(|name| name.to_ascii_lowercase());
        Ok(names)
    }

    /// Resolve `resource_type` at exactly `api_version`.
    ///
    /// Starts from the resource's root node and the resource functions the index
    /// publishes for it, then follows every edge breadth-first. Each distinct
    /// reference is loaded once, so shared nodes and cycles appear once in the result.
    ///
    /// # Errors
    ///
    /// Lookup misses yield `UnknownResourceType` / `UnknownApiVersion`. Any load
    /// failure aborts the whole resolution; no partial result is returned.
    pub fn load_single_resource(
        &self,
        resource_type: &str,
        api_version: &str,
        cancel: &CancellationToken,
    ) -> Result<TypesDefinitionResult, TypeLoadError> {
        let index = self.loader.load_index(cancel)?;
        let entry = find_resource(&index, resource_type)?;
        let root = entry
            .reference(api_version)
            .ok_or_else(|| TypeLoadError::UnknownApiVersion {
                name: entry.name.clone(),
                version: api_version.to_string(),
            })?
            .clone();

        info!(resource_type = %entry.name, api_version, root = %root, "Resolving resource type");

        let mut session = LoadSession::new(cancel);
        let mut result = TypesDefinitionResult::default();
        let mut visited: HashSet<CrossFileTypeReference> = HashSet::new();
        let mut queue: VecDeque<CrossFileTypeReference> = VecDeque::new();

        let resource = self.loader.load_resource_type(&root, &mut session)?;
        visited.insert(root.clone());
        enqueue_edges(&resource.edges(), &mut visited, &mut queue);
        result.push(ResolvedType {
            reference: root,
            node: resource,
        });

        for function_ref in index.resource_functions(&entry.name, api_version) {
            if !visited.insert(function_ref.clone()) {
                continue;
            }
            let function = self
                .loader
                .load_resource_function_type(function_ref, &mut session)?;
            enqueue_edges(&function.edges(), &mut visited, &mut queue);
            result.push(ResolvedType {
                reference: function_ref.clone(),
                node: function,
            });
        }

        while let Some(reference) = queue.pop_front() {
            let node = self.loader.load_type(&reference, &mut session)?;
            enqueue_edges(&node.edges(), &mut visited, &mut queue);
            result.push(ResolvedType { reference, node });
        }

        debug!(
            resources = result.resource_types.len(),
            functions = result.resource_function_types.len(),
            others = result.other_complex_types.len(),
            files = session.fetched_files(),
            "Resolved resource type graph"
        );
        Ok(result)
    }
}

/// Queue every edge not seen before in this resolution.
fn enqueue_edges(
    edges: &[&CrossFileTypeReference],
    visited: &mut HashSet<CrossFileTypeReference>,
    queue: &mut VecDeque<CrossFileTypeReference>,
) {
    for edge in edges {
        if visited.insert((*edge).clone()) {
            queue.push_back((*edge).clone());
        }
    }
}

fn find_resource<'a>(
    index: &'a Arc<TypeIndex>,
    resource_type: &str,
) -> Result<&'a ResourceIndexEntry, TypeLoadError> {
    index
        .resource(resource_type)
        .ok_or_else(|| TypeLoadError::UnknownResourceType {
            name: resource_type.to_string(),
        })
}
