//! Top-level schema assembly: version selection, graph resolution and flattening.

use tracing::info;

use crate::cancel::CancellationToken;
use crate::entities::{ComplexType, ResourceSchema, TypeNames};
use crate::error::TypeLoadError;
use crate::resolver::ResourceGraphResolver;
use crate::types::{TypeNode, TypesDefinitionResult};
use crate::version::select_latest_stable;

#[derive(Debug, Clone)]
pub struct SchemaAssembler {
    resolver: ResourceGraphResolver,
}

impl SchemaAssembler {
    pub fn new(resolver: ResourceGraphResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &ResourceGraphResolver {
        &self.resolver
    }

    /// The API version to resolve: `api_version` when given and non-empty,
    /// otherwise the latest stable version listed for the resource.
    ///
    /// # Errors
    ///
    /// Returns `UnknownResourceType`, `NoVersionsAvailable` or `InvalidApiVersion`
    /// when no version can be chosen.
    pub fn resolve_api_version(
        &self,
        resource_type: &str,
        api_version: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<String, TypeLoadError> {
        match api_version.filter(|v| !v.is_empty()) {
            Some(version) => Ok(version.to_string()),
            None => {
                let versions = self.resolver.get_resource_api_versions(resource_type, cancel)?;
                let selected = select_latest_stable(resource_type, &versions)?;
                info!(resource_type, api_version = %selected, "Selected latest stable API version");
                Ok(selected)
            }
        }
    }

    /// Resolve every type reachable from `resource_type` at the requested (or
    /// latest stable) API version.
    pub fn get_resource_type_definitions(
        &self,
        resource_type: &str,
        api_version: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<TypesDefinitionResult, TypeLoadError> {
        let api_version = self.resolve_api_version(resource_type, api_version, cancel)?;
        self.resolver
            .load_single_resource(resource_type, &api_version, cancel)
    }

    /// Flatten a result: resource types, then resource functions, then everything
    /// else, each in resolution order.
    pub fn get_response(result: &TypesDefinitionResult) -> Vec<ComplexType> {
        let names = TypeNames::new(result);
        result
            .iter()
            .map(|resolved| ComplexType::from_resolved(resolved, &names))
            .collect()
    }

    /// Resolve and flatten in one step.
    pub fn assemble(
        &self,
        resource_type: &str,
        api_version: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ResourceSchema, TypeLoadError> {
        let api_version = self.resolve_api_version(resource_type, api_version, cancel)?;
        let result = self
            .resolver
            .load_single_resource(resource_type, &api_version, cancel)?;

        let resource_type = result
            .resource_types
            .first()
            .and_then(|resolved| match resolved.node.as_ref() {
                TypeNode::Resource(resource) => Some(resource.type_name().to_string()),
                _ => None,
            })
            .unwrap_or_else(|| resource_type.to_string());

        Ok(ResourceSchema {
            resource_type,
            api_version,
            types: Self::get_response(&result),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TypeCache;
    use crate::fetcher::{HttpResponse, HttpTransport, RemoteTypeFetcher};
    use crate::loader::TypeLoader;
    use crate::types::TypeKind;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct FixtureTransport(HashMap<String, String>);

    impl HttpTransport for FixtureTransport {
        fn get(&self, url: &str, _cancel: &CancellationToken) -> Result<HttpResponse, TypeLoadError> {
            let path = url.trim_start_matches("https://store/");
            Ok(self
                .0
                .get(path)
                .map(|body| HttpResponse::ok(body.clone()))
                .unwrap_or(HttpResponse {
                    status: 404,
                    body: String::new(),
                }))
        }
    }

    fn assembler() -> SchemaAssembler {
        let index = json!({
            "resources": {
                "Microsoft.Foo/bars@2021-04-01": { "$ref": "foo/types.json#/3" },
                "Microsoft.Foo/bars@2022-09-01-preview": { "$ref": "foo/types.json#/3" },
                "Microsoft.Foo/bars@2023-01-01": { "$ref": "foo/types.json#/3" }
            },
            "resourceFunctions": {
                "microsoft.foo/bars": {
                    "2023-01-01": [{ "$ref": "foo/types.json#/4" }, { "$ref": "foo/types.json#/5" }]
                }
            }
        });
        let types = json!([
            { "$type": "StringType" },
            { "$type": "ObjectType", "name": "Keys", "properties": { "key": { "type": { "$ref": "#/0" } } } },
            { "$type": "ObjectType", "name": "Props", "properties": { "name": { "type": { "$ref": "#/0" } } } },
            { "$type": "ResourceType", "name": "Microsoft.Foo/bars@2023-01-01", "body": { "$ref": "#/2" } },
            { "$type": "ResourceFunctionType", "name": "listKeys", "resourceType": "Microsoft.Foo/bars", "apiVersion": "2023-01-01", "output": { "$ref": "#/1" } },
            { "$type": "ResourceFunctionType", "name": "regenerateKey", "resourceType": "Microsoft.Foo/bars", "apiVersion": "2023-01-01", "output": { "$ref": "#/1" }, "input": { "$ref": "#/6" } },
            { "$type": "ObjectType", "name": "KeyRequest", "properties": {} }
        ]);
        let files = HashMap::from([
            ("index.json".to_string(), index.to_string()),
            ("foo/types.json".to_string(), types.to_string()),
        ]);
        let fetcher = RemoteTypeFetcher::new("https://store", Arc::new(FixtureTransport(files)));
        let loader = TypeLoader::new(fetcher, Arc::new(TypeCache::default()));
        SchemaAssembler::new(ResourceGraphResolver::new(loader))
    }

    #[test]
    fn missing_or_empty_version_selects_latest_stable() {
        let assembler = assembler();
        let cancel = CancellationToken::new();
        for requested in [None, Some("")] {
            let version = assembler
                .resolve_api_version("Microsoft.Foo/bars", requested, &cancel)
                .unwrap();
            assert_eq!(version, "2023-01-01");
        }
        assert_eq!(
            assembler
                .resolve_api_version("Microsoft.Foo/bars", Some("2021-04-01"), &cancel)
                .unwrap(),
            "2021-04-01"
        );
    }

    #[test]
    fn response_is_ordered_by_partition() {
        let assembler = assembler();
        let result = assembler
            .get_resource_type_definitions("Microsoft.Foo/bars", None, &CancellationToken::new())
            .unwrap();
        assert_eq!(result.resource_types.len(), 1);
        assert_eq!(result.resource_function_types.len(), 2);
        assert_eq!(result.other_complex_types.len(), 4);

        let response = SchemaAssembler::get_response(&result);
        let kinds: Vec<_> = response.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            [
                TypeKind::Resource,
                TypeKind::ResourceFunction,
                TypeKind::ResourceFunction,
                TypeKind::Object,
                TypeKind::Object,
                TypeKind::Object,
                TypeKind::String,
            ]
        );
        assert_eq!(response[1].name, "listKeys");
        assert_eq!(response[2].name, "regenerateKey");
    }

    #[test]
    fn response_has_no_dangling_ids() {
        let schema = assembler()
            .assemble("microsoft.foo/bars", None, &CancellationToken::new())
            .unwrap();
        assert_eq!(schema.resource_type, "Microsoft.Foo/bars");
        assert_eq!(schema.api_version, "2023-01-01");

        let ids: Vec<&str> = schema.types.iter().map(|t| t.id.as_str()).collect();
        for complex in &schema.types {
            for target in complex
                .properties
                .iter()
                .map(|p| p.type_id.as_str())
                .chain(complex.elements.iter().map(|e| e.type_id.as_str()))
            {
                assert!(ids.contains(&target), "dangling id {}", target);
            }
        }
    }

    #[test]
    fn unknown_resource_fails_version_selection() {
        let result = assembler().get_resource_type_definitions(
            "Microsoft.Foo/nope",
            None,
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(TypeLoadError::UnknownResourceType { .. })));
    }
}
