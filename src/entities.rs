//! Presentation-level view of a resolved type graph.
//!
//! A [`ComplexType`] flattens one [`TypeNode`] into a self-describing record: every
//! edge is rendered as the target's id plus a readable type name such as
//! `string`, `'Standard_LRS'`, `Sku[]` or `'a' | 'b'`.

use std::collections::HashMap;

use serde::Serialize;

use crate::types::{
    CrossFileTypeReference, ObjectTypeProperty, ResolvedType, TypeKind, TypeNode,
    TypesDefinitionResult,
};

/// Nesting limit when rendering anonymous array/union names.
const MAX_NAME_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexType {
    /// Canonical reference string, e.g. `storage/types.json#/12`
    pub id: String,
    pub kind: TypeKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<TypeLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyInfo {
    pub name: String,
    pub type_id: String,
    pub type_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A non-property edge: resource body, function input/output, array items,
/// union members, discriminated variants or additional properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeLink {
    pub label: String,
    pub type_id: String,
    pub type_name: String,
}

/// Schema for one resource type at one API version.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSchema {
    pub resource_type: String,
    pub api_version: String,
    pub types: Vec<ComplexType>,
}

/// Reference lookup over one resolution result, used to name edge targets.
pub struct TypeNames<'a> {
    nodes: HashMap<&'a CrossFileTypeReference, &'a TypeNode>,
}

impl<'a> TypeNames<'a> {
    pub fn new(result: &'a TypesDefinitionResult) -> Self {
        let nodes = result
            .iter()
            .map(|resolved| (&resolved.reference, resolved.node.as_ref()))
            .collect();
        Self { nodes }
    }

    /// Readable name of the node behind `reference`. Unknown references render as their id.
    pub fn name_of(&self, reference: &CrossFileTypeReference) -> String {
        self.render(reference, 0)
    }

    fn render(&self, reference: &CrossFileTypeReference, depth: usize) -> String {
        let Some(node) = self.nodes.get(reference) else {
            return reference.to_string();
        };
        if depth > MAX_NAME_DEPTH {
            return "...".to_string();
        }
        match node {
            TypeNode::Resource(resource) => resource.name.clone(),
            TypeNode::ResourceFunction(function) => function.name.clone(),
            TypeNode::Object(object) => object.name.clone(),
            TypeNode::DiscriminatedObject(object) => object.name.clone(),
            TypeNode::Array(array) => {
                let item = self.render(&array.item_type, depth + 1);
                if item.contains(" | ") {
                    format!("({})[]", item)
                } else {
                    format!("{}[]", item)
                }
            }
            TypeNode::Union(union) => union
                .elements
                .iter()
                .map(|element| self.render(element, depth + 1))
                .collect::<Vec<_>>()
                .join(" | "),
            TypeNode::String(_) => "string".to_string(),
            TypeNode::StringLiteral(literal) => format!("'{}'", literal.value),
            TypeNode::Integer(_) => "int".to_string(),
            TypeNode::Boolean => "bool".to_string(),
            TypeNode::Any => "any".to_string(),
            TypeNode::Null => "null".to_string(),
        }
    }

    fn link(&self, label: impl Into<String>, reference: &CrossFileTypeReference) -> TypeLink {
        TypeLink {
            label: label.into(),
            type_id: reference.to_string(),
            type_name: self.name_of(reference),
        }
    }

    fn properties<'p>(
        &self,
        properties: impl IntoIterator<Item = (&'p String, &'p ObjectTypeProperty)>,
    ) -> Vec<PropertyInfo> {
        properties
            .into_iter()
            .map(|(name, property)| PropertyInfo {
                name: name.clone(),
                type_id: property.type_ref.to_string(),
                type_name: self.name_of(&property.type_ref),
                flags: labels(property.flags.labels()),
                description: property.description.clone(),
            })
            .collect()
    }
}

fn labels(labels: Vec<&'static str>) -> Vec<String> {
    labels.into_iter().map(str::to_string).collect()
}

impl ComplexType {
    /// Flatten one resolved node, naming its edge targets through `names`.
    pub fn from_resolved(resolved: &ResolvedType, names: &TypeNames<'_>) -> Self {
        let mut complex = ComplexType {
            id: resolved.reference.to_string(),
            kind: resolved.node.kind(),
            name: names.name_of(&resolved.reference),
            resource_type: None,
            api_version: None,
            flags: Vec::new(),
            scopes: Vec::new(),
            discriminator: None,
            properties: Vec::new(),
            elements: Vec::new(),
        };

        match resolved.node.as_ref() {
            TypeNode::Resource(resource) => {
                complex.name = resource.type_name().to_string();
                complex.resource_type = Some(resource.type_name().to_string());
                complex.api_version = resource.api_version().map(str::to_string);
                complex.flags = labels(resource.flags.labels());
                complex.scopes = labels(resource.scope_type.labels());
                complex.elements.push(names.link("body", &resource.body));
            }
            TypeNode::ResourceFunction(function) => {
                complex.resource_type = Some(function.resource_type.clone());
                complex.api_version = Some(function.api_version.clone());
                complex.elements.push(names.link("output", &function.output));
                if let Some(input) = &function.input {
                    complex.elements.push(names.link("input", input));
                }
            }
            TypeNode::Object(object) => {
                if object.sensitive == Some(true) {
                    complex.flags.push("Sensitive".to_string());
                }
                complex.properties = names.properties(&object.properties);
                if let Some(additional) = &object.additional_properties {
                    complex
                        .elements
                        .push(names.link("additionalProperties", additional));
                }
            }
            TypeNode::DiscriminatedObject(object) => {
                complex.discriminator = Some(object.discriminator.clone());
                complex.properties = names.properties(&object.base_properties);
                complex.elements = object
                    .elements
                    .iter()
                    .map(|(value, reference)| names.link(value.clone(), reference))
                    .collect();
            }
            TypeNode::Array(array) => {
                complex.elements.push(names.link("items", &array.item_type));
            }
            TypeNode::Union(union) => {
                complex.elements = union
                    .elements
                    .iter()
                    .enumerate()
                    .map(|(i, reference)| names.link(i.to_string(), reference))
                    .collect();
            }
            TypeNode::String(string) => {
                if string.sensitive == Some(true) {
                    complex.flags.push("Sensitive".to_string());
                }
            }
            TypeNode::StringLiteral(_)
            | TypeNode::Integer(_)
            | TypeNode::Boolean
            | TypeNode::Any
            | TypeNode::Null => {}
        }

        complex
    }
}
