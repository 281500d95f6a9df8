//! Core types for the Bicep type graph.
//!
//! A published type file is a JSON array of [`TypeNode`]s. Nodes point at each
//! other with `{"$ref": "<path>#/<index>"}` objects, where an empty path means
//! the containing file and a non-empty path is relative to the containing file's
//! directory. Once a file has been fetched its edges are rebased so every
//! [`CrossFileTypeReference`] held in memory is relative to the store's base URL.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Pointer to one type node: the element at `index` of the array stored in the
/// file at `relative_path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawTypeRef", into = "RawTypeRef")]
pub struct CrossFileTypeReference {
    pub relative_path: String,
    pub index: usize,
}

#[derive(Serialize, Deserialize)]
struct RawTypeRef {
    #[serde(rename = "$ref")]
    target: String,
}

impl CrossFileTypeReference {
    pub fn new(relative_path: impl Into<String>, index: usize) -> Self {
        Self {
            relative_path: relative_path.into(),
            index,
        }
    }

    /// Parse the `$ref` string form, e.g. `"compute/types.json#/12"` or `"#/3"`.
    ///
    /// Returns `None` unless the fragment is `/<non-negative integer>`.
    pub fn parse(target: &str) -> Option<Self> {
        let (path, fragment) = target.split_once('#')?;
        let index = fragment.strip_prefix('/')?;
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self::new(path, index.parse().ok()?))
    }

    /// True when the reference points into the file that contains it.
    pub fn is_local(&self) -> bool {
        self.relative_path.is_empty()
    }

    /// Rebase a reference read from `containing_file` so its path is relative
    /// to the store root instead of to that file.
    pub fn rebase(&self, containing_file: &str) -> Self {
        let relative_path = if self.is_local() {
            containing_file.to_string()
        } else if let Some(rooted) = self.relative_path.strip_prefix('/') {
            normalize_path(rooted)
        } else {
            let dir = containing_file
                .rsplit_once('/')
                .map(|(dir, _)| dir)
                .unwrap_or("");
            if dir.is_empty() {
                normalize_path(&self.relative_path)
            } else {
                normalize_path(&format!("{}/{}", dir, self.relative_path))
            }
        };
        Self::new(relative_path, self.index)
    }
}

/// Collapse `.` and `..` segments. Segments that would climb above the root are dropped.
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

impl fmt::Display for CrossFileTypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#/{}", self.relative_path, self.index)
    }
}

impl TryFrom<RawTypeRef> for CrossFileTypeReference {
    type Error = String;

    fn try_from(raw: RawTypeRef) -> Result<Self, Self::Error> {
        Self::parse(&raw.target).ok_or_else(|| format!("invalid type reference \"{}\"", raw.target))
    }
}

impl From<CrossFileTypeReference> for RawTypeRef {
    fn from(reference: CrossFileTypeReference) -> Self {
        RawTypeRef {
            target: reference.to_string(),
        }
    }
}

bitflags! {
    /// Flags on an object property.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PropertyFlags: u32 {
        const REQUIRED = 1;
        const READ_ONLY = 2;
        const WRITE_ONLY = 4;
        const DEPLOY_TIME_CONSTANT = 8;
        const IDENTIFIER = 16;
    }

    /// Flags on a resource type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResourceFlags: u32 {
        const READ_ONLY = 1;
    }

    /// Deployment scopes a resource type can be declared at.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ScopeFlags: u32 {
        const TENANT = 1;
        const MANAGEMENT_GROUP = 2;
        const SUBSCRIPTION = 4;
        const RESOURCE_GROUP = 8;
        const EXTENSION = 16;
    }
}

/// Flags travel as plain integers on the wire; unknown bits are retained.
macro_rules! numeric_flags {
    ($flags:ty, [$(($flag:expr, $label:literal)),* $(,)?]) => {
        impl $flags {
            /// Human-readable names of the set flags, in bit order.
            pub fn labels(&self) -> Vec<&'static str> {
                let mut labels = Vec::new();
                $(
                    if self.contains($flag) {
                        labels.push($label);
                    }
                )*
                labels
            }
        }

        impl Serialize for $flags {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_u32(self.bits())
            }
        }

        impl<'de> Deserialize<'de> for $flags {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                u32::deserialize(deserializer).map(Self::from_bits_retain)
            }
        }
    };
}

numeric_flags!(
    PropertyFlags,
    [
        (PropertyFlags::REQUIRED, "Required"),
        (PropertyFlags::READ_ONLY, "ReadOnly"),
        (PropertyFlags::WRITE_ONLY, "WriteOnly"),
        (PropertyFlags::DEPLOY_TIME_CONSTANT, "DeployTimeConstant"),
        (PropertyFlags::IDENTIFIER, "Identifier"),
    ]
);

numeric_flags!(ResourceFlags, [(ResourceFlags::READ_ONLY, "ReadOnly")]);

numeric_flags!(
    ScopeFlags,
    [
        (ScopeFlags::TENANT, "Tenant"),
        (ScopeFlags::MANAGEMENT_GROUP, "ManagementGroup"),
        (ScopeFlags::SUBSCRIPTION, "Subscription"),
        (ScopeFlags::RESOURCE_GROUP, "ResourceGroup"),
        (ScopeFlags::EXTENSION, "Extension"),
    ]
);

/// A resource declaration: `Microsoft.Foo/bars@2024-01-01` and its body type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceType {
    pub name: String,
    #[serde(default)]
    pub scope_type: ScopeFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only_scopes: Option<ScopeFlags>,
    pub body: CrossFileTypeReference,
    #[serde(default)]
    pub flags: ResourceFlags,
}

impl ResourceType {
    /// Resource type name without the `@apiVersion` suffix.
    pub fn type_name(&self) -> &str {
        self.name
            .split_once('@')
            .map(|(name, _)| name)
            .unwrap_or(&self.name)
    }

    /// API version encoded in the name, if any.
    pub fn api_version(&self) -> Option<&str> {
        self.name.split_once('@').map(|(_, version)| version)
    }
}

/// An invokable resource function such as `listKeys`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceFunctionType {
    pub name: String,
    pub resource_type: String,
    pub api_version: String,
    pub output: CrossFileTypeReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<CrossFileTypeReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectTypeProperty {
    #[serde(rename = "type")]
    pub type_ref: CrossFileTypeReference,
    #[serde(default)]
    pub flags: PropertyFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectType {
    pub name: String,
    #[serde(default)]
    pub properties: IndexMap<String, ObjectTypeProperty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<CrossFileTypeReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitive: Option<bool>,
}

/// Object whose shape is selected by the value of `discriminator`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscriminatedObjectType {
    pub name: String,
    pub discriminator: String,
    #[serde(default)]
    pub base_properties: IndexMap<String, ObjectTypeProperty>,
    #[serde(default)]
    pub elements: IndexMap<String, CrossFileTypeReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayType {
    pub item_type: CrossFileTypeReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionType {
    pub elements: Vec<CrossFileTypeReference>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringLiteralType {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegerType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<i64>,
}

/// One element of a type file, discriminated by `$type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum TypeNode {
    #[serde(rename = "ResourceType")]
    Resource(ResourceType),
    #[serde(rename = "ResourceFunctionType")]
    ResourceFunction(ResourceFunctionType),
    #[serde(rename = "ObjectType")]
    Object(ObjectType),
    #[serde(rename = "DiscriminatedObjectType")]
    DiscriminatedObject(DiscriminatedObjectType),
    #[serde(rename = "ArrayType")]
    Array(ArrayType),
    #[serde(rename = "UnionType")]
    Union(UnionType),
    #[serde(rename = "StringType")]
    String(StringType),
    #[serde(rename = "StringLiteralType")]
    StringLiteral(StringLiteralType),
    #[serde(rename = "IntegerType")]
    Integer(IntegerType),
    #[serde(rename = "BooleanType")]
    Boolean,
    #[serde(rename = "AnyType")]
    Any,
    #[serde(rename = "NullType")]
    Null,
}

/// Tag of a [`TypeNode`], used for role checks and presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TypeKind {
    #[serde(rename = "ResourceType")]
    Resource,
    #[serde(rename = "ResourceFunctionType")]
    ResourceFunction,
    #[serde(rename = "ObjectType")]
    Object,
    #[serde(rename = "DiscriminatedObjectType")]
    DiscriminatedObject,
    #[serde(rename = "ArrayType")]
    Array,
    #[serde(rename = "UnionType")]
    Union,
    #[serde(rename = "StringType")]
    String,
    #[serde(rename = "StringLiteralType")]
    StringLiteral,
    #[serde(rename = "IntegerType")]
    Integer,
    #[serde(rename = "BooleanType")]
    Boolean,
    #[serde(rename = "AnyType")]
    Any,
    #[serde(rename = "NullType")]
    Null,
}

impl TypeKind {
    /// The `$type` discriminator for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Resource => "ResourceType",
            TypeKind::ResourceFunction => "ResourceFunctionType",
            TypeKind::Object => "ObjectType",
            TypeKind::DiscriminatedObject => "DiscriminatedObjectType",
            TypeKind::Array => "ArrayType",
            TypeKind::Union => "UnionType",
            TypeKind::String => "StringType",
            TypeKind::StringLiteral => "StringLiteralType",
            TypeKind::Integer => "IntegerType",
            TypeKind::Boolean => "BooleanType",
            TypeKind::Any => "AnyType",
            TypeKind::Null => "NullType",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TypeNode {
    pub fn kind(&self) -> TypeKind {
        match self {
            TypeNode::Resource(_) => TypeKind::Resource,
            TypeNode::ResourceFunction(_) => TypeKind::ResourceFunction,
            TypeNode::Object(_) => TypeKind::Object,
            TypeNode::DiscriminatedObject(_) => TypeKind::DiscriminatedObject,
            TypeNode::Array(_) => TypeKind::Array,
            TypeNode::Union(_) => TypeKind::Union,
            TypeNode::String(_) => TypeKind::String,
            TypeNode::StringLiteral(_) => TypeKind::StringLiteral,
            TypeNode::Integer(_) => TypeKind::Integer,
            TypeNode::Boolean => TypeKind::Boolean,
            TypeNode::Any => TypeKind::Any,
            TypeNode::Null => TypeKind::Null,
        }
    }

    /// Outgoing edges in declaration order.
    pub fn edges(&self) -> Vec<&CrossFileTypeReference> {
        match self {
            TypeNode::Resource(resource) => vec![&resource.body],
            TypeNode::ResourceFunction(function) => std::iter::once(&function.output)
                .chain(function.input.as_ref())
                .collect(),
            TypeNode::Object(object) => object
                .properties
                .values()
                .map(|p| &p.type_ref)
                .chain(object.additional_properties.as_ref())
                .collect(),
            TypeNode::DiscriminatedObject(object) => object
                .base_properties
                .values()
                .map(|p| &p.type_ref)
                .chain(object.elements.values())
                .collect(),
            TypeNode::Array(array) => vec![&array.item_type],
            TypeNode::Union(union) => union.elements.iter().collect(),
            TypeNode::String(_)
            | TypeNode::StringLiteral(_)
            | TypeNode::Integer(_)
            | TypeNode::Boolean
            | TypeNode::Any
            | TypeNode::Null => Vec::new(),
        }
    }

    fn edges_mut(&mut self) -> Vec<&mut CrossFileTypeReference> {
        match self {
            TypeNode::Resource(resource) => vec![&mut resource.body],
            TypeNode::ResourceFunction(function) => std::iter::once(&mut function.output)
                .chain(function.input.as_mut())
                .collect(),
            TypeNode::Object(object) => object
                .properties
                .values_mut()
                .map(|p| &mut p.type_ref)
                .chain(object.additional_properties.as_mut())
                .collect(),
            TypeNode::DiscriminatedObject(object) => object
                .base_properties
                .values_mut()
                .map(|p| &mut p.type_ref)
                .chain(object.elements.values_mut())
                .collect(),
            TypeNode::Array(array) => vec![&mut array.item_type],
            TypeNode::Union(union) => union.elements.iter_mut().collect(),
            TypeNode::String(_)
            | TypeNode::StringLiteral(_)
            | TypeNode::Integer(_)
            | TypeNode::Boolean
            | TypeNode::Any
            | TypeNode::Null => Vec::new(),
        }
    }

    /// Rewrite every edge read from `containing_file` to be relative to the store root.
    pub fn rebase_edges(&mut self, containing_file: &str) {
        for edge in self.edges_mut() {
            *edge = edge.rebase(containing_file);
        }
    }
}

/// A node reached during resolution, together with the reference it was reached by.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedType {
    pub reference: CrossFileTypeReference,
    pub node: Arc<TypeNode>,
}

/// Output of resolving one resource type at one API version.
///
/// The three partitions are disjoint and every node reachable from the
/// resource appears in exactly one of them, in visit order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypesDefinitionResult {
    pub resource_types: Vec<ResolvedType>,
    pub resource_function_types: Vec<ResolvedType>,
    pub other_complex_types: Vec<ResolvedType>,
}

impl TypesDefinitionResult {
    /// Total number of resolved nodes across all partitions.
    pub fn len(&self) -> usize {
        self.resource_types.len()
            + self.resource_function_types.len()
            + self.other_complex_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries in partition order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedType> {
        self.resource_types
            .iter()
            .chain(&self.resource_function_types)
            .chain(&self.other_complex_types)
    }

    pub(crate) fn push(&mut self, resolved: ResolvedType) {
        match resolved.node.kind() {
            TypeKind::Resource => self.resource_types.push(resolved),
            TypeKind::ResourceFunction => self.resource_function_types.push(resolved),
            _ => self.other_complex_types.push(resolved),
        }
    }
}
