//! Bicep Schema Resolver
//!
//! Resolves Azure resource type schemas from the sharded JSON type store published
//! by `bicep-types-az`.
//!
//! The store is an `index.json` mapping `Namespace/type@apiVersion` to a reference
//! into one of many `types.json` files. Each type file is an array of type nodes
//! that point at each other (and at nodes in other files) with
//! `{"$ref": "<path>#/<index>"}`. Resolving a resource walks those references and
//! returns every reachable node exactly once.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bicep_schema::{
//!     CancellationToken, LoaderConfig, ResourceGraphResolver, SchemaAssembler, TypeCache,
//!     TypeLoader,
//! };
//!
//! let config = LoaderConfig::load().unwrap();
//! let cache = Arc::new(TypeCache::new(config.cache_ttl()));
//! let loader = TypeLoader::from_config(&config, cache).unwrap();
//! let assembler = SchemaAssembler::new(ResourceGraphResolver::new(loader));
//!
//! let schema = assembler
//!     .assemble("Microsoft.Storage/storageAccounts", None, &CancellationToken::new())
//!     .unwrap();
//! println!("{} types at {}", schema.types.len(), schema.api_version);
//! ```
//!
//! # Caching
//!
//! | Entry | Key | Lifetime |
//! |-------|-----|----------|
//! | Type index | fixed | `cache_ttl` |
//! | Resource node | `bicep_az_resource_type_<ref>` | `cache_ttl` |
//! | Resource function node | `bicep_az_function_type_<ref>` | `cache_ttl` |
//! | Any other node | `bicep_az_type_<ref>` | `cache_ttl` |
//!
//! Within one resolution each file is fetched at most once, however many of its
//! nodes are reached.

mod cache;
mod cancel;
mod config;
mod entities;
mod error;
mod fetcher;
mod index;
mod loader;
mod resolver;
mod schema;
mod types;
mod version;

pub use cache::{CacheRole, Clock, ManualClock, SystemClock, TypeCache, DEFAULT_CACHE_TTL};
pub use cancel::CancellationToken;
pub use config::{LoaderConfig, DEFAULT_BASE_URL};
pub use entities::{ComplexType, PropertyInfo, ResourceSchema, TypeLink, TypeNames};
pub use error::TypeLoadError;
pub use fetcher::{parse_type_file, HttpResponse, HttpTransport, RemoteTypeFetcher};
pub use index::{ResourceIndexEntry, TypeIndex, INDEX_PATH};
pub use loader::{LoadSession, TypeLoader};
pub use resolver::ResourceGraphResolver;
pub use schema::SchemaAssembler;
pub use types::{
    ArrayType, CrossFileTypeReference, DiscriminatedObjectType, IntegerType, ObjectType,
    ObjectTypeProperty, PropertyFlags, ResolvedType, ResourceFlags, ResourceFunctionType,
    ResourceType, ScopeFlags, StringLiteralType, StringType, TypeKind, TypeNode,
    TypesDefinitionResult, UnionType,
};
pub use version::{select_latest_stable, ApiVersion};

pub use config_crate::ConfigError;

#[cfg(feature = "remote")]
pub use fetcher::ReqwestTransport;
