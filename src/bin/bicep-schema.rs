//! Bicep Schema CLI
//!
//! Command-line interface for resolving Azure resource type schemas.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use bicep_schema::{
    select_latest_stable, CancellationToken, LoaderConfig, ResourceGraphResolver,
    SchemaAssembler, TypeCache, TypeLoadError, TypeLoader,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bicep-schema")]
#[command(about = "Resolve Bicep resource type schemas")]
#[command(version)]
struct Cli {
    /// Type store root (overrides config and BICEP_SCHEMA_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Config file (TOML), read after ./bicep-schema.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the full type graph of a resource type
    Schema {
        /// Resource type, e.g. Microsoft.Storage/storageAccounts
        resource_type: String,

        /// API version (latest stable if not specified)
        #[arg(long, short = 'a')]
        api_version: Option<String>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List the API versions published for a resource type
    Versions {
        /// Resource type, e.g. Microsoft.Storage/storageAccounts
        resource_type: String,
    },

    /// List resource types in the index
    List {
        /// Only show types containing this text (case-insensitive)
        #[arg(long)]
        filter: Option<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let resolver = match build_resolver(cli.config.as_deref(), cli.base_url) {
        Ok(resolver) => resolver,
        Err(code) => return ExitCode::from(code),
    };
    let cancel = CancellationToken::new();

    let result = match cli.command {
        Commands::Schema {
            resource_type,
            api_version,
            output,
            pretty,
        } => run_schema(
            &resolver,
            &resource_type,
            api_version.as_deref(),
            output,
            pretty,
            &cancel,
        ),
        Commands::Versions { resource_type } => run_versions(&resolver, &resource_type, &cancel),
        Commands::List { filter } => run_list(&resolver, filter.as_deref(), &cancel),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn build_resolver(
    config_path: Option<&Path>,
    base_url: Option<String>,
) -> Result<ResourceGraphResolver, u8> {
    let mut config = LoaderConfig::load_from(config_path).map_err(|e| {
        eprintln!("Error loading config: {}", e);
        2u8
    })?;
    if let Some(base_url) = base_url {
        config.base_url = base_url;
    }

    let cache = Arc::new(TypeCache::new(config.cache_ttl()));
    let loader = TypeLoader::from_config(&config, cache).map_err(report)?;
    Ok(ResourceGraphResolver::new(loader))
}

fn report(e: TypeLoadError) -> u8 {
    eprintln!("Error: {}", e);
    u8::try_from(e.exit_code()).unwrap_or(1)
}

fn run_schema(
    resolver: &ResourceGraphResolver,
    resource_type: &str,
    api_version: Option<&str>,
    output: Option<PathBuf>,
    pretty: bool,
    cancel: &CancellationToken,
) -> Result<(), u8> {
    let assembler = SchemaAssembler::new(resolver.clone());
    let schema = assembler
        .assemble(resource_type, api_version, cancel)
        .map_err(report)?;

    let json_output = if pretty {
        serde_json::to_string_pretty(&schema)
    } else {
        serde_json::to_string(&schema)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_versions(
    resolver: &ResourceGraphResolver,
    resource_type: &str,
    cancel: &CancellationToken,
) -> Result<(), u8> {
    let versions = resolver
        .get_resource_api_versions(resource_type, cancel)
        .map_err(report)?;
    let latest = select_latest_stable(resource_type, &versions).ok();

    for version in &versions {
        if latest.as_deref() == Some(version.as_str()) {
            println!("{} (latest)", version);
        } else {
            println!("{}", version);
        }
    }
    Ok(())
}

fn run_list(
    resolver: &ResourceGraphResolver,
    filter: Option<&str>,
    cancel: &CancellationToken,
) -> Result<(), u8> {
    let names = resolver.list_resource_types(cancel).map_err(report)?;
    let filter = filter.map(str::to_ascii_lowercase);

    for name in names {
        let keep = filter
            .as_deref()
            .map_or(true, |f| name.to_ascii_lowercase().contains(f));
        if keep {
            println!("{}", name);
        }
    }
    Ok(())
}
