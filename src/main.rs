//! Mirror Resolver - Main entry point
//!
//! Prints the selected mirror URL on stdout; all logging goes to stderr so the
//! output can be captured by provisioning scripts.

use std::net::IpAddr;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use mirror_resolver::cli::{Cli, Commands, FilterArgs, ServiceArgs};
use mirror_resolver::{Resolver, ResolverConfig, Selection};

/// Initialize the logger with appropriate settings
fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    // Allows RUST_LOG env var to override
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logger(cli.verbose);
    debug!("CLI arguments parsed: {:?}", cli);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("✗ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Resolve {
            filters,
            geo_loc,
            ip,
            services,
        } => {
            let config = load_config(&services)?;
            let selection = config
                .selection
                .merged_with(&selection_from(&filters, geo_loc, ip)?);
            let resolver = Resolver::from_services(&config.services)?;

            info!("Resolving mirror from {}", resolver.source_location());
            let selected = resolver
                .resolve(&selection)
                .context("Mirror selection failed")?;
            println!("{}", selected.url());
        }
        Commands::List { filters, services } => {
            let config = load_config(&services)?;
            let selection = config
                .selection
                .merged_with(&selection_from(&filters, false, None)?);
            let resolver = Resolver::from_services(&config.services)?;

            let catalog = resolver.load_catalog()?;
            let listed = catalog.matching_all(&selection);
            for record in &listed {
                println!("{}", record);
            }
            info!("{} of {} mirrors listed", listed.len(), catalog.len());
        }
        Commands::Country { code, ip, services } => {
            let config = load_config(&services)?;
            let resolver = Resolver::from_services(&config.services)?;

            let info = match code {
                Some(code) => resolver.country_by_code(&code)?,
                None => resolver.country_by_ip(ip)?,
            };
            println!("{}", info);
        }
        Commands::Validate { config } => {
            info!("Validating configuration file: {:?}", config);
            let loaded = ResolverConfig::load_from_file(&config)?;
            loaded.validate()?;
            println!("✓ Configuration file is valid: {:?}", config);
        }
    }

    Ok(())
}

/// Config file (if any) with command-line service overrides applied.
fn load_config(args: &ServiceArgs) -> Result<ResolverConfig> {
    let mut config = match &args.config {
        Some(path) => ResolverConfig::load_from_file(path)?,
        None => ResolverConfig::new(),
    };

    if let Some(mirrors) = &args.mirrors {
        config.services.mirrors = mirrors.clone();
    }
    if let Some(timeout) = args.timeout {
        config.services.timeout_secs = timeout;
    }

    config.validate()?;
    Ok(config)
}

fn selection_from(filters: &FilterArgs, geo_loc: bool, ip: Option<IpAddr>) -> Result<Selection> {
    let protocol = filters
        .proto
        .as_deref()
        .map(Selection::parse_protocol)
        .transpose()?;

    Ok(Selection {
        name: filters.name.clone(),
        protocol,
        country: filters.country.clone(),
        region: filters.region.clone(),
        geo_loc,
        requester_ip: ip,
    })
}
