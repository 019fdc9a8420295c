use clap::{Args, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// Mirror Resolver - pick one download mirror, deterministically
#[derive(Parser, Debug)]
#[command(name = "mirror-resolver")]
#[command(about = "Select a download mirror by name, protocol, country, region or location")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the selection to a single mirror URL (printed on stdout)
    Resolve {
        #[command(flatten)]
        filters: FilterArgs,

        /// Fall back to IP geolocation when criteria leave zero or several mirrors
        #[arg(short, long)]
        geo_loc: bool,

        /// Geolocate this address instead of the caller's public IP
        #[arg(long, requires = "geo_loc")]
        ip: Option<IpAddr>,

        #[command(flatten)]
        services: ServiceArgs,
    },
    /// List catalog mirrors, optionally filtered
    List {
        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        services: ServiceArgs,
    },
    /// Show country metadata for an IP address or country code
    Country {
        /// Country code (e.g., IT or ITA)
        #[arg(short, long, conflicts_with = "ip")]
        code: Option<String>,

        /// IP address to locate (defaults to the caller's public IP)
        #[arg(long)]
        ip: Option<IpAddr>,

        #[command(flatten)]
        services: ServiceArgs,
    },
    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        config: PathBuf,
    },
}

/// Selection criteria shared by `resolve` and `list`.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Mirror name prefix (case-insensitive)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Protocol (http, https, ftp, rsync)
    #[arg(short, long)]
    pub proto: Option<String>,

    /// Country code or name
    #[arg(short, long)]
    pub country: Option<String>,

    /// Region (e.g., Europe)
    #[arg(short, long)]
    pub region: Option<String>,
}

/// Service locations shared by every network command.
#[derive(Args, Debug, Clone, Default)]
pub struct ServiceArgs {
    /// Configuration file providing defaults for every flag
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Mirror catalog URL or local path
    #[arg(short, long)]
    pub mirrors: Option<String>,

    /// Per-request timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_flags() {
        let cli = Cli::parse_from([
            "mirror-resolver",
            "resolve",
            "--proto",
            "https",
            "--country",
            "IT",
            "--geo-loc",
            "--ip",
            "1.2.3.4",
        ]);
        match cli.command {
            Commands::Resolve {
                filters,
                geo_loc,
                ip,
                ..
            } => {
                assert_eq!(filters.proto.as_deref(), Some("https"));
                assert_eq!(filters.country.as_deref(), Some("IT"));
                assert!(geo_loc);
                assert_eq!(ip, Some("1.2.3.4".parse().unwrap()));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_ip_requires_geo_loc() {
        let result = Cli::try_parse_from(["mirror-resolver", "resolve", "--ip", "1.2.3.4"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_country_code_conflicts_with_ip() {
        let result = Cli::try_parse_from([
            "mirror-resolver",
            "country",
            "--code",
            "IT",
            "--ip",
            "1.2.3.4",
        ]);
        assert!(result.is_err());
    }
}
