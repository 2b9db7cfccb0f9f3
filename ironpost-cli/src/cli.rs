//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Ironpost -- container layer vulnerability matching.
///
/// Use `ironpost <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "ironpost", version, about, long_about = None)]
pub struct Cli {
    /// Path to the ironpost.toml configuration file.
    #[arg(short, long, default_value = "ironpost.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and query the vulnerability store.
    Vulns(VulnsArgs),

    /// Identify the distribution of unpacked image layers.
    Identify(IdentifyArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- vulns ----

/// Vulnerability store operations.
#[derive(Args, Debug)]
pub struct VulnsArgs {
    #[command(subcommand)]
    pub action: VulnsAction,
}

#[derive(Subcommand, Debug)]
pub enum VulnsAction {
    /// Insert vulnerabilities from a JSON array file.
    Load {
        /// JSON file containing an array of vulnerability objects.
        file: PathBuf,
    },
    /// Match index records against the store.
    Get {
        /// JSON file containing an array of index records.
        file: PathBuf,

        /// Distribution attribute to match on (repeatable). Defaults to `[vuln].matchers`.
        #[arg(short, long = "matcher")]
        matchers: Vec<String>,
    },
}

// ---- identify ----

/// Run distribution scanners over unpacked layer directories.
#[derive(Args, Debug)]
pub struct IdentifyArgs {
    /// Layer directories, bottom layer first.
    #[arg(required = true)]
    pub layers: Vec<PathBuf>,

    /// JSON array of packages found in the image; when given, the detected
    /// distribution is joined with them and matched against the store.
    #[arg(long)]
    pub packages: Option<PathBuf>,
}

// ---- config ----

/// Manage ironpost configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, vuln, indexer).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_vulns_load() {
        let cli = Cli::try_parse_from(["ironpost", "vulns", "load", "vulns.json"])
            .expect("should parse 'vulns load'");
        match cli.command {
            Commands::Vulns(args) => match args.action {
                VulnsAction::Load { file } => assert_eq!(file, PathBuf::from("vulns.json")),
                _ => panic!("expected Load action"),
            },
            _ => panic!("expected Vulns command"),
        }
    }

    #[test]
    fn test_cli_parse_vulns_get_default_matchers() {
        let cli = Cli::try_parse_from(["ironpost", "vulns", "get", "records.json"])
            .expect("should parse 'vulns get'");
        match cli.command {
            Commands::Vulns(args) => match args.action {
                VulnsAction::Get { file, matchers } => {
                    assert_eq!(file, PathBuf::from("records.json"));
                    assert!(matchers.is_empty(), "matchers should default to empty");
                }
                _ => panic!("expected Get action"),
            },
            _ => panic!("expected Vulns command"),
        }
    }

    #[test]
    fn test_cli_parse_vulns_get_repeated_matchers() {
        let cli = Cli::try_parse_from([
            "ironpost",
            "vulns",
            "get",
            "records.json",
            "--matcher",
            "distribution_did",
            "-m",
            "distribution_version_id",
        ])
        .expect("should parse repeated matchers");
        match cli.command {
            Commands::Vulns(args) => match args.action {
                VulnsAction::Get { matchers, .. } => {
                    assert_eq!(matchers, vec!["distribution_did", "distribution_version_id"]);
                }
                _ => panic!("expected Get action"),
            },
            _ => panic!("expected Vulns command"),
        }
    }

    #[test]
    fn test_cli_parse_identify_layers() {
        let cli = Cli::try_parse_from(["ironpost", "identify", "/layers/base", "/layers/app"])
            .expect("should parse identify");
        match cli.command {
            Commands::Identify(args) => {
                assert_eq!(args.layers.len(), 2);
                assert!(args.packages.is_none());
            }
            _ => panic!("expected Identify command"),
        }
    }

    #[test]
    fn test_cli_parse_identify_with_packages() {
        let cli = Cli::try_parse_from([
            "ironpost",
            "identify",
            "/layers/base",
            "--packages",
            "pkgs.json",
        ])
        .expect("should parse identify with packages");
        match cli.command {
            Commands::Identify(args) => {
                assert_eq!(args.packages, Some(PathBuf::from("pkgs.json")));
            }
            _ => panic!("expected Identify command"),
        }
    }

    #[test]
    fn test_cli_parse_identify_requires_layer() {
        let args = Cli::try_parse_from(["ironpost", "identify"]);
        assert!(args.is_err(), "identify without layers should fail");
    }

    #[test]
    fn test_cli_parse_config_validate() {
        let cli = Cli::try_parse_from(["ironpost", "config", "validate"])
            .expect("should parse 'config validate'");
        match cli.command {
            Commands::Config(config_args) => match config_args.action {
                ConfigAction::Validate => {}
                _ => panic!("expected Validate action"),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let cli = Cli::try_parse_from(["ironpost", "config", "show", "--section", "vuln"])
            .expect("should parse config show with section");
        match cli.command {
            Commands::Config(config_args) => match config_args.action {
                ConfigAction::Show { section } => {
                    assert_eq!(section, Some("vuln".to_owned()));
                }
                _ => panic!("expected Show action"),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "ironpost",
            "-c",
            "/custom/config.toml",
            "config",
            "validate",
            "--log-level",
            "debug",
            "--output",
            "json",
        ])
        .expect("should parse global flags after subcommand");
        assert_eq!(cli.config, PathBuf::from("/custom/config.toml"));
        assert_eq!(cli.log_level, Some("debug".to_owned()));
        assert!(matches!(cli.output, OutputFormat::Json));
    }

    #[test]
    fn test_cli_parse_missing_command_fails() {
        let args = Cli::try_parse_from(["ironpost"]);
        assert!(args.is_err(), "should fail when no command provided");
    }

    #[test]
    fn test_cli_verify_command_structure() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_name(), "ironpost");

        let subcommands: Vec<_> = cmd.get_subcommands().map(|s| s.get_name()).collect();
        for expected in ["vulns", "identify", "config"] {
            assert!(
                subcommands.contains(&expected),
                "should have '{expected}' subcommand"
            );
        }
    }
}
