use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::constants::DEFAULT_CONFIG_NAME;

/// Command-line arguments for the device-exporter tool.
///
/// Flags override the matching values from the configuration file. Consent is
/// only ever read from the configuration file; there is no flag that grants a
/// permission.
#[derive(Parser, Debug)]
#[clap(name = "device-exporter", about = "Consent-gated device data export and upload")]
pub struct Args {
    /// Path to configuration YAML file
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Device dump directory to read provider data from
    #[clap(short, long)]
    pub source: Option<PathBuf>,

    /// Upload endpoint URL
    #[clap(short, long)]
    pub endpoint: Option<String>,

    /// Replace empty contacts, messages and calls with sample records
    #[clap(long)]
    pub sample_mode: bool,

    /// Build and save the snapshot without uploading it
    #[clap(long)]
    pub skip_upload: bool,

    /// Directory for the snapshot copy and run summary
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands for the exporter.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a default configuration file
    InitConfig {
        /// Path to output configuration file
        #[clap(default_value = DEFAULT_CONFIG_NAME)]
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overrides() {
        let args = Args::parse_from([
            "device-exporter",
            "--config",
            "export.yaml",
            "--source",
            "/dumps/pixel",
            "--endpoint",
            "https://backup.example.org/upload",
            "--sample-mode",
            "-v",
        ]);

        assert_eq!(args.config, Some(PathBuf::from("export.yaml")));
        assert_eq!(args.source, Some(PathBuf::from("/dumps/pixel")));
        assert_eq!(args.endpoint.as_deref(), Some("https://backup.example.org/upload"));
        assert!(args.sample_mode);
        assert!(args.verbose);
        assert!(!args.skip_upload);
        assert!(args.command.is_none());
    }

    #[test]
    fn test_init_config_default_path() {
        let args = Args::parse_from(["device-exporter", "init-config"]);
        match args.command {
            Some(Commands::InitConfig { path }) => assert_eq!(path, PathBuf::from("export_config.yaml")),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
