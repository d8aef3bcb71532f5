use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use uhrp_core::UtxoReference;
use uhrp_logging::{ConsoleFormat, ConsoleStream, FileConfig, LogConfig, RotationStrategy};
use uhrp_overlay::OverlayConfig;

/// Compressed secp256k1 generator point, used when no locking key is given
pub const DEFAULT_LOCKING_KEY: &str =
    "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

/// Protocol address stamped into tokens built by `encode-token`
pub const DEFAULT_PROTOCOL_ADDRESS: &str = "1UHRPYnMHPuQ5Tgb3AF8JXqwKkmZVy5hG";

#[derive(Debug, Parser)]
#[command(
    name = "uhrp-node",
    version,
    about = "Drive the UHRP overlay index from the command line"
)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Database path (overrides the configuration file)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
    /// Topic name (overrides the configuration file)
    #[arg(long, global = true)]
    pub topic: Option<String>,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    /// Human-readable log output instead of JSONL
    #[arg(long, global = true)]
    pub pretty: bool,
    /// Also write JSONL logs to rolling files in this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
    /// Log file rotation (daily, hourly, never)
    #[arg(long, global = true)]
    pub log_rotation: Option<RotationStrategy>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Submit a raw transaction for admission into the topic
    Admit {
        /// Raw transaction, hex-encoded
        tx_hex: String,
        /// Topic coins the transaction consumes, as `txid.index`
        #[arg(long = "previous")]
        previous: Vec<UtxoReference>,
    },
    /// Report a tracked output as spent
    Spend {
        /// Outpoint as `txid.index`
        outpoint: UtxoReference,
    },
    /// Evict an output from the index
    Evict {
        /// Outpoint as `txid.index`
        outpoint: UtxoReference,
    },
    /// Query the index, e.g. `all` or `{"type":"byUrl","value":"https://..."}`
    Lookup {
        /// JSON query; bare words are taken as JSON strings
        query: Option<String>,
    },
    /// Build a commitment locking script (or a one-output transaction)
    EncodeToken {
        /// Advertised download URL
        #[arg(long)]
        url: String,
        /// Content hash, 64 hex characters
        #[arg(long)]
        hash: String,
        /// Expiry, seconds since the Unix epoch
        #[arg(long)]
        expiry: i64,
        /// Content size in bytes
        #[arg(long)]
        size: u64,
        #[arg(long, default_value = DEFAULT_PROTOCOL_ADDRESS)]
        protocol_address: String,
        /// Locking public key, hex-encoded
        #[arg(long, default_value = DEFAULT_LOCKING_KEY)]
        locking_key: String,
        /// Wrap the script in a raw transaction ready for `admit`
        #[arg(long)]
        tx: bool,
        #[arg(long, default_value_t = 1)]
        satoshis: u64,
    },
    /// Print service documentation
    Docs {
        /// Show the lookup service docs instead of the topic manager docs
        #[arg(long)]
        lookup: bool,
    },
    /// Print service metadata as JSON
    Metadata,
}

impl Command {
    /// Whether the command reads or writes the persistent index
    pub fn uses_index(&self) -> bool {
        matches!(
            self,
            Self::Admit { .. } | Self::Spend { .. } | Self::Evict { .. } | Self::Lookup { .. }
        )
    }
}

/// Level used when neither the file nor the command line sets one
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Contents of the `--config` file: overlay keys at the top level plus an
/// optional `[log]` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    #[serde(flatten)]
    pub overlay: OverlayConfig,
    pub log: LogConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            overlay: OverlayConfig::default(),
            log: LogConfig::default().with_level(DEFAULT_LOG_LEVEL),
        }
    }
}

impl NodeConfig {
    pub fn from_toml_str(source: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&source).with_context(|| format!("parsing {}", path.display()))
    }
}

impl Cli {
    /// Configuration file merged with command-line overrides
    pub fn load_config(&self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::load(path)?,
            None => NodeConfig::default(),
        };

        if let Some(db) = &self.db {
            config.overlay = config.overlay.with_db_path(db);
        }
        if let Some(topic) = &self.topic {
            config.overlay = config.overlay.with_topic(topic);
        }

        let log = &mut config.log;
        if let Some(level) = &self.log_level {
            log.level = level.clone();
        }
        if self.pretty {
            log.console.format = ConsoleFormat::Pretty;
            log.console.ansi = true;
        }
        if let Some(dir) = &self.log_dir {
            let file = log.file.take().unwrap_or_default();
            log.file = Some(FileConfig {
                directory: dir.clone(),
                ..file
            });
        }
        if let (Some(rotation), Some(file)) = (self.log_rotation, log.file.as_mut()) {
            file.rotation = rotation;
        }
        // stdout carries command results
        log.console.stream = ConsoleStream::Stderr;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admit() {
        let previous = format!("{}.3", "22".repeat(32));
        let cli = Cli::try_parse_from([
            "uhrp-node",
            "--db",
            "/tmp/x.redb",
            "admit",
            "0100",
            "--previous",
            &previous,
        ])
        .unwrap();

        match &cli.command {
            Command::Admit { tx_hex, previous } => {
                assert_eq!(tx_hex, "0100");
                assert_eq!(previous.len(), 1);
                assert_eq!(previous[0].output_index, 3);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(cli.command.uses_index());
        assert_eq!(
            cli.load_config().unwrap().overlay.storage.db_path,
            PathBuf::from("/tmp/x.redb")
        );
    }

    #[test]
    fn test_admit_takes_no_txid() {
        let txid = "11".repeat(32);
        let parsed = Cli::try_parse_from(["uhrp-node", "admit", "0100", "--txid", txid.as_str()]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_bad_outpoint_is_rejected() {
        assert!(Cli::try_parse_from(["uhrp-node", "spend", "not-an-outpoint"]).is_err());
    }

    #[test]
    fn test_topic_override_and_logging() {
        let cli = Cli::try_parse_from(["uhrp-node", "--topic", "tm_test", "--pretty", "metadata"])
            .unwrap();
        assert!(!cli.command.uses_index());

        let config = cli.load_config().unwrap();
        assert_eq!(config.overlay.topic, "tm_test");
        assert_eq!(config.log.level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.log.console.format, ConsoleFormat::Pretty);
        assert_eq!(config.log.console.stream, ConsoleStream::Stderr);
        assert!(config.log.file.is_none());
    }

    #[test]
    fn test_log_dir_enables_file_sink() {
        let cli = Cli::try_parse_from([
            "uhrp-node",
            "--log-dir",
            "/tmp/uhrp-logs",
            "--log-rotation",
            "hourly",
            "--log-level",
            "debug",
            "metadata",
        ])
        .unwrap();

        let log = cli.load_config().unwrap().log;
        assert_eq!(log.level, "debug");
        let file = log.file.unwrap();
        assert_eq!(file.directory, PathBuf::from("/tmp/uhrp-logs"));
        assert_eq!(file.rotation, RotationStrategy::Hourly);
        assert_eq!(file.prefix, "uhrp");
    }

    #[test]
    fn test_bad_rotation_is_rejected() {
        let parsed =
            Cli::try_parse_from(["uhrp-node", "--log-rotation", "weekly", "metadata"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_log_table_in_config_file() {
        let config = NodeConfig::from_toml_str(
            r#"
            topic = "tm_file"

            [storage]
            db_path = "/tmp/file.redb"

            [log]
            level = "info"

            [log.file]
            directory = "/var/log/uhrp"
            rotation = "never"
            max_files = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.overlay.topic, "tm_file");
        assert_eq!(config.overlay.storage.db_path, PathBuf::from("/tmp/file.redb"));
        assert_eq!(config.log.level, "info");
        let file = config.log.file.unwrap();
        assert_eq!(file.directory, PathBuf::from("/var/log/uhrp"));
        assert_eq!(file.rotation, RotationStrategy::Never);
        assert_eq!(file.max_files, Some(3));
    }

    #[test]
    fn test_config_without_log_table() {
        let config = NodeConfig::from_toml_str("topic = \"tm_file\"\n").unwrap();
        assert_eq!(config.log.level, DEFAULT_LOG_LEVEL);
        assert!(config.log.file.is_none());
    }

    #[test]
    fn test_config_file_with_flag_override() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("node.toml");
        std::fs::write(&path, "topic = \"tm_file\"\n[storage]\ndb_path = \"/tmp/file.redb\"\n")
            .unwrap();

        let cli = Cli::try_parse_from([
            "uhrp-node",
            "--config",
            path.to_str().unwrap(),
            "--db",
            "/tmp/flag.redb",
            "lookup",
            "all",
        ])
        .unwrap();
        let config = cli.load_config().unwrap().overlay;
        assert_eq!(config.topic, "tm_file");
        assert_eq!(config.storage.db_path, PathBuf::from("/tmp/flag.redb"));
    }
}
