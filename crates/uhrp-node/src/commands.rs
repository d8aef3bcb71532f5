//! Subcommand execution

use std::io::Write;

use anyhow::{Context, anyhow, bail};
use serde_json::{Value, json};
use tracing::debug;
use uhrp_core::pushdrop::{COMPRESSED_KEY_LEN, UNCOMPRESSED_KEY_LEN, is_locking_key_len};
use uhrp_core::{
    CONTENT_HASH_LEN, Clock, CommitmentToken, TopicManager, Transaction, TxOutput,
};
use uhrp_overlay::{LookupService, OverlayConfig, UhrpOverlay};
use uhrp_storage::CommitmentStore;

use crate::config::Command;

/// Run `command` against the configured overlay, writing results to `out`
pub async fn execute(
    command: &Command,
    config: &OverlayConfig,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    if command.uses_index() {
        let overlay = UhrpOverlay::open(config)
            .with_context(|| format!("opening {}", config.storage.db_path.display()))?;
        apply(&overlay, command, out).await
    } else {
        apply(&UhrpOverlay::in_memory(&config.topic), command, out).await
    }
}

/// Parse a query argument; anything that is not JSON is a JSON string
fn parse_query(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn write_json(out: &mut impl Write, value: &impl serde::Serialize) -> anyhow::Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// Execute `command` against an assembled overlay
pub async fn apply<S: CommitmentStore, C: Clock>(
    overlay: &UhrpOverlay<S, C>,
    command: &Command,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        Command::Admit { tx_hex, previous } => {
            let transaction = Transaction::from_hex(tx_hex)?;
            let txid = transaction.txid();
            debug!(%txid, "Submitting transaction");
            let instructions = overlay.submit(txid, &transaction, previous).await?;
            write_json(out, &instructions)
        }

        Command::Spend { outpoint } => {
            overlay.spend(*outpoint).await?;
            writeln!(out, "Spent {outpoint}")?;
            Ok(())
        }

        Command::Evict { outpoint } => {
            overlay.evict(*outpoint).await?;
            writeln!(out, "Evicted {outpoint}")?;
            Ok(())
        }

        Command::Lookup { query } => {
            let query = query.as_deref().map(parse_query);
            debug!(?query, "Running lookup");
            let results = overlay.lookup(query.as_ref()).await?;
            write_json(out, &results)
        }

        Command::EncodeToken {
            url,
            hash,
            expiry,
            size,
            protocol_address,
            locking_key,
            tx,
            satoshis,
        } => {
            let content_hash: [u8; CONTENT_HASH_LEN] = hex::decode(hash)
                .context("content hash is not hex")?
                .try_into()
                .map_err(|bytes: Vec<u8>| {
                    anyhow!(
                        "content hash must be {CONTENT_HASH_LEN} bytes, got {}",
                        bytes.len()
                    )
                })?;
            let locking_key = hex::decode(locking_key).context("locking key is not hex")?;
            if !is_locking_key_len(&locking_key) {
                bail!(
                    "locking key must be {COMPRESSED_KEY_LEN} or {UNCOMPRESSED_KEY_LEN} bytes, got {}",
                    locking_key.len()
                );
            }

            let token = CommitmentToken {
                protocol_address: protocol_address.clone(),
                content_hash,
                url: url.clone(),
                expiry_unix_secs: *expiry,
                size_bytes: *size,
            };
            // Reject anything admission would reject
            CommitmentToken::from_fields(&token.to_fields())?;

            let script = token.to_locking_script(&locking_key);
            let encoded = if *tx {
                Transaction::with_outputs(vec![TxOutput::new(*satoshis, script)]).to_hex()
            } else {
                hex::encode(script)
            };
            writeln!(out, "{encoded}")?;
            Ok(())
        }

        Command::Docs { lookup } => {
            let docs = if *lookup {
                overlay.lookup_service().documentation()
            } else {
                overlay.topic_manager().documentation()
            };
            write!(out, "{docs}")?;
            Ok(())
        }

        Command::Metadata => write_json(
            out,
            &json!({
                "topicManager": overlay.topic_manager().metadata(),
                "lookupService": overlay.lookup_service().metadata(),
            }),
        ),
    }
}
