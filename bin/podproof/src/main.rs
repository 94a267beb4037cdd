//! podproof binary

use std::fs;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use impactledger_anchor::AnchorConfig;
use impactledger_merkle::{hash_json, Digest, MerkleProof};

mod cli;
mod commands;
mod input;

use cli::{Cli, Command};
use commands::{AnchorOutput, BuildOutput};
use input::{read_json, BatchInput};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine readable
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = AnchorConfig::from_env();

    match cli.command {
        Command::Hash { input } => {
            for leaf in commands::hash(&read_json(&input)?)? {
                println!("{leaf}");
            }
        }

        Command::Build { batch_id, input, out } => {
            let sealed = commands::build(&batch_id, BatchInput::load(&input)?)?;
            let output = BuildOutput::from(&sealed);
            match out {
                Some(path) => {
                    fs::write(&path, to_json(&output)?)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!("✓ Wrote {} proofs to {}", output.leaf_count, path.display());
                    println!("{}", output.merkle_root);
                }
                None => println!("{}", to_json(&output)?),
            }
        }

        Command::Verify { leaf, record, proof, root, bundle } => {
            let leaf = match (leaf, record) {
                (Some(hex), _) => Some(Digest::from_hex(&hex)?),
                (None, Some(path)) => Some(hash_json(&read_json(&path)?)?),
                (None, None) => None,
            };
            let bundle = bundle
                .map(|path| -> Result<MerkleProof> {
                    serde_json::from_value(read_json(&path)?)
                        .with_context(|| format!("{} is not a proof bundle", path.display()))
                })
                .transpose()?;

            if commands::verify(leaf, &proof, root.as_deref(), bundle)? {
                println!("valid");
            } else {
                println!("invalid");
                return Ok(ExitCode::FAILURE);
            }
        }

        Command::Calldata { batch_id, root, signer } => {
            let signer = commands::signer(signer, &config)?;
            info!("Target: {} on chain {}", config.contract_address, config.chain_id);
            println!("{}", commands::calldata(&batch_id, &root, &signer)?);
        }

        Command::Anchor { batch_id, input, signer } => {
            let signer = commands::signer(signer, &config)?;

            info!("Configuration:");
            info!("  Contract:     {}", config.contract_address);
            info!("  Chain ID:     {}", config.chain_id);
            info!("  Call timeout: {}s", config.call_timeout_secs);
            info!("  Attempts:     {}", config.max_attempts);
            info!("  Ledger:       in-memory (dry run)");

            let sealed = commands::build(&batch_id, BatchInput::load(&input)?)?;
            let output: AnchorOutput = commands::anchor_dry_run(&sealed, &signer, config).await?;
            println!("{}", to_json(&output)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
