//! Command line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Proof-of-delivery batching and verification
#[derive(Debug, Parser)]
#[command(name = "podproof", version, about)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Print the leaf hash of each record in a JSON file (object or array)
    Hash {
        /// Record file
        input: PathBuf,
    },

    /// Seal records or leaf hashes into a batch and print root and proofs
    Build {
        /// Milestone or batch identifier
        #[arg(long)]
        batch_id: String,
        /// JSON array of records or of hex leaf hashes
        input: PathBuf,
        /// Write the result here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Check an inclusion proof; exits non-zero when the proof is invalid
    Verify {
        /// Hex leaf hash
        #[arg(long, conflicts_with = "record")]
        leaf: Option<String>,
        /// Record file to hash as the leaf
        #[arg(long)]
        record: Option<PathBuf>,
        /// Comma-separated sibling hashes, leaf to root
        #[arg(long, value_delimiter = ',')]
        proof: Vec<String>,
        /// Anchored root; defaults to the bundle's root
        #[arg(long)]
        root: Option<String>,
        /// Proof bundle produced by `build`
        #[arg(long, conflicts_with = "proof")]
        bundle: Option<PathBuf>,
    },

    /// Print `anchorBatch` calldata for submission by an external wallet
    Calldata {
        /// Milestone or batch identifier
        #[arg(long)]
        batch_id: String,
        /// Merkle root to anchor
        #[arg(long)]
        root: String,
        /// Signer key identifier (falls back to ANCHOR_SIGNER_KID)
        #[arg(long)]
        signer: Option<String>,
    },

    /// Seal a batch and anchor it against an in-memory ledger (dry run)
    Anchor {
        /// Milestone or batch identifier
        #[arg(long)]
        batch_id: String,
        /// JSON array of records or of hex leaf hashes
        input: PathBuf,
        /// Signer key identifier (falls back to ANCHOR_SIGNER_KID)
        #[arg(long)]
        signer: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_proof_list_is_comma_separated() {
        let cli = Cli::parse_from(["podproof", "verify", "--leaf", "0x01", "--root", "0x02", "--proof", "0xaa,0xbb"]);
        match cli.command {
            Command::Verify { proof, .. } => assert_eq!(proof, vec!["0xaa", "0xbb"]),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
