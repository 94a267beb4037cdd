//! Batch anchoring adapter
//!
//! Records a sealed batch's root, batch id and signer key id on an external
//! append-only ledger and reads them back for independent confirmation. The
//! ledger transport is supplied by the host through [`BatchLedger`].

pub mod anchorer;
pub mod config;
pub mod error;
pub mod ledger;
pub mod signer;

pub use anchorer::{AnchorReceipt, BatchAnchorer, Verification};
pub use config::AnchorConfig;
pub use error::AnchorError;
pub use ledger::{BatchLedger, MemoryLedger};
pub use signer::{SignerIdentity, StaticSigner};
