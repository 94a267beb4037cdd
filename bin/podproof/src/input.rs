//! Reading batch inputs from JSON files

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};

use impactledger_merkle::{Digest, LeafHash, PodBatch};

/// Contents of a batch input file
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BatchInput {
    /// PoD records as JSON objects, hashed on the way in
    Records(Vec<Map<String, Value>>),
    /// Leaf hashes computed elsewhere
    Leaves(Vec<LeafHash>),
}

/// Read and parse a JSON file
pub(crate) fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

impl BatchInput {
    /// Accepts a single record object, an array of record objects, or an
    /// array of hex leaf hashes. Mixed arrays are rejected.
    pub(crate) fn from_value(value: Value) -> Result<Self> {
        let items = match value {
            Value::Object(fields) => return Ok(Self::Records(vec![fields])),
            Value::Array(items) => items,
            other => bail!("expected a record object or an array, got {other}"),
        };

        if items.iter().all(Value::is_string) {
            let mut leaves = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let hex = item.as_str().unwrap_or_default();
                leaves.push(Digest::from_hex(hex).with_context(|| format!("entry {i} is not a leaf hash"))?);
            }
            return Ok(Self::Leaves(leaves));
        }

        let mut records = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            match item {
                Value::Object(fields) => records.push(fields),
                _ => bail!("entry {i} is neither a record object nor a leaf hash; arrays must not mix the two"),
            }
        }
        Ok(Self::Records(records))
    }

    /// Load from a file
    pub(crate) fn load(path: &Path) -> Result<Self> {
        Self::from_value(read_json(path)?)
    }

    /// Collect the input into an open batch
    pub(crate) fn into_batch(self, batch_id: &str) -> Result<PodBatch> {
        let mut batch = PodBatch::new(batch_id);
        match self {
            Self::Records(records) => {
                for (i, fields) in records.iter().enumerate() {
                    batch.push_fields(fields).with_context(|| format!("record {i} rejected"))?;
                }
            }
            Self::Leaves(leaves) => {
                for leaf in leaves {
                    batch.push_leaf(leaf);
                }
            }
        }
        Ok(batch)
    }
}
