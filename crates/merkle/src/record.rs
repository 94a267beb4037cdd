//! Proof-of-delivery records and their canonical serialization
//!
//! A record is hashed as compact JSON with object keys in byte order. Absent
//! optional fields are omitted, and a `null` value counts as absent at every
//! nesting level, so a typed [`PodRecord`] and the equivalent raw JSON object
//! always produce the same leaf hash. Floating point numbers are written the
//! way `JSON.stringify` writes them (`12`, not `12.0`; `0.000001`, not
//! `1e-6`), matching what a JavaScript capture client emits for the same
//! object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::digest::LeafHash;
use crate::error::MerkleError;
use crate::hasher::Keccak256Hasher;

/// Wire name of the disbursement identifier
pub const DISBURSEMENT_ID: &str = "disbursementId";

/// Wire name of the beneficiary identifier
pub const BENEFICIARY_ID: &str = "beneficiaryId";

/// Decimal exponent from which `JSON.stringify` switches to exponent notation
const MAX_PLAIN_EXPONENT: i32 = 21;

/// Smallest decimal exponent still written in plain form (1e-6)
const MIN_PLAIN_EXPONENT: i32 = -6;

/// A proof-of-delivery capture.
///
/// `timestamp` is milliseconds since the Unix epoch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PodRecord {
    disbursement_id: String,
    beneficiary_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gps_lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gps_lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    photo_uri: Option<String>,
    timestamp: u64,
}

impl PodRecord {
    /// Create a record with the required fields
    pub fn new(
        disbursement_id: impl Into<String>,
        beneficiary_id: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        Self {
            disbursement_id: disbursement_id.into(),
            beneficiary_id: beneficiary_id.into(),
            gps_lat: None,
            gps_lng: None,
            photo_uri: None,
            timestamp,
        }
    }

    /// Attach GPS coordinates
    pub fn with_gps(mut self, lat: f64, lng: f64) -> Self {
        self.gps_lat = Some(lat);
        self.gps_lng = Some(lng);
        self
    }

    /// Attach a photo reference
    pub fn with_photo(mut self, uri: impl Into<String>) -> Self {
        self.photo_uri = Some(uri.into());
        self
    }

    /// Disbursement identifier
    pub fn disbursement_id(&self) -> &str {
        &self.disbursement_id
    }

    /// Beneficiary identifier
    pub fn beneficiary_id(&self) -> &str {
        &self.beneficiary_id
    }

    /// GPS coordinates, if captured
    pub fn gps(&self) -> Option<(f64, f64)> {
        self.gps_lat.zip(self.gps_lng)
    }

    /// Photo reference, if captured
    pub fn photo_uri(&self) -> Option<&str> {
        self.photo_uri.as_deref()
    }

    /// Capture time in epoch milliseconds
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Check required fields and coordinate values
    pub fn validate(&self) -> Result<(), MerkleError> {
        require_non_empty(DISBURSEMENT_ID, &self.disbursement_id)?;
        require_non_empty(BENEFICIARY_ID, &self.beneficiary_id)?;

        for (name, value) in [("gpsLat", self.gps_lat), ("gpsLng", self.gps_lng)] {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(MerkleError::MalformedRecord(format!(
                        "{name} must be a finite number"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Canonical JSON text of this record
    pub fn canonical_json(&self) -> Result<String, MerkleError> {
        self.validate()?;
        let value = serde_json::to_value(self)
            .map_err(|e| MerkleError::MalformedRecord(e.to_string()))?;
        canonical_json_string(&value)
    }

    /// Leaf hash of this record
    pub fn leaf_hash(&self) -> Result<LeafHash, MerkleError> {
        Ok(Keccak256Hasher::hash(self.canonical_json()?.as_bytes()))
    }
}

/// Hash an arbitrary field set as a PoD leaf.
///
/// The required identifiers must be present as non-empty strings; every other
/// field is hashed as given.
pub fn hash_fields(fields: &Map<String, Value>) -> Result<LeafHash, MerkleError> {
    for name in [DISBURSEMENT_ID, BENEFICIARY_ID] {
        match fields.get(name) {
            Some(Value::String(s)) => require_non_empty(name, s)?,
            Some(Value::Null) | None => {
                return Err(MerkleError::MalformedRecord(format!("{name} is required")));
            }
            Some(_) => {
                return Err(MerkleError::MalformedRecord(format!("{name} must be a string")));
            }
        }
    }

    let canonical = canonical_json_string(&Value::Object(fields.clone()))?;
    Ok(Keccak256Hasher::hash(canonical.as_bytes()))
}

/// Hash a JSON value that must be an object, see [`hash_fields`]
pub fn hash_json(value: &Value) -> Result<LeafHash, MerkleError> {
    match value {
        Value::Object(fields) => hash_fields(fields),
        _ => Err(MerkleError::MalformedRecord("record must be a JSON object".into())),
    }
}

/// Serialize a JSON value canonically: sorted keys, nulls omitted from
/// objects, no whitespace.
pub fn canonical_json_string(value: &Value) -> Result<String, MerkleError> {
    let mut out = String::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut String) -> Result<(), MerkleError> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(n, out)?,
        Value::String(s) => write_string(s, out)?,
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> =
                map.iter().filter(|(_, v)| !v.is_null()).collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out)?;
                out.push(':');
                write_canonical(item, out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn write_string(s: &str, out: &mut String) -> Result<(), MerkleError> {
    let quoted = serde_json::to_string(s).map_err(|e| MerkleError::MalformedRecord(e.to_string()))?;
    out.push_str(&quoted);
    Ok(())
}

fn write_number(n: &Number, out: &mut String) -> Result<(), MerkleError> {
    if n.is_i64() || n.is_u64() {
        out.push_str(&n.to_string());
        return Ok(());
    }

    let f = n
        .as_f64()
        .ok_or_else(|| MerkleError::MalformedRecord(format!("unrepresentable number {n}")))?;
    if !f.is_finite() {
        return Err(MerkleError::MalformedRecord("numbers must be finite".into()));
    }

    write_js_number(f, out);
    Ok(())
}

/// ECMAScript `Number::toString` for a finite double: shortest round-trip
/// digits, plain decimal for 1e-6 <= |x| < 1e21, `d.ddde±N` otherwise.
fn write_js_number(f: f64, out: &mut String) {
    if f == 0.0 {
        // -0 serializes as 0
        out.push('0');
        return;
    }
    if f < 0.0 {
        out.push('-');
    }

    // `{:e}` yields the shortest digits that round-trip, e.g. `1.2345e-7`
    let scientific = format!("{:e}", f.abs());
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or_default();

    let k = digits.len() as i32;
    let n = exponent + 1;

    if k <= n && n <= MAX_PLAIN_EXPONENT {
        out.push_str(&digits);
        out.push_str(&"0".repeat((n - k) as usize));
    } else if 0 < n && n <= MAX_PLAIN_EXPONENT {
        let (integral, fraction) = digits.split_at(n as usize);
        out.push_str(integral);
        out.push('.');
        out.push_str(fraction);
    } else if MIN_PLAIN_EXPONENT < n && n <= 0 {
        out.push_str("0.");
        out.push_str(&"0".repeat((-n) as usize));
        out.push_str(&digits);
    } else {
        let (first, rest) = digits.split_at(1);
        out.push_str(first);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        out.push('e');
        out.push(if exponent < 0 { '-' } else { '+' });
        out.push_str(&exponent.unsigned_abs().to_string());
    }
}

fn require_non_empty(name: &str, value: &str) -> Result<(), MerkleError> {
    if value.trim().is_empty() {
        return Err(MerkleError::MalformedRecord(format!("{name} must not be empty")));
    }
    Ok(())
}
