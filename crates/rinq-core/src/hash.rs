//! Stable structural hashing for item values.
//!
//! The comparing operators (distinct/union/except/intersect), the grouping
//! index, and the keyed conversion containers all probe values by this hash
//! when no custom comparator is supplied. The hash is consistent with value
//! equality: numeric cross-equal values (`Int(1)`, `Float(1.0)`) hash alike.

use blake3::Hasher;

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut s, "{:02x}", b);
        }
        s
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(bytes);
    Hash256(h.finalize().into())
}

/// Hash a value structurally.
pub fn hash_value(value: &Value) -> Hash256 {
    let mut h = Hasher::new();
    write_value(value, &mut h);
    Hash256(h.finalize().into())
}

fn write_value(value: &Value, h: &mut Hasher) {
    match value {
        Value::Null => {
            h.update(&[0]);
        }
        Value::Bool(b) => {
            h.update(&[1, *b as u8]);
        }
        Value::Int(i) => {
            write_number(*i as f64, h);
        }
        Value::Float(f) => {
            write_number(*f, h);
        }
        Value::Str(s) => {
            h.update(&[4]);
            h.update(&(s.len() as u64).to_le_bytes());
            h.update(s.as_bytes());
        }
        Value::List(items) => {
            h.update(&[5]);
            h.update(&(items.len() as u64).to_le_bytes());
            for item in items {
                write_value(item, h);
            }
        }
        Value::Record(fields) => {
            h.update(&[6]);
            h.update(&(fields.len() as u64).to_le_bytes());
            for (name, item) in fields {
                h.update(&(name.len() as u64).to_le_bytes());
                h.update(name.as_bytes());
                write_value(item, h);
            }
        }
        Value::Seq(seq) => {
            // A materialized sequence hashes by content; anything still
            // holding a producer hashes by identity (hashing must not pull).
            if let Some(items) = seq.materialized_items() {
                h.update(&[7]);
                h.update(&(items.len() as u64).to_le_bytes());
                for item in &items {
                    write_value(item, h);
                }
            } else {
                h.update(&[8]);
                h.update(&seq.id().get().to_le_bytes());
            }
        }
    }
}

/// Ints and cross-equal floats must collide, so both hash through the float
/// bit pattern; NaN is canonicalized.
fn write_number(f: f64, h: &mut Hasher) {
    h.update(&[2]);
    let bits = if f.is_nan() {
        f64::NAN.to_bits()
    } else if f == 0.0 {
        0.0f64.to_bits()
    } else {
        f.to_bits()
    };
    h.update(&bits.to_le_bytes());
}
