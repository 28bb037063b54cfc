//! The self-describing wire format:
//! `{ "Type", "GroupKey", "Tag", "Items" }`.
//!
//! `Type` names the concrete sequence subtype so the far end can pick the
//! right constructor; `Items` is the deep-flattened item array (nested
//! sequences recursively reduced to plain arrays). For any finite,
//! non-dynamic sequence the round trip is sequence-equal with `GroupKey`
//! and `Tag` preserved exactly.

use serde::{Deserialize, Serialize};

use rinq_core::prelude::{Sequence, Value};

use crate::error::{ExecError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirePacket {
    #[serde(rename = "Type")]
    pub type_name: String,

    #[serde(rename = "GroupKey")]
    pub group_key: serde_json::Value,

    #[serde(rename = "Tag")]
    pub tag: serde_json::Value,

    #[serde(rename = "Items")]
    pub items: Vec<serde_json::Value>,
}

/// Convert an item value to JSON, deep-flattening nested sequences.
/// Non-finite floats have no JSON representation and become null.
pub fn value_to_json(value: &Value) -> Result<serde_json::Value> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => serde_json::Value::Array(
            items.iter().map(value_to_json).collect::<Result<_>>()?,
        ),
        Value::Record(fields) => {
            let mut map = serde_json::Map::with_capacity(fields.len());
            for (name, field) in fields {
                map.insert(name.clone(), value_to_json(field)?);
            }
            serde_json::Value::Object(map)
        }
        Value::Seq(seq) => {
            seq.assert_finite().map_err(ExecError::Seq)?;
            let items: Vec<serde_json::Value> = seq
                .iterate()
                .map(|item| value_to_json(&item?))
                .collect::<Result<_>>()?;
            serde_json::Value::Array(items)
        }
    })
}

fn payload_to_json(payload: Option<Value>) -> Result<serde_json::Value> {
    match payload {
        Some(value) => value_to_json(&value),
        None => Ok(serde_json::Value::Null),
    }
}

fn payload_from_json(json: &serde_json::Value) -> Option<Value> {
    if json.is_null() {
        None
    } else {
        Some(Value::from_json(json))
    }
}

/// Serialize a sequence into the wire record. The sequence must be finite;
/// a dynamic sequence contributes its current pass.
pub fn to_wire(seq: &Sequence) -> Result<WirePacket> {
    seq.assert_finite().map_err(ExecError::Seq)?;
    let items: Vec<serde_json::Value> = seq
        .iterate()
        .map(|item| value_to_json(&item.map_err(ExecError::Seq)?))
        .collect::<Result<_>>()?;
    tracing::debug!(type_name = %seq.type_name(), items = items.len(), "serialized sequence");
    Ok(WirePacket {
        type_name: seq.type_name(),
        group_key: payload_to_json(seq.group_key())?,
        tag: payload_to_json(seq.tag())?,
        items,
    })
}

/// Reconstruct through an explicit constructor (the engine resolves `Type`
/// against its registry and passes the matching constructor in).
pub fn from_wire_with(
    packet: &WirePacket,
    construct: impl FnOnce(Vec<Value>) -> Sequence,
) -> Result<Sequence> {
    let items: Vec<Value> = packet.items.iter().map(Value::from_json).collect();
    let seq = construct(items);
    seq.set_type_name(packet.type_name.clone());
    seq.set_group_key(payload_from_json(&packet.group_key));
    seq.set_tag(payload_from_json(&packet.tag));
    Ok(seq)
}

/// Reconstruct a packet of the default sequence type.
pub fn from_wire(packet: &WirePacket) -> Result<Sequence> {
    if packet.type_name != "Sequence" {
        return Err(ExecError::UnknownType(packet.type_name.clone()));
    }
    from_wire_with(packet, Sequence::from_values)
}

/// JSON string convenience over [`to_wire`]/[`from_wire`].
pub fn to_json(seq: &Sequence) -> Result<String> {
    Ok(serde_json::to_string(&to_wire(seq)?)?)
}

pub fn from_json(json: &str) -> Result<Sequence> {
    let packet: WirePacket = serde_json::from_str(json)?;
    from_wire(&packet)
}
