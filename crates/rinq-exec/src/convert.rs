//! Conversion terminals: plain arrays (optionally deep-flattened), and the
//! keyed containers behind `to_dictionary`/`to_hash_set`/`to_lookup`.
//!
//! The keyed containers preserve insertion order and probe by the structural
//! value hash, so any value kind can key them.

use std::collections::{HashMap, HashSet};

use rinq_core::prelude::*;

/// Insertion-ordered key/value mapping.
#[derive(Default)]
pub struct ValueMap {
    entries: Vec<(Value, Value)>,
    index: HashMap<Hash256, usize>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dictionary semantics: the last writer for a key wins, keeping the
    /// key's original position.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        match self.index.get(&hash_value(&key)) {
            Some(&slot) => Some(std::mem::replace(&mut self.entries[slot].1, value)),
            None => {
                self.index.insert(hash_value(&key), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Lookup semantics: values accumulate per key in encounter order.
    pub fn push_multi(&mut self, key: Value, value: Value) {
        match self.index.get(&hash_value(&key)) {
            Some(&slot) => match &mut self.entries[slot].1 {
                Value::List(values) => values.push(value),
                single => {
                    let prior = single.clone();
                    *single = Value::List(vec![prior, value]);
                }
            },
            None => {
                self.index.insert(hash_value(&key), self.entries.len());
                self.entries.push((key, Value::List(vec![value])));
            }
        }
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.index
            .get(&hash_value(key))
            .map(|&slot| &self.entries[slot].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Value, Value)> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> Vec<(Value, Value)> {
        self.entries
    }
}

/// Insertion-ordered distinct values.
#[derive(Default)]
pub struct ValueSet {
    items: Vec<Value>,
    index: HashSet<Hash256>,
}

impl ValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: Value) -> bool {
        if self.index.insert(hash_value(&value)) {
            self.items.push(value);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.index.contains(&hash_value(value))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.items
    }
}

pub trait ConvertOps {
    /// All items as a plain vector.
    fn to_array(&self) -> Result<Vec<Value>>;

    /// Like `to_array`, but nested sequences found as direct elements are
    /// recursively reduced to plain lists, and sequence-valued record fields
    /// of elements are reduced one additional level. No recursion into
    /// arbitrary object graphs beyond that.
    fn to_array_deep(&self) -> Result<Vec<Value>>;

    /// Key every item; the last writer for a key wins.
    fn to_dictionary(&self, key: Accessor, value: Option<KeyFn>) -> Result<ValueMap>;

    /// Distinct (optionally projected) values in encounter order.
    fn to_hash_set(&self, value: Option<KeyFn>) -> Result<ValueSet>;

    /// Key every item; values accumulate per key in encounter order.
    fn to_lookup(&self, key: Option<Accessor>, value: Option<KeyFn>) -> Result<ValueMap>;
}

/// Reduce a nested sequence to a plain list, recursively.
fn deep_list(seq: &Sequence) -> Result<Vec<Value>> {
    seq.assert_finite()?;
    seq.iterate().map(|item| item.and_then(|v| deep_value(v))).collect()
}

fn deep_value(value: Value) -> Result<Value> {
    match value {
        Value::Seq(seq) => Ok(Value::List(deep_list(&seq)?)),
        Value::Record(fields) => {
            let mut flattened = Vec::with_capacity(fields.len());
            for (name, field) in fields {
                let field = match field {
                    Value::Seq(seq) => Value::List(deep_list(&seq)?),
                    other => other,
                };
                flattened.push((name, field));
            }
            Ok(Value::Record(flattened))
        }
        other => Ok(other),
    }
}

impl ConvertOps for Sequence {
    fn to_array(&self) -> Result<Vec<Value>> {
        self.snapshot()
    }

    fn to_array_deep(&self) -> Result<Vec<Value>> {
        self.snapshot()?.into_iter().map(deep_value).collect()
    }

    fn to_dictionary(&self, key: Accessor, value: Option<KeyFn>) -> Result<ValueMap> {
        self.assert_finite()?;
        let mut map = ValueMap::new();
        for item in self.iterate() {
            let item = item?;
            let k = key.apply(&item);
            let v = match &value {
                Some(f) => f(&item),
                None => item,
            };
            map.insert(k, v);
        }
        Ok(map)
    }

    fn to_hash_set(&self, value: Option<KeyFn>) -> Result<ValueSet> {
        self.assert_finite()?;
        let mut set = ValueSet::new();
        for item in self.iterate() {
            let item = item?;
            let v = match &value {
                Some(f) => f(&item),
                None => item,
            };
            set.insert(v);
        }
        Ok(set)
    }

    fn to_lookup(&self, key: Option<Accessor>, value: Option<KeyFn>) -> Result<ValueMap> {
        self.assert_finite()?;
        let mut map = ValueMap::new();
        for item in self.iterate() {
            let item = item?;
            let k = match &key {
                Some(key) => key.apply(&item),
                None => item.clone(),
            };
            let v = match &value {
                Some(f) => f(&item),
                None => item,
            };
            map.push_multi(k, v);
        }
        Ok(map)
    }
}
