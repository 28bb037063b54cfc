//! Asynchronous operator variants for callbacks that suspend on external
//! events.
//!
//! The engine still processes one item fully, including its awaited
//! callback, before requesting the next; there is no overlap or pipelining.
//! Each variant resolves to a materialized result sequence.

use std::future::Future;

use rinq_core::prelude::*;

/// Filter with an awaited predicate.
pub async fn where_async<F, Fut>(seq: &Sequence, pred: F) -> Result<Sequence>
where
    F: Fn(Value, usize) -> Fut,
    Fut: Future<Output = bool>,
{
    seq.assert_finite()?;
    let mut kept = Vec::new();
    let mut idx = 0;
    for item in seq.iterate() {
        let item = item?;
        if pred(item.clone(), idx).await {
            kept.push(item);
        }
        idx += 1;
    }
    Ok(seq.derived_materialized(kept))
}

/// Project with an awaited selector.
pub async fn select_async<F, Fut>(seq: &Sequence, f: F) -> Result<Sequence>
where
    F: Fn(Value, usize) -> Fut,
    Fut: Future<Output = Value>,
{
    seq.assert_finite()?;
    let mut mapped = Vec::new();
    let mut idx = 0;
    for item in seq.iterate() {
        let item = item?;
        mapped.push(f(item, idx).await);
        idx += 1;
    }
    Ok(seq.derived_materialized(mapped))
}

/// Group with an awaited key selector; groups carry their key, first
/// occurrence determines position.
pub async fn group_by_async<F, Fut>(seq: &Sequence, key: F) -> Result<Sequence>
where
    F: Fn(Value) -> Fut,
    Fut: Future<Output = Value>,
{
    seq.assert_finite()?;
    let mut order: Vec<(Value, Vec<Value>)> = Vec::new();
    let mut index = std::collections::HashMap::new();
    for item in seq.iterate() {
        let item = item?;
        let k = key(item.clone()).await;
        let slot = *index.entry(hash_value(&k)).or_insert_with(|| {
            order.push((k, Vec::new()));
            order.len() - 1
        });
        order[slot].1.push(item);
    }
    let groups: Vec<Value> = order
        .into_iter()
        .map(|(k, members)| {
            let group = seq.derived_materialized(members);
            group.set_group_key(Some(k));
            Value::Seq(group)
        })
        .collect();
    Ok(seq.derived_materialized(groups))
}
