//! Grouping: a single pass building an insertion-ordered mapping from key to
//! an accumulating sub-sequence.
//!
//! The first occurrence of a key determines the group's position in the
//! result; each group is itself a sequence carrying its key in `group_key`.

use std::collections::HashMap;

use rinq_core::prelude::*;

pub trait GroupOps {
    /// Group items by the optional key (items group by themselves without
    /// one). The optional element selector transforms values before they are
    /// accumulated.
    fn group_by(&self, key: Option<Accessor>, element: Option<KeyFn>) -> Result<Sequence>;

    /// Groups with more than one member.
    fn doubles(&self, key: Option<Accessor>) -> Result<Sequence>;
}

impl GroupOps for Sequence {
    fn group_by(&self, key: Option<Accessor>, element: Option<KeyFn>) -> Result<Sequence> {
        self.assert_finite()?;
        let mut order: Vec<(Value, Vec<Value>)> = Vec::new();
        let mut index: HashMap<Hash256, usize> = HashMap::new();
        for item in self.iterate() {
            let item = item?;
            let k = match &key {
                Some(k) => k.apply(&item),
                None => item.clone(),
            };
            let element = match &element {
                Some(f) => f(&item),
                None => item,
            };
            let slot = *index.entry(hash_value(&k)).or_insert_with(|| {
                order.push((k, Vec::new()));
                order.len() - 1
            });
            order[slot].1.push(element);
        }
        let groups: Vec<Value> = order
            .into_iter()
            .map(|(k, members)| {
                let group = self.derived_materialized(members);
                group.set_group_key(Some(k));
                Value::Seq(group)
            })
            .collect();
        tracing::trace!(id = %self.id(), groups = groups.len(), "grouped");
        Ok(self.derived_materialized(groups))
    }

    fn doubles(&self, key: Option<Accessor>) -> Result<Sequence> {
        let grouped = self.group_by(key, None)?;
        let doubled: Vec<Value> = grouped
            .iterate()
            .filter_map(|item| match item {
                Ok(Value::Seq(group)) if group.buffered_len() > 1 => Some(Ok(Value::Seq(group))),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
            .collect::<Result<_>>()?;
        Ok(self.derived_materialized(doubled))
    }
}
