//! Named-operator dispatch for the external worker-pool boundary.
//!
//! A dispatcher ships whole queries to workers as (type name, items,
//! operator name, parameter list); the engine on the worker side
//! reconstructs the sequence, resolves the operator by name, and serializes
//! whatever comes back through the wire format. Parameters arrive already
//! decoded (a plain value, a reconstructed sequence, or a callable), since
//! decoding serialized function bodies is the dispatcher's job, not the
//! core's.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::rc::Rc;

use rinq_core::prelude::*;
use rinq_operators::prelude::*;

use crate::convert::ConvertOps;
use crate::error::{ExecError, Result};
use crate::fold::{FoldOps, FoldFn};
use crate::pick::{Filter, PickOps};
use crate::wire::{from_wire_with, to_json, value_to_json, WirePacket};

/// One decoded operator parameter.
pub enum Param {
    Value(Value),
    Seq(Sequence),
    /// A decoded callable over values; predicates interpret the result's
    /// truthiness.
    Fn(ParamFn),
}

pub type ParamFn = Rc<dyn Fn(&[Value]) -> Value>;

/// What a named invocation produced.
pub enum Outcome {
    Seq(Sequence),
    Value(Value),
}

type TypeCtor = Rc<dyn Fn(Vec<Value>) -> Sequence>;

/// Engine owns the configuration and the constructor registry keyed by the
/// wire-level `Type` name.
pub struct Engine {
    cfg: EngineConfig,
    types: HashMap<String, TypeCtor>,
}

impl Engine {
    pub fn new(cfg: EngineConfig) -> Self {
        let mut engine = Self {
            cfg: cfg.clone(),
            types: HashMap::new(),
        };
        engine.register_type("Sequence", move |items| {
            if cfg.default_store {
                Sequence::from_values(items)
            } else {
                let n = items.len();
                let seq = Sequence::from_producer(
                    Box::new(items.into_iter().map(Ok)),
                    Some(CountEstimate::Finite(n)),
                );
                // A fresh producer-backed sequence has nothing buffered, so
                // disabling the store cannot fail here.
                let _ = seq.disable_store(cfg.pass_store);
                seq
            }
        });
        engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Register a concrete sequence subtype constructor.
    pub fn register_type(
        &mut self,
        name: impl Into<String>,
        ctor: impl Fn(Vec<Value>) -> Sequence + 'static,
    ) {
        self.types.insert(name.into(), Rc::new(ctor));
    }

    /// Construct a sequence from a plain collection plus a type name.
    pub fn construct(&self, type_name: &str, items: Vec<Value>) -> Result<Sequence> {
        let ctor = self
            .types
            .get(type_name)
            .ok_or_else(|| ExecError::UnknownType(type_name.to_string()))?;
        let seq = ctor(items);
        seq.set_type_name(type_name);
        Ok(seq)
    }

    /// Reconstruct a wire packet through the registry.
    pub fn decode(&self, packet: &WirePacket) -> Result<Sequence> {
        let ctor = self
            .types
            .get(&packet.type_name)
            .ok_or_else(|| ExecError::UnknownType(packet.type_name.clone()))?
            .clone();
        from_wire_with(packet, move |items| ctor(items))
    }

    /// Serialize an invocation outcome for transport.
    pub fn encode(&self, outcome: &Outcome) -> Result<String> {
        match outcome {
            Outcome::Seq(seq) => to_json(seq),
            Outcome::Value(value) => Ok(serde_json::to_string(&value_to_json(value)?)?),
        }
    }

    /// Invoke an operator by wire-level name with decoded parameters.
    pub fn invoke(&self, seq: &Sequence, name: &str, params: Vec<Param>) -> Result<Outcome> {
        tracing::debug!(op = name, params = params.len(), "dispatching operator");
        let p = Params(params);
        let out = match name {
            "Where" => Outcome::Seq(seq.where_with(p.predicate(0)?)),
            "Select" => Outcome::Seq(seq.select(p.selector(0)?)),
            "SelectMany" => Outcome::Seq(seq.select_many(p.selector(0)?, None)),
            "OfType" => Outcome::Seq(seq.of_type(&p.string(0)?)),
            "Distinct" => Outcome::Seq(seq.distinct(p.opt_comparer(0)?)),
            "DistinctBy" => Outcome::Seq(seq.distinct_by(p.accessor(0)?, p.opt_comparer(1)?)),
            "Union" => Outcome::Seq(seq.union(&p.sequence(0)?, p.opt_comparer(1)?)),
            "UnionBy" => {
                Outcome::Seq(seq.union_by(&p.sequence(0)?, p.accessor(1)?, p.opt_comparer(2)?))
            }
            "Except" => Outcome::Seq(seq.except(&p.sequence(0)?, p.opt_comparer(1)?)),
            "ExceptBy" => {
                Outcome::Seq(seq.except_by(&p.sequence(0)?, p.accessor(1)?, p.opt_comparer(2)?))
            }
            "Intersect" => Outcome::Seq(seq.intersect(&p.sequence(0)?, p.opt_comparer(1)?)),
            "IntersectBy" => {
                Outcome::Seq(seq.intersect_by(&p.sequence(0)?, p.accessor(1)?, p.opt_comparer(2)?))
            }
            "Join" => Outcome::Seq(seq.join(
                &p.sequence(0)?,
                p.accessor(1)?,
                p.accessor(2)?,
                p.join_result(3)?,
                p.opt_comparer(4)?,
            )),
            "GroupJoin" => {
                let f = p.function(3)?;
                Outcome::Seq(seq.group_join(
                    &p.sequence(0)?,
                    p.accessor(1)?,
                    p.accessor(2)?,
                    Rc::new(move |item, group, key| {
                        f(&[item.clone(), Value::Seq(group), key.clone()])
                    }),
                    p.opt_comparer(4)?,
                ))
            }
            "InnerJoin" => {
                Outcome::Seq(seq.inner_join(&p.sequence(0)?, p.accessor(1)?, p.accessor(2)?))
            }
            "CrossJoin" => Outcome::Seq(seq.cross_join(&p.sequence(0)?, p.join_result(1)?)),
            "OrderBy" => Outcome::Seq(seq.order_by(p.opt_accessor(0)?, None)?),
            "OrderByDescending" => Outcome::Seq(seq.order_by_descending(p.opt_accessor(0)?, None)?),
            "ThenBy" => Outcome::Seq(seq.then_by(p.accessor(0)?, None)?),
            "ThenByDescending" => Outcome::Seq(seq.then_by_descending(p.accessor(0)?, None)?),
            "Reverse" => Outcome::Seq(seq.reverse()?),
            "Shuffle" => Outcome::Seq(seq.shuffle(self.cfg.seed)?),
            "GroupBy" => Outcome::Seq(seq.group_by(p.opt_accessor(0)?, p.opt_element(1)?)?),
            "Doubles" => Outcome::Seq(seq.doubles(p.opt_accessor(0)?)?),
            "Skip" => Outcome::Seq(seq.skip(p.integer(0)?)),
            "SkipLast" => Outcome::Seq(seq.skip_last(p.unsigned(0)?)),
            "Take" => Outcome::Seq(seq.take(p.integer(0)?)),
            "TakeLast" => Outcome::Seq(seq.take_last(p.unsigned(0)?)),
            "TakeEvery" => Outcome::Seq(seq.take_every(p.unsigned(0)?)?),
            "Chunk" => Outcome::Seq(seq.chunk(p.unsigned(0)?)?),
            "Append" => Outcome::Seq(seq.append(p.values(0)?)),
            "Prepend" => Outcome::Seq(seq.prepend(p.values(0)?)),
            "Concat" => Outcome::Seq(seq.concat(&[p.sequence(0)?])),
            "Zip" => Outcome::Seq(seq.zip(&p.sequence(0)?)),
            "DefaultIfEmpty" => Outcome::Seq(seq.default_if_empty(p.value(0)?)),
            "MovingAverages" => Outcome::Seq(seq.moving_averages(p.opt_float(0)?.unwrap_or(0.0))),

            "First" => Outcome::Value(seq.first(p.opt_filter(0)?)?),
            "FirstOrDefault" => {
                Outcome::Value(seq.first_or_default(p.opt_filter(0)?, p.opt_value(1)?)?)
            }
            "Last" => Outcome::Value(seq.last(p.opt_filter(0)?)?),
            "LastOrDefault" => {
                Outcome::Value(seq.last_or_default(p.opt_filter(0)?, p.opt_value(1)?)?)
            }
            "Single" => Outcome::Value(seq.single(p.opt_filter(0)?)?),
            "SingleOrDefault" => {
                Outcome::Value(seq.single_or_default(p.opt_filter(0)?, p.opt_value(1)?)?)
            }
            "ElementAt" => Outcome::Value(seq.element_at(p.integer(0)?)?),
            "ElementAtOrDefault" => {
                Outcome::Value(seq.element_at_or_default(p.integer(0)?, p.opt_value(1)?)?)
            }
            "Count" => Outcome::Value(Value::Int(seq.count(p.opt_filter(0)?)? as i64)),
            "Any" => Outcome::Value(Value::Bool(seq.any(p.opt_filter(0)?)?)),
            "All" => Outcome::Value(Value::Bool(seq.all(p.filter(0)?)?)),
            "Contains" => Outcome::Value(Value::Bool(seq.contains(&p.value(0)?, p.opt_comparer(1)?)?)),
            "IsEmpty" => Outcome::Value(Value::Bool(seq.is_empty_seq()?)),
            "SequenceEqual" => Outcome::Value(Value::Bool(
                seq.sequence_equal(&p.sequence(0)?, p.opt_comparer(1)?)?,
            )),
            "Aggregate" => {
                Outcome::Value(seq.aggregate(p.fold(0)?, p.opt_value_strict(1), p.opt_element(2)?)?)
            }
            "Sum" => Outcome::Value(seq.sum(p.opt_accessor(0)?)?),
            "Average" => Outcome::Value(seq.average(p.opt_accessor(0)?)?),
            "Min" => Outcome::Value(seq.min(p.opt_accessor(0)?)?),
            "Max" => Outcome::Value(seq.max(p.opt_accessor(0)?)?),
            "MinBy" => Outcome::Value(seq.min_by(p.accessor(0)?)?),
            "MaxBy" => Outcome::Value(seq.max_by(p.accessor(0)?)?),
            "MovingAverage" => Outcome::Value(Value::Float(
                seq.moving_average(p.opt_float(0)?.unwrap_or(0.0))?,
            )),
            "ToArray" => Outcome::Value(Value::List(if p.truthy(0) {
                seq.to_array_deep()?
            } else {
                seq.to_array()?
            })),
            "ToDictionary" => Outcome::Value(pairs_value(
                seq.to_dictionary(p.accessor(0)?, p.opt_element(1)?)?,
            )),
            "ToLookup" => Outcome::Value(pairs_value(
                seq.to_lookup(p.opt_accessor(0)?, p.opt_element(1)?)?,
            )),
            "ToHashSet" => Outcome::Value(Value::List(
                seq.to_hash_set(p.opt_element(0)?)?.into_values(),
            )),
            "ForEach" => {
                let f = p.function(0)?;
                seq.for_each(|item, idx| {
                    if f(&[item.clone(), Value::Int(idx as i64)]).truthy() {
                        ControlFlow::Continue(())
                    } else {
                        ControlFlow::Break(())
                    }
                })?;
                Outcome::Seq(seq.clone())
            }
            other => return Err(ExecError::UnknownOperator(other.to_string())),
        };
        Ok(out)
    }
}

fn pairs_value(map: crate::convert::ValueMap) -> Value {
    Value::List(
        map.into_entries()
            .into_iter()
            .map(|(k, v)| Value::List(vec![k, v]))
            .collect(),
    )
}

/// Positional parameter decoding with dispatch-layer errors.
struct Params(Vec<Param>);

impl Params {
    fn get(&self, idx: usize) -> Option<&Param> {
        self.0.get(idx)
    }

    fn required(&self, idx: usize) -> Result<&Param> {
        self.get(idx)
            .ok_or_else(|| ExecError::BadParameter(format!("missing parameter #{idx}")))
    }

    fn value(&self, idx: usize) -> Result<Value> {
        match self.required(idx)? {
            Param::Value(v) => Ok(v.clone()),
            _ => Err(ExecError::BadParameter(format!(
                "parameter #{idx} must be a plain value"
            ))),
        }
    }

    /// Missing and null parameters both decode as null.
    fn opt_value(&self, idx: usize) -> Result<Value> {
        match self.get(idx) {
            None => Ok(Value::Null),
            Some(Param::Value(v)) => Ok(v.clone()),
            Some(_) => Err(ExecError::BadParameter(format!(
                "parameter #{idx} must be a plain value"
            ))),
        }
    }

    /// `Some` only when the parameter is present and non-null.
    fn opt_value_strict(&self, idx: usize) -> Option<Value> {
        match self.get(idx) {
            Some(Param::Value(Value::Null)) | None => None,
            Some(Param::Value(v)) => Some(v.clone()),
            Some(_) => None,
        }
    }

    fn values(&self, idx: usize) -> Result<Vec<Value>> {
        match self.value(idx)? {
            Value::List(items) => Ok(items),
            single => Ok(vec![single]),
        }
    }

    fn string(&self, idx: usize) -> Result<String> {
        match self.value(idx)? {
            Value::Str(s) => Ok(s),
            other => Err(ExecError::BadParameter(format!(
                "parameter #{idx} must be a string, found {}",
                other.kind()
            ))),
        }
    }

    fn integer(&self, idx: usize) -> Result<i64> {
        match self.value(idx)? {
            Value::Int(i) => Ok(i),
            other => Err(ExecError::BadParameter(format!(
                "parameter #{idx} must be an integer, found {}",
                other.kind()
            ))),
        }
    }

    fn unsigned(&self, idx: usize) -> Result<usize> {
        let i = self.integer(idx)?;
        usize::try_from(i).map_err(|_| {
            ExecError::BadParameter(format!("parameter #{idx} must be non-negative, found {i}"))
        })
    }

    fn opt_float(&self, idx: usize) -> Result<Option<f64>> {
        match self.get(idx) {
            None => Ok(None),
            Some(Param::Value(Value::Null)) => Ok(None),
            Some(Param::Value(v)) => v.as_f64().map(Some).ok_or_else(|| {
                ExecError::BadParameter(format!("parameter #{idx} must be numeric"))
            }),
            Some(_) => Err(ExecError::BadParameter(format!(
                "parameter #{idx} must be numeric"
            ))),
        }
    }

    fn truthy(&self, idx: usize) -> bool {
        matches!(self.get(idx), Some(Param::Value(v)) if v.truthy())
    }

    fn sequence(&self, idx: usize) -> Result<Sequence> {
        match self.required(idx)? {
            Param::Seq(seq) => Ok(seq.clone()),
            Param::Value(Value::Seq(seq)) => Ok(seq.clone()),
            Param::Value(Value::List(items)) => Ok(Sequence::from_values(items.clone())),
            _ => Err(ExecError::BadParameter(format!(
                "parameter #{idx} must be a sequence"
            ))),
        }
    }

    fn function(&self, idx: usize) -> Result<ParamFn> {
        match self.required(idx)? {
            Param::Fn(f) => Ok(f.clone()),
            _ => Err(ExecError::BadParameter(format!(
                "parameter #{idx} must be a function"
            ))),
        }
    }

    fn predicate(&self, idx: usize) -> Result<impl Fn(&Value, usize) -> bool + 'static> {
        let f = self.function(idx)?;
        Ok(move |v: &Value, i: usize| f(&[v.clone(), Value::Int(i as i64)]).truthy())
    }

    fn selector(&self, idx: usize) -> Result<impl Fn(&Value, usize) -> Value + 'static> {
        let f = self.function(idx)?;
        Ok(move |v: &Value, i: usize| f(&[v.clone(), Value::Int(i as i64)]))
    }

    /// Key selectors arrive as a property-name string or a decoded function.
    fn accessor(&self, idx: usize) -> Result<Accessor> {
        match self.required(idx)? {
            Param::Value(Value::Str(name)) => Ok(Accessor::name(name.clone())),
            Param::Fn(f) => {
                let f = f.clone();
                Ok(Accessor::func(move |v| f(&[v.clone()])))
            }
            _ => Err(ExecError::BadParameter(format!(
                "parameter #{idx} must be a key selector (function or field name)"
            ))),
        }
    }

    fn opt_accessor(&self, idx: usize) -> Result<Option<Accessor>> {
        match self.get(idx) {
            None | Some(Param::Value(Value::Null)) => Ok(None),
            _ => Ok(Some(self.accessor(idx)?)),
        }
    }

    fn opt_element(&self, idx: usize) -> Result<Option<KeyFn>> {
        match self.get(idx) {
            None | Some(Param::Value(Value::Null)) => Ok(None),
            Some(Param::Fn(f)) => {
                let f = f.clone();
                Ok(Some(Rc::new(move |v: &Value| f(&[v.clone()]))))
            }
            Some(_) => Err(ExecError::BadParameter(format!(
                "parameter #{idx} must be a function"
            ))),
        }
    }

    fn opt_comparer(&self, idx: usize) -> Result<Option<Comparer>> {
        match self.get(idx) {
            None | Some(Param::Value(Value::Null)) => Ok(None),
            Some(Param::Fn(f)) => {
                let f = f.clone();
                Ok(Some(Rc::new(move |a: &Value, b: &Value| {
                    f(&[a.clone(), b.clone()]).truthy()
                })))
            }
            Some(_) => Err(ExecError::BadParameter(format!(
                "parameter #{idx} must be a comparer function"
            ))),
        }
    }

    fn filter(&self, idx: usize) -> Result<Filter> {
        let f = self.function(idx)?;
        Ok(Rc::new(move |v: &Value| f(&[v.clone()]).truthy()))
    }

    fn opt_filter(&self, idx: usize) -> Result<Option<Filter>> {
        match self.get(idx) {
            None | Some(Param::Value(Value::Null)) => Ok(None),
            _ => Ok(Some(self.filter(idx)?)),
        }
    }

    fn join_result(&self, idx: usize) -> Result<rinq_operators::JoinResult> {
        let f = self.function(idx)?;
        Ok(Rc::new(move |a: &Value, b: &Value| {
            f(&[a.clone(), b.clone()])
        }))
    }

    fn fold(&self, idx: usize) -> Result<FoldFn> {
        let f = self.function(idx)?;
        Ok(Rc::new(move |a: &Value, b: &Value| {
            f(&[a.clone(), b.clone()])
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(items: &[i64]) -> Vec<Value> {
        items.iter().map(|&i| Value::Int(i)).collect()
    }

    fn engine() -> Engine {
        Engine::new(EngineConfig::default())
    }

    fn seq_outcome(outcome: Outcome) -> Sequence {
        match outcome {
            Outcome::Seq(seq) => seq,
            Outcome::Value(v) => panic!("expected a sequence outcome, got {v:?}"),
        }
    }

    fn value_outcome(outcome: Outcome) -> Value {
        match outcome {
            Outcome::Value(v) => v,
            Outcome::Seq(_) => panic!("expected a value outcome"),
        }
    }

    #[test]
    fn construct_by_type_name() {
        let e = engine();
        let seq = e.construct("Sequence", ints(&[1, 2])).unwrap();
        assert_eq!(seq.buffered_len(), 2);
        assert!(matches!(
            e.construct("Nope", vec![]),
            Err(ExecError::UnknownType(_))
        ));
    }

    #[test]
    fn invoke_operator_with_function_param() {
        let e = engine();
        let seq = e.construct("Sequence", ints(&[1, 3, 2])).unwrap();
        let out = e
            .invoke(
                &seq,
                "Where",
                vec![Param::Fn(Rc::new(|args| {
                    Value::Bool(matches!(&args[0], Value::Int(i) if *i > 1))
                }))],
            )
            .unwrap();
        let items: Vec<Value> = seq_outcome(out)
            .iterate()
            .collect::<rinq_core::Result<_>>()
            .unwrap();
        assert_eq!(items, ints(&[3, 2]));
    }

    #[test]
    fn invoke_terminal_returns_value() {
        let e = engine();
        let seq = e.construct("Sequence", ints(&[1, 3, 2])).unwrap();
        let out = e.invoke(&seq, "Count", vec![]).unwrap();
        assert_eq!(value_outcome(out), Value::Int(3));
        let out = e.invoke(&seq, "Max", vec![]).unwrap();
        assert_eq!(value_outcome(out), Value::Int(3));
    }

    #[test]
    fn invoke_with_name_accessor() {
        let e = engine();
        let seq = e
            .construct(
                "Sequence",
                vec![
                    Value::record([("n", Value::Int(2))]),
                    Value::record([("n", Value::Int(1))]),
                ],
            )
            .unwrap();
        let out = e
            .invoke(&seq, "OrderBy", vec![Param::Value(Value::from("n"))])
            .unwrap();
        let rows: Vec<Value> = seq_outcome(out)
            .iterate()
            .collect::<rinq_core::Result<_>>()
            .unwrap();
        assert_eq!(rows[0].field("n"), Some(&Value::Int(1)));
    }

    #[test]
    fn invoke_with_sequence_param_and_encode() {
        let e = engine();
        let seq = e.construct("Sequence", ints(&[1, 3, 2])).unwrap();
        let other = e.construct("Sequence", ints(&[1, 4])).unwrap();
        let out = e.invoke(&seq, "Union", vec![Param::Seq(other)]).unwrap();
        let json = e.encode(&out).unwrap();
        let packet: WirePacket = serde_json::from_str(&json).unwrap();
        assert_eq!(packet.items.len(), 4);
        let restored = e.decode(&packet).unwrap();
        let items: Vec<Value> = restored
            .iterate()
            .collect::<rinq_core::Result<_>>()
            .unwrap();
        assert_eq!(items, ints(&[1, 3, 2, 4]));
    }

    #[test]
    fn unknown_operator_and_bad_params_are_rejected() {
        let e = engine();
        let seq = e.construct("Sequence", ints(&[1])).unwrap();
        assert!(matches!(
            e.invoke(&seq, "Frobnicate", vec![]),
            Err(ExecError::UnknownOperator(_))
        ));
        assert!(matches!(
            e.invoke(&seq, "Where", vec![]),
            Err(ExecError::BadParameter(_))
        ));
        assert!(matches!(
            e.invoke(&seq, "Take", vec![Param::Value(Value::from("x"))]),
            Err(ExecError::BadParameter(_))
        ));
    }

    #[test]
    fn custom_type_round_trips_through_registry() {
        let mut e = engine();
        e.register_type("Tagged", |items| {
            let seq = Sequence::from_values(items);
            seq.set_tag(Some(Value::from("custom")));
            seq
        });
        let seq = e.construct("Tagged", ints(&[1])).unwrap();
        assert_eq!(seq.type_name(), "Tagged");
        let json = e.encode(&Outcome::Seq(seq)).unwrap();
        let packet: WirePacket = serde_json::from_str(&json).unwrap();
        assert_eq!(packet.type_name, "Tagged");
        assert!(e.decode(&packet).is_ok());
    }
}
