//! The worker-pool dispatch boundary: construct by type name, invoke
//! operators by string name with tagged parameters, serialize outcomes.


use std::rc::Rc;

use rinq::exec::{Engine, Outcome, Param, WirePacket};
use rinq::prelude::*;
use test_data::ints;

fn engine() -> Engine {
    Engine::new(EngineConfig::default())
}

fn as_seq(outcome: Outcome) -> Sequence {
    match outcome {
        Outcome::Seq(seq) => seq,
        Outcome::Value(v) => panic!("expected sequence, got {v:?}"),
    }
}

fn as_value(outcome: Outcome) -> Value {
    match outcome {
        Outcome::Value(v) => v,
        Outcome::Seq(_) => panic!("expected value"),
    }
}

#[test]
fn full_worker_flow_construct_invoke_encode() {
    let e = engine();
    // (a) construct from a plain collection plus a type name.
    let seq = e.construct("Sequence", ints(&[1, 3, 2])).unwrap();

    // (b) invoke a named operator with decoded parameters.
    let filtered = as_seq(
        e.invoke(
            &seq,
            "Where",
            vec![Param::Fn(Rc::new(|args| {
                Value::Bool(matches!(&args[0], Value::Int(i) if *i > 1))
            }))],
        )
        .unwrap(),
    );

    // (c) serialize whatever the operator returned for transport back.
    let json = e.encode(&Outcome::Seq(filtered)).unwrap();
    let packet: WirePacket = serde_json::from_str(&json).unwrap();
    assert_eq!(packet.type_name, "Sequence");
    assert_eq!(packet.items, vec![serde_json::json!(3), serde_json::json!(2)]);

    // The orchestrating side decodes through the same registry.
    let merged = e.decode(&packet).unwrap();
    assert_eq!(merged.count(None).unwrap(), 2);
}

#[test]
fn chained_invocations_mirror_method_chaining() {
    let e = engine();
    let seq = e.construct("Sequence", ints(&[5, 1, 4, 1])).unwrap();
    let distinct = as_seq(e.invoke(&seq, "Distinct", vec![]).unwrap());
    let ordered = as_seq(e.invoke(&distinct, "OrderBy", vec![]).unwrap());
    let total = as_value(e.invoke(&ordered, "Sum", vec![]).unwrap());
    assert_eq!(total, Value::Int(10));
}

#[test]
fn parameters_tag_plain_values_sequences_and_functions() {
    let e = engine();
    let seq = e.construct("Sequence", ints(&[1, 2, 3])).unwrap();

    // Plain value parameter.
    let taken = as_seq(e.invoke(&seq, "Take", vec![Param::Value(Value::Int(2))]).unwrap());
    assert_eq!(taken.count(None).unwrap(), 2);

    // Sequence parameter.
    let other = e.construct("Sequence", ints(&[3, 9])).unwrap();
    let union = as_seq(e.invoke(&seq, "Union", vec![Param::Seq(other)]).unwrap());
    assert_eq!(union.count(None).unwrap(), 4);

    // Function parameter used as a key selector, plus a field-name selector.
    let people = e
        .construct(
            "Sequence",
            vec![
                Value::record([("age", Value::Int(40))]),
                Value::record([("age", Value::Int(30))]),
            ],
        )
        .unwrap();
    let by_name = as_seq(
        e.invoke(&people, "OrderBy", vec![Param::Value(Value::from("age"))])
            .unwrap(),
    );
    let youngest = by_name.first(None).unwrap();
    assert_eq!(youngest.field("age"), Some(&Value::Int(30)));
}

#[test]
fn group_results_encode_per_group() {
    let e = engine();
    let seq = e.construct("Sequence", ints(&[1, 3, 2])).unwrap();
    let grouped = as_seq(
        e.invoke(
            &seq,
            "GroupBy",
            vec![Param::Fn(Rc::new(|args| match &args[0] {
                Value::Int(i) => Value::Bool(i % 2 == 0),
                other => other.clone(),
            }))],
        )
        .unwrap(),
    );
    // Per-worker group merging ships each group with its key.
    let groups: Vec<Value> = grouped.iterate().collect::<rinq::Result<_>>().unwrap();
    for group in groups {
        let group = match group {
            Value::Seq(g) => g,
            other => panic!("{other:?}"),
        };
        assert!(group.group_key().is_some());
        let json = e.encode(&Outcome::Seq(group.clone())).unwrap();
        let packet: WirePacket = serde_json::from_str(&json).unwrap();
        assert!(!packet.group_key.is_null());
    }
}

#[test]
fn engine_honors_store_configuration() {
    let cfg = EngineConfig {
        default_store: false,
        ..EngineConfig::default()
    };
    let e = Engine::new(cfg);
    let seq = e.construct("Sequence", ints(&[1, 2])).unwrap();
    assert!(!seq.stores());
    // Single pass works, a second fails: the stream-once contract.
    assert_eq!(seq.count(None).unwrap(), 2);
    assert!(seq.count(None).is_err());
}

#[test]
fn seeded_shuffle_is_reproducible_across_engines() {
    let cfg = EngineConfig {
        seed: Some(11),
        ..EngineConfig::default()
    };
    let a = Engine::new(cfg.clone());
    let b = Engine::new(cfg);
    let seq_a = a.construct("Sequence", ints(&[1, 2, 3, 4, 5])).unwrap();
    let seq_b = b.construct("Sequence", ints(&[1, 2, 3, 4, 5])).unwrap();
    let out_a = as_seq(a.invoke(&seq_a, "Shuffle", vec![]).unwrap());
    let out_b = as_seq(b.invoke(&seq_b, "Shuffle", vec![]).unwrap());
    assert!(out_a.sequence_equal(&out_b, None).unwrap());
}
