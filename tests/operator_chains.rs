//! End-to-end operator behavior over the canonical `[1, 3, 2]` input and
//! longer chains.


use std::cell::RefCell;
use std::rc::Rc;

use rinq::prelude::*;
use test_data::{collect, int_seq, ints, naturals, person};

#[test]
fn where_keeps_items_above_threshold() {
    let out = int_seq(&[1, 3, 2]).where_with(|v, _| matches!(v, Value::Int(i) if *i > 1));
    assert_eq!(collect(&out), ints(&[3, 2]));
}

#[test]
fn union_suppresses_duplicates_and_appends_new() {
    let out = int_seq(&[1, 3, 2]).union(&int_seq(&[1, 4]), None);
    assert_eq!(collect(&out), ints(&[1, 3, 2, 4]));
}

#[test]
fn negative_take_equals_take_last() {
    let source = int_seq(&[1, 3, 2]);
    assert_eq!(collect(&source.take(-1)), ints(&[2]));
    assert_eq!(collect(&source.take(-1)), collect(&source.take_last(1)));
}

#[test]
fn group_by_parity_discovers_groups_in_order() {
    let grouped = int_seq(&[1, 3, 2])
        .group_by(
            Some(Accessor::func(|v| match v {
                Value::Int(i) => Value::Bool(i % 2 == 0),
                other => other.clone(),
            })),
            None,
        )
        .unwrap();
    let groups = collect(&grouped);
    assert_eq!(groups.len(), 2);
    let (odd, even) = match (&groups[0], &groups[1]) {
        (Value::Seq(a), Value::Seq(b)) => (a.clone(), b.clone()),
        other => panic!("expected groups, got {other:?}"),
    };
    assert_eq!(odd.group_key(), Some(Value::Bool(false)));
    assert_eq!(collect(&odd), ints(&[1, 3]));
    assert_eq!(even.group_key(), Some(Value::Bool(true)));
    assert_eq!(collect(&even), ints(&[2]));
}

#[test]
fn order_by_ascending_and_descending() {
    let source = int_seq(&[1, 3, 2]);
    assert_eq!(collect(&source.order_by(None, None).unwrap()), ints(&[1, 2, 3]));
    assert_eq!(
        collect(&source.order_by_descending(None, None).unwrap()),
        ints(&[3, 2, 1])
    );
}

#[test]
fn dynamic_source_mutation_between_passes_is_observed() {
    let external = Rc::new(RefCell::new(ints(&[1, 3, 2])));
    let seq = Sequence::dynamic_over(external.clone());
    assert_eq!(collect(&seq), ints(&[1, 3, 2]));
    external.borrow_mut().push(Value::Int(4));
    let second: Vec<Value> = collect(&seq);
    assert!(second.contains(&Value::Int(4)));
    assert_eq!(second, ints(&[1, 3, 2, 4]));
}

#[test]
fn stable_multi_key_ordering() {
    // Items with equal primary keys order exactly as the secondary
    // comparator dictates, regardless of original position.
    let item = |a: i64, b: i64, tag: &str| {
        Value::record([
            ("a", Value::Int(a)),
            ("b", Value::Int(b)),
            ("tag", Value::from(tag)),
        ])
    };
    let source = Sequence::from_values(vec![
        item(1, 9, "x"),
        item(1, 2, "y"),
        item(0, 5, "z"),
        item(1, 2, "w"),
    ]);
    let out = source
        .order_by(Some(Accessor::name("a")), None)
        .unwrap()
        .then_by(Accessor::name("b"), None)
        .unwrap();
    let rows = collect(&out);
    assert_eq!(rows[0].field("tag"), Some(&Value::from("z")));
    // Secondary key decides within the a == 1 run...
    assert_eq!(rows[1].field("b"), Some(&Value::Int(2)));
    assert_eq!(rows[2].field("b"), Some(&Value::Int(2)));
    assert_eq!(rows[3].field("b"), Some(&Value::Int(9)));
    // ...and only full ties fall back to original relative order.
    assert_eq!(rows[1].field("tag"), Some(&Value::from("y")));
    assert_eq!(rows[2].field("tag"), Some(&Value::from("w")));
}

#[test]
fn select_many_then_distinct_chain() {
    let source = Sequence::from_values(vec![
        Value::List(ints(&[1, 2])),
        Value::List(ints(&[2, 3])),
    ]);
    let out = source.select_many(|v, _| v.clone(), None).distinct(None);
    assert_eq!(collect(&out), ints(&[1, 2, 3]));
}

#[test]
fn skip_take_chunk_compose() {
    let out = Sequence::range(0, 10).skip(2).take(6).chunk(4).unwrap();
    let chunks = collect(&out);
    assert_eq!(chunks.len(), 2);
    match &chunks[1] {
        Value::Seq(tail) => assert_eq!(collect(tail), ints(&[6, 7])),
        other => panic!("{other:?}"),
    }
}

#[test]
fn joins_compose_with_grouping() {
    let people = Sequence::from_values(vec![
        person(1, "ada", 36),
        person(2, "bob", 41),
    ]);
    let orders = Sequence::from_values(vec![
        Value::record([("pid", Value::Int(1)), ("total", Value::Int(10))]),
        Value::record([("pid", Value::Int(1)), ("total", Value::Int(5))]),
    ]);
    let joined = people.join(
        &orders,
        Accessor::name("id"),
        Accessor::name("pid"),
        Rc::new(|a, b| {
            Value::record([
                ("name", a.field("name").cloned().unwrap()),
                ("total", b.field("total").cloned().unwrap()),
            ])
        }),
        None,
    );
    let total = joined.sum(Some(Accessor::name("total"))).unwrap();
    assert_eq!(total, Value::Int(15));
}

#[test]
fn infinite_sources_stream_through_lazy_operators() {
    let out = naturals()
        .where_with(|v, _| matches!(v, Value::Int(i) if i % 2 == 0))
        .select(|v, _| match v {
            Value::Int(i) => Value::Int(i * i),
            other => other.clone(),
        })
        .take(4);
    assert_eq!(collect(&out), ints(&[0, 4, 16, 36]));
}

#[test]
fn intersect_and_except_round_out_set_algebra() {
    let left = int_seq(&[1, 3, 2, 5]);
    // The shorter right side is the walked one, so its order wins.
    assert_eq!(
        collect(&left.intersect(&int_seq(&[2, 3]), None)),
        ints(&[2, 3])
    );
    assert_eq!(collect(&left.except(&int_seq(&[3, 5]), None)), ints(&[1, 2]));
}

#[test]
fn zip_aligns_and_truncates() {
    let out = int_seq(&[1, 2, 3]).zip_with(&int_seq(&[10, 20]), |a, b| match (a, b) {
        (Value::Int(x), Value::Int(y)) => Value::Int(x * y),
        _ => Value::Null,
    });
    assert_eq!(collect(&out), ints(&[10, 40]));
}

#[test]
fn reverse_and_shuffle_permute() {
    let source = int_seq(&[1, 3, 2]);
    assert_eq!(collect(&source.reverse().unwrap()), ints(&[2, 3, 1]));
    let shuffled = collect(&source.shuffle(Some(7)).unwrap());
    let mut sorted = shuffled.clone();
    sorted.sort_by(default_ordering);
    assert_eq!(sorted, ints(&[1, 2, 3]));
}

#[test]
fn min_max_aggregate_average() {
    let source = int_seq(&[1, 3, 2]);
    assert_eq!(source.min(None).unwrap(), Value::Int(1));
    assert_eq!(source.max(None).unwrap(), Value::Int(3));
    assert_eq!(source.average(None).unwrap(), Value::Float(2.0));
    let product = source
        .aggregate(
            Rc::new(|a, b| match (a, b) {
                (Value::Int(x), Value::Int(y)) => Value::Int(x * y),
                _ => Value::Null,
            }),
            None,
            None,
        )
        .unwrap();
    assert_eq!(product, Value::Int(6));
}

#[test]
fn first_last_single_element_at() {
    let source = int_seq(&[1, 3, 2]);
    assert_eq!(source.first(None).unwrap(), Value::Int(1));
    assert_eq!(source.last(None).unwrap(), Value::Int(2));
    assert_eq!(source.element_at(-2).unwrap(), Value::Int(3));
    let only_three = source.single(Some(Rc::new(|v: &Value| *v == Value::Int(3))));
    assert_eq!(only_three.unwrap(), Value::Int(3));
    let err = source.single(None).unwrap_err();
    assert!(matches!(err, Error::MultipleMatches { index: 1 }));
}
