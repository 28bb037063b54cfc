//! Async callback variants: one item is processed fully, including its
//! awaited callback, before the next is pulled.


use std::cell::RefCell;
use std::ops::ControlFlow;
use std::rc::Rc;

use rinq::exec::fold::{aggregate_async, any_async, count_async, for_each_async};
use rinq::operators::async_ops::{group_by_async, select_async, where_async};
use rinq::prelude::*;
use test_data::{collect, int_seq, ints};

#[tokio::test]
async fn async_filter_and_projection() {
    let seq = int_seq(&[1, 3, 2]);
    let filtered = where_async(&seq, |v, _| async move {
        matches!(v, Value::Int(i) if i > 1)
    })
    .await
    .unwrap();
    assert_eq!(collect(&filtered), ints(&[3, 2]));

    let doubled = select_async(&filtered, |v, _| async move {
        match v {
            Value::Int(i) => Value::Int(i * 2),
            other => other,
        }
    })
    .await
    .unwrap();
    assert_eq!(collect(&doubled), ints(&[6, 4]));
}

#[tokio::test]
async fn async_callbacks_run_strictly_in_sequence() {
    // The trace interleaves pull and callback per item; no item is pulled
    // while the previous callback is still pending.
    let trace: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let pulls = trace.clone();
    let seq = Sequence::from_producer(
        Box::new((1..=3).map(move |i| {
            pulls.borrow_mut().push(format!("pull-{i}"));
            Ok(Value::Int(i))
        })),
        None,
    );
    let calls = trace.clone();
    select_async(&seq, |v, idx| {
        calls.borrow_mut().push(format!("call-{idx}"));
        async move { v }
    })
    .await
    .unwrap();
    assert_eq!(
        *trace.borrow(),
        vec!["pull-1", "call-0", "pull-2", "call-1", "pull-3", "call-2"]
    );
}

#[tokio::test]
async fn async_grouping_and_aggregation() {
    let seq = int_seq(&[1, 3, 2]);
    let grouped = group_by_async(&seq, |v| async move {
        match v {
            Value::Int(i) => Value::Bool(i % 2 == 0),
            other => other,
        }
    })
    .await
    .unwrap();
    assert_eq!(grouped.count(None).unwrap(), 2);

    let total = aggregate_async(
        &seq,
        |a, b| async move {
            match (a, b) {
                (Value::Int(x), Value::Int(y)) => Value::Int(x + y),
                _ => Value::Null,
            }
        },
        Some(Value::Int(0)),
    )
    .await
    .unwrap();
    assert_eq!(total, Value::Int(6));

    assert_eq!(
        count_async(&seq, |v| async move { v.truthy() }).await.unwrap(),
        3
    );
    assert!(any_async(&seq, |v| async move { v == Value::Int(2) })
        .await
        .unwrap());
}

#[tokio::test]
async fn async_for_each_stops_when_asked() {
    let seq = int_seq(&[1, 2, 3, 4]);
    let seen = Rc::new(RefCell::new(0usize));
    let counter = seen.clone();
    for_each_async(&seq, move |_, idx| {
        *counter.borrow_mut() += 1;
        async move {
            if idx >= 1 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(*seen.borrow(), 2);
}
