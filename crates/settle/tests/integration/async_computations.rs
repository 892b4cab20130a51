//! Integration tests for async computations awaiting deferred values.

use settle::{Deferred, Resolution, Settlement, all_of};

use crate::common::{TestHarness, ms};

#[test]
fn test_async_body_awaits_sequentially() {
    let harness = TestHarness::new();
    let record = harness.recorder();
    let first = harness.fulfill_after(10, 2);
    let el = harness.event_loop.clone();

    let result: Deferred<i32, String> = harness.event_loop.spawn_async(async move {
        record("start".to_string());
        let a = first.await?;
        record(format!("a = {a}"));
        let b = Deferred::<i32, String>::after(&el, ms(5), Settlement::Fulfilled(a * 3)).await?;
        record(format!("b = {b}"));
        Ok(a + b)
    });

    assert_eq!(harness.entries(), vec!["start"]);
    let stats = harness.run();
    assert_eq!(result.settlement(), Some(Settlement::Fulfilled(8)));
    assert_eq!(harness.entries(), vec!["start", "a = 2", "b = 6"]);
    assert_eq!(stats.elapsed, ms(15));
}

#[test]
fn test_async_body_raises_awaited_rejection() {
    let harness = TestHarness::new();
    let failing = harness.reject_after::<i32>(4, "disk full");

    let result: Deferred<i32, String> = harness
        .event_loop
        .spawn_async(async move { Ok(failing.await? + 1) });
    let recovered = result.catch(|error| Ok(error.len() as i32));

    harness.run();
    assert_eq!(
        result.settlement(),
        Some(Settlement::Rejected("disk full".to_string()))
    );
    assert_eq!(recovered.settlement(), Some(Settlement::Fulfilled(9)));
}

#[test]
fn test_async_result_feeds_continuations() {
    let harness = TestHarness::new();
    let el = harness.event_loop.clone();
    let members = vec![harness.fulfill_after(3, 1), harness.fulfill_after(1, 2)];

    let total = harness
        .event_loop
        .spawn_async(async move {
            let values = all_of(&el, members).await?;
            Ok::<i32, String>(values.into_iter().sum())
        })
        .map(|sum| sum * 10);

    harness.run();
    assert_eq!(total.settlement(), Some(Settlement::Fulfilled(30)));
}

#[test]
fn test_async_resolution_never_nests() {
    let harness = TestHarness::new();
    let inner = harness.fulfill_after(2, "inner");

    let result: Deferred<&str, String> = harness
        .event_loop
        .spawn_async_resolution(async move { Resolution::Deferred(inner) });

    harness.run();
    assert_eq!(result.settlement(), Some(Settlement::Fulfilled("inner")));
}

#[test]
fn test_many_concurrent_computations_interleave() {
    let harness = TestHarness::new();
    let mut results = Vec::new();
    for delay in [9u64, 3, 6] {
        let el = harness.event_loop.clone();
        let record = harness.recorder();
        results.push(harness.event_loop.spawn_async(async move {
            el.sleep::<String>(ms(delay)).await?;
            record(format!("woke after {delay}"));
            Ok::<u64, String>(delay)
        }));
    }

    harness.run();
    assert_eq!(
        harness.entries(),
        vec!["woke after 3", "woke after 6", "woke after 9"]
    );
    assert_eq!(harness.event_loop.pending_computations(), 0);
    let values: Vec<_> = results.iter().map(|d| d.settlement()).collect();
    assert_eq!(
        values,
        vec![
            Some(Settlement::Fulfilled(9)),
            Some(Settlement::Fulfilled(3)),
            Some(Settlement::Fulfilled(6)),
        ]
    );
}
