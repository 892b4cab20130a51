//! Integration tests for continuation chains and flattening.

use settle::{Continuation, Deferred, Resolution, SettleState, Settlement};

use crate::common::{TestHarness, ms};

#[test]
fn test_synchronous_fulfill_notifies_after_current_execution() {
    let harness = TestHarness::new();
    let record = harness.recorder();
    let event_loop = &harness.event_loop;

    let deferred = Deferred::<i32, String>::new(event_loop, |resolver| {
        resolver.fulfill(1);
        Ok(())
    });
    let inner_record = harness.recorder();
    deferred.then(move |value| {
        inner_record(format!("continuation saw {value}"));
        Ok(())
    });
    record("registration returned".to_string());

    harness.run();
    assert_eq!(
        harness.entries(),
        vec!["registration returned", "continuation saw 1"]
    );
}

#[test]
fn test_settled_value_ignores_later_calls() {
    let harness = TestHarness::new();
    let (deferred, resolver) = Deferred::<&str, String>::pending(&harness.event_loop);

    resolver.fulfill("first");
    resolver.reject("second".to_string());
    resolver.fulfill("third");

    harness.run();
    assert_eq!(deferred.state(), SettleState::Fulfilled);
    assert_eq!(deferred.settlement(), Some(Settlement::Fulfilled("first")));
}

#[test]
fn test_continuation_returning_nested_fulfilled_value_flattens() {
    let harness = TestHarness::new();
    let el = harness.event_loop.clone();

    let composite = Deferred::<(), String>::fulfilled(&harness.event_loop, ()).then_with(move |()| {
        let inner = Deferred::fulfilled(&el, 5);
        Resolution::Deferred(Deferred::resolved(&el, Resolution::Deferred(inner)))
    });

    harness.run();
    assert_eq!(composite.settlement(), Some(Settlement::Fulfilled(5)));
}

#[test]
fn test_error_in_continuation_rejects_composite() {
    let harness = TestHarness::new();
    let record = harness.recorder();

    let composite = Deferred::<i32, String>::fulfilled(&harness.event_loop, 2)
        .then(|value| -> Result<i32, String> { Err(format!("cannot handle {value}")) });
    composite.catch(move |error| {
        record(error);
        Ok(0)
    });

    harness.run();
    assert_eq!(
        composite.settlement(),
        Some(Settlement::Rejected("cannot handle 2".to_string()))
    );
    assert_eq!(harness.entries(), vec!["cannot handle 2"]);
}

#[test]
fn test_tutorial_style_chain() {
    let harness = TestHarness::new();
    let record = harness.recorder();
    let el = harness.event_loop.clone();

    let result = harness
        .fulfill_after(10, "user-42".to_string())
        .and_then(move |user| {
            Deferred::after(
                &el,
                ms(5),
                Settlement::Fulfilled(format!("{user}:profile")),
            )
        })
        .then(|profile| -> Result<String, String> {
            Err(format!("{profile} is private"))
        })
        .catch(|error| Ok(format!("fallback after: {error}")))
        .finally(move || {
            record("cleanup".to_string());
            Ok(())
        });

    let stats = harness.run();
    assert_eq!(
        result.settlement(),
        Some(Settlement::Fulfilled(
            "fallback after: user-42:profile is private".to_string()
        ))
    );
    assert_eq!(harness.entries(), vec!["cleanup"]);
    assert_eq!(stats.elapsed, ms(15));
    assert_eq!(stats.timers_fired, 2);
}

#[test]
fn test_register_continuation_with_both_handlers() {
    let harness = TestHarness::new();
    let describe = |deferred: Deferred<i32, String>| {
        deferred.register_continuation(
            Continuation::new()
                .on_fulfilled(|value: i32| Ok::<i32, String>(value * 100))
                .on_rejected(|error: String| Ok::<i32, String>(-(error.len() as i32))),
        )
    };

    let ok = describe(harness.fulfill_after(1, 3));
    let failed = describe(harness.reject_after(2, "four"));

    harness.run();
    assert_eq!(ok.settlement(), Some(Settlement::Fulfilled(300)));
    assert_eq!(failed.settlement(), Some(Settlement::Fulfilled(-4)));
    assert!(harness.event_loop.unhandled_rejections().is_empty());
}

#[test]
fn test_long_chain_settles_in_order() {
    let harness = TestHarness::new();
    let mut current = Deferred::<u64, String>::fulfilled(&harness.event_loop, 0);
    for _ in 0..100 {
        current = current.map(|value| value + 1);
    }

    let stats = harness.run();
    assert_eq!(current.settlement(), Some(Settlement::Fulfilled(100)));
    assert_eq!(stats.tasks_run, 100);
}

#[test]
fn test_unhandled_rejection_reported_at_drain() {
    let harness = TestHarness::new();
    let orphan = harness.reject_after::<i32>(3, "no handler");
    let handled = harness.reject_after::<i32>(4, "has handler");
    let _recovered = handled.catch(|_| Ok(0));

    harness.run();
    let reports = harness.event_loop.drain_unhandled_rejections();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].deferred, orphan.id());
    assert_eq!(reports[0].at, ms(3));
    assert!(reports[0].reason.contains("no handler"));
    assert!(harness.event_loop.unhandled_rejections().is_empty());
}

#[test]
fn test_or_else_recovers_with_deferred_value() {
    let harness = TestHarness::new();
    let el = harness.event_loop.clone();

    let recovered = Deferred::<i32, String>::rejected(&harness.event_loop, "miss".to_string())
        .or_else(move |_| Deferred::after(&el, ms(7), Settlement::Fulfilled(9)));

    harness.event_loop.run_tasks().unwrap();
    assert!(recovered.is_pending());

    let stats = harness.run();
    assert_eq!(recovered.settlement(), Some(Settlement::Fulfilled(9)));
    assert_eq!(stats.elapsed, ms(7));
    assert!(harness.event_loop.unhandled_rejections().is_empty());
}
