//! Integration tests for the combinators.

use settle::{Deferred, Settlement, all_of, all_settled, any_of, first_of};
use std::cell::Cell;
use std::rc::Rc;

use crate::common::{TestHarness, ms};

#[test]
fn test_all_of_empty_fulfills_immediately() {
    let harness = TestHarness::new();
    let all = all_of(&harness.event_loop, Vec::<Deferred<i32, String>>::new());
    assert_eq!(all.settlement(), Some(Settlement::Fulfilled(Vec::new())));
}

#[test]
fn test_all_of_positional_with_staggered_timers() {
    let harness = TestHarness::new();
    let all = all_of(
        &harness.event_loop,
        [
            harness.fulfill_after(10, 1),
            harness.fulfill_after(5, 2),
            harness.fulfill_after(1, 3),
        ],
    );

    let stats = harness.run();
    assert_eq!(all.settlement(), Some(Settlement::Fulfilled(vec![1, 2, 3])));
    assert!(stats.elapsed >= ms(10));
}

#[test]
fn test_all_of_rejects_before_slow_member_settles() {
    let harness = TestHarness::new();
    let a = harness.fulfill_after(30, 1);
    let b = harness.reject_after::<i32>(5, "E");
    let all = all_of(&harness.event_loop, [a.clone(), b]);

    let observed_pending = Rc::new(Cell::new(false));
    let flag = Rc::clone(&observed_pending);
    let a_probe = a.clone();
    all.catch(move |_| {
        flag.set(a_probe.is_pending());
        Ok(Vec::new())
    });

    harness.run();
    assert_eq!(all.settlement(), Some(Settlement::Rejected("E".to_string())));
    assert!(observed_pending.get());
    assert_eq!(a.settlement(), Some(Settlement::Fulfilled(1)));
}

#[test]
fn test_first_of_fast_member() {
    let harness = TestHarness::new();
    let race = first_of(
        &harness.event_loop,
        [harness.fulfill_after(20, "slow"), harness.fulfill_after(2, "fast")],
    );

    harness.run();
    assert_eq!(race.settlement(), Some(Settlement::Fulfilled("fast")));
}

#[test]
fn test_combinators_compose() {
    let harness = TestHarness::new();
    let el = harness.event_loop.clone();
    let timeout = harness.reject_after::<Vec<i32>>(8, "timed out");
    let work = all_of(
        &harness.event_loop,
        [harness.fulfill_after(3, 1), harness.fulfill_after(6, 2)],
    );
    let guarded = first_of(&el, [work, timeout]);

    harness.run();
    assert_eq!(guarded.settlement(), Some(Settlement::Fulfilled(vec![1, 2])));
    // The losing timeout still rejected; the race consumed it.
    assert!(harness.event_loop.unhandled_rejections().is_empty());
}

#[test]
fn test_all_settled_and_any_of() {
    let harness = TestHarness::new();
    let members = || {
        [
            harness.reject_after::<i32>(1, "a"),
            harness.fulfill_after(4, 4),
            harness.reject_after::<i32>(2, "b"),
        ]
    };
    let settled = all_settled(&harness.event_loop, members());
    let any = any_of(&harness.event_loop, members());

    harness.run();
    assert_eq!(
        settled.settlement(),
        Some(Settlement::Fulfilled(vec![
            Settlement::Rejected("a".to_string()),
            Settlement::Fulfilled(4),
            Settlement::Rejected("b".to_string()),
        ]))
    );
    assert_eq!(any.settlement(), Some(Settlement::Fulfilled(4)));
}

#[test]
fn test_all_of_later_rejection_settles_member_silently() {
    let harness = TestHarness::new();
    let first = harness.reject_after::<i32>(2, "first");
    let second = harness.reject_after::<i32>(4, "second");
    let all = all_of(&harness.event_loop, [first, second.clone()]);
    let _handled = all.catch(|_| Ok(Vec::new()));

    harness.run();
    assert_eq!(all.settlement(), Some(Settlement::Rejected("first".to_string())));
    assert_eq!(
        second.settlement(),
        Some(Settlement::Rejected("second".to_string()))
    );
    assert!(harness.event_loop.unhandled_rejections().is_empty());
}
