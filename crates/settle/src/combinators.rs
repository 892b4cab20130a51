//! Combinators over groups of deferred values.
//!
//! None of these cancel anything: members that lose a race, or that settle
//! after the group already rejected, keep running and settle their own
//! deferred values. The combinator simply ignores their outcome.

use settle_core::Settlement;
use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::rc::Rc;

use crate::deferred::{Deferred, Reason, Settleable};
use crate::event_loop::EventLoop;

/// Positional results filled in as members settle.
struct Slots<X> {
    values: Vec<Option<X>>,
    remaining: usize,
}

impl<X> Slots<X> {
    fn new(len: usize) -> Self {
        Self {
            values: std::iter::repeat_with(|| None).take(len).collect(),
            remaining: len,
        }
    }

    /// Stores `value` at `index`; returns every value once all are present.
    fn fill(&mut self, index: usize, value: X) -> Option<Vec<X>> {
        if let Some(slot) = self.values.get_mut(index)
            && slot.replace(value).is_none()
        {
            self.remaining -= 1;
        }
        if self.remaining > 0 {
            return None;
        }
        Some(std::mem::take(&mut self.values).into_iter().flatten().collect())
    }
}

/// Fulfills with every member's value, in input order, once all fulfill.
///
/// Rejects with the first rejection observed without waiting for the other
/// members. An empty input fulfills with an empty vector.
pub fn all_of<T, E, I>(event_loop: &EventLoop, members: I) -> Deferred<Vec<T>, E>
where
    T: Settleable,
    E: Reason,
    I: IntoIterator<Item = Deferred<T, E>>,
{
    let members: Vec<_> = members.into_iter().collect();
    let (combined, resolver) = Deferred::pending(event_loop);
    tracing::debug!(deferred = %combined.id(), members = members.len(), "all_of");
    if members.is_empty() {
        resolver.fulfill(Vec::new());
        return combined;
    }

    let slots = Rc::new(RefCell::new(Slots::new(members.len())));
    for (index, member) in members.iter().enumerate() {
        let slots = Rc::clone(&slots);
        let resolver = resolver.clone();
        member.subscribe(move |settlement| match settlement {
            Settlement::Fulfilled(value) => {
                let complete = slots.borrow_mut().fill(index, value);
                if let Some(values) = complete {
                    resolver.fulfill(values);
                }
            }
            Settlement::Rejected(error) => resolver.reject(error),
        });
    }
    combined
}

/// Settles like whichever member settles first.
///
/// Members that are already settled win in input order. An empty input never
/// settles.
pub fn first_of<T, E, I>(event_loop: &EventLoop, members: I) -> Deferred<T, E>
where
    T: Settleable,
    E: Reason,
    I: IntoIterator<Item = Deferred<T, E>>,
{
    let (winner, resolver) = Deferred::pending(event_loop);
    let mut count = 0usize;
    for member in members {
        let resolver = resolver.clone();
        member.subscribe(move |settlement| resolver.settle(settlement));
        count += 1;
    }
    tracing::debug!(deferred = %winner.id(), members = count, "first_of");
    winner
}

/// Waits for every member to settle and fulfills with all outcomes in input
/// order. Never rejects.
pub fn all_settled<T, E, I>(
    event_loop: &EventLoop,
    members: I,
) -> Deferred<Vec<Settlement<T, E>>, Infallible>
where
    T: Settleable,
    E: Reason,
    I: IntoIterator<Item = Deferred<T, E>>,
{
    let members: Vec<_> = members.into_iter().collect();
    let (combined, resolver) = Deferred::pending(event_loop);
    tracing::debug!(deferred = %combined.id(), members = members.len(), "all_settled");
    if members.is_empty() {
        resolver.fulfill(Vec::new());
        return combined;
    }

    let slots = Rc::new(RefCell::new(Slots::new(members.len())));
    for (index, member) in members.iter().enumerate() {
        let slots = Rc::clone(&slots);
        let resolver = resolver.clone();
        member.subscribe(move |settlement| {
            let complete = slots.borrow_mut().fill(index, settlement);
            if let Some(outcomes) = complete {
                resolver.fulfill(outcomes);
            }
        });
    }
    combined
}

/// Fulfills with the first member to fulfill.
///
/// Rejects with every member's error, in input order, only when all of them
/// reject. An empty input rejects immediately with an empty vector.
pub fn any_of<T, E, I>(event_loop: &EventLoop, members: I) -> Deferred<T, Vec<E>>
where
    T: Settleable,
    E: Reason,
    I: IntoIterator<Item = Deferred<T, E>>,
{
    let members: Vec<_> = members.into_iter().collect();
    let (combined, resolver) = Deferred::pending(event_loop);
    tracing::debug!(deferred = %combined.id(), members = members.len(), "any_of");
    if members.is_empty() {
        resolver.reject(Vec::new());
        return combined;
    }

    let errors = Rc::new(RefCell::new(Slots::new(members.len())));
    let fulfilled = Rc::new(Cell::new(false));
    for (index, member) in members.iter().enumerate() {
        let errors = Rc::clone(&errors);
        let fulfilled = Rc::clone(&fulfilled);
        let resolver = resolver.clone();
        member.subscribe(move |settlement| match settlement {
            Settlement::Fulfilled(value) => {
                fulfilled.set(true);
                resolver.fulfill(value);
            }
            Settlement::Rejected(error) => {
                let complete = errors.borrow_mut().fill(index, error);
                if let Some(errors) = complete
                    && !fulfilled.get()
                {
                    resolver.reject(errors);
                }
            }
        });
    }
    combined
}
