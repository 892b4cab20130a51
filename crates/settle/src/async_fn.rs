//! Async computations on the event loop.
//!
//! An async block spawned with [`EventLoop::spawn_async`] always yields a
//! [`Deferred`]: `Ok` fulfills it and `Err` rejects it. Inside the block,
//! awaiting a deferred value suspends only that computation; it resumes on the
//! task queue once the value settles, with `Ok(value)` or `Err(error)`.

use settle_core::Settlement;
use std::cell::RefCell;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use crate::deferred::{Deferred, Reason, Resolution, Settleable};
use crate::event_loop::EventLoop;

struct AwaitSlot<T, E> {
    settlement: Option<Settlement<T, E>>,
    waker: Option<Waker>,
}

/// Future returned by awaiting a [`Deferred`].
///
/// The first poll registers a reaction; the value is delivered through the
/// task queue even if the deferred was already settled.
#[must_use = "futures do nothing unless polled"]
pub struct Awaiting<T, E> {
    source: Deferred<T, E>,
    slot: Rc<RefCell<AwaitSlot<T, E>>>,
    subscribed: bool,
}

impl<T: Settleable, E: Reason> Future for Awaiting<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let ready = {
            let mut slot = this.slot.borrow_mut();
            match slot.settlement.take() {
                Some(settlement) => Some(settlement),
                None => {
                    slot.waker = Some(cx.waker().clone());
                    None
                }
            }
        };
        if let Some(settlement) = ready {
            return Poll::Ready(settlement.into_result());
        }

        if !this.subscribed {
            this.subscribed = true;
            let slot = Rc::clone(&this.slot);
            this.source.subscribe(move |settlement| {
                let waker = {
                    let mut slot = slot.borrow_mut();
                    slot.settlement = Some(settlement);
                    slot.waker.take()
                };
                if let Some(waker) = waker {
                    waker.wake();
                }
            });
        }
        Poll::Pending
    }
}

impl<T, E> fmt::Debug for Awaiting<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Awaiting")
            .field("deferred", &self.source.id())
            .field("subscribed", &self.subscribed)
            .finish()
    }
}

impl<T: Settleable, E: Reason> IntoFuture for Deferred<T, E> {
    type Output = Result<T, E>;
    type IntoFuture = Awaiting<T, E>;

    fn into_future(self) -> Self::IntoFuture {
        Awaiting {
            source: self,
            slot: Rc::new(RefCell::new(AwaitSlot {
                settlement: None,
                waker: None,
            })),
            subscribed: false,
        }
    }
}

impl EventLoop {
    /// Runs an async computation and returns the deferred value it produces.
    ///
    /// The body runs synchronously up to its first `.await`. Returning
    /// `Err` rejects the result; a `?` on an awaited rejection does the same.
    pub fn spawn_async<T, E, F>(&self, future: F) -> Deferred<T, E>
    where
        T: Settleable,
        E: Reason,
        F: Future<Output = Result<T, E>> + 'static,
    {
        let (deferred, resolver) = Deferred::pending(self);
        tracing::trace!(deferred = %deferred.id(), "Starting async computation");
        self.spawn_local(async move {
            resolver.settle(Settlement::from(future.await));
        });
        deferred
    }

    /// Like [`spawn_async`](Self::spawn_async) but the body may finish with
    /// another deferred value, which is adopted.
    pub fn spawn_async_resolution<T, E, F>(&self, future: F) -> Deferred<T, E>
    where
        T: Settleable,
        E: Reason,
        F: Future<Output = Resolution<T, E>> + 'static,
    {
        let (deferred, resolver) = Deferred::pending(self);
        self.spawn_local(async move {
            resolver.resolve(future.await);
        });
        deferred
    }

    /// A value fulfilled with `()` once `delay` of loop time passes.
    pub fn sleep<E: Reason>(&self, delay: Duration) -> Deferred<(), E> {
        Deferred::after(self, delay, Settlement::Fulfilled(()))
    }
}
