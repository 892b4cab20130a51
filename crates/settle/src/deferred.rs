//! Deferred values.
//!
//! A [`Deferred<T, E>`] is a value-to-be: it starts pending and settles
//! exactly once, either fulfilled with a `T` or rejected with an `E`.
//! Continuations registered on it produce new deferred values, so work can be
//! chained:
//!
//! ```
//! use settle::{Deferred, EventLoop, Settlement};
//!
//! let event_loop = EventLoop::new();
//! let doubled = Deferred::<i32, String>::new(&event_loop, |resolver| {
//!     resolver.fulfill(21);
//!     Ok(())
//! })
//! .then(|value| Ok(value * 2));
//!
//! // Notification is always asynchronous.
//! assert!(doubled.is_pending());
//! event_loop.run_until_idle()?;
//! assert_eq!(doubled.settlement(), Some(Settlement::Fulfilled(42)));
//! # Ok::<(), settle::Error>(())
//! ```
//!
//! Continuations never run inside the call that registered them, even when
//! the value is already settled: the notification goes through the event
//! loop's task queue. Reactions on one value run in registration order.

use settle_core::{DeferredId, SettleState, Settlement};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::event_loop::{EventLoop, LoopRef};

/// Bound satisfied by fulfillment values.
///
/// One settlement is delivered to every continuation, so values are cloned.
pub trait Settleable: Clone + 'static {}

impl<X: Clone + 'static> Settleable for X {}

/// Bound satisfied by rejection reasons.
///
/// `Debug` is used to describe unhandled rejections.
pub trait Reason: Clone + fmt::Debug + 'static {}

impl<X: Clone + fmt::Debug + 'static> Reason for X {}

type Reaction<T, E> = Box<dyn FnOnce(Settlement<T, E>)>;
type FulfilledHandler<T, E> = Box<dyn FnOnce(T) -> Resolution<T, E>>;
type RejectedHandler<T, E> = Box<dyn FnOnce(E) -> Resolution<T, E>>;

enum State<T, E> {
    Pending(Vec<Reaction<T, E>>),
    Settled(Settlement<T, E>),
}

struct Shared<T, E> {
    id: DeferredId,
    event_loop: LoopRef,
    state: RefCell<State<T, E>>,
    handled: Cell<bool>,
}

// ============================================================================
// Resolution
// ============================================================================

/// What a continuation (or a resolver) settles a deferred value with.
///
/// `Deferred` makes the target adopt another value's eventual settlement, so
/// a deferred value never fulfills with a deferred value.
pub enum Resolution<T, E> {
    /// Fulfill with a value.
    Fulfilled(T),

    /// Reject with an error.
    Rejected(E),

    /// Follow another deferred value.
    Deferred(Deferred<T, E>),
}

impl<T, E> From<Result<T, E>> for Resolution<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Resolution::Fulfilled(value),
            Err(error) => Resolution::Rejected(error),
        }
    }
}

impl<T, E> From<Settlement<T, E>> for Resolution<T, E> {
    fn from(settlement: Settlement<T, E>) -> Self {
        match settlement {
            Settlement::Fulfilled(value) => Resolution::Fulfilled(value),
            Settlement::Rejected(error) => Resolution::Rejected(error),
        }
    }
}

impl<T, E> From<Deferred<T, E>> for Resolution<T, E> {
    fn from(deferred: Deferred<T, E>) -> Self {
        Resolution::Deferred(deferred)
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Resolution<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Fulfilled(value) => f.debug_tuple("Fulfilled").field(value).finish(),
            Resolution::Rejected(error) => f.debug_tuple("Rejected").field(error).finish(),
            Resolution::Deferred(deferred) => f.debug_tuple("Deferred").field(&deferred.id()).finish(),
        }
    }
}

// ============================================================================
// Continuation
// ============================================================================

/// A pair of optional handlers for [`Deferred::register_continuation`].
///
/// A missing handler passes that outcome through unchanged.
pub struct Continuation<T, E> {
    on_fulfilled: Option<FulfilledHandler<T, E>>,
    on_rejected: Option<RejectedHandler<T, E>>,
}

impl<T, E> Continuation<T, E> {
    /// A continuation with no handlers (pure pass-through).
    pub fn new() -> Self {
        Self {
            on_fulfilled: None,
            on_rejected: None,
        }
    }

    /// Sets the handler run when the value fulfills.
    pub fn on_fulfilled<F, R>(mut self, f: F) -> Self
    where
        F: FnOnce(T) -> R + 'static,
        R: Into<Resolution<T, E>>,
    {
        self.on_fulfilled = Some(Box::new(move |value| f(value).into()));
        self
    }

    /// Sets the handler run when the value rejects.
    pub fn on_rejected<G, R>(mut self, g: G) -> Self
    where
        G: FnOnce(E) -> R + 'static,
        R: Into<Resolution<T, E>>,
    {
        self.on_rejected = Some(Box::new(move |error| g(error).into()));
        self
    }
}

impl<T, E> Default for Continuation<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// The settling side of a deferred value.
///
/// All clones share one "already resolved" flag: only the first `fulfill`,
/// `reject`, or `resolve` across every clone has any effect.
pub struct Resolver<T, E> {
    target: Deferred<T, E>,
    resolved: Rc<Cell<bool>>,
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            resolved: Rc::clone(&self.resolved),
        }
    }
}

impl<T: Settleable, E: Reason> Resolver<T, E> {
    /// Fulfills the target with `value`.
    pub fn fulfill(&self, value: T) {
        self.resolve(Resolution::Fulfilled(value));
    }

    /// Rejects the target with `error`.
    pub fn reject(&self, error: E) {
        self.resolve(Resolution::Rejected(error));
    }

    /// Settles the target with a ready outcome.
    pub fn settle(&self, settlement: Settlement<T, E>) {
        self.resolve(settlement.into());
    }

    /// Resolves the target, adopting another deferred value if given one.
    pub fn resolve(&self, resolution: Resolution<T, E>) {
        if self.resolved.replace(true) {
            tracing::trace!(deferred = %self.target.id(), "Ignoring repeated resolution");
            return;
        }
        match resolution {
            Resolution::Fulfilled(value) => self.target.settle(Settlement::Fulfilled(value)),
            Resolution::Rejected(error) => self.target.settle(Settlement::Rejected(error)),
            Resolution::Deferred(source) => self.target.adopt(source),
        }
    }

    /// Returns `true` once any clone of this resolver has been used.
    pub fn is_resolved(&self) -> bool {
        self.resolved.get()
    }

    /// The deferred value this resolver settles.
    pub fn deferred(&self) -> &Deferred<T, E> {
        &self.target
    }
}

impl<T, E> fmt::Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("deferred", &self.target.id())
            .field("resolved", &self.resolved.get())
            .finish()
    }
}

// ============================================================================
// Deferred
// ============================================================================

/// A single-assignment value that settles asynchronously.
///
/// Cheap to clone; clones observe the same state.
pub struct Deferred<T, E> {
    shared: Rc<Shared<T, E>>,
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T, E> Deferred<T, E> {
    /// The identifier assigned by the event loop.
    pub fn id(&self) -> DeferredId {
        self.shared.id
    }

    /// Returns `true` if both handles refer to the same value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    /// The current state.
    pub fn state(&self) -> SettleState {
        match &*self.shared.state.borrow() {
            State::Pending(_) => SettleState::Pending,
            State::Settled(settlement) => settlement.state(),
        }
    }

    /// Returns `true` until the value settles.
    pub fn is_pending(&self) -> bool {
        self.state().is_pending()
    }
}

impl<T: Settleable, E: Reason> Deferred<T, E> {
    /// Creates a pending value together with its resolver.
    pub fn pending(event_loop: &EventLoop) -> (Self, Resolver<T, E>) {
        Self::pending_on(event_loop.handle())
    }

    pub(crate) fn pending_on(event_loop: LoopRef) -> (Self, Resolver<T, E>) {
        let deferred = Self {
            shared: Rc::new(Shared {
                id: event_loop.next_deferred_id(),
                event_loop,
                state: RefCell::new(State::Pending(Vec::new())),
                handled: Cell::new(false),
            }),
        };
        let resolver = Resolver {
            target: deferred.clone(),
            resolved: Rc::new(Cell::new(false)),
        };
        (deferred, resolver)
    }

    /// Creates a value and runs `initiator` synchronously to start its work.
    ///
    /// The initiator receives the resolver; it may settle immediately, keep
    /// the resolver for later, or hand it to a timer or another continuation.
    /// Returning `Err` rejects the value unless it was already resolved.
    pub fn new<F>(event_loop: &EventLoop, initiator: F) -> Self
    where
        F: FnOnce(Resolver<T, E>) -> Result<(), E>,
    {
        let (deferred, resolver) = Self::pending(event_loop);
        if let Err(error) = initiator(resolver.clone()) {
            tracing::debug!(deferred = %deferred.id(), "Initiator failed");
            resolver.reject(error);
        }
        deferred
    }

    /// An already-fulfilled value.
    pub fn fulfilled(event_loop: &EventLoop, value: T) -> Self {
        Self::resolved(event_loop, Resolution::Fulfilled(value))
    }

    /// An already-rejected value.
    pub fn rejected(event_loop: &EventLoop, error: E) -> Self {
        Self::resolved(event_loop, Resolution::Rejected(error))
    }

    /// A value resolved with `resolution`; a deferred resolution is adopted.
    pub fn resolved(event_loop: &EventLoop, resolution: Resolution<T, E>) -> Self {
        let (deferred, resolver) = Self::pending(event_loop);
        resolver.resolve(resolution);
        deferred
    }

    /// A value that settles with `settlement` once `delay` of loop time passes.
    pub fn after(event_loop: &EventLoop, delay: Duration, settlement: Settlement<T, E>) -> Self {
        let (deferred, resolver) = Self::pending(event_loop);
        event_loop.set_timeout(delay, move || resolver.settle(settlement));
        deferred
    }

    /// The outcome, once settled.
    pub fn settlement(&self) -> Option<Settlement<T, E>> {
        match &*self.shared.state.borrow() {
            State::Pending(_) => None,
            State::Settled(settlement) => Some(settlement.clone()),
        }
    }

    /// Registers an optional pair of handlers and returns the composite value.
    ///
    /// The composite settles with whatever the matching handler resolves to;
    /// a missing handler passes the outcome through.
    pub fn register_continuation(&self, continuation: Continuation<T, E>) -> Self {
        let Continuation {
            on_fulfilled,
            on_rejected,
        } = continuation;
        self.chain(move |settlement| match settlement {
            Settlement::Fulfilled(value) => match on_fulfilled {
                Some(f) => f(value),
                None => Resolution::Fulfilled(value),
            },
            Settlement::Rejected(error) => match on_rejected {
                Some(g) => g(error),
                None => Resolution::Rejected(error),
            },
        })
    }

    /// Runs `f` on fulfillment; `Err` rejects the composite. Rejections pass through.
    pub fn then<U, F>(&self, f: F) -> Deferred<U, E>
    where
        U: Settleable,
        F: FnOnce(T) -> Result<U, E> + 'static,
    {
        self.then_with(move |value| f(value).into())
    }

    /// Runs `f` on fulfillment and adopts the deferred value it returns.
    pub fn and_then<U, F>(&self, f: F) -> Deferred<U, E>
    where
        U: Settleable,
        F: FnOnce(T) -> Deferred<U, E> + 'static,
    {
        self.then_with(move |value| Resolution::Deferred(f(value)))
    }

    /// Runs `f` on fulfillment and resolves the composite with its result.
    pub fn then_with<U, F>(&self, f: F) -> Deferred<U, E>
    where
        U: Settleable,
        F: FnOnce(T) -> Resolution<U, E> + 'static,
    {
        self.chain(move |settlement| match settlement {
            Settlement::Fulfilled(value) => f(value),
            Settlement::Rejected(error) => Resolution::Rejected(error),
        })
    }

    /// Handles both outcomes.
    pub fn then_or_else<U, F, G>(&self, f: F, g: G) -> Deferred<U, E>
    where
        U: Settleable,
        F: FnOnce(T) -> Resolution<U, E> + 'static,
        G: FnOnce(E) -> Resolution<U, E> + 'static,
    {
        self.chain(move |settlement| match settlement {
            Settlement::Fulfilled(value) => f(value),
            Settlement::Rejected(error) => g(error),
        })
    }

    /// Recovers from a rejection; `Err` rejects the composite again.
    ///
    /// Equivalent to a continuation with only an error handler.
    pub fn catch<G>(&self, g: G) -> Self
    where
        G: FnOnce(E) -> Result<T, E> + 'static,
    {
        self.register_continuation(Continuation::new().on_rejected(g))
    }

    /// Recovers from a rejection with another deferred value.
    pub fn or_else<G>(&self, g: G) -> Self
    where
        G: FnOnce(E) -> Deferred<T, E> + 'static,
    {
        self.register_continuation(Continuation::new().on_rejected(g))
    }

    /// Maps the fulfillment value.
    pub fn map<U, F>(&self, f: F) -> Deferred<U, E>
    where
        U: Settleable,
        F: FnOnce(T) -> U + 'static,
    {
        self.then_with(move |value| Resolution::Fulfilled(f(value)))
    }

    /// Maps the rejection reason.
    pub fn map_err<R, G>(&self, g: G) -> Deferred<T, R>
    where
        R: Reason,
        G: FnOnce(E) -> R + 'static,
    {
        self.chain(move |settlement| settlement.map_err(g).into())
    }

    /// Runs `f` after either outcome and passes the outcome through.
    ///
    /// If `f` fails, the composite rejects with its error instead.
    pub fn finally<F>(&self, f: F) -> Self
    where
        F: FnOnce() -> Result<(), E> + 'static,
    {
        self.chain(move |settlement| match f() {
            Ok(()) => settlement.into(),
            Err(error) => Resolution::Rejected(error),
        })
    }

    /// Creates a child value resolved by `handler` once this value settles.
    pub(crate) fn chain<U, R, F>(&self, handler: F) -> Deferred<U, R>
    where
        U: Settleable,
        R: Reason,
        F: FnOnce(Settlement<T, E>) -> Resolution<U, R> + 'static,
    {
        let (child, resolver) = Deferred::pending_on(self.shared.event_loop.clone());
        tracing::trace!(parent = %self.id(), child = %child.id(), "Registered continuation");
        self.subscribe(move |settlement| resolver.resolve(handler(settlement)));
        child
    }

    /// Adds a raw reaction. It runs on the task queue after settlement.
    pub(crate) fn subscribe<F>(&self, reaction: F)
    where
        F: FnOnce(Settlement<T, E>) + 'static,
    {
        let first_subscriber = !self.shared.handled.replace(true);
        let settled = {
            let mut state = self.shared.state.borrow_mut();
            match &mut *state {
                State::Pending(reactions) => {
                    reactions.push(Box::new(reaction));
                    return;
                }
                State::Settled(settlement) => settlement.clone(),
            }
        };
        if first_subscriber && settled.is_rejected() {
            self.shared.event_loop.rejection_handled(self.id());
        }
        self.shared.event_loop.enqueue(move || reaction(settled));
    }

    fn settle(&self, settlement: Settlement<T, E>) {
        let reactions = {
            let mut state = self.shared.state.borrow_mut();
            if !matches!(*state, State::Pending(_)) {
                tracing::trace!(deferred = %self.id(), "Ignoring settlement of settled value");
                return;
            }
            match std::mem::replace(&mut *state, State::Settled(settlement.clone())) {
                State::Pending(reactions) => reactions,
                State::Settled(_) => Vec::new(),
            }
        };
        tracing::debug!(
            deferred = %self.id(),
            state = %settlement.state(),
            reactions = reactions.len(),
            "Settled"
        );
        if let Settlement::Rejected(reason) = &settlement
            && !self.shared.handled.get()
        {
            self.shared.event_loop.track_rejection(self.id(), reason);
        }
        for reaction in reactions {
            let settlement = settlement.clone();
            self.shared.event_loop.enqueue(move || reaction(settlement));
        }
    }

    fn adopt(&self, source: Deferred<T, E>) {
        if self.ptr_eq(&source) {
            tracing::warn!(deferred = %self.id(), "A deferred value cannot adopt itself; it stays pending");
            return;
        }
        tracing::debug!(deferred = %self.id(), source = %source.id(), "Adopting settlement");
        let target = self.clone();
        source.subscribe(move |settlement| target.settle(settlement));
    }
}

impl<T: Settleable, E: Reason> Deferred<Deferred<T, E>, E> {
    /// Collapses a deferred value of a deferred value into one level.
    pub fn flatten(&self) -> Deferred<T, E> {
        self.chain(|settlement| match settlement {
            Settlement::Fulfilled(inner) => Resolution::Deferred(inner),
            Settlement::Rejected(error) => Resolution::Rejected(error),
        })
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}
