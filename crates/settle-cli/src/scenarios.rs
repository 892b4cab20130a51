//! Built-in scenarios.
//!
//! Each scenario builds a small program on an event loop and returns the
//! deferred value holding its final result.

use settle::{
    Deferred, Error, EventLoop, LoopConfig, Result, Settlement, all_of, first_of,
};
use std::time::Duration;

use crate::report::Report;

type Outcome = Deferred<String, String>;

/// A named, runnable scenario.
#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    /// Name used on the command line
    pub name: &'static str,

    /// One-line description
    pub description: &'static str,

    build: fn(&EventLoop) -> Outcome,
}

impl Scenario {
    /// Builds the scenario on `event_loop` without running it.
    pub fn build(&self, event_loop: &EventLoop) -> Outcome {
        (self.build)(event_loop)
    }
}

/// Every built-in scenario, in listing order.
pub const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "chain",
        description: "then/catch chain where a failing step is recovered",
        build: chain,
    },
    Scenario {
        name: "all",
        description: "all_of over staggered timers keeps input order",
        build: all,
    },
    Scenario {
        name: "race",
        description: "first_of between a slow and a fast value",
        build: race,
    },
    Scenario {
        name: "async",
        description: "async body awaiting two values in sequence",
        build: async_body,
    },
    Scenario {
        name: "unhandled",
        description: "a rejection nobody handles is reported",
        build: unhandled,
    },
];

/// Looks up a scenario by name.
pub fn find_scenario(name: &str) -> Result<&'static Scenario> {
    SCENARIOS
        .iter()
        .find(|scenario| scenario.name == name)
        .ok_or_else(|| Error::unknown_scenario(name))
}

/// Runs a scenario on a fresh loop and reports how it settled.
pub fn run_scenario(name: &str, config: LoopConfig) -> Result<Report> {
    let scenario = find_scenario(name)?;
    let event_loop = EventLoop::with_config(config);
    tracing::info!(scenario = scenario.name, "Running scenario");

    let result = scenario.build(&event_loop);
    let stats = event_loop.run_until_idle()?;
    let outcome = result.settlement();
    tracing::info!(
        scenario = scenario.name,
        state = %result.state(),
        tasks = stats.tasks_run,
        "Scenario finished"
    );

    Ok(Report::new(
        scenario.name,
        outcome,
        stats,
        event_loop.drain_unhandled_rejections(),
    ))
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn chain(event_loop: &EventLoop) -> Outcome {
    let el = event_loop.clone();
    Deferred::after(event_loop, ms(10), Settlement::Fulfilled("user-42".to_string()))
        .and_then(move |user| {
            Deferred::after(&el, ms(5), Settlement::Fulfilled(format!("{user}/profile")))
        })
        .then(|profile| -> std::result::Result<String, String> {
            Err(format!("{profile} is private"))
        })
        .catch(|reason| Ok(format!("guest profile (recovered: {reason})")))
}

fn all(event_loop: &EventLoop) -> Outcome {
    let members = [(10, "a"), (5, "b"), (1, "c")]
        .into_iter()
        .map(|(delay, label)| {
            Deferred::after(event_loop, ms(delay), Settlement::Fulfilled(label.to_string()))
        });
    all_of(event_loop, members).map(|labels| labels.join(","))
}

fn race(event_loop: &EventLoop) -> Outcome {
    first_of(
        event_loop,
        [
            Deferred::after(event_loop, ms(50), Settlement::Fulfilled("slow".to_string())),
            Deferred::after(event_loop, ms(5), Settlement::Fulfilled("fast".to_string())),
        ],
    )
}

fn async_body(event_loop: &EventLoop) -> Outcome {
    let el = event_loop.clone();
    event_loop.spawn_async(async move {
        let first = Deferred::<u32, String>::after(&el, ms(8), Settlement::Fulfilled(20)).await?;
        let second = Deferred::<u32, String>::after(&el, ms(4), Settlement::Fulfilled(22)).await?;
        Ok(format!("{first} + {second} = {}", first + second))
    })
}

fn unhandled(event_loop: &EventLoop) -> Outcome {
    let _orphan: Outcome = Deferred::after(
        event_loop,
        ms(3),
        Settlement::Rejected("nobody is listening".to_string()),
    );
    Deferred::after(event_loop, ms(6), Settlement::Fulfilled("done".to_string()))
}
