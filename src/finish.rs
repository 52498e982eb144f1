//! What happens after a successful reify.

use std::future::Future;
use std::path::PathBuf;

use anyhow::Context as _;
use chrono::Local;
use console::{style, Term};

use crate::context::RuntimeContext;
use crate::engine::{Engine, ReifyOutcome};
use crate::state::{self, UpdateRecord};

/// Runs once an engine has reified successfully.
pub trait Finalize<E: Engine> {
    /// Persist and report the result of `engine`'s reify.
    fn finish(
        &self,
        ctx: &RuntimeContext,
        engine: &E,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Records the update in the state file and prints what changed.
#[derive(Clone, Debug)]
pub struct ReifyFinish {
    state_path: PathBuf,
    term: Option<Term>,
}

impl ReifyFinish {
    /// Create a finisher that keeps its state at `state_path` and reports to `term`.
    #[must_use]
    pub fn new(state_path: PathBuf, term: Term) -> Self {
        Self {
            state_path,
            term: Some(term),
        }
    }

    /// Create a finisher that only records the update.
    #[must_use]
    pub fn quiet(state_path: PathBuf) -> Self {
        Self {
            state_path,
            term: None,
        }
    }

    fn record(&self, ctx: &RuntimeContext, outcome: &ReifyOutcome) -> anyhow::Result<()> {
        let mut state = state::load(&self.state_path)?;
        state.last_update = Some(UpdateRecord {
            finished_at: Local::now(),
            path: ctx.target_path(),
            global: ctx.global,
            outcome: outcome.clone(),
        });
        state.updates += 1;
        state::save(&self.state_path, &state)
    }
}

impl<E: Engine + Sync> Finalize<E> for ReifyFinish {
    async fn finish(&self, ctx: &RuntimeContext, engine: &E) -> anyhow::Result<()> {
        let outcome = engine.outcome().cloned().unwrap_or_default();
        log::info!("Recording update...");
        self.record(ctx, &outcome)?;

        if let Some(term) = &self.term {
            term.write_line(&report(ctx, &outcome)?)?;
        }
        Ok(())
    }
}

/// What is printed after an update: the outcome as JSON, or a styled summary line.
///
/// # Errors
///
/// Returns an error if the outcome cannot be serialized.
pub fn report(ctx: &RuntimeContext, outcome: &ReifyOutcome) -> anyhow::Result<String> {
    if ctx.json {
        serde_json::to_string_pretty(outcome).context("could not serialize outcome")
    } else {
        Ok(format!("{}", style(summary(outcome)).bold()))
    }
}

fn packages(num: u64) -> String {
    if num == 1 {
        "1 package".to_string()
    } else {
        format!("{num} packages")
    }
}

/// Human-readable one-line summary of an outcome.
#[must_use]
pub fn summary(outcome: &ReifyOutcome) -> String {
    let changes: Vec<String> = [
        ("added", outcome.added),
        ("removed", outcome.removed),
        ("changed", outcome.changed),
    ]
    .into_iter()
    .filter(|(_, num)| *num > 0)
    .map(|(verb, num)| format!("{verb} {}", packages(num)))
    .collect();

    let mut line = if changes.is_empty() {
        "up to date".to_string()
    } else {
        changes.join(", ")
    };
    if outcome.audited > 0 {
        if changes.is_empty() {
            line.push_str(", audited ");
        } else {
            line.push_str(", and audited ");
        }
        line.push_str(&packages(outcome.audited));
    }
    line.push_str(" in ");
    line.push_str(&elapsed(outcome.elapsed_ms));
    line
}

fn elapsed(ms: u64) -> String {
    match ms {
        0..=999 => format!("{ms}ms"),
        1_000..=59_999 => format!("{}s", (ms + 500) / 1_000),
        _ => format!("{}m", (ms + 30_000) / 60_000),
    }
}
