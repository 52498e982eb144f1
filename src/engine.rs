//! The resolution engine the update command delegates to.
//!
//! Building the dependency graph and reifying it on disk is not done here. [`Engine`] is the
//! seam the update command talks to; [`ProcessEngine`] implements it by running an external
//! resolver executable.

use std::ffi::OsString;
use std::future::Future;
use std::io::ErrorKind;
use std::process::{ExitStatus, Stdio};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt as _;
use tokio::process::Command;

use crate::config::ResolverConfig;
use crate::directive::{EngineArgs, ReifyRequest, UpdateTarget};

/// A resolution engine bound to one working path.
pub trait Engine {
    /// Bring the installed tree in line with the request.
    fn reify(&mut self, request: &ReifyRequest)
        -> impl Future<Output = anyhow::Result<()>> + Send;

    /// What the last successful reify changed, if the engine reports it.
    fn outcome(&self) -> Option<&ReifyOutcome> {
        None
    }
}

/// Builds engines from their construction arguments.
pub trait EngineFactory {
    /// Engine type produced.
    type Engine: Engine;

    /// Build an engine for the given options and path.
    fn create(&self, args: EngineArgs) -> Self::Engine;
}

impl<F, E> EngineFactory for F
where
    F: Fn(EngineArgs) -> E,
    E: Engine,
{
    type Engine = E;

    fn create(&self, args: EngineArgs) -> E {
        self(args)
    }
}

/// Summary of what a reify changed, as reported by the resolver.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReifyOutcome {
    /// Packages newly installed.
    pub added: u64,
    /// Packages removed.
    pub removed: u64,
    /// Packages whose installed version changed.
    pub changed: u64,
    /// Packages looked at.
    pub audited: u64,
    /// Wall time spent reifying.
    pub elapsed_ms: u64,
}

/// Error running the external resolver.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The resolver could not be started.
    #[error("could not start resolver `{command}`: {source}")]
    Spawn {
        /// Resolver executable.
        command: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// I/O error while exchanging data with the resolver.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The resolver exited unsuccessfully.
    #[error("resolver exited with {0}")]
    Exit(ExitStatus),
    /// The engine arguments could not be encoded.
    #[error("could not encode engine arguments: {0}")]
    Encode(#[source] serde_json::Error),
    /// The resolver printed something other than an outcome.
    #[error("could not parse resolver output: {0}")]
    Output(#[source] serde_json::Error),
}

/// Builds [`ProcessEngine`]s for a configured resolver.
#[derive(Clone, Debug)]
pub struct ProcessEngineFactory {
    command: String,
    args: Vec<String>,
}

impl ProcessEngineFactory {
    /// Create a factory for the resolver named in the configuration.
    #[must_use]
    pub fn new(resolver: &ResolverConfig) -> Self {
        Self {
            command: resolver.command.clone(),
            args: resolver.args.clone(),
        }
    }
}

impl EngineFactory for ProcessEngineFactory {
    type Engine = ProcessEngine;

    fn create(&self, args: EngineArgs) -> ProcessEngine {
        ProcessEngine {
            command: self.command.clone(),
            args: self.args.clone(),
            engine_args: args,
            outcome: None,
        }
    }
}

/// Engine that runs an external resolver.
///
/// The resolver is invoked as `<command> <args>... --path <path> (--all | -- <names>...)`. It
/// receives the engine arguments as JSON on stdin and may print a [`ReifyOutcome`] as JSON on
/// stdout. Its stderr is passed through.
#[derive(Debug)]
pub struct ProcessEngine {
    command: String,
    args: Vec<String>,
    engine_args: EngineArgs,
    outcome: Option<ReifyOutcome>,
}

impl ProcessEngine {
    /// Arguments the resolver is run with for `request`.
    #[must_use]
    pub fn command_args(&self, request: &ReifyRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.args.iter().map(OsString::from).collect();
        args.push("--path".into());
        args.push(self.engine_args.path.clone().into_os_string());
        match &request.update {
            UpdateTarget::All => args.push("--all".into()),
            UpdateTarget::Named(names) => {
                args.push("--".into());
                args.extend(names.iter().map(OsString::from));
            }
        }
        args
    }

    async fn run(&self, request: &ReifyRequest) -> Result<ReifyOutcome, EngineError> {
        let input = serde_json::to_vec(&self.engine_args).map_err(EngineError::Encode)?;
        let args = self.command_args(request);
        log::info!("Running resolver {} {:?}...", self.command, args);

        let mut child = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        // Feed stdin while stdout is drained.
        let stdin = child.stdin.take();
        let write_input = async move {
            match stdin {
                Some(mut stdin) => stdin.write_all(&input).await,
                None => Ok(()),
            }
        };
        let (written, output) = tokio::join!(write_input, child.wait_with_output());
        match written {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                log::debug!("Resolver closed stdin without reading the engine arguments");
            }
            Err(err) => return Err(err.into()),
        }
        let output = output?;
        log::debug!("Resolver exited with {}", output.status);
        if !output.status.success() {
            return Err(EngineError::Exit(output.status));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            log::debug!("Resolver printed no outcome, assuming an empty one");
            return Ok(ReifyOutcome::default());
        }
        let outcome = serde_json::from_str(stdout.trim()).map_err(EngineError::Output)?;
        log::trace!("Resolver outcome: {outcome:#?}");
        Ok(outcome)
    }
}

impl Engine for ProcessEngine {
    async fn reify(&mut self, request: &ReifyRequest) -> anyhow::Result<()> {
        let outcome = self.run(request).await?;
        self.outcome = Some(outcome);
        Ok(())
    }

    fn outcome(&self) -> Option<&ReifyOutcome> {
        self.outcome.as_ref()
    }
}
