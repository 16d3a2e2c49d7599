//! Pipeline execution and the shell session.

use crate::builtin::run_builtin;
use crate::command::{Exec, ExitCode, Pipeline};
use crate::env::VarTable;
use crate::external::{self, StageHandle};
use crate::parser::{self, ParseError};
use log::debug;
use std::io;
use thiserror::Error;

/// Orchestration failures: the pipeline could not be wired or its processes
/// could not be created. These abort the remaining pipeline outright,
/// unlike a stage that merely exits nonzero.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The kernel refused a pipe pair (descriptor exhaustion).
    #[error("failed to create pipe: {0}")]
    Pipe(#[source] io::Error),
    /// Process creation failed for a reason other than a bad program image.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    /// A child's exit status could not be collected.
    #[error("failed to collect child status: {0}")]
    Wait(#[source] io::Error),
    /// A builtin appeared in a multi-stage pipeline; builtins are only
    /// valid as the whole line.
    #[error("cd cannot be part of a multi-command pipeline")]
    BuiltinInPipeline,
}

/// Either phase of handling one input line.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Execute a pipeline to completion and report its aggregate status.
///
/// Every stage is spawned before any is waited on. Stage *i* writes into a
/// fresh pipe read by stage *i+1*, unless an explicit redirect overrides
/// that direction; the first stage reads and the last stage writes the
/// shell's own inherited streams. Pipe ends are moved into the child that
/// uses them and dropped in the parent as each stage starts, so readers see
/// EOF as soon as every writer is gone, on error paths included.
///
/// Statuses are then collected in stage order and each one replaces the
/// running aggregate; the last stage's status is the pipeline's result. A
/// stage that never materialized (unopenable redirect, unstartable image)
/// contributes its distinguished status the same way.
pub fn execute_pipeline(pipeline: Pipeline) -> Result<ExitCode, ExecError> {
    if pipeline.is_empty() {
        return Ok(0);
    }
    if let [stage] = pipeline.as_slice() {
        if let Exec::Builtin(builtin) = &stage.exec {
            return Ok(run_builtin(*builtin, &stage.argv));
        }
    }
    if pipeline
        .iter()
        .any(|stage| matches!(stage.exec, Exec::Builtin(_)))
    {
        return Err(ExecError::BuiltinInPipeline);
    }

    let count = pipeline.len();
    let mut handles: Vec<StageHandle> = Vec::with_capacity(count);
    let mut upstream = None;

    for (i, stage) in pipeline.into_iter().enumerate() {
        let (next_upstream, downstream) = if i + 1 < count {
            match io::pipe() {
                Ok((reader, writer)) => (Some(reader), Some(writer)),
                Err(err) => {
                    reap(handles);
                    return Err(ExecError::Pipe(err));
                }
            }
        } else {
            (None, None)
        };

        match external::start_stage(stage, upstream.take(), downstream) {
            Ok(handle) => handles.push(handle),
            Err(err) => {
                reap(handles);
                return Err(err);
            }
        }
        upstream = next_upstream;
    }

    let mut aggregate = 0;
    for handle in handles {
        aggregate = match handle {
            StageHandle::Failed(status) => status,
            StageHandle::Running(mut child) => {
                let status = child.wait().map_err(ExecError::Wait)?;
                external::stage_status(status)
            }
        };
    }
    debug!("pipeline finished with status {aggregate}");
    Ok(aggregate)
}

/// Reclaim children that were already spawned when an orchestration failure
/// aborts the pipeline, so no zombie outlives the call.
fn reap(handles: Vec<StageHandle>) {
    for handle in handles {
        if let StageHandle::Running(mut child) = handle {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// A shell session: the variable table plus the parse-then-execute
/// composition the line sources drive.
///
/// The table lives exactly as long as the session and is only ever touched
/// through it; there is no ambient global state.
#[derive(Debug, Default)]
pub struct Interpreter {
    vars: VarTable,
}

impl Interpreter {
    /// A session with an empty variable table. Nothing resolves until the
    /// caller binds `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A session with `PATH` seeded from the process environment, the way
    /// an outer shell hands its search path down.
    pub fn from_host_env() -> Self {
        let mut interp = Self::new();
        if let Ok(path) = std::env::var("PATH") {
            interp.vars.upsert("PATH", &path);
        }
        interp
    }

    /// Bind or rebind a variable in the session table.
    pub fn bind(&mut self, name: &str, value: &str) {
        self.vars.upsert(name, value);
    }

    /// The session's variable table.
    pub fn vars(&self) -> &VarTable {
        &self.vars
    }

    /// Parse one line and, if it yields a pipeline, run it.
    ///
    /// `Ok(None)` means the line had nothing to execute (blank, comment, or
    /// assignment).
    pub fn eval(&mut self, line: &str) -> Result<Option<ExitCode>, ShellError> {
        match parser::parse_line(line, &mut self.vars)? {
            None => Ok(None),
            Some(pipeline) => Ok(Some(execute_pipeline(pipeline)?)),
        }
    }
}
