//! Executable resolution and external process stages.

use crate::builtin::Builtin;
use crate::command::{CommandStage, Exec, ExitCode};
use crate::env::VarTable;
use crate::interpreter::ExecError;
use log::{debug, warn};
use std::fs::{File, OpenOptions};
use std::io::{self, PipeReader, PipeWriter};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

/// Status reported for a stage that never got to run: its redirect target
/// would not open or its program image would not start.
pub(crate) const STAGE_START_FAILURE: ExitCode = 127;

/// Resolve a command token to something the orchestrator can run.
///
/// Behavior:
/// - `cd` maps to the builtin sentinel, never to a filesystem path.
/// - A token containing a path separator is taken verbatim without an
///   existence check; a bad path surfaces at spawn time.
/// - Anything else is searched for in the directories listed by the table's
///   `PATH` value, in list order, returning the first directory entry whose
///   name matches the token exactly. Unreadable directories are skipped.
///
/// Returns `None` when nothing matches or no `PATH` is bound.
pub fn resolve_executable(token: &str, table: &VarTable) -> Option<Exec> {
    if let Some(builtin) = Builtin::from_name(token) {
        return Some(Exec::Builtin(builtin));
    }

    if token.contains('/') {
        return Some(Exec::Program(PathBuf::from(token)));
    }

    let search = table.path_value()?;
    for dir in search.split(':') {
        if let Some(path) = find_in_dir(Path::new(dir), token) {
            debug!("resolved {token} -> {}", path.display());
            return Some(Exec::Program(path));
        }
    }
    None
}

/// Scan one directory's entries for an exact file-name match.
fn find_in_dir(dir: &Path, token: &str) -> Option<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("skipping search directory {}: {err}", dir.display());
            return None;
        }
    };

    for entry in entries {
        let Ok(entry) = entry else { continue };
        if entry.file_name() == token {
            // join() collapses a trailing separator on the directory.
            return Some(dir.join(token));
        }
    }
    None
}

/// Outcome of starting one external stage.
pub(crate) enum StageHandle {
    /// The child process is running and must be waited on.
    Running(Child),
    /// The stage never started; carries its distinguished status.
    Failed(ExitCode),
}

/// Bind a stage's stdio and spawn it.
///
/// `upstream` and `downstream` are the pipe ends connecting the stage to
/// its neighbours; an explicit redirect takes precedence over either. Pipe
/// ends that go unused are dropped here, which is what lets the reader of a
/// redirected-away pipe see EOF.
///
/// A redirect target that will not open, or a program image that will not
/// start, is the stage's own failure: the handle carries
/// [`STAGE_START_FAILURE`] and the rest of the pipeline proceeds. Anything
/// else (process-creation resource exhaustion) is an [`ExecError`].
pub(crate) fn start_stage(
    stage: CommandStage,
    upstream: Option<PipeReader>,
    downstream: Option<PipeWriter>,
) -> Result<StageHandle, ExecError> {
    let Exec::Program(program) = stage.exec else {
        unreachable!("builtin stages never reach start_stage");
    };

    let stdin: Stdio = match &stage.redirect_in {
        Some(path) => match File::open(path) {
            Ok(file) => file.into(),
            Err(err) => {
                eprintln!("{}: {err}", path.display());
                return Ok(StageHandle::Failed(STAGE_START_FAILURE));
            }
        },
        None => match upstream {
            Some(reader) => reader.into(),
            None => Stdio::inherit(),
        },
    };

    let stdout: Stdio = match &stage.redirect_out {
        Some(path) => {
            let mut opts = OpenOptions::new();
            opts.write(true).create(true);
            if stage.append {
                opts.append(true);
            } else {
                opts.truncate(true);
            }
            match opts.open(path) {
                Ok(file) => file.into(),
                Err(err) => {
                    eprintln!("{}: {err}", path.display());
                    return Ok(StageHandle::Failed(STAGE_START_FAILURE));
                }
            }
        }
        None => match downstream {
            Some(writer) => writer.into(),
            None => Stdio::inherit(),
        },
    };

    let mut command = Command::new(&program);
    command.args(&stage.argv[1..]).stdin(stdin).stdout(stdout);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.arg0(&stage.argv[0]);
    }

    debug!("spawning {} as {:?}", program.display(), stage.argv);
    match command.spawn() {
        Ok(child) => Ok(StageHandle::Running(child)),
        Err(err) if is_exec_failure(&err) => {
            eprintln!("{}: {err}", program.display());
            Ok(StageHandle::Failed(STAGE_START_FAILURE))
        }
        Err(err) => Err(ExecError::Spawn {
            program: program.display().to_string(),
            source: err,
        }),
    }
}

/// `spawn` fuses process creation and image replacement. These error kinds
/// mean the image could not start, which counts as the stage's own failure
/// rather than an orchestration failure.
fn is_exec_failure(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
    )
}

/// Map a collected exit status onto a shell status code.
pub(crate) fn stage_status(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(code) => code,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_status: ExitStatus) -> ExitCode {
    -1
}
