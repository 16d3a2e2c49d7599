//! Binary entry point: argument handling, logging, and the line sources
//! that feed the shell core.

use anyhow::{Context, Result};
use argh::FromArgs;
use lineshell::Interpreter;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

const PROMPT: &str = "$ ";

#[derive(FromArgs)]
/// A tiny line-oriented shell: variables, pipelines, and redirection.
struct Args {
    /// script of shell lines to run instead of an interactive session
    #[argh(positional)]
    script: Option<PathBuf>,

    /// enable debug logging on stderr
    #[argh(switch, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)
        .context("failed to initialize logging")?;

    let mut interp = Interpreter::from_host_env();
    match args.script {
        Some(path) => run_script(&path, &mut interp),
        None => repl(&mut interp),
    }
}

/// Feed every line of `path` through the session.
///
/// A line that fails to parse or orchestrate stops the script; a command
/// that merely exits nonzero does not.
fn run_script(path: &Path, interp: &mut Interpreter) -> Result<()> {
    let file =
        File::open(path).with_context(|| format!("cannot open script {}", path.display()))?;
    for line in BufReader::new(file).lines() {
        let line = line.context("failed reading script line")?;
        if let Some(status) = interp
            .eval(&line)
            .with_context(|| format!("error in script line: {line}"))?
        {
            log::debug!("script line exited with status {status}");
        }
    }
    Ok(())
}

/// Interactive prompt loop over the same eval path. Errors from a line are
/// printed and the prompt comes back; only a broken terminal ends the loop.
fn repl(interp: &mut Interpreter) -> Result<()> {
    let mut editor = DefaultEditor::new().context("failed to open the terminal")?;
    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                editor.add_history_entry(line.as_str()).ok();
                if let Err(err) = interp.eval(&line) {
                    eprintln!("lineshell: {err}");
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err).context("could not read input line"),
        }
    }
    Ok(())
}
