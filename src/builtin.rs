//! Commands executed inside the shell's own process.

use crate::command::ExitCode;
use argh::{EarlyExit, FromArgs};
use std::path::PathBuf;

/// Built-in commands known to the shell at compile time.
///
/// A builtin never spawns a child process; it runs on the calling thread
/// and its return value feeds straight into the pipeline's aggregate
/// status. Builtins are only valid as the sole stage of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `cd`: change the shell's working directory.
    Cd,
}

impl Builtin {
    /// The builtin handling `name`, if any.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cd" => Some(Builtin::Cd),
            _ => None,
        }
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
struct Cd {
    #[argh(positional)]
    /// directory to switch to; defaults to the user's home directory
    target: Option<PathBuf>,
}

/// Run a builtin in-process with the stage's argv.
///
/// Returns a shell status: 0 on success, nonzero on failure. Failures are
/// reported on stderr and never abort the session.
pub(crate) fn run_builtin(builtin: Builtin, argv: &[String]) -> ExitCode {
    match builtin {
        Builtin::Cd => run_cd(argv),
    }
}

fn run_cd(argv: &[String]) -> ExitCode {
    let args: Vec<&str> = argv.iter().skip(1).map(String::as_str).collect();
    let cd = match Cd::from_args(&[argv[0].as_str()], &args) {
        Ok(cd) => cd,
        Err(EarlyExit { output, status }) => {
            return if status.is_err() {
                eprintln!("{output}");
                1
            } else {
                println!("{output}");
                0
            };
        }
    };

    let target = match cd.target {
        Some(dir) => dir,
        None => match dirs::home_dir() {
            Some(home) => home,
            None => {
                eprintln!("cd: cannot determine home directory");
                return 1;
            }
        },
    };

    match std::env::set_current_dir(&target) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("cd: {}: {err}", target.display());
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn cd_is_the_only_builtin() {
        assert_eq!(Builtin::from_name("cd"), Some(Builtin::Cd));
        assert_eq!(Builtin::from_name("pwd"), None);
        assert_eq!(Builtin::from_name("exit"), None);
    }

    #[test]
    fn cd_to_missing_directory_is_nonzero() {
        let status = run_builtin(Builtin::Cd, &argv(&["cd", "/definitely/not/a/dir"]));
        assert_ne!(status, 0);
    }

    #[test]
    fn cd_rejects_extra_arguments() {
        let status = run_builtin(Builtin::Cd, &argv(&["cd", "a", "b"]));
        assert_ne!(status, 0);
    }

    #[test]
    #[cfg(unix)]
    fn cd_changes_directory() {
        let cwd_before = std::env::current_dir().expect("cwd");
        let tmp = tempfile::tempdir().expect("tempdir");
        // Canonicalize first: the tempdir may sit behind a symlink (macOS /tmp).
        let target = tmp.path().canonicalize().expect("canonicalize");

        let status = run_builtin(Builtin::Cd, &argv(&["cd", target.to_str().unwrap()]));
        let cwd_after = std::env::current_dir().expect("cwd");
        // Restore early so a failed assertion doesn't poison other tests.
        std::env::set_current_dir(&cwd_before).ok();

        assert_eq!(status, 0);
        assert_eq!(cwd_after, target);
    }
}
