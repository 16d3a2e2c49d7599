//! Line classification, variable expansion, and pipeline tokenization.
//!
//! One raw line goes through three phases:
//!
//! 1. **Classification**: blank and comment lines produce nothing;
//!    `NAME=VALUE` lines mutate the variable table and produce nothing;
//!    everything else is a command line.
//! 2. **Expansion**: `${NAME}` and `$NAME` references are rewritten to
//!    their bound values in a single, non-recursive pass.
//! 3. **Tokenization**: the expanded line is split on `|` into stages,
//!    each with a command (resolved immediately), arguments, and redirects.
//!
//! Errors in any phase abort the whole line; a failed line never leaves a
//! partial pipeline or half-applied expansion behind.

use crate::command::{CommandStage, Pipeline};
use crate::env::VarTable;
use crate::external::resolve_executable;
use log::debug;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use thiserror::Error;

/// `NAME=VALUE` with a well-formed name. Any other line containing `=` is a
/// malformed assignment, not a command.
static ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_]+)=(.*)$").unwrap());

/// Errors surfaced while turning one input line into a pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The line starts with `=`, leaving the variable unnamed.
    #[error("variable names may not start with '='")]
    EmptyVariableName,
    /// A variable name contains something other than a letter or `_`.
    #[error("invalid character '{found}' in variable name")]
    InvalidVariableName { found: char },
    /// A `${` reference ran to end of line without its closing brace.
    #[error("unmatched '{{' in variable reference")]
    UnterminatedReference,
    /// A reference named a variable the table does not hold.
    #[error("undefined variable '{name}'")]
    UndefinedVariable { name: String },
    /// A `$` with no name behind it.
    #[error("'$' must introduce a variable reference")]
    DanglingDollar,
    /// The stage's command token did not resolve to anything invocable.
    #[error("command not found: {name}")]
    CommandNotFound { name: String },
    /// A stage began with a character that cannot start a command.
    #[error("commands must start with a letter or '_' (found '{found}')")]
    BadStageStart { found: char },
    /// A `|` with no command between it and the next `|` or line end.
    #[error("empty command in pipeline")]
    EmptyStage,
    /// A redirect operator without a usable file name after it.
    #[error("redirection requires a target file name")]
    MissingRedirectTarget,
}

/// Turn one raw input line into a pipeline.
///
/// Returns `Ok(None)` for lines that produce nothing to execute: blank
/// lines, comment lines, and assignments (whose whole effect is mutating
/// `table`). Assignment values are stored literally; references are only
/// expanded when they appear in a later command line.
pub fn parse_line(line: &str, table: &mut VarTable) -> Result<Option<Pipeline>, ParseError> {
    let significant = line.trim_start();
    if significant.is_empty() || significant.starts_with('#') {
        return Ok(None);
    }

    if line.starts_with('=') {
        return Err(ParseError::EmptyVariableName);
    }

    if let Some(eq) = line.find('=') {
        // A line containing `=` is an assignment or it is nothing.
        let Some(caps) = ASSIGNMENT.captures(line) else {
            let found = line[..eq]
                .chars()
                .find(|&c| !is_name_char(c))
                .unwrap_or('=');
            return Err(ParseError::InvalidVariableName { found });
        };
        table.upsert(&caps[1], &caps[2]);
        return Ok(None);
    }

    let expanded = expand_line(line, table)?;
    if expanded.trim().is_empty() {
        return Ok(None);
    }
    PipelineBuilder::new(&expanded).build(table).map(Some)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Rewrite `${NAME}` and `$NAME` references to their bound values.
///
/// Substitution is a single pass: values are spliced in verbatim and never
/// re-scanned for further references. Any `$` that does not introduce a
/// well-formed reference to a bound variable fails the whole line. A bare
/// `$NAME` ends at whitespace, `.`, or the end of the line; the delimiter
/// itself is copied through like any other character.
fn expand_line(line: &str, table: &VarTable) -> Result<String, ParseError> {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '$' {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        if chars.get(i + 1) == Some(&'{') {
            let mut j = i + 2;
            while j < chars.len() && chars[j] != '}' {
                if !is_name_char(chars[j]) {
                    return Err(ParseError::InvalidVariableName { found: chars[j] });
                }
                j += 1;
            }
            if j == chars.len() {
                return Err(ParseError::UnterminatedReference);
            }
            let name: String = chars[i + 2..j].iter().collect();
            out.push_str(lookup_or_fail(&name, table)?);
            i = j + 1;
        } else {
            let mut j = i + 1;
            while j < chars.len() && !chars[j].is_ascii_whitespace() && chars[j] != '.' {
                if !is_name_char(chars[j]) {
                    return Err(ParseError::InvalidVariableName { found: chars[j] });
                }
                j += 1;
            }
            let name: String = chars[i + 1..j].iter().collect();
            out.push_str(lookup_or_fail(&name, table)?);
            i = j;
        }
    }

    debug!("expanded {line:?} -> {out:?}");
    Ok(out)
}

fn lookup_or_fail<'t>(name: &str, table: &'t VarTable) -> Result<&'t str, ParseError> {
    if name.is_empty() {
        return Err(ParseError::DanglingDollar);
    }
    table.lookup(name).ok_or_else(|| ParseError::UndefinedVariable {
        name: name.to_string(),
    })
}

/// What ended a stage scan.
enum Terminator {
    Pipe,
    EndOfLine,
    Comment,
}

/// Cursor over the expanded line, consumed while stages are built.
struct PipelineBuilder {
    chars: Vec<char>,
    pos: usize,
}

impl PipelineBuilder {
    fn new(line: &str) -> Self {
        Self {
            chars: line.chars().collect(),
            pos: 0,
        }
    }

    fn build(mut self, table: &VarTable) -> Result<Pipeline, ParseError> {
        let mut stages = Vec::new();
        loop {
            let (stage, terminator) = self.next_stage(table)?;
            stages.push(stage);
            match terminator {
                Terminator::Pipe => continue,
                Terminator::EndOfLine | Terminator::Comment => break,
            }
        }
        Ok(stages)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// A run of characters up to the next whitespace or operator.
    fn word(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| !c.is_ascii_whitespace() && !matches!(c, '|' | '<' | '>'))
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn next_stage(&mut self, table: &VarTable) -> Result<(CommandStage, Terminator), ParseError> {
        self.skip_whitespace();
        let first = self.peek().ok_or(ParseError::EmptyStage)?;
        if first == '|' {
            return Err(ParseError::EmptyStage);
        }
        if !is_name_char(first) {
            return Err(ParseError::BadStageStart { found: first });
        }

        let name = self.word();
        let exec = resolve_executable(&name, table)
            .ok_or_else(|| ParseError::CommandNotFound { name: name.clone() })?;
        let mut stage = CommandStage::new(exec, name);

        loop {
            match self.peek() {
                None => return Ok((stage, Terminator::EndOfLine)),
                Some(c) if c.is_ascii_whitespace() => self.pos += 1,
                Some('|') => {
                    self.pos += 1;
                    return Ok((stage, Terminator::Pipe));
                }
                // The comment swallows the rest of the line, pipes included.
                Some('#') => return Ok((stage, Terminator::Comment)),
                Some('>') => {
                    self.pos += 1;
                    let append = self.peek() == Some('>');
                    if append {
                        self.pos += 1;
                    }
                    stage.redirect_out = Some(self.redirect_target()?);
                    stage.append = append;
                }
                Some('<') => {
                    self.pos += 1;
                    stage.redirect_in = Some(self.redirect_target()?);
                }
                Some(_) => stage.argv.push(self.word()),
            }
        }
    }

    fn redirect_target(&mut self) -> Result<PathBuf, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            None | Some('|' | '<' | '>' | '#') => Err(ParseError::MissingRedirectTarget),
            Some(_) => Ok(PathBuf::from(self.word())),
        }
    }
}
