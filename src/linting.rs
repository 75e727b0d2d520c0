//! Run a linter and keep only the messages pointing at edited lines.
//!
//! Linter output is expected in the common `path:line: message` or
//! `path:line:column: message` form. Other lines are dropped.

use crate::EditedLinesDiffer;
use crate::git::GitCommandError;
use crate::revision::RevisionRange;
use error_set::error_set;
use log::debug;
use nom::{
    IResult, Parser,
    bytes::complete::{tag, take_till1},
    character::complete::{char, digit1},
    combinator::opt,
    sequence::preceded,
};
use path_clean::PathClean;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

error_set! {
    /// Errors from running a linter
    LintError := {
        #[display("Linting against {rev2} is not supported, only against the working tree")]
        UnsupportedRevision { rev2: String },
        #[display("Empty linter command line")]
        EmptyCommand,
        #[display("Failed to run linter '{command}': {message}")]
        LinterFailed { command: String, message: String },
        GitCommandError(GitCommandError),
    }
}

/// `path` and `line` from the location prefix of a linter message
fn location(input: &str) -> IResult<&str, (&str, &str)> {
    (
        take_till1(|c: char| c == ':'),
        char(':'),
        digit1,
        opt(preceded(char(':'), digit1)),
        tag(": "),
    )
        .parse(input)
        .map(|(rest, (path, _, line, _, _))| (rest, (path, line)))
}

/// Extract the file and line number a linter message refers to.
///
/// The path is returned relative to `root`. Relative paths in the message are
/// taken to be relative to `root` already.
///
/// ```
/// use edited_lines::parse_linter_line;
/// use std::path::{Path, PathBuf};
///
/// let root = Path::new("/repo");
/// assert_eq!(
///     parse_linter_line("module.py:42:5: E501 line too long", root),
///     Some((PathBuf::from("module.py"), 42))
/// );
/// assert_eq!(parse_linter_line("All done!", root), None);
/// ```
pub fn parse_linter_line(line: &str, root: &Path) -> Option<(PathBuf, usize)> {
    let (_, (path, linenum)) = location(line).ok()?;
    let linenum = linenum.parse().ok()?;
    let path = Path::new(path).clean();
    let path = if path.is_absolute() {
        path.strip_prefix(root.clean()).ok()?.to_path_buf()
    } else {
        path
    };
    Some((path, linenum))
}

/// Run `cmdline` on `paths` and return the output lines which refer to edited lines.
///
/// The command line is split on whitespace and the absolute paths are
/// appended in sorted order. The linter runs in `root`. Messages are kept if
/// they point at a line edited since `revrange.rev1`, without context.
///
/// # Errors
///
/// - [`LintError::UnsupportedRevision`] unless the range ends at the working tree
/// - [`LintError::EmptyCommand`] for a blank command line
/// - [`LintError::LinterFailed`] if the linter can't be started
/// - any git error from computing edited lines
pub fn run_linter(
    cmdline: &str,
    root: &Path,
    paths: &BTreeSet<PathBuf>,
    revrange: &RevisionRange,
) -> Result<Vec<String>, LintError> {
    if paths.is_empty() {
        return Ok(Vec::new());
    }
    if !revrange.rev2.is_worktree() {
        return Err(LintError::UnsupportedRevision {
            rev2: revrange.rev2.to_string(),
        });
    }
    let mut words = cmdline.split_whitespace();
    let program = words.next().ok_or(LintError::EmptyCommand)?;
    let differ = EditedLinesDiffer::new(root, revrange)?;

    debug!("[{}]$ {} {} path(s)", root.display(), cmdline, paths.len());
    let output = Command::new(program)
        .args(words)
        .args(paths.iter().map(|path| root.join(path)))
        .current_dir(root)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|e| LintError::LinterFailed {
            command: cmdline.to_string(),
            message: e.to_string(),
        })?;
    if !output.status.success() {
        // Most linters exit non-zero whenever they report anything
        debug!("{cmdline} exited with {}", output.status);
    }

    let mut edited: HashMap<PathBuf, Vec<usize>> = HashMap::new();
    let mut kept = Vec::new();
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        let Some((path, linenum)) = parse_linter_line(line, root) else {
            debug!("Ignoring linter output: {line}");
            continue;
        };
        let linenums = match edited.entry(path) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let linenums = differ.compare_revisions(entry.key(), 0)?;
                entry.insert(linenums)
            }
        };
        if linenums.binary_search(&linenum).is_ok() {
            kept.push(line.to_string());
        }
    }
    Ok(kept)
}
