//! Read-only queries against a git repository, run through the `git` executable.

use crate::document::{TextDocument, format_timestamp};
use crate::revision::Revision;
use error_set::error_set;
use log::debug;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Exit status of `git show` when the path or revision doesn't exist
const GIT_FATAL_EXIT: i32 = 128;

error_set! {
    /// Errors from git command execution
    GitCommandError := {
        #[display("Failed to run git {command}: {message}")]
        SpawnFailed { command: String, message: String },
        #[display("git {command} failed: {stderr}")]
        ExitError {
            command: String,
            code: Option<i32>,
            stderr: String,
        },
        #[display("Invalid UTF-8 in git {command} output: {message}")]
        InvalidUtf8 { command: String, message: String },
        #[display("Unknown revision '{revision}'")]
        UnknownRevision { revision: String },
        #[display("Revisions {rev1} and {rev2} have no common ancestor")]
        NoCommonAncestor { rev1: String, rev2: String },
        #[display("Invalid commit timestamp '{value}'")]
        InvalidTimestamp { value: String },
        #[display("Failed to read {path}: {message}")]
        ReadFailed { path: String, message: String },
    }
}

/// Runs git queries with a fixed working directory.
///
/// Relative paths passed to any method are relative to that directory.
#[derive(Debug, Clone, Copy)]
pub struct Git<'a> {
    cwd: &'a Path,
}

impl<'a> Git<'a> {
    pub fn new(cwd: &'a Path) -> Self {
        Self { cwd }
    }

    pub fn cwd(&self) -> &Path {
        self.cwd
    }

    /// Content of `path` at `revision`.
    ///
    /// For a commit, the document carries the time of the most recent commit
    /// touching `path` at or before `revision`. If the file doesn't exist at
    /// that revision, or the revision lies before the start of history (as
    /// `HEAD~5` in a shorter history does), an empty document is returned. A
    /// revision whose name git doesn't know fails with
    /// [`GitCommandError::UnknownRevision`].
    ///
    /// # Examples
    /// ```no_run
    /// # use edited_lines::{Git, Revision};
    /// # use std::path::Path;
    /// let git = Git::new(Path::new("."));
    /// let old = git.content_at_revision(Path::new("setup.py"), &Revision::from("HEAD~1")).unwrap();
    /// println!("{:?} from {:?}", old, old.mtime());
    /// ```
    pub fn content_at_revision(
        &self,
        path: &Path,
        revision: &Revision,
    ) -> Result<TextDocument, GitCommandError> {
        let Revision::Commit(commit) = revision else {
            return self.worktree_content(path);
        };

        let object = format!("{commit}:./{}", posix_path(path));
        match self.run(&["show", object.as_str()]) {
            Ok(content) => {
                let document = TextDocument::from_string(content);
                Ok(match self.mtime_at_commit(path, commit)? {
                    Some(mtime) => document.with_mtime(mtime),
                    None => document,
                })
            }
            Err(GitCommandError::ExitError {
                code: Some(GIT_FATAL_EXIT),
                stderr,
                ..
            }) if !stderr.contains("not a git repository") => {
                self.verify_commit(revision_name(commit))?;
                debug!("{} doesn't exist at {commit}", path.display());
                Ok(TextDocument::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Time of the most recent commit touching `path`, at or before `revision`.
    ///
    /// Returns `None` if no commit in the history of `revision` touches `path`.
    pub fn mtime_at_commit(
        &self,
        path: &Path,
        revision: &str,
    ) -> Result<Option<String>, GitCommandError> {
        let path = posix_path(path);
        let output = self.run(&["log", "-1", "--format=%ct", revision, "--", path.as_str()])?;
        let Some(seconds) = output.lines().next().map(str::trim) else {
            return Ok(None);
        };
        seconds
            .parse::<i64>()
            .ok()
            .and_then(format_timestamp)
            .map(Some)
            .ok_or_else(|| GitCommandError::InvalidTimestamp {
                value: seconds.to_string(),
            })
    }

    /// Check that `revision` names a commit.
    pub fn verify_commit(&self, revision: &str) -> Result<(), GitCommandError> {
        let object = format!("{revision}^{{commit}}");
        match self.run(&["rev-parse", "--verify", "--quiet", object.as_str()]) {
            Ok(_) => Ok(()),
            Err(GitCommandError::ExitError { code: Some(1), .. }) => {
                Err(GitCommandError::UnknownRevision {
                    revision: revision.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Nearest common ancestor of two commits.
    pub fn merge_base(&self, rev1: &str, rev2: &str) -> Result<String, GitCommandError> {
        let no_common_ancestor = || GitCommandError::NoCommonAncestor {
            rev1: rev1.to_string(),
            rev2: rev2.to_string(),
        };
        match self.run(&["merge-base", rev1, rev2]) {
            Ok(output) => output
                .lines()
                .next()
                .map(|hash| hash.trim().to_string())
                .ok_or_else(no_common_ancestor),
            // Exit status 1 with no output means the histories are unrelated
            Err(GitCommandError::ExitError {
                code: Some(1),
                stderr,
                ..
            }) if stderr.trim().is_empty() => Err(no_common_ancestor()),
            Err(e) => Err(e),
        }
    }

    /// Absolute path of the top level of the working tree.
    pub fn repo_root(&self) -> Result<PathBuf, GitCommandError> {
        let output = self.run(&["rev-parse", "--show-toplevel"])?;
        Ok(PathBuf::from(output.trim_end_matches(['\n', '\r'])))
    }

    /// Paths which differ between `rev1` and `rev2`, relative to the working directory.
    ///
    /// With [`Revision::Worktree`] as `rev2`, committed, staged and unstaged
    /// changes since `rev1` are all reported. Untracked files are not. A
    /// renamed file shows up under both its old and its new name.
    pub fn diff_name_only(
        &self,
        rev1: &str,
        rev2: &Revision,
        pathspecs: &[PathBuf],
    ) -> Result<Vec<PathBuf>, GitCommandError> {
        let mut args = vec![
            "diff".to_string(),
            "-z".to_string(),
            "--name-only".to_string(),
            "--no-renames".to_string(),
            "--relative".to_string(),
            rev1.to_string(),
        ];
        if let Revision::Commit(rev2) = rev2 {
            args.push(rev2.clone());
        }
        args.push("--".to_string());
        args.extend(pathspecs.iter().map(|p| posix_path(p)));
        Ok(split_nul(&self.run(&args)?))
    }

    /// Untracked, non-ignored files matching `pathspecs`, relative to the working directory.
    pub fn untracked_files(&self, pathspecs: &[PathBuf]) -> Result<Vec<PathBuf>, GitCommandError> {
        let mut args = vec![
            "ls-files".to_string(),
            "-z".to_string(),
            "--others".to_string(),
            "--exclude-standard".to_string(),
            "--".to_string(),
        ];
        args.extend(pathspecs.iter().map(|p| posix_path(p)));
        Ok(split_nul(&self.run(&args)?))
    }

    fn worktree_content(&self, path: &Path) -> Result<TextDocument, GitCommandError> {
        let abspath = self.cwd.join(path);
        match fs::read_to_string(&abspath) {
            Ok(content) => Ok(TextDocument::from_string(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} doesn't exist in the working tree", abspath.display());
                Ok(TextDocument::default())
            }
            Err(e) => Err(GitCommandError::ReadFailed {
                path: abspath.display().to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Run git with the given arguments and return its standard output
    fn run<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<String, GitCommandError> {
        let command = args
            .first()
            .map(|a| a.as_ref().to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!(
            "[{}]$ git {}",
            self.cwd.display(),
            args.iter()
                .map(|a| a.as_ref().to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let output = Command::new("git")
            .arg("-C")
            .arg(self.cwd)
            .args(args)
            .output()
            .map_err(|e| GitCommandError::SpawnFailed {
                command: command.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitCommandError::ExitError {
                command,
                code: output.status.code(),
                stderr: stderr.into_owned(),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| GitCommandError::InvalidUtf8 {
            command,
            message: e.to_string(),
        })
    }
}

/// Path with `/` separators, as git expects in object names and pathspecs
fn posix_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// `revision` without trailing `~N` and `^N` ancestry steps
fn revision_name(revision: &str) -> &str {
    match revision.find(['~', '^']) {
        Some(0) | None => revision,
        Some(end) => &revision[..end],
    }
}

fn split_nul(output: &str) -> Vec<PathBuf> {
    output
        .split('\0')
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}
