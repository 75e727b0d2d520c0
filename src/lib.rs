use error_set::error_set;
use std::path::Path;

mod changed;
mod document;
mod edited;
mod git;
mod linting;
mod revision;

pub use changed::{SOURCE_EXTENSION, common_root, modified_files, should_reformat_file};
pub use document::{GIT_DATEFORMAT, TextDocument, format_timestamp};
pub use edited::edited_linenums;
pub use git::{Git, GitCommandError};
pub use linting::{LintError, parse_linter_line, run_linter};
pub use revision::{
    PRE_COMMIT, PRE_COMMIT_FROM_REF, PRE_COMMIT_TO_REF, ResolvedRange, Revision, RevisionError,
    RevisionRange, WORKTREE,
};

error_set! {
    /// Top-level error for edited-lines operations
    EditedLinesError := {
        RevisionError(RevisionError),
        GitCommandError(GitCommandError),
        LintError(LintError),
        IoError(std::io::Error),
    }
}

/// Main interface for finding edited lines of files in one repository
pub struct EditedLinesDiffer<'a> {
    git: Git<'a>,
    resolved: ResolvedRange,
}

impl<'a> EditedLinesDiffer<'a> {
    /// Create a differ for files under `root`, comparing the revisions of `revrange`
    ///
    /// The merge-base, if the range asks for one, is looked up here once
    /// rather than for every file.
    ///
    /// # Examples
    /// ```no_run
    /// # use edited_lines::{EditedLinesDiffer, RevisionRange};
    /// # use std::path::Path;
    /// let revrange = RevisionRange::parse("main...").unwrap();
    /// let differ = EditedLinesDiffer::new(Path::new("."), &revrange).unwrap();
    /// let linenums = differ.compare_revisions(Path::new("setup.py"), 2).unwrap();
    /// ```
    pub fn new(root: &'a Path, revrange: &RevisionRange) -> Result<Self, GitCommandError> {
        let git = Git::new(root);
        let resolved = revrange.resolve(&git)?;
        Ok(Self { git, resolved })
    }

    /// The two revisions being compared
    pub fn resolved(&self) -> &ResolvedRange {
        &self.resolved
    }

    /// Lines of `path` at `rev2` edited since `rev1`
    pub fn compare_revisions(
        &self,
        path: &Path,
        context_lines: usize,
    ) -> Result<Vec<usize>, GitCommandError> {
        let old = self.git.content_at_revision(path, &self.resolved.rev1)?;
        let new = self.git.content_at_revision(path, &self.resolved.rev2)?;
        Ok(edited_linenums(&old, &new, context_lines))
    }

    /// Lines of `content` edited since `rev1` version of `path`
    ///
    /// Use this to check reformatted content before it is written to disk.
    pub fn revision_vs_lines(
        &self,
        path: &Path,
        content: &TextDocument,
        context_lines: usize,
    ) -> Result<Vec<usize>, GitCommandError> {
        let old = self.git.content_at_revision(path, &self.resolved.rev1)?;
        Ok(edited_linenums(&old, content, context_lines))
    }
}

/// Render line numbers as comma-separated `N` and `N..M` references
///
/// Runs of consecutive numbers become inclusive ranges.
///
/// # Examples
/// ```
/// # use edited_lines::format_line_refs;
/// assert_eq!(format_line_refs(&[2, 3, 4, 7, 9, 10]), "2..4,7,9..10");
/// ```
pub fn format_line_refs(linenums: &[usize]) -> String {
    let mut refs: Vec<String> = Vec::new();
    let mut iter = linenums.iter().copied().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.next_if(|&next| next == end + 1).is_some() {
            end += 1;
        }
        refs.push(if start == end {
            start.to_string()
        } else {
            format!("{start}..{end}")
        });
    }
    refs.join(",")
}
