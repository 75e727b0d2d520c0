//! Parsing of revision range expressions like `main...`, `v1.0..HEAD` or `:PRE-COMMIT:`.
//!
//! # Syntax
//!
//! - `A..B` - compare `A` directly against `B`
//! - `A...B` - compare the common ancestor of `A` and `B` against `B`
//! - `A` - same as `A..`
//! - an omitted `B` means the working tree, an omitted `A` means `HEAD`
//! - `:PRE-COMMIT:` - take `A...B` from the `PRE_COMMIT_FROM_REF` and
//!   `PRE_COMMIT_TO_REF` environment variables set by the pre-commit framework
//!
//! # Examples
//!
//! ```
//! use edited_lines::{Revision, RevisionRange};
//!
//! let range = RevisionRange::parse("main...").unwrap();
//! assert_eq!(range.rev1, Revision::from("main"));
//! assert_eq!(range.rev2, Revision::Worktree);
//! assert!(range.use_common_ancestor);
//! ```

use crate::git::{Git, GitCommandError};
use error_set::error_set;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_until},
    combinator::rest,
};
use std::fmt;

/// Textual name of [`Revision::Worktree`].
pub const WORKTREE: &str = ":WORKTREE:";

/// Range expression which reads the endpoints from the environment.
pub const PRE_COMMIT: &str = ":PRE-COMMIT:";

pub const PRE_COMMIT_FROM_REF: &str = "PRE_COMMIT_FROM_REF";
pub const PRE_COMMIT_TO_REF: &str = "PRE_COMMIT_TO_REF";

error_set! {
    /// Errors from parsing a revision range
    RevisionError := {
        /// The expression can't be split into valid endpoints
        #[display("Invalid revision range '{spec}': {reason}")]
        InvalidSpecification { spec: String, reason: String },
        /// `:PRE-COMMIT:` was given but only one or none of the variables is set
        #[display(":PRE-COMMIT: requires both PRE_COMMIT_FROM_REF and PRE_COMMIT_TO_REF to be set")]
        IncompletePreCommitEnv,
    }
}

/// One endpoint of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Revision {
    /// Files as they are on disk, including staged and unstaged changes
    Worktree,
    /// Anything `git` resolves to a commit: hash, branch, tag, `HEAD~2`...
    Commit(String),
}

impl Revision {
    /// Name to use when git needs a commit. The working tree stands for `HEAD`.
    pub fn commitish(&self) -> &str {
        match self {
            Revision::Worktree => "HEAD",
            Revision::Commit(rev) => rev,
        }
    }

    pub fn is_worktree(&self) -> bool {
        matches!(self, Revision::Worktree)
    }
}

impl From<&str> for Revision {
    fn from(rev: &str) -> Self {
        match rev {
            "" | WORKTREE => Revision::Worktree,
            rev => Revision::Commit(rev.to_string()),
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::Worktree => f.write_str(WORKTREE),
            Revision::Commit(rev) => f.write_str(rev),
        }
    }
}

/// Two revisions to compare, as given by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionRange {
    pub rev1: Revision,
    pub rev2: Revision,
    /// Replace `rev1` with the merge-base of `rev1` and `rev2` before comparing
    pub use_common_ancestor: bool,
}

/// A [`RevisionRange`] after merge-base substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRange {
    pub rev1: Revision,
    pub rev2: Revision,
}

impl RevisionRange {
    /// Compare `rev1` directly against the working tree.
    pub fn new(rev1: impl Into<Revision>) -> Self {
        Self {
            rev1: rev1.into(),
            rev2: Revision::Worktree,
            use_common_ancestor: false,
        }
    }

    /// Parse a range expression, reading the process environment for `:PRE-COMMIT:`.
    ///
    /// # Errors
    ///
    /// - [`RevisionError::InvalidSpecification`] for malformed endpoints
    /// - [`RevisionError::IncompletePreCommitEnv`] if `:PRE-COMMIT:` is used
    ///   without both environment variables
    pub fn parse(spec: &str) -> Result<Self, RevisionError> {
        Self::parse_with_env(spec, |name| std::env::var(name).ok())
    }

    /// Parse a range expression with an explicit environment lookup.
    pub fn parse_with_env<F>(spec: &str, env: F) -> Result<Self, RevisionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if spec == PRE_COMMIT {
            let from = env(PRE_COMMIT_FROM_REF).filter(|v| !v.is_empty());
            let to = env(PRE_COMMIT_TO_REF).filter(|v| !v.is_empty());
            return match (from, to) {
                (Some(from), Some(to)) => Ok(Self {
                    rev1: Revision::Commit(from),
                    rev2: Revision::Commit(to),
                    use_common_ancestor: true,
                }),
                _ => Err(RevisionError::IncompletePreCommitEnv),
            };
        }

        let (rev1, dots, rev2) = match split_range(spec) {
            Ok((_, parts)) => parts,
            Err(_) => (spec, "..", ""),
        };
        validate_endpoint(spec, rev1)?;
        validate_endpoint(spec, rev2)?;

        Ok(Self {
            rev1: if rev1.is_empty() {
                Revision::Commit("HEAD".to_string())
            } else {
                Revision::from(rev1)
            },
            rev2: Revision::from(rev2),
            use_common_ancestor: dots == "...",
        })
    }

    /// Turn the range into two concrete revisions, looking up the merge-base if needed.
    ///
    /// # Errors
    ///
    /// Fails with [`GitCommandError::NoCommonAncestor`] if the revisions share no
    /// history, or with any other git error from the lookup.
    pub fn resolve(&self, git: &Git) -> Result<ResolvedRange, GitCommandError> {
        let rev1 = if self.use_common_ancestor {
            Revision::Commit(git.merge_base(self.rev1.commitish(), self.rev2.commitish())?)
        } else {
            self.rev1.clone()
        };
        Ok(ResolvedRange {
            rev1,
            rev2: self.rev2.clone(),
        })
    }
}

impl fmt::Display for RevisionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dots = if self.use_common_ancestor { "..." } else { ".." };
        match &self.rev2 {
            Revision::Worktree => write!(f, "{}{}", self.rev1, dots),
            rev2 => write!(f, "{}{}{}", self.rev1, dots, rev2),
        }
    }
}

/// Split `A..B` or `A...B` at the first run of dots
fn split_range(input: &str) -> IResult<&str, (&str, &str, &str)> {
    (take_until(".."), alt((tag("..."), tag(".."))), rest).parse(input)
}

fn validate_endpoint(spec: &str, rev: &str) -> Result<(), RevisionError> {
    let reason = if rev.chars().any(char::is_whitespace) {
        format!("'{rev}' contains whitespace")
    } else if rev.contains("..") {
        format!("'{rev}' contains '..'")
    } else if rev.starts_with('.') {
        format!("'{rev}' starts with '.'")
    } else if rev == PRE_COMMIT {
        format!("{PRE_COMMIT} can't be part of a range")
    } else {
        return Ok(());
    };
    Err(RevisionError::InvalidSpecification {
        spec: spec.to_string(),
        reason,
    })
}
