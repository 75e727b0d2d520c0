//! Finding the files which changed within a revision range.

use crate::git::{Git, GitCommandError};
use crate::revision::{Revision, RevisionRange};
use log::debug;
use path_clean::PathClean;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

/// Extension of files the formatter knows how to handle
pub const SOURCE_EXTENSION: &str = "py";

/// Whether `path` is an existing source file the formatter can handle.
///
/// Stub files, compiled files and extensionless files don't qualify.
pub fn should_reformat_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION) && path.is_file()
}

/// Candidates which differ between the two revisions of `revrange`.
///
/// Candidates may be files or directories, absolute or relative to `cwd`.
/// Candidates outside `cwd` are ignored. When the range ends at the working
/// tree, staged, unstaged and untracked files all count as changes. A range
/// from the working tree to itself changes nothing. Only files passing
/// [`should_reformat_file`] are returned, relative to `cwd`.
///
/// # Examples
/// ```no_run
/// # use edited_lines::{RevisionRange, modified_files};
/// # use std::path::{Path, PathBuf};
/// let changed = modified_files(
///     &[PathBuf::from("src")],
///     &RevisionRange::parse("main...").unwrap(),
///     Path::new("."),
/// ).unwrap();
/// for path in changed {
///     println!("{}", path.display());
/// }
/// ```
pub fn modified_files(
    paths: &[PathBuf],
    revrange: &RevisionRange,
    cwd: &Path,
) -> Result<BTreeSet<PathBuf>, GitCommandError> {
    let candidates: Vec<PathBuf> = paths
        .iter()
        .filter_map(|path| {
            let relative = relative_to(path, cwd);
            if relative.is_none() {
                debug!("Ignoring {} outside {}", path.display(), cwd.display());
            }
            relative
        })
        .collect();
    if candidates.is_empty() {
        return Ok(BTreeSet::new());
    }

    let git = Git::new(cwd);
    let resolved = revrange.resolve(&git)?;
    // Which names differ doesn't depend on the direction of the comparison
    let (commit, other) = match (&resolved.rev1, &resolved.rev2) {
        (Revision::Worktree, Revision::Worktree) => return Ok(BTreeSet::new()),
        (Revision::Worktree, Revision::Commit(commit)) => (commit, &Revision::Worktree),
        (Revision::Commit(commit), other) => (commit, other),
    };
    let mut changed = git.diff_name_only(commit, other, &candidates)?;
    if other.is_worktree() {
        changed.extend(git.untracked_files(&candidates)?);
    }

    Ok(changed
        .into_iter()
        .filter(|path| candidates.iter().any(|c| covers(c, path)))
        .filter(|path| should_reformat_file(&cwd.join(path)))
        .collect())
}

/// Deepest existing directory containing all of the absolute `paths`.
///
/// Paths are cleaned lexically first, so `a/e/../b` counts as `a/b`. A file
/// is represented by its directory. Returns `None` for no paths.
pub fn common_root(paths: &[PathBuf]) -> Option<PathBuf> {
    let mut cleaned = paths.iter().map(|path| path.clean());
    let mut root = cleaned.next()?;
    for path in cleaned {
        root = root
            .components()
            .zip(path.components())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a)
            .collect();
    }
    root.ancestors()
        .find(|dir| dir.is_dir())
        .map(Path::to_path_buf)
}

/// `path` as a clean path relative to `root`, or `None` if it lies outside `root`
fn relative_to(path: &Path, root: &Path) -> Option<PathBuf> {
    let relative = if path.is_absolute() {
        let path = path.clean();
        match path.strip_prefix(root.clean()) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => {
                // Symlinked temp or home directories make the lexical comparison fail
                let path = path.canonicalize().ok()?;
                path.strip_prefix(root.canonicalize().ok()?).ok()?.to_path_buf()
            }
        }
    } else {
        path.clean()
    };

    if relative.components().next() == Some(Component::ParentDir) {
        return None;
    }
    if relative.as_os_str().is_empty() {
        return Some(PathBuf::from("."));
    }
    Some(relative)
}

/// Whether the candidate file or directory `candidate` includes `path`
fn covers(candidate: &Path, path: &Path) -> bool {
    candidate == Path::new(".") || path.starts_with(candidate)
}
