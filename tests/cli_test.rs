use git2::{Repository, Signature};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Repository with one committed file, edited on lines 3 and 7 in the working tree
fn edited_repo() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let repo = Repository::init(dir.path()).expect("Failed to init repo");

    fs::write(dir.path().join("a.py"), "1\n2\n3\n4\n5\n6\n7\n8\n").unwrap();
    fs::write(dir.path().join("notes.txt"), "notes\n").unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new("a.py")).unwrap();
    index.add_path(Path::new("notes.txt")).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::new("Test User", "test@example.com", &git2::Time::new(1234567890, 0))
        .unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
        .unwrap();

    fs::write(dir.path().join("a.py"), "1\n2\nthree\n4\n5\n6\nseven\n8\n").unwrap();
    fs::write(dir.path().join("notes.txt"), "more notes\n").unwrap();
    fs::write(dir.path().join("new.py"), "x = 1\n").unwrap();
    dir
}

fn edited_lines(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_edited-lines"))
        .current_dir(cwd)
        .env_remove("PRE_COMMIT_FROM_REF")
        .env_remove("PRE_COMMIT_TO_REF")
        .args(args)
        .output()
        .expect("Failed to run edited-lines")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim_end().to_string()
}

#[test]
fn files_lists_changed_source_files() {
    let repo = edited_repo();

    let output = edited_lines(repo.path(), &["files"]);

    assert!(output.status.success());
    insta::assert_snapshot!(stdout(&output), @r"
    a.py
    new.py
    ");
}

#[test]
fn lines_without_context() {
    let repo = edited_repo();

    let output = edited_lines(repo.path(), &["lines", "a.py"]);

    assert!(output.status.success());
    insta::assert_snapshot!(stdout(&output), @"a.py:3,7");
}

#[test]
fn lines_with_context() {
    let repo = edited_repo();

    let output = edited_lines(repo.path(), &["lines", "--context", "1", "-r", "HEAD"]);

    assert!(output.status.success());
    insta::assert_snapshot!(stdout(&output), @r"
    a.py:2..4,6..8
    new.py:1
    ");
}

#[test]
fn files_in_directory_given_with_cwd() {
    let repo = edited_repo();
    let elsewhere = TempDir::new().unwrap();
    let cwd = repo.path().to_string_lossy().into_owned();

    let output = edited_lines(elsewhere.path(), &["-C", cwd.as_str(), "files"]);

    assert!(output.status.success());
    insta::assert_snapshot!(stdout(&output), @r"
    a.py
    new.py
    ");
}

#[test]
fn paths_relative_to_cwd_directory() {
    let repo = edited_repo();
    let elsewhere = TempDir::new().unwrap();
    let cwd = repo.path().to_string_lossy().into_owned();

    let output = edited_lines(elsewhere.path(), &["-C", cwd.as_str(), "lines", "a.py"]);

    assert!(output.status.success());
    insta::assert_snapshot!(stdout(&output), @"a.py:3,7");
}

#[test]
fn absolute_paths_find_their_repository() {
    let repo = edited_repo();
    let elsewhere = TempDir::new().unwrap();
    let path = repo.path().join("a.py").to_string_lossy().into_owned();

    let output = edited_lines(elsewhere.path(), &["lines", path.as_str()]);

    assert!(output.status.success());
    insta::assert_snapshot!(stdout(&output), @"a.py:3,7");
}

#[test]
fn invalid_revision_range_is_fatal() {
    let repo = edited_repo();

    let output = edited_lines(repo.path(), &["files", "-r", "a..b..c"]);

    assert_eq!(output.status.code(), Some(123));
    assert!(stdout(&output).is_empty());
}

#[test]
fn incomplete_pre_commit_environment_is_fatal() {
    let repo = edited_repo();

    let output = Command::new(env!("CARGO_BIN_EXE_edited-lines"))
        .current_dir(repo.path())
        .env("PRE_COMMIT_FROM_REF", "HEAD")
        .env_remove("PRE_COMMIT_TO_REF")
        .args(["files", "-r", ":PRE-COMMIT:"])
        .output()
        .expect("Failed to run edited-lines");

    assert_eq!(output.status.code(), Some(123));
}

#[test]
fn outside_repository_is_fatal() {
    let dir = TempDir::new().unwrap();

    let output = edited_lines(dir.path(), &["files"]);

    assert_eq!(output.status.code(), Some(123));
}
