//! File content as both a string and a sequence of lines.

use chrono::{DateTime, Utc};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// `strftime` format for modification times, matching what `git log` reports
/// once converted to UTC.
pub const GIT_DATEFORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f +0000";

/// Format a Unix timestamp (seconds) with [`GIT_DATEFORMAT`].
///
/// Returns `None` if the timestamp is out of range for a calendar date.
#[must_use]
pub fn format_timestamp(seconds: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(seconds, 0).map(|dt| dt.format(GIT_DATEFORMAT).to_string())
}

/// Text content of a file at some point in time.
///
/// Two documents are equal when their lines are equal. The raw string (line
/// endings, final newline) and the modification time are ignored.
#[derive(Clone, Default)]
pub struct TextDocument {
    string: String,
    lines: Vec<String>,
    mtime: Option<String>,
}

impl TextDocument {
    /// Create a document from the full text of a file.
    #[must_use]
    pub fn from_string(string: String) -> Self {
        let lines = string.lines().map(str::to_string).collect();
        Self {
            string,
            lines,
            mtime: None,
        }
    }

    /// Create a document from lines without line separators.
    ///
    /// Every line, including the last one, is terminated with `\n` in the
    /// string view.
    ///
    /// ```
    /// use edited_lines::TextDocument;
    ///
    /// let doc = TextDocument::from_lines(["a", "b"]);
    /// assert_eq!(doc.string(), "a\nb\n");
    /// assert_eq!(doc.lines(), ["a", "b"]);
    /// ```
    #[must_use]
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        let mut string = String::new();
        for line in &lines {
            string.push_str(line);
            string.push('\n');
        }
        Self {
            string,
            lines,
            mtime: None,
        }
    }

    /// Read a document from disk, recording the file's modification time.
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let string = fs::read_to_string(path)?;
        let modified: DateTime<Utc> = fs::metadata(path)?.modified()?.into();
        Ok(Self::from_string(string).with_mtime(modified.format(GIT_DATEFORMAT).to_string()))
    }

    /// Attach a modification timestamp.
    #[must_use]
    pub fn with_mtime(mut self, mtime: String) -> Self {
        self.mtime = Some(mtime);
        self
    }

    pub fn string(&self) -> &str {
        &self.string
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn mtime(&self) -> Option<&str> {
        self.mtime.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl PartialEq for TextDocument {
    fn eq(&self, other: &Self) -> bool {
        self.lines == other.lines
    }
}

impl Eq for TextDocument {}

impl fmt::Debug for TextDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextDocument([{} lines])", self.lines.len())
    }
}

impl From<String> for TextDocument {
    fn from(string: String) -> Self {
        Self::from_string(string)
    }
}

impl From<&str> for TextDocument {
    fn from(string: &str) -> Self {
        Self::from_string(string.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn from_string_drops_trailing_empty_line() {
        let doc = TextDocument::from("line1\nline2\n");
        assert_eq!(doc.lines(), ["line1", "line2"]);
        assert_eq!(doc.string(), "line1\nline2\n");
        assert_eq!(doc.mtime(), None);
    }

    #[test]
    fn from_string_without_final_newline() {
        let doc = TextDocument::from("line1\nline2");
        assert_eq!(doc.lines(), ["line1", "line2"]);
    }

    #[test]
    fn from_string_crlf() {
        let doc = TextDocument::from("a\r\nb\r\n");
        assert_eq!(doc.lines(), ["a", "b"]);
    }

    #[test]
    fn empty_documents() {
        assert!(TextDocument::from("").is_empty());
        assert!(TextDocument::from_lines(Vec::<String>::new()).is_empty());
        assert_eq!(TextDocument::from_lines(Vec::<String>::new()).string(), "");
        assert!(TextDocument::default().is_empty());
    }

    #[test]
    fn equality_ignores_construction() {
        assert_eq!(
            TextDocument::from_lines(["line1", "line2"]),
            TextDocument::from("line1\nline2\n")
        );
        assert_eq!(
            TextDocument::from("line1\nline2"),
            TextDocument::from("line1\nline2\n")
        );
        assert_eq!(TextDocument::from(""), TextDocument::from_lines(Vec::<&str>::new()));
    }

    #[test]
    fn equality_ignores_mtime() {
        let a = TextDocument::from("x\n").with_mtime("2020-12-27 21:33:59.000000 +0000".into());
        let b = TextDocument::from_lines(["x"]);
        assert_eq!(a, b);
    }

    #[test]
    fn inequality() {
        assert_ne!(TextDocument::from_lines(["foo"]), TextDocument::from_lines(Vec::<&str>::new()));
        assert_ne!(TextDocument::from_lines(["foo"]), TextDocument::from("bar\n"));
        assert_ne!(TextDocument::from("foo\n"), TextDocument::from(""));
    }

    #[test]
    fn debug_shows_line_count() {
        assert_eq!(format!("{:?}", TextDocument::from("")), "TextDocument([0 lines])");
        assert_eq!(
            format!("{:?}", TextDocument::from_lines(["One line"])),
            "TextDocument([1 lines])"
        );
        assert_eq!(
            format!("{:?}", TextDocument::from("Two\nlines\n")),
            "TextDocument([2 lines])"
        );
    }

    #[test]
    fn format_timestamp_utc() {
        assert_eq!(
            format_timestamp(1_609_104_839).unwrap(),
            "2020-12-27 21:33:59.000000 +0000"
        );
    }

    #[test]
    fn from_file_reads_mtime() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("dummy.txt");
        fs::write(&path, "dummy\ncontent\n").unwrap();
        let time = filetime::FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_mtime(&path, time).unwrap();

        let doc = TextDocument::from_file(&path).unwrap();

        assert_eq!(doc.string(), "dummy\ncontent\n");
        assert_eq!(doc.lines(), ["dummy", "content"]);
        assert_eq!(doc.mtime(), Some("2001-09-09 01:46:40.000000 +0000"));
    }
}
