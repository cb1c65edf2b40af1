//! Logical line reader.
//!
//! Joins backslash continuations, separates trailing `#` comments and keeps
//! the 1-based number of the first physical line of each logical line.

/// One logical line of a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// Line number of the first physical line
    pub number: usize,
    /// Text with the comment removed, trimmed; empty for blank and comment-only lines
    pub content: String,
    /// Comment text without the leading `#`, trimmed
    pub comment: Option<String>,
}

impl LogicalLine {
    pub fn is_blank(&self) -> bool {
        self.content.is_empty() && self.comment.is_none()
    }

    pub fn is_comment_only(&self) -> bool {
        self.content.is_empty() && self.comment.is_some()
    }
}

/// Split `content` into logical lines
pub fn logical_lines(content: &str) -> Vec<LogicalLine> {
    let mut lines = Vec::new();
    let mut buffer = String::new();
    let mut start = 0;

    for (idx, raw) in content.lines().enumerate() {
        let number = idx + 1;
        if buffer.is_empty() {
            start = number;
        }

        // Comment lines never continue, even when they end in a backslash
        if buffer.is_empty() && raw.trim_start().starts_with('#') {
            lines.push(split_comment(number, raw));
            continue;
        }

        match raw.strip_suffix('\\') {
            Some(head) => buffer.push_str(head),
            None => {
                buffer.push_str(raw);
                lines.push(split_comment(start, &buffer));
                buffer.clear();
            },
        }
    }

    // A continuation on the last line simply ends the file
    if !buffer.is_empty() {
        lines.push(split_comment(start, &buffer));
    }

    lines
}

fn split_comment(number: usize, text: &str) -> LogicalLine {
    let (content, comment) = match find_comment(text) {
        Some(idx) => (&text[..idx], Some(text[idx + 1..].trim().to_string())),
        None => (text, None),
    };

    LogicalLine {
        number,
        content: content.trim().to_string(),
        comment,
    }
}

/// Position of a `#` that starts a comment: at line start or after whitespace
fn find_comment(text: &str) -> Option<usize> {
    let mut previous: Option<char> = None;
    for (idx, c) in text.char_indices() {
        if c == '#' && previous.map_or(true, char::is_whitespace) {
            return Some(idx);
        }
        previous = Some(c);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_and_comment_lines() {
        let lines = logical_lines("\n# XML processing\nlxml>=2.2.0\n");
        assert_eq!(lines.len(), 3);
        assert!(lines[0].is_blank());
        assert!(lines[1].is_comment_only());
        assert_eq!(lines[1].comment.as_deref(), Some("XML processing"));
        assert_eq!(lines[2].number, 3);
        assert_eq!(lines[2].content, "lxml>=2.2.0");
    }

    #[test]
    fn test_trailing_comment() {
        let lines = logical_lines("chardet==3.0.4  # encoding detection");
        assert_eq!(lines[0].content, "chardet==3.0.4");
        assert_eq!(lines[0].comment.as_deref(), Some("encoding detection"));
    }

    #[test]
    fn test_hash_without_whitespace_is_not_a_comment() {
        let lines = logical_lines("-e git+https://example.com/repo.git#egg=demo");
        assert_eq!(lines[0].content, "-e git+https://example.com/repo.git#egg=demo");
        assert_eq!(lines[0].comment, None);
    }

    #[test]
    fn test_continuations() {
        let lines = logical_lines("python-Levenshtein\\\n    >=0.12 \\\n; python_version >= '3'\npycountry\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[0].content, "python-Levenshtein    >=0.12 ; python_version >= '3'");
        assert_eq!(lines[1].number, 4);
        assert_eq!(lines[1].content, "pycountry");
    }

    #[test]
    fn test_comment_lines_do_not_continue() {
        let lines = logical_lines("# note \\\nlxml\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].content, "lxml");
    }

    #[test]
    fn test_crlf_and_dangling_continuation() {
        let lines = logical_lines("lxml\r\npycountry \\");
        assert_eq!(lines[0].content, "lxml");
        assert_eq!(lines[1].content, "pycountry");
    }
}
