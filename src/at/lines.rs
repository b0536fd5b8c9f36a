//! Line index over a raw reply buffer.
//!
//! A reply from the phone is one byte buffer holding several CR/LF separated
//! lines: the echoed command, zero or more data lines, and a final result
//! line. The index records the byte span of every non-empty line so the
//! classifier and the frame scanner can address lines by ordinal without
//! re-scanning the buffer.
//!
//! Ordinals are 1-based to match the wire convention (line 1 is typically
//! the echoed command). Out-of-range lookups yield the empty string; callers
//! treat empty as "not found".

/// Ordered (start, length) spans of the non-empty lines in a reply buffer.
///
/// Built once per buffer and read-only afterwards. Spans are monotonically
/// increasing and non-overlapping by construction.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    spans: Vec<(usize, usize)>,
}

impl LineIndex {
    /// Split `buf` into non-empty lines. Runs of `\r` and `\n` act as one
    /// separator, so `\r\n` does not produce phantom empty lines.
    pub fn parse(buf: &[u8]) -> Self {
        let mut spans = Vec::new();
        let mut start = None;
        for (i, &b) in buf.iter().enumerate() {
            if b == b'\r' || b == b'\n' {
                if let Some(s) = start.take() {
                    spans.push((s, i - s));
                }
            } else if start.is_none() {
                start = Some(i);
            }
        }
        if let Some(s) = start {
            spans.push((s, buf.len() - s));
        }
        LineIndex { spans }
    }

    /// Number of indexed lines.
    pub fn count(&self) -> usize {
        self.spans.len()
    }

    /// Line `ordinal` (1-based) as text, or `""` when out of range or the
    /// span is not valid UTF-8.
    pub fn line_at<'a>(&self, buf: &'a [u8], ordinal: usize) -> &'a str {
        if ordinal == 0 {
            return "";
        }
        match self.spans.get(ordinal - 1) {
            Some(&(start, len)) => std::str::from_utf8(&buf[start..start + len]).unwrap_or(""),
            None => "",
        }
    }

    /// Whether line `ordinal` contains `needle`. Out of range is false.
    pub fn line_contains(&self, buf: &[u8], ordinal: usize, needle: &str) -> bool {
        self.line_at(buf, ordinal).contains(needle)
    }

    /// Owned copy of line `ordinal`, empty when out of range.
    pub fn copy_line(&self, buf: &[u8], ordinal: usize) -> String {
        self.line_at(buf, ordinal).to_string()
    }
}
