//! Reply classification.
//!
//! Every higher-level handler branches on the four-way [`ReplyClass`] derived
//! from a reply's final non-empty line; handlers never re-scan raw text
//! themselves. `Unrecognized` always maps to an "unexpected response"
//! failure at the operation level, never silently ignored.

use crate::at::lines::LineIndex;
use crate::error::LinkError;

/// Success token on the final result line.
pub const OK_TOKEN: &str = "OK";
/// Bare error token on the final result line.
pub const ERROR_TOKEN: &str = "ERROR";
/// Prefix of a vendor protocol-error result line.
pub const CMS_ERROR_PREFIX: &str = "+CMS ERROR:";

/// Four-way classification of a reply's terminal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyClass {
    /// Final line carries the success token.
    Ok,
    /// Final line carries the bare error token.
    Error,
    /// Final line is a `+CMS ERROR: <code>` report; code as sent by the phone.
    CmsError(u16),
    /// Terminal line (or lack of one) matched nothing known.
    Unrecognized,
}

/// Classify a parsed reply buffer. Pure function: an empty buffer or one
/// with no known terminal token is `Unrecognized`.
pub fn classify(buf: &[u8], lines: &LineIndex) -> ReplyClass {
    let last = lines.line_at(buf, lines.count());
    if last.is_empty() {
        return ReplyClass::Unrecognized;
    }
    if let Some(code) = decode_cms_error(last) {
        return ReplyClass::CmsError(code);
    }
    if last.contains(OK_TOKEN) {
        return ReplyClass::Ok;
    }
    if last.contains(ERROR_TOKEN) {
        return ReplyClass::Error;
    }
    ReplyClass::Unrecognized
}

/// Shared decoder for `+CMS ERROR: <code>` lines. Returns the embedded
/// numeric code, or 0 when the phone sent a textual report instead.
pub fn decode_cms_error(line: &str) -> Option<u16> {
    let rest = line.trim().strip_prefix(CMS_ERROR_PREFIX)?;
    let digits: String = rest
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    Some(digits.parse().unwrap_or(0))
}

/// One parsed exchange: the raw buffer, its line index, and the
/// classification of its terminal line.
#[derive(Debug, Clone)]
pub struct Reply {
    buf: Vec<u8>,
    lines: LineIndex,
    class: ReplyClass,
}

impl Reply {
    /// Parse and classify a raw reply buffer.
    pub fn parse(buf: Vec<u8>) -> Self {
        let lines = LineIndex::parse(&buf);
        let class = classify(&buf, &lines);
        Reply { buf, lines, class }
    }

    pub fn class(&self) -> ReplyClass {
        self.class
    }

    pub fn raw(&self) -> &[u8] {
        &self.buf
    }

    /// Line `ordinal` (1-based), empty when out of range.
    pub fn line(&self, ordinal: usize) -> &str {
        self.lines.line_at(&self.buf, ordinal)
    }

    pub fn line_contains(&self, ordinal: usize, needle: &str) -> bool {
        self.lines.line_contains(&self.buf, ordinal, needle)
    }

    pub fn copy_line(&self, ordinal: usize) -> String {
        self.lines.copy_line(&self.buf, ordinal)
    }

    pub fn line_count(&self) -> usize {
        self.lines.count()
    }

    /// Default classification-to-outcome mapping: `Ok` passes the reply
    /// through, everything else becomes the matching typed failure.
    pub fn into_result(self) -> Result<Reply, LinkError> {
        match self.class {
            ReplyClass::Ok => Ok(self),
            ReplyClass::Error => Err(LinkError::failure("device rejected the command")),
            ReplyClass::CmsError(code) => Err(LinkError::Cms(code)),
            ReplyClass::Unrecognized => Err(LinkError::UnrecognizedResponse),
        }
    }
}
