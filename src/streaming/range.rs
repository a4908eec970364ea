// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `Range: bytes=start-end` parsing.
//!
//! Only a single `bytes` range is supported. An omitted start means 0 and an
//! omitted end means the last byte of the file. Anything outside
//! `[0, size - 1]`, any syntax error and any range against an empty file is
//! rejected as not satisfiable.

use axum::http::HeaderValue;

/// Inclusive byte interval within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered (`end - start + 1`).
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` value for a file of `size` bytes.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

/// Why a `Range` header was refused. Both variants answer 416.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("malformed Range header")]
    Malformed { size: u64 },
    #[error("requested range not satisfiable")]
    Unsatisfiable { size: u64 },
}

impl RangeError {
    /// Size of the file the range was checked against.
    pub fn size(&self) -> u64 {
        match self {
            RangeError::Malformed { size } | RangeError::Unsatisfiable { size } => *size,
        }
    }
}

/// Parse an optional `Range` header against a file of `size` bytes.
///
/// Returns `Ok(None)` when no header was sent.
pub fn parse_range(value: Option<&HeaderValue>, size: u64) -> Result<Option<ByteRange>, RangeError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let malformed = RangeError::Malformed { size };

    let value = value.to_str().map_err(|_| malformed)?.trim();
    let set = value.strip_prefix("bytes=").ok_or(malformed)?;
    if set.contains(',') {
        return Err(malformed);
    }
    let (start_part, end_part) = set.split_once('-').ok_or(malformed)?;
    let (start_part, end_part) = (start_part.trim(), end_part.trim());
    if start_part.is_empty() && end_part.is_empty() {
        return Err(malformed);
    }

    let unsatisfiable = RangeError::Unsatisfiable { size };
    if size == 0 {
        return Err(unsatisfiable);
    }

    let start = if start_part.is_empty() {
        0
    } else {
        position(start_part).ok_or(malformed)?
    };
    let end = if end_part.is_empty() {
        size - 1
    } else {
        position(end_part).ok_or(malformed)?
    };

    if start > end || end >= size {
        return Err(unsatisfiable);
    }

    Ok(Some(ByteRange { start, end }))
}

/// A byte position: ASCII digits only, no sign.
fn position(part: &str) -> Option<u64> {
    if !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: &str, size: u64) -> Result<Option<ByteRange>, RangeError> {
        parse_range(Some(&HeaderValue::from_str(value).unwrap()), size)
    }

    #[test]
    fn absent_header_means_full_content() {
        assert_eq!(parse_range(None, 1000), Ok(None));
    }

    #[test]
    fn closed_range() {
        let range = parse("bytes=0-99", 1000).unwrap().unwrap();
        assert_eq!(range, ByteRange { start: 0, end: 99 });
        assert_eq!(range.length(), 100);
        assert_eq!(range.content_range(1000), "bytes 0-99/1000");
    }

    #[test]
    fn open_ended_range_runs_to_last_byte() {
        let range = parse("bytes=990-", 1000).unwrap().unwrap();
        assert_eq!(range, ByteRange { start: 990, end: 999 });
        assert_eq!(range.length(), 10);
    }

    #[test]
    fn omitted_start_defaults_to_zero() {
        let range = parse("bytes=-9", 1000).unwrap().unwrap();
        assert_eq!(range, ByteRange { start: 0, end: 9 });
    }

    #[test]
    fn whole_file_and_last_byte() {
        assert_eq!(
            parse("bytes=0-999", 1000).unwrap(),
            Some(ByteRange { start: 0, end: 999 })
        );
        assert_eq!(parse("bytes=999-999", 1000).unwrap().unwrap().length(), 1);
    }

    #[test]
    fn out_of_bounds_is_unsatisfiable() {
        for value in ["bytes=2000-2100", "bytes=0-1000", "bytes=1000-", "bytes=50-10"] {
            assert_eq!(
                parse(value, 1000),
                Err(RangeError::Unsatisfiable { size: 1000 }),
                "{value}"
            );
        }
    }

    #[test]
    fn syntax_errors_are_malformed() {
        for value in [
            "bytes=",
            "bytes=-",
            "items=0-1",
            "bytes=a-b",
            "bytes=0-1,5-9",
            "0-99",
            "bytes=+5-+10",
            "bytes=+5-",
        ] {
            assert_eq!(
                parse(value, 1000),
                Err(RangeError::Malformed { size: 1000 }),
                "{value}"
            );
        }
    }

    #[test]
    fn any_range_on_empty_file_is_unsatisfiable() {
        assert_eq!(parse("bytes=0-", 0), Err(RangeError::Unsatisfiable { size: 0 }));
        assert_eq!(parse("bytes=0-", 0).unwrap_err().size(), 0);
    }
}
