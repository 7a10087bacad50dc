//! `Range` header parsing for partial media delivery.
//!
//! Only single `bytes` ranges are honoured. Other units and multi-range lists
//! fall back to serving the whole file, which RFC 9110 permits.

use thiserror::Error;

/// An inclusive byte slice of a file of `total` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl ByteRange {
    /// Number of bytes covered, always at least one.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Content-Range` response header.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

/// What the client asked for once the header has been interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    Full,
    Partial(ByteRange),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("range bound {0:?} is not a number")]
    NotANumber(String),
    #[error("range start {start} is beyond the last byte of a {size}-byte file")]
    StartPastEnd { start: u64, size: u64 },
    #[error("range start {start} is after range end {end}")]
    Inverted { start: u64, end: u64 },
    #[error("suffix range asks for zero bytes")]
    EmptySuffix,
    #[error("range has neither a start nor an end")]
    MissingBounds,
}

/// Interprets an optional `Range` header against a file of `size` bytes.
///
/// `end` past the last byte is clamped, `bytes=-N` selects the final `N`
/// bytes. Everything else that cannot be satisfied is an error and should be
/// answered with 416.
pub fn parse_range_header(header: Option<&str>, size: u64) -> Result<RangeRequest, RangeError> {
    let Some(header) = header else {
        return Ok(RangeRequest::Full);
    };

    let Some((unit, set)) = header.trim().split_once('=') else {
        return Ok(RangeRequest::Full);
    };
    if !unit.trim().eq_ignore_ascii_case("bytes") || set.contains(',') {
        return Ok(RangeRequest::Full);
    }

    let (start_str, end_str) = set
        .split_once('-')
        .ok_or_else(|| RangeError::NotANumber(set.to_string()))?;
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    if start_str.is_empty() {
        if end_str.is_empty() {
            return Err(RangeError::MissingBounds);
        }
        let suffix = parse_bound(end_str)?;
        if suffix == 0 {
            return Err(RangeError::EmptySuffix);
        }
        if size == 0 {
            return Err(RangeError::StartPastEnd { start: 0, size });
        }
        return Ok(RangeRequest::Partial(ByteRange {
            start: size.saturating_sub(suffix),
            end: size - 1,
            total: size,
        }));
    }

    let start = parse_bound(start_str)?;
    if start >= size {
        return Err(RangeError::StartPastEnd { start, size });
    }

    let end = if end_str.is_empty() {
        size - 1
    } else {
        let end = parse_bound(end_str)?;
        if end < start {
            return Err(RangeError::Inverted { start, end });
        }
        end.min(size - 1)
    };

    Ok(RangeRequest::Partial(ByteRange {
        start,
        end,
        total: size,
    }))
}

fn parse_bound(raw: &str) -> Result<u64, RangeError> {
    // u64::from_str would accept a leading '+'.
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeError::NotANumber(raw.to_string()));
    }
    raw.parse()
        .map_err(|_| RangeError::NotANumber(raw.to_string()))
}
