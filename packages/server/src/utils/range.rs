use common::storage::ByteRange;

/// Why a `Range` header could not be honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeError {
    /// Not of the form `bytes=<start>-[<end>]`.
    Malformed,
    /// Well-formed, but no byte of the object falls inside it.
    Unsatisfiable,
}

/// Parse a single-range `Range` header against an object of `total` bytes.
///
/// Accepts `bytes=<start>-<end>` and `bytes=<start>-`. A missing end means
/// the last byte; an end past the object is clamped to the last byte.
/// Suffix ranges (`bytes=-N`) and multi-range lists are not supported.
pub fn parse_range_header(value: &str, total: u64) -> Result<ByteRange, RangeError> {
    let (unit, spec) = value.trim().split_once('=').ok_or(RangeError::Malformed)?;
    if !unit.trim().eq_ignore_ascii_case("bytes") || spec.contains(',') {
        return Err(RangeError::Malformed);
    }

    let (start, end) = spec.split_once('-').ok_or(RangeError::Malformed)?;
    let start = parse_position(start)?;
    let end = match end.trim() {
        "" => None,
        end => Some(parse_position(end)?),
    };

    if total == 0 || start >= total {
        return Err(RangeError::Unsatisfiable);
    }

    let last = total - 1;
    let end = end.map_or(last, |end| end.min(last));
    if start > end {
        return Err(RangeError::Unsatisfiable);
    }

    Ok(ByteRange::new(start, end))
}

fn parse_position(s: &str) -> Result<u64, RangeError> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeError::Malformed);
    }
    s.parse().map_err(|_| RangeError::Malformed)
}
