/// Resolves a `Range` header against a file of `size` bytes.
///
/// Returns the inclusive span to serve as partial content, or `None` when the
/// whole file should be served: no header, a malformed or multi-range header,
/// a reversed range, or a start at or past the end. An end past the last byte
/// is clamped. `bytes=s-` and suffix `bytes=-n` forms are honoured.
pub fn resolve_range(header: Option<&str>, size: u64) -> Option<(u64, u64)> {
    if size == 0 {
        return None;
    }
    let value = header?.trim();
    let (unit, ranges) = value.split_once('=')?;
    if !unit.trim().eq_ignore_ascii_case("bytes") || ranges.contains(',') {
        return None;
    }
    let (start, end) = ranges.trim().split_once('-')?;
    let (start, end) = (start.trim(), end.trim());
    let last = size - 1;

    match (start.is_empty(), end.is_empty()) {
        (true, true) => None,
        // Suffix: the final n bytes.
        (true, false) => {
            let n: u64 = end.parse().ok()?;
            if n == 0 {
                return None;
            }
            Some((size.saturating_sub(n), last))
        }
        (false, true) => {
            let start: u64 = start.parse().ok()?;
            (start <= last).then_some((start, last))
        }
        (false, false) => {
            let start: u64 = start.parse().ok()?;
            let end: u64 = end.parse().ok()?;
            if start > end || start > last {
                return None;
            }
            Some((start, end.min(last)))
        }
    }
}

/// `Content-Range` value for a served span.
pub fn content_range(span: (u64, u64), size: u64) -> String {
    format!("bytes {}-{}/{}", span.0, span.1, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_range() {
        assert_eq!(resolve_range(Some("bytes=0-99"), 1000), Some((0, 99)));
        assert_eq!(content_range((0, 99), 1000), "bytes 0-99/1000");
        assert_eq!(resolve_range(Some("bytes=500-500"), 1000), Some((500, 500)));
    }

    #[test]
    fn test_start_past_end_serves_full() {
        assert_eq!(resolve_range(Some("bytes=5000-6000"), 1000), None);
        assert_eq!(resolve_range(Some("bytes=1000-"), 1000), None);
    }

    #[test]
    fn test_end_past_eof_is_clamped() {
        assert_eq!(resolve_range(Some("bytes=900-5000"), 1000), Some((900, 999)));
    }

    #[test]
    fn test_open_ended_and_suffix() {
        assert_eq!(resolve_range(Some("bytes=100-"), 1000), Some((100, 999)));
        assert_eq!(resolve_range(Some("bytes=-200"), 1000), Some((800, 999)));
        assert_eq!(resolve_range(Some("bytes=-5000"), 1000), Some((0, 999)));
        assert_eq!(resolve_range(Some("bytes=-0"), 1000), None);
    }

    #[test]
    fn test_malformed_or_reversed_serves_full() {
        for header in [
            "bytes=99-0",
            "bytes=abc-def",
            "bytes=-",
            "items=0-10",
            "bytes=0-10,20-30",
            "0-99",
        ] {
            assert_eq!(resolve_range(Some(header), 1000), None, "{header}");
        }
        assert_eq!(resolve_range(None, 1000), None);
        assert_eq!(resolve_range(Some("bytes=0-10"), 0), None);
    }
}
