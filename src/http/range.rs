//! Range header evaluation module
//!
//! Single-range `bytes=` parsing for 206 responses. Multi-range and
//! non-byte units fall back to a full response.

/// What to do with a request after looking at its Range header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    /// Serve bytes `start..=end`
    Partial { start: u64, end: u64 },
    /// Range understood but impossible for this file, answer 416
    Unsatisfiable,
    /// No usable Range header, answer with the full content
    Full,
}

/// Evaluate a Range header against the total file size
pub fn evaluate(header: Option<&str>, size: u64) -> RangeOutcome {
    let Some(spec) = header.and_then(|h| h.strip_prefix("bytes=")) else {
        return RangeOutcome::Full;
    };
    // single range only
    if spec.contains(',') {
        return RangeOutcome::Full;
    }
    let Some((first, last)) = spec.split_once('-') else {
        return RangeOutcome::Full;
    };
    let (first, last) = (first.trim(), last.trim());

    // suffix form: "-N" means the final N bytes
    if first.is_empty() {
        return match last.parse::<u64>() {
            Ok(0) => RangeOutcome::Unsatisfiable,
            Ok(suffix) if size > 0 => RangeOutcome::Partial {
                start: size.saturating_sub(suffix),
                end: size - 1,
            },
            Ok(_) => RangeOutcome::Unsatisfiable,
            Err(_) => RangeOutcome::Full,
        };
    }

    let Ok(start) = first.parse::<u64>() else {
        return RangeOutcome::Full;
    };
    if start >= size {
        return RangeOutcome::Unsatisfiable;
    }

    let end = if last.is_empty() {
        size - 1
    } else {
        let Ok(end) = last.parse::<u64>() else {
            return RangeOutcome::Full;
        };
        if end < start {
            return RangeOutcome::Unsatisfiable;
        }
        end.min(size - 1)
    };

    RangeOutcome::Partial { start, end }
}
