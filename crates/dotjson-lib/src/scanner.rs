//! Byte-level scanning primitives for walking raw JSON.
//!
//! A family of pure, allocation-free routines that advance a cursor through
//! the document buffer. Each takes the buffer and a byte index and returns the
//! index one past the construct it skipped. The routines never panic on
//! malformed input; when the structure is broken they return the buffer
//! length, which callers detect as a boundary.
//!
//! Strings are skipped without decoding. Escape sequences only matter insofar
//! as an escaped quote must not terminate the scan; full decoding lives in
//! [`unescape`] and is performed lazily by the result view.
use cfg_if::cfg_if;

/// Advances past JSON insignificant whitespace: space, tab, newline, carriage return.
#[inline]
pub(crate) fn skip_ws(b: &[u8], mut i: usize) -> usize {
    while i < b.len() && matches!(b[i], b' ' | b'\t' | b'\n' | b'\r') {
        i += 1;
    }
    i
}

/// Advances across exactly one JSON value whose first byte is at `i`,
/// dispatching on that byte. Returns `b.len()` if no value starts at `i`.
pub(crate) fn find_value_end(b: &[u8], i: usize) -> usize {
    if i >= b.len() {
        return b.len();
    }
    match b[i] {
        b'"' => skip_string(b, i),
        b'{' => skip_object(b, i),
        b'[' => skip_array(b, i),
        b't' => skip_literal(b, i, b"true"),
        b'f' => skip_literal(b, i, b"false"),
        b'n' => skip_literal(b, i, b"null"),
        b'-' | b'0'..=b'9' => skip_number(b, i),
        _ => b.len(),
    }
}

/// Skips leading whitespace and then exactly one JSON value.
#[allow(dead_code)]
#[inline]
pub(crate) fn skip_value(b: &[u8], i: usize) -> usize {
    find_value_end(b, skip_ws(b, i))
}

cfg_if! {
    if #[cfg(feature = "fast-scan")] {
        /// Advances to the byte after the closing quote of the string opening at `i`.
        ///
        /// Races through the contents with `memchr`, then patches up escaped
        /// quotes by counting the preceding backslash run.
        pub(crate) fn skip_string(b: &[u8], i: usize) -> usize {
            debug_assert!(i < b.len() && b[i] == b'"');
            let mut at = i + 1;
            while let Some(rel) = memchr::memchr(b'"', &b[at..]) {
                let quote = at + rel;
                let mut backslashes = 0;
                while quote > at + backslashes && b[quote - 1 - backslashes] == b'\\' {
                    backslashes += 1;
                }
                if backslashes % 2 == 0 {
                    return quote + 1;
                }
                at = quote + 1;
            }
            b.len()
        }
    } else {
        /// Advances to the byte after the closing quote of the string opening at `i`.
        pub(crate) fn skip_string(b: &[u8], i: usize) -> usize {
            debug_assert!(i < b.len() && b[i] == b'"');
            let mut at = i + 1;
            while at < b.len() {
                match b[at] {
                    b'\\' => at += 2,
                    b'"' => return at + 1,
                    _ => at += 1,
                }
            }
            b.len()
        }
    }
}

/// Advances across a number token. Accepts the full numeric alphabet without
/// validating the grammar; `valid` performs strict checking.
pub(crate) fn skip_number(b: &[u8], i: usize) -> usize {
    let mut at = i;
    while at < b.len() && matches!(b[at], b'-' | b'+' | b'.' | b'e' | b'E' | b'0'..=b'9') {
        at += 1;
    }
    at
}

/// Advances across the literal `lit` (`true`, `false` or `null`) at `i`.
/// Returns `b.len()` when the bytes do not match.
pub(crate) fn skip_literal(b: &[u8], i: usize, lit: &[u8]) -> usize {
    if b.len() - i >= lit.len() && &b[i..i + lit.len()] == lit {
        i + lit.len()
    } else {
        b.len()
    }
}

/// Advances across the object opening at `i`, to one past its matching `}`.
#[inline]
pub(crate) fn skip_object(b: &[u8], i: usize) -> usize {
    skip_container(b, i, b'{', b'}')
}

/// Advances across the array opening at `i`, to one past its matching `]`.
#[inline]
pub(crate) fn skip_array(b: &[u8], i: usize) -> usize {
    skip_container(b, i, b'[', b']')
}

/// Depth-aware skip to one past the bracket matching the opener at `i`.
///
/// Tracks only the requested bracket kind; in well-formed JSON every other
/// bracket pair it passes over is balanced, so the count stays correct.
/// Strings are skipped whole so brackets inside them are never counted.
fn skip_container(b: &[u8], i: usize, open: u8, close: u8) -> usize {
    debug_assert!(i < b.len() && b[i] == open);
    let mut depth = 0_usize;
    let mut at = i;
    while at < b.len() {
        let c = b[at];
        if c == b'"' {
            at = skip_string(b, at);
            continue;
        }
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return at + 1;
            }
        }
        at += 1;
    }
    b.len()
}

/// Iterates the members of the object whose `{` is at `i`, in source order.
///
/// For each member, `f` receives the key content span (between the quotes,
/// escapes intact) and the value span. Iteration stops early when `f` returns
/// `false` or when the structure is malformed. Returns `true` iff the whole
/// object was walked to its closing brace.
pub(crate) fn each_member(
    b: &[u8],
    i: usize,
    f: &mut impl FnMut(usize, usize, usize, usize) -> bool,
) -> bool {
    debug_assert!(i < b.len() && b[i] == b'{');
    let mut at = skip_ws(b, i + 1);
    if at < b.len() && b[at] == b'}' {
        return true;
    }
    while at < b.len() {
        if b[at] != b'"' {
            return false;
        }
        let key_end = skip_string(b, at);
        if key_end >= b.len() {
            return false;
        }
        let (k0, k1) = (at + 1, key_end - 1);
        at = skip_ws(b, key_end);
        if at >= b.len() || b[at] != b':' {
            return false;
        }
        let v0 = skip_ws(b, at + 1);
        let v1 = find_value_end(b, v0);
        if v1 > b.len() || v0 >= b.len() {
            return false;
        }
        if !f(k0, k1, v0, v1) {
            return false;
        }
        at = skip_ws(b, v1);
        match b.get(at) {
            Some(b',') => at = skip_ws(b, at + 1),
            Some(b'}') => return true,
            _ => return false,
        }
    }
    false
}

/// Iterates the elements of the array whose `[` is at `i`, in source order.
///
/// For each element, `f` receives the value span. Iteration stops early when
/// `f` returns `false` or the structure is malformed. Returns `true` iff the
/// whole array was walked to its closing bracket.
pub(crate) fn each_element(b: &[u8], i: usize, f: &mut impl FnMut(usize, usize) -> bool) -> bool {
    debug_assert!(i < b.len() && b[i] == b'[');
    let mut at = skip_ws(b, i + 1);
    if at < b.len() && b[at] == b']' {
        return true;
    }
    while at < b.len() {
        let v0 = at;
        let v1 = find_value_end(b, v0);
        if v1 > b.len() {
            return false;
        }
        if !f(v0, v1) {
            return false;
        }
        at = skip_ws(b, v1);
        match b.get(at) {
            Some(b',') => at = skip_ws(b, at + 1),
            Some(b']') => return true,
            _ => return false,
        }
    }
    false
}

/// Counts the elements of the array whose `[` is at `i`.
pub(crate) fn count_elements(b: &[u8], i: usize) -> usize {
    let mut n = 0;
    each_element(b, i, &mut |_, _| {
        n += 1;
        true
    });
    n
}

/// Compares the encoded key span `b[k0..k1]` (contents between the quotes,
/// possibly containing escapes) against a raw target string.
///
/// Zero-allocation unless the span is escape-bearing, in which case the span
/// is decoded before comparison.
pub(crate) fn key_equals(b: &[u8], k0: usize, k1: usize, target: &str) -> bool {
    let span = &b[k0..k1];
    if !span.contains(&b'\\') {
        return span == target.as_bytes();
    }
    unescape(span) == target
}

/// Decodes the contents of a JSON string span (between the quotes).
///
/// Handles the standard escapes and `\uXXXX` with surrogate-pair
/// recombination. Decoding is lenient: unknown escapes are kept verbatim,
/// lone surrogates and invalid UTF-8 become replacement characters. Strict
/// validation is the job of [`valid`](crate::valid), not the decoder.
pub(crate) fn unescape(raw: &[u8]) -> String {
    if !raw.contains(&b'\\') {
        return String::from_utf8_lossy(raw).into_owned();
    }
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] != b'\\' {
            let start = i;
            while i < raw.len() && raw[i] != b'\\' {
                i += 1;
            }
            out.push_str(&String::from_utf8_lossy(&raw[start..i]));
            continue;
        }
        if i + 1 >= raw.len() {
            out.push('\\');
            break;
        }
        match raw[i + 1] {
            b'"' => out.push('"'),
            b'\\' => out.push('\\'),
            b'/' => out.push('/'),
            b'b' => out.push('\u{0008}'),
            b'f' => out.push('\u{000C}'),
            b'n' => out.push('\n'),
            b'r' => out.push('\r'),
            b't' => out.push('\t'),
            b'u' => {
                let (ch, consumed) = decode_unicode_escape(&raw[i..]);
                out.push(ch);
                i += consumed;
                continue;
            }
            other => {
                out.push('\\');
                out.push(char::from(other));
            }
        }
        i += 2;
    }
    out
}

/// Decodes a `\uXXXX` escape at the start of `raw`, combining surrogate
/// pairs when a low surrogate escape follows. Returns the decoded character
/// and the number of bytes consumed.
fn decode_unicode_escape(raw: &[u8]) -> (char, usize) {
    match hex4(raw, 2) {
        None => ('\u{FFFD}', 2),
        Some(hi) if (0xD800..0xDC00).contains(&hi) => {
            // High surrogate; a following \uXXXX low surrogate completes the pair.
            if raw.len() >= 12 && raw[6] == b'\\' && raw[7] == b'u' {
                if let Some(lo) = hex4(raw, 8) {
                    if (0xDC00..0xE000).contains(&lo) {
                        let c = 0x10000 + ((u32::from(hi) - 0xD800) << 10) + (u32::from(lo) - 0xDC00);
                        return (char::from_u32(c).unwrap_or('\u{FFFD}'), 12);
                    }
                }
            }
            ('\u{FFFD}', 6)
        }
        Some(lone) if (0xDC00..0xE000).contains(&lone) => ('\u{FFFD}', 6),
        Some(code) => (char::from_u32(u32::from(code)).unwrap_or('\u{FFFD}'), 6),
    }
}

fn hex4(raw: &[u8], at: usize) -> Option<u16> {
    if raw.len() < at + 4 {
        return None;
    }
    let mut v: u16 = 0;
    for &c in &raw[at..at + 4] {
        let d = match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            b'A'..=b'F' => c - b'A' + 10,
            _ => return None,
        };
        v = (v << 4) | u16::from(d);
    }
    Some(v)
}
