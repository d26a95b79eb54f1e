//! Reformatting: `pretty`, `ugly` and the well-formedness scan behind
//! `valid`.
//!
//! The validator is a single iterative pass with an explicit container
//! stack, so arbitrarily nested documents never grow the call stack. The
//! formatters preserve string contents byte-identically and never re-encode
//! number literals.
use crate::error::Error;
use crate::scanner;
use smallvec::SmallVec;

/// Options for [`pretty`](crate::pretty).
#[derive(Debug, Clone)]
pub struct PrettyOptions {
    /// Indentation unit, prepended once per nesting level.
    pub indent: String,
    /// Sort object members by decoded key instead of keeping source order.
    pub sort_keys: bool,
    /// Arrays whose flattened form fits within this column stay on one line.
    pub width: usize,
}

impl Default for PrettyOptions {
    #[inline]
    fn default() -> Self {
        Self {
            indent: "  ".to_owned(),
            sort_keys: false,
            width: 80,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Frame {
    Obj,
    Arr,
}

/// Nesting beyond this depth is rejected as malformed.
const MAX_DEPTH: usize = 512;

/// Full well-formedness scan. Returns the byte offset of the first offending
/// byte on failure. Documents nested deeper than [`MAX_DEPTH`] are rejected.
pub(crate) fn validate(b: &[u8]) -> Result<(), usize> {
    let mut stack: SmallVec<[Frame; 64]> = SmallVec::new();
    let mut i = scanner::skip_ws(b, 0);
    if i >= b.len() {
        return Err(b.len());
    }
    loop {
        // A value is expected at `i`.
        match b.get(i) {
            Some(b'{') => {
                let j = scanner::skip_ws(b, i + 1);
                if b.get(j) == Some(&b'}') {
                    i = j + 1;
                } else {
                    if stack.len() >= MAX_DEPTH {
                        return Err(i);
                    }
                    stack.push(Frame::Obj);
                    i = validate_key_colon(b, j)?;
                    continue;
                }
            }
            Some(b'[') => {
                let j = scanner::skip_ws(b, i + 1);
                if b.get(j) == Some(&b']') {
                    i = j + 1;
                } else {
                    if stack.len() >= MAX_DEPTH {
                        return Err(i);
                    }
                    stack.push(Frame::Arr);
                    i = j;
                    continue;
                }
            }
            Some(b'"') => i = validate_string(b, i)?,
            Some(b't') => i = expect_literal(b, i, b"true")?,
            Some(b'f') => i = expect_literal(b, i, b"false")?,
            Some(b'n') => i = expect_literal(b, i, b"null")?,
            Some(b'-') | Some(b'0'..=b'9') => i = validate_number(b, i)?,
            _ => return Err(i),
        }
        // A value just ended at `i`; unwind closers and separators.
        loop {
            i = scanner::skip_ws(b, i);
            match stack.last() {
                None => {
                    return if i == b.len() { Ok(()) } else { Err(i) };
                }
                Some(Frame::Obj) => match b.get(i) {
                    Some(b',') => {
                        let j = scanner::skip_ws(b, i + 1);
                        i = validate_key_colon(b, j)?;
                        break;
                    }
                    Some(b'}') => {
                        stack.pop();
                        i += 1;
                    }
                    _ => return Err(i),
                },
                Some(Frame::Arr) => match b.get(i) {
                    Some(b',') => {
                        i = scanner::skip_ws(b, i + 1);
                        break;
                    }
                    Some(b']') => {
                        stack.pop();
                        i += 1;
                    }
                    _ => return Err(i),
                },
            }
        }
    }
}

/// Validates a `"key" :` pair and returns the offset of the member value.
fn validate_key_colon(b: &[u8], i: usize) -> Result<usize, usize> {
    if b.get(i) != Some(&b'"') {
        return Err(i);
    }
    let after_key = validate_string(b, i)?;
    let colon = scanner::skip_ws(b, after_key);
    if b.get(colon) != Some(&b':') {
        return Err(colon);
    }
    Ok(scanner::skip_ws(b, colon + 1))
}

fn validate_string(b: &[u8], i: usize) -> Result<usize, usize> {
    let start = i + 1;
    let mut j = start;
    while j < b.len() {
        match b[j] {
            b'"' => {
                return if std::str::from_utf8(&b[start..j]).is_ok() {
                    Ok(j + 1)
                } else {
                    Err(start)
                };
            }
            b'\\' => {
                j += 1;
                match b.get(j) {
                    Some(b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't') => j += 1,
                    Some(b'u') => {
                        if b.len() < j + 5 || !b[j + 1..j + 5].iter().all(u8::is_ascii_hexdigit) {
                            return Err(j);
                        }
                        j += 5;
                    }
                    _ => return Err(j),
                }
            }
            c if c < 0x20 => return Err(j),
            _ => j += 1,
        }
    }
    Err(b.len())
}

fn validate_number(b: &[u8], i: usize) -> Result<usize, usize> {
    let mut j = i;
    if b.get(j) == Some(&b'-') {
        j += 1;
    }
    match b.get(j) {
        Some(b'0') => j += 1,
        Some(b'1'..=b'9') => {
            while matches!(b.get(j), Some(b'0'..=b'9')) {
                j += 1;
            }
        }
        _ => return Err(j),
    }
    if b.get(j) == Some(&b'.') {
        j += 1;
        if !matches!(b.get(j), Some(b'0'..=b'9')) {
            return Err(j);
        }
        while matches!(b.get(j), Some(b'0'..=b'9')) {
            j += 1;
        }
    }
    if matches!(b.get(j), Some(b'e' | b'E')) {
        j += 1;
        if matches!(b.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        if !matches!(b.get(j), Some(b'0'..=b'9')) {
            return Err(j);
        }
        while matches!(b.get(j), Some(b'0'..=b'9')) {
            j += 1;
        }
    }
    Ok(j)
}

fn expect_literal(b: &[u8], i: usize, lit: &[u8]) -> Result<usize, usize> {
    if b.len() - i >= lit.len() && &b[i..i + lit.len()] == lit {
        Ok(i + lit.len())
    } else {
        Err(i)
    }
}

/// Strips insignificant whitespace without validating. The lenient
/// counterpart of [`ugly_bytes`], also used to normalise raw spans for
/// comparison.
pub(crate) fn squash(b: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(b.len());
    let mut i = 0;
    while i < b.len() {
        match b[i] {
            b'"' => {
                let end = scanner::skip_string(b, i).min(b.len());
                out.extend_from_slice(&b[i..end]);
                i = end;
            }
            b' ' | b'\t' | b'\n' | b'\r' => i += 1,
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

pub(crate) fn ugly_bytes(b: &[u8]) -> Result<Vec<u8>, Error> {
    validate(b).map_err(Error::MalformedInput)?;
    Ok(squash(b))
}

pub(crate) fn pretty_bytes(b: &[u8], opts: &PrettyOptions) -> Result<Vec<u8>, Error> {
    validate(b).map_err(Error::MalformedInput)?;
    let nl = line_ending(b);
    let mut out = Vec::with_capacity(b.len() * 2);
    write_value(b, scanner::skip_ws(b, 0), 0, opts, nl, &mut out);
    Ok(out)
}

/// The input's line ending when it is used consistently, `\n` otherwise.
fn line_ending(b: &[u8]) -> &'static str {
    let mut any_crlf = false;
    for (i, &c) in b.iter().enumerate() {
        if c == b'\n' {
            if i == 0 || b[i - 1] != b'\r' {
                return "\n";
            }
            any_crlf = true;
        }
    }
    if any_crlf {
        "\r\n"
    } else {
        "\n"
    }
}

fn push_indent(out: &mut Vec<u8>, opts: &PrettyOptions, nl: &str, level: usize) {
    out.extend_from_slice(nl.as_bytes());
    for _ in 0..level {
        out.extend_from_slice(opts.indent.as_bytes());
    }
}

fn write_value(b: &[u8], i: usize, level: usize, opts: &PrettyOptions, nl: &str, out: &mut Vec<u8>) {
    match b.get(i) {
        Some(b'{') => write_object(b, i, level, opts, nl, out),
        Some(b'[') => write_array(b, i, level, opts, nl, out),
        _ => {
            let end = scanner::find_value_end(b, i).min(b.len());
            out.extend_from_slice(&b[i..end]);
        }
    }
}

fn write_object(b: &[u8], i: usize, level: usize, opts: &PrettyOptions, nl: &str, out: &mut Vec<u8>) {
    // (key span with quotes, value offset)
    let mut members: Vec<(usize, usize, usize)> = Vec::new();
    scanner::each_member(b, i, &mut |k0, k1, v0, _| {
        members.push((k0 - 1, k1 + 1, v0));
        true
    });
    if members.is_empty() {
        out.extend_from_slice(b"{}");
        return;
    }
    if opts.sort_keys {
        members.sort_by_key(|&(ks, ke, _)| scanner::unescape(&b[ks + 1..ke - 1]));
    }
    out.push(b'{');
    for (n, &(ks, ke, v0)) in members.iter().enumerate() {
        if n > 0 {
            out.push(b',');
        }
        push_indent(out, opts, nl, level + 1);
        out.extend_from_slice(&b[ks..ke]);
        out.extend_from_slice(b": ");
        write_value(b, v0, level + 1, opts, nl, out);
    }
    push_indent(out, opts, nl, level);
    out.push(b'}');
}

fn write_array(b: &[u8], i: usize, level: usize, opts: &PrettyOptions, nl: &str, out: &mut Vec<u8>) {
    let mut elements: Vec<usize> = Vec::new();
    scanner::each_element(b, i, &mut |v0, _| {
        elements.push(v0);
        true
    });
    if elements.is_empty() {
        out.extend_from_slice(b"[]");
        return;
    }
    let span_end = scanner::skip_array(b, i);
    let flat = squash(&b[i..span_end]);
    if flat.len() + level * opts.indent.len() <= opts.width {
        out.extend_from_slice(&flat);
        return;
    }
    out.push(b'[');
    for (n, &v0) in elements.iter().enumerate() {
        if n > 0 {
            out.push(b',');
        }
        push_indent(out, opts, nl, level + 1);
        write_value(b, v0, level + 1, opts, nl, out);
    }
    push_indent(out, opts, nl, level);
    out.push(b']');
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(br#"{"a":1,"b":[true,null,"x"],"c":{"d":2.5e-3}}"#, true; "well formed")]
    #[test_case(b"  [1, 2, 3]  ", true; "surrounding whitespace")]
    #[test_case(b"\"lone string\"", true; "scalar document")]
    #[test_case(b"{", false; "unclosed object")]
    #[test_case(b"[1,]", false; "trailing comma")]
    #[test_case(b"{a:1}", false; "unquoted key")]
    #[test_case(b"[01]", false; "leading zero")]
    #[test_case(b"[1] tail", false; "trailing garbage")]
    #[test_case(br#"["\q"]"#, false; "bad escape")]
    #[test_case(b"", false; "empty input")]
    fn validation(b: &[u8], ok: bool) {
        assert_eq!(ok, validate(b).is_ok(), "{}", String::from_utf8_lossy(b));
    }

    #[test]
    fn validation_reports_offsets() {
        assert_eq!(Err(5), validate(b"[1,2 3]"));
    }

    #[test]
    fn ugly_strips_only_insignificant_whitespace() {
        let b = b"{ \"a b\" : [ 1 , \"x y\" ] }";
        assert_eq!(
            br#"{"a b":[1,"x y"]}"#.to_vec(),
            ugly_bytes(b).unwrap()
        );
    }

    #[test]
    fn pretty_default_layout() {
        let b = br#"{"name":{"first":"Tom"},"tags":["a","b"]}"#;
        let expected = "{\n  \"name\": {\n    \"first\": \"Tom\"\n  },\n  \"tags\": [\"a\",\"b\"]\n}";
        assert_eq!(expected.as_bytes().to_vec(), pretty_bytes(b, &PrettyOptions::default()).unwrap());
    }

    #[test]
    fn pretty_wraps_wide_arrays() {
        let opts = PrettyOptions {
            width: 10,
            ..PrettyOptions::default()
        };
        let b = br#"[100000,200000,300000]"#;
        let expected = "[\n  100000,\n  200000,\n  300000\n]";
        assert_eq!(expected.as_bytes().to_vec(), pretty_bytes(b, &opts).unwrap());
    }

    #[test]
    fn pretty_sorts_keys_on_request() {
        let opts = PrettyOptions {
            sort_keys: true,
            ..PrettyOptions::default()
        };
        let b = br#"{"b":1,"a":2}"#;
        let expected = "{\n  \"a\": 2,\n  \"b\": 1\n}";
        assert_eq!(expected.as_bytes().to_vec(), pretty_bytes(b, &opts).unwrap());
    }

    #[test]
    fn pretty_keeps_consistent_crlf() {
        let b = b"{\r\n \"a\": 1\r\n}";
        let expected = "{\r\n  \"a\": 1\r\n}";
        assert_eq!(expected.as_bytes().to_vec(), pretty_bytes(b, &PrettyOptions::default()).unwrap());
    }

    #[test]
    fn squash_is_reusable_on_fragments() {
        assert_eq!(b"[1,2]".to_vec(), squash(b"[ 1 , 2 ]"));
    }
}
