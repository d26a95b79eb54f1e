//! The lightweight result view over a region of the source document.
//!
//! A [`Value`] classifies a byte region as one of the JSON kinds and exposes
//! lazy decoders for it. Results of plain lookups borrow directly from the
//! caller's buffer; results synthesised by projections and modifiers own a
//! scratch buffer instead. Either way the accessors behave identically.
//!
//! Scalars are decoded lazily: the first accessor call materialises the
//! decoded form and caches it on the view, so repeated access is free.
use crate::scanner;
use chrono::{DateTime, FixedOffset};
use once_cell::unsync::OnceCell;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use vector_map::VecMap;

/// Classification of a result region.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Kind {
    /// The path did not resolve; no value exists.
    None,
    /// The literal `null`.
    Null,
    /// `true` or `false`.
    Boolean,
    /// A JSON number; integer vs. float detection is lazy.
    Number,
    /// A JSON string; escapes are decoded on demand.
    String,
    /// An object; the raw slice spans `{` to `}` inclusive.
    Object,
    /// An array; the raw slice spans `[` to `]` inclusive.
    Array,
}

impl Kind {
    /// The lowercase JSON type name, as reported by the `@type` modifier.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    fn priority(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Null => 1,
            Self::Boolean => 2,
            Self::Number => 3,
            Self::String => 4,
            Self::Object => 5,
            Self::Array => 6,
        }
    }
}

/// A classified view of a JSON value.
///
/// Holds no independent copy of the document when produced by a plain lookup;
/// the view is valid for as long as the source bytes remain unchanged.
#[derive(Clone)]
pub struct Value<'a> {
    kind: Kind,
    raw: Cow<'a, [u8]>,
    indices: Option<Vec<usize>>,
    str_cache: OnceCell<String>,
    num_cache: OnceCell<f64>,
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("kind", &self.kind)
            .field("raw", &String::from_utf8_lossy(&self.raw))
            .finish()
    }
}

impl Default for Value<'_> {
    #[inline]
    fn default() -> Self {
        Self::none()
    }
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.raw == other.raw
    }
}

impl<'a> Value<'a> {
    /// The non-existent value, reported when a path does not resolve.
    #[must_use]
    #[inline]
    pub fn none() -> Self {
        Self {
            kind: Kind::None,
            raw: Cow::Borrowed(&[]),
            indices: None,
            str_cache: OnceCell::new(),
            num_cache: OnceCell::new(),
        }
    }

    /// Classifies a span holding exactly one JSON value, delimiters inclusive
    /// and with no surrounding whitespace.
    pub(crate) fn from_span(raw: &'a [u8]) -> Self {
        let kind = classify(raw);
        Self {
            kind,
            raw: Cow::Borrowed(raw),
            indices: None,
            str_cache: OnceCell::new(),
            num_cache: OnceCell::new(),
        }
    }

    /// Classifies an owned scratch buffer produced by a projection or
    /// modifier.
    pub(crate) fn from_owned(raw: Vec<u8>) -> Value<'static> {
        let kind = classify(&raw);
        Value {
            kind,
            raw: Cow::Owned(raw),
            indices: None,
            str_cache: OnceCell::new(),
            num_cache: OnceCell::new(),
        }
    }

    /// A boolean result.
    pub(crate) fn of_bool(v: bool) -> Value<'static> {
        Value {
            kind: Kind::Boolean,
            raw: Cow::Borrowed(if v { b"true" } else { b"false" }),
            indices: None,
            str_cache: OnceCell::new(),
            num_cache: OnceCell::new(),
        }
    }

    /// A numeric result.
    pub(crate) fn of_f64(n: f64) -> Value<'static> {
        Value {
            kind: Kind::Number,
            raw: Cow::Owned(format_number(n).into_bytes()),
            indices: None,
            str_cache: OnceCell::new(),
            num_cache: OnceCell::new(),
        }
    }

    /// A string result holding the given decoded text.
    pub(crate) fn of_str(s: &str) -> Value<'static> {
        Value {
            kind: Kind::String,
            raw: Cow::Owned(encode_string(s)),
            indices: None,
            str_cache: OnceCell::new(),
            num_cache: OnceCell::new(),
        }
    }

    /// The kind of the matched value.
    #[must_use]
    #[inline(always)]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Whether the path resolved to a value at all.
    #[must_use]
    #[inline(always)]
    pub fn exists(&self) -> bool {
        self.kind != Kind::None
    }

    /// The raw bytes of the matched region, delimiters inclusive.
    #[must_use]
    #[inline(always)]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub(crate) fn into_raw(self) -> Cow<'a, [u8]> {
        self.raw
    }

    /// For results synthesised by a projection or `#(..)#` filter: the byte
    /// offsets of the collected elements within the buffer the enclosing
    /// stage walked. `None` for every other result.
    #[must_use]
    #[inline]
    pub fn indices(&self) -> Option<&[usize]> {
        self.indices.as_deref()
    }

    pub(crate) fn with_indices(mut self, indices: Vec<usize>) -> Self {
        self.indices = Some(indices);
        self
    }

    /// Converts the view into one that owns its bytes, detaching it from the
    /// source buffer's lifetime.
    #[must_use]
    pub fn into_owned(self) -> Value<'static> {
        Value {
            kind: self.kind,
            raw: Cow::Owned(self.raw.into_owned()),
            indices: self.indices,
            str_cache: OnceCell::new(),
            num_cache: OnceCell::new(),
        }
    }

    /// The decoded string form of the value.
    ///
    /// Strings are unescaped; numbers, booleans and `null` yield their JSON
    /// textual form; objects and arrays yield the raw slice verbatim; a
    /// non-existent value yields the empty string.
    #[must_use]
    pub fn string(&self) -> &str {
        self.str_cache.get_or_init(|| match self.kind {
            Kind::None => String::new(),
            Kind::String => scanner::unescape(string_contents(&self.raw)),
            _ => String::from_utf8_lossy(&self.raw).into_owned(),
        })
    }

    /// Numeric coercion to `f64`.
    ///
    /// Numbers parse their literal text; booleans coerce to 0/1; strings are
    /// parsed after trimming; everything else is 0.
    #[must_use]
    pub fn float(&self) -> f64 {
        *self.num_cache.get_or_init(|| match self.kind {
            Kind::Number => std::str::from_utf8(&self.raw)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.0),
            Kind::Boolean => {
                if self.raw.as_ref() == b"true" {
                    1.0
                } else {
                    0.0
                }
            }
            Kind::String => self.string().trim().parse().unwrap_or(0.0),
            _ => 0.0,
        })
    }

    /// Numeric coercion to `i64`. Integral number literals parse exactly,
    /// without a round-trip through floating point.
    #[must_use]
    pub fn int(&self) -> i64 {
        match self.kind {
            Kind::Number => lexical_i64(&self.raw).unwrap_or_else(|| self.float() as i64),
            Kind::String => {
                let t = self.string().trim();
                t.parse().unwrap_or_else(|_| self.float() as i64)
            }
            _ => self.float() as i64,
        }
    }

    /// Numeric coercion to `u64`. Negative inputs clamp to 0.
    #[must_use]
    pub fn uint(&self) -> u64 {
        match self.kind {
            Kind::Number => lexical_u64(&self.raw).unwrap_or_else(|| {
                let f = self.float();
                if f <= 0.0 {
                    0
                } else {
                    f as u64
                }
            }),
            Kind::String => {
                let t = self.string().trim();
                t.parse().unwrap_or_else(|_| {
                    let f = self.float();
                    if f <= 0.0 {
                        0
                    } else {
                        f as u64
                    }
                })
            }
            _ => {
                let f = self.float();
                if f <= 0.0 {
                    0
                } else {
                    f as u64
                }
            }
        }
    }

    /// Boolean coercion.
    ///
    /// Literal booleans directly; numbers other than 0 are truthy; the
    /// trimmed strings `1`, `t`, `true`, `y`, `yes` are truthy
    /// case-insensitively; everything else is false.
    #[must_use]
    pub fn boolean(&self) -> bool {
        match self.kind {
            Kind::Boolean => self.raw.as_ref() == b"true",
            Kind::Number => self.float() != 0.0,
            Kind::String => {
                let t = self.string().trim();
                t.eq_ignore_ascii_case("1")
                    || t.eq_ignore_ascii_case("t")
                    || t.eq_ignore_ascii_case("true")
                    || t.eq_ignore_ascii_case("y")
                    || t.eq_ignore_ascii_case("yes")
            }
            _ => false,
        }
    }

    /// Parses a string value as an RFC3339 timestamp.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<FixedOffset>> {
        if self.kind != Kind::String {
            return None;
        }
        DateTime::parse_from_rfc3339(self.string().trim()).ok()
    }

    /// Materialises the elements of an array into independent views
    /// borrowing from this one. Non-arrays yield an empty vector.
    #[must_use]
    pub fn array(&self) -> Vec<Value<'_>> {
        let mut out = Vec::new();
        if self.kind == Kind::Array {
            scanner::each_element(&self.raw, 0, &mut |v0, v1| {
                out.push(Value::from_span(&self.raw[v0..v1]));
                true
            });
        }
        out
    }

    /// Materialises the members of an object into a source-ordered map.
    /// Duplicate keys keep the first occurrence. Non-objects yield an empty
    /// map.
    #[must_use]
    pub fn map(&self) -> VecMap<String, Value<'_>> {
        let mut out = VecMap::new();
        if self.kind == Kind::Object {
            scanner::each_member(&self.raw, 0, &mut |k0, k1, v0, v1| {
                let key = scanner::unescape(&self.raw[k0..k1]);
                if !out.contains_key(&key) {
                    out.insert(key, Value::from_span(&self.raw[v0..v1]));
                }
                true
            });
        }
        out
    }

    /// Calls `f` with `(key, value)` for each child: object members get their
    /// key as a string view, array elements their index as a number view.
    /// Returning `false` from `f` terminates the walk early.
    pub fn each(&self, mut f: impl FnMut(Value<'_>, Value<'_>) -> bool) {
        match self.kind {
            Kind::Object => {
                scanner::each_member(&self.raw, 0, &mut |k0, k1, v0, v1| {
                    let key = Value::of_str(&scanner::unescape(&self.raw[k0..k1]));
                    f(key, Value::from_span(&self.raw[v0..v1]))
                });
            }
            Kind::Array => {
                let mut idx = 0_i64;
                scanner::each_element(&self.raw, 0, &mut |v0, v1| {
                    let key = Value::of_f64(idx as f64);
                    idx += 1;
                    f(key, Value::from_span(&self.raw[v0..v1]))
                });
            }
            _ => {}
        }
    }

    /// Runs a path query against this value, returning a view borrowing
    /// from it.
    #[must_use]
    pub fn get(&self, path: &str) -> Value<'_> {
        crate::get(&self.raw, path)
    }

    /// Total order used by `@sort` and exposed for callers ranking results.
    ///
    /// Orders first by type priority `Null < Boolean < Number < String <
    /// Object < Array`, then within a type by natural comparison. String
    /// comparison folds ASCII case when `case_sensitive` is false.
    #[must_use]
    pub fn less(&self, other: &Value<'_>, case_sensitive: bool) -> bool {
        self.compare(other, case_sensitive) == Ordering::Less
    }

    pub(crate) fn compare(&self, other: &Value<'_>, case_sensitive: bool) -> Ordering {
        let by_type = self.kind.priority().cmp(&other.kind.priority());
        if by_type != Ordering::Equal {
            return by_type;
        }
        match self.kind {
            Kind::None | Kind::Null => Ordering::Equal,
            Kind::Boolean => self.boolean().cmp(&other.boolean()),
            Kind::Number => self
                .float()
                .partial_cmp(&other.float())
                .unwrap_or(Ordering::Equal),
            Kind::String => {
                if case_sensitive {
                    self.string().cmp(other.string())
                } else {
                    ascii_folded_cmp(self.string(), other.string())
                }
            }
            Kind::Object | Kind::Array => self.raw.as_ref().cmp(other.raw.as_ref()),
        }
    }
}

/// Classifies a trimmed span by its leading byte. Empty spans are `None`.
fn classify(raw: &[u8]) -> Kind {
    match raw.first() {
        None => Kind::None,
        Some(b'{') => Kind::Object,
        Some(b'[') => Kind::Array,
        Some(b'"') => Kind::String,
        Some(b't') | Some(b'f') => Kind::Boolean,
        Some(b'n') => Kind::Null,
        Some(b'-') | Some(b'0'..=b'9') => Kind::Number,
        Some(_) => Kind::None,
    }
}

fn string_contents(raw: &[u8]) -> &[u8] {
    if raw.len() >= 2 && raw[0] == b'"' && raw[raw.len() - 1] == b'"' {
        &raw[1..raw.len() - 1]
    } else {
        raw
    }
}

fn lexical_i64(raw: &[u8]) -> Option<i64> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}

fn lexical_u64(raw: &[u8]) -> Option<u64> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}

fn ascii_folded_cmp(a: &str, b: &str) -> Ordering {
    let fold = |c: u8| c.to_ascii_lowercase();
    a.bytes().map(fold).cmp(b.bytes().map(fold))
}

/// Formats a number the way injected values are encoded: integral values
/// without a decimal point, others in the shortest round-trippable form.
pub(crate) fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return "null".to_owned();
    }
    if n == n.trunc() && n.abs() < 9_007_199_254_740_992.0 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Encodes decoded text as a JSON string token, delimiters included.
pub(crate) fn encode_string(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() + 2);
    out.push(b'"');
    for c in s.chars() {
        match c {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\t' => out.extend_from_slice(b"\\t"),
            '\u{0008}' => out.extend_from_slice(b"\\b"),
            '\u{000C}' => out.extend_from_slice(b"\\f"),
            c if (c as u32) < 0x20 => {
                let mut buf = [0_u8; 6];
                buf.copy_from_slice(b"\\u0000");
                let hex = b"0123456789abcdef";
                buf[4] = hex[((c as u32) >> 4) as usize];
                buf[5] = hex[((c as u32) & 0xF) as usize];
                out.extend_from_slice(&buf);
            }
            c => {
                let mut buf = [0_u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(br#""hi""#, Kind::String; "string")]
    #[test_case(b"-3.5", Kind::Number; "number")]
    #[test_case(b"true", Kind::Boolean; "boolean")]
    #[test_case(b"null", Kind::Null; "null literal")]
    #[test_case(b"{}", Kind::Object; "object")]
    #[test_case(b"[1]", Kind::Array; "array")]
    #[test_case(b"", Kind::None; "empty")]
    fn classification(raw: &[u8], kind: Kind) {
        assert_eq!(kind, Value::from_span(raw).kind());
    }

    #[test]
    fn string_decoding_is_cached_and_unescaped() {
        let v = Value::from_span(br#""a\nb""#);
        assert_eq!("a\nb", v.string());
        assert_eq!("a\nb", v.string());
    }

    #[test]
    fn container_string_form_is_raw() {
        let v = Value::from_span(br#"{"a": 1}"#);
        assert_eq!(r#"{"a": 1}"#, v.string());
    }

    #[test_case(b"37", 37.0; "int literal")]
    #[test_case(b"1e3", 1000.0; "exponent")]
    #[test_case(b"true", 1.0; "true coerces")]
    #[test_case(br#""2.5""#, 2.5; "numeric string")]
    fn float_coercions(raw: &[u8], expected: f64) {
        assert_eq!(expected, Value::from_span(raw).float());
    }

    #[test]
    fn int_preserves_large_integers() {
        let v = Value::from_span(b"9007199254740993");
        assert_eq!(9_007_199_254_740_993_i64, v.int());
    }

    #[test_case(br#""true""#, true; "string true")]
    #[test_case(br#""Yes""#, true; "string yes")]
    #[test_case(br#""no""#, false; "string no")]
    #[test_case(b"0", false; "zero")]
    #[test_case(b"2", true; "nonzero")]
    fn boolean_coercions(raw: &[u8], expected: bool) {
        assert_eq!(expected, Value::from_span(raw).boolean());
    }

    #[test]
    fn time_parses_rfc3339() {
        let v = Value::from_span(br#""2021-06-01T12:00:00Z""#);
        let t = v.time().unwrap();
        assert_eq!(12, chrono::Timelike::hour(&t));
        assert!(Value::from_span(b"12").time().is_none());
    }

    #[test]
    fn array_children_borrow() {
        let v = Value::from_span(br#"[1, "two", [3]]"#);
        let kids = v.array();
        assert_eq!(3, kids.len());
        assert_eq!(1, kids[0].int());
        assert_eq!("two", kids[1].string());
        assert_eq!(Kind::Array, kids[2].kind());
    }

    #[test]
    fn map_keeps_first_duplicate() {
        let v = Value::from_span(br#"{"a":1,"a":2,"b":3}"#);
        let m = v.map();
        assert_eq!(2, m.len());
        assert_eq!(1, m.get(&"a".to_owned()).unwrap().int());
    }

    #[test]
    fn each_supports_early_termination() {
        let v = Value::from_span(b"[10,20,30]");
        let mut seen = Vec::new();
        v.each(|_, e| {
            seen.push(e.int());
            seen.len() < 2
        });
        assert_eq!(vec![10, 20], seen);
    }

    #[test]
    fn ordering_by_type_priority_then_value() {
        let null = Value::from_span(b"null");
        let f = Value::from_span(b"false");
        let n = Value::from_span(b"2");
        let s = Value::from_span(br#""a""#);
        assert!(null.less(&f, true));
        assert!(f.less(&n, true));
        assert!(n.less(&s, true));
        let upper = Value::from_span(br#""B""#);
        assert!(upper.less(&s, true));
        assert!(!s.less(&upper, false));
    }

    #[test_case(2.0, "2"; "integral")]
    #[test_case(-0.5, "-0.5"; "fraction")]
    #[test_case(1e21, "1000000000000000000000"; "huge integral stays decimal")]
    fn number_formatting(n: f64, expected: &str) {
        assert_eq!(expected, format_number(n));
    }

    #[test]
    fn string_encoding_escapes() {
        assert_eq!(br#""a\"b\n""#.to_vec(), encode_string("a\"b\n"));
    }
}
