//! Write-only encoding of values injected by the mutation engine.
//!
//! [`SetValue`] is an encoder tree, not an object model: it exists solely to
//! turn native scalars and containers into JSON bytes for a splice. Integral
//! numbers emit without a decimal point; floats use the shortest
//! round-trippable form; raw slices are validated and passed through.
use crate::error::Error;
use crate::format;
use crate::result::{encode_string, format_number};
use std::borrow::Cow;

/// A value to write at a path.
#[derive(Debug, Clone)]
pub enum SetValue<'v> {
    /// The literal `null`.
    Null,
    /// A boolean literal.
    Bool(bool),
    /// A signed integer, emitted without a decimal point.
    Int(i64),
    /// An unsigned integer, emitted without a decimal point.
    Uint(u64),
    /// A floating point number. Non-finite values cannot be encoded.
    Float(f64),
    /// A string, escaped on encode.
    Str(Cow<'v, str>),
    /// A pre-encoded raw JSON value, validated before the splice.
    Raw(Cow<'v, [u8]>),
    /// An array of values.
    Array(Vec<SetValue<'v>>),
    /// An object; keys are escaped on encode, duplicate keys are kept as
    /// given.
    Object(Vec<(Cow<'v, str>, SetValue<'v>)>),
}

impl<'v> SetValue<'v> {
    /// Wraps pre-encoded JSON bytes for injection without re-encoding.
    #[inline]
    pub fn raw(bytes: &'v [u8]) -> Self {
        Self::Raw(Cow::Borrowed(bytes))
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.encode_into(&mut out)?;
        Ok(out)
    }

    fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        match self {
            Self::Null => out.extend_from_slice(b"null"),
            Self::Bool(true) => out.extend_from_slice(b"true"),
            Self::Bool(false) => out.extend_from_slice(b"false"),
            Self::Int(n) => out.extend_from_slice(n.to_string().as_bytes()),
            Self::Uint(n) => out.extend_from_slice(n.to_string().as_bytes()),
            Self::Float(n) => {
                if !n.is_finite() {
                    return Err(Error::EncodingFailure("non-finite number"));
                }
                out.extend_from_slice(format_number(*n).as_bytes());
            }
            Self::Str(s) => out.extend_from_slice(&encode_string(s)),
            Self::Raw(raw) => {
                let start = crate::scanner::skip_ws(raw, 0);
                let end = crate::scanner::find_value_end(raw, start);
                if start >= raw.len() || format::validate(raw).is_err() {
                    return Err(Error::EncodingFailure("raw value is not valid JSON"));
                }
                out.extend_from_slice(&raw[start..end]);
            }
            Self::Array(items) => {
                out.push(b'[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(b',');
                    }
                    item.encode_into(out)?;
                }
                out.push(b']');
            }
            Self::Object(members) => {
                out.push(b'{');
                for (i, (key, value)) in members.iter().enumerate() {
                    if i > 0 {
                        out.push(b',');
                    }
                    out.extend_from_slice(&encode_string(key));
                    out.push(b':');
                    value.encode_into(out)?;
                }
                out.push(b'}');
            }
        }
        Ok(())
    }
}

impl From<()> for SetValue<'_> {
    #[inline]
    fn from((): ()) -> Self {
        Self::Null
    }
}

impl From<bool> for SetValue<'_> {
    #[inline]
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for SetValue<'_> {
    #[inline]
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for SetValue<'_> {
    #[inline]
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u64> for SetValue<'_> {
    #[inline]
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<f64> for SetValue<'_> {
    #[inline]
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl<'v> From<&'v str> for SetValue<'v> {
    #[inline]
    fn from(v: &'v str) -> Self {
        Self::Str(Cow::Borrowed(v))
    }
}

impl From<String> for SetValue<'_> {
    #[inline]
    fn from(v: String) -> Self {
        Self::Str(Cow::Owned(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(SetValue::Null, b"null"; "null")]
    #[test_case(SetValue::Bool(true), b"true"; "bool")]
    #[test_case(SetValue::Int(-7), b"-7"; "int")]
    #[test_case(SetValue::Float(2.0), b"2"; "integral float")]
    #[test_case(SetValue::Float(0.5), b"0.5"; "fractional float")]
    #[test_case(SetValue::from("a\"b"), br#""a\"b""#; "escaped string")]
    fn scalars(v: SetValue<'_>, expected: &[u8]) {
        assert_eq!(expected.to_vec(), v.encode().unwrap());
    }

    #[test]
    fn containers_recurse() {
        let v = SetValue::Object(vec![
            ("a".into(), SetValue::Array(vec![SetValue::Int(1), SetValue::Null])),
            ("b".into(), SetValue::from("x")),
        ]);
        assert_eq!(br#"{"a":[1,null],"b":"x"}"#.to_vec(), v.encode().unwrap());
    }

    #[test]
    fn raw_passthrough_is_validated() {
        assert_eq!(
            br#"{"k":1}"#.to_vec(),
            SetValue::raw(br#" {"k":1} "#).encode().unwrap()
        );
        assert!(SetValue::raw(b"{oops").encode().is_err());
    }

    #[test]
    fn non_finite_floats_fail() {
        assert!(SetValue::Float(f64::NAN).encode().is_err());
        assert!(SetValue::Float(f64::INFINITY).encode().is_err());
    }
}
