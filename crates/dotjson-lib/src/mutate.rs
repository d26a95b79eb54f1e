//! The mutation engine: `set`, `delete` and `increment` over raw bytes.
//!
//! A mutation runs a fixed state machine: locate the deepest existing node on
//! the path, classify the operation (replace, create, autovivify or delete),
//! encode the injected value, splice, emit. Each state is entered at most
//! once per call. The caller's buffer is never modified; every operation
//! emits a freshly allocated output, with an optimistic in-place overwrite of
//! the copy when the encoded replacement occupies exactly the byte span of
//! the value it replaces.
mod encode;

pub use encode::SetValue;

use crate::debug;
use crate::error::{Error, PathSyntaxError};
use crate::path::{self, PathKind, Segment, Stage};
use crate::result::encode_string;
use crate::scanner;

/// Options controlling `set`.
#[derive(Debug, Clone)]
pub struct SetOptions {
    /// Enables the same-length fast path (default on).
    pub optimistic: bool,
    /// When setting an object over an existing object, merge shallowly
    /// instead of replacing; nested keys are overwritten.
    pub merge_objects: bool,
    /// Autovivify missing parents (default on). When off, a missing
    /// intermediate segment is an error.
    pub create_parents: bool,
}

impl Default for SetOptions {
    #[inline]
    fn default() -> Self {
        Self {
            optimistic: true,
            merge_objects: false,
            create_parents: true,
        }
    }
}

/// A compiled mutation path: a plain chain of keys and indices.
///
/// Wildcards, filters, projections, modifiers and multipaths are query
/// constructs and are rejected here.
#[derive(Debug, Clone)]
pub struct CompiledSetPath {
    source: String,
    segs: Vec<SetSegment>,
}

#[derive(Debug, Clone)]
enum SetSegment {
    Key(String),
    Index(usize),
    /// `-1`: appends on set, addresses the last element on delete and
    /// increment.
    Append,
    /// A negative integer beyond `-1`. Never addressable in an array; kept
    /// so the walk can report it as out of range rather than a type
    /// mismatch. Against an object it is a plain member name.
    NegIndex(i64),
}

impl SetSegment {
    fn describe(&self) -> String {
        match self {
            Self::Key(k) => k.clone(),
            Self::Index(n) => n.to_string(),
            Self::Append => "-1".to_owned(),
            Self::NegIndex(n) => n.to_string(),
        }
    }
}

impl CompiledSetPath {
    /// Compiles a mutation path.
    ///
    /// # Errors
    /// Fails on syntax errors and on query-only constructs.
    pub fn compile(source: &str) -> Result<Self, Error> {
        let reject = |message: &str| {
            Error::PathSyntax(PathSyntaxError::new(0, message))
        };
        let staged = match path::parser::parse(source)? {
            PathKind::Single(staged) => staged,
            PathKind::Multi(_) => {
                return Err(reject("multipaths are not allowed in mutation paths"))
            }
        };
        if staged.descend_head {
            return Err(reject("`..` is not allowed in mutation paths"));
        }
        if staged.stages.is_empty() {
            return Err(reject("mutation path must name a target"));
        }
        if staged.stages.len() != 1 {
            return Err(reject("pipes and modifiers are not allowed in mutation paths"));
        }
        let segs = match &staged.stages[0] {
            Stage::Apply(_) => {
                return Err(reject("modifiers are not allowed in mutation paths"))
            }
            Stage::Select(segs) => segs,
        };
        if segs.is_empty() {
            return Err(reject("mutation path must name a target"));
        }
        let mut out = Vec::with_capacity(segs.len());
        for seg in segs {
            out.push(match seg {
                Segment::Key(k) => match negative_index(k) {
                    Some(n) => SetSegment::NegIndex(n),
                    None => SetSegment::Key(k.clone()),
                },
                // `:name` explicitly forces member semantics.
                Segment::NumericKey(k) => SetSegment::Key(k.clone()),
                Segment::Index(n) => SetSegment::Index(*n),
                Segment::LastIndex => SetSegment::Append,
                Segment::Hash | Segment::Wildcard(_) | Segment::Filter(_) => {
                    return Err(reject(
                        "wildcards, filters and projections are not allowed in mutation paths",
                    ))
                }
            });
        }
        Ok(Self {
            source: source.to_owned(),
            segs: out,
        })
    }

    /// The original path text this was compiled from.
    #[must_use]
    #[inline(always)]
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Recognises a negative-integer segment beyond `-1`. Plain `-1` is already
/// [`Segment::LastIndex`] by the time compilation sees it.
fn negative_index(key: &str) -> Option<i64> {
    let digits = key.strip_prefix('-')?;
    if digits.is_empty() || !digits.bytes().all(|c| c.is_ascii_digit()) {
        return None;
    }
    key.parse::<i64>().ok().filter(|&n| n < -1)
}

/// Checks the document holds exactly one value and returns its start offset,
/// or `None` for an all-whitespace buffer.
///
/// The scan primitives report malformed structure by running to the buffer
/// end, which is ambiguous with a value that legitimately ends there; the
/// closing-delimiter check disambiguates.
fn checked_root(json: &[u8]) -> Result<Option<usize>, Error> {
    let root = scanner::skip_ws(json, 0);
    if root >= json.len() {
        return Ok(None);
    }
    let end = scanner::find_value_end(json, root);
    if end > json.len() {
        return Err(Error::MalformedInput(root));
    }
    let closed = match json[root] {
        b'{' => json[end - 1] == b'}',
        b'[' => json[end - 1] == b']',
        b'"' => end - root >= 2 && json[end - 1] == b'"',
        _ => true,
    };
    if !closed {
        return Err(Error::MalformedInput(root));
    }
    let tail = scanner::skip_ws(json, end);
    if tail != json.len() {
        return Err(Error::MalformedInput(tail));
    }
    Ok(Some(root))
}

pub(crate) fn set_compiled(
    json: &[u8],
    path: &CompiledSetPath,
    value: &SetValue<'_>,
    opts: &SetOptions,
) -> Result<Vec<u8>, Error> {
    let segs = &path.segs;
    let root = match checked_root(json)? {
        Some(root) => root,
        // Whole-document autovivification from an empty buffer.
        None => return chain_for(segs, value),
    };
    let mut i = root;
    for (si, seg) in segs.iter().enumerate() {
        let rest = &segs[si + 1..];
        debug!("set walk at byte {}, segment `{}`", i, seg.describe());
        match (seg, json[i]) {
            (SetSegment::Key(name), b'{') => match member_spans(json, i, name) {
                Some(spans) => i = spans.v0,
                None => return insert_member_with_chain(json, i, name, rest, value, opts),
            },
            (SetSegment::Index(n), b'[') => {
                let len = scanner::count_elements(json, i);
                if *n < len {
                    i = element_start(json, i, *n).ok_or(Error::InternalInvariant)?;
                } else {
                    return extend_array(json, i, len, Some(*n), rest, value, opts);
                }
            }
            (SetSegment::Index(n), b'{') => {
                let name = n.to_string();
                match member_spans(json, i, &name) {
                    Some(spans) => i = spans.v0,
                    None => return insert_member_with_chain(json, i, &name, rest, value, opts),
                }
            }
            (SetSegment::Append, b'[') => {
                let len = scanner::count_elements(json, i);
                return extend_array(json, i, len, None, rest, value, opts);
            }
            // Negative indices beyond -1 can never be materialised.
            (SetSegment::NegIndex(n), b'[') => return Err(Error::OutOfRange(*n)),
            (SetSegment::NegIndex(n), b'{') => {
                let name = n.to_string();
                match member_spans(json, i, &name) {
                    Some(spans) => i = spans.v0,
                    None => return insert_member_with_chain(json, i, &name, rest, value, opts),
                }
            }
            // An existing null is replaceable by the missing chain.
            (_, b'n') => return replace_with_chain(json, i, &segs[si..], value, opts),
            (seg, found) => {
                return Err(Error::TypeMismatch {
                    segment: seg.describe(),
                    found: found_name(found),
                })
            }
        }
    }
    replace_value(json, i, value, opts)
}

pub(crate) fn delete_compiled(json: &[u8], path: &CompiledSetPath) -> Result<Vec<u8>, Error> {
    let segs = &path.segs;
    let root = match checked_root(json)? {
        Some(root) => root,
        None => return Err(Error::MalformedInput(0)),
    };
    let mut i = root;
    for (si, seg) in segs.iter().enumerate() {
        let last_seg = si + 1 == segs.len();
        debug!("delete walk at byte {}, segment `{}`", i, seg.describe());
        match (seg, json[i]) {
            (SetSegment::Key(name), b'{') => match member_spans(json, i, name) {
                Some(spans) if last_seg => return Ok(remove_member(json, i, &spans)),
                Some(spans) => i = spans.v0,
                // Deleting what is already absent leaves the document as is.
                None => return Ok(json.to_vec()),
            },
            (SetSegment::Index(n), b'{') => {
                let name = n.to_string();
                match member_spans(json, i, &name) {
                    Some(spans) if last_seg => return Ok(remove_member(json, i, &spans)),
                    Some(spans) => i = spans.v0,
                    None => return Ok(json.to_vec()),
                }
            }
            (SetSegment::Index(n), b'[') => {
                let len = scanner::count_elements(json, i);
                if *n >= len {
                    if last_seg {
                        return Err(Error::OutOfRange(*n as i64));
                    }
                    return Ok(json.to_vec());
                }
                if last_seg {
                    return Ok(remove_element(json, i, *n));
                }
                i = element_start(json, i, *n).ok_or(Error::InternalInvariant)?;
            }
            (SetSegment::Append, b'[') => {
                let len = scanner::count_elements(json, i);
                if len == 0 {
                    if last_seg {
                        return Err(Error::OutOfRange(-1));
                    }
                    return Ok(json.to_vec());
                }
                if last_seg {
                    return Ok(remove_element(json, i, len - 1));
                }
                i = element_start(json, i, len - 1).ok_or(Error::InternalInvariant)?;
            }
            (SetSegment::NegIndex(n), b'[') => return Err(Error::OutOfRange(*n)),
            (SetSegment::NegIndex(n), b'{') => {
                let name = n.to_string();
                match member_spans(json, i, &name) {
                    Some(spans) if last_seg => return Ok(remove_member(json, i, &spans)),
                    Some(spans) => i = spans.v0,
                    None => return Ok(json.to_vec()),
                }
            }
            (_, b'n') => return Ok(json.to_vec()),
            (seg, found) => {
                return Err(Error::TypeMismatch {
                    segment: seg.describe(),
                    found: found_name(found),
                })
            }
        }
    }
    Err(Error::InternalInvariant)
}

pub(crate) fn increment_compiled(
    json: &[u8],
    path: &CompiledSetPath,
    delta: f64,
) -> Result<Vec<u8>, Error> {
    let located = locate_for_read(json, &path.segs)?;
    let i = match located {
        Some(i) => i,
        // A missing target counts from zero.
        None => return set_compiled(json, path, &SetValue::Float(delta), &SetOptions::default()),
    };
    let end = scanner::find_value_end(json, i);
    let raw = &json[i..end];
    if !matches!(json[i], b'-' | b'0'..=b'9') {
        return Err(Error::TypeMismatch {
            segment: path.segs[path.segs.len() - 1].describe(),
            found: found_name(json[i]),
        });
    }
    let text = std::str::from_utf8(raw).map_err(|_| Error::MalformedInput(i))?;
    let is_integral = !raw.iter().any(|c| matches!(c, b'.' | b'e' | b'E'));
    let new_text = if is_integral && delta.fract() == 0.0 {
        match text
            .parse::<i64>()
            .ok()
            .and_then(|old| old.checked_add(delta as i64))
        {
            Some(sum) => sum.to_string(),
            None => crate::result::format_number(
                text.parse::<f64>().unwrap_or(0.0) + delta,
            ),
        }
    } else {
        crate::result::format_number(text.parse::<f64>().unwrap_or(0.0) + delta)
    };
    if new_text.len() == end - i {
        let mut out = json.to_vec();
        out[i..end].copy_from_slice(new_text.as_bytes());
        return Ok(out);
    }
    Ok(splice(json, i, end, new_text.as_bytes()))
}

/// Non-creating walk shared by `increment`: resolves the full path or
/// reports that it is missing.
fn locate_for_read(json: &[u8], segs: &[SetSegment]) -> Result<Option<usize>, Error> {
    let root = match checked_root(json)? {
        Some(root) => root,
        None => return Ok(None),
    };
    let mut i = root;
    for seg in segs {
        match (seg, json[i]) {
            (SetSegment::Key(name), b'{') => match member_spans(json, i, name) {
                Some(spans) => i = spans.v0,
                None => return Ok(None),
            },
            (SetSegment::Index(n), b'{') => match member_spans(json, i, &n.to_string()) {
                Some(spans) => i = spans.v0,
                None => return Ok(None),
            },
            (SetSegment::Index(n), b'[') => match element_start(json, i, *n) {
                Some(v0) => i = v0,
                None => return Ok(None),
            },
            (SetSegment::Append, b'[') => {
                let len = scanner::count_elements(json, i);
                match len.checked_sub(1).and_then(|n| element_start(json, i, n)) {
                    Some(v0) => i = v0,
                    None => return Ok(None),
                }
            }
            (SetSegment::NegIndex(n), b'[') => return Err(Error::OutOfRange(*n)),
            (SetSegment::NegIndex(n), b'{') => match member_spans(json, i, &n.to_string()) {
                Some(spans) => i = spans.v0,
                None => return Ok(None),
            },
            (_, b'n') => return Ok(None),
            (seg, found) => {
                return Err(Error::TypeMismatch {
                    segment: seg.describe(),
                    found: found_name(found),
                })
            }
        }
    }
    Ok(Some(i))
}

pub(crate) fn set_many(json: &[u8], ops: &[(&str, SetValue<'_>)]) -> Result<Vec<u8>, Error> {
    let mut out = json.to_vec();
    for (index, (path, value)) in ops.iter().enumerate() {
        let compiled = CompiledSetPath::compile(path).map_err(|e| e.in_batch(index))?;
        out = set_compiled(&out, &compiled, value, &SetOptions::default())
            .map_err(|e| e.in_batch(index))?;
    }
    Ok(out)
}

pub(crate) fn delete_many(json: &[u8], paths: &[&str]) -> Result<Vec<u8>, Error> {
    let mut out = json.to_vec();
    for (index, path) in paths.iter().enumerate() {
        let compiled = CompiledSetPath::compile(path).map_err(|e| e.in_batch(index))?;
        out = delete_compiled(&out, &compiled).map_err(|e| e.in_batch(index))?;
    }
    Ok(out)
}

/// Spans of one object member: key quote, key content, value.
struct MemberSpans {
    key_quote: usize,
    v0: usize,
    v1: usize,
    /// Value end of the preceding member, for left-absorbing deletes.
    prev_v1: Option<usize>,
    /// Key quote of the following member, for right-absorbing deletes.
    next_key: Option<usize>,
}

fn member_spans(json: &[u8], obj_start: usize, name: &str) -> Option<MemberSpans> {
    let mut found: Option<MemberSpans> = None;
    let mut prev_v1: Option<usize> = None;
    scanner::each_member(json, obj_start, &mut |k0, k1, v0, v1| {
        if let Some(spans) = found.as_mut() {
            spans.next_key = Some(k0 - 1);
            return false;
        }
        if scanner::key_equals(json, k0, k1, name) {
            found = Some(MemberSpans {
                key_quote: k0 - 1,
                v0,
                v1,
                prev_v1,
                next_key: None,
            });
            // keep going one member to learn the right-hand boundary
            return true;
        }
        prev_v1 = Some(v1);
        true
    });
    found
}

fn element_start(json: &[u8], arr_start: usize, n: usize) -> Option<usize> {
    let mut at = 0_usize;
    let mut found = None;
    scanner::each_element(json, arr_start, &mut |v0, _| {
        if at == n {
            found = Some(v0);
            return false;
        }
        at += 1;
        true
    });
    found
}

fn found_name(first_byte: u8) -> &'static str {
    match first_byte {
        b'"' => "a string",
        b'-' | b'0'..=b'9' => "a number",
        b't' | b'f' => "a boolean",
        b'n' => "null",
        b'{' => "an object",
        b'[' => "an array",
        _ => "malformed input",
    }
}

fn splice(b: &[u8], start: usize, end: usize, replacement: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(b.len() - (end - start) + replacement.len());
    out.extend_from_slice(&b[..start]);
    out.extend_from_slice(replacement);
    out.extend_from_slice(&b[end..]);
    out
}

/// Wraps the encoded value in the containers the remaining segments call
/// for, innermost first.
fn chain_for(segs: &[SetSegment], value: &SetValue<'_>) -> Result<Vec<u8>, Error> {
    let mut cur = value.encode()?;
    for seg in segs.iter().rev() {
        let mut next = Vec::with_capacity(cur.len() + 16);
        match seg {
            SetSegment::Key(k) => {
                next.push(b'{');
                next.extend_from_slice(&encode_string(k));
                next.push(b':');
                next.extend_from_slice(&cur);
                next.push(b'}');
            }
            SetSegment::Index(n) => {
                next.push(b'[');
                for _ in 0..*n {
                    next.extend_from_slice(b"null,");
                }
                next.extend_from_slice(&cur);
                next.push(b']');
            }
            SetSegment::Append => {
                next.push(b'[');
                next.extend_from_slice(&cur);
                next.push(b']');
            }
            SetSegment::NegIndex(n) => return Err(Error::OutOfRange(*n)),
        }
        cur = next;
    }
    Ok(cur)
}

fn missing_parent_error(rest: &[SetSegment]) -> Error {
    Error::TypeMismatch {
        segment: rest[0].describe(),
        found: "a missing parent",
    }
}

/// Replaces the value at `i` (an existing `null` on the walk) with the chain
/// for the remaining segments.
fn replace_with_chain(
    json: &[u8],
    i: usize,
    chain_segs: &[SetSegment],
    value: &SetValue<'_>,
    opts: &SetOptions,
) -> Result<Vec<u8>, Error> {
    if chain_segs.len() > 1 && !opts.create_parents {
        return Err(missing_parent_error(&chain_segs[1..]));
    }
    let end = scanner::find_value_end(json, i);
    let payload = chain_for(chain_segs, value)?;
    Ok(splice(json, i, end, &payload))
}

/// Creates a member (plus any autovivified chain) in the object at
/// `obj_start`, sampling the surrounding bytes for style: multiline objects
/// get a newline and the indentation of their last member, and the space
/// after the colon follows the object's existing members.
fn insert_member_with_chain(
    json: &[u8],
    obj_start: usize,
    name: &str,
    rest: &[SetSegment],
    value: &SetValue<'_>,
    opts: &SetOptions,
) -> Result<Vec<u8>, Error> {
    if !rest.is_empty() && !opts.create_parents {
        return Err(missing_parent_error(rest));
    }
    let payload = chain_for(rest, value)?;
    let obj_end = scanner::skip_object(json, obj_start);
    if obj_end > json.len() {
        return Err(Error::MalformedInput(obj_start));
    }
    let close = obj_end - 1;
    let mut last: Option<(usize, usize, usize, usize)> = None;
    scanner::each_member(json, obj_start, &mut |k0, k1, v0, v1| {
        last = Some((k0, k1, v0, v1));
        true
    });
    let key_bytes = encode_string(name);
    match last {
        None => {
            let mut content = key_bytes;
            content.push(b':');
            content.extend_from_slice(&payload);
            Ok(splice(json, obj_start + 1, close, &content))
        }
        Some((k0, k1, v0, v1)) => {
            let multiline = json[obj_start..close].contains(&b'\n');
            let colon = scanner::skip_ws(json, k1 + 1);
            let pad = v0 > colon + 1;
            let mut content = Vec::with_capacity(payload.len() + key_bytes.len() + 8);
            content.push(b',');
            if multiline {
                content.extend_from_slice(b"\n");
                let key_quote = k0 - 1;
                let mut line_start = key_quote;
                while line_start > 0 && json[line_start - 1] != b'\n' {
                    line_start -= 1;
                }
                let mut ws_end = line_start;
                while ws_end < key_quote && matches!(json[ws_end], b' ' | b'\t') {
                    ws_end += 1;
                }
                content.extend_from_slice(&json[line_start..ws_end]);
            }
            content.extend_from_slice(&key_bytes);
            content.push(b':');
            if pad {
                content.push(b' ');
            }
            content.extend_from_slice(&payload);
            Ok(splice(json, v1, v1, &content))
        }
    }
}

/// Appends to the array at `arr_start`, or expands it with `null` holes up
/// to a target index.
fn extend_array(
    json: &[u8],
    arr_start: usize,
    len: usize,
    target: Option<usize>,
    rest: &[SetSegment],
    value: &SetValue<'_>,
    opts: &SetOptions,
) -> Result<Vec<u8>, Error> {
    if !rest.is_empty() && !opts.create_parents {
        return Err(missing_parent_error(rest));
    }
    let payload = chain_for(rest, value)?;
    let holes = target.map_or(0, |n| n - len);
    let arr_end = scanner::skip_array(json, arr_start);
    if arr_end > json.len() {
        return Err(Error::MalformedInput(arr_start));
    }
    let close = arr_end - 1;
    let mut last_v1: Option<usize> = None;
    scanner::each_element(json, arr_start, &mut |_, v1| {
        last_v1 = Some(v1);
        true
    });
    let mut content = Vec::with_capacity(payload.len() + holes * 5 + 1);
    match last_v1 {
        None => {
            for _ in 0..holes {
                content.extend_from_slice(b"null,");
            }
            content.extend_from_slice(&payload);
            Ok(splice(json, arr_start + 1, close, &content))
        }
        Some(v1) => {
            for _ in 0..holes {
                content.extend_from_slice(b",null");
            }
            content.push(b',');
            content.extend_from_slice(&payload);
            Ok(splice(json, v1, v1, &content))
        }
    }
}

fn replace_value(
    json: &[u8],
    i: usize,
    value: &SetValue<'_>,
    opts: &SetOptions,
) -> Result<Vec<u8>, Error> {
    let end = scanner::find_value_end(json, i);
    let encoded = value.encode()?;
    if opts.merge_objects && json[i] == b'{' && encoded.first() == Some(&b'{') {
        return Ok(merge_shallow(json, i, &encoded));
    }
    if opts.optimistic && encoded.len() == end - i {
        debug!("same-length splice of {} bytes at {}", encoded.len(), i);
        let mut out = json.to_vec();
        out[i..end].copy_from_slice(&encoded);
        return Ok(out);
    }
    Ok(splice(json, i, end, &encoded))
}

/// Shallow object merge: every member of the incoming object is written over
/// the existing one, nested values replaced whole.
fn merge_shallow(json: &[u8], obj_start: usize, incoming: &[u8]) -> Vec<u8> {
    let mut members: Vec<(String, Vec<u8>)> = Vec::new();
    scanner::each_member(incoming, 0, &mut |k0, k1, v0, v1| {
        members.push((
            scanner::unescape(&incoming[k0..k1]),
            incoming[v0..v1].to_vec(),
        ));
        true
    });
    let mut out = json.to_vec();
    for (key, value_raw) in members {
        match member_spans(&out, obj_start, &key) {
            Some(spans) => {
                out = splice(&out, spans.v0, spans.v1, &value_raw);
            }
            None => {
                let inserted = insert_member_with_chain(
                    &out,
                    obj_start,
                    &key,
                    &[],
                    &SetValue::raw(&value_raw),
                    &SetOptions::default(),
                );
                if let Ok(next) = inserted {
                    out = next;
                }
            }
        }
    }
    out
}

/// Removes a member, absorbing the right-hand comma (up to the next member)
/// when one exists, else the left-hand comma.
fn remove_member(json: &[u8], obj_start: usize, spans: &MemberSpans) -> Vec<u8> {
    match (spans.next_key, spans.prev_v1) {
        (Some(next_key), _) => splice(json, spans.key_quote, next_key, b""),
        (None, Some(prev_v1)) => splice(json, prev_v1, spans.v1, b""),
        (None, None) => splice(json, obj_start + 1, spans.v1, b""),
    }
}

fn remove_element(json: &[u8], arr_start: usize, n: usize) -> Vec<u8> {
    let mut at = 0_usize;
    let mut prev_v1: Option<usize> = None;
    let mut target: Option<(usize, usize)> = None;
    let mut next_v0: Option<usize> = None;
    scanner::each_element(json, arr_start, &mut |v0, v1| {
        if target.is_some() {
            next_v0 = Some(v0);
            return false;
        }
        if at == n {
            target = Some((v0, v1));
            return true;
        }
        at += 1;
        prev_v1 = Some(v1);
        true
    });
    match (target, next_v0, prev_v1) {
        (Some((v0, _)), Some(next), _) => splice(json, v0, next, b""),
        (Some((_, v1)), None, Some(prev)) => splice(json, prev, v1, b""),
        (Some((_, v1)), None, None) => splice(json, arr_start + 1, v1, b""),
        (None, _, _) => json.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn set_s(json: &[u8], path: &str, value: SetValue<'_>) -> Vec<u8> {
        crate::set(json, path, value).unwrap()
    }

    #[test]
    fn replace_same_length_keeps_buffer_size() {
        let json = br#"{"a":{"b":{"c":1}}}"#;
        let out = set_s(json, "a.b.c", SetValue::Int(2));
        assert_eq!(json.len(), out.len());
        assert_eq!(2, crate::get(&out, "a.b.c").int());
    }

    #[test]
    fn replace_with_longer_value_reallocates() {
        let json = br#"{"a":1}"#;
        let out = set_s(json, "a", SetValue::from("hello"));
        assert_eq!(br#"{"a":"hello"}"#.to_vec(), out);
    }

    #[test]
    fn create_member_in_compact_object() {
        let json = br#"{"a":1}"#;
        assert_eq!(br#"{"a":1,"b":2}"#.to_vec(), set_s(json, "b", SetValue::Int(2)));
        assert_eq!(br#"{"b":2}"#.to_vec(), set_s(br#"{}"#, "b", SetValue::Int(2)));
    }

    #[test]
    fn create_member_respects_pretty_style() {
        let json = b"{\n  \"a\": 1\n}";
        let out = set_s(json, "b", SetValue::Int(2));
        assert_eq!(b"{\n  \"a\": 1,\n  \"b\": 2\n}".to_vec(), out);
    }

    #[test]
    fn autovivifies_missing_parents() {
        let json = br#"{"a":1}"#;
        let out = set_s(json, "b.c.d", SetValue::Int(9));
        assert_eq!(br#"{"a":1,"b":{"c":{"d":9}}}"#.to_vec(), out);
    }

    #[test]
    fn create_parents_off_rejects_missing_intermediates() {
        let json = br#"{"a":1}"#;
        let opts = SetOptions {
            create_parents: false,
            ..SetOptions::default()
        };
        let err = crate::set_with_options(json, "b.c", SetValue::Int(1), &opts).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        // creating a leaf member is still allowed
        assert!(crate::set_with_options(json, "b", SetValue::Int(1), &opts).is_ok());
    }

    #[test]
    fn array_expansion_fills_null_holes() {
        let json = br#"{"items":[1,2,3]}"#;
        let out = set_s(json, "items.10", SetValue::Int(99));
        assert_eq!(
            br#"{"items":[1,2,3,null,null,null,null,null,null,null,99]}"#.to_vec(),
            out
        );
    }

    #[test]
    fn negative_set_indices_beyond_minus_one_are_out_of_range() {
        let err = crate::set(br#"[1,2]"#, "-2", SetValue::Int(5)).unwrap_err();
        assert!(matches!(err, Error::OutOfRange(-2)));
        let err = crate::set(br#"{"items":[1]}"#, "items.-3", SetValue::Int(5)).unwrap_err();
        assert!(matches!(err, Error::OutOfRange(-3)));
        // the chain builder rejects them too: nothing to autovivify
        let err = crate::set(b"", "-2", SetValue::Int(5)).unwrap_err();
        assert!(matches!(err, Error::OutOfRange(-2)));
        let err = crate::set(br#"{"a":null}"#, "a.-2", SetValue::Int(5)).unwrap_err();
        assert!(matches!(err, Error::OutOfRange(-2)));
        // against an object the segment is a plain member name
        let out = crate::set(br#"{"-2":1}"#, "-2", SetValue::Int(9)).unwrap();
        assert_eq!(br#"{"-2":9}"#.to_vec(), out);
    }

    #[test]
    fn minus_one_appends_on_set() {
        let json = br#"{"items":[1,2]}"#;
        let out = set_s(json, "items.-1", SetValue::Int(3));
        assert_eq!(br#"{"items":[1,2,3]}"#.to_vec(), out);
        let out = set_s(br#"{"items":[]}"#, "items.-1", SetValue::Int(1));
        assert_eq!(br#"{"items":[1]}"#.to_vec(), out);
    }

    #[test]
    fn set_into_empty_document_builds_the_chain() {
        assert_eq!(br#"{"a":{"b":1}}"#.to_vec(), set_s(b"  ", "a.b", SetValue::Int(1)));
        assert_eq!(br#"[null,null,5]"#.to_vec(), set_s(b"", "2", SetValue::Int(5)));
    }

    #[test]
    fn null_values_are_replaceable_parents() {
        let json = br#"{"a":null}"#;
        let out = set_s(json, "a.b", SetValue::Int(1));
        assert_eq!(br#"{"a":{"b":1}}"#.to_vec(), out);
    }

    #[test]
    fn scalar_parents_are_type_mismatches() {
        let json = br#"{"a":1}"#;
        let err = crate::set(json, "a.b", SetValue::Int(2)).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn numeric_segment_on_object_is_a_member() {
        let json = br#"{"users":{"2313":{"name":"Al"}}}"#;
        let out = set_s(json, "users.2313.name", SetValue::from("Bo"));
        assert_eq!("Bo", crate::get(&out, "users.:2313.name").string());
    }

    #[test]
    fn merge_objects_is_shallow() {
        let json = br#"{"o":{"a":1,"b":{"x":1}}}"#;
        let opts = SetOptions {
            merge_objects: true,
            ..SetOptions::default()
        };
        let incoming = SetValue::raw(br#"{"b":{"y":2},"c":3}"#);
        let out = crate::set_with_options(json, "o", incoming, &opts).unwrap();
        assert_eq!(1, crate::get(&out, "o.a").int());
        assert_eq!(br#"{"y":2}"#.to_vec(), crate::get(&out, "o.b").raw().to_vec());
        assert_eq!(3, crate::get(&out, "o.c").int());
    }

    #[test_case(br#"{"a":1,"b":2,"c":3}"#, "b", br#"{"a":1,"c":3}"#; "middle member")]
    #[test_case(br#"{"a":1,"b":2}"#, "b", br#"{"a":1}"#; "last member")]
    #[test_case(br#"{"a":1}"#, "a", br#"{}"#; "sole member")]
    fn delete_members(json: &[u8], path: &str, expected: &[u8]) {
        assert_eq!(expected.to_vec(), crate::delete(json, path).unwrap());
    }

    #[test_case(br#"[1,2,3]"#, "1", br#"[1,3]"#; "middle element")]
    #[test_case(br#"[1,2,3]"#, "-1", br#"[1,2]"#; "last element")]
    #[test_case(br#"[1]"#, "0", br#"[]"#; "sole element")]
    fn delete_elements(json: &[u8], path: &str, expected: &[u8]) {
        assert_eq!(expected.to_vec(), crate::delete(json, path).unwrap());
    }

    #[test]
    fn delete_in_pretty_document_keeps_layout() {
        let json = b"{\n  \"a\": 1,\n  \"b\": 2\n}";
        let out = crate::delete(json, "a").unwrap();
        assert_eq!(b"{\n  \"b\": 2\n}".to_vec(), out);
    }

    #[test]
    fn delete_missing_key_is_a_no_op() {
        let json = br#"{"a":1}"#;
        assert_eq!(json.to_vec(), crate::delete(json, "zzz").unwrap());
        assert_eq!(json.to_vec(), crate::delete(json, "x.y.z").unwrap());
    }

    #[test]
    fn delete_past_array_end_is_out_of_range() {
        let err = crate::delete(br#"[1,2]"#, "5").unwrap_err();
        assert!(matches!(err, Error::OutOfRange(5)));
        let err = crate::delete(br#"[]"#, "-1").unwrap_err();
        assert!(matches!(err, Error::OutOfRange(-1)));
        // negative indices beyond -1 follow the set side
        let err = crate::delete(br#"[1,2]"#, "-2").unwrap_err();
        assert!(matches!(err, Error::OutOfRange(-2)));
        assert_eq!(
            br#"{"a":1}"#.to_vec(),
            crate::delete(br#"{"a":1}"#, "-2").unwrap()
        );
    }

    #[test]
    fn increment_uses_the_same_length_fast_path() {
        let json = br#"{"hits":41}"#;
        let out = crate::increment(json, "hits", 1.0).unwrap();
        assert_eq!(json.len(), out.len());
        assert_eq!(42, crate::get(&out, "hits").int());
    }

    #[test]
    fn increment_round_trips() {
        let json = br#"{"n":10}"#;
        let up = crate::increment(json, "n", 7.0).unwrap();
        let back = crate::increment(&up, "n", -7.0).unwrap();
        assert_eq!(json.to_vec(), back);
    }

    #[test]
    fn increment_creates_missing_targets() {
        let out = crate::increment(br#"{}"#, "n", 2.5).unwrap();
        assert_eq!(2.5, crate::get(&out, "n").float());
    }

    #[test]
    fn increment_rejects_non_numbers() {
        let err = crate::increment(br#"{"s":"x"}"#, "s", 1.0).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        let err = crate::increment(br#"[1,2]"#, "-2", 1.0).unwrap_err();
        assert!(matches!(err, Error::OutOfRange(-2)));
    }

    #[test]
    fn batches_apply_in_order_and_report_the_failing_index() {
        let json = br#"{"a":1}"#;
        let out = crate::set_many(
            json,
            &[("b", SetValue::Int(1)), ("b", SetValue::Int(2))],
        )
        .unwrap();
        assert_eq!(2, crate::get(&out, "b").int());

        let err = crate::set_many(
            json,
            &[("ok", SetValue::Int(1)), ("a.b", SetValue::Int(2))],
        )
        .unwrap_err();
        match err {
            Error::Batch { index, .. } => assert_eq!(1, index),
            other => panic!("expected batch error, got {other}"),
        }
    }

    #[test]
    fn compile_rejects_query_constructs() {
        assert!(CompiledSetPath::compile("a.#").is_err());
        assert!(CompiledSetPath::compile("a.*").is_err());
        assert!(CompiledSetPath::compile("a.#(x==1)").is_err());
        assert!(CompiledSetPath::compile("a|@reverse").is_err());
        assert!(CompiledSetPath::compile("a,b").is_err());
        assert!(CompiledSetPath::compile("..a").is_err());
        assert!(CompiledSetPath::compile("").is_err());
        assert!(CompiledSetPath::compile("a.b").is_ok());
    }

    #[test]
    fn mutation_leaves_input_untouched_on_error() {
        let json = br#"{"a":1}"#.to_vec();
        let before = json.clone();
        let _ = crate::set(&json, "a.b", SetValue::Int(2));
        assert_eq!(before, json);
    }

    #[test]
    fn malformed_input_is_reported_with_offset() {
        let err = crate::set(br#"{"a":"#, "a", SetValue::Int(1)).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
        let err = crate::set(br#"{"a":1} x"#, "a", SetValue::Int(1)).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(8)));
    }
}
