//! The single-path walk: one cursor, one pass, no allocation until a
//! projection or filter has to synthesise an array.
//!
//! At every step the cursor points at the start of a JSON value. Each segment
//! either advances the cursor deeper into the buffer or fans out to the
//! projection paths, which delegate back here per element.
use crate::debug;
use crate::path::{FilterExpr, FilterLit, FilterOp, FilterSegment, Segment};
use crate::result::{Kind, Value};
use crate::scanner;
use crate::engine::{eval_staged, join_array};
use glob_match::glob_match;

/// Evaluates `segs` against the value starting at `at`.
pub(crate) fn eval_at<'a>(b: &'a [u8], at: usize, segs: &[Segment]) -> Value<'a> {
    let mut i = scanner::skip_ws(b, at);
    let mut idx = 0;
    while idx < segs.len() {
        debug!("segment {:?} at byte {}", segs[idx], i);
        match &segs[idx] {
            Segment::Key(name) | Segment::NumericKey(name) => {
                match member_value(b, i, name) {
                    Some(v0) => i = v0,
                    None => return Value::none(),
                }
            }
            Segment::Index(n) => match b.get(i) {
                Some(b'[') => match element_at(b, i, *n) {
                    Some(v0) => i = v0,
                    None => return Value::none(),
                },
                // A numeric-looking segment is still a valid member lookup
                // when the current value is an object.
                Some(b'{') => match member_value(b, i, &n.to_string()) {
                    Some(v0) => i = v0,
                    None => return Value::none(),
                },
                _ => return Value::none(),
            },
            Segment::LastIndex => match b.get(i) {
                Some(b'[') => match last_element(b, i) {
                    Some(v0) => i = v0,
                    None => return Value::none(),
                },
                _ => return Value::none(),
            },
            Segment::Hash => {
                if b.get(i) != Some(&b'[') {
                    return Value::none();
                }
                if idx + 1 == segs.len() {
                    return Value::of_f64(scanner::count_elements(b, i) as f64);
                }
                return project(b, i, &segs[idx + 1..]);
            }
            Segment::Filter(filter) => {
                if b.get(i) != Some(&b'[') {
                    return Value::none();
                }
                if filter.all {
                    return filter_all(b, i, filter, &segs[idx + 1..]);
                }
                match filter_first(b, i, &filter.expr) {
                    Some(v0) => i = v0,
                    None => return Value::none(),
                }
            }
            Segment::Wildcard(pattern) => {
                return wildcard_walk(b, i, pattern, &segs[idx + 1..]);
            }
        }
        idx += 1;
    }
    let end = scanner::find_value_end(b, i);
    if i >= b.len() || end > b.len() {
        return Value::none();
    }
    Value::from_span(&b[i..end])
}

/// Finds the value offset of the first member named `name` in the object at
/// `i`. Duplicates beyond the first are ignored.
pub(crate) fn member_value(b: &[u8], i: usize, name: &str) -> Option<usize> {
    if b.get(i) != Some(&b'{') {
        return None;
    }
    let mut found = None;
    scanner::each_member(b, i, &mut |k0, k1, v0, _| {
        if scanner::key_equals(b, k0, k1, name) {
            found = Some(v0);
            false
        } else {
            true
        }
    });
    found
}

/// Picks the strategy for finding element `n` of the array at `i`.
///
/// Every rung returns the identical offset; the ladder exists solely to hit
/// the fastest viable scan for the input shape.
fn element_at(b: &[u8], i: usize, n: usize) -> Option<usize> {
    if n <= 10 || b.len() <= 4096 {
        trivial_walk(b, i, n)
    } else if n <= 100 && b.len() <= 65536 {
        comma_scan(b, i, n)
    } else if n > 100 && b.len() > 51200 {
        chunked_scan(b, i, n)
    } else {
        comma_scan(b, i, n)
    }
}

/// Rung 1: skip one value per step.
fn trivial_walk(b: &[u8], i: usize, n: usize) -> Option<usize> {
    let mut found = None;
    let mut at = 0_usize;
    scanner::each_element(b, i, &mut |v0, _| {
        if at == n {
            found = Some(v0);
            return false;
        }
        at += 1;
        true
    });
    found
}

/// Rung 2: count commas at depth 0, skipping strings whole.
fn comma_scan(b: &[u8], i: usize, n: usize) -> Option<usize> {
    let first = scanner::skip_ws(b, i + 1);
    if b.get(first) == Some(&b']') {
        return None;
    }
    if n == 0 {
        return Some(first);
    }
    let mut depth = 0_usize;
    let mut seen = 0_usize;
    let mut j = first;
    while j < b.len() {
        match b[j] {
            b'"' => {
                j = scanner::skip_string(b, j);
                continue;
            }
            b'[' | b'{' => depth += 1,
            b']' | b'}' => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
            }
            b',' if depth == 0 => {
                seen += 1;
                if seen == n {
                    return Some(scanner::skip_ws(b, j + 1));
                }
            }
            _ => {}
        }
        j += 1;
    }
    None
}

/// Rung 3: the same depth/comma state machine, advanced over fixed-size
/// windows so very large buffers are processed a chunk at a time with the
/// string and escape state carried across the boundary.
fn chunked_scan(b: &[u8], i: usize, n: usize) -> Option<usize> {
    const WINDOW: usize = 4096;
    let first = scanner::skip_ws(b, i + 1);
    if b.get(first) == Some(&b']') {
        return None;
    }
    if n == 0 {
        return Some(first);
    }
    let mut depth = 0_usize;
    let mut seen = 0_usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut j = first;
    while j < b.len() {
        let window_end = usize::min(j + WINDOW, b.len());
        while j < window_end {
            let c = b[j];
            if in_string {
                if escaped {
                    escaped = false;
                } else if c == b'\\' {
                    escaped = true;
                } else if c == b'"' {
                    in_string = false;
                }
            } else {
                match c {
                    b'"' => in_string = true,
                    b'[' | b'{' => depth += 1,
                    b']' | b'}' => {
                        if depth == 0 {
                            return None;
                        }
                        depth -= 1;
                    }
                    b',' if depth == 0 => {
                        seen += 1;
                        if seen == n {
                            return Some(scanner::skip_ws(b, j + 1));
                        }
                    }
                    _ => {}
                }
            }
            j += 1;
        }
    }
    None
}

/// Rung 4: the `-1` shortcut. A single forward pass that remembers the last
/// top-level element start while locating the matching `]`.
fn last_element(b: &[u8], i: usize) -> Option<usize> {
    let mut last = None;
    scanner::each_element(b, i, &mut |v0, _| {
        last = Some(v0);
        true
    });
    last
}

/// `#` fan-out: applies `rest` to every element, compacting non-matches.
/// The offsets of the contributing elements are reported through
/// [`Value::indices`].
fn project<'a>(b: &'a [u8], i: usize, rest: &[Segment]) -> Value<'a> {
    let mut items = Vec::new();
    let mut offsets = Vec::new();
    scanner::each_element(b, i, &mut |v0, _| {
        let item = eval_at(b, v0, rest);
        if item.exists() {
            items.push(item);
            offsets.push(v0);
        }
        true
    });
    join_array(&items).with_indices(offsets)
}

fn filter_first(b: &[u8], i: usize, expr: &FilterExpr) -> Option<usize> {
    let mut found = None;
    scanner::each_element(b, i, &mut |v0, v1| {
        if filter_matches(&b[v0..v1], expr) {
            found = Some(v0);
            false
        } else {
            true
        }
    });
    found
}

fn filter_all<'a>(b: &'a [u8], i: usize, filter: &FilterSegment, rest: &[Segment]) -> Value<'a> {
    let mut items = Vec::new();
    let mut offsets = Vec::new();
    scanner::each_element(b, i, &mut |v0, v1| {
        if filter_matches(&b[v0..v1], &filter.expr) {
            let item = if rest.is_empty() {
                Value::from_span(&b[v0..v1])
            } else {
                eval_at(b, v0, rest)
            };
            if item.exists() {
                items.push(item);
                offsets.push(v0);
            }
        }
        true
    });
    join_array(&items).with_indices(offsets)
}

/// Evaluates a filter predicate against one element.
pub(crate) fn filter_matches(elem: &[u8], expr: &FilterExpr) -> bool {
    let candidate = if expr.path.is_identity() {
        Value::from_span(elem)
    } else {
        eval_staged(elem, &expr.path)
    };
    match &expr.cond {
        None => candidate.exists(),
        Some((op, lit)) => candidate.exists() && literal_compare(&candidate, *op, lit),
    }
}

/// Comparison semantics: numbers numerically, strings byte-wise, booleans as
/// `false < true`, `null` equal only to `null`. `%`/`!%` treat the literal
/// as a glob over the decoded string. A type mismatch satisfies only `!=`.
fn literal_compare(v: &Value<'_>, op: FilterOp, lit: &FilterLit) -> bool {
    match lit {
        FilterLit::Num(n) => {
            if v.kind() != Kind::Number {
                return op == FilterOp::Ne;
            }
            let x = v.float();
            match op {
                FilterOp::Eq => x == *n,
                FilterOp::Ne => x != *n,
                FilterOp::Lt => x < *n,
                FilterOp::Le => x <= *n,
                FilterOp::Gt => x > *n,
                FilterOp::Ge => x >= *n,
                FilterOp::GlobMatch | FilterOp::GlobNotMatch => false,
            }
        }
        FilterLit::Str(s) => match op {
            FilterOp::GlobMatch => glob_match(s, v.string()),
            FilterOp::GlobNotMatch => !glob_match(s, v.string()),
            _ => {
                if v.kind() != Kind::String {
                    return op == FilterOp::Ne;
                }
                let x = v.string();
                match op {
                    FilterOp::Eq => x == s,
                    FilterOp::Ne => x != s,
                    FilterOp::Lt => x < s.as_str(),
                    FilterOp::Le => x <= s.as_str(),
                    FilterOp::Gt => x > s.as_str(),
                    FilterOp::Ge => x >= s.as_str(),
                    FilterOp::GlobMatch | FilterOp::GlobNotMatch => false,
                }
            }
        },
        FilterLit::Bool(target) => {
            if v.kind() != Kind::Boolean {
                return op == FilterOp::Ne;
            }
            let x = v.boolean();
            match op {
                FilterOp::Eq => x == *target,
                FilterOp::Ne => x != *target,
                FilterOp::Lt => !x && *target,
                FilterOp::Le => x <= *target,
                FilterOp::Gt => x && !*target,
                FilterOp::Ge => x >= *target,
                FilterOp::GlobMatch | FilterOp::GlobNotMatch => false,
            }
        }
        FilterLit::Null => match op {
            FilterOp::Eq => v.kind() == Kind::Null,
            FilterOp::Ne => v.kind() != Kind::Null,
            _ => false,
        },
    }
}

/// Wildcard walk: candidates in source order, first one for which the rest
/// of the path resolves wins. Object members match by glob over the decoded
/// key; every array element is a candidate.
fn wildcard_walk<'a>(b: &'a [u8], i: usize, pattern: &str, rest: &[Segment]) -> Value<'a> {
    let mut out = Value::none();
    match b.get(i) {
        Some(b'{') => {
            scanner::each_member(b, i, &mut |k0, k1, v0, _| {
                let key = scanner::unescape(&b[k0..k1]);
                if glob_match(pattern, &key) {
                    let candidate = eval_at(b, v0, rest);
                    if candidate.exists() {
                        out = candidate;
                        return false;
                    }
                }
                true
            });
        }
        Some(b'[') => {
            scanner::each_element(b, i, &mut |v0, _| {
                let candidate = eval_at(b, v0, rest);
                if candidate.exists() {
                    out = candidate;
                    return false;
                }
                true
            });
        }
        _ => {}
    }
    out
}
