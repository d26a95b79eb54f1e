//! The `..` head: JSON Lines streams and recursive descent.
//!
//! A leading `..` addresses the implicit array of records in a
//! newline-delimited stream. On a single document it has two meanings,
//! picked by the first segment: `#` and index heads treat the document as a
//! one-record stream, key and wildcard heads switch to a depth-first,
//! source-order search of all descendants.
//!
//! The descent uses an explicit work stack of offsets rather than recursive
//! calls, so stack use is bounded by the document's nesting depth.
use crate::engine::{get, join_array, root_value};
use crate::path::{Segment, Stage};
use crate::result::Value;
use crate::scanner;
use glob_match::glob_match;
use smallvec::SmallVec;

/// Evaluates the `..` head. Returns the head result and the stages that
/// remain to be applied by the caller.
pub(crate) fn eval_head<'a, 's>(json: &'a [u8], stages: &'s [Stage]) -> (Value<'a>, &'s [Stage]) {
    let records = json_lines_records(json);
    let first_select = match stages.first() {
        Some(Stage::Select(segs)) if !segs.is_empty() => Some(segs.as_slice()),
        _ => None,
    };
    match first_select {
        Some(segs) if is_descent_target(&segs[0]) => {
            let roots: Vec<usize> = match &records {
                Some(spans) => spans.iter().map(|&(s, _)| s).collect(),
                None => match root_span(json) {
                    Some((s, _)) => vec![s],
                    None => Vec::new(),
                },
            };
            (descent(json, &roots, segs), &stages[1..])
        }
        Some(segs) => {
            // Index/#/filter heads address the implicit record array.
            let arr = materialise_records(json, records.as_deref());
            let v = match arr {
                Some(bytes) => get::eval_at(&bytes, 0, segs).into_owned(),
                None => Value::none(),
            };
            (v, &stages[1..])
        }
        None => {
            // Bare `..` (or a leading modifier): the implicit array itself.
            let v = match materialise_records(json, records.as_deref()) {
                Some(bytes) => Value::from_owned(bytes),
                None => Value::none(),
            };
            (v, stages)
        }
    }
}

fn is_descent_target(seg: &Segment) -> bool {
    matches!(
        seg,
        Segment::Key(_) | Segment::NumericKey(_) | Segment::Wildcard(_)
    )
}

/// Detects a JSON Lines stream: a first value that is not an array,
/// terminated by a newline, followed by another value. Returns the record
/// spans when the buffer is a stream.
pub(crate) fn json_lines_records(json: &[u8]) -> Option<Vec<(usize, usize)>> {
    let start = scanner::skip_ws(json, 0);
    if start >= json.len() || json[start] == b'[' {
        return None;
    }
    let first_end = scanner::find_value_end(json, start);
    if first_end >= json.len() {
        return None;
    }
    let mut at = first_end;
    let mut saw_newline = false;
    while at < json.len() && matches!(json[at], b' ' | b'\t' | b'\r' | b'\n') {
        saw_newline |= json[at] == b'\n';
        at += 1;
    }
    if !saw_newline || at >= json.len() {
        return None;
    }
    let mut spans = vec![(start, first_end)];
    while at < json.len() {
        let v0 = at;
        let v1 = scanner::find_value_end(json, v0);
        if v1 > json.len() || v1 == v0 {
            break;
        }
        spans.push((v0, v1));
        at = scanner::skip_ws(json, v1);
    }
    Some(spans)
}

/// Builds the implicit array: the stream's records, or the single document
/// as a one-record stream.
fn materialise_records(json: &[u8], records: Option<&[(usize, usize)]>) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(json.len() + 2);
    out.push(b'[');
    match records {
        Some(spans) => {
            for (i, &(s, e)) in spans.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                out.extend_from_slice(&json[s..e]);
            }
        }
        None => {
            let (s, e) = root_span(json)?;
            out.extend_from_slice(&json[s..e]);
        }
    }
    out.push(b']');
    Some(out)
}

fn root_span(json: &[u8]) -> Option<(usize, usize)> {
    let v = root_value(json);
    if !v.exists() {
        return None;
    }
    let start = scanner::skip_ws(json, 0);
    Some((start, start + v.raw().len()))
}

/// Depth-first, source-order search for `segs[0]` below every root.
///
/// At an object, members matching the target are collected first, then every
/// member value is searched; arrays search each element. The remaining
/// segments project over each match, compacting non-resolving ones.
fn descent<'a>(b: &'a [u8], roots: &[usize], segs: &[Segment]) -> Value<'a> {
    let target = &segs[0];
    let rest = &segs[1..];
    let mut matches: Vec<Value<'a>> = Vec::new();
    let mut offsets: Vec<usize> = Vec::new();
    let mut stack: SmallVec<[usize; 64]> = SmallVec::new();
    for &root in roots.iter().rev() {
        stack.push(root);
    }
    let mut child_spans: SmallVec<[usize; 16]> = SmallVec::new();
    while let Some(at) = stack.pop() {
        child_spans.clear();
        match b.get(at) {
            Some(b'{') => {
                scanner::each_member(b, at, &mut |k0, k1, v0, _| {
                    if member_matches(b, k0, k1, target) {
                        let item = if rest.is_empty() {
                            let end = scanner::find_value_end(b, v0);
                            Value::from_span(&b[v0..end])
                        } else {
                            get::eval_at(b, v0, rest)
                        };
                        if item.exists() {
                            matches.push(item);
                            offsets.push(v0);
                        }
                    }
                    child_spans.push(v0);
                    true
                });
            }
            Some(b'[') => {
                scanner::each_element(b, at, &mut |v0, _| {
                    child_spans.push(v0);
                    true
                });
            }
            _ => {}
        }
        for &child in child_spans.iter().rev() {
            if matches!(b.get(child), Some(b'{') | Some(b'[')) {
                stack.push(child);
            }
        }
    }
    join_array(&matches).with_indices(offsets)
}

fn member_matches(b: &[u8], k0: usize, k1: usize, target: &Segment) -> bool {
    match target {
        Segment::Key(name) | Segment::NumericKey(name) => scanner::key_equals(b, k0, k1, name),
        Segment::Wildcard(pattern) => glob_match(pattern, &scanner::unescape(&b[k0..k1])),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::result::Kind;
    use pretty_assertions::assert_eq;

    const LINES: &[u8] = b"{\"name\":\"Alice\"}\n{\"name\":\"Bob\"}\n{\"name\":\"Carol\"}";

    #[test]
    fn json_lines_detection() {
        assert!(super::json_lines_records(LINES).is_some());
        assert!(super::json_lines_records(br#"{"a":1}"#).is_none());
        assert!(super::json_lines_records(b"[1,2]\n[3]").is_none());
        assert!(super::json_lines_records(b"{\"a\": 1}").is_none());
    }

    #[test]
    fn lines_count_index_and_projection() {
        assert_eq!(3, crate::get(LINES, "..#").int());
        assert_eq!("Bob", crate::get(LINES, "..1.name").string());
        let v = crate::get(LINES, "..#.name");
        assert_eq!(br#"["Alice","Bob","Carol"]"#.to_vec(), v.raw().to_vec());
    }

    #[test]
    fn filters_select_over_the_record_stream() {
        let v = crate::get(LINES, r#"..#(name=="Bob").name"#);
        assert_eq!("Bob", v.string());
        let v = crate::get(LINES, r#"..#(name!="Bob")#.name"#);
        assert_eq!(br#"["Alice","Carol"]"#.to_vec(), v.raw().to_vec());
    }

    #[test]
    fn single_document_behaves_as_one_record_stream() {
        let json = br#"{"name":"Solo"}"#;
        assert_eq!(1, crate::get(json, "..#").int());
        assert_eq!("Solo", crate::get(json, "..0.name").string());
    }

    #[test]
    fn recursive_descent_collects_all_matches_in_order() {
        let json = br#"{"a":{"number":1,"b":{"number":2}},"c":[{"number":3}]}"#;
        let v = crate::get(json, "..number");
        assert_eq!(Kind::Array, v.kind());
        assert_eq!(b"[1,2,3]".to_vec(), v.raw().to_vec());
    }

    #[test]
    fn recursive_descent_projects_trailing_segments() {
        let json = br#"{"x":{"person":{"name":"Ann"}},"y":{"person":{"name":"Ben"}}}"#;
        let v = crate::get(json, "..person.name");
        assert_eq!(br#"["Ann","Ben"]"#.to_vec(), v.raw().to_vec());
    }

    #[test]
    fn descent_matches_nested_hits_under_matching_nodes() {
        let json = br#"{"a":{"a":1}}"#;
        let v = crate::get(json, "..a");
        assert_eq!(br#"[{"a":1},1]"#.to_vec(), v.raw().to_vec());
    }
}
