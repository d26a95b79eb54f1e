//! Execution of compiled paths over document bytes.
//!
//! Evaluation is staged: `Select` stages walk raw bytes with the single-path
//! engine in [`get`], handing off to [`descend`] for wildcards, projections,
//! filters and recursive descent; `Apply` stages run a modifier over the
//! materialised intermediate result. Results borrow from the source buffer
//! until the first stage that synthesises new bytes, after which they own
//! their backing scratch buffer.
pub(crate) mod descend;
pub(crate) mod get;

use crate::debug;
use crate::modifier;
use crate::path::{CompiledPath, PathKind, Segment, Stage, StagedPath};
use crate::result::Value;
use crate::scanner;
use std::borrow::Cow;

/// Runs a compiled path against a document.
pub(crate) fn eval<'a>(json: &'a [u8], path: &CompiledPath) -> Value<'a> {
    match &path.kind {
        PathKind::Single(staged) => eval_staged(json, staged),
        PathKind::Multi(branches) => {
            let mut items = Vec::with_capacity(branches.len());
            for staged in branches {
                let v = eval_staged(json, staged);
                if v.exists() {
                    items.push(v);
                }
            }
            join_array(&items)
        }
    }
}

pub(crate) fn eval_staged<'a>(json: &'a [u8], staged: &StagedPath) -> Value<'a> {
    let mut stages = staged.stages.as_slice();
    let mut current = if staged.descend_head {
        let (head, rest) = descend::eval_head(json, stages);
        stages = rest;
        head
    } else {
        root_value(json)
    };
    for stage in stages {
        debug!("stage {:?} on {:?}", stage, current.kind());
        match stage {
            Stage::Select(segs) => current = select_on(current, segs),
            Stage::Apply(call) => current = modifier::apply(call, current),
        }
    }
    current
}

/// The whole-document view: the outermost value, trimmed.
pub(crate) fn root_value(json: &[u8]) -> Value<'_> {
    let start = scanner::skip_ws(json, 0);
    if start >= json.len() {
        return Value::none();
    }
    let end = scanner::find_value_end(json, start);
    if end > json.len() {
        return Value::none();
    }
    Value::from_span(&json[start..end])
}

/// Applies select segments to the current value, preserving borrowing when
/// the value still points into the caller's buffer.
fn select_on<'a>(current: Value<'a>, segs: &[Segment]) -> Value<'a> {
    if segs.is_empty() {
        return current;
    }
    if !current.exists() {
        return Value::none();
    }
    match current.into_raw() {
        Cow::Borrowed(bytes) => get::eval_at(bytes, 0, segs),
        Cow::Owned(bytes) => get::eval_at(&bytes, 0, segs).into_owned(),
    }
}

/// Concatenates result raws into an owned array value.
pub(crate) fn join_array(items: &[Value<'_>]) -> Value<'static> {
    let mut out = Vec::with_capacity(2 + items.iter().map(|v| v.raw().len() + 1).sum::<usize>());
    out.push(b'[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        out.extend_from_slice(item.raw());
    }
    out.push(b']');
    Value::from_owned(out)
}
