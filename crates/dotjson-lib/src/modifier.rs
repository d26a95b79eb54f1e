//! The modifier pipeline: named transforms applied to an intermediate
//! result, composed with `|` in the path.
//!
//! Every modifier maps a result (and an optional argument string) to a new
//! result. A modifier applied outside its domain yields `None` instead of
//! aborting the whole evaluation.
use crate::engine::{get, join_array};
use crate::format::{self, PrettyOptions};
use crate::path::parser::parse_literal;
use crate::path::{FilterLit, ModifierCall};
use crate::result::{Kind, Value};
use crate::scanner;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::cmp::Ordering;
use vector_map::VecMap;

pub(crate) fn apply<'a>(call: &ModifierCall, v: Value<'a>) -> Value<'a> {
    if !v.exists() {
        return Value::none();
    }
    match call.name.as_str() {
        // Composition hook: the current result, unchanged.
        "this" => v,
        "valid" => {
            if format::validate(v.raw()).is_ok() {
                v
            } else {
                Value::none()
            }
        }
        name => apply_transform(name, call.arg.as_deref(), &v),
    }
}

fn apply_transform(name: &str, arg: Option<&str>, v: &Value<'_>) -> Value<'static> {
    match name {
        "reverse" => reverse(v),
        "sort" => sort(v, arg),
        "distinct" => distinct(v),
        "first" => nth_end(v, false),
        "last" => nth_end(v, true),
        "length" => length(v),
        "keys" => keys(v),
        "values" => values(v),
        "sum" | "avg" | "min" | "max" => aggregate(name, v),
        "flatten" => flatten(v),
        "slice" => slice(v, arg),
        "base64" => base64_decode(v),
        "has" => has(v, arg),
        "contains" => contains(v, arg),
        "any" => any_all(v, false),
        "all" => any_all(v, true),
        "entries" => entries(v),
        "fromentries" => fromentries(v),
        "type" => Value::of_str(v.kind().name()),
        "tostr" => Value::of_str(&String::from_utf8_lossy(v.raw())),
        "fromstr" => fromstr(v),
        "pretty" => reformat(v, true),
        "ugly" => reformat(v, false),
        _ => Value::none(),
    }
}

/// `@fromstr`: parses the contents of a string value as JSON, the inverse of
/// `@tostr`.
fn fromstr(v: &Value<'_>) -> Value<'static> {
    if v.kind() != Kind::String {
        return Value::none();
    }
    let decoded = v.string().trim();
    if format::validate(decoded.as_bytes()).is_err() {
        return Value::none();
    }
    Value::from_owned(decoded.as_bytes().to_vec())
}

fn reverse(v: &Value<'_>) -> Value<'static> {
    if v.kind() != Kind::Array {
        return Value::none();
    }
    let mut items = v.array();
    items.reverse();
    join_array(&items)
}

fn sort(v: &Value<'_>, arg: Option<&str>) -> Value<'static> {
    if v.kind() != Kind::Array {
        return Value::none();
    }
    let mut items = v.array();
    items.sort_by(|a, b| a.compare(b, true));
    if arg == Some("desc") {
        items.reverse();
    }
    join_array(&items)
}

fn distinct(v: &Value<'_>) -> Value<'static> {
    if v.kind() != Kind::Array {
        return Value::none();
    }
    let mut seen: VecMap<String, ()> = VecMap::new();
    let mut items = Vec::new();
    for item in v.array() {
        let normal = String::from_utf8_lossy(&format::squash(item.raw())).into_owned();
        if !seen.contains_key(&normal) {
            seen.insert(normal, ());
            items.push(item);
        }
    }
    join_array(&items)
}

fn nth_end(v: &Value<'_>, last: bool) -> Value<'static> {
    if v.kind() != Kind::Array {
        return Value::none();
    }
    let items = v.array();
    let picked = if last { items.last() } else { items.first() };
    match picked {
        Some(item) => item.clone().into_owned(),
        None => Value::none(),
    }
}

fn length(v: &Value<'_>) -> Value<'static> {
    match v.kind() {
        Kind::Array => Value::of_f64(scanner::count_elements(v.raw(), 0) as f64),
        Kind::Object => {
            let mut n = 0_usize;
            scanner::each_member(v.raw(), 0, &mut |_, _, _, _| {
                n += 1;
                true
            });
            Value::of_f64(n as f64)
        }
        Kind::String => Value::of_f64(v.string().len() as f64),
        _ => Value::none(),
    }
}

fn keys(v: &Value<'_>) -> Value<'static> {
    if v.kind() != Kind::Object {
        return Value::none();
    }
    let mut items = Vec::new();
    scanner::each_member(v.raw(), 0, &mut |k0, k1, _, _| {
        items.push(Value::of_str(&scanner::unescape(&v.raw()[k0..k1])));
        true
    });
    join_array(&items)
}

fn values(v: &Value<'_>) -> Value<'static> {
    if v.kind() != Kind::Object {
        return Value::none();
    }
    let raw = v.raw();
    let mut items = Vec::new();
    scanner::each_member(raw, 0, &mut |_, _, v0, v1| {
        items.push(Value::from_span(&raw[v0..v1]));
        true
    });
    join_array(&items)
}

/// `@sum`/`@avg`/`@min`/`@max` over an array of numbers; numeric strings are
/// admitted, anything else violates the domain.
fn aggregate(name: &str, v: &Value<'_>) -> Value<'static> {
    if v.kind() != Kind::Array {
        return Value::none();
    }
    let mut nums = Vec::new();
    for item in v.array() {
        let n = match item.kind() {
            Kind::Number => item.float(),
            Kind::String => match item.string().trim().parse::<f64>() {
                Ok(n) => n,
                Err(_) => return Value::none(),
            },
            _ => return Value::none(),
        };
        nums.push(n);
    }
    match name {
        "sum" => Value::of_f64(nums.iter().sum()),
        "avg" if nums.is_empty() => Value::none(),
        "avg" => Value::of_f64(nums.iter().sum::<f64>() / nums.len() as f64),
        "min" => fold_extreme(&nums, Ordering::Less),
        "max" => fold_extreme(&nums, Ordering::Greater),
        _ => Value::none(),
    }
}

fn fold_extreme(nums: &[f64], keep: Ordering) -> Value<'static> {
    let mut best: Option<f64> = None;
    for &n in nums {
        best = Some(match best {
            None => n,
            Some(b) if n.partial_cmp(&b) == Some(keep) => n,
            Some(b) => b,
        });
    }
    match best {
        Some(n) => Value::of_f64(n),
        None => Value::none(),
    }
}

fn flatten(v: &Value<'_>) -> Value<'static> {
    if v.kind() != Kind::Array {
        return Value::none();
    }
    let children = v.array();
    let mut items = Vec::new();
    for child in &children {
        if child.kind() == Kind::Array {
            for grandchild in child.array() {
                items.push(grandchild.into_owned());
            }
        } else {
            items.push(child.clone().into_owned());
        }
    }
    join_array(&items)
}

/// `@slice:a:b` with `[a, b)` semantics, negative indices counting from the
/// end and bounds clipped to the array.
fn slice(v: &Value<'_>, arg: Option<&str>) -> Value<'static> {
    if v.kind() != Kind::Array {
        return Value::none();
    }
    let arg = arg.unwrap_or("");
    let (lo_s, hi_s) = match arg.split_once(':') {
        Some((a, b)) => (a, b),
        None => (arg, ""),
    };
    let items = v.array();
    let len = items.len() as i64;
    let resolve = |s: &str, default: i64| -> i64 {
        match s.trim().parse::<i64>() {
            Ok(n) if n < 0 => (len + n).max(0),
            Ok(n) => n.min(len),
            Err(_) => default,
        }
    };
    let lo = resolve(lo_s, 0);
    let hi = resolve(hi_s, len);
    if lo >= hi {
        return join_array(&[]);
    }
    join_array(&items[lo as usize..hi as usize])
}

fn base64_decode(v: &Value<'_>) -> Value<'static> {
    if v.kind() != Kind::String {
        return Value::none();
    }
    match STANDARD.decode(v.string().trim().as_bytes()) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Value::of_str(&text),
            Err(_) => Value::none(),
        },
        Err(_) => Value::none(),
    }
}

fn has(v: &Value<'_>, arg: Option<&str>) -> Value<'static> {
    match arg {
        Some(key) if v.kind() == Kind::Object => {
            Value::of_bool(get::member_value(v.raw(), 0, key).is_some())
        }
        _ => Value::none(),
    }
}

/// Array containment is deep-equal on scalars; string containment is a
/// substring test over the decoded text.
fn contains(v: &Value<'_>, arg: Option<&str>) -> Value<'static> {
    let arg = match arg {
        Some(a) => a,
        None => return Value::none(),
    };
    let lit = parse_literal(arg);
    match v.kind() {
        Kind::String => {
            let needle = match &lit {
                FilterLit::Str(s) => s.clone(),
                _ => arg.to_owned(),
            };
            Value::of_bool(v.string().contains(&needle))
        }
        Kind::Array => {
            let hit = v.array().iter().any(|item| scalar_equals(item, &lit));
            Value::of_bool(hit)
        }
        _ => Value::none(),
    }
}

fn scalar_equals(item: &Value<'_>, lit: &FilterLit) -> bool {
    match lit {
        FilterLit::Num(n) => item.kind() == Kind::Number && item.float() == *n,
        FilterLit::Str(s) => item.kind() == Kind::String && item.string() == s,
        FilterLit::Bool(b) => item.kind() == Kind::Boolean && item.boolean() == *b,
        FilterLit::Null => item.kind() == Kind::Null,
    }
}

fn any_all(v: &Value<'_>, require_all: bool) -> Value<'static> {
    if v.kind() != Kind::Array {
        return Value::none();
    }
    let mut result = require_all;
    for item in v.array() {
        if item.kind() != Kind::Boolean {
            return Value::none();
        }
        if require_all {
            result &= item.boolean();
        } else {
            result |= item.boolean();
        }
    }
    Value::of_bool(result)
}

fn entries(v: &Value<'_>) -> Value<'static> {
    if v.kind() != Kind::Object {
        return Value::none();
    }
    let raw = v.raw();
    let mut items = Vec::new();
    scanner::each_member(raw, 0, &mut |k0, k1, v0, v1| {
        let mut entry = Vec::with_capacity(v1 - v0 + k1 - k0 + 20);
        entry.extend_from_slice(b"{\"key\":");
        entry.extend_from_slice(&crate::result::encode_string(&scanner::unescape(&raw[k0..k1])));
        entry.extend_from_slice(b",\"value\":");
        entry.extend_from_slice(&raw[v0..v1]);
        entry.push(b'}');
        items.push(Value::from_owned(entry));
        true
    });
    join_array(&items)
}

fn fromentries(v: &Value<'_>) -> Value<'static> {
    if v.kind() != Kind::Array {
        return Value::none();
    }
    let mut seen: VecMap<String, ()> = VecMap::new();
    let mut out = Vec::with_capacity(v.raw().len());
    out.push(b'{');
    for entry in v.array() {
        if entry.kind() != Kind::Object {
            return Value::none();
        }
        let raw = entry.raw();
        let key_at = match get::member_value(raw, 0, "key") {
            Some(at) => at,
            None => return Value::none(),
        };
        let key_end = scanner::find_value_end(raw, key_at);
        let key = Value::from_span(&raw[key_at..key_end]).string().to_owned();
        if seen.contains_key(&key) {
            continue;
        }
        let value_span = match get::member_value(raw, 0, "value") {
            Some(at) => &raw[at..scanner::find_value_end(raw, at)],
            None => b"null".as_slice(),
        };
        if out.len() > 1 {
            out.push(b',');
        }
        out.extend_from_slice(&crate::result::encode_string(&key));
        out.push(b':');
        out.extend_from_slice(value_span);
        seen.insert(key, ());
    }
    out.push(b'}');
    Value::from_owned(out)
}

fn reformat(v: &Value<'_>, pretty: bool) -> Value<'static> {
    let formatted = if pretty {
        format::pretty_bytes(v.raw(), &PrettyOptions::default())
    } else {
        format::ugly_bytes(v.raw())
    };
    match formatted {
        Ok(bytes) => Value::from_owned(bytes),
        Err(_) => Value::none(),
    }
}
