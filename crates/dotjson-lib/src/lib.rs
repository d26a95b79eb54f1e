//! Zero-parse querying and mutation of raw JSON bytes.
//!
//! Compact dotted path expressions locate, extract, mutate or delete a single
//! value (or a small projection) by scanning the document bytes directly,
//! without building a syntax tree. The engine targets workloads where many
//! independent queries hit the same or similar documents and parsing overhead
//! and allocator pressure dominate.
//!
//! # Examples
//! ```rust
//! use dotjson_lib::get;
//!
//! let json = br#"{"name":{"first":"Tom","last":"Anderson"},"age":37}"#;
//! assert_eq!("Anderson", get(json, "name.last").string());
//! assert_eq!(37, get(json, "age").int());
//!
//! // Projections fan out over array elements, filters select them.
//! let json = br#"{"friends":[{"age":44},{"age":68},{"age":47}]}"#;
//! assert_eq!(b"[68,47]", get(json, "friends.#(age>45)#.age").raw());
//! ```
//!
//! Mutations emit a freshly allocated buffer and never touch the input:
//! ```rust
//! use dotjson_lib::{get, set, SetValue};
//! # use std::error::Error;
//!
//! # fn main() -> Result<(), Box<dyn Error>> {
//! let json = br#"{"a":{"b":{"c":1}}}"#;
//! let out = set(json, "a.b.c", SetValue::Int(2))?;
//! assert_eq!(2, get(&out, "a.b.c").int());
//! // The encoded replacement occupies the same span, so the buffer
//! // length is preserved by the optimistic fast path.
//! assert_eq!(json.len(), out.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Input JSON assumptions
//!
//! Query operations never panic and never allocate on the failure path: a
//! path that does not resolve, including one that runs into malformed bytes,
//! produces a result whose kind is [`Kind::None`]. Robust validation is
//! sacrificed for performance; [`valid`] performs a strict well-formedness
//! scan when one is needed, and the mutation entry points check the regions
//! they must read and report [`Error::MalformedInput`] instead of emitting
//! corrupt output.
//!
//! # Path syntax
//!
//! ```ebnf
//! path        = [ ".." ] , part , { "|" , part } , { "," , path }
//! part        = segment , { "." , segment } | modifier
//! segment     = key | index | "-1" | "#" | filter | glob | ":" , key
//!             | "[" , segment , "]"
//! filter      = "#(" , filter expr , ")" , [ "#" ]
//! filter expr = rel path , [ op , literal ]
//! op          = "==" | "!=" | "<" | "<=" | ">" | ">=" | "%" | "!%"
//! literal     = json scalar | bareword
//! modifier    = "@" , name , [ ":" , argument ]
//! key         = utf8 characters, separators escaped with "\"
//! glob        = key containing unescaped "*" or "?"
//! ```
//!
//! ## Semantics
//!
//! Segments joined with `.` walk the bytes left to right: object members by
//! key, array elements by index (`-1` reads the last element). `#` returns
//! the array length in final position and otherwise projects the remaining
//! segments over every element, compacting the results. `#(expr)` selects
//! the first matching element, `#(expr)#` all of them. A `|` materialises
//! the intermediate result before the next part runs, which is also how
//! `@modifier` transforms compose. A leading `..` addresses the implicit
//! record array of a JSON Lines stream, or searches all descendants when the
//! document is a single value and the head segment is a key. Top-level
//! commas compose the results of independent paths into an array.
//!
//! Escapes in keys (`\.`, `\:`, `\\`, `\*`, `\?`, `\@`, `\|`, `\,`, `\[`, `\"`)
//! match the literal character and never act as separators. A leading `:`
//! forces a numeric-looking segment to be treated as a member name rather
//! than an array index.

// Documentation lints, enabled only on --release.
#![cfg_attr(
    not(debug_assertions),
    warn(missing_docs, clippy::missing_errors_doc, clippy::missing_panics_doc,)
)]
#![cfg_attr(not(debug_assertions), warn(rustdoc::missing_crate_level_docs))]
// Generic pedantic lints.
#![warn(
    explicit_outlives_requirements,
    semicolon_in_expressions_from_macros,
    unreachable_pub,
    unused_import_braces,
    unused_lifetimes
)]
// Clippy pedantic lints.
#![warn(
    clippy::allow_attributes_without_reason,
    clippy::cargo_common_metadata,
    clippy::cast_lossless,
    clippy::cloned_instead_of_copied,
    clippy::empty_drop,
    clippy::empty_line_after_outer_attr,
    clippy::equatable_if_let,
    clippy::expl_impl_clone_on_copy,
    clippy::explicit_deref_methods,
    clippy::explicit_into_iter_loop,
    clippy::explicit_iter_loop,
    clippy::fallible_impl_from,
    clippy::flat_map_option,
    clippy::if_then_some_else_none,
    clippy::inconsistent_struct_constructor,
    clippy::large_digit_groups,
    clippy::let_underscore_must_use,
    clippy::manual_ok_or,
    clippy::map_err_ignore,
    clippy::map_unwrap_or,
    clippy::match_same_arms,
    clippy::match_wildcard_for_single_variants,
    clippy::missing_inline_in_public_items,
    clippy::mod_module_files,
    clippy::must_use_candidate,
    clippy::needless_continue,
    clippy::needless_for_each,
    clippy::needless_pass_by_value,
    clippy::ptr_as_ptr,
    clippy::redundant_closure_for_method_calls,
    clippy::ref_binding_to_reference,
    clippy::ref_option_ref,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::undocumented_unsafe_blocks,
    clippy::unneeded_field_pattern,
    clippy::unseparated_literal_suffix,
    clippy::unreadable_literal,
    clippy::unused_self,
    clippy::use_self
)]
// Panic-free lint.
#![warn(clippy::exit)]
// Panic-free lints (disabled for tests).
#![cfg_attr(
    not(test),
    warn(
        clippy::expect_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::unwrap_used
    )
)]
// IO hygene, only on --release.
#![cfg_attr(
    not(debug_assertions),
    warn(clippy::print_stderr, clippy::print_stdout, clippy::todo)
)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod error;
pub mod format;
pub mod mutate;
pub mod path;
pub mod result;

pub(crate) mod engine;
pub(crate) mod modifier;
pub(crate) mod scanner;

pub use error::{Error, PathSyntaxError};
pub use format::PrettyOptions;
pub use mutate::{CompiledSetPath, SetOptions, SetValue};
pub use path::CompiledPath;
pub use result::{Kind, Value};

/// Runs a path query against a document, compiling the path through the
/// process-wide cache.
///
/// Never fails: unresolvable paths, including syntactically invalid ones,
/// yield a result whose kind is [`Kind::None`].
#[must_use]
#[inline]
pub fn get<'a>(json: &'a [u8], path: &str) -> Value<'a> {
    match path::cache::compiled(path) {
        Ok(compiled) => engine::eval(json, &compiled),
        Err(_) => Value::none(),
    }
}

/// [`get`] over a string document.
#[must_use]
#[inline]
pub fn get_str<'a>(json: &'a str, path: &str) -> Value<'a> {
    get(json.as_bytes(), path)
}

/// Runs several independent queries against the same document. Slots for
/// paths that do not resolve are individually [`Kind::None`].
#[must_use]
#[inline]
pub fn get_many<'a>(json: &'a [u8], paths: &[&str]) -> Vec<Value<'a>> {
    paths.iter().map(|path| get(json, path)).collect()
}

/// Classifies the outermost value of the document without walking a path.
#[must_use]
#[inline]
pub fn parse(json: &[u8]) -> Value<'_> {
    engine::root_value(json)
}

/// Compiles a query path for repeated use.
///
/// # Errors
/// Returns a [`PathSyntaxError`] with the offending character offset.
#[inline]
pub fn compile_get_path(path: &str) -> Result<CompiledPath, PathSyntaxError> {
    CompiledPath::compile(path)
}

/// Runs a previously compiled query path against a document.
#[must_use]
#[inline]
pub fn run<'a>(path: &CompiledPath, json: &'a [u8]) -> Value<'a> {
    path.run(json)
}

/// Replaces or creates the value at `path`, autovivifying missing parents.
///
/// # Errors
/// See [`Error`] for the mutation error taxonomy.
#[inline]
pub fn set<'v>(
    json: &[u8],
    path: &str,
    value: impl Into<SetValue<'v>>,
) -> Result<Vec<u8>, Error> {
    set_with_options(json, path, value, &SetOptions::default())
}

/// [`set`] with explicit [`SetOptions`].
///
/// # Errors
/// See [`Error`] for the mutation error taxonomy.
#[inline]
pub fn set_with_options<'v>(
    json: &[u8],
    path: &str,
    value: impl Into<SetValue<'v>>,
    opts: &SetOptions,
) -> Result<Vec<u8>, Error> {
    let compiled = CompiledSetPath::compile(path)?;
    mutate::set_compiled(json, &compiled, &value.into(), opts)
}

/// Applies `(path, value)` operations left to right; later operations see
/// the effect of earlier ones.
///
/// # Errors
/// Fails with [`Error::Batch`] naming the offending operation index.
#[inline]
pub fn set_many(json: &[u8], ops: &[(&str, SetValue<'_>)]) -> Result<Vec<u8>, Error> {
    mutate::set_many(json, ops)
}

/// Removes the value at `path`. Deleting an absent member is a no-op;
/// deleting past the end of an array is [`Error::OutOfRange`].
///
/// # Errors
/// See [`Error`] for the mutation error taxonomy.
#[inline]
pub fn delete(json: &[u8], path: &str) -> Result<Vec<u8>, Error> {
    let compiled = CompiledSetPath::compile(path)?;
    mutate::delete_compiled(json, &compiled)
}

/// Applies deletions left to right.
///
/// # Errors
/// Fails with [`Error::Batch`] naming the offending operation index.
#[inline]
pub fn delete_many(json: &[u8], paths: &[&str]) -> Result<Vec<u8>, Error> {
    mutate::delete_many(json, paths)
}

/// Adds `delta` to the number at `path`, writing the result in place when
/// its textual width is unchanged. A missing target counts from zero.
///
/// # Errors
/// See [`Error`] for the mutation error taxonomy.
#[inline]
pub fn increment(json: &[u8], path: &str, delta: f64) -> Result<Vec<u8>, Error> {
    let compiled = CompiledSetPath::compile(path)?;
    mutate::increment_compiled(json, &compiled, delta)
}

/// Compiles a mutation path for repeated use.
///
/// # Errors
/// Rejects query-only constructs (wildcards, filters, projections,
/// modifiers, multipaths) besides plain syntax errors.
#[inline]
pub fn compile_set_path(path: &str) -> Result<CompiledSetPath, Error> {
    CompiledSetPath::compile(path)
}

/// [`set`] with a previously compiled mutation path.
///
/// # Errors
/// See [`Error`] for the mutation error taxonomy.
#[inline]
pub fn set_with_compiled<'v>(
    json: &[u8],
    path: &CompiledSetPath,
    value: impl Into<SetValue<'v>>,
    opts: Option<&SetOptions>,
) -> Result<Vec<u8>, Error> {
    let default_opts = SetOptions::default();
    mutate::set_compiled(json, path, &value.into(), opts.unwrap_or(&default_opts))
}

/// Produces an indented rendition of the document. String contents are
/// preserved byte-identically and numbers are not re-encoded.
///
/// # Errors
/// Fails with [`Error::MalformedInput`] when the document is not valid JSON.
#[inline]
pub fn pretty(json: &[u8], opts: &PrettyOptions) -> Result<Vec<u8>, Error> {
    format::pretty_bytes(json, opts)
}

/// Strips all insignificant whitespace between tokens.
///
/// # Errors
/// Fails with [`Error::MalformedInput`] when the document is not valid JSON.
#[inline]
pub fn ugly(json: &[u8]) -> Result<Vec<u8>, Error> {
    format::ugly_bytes(json)
}

/// Full well-formedness scan of the document.
#[must_use]
#[inline]
pub fn valid(json: &[u8]) -> bool {
    format::validate(json).is_ok()
}

/// Macro for debug logging. Evaluates to [`log::debug`], if debug assertions are enabled.
/// Otherwise it's an empty statement.
///
/// Use this instead of plain [`log::debug`], since this is automatically removed in
/// release mode and incurs no performance penalties.
#[cfg(debug_assertions)]
macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => (log::debug!(target: $target, $($arg)+));
    ($($arg:tt)+) => (log::debug!($($arg)+))
}

/// Macro for debug logging. Evaluates to [`log::debug`], if debug assertions are enabled.
/// Otherwise it's an empty statement.
///
/// Use this instead of plain [`log::debug`], since this is automatically removed in
/// release mode and incurs no performance penalties.
#[cfg(not(debug_assertions))]
macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => {};
    ($($arg:tt)+) => {};
}

pub(crate) use debug;
