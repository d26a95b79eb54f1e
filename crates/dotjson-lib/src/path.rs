//! Path expressions and their compiled representation.
//!
//! A path compiles into an immutable [`CompiledPath`] that is cheap to walk
//! and safe to share across threads. Compilation happens explicitly through
//! [`CompiledPath::compile`] or implicitly through the process-wide cache
//! used by the convenience entry points.
//!
//! The compiled form is a sequence of **stages**. A `Select` stage walks raw
//! bytes segment by segment; an `Apply` stage runs a named modifier over the
//! materialised intermediate result. `.`-joined segments accumulate into the
//! current `Select` stage, while `|` starts a new stage, which is what makes
//! `a.#.b` project over elements but `a.#.b|0` address the projected array.
pub(crate) mod cache;
pub(crate) mod parser;

use crate::engine;
use crate::error::PathSyntaxError;
use crate::result::Value;
use smallvec::SmallVec;

/// A parsed, immutable path expression.
///
/// Compiled paths are stateless and can be run against any number of
/// documents, including concurrently.
#[derive(Debug, Clone)]
pub struct CompiledPath {
    source: String,
    pub(crate) kind: PathKind,
}

impl CompiledPath {
    /// Compiles a path expression.
    ///
    /// # Errors
    /// Returns a [`PathSyntaxError`] with the character offset of the first
    /// construct that failed to parse.
    #[inline]
    pub fn compile(path: &str) -> Result<Self, PathSyntaxError> {
        Ok(Self {
            source: path.to_owned(),
            kind: parser::parse(path)?,
        })
    }

    /// Runs the compiled path against a document.
    #[must_use]
    #[inline]
    pub fn run<'a>(&self, json: &'a [u8]) -> Value<'a> {
        engine::eval(json, self)
    }

    /// The original path text this was compiled from.
    #[must_use]
    #[inline(always)]
    pub fn source(&self) -> &str {
        &self.source
    }
}

#[derive(Debug, Clone)]
pub(crate) enum PathKind {
    Single(StagedPath),
    /// Top-level comma list; sub-results compose an array.
    Multi(Vec<StagedPath>),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct StagedPath {
    /// Leading `..`: JSON Lines head or recursive descent, depending on the
    /// document.
    pub(crate) descend_head: bool,
    pub(crate) stages: SmallVec<[Stage; 2]>,
}

impl StagedPath {
    /// Whether this path selects the whole current value unchanged.
    pub(crate) fn is_identity(&self) -> bool {
        !self.descend_head
            && self
                .stages
                .iter()
                .all(|s| matches!(s, Stage::Select(segs) if segs.is_empty()))
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Stage {
    Select(SmallVec<[Segment; 8]>),
    Apply(ModifierCall),
}

#[derive(Debug, Clone)]
pub(crate) struct ModifierCall {
    pub(crate) name: String,
    pub(crate) arg: Option<String>,
}

/// One step of a compiled path. Dispatch is a match over this small tag set;
/// there is no polymorphic indirection on the hot path.
#[derive(Debug, Clone)]
pub(crate) enum Segment {
    /// Plain object member lookup, escapes already decoded.
    Key(String),
    /// Non-negative array index; falls back to a member lookup by its
    /// decimal name when the current value is an object.
    Index(usize),
    /// `-1`: the final array element.
    LastIndex,
    /// `#`: array length in final position, element fan-out otherwise.
    Hash,
    /// `*`/`?` glob over member names, or a per-element candidate walk over
    /// arrays.
    Wildcard(String),
    /// `#(expr)` or `#(expr)#`.
    Filter(Box<FilterSegment>),
    /// `:name`: forced member lookup even when the name looks numeric.
    NumericKey(String),
}

#[derive(Debug, Clone)]
pub(crate) struct FilterSegment {
    pub(crate) expr: FilterExpr,
    /// `#(expr)#`: collect every match instead of the first.
    pub(crate) all: bool,
}

/// An element predicate: a relative path, optionally compared to a literal.
/// An empty relative path addresses the element itself.
#[derive(Debug, Clone)]
pub(crate) struct FilterExpr {
    pub(crate) path: StagedPath,
    pub(crate) cond: Option<(FilterOp, FilterLit)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// `%`: glob match over the decoded string.
    GlobMatch,
    /// `!%`: glob non-match.
    GlobNotMatch,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FilterLit {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
}
