//! Tokenizer and compiler for path expressions.
//!
//! The tokenizer is a single forward pass that is aware of `\` escapes,
//! balanced filter parentheses, bracket segments and quoted literals, so the
//! separators `.`, `|` and `,` only split where they are structurally
//! top-level. Filter literals are parsed with nom.
use crate::error::PathSyntaxError;
use crate::path::{
    FilterExpr, FilterLit, FilterOp, FilterSegment, ModifierCall, PathKind, Segment, Stage,
    StagedPath,
};
use crate::scanner;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::combinator::{all_consuming, map, value};
use nom::number::complete::double;
use nom::IResult;
use smallvec::SmallVec;

pub(crate) fn parse(path: &str) -> Result<PathKind, PathSyntaxError> {
    let parts = split_multipath(path)?;
    if parts.len() == 1 {
        let (off, part) = parts[0];
        return Ok(PathKind::Single(parse_staged(part, off)?));
    }
    let mut branches = Vec::with_capacity(parts.len());
    for (off, part) in parts {
        branches.push(parse_staged(part, off)?);
    }
    Ok(PathKind::Multi(branches))
}

/// Splits on `,` outside of filters, brackets and quoted literals.
fn split_multipath(path: &str) -> Result<Vec<(usize, &str)>, PathSyntaxError> {
    let b = path.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0_usize;
    let mut parens = 0_usize;
    let mut brackets = 0_usize;
    let mut in_str = false;
    let mut i = 0;
    while i < b.len() {
        let c = b[i];
        if c == b'\\' {
            i += 2;
            continue;
        }
        if in_str {
            if c == b'"' {
                in_str = false;
            }
            i += 1;
            continue;
        }
        match c {
            // Quoted literals may carry separators; a literal `"` in a key
            // must be escaped.
            b'"' => in_str = true,
            b'(' => parens += 1,
            b')' => parens = parens.saturating_sub(1),
            b'[' => brackets += 1,
            b']' => brackets = brackets.saturating_sub(1),
            b',' if parens == 0 && brackets == 0 => {
                parts.push((start, &path[start..i]));
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push((start, &path[start..]));
    if parts.len() > 1 {
        if let Some((off, _)) = parts.iter().find(|(_, p)| p.is_empty()) {
            return Err(PathSyntaxError::new(*off, "empty multipath branch"));
        }
    }
    Ok(parts)
}

pub(crate) fn parse_staged(src: &str, base: usize) -> Result<StagedPath, PathSyntaxError> {
    let mut p = Tokens::new(src, base);
    let descend_head = p.eat_prefix("..");
    let mut stages: SmallVec<[Stage; 2]> = SmallVec::new();
    let mut segs: SmallVec<[Segment; 8]> = SmallVec::new();
    while !p.at_end() {
        match p.peek() {
            b'.' => {
                p.pos += 1;
                if p.at_end() {
                    return Err(p.err("trailing separator"));
                }
            }
            b'|' => {
                p.pos += 1;
                if !segs.is_empty() {
                    stages.push(Stage::Select(std::mem::take(&mut segs)));
                }
                if p.at_end() {
                    return Err(p.err("trailing pipe"));
                }
            }
            b'@' => {
                let call = p.modifier()?;
                if !segs.is_empty() {
                    stages.push(Stage::Select(std::mem::take(&mut segs)));
                }
                stages.push(Stage::Apply(call));
            }
            _ => segs.push(p.segment()?),
        }
    }
    if !segs.is_empty() {
        stages.push(Stage::Select(segs));
    }
    Ok(StagedPath {
        descend_head,
        stages,
    })
}

struct Tokens<'p> {
    src: &'p str,
    b: &'p [u8],
    base: usize,
    pos: usize,
}

impl<'p> Tokens<'p> {
    fn new(src: &'p str, base: usize) -> Self {
        Self {
            src,
            b: src.as_bytes(),
            base,
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.b.len()
    }

    fn peek(&self) -> u8 {
        self.b[self.pos]
    }

    fn err(&self, message: &str) -> PathSyntaxError {
        PathSyntaxError::new(self.base + self.pos, message)
    }

    fn eat_prefix(&mut self, prefix: &str) -> bool {
        if self.src[self.pos..].starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    fn char_here(&self) -> char {
        // `pos` always sits on a char boundary: the tokenizer advances by
        // `len_utf8` and every special byte is ASCII.
        self.src[self.pos..].chars().next().unwrap_or('\u{FFFD}')
    }

    fn segment(&mut self) -> Result<Segment, PathSyntaxError> {
        match self.peek() {
            b'#' => self.hash_or_filter(),
            b'[' => self.bracket(),
            b':' => {
                self.pos += 1;
                let (decoded, _, _) = self.key_token();
                if decoded.is_empty() {
                    return Err(self.err("empty key after `:`"));
                }
                Ok(Segment::NumericKey(decoded))
            }
            _ => self.plain_segment(),
        }
    }

    fn plain_segment(&mut self) -> Result<Segment, PathSyntaxError> {
        let (decoded, pattern, has_glob) = self.key_token();
        if decoded.is_empty() {
            return Err(self.err("empty path segment"));
        }
        if has_glob {
            return Ok(Segment::Wildcard(pattern));
        }
        if decoded == "-1" {
            return Ok(Segment::LastIndex);
        }
        if decoded.bytes().all(|c| c.is_ascii_digit()) {
            if let Ok(n) = decoded.parse::<usize>() {
                return Ok(Segment::Index(n));
            }
        }
        Ok(Segment::Key(decoded))
    }

    /// Scans a key token up to the next unescaped separator. Returns the
    /// decoded name, a glob pattern with non-wildcard metacharacters escaped,
    /// and whether any unescaped `*`/`?` was seen.
    fn key_token(&mut self) -> (String, String, bool) {
        let mut decoded = String::new();
        let mut pattern = String::new();
        let mut has_glob = false;
        while !self.at_end() {
            match self.peek() {
                b'.' | b'|' | b',' | b'[' => break,
                b'\\' => {
                    self.pos += 1;
                    if self.at_end() {
                        decoded.push('\\');
                        pattern.push_str("\\\\");
                        break;
                    }
                    let ch = self.char_here();
                    decoded.push(ch);
                    pattern.push('\\');
                    pattern.push(ch);
                    self.pos += ch.len_utf8();
                }
                b'*' | b'?' => {
                    has_glob = true;
                    let ch = char::from(self.peek());
                    decoded.push(ch);
                    pattern.push(ch);
                    self.pos += 1;
                }
                _ => {
                    let ch = self.char_here();
                    decoded.push(ch);
                    if matches!(ch, ']' | '{' | '}' | '!') {
                        pattern.push('\\');
                    }
                    pattern.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }
        (decoded, pattern, has_glob)
    }

    fn hash_or_filter(&mut self) -> Result<Segment, PathSyntaxError> {
        self.pos += 1;
        if self.at_end() || self.peek() != b'(' {
            return Ok(Segment::Hash);
        }
        let (s, e) = self.balanced(b'(', b')')?;
        let all = if !self.at_end() && self.peek() == b'#' {
            self.pos += 1;
            true
        } else {
            false
        };
        let expr = parse_filter_expr(&self.src[s..e], self.base + s)?;
        Ok(Segment::Filter(Box::new(FilterSegment { expr, all })))
    }

    fn bracket(&mut self) -> Result<Segment, PathSyntaxError> {
        let (s, e) = self.balanced(b'[', b']')?;
        if s == e {
            return Err(PathSyntaxError::new(self.base + s, "empty bracket segment"));
        }
        let mut sub = Tokens::new(&self.src[s..e], self.base + s);
        let seg = sub.segment()?;
        if !sub.at_end() {
            return Err(sub.err("unexpected content in bracket segment"));
        }
        Ok(seg)
    }

    /// Consumes a balanced `open`..`close` group starting at the current
    /// position, honouring escapes and quoted literals. Returns the interior
    /// span and leaves the cursor after the closer.
    fn balanced(&mut self, open: u8, close: u8) -> Result<(usize, usize), PathSyntaxError> {
        let opener = self.pos;
        let start = self.pos + 1;
        let mut depth = 1_usize;
        let mut in_str = false;
        let mut i = start;
        while i < self.b.len() {
            let c = self.b[i];
            if c == b'\\' {
                i += 2;
                continue;
            }
            if in_str {
                if c == b'"' {
                    in_str = false;
                }
                i += 1;
                continue;
            }
            if c == b'"' {
                in_str = true;
            } else if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    self.pos = i + 1;
                    return Ok((start, i));
                }
            }
            i += 1;
        }
        Err(PathSyntaxError::new(
            self.base + opener,
            "unbalanced group in path",
        ))
    }

    fn modifier(&mut self) -> Result<ModifierCall, PathSyntaxError> {
        self.pos += 1;
        let name_start = self.pos;
        while !self.at_end()
            && (self.peek().is_ascii_alphanumeric() || self.peek() == b'_')
        {
            self.pos += 1;
        }
        if self.pos == name_start {
            return Err(self.err("empty modifier name"));
        }
        let name = self.src[name_start..self.pos].to_owned();
        let arg = if !self.at_end() && self.peek() == b':' {
            self.pos += 1;
            Some(self.modifier_arg())
        } else {
            None
        };
        Ok(ModifierCall { name, arg })
    }

    /// Reads a modifier argument up to the next top-level `|` or `,`.
    /// Escaped separators (`\:` `\|` `\,` `\.`) decode to the bare byte;
    /// all other escapes are kept verbatim for the modifier to interpret.
    fn modifier_arg(&mut self) -> String {
        let mut out = String::new();
        let mut depth = 0_usize;
        let mut in_str = false;
        while !self.at_end() {
            let c = self.peek();
            if c == b'\\' {
                self.pos += 1;
                if self.at_end() {
                    out.push('\\');
                    break;
                }
                let ch = self.char_here();
                if !matches!(ch, ':' | '|' | ',' | '.') {
                    out.push('\\');
                }
                out.push(ch);
                self.pos += ch.len_utf8();
                continue;
            }
            if in_str {
                if c == b'"' {
                    in_str = false;
                }
            } else {
                match c {
                    b'"' => in_str = true,
                    b'{' | b'[' | b'(' => depth += 1,
                    b'}' | b']' | b')' => depth = depth.saturating_sub(1),
                    b'|' | b',' if depth == 0 => break,
                    _ => {}
                }
            }
            let ch = self.char_here();
            out.push(ch);
            self.pos += ch.len_utf8();
        }
        out
    }
}

fn parse_filter_expr(inner: &str, base: usize) -> Result<FilterExpr, PathSyntaxError> {
    let b = inner.as_bytes();
    let mut parens = 0_usize;
    let mut brackets = 0_usize;
    let mut in_str = false;
    let mut i = 0;
    let mut found: Option<(usize, usize, FilterOp)> = None;
    while i < b.len() {
        let c = b[i];
        if c == b'\\' {
            i += 2;
            continue;
        }
        if in_str {
            if c == b'"' {
                in_str = false;
            }
            i += 1;
            continue;
        }
        match c {
            b'"' => in_str = true,
            b'(' => parens += 1,
            b')' => parens = parens.saturating_sub(1),
            b'[' => brackets += 1,
            b']' => brackets = brackets.saturating_sub(1),
            _ if parens == 0 && brackets == 0 => {
                let rest = &b[i..];
                let hit = if rest.starts_with(b"==") {
                    Some((2, FilterOp::Eq))
                } else if rest.starts_with(b"!=") {
                    Some((2, FilterOp::Ne))
                } else if rest.starts_with(b"!%") {
                    Some((2, FilterOp::GlobNotMatch))
                } else if rest.starts_with(b"<=") {
                    Some((2, FilterOp::Le))
                } else if rest.starts_with(b">=") {
                    Some((2, FilterOp::Ge))
                } else if c == b'<' {
                    Some((1, FilterOp::Lt))
                } else if c == b'>' {
                    Some((1, FilterOp::Gt))
                } else if c == b'%' {
                    Some((1, FilterOp::GlobMatch))
                } else {
                    None
                };
                if let Some((len, op)) = hit {
                    found = Some((i, len, op));
                    break;
                }
            }
            _ => {}
        }
        i += 1;
    }
    match found {
        None => Ok(FilterExpr {
            path: parse_staged(inner.trim(), base)?,
            cond: None,
        }),
        Some((pos, len, op)) => {
            let lhs = inner[..pos].trim();
            let rhs = inner[pos + len..].trim();
            if rhs.is_empty() {
                return Err(PathSyntaxError::new(
                    base + pos + len,
                    "missing literal after comparison operator",
                ));
            }
            Ok(FilterExpr {
                path: parse_staged(lhs, base)?,
                cond: Some((op, parse_literal(rhs))),
            })
        }
    }
}

/// Parses a filter literal: a JSON scalar, falling back to a bareword string.
pub(crate) fn parse_literal(s: &str) -> FilterLit {
    let parsed: IResult<&str, FilterLit> = all_consuming(alt((
        map(string_literal, FilterLit::Str),
        value(FilterLit::Bool(true), tag("true")),
        value(FilterLit::Bool(false), tag("false")),
        value(FilterLit::Null, tag("null")),
        map(double, FilterLit::Num),
    )))(s);
    match parsed {
        Ok((_, lit)) => lit,
        Err(_) => FilterLit::Str(unescape_bareword(s)),
    }
}

fn string_literal(i: &str) -> IResult<&str, String> {
    let b = i.as_bytes();
    if b.first() != Some(&b'"') {
        return Err(nom::Err::Error(nom::error::Error::new(
            i,
            nom::error::ErrorKind::Char,
        )));
    }
    let mut j = 1;
    let mut closing = None;
    while j < b.len() {
        match b[j] {
            b'\\' => j += 2,
            b'"' => {
                closing = Some(j);
                break;
            }
            _ => j += 1,
        }
    }
    match closing {
        Some(end) => Ok((&i[end + 1..], scanner::unescape(&b[1..end]))),
        None => Err(nom::Err::Error(nom::error::Error::new(
            i,
            nom::error::ErrorKind::Char,
        ))),
    }
}

fn unescape_bareword(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            } else {
                out.push('\\');
            }
        } else {
            out.push(c);
        }
    }
    out
}
