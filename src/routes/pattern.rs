//! # Path Patterns
//!
//! Compiled path matchers and the decoder that turns them back into
//! express-style paths (`/users/:id`).
//!
//! Mount paths are compiled into a small regex dialect:
//!
//! ```text
//! /users/:id?   →   (?i)^\/users(?:\/([^\/]+?))?\/?(?:\/|$)
//! ```
//!
//! A segment may carry several parameters (`/range/:from-:to`); parameters
//! after the first in a segment are wrapped without the slash, `(?:(body))`.
//!
//! The decoder strips anchors, the case-insensitivity flag and the
//! trailing-slash terminator, then replaces each capture wrapper with
//! `:{key}`, walking the keys in source-offset order.

use regex::{Captures, Regex};
use std::sync::LazyLock;
use thiserror::Error;

/// Capture wrapper emitted for each parameter: `(?:\/(body))` with an optional `?`
static PARAM_GROUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\?:(\\/|)\(.*?\)\)\??")
        .expect("Failed to compile PARAM_GROUP regex - this should never happen")
});

static LEADING_SYNTAX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\(\?i\))?\^?")
        .expect("Failed to compile LEADING_SYNTAX regex - this should never happen")
});

static TRAILING_SYNTAX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\\/\?)?(?:\$|\(\?:\\/\|\$\))?$")
        .expect("Failed to compile TRAILING_SYNTAX regex - this should never happen")
});

static ESCAPED_CHAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(.)").expect("Failed to compile ESCAPED_CHAR regex - this should never happen")
});

/// Default capture body for a parameter segment
const SEGMENT_BODY: &str = r"[^\/]+?";

/// Errors raised while compiling or decoding a path pattern
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid path pattern `{source_text}`: {error}")]
    InvalidRegex {
        source_text: String,
        #[source]
        error: regex::Error,
    },
    #[error("pattern `{source_text}` has more capture groups than keys (missing key #{index})")]
    MissingKey { source_text: String, index: usize },
    #[error("unterminated parameter pattern in path `{0}`")]
    Unterminated(String),
    #[error("parameter without a name in path `{0}`")]
    EmptyName(String),
}

/// Named capture parameter of a compiled pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamKey {
    pub name: String,
    pub optional: bool,
    /// Byte offset of the parameter's capture wrapper in the pattern source
    pub offset: usize,
}

/// Path matcher attached to a router layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatcher {
    /// Matches every path (mounted at `/`)
    Any,
    /// Plain express-style path text, used as-is
    Literal(String),
    /// Compiled regex source plus its parameter keys
    Pattern { source: String, keys: Vec<ParamKey> },
}

impl PathMatcher {
    /// Wrap an already compiled pattern
    ///
    /// # Errors
    /// Returns an error if `source` is not a valid regex.
    pub fn pattern(source: impl Into<String>, keys: Vec<ParamKey>) -> Result<Self, PatternError> {
        let source = source.into();
        validate(&source)?;
        Ok(PathMatcher::Pattern { source, keys })
    }

    /// Compile an express-style mount path into a prefix pattern
    ///
    /// # Errors
    /// Returns an error for an unterminated custom parameter body or an
    /// invalid resulting regex.
    pub fn prefix(path: &str) -> Result<Self, PatternError> {
        let trimmed = path.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Ok(PathMatcher::Any);
        }

        let mut source = String::from("(?i)^");
        let mut keys = Vec::new();

        for segment in trimmed.split('/').filter(|s| !s.is_empty()) {
            compile_segment(segment, path, &mut source, &mut keys)?;
        }
        source.push_str(r"\/?(?:\/|$)");

        validate(&source)?;
        Ok(PathMatcher::Pattern { source, keys })
    }

    /// Decode back into an express-style path without surrounding slashes
    ///
    /// # Errors
    /// Returns an error if the pattern has more capture groups than keys.
    pub fn decode(&self) -> Result<String, PatternError> {
        match self {
            PathMatcher::Any => Ok(String::new()),
            PathMatcher::Literal(path) => Ok(trim_slashes(path).to_string()),
            PathMatcher::Pattern { source, keys } => decode_pattern(source, keys),
        }
    }
}

/// Append one path segment to `source`
///
/// A segment may hold several parameters separated by literal text
/// (`:from-:to`, `:name.:ext`). Only the first piece of the segment carries
/// the leading `\/`; later parameters are wrapped as `(?:(body))`.
fn compile_segment(
    segment: &str,
    path: &str,
    source: &mut String,
    keys: &mut Vec<ParamKey>,
) -> Result<(), PatternError> {
    let mut rest = segment;
    let mut slash = r"\/";

    while !rest.is_empty() {
        if let Some(param) = rest.strip_prefix(':') {
            let (name, body, optional, tail) = parse_param(param, path)?;
            keys.push(ParamKey {
                name,
                optional,
                offset: source.len(),
            });
            source.push_str(&format!("(?:{slash}({body}))"));
            if optional {
                source.push('?');
            }
            rest = tail;
        } else {
            let end = rest.find(':').unwrap_or(rest.len());
            source.push_str(slash);
            source.push_str(&regex::escape(&rest[..end]));
            rest = &rest[end..];
        }
        slash = "";
    }
    Ok(())
}

/// Split `name(body)?` off the front of `param`, returning the unparsed tail
fn parse_param<'p>(
    param: &'p str,
    path: &str,
) -> Result<(String, String, bool, &'p str), PatternError> {
    let name: String = param
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() {
        return Err(PatternError::EmptyName(path.to_string()));
    }
    let mut rest = &param[name.len()..];

    let mut body = SEGMENT_BODY.to_string();
    if let Some(custom) = rest.strip_prefix('(') {
        let close =
            closing_paren(custom).ok_or_else(|| PatternError::Unterminated(path.to_string()))?;
        body = custom[..close].to_string();
        rest = &custom[close + 1..];
    }

    let optional = rest.starts_with('?');
    if optional {
        rest = &rest[1..];
    }
    Ok((name, body, optional, rest))
}

/// Byte index of the `)` closing a custom body, skipping escaped and nested parens
fn closing_paren(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '(' => depth += 1,
            ')' if depth == 0 => return Some(i),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn validate(source: &str) -> Result<(), PatternError> {
    Regex::new(source)
        .map(|_| ())
        .map_err(|error| PatternError::InvalidRegex {
            source_text: source.to_string(),
            error,
        })
}

/// Replace capture wrappers with `:{name}` and strip regex syntax
///
/// Keys are sorted by offset first; substituting out of order would put names
/// on the wrong segments.
pub fn decode_pattern(source: &str, keys: &[ParamKey]) -> Result<String, PatternError> {
    let mut sorted: Vec<&ParamKey> = keys.iter().collect();
    sorted.sort_by_key(|key| key.offset);

    let mut counter = 0usize;
    let mut missing = None;
    let substituted = PARAM_GROUP.replace_all(source, |caps: &Captures<'_>| {
        let name = match sorted.get(counter) {
            Some(key) => key.name.as_str(),
            None => {
                missing.get_or_insert(counter);
                ""
            }
        };
        counter += 1;
        format!("{}:{}", &caps[1], name)
    });

    if let Some(index) = missing {
        return Err(PatternError::MissingKey {
            source_text: source.to_string(),
            index,
        });
    }

    let stripped = LEADING_SYNTAX.replace(&substituted, "");
    let stripped = TRAILING_SYNTAX.replace(&stripped, "");
    let path = ESCAPED_CHAR.replace_all(&stripped, "$1");

    Ok(trim_slashes(&path).to_string())
}

/// Remove leading and trailing slashes (and surrounding whitespace)
pub fn trim_slashes(path: &str) -> &str {
    path.trim().trim_matches('/')
}

/// Join path pieces with single slashes, skipping empty pieces
pub fn merge_paths<'a>(paths: impl IntoIterator<Item = &'a str>) -> String {
    paths
        .into_iter()
        .map(trim_slashes)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
