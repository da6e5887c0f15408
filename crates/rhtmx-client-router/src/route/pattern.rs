/// Pattern parsing for route template segments
///
/// Pure functional parsing of `/`-separated template segments into typed
/// segments. All functions are **pure**: same input → same output, no side effects.
use crate::error::PatternErrorKind;

/// Key used for a bare `*` wildcard
pub const WILDCARD_KEY: &str = "wildcard";

/// Represents the different kinds of template segments
///
/// # Examples
///
/// ```
/// use rhtmx_client_router::route::pattern::{classify_segment, PatternSegmentType};
///
/// let seg = classify_segment("about").unwrap();
/// assert!(matches!(seg, PatternSegmentType::Static(_)));
///
/// let seg = classify_segment(":id").unwrap();
/// assert!(matches!(seg, PatternSegmentType::Param { optional: false, .. }));
///
/// let seg = classify_segment(":id?").unwrap();
/// assert!(matches!(seg, PatternSegmentType::Param { optional: true, .. }));
///
/// let seg = classify_segment("*rest").unwrap();
/// assert!(matches!(seg, PatternSegmentType::Wildcard(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSegmentType {
    /// Trailing wildcard: `*` or `*name`
    Wildcard(String),
    /// Named parameter: `:id`, `:id?`, `:id(\d+)`, `:file.json`
    Param {
        name: String,
        /// Custom pattern from `:name(pattern)`
        pattern: Option<String>,
        optional: bool,
        /// Literal text following the parameter in the same segment
        suffix: String,
    },
    /// Static text segment
    Static(String),
}

/// Classifies a segment into a pattern type
///
/// # Parsing Rules (evaluated in order)
///
/// 1. **Wildcard**: `*` or `*name`
/// 2. **Parameter**: `:name`, then an optional `(pattern)`, then either `?`
///    (optional parameter) or literal suffix text
/// 3. **Static**: Any other text
pub fn classify_segment(segment: &str) -> Result<PatternSegmentType, PatternErrorKind> {
    if let Some(name) = segment.strip_prefix('*') {
        if name.is_empty() {
            return Ok(PatternSegmentType::Wildcard(WILDCARD_KEY.to_string()));
        }
        if !is_identifier(name) {
            return Err(PatternErrorKind::MissingParamName(segment.to_string()));
        }
        return Ok(PatternSegmentType::Wildcard(name.to_string()));
    }

    let Some(rest) = segment.strip_prefix(':') else {
        return Ok(PatternSegmentType::Static(segment.to_string()));
    };

    let name_len = identifier_len(rest);
    if name_len == 0 {
        return Err(PatternErrorKind::MissingParamName(segment.to_string()));
    }
    let (name, mut rest) = rest.split_at(name_len);

    let pattern = if rest.starts_with('(') {
        let (inner, after) = split_group(rest)
            .ok_or_else(|| PatternErrorKind::UnbalancedParen(segment.to_string()))?;
        if has_capturing_group(inner) {
            return Err(PatternErrorKind::CapturingGroup(name.to_string()));
        }
        regex::Regex::new(&format!("^(?:{})$", inner)).map_err(|err| {
            PatternErrorKind::InvalidPattern {
                name: name.to_string(),
                reason: err.to_string(),
            }
        })?;
        rest = after;
        Some(inner.to_string())
    } else {
        None
    };

    if rest.contains('(') || rest.contains(')') {
        return Err(PatternErrorKind::UnbalancedParen(segment.to_string()));
    }

    let optional = rest == "?";
    let suffix = if optional { String::new() } else { rest.to_string() };

    Ok(PatternSegmentType::Param {
        name: name.to_string(),
        pattern,
        optional,
        suffix,
    })
}

fn identifier_len(input: &str) -> usize {
    input
        .char_indices()
        .take_while(|&(i, c)| c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit()))
        .count()
}

fn is_identifier(input: &str) -> bool {
    identifier_len(input) == input.len()
}

/// Splits `(inner)rest` at the parenthesis matching the leading one.
fn split_group(input: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    let mut escaped = false;
    let mut in_class = false;

    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            _ if in_class => {}
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&input[1..i], &input[i + 1..]));
                }
            }
            _ => {}
        }
    }

    None
}

/// Every group inside a custom pattern must be non-capturing, otherwise the
/// capture indices would no longer line up with the parameter keys.
/// Named groups (`(?P<x>...)`, `(?<x>...)`) capture too.
fn has_capturing_group(pattern: &str) -> bool {
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class => {
                if chars.peek() != Some(&'?') {
                    return true;
                }
                chars.next();
                let mut ahead = chars.clone();
                match (ahead.next(), ahead.next()) {
                    (Some('P'), Some('<')) => return true,
                    (Some('<'), Some(next)) if next != '=' && next != '!' => return true,
                    _ => {}
                }
            }
            _ => {}
        }
    }

    false
}
