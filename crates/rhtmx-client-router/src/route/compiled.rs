//! Compiled route templates and the template cache
//!
//! A template such as `/users/:id/*rest` compiles into two anchored regexes:
//! an exact matcher and a prefix matcher used for ancestor detection. The
//! compiler only ever sees static templates, so the cache is bounded by the
//! number of routes, not by traffic.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use regex::{Captures, Regex};

use super::pattern::{classify_segment, PatternSegmentType};
use crate::error::{PatternError, PatternErrorKind};
use crate::Params;

const DEFAULT_PARAM_PATTERN: &str = "[^/]+";

/// A compiled route template
#[derive(Debug)]
pub struct CompiledPattern {
    template: String,
    exact: Regex,
    prefix: Regex,
    keys: Vec<String>,
}

impl CompiledPattern {
    /// Compiles a template, failing on malformed parameter syntax
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_client_router::route::CompiledPattern;
    ///
    /// let pattern = CompiledPattern::compile("/users/:id").unwrap();
    /// assert_eq!(pattern.param_names(), ["id"]);
    /// assert!(pattern.is_match("/users/42"));
    /// assert!(!pattern.is_match("/users"));
    /// ```
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let fail = |kind| PatternError::new(template, kind);

        let segments: Vec<&str> = template.split('/').filter(|s| !s.is_empty()).collect();
        let last = segments.len().saturating_sub(1);

        let mut body = String::new();
        let mut keys: Vec<String> = Vec::new();

        for (index, segment) in segments.iter().enumerate() {
            match classify_segment(segment).map_err(fail)? {
                PatternSegmentType::Static(text) => {
                    body.push('/');
                    body.push_str(&regex::escape(&text));
                }
                PatternSegmentType::Param {
                    name,
                    pattern,
                    optional,
                    suffix,
                } => {
                    let group = format!(
                        "({}){}",
                        pattern.as_deref().unwrap_or(DEFAULT_PARAM_PATTERN),
                        regex::escape(&suffix)
                    );
                    if optional {
                        body.push_str(&format!("(?:/{})?", group));
                    } else {
                        body.push('/');
                        body.push_str(&group);
                    }
                    push_key(&mut keys, name).map_err(fail)?;
                }
                PatternSegmentType::Wildcard(name) => {
                    if index != last {
                        return Err(fail(PatternErrorKind::WildcardNotLast(segment.to_string())));
                    }
                    // Empty remainder still needs a segment boundary: `/docs`, not `/docsx`
                    body.push_str("(?:/|$)(.*)");
                    push_key(&mut keys, name).map_err(fail)?;
                }
            }
        }

        let build = |source: String| {
            Regex::new(&source).map_err(|err| {
                fail(PatternErrorKind::InvalidPattern {
                    name: template.to_string(),
                    reason: err.to_string(),
                })
            })
        };

        Ok(Self {
            template: template.to_string(),
            exact: build(format!("^{}/?$", body))?,
            prefix: build(format!("^{}(?:/.*)?$", body))?,
            keys,
        })
    }

    /// The template this pattern was compiled from
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Parameter names in capture order
    pub fn param_names(&self) -> &[String] {
        &self.keys
    }

    /// Whether the whole pathname matches this template
    pub fn is_match(&self, pathname: &str) -> bool {
        self.exact.is_match(pathname)
    }

    /// Whether this template matches a leading run of whole segments of `pathname`
    ///
    /// ```
    /// use rhtmx_client_router::route::CompiledPattern;
    ///
    /// let pattern = CompiledPattern::compile("/user").unwrap();
    /// assert!(pattern.is_prefix_of("/user/settings"));
    /// assert!(!pattern.is_prefix_of("/username"));
    /// ```
    pub fn is_prefix_of(&self, pathname: &str) -> bool {
        self.prefix.is_match(pathname)
    }

    /// Params from a full match, `None` if the pathname does not match
    pub fn extract(&self, pathname: &str) -> Option<Params> {
        self.exact.captures(pathname).map(|caps| self.collect(&caps))
    }

    /// Params from a segment-prefix match
    pub fn extract_prefix(&self, pathname: &str) -> Option<Params> {
        self.prefix.captures(pathname).map(|caps| self.collect(&caps))
    }

    fn collect(&self, caps: &Captures<'_>) -> Params {
        self.keys
            .iter()
            .enumerate()
            .filter_map(|(index, key)| {
                caps.get(index + 1)
                    .map(|value| (key.clone(), decode_component(value.as_str())))
            })
            .collect()
    }
}

fn push_key(keys: &mut Vec<String>, name: String) -> Result<(), PatternErrorKind> {
    if keys.contains(&name) {
        return Err(PatternErrorKind::DuplicateParam(name));
    }
    keys.push(name);
    Ok(())
}

/// Percent-decodes a captured value, keeping the raw text if it is not valid UTF-8
fn decode_component(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Memoizes [`CompiledPattern`]s by exact template string
///
/// Entries are handed out as `Arc`s, so [`clear`](Self::clear) is safe at any
/// time: a match in progress keeps the pattern it already holds.
#[derive(Debug, Default)]
pub struct PatternCache {
    patterns: RwLock<HashMap<String, Arc<CompiledPattern>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached pattern for `template`, compiling it on first use
    ///
    /// Failed compilations are not cached.
    pub fn compile(&self, template: &str) -> Result<Arc<CompiledPattern>, PatternError> {
        if let Some(hit) = self.patterns.read().get(template) {
            return Ok(Arc::clone(hit));
        }

        let compiled = Arc::new(CompiledPattern::compile(template)?);
        tracing::trace!(
            template,
            params = ?compiled.param_names(),
            "compiled route template"
        );

        let mut patterns = self.patterns.write();
        Ok(Arc::clone(
            patterns.entry(template.to_string()).or_insert(compiled),
        ))
    }

    /// Drops every cached pattern
    pub fn clear(&self) {
        self.patterns.write().clear();
    }

    pub fn len(&self) -> usize {
        self.patterns.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.read().is_empty()
    }

    pub fn contains(&self, template: &str) -> bool {
        self.patterns.read().contains_key(template)
    }
}
