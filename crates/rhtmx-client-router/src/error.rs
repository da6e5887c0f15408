//! Error types for the client router
//!
//! No-match is not an error: matching returns `None` or an empty chain.
//! Guard and hook failures never surface here either; the pipeline logs
//! them and turns guard failures into a cancelled navigation.

use std::path::PathBuf;

use thiserror::Error;

/// A route template that cannot be compiled.
///
/// Raised the first time the template is compiled, which for a [`Router`]
/// means at construction.
///
/// [`Router`]: crate::Router
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid route template `{template}`: {kind}")]
pub struct PatternError {
    /// The full template that failed to compile
    pub template: String,
    /// What was wrong with it
    pub kind: PatternErrorKind,
}

impl PatternError {
    pub fn new(template: impl Into<String>, kind: PatternErrorKind) -> Self {
        Self {
            template: template.into(),
            kind,
        }
    }
}

/// The specific reason a template was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternErrorKind {
    #[error("missing parameter name in segment `{0}`")]
    MissingParamName(String),

    #[error("unbalanced parenthesis in segment `{0}`")]
    UnbalancedParen(String),

    #[error("capturing group in custom pattern for `:{0}`, use `(?:...)` instead")]
    CapturingGroup(String),

    #[error("invalid custom pattern for `{name}`: {reason}")]
    InvalidPattern { name: String, reason: String },

    #[error("wildcard `{0}` must be the last segment")]
    WildcardNotLast(String),

    #[error("duplicate parameter name `{0}`")]
    DuplicateParam(String),
}

/// Failure to load a [`RouterConfig`](crate::RouterConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read router config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML router config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON router config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown router mode `{0}` (expected `history` or `hash`)")]
    InvalidMode(String),
}

/// Top-level error for router construction
#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("environment reported an unparsable URL `{href}`: {source}")]
    Url {
        href: String,
        #[source]
        source: url::ParseError,
    },
}
