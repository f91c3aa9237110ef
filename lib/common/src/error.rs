use std::error::Error;
use std::fmt;

/// A location within the original query text, for user-facing diagnostics.
/// `None` when an error has no natural anchor (e.g. a store-side failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceOffset {
    pub start: usize,
    pub end: usize,
}

impl fmt::Display for SourceOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// The taxonomy a caller sees: every error from translation through
/// execution folds into one of these eight kinds, each with a stable
/// machine code. No internal stack trace is ever part of the public
/// message.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RelquadError {
    /// The query or update text failed to parse.
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// The algebra contains a node the translator elects not to implement.
    #[error("unsupported feature: {feature}")]
    UnsupportedFeature {
        feature: String,
        offset: Option<SourceOffset>,
    },

    /// An expression evaluated on incompatible types outside a context that
    /// suppresses the error (FILTER suppresses; BIND yields unbound;
    /// elsewhere it propagates as this variant).
    #[error("type error: {0}")]
    Type(String),

    /// A form's cardinality precondition was not met, e.g. `DESCRIBE` with
    /// no resource bound and no `WHERE` clause.
    #[error("cardinality error: {0}")]
    Cardinality(String),

    /// A property path's cycle-prevention depth cap was tripped.
    #[error("path recursion depth exceeded the configured limit of {limit}")]
    PathDepthExceeded { limit: u32 },

    /// A DDL/DML failure surfaced by the relational store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The query or update's wall-clock deadline elapsed before completion.
    #[error("deadline exceeded")]
    Timeout,

    /// An update transaction was rolled back.
    #[error("transaction failed: {0}")]
    Transaction(String),
}

impl RelquadError {
    /// The stable machine code surfaced to callers alongside the message.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            RelquadError::Parse(_) => "PARSE_ERROR",
            RelquadError::UnsupportedFeature { .. } => "UNSUPPORTED_FEATURE",
            RelquadError::Type(_) => "TYPE_ERROR",
            RelquadError::Cardinality(_) => "CARDINALITY_ERROR",
            RelquadError::PathDepthExceeded { .. } => "PATH_DEPTH_EXCEEDED",
            RelquadError::Store(_) => "STORE_ERROR",
            RelquadError::Timeout => "TIMEOUT",
            RelquadError::Transaction(_) => "TRANSACTION_ERROR",
        }
    }

    /// `true` for the translator-side errors (2, 4, 5 in the taxonomy) that
    /// abort translation before any SQL is submitted to the store.
    #[must_use]
    pub fn aborts_before_submit(&self) -> bool {
        matches!(
            self,
            RelquadError::UnsupportedFeature { .. }
                | RelquadError::Cardinality(_)
                | RelquadError::PathDepthExceeded { .. }
        )
    }

    #[must_use]
    pub fn unsupported_feature(feature: impl Into<String>) -> Self {
        RelquadError::UnsupportedFeature {
            feature: feature.into(),
            offset: None,
        }
    }
}

/// SPARQL text that failed to parse into an algebra tree.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub offset: Option<SourceOffset>,
}

impl From<relquad_model::SparqlSyntaxError> for ParseError {
    fn from(error: relquad_model::SparqlSyntaxError) -> Self {
        ParseError {
            message: error.to_string(),
            offset: None,
        }
    }
}

impl From<relquad_model::SparqlSyntaxError> for RelquadError {
    fn from(error: relquad_model::SparqlSyntaxError) -> Self {
        RelquadError::Parse(error.into())
    }
}

/// An error surfaced by the relational store: connection failure, a
/// rejected statement, a constraint violation. Mirrors the
/// `#[non_exhaustive]` + catch-all shape the rest of the workspace uses for
/// collaborator errors it cannot fully enumerate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("connection to the relational store failed: {0}")]
    Connection(#[source] Box<dyn Error + Send + Sync + 'static>),

    #[error("statement rejected by the store: {0}")]
    Statement(#[source] Box<dyn Error + Send + Sync + 'static>),

    #[error("transaction could not be started or completed: {0}")]
    Transaction(#[source] Box<dyn Error + Send + Sync + 'static>),

    #[error("{0}")]
    Other(#[source] Box<dyn Error + Send + Sync + 'static>),
}

impl StoreError {
    #[must_use]
    pub fn other(error: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        StoreError::Other(error.into())
    }
}

pub type RelquadResult<T> = Result<T, RelquadError>;
