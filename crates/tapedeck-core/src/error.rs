//! Error types for the tapedeck engine.

/// Result type for record parsing/writing.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors produced while parsing or writing a record file.
///
/// Corresponds to the `invalid_record` / `persistence_error` taxonomy
/// entries. Parse errors are always skip-and-log at the call site; they
/// never abort index loading.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The document is not a JSON object, or is missing `request`/`response`.
    #[error("invalid record: {reason}")]
    InvalidRecord {
        /// Human-readable reason, for logging.
        reason: String,
    },

    /// A field that must be present for the record to make sense was absent.
    #[error("record missing field: {0}")]
    MissingField(&'static str),

    /// The record's `request.url` could not be parsed as a URL.
    #[error("invalid request url: {0}")]
    InvalidUrl(String),

    /// I/O failure reading or writing a record file.
    #[error("record I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document was not valid JSON.
    #[error("record JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for scenario loading.
pub type ScenarioResult<T> = Result<T, ScenarioError>;

/// Errors produced while loading a scenario YAML file. All of these are
/// fatal at startup: configuration errors abort the process rather than
/// degrading to a partial scenario set.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// The YAML file could not be read.
    #[error("could not read scenario file {path}: {source}")]
    Read {
        /// Path that failed to open.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The YAML failed to parse, or did not match the expected schema.
    #[error("invalid scenario YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    /// `scenarios:` was present but empty.
    #[error("scenario config has no scenarios")]
    EmptyScenarios,

    /// A scenario was missing a required field.
    #[error("scenario {name:?} missing field: {field}")]
    MissingField {
        /// Scenario name, if known.
        name: String,
        /// Name of the missing field.
        field: &'static str,
    },

    /// A scenario's `filter.body` predicate failed to compile (e.g. a bad
    /// regex in an `rx` leaf).
    #[error("scenario {name:?} has an invalid filter: {reason}")]
    InvalidFilter {
        /// Scenario name.
        name: String,
        /// Why the predicate was rejected.
        reason: String,
    },

    /// A scenario's `response.file` could not be resolved or loaded.
    #[error("scenario {name:?} references missing response file {path}: {source}")]
    MissingResponseFile {
        /// Scenario name.
        name: String,
        /// Resolved response file path.
        path: String,
        /// Underlying codec error.
        #[source]
        source: CodecError,
    },

    /// Two scenarios declared the same name.
    #[error("duplicate scenario name: {0}")]
    DuplicateName(String),
}

/// Umbrella error for anything surfaced directly out of `tapedeck-core`
/// public entry points (index loading, scenario loading).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Wraps a [`CodecError`].
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Wraps a [`ScenarioError`].
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    /// I/O failure walking the mock directory tree.
    #[error("could not read mock directory {path}: {source}")]
    MockDir {
        /// Directory that failed to open.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
