/// Crate-wide result alias.
pub type CardResult<T> = Result<T, CardError>;

/// Error taxonomy for document-level and job-level failures.
///
/// Per-field and per-asset problems are reported as [`FieldWarning`]s next to a successful
/// result instead of through this type.
#[derive(thiserror::Error, Debug)]
pub enum CardError {
    /// Malformed field definitions, options or caller input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Asset loading or upload failure that could not be contained to a single field.
    #[error("asset error: {0}")]
    Asset(String),

    /// Geometry unavailable or target gone while dragging.
    #[error("drag error: {0}")]
    Drag(String),

    /// Rasterization, encoding or job bookkeeping failure.
    #[error("export error: {0}")]
    Export(String),

    /// Unparseable template markup.
    #[error("markup error: {0}")]
    Markup(String),

    /// Persistence collaborator failure.
    #[error("store error: {0}")]
    Store(String),

    /// The export job was cancelled or superseded before it produced an artifact.
    #[error("export cancelled")]
    Cancelled,

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Anything else, usually I/O with context attached.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CardError {
    /// Build a [`CardError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`CardError::Asset`].
    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    /// Build a [`CardError::Drag`].
    pub fn drag(msg: impl Into<String>) -> Self {
        Self::Drag(msg.into())
    }

    /// Build a [`CardError::Export`].
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Build a [`CardError::Markup`].
    pub fn markup(msg: impl Into<String>) -> Self {
        Self::Markup(msg.into())
    }

    /// Build a [`CardError::Store`].
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Build a [`CardError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` for [`CardError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<serde_json::Error> for CardError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

/// Category of a recoverable, field-scoped problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// An image did not load in time; a broken-image icon was used.
    ImageTimeout,
    /// An image failed to load or decode; a broken-image icon was used.
    ImageLoad,
    /// An upload was rejected locally or by the upload collaborator.
    Upload,
    /// The text/image generation collaborator failed.
    Generation,
}

/// Recoverable problem reported alongside the field or asset it affects.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct FieldWarning {
    /// Field the warning belongs to, when known.
    pub field_id: Option<String>,
    /// Variable path or asset URL involved, when known.
    pub path: Option<String>,
    /// Warning category.
    pub kind: WarningKind,
    /// Human readable diagnostic.
    pub message: String,
}

impl FieldWarning {
    /// Create a warning that is not yet tied to a field.
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            field_id: None,
            path: None,
            kind,
            message: message.into(),
        }
    }

    /// Attach the owning field id.
    pub fn for_field(mut self, id: impl Into<String>) -> Self {
        self.field_id = Some(id.into());
        self
    }

    /// Attach the variable path or asset URL.
    pub fn at_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
