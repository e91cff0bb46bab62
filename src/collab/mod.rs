//! Contracts for the external collaborators: persistence, uploads and content generation.

pub(crate) mod generate;
pub(crate) mod store;
pub(crate) mod upload;

pub use generate::{ContentGenerator, ImagePrompt, TextPrompt};
pub use store::{InMemoryTemplateStore, JsonDirStore, TemplatePatch, TemplateStore};
pub use upload::{AssetUploader, Blob, InlineUploader, UploadOutcome, validate_upload};
