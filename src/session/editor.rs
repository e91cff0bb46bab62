//! The editing session: the one state container every mutation goes through.

use std::sync::Arc;

use serde_json::Value;

use crate::collab::{
    AssetUploader, Blob, ContentGenerator, ImagePrompt, TemplateStore, TextPrompt, UploadOutcome,
    validate_upload,
};
use crate::drag::{DragEngine, DragSource, DragState, DropPosition, apply_drop};
use crate::export::{
    AnimationOptions, ExportArtifact, ExportJob, ExportOptions, Exporter, LocalFetcher,
    ProgressFn, Rasterizer, TemplateFrames,
};
use crate::foundation::config::EditorConfig;
use crate::foundation::core::Point;
use crate::foundation::error::{CardError, CardResult, FieldWarning, WarningKind};
use crate::model::tree::{self, FieldTree};
use crate::model::{Field, FieldId, FieldKind, FieldPatch, RenderedMarkup, Template};
use crate::render::{RenderedCard, VisualNode, render, render_card};
use crate::session::history::History;
use crate::surface::{Surface, layout};
use crate::vars::path::split_path;
use crate::vars::{Edits, Namespace, build_namespace};

/// State restored by undo/redo.
#[derive(Clone, Debug, PartialEq)]
struct Snapshot {
    template: Arc<Template>,
    edits: Edits,
    uploads: Edits,
}

/// Explicit editing session.
///
/// Owns the template, the live edits and uploaded-asset URLs, the namespace assembled from
/// them, the drag engine, a bounded history and the exporter. Mutations take `&mut self` and
/// are applied in call order; the namespace is rebuilt and swapped in whole after each one.
#[derive(Debug)]
pub struct EditorSession {
    config: EditorConfig,
    template: Arc<Template>,
    edits: Edits,
    uploads: Edits,
    namespace: Namespace,
    surface: Option<Surface>,
    drag: DragEngine,
    history: History<Snapshot>,
    exporter: Exporter,
}

impl EditorSession {
    /// Session over `template`. The template and config are validated first.
    pub fn new(template: Template, config: EditorConfig) -> CardResult<Self> {
        config.validate()?;
        template.validate()?;
        let exporter = Exporter::new(
            Arc::new(LocalFetcher::new()),
            Rasterizer::with_system_fonts(),
            config.export.concurrent,
        );
        let mut session = Self {
            drag: DragEngine::new(config.drag),
            history: History::new(config.history_depth),
            config,
            template: Arc::new(template),
            edits: Edits::new(),
            uploads: Edits::new(),
            namespace: Namespace::empty(),
            surface: None,
            exporter,
        };
        session.refresh();
        Ok(session)
    }

    /// Session over the "new template" starting point.
    pub fn new_default(config: EditorConfig) -> CardResult<Self> {
        Self::new(Template::new_default(), config)
    }

    /// Session over an editable copy of `template` (fresh id, "(copy)" name).
    pub fn from_copy(template: &Template, config: EditorConfig) -> CardResult<Self> {
        Self::new(template.clone_for_edit(), config)
    }

    /// Load template `id` from `store`.
    pub async fn open(
        store: &dyn TemplateStore,
        id: &str,
        config: EditorConfig,
    ) -> CardResult<Self> {
        let template = store
            .get(id)
            .await?
            .ok_or_else(|| CardError::store(format!("template '{id}' not found")))?;
        Self::new(template, config)
    }

    /// Replace the exporter, e.g. to plug in a different fetcher or rasterizer.
    pub fn with_exporter(mut self, exporter: Exporter) -> Self {
        self.exporter = exporter;
        self
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn fields(&self) -> &FieldTree {
        &self.template.fields
    }

    /// Current namespace; replaced, never mutated, on every change.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn edits(&self) -> &Edits {
        &self.edits
    }

    pub fn uploads(&self) -> &Edits {
        &self.uploads
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    pub fn drag_state(&self) -> &DragState {
        self.drag.state()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ---- field model ----

    /// Insert a field relative to `anchor`. Validation errors leave the session unchanged.
    pub fn add_field(
        &mut self,
        field: Field,
        anchor: Option<&FieldId>,
        pos: DropPosition,
    ) -> CardResult<()> {
        let next = tree::add_field(&self.template.fields, field, anchor, pos)?;
        self.commit_fields(next);
        Ok(())
    }

    /// Patch a field. Unknown ids are a no-op.
    pub fn update_field(&mut self, id: &FieldId, patch: &FieldPatch) -> CardResult<()> {
        let next = tree::update_field(&self.template.fields, id, patch)?;
        self.commit_fields(next);
        Ok(())
    }

    /// Remove a field and its subtree. Returns `false` for unknown ids.
    pub fn remove_field(&mut self, id: &FieldId) -> bool {
        let next = tree::remove_field(&self.template.fields, id);
        self.commit_fields(next)
    }

    /// Replace the template's markup strings; they must parse.
    pub fn set_markup(
        &mut self,
        html: impl Into<String>,
        css: impl Into<String>,
        script: impl Into<String>,
    ) -> CardResult<()> {
        let mut next = (*self.template).clone();
        next.html = html.into();
        next.css = css.into();
        next.script = script.into();
        next.validate()?;
        self.commit_template(next);
        Ok(())
    }

    // ---- values ----

    /// Record a live edit at `path`. Text values bound to a field with `max_length` are cut
    /// to that many characters.
    pub fn set_value(&mut self, path: &str, value: Value) -> CardResult<()> {
        if split_path(path).is_none() {
            return Err(CardError::validation(format!("malformed path '{path}'")));
        }
        let value = self.clamp_to_field(path, value);
        let uploaded = self.uploads.get(path).is_some();
        if !uploaded && self.edits.get(path) == Some(&value) {
            return Ok(());
        }
        self.history.record(self.snapshot());
        // Uploads merge after edits, so the older upload must go for this write to show.
        self.uploads.remove(path);
        self.edits.insert(path, value);
        self.refresh();
        Ok(())
    }

    /// Drop the live edit at `path`, falling back to defaults. Returns `false` if none existed.
    pub fn clear_value(&mut self, path: &str) -> bool {
        if self.edits.get(path).is_none() {
            return false;
        }
        self.history.record(self.snapshot());
        self.edits.remove(path);
        self.refresh();
        true
    }

    /// Validate and upload an image for field `id`, binding the hosted URL on success.
    ///
    /// Rejections and upload failures are returned as a warning and change nothing; only an
    /// unknown or non-image field is an error.
    #[tracing::instrument(level = "info", skip_all, fields(field = %id))]
    pub async fn upload_image(
        &mut self,
        id: &FieldId,
        mut blob: Blob,
        uploader: &dyn AssetUploader,
    ) -> CardResult<Option<FieldWarning>> {
        let field = self.field_of_kind(id, "image")?;
        let FieldKind::Image { options, .. } = &field.kind else {
            return Err(CardError::validation(format!("field '{id}' is not an image field")));
        };
        let warn = |msg: String| {
            FieldWarning::new(WarningKind::Upload, msg)
                .for_field(id.as_str())
                .at_path(field.binding_path())
        };

        let mime = match validate_upload(&blob, options, &self.config.upload) {
            Ok(mime) => mime,
            Err(e) => {
                tracing::warn!(error = %e, "upload rejected");
                return Ok(Some(warn(e.to_string())));
            }
        };
        blob.mime.get_or_insert_with(|| mime.to_owned());

        match uploader.upload(blob).await {
            UploadOutcome::Url(url) => {
                self.history.record(self.snapshot());
                self.uploads.insert(field.binding_path(), Value::String(url));
                self.refresh();
                Ok(None)
            }
            UploadOutcome::Error(msg) => {
                tracing::warn!(error = %msg, "upload failed");
                Ok(Some(warn(msg)))
            }
        }
    }

    /// Ask the generator for text and use it as the field's value.
    ///
    /// Generator failures become a warning and leave the value untouched.
    #[tracing::instrument(level = "info", skip_all, fields(field = %id))]
    pub async fn apply_generated_text(
        &mut self,
        id: &FieldId,
        generator: &dyn ContentGenerator,
        mut prompt: TextPrompt,
    ) -> CardResult<Option<FieldWarning>> {
        let field = self.field_of_kind(id, "text")?;
        if let FieldKind::Text { max_length, .. } = &field.kind
            && prompt.max_length.is_none()
        {
            prompt.max_length = *max_length;
        }
        match generator.generate_text(&prompt).await {
            Ok(text) => {
                self.set_value(field.binding_path(), Value::String(text))?;
                Ok(None)
            }
            Err(e) => Ok(Some(generation_warning(&field, &e))),
        }
    }

    /// Ask the generator for an image URL and bind it to the field.
    #[tracing::instrument(level = "info", skip_all, fields(field = %id))]
    pub async fn apply_generated_image(
        &mut self,
        id: &FieldId,
        generator: &dyn ContentGenerator,
        prompt: ImagePrompt,
    ) -> CardResult<Option<FieldWarning>> {
        let field = self.field_of_kind(id, "image")?;
        match generator.generate_image(&prompt).await {
            Ok(url) => {
                self.set_value(field.binding_path(), Value::String(url))?;
                Ok(None)
            }
            Err(e) => Ok(Some(generation_warning(&field, &e))),
        }
    }

    // ---- rendering ----

    /// Visual tree of the root fields.
    pub fn render(&self) -> Vec<VisualNode> {
        render(&self.template.fields, &self.namespace)
    }

    /// Visual tree plus canvas and effect overlays.
    pub fn render_card(&self) -> RenderedCard {
        render_card(&self.template, &self.namespace)
    }

    /// Interpolated markup strings.
    pub fn render_markup(&self) -> CardResult<RenderedMarkup> {
        self.template.render_markup(&self.namespace)
    }

    /// The live surface, with drag decorations (hover outline and drop indicator).
    pub fn surface(&mut self) -> CardResult<Surface> {
        let mut surface = self.base_surface()?.clone();
        if let Some(session) = self.drag.session() {
            surface.set_hover(session.over.as_ref());
            let indicator = session.over.as_ref().zip(session.position);
            surface.set_drop_indicator(indicator);
        }
        Ok(surface)
    }

    // ---- drag ----

    pub fn pointer_down(&mut self, source: DragSource, at: Point) {
        self.drag.pointer_down(source, at);
    }

    pub fn pointer_move(&mut self, at: Point) -> CardResult<()> {
        self.surface_for_drag()?;
        if let Some(surface) = &self.surface {
            self.drag.pointer_move(at, surface);
        }
        Ok(())
    }

    /// Release the pointer and apply the resulting drop. Returns `true` when the field order
    /// changed.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn pointer_up(&mut self) -> CardResult<bool> {
        self.surface_for_drag()?;
        let Some(surface) = &self.surface else {
            return Ok(false);
        };
        let Some(cmd) = self.drag.pointer_up(surface) else {
            return Ok(false);
        };
        let next = apply_drop(&self.template.fields, &cmd)?;
        let changed = self.commit_fields(next);
        if changed {
            tracing::info!(drop_target = %cmd.target, position = ?cmd.position, "drop applied");
        }
        Ok(changed)
    }

    /// Explicit cancel (Escape); the field order is untouched.
    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    // ---- history ----

    pub fn undo(&mut self) -> bool {
        let Some(prev) = self.history.undo(self.snapshot()) else {
            return false;
        };
        self.restore(prev);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.history.redo(self.snapshot()) else {
            return false;
        };
        self.restore(next);
        true
    }

    // ---- export ----

    /// Export the current state as a single image.
    pub async fn export_static(
        &self,
        opts: &ExportOptions,
        progress: &mut ProgressFn<'_>,
    ) -> CardResult<ExportArtifact> {
        let surface = layout(&self.render_card())?;
        self.exporter.export_static(&surface, opts, progress).await
    }

    /// Export the current state as an animation driven by `animation.progress`.
    pub async fn export_animated(
        &self,
        anim: &AnimationOptions,
        opts: &ExportOptions,
        progress: &mut ProgressFn<'_>,
    ) -> CardResult<ExportArtifact> {
        let frames = TemplateFrames::new(self.template.clone(), self.namespace.clone());
        self.exporter
            .export_animated(&frames, anim, opts, progress)
            .await
    }

    /// State of the newest export job.
    pub fn export_job(&self) -> ExportJob {
        self.exporter.slot().job()
    }

    /// Most recent successful export.
    pub fn last_export(&self) -> Option<ExportArtifact> {
        self.exporter.slot().last_artifact()
    }

    pub fn cancel_export(&self) {
        self.exporter.slot().cancel_active();
    }

    // ---- persistence ----

    /// Persist the template; a first save assigns its id.
    #[tracing::instrument(level = "info", skip_all, fields(id = %self.template.id))]
    pub async fn save(&mut self, store: &dyn TemplateStore) -> CardResult<()> {
        let saved = store.save((*self.template).clone()).await?;
        if saved.id != self.template.id {
            let mut next = (*self.template).clone();
            next.id = saved.id;
            self.template = Arc::new(next);
        }
        Ok(())
    }

    // ---- internals ----

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            template: self.template.clone(),
            edits: self.edits.clone(),
            uploads: self.uploads.clone(),
        }
    }

    fn restore(&mut self, s: Snapshot) {
        self.drag.cancel();
        self.template = s.template;
        self.edits = s.edits;
        self.uploads = s.uploads;
        self.refresh();
    }

    fn refresh(&mut self) {
        self.namespace = build_namespace(&self.template, &self.edits, &self.uploads);
        self.surface = None;
    }

    fn commit_template(&mut self, next: Template) {
        self.history.record(self.snapshot());
        self.template = Arc::new(next);
        self.refresh();
    }

    fn commit_fields(&mut self, fields: FieldTree) -> bool {
        if fields == self.template.fields {
            return false;
        }
        let mut next = (*self.template).clone();
        next.fields = fields;
        self.commit_template(next);
        true
    }

    fn base_surface(&mut self) -> CardResult<&Surface> {
        let surface = match self.surface.take() {
            Some(s) => s,
            None => layout(&render_card(&self.template, &self.namespace))?,
        };
        let surface: &Surface = self.surface.insert(surface);
        Ok(surface)
    }

    fn surface_for_drag(&mut self) -> CardResult<()> {
        let built = self.base_surface().map(|_| ());
        self.cancel_drag_on_err(built)
    }

    /// A failed geometry lookup ends the drag; the committed order stays as it was.
    fn cancel_drag_on_err<T>(&mut self, result: CardResult<T>) -> CardResult<T> {
        if let Err(e) = &result {
            tracing::warn!(error = %e, "drag aborted");
            self.drag.cancel();
        }
        result
    }

    fn field_of_kind(&self, id: &FieldId, kind: &str) -> CardResult<Arc<Field>> {
        let field = self
            .template
            .field(id)
            .cloned()
            .ok_or_else(|| CardError::validation(format!("unknown field '{id}'")))?;
        let actual = field.field_type().as_str();
        if actual != kind {
            return Err(CardError::validation(format!(
                "field '{id}' is a {actual} field, expected {kind}"
            )));
        }
        Ok(field)
    }

    fn clamp_to_field(&self, path: &str, value: Value) -> Value {
        let limit = tree::iter_depth_first(&self.template.fields)
            .into_iter()
            .find(|f| f.binding_path() == path)
            .and_then(|f| match &f.kind {
                FieldKind::Text { max_length, .. } => *max_length,
                _ => None,
            });
        match (limit, value) {
            (Some(max), Value::String(s)) if s.chars().count() > max => {
                tracing::debug!(path, max, "edit truncated to max length");
                Value::String(s.chars().take(max).collect())
            }
            (_, v) => v,
        }
    }
}

fn generation_warning(field: &Field, e: &CardError) -> FieldWarning {
    tracing::warn!(field = %field.id, error = %e, "generation failed");
    FieldWarning::new(WarningKind::Generation, e.to_string())
        .for_field(field.id.as_str())
        .at_path(field.binding_path())
}

#[cfg(test)]
#[path = "../../tests/unit/session/editor.rs"]
mod tests;
