//! Template persistence contract and two stores.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{CardError, CardResult};
use crate::model::{CardCanvas, FieldTree, Template, TemplateStyles};

/// Persistence collaborator.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// All stored templates ordered by id.
    async fn list(&self) -> CardResult<Vec<Template>>;
    async fn get(&self, id: &str) -> CardResult<Option<Template>>;
    /// Insert or replace. A template without an id is assigned a fresh UUID.
    async fn save(&self, template: Template) -> CardResult<Template>;
    /// Apply `patch` to an existing template.
    async fn update(&self, id: &str, patch: TemplatePatch) -> CardResult<Template>;
    /// Remove a template; unknown ids are ignored.
    async fn delete(&self, id: &str) -> CardResult<()>;
}

/// Partial template replacement; unset members keep their stored value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemplatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldTree>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub styles: Option<TemplateStyles>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canvas: Option<CardCanvas>,
}

impl TemplatePatch {
    /// Patch replacing every member with the one from `t`.
    pub fn replace_all(t: &Template) -> Self {
        Self {
            name: Some(t.name.clone()),
            fields: Some(t.fields.clone()),
            html: Some(t.html.clone()),
            css: Some(t.css.clone()),
            script: Some(t.script.clone()),
            styles: Some(t.styles.clone()),
            canvas: Some(t.canvas.clone()),
        }
    }

    /// Patched copy of `t`; the id is never changed.
    pub fn apply(&self, t: &Template) -> Template {
        let mut out = t.clone();
        if let Some(v) = &self.name {
            out.name = v.clone();
        }
        if let Some(v) = &self.fields {
            out.fields = v.clone();
        }
        if let Some(v) = &self.html {
            out.html = v.clone();
        }
        if let Some(v) = &self.css {
            out.css = v.clone();
        }
        if let Some(v) = &self.script {
            out.script = v.clone();
        }
        if let Some(v) = &self.styles {
            out.styles = v.clone();
        }
        if let Some(v) = &self.canvas {
            out.canvas = v.clone();
        }
        out
    }
}

fn assign_id(mut template: Template) -> Template {
    if template.id.trim().is_empty() {
        template.id = uuid::Uuid::new_v4().to_string();
    }
    template
}

fn not_found(id: &str) -> CardError {
    CardError::store(format!("template '{id}' not found"))
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemoryTemplateStore {
    templates: Mutex<BTreeMap<String, Template>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Template>> {
        self.templates.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn list(&self) -> CardResult<Vec<Template>> {
        Ok(self.lock().values().cloned().collect())
    }

    async fn get(&self, id: &str) -> CardResult<Option<Template>> {
        Ok(self.lock().get(id).cloned())
    }

    async fn save(&self, template: Template) -> CardResult<Template> {
        template.validate()?;
        let template = assign_id(template);
        self.lock().insert(template.id.clone(), template.clone());
        Ok(template)
    }

    async fn update(&self, id: &str, patch: TemplatePatch) -> CardResult<Template> {
        let mut map = self.lock();
        let current = map.get(id).ok_or_else(|| not_found(id))?;
        let next = patch.apply(current);
        next.validate()?;
        map.insert(id.to_owned(), next.clone());
        Ok(next)
    }

    async fn delete(&self, id: &str) -> CardResult<()> {
        self.lock().remove(id);
        Ok(())
    }
}

/// One `<id>.json` file per template inside `dir`.
#[derive(Clone, Debug)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> CardResult<PathBuf> {
        let ok = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !ok {
            return Err(CardError::validation(format!(
                "template id '{id}' is not a valid file name"
            )));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    async fn read(&self, path: &Path) -> CardResult<Option<Template>> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("read template '{}'", path.display()))
                    .into());
            }
        };
        let template = Template::from_json(&text)
            .map_err(|e| CardError::store(format!("{}: {e}", path.display())))?;
        Ok(Some(template))
    }

    async fn write(&self, template: &Template) -> CardResult<()> {
        let path = self.path_for(&template.id)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create store dir '{}'", self.dir.display()))?;
        let json = serde_json::to_vec_pretty(template)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("write '{}'", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("replace '{}'", path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl TemplateStore for JsonDirStore {
    #[tracing::instrument(level = "debug", skip_all, fields(dir = %self.dir.display()))]
    async fn list(&self) -> CardResult<Vec<Template>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("list '{}'", self.dir.display()))
                    .into());
            }
        };
        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .context("read store dir entry")?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut out = Vec::with_capacity(paths.len());
        for path in paths {
            match self.read(&path).await {
                Ok(Some(t)) => out.push(t),
                Ok(None) => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable template"),
            }
        }
        Ok(out)
    }

    async fn get(&self, id: &str) -> CardResult<Option<Template>> {
        let path = self.path_for(id)?;
        self.read(&path).await
    }

    #[tracing::instrument(level = "debug", skip_all, fields(id = %template.id))]
    async fn save(&self, template: Template) -> CardResult<Template> {
        template.validate()?;
        let template = assign_id(template);
        self.write(&template).await?;
        tracing::debug!(id = %template.id, "template saved");
        Ok(template)
    }

    async fn update(&self, id: &str, patch: TemplatePatch) -> CardResult<Template> {
        let path = self.path_for(id)?;
        let current = self.read(&path).await?.ok_or_else(|| not_found(id))?;
        let next = patch.apply(&current);
        next.validate()?;
        self.write(&next).await?;
        Ok(next)
    }

    async fn delete(&self, id: &str) -> CardResult<()> {
        let path = self.path_for(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("delete '{}'", path.display()))
                .into()),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/collab/store.rs"]
mod tests;
