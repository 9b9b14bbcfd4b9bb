//! Open documents and the dialog sessions editing them.
//!
//! The [`Workspace`] is the editor-facing surface of the engine. It owns one
//! [`FilterStack`] per open document and routes dialog events to the right
//! stack, keeping the session registry in step with the stacks.

use crate::core::config::EditorConfig;
use crate::core::error::{DocumentId, EngineError, EngineResult, FilterId};
use crate::core::types::ImageValue;
use crate::filters::registry::{FilterRegistry, SharedRegistry};
use crate::session::{Session, SessionEvent, SessionKey, SessionRegistry};
use crate::stack::FilterStack;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// One open image and its filter stack.
#[derive(Debug)]
pub struct Document {
    id: DocumentId,
    title: String,
    path: Option<PathBuf>,
    stack: FilterStack,
}

impl Document {
    /// Document identifier.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Title shown on the tab.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// File the base image was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The document's filter stack.
    pub fn stack(&self) -> &FilterStack {
        &self.stack
    }

    /// Mutable access to the filter stack.
    pub fn stack_mut(&mut self) -> &mut FilterStack {
        &mut self.stack
    }
}

/// What a dispatched event did.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// The preview image for the request.
    Previewed(ImageValue),
    /// The request was committed to the stack.
    Applied,
    /// The session was closed and the preview discarded.
    Cancelled,
}

/// Every open document, sharing one filter registry.
pub struct Workspace {
    registry: SharedRegistry,
    config: EditorConfig,
    documents: IndexMap<DocumentId, Document>,
    sessions: SessionRegistry,
}

impl Workspace {
    /// Create a workspace over `registry` with default configuration.
    pub fn new(registry: SharedRegistry) -> Self {
        Self::with_config(registry, EditorConfig::default())
    }

    /// Create a workspace with explicit configuration.
    pub fn with_config(registry: SharedRegistry, config: EditorConfig) -> Self {
        Self {
            registry,
            config,
            documents: IndexMap::new(),
            sessions: SessionRegistry::new(),
        }
    }

    /// Registry shared by every document.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Active configuration.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Open dialog sessions.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Open a document over an image already in memory.
    pub fn open_document(&mut self, title: impl Into<String>, image: ImageValue) -> DocumentId {
        self.insert_document(title.into(), None, image)
    }

    /// Load an image file and open it as a document.
    pub fn open_path(&mut self, path: impl AsRef<Path>) -> EngineResult<DocumentId> {
        let path = path.as_ref();
        let image = ImageValue::from_path(path, &self.config.load)?;
        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(self.insert_document(title, Some(path.to_path_buf()), image))
    }

    fn insert_document(&mut self, title: String, path: Option<PathBuf>, image: ImageValue) -> DocumentId {
        let id = DocumentId::new();
        let stack = FilterStack::new(self.registry.clone(), image).with_options(self.config.stack.clone());
        log::info!("opened document {} ({})", id, title);
        self.documents.insert(
            id,
            Document {
                id,
                title,
                path,
                stack,
            },
        );
        id
    }

    /// Close a document and every session editing it.
    pub fn close_document(&mut self, id: DocumentId) -> EngineResult<Document> {
        let document = self
            .documents
            .shift_remove(&id)
            .ok_or(EngineError::DocumentNotFound(id))?;
        let closed = self.sessions.reset(id);
        log::info!("closed document {} ({} sessions)", id, closed);
        Ok(document)
    }

    /// Look up a document.
    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.documents.get(&id)
    }

    /// Look up a document for modification.
    pub fn document_mut(&mut self, id: DocumentId) -> Option<&mut Document> {
        self.documents.get_mut(&id)
    }

    /// Open documents, in opening order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// Number of open documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if no document is open.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn stack_mut(&mut self, id: DocumentId) -> EngineResult<&mut FilterStack> {
        self.documents
            .get_mut(&id)
            .map(|document| &mut document.stack)
            .ok_or(EngineError::DocumentNotFound(id))
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Open (or return the already open) session for a dialog.
    pub fn open_session(
        &mut self,
        document: DocumentId,
        signal: impl Into<String>,
        identifier: FilterId,
    ) -> EngineResult<&mut Session> {
        if !self.documents.contains_key(&document) {
            return Err(EngineError::DocumentNotFound(document));
        }
        Ok(self.sessions.get_or_open(SessionKey::new(document, signal, identifier)))
    }

    /// Reopen the dialog of a filter already in the stack.
    ///
    /// Returns `None` when the identifier is not in the document's stack.
    pub fn edit_filter(&mut self, document: DocumentId, identifier: &FilterId) -> EngineResult<Option<&mut Session>> {
        let doc = self
            .documents
            .get(&document)
            .ok_or(EngineError::DocumentNotFound(document))?;
        let Some(spec) = doc.stack.get(identifier) else {
            return Ok(None);
        };
        let key = SessionKey::new(document, spec.signal.clone(), spec.identifier.clone());
        Ok(Some(self.sessions.get_or_open(key)))
    }

    /// Route a dialog event to its document's stack.
    pub fn dispatch(&mut self, document: DocumentId, event: SessionEvent) -> EngineResult<DispatchOutcome> {
        let stack = self
            .documents
            .get_mut(&document)
            .map(|doc| &mut doc.stack)
            .ok_or(EngineError::DocumentNotFound(document))?;
        let key = SessionKey::for_request(document, event.request());

        match &event {
            SessionEvent::Preview(request) => {
                let image = stack.preview_filter(request)?;
                self.sessions.get_or_open(key).record_preview(request);
                Ok(DispatchOutcome::Previewed(image))
            }
            SessionEvent::Apply(request) => {
                stack.add_filter(request)?;
                self.sessions.get_or_open(key).mark_applied();
                Ok(DispatchOutcome::Applied)
            }
            SessionEvent::Cancel(_) => {
                self.sessions.remove(&key);
                stack.cancel_preview();
                Ok(DispatchOutcome::Cancelled)
            }
        }
    }

    /// Delete the stage at `row`, closing its session first.
    ///
    /// Returns the removed identifier, or `None` when `row` is out of range.
    pub fn delete_filter(&mut self, document: DocumentId, row: usize) -> EngineResult<Option<FilterId>> {
        let stack = self.stack_mut(document)?;
        let Some(spec) = stack.filters().get(row).cloned() else {
            return Ok(None);
        };

        self.sessions
            .remove(&SessionKey::new(document, spec.signal.clone(), spec.identifier.clone()));
        self.stack_mut(document)?.remove_filter(&spec.identifier)?;
        Ok(Some(spec.identifier))
    }

    /// Flip the visibility of a stage.
    pub fn toggle_filter(&mut self, document: DocumentId, identifier: &FilterId) -> EngineResult<()> {
        Ok(self.stack_mut(document)?.toggle_visibility(identifier)?)
    }

    /// Move the stage at `row` one place up. Returns its new row.
    pub fn move_up(&mut self, document: DocumentId, row: usize) -> EngineResult<Option<usize>> {
        Ok(self.stack_mut(document)?.move_up(row)?)
    }

    /// Move the stage at `row` one place down. Returns its new row.
    pub fn move_down(&mut self, document: DocumentId, row: usize) -> EngineResult<Option<usize>> {
        Ok(self.stack_mut(document)?.move_down(row)?)
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(FilterRegistry::with_builtins().into_shared())
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("documents", &self.documents.len())
            .field("sessions", &self.sessions.len())
            .field("config", &self.config)
            .finish()
    }
}
