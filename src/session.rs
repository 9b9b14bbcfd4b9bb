//! Live edit sessions.
//!
//! A session stands for one open parameter dialog: a filter being edited in
//! a document, named by the dialog kind (`signal`) and the filter identifier.
//! Opening the same triple again returns the existing session, so the dialog
//! comes back with the parameters the user left it at.

use crate::core::error::{DocumentId, FilterId};
use crate::core::filter::FilterRequest;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Identity of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    /// Owning document
    pub document: DocumentId,
    /// Dialog kind
    pub signal: String,
    /// Filter being edited
    pub identifier: FilterId,
}

impl SessionKey {
    /// Create a key.
    pub fn new(document: DocumentId, signal: impl Into<String>, identifier: FilterId) -> Self {
        Self {
            document,
            signal: signal.into(),
            identifier,
        }
    }

    /// Key of the session a request belongs to.
    pub fn for_request(document: DocumentId, request: &FilterRequest) -> Self {
        Self::new(document, request.signal.clone(), request.identifier.clone())
    }
}

/// Events a dialog sends back to the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "request", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Parameters changed; show a preview.
    Preview(FilterRequest),
    /// Parameters accepted; commit them.
    Apply(FilterRequest),
    /// Dialog dismissed; discard the preview.
    Cancel(FilterRequest),
}

impl SessionEvent {
    /// The request carried by the event.
    pub fn request(&self) -> &FilterRequest {
        match self {
            SessionEvent::Preview(request) | SessionEvent::Apply(request) | SessionEvent::Cancel(request) => request,
        }
    }
}

/// One open dialog.
#[derive(Debug, Clone)]
pub struct Session {
    key: SessionKey,
    pending: Option<FilterRequest>,
    previews: u64,
}

impl Session {
    fn new(key: SessionKey) -> Self {
        Self {
            key,
            pending: None,
            previews: 0,
        }
    }

    /// Session identity.
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Identifier of the filter being edited.
    pub fn identifier(&self) -> &FilterId {
        &self.key.identifier
    }

    /// Dialog kind.
    pub fn signal(&self) -> &str {
        &self.key.signal
    }

    /// Last previewed, not yet applied, parameters.
    pub fn pending(&self) -> Option<&FilterRequest> {
        self.pending.as_ref()
    }

    /// Number of previews shown in this session.
    pub fn previews(&self) -> u64 {
        self.previews
    }

    pub(crate) fn record_preview(&mut self, request: &FilterRequest) {
        self.pending = Some(request.clone());
        self.previews += 1;
    }

    pub(crate) fn mark_applied(&mut self) {
        self.pending = None;
    }
}

/// All open sessions of a workspace.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: IndexMap<SessionKey, Session>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the session for `key`, opening it if needed.
    pub fn get_or_open(&mut self, key: SessionKey) -> &mut Session {
        self.sessions.entry(key).or_insert_with_key(|key| {
            log::debug!("opening {} session for filter {} in {}", key.signal, key.identifier, key.document);
            Session::new(key.clone())
        })
    }

    /// Look up a session.
    pub fn get(&self, key: &SessionKey) -> Option<&Session> {
        self.sessions.get(key)
    }

    /// Look up a session for modification.
    pub fn get_mut(&mut self, key: &SessionKey) -> Option<&mut Session> {
        self.sessions.get_mut(key)
    }

    /// Check if a session is open.
    pub fn contains(&self, key: &SessionKey) -> bool {
        self.sessions.contains_key(key)
    }

    /// Close one session.
    pub fn remove(&mut self, key: &SessionKey) -> Option<Session> {
        self.sessions.shift_remove(key)
    }

    /// Close every session of a document. Returns how many were closed.
    pub fn reset(&mut self, document: DocumentId) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|key, _| key.document != document);
        before - self.sessions.len()
    }

    /// Sessions of one document, in opening order.
    pub fn sessions_for(&self, document: DocumentId) -> impl Iterator<Item = &Session> {
        self.sessions.values().filter(move |s| s.key.document == document)
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if no session is open.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
