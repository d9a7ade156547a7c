use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod http;
#[cfg(test)]
pub(crate) mod memory;

pub use http::{parse_base_url, HttpNotesApi};

/// Server-assigned note identifier. Backends disagree on whether ids are
/// integers or strings, so both are accepted and kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteId {
    Int(i64),
    Text(String),
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteId::Int(value) => write!(f, "{value}"),
            NoteId::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for NoteId {
    fn from(value: i64) -> Self {
        NoteId::Int(value)
    }
}

/// Text typed by a user is only ever used to build a path, so it stays verbatim.
impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        NoteId::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub id: NoteId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl From<Note> for NoteSummary {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            title: note.title,
            content: note.content,
        }
    }
}

/// Request body for `create` and `update`. Both always carry the full pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotePayload<'a> {
    pub title: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },
    #[error("{method} {url} returned HTTP {status}")]
    Status {
        method: Method,
        url: String,
        status: u16,
    },
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl TransportError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::Status { status: 404, .. })
    }
}

/// The five round trips the client makes against the notes service.
#[allow(async_fn_in_trait)]
pub trait NotesApi {
    async fn list(&self, query: Option<&str>) -> Result<Vec<NoteSummary>, TransportError>;
    async fn get(&self, id: &NoteId) -> Result<Note, TransportError>;
    async fn create(&self, title: &str, content: &str) -> Result<Note, TransportError>;
    async fn update(&self, id: &NoteId, title: &str, content: &str)
        -> Result<Note, TransportError>;
    async fn remove(&self, id: &NoteId) -> Result<(), TransportError>;
}
