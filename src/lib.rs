pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod highlight;
pub mod ui;

pub use api::{HttpNotesApi, Note, NoteId, NoteSummary, NotesApi, TransportError};
pub use app::{App, NotesSession};
pub use config::{AppConfig, ConfigLoader, ConfigPaths};
