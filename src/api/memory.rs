use std::sync::Mutex;

use reqwest::Method;

use super::{Note, NoteId, NoteSummary, NotesApi, TransportError};

/// In-process `NotesApi` with sequential integer ids and substring search.
#[derive(Debug, Default)]
pub struct MemoryApi {
    notes: Mutex<Vec<Note>>,
    next_id: Mutex<i64>,
}

impl MemoryApi {
    pub fn with_notes(notes: &[(&str, &str)]) -> Self {
        let api = Self::default();
        for (title, content) in notes {
            api.insert(title, content);
        }
        api
    }

    pub fn snapshot(&self) -> Vec<Note> {
        self.notes.lock().unwrap().clone()
    }

    fn insert(&self, title: &str, content: &str) -> Note {
        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        let note = Note {
            id: NoteId::Int(*next_id),
            title: title.into(),
            content: content.into(),
        };
        self.notes.lock().unwrap().push(note.clone());
        note
    }

    fn missing(method: Method, id: &NoteId) -> TransportError {
        TransportError::Status {
            method,
            url: format!("memory://notes/{id}"),
            status: 404,
        }
    }
}

impl NotesApi for MemoryApi {
    async fn list(&self, query: Option<&str>) -> Result<Vec<NoteSummary>, TransportError> {
        let needle = query.unwrap_or_default().to_lowercase();
        Ok(self
            .notes
            .lock()
            .unwrap()
            .iter()
            .filter(|note| {
                note.title.to_lowercase().contains(&needle)
                    || note.content.to_lowercase().contains(&needle)
            })
            .cloned()
            .map(NoteSummary::from)
            .collect())
    }

    async fn get(&self, id: &NoteId) -> Result<Note, TransportError> {
        self.notes
            .lock()
            .unwrap()
            .iter()
            .find(|note| &note.id == id)
            .cloned()
            .ok_or_else(|| Self::missing(Method::GET, id))
    }

    async fn create(&self, title: &str, content: &str) -> Result<Note, TransportError> {
        Ok(self.insert(title, content))
    }

    async fn update(
        &self,
        id: &NoteId,
        title: &str,
        content: &str,
    ) -> Result<Note, TransportError> {
        let mut notes = self.notes.lock().unwrap();
        let note = notes
            .iter_mut()
            .find(|note| &note.id == id)
            .ok_or_else(|| Self::missing(Method::PUT, id))?;
        note.title = title.into();
        note.content = content.into();
        Ok(note.clone())
    }

    async fn remove(&self, id: &NoteId) -> Result<(), TransportError> {
        let mut notes = self.notes.lock().unwrap();
        let before = notes.len();
        notes.retain(|note| &note.id != id);
        if notes.len() == before {
            return Err(Self::missing(Method::DELETE, id));
        }
        Ok(())
    }
}
