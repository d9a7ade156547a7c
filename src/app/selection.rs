use strum::{Display, IntoStaticStr};

use crate::api::{Note, NoteId, TransportError};

use super::actions::{ApiCall, RequestId};
use super::draft::Draft;

/// Named states of the selection machine, derived from the fields below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum SelectionPhase {
    Idle,
    #[strum(serialize = "Loading")]
    LoadingSelection,
    Viewing,
    Editing,
    Saving,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    Stale,
    Failed(TransportError),
}

/// Which note is active, whether it is being edited, and the unsaved draft.
///
/// `selected_note`, when present, always has `selected_id` as its id.
///
/// Fetches and mutations are tracked apart: a create or delete never
/// supersedes the `get` of the note being loaded, while a new selection
/// supersedes both. Only the latest of each kind may change the selection.
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    selected_id: Option<NoteId>,
    selected_note: Option<Note>,
    draft: Option<Draft>,
    fetch: Option<RequestId>,
    mutation: Option<RequestId>,
    saving: Option<RequestId>,
}

impl SelectionController {
    pub fn selected_id(&self) -> Option<&NoteId> {
        self.selected_id.as_ref()
    }

    pub fn selected_note(&self) -> Option<&Note> {
        self.selected_note.as_ref()
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    /// The draft is frozen while a save is in flight.
    pub fn draft_mut(&mut self) -> Option<&mut Draft> {
        if self.saving.is_some() {
            return None;
        }
        self.draft.as_mut()
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    pub fn is_latest_fetch(&self, request: RequestId) -> bool {
        self.fetch == Some(request)
    }

    pub fn is_latest_mutation(&self, request: RequestId) -> bool {
        self.mutation == Some(request)
    }

    pub fn phase(&self) -> SelectionPhase {
        if self.saving.is_some() {
            SelectionPhase::Saving
        } else if self.draft.is_some() {
            SelectionPhase::Editing
        } else if self.selected_note.is_some() {
            SelectionPhase::Viewing
        } else if self.selected_id.is_some() {
            SelectionPhase::LoadingSelection
        } else {
            SelectionPhase::Idle
        }
    }

    pub fn select(&mut self, id: NoteId, request: RequestId) -> ApiCall {
        self.selected_id = Some(id.clone());
        self.selected_note = None;
        self.draft = None;
        self.saving = None;
        self.fetch = Some(request);
        self.mutation = None;
        ApiCall::Get { id }
    }

    pub fn deselect(&mut self) {
        self.selected_id = None;
        self.selected_note = None;
        self.draft = None;
        self.saving = None;
        self.fetch = None;
        self.mutation = None;
    }

    pub fn begin_edit(&mut self) -> bool {
        match self.phase() {
            SelectionPhase::Viewing => {
                self.draft = self.selected_note.as_ref().map(Draft::from_note);
                true
            }
            SelectionPhase::Idle => {
                self.draft = Some(Draft::blank());
                true
            }
            _ => false,
        }
    }

    pub fn cancel_edit(&mut self) -> bool {
        if self.phase() != SelectionPhase::Editing {
            return false;
        }
        self.draft = None;
        true
    }

    /// Creates when the draft has never been persisted, updates otherwise.
    pub fn save(&mut self, request: RequestId) -> Option<ApiCall> {
        if self.phase() != SelectionPhase::Editing {
            return None;
        }
        let draft = self.draft.as_ref()?;
        let title = draft.title().to_string();
        let content = draft.content().to_string();
        let call = match draft.note_id() {
            None => ApiCall::Create { title, content },
            Some(id) => ApiCall::Update {
                id: id.clone(),
                title,
                content,
            },
        };
        self.saving = Some(request);
        self.mutation = Some(request);
        Some(call)
    }

    pub fn create_blank(&mut self, title: &str, request: RequestId) -> ApiCall {
        self.mutation = Some(request);
        ApiCall::Create {
            title: title.to_string(),
            content: String::new(),
        }
    }

    pub fn delete(&mut self, id: NoteId, request: RequestId) -> ApiCall {
        self.mutation = Some(request);
        ApiCall::Remove { id }
    }

    pub fn apply_fetch(
        &mut self,
        request: RequestId,
        result: Result<Note, TransportError>,
    ) -> FetchOutcome {
        if !self.is_latest_fetch(request) {
            return FetchOutcome::Stale;
        }
        self.fetch = None;
        match result {
            Ok(note) => {
                self.selected_id = Some(note.id.clone());
                self.selected_note = Some(note);
                self.draft = None;
                FetchOutcome::Applied
            }
            Err(err) => {
                self.selected_id = None;
                self.selected_note = None;
                self.draft = None;
                FetchOutcome::Failed(err)
            }
        }
    }

    pub fn saved(&mut self, note: Note) {
        self.selected_id = Some(note.id.clone());
        self.selected_note = Some(note);
        self.draft = None;
        self.saving = None;
        self.mutation = None;
    }

    pub fn save_failed(&mut self) {
        self.saving = None;
        self.mutation = None;
    }

    /// Marks the latest mutation as finished without touching the selection.
    pub fn settle(&mut self, request: RequestId) {
        if self.is_latest_mutation(request) {
            self.mutation = None;
        }
    }
}
