use std::collections::BTreeMap;

use time::OffsetDateTime;

use crate::api::{Note, NoteId, NoteSummary, TransportError};

use super::actions::{ApiCall, ApiReply, Completion, Outbound, Purpose, RequestId, Ticket};
use super::draft::Draft;
use super::list::{ListController, ListOutcome};
use super::selection::{FetchOutcome, SelectionController, SelectionPhase};

pub const LOAD_NOTES_FAILED: &str = "Could not load notes.";
pub const LOAD_NOTE_FAILED: &str = "Could not load note.";
pub const CREATE_FAILED: &str = "Could not create note.";
pub const SAVE_FAILED: &str = "Could not save note.";
pub const DELETE_FAILED: &str = "Could not delete note.";

pub const NEW_NOTE_TITLE: &str = "Untitled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lane {
    List,
    Fetch,
    Mutation,
}

/// Owns the client-side view of the remote collection and composes the list
/// and selection controllers.
///
/// Intents never perform I/O: they queue [`Outbound`] calls that the caller
/// drains with [`NotesSession::take_outbound`], and results come back through
/// [`NotesSession::apply`]. Responses to anything but a lane's most recent
/// request never change the list or the selection.
#[derive(Debug, Default)]
pub struct NotesSession {
    list: ListController,
    selection: SelectionController,
    error_message: Option<String>,
    in_flight: BTreeMap<RequestId, Lane>,
    pending_delete: Option<NoteId>,
    next_request: u64,
    outbox: Vec<Outbound>,
    last_synced: Option<OffsetDateTime>,
}

impl NotesSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        self.list.query()
    }

    pub fn summaries(&self) -> &[NoteSummary] {
        self.list.summaries()
    }

    pub fn is_list_pending(&self) -> bool {
        self.list.is_pending()
    }

    pub fn selected_id(&self) -> Option<&NoteId> {
        self.selection.selected_id()
    }

    pub fn selected_note(&self) -> Option<&Note> {
        self.selection.selected_note()
    }

    pub fn is_editing(&self) -> bool {
        self.selection.is_editing()
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.selection.draft()
    }

    pub fn draft_mut(&mut self) -> Option<&mut Draft> {
        self.selection.draft_mut()
    }

    pub fn phase(&self) -> SelectionPhase {
        self.selection.phase()
    }

    pub fn is_loading(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn pending_delete(&self) -> Option<&NoteId> {
        self.pending_delete.as_ref()
    }

    pub fn last_synced(&self) -> Option<OffsetDateTime> {
        self.last_synced
    }

    pub fn take_outbound(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        let request = self.next_id(Lane::List);
        let call = self.list.set_query(query, request);
        self.enqueue(request, Lane::List, Purpose::List, call);
    }

    pub fn refresh(&mut self) {
        let request = self.next_id(Lane::List);
        let call = self.list.refresh(request);
        self.enqueue(request, Lane::List, Purpose::List, call);
    }

    /// `None` deselects without a network call.
    pub fn select(&mut self, id: Option<NoteId>) {
        match id {
            Some(id) => {
                self.supersede(Lane::Mutation);
                let request = self.next_id(Lane::Fetch);
                let call = self.selection.select(id, request);
                self.enqueue(request, Lane::Fetch, Purpose::Select, call);
            }
            None => {
                self.supersede(Lane::Fetch);
                self.supersede(Lane::Mutation);
                self.selection.deselect();
            }
        }
    }

    /// Persists an empty note right away and selects it once created.
    pub fn create_new(&mut self) {
        let request = self.next_id(Lane::Mutation);
        let call = self.selection.create_blank(NEW_NOTE_TITLE, request);
        self.enqueue(request, Lane::Mutation, Purpose::CreateNew, call);
    }

    pub fn begin_edit(&mut self) -> bool {
        self.selection.begin_edit()
    }

    pub fn cancel_edit(&mut self) -> bool {
        self.selection.cancel_edit()
    }

    pub fn save(&mut self) -> bool {
        if self.selection.phase() != SelectionPhase::Editing {
            return false;
        }
        let request = self.next_id(Lane::Mutation);
        match self.selection.save(request) {
            Some(call) => {
                self.enqueue(request, Lane::Mutation, Purpose::Save, call);
                true
            }
            None => false,
        }
    }

    /// Opens the confirmation gate; nothing is sent until it is resolved.
    pub fn request_delete(&mut self, id: NoteId) {
        self.pending_delete = Some(id);
    }

    pub fn resolve_delete(&mut self, confirmed: bool) -> bool {
        let Some(id) = self.pending_delete.take() else {
            return false;
        };
        if !confirmed {
            tracing::debug!(note = %id, "delete declined");
            return false;
        }
        let request = self.next_id(Lane::Mutation);
        let call = self.selection.delete(id.clone(), request);
        self.enqueue(request, Lane::Mutation, Purpose::Delete(id), call);
        true
    }

    pub fn apply(&mut self, completion: Completion) {
        let Completion { ticket, result } = completion;
        let Ticket { id: request, purpose } = ticket;
        self.in_flight.remove(&request);
        match purpose {
            Purpose::List => match reshape(result, ApiReply::into_notes) {
                Some(result) => self.on_list_loaded(request, result),
                None => tracing::warn!(%request, "list call answered with the wrong shape"),
            },
            Purpose::Select => match reshape(result, ApiReply::into_note) {
                Some(result) => self.on_note_loaded(request, result),
                None => tracing::warn!(%request, "get call answered with the wrong shape"),
            },
            Purpose::CreateNew => match reshape(result, ApiReply::into_note) {
                Some(result) => self.on_blank_created(request, result),
                None => tracing::warn!(%request, "create call answered with the wrong shape"),
            },
            Purpose::Save => match reshape(result, ApiReply::into_note) {
                Some(result) => self.on_saved(request, result),
                None => tracing::warn!(%request, "save call answered with the wrong shape"),
            },
            Purpose::Delete(id) => self.on_deleted(request, id, result.map(|_| ())),
        }
    }

    fn on_list_loaded(
        &mut self,
        request: RequestId,
        result: Result<Vec<NoteSummary>, TransportError>,
    ) {
        match self.list.apply(request, result) {
            ListOutcome::Applied => {
                self.last_synced = Some(OffsetDateTime::now_utc());
                tracing::debug!(%request, count = self.list.summaries().len(), "notes listed");
            }
            ListOutcome::Stale => {
                tracing::debug!(%request, "discarding superseded list response");
            }
            ListOutcome::Failed(err) => {
                tracing::warn!(%request, error = %err, "listing notes failed");
                self.error_message = Some(LOAD_NOTES_FAILED.into());
            }
        }
    }

    fn on_note_loaded(&mut self, request: RequestId, result: Result<Note, TransportError>) {
        match self.selection.apply_fetch(request, result) {
            FetchOutcome::Applied => {}
            FetchOutcome::Stale => {
                tracing::debug!(%request, "discarding superseded note response");
            }
            FetchOutcome::Failed(err) => {
                let gone = err.is_not_found();
                tracing::warn!(%request, gone, error = %err, "loading note failed");
                self.error_message = Some(LOAD_NOTE_FAILED.into());
            }
        }
    }

    fn on_blank_created(&mut self, request: RequestId, result: Result<Note, TransportError>) {
        match result {
            Ok(note) => {
                tracing::info!(note = %note.id, "note created");
                if self.selection.is_latest_mutation(request) {
                    self.selection.settle(request);
                    self.select(Some(note.id));
                }
                self.refresh();
            }
            Err(err) => {
                tracing::warn!(%request, error = %err, "creating note failed");
                self.selection.settle(request);
                self.error_message = Some(CREATE_FAILED.into());
            }
        }
    }

    fn on_saved(&mut self, request: RequestId, result: Result<Note, TransportError>) {
        let current = self.selection.is_latest_mutation(request);
        match result {
            Ok(note) => {
                tracing::info!(note = %note.id, "note saved");
                if current {
                    self.selection.saved(note);
                }
                self.error_message = None;
                self.refresh();
            }
            Err(err) => {
                tracing::warn!(%request, error = %err, "saving note failed");
                if current {
                    self.selection.save_failed();
                }
                self.error_message = Some(SAVE_FAILED.into());
            }
        }
    }

    fn on_deleted(&mut self, request: RequestId, id: NoteId, result: Result<(), TransportError>) {
        match result {
            Ok(()) => {
                tracing::info!(note = %id, "note deleted");
                if self.selection.selected_id() == Some(&id) {
                    self.supersede(Lane::Fetch);
                    self.selection.deselect();
                } else {
                    self.selection.settle(request);
                }
                self.refresh();
            }
            Err(err) => {
                let gone = err.is_not_found();
                tracing::warn!(%request, note = %id, gone, error = %err, "deleting note failed");
                self.selection.settle(request);
                self.error_message = Some(DELETE_FAILED.into());
            }
        }
    }

    fn next_id(&mut self, lane: Lane) -> RequestId {
        self.next_request += 1;
        self.supersede(lane);
        RequestId(self.next_request)
    }

    fn supersede(&mut self, lane: Lane) {
        self.in_flight.retain(|_, owner| *owner != lane);
    }

    fn enqueue(&mut self, request: RequestId, lane: Lane, purpose: Purpose, call: ApiCall) {
        self.error_message = None;
        self.in_flight.insert(request, lane);
        self.outbox.push(Outbound {
            ticket: Ticket {
                id: request,
                purpose,
            },
            call,
        });
    }
}

fn reshape<T>(
    result: Result<ApiReply, TransportError>,
    extract: fn(ApiReply) -> Option<T>,
) -> Option<Result<T, TransportError>> {
    match result {
        Ok(reply) => extract(reply).map(Ok),
        Err(err) => Some(Err(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn note(id: i64, title: &str, content: &str) -> Note {
        Note {
            id: NoteId::Int(id),
            title: title.into(),
            content: content.into(),
        }
    }

    fn summary(id: i64, title: &str, content: &str) -> NoteSummary {
        NoteSummary::from(note(id, title, content))
    }

    fn offline(url: &str) -> TransportError {
        TransportError::Network {
            url: url.into(),
            message: "connection refused".into(),
        }
    }

    fn single(session: &mut NotesSession) -> Outbound {
        let mut outbound = session.take_outbound();
        assert_eq!(outbound.len(), 1, "expected one call, got {outbound:?}");
        outbound.remove(0)
    }

    /// Session viewing `n`, with no calls pending.
    fn viewing(n: Note) -> NotesSession {
        let mut session = NotesSession::new();
        session.select(Some(n.id.clone()));
        let get = single(&mut session);
        session.apply(get.resolve(Ok(ApiReply::Note(n))));
        session
    }

    fn count_lists(outbound: &[Outbound]) -> usize {
        outbound
            .iter()
            .filter(|o| matches!(o.call, ApiCall::List { .. }))
            .count()
    }

    #[test]
    fn list_then_select_shows_the_full_note() {
        let mut session = NotesSession::new();
        session.refresh();
        let list = single(&mut session);
        assert_eq!(list.call, ApiCall::List { query: None });
        assert!(session.is_loading());
        session.apply(list.resolve(Ok(ApiReply::Notes(vec![summary(1, "A", "x")]))));
        assert!(!session.is_loading());
        assert_eq!(session.summaries(), &[summary(1, "A", "x")]);
        assert!(session.last_synced().is_some());

        session.select(Some(NoteId::Int(1)));
        let get = single(&mut session);
        assert_eq!(get.call, ApiCall::Get { id: NoteId::Int(1) });
        assert_eq!(session.phase(), SelectionPhase::LoadingSelection);
        session.apply(get.resolve(Ok(ApiReply::Note(note(1, "A", "x")))));

        assert_eq!(session.selected_note(), Some(&note(1, "A", "x")));
        assert_eq!(session.selected_id(), Some(&NoteId::Int(1)));
        assert!(!session.is_editing());
        assert_eq!(session.phase(), SelectionPhase::Viewing);
    }

    #[test]
    fn last_issued_query_wins_regardless_of_arrival_order() {
        let mut session = NotesSession::new();
        session.set_query("a");
        session.set_query("ab");
        let calls = session.take_outbound();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1].call,
            ApiCall::List {
                query: Some("ab".into())
            }
        );

        session.apply(calls[1].resolve(Ok(ApiReply::Notes(vec![summary(2, "ab", "")]))));
        session.apply(calls[0].resolve(Ok(ApiReply::Notes(vec![summary(1, "a", "")]))));

        assert_eq!(session.query(), "ab");
        assert_eq!(session.summaries(), &[summary(2, "ab", "")]);
        assert!(!session.is_loading());
    }

    #[test]
    fn superseded_list_failure_does_not_raise_an_error() {
        let mut session = NotesSession::new();
        session.set_query("a");
        session.set_query("ab");
        let calls = session.take_outbound();
        session.apply(calls[0].resolve(Err(offline("http://localhost/notes"))));
        assert_eq!(session.error_message(), None);
        assert!(session.is_loading());
    }

    #[test]
    fn list_failure_keeps_previous_summaries() {
        let mut session = NotesSession::new();
        session.refresh();
        let first = single(&mut session);
        session.apply(first.resolve(Ok(ApiReply::Notes(vec![summary(1, "A", "x")]))));

        session.set_query("zzz");
        let second = single(&mut session);
        session.apply(second.resolve(Err(offline("http://localhost/notes"))));

        assert_eq!(session.summaries(), &[summary(1, "A", "x")]);
        assert_eq!(session.error_message(), Some(LOAD_NOTES_FAILED));
        assert!(!session.is_loading());
    }

    #[test]
    fn deselect_before_fetch_resolves_stays_idle() {
        for outcome in [
            Ok(ApiReply::Note(note(1, "A", "x"))),
            Err(offline("http://localhost/notes/1")),
        ] {
            let mut session = NotesSession::new();
            session.select(Some(NoteId::Int(1)));
            let get = single(&mut session);
            session.select(None);
            assert!(session.take_outbound().is_empty());
            assert!(!session.is_loading());

            session.apply(get.resolve(outcome));
            assert_eq!(session.phase(), SelectionPhase::Idle);
            assert!(session.selected_note().is_none());
            assert_eq!(session.error_message(), None);
        }
    }

    #[test]
    fn rapid_reselect_shows_the_last_choice() {
        let mut session = NotesSession::new();
        session.select(Some(NoteId::Int(1)));
        session.select(Some(NoteId::Int(2)));
        let calls = session.take_outbound();
        session.apply(calls[1].resolve(Ok(ApiReply::Note(note(2, "B", "")))));
        session.apply(calls[0].resolve(Ok(ApiReply::Note(note(1, "A", "")))));
        assert_eq!(session.selected_id(), Some(&NoteId::Int(2)));
        assert_eq!(session.selected_note().map(|n| n.title.as_str()), Some("B"));
    }

    #[test]
    fn failed_select_returns_to_idle_with_message() {
        let mut session = NotesSession::new();
        session.select(Some(NoteId::Int(3)));
        let get = single(&mut session);
        session.apply(get.resolve(Err(TransportError::Status {
            method: reqwest::Method::GET,
            url: "http://localhost/notes/3".into(),
            status: 404,
        })));
        assert_eq!(session.phase(), SelectionPhase::Idle);
        assert!(session.selected_id().is_none());
        assert_eq!(session.error_message(), Some(LOAD_NOTE_FAILED));
        assert!(!session.is_loading());
    }

    #[test]
    fn begin_then_cancel_edit_is_offline_and_lossless() {
        let mut session = viewing(note(1, "A", "x"));
        assert!(session.begin_edit());
        if let Some(draft) = session.draft_mut() {
            draft.set_title("scribble");
        }
        assert!(session.cancel_edit());

        assert!(session.take_outbound().is_empty());
        assert!(!session.is_loading());
        assert_eq!(session.selected_note(), Some(&note(1, "A", "x")));
        assert_eq!(session.phase(), SelectionPhase::Viewing);
    }

    #[test]
    fn saving_a_new_draft_creates_exactly_once() {
        let mut session = NotesSession::new();
        assert!(session.begin_edit());
        if let Some(draft) = session.draft_mut() {
            draft.set_title("Fresh");
            draft.set_content("body");
        }
        assert!(session.save());
        let calls = session.take_outbound();
        assert_eq!(
            calls.iter().map(|o| o.call.clone()).collect::<Vec<_>>(),
            vec![ApiCall::Create {
                title: "Fresh".into(),
                content: "body".into()
            }]
        );
        assert_eq!(session.phase(), SelectionPhase::Saving);
        assert!(!session.save());

        session.apply(calls[0].resolve(Ok(ApiReply::Note(note(5, "Fresh", "body")))));
        assert_eq!(session.selected_id(), Some(&NoteId::Int(5)));
        assert_eq!(session.phase(), SelectionPhase::Viewing);
        let follow_up = session.take_outbound();
        assert_eq!(count_lists(&follow_up), 1);
        assert_eq!(follow_up.len(), 1);
    }

    #[test]
    fn saving_an_existing_note_updates_exactly_once() {
        let mut session = viewing(note(1, "A", "x"));
        session.begin_edit();
        if let Some(draft) = session.draft_mut() {
            draft.set_content("y");
        }
        assert!(session.save());
        let save = single(&mut session);
        assert_eq!(
            save.call,
            ApiCall::Update {
                id: NoteId::Int(1),
                title: "A".into(),
                content: "y".into()
            }
        );

        session.apply(save.resolve(Ok(ApiReply::Note(note(1, "A", "y")))));
        assert_eq!(session.selected_note(), Some(&note(1, "A", "y")));
        assert!(!session.is_editing());
        assert_eq!(session.error_message(), None);
        let follow_up = session.take_outbound();
        assert_eq!(follow_up.len(), 1);
        assert_eq!(count_lists(&follow_up), 1);
    }

    #[test]
    fn failed_update_keeps_editing_with_the_draft() {
        let mut session = viewing(note(1, "A", "x"));
        session.begin_edit();
        if let Some(draft) = session.draft_mut() {
            draft.set_content("unsaved words");
        }
        session.save();
        let save = single(&mut session);
        session.apply(save.resolve(Err(TransportError::Status {
            method: reqwest::Method::PUT,
            url: "http://localhost/notes/1".into(),
            status: 500,
        })));

        assert_eq!(session.phase(), SelectionPhase::Editing);
        assert_eq!(session.draft().map(Draft::content), Some("unsaved words"));
        assert_eq!(session.error_message(), Some(SAVE_FAILED));
        assert!(!session.is_loading());
        assert!(session.take_outbound().is_empty());
    }

    #[test]
    fn create_new_selects_the_created_note_and_refreshes() {
        let mut session = NotesSession::new();
        session.create_new();
        let create = single(&mut session);
        assert_eq!(
            create.call,
            ApiCall::Create {
                title: NEW_NOTE_TITLE.into(),
                content: String::new()
            }
        );

        session.apply(create.resolve(Ok(ApiReply::Note(note(7, "Untitled", "")))));
        assert_eq!(session.selected_id(), Some(&NoteId::Int(7)));
        let follow_up = session.take_outbound();
        assert_eq!(follow_up.len(), 2);
        assert_eq!(follow_up[0].call, ApiCall::Get { id: NoteId::Int(7) });
        assert_eq!(count_lists(&follow_up), 1);

        session.apply(follow_up[1].resolve(Ok(ApiReply::Notes(vec![
            summary(1, "A", "x"),
            summary(7, "Untitled", ""),
        ]))));
        session.apply(follow_up[0].resolve(Ok(ApiReply::Note(note(7, "Untitled", "")))));
        assert!(session
            .summaries()
            .iter()
            .any(|s| s.id == NoteId::Int(7)));
        assert_eq!(session.phase(), SelectionPhase::Viewing);
        assert!(!session.is_loading());
    }

    #[test]
    fn create_new_failure_reports_and_keeps_state() {
        let mut session = viewing(note(1, "A", "x"));
        session.create_new();
        let create = single(&mut session);
        session.apply(create.resolve(Err(offline("http://localhost/notes"))));
        assert_eq!(session.error_message(), Some(CREATE_FAILED));
        assert_eq!(session.selected_note(), Some(&note(1, "A", "x")));
        assert!(session.take_outbound().is_empty());
    }

    #[test]
    fn declined_delete_sends_nothing() {
        let mut session = viewing(note(1, "A", "x"));
        session.request_delete(NoteId::Int(1));
        assert_eq!(session.pending_delete(), Some(&NoteId::Int(1)));
        assert!(!session.resolve_delete(false));

        assert!(session.take_outbound().is_empty());
        assert!(session.pending_delete().is_none());
        assert_eq!(session.selected_note(), Some(&note(1, "A", "x")));
        assert_eq!(session.phase(), SelectionPhase::Viewing);
    }

    #[test]
    fn confirmed_delete_deselects_and_refreshes() {
        let mut session = viewing(note(1, "A", "x"));
        session.request_delete(NoteId::Int(1));
        assert!(session.resolve_delete(true));
        let remove = single(&mut session);
        assert_eq!(remove.call, ApiCall::Remove { id: NoteId::Int(1) });

        session.apply(remove.resolve(Ok(ApiReply::Removed)));
        assert_eq!(session.phase(), SelectionPhase::Idle);
        let follow_up = session.take_outbound();
        assert_eq!(follow_up.len(), 1);
        assert_eq!(count_lists(&follow_up), 1);
    }

    #[test]
    fn failed_delete_keeps_the_selection() {
        let mut session = viewing(note(1, "A", "x"));
        session.request_delete(NoteId::Int(1));
        session.resolve_delete(true);
        let remove = single(&mut session);
        session.apply(remove.resolve(Err(offline("http://localhost/notes/1"))));

        assert_eq!(session.error_message(), Some(DELETE_FAILED));
        assert_eq!(session.selected_note(), Some(&note(1, "A", "x")));
        assert!(session.take_outbound().is_empty());
    }

    #[test]
    fn failed_create_while_loading_still_shows_the_note() {
        let mut session = NotesSession::new();
        session.select(Some(NoteId::Int(1)));
        let get = single(&mut session);
        session.create_new();
        let create = single(&mut session);

        session.apply(create.resolve(Err(offline("http://localhost/notes"))));
        assert_eq!(session.error_message(), Some(CREATE_FAILED));
        assert_eq!(session.phase(), SelectionPhase::LoadingSelection);
        assert!(session.is_loading());

        session.apply(get.resolve(Ok(ApiReply::Note(note(1, "A", "x")))));
        assert_eq!(session.phase(), SelectionPhase::Viewing);
        assert_eq!(session.selected_note(), Some(&note(1, "A", "x")));
        assert!(!session.is_loading());
    }

    #[test]
    fn failed_delete_while_loading_still_shows_the_note() {
        let mut session = NotesSession::new();
        session.select(Some(NoteId::Int(1)));
        let get = single(&mut session);
        session.request_delete(NoteId::Int(1));
        session.resolve_delete(true);
        let remove = single(&mut session);

        session.apply(remove.resolve(Err(offline("http://localhost/notes/1"))));
        assert_eq!(session.error_message(), Some(DELETE_FAILED));
        assert!(session.is_loading());

        session.apply(get.resolve(Ok(ApiReply::Note(note(1, "A", "x")))));
        assert_eq!(session.phase(), SelectionPhase::Viewing);
        assert!(!session.is_loading());
    }

    #[test]
    fn delete_while_loading_discards_the_late_fetch() {
        let mut session = NotesSession::new();
        session.select(Some(NoteId::Int(1)));
        let get = single(&mut session);
        session.request_delete(NoteId::Int(1));
        session.resolve_delete(true);
        let remove = single(&mut session);

        session.apply(remove.resolve(Ok(ApiReply::Removed)));
        assert_eq!(session.phase(), SelectionPhase::Idle);
        let refresh = single(&mut session);
        session.apply(refresh.resolve(Ok(ApiReply::Notes(Vec::new()))));

        session.apply(get.resolve(Ok(ApiReply::Note(note(1, "A", "x")))));
        assert_eq!(session.phase(), SelectionPhase::Idle);
        assert!(!session.is_loading());
    }

    #[test]
    fn superseded_save_still_refreshes_but_keeps_new_selection() {
        let mut session = viewing(note(1, "A", "x"));
        session.begin_edit();
        session.save();
        let save = single(&mut session);
        session.select(Some(NoteId::Int(2)));
        let get = single(&mut session);

        session.apply(save.resolve(Ok(ApiReply::Note(note(1, "A", "x")))));
        assert_eq!(session.selected_id(), Some(&NoteId::Int(2)));
        assert_eq!(session.phase(), SelectionPhase::LoadingSelection);
        assert_eq!(count_lists(&session.take_outbound()), 1);

        session.apply(get.resolve(Ok(ApiReply::Note(note(2, "B", "")))));
        assert_eq!(session.phase(), SelectionPhase::Viewing);
    }

    #[test]
    fn issuing_a_call_clears_the_previous_error() {
        let mut session = NotesSession::new();
        session.refresh();
        let list = single(&mut session);
        session.apply(list.resolve(Err(offline("http://localhost/notes"))));
        assert_eq!(session.error_message(), Some(LOAD_NOTES_FAILED));

        session.refresh();
        assert_eq!(session.error_message(), None);
    }

    #[test]
    fn mismatched_reply_is_ignored() {
        let mut session = NotesSession::new();
        session.refresh();
        let list = single(&mut session);
        session.apply(list.resolve(Ok(ApiReply::Removed)));
        assert!(session.summaries().is_empty());
        assert_matches!(session.error_message(), None);
    }
}
