use std::fmt;
use std::rc::Rc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tokio::sync::mpsc;
use tokio::task::LocalSet;

use crate::api::{Note, NoteId, NoteSummary, NotesApi, TransportError};

/// Monotonically increasing tag attached to every outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which intent issued a call, used to route the completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Purpose {
    List,
    Select,
    CreateNew,
    Save,
    Delete(NoteId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: RequestId,
    pub purpose: Purpose,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    List {
        query: Option<String>,
    },
    Get {
        id: NoteId,
    },
    Create {
        title: String,
        content: String,
    },
    Update {
        id: NoteId,
        title: String,
        content: String,
    },
    Remove {
        id: NoteId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiReply {
    Notes(Vec<NoteSummary>),
    Note(Note),
    Removed,
}

impl ApiReply {
    pub fn into_notes(self) -> Option<Vec<NoteSummary>> {
        match self {
            ApiReply::Notes(notes) => Some(notes),
            _ => None,
        }
    }

    pub fn into_note(self) -> Option<Note> {
        match self {
            ApiReply::Note(note) => Some(note),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub ticket: Ticket,
    pub call: ApiCall,
}

impl Outbound {
    pub fn resolve(&self, result: Result<ApiReply, TransportError>) -> Completion {
        Completion {
            ticket: self.ticket.clone(),
            result,
        }
    }

    pub async fn execute<A: NotesApi>(self, api: &A) -> Completion {
        let result = match &self.call {
            ApiCall::List { query } => api.list(query.as_deref()).await.map(ApiReply::Notes),
            ApiCall::Get { id } => api.get(id).await.map(ApiReply::Note),
            ApiCall::Create { title, content } => {
                api.create(title, content).await.map(ApiReply::Note)
            }
            ApiCall::Update { id, title, content } => {
                api.update(id, title, content).await.map(ApiReply::Note)
            }
            ApiCall::Remove { id } => api.remove(id).await.map(|()| ApiReply::Removed),
        };
        Completion {
            ticket: self.ticket,
            result,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub ticket: Ticket,
    pub result: Result<ApiReply, TransportError>,
}

/// Runs outbound calls on a single-threaded cooperative runtime owned by one
/// background thread. Calls overlap and may finish in any order; completions
/// are handed back to the UI thread through a channel.
pub struct ActionDispatcher {
    requests: Option<mpsc::UnboundedSender<Outbound>>,
    completions: Receiver<Completion>,
    worker: Option<JoinHandle<()>>,
}

impl ActionDispatcher {
    pub fn spawn<A>(api: A) -> Result<Self>
    where
        A: NotesApi + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::unbounded_channel::<Outbound>();
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<Completion>();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("building network runtime")?;
        let worker = thread::Builder::new()
            .name("notes-io".into())
            .spawn(move || {
                let local = LocalSet::new();
                local.block_on(&runtime, pump(api, request_rx, done_tx));
                tracing::debug!("network runtime stopped");
            })
            .context("spawning network thread")?;
        Ok(Self {
            requests: Some(request_tx),
            completions: done_rx,
            worker: Some(worker),
        })
    }

    pub fn submit(&self, outbound: Outbound) {
        tracing::debug!(request = %outbound.ticket.id, call = ?outbound.call, "dispatching");
        let Some(requests) = &self.requests else {
            return;
        };
        if let Err(err) = requests.send(outbound) {
            tracing::error!(request = %err.0.ticket.id, "network runtime is gone; dropping call");
        }
    }

    pub fn submit_all(&self, outbound: Vec<Outbound>) {
        for item in outbound {
            self.submit(item);
        }
    }

    pub fn try_recv(&self) -> Option<Completion> {
        self.completions.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Completion> {
        match self.completions.recv_timeout(timeout) {
            Ok(completion) => Some(completion),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Drop for ActionDispatcher {
    fn drop(&mut self) {
        // closing the request channel ends the pump loop
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("network thread panicked");
            }
        }
    }
}

async fn pump<A: NotesApi + 'static>(
    api: A,
    mut requests: mpsc::UnboundedReceiver<Outbound>,
    done: Sender<Completion>,
) {
    let api = Rc::new(api);
    while let Some(outbound) = requests.recv().await {
        let api = Rc::clone(&api);
        let done = done.clone();
        tokio::task::spawn_local(async move {
            let completion = outbound.execute(&*api).await;
            if done.send(completion).is_err() {
                tracing::debug!("completion receiver dropped");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    use crate::api::memory::MemoryApi;

    fn outbound(id: u64, purpose: Purpose, call: ApiCall) -> Outbound {
        Outbound {
            ticket: Ticket {
                id: RequestId(id),
                purpose,
            },
            call,
        }
    }

    #[test]
    fn dispatcher_executes_calls_and_returns_tagged_completions() {
        let dispatcher = ActionDispatcher::spawn(MemoryApi::default()).expect("dispatcher");
        dispatcher.submit(outbound(
            1,
            Purpose::CreateNew,
            ApiCall::Create {
                title: "Untitled".into(),
                content: String::new(),
            },
        ));
        let created = dispatcher
            .recv_timeout(Duration::from_secs(5))
            .expect("create completion");
        assert_eq!(created.ticket.id, RequestId(1));
        assert_matches!(created.result, Ok(ApiReply::Note(ref note)) if note.title == "Untitled");

        dispatcher.submit(outbound(2, Purpose::List, ApiCall::List { query: None }));
        let listed = dispatcher
            .recv_timeout(Duration::from_secs(5))
            .expect("list completion");
        assert_eq!(listed.ticket.purpose, Purpose::List);
        assert_matches!(listed.result, Ok(ApiReply::Notes(ref notes)) if notes.len() == 1);
    }

    #[test]
    fn dispatcher_reports_transport_failures() {
        let dispatcher = ActionDispatcher::spawn(MemoryApi::default()).expect("dispatcher");
        dispatcher.submit(outbound(
            5,
            Purpose::Select,
            ApiCall::Get {
                id: NoteId::Int(42),
            },
        ));
        let completion = dispatcher
            .recv_timeout(Duration::from_secs(5))
            .expect("get completion");
        assert_matches!(completion.result, Err(ref err) if err.is_not_found());
    }

    #[test]
    fn reply_accessors_reject_mismatched_shapes() {
        assert!(ApiReply::Removed.into_note().is_none());
        assert!(ApiReply::Notes(Vec::new()).into_note().is_none());
        assert_eq!(ApiReply::Notes(Vec::new()).into_notes(), Some(Vec::new()));
    }
}
