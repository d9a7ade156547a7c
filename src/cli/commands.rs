use std::fmt::Write as _;
use std::future::Future;
use std::io::{self, Read, Write};

use anyhow::{bail, Context, Result};
use clap::Args;

use crate::api::{HttpNotesApi, Note, NoteId, NoteSummary, NotesApi};
use crate::app::{
    App, CREATE_FAILED, DELETE_FAILED, LOAD_NOTES_FAILED, LOAD_NOTE_FAILED, NEW_NOTE_TITLE,
    SAVE_FAILED,
};
use crate::config::AppConfig;
use crate::ui::{display_title, snippet, DELETE_PROMPT, EMPTY_LIST};

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Search query; words are joined with spaces and sent as one query
    #[arg()]
    pub query: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Note identifier
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct NewArgs {
    /// Title for the note (prompted if omitted)
    #[arg()]
    pub title: Option<String>,
    /// Provide the note content inline. If omitted, reads from stdin when piped.
    #[arg(long)]
    pub content: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Note identifier
    pub id: String,
    /// Replacement title
    #[arg(long)]
    pub title: Option<String>,
    /// Replacement content
    #[arg(long)]
    pub content: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Note identifier
    pub id: String,
    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub yes: bool,
}

pub fn run_tui(app: &mut App) -> Result<()> {
    app.run()
}

pub fn list_notes(config: &AppConfig, args: ListArgs) -> Result<()> {
    let api = connect(config)?;
    let query = args.query.join(" ");
    let output = block_on(render_listing(&api, &query, config.ui.snippet_chars))?;
    print!("{output}");
    Ok(())
}

pub fn show_note(config: &AppConfig, args: ShowArgs) -> Result<()> {
    let api = connect(config)?;
    let id = NoteId::from(args.id.as_str());
    let output = block_on(render_note(&api, &id))?;
    print!("{output}");
    Ok(())
}

pub fn new_note(config: &AppConfig, args: NewArgs) -> Result<()> {
    let title = match args.title {
        Some(t) => t,
        None => prompt("Title")?,
    };
    let content = match args.content {
        Some(content) => content,
        None => read_stdin()?.unwrap_or_default(),
    };
    let api = connect(config)?;
    let note = block_on(create_note(&api, &title, &content))?;
    println!("Created note #{}", note.id);
    Ok(())
}

pub fn edit_note(config: &AppConfig, args: EditArgs) -> Result<()> {
    if args.title.is_none() && args.content.is_none() {
        bail!("nothing to change: pass --title and/or --content");
    }
    let api = connect(config)?;
    let id = NoteId::from(args.id.as_str());
    let note = block_on(apply_edit(&api, &id, args.title, args.content))?;
    println!("Updated note #{}  {}", note.id, display_title(&note.title));
    Ok(())
}

pub fn delete_note(config: &AppConfig, args: DeleteArgs) -> Result<()> {
    let id = NoteId::from(args.id.as_str());
    if !args.yes && !is_confirmation(&confirm(DELETE_PROMPT)?) {
        println!("Aborted.");
        return Ok(());
    }
    let api = connect(config)?;
    block_on(remove_note(&api, &id))?;
    println!("Deleted note #{id}");
    Ok(())
}

fn connect(config: &AppConfig) -> Result<HttpNotesApi> {
    HttpNotesApi::new(&config.api.base_url)
        .with_context(|| format!("preparing client for {}", config.api.base_url))
}

fn block_on<T>(future: impl Future<Output = Result<T>>) -> Result<T> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building network runtime")?;
    runtime.block_on(future)
}

async fn render_listing<A: NotesApi>(api: &A, query: &str, snippet_chars: usize) -> Result<String> {
    let query = Some(query).filter(|q| !q.trim().is_empty());
    let notes = api.list(query).await.context(LOAD_NOTES_FAILED)?;
    Ok(format_summaries(&notes, snippet_chars))
}

async fn render_note<A: NotesApi>(api: &A, id: &NoteId) -> Result<String> {
    let note = api.get(id).await.context(LOAD_NOTE_FAILED)?;
    Ok(format_note(&note))
}

async fn create_note<A: NotesApi>(api: &A, title: &str, content: &str) -> Result<Note> {
    let title = match title.trim() {
        "" => NEW_NOTE_TITLE,
        trimmed => trimmed,
    };
    let note = api.create(title, content).await.context(CREATE_FAILED)?;
    tracing::info!(note = %note.id, "note created");
    Ok(note)
}

/// Fetches the note so that fields left out keep their current value; the
/// update always carries both.
async fn apply_edit<A: NotesApi>(
    api: &A,
    id: &NoteId,
    title: Option<String>,
    content: Option<String>,
) -> Result<Note> {
    let current = api.get(id).await.context(LOAD_NOTE_FAILED)?;
    let title = title.unwrap_or(current.title);
    let content = content.unwrap_or(current.content);
    let note = api
        .update(id, &title, &content)
        .await
        .context(SAVE_FAILED)?;
    tracing::info!(note = %note.id, "note updated");
    Ok(note)
}

async fn remove_note<A: NotesApi>(api: &A, id: &NoteId) -> Result<()> {
    api.remove(id).await.context(DELETE_FAILED)?;
    tracing::info!(note = %id, "note deleted");
    Ok(())
}

fn format_summaries(notes: &[NoteSummary], snippet_chars: usize) -> String {
    if notes.is_empty() {
        return format!("{EMPTY_LIST}\n");
    }
    let mut out = String::new();
    for note in notes {
        let _ = writeln!(&mut out, "#{}  {}", note.id, display_title(&note.title));
        let preview = snippet(&note.content, snippet_chars);
        if !preview.is_empty() {
            let _ = writeln!(&mut out, "    {preview}");
        }
    }
    out
}

fn format_note(note: &Note) -> String {
    let mut out = format!("#{}  {}\n", note.id, display_title(&note.title));
    if !note.content.is_empty() {
        out.push('\n');
        out.push_str(&note.content);
        if !note.content.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn prompt(label: &str) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end().to_owned())
}

fn confirm(question: &str) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{question} [y/N] ")?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input)
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}
