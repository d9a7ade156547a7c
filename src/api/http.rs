use anyhow::{bail, Context, Result};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use url::Url;

use super::{Note, NoteId, NotePayload, NoteSummary, NotesApi, TransportError};

/// `NotesApi` over HTTP/JSON. Every call is a single round trip; there are no
/// retries and no timeouts beyond reqwest's defaults.
#[derive(Debug, Clone)]
pub struct HttpNotesApi {
    client: Client,
    base: Url,
}

impl HttpNotesApi {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = parse_base_url(base_url)?;
        let client = Client::builder()
            .user_agent(concat!("notes-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn notes_url(&self, id: Option<&NoteId>) -> Url {
        let mut url = self.base.clone();
        // parse_base_url rejects cannot-be-a-base URLs, so segments are always available
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("notes");
            if let Some(id) = id {
                segments.push(&id.to_string());
            }
        }
        url
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<NotePayload<'_>>,
    ) -> Result<Response, TransportError> {
        let target = url.to_string();
        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .map_err(|err| TransportError::Network {
                url: target.clone(),
                message: err.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                method,
                url: target,
                status: status.as_u16(),
            });
        }
        tracing::trace!(method = method.as_str(), url = %target, status = status.as_u16(), "request completed");
        Ok(response)
    }
}

impl NotesApi for HttpNotesApi {
    async fn list(&self, query: Option<&str>) -> Result<Vec<NoteSummary>, TransportError> {
        let mut url = self.notes_url(None);
        if let Some(query) = query.filter(|q| !q.trim().is_empty()) {
            url.query_pairs_mut().append_pair("search", query);
        }
        let response = self.send(Method::GET, url, None).await?;
        decode(response).await
    }

    async fn get(&self, id: &NoteId) -> Result<Note, TransportError> {
        let response = self
            .send(Method::GET, self.notes_url(Some(id)), None)
            .await?;
        decode(response).await
    }

    async fn create(&self, title: &str, content: &str) -> Result<Note, TransportError> {
        let body = NotePayload { title, content };
        let response = self
            .send(Method::POST, self.notes_url(None), Some(body))
            .await?;
        decode(response).await
    }

    async fn update(
        &self,
        id: &NoteId,
        title: &str,
        content: &str,
    ) -> Result<Note, TransportError> {
        let body = NotePayload { title, content };
        let response = self
            .send(Method::PUT, self.notes_url(Some(id)), Some(body))
            .await?;
        decode(response).await
    }

    async fn remove(&self, id: &NoteId) -> Result<(), TransportError> {
        self.send(Method::DELETE, self.notes_url(Some(id)), None)
            .await?;
        Ok(())
    }
}

/// Validates a configured base endpoint. Only absolute http(s) URLs are
/// accepted since `notes` is appended as a path segment.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).with_context(|| format!("parsing API base URL '{trimmed}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("API base URL '{trimmed}' must use http or https");
    }
    if url.cannot_be_a_base() {
        bail!("API base URL '{trimmed}' cannot carry a path");
    }
    Ok(url)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let url = response.url().to_string();
    response
        .json::<T>()
        .await
        .map_err(|err| TransportError::Decode {
            url,
            message: err.to_string(),
        })
}
