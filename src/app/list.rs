use crate::api::{NoteSummary, TransportError};

use super::actions::{ApiCall, RequestId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOutcome {
    Applied,
    Stale,
    Failed(TransportError),
}

/// Owns the search query and the summaries from the last applied list fetch.
#[derive(Debug, Clone, Default)]
pub struct ListController {
    query: String,
    summaries: Vec<NoteSummary>,
    latest: Option<RequestId>,
}

impl ListController {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn summaries(&self) -> &[NoteSummary] {
        &self.summaries
    }

    pub fn is_pending(&self) -> bool {
        self.latest.is_some()
    }

    pub fn set_query(&mut self, query: impl Into<String>, request: RequestId) -> ApiCall {
        self.query = query.into();
        self.refresh(request)
    }

    pub fn refresh(&mut self, request: RequestId) -> ApiCall {
        self.latest = Some(request);
        let query = if self.query.trim().is_empty() {
            None
        } else {
            Some(self.query.clone())
        };
        ApiCall::List { query }
    }

    pub fn apply(
        &mut self,
        request: RequestId,
        result: Result<Vec<NoteSummary>, TransportError>,
    ) -> ListOutcome {
        if self.latest != Some(request) {
            return ListOutcome::Stale;
        }
        self.latest = None;
        match result {
            Ok(summaries) => {
                self.summaries = summaries;
                ListOutcome::Applied
            }
            // previous summaries stay on screen
            Err(err) => ListOutcome::Failed(err),
        }
    }
}
