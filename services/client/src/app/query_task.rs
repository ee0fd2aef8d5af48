//! services/client/src/app/query_task.rs
//!
//! Composes chat queries, sends them to the backend and turns the result into
//! transcript updates. A query is split into `begin_query` (validation, user
//! message, typing indicator) and `complete_query` (reply or failure notice) so
//! the reply can be routed back to the thread that asked, even if the user has
//! switched threads meanwhile.

use crate::app::state::{ChatApp, UploadTarget};
use crate::app::threads::{seed_messages, title_from_text};
use crate::error::AppError;
use docchat_core::domain::{
    HistoryTurn, Message, QueryRequest, QueryResponse, QueryType, Role, ThreadSnapshot,
};
use docchat_core::ports::PortResult;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const SERVER_UNAVAILABLE: &str = "Server unavailable. Please try again later.";
pub const NO_DOCUMENT: &str = "Upload a document first to ask questions about it.";

/// A query that has been sent but not yet answered, tagged with the thread
/// that asked it.
#[derive(Debug, Clone)]
pub struct PendingQuery {
    pub thread_id: Uuid,
    pub request: QueryRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// The reply was appended to the visible transcript.
    Answered,
    /// The asking thread is no longer visible; the reply went to its snapshot.
    Redirected(Uuid),
    /// The asking thread was deleted before the reply arrived.
    Discarded,
    /// Refused locally without contacting the backend.
    Rejected,
    /// The backend failed; only the user's message was added.
    Failed,
    /// Nothing to send (blank input, or a reply is still pending).
    Ignored,
}

/// The last `window` user/bot turns, oldest first. System lines are not
/// conversation and are left out.
pub fn build_history(messages: &[Message], window: usize) -> Vec<HistoryTurn> {
    let turns: Vec<&Message> = messages.iter().filter(|m| m.role != Role::System).collect();
    let start = turns.len().saturating_sub(window);
    turns[start..]
        .iter()
        .map(|m| HistoryTurn {
            role: m.role,
            text: m.text.clone(),
        })
        .collect()
}

fn action_prompt(query_type: QueryType) -> Option<&'static str> {
    match query_type {
        QueryType::Summarize => Some("Summarize this document."),
        QueryType::Quiz => Some("Create a quiz from this document."),
        QueryType::Freeform => None,
    }
}

impl ChatApp {
    /// Sends a freeform message using the current "use document" switch.
    pub async fn send_message(&mut self, text: &str) -> QueryOutcome {
        let use_rag = self.use_rag;
        self.submit_query(text, QueryType::Freeform, use_rag).await
    }

    pub async fn submit_query(
        &mut self,
        text: &str,
        query_type: QueryType,
        use_rag: bool,
    ) -> QueryOutcome {
        let pending = match self.begin_query(text, query_type, use_rag).await {
            Ok(pending) => pending,
            Err(outcome) => return outcome,
        };

        let backend = self.backend.clone();
        let response = backend.query(&pending.request).await;

        // Keep the typing indicator up long enough to be seen.
        if response.is_ok() && !self.settings.typing_delay.is_zero() {
            tokio::time::sleep(self.settings.typing_delay).await;
        }

        self.complete_query(pending, response).await
    }

    /// Validates the input, appends the user's message and builds the request.
    /// `Err` carries the outcome for queries that never leave the client.
    pub async fn begin_query(
        &mut self,
        text: &str,
        query_type: QueryType,
        use_rag: bool,
    ) -> Result<PendingQuery, QueryOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(QueryOutcome::Ignored);
        }
        if self.awaiting_reply.is_some() {
            self.notices.info(AppError::Busy.to_string());
            return Err(QueryOutcome::Ignored);
        }
        if use_rag && self.target.is_none() {
            info!("Rejected a document query: no document uploaded");
            self.notices.info(NO_DOCUMENT);
            return Err(QueryOutcome::Rejected);
        }

        let thread_id = match self.threads.active_id() {
            Some(id) => id,
            None => self.create_thread(title_from_text(text)).await,
        };

        let history = build_history(&self.messages, self.settings.history_window);
        let retrieval = self.retrieval_target();
        if use_rag && retrieval.is_none() {
            warn!("Every document is disabled; sending the query without retrieval");
            self.notices
                .info("All documents are disabled, answering without them.");
        }
        let addressed = retrieval.clone().or_else(|| self.target.clone());

        let request = QueryRequest {
            file_id: addressed.as_ref().map(|t| t.file_id.clone()),
            filename: addressed.as_ref().map(|t| t.filename.clone()),
            query: text.to_string(),
            query_type,
            use_rag: use_rag && retrieval.is_some(),
            history,
        };

        self.messages.push(Message::user(text));
        self.awaiting_reply = Some(thread_id);
        self.persist_active().await;

        info!(
            "Query sent from thread {} (type={}, use_rag={})",
            thread_id, request.query_type, request.use_rag
        );
        Ok(PendingQuery { thread_id, request })
    }

    /// Applies the backend's answer (or failure) to the thread that asked.
    pub async fn complete_query(
        &mut self,
        pending: PendingQuery,
        response: PortResult<QueryResponse>,
    ) -> QueryOutcome {
        if self.awaiting_reply == Some(pending.thread_id) {
            self.awaiting_reply = None;
        }

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                error!("Query from thread {} failed: {}", pending.thread_id, e);
                self.notices.error(SERVER_UNAVAILABLE);
                return QueryOutcome::Failed;
            }
        };

        let reply = Message::bot(response.answer, response.sources.unwrap_or_default());

        if self.threads.active_id() == Some(pending.thread_id) {
            self.messages.push(reply);
            self.persist_active().await;
            return QueryOutcome::Answered;
        }

        let Some(title) = self.threads.get(pending.thread_id).map(|t| t.title.clone()) else {
            warn!(
                "Dropping reply for deleted thread {}",
                pending.thread_id
            );
            return QueryOutcome::Discarded;
        };

        match self.store.load_snapshot(pending.thread_id).await {
            Ok(snapshot) => {
                let mut snapshot = snapshot.unwrap_or_else(|| ThreadSnapshot {
                    messages: seed_messages(),
                    sources: self.sources.sources().to_vec(),
                });
                snapshot.messages.push(reply);
                if let Err(e) = self.store.save_snapshot(pending.thread_id, &snapshot).await {
                    self.storage_failed(e);
                    return QueryOutcome::Discarded;
                }
                info!("Reply for thread {} stored in the background", pending.thread_id);
                self.notices.info(format!("New reply in \"{}\"", title));
                QueryOutcome::Redirected(pending.thread_id)
            }
            Err(e) => {
                self.storage_failed(e);
                QueryOutcome::Discarded
            }
        }
    }

    /// Runs one of the backend's recommended actions (`summarize`, `quiz`)
    /// against the uploaded document and hides the banner.
    pub async fn run_recommended_action(&mut self, action: &str) -> QueryOutcome {
        let prompt = action.parse::<QueryType>().ok().and_then(|query_type| {
            action_prompt(query_type).map(|prompt| (query_type, prompt))
        });
        let Some((query_type, prompt)) = prompt else {
            self.notices.info(format!("Unknown action '{}'", action));
            return QueryOutcome::Ignored;
        };
        self.recommended.clear();
        self.submit_query(prompt, query_type, true).await
    }

    /// The enabled document a retrieval query should use: the upload target
    /// while it is enabled, otherwise the newest enabled source.
    fn retrieval_target(&self) -> Option<UploadTarget> {
        if let Some(target) = &self.target {
            if self.sources.is_enabled(&target.file_id) {
                return Some(target.clone());
            }
        }
        self.sources.latest_enabled().map(UploadTarget::from)
    }
}
