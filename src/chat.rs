//! Conversation sequencer for the assistant chat.
//!
//! One operator message may be outstanding at a time. The operator's turn is
//! appended as soon as it is submitted; the assistant's turn is appended when
//! the reply is applied in [`ChatSession::poll_background_jobs`].

use std::sync::Arc;
use std::sync::mpsc::TryRecvError;

use time::OffsetDateTime;

use crate::gateway::{GatewayError, HealthBackend};
use crate::jobs::{JobQueue, JobSpawner, RequestToken, TokenSource};
use crate::model::{ChatReply, TurnEntry};

mod transcript;


pub use transcript::Transcript;

/// Whether an assistant reply is outstanding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    AwaitingReply(RequestToken),
}

/// Why a message was not sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejected {
    #[error("Still waiting for the previous reply")]
    Busy,
    #[error("Message is empty")]
    Empty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HistoryState {
    NotLoaded,
    Loading(RequestToken),
    Loaded,
    Failed,
}

struct Completed<T> {
    token: RequestToken,
    result: Result<T, GatewayError>,
}

enum ChatJob {
    HistoryLoaded(Completed<Vec<TurnEntry>>),
    ReplyReceived(Completed<ChatReply>),
}

/// Operator/assistant transcript with at most one request in flight.
pub struct ChatSession {
    backend: Arc<dyn HealthBackend>,
    jobs: JobQueue<ChatJob>,
    tokens: TokenSource,
    transcript: Transcript,
    state: ChatState,
    history: HistoryState,
    last_error: Option<GatewayError>,
}

impl ChatSession {
    pub fn new(backend: Arc<dyn HealthBackend>, spawner: Arc<dyn JobSpawner>) -> Self {
        Self {
            backend,
            jobs: JobQueue::new(spawner),
            tokens: TokenSource::default(),
            transcript: Transcript::default(),
            state: ChatState::Idle,
            history: HistoryState::NotLoaded,
            last_error: None,
        }
    }

    /// Fetch the stored transcript. Runs once per session; a failed load may be retried.
    pub fn load_history(&mut self) -> Option<RequestToken> {
        match self.history {
            HistoryState::Loading(_) | HistoryState::Loaded => return None,
            HistoryState::NotLoaded | HistoryState::Failed => {}
        }
        let token = self.tokens.next();
        self.history = HistoryState::Loading(token);
        let backend = Arc::clone(&self.backend);
        self.jobs.begin(move || {
            ChatJob::HistoryLoaded(Completed {
                token,
                result: backend.fetch_chat_history(),
            })
        });
        Some(token)
    }

    /// Append the operator's turn and ask the assistant for a reply.
    pub fn submit(&mut self, text: &str) -> Result<RequestToken, SubmitRejected> {
        if self.is_pending() {
            return Err(SubmitRejected::Busy);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(SubmitRejected::Empty);
        }
        self.transcript
            .push(TurnEntry::operator(text, OffsetDateTime::now_utc()));
        let token = self.tokens.next();
        self.state = ChatState::AwaitingReply(token);
        self.last_error = None;
        tracing::debug!("Sending chat message {token} ({} chars)", text.len());
        let backend = Arc::clone(&self.backend);
        let message = text.to_string();
        self.jobs.begin(move || {
            ChatJob::ReplyReceived(Completed {
                token,
                result: backend.send_chat_message(&message),
            })
        });
        Ok(token)
    }

    /// Apply completed requests. Returns how many were handled.
    pub fn poll_background_jobs(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let job = match self.jobs.try_recv_message() {
                Ok(job) => job,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            };
            handled += 1;
            match job {
                ChatJob::HistoryLoaded(done) => self.apply_history(done),
                ChatJob::ReplyReceived(done) => self.apply_reply(done),
            }
        }
        handled
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, ChatState::AwaitingReply(_))
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    /// Error from the most recent failed request, cleared by the next submit.
    pub fn last_error(&self) -> Option<&GatewayError> {
        self.last_error.as_ref()
    }

    fn apply_history(&mut self, done: Completed<Vec<TurnEntry>>) {
        if self.history != HistoryState::Loading(done.token) {
            return;
        }
        match done.result {
            Ok(newest_first) => {
                tracing::info!("Loaded {} chat turns", newest_first.len());
                self.transcript.hydrate(newest_first);
                self.history = HistoryState::Loaded;
            }
            Err(err) => {
                tracing::warn!("Failed to load chat history: {err}");
                self.history = HistoryState::Failed;
                self.last_error = Some(err);
            }
        }
    }

    fn apply_reply(&mut self, done: Completed<ChatReply>) {
        if self.state != ChatState::AwaitingReply(done.token) {
            tracing::debug!("Ignoring reply {} with no matching request", done.token);
            return;
        }
        self.state = ChatState::Idle;
        match done.result {
            Ok(reply) => {
                self.transcript
                    .push(TurnEntry::assistant(reply.response, reply.timestamp));
            }
            Err(err) => {
                tracing::warn!("Chat message failed: {err}");
                self.last_error = Some(err);
            }
        }
    }
}
