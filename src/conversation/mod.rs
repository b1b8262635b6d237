//! Conversation state machine
//!
//! Owns the ordered message log, the pending flag, and the stats snapshot.
//!
//! ```text
//! Idle --submit(text)--> AwaitingClassification --success/failure--> Idle
//! ```
//!
//! The user message is appended synchronously before any network call is
//! issued, so chat order is preserved however slow the backend is. A second
//! submission while a request is in flight is rejected by the `Idle` guard;
//! nothing is ever cancelled.
//!
//! Stats refreshes run as background tasks. They have no ordering relative
//! to classification and are never cancelled; a failed refresh keeps the
//! previous snapshot. Every transition is published as a
//! [`ConversationEvent`] so a front end can re-render.

pub mod message;

pub use message::{render_verdict, Message, Role, CLASSIFICATION_ERROR_TEXT, WELCOME_TEXT};

use crate::backends::{ClassificationResult, Stats};
use crate::error::{GuardchatError, Result};
use crate::router::FallbackRouter;

use std::fmt;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Confirmation shown after a successful flag
pub const FLAG_CONFIRMATION_TEXT: &str =
    "Classification flagged as incorrect. Thank you for your feedback!";

/// Error shown after a failed flag
pub const FLAG_ERROR_TEXT: &str = "Error flagging classification. Please try again.";

/// Conversation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    /// No request in flight; input enabled
    Idle,
    /// A classification is in flight; input disabled
    AwaitingClassification,
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingClassification => write!(f, "awaiting classification"),
        }
    }
}

/// Transient feedback that is not part of the message log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Operation succeeded
    Confirmation(String),
    /// Operation failed
    Error(String),
}

/// State change published to observers
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationEvent {
    /// A message was appended at `index`
    MessageAppended {
        /// Position in the log
        index: usize,
        /// The appended message
        message: Message,
    },
    /// The conversation moved to a new state
    StateChanged(ConversationState),
    /// A fresh stats snapshot replaced the previous one
    StatsUpdated(Stats),
    /// Feedback for a user action (e.g. flagging)
    Notice(Notice),
}

/// Proof that a submission was accepted; consumed by
/// [`Conversation::finish_submit`]
#[derive(Debug)]
#[must_use = "a pending classification must be finished to return to Idle"]
pub struct PendingClassification {
    prompt: String,
}

impl PendingClassification {
    /// Text to classify
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// Interactive classification conversation
pub struct Conversation {
    router: Arc<FallbackRouter>,
    messages: Vec<Message>,
    state: ConversationState,
    draft: String,
    stats: Arc<RwLock<Stats>>,
    events: UnboundedSender<ConversationEvent>,
    background: Vec<JoinHandle<()>>,
}

impl Conversation {
    /// Create an empty conversation in `Idle`
    ///
    /// Returns the conversation and the receiving end of its event stream.
    pub fn new(router: Arc<FallbackRouter>) -> (Self, UnboundedReceiver<ConversationEvent>) {
        let (events, rx) = unbounded_channel();
        let conversation = Self {
            router,
            messages: Vec::new(),
            state: ConversationState::Idle,
            draft: String::new(),
            stats: Arc::new(RwLock::new(Stats::default())),
            events,
            background: Vec::new(),
        };
        (conversation, rx)
    }

    /// Start a session: welcome message plus one stats refresh
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(router: Arc<FallbackRouter>) -> (Self, UnboundedReceiver<ConversationEvent>) {
        let (mut conversation, rx) = Self::new(router);
        conversation.append(Message::welcome());
        conversation.refresh_stats();
        (conversation, rx)
    }

    /// Messages in chat order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Current state
    pub fn state(&self) -> ConversationState {
        self.state
    }

    /// True exactly while a classification is in flight
    pub fn is_pending(&self) -> bool {
        self.state == ConversationState::AwaitingClassification
    }

    /// Latest stats snapshot
    pub fn stats(&self) -> Stats {
        self.stats.read().map(|s| *s).unwrap_or_default()
    }

    /// Current input field contents
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Replace the input field contents
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// The router this conversation dispatches through
    pub fn router(&self) -> &Arc<FallbackRouter> {
        &self.router
    }

    /// Indices of messages that may be flagged
    pub fn flaggable(&self) -> Vec<usize> {
        self.messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_flaggable())
            .map(|(i, _)| i)
            .collect()
    }

    fn append(&mut self, message: Message) {
        let index = self.messages.len();
        self.messages.push(message.clone());
        let _ = self
            .events
            .send(ConversationEvent::MessageAppended { index, message });
    }

    fn transition(&mut self, state: ConversationState) {
        if self.state != state {
            tracing::debug!("Conversation state: {} -> {}", self.state, state);
            self.state = state;
            let _ = self.events.send(ConversationEvent::StateChanged(state));
        }
    }

    fn notify(&self, notice: Notice) -> Notice {
        let _ = self.events.send(ConversationEvent::Notice(notice.clone()));
        notice
    }

    /// Accept a submission: `Idle --submit(text)--> AwaitingClassification`
    ///
    /// Appends the user message and clears the draft. Returns `None` (and
    /// changes nothing) when the trimmed text is empty or a request is
    /// already in flight.
    pub fn begin_submit(&mut self, text: &str) -> Option<PendingClassification> {
        if text.trim().is_empty() {
            return None;
        }
        if self.is_pending() {
            tracing::debug!("Submission ignored: classification already in flight");
            return None;
        }

        self.append(Message::user(text));
        self.draft.clear();
        self.transition(ConversationState::AwaitingClassification);

        Some(PendingClassification {
            prompt: text.to_string(),
        })
    }

    /// Complete a submission and return to `Idle`
    ///
    /// On success appends the verdict and spawns a stats refresh; on failure
    /// appends the error message. No retry is scheduled.
    pub fn finish_submit(
        &mut self,
        pending: PendingClassification,
        outcome: Result<ClassificationResult>,
    ) -> &Message {
        match outcome {
            Ok(result) => {
                tracing::info!(
                    "Classified prompt ({} chars): {} at {:.2}%",
                    pending.prompt.len(),
                    result.predicted_class,
                    result.confidence * 100.0
                );
                self.append(Message::verdict(&result));
                self.transition(ConversationState::Idle);
                self.refresh_stats();
            }
            Err(e) => {
                tracing::error!("Error classifying message: {}", e);
                self.append(Message::classification_error());
                self.transition(ConversationState::Idle);
            }
        }

        let last = self.messages.len() - 1;
        &self.messages[last]
    }

    /// Submit text and wait for its verdict
    ///
    /// Returns `false` if the submission was rejected by the guard.
    pub async fn submit(&mut self, text: &str) -> bool {
        let Some(pending) = self.begin_submit(text) else {
            return false;
        };
        let outcome = self.router.classify(pending.prompt()).await;
        self.finish_submit(pending, outcome);
        true
    }

    /// Submit the current draft
    pub async fn submit_draft(&mut self) -> bool {
        let text = self.draft.clone();
        self.submit(&text).await
    }

    /// Flag the verdict at `index` as incorrect
    ///
    /// Only assistant messages carrying a classification id can be flagged.
    /// Does not modify the message or the conversation state; a successful
    /// flag triggers a stats refresh.
    pub async fn flag(&mut self, index: usize) -> Notice {
        let id = match self.messages.get(index) {
            Some(Message {
                role: Role::Assistant,
                classification_id: Some(id),
                ..
            }) => id.clone(),
            Some(message) => {
                let err = GuardchatError::NotFlaggable(format!(
                    "message {} is a {} message without a verdict",
                    index, message.role
                ));
                return self.notify(Notice::Error(err.to_string()));
            }
            None => {
                let err = GuardchatError::NotFlaggable(format!("no message at index {}", index));
                return self.notify(Notice::Error(err.to_string()));
            }
        };

        match self.router.flag(&id).await {
            Ok(()) => {
                tracing::info!("Flagged classification {}", id);
                self.refresh_stats();
                self.notify(Notice::Confirmation(FLAG_CONFIRMATION_TEXT.to_string()))
            }
            Err(e) => {
                tracing::error!("Error flagging classification {}: {}", id, e);
                self.notify(Notice::Error(FLAG_ERROR_TEXT.to_string()))
            }
        }
    }

    /// Spawn a background stats refresh
    ///
    /// On success the snapshot is replaced wholesale; on failure the previous
    /// snapshot is kept and the error is only logged.
    pub fn refresh_stats(&mut self) {
        self.background.retain(|handle| !handle.is_finished());

        let router = Arc::clone(&self.router);
        let stats = Arc::clone(&self.stats);
        let events = self.events.clone();

        let handle = tokio::spawn(async move {
            match router.fetch_stats().await {
                Ok(snapshot) => {
                    if let Ok(mut current) = stats.write() {
                        *current = snapshot;
                    }
                    tracing::debug!("Stats refreshed: {:?}", snapshot);
                    let _ = events.send(ConversationEvent::StatsUpdated(snapshot));
                }
                Err(e) => {
                    tracing::warn!("Error fetching stats, keeping previous snapshot: {}", e);
                }
            }
        });
        self.background.push(handle);
    }

    /// Wait for every spawned stats refresh to finish
    pub async fn join_background(&mut self) {
        for handle in self.background.drain(..) {
            if let Err(e) = handle.await {
                tracing::warn!("Stats refresh task failed: {}", e);
            }
        }
    }
}
