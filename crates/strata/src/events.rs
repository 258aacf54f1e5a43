//! Progress, message and question notifications.
//!
//! Long-running operations report through an [`EventSink`]. The standard sink,
//! [`AnalysisContext`], fans every notification out on a tokio broadcast
//! channel so any number of listeners can follow a run, mirrors messages into
//! `tracing`, and routes yes/no questions to a single [`QuestionResponder`].
//!
//! Questions default to "no": without a responder, or when the responder
//! does not answer within the configured timeout, [`EventSink::ask`] returns
//! `false`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};

/// Capacity of the broadcast channel. Slow listeners lag rather than block
/// the analysis.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How long [`AnalysisContext`] waits for an answer by default.
pub const DEFAULT_QUESTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Severity of a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    /// Very detailed diagnostics.
    Trace,
    /// Diagnostics.
    Debug,
    /// Normal status.
    Info,
    /// Something unexpected that does not stop the run.
    Warning,
    /// A failure.
    Error,
}

/// A notification broadcast by [`AnalysisContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisEvent {
    /// Approximate completion percentage. Values may arrive out of order.
    Progress(u8),
    /// A leveled status message.
    Message {
        /// Severity.
        level: MessageLevel,
        /// Message text.
        text: String,
    },
    /// A yes/no question was asked.
    Question {
        /// Question text.
        text: String,
    },
    /// The answer a question resolved to.
    Answer {
        /// Question text.
        question: String,
        /// Final answer, `false` on timeout or when nobody answered.
        answer: bool,
    },
}

/// Receiver of progress, messages and questions.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Report progress in percent (0-100).
    fn progress(&self, percent: u8);

    /// Report a message.
    fn message(&self, level: MessageLevel, text: &str);

    /// Ask a yes/no question and wait for the answer.
    async fn ask(&self, question: &str) -> bool;
}

/// Answers yes/no questions on behalf of a human or a policy.
#[async_trait]
pub trait QuestionResponder: Send + Sync {
    /// Answer `question`.
    async fn answer(&self, question: &str) -> bool;
}

/// Responder that always gives the same answer.
#[derive(Debug, Clone, Copy)]
pub struct AutoResponder(pub bool);

#[async_trait]
impl QuestionResponder for AutoResponder {
    async fn answer(&self, _question: &str) -> bool {
        self.0
    }
}

/// The standard [`EventSink`].
#[derive(Clone)]
pub struct AnalysisContext {
    sender: broadcast::Sender<AnalysisEvent>,
    responder: Option<Arc<dyn QuestionResponder>>,
    question_timeout: Duration,
}

impl AnalysisContext {
    /// Create a context with no responder.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            sender,
            responder: None,
            question_timeout: DEFAULT_QUESTION_TIMEOUT,
        }
    }

    /// Route questions to `responder`.
    #[must_use]
    pub fn with_responder(mut self, responder: Arc<dyn QuestionResponder>) -> Self {
        self.responder = Some(responder);
        self
    }

    /// Change how long questions wait for an answer.
    #[must_use]
    pub fn with_question_timeout(mut self, timeout: Duration) -> Self {
        self.question_timeout = timeout;
        self
    }

    /// Start listening. Only events sent after this call are received.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.sender.subscribe()
    }

    fn emit(&self, event: AnalysisEvent) {
        // No listeners is fine.
        let _ = self.sender.send(event);
    }
}

impl Default for AnalysisContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AnalysisContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisContext")
            .field("listeners", &self.sender.receiver_count())
            .field("has_responder", &self.responder.is_some())
            .field("question_timeout", &self.question_timeout)
            .finish()
    }
}

#[async_trait]
impl EventSink for AnalysisContext {
    fn progress(&self, percent: u8) {
        trace!(percent, "Progress");
        self.emit(AnalysisEvent::Progress(percent));
    }

    fn message(&self, level: MessageLevel, text: &str) {
        match level {
            MessageLevel::Trace => trace!("{text}"),
            MessageLevel::Debug => debug!("{text}"),
            MessageLevel::Info => info!("{text}"),
            MessageLevel::Warning => warn!("{text}"),
            MessageLevel::Error => error!("{text}"),
        }
        self.emit(AnalysisEvent::Message {
            level,
            text: text.to_string(),
        });
    }

    async fn ask(&self, question: &str) -> bool {
        self.emit(AnalysisEvent::Question {
            text: question.to_string(),
        });

        let answer = match &self.responder {
            None => {
                debug!(question, "No responder attached, answering no");
                false
            }
            Some(responder) => {
                if let Ok(answer) =
                    tokio::time::timeout(self.question_timeout, responder.answer(question)).await
                {
                    answer
                } else {
                    warn!(
                        question,
                        timeout = ?self.question_timeout,
                        "Question timed out, answering no"
                    );
                    false
                }
            }
        };

        self.emit(AnalysisEvent::Answer {
            question: question.to_string(),
            answer,
        });
        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowResponder;

    #[async_trait]
    impl QuestionResponder for SlowResponder {
        async fn answer(&self, _question: &str) -> bool {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            true
        }
    }

    #[tokio::test]
    async fn listeners_receive_progress_and_messages() {
        let context = AnalysisContext::new();
        let mut events = context.subscribe();

        context.progress(50);
        context.message(MessageLevel::Warning, "careful");

        assert_eq!(events.recv().await.unwrap(), AnalysisEvent::Progress(50));
        assert_eq!(
            events.recv().await.unwrap(),
            AnalysisEvent::Message {
                level: MessageLevel::Warning,
                text: "careful".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn no_responder_means_no() {
        let context = AnalysisContext::new();

        assert!(!context.ask("Reuse the cached graph?").await);
    }

    #[tokio::test]
    async fn responder_answer_is_returned_and_broadcast() {
        let context = AnalysisContext::new().with_responder(Arc::new(AutoResponder(true)));
        let mut events = context.subscribe();

        assert!(context.ask("Proceed?").await);

        assert_eq!(
            events.recv().await.unwrap(),
            AnalysisEvent::Question {
                text: "Proceed?".to_string()
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            AnalysisEvent::Answer {
                question: "Proceed?".to_string(),
                answer: true,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_question_times_out_to_no() {
        let context = AnalysisContext::new()
            .with_responder(Arc::new(SlowResponder))
            .with_question_timeout(Duration::from_secs(5));

        assert!(!context.ask("Proceed?").await);
    }

    #[test]
    fn sending_without_listeners_does_not_panic() {
        let context = AnalysisContext::default();
        context.progress(10);
        context.message(MessageLevel::Error, "boom");
    }
}
