use crate::service::{
    Analysis, ChatMessage, ChatReply, ChatRequest, ProblemContext, ServiceClient, ServiceError,
};
use thiserror::Error;

pub const GREETING: &str = "Hello! I'm your Socratic tutor. Upload a photo of your homework problem, and I'll help guide you to the solution through thoughtful questions, without giving you the answer directly.";
pub const IMAGE_PROMPT: &str = "I can see your problem! Take a moment to highlight or circle the part you're stuck on. Then tell me: What have you tried so far?";

/// Anything that can answer a chat turn.
pub trait TutorBackend {
    fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ServiceError>;
}

impl TutorBackend for ServiceClient {
    fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ServiceError> {
        ServiceClient::chat(self, request)
    }
}

#[derive(Error, Debug)]
pub enum TutorError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("a reply is already pending")]
    Busy,

    /// The outcome belongs to a turn or image this session no longer tracks
    #[error("outcome is for an earlier conversation")]
    Stale,

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Identifies one chat turn. Ids keep increasing across resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnId(u64);

/// A started turn: the request to send and the id to complete it with.
#[derive(Debug, Clone)]
pub struct Turn {
    pub id: TurnId,
    pub request: ChatRequest,
}

/// Conversation state for one problem.
///
/// A turn is split into [`TutorSession::begin`] and
/// [`TutorSession::complete`] so the request can run on another thread
/// while the UI keeps showing the user's message. Every reset starts a new
/// epoch; results tagged with an older epoch or turn are dropped.
#[derive(Debug, Clone)]
pub struct TutorSession {
    messages: Vec<ChatMessage>,
    problem: Option<ProblemContext>,
    image_attached: bool,
    pending: Option<TurnId>,
    last_error: Option<String>,
    epoch: u64,
    next_turn: u64,
}

impl Default for TutorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TutorSession {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::assistant(GREETING)],
            problem: None,
            image_attached: false,
            pending: None,
            last_error: None,
            epoch: 0,
            next_turn: 0,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn problem(&self) -> Option<&ProblemContext> {
        self.problem.as_ref()
    }

    pub fn has_image(&self) -> bool {
        self.image_attached
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Current conversation; capture it before starting an analysis.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Marks an image as present. The image prompt is added only while the
    /// greeting is the sole message.
    pub fn attach_image(&mut self) -> bool {
        self.image_attached = true;
        if self.messages.len() == 1 {
            self.messages.push(ChatMessage::assistant(IMAGE_PROMPT));
            return true;
        }
        false
    }

    /// Drops the conversation when the image is cleared or replaced. Turns
    /// and analyses still in flight become stale.
    pub fn reset(&mut self) {
        let epoch = self.epoch + 1;
        let next_turn = self.next_turn;
        *self = Self::new();
        self.epoch = epoch;
        self.next_turn = next_turn;
    }

    /// Stores the analysed problem if it was requested in this epoch.
    pub fn set_analysis(&mut self, epoch: u64, analysis: &Analysis) -> Result<(), TutorError> {
        if epoch != self.epoch {
            tracing::debug!(epoch, current = self.epoch, "dropping analysis of a replaced image");
            return Err(TutorError::Stale);
        }
        tracing::info!(
            subject = %analysis.subject,
            problem_type = %analysis.problem_type,
            "problem analysed"
        );
        self.problem = Some(ProblemContext::from(analysis));
        Ok(())
    }

    /// Records the user's message and builds the request for the service.
    /// The history sent excludes the message being asked.
    pub fn begin(&mut self, input: &str) -> Result<Turn, TutorError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(TutorError::EmptyMessage);
        }
        if self.pending.is_some() {
            return Err(TutorError::Busy);
        }

        let request = ChatRequest {
            problem: self.problem.clone().unwrap_or_default(),
            messages: self.messages.clone(),
            user_message: text.to_string(),
        };
        let id = TurnId(self.next_turn);
        self.next_turn += 1;
        self.messages.push(ChatMessage::user(text));
        self.pending = Some(id);
        self.last_error = None;
        Ok(Turn { id, request })
    }

    /// Applies the outcome of a turn started with [`TutorSession::begin`].
    /// On failure the user's message stays in the history. Outcomes for any
    /// turn other than the pending one leave the session untouched.
    pub fn complete(
        &mut self,
        id: TurnId,
        outcome: Result<ChatReply, ServiceError>,
    ) -> Result<(), TutorError> {
        if self.pending != Some(id) {
            tracing::debug!(turn = id.0, "dropping reply to a finished conversation");
            return Err(TutorError::Stale);
        }
        self.pending = None;
        match outcome {
            Ok(reply) => {
                tracing::debug!(hint_type = %reply.hint_type, "tutor replied");
                self.messages.push(ChatMessage::assistant(reply.response));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "chat turn failed");
                self.last_error = Some(err.to_string());
                Err(err.into())
            }
        }
    }

    pub fn send<B: TutorBackend>(&mut self, backend: &B, input: &str) -> Result<(), TutorError> {
        let turn = self.begin(input)?;
        let outcome = backend.chat(&turn.request);
        self.complete(turn.id, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::Role;
    use std::cell::RefCell;

    struct Scripted {
        replies: RefCell<Vec<Result<ChatReply, ServiceError>>>,
        seen: RefCell<Vec<ChatRequest>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<ChatReply, ServiceError>>) -> Self {
            Self {
                replies: RefCell::new(replies),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl TutorBackend for Scripted {
        fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ServiceError> {
            self.seen.borrow_mut().push(request.clone());
            self.replies.borrow_mut().remove(0)
        }
    }

    fn analysis() -> Analysis {
        Analysis {
            extracted_text: "2x = 4".into(),
            problem_type: "equation".into(),
            subject: "algebra".into(),
            difficulty: None,
            key_concepts: vec![],
        }
    }

    fn reply(text: &str) -> ChatReply {
        ChatReply {
            response: text.into(),
            hint_type: "question".into(),
        }
    }

    #[test]
    fn starts_with_greeting() {
        let session = TutorSession::new();
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::Assistant);
        assert!(!session.has_image());
    }

    #[test]
    fn image_prompt_added_once() {
        let mut session = TutorSession::new();
        assert!(session.attach_image());
        assert!(!session.attach_image());
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].content, IMAGE_PROMPT);
    }

    #[test]
    fn empty_input_never_reaches_backend() {
        let backend = Scripted::new(vec![]);
        let mut session = TutorSession::new();
        let err = session.send(&backend, "   ").unwrap_err();
        assert!(matches!(err, TutorError::EmptyMessage));
        assert!(backend.seen.borrow().is_empty());
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn successful_turn_appends_both_messages() {
        let backend = Scripted::new(vec![Ok(reply("What do you know already?"))]);
        let mut session = TutorSession::new();
        session
            .set_analysis(session.epoch(), &analysis())
            .expect("current epoch");
        session.send(&backend, "  help me  ").expect("send");

        let seen = backend.seen.borrow();
        assert_eq!(seen[0].user_message, "help me");
        assert_eq!(seen[0].messages.len(), 1);
        assert_eq!(seen[0].problem.subject, "algebra");

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1], ChatMessage::user("help me"));
        assert_eq!(messages[2].content, "What do you know already?");
        assert!(!session.is_pending());
    }

    #[test]
    fn failed_turn_keeps_user_message() {
        let backend = Scripted::new(vec![Err(ServiceError::Status {
            status: 500,
            detail: "Server error: 500".into(),
        })]);
        let mut session = TutorSession::new();
        let err = session.send(&backend, "why?").unwrap_err();
        assert!(matches!(err, TutorError::Service(_)));
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.last_error(), Some("Server error: 500"));
        assert!(!session.is_pending());
    }

    #[test]
    fn overlapping_turns_are_refused() {
        let mut session = TutorSession::new();
        let first = session.begin("first").expect("begin");
        assert!(matches!(session.begin("second"), Err(TutorError::Busy)));
        session.complete(first.id, Ok(reply("ok"))).expect("complete");
        assert!(session.begin("third").is_ok());
    }

    #[test]
    fn reply_after_reset_is_dropped() {
        let mut session = TutorSession::new();
        session.attach_image();
        let old = session.begin("about the old image").expect("begin");

        session.reset();
        session.attach_image();
        let err = session.complete(old.id, Ok(reply("late"))).unwrap_err();
        assert!(matches!(err, TutorError::Stale));
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].content, IMAGE_PROMPT);
        assert!(!session.is_pending());

        let fresh = session.begin("new question").expect("begin");
        assert_ne!(fresh.id, old.id);
        let err = session.complete(old.id, Ok(reply("late"))).unwrap_err();
        assert!(matches!(err, TutorError::Stale));
        assert!(session.is_pending());
        session.complete(fresh.id, Ok(reply("answer"))).expect("complete");
        assert_eq!(session.messages().len(), 4);
    }

    #[test]
    fn failed_reply_after_reset_sets_no_error() {
        let mut session = TutorSession::new();
        let old = session.begin("hello").expect("begin");
        session.reset();
        let outcome = Err(ServiceError::Status {
            status: 502,
            detail: "Server error: 502".into(),
        });
        assert!(matches!(session.complete(old.id, outcome), Err(TutorError::Stale)));
        assert_eq!(session.last_error(), None);
    }

    #[test]
    fn analysis_of_replaced_image_is_dropped() {
        let mut session = TutorSession::new();
        let requested = session.epoch();
        session.reset();
        let err = session.set_analysis(requested, &analysis()).unwrap_err();
        assert!(matches!(err, TutorError::Stale));
        assert!(session.problem().is_none());

        session
            .set_analysis(session.epoch(), &analysis())
            .expect("current epoch");
        assert_eq!(session.problem().map(|p| p.subject.as_str()), Some("algebra"));
    }
}
