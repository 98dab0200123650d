//! Ticket lifecycle and message routing, independent of the chat platform.
//!
//! The Discord handler translates gateway events into [`IncomingMessage`]
//! values and wraps its HTTP client in a [`SupportChannel`]; everything that
//! decides *whether* and *what* to answer lives here.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::chat::RagChatPipeline;
use crate::core::errors::BotError;
use crate::tickets::{SupportTicket, TicketStore};

pub const PERMISSION_DENIED_REPLY: &str =
    "I don't have permission to create a support ticket. Please contact an administrator.";
pub const HTTP_ERROR_REPLY: &str =
    "An error occurred while creating the support ticket. Please try again later.";
pub const UNEXPECTED_ERROR_REPLY: &str =
    "An unexpected error occurred. Please contact an administrator.";
pub const GENERATION_ERROR_REPLY: &str = "I apologize, but I encountered an error while processing your request. Please try again or contact a human administrator if the issue persists.";

/// Failure reported by the chat platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("missing permissions")]
    Forbidden,
    #[error("http error: {0}")]
    Http(String),
    #[error("{0}")]
    Other(String),
}

impl PlatformError {
    fn user_reply(&self) -> &'static str {
        match self {
            PlatformError::Forbidden => PERMISSION_DENIED_REPLY,
            PlatformError::Http(_) => HTTP_ERROR_REPLY,
            PlatformError::Other(_) => UNEXPECTED_ERROR_REPLY,
        }
    }
}

/// Welcome embed posted as the first message of a new ticket thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeNotice {
    pub title: &'static str,
    pub description: &'static str,
    /// `(name, value)` pairs, rendered one per line
    pub fields: Vec<(String, String)>,
    pub footer: &'static str,
}

impl WelcomeNotice {
    pub fn for_owner(owner_mention: &str) -> Self {
        Self {
            title: "Support Ticket Created",
            description: "Welcome to your support ticket. Please describe your issue, and our AI assistant will help you.",
            fields: vec![
                ("Ticket Owner".to_string(), owner_mention.to_string()),
                (
                    "Instructions".to_string(),
                    "Describe your issue clearly, and the AI will respond to your messages."
                        .to_string(),
                ),
            ],
            footer: "Our AI assistant will do its best to provide support.",
        }
    }
}

/// Thread created for a ticket.
#[derive(Debug, Clone)]
pub struct NewThread {
    pub id: String,
    pub name: String,
    /// Platform markup that links to the thread
    pub mention: String,
}

/// The channel a support command was invoked in.
#[async_trait]
pub trait SupportChannel: Send + Sync {
    async fn create_private_thread(&self, name: &str) -> Result<NewThread, PlatformError>;

    async fn send_welcome(&self, thread_id: &str, notice: &WelcomeNotice) -> Result<(), PlatformError>;
}

/// Produces the answer for a message in a conversation.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, message: &str, conversation_id: &str) -> Result<String, BotError>;
}

#[async_trait]
impl Responder for RagChatPipeline {
    async fn respond(&self, message: &str, conversation_id: &str) -> Result<String, BotError> {
        self.chat(message, conversation_id).await
    }
}

/// Person who invoked the support command.
#[derive(Debug, Clone)]
pub struct Requester {
    pub id: String,
    pub name: String,
    pub mention: String,
}

#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub channel_id: String,
    pub in_thread: bool,
    pub author_id: String,
    pub author_is_bot: bool,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotInThread,
    FromBot,
    NoTicket,
    NotOwner,
}

#[derive(Debug)]
pub enum Screening {
    Accepted(SupportTicket),
    Ignored(IgnoreReason),
}

#[derive(Debug, PartialEq, Eq)]
pub enum MessageOutcome {
    Ignored(IgnoreReason),
    Replied(String),
}

#[derive(Debug)]
pub enum TicketOutcome {
    Opened { ticket: SupportTicket, reply: String },
    Failed { reply: String },
}

impl TicketOutcome {
    /// Text for the ephemeral answer to the command.
    pub fn reply(&self) -> &str {
        match self {
            TicketOutcome::Opened { reply, .. } | TicketOutcome::Failed { reply } => reply,
        }
    }
}

#[derive(Clone)]
pub struct SupportDesk {
    tickets: TicketStore,
    responder: Arc<dyn Responder>,
}

impl SupportDesk {
    pub fn new(tickets: TicketStore, responder: Arc<dyn Responder>) -> Self {
        Self { tickets, responder }
    }

    pub fn tickets(&self) -> &TicketStore {
        &self.tickets
    }

    /// Creates the thread, posts the welcome notice and records the ticket.
    pub async fn open_ticket(&self, channel: &dyn SupportChannel, requester: &Requester) -> TicketOutcome {
        let thread_name = format!("Support: {}", requester.name);

        let thread = match channel.create_private_thread(&thread_name).await {
            Ok(thread) => thread,
            Err(err) => return self.platform_failure(requester, err),
        };

        let notice = WelcomeNotice::for_owner(&requester.mention);
        if let Err(err) = channel.send_welcome(&thread.id, &notice).await {
            return self.platform_failure(requester, err);
        }

        match self.tickets.create(&thread.id, &requester.id).await {
            Ok(ticket) => {
                tracing::info!(
                    "Support ticket created by {} (ID: {}) in channel {} (ID: {})",
                    requester.name,
                    requester.id,
                    thread.name,
                    thread.id
                );
                TicketOutcome::Opened {
                    ticket,
                    reply: format!("Support ticket created in {}", thread.mention),
                }
            }
            Err(err) => {
                tracing::error!("Unexpected error in support command: {}", err);
                TicketOutcome::Failed {
                    reply: UNEXPECTED_ERROR_REPLY.to_string(),
                }
            }
        }
    }

    /// Decides whether a message belongs to an open ticket and its owner.
    pub async fn screen(&self, message: &IncomingMessage) -> Result<Screening, BotError> {
        if !message.in_thread {
            return Ok(Screening::Ignored(IgnoreReason::NotInThread));
        }
        if message.author_is_bot {
            return Ok(Screening::Ignored(IgnoreReason::FromBot));
        }

        let Some(ticket) = self.tickets.find_by_thread(&message.channel_id).await? else {
            return Ok(Screening::Ignored(IgnoreReason::NoTicket));
        };
        if !ticket.is_owned_by(&message.author_id) {
            return Ok(Screening::Ignored(IgnoreReason::NotOwner));
        }
        Ok(Screening::Accepted(ticket))
    }

    /// Generates the reply for an accepted message. Any failure while
    /// generating is logged and answered with the apology text.
    pub async fn answer(&self, message: &IncomingMessage) -> String {
        match self
            .responder
            .respond(&message.content, &message.channel_id)
            .await
        {
            Ok(reply) => {
                tracing::info!(
                    "Response sent in ticket {} for user {}",
                    message.channel_id,
                    message.author_id
                );
                reply
            }
            Err(err) => {
                tracing::error!(
                    "Error generating response in ticket {}: {}",
                    message.channel_id,
                    err
                );
                GENERATION_ERROR_REPLY.to_string()
            }
        }
    }

    pub async fn handle_message(&self, message: &IncomingMessage) -> Result<MessageOutcome, BotError> {
        match self.screen(message).await? {
            Screening::Ignored(reason) => Ok(MessageOutcome::Ignored(reason)),
            Screening::Accepted(_) => Ok(MessageOutcome::Replied(self.answer(message).await)),
        }
    }

    fn platform_failure(&self, requester: &Requester, err: PlatformError) -> TicketOutcome {
        match &err {
            PlatformError::Forbidden => tracing::error!(
                "Permission error creating support ticket for user {}",
                requester.id
            ),
            PlatformError::Http(_) => tracing::error!("HTTP error creating support ticket: {}", err),
            PlatformError::Other(_) => tracing::error!("Unexpected error in support command: {}", err),
        }
        TicketOutcome::Failed {
            reply: err.user_reply().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_database;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeChannel {
        fail_create: Option<fn() -> PlatformError>,
        fail_welcome: Option<fn() -> PlatformError>,
        welcomes: Mutex<Vec<(String, WelcomeNotice)>>,
        created: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SupportChannel for FakeChannel {
        async fn create_private_thread(&self, name: &str) -> Result<NewThread, PlatformError> {
            if let Some(make_err) = self.fail_create {
                return Err(make_err());
            }
            self.created.lock().unwrap().push(name.to_string());
            Ok(NewThread {
                id: "900".to_string(),
                name: name.to_string(),
                mention: "<#900>".to_string(),
            })
        }

        async fn send_welcome(&self, thread_id: &str, notice: &WelcomeNotice) -> Result<(), PlatformError> {
            if let Some(make_err) = self.fail_welcome {
                return Err(make_err());
            }
            self.welcomes
                .lock()
                .unwrap()
                .push((thread_id.to_string(), notice.clone()));
            Ok(())
        }
    }

    enum Reply {
        Echo,
        Fail(fn() -> BotError),
    }

    struct FakeResponder {
        calls: AtomicUsize,
        reply: Reply,
    }

    impl FakeResponder {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                reply,
            })
        }
    }

    #[async_trait]
    impl Responder for FakeResponder {
        async fn respond(&self, message: &str, _conversation_id: &str) -> Result<String, BotError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Reply::Echo => Ok(format!("re: {}", message)),
                Reply::Fail(make_err) => Err(make_err()),
            }
        }
    }

    fn alice() -> Requester {
        Requester {
            id: "42".to_string(),
            name: "alice".to_string(),
            mention: "<@42>".to_string(),
        }
    }

    fn message_from(author_id: &str, channel_id: &str) -> IncomingMessage {
        IncomingMessage {
            channel_id: channel_id.to_string(),
            in_thread: true,
            author_id: author_id.to_string(),
            author_is_bot: false,
            content: "Hello".to_string(),
        }
    }

    async fn desk(responder: Arc<FakeResponder>) -> SupportDesk {
        let db = test_database().await;
        SupportDesk::new(TicketStore::new(&db), responder)
    }

    #[tokio::test]
    async fn open_ticket_creates_thread_welcome_and_row() {
        let desk = desk(FakeResponder::new(Reply::Echo)).await;
        let channel = FakeChannel::default();

        let outcome = desk.open_ticket(&channel, &alice()).await;

        assert_eq!(outcome.reply(), "Support ticket created in <#900>");
        assert_eq!(*channel.created.lock().unwrap(), vec!["Support: alice".to_string()]);
        let welcomes = channel.welcomes.lock().unwrap();
        assert_eq!(welcomes[0].0, "900");
        assert_eq!(welcomes[0].1.fields[0], ("Ticket Owner".to_string(), "<@42>".to_string()));

        let ticket = desk.tickets().find_by_thread("900").await.unwrap().unwrap();
        assert_eq!(ticket.user_id, "42");
    }

    #[tokio::test]
    async fn forbidden_thread_creation_leaves_no_ticket() {
        let desk = desk(FakeResponder::new(Reply::Echo)).await;
        let channel = FakeChannel {
            fail_create: Some(|| PlatformError::Forbidden),
            ..Default::default()
        };

        let outcome = desk.open_ticket(&channel, &alice()).await;

        assert!(matches!(outcome, TicketOutcome::Failed { .. }));
        assert_eq!(outcome.reply(), PERMISSION_DENIED_REPLY);
        assert_eq!(desk.tickets().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn http_failure_while_welcoming_leaves_no_ticket() {
        let desk = desk(FakeResponder::new(Reply::Echo)).await;
        let channel = FakeChannel {
            fail_welcome: Some(|| PlatformError::Http("429 Too Many Requests".to_string())),
            ..Default::default()
        };

        let outcome = desk.open_ticket(&channel, &alice()).await;

        assert_eq!(outcome.reply(), HTTP_ERROR_REPLY);
        assert_eq!(desk.tickets().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn other_platform_failure_uses_generic_reply() {
        let desk = desk(FakeResponder::new(Reply::Echo)).await;
        let channel = FakeChannel {
            fail_create: Some(|| PlatformError::Other("gateway gone".to_string())),
            ..Default::default()
        };

        let outcome = desk.open_ticket(&channel, &alice()).await;
        assert_eq!(outcome.reply(), UNEXPECTED_ERROR_REPLY);
    }

    #[tokio::test]
    async fn owner_message_in_ticket_thread_is_answered() {
        let responder = FakeResponder::new(Reply::Echo);
        let desk = desk(responder.clone()).await;
        desk.tickets().create("900", "42").await.unwrap();

        let outcome = desk.handle_message(&message_from("42", "900")).await.unwrap();

        assert_eq!(outcome, MessageOutcome::Replied("re: Hello".to_string()));
        assert_eq!(responder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn thread_without_ticket_is_ignored() {
        let responder = FakeResponder::new(Reply::Echo);
        let desk = desk(responder.clone()).await;

        let outcome = desk.handle_message(&message_from("42", "901")).await.unwrap();

        assert_eq!(outcome, MessageOutcome::Ignored(IgnoreReason::NoTicket));
        assert_eq!(responder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_owner_is_ignored() {
        let responder = FakeResponder::new(Reply::Echo);
        let desk = desk(responder.clone()).await;
        desk.tickets().create("900", "42").await.unwrap();

        let outcome = desk.handle_message(&message_from("7", "900")).await.unwrap();

        assert_eq!(outcome, MessageOutcome::Ignored(IgnoreReason::NotOwner));
        assert_eq!(responder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn bots_and_plain_channels_are_ignored() {
        let responder = FakeResponder::new(Reply::Echo);
        let desk = desk(responder.clone()).await;
        desk.tickets().create("900", "42").await.unwrap();

        let mut from_bot = message_from("42", "900");
        from_bot.author_is_bot = true;
        let mut outside = message_from("42", "900");
        outside.in_thread = false;

        assert_eq!(
            desk.handle_message(&from_bot).await.unwrap(),
            MessageOutcome::Ignored(IgnoreReason::FromBot)
        );
        assert_eq!(
            desk.handle_message(&outside).await.unwrap(),
            MessageOutcome::Ignored(IgnoreReason::NotInThread)
        );
        assert_eq!(responder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn generation_error_becomes_apology() {
        let responder = FakeResponder::new(Reply::Fail(|| BotError::Llm("timeout".to_string())));
        let desk = desk(responder).await;
        desk.tickets().create("900", "42").await.unwrap();

        let outcome = desk.handle_message(&message_from("42", "900")).await.unwrap();
        assert_eq!(outcome, MessageOutcome::Replied(GENERATION_ERROR_REPLY.to_string()));
    }

    #[tokio::test]
    async fn storage_error_during_generation_becomes_apology() {
        let responder = FakeResponder::new(Reply::Fail(|| BotError::Storage("disk full".to_string())));
        let desk = desk(responder).await;
        desk.tickets().create("900", "42").await.unwrap();

        let outcome = desk.handle_message(&message_from("42", "900")).await.unwrap();
        assert_eq!(outcome, MessageOutcome::Replied(GENERATION_ERROR_REPLY.to_string()));
    }

    #[tokio::test]
    async fn ticket_lookup_failure_propagates() {
        let db = test_database().await;
        let desk = SupportDesk::new(TicketStore::new(&db), FakeResponder::new(Reply::Echo));
        db.close().await;

        let err = desk.handle_message(&message_from("42", "900")).await.unwrap_err();
        assert!(err.is_storage());
    }
}
