use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use discollama::bot::support::{
    IgnoreReason, IncomingMessage, MessageOutcome, NewThread, PlatformError, Requester,
    SupportChannel, TicketOutcome, WelcomeNotice,
};
use discollama::core::config::{AppPaths, BotConfig, ConfigService};
use discollama::core::errors::BotError;
use discollama::llm::provider::LlmProvider;
use discollama::llm::types::{ChatRequest, ProviderModel, Role};
use discollama::state::AppState;

/// Answers with the number of messages it was given.
#[derive(Default)]
struct CountingLlm {
    chats: AtomicUsize,
}

#[async_trait]
impl LlmProvider for CountingLlm {
    fn name(&self) -> &str {
        "counting"
    }

    async fn list_models(&self) -> Result<Vec<ProviderModel>, BotError> {
        Ok(Vec::new())
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, BotError> {
        self.chats.fetch_add(1, Ordering::SeqCst);
        Ok(format!("saw {} messages", request.messages.len()))
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, BotError> {
        Ok(inputs
            .iter()
            .map(|text| vec![text.len() as f32, 1.0])
            .collect())
    }
}

struct StubChannel {
    forbidden: bool,
}

#[async_trait]
impl SupportChannel for StubChannel {
    async fn create_private_thread(&self, name: &str) -> Result<NewThread, PlatformError> {
        if self.forbidden {
            return Err(PlatformError::Forbidden);
        }
        Ok(NewThread {
            id: "555".to_string(),
            name: name.to_string(),
            mention: "<#555>".to_string(),
        })
    }

    async fn send_welcome(&self, _thread_id: &str, _notice: &WelcomeNotice) -> Result<(), PlatformError> {
        Ok(())
    }
}

async fn setup() -> (Arc<AppState>, Arc<CountingLlm>, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let paths = Arc::new(AppPaths::from_data_dir(tmp.path()));
    let llm = Arc::new(CountingLlm::default());
    let state = AppState::with_provider(
        paths.clone(),
        ConfigService::new(paths),
        BotConfig::default(),
        llm.clone(),
    )
    .await
    .unwrap();
    (state, llm, tmp)
}

fn user() -> Requester {
    Requester {
        id: "1001".to_string(),
        name: "user".to_string(),
        mention: "<@1001>".to_string(),
    }
}

fn owner_message(content: &str) -> IncomingMessage {
    IncomingMessage {
        channel_id: "555".to_string(),
        in_thread: true,
        author_id: "1001".to_string(),
        author_is_bot: false,
        content: content.to_string(),
    }
}

#[tokio::test]
async fn ticket_hello_and_reset() {
    let (state, llm, _tmp) = setup().await;
    let desk = state.support_desk();

    let outcome = desk.open_ticket(&StubChannel { forbidden: false }, &user()).await;
    assert!(matches!(outcome, TicketOutcome::Opened { .. }));
    assert_eq!(outcome.reply(), "Support ticket created in <#555>");

    let outcome = desk.handle_message(&owner_message("Hello")).await.unwrap();
    // system prompt + "Hello"
    assert_eq!(outcome, MessageOutcome::Replied("saw 2 messages".to_string()));

    let rows = state.pipeline.transcripts().history("555").await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!((rows[0].role, rows[0].content.as_str()), (Role::User, "Hello"));
    assert_eq!(rows[1].role, Role::Assistant);

    let outcome = desk.handle_message(&owner_message("Still broken")).await.unwrap();
    assert_eq!(outcome, MessageOutcome::Replied("saw 4 messages".to_string()));

    state.pipeline.reset_chat("555").await.unwrap();
    assert!(state.pipeline.transcripts().history("555").await.unwrap().is_empty());

    let outcome = desk.handle_message(&owner_message("Fresh start")).await.unwrap();
    assert_eq!(outcome, MessageOutcome::Replied("saw 2 messages".to_string()));
    assert_eq!(llm.chats.load(Ordering::SeqCst), 3);

    state.shutdown().await;
}

#[tokio::test]
async fn strangers_and_unknown_threads_get_nothing() {
    let (state, llm, _tmp) = setup().await;
    let desk = state.support_desk();
    desk.open_ticket(&StubChannel { forbidden: false }, &user()).await;

    let mut stranger = owner_message("Hi");
    stranger.author_id = "2002".to_string();
    let mut elsewhere = owner_message("Hi");
    elsewhere.channel_id = "777".to_string();

    assert_eq!(
        desk.handle_message(&stranger).await.unwrap(),
        MessageOutcome::Ignored(IgnoreReason::NotOwner)
    );
    assert_eq!(
        desk.handle_message(&elsewhere).await.unwrap(),
        MessageOutcome::Ignored(IgnoreReason::NoTicket)
    );
    assert_eq!(llm.chats.load(Ordering::SeqCst), 0);
    assert!(state.pipeline.transcripts().history("555").await.unwrap().is_empty());

    state.shutdown().await;
}

#[tokio::test]
async fn forbidden_support_command_records_nothing() {
    let (state, _llm, _tmp) = setup().await;
    let desk = state.support_desk();

    let outcome = desk.open_ticket(&StubChannel { forbidden: true }, &user()).await;

    assert_eq!(
        outcome.reply(),
        "I don't have permission to create a support ticket. Please contact an administrator."
    );
    assert_eq!(state.tickets.count().await.unwrap(), 0);

    state.shutdown().await;
}
