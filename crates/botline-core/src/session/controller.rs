//! Session controller: the state machine behind one conversation view.
//!
//! The controller owns the displayed bot's message list and at most one
//! in-flight request. A send is split into three steps so the controller is
//! never borrowed while a reply is pending:
//!
//! 1. [`SessionController::submit`] appends the user message and returns a
//!    [`PendingReply`] holding the owned reply future.
//! 2. The host awaits [`PendingReply::wait`], and may call
//!    [`SessionController::cancel`], `clear` or `switch_bot` meanwhile.
//! 3. [`SessionController::finish`] validates the completion against the
//!    current in-flight request and applies it.
//!
//! [`SessionController::send`] bundles the three for hosts that never need
//! to interrupt a reply.

use std::sync::Arc;

use botline_types::bot::{BotDescriptor, BotId};
use botline_types::error::DispatchError;
use botline_types::message::Message;
use chrono::{DateTime, Utc};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dispatch::gateway::{DispatchGateway, ReplyFuture};
use crate::session::ids::MessageIdGenerator;
use crate::session::store::SessionStore;
use crate::storage::kv_store::KvStore;

/// Whether a reply is pending for the displayed bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Sending,
}

/// A request whose reply has not been applied yet.
///
/// Tagged with the bot it was issued for, so a reply that arrives after the
/// user switched bots is never applied to the wrong conversation.
#[derive(Debug, Clone)]
pub struct InFlightRequest {
    request_id: Uuid,
    bot_id: BotId,
    bot_name: String,
    cancel: CancellationToken,
    started_at: DateTime<Utc>,
}

impl InFlightRequest {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn bot_id(&self) -> &BotId {
        &self.bot_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Token that cancels this request when fired.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}

/// Handle to a reply that is still being produced.
///
/// Dropping the handle (or the `wait` future) before the reply arrives
/// cancels the request; nothing could ever `finish` it.
pub struct PendingReply {
    request_id: Uuid,
    bot_id: BotId,
    cancel: CancellationToken,
    cancel_on_drop: DropGuard,
    future: ReplyFuture,
}

impl PendingReply {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn bot_id(&self) -> &BotId {
        &self.bot_id
    }

    /// Token that cancels this request, usable from another task.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the backend and package the result for `finish`.
    pub async fn wait(self) -> Completion {
        let PendingReply {
            request_id,
            bot_id,
            cancel_on_drop,
            future,
            ..
        } = self;
        let result = future.await;
        cancel_on_drop.disarm();
        Completion {
            request_id,
            bot_id,
            result,
        }
    }
}

/// Result of a dispatched request, tagged with the request it answers.
#[derive(Debug, Clone)]
pub struct Completion {
    pub request_id: Uuid,
    pub bot_id: BotId,
    pub result: Result<String, DispatchError>,
}

/// What `finish` did with a completion.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The reply was appended to the displayed session.
    Replied(Message),
    /// The request was cancelled; nothing was appended.
    Cancelled,
    /// The backend failed; nothing was appended.
    Failed(DispatchError),
    /// The reply belonged to a bot that is no longer displayed and was
    /// appended to that bot's stored session instead.
    Stored(BotId),
    /// The completion no longer matched any request and was dropped.
    Discarded,
}

/// Orchestrates one conversation and keeps its [`SessionStore`] in sync.
///
/// In-memory state is the source of truth; every change that leaves at
/// least one message is mirrored to the store immediately, and an empty
/// list is never written.
pub struct SessionController<K: KvStore> {
    bot: BotDescriptor,
    messages: Vec<Message>,
    input: String,
    in_flight: Option<InFlightRequest>,
    /// Requests still running for bots the user switched away from.
    detached: Vec<InFlightRequest>,
    ids: MessageIdGenerator,
    gateway: Arc<DispatchGateway>,
    store: SessionStore<K>,
    last_error: Option<DispatchError>,
}

impl<K: KvStore> SessionController<K> {
    /// Open a conversation with `bot`, restoring its stored session.
    pub async fn open(bot: BotDescriptor, gateway: Arc<DispatchGateway>, store: SessionStore<K>) -> Self {
        let messages = store.load(&bot.id).await;
        let mut ids = MessageIdGenerator::new();
        ids.observe(&messages);
        info!(bot_id = %bot.id, restored = messages.len(), "opened conversation");

        Self {
            bot,
            messages,
            input: String::new(),
            in_flight: None,
            detached: Vec::new(),
            ids,
            gateway,
            store,
            last_error: None,
        }
    }

    pub fn bot(&self) -> &BotDescriptor {
        &self.bot
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// `Sending` while the in-flight request is live. A request whose token
    /// was fired (including by dropping its [`PendingReply`]) no longer counts.
    pub fn state(&self) -> ControllerState {
        if self.in_flight.as_ref().is_some_and(|r| !r.cancel.is_cancelled()) {
            ControllerState::Sending
        } else {
            ControllerState::Idle
        }
    }

    pub fn is_sending(&self) -> bool {
        self.state() == ControllerState::Sending
    }

    pub fn in_flight(&self) -> Option<&InFlightRequest> {
        self.in_flight.as_ref()
    }

    /// Number of requests still running for bots that are not displayed.
    pub fn detached_count(&self) -> usize {
        self.detached.len()
    }

    /// The most recent dispatch failure for the displayed bot, if the last
    /// request failed.
    pub fn last_error(&self) -> Option<&DispatchError> {
        self.last_error.as_ref()
    }

    pub fn store(&self) -> &SessionStore<K> {
        &self.store
    }

    // --- Input buffer ---

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Prefill the input with a prompt picked from the catalog.
    pub fn apply_prompt(&mut self, prompt: &str) {
        self.input = prompt.to_string();
    }

    /// Submit the current input buffer.
    pub async fn submit_input(&mut self) -> Option<PendingReply> {
        let text = std::mem::take(&mut self.input);
        let pending = self.submit(&text).await;
        if pending.is_none() && self.is_sending() {
            // Rejected because a reply is pending; keep what the user typed.
            self.input = text;
        }
        pending
    }

    // --- Turn lifecycle ---

    /// Start a turn with `text`.
    ///
    /// Returns `None` without touching any state when the text is blank or
    /// a reply is already pending. Otherwise the user message is appended
    /// before this returns, the input is cleared and the controller enters
    /// `Sending`.
    pub async fn submit(&mut self, text: &str) -> Option<PendingReply> {
        let text = text.trim();
        if text.is_empty() {
            debug!(bot_id = %self.bot.id, "ignoring blank submit");
            return None;
        }
        if self.is_sending() {
            debug!(bot_id = %self.bot.id, "ignoring submit while a reply is pending");
            return None;
        }
        self.prune_abandoned();

        self.messages.push(Message::user(self.ids.next_id(), text));
        self.input.clear();
        self.last_error = None;

        let cancel = CancellationToken::new();
        let request_id = Uuid::now_v7();
        let future: ReplyFuture = match self.gateway.dispatch(&self.bot, text, &cancel) {
            Ok(future) => future,
            Err(err) => Box::pin(std::future::ready(Err(err))),
        };

        self.in_flight = Some(InFlightRequest {
            request_id,
            bot_id: self.bot.id.clone(),
            bot_name: self.bot.name.clone(),
            cancel: cancel.clone(),
            started_at: Utc::now(),
        });
        debug!(bot_id = %self.bot.id, %request_id, "submitted");

        self.persist().await;

        Some(PendingReply {
            request_id,
            bot_id: self.bot.id.clone(),
            cancel_on_drop: cancel.clone().drop_guard(),
            cancel,
            future,
        })
    }

    /// Apply a completion produced by [`PendingReply::wait`].
    pub async fn finish(&mut self, completion: Completion) -> TurnOutcome {
        let Completion {
            request_id,
            bot_id,
            result,
        } = completion;

        let active = self
            .in_flight
            .take_if(|r| r.request_id == request_id && r.bot_id == bot_id);
        if let Some(request) = active {
            return self.apply_active(&request, result).await;
        }

        let detached = self
            .detached
            .iter()
            .position(|r| r.request_id == request_id && r.bot_id == bot_id);
        if let Some(pos) = detached {
            let request = self.detached.remove(pos);
            return self.apply_detached(request, result).await;
        }

        debug!(%request_id, %bot_id, "discarding completion for a cancelled request");
        TurnOutcome::Discarded
    }

    /// Submit, wait and finish in one call.
    ///
    /// The controller stays borrowed until the reply arrives, so a host that
    /// needs a Stop button should drive `submit`/`wait`/`finish` itself.
    pub async fn send(&mut self, text: &str) -> Option<TurnOutcome> {
        let pending = self.submit(text).await?;
        let completion = pending.wait().await;
        Some(self.finish(completion).await)
    }

    /// Cancel the pending request, if any, and return to `Idle` immediately.
    ///
    /// The user's message stays in the session; no bot message is appended.
    pub fn cancel(&mut self) -> bool {
        let Some(request) = self.in_flight.take() else {
            return false;
        };
        request.cancel.cancel();
        info!(
            bot_id = %request.bot_id,
            request_id = %request.request_id,
            elapsed_ms = request.elapsed_ms(),
            "cancelled pending reply"
        );
        true
    }

    /// Empty the conversation, drop its snapshot and reset the backend.
    ///
    /// A pending request for this bot is cancelled as well, so its reply
    /// can never land in the cleared session.
    pub async fn clear(&mut self) {
        if let Some(request) = self.in_flight.take() {
            request.cancel.cancel();
            debug!(request_id = %request.request_id, "cancelled pending reply on clear");
        }
        self.detached.retain(|r| {
            if r.bot_id == self.bot.id {
                r.cancel.cancel();
                false
            } else {
                true
            }
        });

        self.messages.clear();
        self.last_error = None;
        self.store.clear(&self.bot.id).await;

        // Failures are already logged by the gateway.
        let _ = self.gateway.reset_session(&self.bot).await;
        info!(bot_id = %self.bot.id, "cleared conversation");
    }

    /// Display a different bot.
    ///
    /// The outgoing session is persisted first. A pending request keeps
    /// running, detached; its reply is routed to the outgoing bot's stored
    /// session when it arrives. Switching back to a bot whose request is
    /// still detached re-attaches it, so the controller is `Sending` again.
    pub async fn switch_bot(&mut self, bot: BotDescriptor) {
        if bot.id == self.bot.id {
            self.bot = bot;
            return;
        }

        self.persist().await;
        self.prune_abandoned();
        if let Some(request) = self.in_flight.take() {
            debug!(
                bot_id = %request.bot_id,
                request_id = %request.request_id,
                "detaching pending reply"
            );
            self.detached.push(request);
        }

        let previous = std::mem::replace(&mut self.bot, bot);
        self.messages = self.store.load(&self.bot.id).await;
        self.ids.observe(&self.messages);
        self.input.clear();
        self.last_error = None;

        if let Some(pos) = self.detached.iter().position(|r| r.bot_id == self.bot.id) {
            let request = self.detached.remove(pos);
            debug!(request_id = %request.request_id, "re-attached pending reply");
            self.in_flight = Some(request);
        }

        info!(
            from = %previous.id,
            to = %self.bot.id,
            restored = self.messages.len(),
            sending = self.is_sending(),
            "switched bot"
        );
    }

    // --- Internals ---

    async fn apply_active(
        &mut self,
        request: &InFlightRequest,
        result: Result<String, DispatchError>,
    ) -> TurnOutcome {
        match result {
            Ok(text) => {
                let message = Message::bot(self.ids.next_id(), self.bot.name.clone(), text);
                self.messages.push(message.clone());
                self.persist().await;
                debug!(
                    bot_id = %request.bot_id,
                    elapsed_ms = request.elapsed_ms(),
                    "reply appended"
                );
                TurnOutcome::Replied(message)
            }
            Err(DispatchError::Cancelled) => {
                debug!(bot_id = %request.bot_id, "reply cancelled");
                TurnOutcome::Cancelled
            }
            Err(err) => {
                warn!(
                    bot_id = %request.bot_id,
                    request_id = %request.request_id,
                    error = %err,
                    "dispatch failed"
                );
                self.last_error = Some(err.clone());
                TurnOutcome::Failed(err)
            }
        }
    }

    async fn apply_detached(
        &mut self,
        request: InFlightRequest,
        result: Result<String, DispatchError>,
    ) -> TurnOutcome {
        let text = match result {
            Ok(text) => text,
            Err(err) => {
                debug!(bot_id = %request.bot_id, error = %err, "detached request ended without a reply");
                return TurnOutcome::Discarded;
            }
        };

        let mut stored = self.store.load(&request.bot_id).await;
        self.ids.observe(&stored);
        stored.push(Message::bot(self.ids.next_id(), request.bot_name, text));
        self.store.save(&request.bot_id, &stored).await;
        info!(bot_id = %request.bot_id, "stored reply for inactive conversation");
        TurnOutcome::Stored(request.bot_id)
    }

    /// Forget requests whose token has fired; their completions, if any
    /// ever arrive, are discarded.
    fn prune_abandoned(&mut self) {
        if self.in_flight.as_ref().is_some_and(|r| r.cancel.is_cancelled()) {
            self.in_flight = None;
        }
        self.detached.retain(|r| !r.cancel.is_cancelled());
    }

    async fn persist(&self) {
        if !self.messages.is_empty() {
            self.store.save(&self.bot.id, &self.messages).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryKvStore;
    use crate::testing::{EchoTransport, FailingTransport, GatedTransport, completion_bot};
    use botline_types::bot::Platform;
    use botline_types::message::Sender;
    use tokio::sync::Semaphore;

    fn gated_gateway(reply: &str) -> (Arc<DispatchGateway>, Arc<Semaphore>) {
        let gated = GatedTransport::new(Platform::CompletionApi, reply);
        let gate = Arc::clone(&gated.gate);
        (Arc::new(DispatchGateway::builder().register(gated).build()), gate)
    }

    async fn open(
        bot: BotDescriptor,
        gateway: Arc<DispatchGateway>,
    ) -> (SessionController<MemoryKvStore>, MemoryKvStore) {
        let kv = MemoryKvStore::new();
        let controller = SessionController::open(bot, gateway, SessionStore::new(kv.clone())).await;
        (controller, kv)
    }

    #[tokio::test]
    async fn test_submit_appends_user_message_before_reply() {
        let (gateway, _gate) = gated_gateway("never");
        let (mut controller, kv) = open(completion_bot("a", "Alpha"), gateway).await;
        controller.set_input("draft");

        let pending = controller.submit("  hello  ").await.unwrap();

        assert_eq!(controller.messages().len(), 1);
        assert_eq!(controller.messages()[0].sender, Sender::User);
        assert_eq!(controller.messages()[0].text, "hello");
        assert_eq!(controller.input(), "");
        assert_eq!(controller.state(), ControllerState::Sending);
        assert_eq!(controller.in_flight().unwrap().bot_id(), &BotId::new("a"));
        assert_eq!(pending.bot_id(), &BotId::new("a"));
        assert!(kv.contains_key("conv_a"));
    }

    #[tokio::test]
    async fn test_blank_submit_is_ignored() {
        let (gateway, _gate) = gated_gateway("x");
        let (mut controller, kv) = open(completion_bot("a", "Alpha"), gateway).await;

        assert!(controller.submit("   \n\t").await.is_none());
        assert!(controller.messages().is_empty());
        assert_eq!(controller.state(), ControllerState::Idle);
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn test_submit_while_sending_is_ignored() {
        let (gateway, _gate) = gated_gateway("x");
        let (mut controller, _kv) = open(completion_bot("a", "Alpha"), gateway).await;

        let _pending = controller.submit("first").await.unwrap();
        assert!(controller.submit("second").await.is_none());
        assert_eq!(controller.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_input_keeps_text_when_rejected() {
        let (gateway, _gate) = gated_gateway("x");
        let (mut controller, _kv) = open(completion_bot("a", "Alpha"), gateway).await;

        let _pending = controller.submit("first").await.unwrap();
        controller.apply_prompt("Summarize this page");
        assert!(controller.submit_input().await.is_none());
        assert_eq!(controller.input(), "Summarize this page");
    }

    #[tokio::test]
    async fn test_end_to_end_reply_then_clear() {
        let (gateway, gate) = gated_gateway("hi there");
        let (mut controller, kv) = open(completion_bot("A", "BotA"), gateway).await;

        let pending = controller.submit("hello").await.unwrap();
        assert_eq!(controller.messages().len(), 1);

        gate.add_permits(1);
        let outcome = controller.finish(pending.wait().await).await;

        let messages = controller.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].text, "hello");
        assert_eq!(messages[1].sender, Sender::Bot("BotA".to_string()));
        assert_eq!(messages[1].text, "hi there");
        assert!(messages[0].id < messages[1].id);
        assert_eq!(outcome, TurnOutcome::Replied(messages[1].clone()));
        assert_eq!(controller.state(), ControllerState::Idle);
        assert_eq!(controller.store().load(&BotId::new("A")).await, messages);

        controller.clear().await;
        assert!(controller.messages().is_empty());
        assert!(!kv.contains_key("conv_A"));
    }

    #[tokio::test]
    async fn test_cancel_before_reply() {
        let (gateway, gate) = gated_gateway("too late");
        let (mut controller, _kv) = open(completion_bot("a", "Alpha"), gateway).await;

        let pending = controller.submit("hello").await.unwrap();
        let token = pending.cancel_token();
        assert!(controller.cancel());
        assert!(token.is_cancelled());
        assert_eq!(controller.state(), ControllerState::Idle);

        gate.add_permits(1);
        let completion = pending.wait().await;
        assert_eq!(completion.result, Err(DispatchError::Cancelled));

        let outcome = controller.finish(completion).await;
        assert_eq!(outcome, TurnOutcome::Discarded);
        assert_eq!(controller.messages().len(), 1);
        assert!(controller.messages()[0].sender.is_user());
        assert!(controller.last_error().is_none());
    }

    #[tokio::test]
    async fn test_cancel_from_token_reports_cancelled() {
        let (gateway, _gate) = gated_gateway("never");
        let (mut controller, _kv) = open(completion_bot("a", "Alpha"), gateway).await;

        let pending = controller.submit("hello").await.unwrap();
        pending.cancel_token().cancel();

        let outcome = controller.finish(pending.wait().await).await;
        assert_eq!(outcome, TurnOutcome::Cancelled);
        assert_eq!(controller.state(), ControllerState::Idle);
        assert_eq!(controller.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_when_idle_is_noop() {
        let (gateway, _gate) = gated_gateway("x");
        let (mut controller, _kv) = open(completion_bot("a", "Alpha"), gateway).await;
        assert!(!controller.cancel());
    }

    #[tokio::test]
    async fn test_transport_error_leaves_only_user_message() {
        let gateway = Arc::new(
            DispatchGateway::builder()
                .register(FailingTransport {
                    platform: Platform::CompletionApi,
                    error: DispatchError::Transport {
                        status: Some(502),
                        message: "bad gateway".to_string(),
                    },
                })
                .build(),
        );
        let (mut controller, _kv) = open(completion_bot("a", "Alpha"), gateway).await;

        let outcome = controller.send("hello").await.unwrap();

        match outcome {
            TurnOutcome::Failed(err) => assert_eq!(err.status(), Some(502)),
            other => panic!("Expected Failed, got: {other:?}"),
        }
        assert_eq!(controller.messages().len(), 1);
        assert_eq!(controller.state(), ControllerState::Idle);
        assert_eq!(controller.last_error().and_then(|e| e.status()), Some(502));
    }

    #[tokio::test]
    async fn test_unsupported_platform_fails_without_dispatch() {
        let echo = EchoTransport::new(Platform::CompletionApi);
        let log = echo.log.clone();
        let gateway = Arc::new(DispatchGateway::builder().register(echo).build());
        let bot = BotDescriptor::new("x", "X", Platform::Other("telegraph".to_string()));
        let (mut controller, _kv) = open(bot, gateway).await;

        let outcome = controller.send("hello").await.unwrap();

        assert_eq!(
            outcome,
            TurnOutcome::Failed(DispatchError::UnsupportedPlatform("telegraph".to_string()))
        );
        assert_eq!(controller.messages().len(), 1);
        assert_eq!(controller.state(), ControllerState::Idle);
        assert!(log.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_switch_bot_routes_stale_reply_to_stored_session() {
        let (gateway, gate) = gated_gateway("reply for A");
        let (mut controller, _kv) = open(completion_bot("A", "BotA"), gateway).await;

        let pending = controller.submit("question for A").await.unwrap();
        controller.switch_bot(completion_bot("B", "BotB")).await;

        assert_eq!(controller.bot().id, BotId::new("B"));
        assert!(controller.messages().is_empty());
        assert_eq!(controller.state(), ControllerState::Idle);
        assert_eq!(controller.detached_count(), 1);

        gate.add_permits(1);
        let outcome = controller.finish(pending.wait().await).await;

        assert_eq!(outcome, TurnOutcome::Stored(BotId::new("A")));
        assert!(controller.messages().is_empty());
        assert_eq!(controller.detached_count(), 0);

        let stored = controller.store().load(&BotId::new("A")).await;
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].sender, Sender::Bot("BotA".to_string()));
        assert_eq!(stored[1].text, "reply for A");
        assert!(stored[0].id < stored[1].id);
    }

    #[tokio::test]
    async fn test_switch_back_reattaches_pending_request() {
        let (gateway, gate) = gated_gateway("late reply");
        let (mut controller, _kv) = open(completion_bot("A", "BotA"), gateway).await;

        let pending = controller.submit("one").await.unwrap();
        controller.switch_bot(completion_bot("B", "BotB")).await;
        controller.switch_bot(completion_bot("A", "BotA")).await;

        assert_eq!(controller.state(), ControllerState::Sending);
        assert_eq!(controller.detached_count(), 0);
        assert_eq!(controller.in_flight().unwrap().request_id(), pending.request_id());
        assert!(controller.submit("two").await.is_none());
        assert_eq!(controller.messages().len(), 1);

        gate.add_permits(1);
        let outcome = controller.finish(pending.wait().await).await;

        assert!(matches!(outcome, TurnOutcome::Replied(_)));
        assert_eq!(controller.state(), ControllerState::Idle);
        let texts: Vec<&str> = controller.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "late reply"]);
    }

    #[tokio::test]
    async fn test_detached_failure_leaves_stored_session_untouched() {
        let gateway = Arc::new(
            DispatchGateway::builder()
                .register(FailingTransport {
                    platform: Platform::CompletionApi,
                    error: DispatchError::Transport {
                        status: Some(500),
                        message: "boom".to_string(),
                    },
                })
                .build(),
        );
        let (mut controller, _kv) = open(completion_bot("A", "BotA"), gateway).await;

        let pending = controller.submit("hello").await.unwrap();
        controller.switch_bot(completion_bot("B", "BotB")).await;

        let outcome = controller.finish(pending.wait().await).await;

        assert_eq!(outcome, TurnOutcome::Discarded);
        assert_eq!(controller.detached_count(), 0);
        assert!(controller.last_error().is_none());
        let stored = controller.store().load(&BotId::new("A")).await;
        assert_eq!(stored.len(), 1);
        assert!(stored[0].sender.is_user());
    }

    #[tokio::test]
    async fn test_clear_other_bot_keeps_detached_request() {
        let (gateway, gate) = gated_gateway("reply for A");
        let (mut controller, _kv) = open(completion_bot("A", "BotA"), gateway).await;

        let pending = controller.submit("question for A").await.unwrap();
        controller.switch_bot(completion_bot("B", "BotB")).await;
        controller.clear().await;

        assert_eq!(controller.detached_count(), 1);
        assert!(!pending.cancel_token().is_cancelled());

        gate.add_permits(1);
        let outcome = controller.finish(pending.wait().await).await;

        assert_eq!(outcome, TurnOutcome::Stored(BotId::new("A")));
        assert_eq!(controller.store().load(&BotId::new("A")).await.len(), 2);
    }

    #[tokio::test]
    async fn test_dropped_pending_reply_is_not_retained() {
        let (gateway, _gate) = gated_gateway("never");
        let (mut controller, _kv) = open(completion_bot("A", "BotA"), gateway).await;

        // Abandoned while displayed: the controller stops reporting Sending.
        let pending = controller.submit("one").await.unwrap();
        let token = pending.cancel_token();
        drop(pending);
        assert!(token.is_cancelled());
        assert_eq!(controller.state(), ControllerState::Idle);

        controller.switch_bot(completion_bot("B", "BotB")).await;
        assert_eq!(controller.detached_count(), 0);

        // Abandoned after being detached: pruned on the next switch.
        let pending = controller.submit("two").await.unwrap();
        controller.switch_bot(completion_bot("C", "BotC")).await;
        assert_eq!(controller.detached_count(), 1);
        drop(pending);

        controller.switch_bot(completion_bot("A", "BotA")).await;
        assert_eq!(controller.detached_count(), 0);
        assert_eq!(controller.state(), ControllerState::Idle);
        assert!(controller.submit("three").await.is_some());
    }

    #[tokio::test]
    async fn test_switch_bot_persists_outgoing_and_restores_incoming() {
        let echo = EchoTransport::new(Platform::CompletionApi);
        let gateway = Arc::new(DispatchGateway::builder().register(echo).build());
        let (mut controller, kv) = open(completion_bot("A", "BotA"), gateway).await;

        controller.send("one").await.unwrap();
        controller.switch_bot(completion_bot("B", "BotB")).await;
        assert!(kv.contains_key("conv_A"));
        assert!(!kv.contains_key("conv_B"));

        controller.send("two").await.unwrap();
        controller.switch_bot(completion_bot("A", "BotA")).await;

        let texts: Vec<&str> = controller.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "BotA: one"]);

        // New ids keep sorting after the restored ones.
        controller.send("three").await.unwrap();
        let messages = controller.messages();
        assert!(messages.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn test_clear_while_sending_cancels_request() {
        let (gateway, gate) = gated_gateway("stale");
        let (mut controller, kv) = open(completion_bot("a", "Alpha"), gateway).await;

        let pending = controller.submit("hello").await.unwrap();
        controller.clear().await;

        assert_eq!(controller.state(), ControllerState::Idle);
        assert!(controller.messages().is_empty());
        assert!(pending.cancel_token().is_cancelled());

        gate.add_permits(1);
        let outcome = controller.finish(pending.wait().await).await;
        assert_eq!(outcome, TurnOutcome::Discarded);
        assert!(controller.messages().is_empty());
        assert!(!kv.contains_key("conv_a"));
    }

    #[tokio::test]
    async fn test_clear_resets_backend_session() {
        let echo = EchoTransport::new(Platform::CompletionApi);
        let log = echo.log.clone();
        let gateway = Arc::new(DispatchGateway::builder().register(echo).build());
        let (mut controller, _kv) = open(completion_bot("a", "Alpha"), gateway).await;

        controller.send("hello").await.unwrap();
        controller.clear().await;

        assert_eq!(log.resets(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_clear_tolerates_reset_failure() {
        let gateway = Arc::new(
            DispatchGateway::builder()
                .register(FailingTransport {
                    platform: Platform::CompletionApi,
                    error: DispatchError::transport("content script gone"),
                })
                .build(),
        );
        let (mut controller, _kv) = open(completion_bot("a", "Alpha"), gateway).await;

        controller.send("hello").await.unwrap();
        controller.clear().await;
        assert!(controller.messages().is_empty());
        assert!(controller.last_error().is_none());
    }

    #[tokio::test]
    async fn test_open_restores_stored_session() {
        let kv = MemoryKvStore::new();
        let store = SessionStore::new(kv.clone());
        let bot = completion_bot("a", "Alpha");
        let gateway = Arc::new(
            DispatchGateway::builder()
                .register(EchoTransport::new(Platform::CompletionApi))
                .build(),
        );

        {
            let mut first = SessionController::open(bot.clone(), Arc::clone(&gateway), store.clone()).await;
            first.send("remember me").await.unwrap();
        }

        let restored = SessionController::open(bot, gateway, store).await;
        assert_eq!(restored.messages().len(), 2);
        assert_eq!(restored.messages()[0].text, "remember me");
    }
}
