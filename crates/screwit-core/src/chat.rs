//! Per-client chat orchestration.
//!
//! A [`ChatController`] owns one client's [`ChatState`], drives the store
//! clients for every user action and keeps the state fresh through two live
//! subscriptions: the user's session list and the active session's messages.

use crate::config::ChatConfig;
use crate::error::ValidationError;
use crate::messages::MessageClient;
use crate::planner::{PlanRequest, Planner};
use crate::sessions::SessionClient;
use crate::store::DocumentStore;
use crate::sync::SyncLayer;
use crate::utils::{
    derive_title, enabled_options, is_session_owned_by_user, normalize_agent_options,
    sanitize_content,
};
use crate::{Result, ScrewitError};
use screwit_types::{
    AgentOption, AuthUser, ChatState, Message, MessageMetadata, NewMessage, NewSession, Session,
};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Default)]
struct Listeners {
    sessions: Option<JoinHandle<()>>,
    messages: Option<JoinHandle<()>>,
}

impl Listeners {
    fn stop_sessions(&mut self) {
        if let Some(handle) = self.sessions.take() {
            handle.abort();
        }
    }

    fn stop_messages(&mut self) {
        if let Some(handle) = self.messages.take() {
            handle.abort();
        }
    }
}

pub struct ChatController {
    sessions: SessionClient,
    messages: MessageClient,
    sync: SyncLayer,
    planner: Arc<dyn Planner>,
    config: ChatConfig,
    state: Arc<watch::Sender<ChatState>>,
    user: Mutex<Option<AuthUser>>,
    /// Bumped on every identity change; session snapshots read for an
    /// older identity are dropped.
    identity_generation: Arc<AtomicU64>,
    listeners: Mutex<Listeners>,
    pending_replies: Mutex<Vec<JoinHandle<()>>>,
}

impl ChatController {
    pub fn new(store: Arc<dyn DocumentStore>, planner: Arc<dyn Planner>, config: ChatConfig) -> Self {
        let (state, _) = watch::channel(ChatState::default());
        Self {
            sessions: SessionClient::new(store.clone()),
            messages: MessageClient::new(store.clone()),
            sync: SyncLayer::new(store, &config),
            planner,
            config,
            state: Arc::new(state),
            user: Mutex::new(None),
            identity_generation: Arc::new(AtomicU64::new(0)),
            listeners: Mutex::new(Listeners::default()),
            pending_replies: Mutex::new(Vec::new()),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> ChatState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<ChatState> {
        self.state.subscribe()
    }

    pub async fn current_user(&self) -> Option<AuthUser> {
        self.user.lock().await.clone()
    }

    /// Install or clear the signed-in identity.
    ///
    /// Signing in starts the session-list subscription. Signing out (or
    /// switching identity) cancels both subscriptions and resets the state.
    pub async fn attach_user(&self, identity: Option<AuthUser>) {
        let mut user = self.user.lock().await;
        if user.as_ref().map(|u| &u.uid) == identity.as_ref().map(|u| &u.uid) {
            return;
        }

        let mut listeners = self.listeners.lock().await;
        listeners.stop_sessions();
        listeners.stop_messages();
        let generation = self.identity_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(ChatState::default());

        match &identity {
            Some(auth_user) => {
                info!(target: "screwit::chat", "Attached user {}", auth_user.uid);
                let mut sub = self.sync.watch_user_sessions(auth_user.uid.clone());
                let state = self.state.clone();
                let current = self.identity_generation.clone();
                listeners.sessions = Some(tokio::spawn(async move {
                    while let Some(snapshot) = sub.recv().await {
                        apply_session_snapshot(&state, &current, generation, snapshot);
                    }
                }));
            }
            None => {
                if let Some(previous) = user.as_ref() {
                    info!(target: "screwit::chat", "Detached user {}", previous.uid);
                }
            }
        }

        *user = identity;
    }

    /// Create a session from the first prompt and make it active.
    pub async fn create_new_chat(&self, prompt: &str, options: &[AgentOption]) -> Result<Session> {
        self.transition("create_new_chat", async {
            let user = self.require_user().await?;
            let session = self
                .sessions
                .create(NewSession {
                    title: derive_title(prompt, self.config.title_max_len),
                    user_id: user.uid,
                    agent_options: Some(normalize_agent_options(options)),
                })
                .await?;

            self.state.send_modify(|s| {
                s.sessions.retain(|existing| existing.id != session.id);
                s.sessions.insert(0, session.clone());
                s.active_session_id = Some(session.id);
                s.active_messages.clear();
            });
            self.watch_messages(session.id).await;
            Ok(session)
        })
        .await
    }

    /// Persist a user message in the active session and schedule the reply.
    ///
    /// Returns once the user message is stored. The reply is written to the
    /// session that was active at call time, even if the client switches away
    /// before it arrives.
    pub async fn send_message(&self, content: &str, options: &[AgentOption]) -> Result<Message> {
        self.transition("send_message", async {
            self.require_user().await?;
            let session_id = self
                .state
                .borrow()
                .active_session_id
                .ok_or(ScrewitError::NoActiveSession)?;

            let content = sanitize_content(content);
            if content.is_empty() {
                return Err(ValidationError::ContentRequired.into());
            }

            let enabled = enabled_options(options);
            let metadata = MessageMetadata {
                agent_options: enabled.clone(),
                ..Default::default()
            };
            let message = self
                .messages
                .create(NewMessage::user(session_id, content.clone()).with_metadata(Some(metadata)))
                .await?;

            self.spawn_reply(PlanRequest {
                session_id,
                content,
                enabled_options: enabled,
            })
            .await;
            Ok(message)
        })
        .await
    }

    /// Make `id` the active session and load its history.
    pub async fn switch_to_chat(&self, id: Uuid) -> Result<()> {
        self.transition("switch_to_chat", async {
            let user = self.require_user().await?;
            self.owned_session(id, &user).await?;

            let history = self.messages.list_all_for_session(id).await?;
            self.state.send_modify(|s| {
                s.active_session_id = Some(id);
                s.active_messages = history;
            });
            self.watch_messages(id).await;
            debug!(target: "screwit::chat", "Switched to session {}", id);
            Ok(())
        })
        .await
    }

    /// Soft-delete a session and drop it from the list.
    pub async fn delete_chat(&self, id: Uuid) -> Result<()> {
        self.transition("delete_chat", async {
            let user = self.require_user().await?;
            self.owned_session(id, &user).await?;
            self.sessions.soft_delete(id).await?;

            let was_active = self.state.borrow().active_session_id == Some(id);
            if was_active {
                self.listeners.lock().await.stop_messages();
            }
            self.state.send_modify(|s| {
                s.sessions.retain(|session| session.id != id);
                if s.active_session_id == Some(id) {
                    s.active_session_id = None;
                    s.active_messages.clear();
                }
            });
            Ok(())
        })
        .await
    }

    /// Archive a session and drop it from the list.
    pub async fn archive_chat(&self, id: Uuid) -> Result<()> {
        self.transition("archive_chat", async {
            let user = self.require_user().await?;
            self.owned_session(id, &user).await?;
            self.sessions.archive(id).await?;
            self.state
                .send_modify(|s| s.sessions.retain(|session| session.id != id));
            Ok(())
        })
        .await
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    /// Wait for every scheduled reply to finish.
    pub async fn wait_for_pending_replies(&self) {
        let handles = std::mem::take(&mut *self.pending_replies.lock().await);
        for handle in handles {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    error!(target: "screwit::chat", "Reply task panicked: {}", e);
                }
            }
        }
    }

    /// Run one state transition: clear the error and raise `loading` on
    /// entry, lower it on exit and record the error message on failure.
    async fn transition<T, F>(&self, name: &'static str, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.state.send_modify(|s| {
            s.error = None;
            s.loading = true;
        });

        let result = op.await;

        if let Err(e) = &result {
            error!(target: "screwit::chat", "{} failed: {:?}", name, e);
        }
        self.state.send_modify(|s| {
            s.loading = false;
            if let Err(e) = &result {
                s.error = Some(e.to_string());
            }
        });
        result
    }

    async fn require_user(&self) -> Result<AuthUser> {
        self.user
            .lock()
            .await
            .clone()
            .ok_or(ScrewitError::AuthRequired)
    }

    /// Fetch a session, hiding sessions that belong to someone else.
    async fn owned_session(&self, id: Uuid, user: &AuthUser) -> Result<Session> {
        let session = self.sessions.require(id).await?;
        if !is_session_owned_by_user(&session, &user.uid) {
            warn!(
                target: "screwit::chat",
                "User {} tried to access session {} owned by {}",
                user.uid, id, session.user_id
            );
            return Err(ScrewitError::SessionNotFound(id));
        }
        Ok(session)
    }

    /// Point the message subscription at `session_id`, cancelling the
    /// previous one first.
    async fn watch_messages(&self, session_id: Uuid) {
        let mut listeners = self.listeners.lock().await;
        listeners.stop_messages();

        let mut sub = self.sync.watch_session_messages(session_id);
        let state = self.state.clone();
        listeners.messages = Some(tokio::spawn(async move {
            while let Some(snapshot) = sub.recv().await {
                state.send_if_modified(|s| {
                    if s.active_session_id != Some(session_id) {
                        return false;
                    }
                    s.active_messages = snapshot;
                    true
                });
            }
        }));
    }

    async fn spawn_reply(&self, request: PlanRequest) {
        let planner = self.planner.clone();
        let messages = self.messages.clone();
        let limit = self.config.planner_timeout;

        let handle = tokio::spawn(deliver_reply(planner, messages, limit, request));

        let mut pending = self.pending_replies.lock().await;
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }
}

impl Drop for ChatController {
    fn drop(&mut self) {
        let listeners = self.listeners.get_mut();
        listeners.stop_sessions();
        listeners.stop_messages();
    }
}

/// Replace the session list unless `generation` is no longer the current
/// identity. The check runs under the state lock, so it cannot interleave
/// with the reset in `attach_user`.
fn apply_session_snapshot(
    state: &watch::Sender<ChatState>,
    current: &AtomicU64,
    generation: u64,
    snapshot: Vec<Session>,
) -> bool {
    state.send_if_modified(|s| {
        if current.load(Ordering::SeqCst) != generation {
            return false;
        }
        s.sessions = snapshot;
        true
    })
}

/// Ask the planner for a reply and store it. Failures are logged only.
async fn deliver_reply(
    planner: Arc<dyn Planner>,
    messages: MessageClient,
    limit: Duration,
    request: PlanRequest,
) {
    let session_id = request.session_id;

    let response = match tokio::time::timeout(limit, planner.plan(request)).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            error!(target: "screwit::planner", "Planner failed for session {}: {}", session_id, e);
            return;
        }
        Err(_) => {
            warn!(
                target: "screwit::planner",
                "{} for session {}",
                ScrewitError::PlannerTimeout(limit),
                session_id
            );
            return;
        }
    };

    match messages
        .create(NewMessage::assistant(session_id, response.content, response.metadata))
        .await
    {
        Ok(message) => {
            debug!(target: "screwit::planner", "Stored reply {} for session {}", message.id, session_id);
        }
        Err(e) => {
            error!(target: "screwit::planner", "Failed to store reply for session {}: {}", session_id, e);
        }
    }
}
