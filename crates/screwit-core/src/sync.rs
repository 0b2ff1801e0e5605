//! Live subscriptions over the store's change feed.
//!
//! Each subscription is a task that re-runs one query whenever the store
//! reports a relevant write and pushes the full result set to its receiver.

use crate::config::ChatConfig;
use crate::messages::MessageClient;
use crate::sessions::SessionClient;
use crate::store::{DocumentStore, StoreChange};
use crate::Result;
use screwit_types::{Message, Session};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

/// Snapshots buffered per subscription before the listener waits.
const SNAPSHOT_BUFFER: usize = 16;

/// What a subscription is watching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchKey {
    UserSessions(String),
    SessionMessages(Uuid),
}

/// Handle to a live query.
///
/// Dropping the handle cancels the listener.
pub struct Subscription<T> {
    key: WatchKey,
    rx: mpsc::Receiver<T>,
    task: JoinHandle<()>,
}

impl<T> Subscription<T> {
    pub fn key(&self) -> &WatchKey {
        &self.key
    }

    /// Next snapshot, or `None` once cancelled.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Stop the listener. Snapshots already buffered are discarded.
    pub fn cancel(&mut self) {
        self.task.abort();
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
        debug!(target: "screwit::sync", "Cancelled subscription {:?}", self.key);
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Clone)]
pub struct SyncLayer {
    store: Arc<dyn DocumentStore>,
    sessions: SessionClient,
    messages: MessageClient,
    session_limit: usize,
}

impl SyncLayer {
    pub fn new(store: Arc<dyn DocumentStore>, config: &ChatConfig) -> Self {
        Self {
            sessions: SessionClient::new(store.clone()),
            messages: MessageClient::new(store.clone()),
            store,
            session_limit: config.session_list_limit,
        }
    }

    /// Active sessions of `user_id`, re-delivered after every session write
    /// for that user.
    pub fn watch_user_sessions(&self, user_id: impl Into<String>) -> Subscription<Vec<Session>> {
        let user_id: Arc<str> = Arc::from(user_id.into());
        let sessions = self.sessions.clone();
        let limit = self.session_limit;
        let watched = user_id.clone();

        spawn_watch(
            WatchKey::UserSessions(user_id.to_string()),
            self.store.changes(),
            move |change| {
                matches!(change, StoreChange::Session { user_id, .. } if user_id.as_str() == &*watched)
            },
            move || {
                let sessions = sessions.clone();
                let user_id = user_id.clone();
                async move { sessions.list_for_user(&user_id, limit).await }
            },
        )
    }

    /// The full ordered message list of `session_id`, re-delivered after
    /// every message written to it.
    pub fn watch_session_messages(&self, session_id: Uuid) -> Subscription<Vec<Message>> {
        let messages = self.messages.clone();

        spawn_watch(
            WatchKey::SessionMessages(session_id),
            self.store.changes(),
            move |change| {
                matches!(change, StoreChange::Message { chat_session_id, .. } if *chat_session_id == session_id)
            },
            move || {
                let messages = messages.clone();
                async move { messages.list_all_for_session(session_id).await }
            },
        )
    }
}

/// Spawn a listener that runs `query` once up front and again after every
/// change accepted by `relevant`. A lagged feed triggers a full re-query.
///
/// `changes` must be subscribed before the initial query so that no write
/// between the two is missed.
fn spawn_watch<T, F, Q, Fut>(
    key: WatchKey,
    mut changes: broadcast::Receiver<StoreChange>,
    relevant: F,
    query: Q,
) -> Subscription<T>
where
    T: Send + 'static,
    F: Fn(&StoreChange) -> bool + Send + 'static,
    Q: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
    let task_key = key.clone();

    let task = tokio::spawn(async move {
        debug!(target: "screwit::sync", "Subscribed to {:?}", task_key);
        let mut refresh = true;

        loop {
            if refresh {
                match query().await {
                    Ok(snapshot) => {
                        if tx.send(snapshot).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!(target: "screwit::sync", "Query for {:?} failed: {}", task_key, e);
                    }
                }
            }

            refresh = match changes.recv().await {
                Ok(change) => {
                    trace!(target: "screwit::sync", "{} change for {:?}", change.collection().name(), task_key);
                    relevant(&change)
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        target: "screwit::sync",
                        "Change feed lagged by {} events for {:?}, resyncing",
                        skipped, task_key
                    );
                    true
                }
                Err(RecvError::Closed) => break,
            };
        }

        debug!(target: "screwit::sync", "Listener for {:?} stopped", task_key);
    });

    Subscription { key, rx, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use screwit_types::{CapabilityFlags, NewMessage, NewSession};
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);

    struct Fixture {
        sync: SyncLayer,
        sessions: SessionClient,
        messages: MessageClient,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        Fixture {
            sync: SyncLayer::new(store.clone(), &ChatConfig::default()),
            sessions: SessionClient::new(store.clone()),
            messages: MessageClient::new(store),
        }
    }

    fn new_session(title: &str, user_id: &str) -> NewSession {
        NewSession {
            title: title.to_string(),
            user_id: user_id.to_string(),
            agent_options: Some(CapabilityFlags::default()),
        }
    }

    async fn next<T>(sub: &mut Subscription<T>) -> T {
        timeout(WAIT, sub.recv()).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_user_sessions_initial_and_updates() {
        let f = fixture();
        f.sessions.create(new_session("Homecoming", "u1")).await.unwrap();

        let mut sub = f.sync.watch_user_sessions("u1");
        assert_eq!(sub.key(), &WatchKey::UserSessions("u1".to_string()));
        assert_eq!(next(&mut sub).await.len(), 1);

        let second = f.sessions.create(new_session("Green Key", "u1")).await.unwrap();
        let snapshot = next(&mut sub).await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id, second.id);

        f.sessions.archive(second.id).await.unwrap();
        assert_eq!(next(&mut sub).await.len(), 1);
    }

    #[tokio::test]
    async fn test_other_users_writes_are_ignored() {
        let f = fixture();
        let mut sub = f.sync.watch_user_sessions("u1");
        assert!(next(&mut sub).await.is_empty());

        f.sessions.create(new_session("Not mine", "u2")).await.unwrap();
        assert!(timeout(Duration::from_millis(100), sub.recv()).await.is_err());
    }

    #[tokio::test]
    async fn test_session_messages_in_order() {
        let f = fixture();
        let session = f.sessions.create(new_session("Dimensions", "u1")).await.unwrap();

        let mut sub = f.sync.watch_session_messages(session.id);
        assert!(next(&mut sub).await.is_empty());

        f.messages.create(NewMessage::user(session.id, "first")).await.unwrap();
        assert_eq!(next(&mut sub).await.len(), 1);

        f.messages.create(NewMessage::user(session.id, "second")).await.unwrap();
        let snapshot = next(&mut sub).await;
        let contents: Vec<_> = snapshot.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_session_messages_beyond_list_limit() {
        let f = fixture();
        let session = f.sessions.create(new_session("Senior week", "u1")).await.unwrap();
        for i in 0..ChatConfig::default().message_list_limit {
            f.messages
                .create(NewMessage::user(session.id, format!("m{}", i)))
                .await
                .unwrap();
        }

        let mut sub = f.sync.watch_session_messages(session.id);
        assert_eq!(next(&mut sub).await.len(), 100);

        f.messages.create(NewMessage::user(session.id, "newest")).await.unwrap();
        let snapshot = next(&mut sub).await;
        assert_eq!(snapshot.len(), 101);
        assert_eq!(snapshot.first().unwrap().content, "m0");
        assert_eq!(snapshot.last().unwrap().content, "newest");
    }

    #[tokio::test]
    async fn test_cancel_stops_delivery() {
        let f = fixture();
        let session = f.sessions.create(new_session("Carnival", "u1")).await.unwrap();

        let mut sub = f.sync.watch_session_messages(session.id);
        next(&mut sub).await;
        sub.cancel();

        f.messages.create(NewMessage::user(session.id, "late")).await.unwrap();
        assert!(timeout(WAIT, sub.recv()).await.unwrap().is_none());
    }
}
