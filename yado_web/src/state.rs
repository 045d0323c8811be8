use std::{collections::HashMap, error::Error, sync::Arc};

use eventstore::ClientSettings;
use tokio::sync::RwLock;
use uuid::Uuid;

use yado::{
    domain::core::{Role, UserId},
    YadoConfig,
};

/// 各ハンドラが共有するアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub eventstore: eventstore::Client,
    pub meilisearch: meilisearch_sdk::Client,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: &YadoConfig) -> Result<Self, Box<dyn Error>> {
        let settings = config.eventstore.url.parse::<ClientSettings>()?;
        Ok(Self {
            eventstore: eventstore::Client::new(settings)?,
            meilisearch: meilisearch_sdk::Client::new(
                &config.meilisearch.url,
                &config.meilisearch.api_key,
            ),
            sessions: SessionStore::default(),
        })
    }
}

/// ログイン中のセッション
#[derive(Clone, Debug)]
pub struct Session {
    pub user_id: UserId,
    pub role: Role,
}

/// プロセス内セッションストア
///
/// トークンはUUID v4。プロセス再起動でセッションは失効する。
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    /// セッションを開始してトークンを発行する
    pub async fn open(&self, user_id: UserId, role: Role) -> String {
        let token = Uuid::new_v4().to_string();
        self.sessions
            .write()
            .await
            .insert(token.clone(), Session { user_id, role });
        token
    }

    pub async fn find(&self, token: &str) -> Option<Session> {
        self.sessions.read().await.get(token).cloned()
    }

    pub async fn close(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_lifecycle() {
        let store = SessionStore::default();
        let token = store.open(UserId::from(5), Role::Customer).await;
        let session = store.find(&token).await.unwrap();
        assert_eq!(session.user_id, UserId::from(5));
        assert_eq!(session.role, Role::Customer);

        assert!(store.close(&token).await);
        assert!(store.find(&token).await.is_none());
        assert!(!store.close(&token).await);
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let store = SessionStore::default();
        let first = store.open(UserId::from(1), Role::Customer).await;
        let second = store.open(UserId::from(1), Role::Customer).await;
        assert_ne!(first, second);
    }
}
