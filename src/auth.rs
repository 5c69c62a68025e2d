// Simulated identity provider and the explicit session context built on top of it
// Nothing here talks to a real backend: each call is a fixed delay followed by a mock answer

use crate::config::{AppConfig, LatencyConfig, StorageConfig};
use crate::store::{KeyValueStore, StoreError};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Not signed in")]
    NotSignedIn,

    #[error("Another account operation is already in progress")]
    OperationInFlight,

    // Shown to the user as-is, the detail only goes to the log
    #[error("Something went wrong, please try again")]
    Failed(String),

    #[error("Storage error: {0}")]
    StoreError(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub language: String,
    pub currency: String,
    pub notifications: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            language: "English".to_string(),
            currency: "INR".to_string(),
            notifications: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
}

#[derive(Debug, Clone)]
pub struct RegisterData {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

// Partial profile edit; unset fields keep their current value
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub preferences: Option<Preferences>,
}

impl ProfileUpdate {
    pub fn apply_to(self, user: &User) -> User {
        User {
            id: user.id.clone(),
            full_name: self.full_name.unwrap_or_else(|| user.full_name.clone()),
            email: self.email.unwrap_or_else(|| user.email.clone()),
            phone: self.phone.unwrap_or_else(|| user.phone.clone()),
            avatar: self.avatar.or_else(|| user.avatar.clone()),
            preferences: self.preferences.or_else(|| user.preferences.clone()),
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    async fn login(&self, email: &str, password: &str) -> Result<User, AuthError>;

    async fn register(&self, data: RegisterData) -> Result<User, AuthError>;

    async fn update_profile(&self, current: &User, update: ProfileUpdate) -> Result<User, AuthError>;
}

pub struct MockIdentityProvider {
    latency: Duration,
}

impl MockIdentityProvider {
    pub fn new(latency: &LatencyConfig) -> Self {
        Self {
            latency: latency.auth(),
        }
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn login(&self, email: &str, _password: &str) -> Result<User, AuthError> {
        sleep(self.latency).await;

        Ok(User {
            id: "1".to_string(),
            full_name: "John Doe".to_string(),
            email: email.to_string(),
            phone: "+91 9876543210".to_string(),
            avatar: None,
            preferences: Some(Preferences::default()),
        })
    }

    async fn register(&self, data: RegisterData) -> Result<User, AuthError> {
        sleep(self.latency).await;

        Ok(User {
            id: chrono::Utc::now().timestamp_millis().to_string(),
            full_name: data.full_name,
            email: data.email,
            phone: data.phone,
            avatar: None,
            preferences: Some(Preferences::default()),
        })
    }

    async fn update_profile(&self, current: &User, update: ProfileUpdate) -> Result<User, AuthError> {
        sleep(self.latency).await;
        Ok(update.apply_to(current))
    }
}

// Clears the in-flight flag however the guarded call ends
pub(crate) struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// The signed-in user, persisted under a single storage key
pub struct SessionContext {
    backend: Arc<dyn KeyValueStore>,
    provider: Arc<dyn IdentityProvider>,
    storage: StorageConfig,
    user: RwLock<Option<User>>,
    in_flight: AtomicBool,
}

impl SessionContext {
    // Rehydrate from storage; unreadable session data is dropped and treated as signed out
    pub fn restore(
        backend: Arc<dyn KeyValueStore>,
        provider: Arc<dyn IdentityProvider>,
        config: &AppConfig,
    ) -> Self {
        let storage = config.storage.clone();
        let user = match backend.get(&storage.session_key) {
            Some(raw) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => {
                    info!("Restored session for user {}", user.id);
                    Some(user)
                }
                Err(e) => {
                    warn!("Error parsing stored user data: {}", e);
                    if let Err(e) = backend.remove(&storage.session_key) {
                        warn!("Failed to remove corrupt session: {}", e);
                    }
                    None
                }
            },
            None => None,
        };

        Self {
            backend,
            provider,
            storage,
            user: RwLock::new(user),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.read().clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.user.read().as_ref().map(|user| user.id.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.read().is_some()
    }

    // True while a login/register/profile call is pending; callers disable the trigger
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(AuthError::OperationInFlight)?;

        match self.provider.login(email, password).await {
            Ok(user) => {
                self.establish(user.clone())?;
                info!("User {} logged in", user.id);
                Ok(user)
            }
            Err(e) => {
                error!("Login error: {:?}", e);
                Err(AuthError::Failed(e.to_string()))
            }
        }
    }

    pub async fn register(&self, data: RegisterData) -> Result<User, AuthError> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(AuthError::OperationInFlight)?;

        match self.provider.register(data).await {
            Ok(user) => {
                self.establish(user.clone())?;
                info!("Registered user {}", user.id);
                Ok(user)
            }
            Err(e) => {
                error!("Registration error: {:?}", e);
                Err(AuthError::Failed(e.to_string()))
            }
        }
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<User, AuthError> {
        let current = self.current_user().ok_or(AuthError::NotSignedIn)?;
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(AuthError::OperationInFlight)?;

        match self.provider.update_profile(&current, update).await {
            Ok(user) => {
                self.establish(user.clone())?;
                info!("Updated profile for user {}", user.id);
                Ok(user)
            }
            Err(e) => {
                error!("Profile update error: {:?}", e);
                Err(AuthError::Failed(e.to_string()))
            }
        }
    }

    // Rejected while a login/register/profile call is pending, so it cannot be undone by that call
    pub fn logout(&self) -> Result<(), AuthError> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(AuthError::OperationInFlight)?;
        let previous = self.user.write().take();
        self.backend.remove(&self.storage.session_key)?;
        if let Some(user) = previous {
            info!("User {} logged out", user.id);
        }
        Ok(())
    }

    fn establish(&self, user: User) -> Result<(), AuthError> {
        let raw = serde_json::to_string(&user).map_err(StoreError::from)?;
        self.backend.set(&self.storage.session_key, raw)?;
        *self.user.write() = Some(user);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tokio_test::{assert_err, assert_ok};

    fn fast_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.latency.auth_ms = 20;
        config
    }

    fn session_with(backend: Arc<dyn KeyValueStore>) -> SessionContext {
        let config = fast_config();
        let provider = Arc::new(MockIdentityProvider::new(&config.latency));
        SessionContext::restore(backend, provider, &config)
    }

    struct FailingProvider;

    #[async_trait]
    impl IdentityProvider for FailingProvider {
        async fn login(&self, _email: &str, _password: &str) -> Result<User, AuthError> {
            Err(AuthError::Failed("upstream unavailable".to_string()))
        }

        async fn register(&self, _data: RegisterData) -> Result<User, AuthError> {
            Err(AuthError::Failed("upstream unavailable".to_string()))
        }

        async fn update_profile(&self, _current: &User, _update: ProfileUpdate) -> Result<User, AuthError> {
            Err(AuthError::Failed("upstream unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_login_persists_session() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let session = session_with(Arc::clone(&backend));
        assert!(!session.is_authenticated());

        let user = assert_ok!(session.login("traveller@example.com", "secret").await);
        assert_eq!(user.id, "1");
        assert_eq!(user.full_name, "John Doe");
        assert_eq!(user.email, "traveller@example.com");
        assert_eq!(user.preferences, Some(Preferences::default()));
        assert!(!session.is_busy());

        // A fresh context over the same storage sees the same user
        let restored = session_with(backend);
        assert_eq!(restored.current_user(), Some(user));
    }

    #[tokio::test]
    async fn test_register_then_update_profile() {
        let session = session_with(Arc::new(MemoryStore::new()));
        let user = session
            .register(RegisterData {
                full_name: "Asha Oraon".to_string(),
                email: "asha@example.com".to_string(),
                phone: "+91 9000000000".to_string(),
                password: "pw".to_string(),
            })
            .await
            .unwrap();
        assert!(!user.id.is_empty());
        assert_eq!(user.full_name, "Asha Oraon");

        let updated = session
            .update_profile(ProfileUpdate {
                phone: Some("+91 9111111111".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.id, user.id);
        assert_eq!(updated.full_name, "Asha Oraon");
        assert_eq!(updated.phone, "+91 9111111111");
        assert_eq!(session.current_user(), Some(updated));
    }

    #[tokio::test]
    async fn test_update_profile_requires_session() {
        let session = session_with(Arc::new(MemoryStore::new()));
        let result = session.update_profile(ProfileUpdate::default()).await;
        assert!(matches!(result, Err(AuthError::NotSignedIn)));
    }

    #[tokio::test]
    async fn test_logout_clears_storage() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let session = session_with(Arc::clone(&backend));
        session.login("a@example.com", "pw").await.unwrap();
        assert!(backend.get("johar_user").is_some());

        session.logout().unwrap();
        assert!(!session.is_authenticated());
        assert!(backend.get("johar_user").is_none());
    }

    #[tokio::test]
    async fn test_concurrent_login_is_rejected() {
        let session = session_with(Arc::new(MemoryStore::new()));

        let (first, second) = futures::join!(
            session.login("a@example.com", "pw"),
            session.login("b@example.com", "pw")
        );
        assert_ok!(first);
        assert!(matches!(second, Err(AuthError::OperationInFlight)));
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_logout_during_login_is_rejected() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let session = session_with(Arc::clone(&backend));

        let early_logout = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            session.logout()
        };
        let (login, logout) = futures::join!(session.login("a@example.com", "pw"), early_logout);

        assert_ok!(login);
        assert!(matches!(logout, Err(AuthError::OperationInFlight)));
        assert!(session.is_authenticated());

        assert_ok!(session.logout());
        assert!(!session.is_authenticated());
        assert!(backend.get("johar_user").is_none());
    }

    #[tokio::test]
    async fn test_provider_failure_is_reported_generically() {
        let config = fast_config();
        let session = SessionContext::restore(
            Arc::new(MemoryStore::new()),
            Arc::new(FailingProvider),
            &config,
        );

        let err = assert_err!(session.login("a@example.com", "pw").await);
        assert_eq!(err.to_string(), "Something went wrong, please try again");
        assert!(!session.is_authenticated());
        assert!(!session.is_busy());
    }

    #[test]
    fn test_corrupt_session_is_discarded() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        backend.set("johar_user", "{broken".to_string()).unwrap();

        let session = session_with(Arc::clone(&backend));
        assert!(session.current_user().is_none());
        assert!(backend.get("johar_user").is_none());
    }
}
