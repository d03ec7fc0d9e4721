//! Session resolution: a live `(principal, loading)` view for the rest of the
//! shell, backed by an on-disk cache so an open session survives restarts.
//!
//! Whenever a session becomes live (resume from cache or fresh sign-in) the
//! resolver performs a **forced token refresh followed by an account lookup**
//! before anything downstream treats the user as authenticated. The lookup is
//! what picks up verification-status changes made out of band, e.g. the user
//! verifying their email somewhere else while this client was running.
//!
//! The resolver never leaves observers hanging: every path, including
//! failures, ends with a published state whose `loading` flag is `false`.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::errors::IdentityError;
use crate::identity::principal::{Principal, TokenSet};
use crate::identity::provider::IdentityProvider;

/// What the rest of the application sees of the session.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub principal: Option<Principal>,
    pub loading: bool,
}

impl SessionState {
    fn checking() -> Self {
        Self {
            principal: None,
            loading: true,
        }
    }

    fn signed_out() -> Self {
        Self {
            principal: None,
            loading: false,
        }
    }

    fn signed_in(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
            loading: false,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct CachedSession {
    principal: Principal,
    tokens: TokenSet,
}

pub struct SessionResolver {
    provider: Arc<dyn IdentityProvider>,
    cache_path: PathBuf,
    current: Mutex<Option<CachedSession>>,
    tx: watch::Sender<SessionState>,
}

impl SessionResolver {
    pub fn new(provider: Arc<dyn IdentityProvider>, cache_path: PathBuf) -> Self {
        let (tx, _) = watch::channel(SessionState::checking());
        Self {
            provider,
            cache_path,
            current: Mutex::new(None),
            tx,
        }
    }

    /// The current-user stream. Receivers see every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    pub fn principal(&self) -> Option<Principal> {
        self.current
            .lock()
            .expect("session lock poisoned")
            .as_ref()
            .map(|s| s.principal.clone())
    }

    /// Resolve the session at startup: resume from the cache file when one
    /// exists, with a forced refresh + lookup round-trip before publishing.
    ///
    /// On failure the published state is signed-out with `loading = false` —
    /// the error is returned for the caller to surface, but observers are
    /// never left in a loading state.
    pub async fn resolve(&self) -> Result<SessionState, IdentityError> {
        let cached = match self.read_cache() {
            Ok(Some(cached)) => cached,
            Ok(None) => {
                let state = SessionState::signed_out();
                self.tx.send_replace(state.clone());
                return Ok(state);
            }
            Err(err) => {
                // an unreadable cache must not leave observers loading forever
                warn!(error = %err, "session cache unreadable; treating as signed out");
                self.tx.send_replace(SessionState::signed_out());
                return Err(err);
            }
        };

        match self.revalidate(cached.tokens.refresh_token.clone()).await {
            Ok(state) => Ok(state),
            Err(err) => {
                warn!(error = %err, "session revalidation failed; treating as signed out");
                *self.current.lock().expect("session lock poisoned") = None;
                self.tx.send_replace(SessionState::signed_out());
                Err(err)
            }
        }
    }

    /// Install a freshly issued token set (sign-in, sign-up, password change)
    /// as the live session.
    pub async fn establish(&self, tokens: TokenSet) -> Result<Principal, IdentityError> {
        let principal = self.provider.lookup(&tokens.id_token).await?;
        self.install(CachedSession {
            principal: principal.clone(),
            tokens,
        })?;
        Ok(principal)
    }

    /// Force a refresh + lookup round-trip on the live session, picking up
    /// out-of-band changes such as email verification in another client.
    pub async fn reload(&self) -> Result<SessionState, IdentityError> {
        let refresh_token = {
            let current = self.current.lock().expect("session lock poisoned");
            current
                .as_ref()
                .map(|s| s.tokens.refresh_token.clone())
                .ok_or(IdentityError::NotSignedIn)?
        };
        self.revalidate(refresh_token).await
    }

    /// Drop the session: remove the cache file and publish signed-out.
    pub fn sign_out(&self) -> Result<(), IdentityError> {
        if self.cache_path.exists() {
            std::fs::remove_file(&self.cache_path).map_err(|source| {
                IdentityError::CacheWrite {
                    path: self.cache_path.clone(),
                    source,
                }
            })?;
        }
        *self.current.lock().expect("session lock poisoned") = None;
        self.tx.send_replace(SessionState::signed_out());
        Ok(())
    }

    /// A valid ID token for API calls, transparently refreshed near expiry.
    pub async fn id_token(&self) -> Result<String, IdentityError> {
        let (needs_refresh, refresh_token, id_token) = {
            let current = self.current.lock().expect("session lock poisoned");
            let session = current.as_ref().ok_or(IdentityError::NotSignedIn)?;
            (
                session.tokens.needs_refresh(chrono::Utc::now()),
                session.tokens.refresh_token.clone(),
                session.tokens.id_token.clone(),
            )
        };
        if !needs_refresh {
            return Ok(id_token);
        }
        debug!("ID token near expiry; refreshing");
        let tokens = self.provider.refresh(&refresh_token).await?;
        let id_token = tokens.id_token.clone();
        let snapshot = {
            let mut current = self.current.lock().expect("session lock poisoned");
            current.as_mut().map(|session| {
                session.tokens = tokens;
                CachedSession {
                    principal: session.principal.clone(),
                    tokens: session.tokens.clone(),
                }
            })
        };
        if let Some(snapshot) = snapshot {
            self.write_cache(&snapshot)?;
        }
        Ok(id_token)
    }

    async fn revalidate(&self, refresh_token: String) -> Result<SessionState, IdentityError> {
        let tokens = self.provider.refresh(&refresh_token).await?;
        let principal = self.provider.lookup(&tokens.id_token).await?;
        let state = SessionState::signed_in(principal.clone());
        self.install(CachedSession { principal, tokens })?;
        Ok(state)
    }

    fn install(&self, session: CachedSession) -> Result<(), IdentityError> {
        self.write_cache(&session)?;
        let state = SessionState::signed_in(session.principal.clone());
        *self.current.lock().expect("session lock poisoned") = Some(session);
        self.tx.send_replace(state);
        Ok(())
    }

    fn read_cache(&self) -> Result<Option<CachedSession>, IdentityError> {
        if !self.cache_path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.cache_path).map_err(|source| {
            IdentityError::CacheRead {
                path: self.cache_path.clone(),
                source,
            }
        })?;
        let session = serde_json::from_str(&raw).map_err(IdentityError::CacheDecode)?;
        Ok(Some(session))
    }

    fn write_cache(&self, session: &CachedSession) -> Result<(), IdentityError> {
        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| IdentityError::CacheWrite {
                path: self.cache_path.clone(),
                source,
            })?;
        }
        let raw = serde_json::to_string_pretty(session).expect("session cache serializes");
        std::fs::write(&self.cache_path, raw).map_err(|source| IdentityError::CacheWrite {
            path: self.cache_path.clone(),
            source,
        })
    }
}
