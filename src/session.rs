use anyhow::{Context, Result, anyhow};
use keyring::Entry;
use serde::{Deserialize, Serialize};

use crate::rest_types::AdminUser;

pub const KEYRING_SERVICE: &str = "pbadmin-session";
pub const KEYRING_USER: &str = "MyPrintBot";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub user: AdminUser,
    pub token: String,
}

/// Where a session survives between runs.
pub trait SessionStore {
    fn load(&self) -> Result<Option<PersistedSession>>;
    fn save(&self, session: &PersistedSession) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

pub struct KeyringStore {
    entry: Entry,
}

impl KeyringStore {
    pub fn open() -> Result<Self> {
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
        Ok(Self { entry })
    }
}

impl SessionStore for KeyringStore {
    fn load(&self) -> Result<Option<PersistedSession>> {
        match self.entry.get_secret() {
            Ok(secret) => {
                let session = serde_json::from_slice(&secret)
                    .context("Stored session is unreadable; run `pbadmin login` again")?;
                Ok(Some(session))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Unable to read session from OS keyring"),
        }
    }

    fn save(&self, session: &PersistedSession) -> Result<()> {
        let secret = serde_json::to_vec(session)?;
        self.entry
            .set_secret(&secret)
            .context("Unable to store session in OS keyring")
    }

    fn clear(&self) -> Result<()> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Unable to remove session from OS keyring"),
        }
    }
}

/// The signed-in admin, passed explicitly to whatever needs a token.
pub struct Session<S> {
    store: S,
    current: Option<PersistedSession>,
}

impl<S: SessionStore> Session<S> {
    /// Restores whatever the store persisted last time.
    pub fn hydrate(store: S) -> Result<Self> {
        let current = store.load()?;
        if let Some(session) = &current {
            tracing::debug!(email = %session.user.email, "restored session");
        }
        Ok(Self { store, current })
    }

    /// Like `hydrate`, but an unreadable store counts as signed out.
    pub fn hydrate_or_signed_out(store: S) -> Self {
        let current = store.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring unreadable stored session");
            None
        });
        Self { store, current }
    }

    pub fn login(&mut self, user: AdminUser, token: String) -> Result<()> {
        let session = PersistedSession { user, token };
        self.store.save(&session)?;
        tracing::info!(email = %session.user.email, "signed in");
        self.current = Some(session);
        Ok(())
    }

    pub fn logout(&mut self) -> Result<()> {
        self.current = None;
        self.store.clear()
    }

    pub fn set_user(&mut self, user: AdminUser) -> Result<()> {
        let Some(session) = self.current.as_mut() else {
            return Err(anyhow!("Not signed in"));
        };
        session.user = user;
        self.store.save(session)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    pub fn user(&self) -> Option<&AdminUser> {
        self.current.as_ref().map(|s| &s.user)
    }

    pub fn token(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.token.as_str())
    }
}

/// Restores the session for a command. With a token from the environment the keyring is only
/// a fallback, and an unreadable one counts as signed out.
pub fn restore_session<S: SessionStore>(store: S, env_token: Option<&str>) -> Result<Session<S>> {
    if env_token.is_some() {
        Ok(Session::hydrate_or_signed_out(store))
    } else {
        Session::hydrate(store)
    }
}
