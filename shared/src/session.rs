use crate::error::Result;
use crate::kv::KeyValueStore;
use crate::storage::ElectionStore;
use crate::validation::validate_dni;

pub const USER_DNI_KEY: &str = "userDNI";
pub const USER_LOGGED_IN_KEY: &str = "userLoggedIn";
pub const ADMIN_EMAIL_KEY: &str = "adminEmail";
pub const ADMIN_LOGGED_IN_KEY: &str = "adminLoggedIn";

const LOGGED_IN: &str = "true";

/// An authenticated voter. Only [`ElectionStore::login_voter`] and
/// [`ElectionStore::restore_voter_session`] hand these out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoterSession {
    dni: String,
}

impl VoterSession {
    pub(crate) fn new(dni: impl Into<String>) -> Self {
        Self { dni: dni.into() }
    }

    pub fn dni(&self) -> &str {
        &self.dni
    }
}

/// An authenticated administrator, required by every candidate mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    email: String,
}

impl AdminSession {
    pub(crate) fn new(email: impl Into<String>) -> Self {
        Self { email: email.into() }
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

// Marker keys let a client that keeps its session in the store (a browser tab)
// pick it up again after a reload.
impl<S: KeyValueStore> ElectionStore<S> {
    pub fn persist_voter_session(&mut self, session: &VoterSession) -> Result<()> {
        self.store.set(USER_DNI_KEY, session.dni())?;
        self.store.set(USER_LOGGED_IN_KEY, LOGGED_IN)?;
        Ok(())
    }

    pub fn restore_voter_session(&self) -> Option<VoterSession> {
        if self.store.get(USER_LOGGED_IN_KEY).as_deref() != Some(LOGGED_IN) {
            return None;
        }
        let dni = self.store.get(USER_DNI_KEY)?;
        validate_dni(&dni).ok()?;
        Some(VoterSession::new(dni))
    }

    pub fn clear_voter_session(&mut self) -> Result<()> {
        self.store.remove(USER_LOGGED_IN_KEY)?;
        self.store.remove(USER_DNI_KEY)?;
        Ok(())
    }

    pub fn persist_admin_session(&mut self, session: &AdminSession) -> Result<()> {
        self.store.set(ADMIN_EMAIL_KEY, session.email())?;
        self.store.set(ADMIN_LOGGED_IN_KEY, LOGGED_IN)?;
        Ok(())
    }

    /// The stored email must still belong to a registered admin.
    pub fn restore_admin_session(&self) -> Option<AdminSession> {
        if self.store.get(ADMIN_LOGGED_IN_KEY).as_deref() != Some(LOGGED_IN) {
            return None;
        }
        let email = self.store.get(ADMIN_EMAIL_KEY)?;
        self.admins().iter()
            .any(|a| a.email == email)
            .then(|| AdminSession::new(email))
    }

    pub fn clear_admin_session(&mut self) -> Result<()> {
        self.store.remove(ADMIN_LOGGED_IN_KEY)?;
        self.store.remove(ADMIN_EMAIL_KEY)?;
        Ok(())
    }
}
