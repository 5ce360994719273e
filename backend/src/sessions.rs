use std::collections::HashMap;
use std::sync::Mutex;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use shared::{AdminSession, VoterSession};
use time::OffsetDateTime;
use tracing::{debug, error, info};
use uuid::Uuid;
use crate::error::ApiError;
use crate::routes::AppState;

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone)]
pub enum Actor {
    Voter(VoterSession),
    Admin(AdminSession),
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub actor: Actor,
    pub started_at: OffsetDateTime,
}

/// Bearer tokens handed out at login. A token lives until logout; there is
/// no expiry.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
    rng: SystemRandom,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            rng: SystemRandom::new(),
        }
    }

    fn generate_token(&self) -> Result<String, ApiError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng.fill(&mut bytes)
            .map_err(|_| ApiError::Internal("random source unavailable".into()))?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn open(&self, actor: Actor) -> Result<String, ApiError> {
        let token = self.generate_token()?;
        let session = Session { id: Uuid::new_v4(), actor, started_at: OffsetDateTime::now_utc() };
        let mut sessions = self.sessions.lock().map_err(|_| {
            error!("Failed to acquire lock for session storage");
            ApiError::Internal("session lock poisoned".into())
        })?;
        info!(session_id = %session.id, "Session opened");
        sessions.insert(token.clone(), session);
        Ok(token)
    }

    pub fn get(&self, token: &str) -> Option<Session> {
        self.sessions.lock().ok()?.get(token).cloned()
    }

    pub fn close(&self, token: &str) -> bool {
        let Ok(mut sessions) = self.sessions.lock() else { return false };
        match sessions.remove(token) {
            Some(session) => {
                info!(session_id = %session.id, "Session closed");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn bearer_token<'r>(req: &'r Request<'_>) -> Option<&'r str> {
    req.headers()
        .get_one("Authorization")?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn lookup(req: &Request<'_>) -> Option<(String, Session)> {
    let token = bearer_token(req)?;
    let state = req.rocket().state::<AppState>()?;
    let session = state.sessions.get(token);
    if session.is_none() {
        debug!("Unknown or closed session token");
    }
    session.map(|s| (token.to_string(), s))
}

pub struct VoterAuth {
    pub voter: VoterSession,
    pub token: String,
    pub session_id: Uuid,
}

pub struct AdminAuth {
    pub admin: AdminSession,
    pub token: String,
    pub session_id: Uuid,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for VoterAuth {
    type Error = ApiError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match lookup(req) {
            Some((token, Session { id, actor: Actor::Voter(voter), .. })) => {
                Outcome::Success(VoterAuth { voter, token, session_id: id })
            }
            _ => Outcome::Error((Status::Unauthorized, ApiError::NotAuthenticated)),
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminAuth {
    type Error = ApiError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match lookup(req) {
            Some((token, Session { id, actor: Actor::Admin(admin), .. })) => {
                Outcome::Success(AdminAuth { admin, token, session_id: id })
            }
            _ => Outcome::Error((Status::Unauthorized, ApiError::NotAuthenticated)),
        }
    }
}
