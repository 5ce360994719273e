use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use crate::audit::{self, AuditReport};
use crate::error::{ElectionError, Result};
use crate::kv::{KeyValueStore, StoreError};
use crate::models::*;
use crate::session::{AdminSession, VoterSession};
use crate::tally::{self, ElectionSummary};
use crate::validation::{self, ADMIN_ACCESS_CODE};

pub const VOTES_KEY: &str = "votes";
pub const ADMINS_KEY: &str = "admins";
pub const DRAFTS_KEY: &str = "ballotDrafts";

const DEFAULT_PRESIDENTS: [(&str, &str, &str, &str); 3] = [
    ("p1", "María Elena Rodríguez", "Partido Progresista",
     "https://images.unsplash.com/photo-1573496359142-b8d87734a5a2?w=400&h=400&fit=crop"),
    ("p2", "Carlos Andrés Mendoza", "Frente Nacional",
     "https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?w=400&h=400&fit=crop"),
    ("p3", "Ana Patricia Gómez", "Alianza Democrática",
     "https://images.unsplash.com/photo-1580489944761-15a19d654956?w=400&h=400&fit=crop"),
];

const DEFAULT_MAYORS: [(&str, &str, &str, &str); 3] = [
    ("m1", "José Luis Hernández", "Movimiento Ciudadano",
     "https://images.unsplash.com/photo-1556157382-97eda2d62296?w=400&h=400&fit=crop"),
    ("m2", "Laura Beatriz Silva", "Fuerza Local",
     "https://images.unsplash.com/photo-1594744803329-e58b31de8bf5?w=400&h=400&fit=crop"),
    ("m3", "Roberto Fernández", "Renovación Municipal",
     "https://images.unsplash.com/photo-1472099645785-5658abf4ff4e?w=400&h=400&fit=crop"),
];

pub fn default_candidates(role: Role) -> Vec<Candidate> {
    let seed = match role {
        Role::President => &DEFAULT_PRESIDENTS,
        Role::Mayor => &DEFAULT_MAYORS,
    };
    seed.iter().map(|&(id, name, party, photo)| Candidate {
        id: id.into(),
        name: name.into(),
        party: party.into(),
        photo: photo.into(),
        role,
        votes: 0,
    }).collect()
}

/// Typed access to the election collections kept in a [`KeyValueStore`].
///
/// Each collection is one JSON array under a fixed key. Reads are lenient:
/// an absent or unreadable value is an empty collection and rows that do not
/// decode are skipped. Every write replaces the whole array, so updates load
/// strictly and refuse to overwrite a value they could not fully decode.
pub struct ElectionStore<S> {
    pub(crate) store: S,
    access_code: String,
}

impl<S: KeyValueStore> ElectionStore<S> {
    pub fn new(store: S) -> Self {
        Self { store, access_code: ADMIN_ACCESS_CODE.to_string() }
    }

    pub fn with_access_code(mut self, access_code: impl Into<String>) -> Self {
        self.access_code = access_code.into();
        self
    }

    pub fn backing_store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    pub(crate) fn read_collection<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let Some(raw) = self.store.get(key) else { return Vec::new() };
        let rows: Vec<Value> = match serde_json::from_str(&raw) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(key, error = %e, "Stored collection is malformed, reading it as empty");
                return Vec::new();
            }
        };

        let total = rows.len();
        let items: Vec<T> = rows.into_iter()
            .filter_map(|row| serde_json::from_value(row).ok())
            .collect();
        if items.len() < total {
            warn!(key, skipped = total - items.len(), "Skipped malformed rows in stored collection");
        }
        items
    }

    /// Loads a collection that is about to be rewritten. Any row that fails to
    /// decode fails the whole load, leaving the stored value untouched.
    pub(crate) fn load_collection<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        let raw = match self.store.get(key) {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(Vec::new()),
        };
        serde_json::from_str(&raw).map_err(|e| {
            warn!(key, error = %e, "Refusing to overwrite malformed stored collection");
            ElectionError::Storage(StoreError::Serialization(format!("{key}: {e}")))
        })
    }

    pub(crate) fn write_collection<T: Serialize>(&mut self, key: &str, items: &[T]) -> Result<()> {
        let raw = serde_json::to_string(items)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.set(key, &raw)?;
        Ok(())
    }

    pub fn initialize_defaults(&mut self) -> Result<()> {
        for role in Role::ALL {
            let present = self.store.get(role.collection_key()).is_some_and(|raw| !raw.is_empty());
            if !present {
                self.save_candidates(role, &default_candidates(role))?;
                info!(%role, "Seeded default candidates");
            }
        }
        Ok(())
    }

    pub fn candidates(&self, role: Role) -> Vec<Candidate> {
        self.read_collection(role.collection_key())
    }

    pub fn candidate(&self, role: Role, id: &str) -> Option<Candidate> {
        self.candidates(role).into_iter().find(|c| c.id == id)
    }

    /// Replaces the whole collection for `role`. No merge with what is stored.
    pub fn save_candidates(&mut self, role: Role, candidates: &[Candidate]) -> Result<()> {
        self.write_collection(role.collection_key(), candidates)
    }

    pub fn all_votes(&self) -> Vec<Vote> {
        self.read_collection(VOTES_KEY)
    }

    pub fn user_vote(&self, dni: &str) -> Option<Vote> {
        self.all_votes().into_iter().find(|v| v.dni == dni)
    }

    /// Upserts by DNI: any earlier record for the same voter is dropped before
    /// the new one is appended, then tallies are rebuilt. Ballot finality is
    /// enforced by [`ElectionStore::cast_selection`], not here.
    pub fn save_vote(&mut self, vote: Vote) -> Result<()> {
        self.commit_vote(vote)?;
        self.update_vote_counts()
    }

    /// Writes the vote record alone. Once this returns `Ok` the ballot is
    /// stored, whatever happens to the tallies afterwards.
    pub(crate) fn commit_vote(&mut self, vote: Vote) -> Result<()> {
        let mut votes: Vec<Vote> = self.load_collection(VOTES_KEY)?;
        votes.retain(|v| v.dni != vote.dni);
        debug!(dni = %vote.dni, "Saving vote record");
        votes.push(vote);
        self.write_collection(VOTES_KEY, &votes)
    }

    pub fn update_vote_counts(&mut self) -> Result<()> {
        let votes = self.all_votes();
        let mut presidents: Vec<Candidate> = self.load_collection(Role::President.collection_key())?;
        let mut mayors: Vec<Candidate> = self.load_collection(Role::Mayor.collection_key())?;

        tally::recount(&mut presidents, &mut mayors, &votes);

        self.save_candidates(Role::President, &presidents)?;
        self.save_candidates(Role::Mayor, &mayors)
    }

    pub fn summary(&self) -> ElectionSummary {
        ElectionSummary::new(
            &self.candidates(Role::President),
            &self.candidates(Role::Mayor),
            self.all_votes().len(),
        )
    }

    pub fn audit_votes(&self) -> AuditReport {
        self.audit_rows(&self.all_votes())
    }

    pub fn audit_rows(&self, rows: &[Vote]) -> AuditReport {
        audit::audit(rows, &self.candidates(Role::President), &self.candidates(Role::Mayor))
    }

    pub fn add_candidate(&mut self, admin: &AdminSession, role: Role, form: &CandidateForm) -> Result<Candidate> {
        validation::validate_candidate_form(form)?;
        let mut candidates: Vec<Candidate> = self.load_collection(role.collection_key())?;
        let candidate = Candidate::new(next_candidate_id(role, &candidates), role, form);
        candidates.push(candidate.clone());
        self.save_candidates(role, &candidates)?;
        info!(admin = admin.email(), %role, id = %candidate.id, "Candidate added");
        Ok(candidate)
    }

    /// Name, party and photo are replaced; id, role and the cached count stay.
    pub fn update_candidate(&mut self, admin: &AdminSession, role: Role, id: &str, form: &CandidateForm) -> Result<Candidate> {
        validation::validate_candidate_form(form)?;
        let mut candidates: Vec<Candidate> = self.load_collection(role.collection_key())?;
        let slot = candidates.iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| ElectionError::CandidateNotFound { role, id: id.to_string() })?;

        slot.name = form.name.trim().to_string();
        slot.party = form.party.trim().to_string();
        slot.photo = form.photo.trim().to_string();
        let updated = slot.clone();

        self.save_candidates(role, &candidates)?;
        info!(admin = admin.email(), %role, id, "Candidate updated");
        Ok(updated)
    }

    pub fn delete_candidate(&mut self, admin: &AdminSession, role: Role, id: &str) -> Result<Candidate> {
        let mut candidates: Vec<Candidate> = self.load_collection(role.collection_key())?;
        let pos = candidates.iter()
            .position(|c| c.id == id)
            .ok_or_else(|| ElectionError::CandidateNotFound { role, id: id.to_string() })?;
        let removed = candidates.remove(pos);
        self.save_candidates(role, &candidates)?;
        info!(admin = admin.email(), %role, id, "Candidate deleted");
        Ok(removed)
    }

    pub fn admins(&self) -> Vec<AdminAccount> {
        self.read_collection(ADMINS_KEY)
    }

    pub fn register_admin(&mut self, registration: &AdminRegistration) -> Result<AdminAccount> {
        validation::validate_registration(registration, &self.access_code)?;

        let email = registration.email.trim();
        let mut admins: Vec<AdminAccount> = self.load_collection(ADMINS_KEY)?;
        if admins.iter().any(|a| a.email == email) {
            return Err(ElectionError::DuplicateEmail(email.to_string()));
        }

        let account = AdminAccount {
            name: registration.name.trim().to_string(),
            email: email.to_string(),
            password: registration.password.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        admins.push(account.clone());
        self.write_collection(ADMINS_KEY, &admins)?;
        info!(email, "Admin registered");
        Ok(account)
    }

    pub fn authenticate_admin(&self, email: &str, password: &str) -> Result<AdminSession> {
        let email = email.trim();
        self.admins().iter()
            .find(|a| a.email == email && a.password == password)
            .map(|a| AdminSession::new(a.email.clone()))
            .ok_or(ElectionError::InvalidCredentials)
    }

    pub fn login_voter(&self, dni: &str) -> Result<VoterSession> {
        validation::validate_dni(dni)?;
        Ok(VoterSession::new(dni))
    }

    pub fn draft(&self, dni: &str) -> Option<BallotDraft> {
        self.read_collection::<BallotDraft>(DRAFTS_KEY).into_iter().find(|d| d.dni == dni)
    }

    pub(crate) fn save_draft(&mut self, draft: &BallotDraft) -> Result<()> {
        let mut drafts: Vec<BallotDraft> = self.load_collection(DRAFTS_KEY)?;
        drafts.retain(|d| d.dni != draft.dni);
        drafts.push(draft.clone());
        self.write_collection(DRAFTS_KEY, &drafts)
    }

    pub(crate) fn discard_draft(&mut self, dni: &str) -> Result<()> {
        let mut drafts: Vec<BallotDraft> = self.load_collection(DRAFTS_KEY)?;
        let before = drafts.len();
        drafts.retain(|d| d.dni != dni);
        if drafts.len() == before {
            return Ok(());
        }
        self.write_collection(DRAFTS_KEY, &drafts)
    }
}

/// Role letter followed by the current Unix time in milliseconds, bumped
/// forward until it does not collide with an existing id.
fn next_candidate_id(role: Role, existing: &[Candidate]) -> String {
    let mut millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    loop {
        let id = format!("{}{}", role.id_prefix(), millis);
        if !existing.iter().any(|c| c.id == id) {
            return id;
        }
        millis += 1;
    }
}
