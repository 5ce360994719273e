use std::sync::Mutex;
use rocket::{State, get, post, put, delete, http::Status, serde::json::Json};
use serde::Serialize;
use shared::audit::AuditReport;
use shared::validation::ValidationError;
use shared::{
    AdminAccount, AdminRegistration, BallotState, Candidate, CandidateForm, Credentials, ElectionError,
    ElectionStore, ElectionSummary, Role, Selection, Vote, VoterLogin, VoterResults,
};
use time::OffsetDateTime;
use tracing::{debug, error, info, instrument};
use crate::{
    config::AppConfig,
    error::ApiError,
    sessions::{Actor, AdminAuth, SessionRegistry, VoterAuth},
    store::FileStore,
};

pub struct AppState {
    pub store: Mutex<ElectionStore<FileStore>>,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(store: ElectionStore<FileStore>) -> Self {
        Self {
            store: Mutex::new(store),
            sessions: SessionRegistry::new(),
        }
    }

    /// Opens the store file named by `config` and seeds default candidates.
    pub fn open(config: &AppConfig) -> Result<Self, ElectionError> {
        let file = FileStore::open(&config.store_path)?;
        let mut store = ElectionStore::new(file).with_access_code(config.access_code.clone());
        store.initialize_defaults()?;
        Ok(Self::new(store))
    }

    /// Runs `op` with exclusive access to the store; all reads and writes go
    /// through here, one request at a time.
    pub fn with_store<T>(
        &self,
        op: impl FnOnce(&mut ElectionStore<FileStore>) -> Result<T, ElectionError>,
    ) -> Result<T, ApiError> {
        let mut store = self.store.lock().map_err(|_| {
            error!("Failed to acquire lock for election store");
            ApiError::Internal("store lock poisoned".into())
        })?;
        op(&mut store).map_err(ApiError::from)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterLoginResponse {
    pub token: String,
    pub dni: String,
    pub ballot: BallotState,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginResponse {
    pub token: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub name: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<AdminAccount> for AdminProfile {
    fn from(account: AdminAccount) -> Self {
        Self { name: account.name, email: account.email, created_at: account.created_at }
    }
}

#[rocket::options("/<_..>")]
pub async fn all_options() -> Status {
    Status::Ok
}

#[instrument(skip(state, login))]
#[post("/voter/login", format = "json", data = "<login>")]
pub async fn voter_login(state: &State<AppState>, login: Json<VoterLogin>) -> Result<Json<VoterLoginResponse>, ApiError> {
    let (voter, ballot) = state.with_store(|store| {
        let voter = store.login_voter(login.dni.trim())?;
        let ballot = store.ballot_state(&voter);
        Ok((voter, ballot))
    })?;
    let token = state.sessions.open(Actor::Voter(voter.clone()))?;
    Ok(Json(VoterLoginResponse { token, dni: voter.dni().to_string(), ballot }))
}

#[instrument(skip_all, fields(session_id = %auth.session_id))]
#[post("/voter/logout")]
pub async fn voter_logout(state: &State<AppState>, auth: VoterAuth) -> Status {
    state.sessions.close(&auth.token);
    Status::NoContent
}

#[instrument(skip_all, fields(session_id = %auth.session_id))]
#[get("/voter/ballot")]
pub async fn get_ballot(state: &State<AppState>, auth: VoterAuth) -> Result<Json<BallotState>, ApiError> {
    state.with_store(|store| Ok(store.ballot_state(&auth.voter))).map(Json)
}

#[instrument(skip_all, fields(session_id = %auth.session_id, role = %selection.role))]
#[post("/voter/ballot", format = "json", data = "<selection>")]
pub async fn cast_selection(
    state: &State<AppState>,
    auth: VoterAuth,
    selection: Json<Selection>,
) -> Result<Json<BallotState>, ApiError> {
    let Selection { role, candidate_id } = selection.into_inner();
    let ballot = state.with_store(|store| store.cast_selection(&auth.voter, role, &candidate_id))?;
    debug!(complete = ballot.is_complete(), "Selection recorded");
    Ok(Json(ballot))
}

#[instrument(skip_all, fields(session_id = %auth.session_id))]
#[get("/voter/results")]
pub async fn voter_results(state: &State<AppState>, auth: VoterAuth) -> Result<Json<VoterResults>, ApiError> {
    state.with_store(|store| store.voter_results(&auth.voter)).map(Json)
}

#[get("/candidates/<role>")]
pub async fn list_candidates(
    state: &State<AppState>,
    role: Result<Role, ValidationError>,
) -> Result<Json<Vec<Candidate>>, ApiError> {
    let role = role?;
    state.with_store(|store| Ok(store.candidates(role))).map(Json)
}

#[instrument(skip(state, registration), fields(email = %registration.email))]
#[post("/admin/register", format = "json", data = "<registration>")]
pub async fn admin_register(
    state: &State<AppState>,
    registration: Json<AdminRegistration>,
) -> Result<(Status, Json<AdminProfile>), ApiError> {
    let account = state.with_store(|store| store.register_admin(&registration))?;
    Ok((Status::Created, Json(account.into())))
}

#[instrument(skip(state, credentials), fields(email = %credentials.email))]
#[post("/admin/login", format = "json", data = "<credentials>")]
pub async fn admin_login(
    state: &State<AppState>,
    credentials: Json<Credentials>,
) -> Result<Json<AdminLoginResponse>, ApiError> {
    let admin = state.with_store(|store| store.authenticate_admin(&credentials.email, &credentials.password))?;
    let email = admin.email().to_string();
    let token = state.sessions.open(Actor::Admin(admin))?;
    info!("Admin logged in");
    Ok(Json(AdminLoginResponse { token, email }))
}

#[instrument(skip_all, fields(session_id = %auth.session_id))]
#[post("/admin/logout")]
pub async fn admin_logout(state: &State<AppState>, auth: AdminAuth) -> Status {
    state.sessions.close(&auth.token);
    Status::NoContent
}

#[instrument(skip_all, fields(session_id = %auth.session_id))]
#[post("/admin/candidates/<role>", format = "json", data = "<form>")]
pub async fn add_candidate(
    state: &State<AppState>,
    auth: AdminAuth,
    role: Result<Role, ValidationError>,
    form: Json<CandidateForm>,
) -> Result<(Status, Json<Candidate>), ApiError> {
    let role = role?;
    let candidate = state.with_store(|store| store.add_candidate(&auth.admin, role, &form))?;
    Ok((Status::Created, Json(candidate)))
}

#[instrument(skip_all, fields(session_id = %auth.session_id, id = %id))]
#[put("/admin/candidates/<role>/<id>", format = "json", data = "<form>")]
pub async fn update_candidate(
    state: &State<AppState>,
    auth: AdminAuth,
    role: Result<Role, ValidationError>,
    id: &str,
    form: Json<CandidateForm>,
) -> Result<Json<Candidate>, ApiError> {
    let role = role?;
    state.with_store(|store| store.update_candidate(&auth.admin, role, id, &form)).map(Json)
}

#[instrument(skip_all, fields(session_id = %auth.session_id, id = %id))]
#[delete("/admin/candidates/<role>/<id>")]
pub async fn delete_candidate(
    state: &State<AppState>,
    auth: AdminAuth,
    role: Result<Role, ValidationError>,
    id: &str,
) -> Result<Json<Candidate>, ApiError> {
    let role = role?;
    state.with_store(|store| store.delete_candidate(&auth.admin, role, id)).map(Json)
}

#[get("/admin/results")]
pub async fn election_results(state: &State<AppState>, _auth: AdminAuth) -> Result<Json<ElectionSummary>, ApiError> {
    state.with_store(|store| Ok(store.summary())).map(Json)
}

#[get("/admin/audit")]
pub async fn audit_stored_votes(state: &State<AppState>, _auth: AdminAuth) -> Result<Json<AuditReport>, ApiError> {
    state.with_store(|store| Ok(store.audit_votes())).map(Json)
}

#[instrument(skip_all, fields(session_id = %auth.session_id, rows = rows.len()))]
#[post("/admin/audit", format = "json", data = "<rows>")]
pub async fn audit_rows(
    state: &State<AppState>,
    auth: AdminAuth,
    rows: Json<Vec<Vote>>,
) -> Result<Json<AuditReport>, ApiError> {
    let report = state.with_store(|store| Ok(store.audit_rows(&rows)))?;
    info!(issues = report.issue_count(), "Audited submitted vote rows");
    Ok(Json(report))
}
