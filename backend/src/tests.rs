use rocket::http::{ContentType, Header, Status};
use rocket::local::blocking::{Client, LocalResponse};
use serde_json::{json, Value};
use shared::kv::{KeyValueStore, StoreError};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;
use crate::{build_rocket, config::AppConfig, routes::AppState, store::FileStore};

struct TestServer {
    client: Client,
    config: AppConfig,
    _dir: TempDir,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn test_config(dir: &TempDir) -> AppConfig {
    AppConfig {
        store_path: dir.path().join("election.json"),
        ..AppConfig::default()
    }
}

fn start_with(dir: TempDir, config: AppConfig) -> TestServer {
    init_tracing();
    let state = AppState::open(&config).expect("store opens");
    let client = Client::tracked(build_rocket(state, &config)).expect("valid rocket instance");
    TestServer { client, config, _dir: dir }
}

fn start() -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    start_with(dir, config)
}

fn bearer(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {}", token))
}

fn body(response: LocalResponse<'_>) -> Value {
    response.into_json::<Value>().expect("JSON body")
}

impl TestServer {
    fn post(&self, uri: &str, payload: Value, token: Option<&str>) -> LocalResponse<'_> {
        let mut req = self.client.post(uri.to_string()).json(&payload);
        if let Some(token) = token {
            req = req.header(bearer(token));
        }
        req.dispatch()
    }

    fn get(&self, uri: &str, token: Option<&str>) -> LocalResponse<'_> {
        let mut req = self.client.get(uri.to_string());
        if let Some(token) = token {
            req = req.header(bearer(token));
        }
        req.dispatch()
    }

    fn voter(&self, dni: &str) -> String {
        let response = self.post("/api/voter/login", json!({ "dni": dni }), None);
        assert_eq!(response.status(), Status::Ok);
        body(response)["token"].as_str().unwrap().to_string()
    }

    fn admin(&self) -> String {
        let response = self.post("/api/admin/register", json!({
            "name": "Juan Pérez",
            "email": "admin@electoral.gob",
            "password": "secret1",
            "confirmPassword": "secret1",
            "accessCode": self.config.access_code,
        }), None);
        assert_eq!(response.status(), Status::Created);

        let response = self.post("/api/admin/login", json!({
            "email": "admin@electoral.gob",
            "password": "secret1",
        }), None);
        assert_eq!(response.status(), Status::Ok);
        body(response)["token"].as_str().unwrap().to_string()
    }
}

fn votes_for(candidates: &Value, id: &str) -> u64 {
    candidates.as_array().unwrap().iter()
        .find(|c| c["id"] == id)
        .and_then(|c| c["votes"].as_u64())
        .unwrap()
}

#[test]
fn test_voter_flow() {
    let server = start();

    let response = server.post("/api/voter/login", json!({ "dni": "1234abcd" }), None);
    assert_eq!(response.status(), Status::BadRequest);

    let response = server.post("/api/voter/login", json!({ "dni": "12345678" }), None);
    assert_eq!(response.status(), Status::Ok);
    let login = body(response);
    assert_eq!(login["dni"], "12345678");
    assert_eq!(login["ballot"]["state"], "noVote");
    let token = login["token"].as_str().unwrap().to_string();

    let response = server.post("/api/voter/ballot", json!({ "role": "president", "candidateId": "p1" }), Some(&token));
    assert_eq!(response.status(), Status::Ok);
    let ballot = body(response);
    assert_eq!(ballot["state"], "partial");
    assert_eq!(ballot["draft"]["presidentId"], "p1");

    let response = server.get("/api/voter/results", Some(&token));
    assert_eq!(response.status(), Status::Forbidden);

    let response = server.post("/api/voter/ballot", json!({ "role": "mayor", "candidateId": "m1" }), Some(&token));
    assert_eq!(response.status(), Status::Ok);
    let ballot = body(response);
    assert_eq!(ballot["state"], "complete");
    assert_eq!(ballot["vote"]["mayorId"], "m1");

    let response = server.post("/api/voter/ballot", json!({ "role": "president", "candidateId": "p2" }), Some(&token));
    assert_eq!(response.status(), Status::Forbidden);
    assert!(body(response)["error"].as_str().unwrap().contains("already"));

    let presidents = body(server.get("/api/candidates/president", None));
    assert_eq!(votes_for(&presidents, "p1"), 1);
    assert_eq!(votes_for(&presidents, "p2"), 0);

    let results = body(server.get("/api/voter/results", Some(&token)));
    assert_eq!(results["president"]["id"], "p1");
    assert_eq!(results["mayors"]["leader"], "m1");
}

#[test]
fn test_unknown_candidate_and_role() {
    let server = start();
    let token = server.voter("12345678");

    let response = server.post("/api/voter/ballot", json!({ "role": "mayor", "candidateId": "m99" }), Some(&token));
    assert_eq!(response.status(), Status::NotFound);

    let response = server.get("/api/candidates/governor", None);
    assert_eq!(response.status(), Status::BadRequest);
}

#[test]
fn test_requires_authentication() {
    let server = start();

    let response = server.get("/api/voter/ballot", None);
    assert_eq!(response.status(), Status::Unauthorized);
    assert_eq!(body(response)["status"], 401);

    let response = server.get("/api/voter/ballot", Some("not-a-token"));
    assert_eq!(response.status(), Status::Unauthorized);

    let voter = server.voter("12345678");
    let response = server.get("/api/admin/results", Some(&voter));
    assert_eq!(response.status(), Status::Unauthorized);
    assert_eq!(body(response)["error"], "Administrator login required.");
}

#[test]
fn test_logout_ends_session() {
    let server = start();
    let token = server.voter("12345678");
    assert_eq!(server.get("/api/voter/ballot", Some(&token)).status(), Status::Ok);

    let response = server.post("/api/voter/logout", json!({}), Some(&token));
    assert_eq!(response.status(), Status::NoContent);
    assert_eq!(server.get("/api/voter/ballot", Some(&token)).status(), Status::Unauthorized);
}

#[test]
fn test_admin_registration_and_login() {
    let server = start();
    let mut registration = json!({
        "name": "Ana",
        "email": "ana@electoral.gob",
        "password": "secret1",
        "confirmPassword": "secret1",
        "accessCode": "WRONG",
    });

    let response = server.post("/api/admin/register", registration.clone(), None);
    assert_eq!(response.status(), Status::BadRequest);
    assert_eq!(body(response)["error"], "Invalid access code");

    registration["accessCode"] = json!("ADMIN2024");
    let response = server.post("/api/admin/register", registration.clone(), None);
    assert_eq!(response.status(), Status::Created);
    let profile = body(response);
    assert_eq!(profile["email"], "ana@electoral.gob");
    assert!(profile.get("password").is_none());

    let response = server.post("/api/admin/register", registration, None);
    assert_eq!(response.status(), Status::Conflict);

    let response = server.post("/api/admin/login", json!({ "email": "ana@electoral.gob", "password": "nope!!" }), None);
    assert_eq!(response.status(), Status::Unauthorized);

    let response = server.post("/api/admin/login", json!({ "email": "ana@electoral.gob", "password": "secret1" }), None);
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(body(response)["email"], "ana@electoral.gob");
}

#[test]
fn test_candidate_management() {
    let server = start();
    let token = server.admin();
    let form = json!({ "name": "Lucía Torres", "party": "Partido Verde", "photo": "https://example.org/l.jpg" });

    let response = server.post("/api/admin/candidates/mayor", form.clone(), None);
    assert_eq!(response.status(), Status::Unauthorized);

    let response = server.post("/api/admin/candidates/mayor", form, Some(&token));
    assert_eq!(response.status(), Status::Created);
    let created = body(response);
    let id = created["id"].as_str().unwrap().to_string();
    assert!(id.starts_with('m'));
    assert_eq!(created["type"], "mayor");

    let response = server.post("/api/admin/candidates/mayor", json!({ "name": "X", "party": "", "photo": "y" }), Some(&token));
    assert_eq!(response.status(), Status::BadRequest);

    let response = server.client.put(format!("/api/admin/candidates/mayor/{}", id))
        .header(bearer(&token))
        .header(ContentType::JSON)
        .body(json!({ "name": "Lucía T.", "party": "Partido Verde", "photo": "https://example.org/l.jpg" }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(body(response)["name"], "Lucía T.");

    let mayors = body(server.get("/api/candidates/mayor", None));
    assert_eq!(mayors.as_array().unwrap().len(), 4);

    let delete = |uri: String| server.client.delete(uri).header(bearer(&token)).dispatch().status();
    assert_eq!(delete(format!("/api/admin/candidates/mayor/{}", id)), Status::Ok);
    assert_eq!(delete(format!("/api/admin/candidates/mayor/{}", id)), Status::NotFound);
    assert_eq!(delete("/api/admin/candidates/senator/m1".to_string()), Status::BadRequest);
}

#[test]
fn test_results_and_audit() {
    let server = start();
    let admin = server.admin();

    for (dni, p, m) in [("10000001", "p2", "m1"), ("10000002", "p2", "m3"), ("10000003", "p1", "m3")] {
        let token = server.voter(dni);
        server.post("/api/voter/ballot", json!({ "role": "president", "candidateId": p }), Some(&token));
        server.post("/api/voter/ballot", json!({ "role": "mayor", "candidateId": m }), Some(&token));
    }

    let summary = body(server.get("/api/admin/results", Some(&admin)));
    assert_eq!(summary["totalBallots"], 3);
    assert_eq!(summary["presidents"]["leader"], "p2");
    assert_eq!(summary["mayors"]["leader"], "m3");
    assert_eq!(summary["presidents"]["totalVotes"], 3);

    let stored = body(server.get("/api/admin/audit", Some(&admin)));
    assert_eq!(stored["summary"]["clean"], 3);

    let rows = json!([
        { "dni": "12345678", "presidentId": "p1", "mayorId": "m1", "timestamp": "2024-12-01T10:30:00Z" },
        { "dni": "", "presidentId": "p2", "mayorId": "m2", "timestamp": "2024-12-01T11:15:00Z" },
        { "dni": "12345678", "presidentId": "p3", "mayorId": "m1", "timestamp": "2024-12-01T13:45:00Z" },
        { "dni": "99887766", "presidentId": "invalid", "mayorId": "m2", "timestamp": "2024-12-01T14:20:00Z" },
    ]);
    let report = body(server.post("/api/admin/audit", rows, Some(&admin)));
    assert_eq!(report["summary"]["total"], 4);
    assert_eq!(report["summary"]["missingField"], 1);
    assert_eq!(report["summary"]["duplicate"], 1);
    assert_eq!(report["summary"]["inconsistent"], 1);
    assert_eq!(report["findings"][3]["issue"], "inconsistent");

    let response = server.post("/api/admin/audit", json!([{ "dni": "1" }]), Some(&admin));
    assert_eq!(response.status(), Status::UnprocessableEntity);
}

#[test]
fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let path = config.store_path.clone();

    {
        let state = AppState::open(&config).unwrap();
        let client = Client::tracked(build_rocket(state, &config)).unwrap();
        let token = body(client.post("/api/voter/login").json(&json!({ "dni": "12345678" })).dispatch())["token"]
            .as_str().unwrap().to_string();
        client.post("/api/voter/ballot")
            .header(bearer(&token))
            .json(&json!({ "role": "mayor", "candidateId": "m2" }))
            .dispatch();
    }

    let reopened = FileStore::open(&path).unwrap();
    assert!(reopened.get("presidents").is_some());
    assert!(reopened.get("ballotDrafts").unwrap().contains("m2"));

    let server = start_with(dir, config);
    let token = server.voter("12345678");
    let ballot = body(server.get("/api/voter/ballot", Some(&token)));
    assert_eq!(ballot["state"], "partial");
    assert_eq!(ballot["draft"]["mayorId"], "m2");
}

#[test]
fn test_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("store.json");

    let mut store = FileStore::open(&path).unwrap();
    assert!(store.get("votes").is_none());
    store.set("votes", "[]").unwrap();
    store.set("userDNI", "12345678").unwrap();
    store.remove("userDNI").unwrap();
    store.remove("never-set").unwrap();

    let reopened = FileStore::open(&path).unwrap();
    assert_eq!(reopened.get("votes").as_deref(), Some("[]"));
    assert!(reopened.get("userDNI").is_none());
}

#[test]
fn test_malformed_store_file_is_not_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let truncated = r#"{"votes": "[{\"dni\":\"11111111\",\"presidentId\":\"p1\""#;
    std::fs::write(&config.store_path, truncated).unwrap();

    assert!(matches!(FileStore::open(&config.store_path), Err(StoreError::Serialization(_))));
    let err = AppState::open(&config).err().expect("startup should fail");
    assert_eq!(err.code(), shared::ErrorCode::SystemError);
    assert_eq!(std::fs::read_to_string(&config.store_path).unwrap(), truncated);
}

#[test]
fn test_config_lookup() {
    let config = AppConfig::from_lookup(|key| match key {
        "STORE_PATH" => Some("/var/lib/election/store.json".to_string()),
        "ADMIN_ACCESS_CODE" => Some("CITY-42".to_string()),
        _ => None,
    });
    assert_eq!(config.store_path, std::path::PathBuf::from("/var/lib/election/store.json"));
    assert_eq!(config.access_code, "CITY-42");
    assert_eq!(config.allowed_origin, crate::config::DEFAULT_ALLOWED_ORIGIN);

    let defaults = AppConfig::from_lookup(|_| None);
    assert_eq!(defaults, AppConfig::default());
    assert_eq!(defaults.access_code, "ADMIN2024");
}

#[test]
fn test_custom_access_code_applies() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig { access_code: "CITY-42".into(), ..test_config(&dir) };
    let server = start_with(dir, config);

    let response = server.post("/api/admin/register", json!({
        "name": "Ana",
        "email": "ana@electoral.gob",
        "password": "secret1",
        "confirmPassword": "secret1",
        "accessCode": "ADMIN2024",
    }), None);
    assert_eq!(response.status(), Status::BadRequest);
    server.admin();
}

#[test]
fn test_cors_headers() {
    let server = start();
    let response = server.client.get("/api/candidates/mayor")
        .header(Header::new("Origin", "http://localhost:8080"))
        .dispatch();
    assert_eq!(response.headers().get_one("Access-Control-Allow-Origin"), Some("http://localhost:8080"));

    let response = server.client.get("/api/candidates/mayor")
        .header(Header::new("Origin", "https://elsewhere.example"))
        .dispatch();
    assert!(response.headers().get_one("Access-Control-Allow-Origin").is_none());
}

#[test]
fn test_session_registry_tokens() {
    let store = shared::ElectionStore::new(shared::MemoryStore::new());
    let voter = store.login_voter("12345678").unwrap();
    let registry = crate::sessions::SessionRegistry::new();
    assert!(registry.is_empty());

    let first = registry.open(crate::sessions::Actor::Voter(voter.clone())).unwrap();
    let second = registry.open(crate::sessions::Actor::Voter(voter)).unwrap();
    assert_ne!(first, second);
    assert_eq!(registry.len(), 2);
    assert!(!first.contains('='));

    assert!(registry.close(&first));
    assert!(!registry.close(&first));
    assert!(registry.get(&first).is_none());
    assert!(registry.get(&second).is_some());
    assert_eq!(registry.len(), 1);
}
