//! adoption-api - HTTP API for the pet adoption records service.
//!
//! Exposes the user, pet, shelter and adoption operations as JSON routes
//! with:
//! - Caller identity: taken from a configurable request header (default
//!   `x-caller-principal`), anonymous when absent.
//! - Storage: SQLite file (default) or in-memory.
//! - CORS: Configurable via CORS_ALLOW_ORIGIN (origin string) for a frontend.
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! cargo run -p adoption-api
//!
//! # throwaway in-memory storage, JSON logs
//! STORAGE_PROVIDER=memory LOG_FORMAT=json cargo run -p adoption-api
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.

mod config;
mod identity;

use std::net::SocketAddr;
use std::sync::Arc;

use adoption_domain::adapters::memory_store::MemoryStore;
use adoption_domain::service::Services;
use adoption_domain::{
    AdoptionPayload, AdoptionRecord, Clock, CoreError, EntityKind, Pet, PetImagePayload,
    PetPayload, RecordStore, Shelter, ShelterPayload, Table, UpdateAdoptionPayload,
    UpdatePetPayload, UpdateShelterPayload, User, UserPayload, WriteBatch,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Storage backend selected at startup.
enum AnyStore {
    Memory(MemoryStore),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite_store::SqliteStore),
}

impl RecordStore for AnyStore {
    fn users(&self) -> &dyn Table<User> {
        match self {
            AnyStore::Memory(s) => s.users(),
            #[cfg(feature = "sqlite")]
            AnyStore::Sqlite(s) => s.users(),
        }
    }

    fn pets(&self) -> &dyn Table<Pet> {
        match self {
            AnyStore::Memory(s) => s.pets(),
            #[cfg(feature = "sqlite")]
            AnyStore::Sqlite(s) => s.pets(),
        }
    }

    fn shelters(&self) -> &dyn Table<Shelter> {
        match self {
            AnyStore::Memory(s) => s.shelters(),
            #[cfg(feature = "sqlite")]
            AnyStore::Sqlite(s) => s.shelters(),
        }
    }

    fn adoptions(&self) -> &dyn Table<AdoptionRecord> {
        match self {
            AnyStore::Memory(s) => s.adoptions(),
            #[cfg(feature = "sqlite")]
            AnyStore::Sqlite(s) => s.adoptions(),
        }
    }

    fn next_sequence(&self, kind: EntityKind) -> Result<u64, CoreError> {
        match self {
            AnyStore::Memory(s) => s.next_sequence(kind),
            #[cfg(feature = "sqlite")]
            AnyStore::Sqlite(s) => s.next_sequence(kind),
        }
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), CoreError> {
        match self {
            AnyStore::Memory(s) => s.commit(batch),
            #[cfg(feature = "sqlite")]
            AnyStore::Sqlite(s) => s.commit(batch),
        }
    }
}

#[derive(Clone)]
struct StdClock;
impl Clock for StdClock {
    fn now(&self) -> std::time::SystemTime {
        std::time::SystemTime::now()
    }
}

#[derive(Clone)]
struct AppState {
    services: Arc<Services<AnyStore, StdClock>>,
    caller_header: HeaderName,
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_insecure();

    let store = match build_store(&cfg) {
        Ok(s) => s,
        Err(e) => {
            error!(err = %e, path = %cfg.db_path.display(), "failed to open record store");
            std::process::exit(1);
        }
    };
    let state = AppState {
        services: Arc::new(Services::new(store, StdClock)),
        caller_header: cfg.caller_header.clone(),
    };

    // Request ID header name
    let x_request_id = HeaderName::from_static("x-request-id");

    let mut app = router(state)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    // CORS - already validated in Config::from_env()
    let cors = if cfg.cors_allow_origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([cfg.cors_allow_origin.clone()]))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE, cfg.caller_header.clone()])
    };
    app = app.layer(cors);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, err = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    info!(%addr, "adoption-api listening");
    if let Err(e) = axum::serve(listener, app).await {
        error!(err = %e, "server error");
        std::process::exit(1);
    }
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

// Construct the record store based on config and feature flags.
fn build_store(cfg: &config::Config) -> Result<AnyStore, CoreError> {
    match cfg.storage_provider {
        #[cfg(feature = "sqlite")]
        config::StorageProvider::Sqlite => {
            let store = sqlite_store::SqliteStore::open(&cfg.db_path)?;
            info!(path = %cfg.db_path.display(), "using sqlite record store");
            Ok(AnyStore::Sqlite(store))
        }
        #[cfg(not(feature = "sqlite"))]
        config::StorageProvider::Sqlite => {
            warn!("sqlite feature disabled; falling back to in-memory store");
            Ok(AnyStore::Memory(MemoryStore::new()))
        }
        config::StorageProvider::Memory => Ok(AnyStore::Memory(MemoryStore::new())),
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/whoami", get(whoami))
        // Users
        .route("/api/users", post(add_user).get(get_users))
        .route("/api/users/owner", get(get_user_owner))
        .route("/api/users/:id", get(get_user).delete(delete_user))
        // Pets
        .route("/api/pets", post(add_pet).get(get_pets))
        .route("/api/pets/image", post(add_pet_image))
        .route("/api/pets/info", axum::routing::put(update_pet_info))
        .route("/api/pets/not-adopted", get(get_pets_not_adopted))
        .route("/api/pets/search", get(search_pets_by_species))
        .route("/api/pets/:id", get(get_pet).delete(delete_pet))
        // Shelters
        .route("/api/shelters", post(create_shelter).get(get_shelters))
        .route("/api/shelters/owner", get(get_shelter_owner))
        .route("/api/shelters/info", axum::routing::put(update_shelter_info))
        .route("/api/shelters/:id", get(get_shelter).delete(delete_shelter))
        // Adoptions
        .route(
            "/api/adoptions",
            post(file_for_adoption)
                .get(get_adoption_records)
                .put(update_adoption_record),
        )
        .route("/api/adoptions/:id", get(get_adoption_record))
        .route("/api/adoptions/:id/complete", post(complete_adoption))
        .route("/api/adoptions/:id/fail", post(fail_adoption))
        .with_state(state)
}

// ============================================================================
// Response helpers
// ============================================================================

#[derive(Serialize)]
struct MessageOut {
    message: String,
}

fn error_code(err: &CoreError) -> &'static str {
    match err {
        CoreError::NotFound(_) => "not_found",
        CoreError::EmptyField(_) => "empty_field",
        CoreError::InvalidPayload(_) => "invalid_payload",
        CoreError::Repository(_) => "internal",
    }
}

fn error_response(op: &'static str, err: CoreError) -> Response {
    let code = error_code(&err);
    let message = match &err {
        CoreError::Repository(_) => {
            error!(op, err = ?err, "repository error");
            "server error".to_string()
        }
        _ => {
            warn!(op, err = %err, "request rejected");
            err.to_string()
        }
    };
    let status = StatusCode::from_u16(http_common::status_for_code(code))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(http_common::json_error_with_message(code, &message)),
    )
        .into_response()
}

fn reply<T: Serialize>(op: &'static str, status: StatusCode, result: Result<T, CoreError>) -> Response {
    match result {
        Ok(value) => (status, Json(value)).into_response(),
        Err(e) => error_response(op, e),
    }
}

// Bodies or query strings that fail to parse get the same error shape as
// service errors.
fn invalid_input(op: &'static str, rejection: impl std::fmt::Display) -> Response {
    warn!(op, err = %rejection, "invalid payload");
    (
        StatusCode::BAD_REQUEST,
        Json(http_common::json_err("invalid_payload")),
    )
        .into_response()
}

// An absent optional value is rendered as 404.
fn reply_found<T: Serialize>(
    op: &'static str,
    id: &str,
    result: Result<Option<T>, CoreError>,
) -> Response {
    match result {
        Ok(Some(value)) => Json(value).into_response(),
        Ok(None) => {
            warn!(op, %id, "no such record");
            (
                StatusCode::NOT_FOUND,
                Json(http_common::json_error_with_message(
                    "not_found",
                    &format!("no record with id={}", id),
                )),
            )
                .into_response()
        }
        Err(e) => error_response(op, e),
    }
}

fn reply_deleted(op: &'static str, result: Result<String, CoreError>) -> Response {
    match result {
        Ok(message) => {
            info!(op, %message, "delete ok");
            Json(MessageOut { message }).into_response()
        }
        Err(e) => error_response(op, e),
    }
}

// ============================================================================
// Misc
// ============================================================================

async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "time": http_common::system_time_to_rfc3339(std::time::SystemTime::now()),
    }))
}

async fn whoami(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let caller = identity::resolve_caller(&headers, &state.caller_header);
    Json(serde_json::json!({ "principal": caller }))
}

// ============================================================================
// Users
// ============================================================================

async fn add_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<UserPayload>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return invalid_input("addUser", e),
    };
    let caller = identity::resolve_caller(&headers, &state.caller_header);
    let result = state.services.users.add(&caller, body);
    if let Ok(user) = &result {
        info!(id = %user.id, principal = %user.principal, "user added");
    }
    reply("addUser", StatusCode::CREATED, result)
}

async fn get_users(State(state): State<AppState>) -> Response {
    reply("getUsers", StatusCode::OK, state.services.users.list())
}

async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    reply_found("getUser", &id, state.services.users.get(&id))
}

async fn get_user_owner(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let caller = identity::resolve_caller(&headers, &state.caller_header);
    reply("getUserOwner", StatusCode::OK, state.services.users.get_owner(&caller))
}

async fn delete_user(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    reply_deleted("deleteUser", state.services.users.delete(&id))
}

// ============================================================================
// Pets
// ============================================================================

#[derive(Deserialize)]
struct SpeciesQuery {
    species: String,
}

async fn add_pet(
    State(state): State<AppState>,
    body: Result<Json<PetPayload>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return invalid_input("addPet", e),
    };
    let result = state.services.pets.add(body);
    if let Ok(pet) = &result {
        info!(id = %pet.id, shelter_id = %pet.shelter_id, "pet added");
    }
    reply("addPet", StatusCode::CREATED, result)
}

async fn add_pet_image(
    State(state): State<AppState>,
    body: Result<Json<PetImagePayload>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return invalid_input("addPetImage", e),
    };
    let result = state.services.pets.set_image(body);
    if let Ok(pet) = &result {
        warn!(id = %pet.id, "pet row replaced by image-only row");
    }
    reply("addPetImage", StatusCode::OK, result)
}

async fn get_pet(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    reply_found("getPet", &id, state.services.pets.get(&id))
}

async fn get_pets(State(state): State<AppState>) -> Response {
    reply("getPets", StatusCode::OK, state.services.pets.list())
}

async fn get_pets_not_adopted(State(state): State<AppState>) -> Response {
    reply(
        "getPetsNotAdopted",
        StatusCode::OK,
        state.services.pets.list_not_adopted(),
    )
}

async fn update_pet_info(
    State(state): State<AppState>,
    body: Result<Json<UpdatePetPayload>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return invalid_input("updatePetInfo", e),
    };
    let result = state.services.pets.update_info(body);
    if let Ok(pet) = &result {
        info!(id = %pet.id, "pet info updated");
    }
    reply("updatePetInfo", StatusCode::OK, result)
}

async fn search_pets_by_species(
    State(state): State<AppState>,
    query: Result<Query<SpeciesQuery>, QueryRejection>,
) -> Response {
    let Query(q) = match query {
        Ok(q) => q,
        Err(e) => return invalid_input("searchPetsBySpecies", e),
    };
    reply(
        "searchPetsBySpecies",
        StatusCode::OK,
        state.services.pets.search_by_species(&q.species),
    )
}

async fn delete_pet(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    reply_deleted("deletePet", state.services.pets.delete(&id))
}

// ============================================================================
// Shelters
// ============================================================================

async fn create_shelter(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ShelterPayload>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return invalid_input("createShelter", e),
    };
    let caller = identity::resolve_caller(&headers, &state.caller_header);
    let result = state.services.shelters.create(&caller, body);
    if let Ok(shelter) = &result {
        info!(id = %shelter.id, principal = %shelter.principal, "shelter created");
    }
    reply("createShelter", StatusCode::CREATED, result)
}

async fn get_shelter(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    reply_found("getShelter", &id, state.services.shelters.get(&id))
}

async fn get_shelters(State(state): State<AppState>) -> Response {
    reply("getShelters", StatusCode::OK, state.services.shelters.list())
}

async fn get_shelter_owner(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let caller = identity::resolve_caller(&headers, &state.caller_header);
    reply(
        "getShelterOwner",
        StatusCode::OK,
        state.services.shelters.get_owner(&caller),
    )
}

async fn update_shelter_info(
    State(state): State<AppState>,
    body: Result<Json<UpdateShelterPayload>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return invalid_input("updateShelterInfo", e),
    };
    let result = state.services.shelters.update_info(body);
    if let Ok(shelter) = &result {
        info!(id = %shelter.id, "shelter info updated");
    }
    reply("updateShelterInfo", StatusCode::OK, result)
}

async fn delete_shelter(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    reply_deleted("deleteShelter", state.services.shelters.delete(&id))
}

// ============================================================================
// Adoptions
// ============================================================================

async fn file_for_adoption(
    State(state): State<AppState>,
    body: Result<Json<AdoptionPayload>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return invalid_input("fileForAdoption", e),
    };
    let result = state.services.adoptions.file(body);
    if let Ok(record) = &result {
        info!(
            id = %record.adoption_id,
            user_id = %record.user_id,
            pet_id = %record.pet_id,
            "adoption filed"
        );
    }
    reply("fileForAdoption", StatusCode::CREATED, result)
}

async fn get_adoption_records(State(state): State<AppState>) -> Response {
    reply(
        "getAdoptionRecords",
        StatusCode::OK,
        state.services.adoptions.list(),
    )
}

async fn get_adoption_record(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    reply_found("getAdoptionRecord", &id, state.services.adoptions.get(&id))
}

async fn update_adoption_record(
    State(state): State<AppState>,
    body: Result<Json<UpdateAdoptionPayload>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return invalid_input("updateAdoptionRecord", e),
    };
    let result = state.services.adoptions.update(body);
    if let Ok(record) = &result {
        info!(id = %record.adoption_id, "adoption record updated");
    }
    reply("updateAdoptionRecord", StatusCode::OK, result)
}

async fn complete_adoption(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let result = state.services.adoptions.complete(&id);
    if let Ok(record) = &result {
        info!(id = %record.adoption_id, pet_id = %record.pet_id, "adoption completed");
    }
    reply("completeAdoption", StatusCode::OK, result)
}

async fn fail_adoption(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let result = state.services.adoptions.fail(&id);
    if let Ok(record) = &result {
        info!(id = %record.adoption_id, "adoption failed");
    }
    reply("failAdoption", StatusCode::OK, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    const CALLER: &str = "x-caller-principal";

    fn app() -> Router {
        let state = AppState {
            services: Arc::new(Services::new(AnyStore::Memory(MemoryStore::new()), StdClock)),
            caller_header: HeaderName::from_static(CALLER),
        };
        router(state)
    }

    async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(CALLER, "owner-principal");
        let req = match body {
            Some(v) => builder
                .header("content-type", "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn pet_body(name: &str, species: &str, shelter_id: &str) -> Value {
        json!({
            "name": name,
            "species": species,
            "breed": "mixed",
            "gender": "male",
            "age": "2",
            "petImage": "img.png",
            "description": "friendly",
            "healthStatus": "healthy",
            "shelterId": shelter_id,
        })
    }

    fn user_body() -> Value {
        json!({
            "name": "Ann",
            "phoneNumber": "555-0100",
            "email": "ann@example.com",
            "address": "1 Main St",
        })
    }

    #[tokio::test]
    async fn adoption_scenario_over_http() {
        let router = app();

        let (status, shelter) = call(
            &router,
            "POST",
            "/api/shelters",
            Some(json!({
                "name": "Paws",
                "location": "Oslo",
                "phoneNumber": "555-0199",
                "email": "paws@example.com",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(shelter["id"], "ID-1");
        assert_eq!(shelter["principal"], "owner-principal");

        let (status, pet) = call(&router, "POST", "/api/pets", Some(pet_body("Rex", "Dog", "ID-1"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(pet["status"], "notAdopted");

        let (status, user) = call(&router, "POST", "/api/users", Some(user_body())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, record) = call(
            &router,
            "POST",
            "/api/adoptions",
            Some(json!({
                "userId": user["id"],
                "petId": pet["id"],
                "reasonForAdoption": "garden",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(record["status"], "pending");
        assert_eq!(record["petName"], "Rex");
        assert_eq!(record["userName"], "Ann");

        let uri = format!("/api/adoptions/{}/complete", record["adoptionId"].as_str().unwrap());
        let (status, done) = call(&router, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(done["status"], "completed");

        let (_, pet) = call(&router, "GET", "/api/pets/ID-1", None).await;
        assert_eq!(pet["status"], "adopted");
        let (_, available) = call(&router, "GET", "/api/pets/not-adopted", None).await;
        assert_eq!(available, json!([]));

        let (_, owner) = call(&router, "GET", "/api/users/owner", None).await;
        assert_eq!(owner["application"], json!([record["adoptionId"]]));
    }

    #[tokio::test]
    async fn empty_field_is_bad_request() {
        let router = app();
        let mut body = user_body();
        body["email"] = json!("");
        let (status, err) = call(&router, "POST", "/api/users", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["error"]["code"], "empty_field");
        assert_eq!(err["error"]["message"], "email is required");

        let (_, users) = call(&router, "GET", "/api/users", None).await;
        assert_eq!(users, json!([]));
    }

    #[tokio::test]
    async fn missing_records_are_not_found() {
        let router = app();
        for uri in [
            "/api/users/ID-1",
            "/api/pets/ID-1",
            "/api/shelters/ID-1",
            "/api/adoptions/ID-1",
            "/api/shelters/owner",
        ] {
            let (status, err) = call(&router, "GET", uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(err["error"]["code"], "not_found");
        }
    }

    #[tokio::test]
    async fn delete_twice_reports_not_found() {
        let router = app();
        call(&router, "POST", "/api/users", Some(user_body())).await;
        let (status, body) = call(&router, "DELETE", "/api/users/ID-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "user with id=ID-1 deleted");
        let (status, _) = call(&router, "DELETE", "/api/users/ID-1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn species_search_and_info_update() {
        let router = app();
        call(&router, "POST", "/api/pets", Some(pet_body("Rex", "Dog", "ID-1"))).await;
        call(&router, "POST", "/api/pets", Some(pet_body("Tom", "Cat", "ID-1"))).await;

        let (_, dogs) = call(&router, "GET", "/api/pets/search?species=dOG", None).await;
        assert_eq!(dogs.as_array().map(Vec::len), Some(1));
        assert_eq!(dogs[0]["name"], "Rex");

        let (status, pet) = call(
            &router,
            "PUT",
            "/api/pets/info",
            Some(json!({"petId": "ID-2", "healthStatus": "sick", "age": "5"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pet["healthStatus"], "sick");
        assert_eq!(pet["name"], "Tom");
    }

    #[tokio::test]
    async fn unparseable_input_is_invalid_payload() {
        let router = app();
        call(&router, "POST", "/api/pets", Some(pet_body("Rex", "Dog", "ID-1"))).await;

        let (status, err) = call(
            &router,
            "PUT",
            "/api/pets/info",
            Some(json!({"petId": "ID-1", "healthStatus": "sick"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["error"]["code"], "invalid_payload");

        let (status, err) = call(&router, "GET", "/api/pets/search", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["error"]["code"], "invalid_payload");

        let req = Request::builder()
            .method("POST")
            .uri("/api/users")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let (_, pet) = call(&router, "GET", "/api/pets/ID-1", None).await;
        assert_eq!(pet["healthStatus"], "healthy");
    }

    #[tokio::test]
    async fn whoami_defaults_to_anonymous() {
        let router = app();
        let resp = router
            .clone()
            .oneshot(Request::builder().uri("/api/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["principal"], adoption_domain::Identity::ANONYMOUS);
    }
}
