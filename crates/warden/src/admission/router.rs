use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{AttributeReport, FacilityId, SubjectDraft, SubjectId};
use super::engine::{EngineError, SharedEngine};
use crate::access::{ensure, Capability, Role};
use crate::admission::FacilityDraft;
use crate::history;

/// Header carrying the caller's role; absent means the least-privileged role.
/// Verifying that the caller actually holds the role is the authentication
/// collaborator's job.
pub const ROLE_HEADER: &str = "x-warden-role";

/// Router builder exposing the admission-control HTTP surface.
pub fn admission_router(engine: SharedEngine) -> Router {
    Router::new()
        .route(
            "/api/v1/subjects",
            post(register_subject).get(list_subjects),
        )
        .route(
            "/api/v1/subjects/:subject_id",
            get(subject_status).delete(remove_subject),
        )
        .route("/api/v1/subjects/:subject_id/reports", post(report))
        .route(
            "/api/v1/subjects/:subject_id/urgent-hold",
            post(impose_urgent_hold).delete(revoke_urgent_hold),
        )
        .route(
            "/api/v1/subjects/:subject_id/release",
            post(grant_release).delete(revoke_release),
        )
        .route("/api/v1/facilities", post(add_facility).get(list_facilities))
        .route("/api/v1/facilities/:facility_id", delete(remove_facility))
        .route(
            "/api/v1/facilities/:facility_id/capacity",
            patch(set_capacity),
        )
        .route("/api/v1/admission/threshold", get(threshold))
        .route("/api/v1/admission/stats", get(stats))
        .route("/api/v1/history", get(export_history))
        .with_state(engine)
}

#[derive(Debug, Deserialize)]
struct CapacityChange {
    capacity: u32,
}

fn caller_role(headers: &HeaderMap) -> Role {
    headers
        .get(ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(Role::parse)
        .unwrap_or_default()
}

fn authorize(headers: &HeaderMap, capability: Capability) -> Result<(), Response> {
    ensure(caller_role(headers), capability).map_err(|denied| {
        let payload = json!({ "error": denied.to_string() });
        (StatusCode::FORBIDDEN, Json(payload)).into_response()
    })
}

fn engine_error(error: EngineError) -> Response {
    let status = match &error {
        EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::SubjectNotFound(_) | EngineError::FacilityNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        EngineError::DuplicateSubject(_) | EngineError::DuplicateFacility(_) => {
            StatusCode::CONFLICT
        }
    };
    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}

fn lock_poisoned() -> Response {
    let payload = json!({ "error": "engine state unavailable" });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}

async fn register_subject(
    State(engine): State<SharedEngine>,
    headers: HeaderMap,
    Json(draft): Json<SubjectDraft>,
) -> Response {
    if let Err(denied) = authorize(&headers, Capability::ManageSubjects) {
        return denied;
    }
    let Ok(mut guard) = engine.write() else {
        return lock_poisoned();
    };
    match guard.register_subject(draft) {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(error) => engine_error(error),
    }
}

async fn list_subjects(State(engine): State<SharedEngine>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorize(&headers, Capability::ViewReports) {
        return denied;
    }
    let Ok(guard) = engine.read() else {
        return lock_poisoned();
    };
    (StatusCode::OK, Json(guard.ranked_subjects())).into_response()
}

async fn subject_status(
    State(engine): State<SharedEngine>,
    headers: HeaderMap,
    Path(subject_id): Path<String>,
) -> Response {
    if let Err(denied) = authorize(&headers, Capability::ViewReports) {
        return denied;
    }
    let Ok(guard) = engine.read() else {
        return lock_poisoned();
    };
    match guard.subject(&SubjectId(subject_id)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => engine_error(error),
    }
}

async fn remove_subject(
    State(engine): State<SharedEngine>,
    headers: HeaderMap,
    Path(subject_id): Path<String>,
) -> Response {
    if let Err(denied) = authorize(&headers, Capability::ManageSubjects) {
        return denied;
    }
    let Ok(mut guard) = engine.write() else {
        return lock_poisoned();
    };
    match guard.remove_subject(&SubjectId(subject_id)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => engine_error(error),
    }
}

async fn report(
    State(engine): State<SharedEngine>,
    headers: HeaderMap,
    Path(subject_id): Path<String>,
    Json(amendment): Json<AttributeReport>,
) -> Response {
    if let Err(denied) = authorize(&headers, Capability::ManageSubjects) {
        return denied;
    }
    let Ok(mut guard) = engine.write() else {
        return lock_poisoned();
    };
    match guard.report(&SubjectId(subject_id), amendment) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => engine_error(error),
    }
}

async fn impose_urgent_hold(
    State(engine): State<SharedEngine>,
    headers: HeaderMap,
    Path(subject_id): Path<String>,
) -> Response {
    if let Err(denied) = authorize(&headers, Capability::UrgentHold) {
        return denied;
    }
    let Ok(mut guard) = engine.write() else {
        return lock_poisoned();
    };
    match guard.impose_urgent_hold(&SubjectId(subject_id)) {
        Ok(held) => (StatusCode::OK, Json(json!({ "held": held }))).into_response(),
        Err(error) => engine_error(error),
    }
}

async fn revoke_urgent_hold(
    State(engine): State<SharedEngine>,
    headers: HeaderMap,
    Path(subject_id): Path<String>,
) -> Response {
    if let Err(denied) = authorize(&headers, Capability::UrgentHold) {
        return denied;
    }
    let Ok(mut guard) = engine.write() else {
        return lock_poisoned();
    };
    match guard.revoke_urgent_hold(&SubjectId(subject_id)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => engine_error(error),
    }
}

async fn grant_release(
    State(engine): State<SharedEngine>,
    headers: HeaderMap,
    Path(subject_id): Path<String>,
) -> Response {
    if let Err(denied) = authorize(&headers, Capability::GrantRelease) {
        return denied;
    }
    let Ok(mut guard) = engine.write() else {
        return lock_poisoned();
    };
    match guard.grant_release(&SubjectId(subject_id)) {
        Ok(released) => (StatusCode::OK, Json(json!({ "released": released }))).into_response(),
        Err(error) => engine_error(error),
    }
}

async fn revoke_release(
    State(engine): State<SharedEngine>,
    headers: HeaderMap,
    Path(subject_id): Path<String>,
) -> Response {
    if let Err(denied) = authorize(&headers, Capability::GrantRelease) {
        return denied;
    }
    let Ok(mut guard) = engine.write() else {
        return lock_poisoned();
    };
    match guard.revoke_release(&SubjectId(subject_id)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => engine_error(error),
    }
}

async fn add_facility(
    State(engine): State<SharedEngine>,
    headers: HeaderMap,
    Json(draft): Json<FacilityDraft>,
) -> Response {
    if let Err(denied) = authorize(&headers, Capability::ManageFacilities) {
        return denied;
    }
    let Ok(mut guard) = engine.write() else {
        return lock_poisoned();
    };
    match guard.add_facility(draft) {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(error) => engine_error(error),
    }
}

async fn list_facilities(State(engine): State<SharedEngine>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorize(&headers, Capability::ViewReports) {
        return denied;
    }
    let Ok(guard) = engine.read() else {
        return lock_poisoned();
    };
    (StatusCode::OK, Json(guard.facilities())).into_response()
}

async fn remove_facility(
    State(engine): State<SharedEngine>,
    headers: HeaderMap,
    Path(facility_id): Path<String>,
) -> Response {
    if let Err(denied) = authorize(&headers, Capability::ManageFacilities) {
        return denied;
    }
    let Ok(mut guard) = engine.write() else {
        return lock_poisoned();
    };
    match guard.remove_facility(&FacilityId(facility_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => engine_error(error),
    }
}

async fn set_capacity(
    State(engine): State<SharedEngine>,
    headers: HeaderMap,
    Path(facility_id): Path<String>,
    Json(change): Json<CapacityChange>,
) -> Response {
    if let Err(denied) = authorize(&headers, Capability::ManageFacilities) {
        return denied;
    }
    let Ok(mut guard) = engine.write() else {
        return lock_poisoned();
    };
    match guard.set_facility_capacity(&FacilityId(facility_id), change.capacity) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => engine_error(error),
    }
}

async fn threshold(State(engine): State<SharedEngine>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorize(&headers, Capability::ViewReports) {
        return denied;
    }
    let Ok(guard) = engine.read() else {
        return lock_poisoned();
    };
    (StatusCode::OK, Json(guard.threshold())).into_response()
}

async fn stats(State(engine): State<SharedEngine>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorize(&headers, Capability::ViewReports) {
        return denied;
    }
    let Ok(guard) = engine.read() else {
        return lock_poisoned();
    };
    (StatusCode::OK, Json(guard.stats())).into_response()
}

async fn export_history(State(engine): State<SharedEngine>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorize(&headers, Capability::ExportHistory) {
        return denied;
    }
    let Ok(guard) = engine.read() else {
        return lock_poisoned();
    };
    match history::history_csv(guard.history()) {
        Ok(csv) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv")],
            csv,
        )
            .into_response(),
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}
