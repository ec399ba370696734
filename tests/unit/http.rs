use crate::common::{Harness, provider_token};
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use feedback_backend::{
    AppState,
    config::{AuthConfig, CascadeMode, SchedulerConfig},
    db::enums::{CycleStatus, RespondentStatus, RespondentType},
    db::models::User,
    middleware::auth::AuthService,
    routes::create_router,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

const JWT_SECRET: &str = "http-test-secret";

fn auth_service() -> AuthService {
    AuthService::new(&AuthConfig {
        jwt_secret: JWT_SECRET.to_string(),
    })
}

fn app(h: &Harness) -> Router {
    let state = AppState::new(
        h.dyn_store(),
        h.dyn_notifier(),
        h.templates.clone(),
        auth_service(),
        CascadeMode::Inline,
        &SchedulerConfig::default(),
    );
    create_router(Arc::new(state))
}

fn token(user: &User) -> String {
    provider_token(JWT_SECRET, user)
}

async fn call(app: &Router, method: Method, uri: &str, user: Option<&User>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(user)));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn health_needs_no_token() {
    let h = Harness::new();
    let (status, body) = call(&app(&h), Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_routes_reject_missing_or_bad_tokens() {
    let h = Harness::new();
    let app = app(&h);

    let (status, _) = call(&app, Method::GET, "/assessments", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/assessments")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let gone = h.employee("Mila", None);
    h.store.set_user_active(gone.id, false);
    let (status, _) = call(&app, Method::GET, "/assessments", Some(&gone), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn survey_flow_over_http() {
    let h = Harness::new();
    let questions = h.catalog(2);
    let subject = h.employee("Mila", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &subject);
    let respondent = h.respondent(&participant, &subject, RespondentType::SelfReview);
    let app = app(&h);
    let base = format!("/respondents/{}", respondent.id);

    let (status, body) = call(&app, Method::GET, "/assessments", Some(&subject), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["respondent_id"], respondent.id.to_string());

    let (status, _) = call(&app, Method::POST, &format!("{}/start", base), Some(&subject), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("{}/responses", base),
        Some(&subject),
        Some(json!({ "questionId": questions[0].id, "score": 4, "comment": "Solid" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["score"], 4);

    let (status, body) = call(&app, Method::POST, &format!("{}/complete", base), Some(&subject), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["progress"]["answered"], 1);
    assert_eq!(body["data"]["progress"]["total"], 2);

    call(
        &app,
        Method::POST,
        &format!("{}/responses", base),
        Some(&subject),
        Some(json!({ "questionId": questions[1].id, "score": 5 })),
    )
    .await;

    let (status, body) = call(&app, Method::GET, &format!("{}/progress", base), Some(&subject), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["percentage"], 100);

    let (status, body) = call(&app, Method::POST, &format!("{}/complete", base), Some(&subject), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["cascade"]["outcome"], "notified");
    assert_eq!(
        h.store.respondent(respondent.id).unwrap().status,
        RespondentStatus::Completed
    );
}

#[tokio::test]
async fn invalid_rating_is_a_bad_request() {
    let h = Harness::new();
    let questions = h.catalog(1);
    let subject = h.employee("Mila", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &subject);
    let respondent = h.respondent(&participant, &subject, RespondentType::SelfReview);

    let (status, body) = call(
        &app(&h),
        Method::POST,
        &format!("/respondents/{}/responses", respondent.id),
        Some(&subject),
        Some(json!({ "questionId": questions[0].id, "score": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(h.store.response_count(), 0);
}

#[tokio::test]
async fn cycle_lifecycle_is_admin_only() {
    let h = Harness::new();
    let admin = h.admin();
    let mila = h.employee("Mila", None);
    let app = app(&h);
    let body = json!({
        "name": "Autumn 360",
        "startDate": "2026-10-01",
        "endDate": "2026-10-31",
    });

    let (status, _) = call(&app, Method::POST, "/cycles", Some(&mila), Some(body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = call(&app, Method::POST, "/cycles", Some(&admin), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    let cycle_id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(&app, Method::POST, &format!("/cycles/{}/start", cycle_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["code"], "CYCLE_002");

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/cycles/{}/participants", cycle_id),
        Some(&admin),
        Some(json!({ "userIds": [mila.id] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, Method::POST, &format!("/cycles/{}/start", cycle_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["participants"], 1);

    let (status, body) = call(&app, Method::POST, &format!("/cycles/{}/start", cycle_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errors"][0]["code"], "CYCLE_001");

    let (status, body) = call(&app, Method::GET, &format!("/cycles/{}", cycle_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "active");
    assert_eq!(body["data"]["participants"][0]["user_name"], "Mila Tester");
}

#[tokio::test]
async fn empty_participant_list_fails_validation() {
    let h = Harness::new();
    let admin = h.admin();
    let cycle = h.cycle(CycleStatus::Draft);

    let (status, _) = call(
        &app(&h),
        Method::POST,
        &format!("/cycles/{}/participants", cycle.id),
        Some(&admin),
        Some(json!({ "userIds": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn scheduler_endpoints() {
    let h = Harness::new();
    let admin = h.admin();
    let mila = h.employee("Mila", None);
    let app = app(&h);

    let (status, _) = call(&app, Method::GET, "/scheduler/status", Some(&mila), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app, Method::GET, "/scheduler/status", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = call(&app, Method::POST, "/scheduler/reminders/run", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["job"], "reminders");

    let (status, _) = call(&app, Method::POST, "/scheduler/vacations/run", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn draft_cycle_administration_over_http() {
    let h = Harness::new();
    let admin = h.admin();
    let mila = h.employee("Mila", None);
    let oskar = h.employee("Oskar", None);
    let app = app(&h);
    let cycle = h.cycle(CycleStatus::Draft);
    let participant = h.participant(&cycle, &mila);
    h.participant(&cycle, &oskar);

    let (status, body) = call(&app, Method::GET, "/cycles", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], cycle.id.to_string());
    assert_eq!(body["data"][0]["participants_count"], 2);

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/cycles/{}", cycle.id),
        Some(&admin),
        Some(json!({
            "name": "Winter 360",
            "startDate": "2026-12-01",
            "endDate": "2026-12-20",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Winter 360");

    let uri = format!("/cycles/{}/participants/{}", cycle.id, participant.id);
    let (status, _) = call(&app, Method::DELETE, &uri, Some(&mila), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = call(&app, Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = call(&app, Method::GET, "/cycles", Some(&admin), None).await;
    assert_eq!(body["data"][0]["participants_count"], 1);
}

#[tokio::test]
async fn pending_respondent_selection_is_not_a_cycle_id() {
    let h = Harness::new();
    let mila = h.employee("Mila", None);
    let cycle = h.cycle(CycleStatus::Active);
    let participant = h.participant(&cycle, &mila);

    let (status, body) = call(
        &app(&h),
        Method::GET,
        "/cycles/participants-pending-respondents",
        Some(&mila),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["participantId"], participant.id.to_string());
    assert_eq!(body["data"][0]["respondentsCount"], 0);
    assert_eq!(body["data"][0]["minRequired"], 4);
}
