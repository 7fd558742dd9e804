//! API router.
//!
//! Returns a composable `Router` with every route under `/api/`. Three
//! route groups share the same handlers' state and differ only in the
//! authentication layer: open, optional-auth and protected.
//!
//! Layers (outermost → innermost): CORS → Audit → Extension → Auth → Handler.

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::error::ApiError;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router.
///
/// Middleware uses `Extension<ApiContext>` (injected outside the auth layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    let cors = cors_layer(&core.config().cors_origin);
    let ctx = ApiContext::new(core);

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let open = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/register", post(endpoints::auth::register))
        .route("/auth/login", post(endpoints::auth::login))
        .route("/doctors", get(endpoints::doctors::list))
        .route(
            "/doctors/specialties/list",
            get(endpoints::doctors::specialties),
        )
        .route("/doctors/locations/list", get(endpoints::doctors::locations))
        .route("/doctors/:id", get(endpoints::doctors::detail))
        .route(
            "/symptoms/suggestions",
            get(endpoints::symptoms::suggestions),
        )
        .route("/chat/message", post(endpoints::chat::message))
        .route("/chat/suggestions", get(endpoints::chat::suggestions))
        .with_state(ctx.clone());

    // Anonymous allowed; a bad token is still rejected.
    let optional = Router::new()
        .route("/appointments", post(endpoints::appointments::create))
        .route("/symptoms/analyze", post(endpoints::symptoms::analyze))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::optional_auth))
        .layer(axum::Extension(ctx.clone()));

    let protected = Router::new()
        .route("/auth/profile", get(endpoints::auth::profile))
        .route("/auth/change-password", put(endpoints::auth::change_password))
        .route("/doctors", post(endpoints::doctors::create))
        .route("/doctors/:id", put(endpoints::doctors::update))
        .route(
            "/appointments/my-appointments",
            get(endpoints::appointments::mine),
        )
        .route(
            "/appointments/:id",
            get(endpoints::appointments::detail).delete(endpoints::appointments::cancel),
        )
        .route(
            "/appointments/:id/status",
            put(endpoints::appointments::update_status),
        )
        .route("/symptoms/history", get(endpoints::symptoms::history))
        .route(
            "/symptoms/history/:id",
            get(endpoints::symptoms::history_entry),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::Extension(ctx));

    Router::new()
        .nest("/api", open)
        .nest("/api", optional)
        .nest("/api", protected)
        .fallback(route_not_found)
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(cors)
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".into())
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            tracing::warn!(origin, "Invalid CORS_ORIGIN, cross-origin requests will be refused");
            layer
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::advisory::{CompletionClient, MockCompletionClient};
    use crate::core_state::test_state;

    type TestApp = (Router, Arc<CoreState>, tempfile::TempDir);

    fn test_app(client: Arc<dyn CompletionClient>) -> TestApp {
        let (core, dir) = test_state(client);
        (api_router(core.clone()), core, dir)
    }

    fn offline_app() -> TestApp {
        test_app(Arc::new(MockCompletionClient::failing()))
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Register and return the bearer token.
    async fn register(app: &Router, name: &str, email: &str, user_type: &str) -> String {
        let mut body = json!({
            "name": name,
            "email": email,
            "password": "secreto1",
            "userType": user_type,
            "phone": "+34600111222",
        });
        if user_type == "doctor" {
            body["specialty"] = json!("Glaucoma");
        }
        let (status, json) = send(app, "POST", "/api/auth/register", None, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["token"].as_str().unwrap().to_string()
    }

    /// Register a doctor and return (token, doctor profile id).
    async fn register_doctor(app: &Router, name: &str, email: &str) -> (String, String) {
        let token = register(app, name, email, "doctor").await;
        let (_, profile) = send(app, "GET", "/api/auth/profile", Some(&token), None).await;
        let doctor_id = profile["user"]["doctorInfo"]["id"].as_str().unwrap().to_string();
        (token, doctor_id)
    }

    async fn book(
        app: &Router,
        token: Option<&str>,
        doctor_id: &str,
        time: &str,
    ) -> (StatusCode, Value) {
        let body = json!({
            "doctorId": doctor_id,
            "appointmentDate": "2030-05-20",
            "appointmentTime": time,
            "reason": "Revisión anual",
            "patientName": "Invitado Uno",
            "patientPhone": "+34600999888",
        });
        send(app, "POST", "/api/appointments", token, Some(body)).await
    }

    #[tokio::test]
    async fn health_is_open() {
        let (app, _core, _dir) = offline_app();
        let (status, json) = send(&app, "GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "OK");
        assert_eq!(json["version"], crate::config::APP_VERSION);
    }

    #[tokio::test]
    async fn unknown_route_returns_json_404() {
        let (app, _core, _dir) = offline_app();
        let (status, json) = send(&app, "GET", "/api/nonexistent", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn register_login_and_profile() {
        let (app, _core, _dir) = offline_app();
        register(&app, "Ana Torres", "ana@x.com", "patient").await;

        let (status, json) = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "ANA@x.com", "password": "secreto1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["user"]["userType"], "patient");
        let token = json["token"].as_str().unwrap();

        let (status, json) = send(&app, "GET", "/api/auth/profile", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["user"]["email"], "ana@x.com");
        assert!(json["user"].get("passwordHash").is_none());
        assert!(json["user"].get("doctorInfo").is_none());
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let (app, _core, _dir) = offline_app();
        register(&app, "Ana Torres", "ana@x.com", "patient").await;
        let (status, json) = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "ana@x.com", "password": "nope-nope"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn duplicate_email_and_missing_specialty() {
        let (app, _core, _dir) = offline_app();
        register(&app, "Ana Torres", "ana@x.com", "patient").await;

        let duplicate = json!({
            "name": "Ana Bis", "email": "ana@x.com", "password": "secreto1", "userType": "patient"
        });
        let (status, json) = send(&app, "POST", "/api/auth/register", None, Some(duplicate)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], "CONFLICT");

        let no_specialty = json!({
            "name": "Dr. Sin", "email": "sin@x.com", "password": "secreto1", "userType": "doctor"
        });
        let (status, json) =
            send(&app, "POST", "/api/auth/register", None, Some(no_specialty)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "VALIDATION");
    }

    #[tokio::test]
    async fn protected_routes_reject_bad_credentials() {
        let (app, core, _dir) = offline_app();

        let (status, json) = send(&app, "GET", "/api/auth/profile", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "AUTH_REQUIRED");

        let (status, json) = send(&app, "GET", "/api/auth/profile", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "INVALID_TOKEN");

        let now = chrono::Utc::now().timestamp();
        let orphan = crate::crypto::sign_token(
            core.token_secret(),
            uuid::Uuid::new_v4(),
            "ghost@x.com",
            now,
            3600,
        )
        .unwrap();
        let (status, json) = send(&app, "GET", "/api/auth/profile", Some(&orphan), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "UNKNOWN_SUBJECT");

        let expired = crate::crypto::sign_token(
            core.token_secret(),
            uuid::Uuid::new_v4(),
            "ghost@x.com",
            now - 7200,
            3600,
        )
        .unwrap();
        let (status, json) = send(&app, "GET", "/api/auth/profile", Some(&expired), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "TOKEN_EXPIRED");
    }

    #[tokio::test]
    async fn register_book_then_double_book_conflicts() {
        let (app, _core, _dir) = offline_app();
        let patient = register(&app, "Ana Torres", "ana@x.com", "patient").await;
        let (_, doctor_id) = register_doctor(&app, "Laura Gomez", "laura@x.com").await;

        let (status, json) = book(&app, Some(&patient), &doctor_id, "10:00").await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        assert_eq!(json["appointment"]["status"], "pending");
        assert_eq!(json["appointment"]["time"], "10:00");
        assert_eq!(json["appointment"]["doctorName"], "Laura Gomez");

        let (status, json) = book(&app, Some(&patient), &doctor_id, "10:00").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], "SLOT_UNAVAILABLE");
    }

    #[tokio::test]
    async fn register_with_role_field_then_book_and_rebook() {
        let (app, _core, _dir) = offline_app();
        let body = json!({
            "name": "Ana",
            "email": "ana@x.com",
            "password": "secret1",
            "role": "patient",
        });
        let (status, json) = send(&app, "POST", "/api/auth/register", None, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        assert_eq!(json["user"]["userType"], "patient");
        let patient = json["token"].as_str().unwrap().to_string();
        let (_, doctor_id) = register_doctor(&app, "Laura Gomez", "laura@x.com").await;

        let (status, json) = book(&app, Some(&patient), &doctor_id, "10:00").await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        assert_eq!(json["appointment"]["status"], "pending");

        let (status, json) = book(&app, Some(&patient), &doctor_id, "10:00").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], "SLOT_UNAVAILABLE");
    }

    #[tokio::test]
    async fn guest_booking_and_optional_auth() {
        let (app, _core, _dir) = offline_app();
        let (_, doctor_id) = register_doctor(&app, "Laura Gomez", "laura@x.com").await;

        let (status, json) = book(&app, None, &doctor_id, "9:30").await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        assert_eq!(json["appointment"]["time"], "09:30");

        // A present but invalid token is not downgraded to a guest booking.
        let (status, json) = book(&app, Some("garbage"), &doctor_id, "11:00").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "INVALID_TOKEN");

        let (status, _) = book(&app, None, &uuid::Uuid::new_v4().to_string(), "12:00").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn status_rules_over_http() {
        let (app, _core, _dir) = offline_app();
        let patient = register(&app, "Ana Torres", "ana@x.com", "patient").await;
        let (doctor, doctor_id) = register_doctor(&app, "Laura Gomez", "laura@x.com").await;
        let (other_doctor, _) = register_doctor(&app, "Pedro Sanz", "pedro@x.com").await;

        let (_, booked) = book(&app, Some(&patient), &doctor_id, "10:00").await;
        let id = booked["appointment"]["id"].as_str().unwrap().to_string();
        let status_uri = format!("/api/appointments/{id}/status");

        let (status, _) = send(
            &app,
            "PUT",
            &status_uri,
            Some(&patient),
            Some(json!({"status": "confirmed"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            "PUT",
            &status_uri,
            Some(&other_doctor),
            Some(json!({"status": "confirmed"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = send(
            &app,
            "PUT",
            &status_uri,
            Some(&doctor),
            Some(json!({"status": "confirmed"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["appointment"]["status"], "confirmed");

        let (status, json) = send(
            &app,
            "PUT",
            &status_uri,
            Some(&doctor),
            Some(json!({"status": "archived"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "VALIDATION");

        let uri = format!("/api/appointments/{id}");
        let (status, _) = send(&app, "DELETE", &uri, Some(&patient), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(
            &app,
            "PUT",
            &status_uri,
            Some(&doctor),
            Some(json!({"status": "confirmed"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], "INVALID_TRANSITION");

        // Slot is free again after cancellation.
        let (status, _) = book(&app, Some(&patient), &doctor_id, "10:00").await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn my_appointments_for_both_roles() {
        let (app, _core, _dir) = offline_app();
        let patient = register(&app, "Ana Torres", "ana@x.com", "patient").await;
        let (doctor, doctor_id) = register_doctor(&app, "Laura Gomez", "laura@x.com").await;
        book(&app, Some(&patient), &doctor_id, "10:00").await;
        book(&app, Some(&patient), &doctor_id, "11:00").await;

        let uri = "/api/appointments/my-appointments";
        let (status, json) = send(&app, "GET", uri, Some(&patient), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 2);
        assert_eq!(json["appointments"][0]["appointmentTime"], "11:00");
        assert_eq!(json["appointments"][0]["doctorName"], "Laura Gomez");

        let (_, json) = send(&app, "GET", uri, Some(&doctor), None).await;
        assert_eq!(json["total"], 2);
        assert_eq!(json["appointments"][0]["patientName"], "Ana Torres");
    }

    #[tokio::test]
    async fn malformed_input_is_400() {
        let (app, _core, _dir) = offline_app();
        let patient = register(&app, "Ana Torres", "ana@x.com", "patient").await;

        let (status, json) =
            send(&app, "GET", "/api/appointments/not-a-uuid", Some(&patient), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "VALIDATION");

        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header("Content-Type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn doctor_directory_routes() {
        let (app, _core, _dir) = offline_app();
        let (doctor, doctor_id) = register_doctor(&app, "Laura Gomez", "laura@x.com").await;
        let patient = register(&app, "Ana Torres", "ana@x.com", "patient").await;

        let update = json!({"location": "Sevilla", "consultationFee": 90.0});
        let uri = format!("/api/doctors/{doctor_id}");
        let (status, _) = send(&app, "PUT", &uri, Some(&patient), Some(update.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, json) = send(&app, "PUT", &uri, Some(&doctor), Some(update)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["doctor"]["location"], "Sevilla");

        let (status, json) = send(&app, "GET", "/api/doctors?location=sevi", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 1);
        assert_eq!(json["filters"]["location"], "sevi");

        let (_, json) = send(&app, "GET", "/api/doctors/locations/list", None, None).await;
        assert_eq!(json["locations"], json!(["Sevilla"]));

        let (status, json) = send(&app, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["doctor"]["reviewsList"], json!([]));

        // Doctor registration already created the profile.
        let (status, _) = send(
            &app,
            "POST",
            "/api/doctors",
            Some(&doctor),
            Some(json!({"specialty": "Retina"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn chat_falls_back_when_upstream_fails() {
        let (app, _core, _dir) = offline_app();
        let (status, json) = send(
            &app,
            "POST",
            "/api/chat/message",
            None,
            Some(json!({"message": "¿Qué es el glaucoma?", "conversationId": "c-1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["error"], true);
        assert_eq!(json["conversationId"], "c-1");

        let empty = json!({"message": ""});
        let (status, json) = send(&app, "POST", "/api/chat/message", None, Some(empty)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "VALIDATION");
    }

    #[tokio::test]
    async fn symptom_analysis_is_stored_for_authenticated_callers() {
        let reply = r#"{"specialties":["Glaucoma"],"recommendation":"Consulte pronto."}"#;
        let (app, _core, _dir) = test_app(Arc::new(MockCompletionClient::new(reply)));
        let patient = register(&app, "Ana Torres", "ana@x.com", "patient").await;
        let body = json!({"symptoms": "presión en los ojos y dolor de cabeza"});

        let (status, json) =
            send(&app, "POST", "/api/symptoms/analyze", None, Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["analysis"]["aiResponse"], "Consulte pronto.");

        let (status, _) =
            send(&app, "POST", "/api/symptoms/analyze", Some(&patient), Some(body)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(&app, "GET", "/api/symptoms/history", Some(&patient), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 1);
        assert_eq!(json["history"][0]["recommendedSpecialties"], json!(["Glaucoma"]));

        let id = json["history"][0]["id"].as_str().unwrap().to_string();
        let uri = format!("/api/symptoms/history/{id}");
        let (status, _) = send(&app, "GET", &uri, Some(&patient), None).await;
        assert_eq!(status, StatusCode::OK);

        let other = register(&app, "Luis Mora", "luis@x.com", "patient").await;
        let (status, _) = send(&app, "GET", &uri, Some(&other), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cors_preflight_allows_configured_origin() {
        let (app, _core, _dir) = offline_app();
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/appointments")
            .header("Origin", "http://localhost:3000")
            .header("Access-Control-Request-Method", "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
    }
}
