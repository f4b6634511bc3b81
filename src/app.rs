use axum::{
    Form, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, Json, Redirect},
    routing::{get, post},
};
use metrics::counter;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::render::render_page;
use crate::session::Theme;
use crate::types::{
    ClassificationData, ClassificationRequest, ClassificationResponse, HistoryResponse, Message,
};
use crate::view::{ClassificationView, Outcome, Page};

#[derive(Clone)]
pub struct AppState {
    view: ClassificationView,
}

impl AppState {
    pub fn new(view: ClassificationView) -> Self {
        Self { view }
    }
}

/// Routes for the configured variant. History and theme routes only exist in
/// the extended variant.
pub fn router(state: AppState) -> Router {
    let variant = state.view.variant();

    let mut router = Router::new()
        .route("/", get(index))
        .route("/sessions/:id", get(show_page))
        .route("/sessions/:id/predict", post(predict))
        .route("/sessions/:id/end", post(end_session))
        .route("/classify", post(classify_handler));

    if variant.history_enabled() {
        router = router
            .route("/sessions/:id/history/clear", post(clear_history))
            .route("/api/sessions/:id/history", get(history_json));
    }
    if variant.theme_enabled() {
        router = router.route("/sessions/:id/theme", post(set_theme));
    }

    router.with_state(state)
}

#[derive(Debug, Deserialize)]
struct PredictForm {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ThemeForm {
    theme: Theme,
}

fn session_path(id: Uuid) -> String {
    format!("/sessions/{id}")
}

fn html_response(page: &Page) -> (StatusCode, Html<String>) {
    let status = match page.outcome {
        Outcome::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    };
    (status, Html(render_page(page)))
}

async fn index() -> Redirect {
    let id = Uuid::new_v4();
    tracing::debug!(session_id = %id, "Starting new session");
    Redirect::to(&session_path(id))
}

async fn show_page(State(state): State<AppState>, Path(id): Path<Uuid>) -> Html<String> {
    Html(render_page(&state.view.idle(id)))
}

#[tracing::instrument(skip(state, form))]
async fn predict(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(form): Form<PredictForm>,
) -> (StatusCode, Html<String>) {
    let page = state.view.submit(id, &form.message).await;
    html_response(&page)
}

#[tracing::instrument(skip(state))]
async fn clear_history(State(state): State<AppState>, Path(id): Path<Uuid>) -> Html<String> {
    Html(render_page(&state.view.clear_history(id)))
}

#[tracing::instrument(skip(state))]
async fn set_theme(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(form): Form<ThemeForm>,
) -> Redirect {
    state.view.set_theme(id, form.theme);
    tracing::debug!(theme = ?form.theme, "Theme changed");
    Redirect::to(&session_path(id))
}

#[tracing::instrument(skip(state))]
async fn end_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Redirect {
    if state.view.sessions().end(id) {
        tracing::info!("Session ended");
    }
    Redirect::to("/")
}

async fn history_json(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, AppError> {
    let entries = state
        .view
        .sessions()
        .history(id)
        .ok_or(AppError::SessionNotFound(id))?;
    Ok(Json(HistoryResponse {
        session_id: id,
        entries,
    }))
}

#[tracing::instrument(skip(state, request), fields(input_count = request.input.len()))]
async fn classify_handler(
    State(state): State<AppState>,
    Json(request): Json<ClassificationRequest>,
) -> Result<Json<ClassificationResponse>, AppError> {
    counter!("classification_requests_total").increment(request.input.len() as u64);
    tracing::info!("Processing classification request");

    if request.input.is_empty() {
        counter!("validation_rejections_total").increment(1);
        return Err(AppError::NoInput);
    }

    let messages = request
        .input
        .into_iter()
        .enumerate()
        .map(|(index, text)| Message::new(text).ok_or(AppError::EmptyMessage(index)))
        .collect::<Result<Vec<_>, _>>()
        .inspect_err(|_| counter!("validation_rejections_total").increment(1))?;

    let engine = state.view.engine();
    let futures = messages.iter().map(|message| engine.classify(message));
    let results = futures::future::join_all(futures).await;

    let mut data = Vec::with_capacity(results.len());
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(prediction) => {
                counter!("predictions_total", "label" => prediction.label.as_str()).increment(1);
                data.push(ClassificationData {
                    index,
                    label: prediction.label,
                    spam_probability: prediction.spam_probability,
                    ham_probability: prediction.ham_probability,
                });
            }
            Err(e) => {
                counter!("inference_failures_total").increment(1);
                tracing::error!(input_index = index, error = %e, "Classification failed");
                return Err(AppError::Inference(e));
            }
        }
    }

    tracing::info!("Classification completed successfully");
    Ok(Json(ClassificationResponse {
        id: format!("classify-{}", Uuid::new_v4().simple()),
        object: "list".to_string(),
        created: chrono::Utc::now().timestamp(),
        data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact_engine::ArtifactEngine;
    use crate::artifacts::Artifacts;
    use crate::config::Variant;
    use crate::engine::Engine;
    use crate::session::SessionStore;
    use crate::view::tests::FailingEngine;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app_with(engine: Arc<dyn Engine + Send + Sync>, variant: Variant) -> Router {
        let sessions = Arc::new(SessionStore::new(Duration::from_secs(60)));
        router(AppState::new(ClassificationView::new(
            engine, sessions, variant,
        )))
    }

    fn app(variant: Variant) -> Router {
        app_with(
            Arc::new(ArtifactEngine::new(Arc::new(Artifacts::demo()))),
            variant,
        )
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn form(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn root_redirects_to_a_new_session() {
        let app = app(Variant::Extended);
        let response = app.clone().oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        let id = location.strip_prefix("/sessions/").unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn spam_submission_renders_verdict_and_history_row() {
        let app = app(Variant::Extended);
        let id = Uuid::new_v4();

        let (status, html) = send(
            &app,
            form(
                &format!("/sessions/{id}/predict"),
                "message=Congratulations%21+You+won+a+free+prize",
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("SPAM DETECTED"));
        assert!(html.contains("pie-chart"));
        assert!(html.contains("<td>SPAM</td>"));

        let (status, body) = send(&app, get(&format!("/api/sessions/{id}/history"))).await;
        assert_eq!(status, StatusCode::OK);
        let history: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(history["entries"].as_array().unwrap().len(), 1);
        assert_eq!(history["entries"][0]["label"], "SPAM");
    }

    #[tokio::test]
    async fn blank_submission_warns() {
        let app = app(Variant::Extended);
        let id = Uuid::new_v4();
        let (status, html) = send(&app, form(&format!("/sessions/{id}/predict"), "message=+++")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Please enter a message to classify."));
        assert!(!html.contains("verdict-"));

        let (_, html) = send(&app, form(&format!("/sessions/{id}/predict"), "")).await;
        assert!(html.contains("Please enter a message to classify."));
    }

    #[tokio::test]
    async fn clear_history_confirms_and_empties() {
        let app = app(Variant::Extended);
        let id = Uuid::new_v4();
        send(&app, form(&format!("/sessions/{id}/predict"), "message=free+prize")).await;

        for _ in 0..2 {
            let (status, html) = send(&app, form(&format!("/sessions/{id}/history/clear"), "")).await;
            assert_eq!(status, StatusCode::OK);
            assert!(html.contains("Prediction history cleared."));
            assert!(html.contains("No predictions yet."));
        }
    }

    #[tokio::test]
    async fn theme_switch_persists_for_the_session() {
        let app = app(Variant::Extended);
        let id = Uuid::new_v4();
        let (status, _) = send(&app, form(&format!("/sessions/{id}/theme"), "theme=dark")).await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        let (_, html) = send(&app, get(&format!("/sessions/{id}"))).await;
        assert!(html.contains("<body class=\"theme-dark\">"));

        let other = Uuid::new_v4();
        let (_, html) = send(&app, get(&format!("/sessions/{other}"))).await;
        assert!(html.contains("<body class=\"theme-light\">"));
    }

    #[tokio::test]
    async fn minimal_variant_hides_history_and_theme() {
        let app = app(Variant::Minimal);
        let id = Uuid::new_v4();

        let (status, html) = send(&app, form(&format!("/sessions/{id}/predict"), "message=free+prize")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("SPAM DETECTED"));
        assert!(!html.contains("Prediction History"));
        assert!(!html.contains("pie-chart"));

        let (status, _) = send(&app, form(&format!("/sessions/{id}/history/clear"), "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, form(&format!("/sessions/{id}/theme"), "theme=dark")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn inference_failure_is_visible() {
        let app = app_with(Arc::new(FailingEngine::default()), Variant::Extended);
        let id = Uuid::new_v4();
        let (status, html) = send(&app, form(&format!("/sessions/{id}/predict"), "message=hello")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(html.contains("Classification failed"));

        let (status, body) = send(&app, json("/classify", serde_json::json!({"input": ["hello"]}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("inference_error"));
    }

    #[tokio::test]
    async fn ending_a_session_discards_history() {
        let app = app(Variant::Extended);
        let id = Uuid::new_v4();
        send(&app, form(&format!("/sessions/{id}/predict"), "message=free+prize")).await;

        let (status, _) = send(&app, form(&format!("/sessions/{id}/end"), "")).await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        let (status, body) = send(&app, get(&format!("/api/sessions/{id}/history"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("not_found_error"));
    }

    #[tokio::test]
    async fn viewing_an_unknown_session_does_not_create_it() {
        let app = app(Variant::Extended);
        let id = Uuid::new_v4();

        let (status, html) = send(&app, get(&format!("/sessions/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("No predictions yet."));

        let (status, _) = send(&app, get(&format!("/api/sessions/{id}/history"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, get(&format!("/api/sessions/{id}/history"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn classify_api_scores_each_input_in_order() {
        let app = app(Variant::Minimal);
        let (status, body) = send(
            &app,
            json(
                "/classify",
                serde_json::json!({
                    "input": ["Congratulations! You won a free prize", "Let's meet at 5pm tomorrow"]
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let response: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(response["object"], "list");
        let data = response["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["index"], 0);
        assert_eq!(data[0]["label"], "spam");
        assert_eq!(data[1]["label"], "ham");
        for item in data {
            let total = item["spam_probability"].as_f64().unwrap()
                + item["ham_probability"].as_f64().unwrap();
            assert!((total - 100.0).abs() <= 0.01);
        }
    }

    #[tokio::test]
    async fn classify_api_rejects_blank_input() {
        let app = app(Variant::Extended);
        let (status, body) = send(&app, json("/classify", serde_json::json!({"input": ["ok", "  "]}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.contains("index 1"));

        let (status, _) = send(&app, json("/classify", serde_json::json!({"input": []}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
