use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, HttpServer, ResponseError, web};
use anyhow::{Context, Result};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::cli::ServeArgs;
use crate::model::CandidateRecord;
use crate::ranker::Ranker;

const MODEL_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub fn run(args: ServeArgs) -> Result<()> {
    actix_web::rt::System::new().block_on(serve(args))
}

struct AppState {
    model: RwLock<Option<Ranker>>,
}

#[derive(Debug, Error)]
enum PredictError {
    #[error("ranking model is not loaded")]
    ModelUnavailable,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct ScoreResponse {
    score: f32,
}

impl ResponseError for PredictError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

async fn predict(
    state: web::Data<AppState>,
    input: web::Json<CandidateRecord>,
) -> Result<HttpResponse, PredictError> {
    let guard = state.model.read().await;
    let model = guard.as_ref().ok_or(PredictError::ModelUnavailable)?;
    let score = model.score(&input);
    Ok(HttpResponse::Ok().json(ScoreResponse { score }))
}

async fn health() -> &'static str {
    "OK"
}

async fn serve(args: ServeArgs) -> Result<()> {
    let model = match Ranker::load(&args.model_path) {
        Ok(model) => Some(model),
        Err(err) => {
            error!(
                error = %err,
                path = %args.model_path.display(),
                "failed to load ranking model; scoring requests will be rejected"
            );
            None
        }
    };

    let state = web::Data::new(AppState {
        model: RwLock::new(model),
    });

    if args.watch_model {
        spawn_model_watcher(state.clone(), args.model_path.clone());
    }

    info!(host = %args.host, port = args.port, "scoring endpoint listening");

    HttpServer::new({
        let state = state.clone();
        move || {
            App::new()
                .app_data(state.clone())
                .route("/predict", web::post().to(predict))
                .route("/health", web::get().to(health))
        }
    })
    .bind((args.host.as_str(), args.port))
    .with_context(|| format!("failed to bind {}:{}", args.host, args.port))?
    .run()
    .await
    .context("http server terminated with an error")
}

// Polls the artifact's modification time and hot-swaps the model when the
// file changes. A failed reload keeps the previous model serving.
fn spawn_model_watcher(state: web::Data<AppState>, path: PathBuf) {
    actix_web::rt::spawn(async move {
        let mut last_seen = modified_time(&path);
        loop {
            actix_web::rt::time::sleep(MODEL_POLL_INTERVAL).await;

            let current = modified_time(&path);
            if current == last_seen {
                continue;
            }

            match Ranker::load(&path) {
                Ok(model) => {
                    *state.model.write().await = Some(model);
                    info!(path = %path.display(), "reloaded ranking model");
                    last_seen = current;
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        path = %path.display(),
                        "model reload failed; keeping the previous model"
                    );
                }
            }
        }
    });
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;

    use crate::ranker::TrainParams;

    fn tiny_model() -> Ranker {
        let records: Vec<CandidateRecord> = (0..10)
            .flat_map(|_| {
                [
                    CandidateRecord {
                        label: 3.0,
                        group_id: 1.0,
                        education: "Masters".to_string(),
                        years_experience: 9.0,
                        full_name: "Riley Vega".to_string(),
                        skill_set: "Rust, SQL".to_string(),
                    },
                    CandidateRecord {
                        label: 0.0,
                        group_id: 1.0,
                        education: "Bachelors".to_string(),
                        years_experience: 1.0,
                        full_name: "Casey Lowe".to_string(),
                        skill_set: "Excel".to_string(),
                    },
                ]
            })
            .collect();
        let params = TrainParams {
            iterations: 5,
            max_depth: 3,
            shrinkage: 0.3,
        };
        Ranker::train(&records, &params).expect("training should succeed")
    }

    fn state_with(model: Option<Ranker>) -> web::Data<AppState> {
        web::Data::new(AppState {
            model: RwLock::new(model),
        })
    }

    fn request_body() -> serde_json::Value {
        serde_json::json!({
            "label": 0.0,
            "groupId": 1.0,
            "education": "Masters",
            "yearsExperience": 9.0,
            "fullName": "Riley Vega",
            "skillSet": "Rust, SQL"
        })
    }

    #[actix_web::test]
    async fn predict_scores_a_well_formed_row() {
        let app = test::init_service(
            App::new()
                .app_data(state_with(Some(tiny_model())))
                .route("/predict", web::post().to(predict)),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/predict")
            .set_json(request_body())
            .to_request();
        let response: serde_json::Value = test::call_and_read_body_json(&app, request).await;

        assert!(response["score"].is_number());
    }

    #[actix_web::test]
    async fn predict_rejects_requests_while_the_model_is_unloaded() {
        let app = test::init_service(
            App::new()
                .app_data(state_with(None))
                .route("/predict", web::post().to(predict)),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/predict")
            .set_json(request_body())
            .to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn predict_rejects_malformed_bodies() {
        let app = test::init_service(
            App::new()
                .app_data(state_with(Some(tiny_model())))
                .route("/predict", web::post().to(predict)),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/predict")
            .insert_header(("content-type", "application/json"))
            .set_payload(r#"{"education": 12}"#)
            .to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn health_endpoint_reports_ok() {
        let app =
            test::init_service(App::new().route("/health", web::get().to(health))).await;

        let request = test::TestRequest::get().uri("/health").to_request();
        let body = test::call_and_read_body(&app, request).await;

        assert_eq!(body, "OK");
    }
}
