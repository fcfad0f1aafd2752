use crate::api::api_error::APIError;
use crate::api::model::{ChallengeResult, Outcome};
use crate::api::server::AppState;
use crate::error::Error;
use crate::solver::ChallengeRequest;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::WithRejection;
use serde_json::json;
use std::future::Future;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub(super) fn new(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(health_check))
        .route("/present", post(present))
        .route("/cleanup", post(clean_up))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.api_timeout))
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn health_check() -> impl IntoResponse {
    Json(json!({"ok":"healthy"}))
}

/// Run a solver call on its own task. A request dropped by the timeout layer or a client
/// disconnect must not abort a publication halfway through its merge request.
async fn detached<F>(call: F) -> Result<Result<(), Error>, APIError>
where
    F: Future<Output = Result<(), Error>> + Send + 'static,
{
    Ok(tokio::spawn(call).await?)
}

async fn present(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<ChallengeRequest>, APIError>,
) -> Result<Json<ChallengeResult>, APIError> {
    tracing::info!("present requested for \"{}\"", payload.resolved_fqdn);
    let solver = state.solver;
    let result = match detached(async move { solver.present(&payload).await }).await? {
        Ok(()) => Outcome::Presented,
        Err(err) if err.is_idempotent_signal() => {
            tracing::debug!("{err}");
            Outcome::AlreadyExists
        }
        Err(err) => return Err(err.into()),
    };
    Ok(Json(ChallengeResult { result }))
}

async fn clean_up(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<ChallengeRequest>, APIError>,
) -> Result<Json<ChallengeResult>, APIError> {
    tracing::info!("clean up requested for \"{}\"", payload.resolved_fqdn);
    let solver = state.solver;
    let result = match detached(async move { solver.clean_up(&payload).await }).await? {
        Ok(()) => Outcome::CleanedUp,
        Err(err) if err.is_idempotent_signal() => {
            tracing::debug!("{err}");
            Outcome::DoesNotExist
        }
        Err(err) => return Err(err.into()),
    };
    Ok(Json(ChallengeResult { result }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gitlab::fake::FakeRepository;
    use crate::publish::tests::config;
    use crate::solver::{GitSolver, Solver};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use reqwest::StatusCode as HttpStatus;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Answers according to the challenge key.
    struct KeyedSolver;

    fn outcome(challenge: &ChallengeRequest) -> Result<(), Error> {
        match challenge.key.as_str() {
            "exists" => Err(Error::AlreadyExists(challenge.resolved_fqdn.clone())),
            "missing" => Err(Error::DoesNotExist(challenge.resolved_fqdn.clone())),
            "" => Err(Error::InvalidRecord("key is required")),
            "unreachable" => Err(Error::RepositoryApi {
                status: HttpStatus::SERVICE_UNAVAILABLE,
                message: "down".into(),
            }),
            "no-serial" => Err(Error::SerialNotFound),
            _ => Ok(()),
        }
    }

    #[async_trait::async_trait]
    impl Solver for KeyedSolver {
        fn name(&self) -> &str {
            "keyed"
        }

        async fn initialize(&self) -> Result<(), Error> {
            Ok(())
        }

        async fn present(&self, challenge: &ChallengeRequest) -> Result<(), Error> {
            outcome(challenge)
        }

        async fn clean_up(&self, challenge: &ChallengeRequest) -> Result<(), Error> {
            outcome(challenge)
        }
    }

    fn router() -> Router {
        new(AppState {
            config: Arc::new(config()),
            solver: Arc::new(KeyedSolver),
        })
    }

    async fn call(uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn challenge(key: &str) -> String {
        json!({"resolvedFQDN": "_acme-challenge.example.com.", "key": key}).to_string()
    }

    #[tokio::test]
    async fn healthcheck() {
        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/healthcheck")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&bytes[..], br#"{"ok":"healthy"}"#);
    }

    #[tokio::test]
    async fn present_and_clean_up() {
        assert_eq!(
            call("/present", &challenge("k")).await,
            (StatusCode::OK, json!({"result": "presented"}))
        );
        assert_eq!(
            call("/cleanup", &challenge("k")).await,
            (StatusCode::OK, json!({"result": "cleaned-up"}))
        );
    }

    #[tokio::test]
    async fn idempotent_repeats_succeed() {
        assert_eq!(
            call("/present", &challenge("exists")).await,
            (StatusCode::OK, json!({"result": "already-exists"}))
        );
        assert_eq!(
            call("/cleanup", &challenge("missing")).await,
            (StatusCode::OK, json!({"result": "does-not-exist"}))
        );
    }

    #[tokio::test]
    async fn error_statuses() {
        let (status, body) = call("/present", &challenge("")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "invalid record: key is required"}));

        let (status, _) = call("/present", &challenge("unreachable")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, _) = call("/cleanup", &challenge("no-serial")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_present_still_completes() {
        let mut conf = config();
        conf.api_timeout = Duration::from_secs(5);
        conf.merge_cooldown = Duration::from_secs(30);
        let repo = Arc::new(FakeRepository::with_file(
            "main",
            &conf.zone_file,
            "2021100101 ; serial number\n; ACME-BOT\n; ACME-BOT-END\n",
        ));
        let solver = Arc::new(GitSolver::new(&conf, repo.clone()));
        solver.initialize().await.unwrap();
        let app = new(AppState {
            config: Arc::new(conf),
            solver: solver.clone(),
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/present")
                    .header("content-type", "application/json")
                    .body(Body::from(challenge("k")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

        tokio::time::sleep(Duration::from_secs(60)).await;
        let mrs = repo.merge_requests();
        assert_eq!(mrs.len(), 1);
        assert!(mrs[0].approved && mrs[0].merged);
        assert!(repo
            .file("main", "example.com.zone")
            .unwrap()
            .contains("_acme-challenge.example.com            TXT \"k\"\n"));
        assert!(solver
            .txt_store()
            .await
            .contains("_acme-challenge.example.com."));
    }

    #[tokio::test]
    async fn json_rejections() {
        let (status, _) = call("/present", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call("/present", r#"{"key": "k"}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
