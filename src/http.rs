//! HTTP surface of the web process.
//!
//! Three routes, all thin shims over [`Submitter`] and [`Poller`]:
//!
//! * `POST /process-newspaper` — multipart upload, field `file`; replies
//!   `202 {"job_id", "status": "processing"}` immediately. Never waits on
//!   the analysis model.
//! * `GET /get-result/<job_id>` — `200` with the result JSON when ready,
//!   `202 {"status": "processing"}` otherwise.
//! * `GET /` — minimal static landing page with an upload form.
//!
//! The error bodies (`{"error": "No file part"}` etc.) are part of the
//! public contract and mirror the wording clients already depend on.

use crate::error::PatrikaError;
use crate::job::JobId;
use crate::poll::{PollOutcome, Poller};
use crate::submit::Submitter;
use axum::extract::{DefaultBodyLimit, Extension, Multipart, Path};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

/// Build the web process's router around shared submitter/poller handles.
pub fn router(submitter: Arc<Submitter>, poller: Arc<Poller>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/process-newspaper", post(handle_submit))
        .route("/get-result/:job_id", get(handle_result))
        // Slack over the submitter's own ceiling so oversized uploads reach
        // our handler and get the descriptive error, not a bare 413.
        .layer(DefaultBodyLimit::max(max_upload_bytes + 1024 * 1024))
        .layer(Extension(submitter))
        .layer(Extension(poller))
}

async fn handle_submit(
    Extension(submitter): Extension<Arc<Submitter>>,
    multipart: Option<Multipart>,
) -> (StatusCode, Json<Value>) {
    let Some(mut multipart) = multipart else {
        return no_file_part();
    };

    let mut upload: Option<(String, Vec<u8>)> = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(data) => {
                        upload = Some((filename, data.to_vec()));
                        break;
                    }
                    Err(e) => {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(json!({ "error": format!("Malformed upload: {e}") })),
                        )
                    }
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("Malformed upload: {e}") })),
                )
            }
        }
    }

    let Some((filename, data)) = upload else {
        return no_file_part();
    };

    match submitter.submit(&filename, &data).await {
        Ok(job_id) => (
            StatusCode::ACCEPTED,
            Json(json!({ "job_id": job_id, "status": "processing" })),
        ),
        Err(e) if e.is_client_error() => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() })))
        }
        Err(e) => {
            error!(error = %e, "submission failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("An unexpected error occurred: {e}") })),
            )
        }
    }
}

fn no_file_part() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "No file part" })),
    )
}

async fn handle_result(
    Extension(poller): Extension<Arc<Poller>>,
    Path(job_id): Path<String>,
) -> (StatusCode, Json<Value>) {
    let Ok(job_id) = job_id.parse::<JobId>() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid job id" })),
        );
    };

    match poller.poll(job_id).await {
        Ok(PollOutcome::Processing) => (
            StatusCode::ACCEPTED,
            Json(json!({ "status": "processing" })),
        ),
        Ok(PollOutcome::Ready(result)) => match serde_json::to_value(&result) {
            Ok(value) => (StatusCode::OK, Json(value)),
            Err(e) => internal(PatrikaError::Internal(e.to_string())),
        },
        Err(e) => internal(e),
    }
}

fn internal(e: PatrikaError) -> (StatusCode, Json<Value>) {
    error!(error = %e, "poll failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": format!("An unexpected error occurred: {e}") })),
    )
}

async fn handle_index() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

const LANDING_PAGE: &str = r#"<!doctype html>
<html lang="hi">
<head><meta charset="utf-8"><title>Patrika — अख़बार विश्लेषक</title></head>
<body>
  <h1>अख़बार पृष्ठ विश्लेषक</h1>
  <form action="/process-newspaper" method="post" enctype="multipart/form-data">
    <input type="file" name="file" accept=".pdf,.png,.jpg,.jpeg" required>
    <button type="submit">विश्लेषण करें</button>
  </form>
  <p>Upload a newspaper page (PDF or image); poll <code>/get-result/&lt;job_id&gt;</code> for the article breakdown.</p>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::store::{SharedStore, JOBS_DIR, UPLOADS_DIR};
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const BOUNDARY: &str = "patrika-test-boundary";

    fn app() -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let store = SharedStore::open(dir.path()).unwrap();
        let config = AppConfig::builder().data_root(dir.path()).build().unwrap();
        let submitter = Arc::new(Submitter::new(config.clone(), store.clone()));
        let poller = Arc::new(Poller::new(config.clone(), store));
        let router = router(submitter, poller, config.max_upload_bytes);
        (dir, router)
    }

    fn multipart_body(field: &str, filename: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_request(field: &str, filename: &str, data: &[u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/process-newspaper")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(field, filename, data)))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn upload_is_accepted_with_job_id() {
        let (_dir, app) = app();
        let response = app
            .oneshot(multipart_request("file", "page.jpg", b"jpeg-bytes"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let body = body_json(response).await;
        assert_eq!(body["status"], "processing");
        assert!(body["job_id"].as_str().unwrap().parse::<JobId>().is_ok());
    }

    #[tokio::test]
    async fn missing_file_part_rejected_without_side_effects() {
        let (dir, app) = app();
        let response = app
            .oneshot(multipart_request("attachment", "page.jpg", b"x"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "No file part");

        // Nothing reached shared storage.
        for d in [UPLOADS_DIR, JOBS_DIR] {
            assert_eq!(std::fs::read_dir(dir.path().join(d)).unwrap().count(), 0);
        }
    }

    #[tokio::test]
    async fn non_multipart_post_rejected_as_no_file_part() {
        let (_dir, app) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/process-newspaper")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "No file part");
    }

    #[tokio::test]
    async fn empty_filename_rejected_with_contract_message() {
        let (_dir, app) = app();
        let response = app
            .oneshot(multipart_request("file", "", b"x"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "No selected file");
    }

    #[tokio::test]
    async fn unknown_job_polls_as_processing() {
        let (_dir, app) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/get-result/{}", JobId::new()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(response).await["status"], "processing");
    }

    #[tokio::test]
    async fn garbage_job_id_is_a_client_error() {
        let (_dir, app) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/get-result/not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn landing_page_serves_upload_form() {
        let (_dir, app) = app();
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(std::str::from_utf8(&bytes).unwrap().contains("process-newspaper"));
    }
}
