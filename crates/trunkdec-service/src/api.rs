//! The `/api/v1` route handlers.
//!
//! The decode endpoint never decodes synchronously: it spools the upload
//! to a temp file, builds a job, and hands it to the worker pool. Every
//! non-2xx response is a JSON object with an `error` field; no path from
//! an internal failure ever reaches a client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::http::{Pattern, Request, Response, Router};
use crate::multipart;
use crate::paths;
use crate::worker::{JobSpec, WorkerPool};

/// Shared state captured by the route handlers at registration.
pub struct AppState {
    /// Service configuration.
    pub config: Arc<ServiceConfig>,
    /// The worker pool accepting jobs.
    pub pool: Arc<WorkerPool>,
}

/// Spool-file sequence for unique temp names.
static UPLOAD_SEQ: AtomicU64 = AtomicU64::new(0);

/// Build the router with all routes registered.
#[must_use]
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new();

    {
        let state = Arc::clone(&state);
        router.route(
            "POST",
            Pattern::Exact("/api/v1/decode"),
            Box::new(move |req| guarded(&state, req, handle_decode)),
        );
    }
    {
        let state = Arc::clone(&state);
        router.route(
            "GET",
            Pattern::Exact("/api/v1/status"),
            Box::new(move |req| guarded(&state, req, handle_status)),
        );
    }
    {
        let state = Arc::clone(&state);
        router.route(
            "GET",
            Pattern::Prefix("/api/v1/jobs/"),
            Box::new(move |req| guarded(&state, req, handle_job_lookup)),
        );
    }

    router
}

/// Apply the auth contract, then the handler.
fn guarded(
    state: &Arc<AppState>,
    req: &Request,
    handler: fn(&AppState, &Request) -> Response,
) -> Response {
    if !authorized(req, state.config.auth_token.as_deref()) {
        return ServiceError::AuthRequired.to_response();
    }
    handler(state, req)
}

/// Bearer token or X-API-Key; anything else is rejected when a token is
/// configured.
fn authorized(req: &Request, token: Option<&str>) -> bool {
    let Some(token) = token else {
        return true;
    };

    if let Some(value) = req.header("authorization") {
        if let Some(bearer) = value.strip_prefix("Bearer ") {
            return bearer == token;
        }
    }
    if let Some(value) = req.header("x-api-key") {
        return value == token;
    }

    false
}

fn handle_decode(state: &AppState, req: &Request) -> Response {
    let content_type = req.header("content-type").unwrap_or("").to_string();
    if !content_type.contains("multipart/form-data") {
        return Response::error(400, "Expected multipart/form-data");
    }

    let parts = match multipart::parse(&content_type, &req.body) {
        Ok(parts) => parts,
        Err(e) => {
            warn!(error = %e, "upload parse failed");
            return e.to_response();
        }
    };

    let Some(file) = parts.iter().find(|p| p.name == "p25_file") else {
        return Response::error(400, "Missing p25_file");
    };

    let metadata = parts
        .iter()
        .find(|p| p.name == "metadata")
        .map(|p| String::from_utf8_lossy(&p.data).into_owned());

    let stream_name = parts
        .iter()
        .find(|p| p.name == "stream_name")
        .map(|p| String::from_utf8_lossy(&p.data).into_owned())
        .unwrap_or_else(|| state.config.stream_name.clone());

    let seq = UPLOAD_SEQ.fetch_add(1, Ordering::Relaxed);
    let basename = upload_basename(file.filename.as_deref(), seq);

    let temp_path = state.config.temp_dir().join(format!(
        "trunkdec_upload_{}_{seq}_{basename}",
        std::process::id()
    ));
    if let Err(e) = std::fs::write(&temp_path, &file.data) {
        warn!(error = %e, "could not spool upload");
        return Response::error(500, "Could not store upload");
    }

    log_call(&stream_name, metadata.as_deref(), file.data.len());

    let output_stem = paths::output_stem(
        &state.config.output_dir,
        metadata.as_deref(),
        &basename,
    );

    match state.pool.submit(JobSpec {
        input_path: temp_path,
        metadata,
        output_stem,
        stream_name: stream_name.clone(),
    }) {
        Ok(job_id) => Response::json(
            202,
            json!({
                "job_id": job_id,
                "status": "queued",
                "message": "Capture accepted for decoding",
                "stream_name": stream_name,
            }),
        ),
        Err(e) => {
            if !matches!(e, ServiceError::QueueFull) {
                warn!(error = %e, "job submission failed");
            }
            e.to_response()
        }
    }
}

fn handle_status(state: &AppState, _req: &Request) -> Response {
    let stats = state.pool.stats();

    Response::json(
        200,
        json!({
            "status": "ok",
            "service": "trunkdec",
            "version": env!("CARGO_PKG_VERSION"),
            "queue_depth": stats.queue_depth,
            "queue_capacity": state.pool.queue_capacity(),
            "active_workers": stats.active_workers,
            "jobs_queued": stats.queued,
            "jobs_completed": stats.completed,
            "jobs_failed": stats.failed,
            "avg_processing_ms": stats.avg_processing_ms,
        }),
    )
}

fn handle_job_lookup(state: &AppState, req: &Request) -> Response {
    let id = req.path.strip_prefix("/api/v1/jobs/").unwrap_or("");

    match state.pool.job_snapshot(id) {
        Some(job) => Response::json(
            200,
            json!({
                "job_id": job.id,
                "status": job.status,
                "stream_name": job.stream_name,
                "received_at": job.received_at.to_rfc3339(),
                "started_at": job.started_at.map(|t| t.to_rfc3339()),
                "completed_at": job.completed_at.map(|t| t.to_rfc3339()),
                "error": job.error,
            }),
        ),
        None => ServiceError::JobNotFound { id: id.to_string() }.to_response(),
    }
}

/// A safe basename for the spool file and artifact stem: the final path
/// component of the client's filename, or a generated name.
fn upload_basename(filename: Option<&str>, seq: u64) -> String {
    let fallback = || format!("api_call_{seq}.p25");

    let Some(name) = filename else {
        return fallback();
    };

    let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    if name.is_empty() || name == "." || name == ".." {
        return fallback();
    }
    name.to_string()
}

/// One log line per accepted upload with the fields operators track calls
/// by, parsed leniently from caller metadata.
fn log_call(stream: &str, metadata: Option<&str>, size: usize) {
    let parsed: Option<serde_json::Value> =
        metadata.and_then(|m| serde_json::from_str(m).ok());

    let lookup = |key: &str| -> String {
        parsed
            .as_ref()
            .and_then(|v| v.get(key))
            .map(|v| v.to_string().trim_matches('"').to_string())
            .unwrap_or_else(|| "unknown".to_string())
    };

    info!(
        stream,
        bytes = size,
        short_name = %lookup("short_name"),
        talkgroup = %lookup("talkgroup"),
        source = %lookup("src"),
        encrypted = %lookup("encrypted"),
        "decode request accepted"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(headers: &[(&str, &str)]) -> Request {
        Request {
            method: "POST".to_string(),
            path: "/api/v1/decode".to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: Vec::new(),
        }
    }

    #[test]
    fn auth_accepts_bearer_and_api_key() {
        let token = Some("T");

        assert!(authorized(&request_with(&[("Authorization", "Bearer T")]), token));
        assert!(authorized(&request_with(&[("X-API-Key", "T")]), token));
        assert!(!authorized(&request_with(&[("Authorization", "Bearer X")]), token));
        assert!(!authorized(&request_with(&[("Authorization", "Basic T")]), token));
        assert!(!authorized(&request_with(&[]), token));
        assert!(authorized(&request_with(&[]), None));
    }

    #[test]
    fn upload_basename_is_sanitized() {
        assert_eq!(upload_basename(Some("call.p25"), 1), "call.p25");
        assert_eq!(upload_basename(Some("/etc/passwd"), 1), "passwd");
        assert_eq!(upload_basename(Some("a\\b\\c.p25"), 1), "c.p25");
        assert_eq!(upload_basename(Some(".."), 7), "api_call_7.p25");
        assert_eq!(upload_basename(None, 3), "api_call_3.p25");
    }
}
