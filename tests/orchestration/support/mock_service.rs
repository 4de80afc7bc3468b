//! In-process stand-in for the alignment dispatcher. Speaks the same three
//! plain-text endpoints as the real service: `POST /run`, `GET /status/{id}`,
//! and `GET /result/{id}/aln-clustal_num`.

use std::{
    collections::HashMap,
    convert::Infallible,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
};

use anyhow::{Context, Result};
use hyper::service::{make_service_fn, service_fn};
use hyper::{body, Body, Method, Request, Response, Server, StatusCode};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const RESULT_SUFFIX: &str = "/aln-clustal_num";

#[derive(Clone)]
struct JobRecord {
    status: String,
    result: Option<String>,
}

#[derive(Clone, Default)]
pub struct MockDispatcher {
    jobs: Arc<RwLock<HashMap<String, JobRecord>>>,
    received_bodies: Arc<RwLock<Vec<String>>>,
    next_id: Arc<AtomicU64>,
    fail_next: Arc<AtomicU64>,
    submissions: Arc<AtomicU64>,
}

impl MockDispatcher {
    /// Total `POST /run` requests seen, including the ones that were failed
    /// on purpose.
    pub fn submission_count(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Makes the next `count` submission requests answer HTTP 500.
    pub fn fail_next_submissions(&self, count: u64) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Transitions a job to FINISHED with the given result blob.
    pub fn finish_job(&self, job_id: &str, blob: &str) {
        let mut jobs = self.jobs.write().expect("mock dispatcher poisoned");
        jobs.insert(
            job_id.to_string(),
            JobRecord {
                status: "FINISHED".to_string(),
                result: Some(blob.to_string()),
            },
        );
    }

    /// Transitions a job to the terminal ERROR state.
    pub fn error_job(&self, job_id: &str) {
        let mut jobs = self.jobs.write().expect("mock dispatcher poisoned");
        jobs.insert(
            job_id.to_string(),
            JobRecord {
                status: "ERROR".to_string(),
                result: None,
            },
        );
    }

    /// Raw urlencoded bodies of every accepted submission, in order.
    pub fn received_bodies(&self) -> Vec<String> {
        self.received_bodies
            .read()
            .expect("mock dispatcher poisoned")
            .clone()
    }

    fn accept_submission(&self, raw_body: String) -> String {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let job_id = format!("clustalo-R{id:04}");
        let mut jobs = self.jobs.write().expect("mock dispatcher poisoned");
        jobs.insert(
            job_id.clone(),
            JobRecord {
                status: "RUNNING".to_string(),
                result: None,
            },
        );
        self.received_bodies
            .write()
            .expect("mock dispatcher poisoned")
            .push(raw_body);
        job_id
    }

    fn status_of(&self, job_id: &str) -> String {
        let jobs = self.jobs.read().expect("mock dispatcher poisoned");
        jobs.get(job_id)
            .map(|record| record.status.clone())
            .unwrap_or_else(|| "NOT_FOUND".to_string())
    }

    fn result_of(&self, job_id: &str) -> Option<String> {
        let jobs = self.jobs.read().expect("mock dispatcher poisoned");
        jobs.get(job_id).and_then(|record| record.result.clone())
    }
}

pub struct MockDispatcherServer {
    url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MockDispatcherServer {
    pub async fn start(dispatcher: MockDispatcher) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind mock dispatcher listener")?;
        let addr = listener
            .local_addr()
            .context("failed to read mock listener address")?;
        let std_listener = listener
            .into_std()
            .context("failed to convert mock listener")?;
        std_listener
            .set_nonblocking(true)
            .context("failed to set mock listener non-blocking")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let make_service = make_service_fn(move |_| {
            let dispatcher = dispatcher.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    serve_request(dispatcher.clone(), req)
                }))
            }
        });

        let server = Server::from_tcp(std_listener)
            .context("failed to build mock HTTP server")?
            .serve(make_service);
        let graceful = server.with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });

        let handle = tokio::spawn(async move {
            if let Err(err) = graceful.await {
                eprintln!("mock dispatcher stopped: {err}");
            }
        });

        Ok(Self {
            url: format!("http://{}", addr),
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn serve_request(
    dispatcher: MockDispatcher,
    req: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if method == Method::POST && path == "/run" {
        dispatcher.submissions.fetch_add(1, Ordering::SeqCst);
        if dispatcher
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Ok(text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "injected submission failure",
            ));
        }
        let raw_body = match body::to_bytes(req.into_body()).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => {
                return Ok(text_response(
                    StatusCode::BAD_REQUEST,
                    format!("failed to read body: {err}"),
                ));
            }
        };
        let job_id = dispatcher.accept_submission(raw_body);
        return Ok(text_response(StatusCode::OK, job_id));
    }

    if method == Method::GET {
        if let Some(job_id) = path.strip_prefix("/status/") {
            return Ok(text_response(StatusCode::OK, dispatcher.status_of(job_id)));
        }
        if let Some(rest) = path.strip_prefix("/result/") {
            if let Some(job_id) = rest.strip_suffix(RESULT_SUFFIX) {
                return Ok(match dispatcher.result_of(job_id) {
                    Some(blob) => text_response(StatusCode::OK, blob),
                    None => text_response(StatusCode::BAD_REQUEST, "job has no result yet"),
                });
            }
        }
    }

    Ok(text_response(StatusCode::NOT_FOUND, "unknown endpoint"))
}

fn text_response(status: StatusCode, body: impl Into<String>) -> Response<Body> {
    let mut response = Response::new(Body::from(body.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("text/plain"),
    );
    response
}
