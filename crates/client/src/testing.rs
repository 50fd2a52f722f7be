//! Fakes shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shelfsync_core::{CacheDb, Error, Request, Response, WorkerConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

use crate::fetch::Fetcher;
use crate::strategy::{Router, StrategyEngine};
use crate::worker::{Host, Notification};

pub const ORIGIN: &str = "http://localhost:8080";

pub fn url(path: &str) -> String {
    format!("{ORIGIN}{path}")
}

/// Fetcher answering from a route table; unknown routes fail like an
/// unreachable network.
#[derive(Default)]
pub struct FakeFetcher {
    routes: Mutex<HashMap<(String, String), Result<Response, String>>>,
    calls: Mutex<Vec<Request>>,
    offline: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, method: &str, url: &str, response: Response) {
        self.routes
            .lock()
            .unwrap()
            .insert((method.to_string(), url.to_string()), Ok(response));
    }

    pub fn fail(&self, method: &str, url: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert((method.to_string(), url.to_string()), Err(format!("connection refused: {url}")));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Hold every fetch until the returned handle is notified.
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<Request> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.lock().unwrap().push(request.clone());

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }

        let reply = self
            .routes
            .lock()
            .unwrap()
            .get(&(request.method.clone(), request.url.clone()))
            .cloned();
        match reply {
            Some(Ok(response)) => Ok(response),
            Some(Err(reason)) => Err(Error::Network(reason)),
            None => Err(Error::Network(format!("no route to {}", request.url))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    ClaimClients,
    SkipWaiting,
    ShowNotification(Notification),
    OpenWindow(String),
}

/// Host that records every capability call.
#[derive(Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
    refuse_skip_waiting: AtomicBool,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every later `skip_waiting` call fail.
    pub fn refuse_skip_waiting(&self) {
        self.refuse_skip_waiting.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Host for RecordingHost {
    async fn claim_clients(&self) -> Result<(), Error> {
        self.calls.lock().unwrap().push(HostCall::ClaimClients);
        Ok(())
    }

    async fn skip_waiting(&self) -> Result<(), Error> {
        self.calls.lock().unwrap().push(HostCall::SkipWaiting);
        if self.refuse_skip_waiting.load(Ordering::SeqCst) {
            return Err(Error::InvalidState("skip_waiting unavailable".into()));
        }
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        self.calls
            .lock()
            .unwrap()
            .push(HostCall::ShowNotification(notification.clone()));
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<(), Error> {
        self.calls.lock().unwrap().push(HostCall::OpenWindow(url.to_string()));
        Ok(())
    }
}

/// Default config with the precache manifest answered by `fetcher`.
pub fn serve_manifest(config: &WorkerConfig, fetcher: &FakeFetcher) {
    for path in &config.precache {
        let body = format!("asset {path}");
        let response = if path.ends_with(".html") || path.ends_with('/') {
            Response::new(200, body).with_header("Content-Type", "text/html")
        } else {
            Response::new(200, body)
        };
        fetcher.respond("GET", &url(path), response);
    }
}

pub async fn engine(fetcher: Arc<FakeFetcher>) -> (StrategyEngine, CacheDb) {
    let config = WorkerConfig::default();
    let db = CacheDb::open_in_memory().await.unwrap();
    let router = Router::from_config(&config).unwrap();
    let engine = StrategyEngine::new(&config, &router, db.clone(), fetcher).unwrap();
    (engine, db)
}

/// Loopback HTTP server that reads each request in full, writes `reply`
/// verbatim and closes the connection. Returns its base URL and the number
/// of requests it received.
pub async fn serve_raw(reply: &'static str) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = hits.clone();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            read_request(&mut stream).await;
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = stream.write_all(reply.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (base, hits)
}

async fn read_request(stream: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return;
            }
        }
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

/// Base URL of a loopback port nothing listens on.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
