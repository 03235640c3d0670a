//! In-process fake rqlite cluster for integration tests.
//!
//! Every node is a real HTTP server on a random loopback port. The nodes share
//! one [`ClusterState`] deciding who is leader, who is down and what has been
//! written, so tests can move leadership around between statements.
//!
//! Node behavior:
//! - `GET /status` reports the shared leader and the other nodes as peers
//! - `POST /db/execute` succeeds on the leader and answers `not leader` elsewhere
//! - `POST /db/query` answers anywhere unless `level=strong` hits a follower
//! - a node marked down answers `503` to everything

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Default)]
pub struct ClusterState {
    pub leader: Option<String>,
    pub down: HashSet<String>,
    /// (node, statement body) for every accepted write.
    pub writes: Vec<(String, Value)>,
    /// (node, path) for every request received.
    pub requests: Vec<(String, String)>,
    pub authorizations: Vec<Option<String>>,
}

pub struct FakeCluster {
    pub nodes: Vec<String>,
    state: Arc<Mutex<ClusterState>>,
    shutdown: Vec<tokio::sync::oneshot::Sender<()>>,
}

impl FakeCluster {
    /// Starts `count` nodes; the first one is leader.
    pub async fn start(count: usize) -> Self {
        let state = Arc::new(Mutex::new(ClusterState::default()));
        let mut nodes = Vec::with_capacity(count);
        let mut shutdown = Vec::with_capacity(count);
        let mut listeners = Vec::with_capacity(count);

        for _ in 0..count {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            nodes.push(format!("http://{}", listener.local_addr().unwrap()));
            listeners.push(listener);
        }
        state.lock().unwrap().leader = nodes.first().cloned();

        for (listener, me) in listeners.into_iter().zip(nodes.iter().cloned()) {
            let (tx, mut rx) = tokio::sync::oneshot::channel::<()>();
            shutdown.push(tx);
            let state = state.clone();
            let all = nodes.clone();

            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        accepted = listener.accept() => {
                            let Ok((stream, _)) = accepted else { continue };
                            let state = state.clone();
                            let me = me.clone();
                            let all = all.clone();
                            tokio::spawn(async move {
                                let service = service_fn(move |req: Request<Incoming>| {
                                    let state = state.clone();
                                    let me = me.clone();
                                    let all = all.clone();
                                    async move { Ok::<_, hyper::Error>(handle(req, &me, &all, &state).await) }
                                });
                                let _ = http1::Builder::new()
                                    .serve_connection(TokioIo::new(stream), service)
                                    .await;
                            });
                        }
                        _ = &mut rx => break,
                    }
                }
            });
        }

        Self { nodes, state, shutdown }
    }

    pub fn node(&self, index: usize) -> &str {
        &self.nodes[index]
    }

    pub fn set_leader(&self, index: usize) {
        self.state.lock().unwrap().leader = Some(self.nodes[index].clone());
    }

    pub fn clear_leader(&self) {
        self.state.lock().unwrap().leader = None;
    }

    pub fn set_down(&self, index: usize, down: bool) {
        let mut state = self.state.lock().unwrap();
        if down {
            state.down.insert(self.nodes[index].clone());
        } else {
            state.down.remove(&self.nodes[index]);
        }
    }

    pub fn writes_on(&self, index: usize) -> usize {
        let node = &self.nodes[index];
        self.state.lock().unwrap().writes.iter().filter(|(n, _)| n == node).count()
    }

    pub fn status_probes(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|(_, path)| path == "/status")
            .count()
    }

    pub fn last_write(&self) -> Option<Value> {
        self.state.lock().unwrap().writes.last().map(|(_, body)| body.clone())
    }

    pub fn authorizations(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().authorizations.clone()
    }

    /// `host:port` list suitable for a connection string.
    pub fn dsn_hosts(&self) -> String {
        self.nodes
            .iter()
            .map(|n| n.trim_start_matches("http://"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Drop for FakeCluster {
    fn drop(&mut self) {
        for tx in self.shutdown.drain(..) {
            let _ = tx.send(());
        }
    }
}

fn reply(status: StatusCode, body: Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

async fn handle(req: Request<Incoming>, me: &str, all: &[String], state: &Mutex<ClusterState>) -> Response<Full<Bytes>> {
    let path = req.uri().path().to_string();
    let strong = req.uri().query().map(|q| q.contains("level=strong")).unwrap_or(false);
    let authorization = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = req.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    let mut state = state.lock().unwrap();
    state.requests.push((me.to_string(), path.clone()));
    state.authorizations.push(authorization);

    if state.down.contains(me) {
        return reply(StatusCode::SERVICE_UNAVAILABLE, json!({"error": "node down"}));
    }
    let is_leader = state.leader.as_deref() == Some(me);

    match path.as_str() {
        "/status" => {
            let peers: Vec<&String> = all.iter().filter(|n| Some(n.as_str()) != state.leader.as_deref()).collect();
            let leader = state.leader.clone().unwrap_or_default();
            reply(StatusCode::OK, json!({"cluster": {"leader": leader, "peers": peers}, "node": {"addr": me}}))
        }
        "/db/execute" if is_leader => {
            state.writes.push((me.to_string(), body));
            let id = state.writes.len() as i64;
            reply(StatusCode::OK, json!({"results": [{"last_insert_id": id, "rows_affected": 1}]}))
        }
        "/db/execute" => reply(StatusCode::OK, json!({"results": [{"error": "not leader"}]})),
        "/db/query" if strong && !is_leader => reply(StatusCode::OK, json!({"results": [{"error": "not leader"}]})),
        "/db/query" => {
            let count = state.writes.len() as i64;
            reply(
                StatusCode::OK,
                json!({"results": [{"columns": ["served_by", "writes"], "types": ["text", "integer"], "values": [[me, count]]}]}),
            )
        }
        _ => reply(StatusCode::NOT_FOUND, json!({})),
    }
}
