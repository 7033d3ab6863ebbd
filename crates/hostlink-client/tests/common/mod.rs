// crates/hostlink-client/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Local discovery host and resolver builders.
// Purpose: Run discovery and resolution against an in-process HTTP server.
// Dependencies: hostlink-client, hostlink-config, tempfile, tiny_http
// ============================================================================

//! ## Overview
//! [`HostServer`] serves fixed JSON routes over plain HTTP on `127.0.0.1`
//! and records every request it receives. Resolvers built here allow HTTP
//! discovery and read configuration only from a temporary home directory.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]
#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use hostlink_client::DiscoveryOptions;
use hostlink_client::Resolver;
use hostlink_client::ResolverOptions;
use hostlink_config::CredentialStore;
use hostlink_config::Environment;
use serde_json::Value;
use serde_json::json;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Discovery document path.
pub const WELL_KNOWN: &str = "/.well-known/hostlink.json";
/// Constraint path for the API service under the default versions prefix.
pub const CONSTRAINT_PATH: &str = "/v1/versions/api/hostlink-client";

// ============================================================================
// SECTION: Host Server
// ============================================================================

/// Request observed by [`HostServer`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request path including any query.
    pub path: String,
    /// `Authorization` header value, if sent.
    pub authorization: Option<String>,
    /// `User-Agent` header value, if sent.
    pub user_agent: Option<String>,
}

/// In-process HTTP host serving fixed routes.
pub struct HostServer {
    /// Underlying server, shared with the worker thread.
    server: Arc<Server>,
    /// Bound port.
    port: u16,
    /// Requests received so far.
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    /// Worker thread handle.
    handle: Option<JoinHandle<()>>,
}

impl HostServer {
    /// Starts a server answering `routes` (path to status and JSON body).
    pub fn start(routes: Vec<(&str, u16, Value)>) -> Self {
        let routes: HashMap<String, (u16, String)> =
            routes.into_iter().map(|(path, status, body)| (path.to_string(), (status, body.to_string()))).collect();
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let port = server.server_addr().to_ip().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let worker_server = Arc::clone(&server);
        let worker_requests = Arc::clone(&requests);
        let handle = thread::spawn(move || {
            while let Ok(request) = worker_server.recv() {
                let header = |name: &'static str| {
                    request
                        .headers()
                        .iter()
                        .find(|header| header.field.equiv(name))
                        .map(|header| header.value.as_str().to_string())
                };
                let recorded = RecordedRequest {
                    path: request.url().to_string(),
                    authorization: header("Authorization"),
                    user_agent: header("User-Agent"),
                };
                worker_requests.lock().unwrap().push(recorded);
                let (status, body) = routes
                    .get(request.url())
                    .cloned()
                    .unwrap_or_else(|| (404, json!({"error": "not found"}).to_string()));
                let content_type = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
                let response = Response::from_string(body).with_status_code(status).with_header(content_type);
                let _ = request.respond(response);
            }
        });
        Self {
            server,
            port,
            requests,
            handle: Some(handle),
        }
    }

    /// Starts a server advertising `services` at the well-known path.
    pub fn with_services(services: Value) -> Self {
        Self::start(vec![(WELL_KNOWN, 200, services)])
    }

    /// Returns the hostname (with port) clients should target.
    pub fn hostname(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Returns every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Returns how many requests hit `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.requests().iter().filter(|request| request.path == path).count()
    }
}

impl Drop for HostServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// ============================================================================
// SECTION: Resolver Builders
// ============================================================================

/// Builds a resolver over `home` and `env` that discovers over plain HTTP.
pub fn resolver(home: &Path, env: Environment, client_version: &str) -> Resolver {
    Resolver::new(
        CredentialStore::with_home(env, home),
        ResolverOptions {
            client_version: client_version.to_string(),
            timeout: Duration::from_secs(5),
            discovery: DiscoveryOptions {
                allow_http: true,
            },
        },
    )
}

/// Writes a credentials file granting `token` for `host` under `home`.
pub fn write_credentials(home: &Path, host: &str, token: &str) {
    let dir = home.join(".hostlink.d");
    fs::create_dir_all(&dir).unwrap();
    let body = json!({"credentials": {host: {"token": token}}});
    fs::write(dir.join("credentials.json"), body.to_string()).unwrap();
}

/// Writes the main config file under `home`.
pub fn write_main_config(home: &Path, content: &str) {
    fs::write(home.join(".hostlinkrc"), content).unwrap();
}
