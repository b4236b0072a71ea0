//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use font_proxy::cache::{CacheStore, MemoryCache};
use font_proxy::config::{CacheBackendKind, ProxyConfig};
use font_proxy::{HttpServer, Shutdown};

/// A canned upstream answer.
#[derive(Clone, Default)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub expires: Option<&'static str>,
    pub body: Vec<u8>,
    pub delay: Option<Duration>,
}

impl MockResponse {
    pub fn ok(content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type),
            body: body.into(),
            ..Self::default()
        }
    }
}

/// A running mock upstream that counts and records requests.
pub struct MockUpstream {
    pub addr: SocketAddr,
    calls: Arc<AtomicU32>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockUpstream {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Lowercased request heads received so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` receives the request target (path and query) and returns the answer.
pub async fn start_programmable_backend<F>(f: F) -> MockUpstream
where
    F: Fn(&str) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let (calls_task, requests_task) = (calls.clone(), requests.clone());
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let f = f.clone();
            let calls = calls_task.clone();
            let requests = requests_task.clone();
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                calls.fetch_add(1, Ordering::SeqCst);
                let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                requests.lock().unwrap().push(head.to_lowercase());

                let response = f(&target);
                if let Some(delay) = response.delay {
                    tokio::time::sleep(delay).await;
                }

                let mut out = format!(
                    "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
                    response.status,
                    reason(response.status),
                    response.body.len()
                );
                if let Some(ct) = response.content_type {
                    out.push_str(&format!("Content-Type: {}\r\n", ct));
                }
                if let Some(expires) = response.expires {
                    out.push_str(&format!("Expires: {}\r\n", expires));
                }
                out.push_str("\r\n");

                let mut bytes = out.into_bytes();
                bytes.extend_from_slice(&response.body);
                let _ = socket.write_all(&bytes).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    MockUpstream { addr, calls, requests }
}

async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// An address nothing listens on.
pub async fn closed_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Proxy config pointing both upstreams at local mocks, with an in-memory cache.
pub fn config_for(api_base: &str, static_base: &str) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.upstream.api_base_url = api_base.to_string();
    config.upstream.static_base_url = static_base.to_string();
    config.cache.backend = CacheBackendKind::Memory;
    config.timeouts.connect_secs = 1;
    config
}

pub fn memory_store() -> Arc<MemoryCache> {
    Arc::new(MemoryCache::new(Duration::from_secs(300)))
}

/// Start the proxy on an ephemeral port. Trigger the returned `Shutdown` to stop it.
pub async fn start_proxy(
    config: ProxyConfig,
    store: Arc<dyn CacheStore>,
) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, store).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
