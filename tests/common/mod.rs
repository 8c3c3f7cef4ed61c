//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use usage_client::{ApiError, SessionRefresher};

static TRACING: std::sync::Once = std::sync::Once::new();

/// Install a log subscriber once per test binary; `RUST_LOG` controls it.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Request details handed to a programmable responder.
#[derive(Debug, Clone)]
#[allow(dead_code)] // not every test binary reads both fields
pub struct MockRequest {
    pub path: String,
    pub bearer: Option<String>,
}

/// Start a programmable mock backend on an ephemeral port.
///
/// The responder sees the request path and bearer token and returns a status
/// code plus JSON body.
pub async fn start_mock_api<F, Fut>(responder: F) -> SocketAddr
where
    F: Fn(MockRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let responder = Arc::new(responder);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let responder = responder.clone();
                    tokio::spawn(async move {
                        let mut buf = Vec::new();
                        let mut chunk = [0u8; 1024];
                        // Read until the end of the request head.
                        loop {
                            match socket.read(&mut chunk).await {
                                Ok(0) => break,
                                Ok(n) => {
                                    buf.extend_from_slice(&chunk[..n]);
                                    if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                                        break;
                                    }
                                }
                                Err(_) => return,
                            }
                        }
                        let request = parse_request(&buf);
                        let (status, body) = responder(request).await;
                        let response = format!(
                            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            status_text(status),
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

fn parse_request(raw: &[u8]) -> MockRequest {
    let head = String::from_utf8_lossy(raw);
    let path = head
        .lines()
        .next()
        .and_then(|request_line| request_line.split_whitespace().nth(1))
        .unwrap_or("/")
        .split('?')
        .next()
        .unwrap_or("/")
        .to_string();
    let bearer = head.lines().find_map(|line| {
        let lower = line.to_ascii_lowercase();
        lower
            .starts_with("authorization: bearer ")
            .then(|| line["authorization: bearer ".len()..].trim().to_string())
    });
    MockRequest { path, bearer }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "OK",
    }
}

/// Refresher that counts calls and returns a fixed token.
pub struct CountingRefresher {
    calls: AtomicU32,
    token: Option<String>,
}

impl CountingRefresher {
    #[allow(dead_code)]
    pub fn returning(token: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            token: Some(token.to_string()),
        })
    }

    #[allow(dead_code)]
    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            token: None,
        })
    }

    #[allow(dead_code)]
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SessionRefresher for CountingRefresher {
    fn current_session(&self) -> BoxFuture<'static, Result<Option<String>, ApiError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let token = self.token.clone();
        async move {
            // Leave the refresh pending long enough for callers to pile up.
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            Ok(token)
        }
        .boxed()
    }
}
