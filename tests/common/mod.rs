//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sailor::ConnectionOptions;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Request paths seen by a mock backend, in arrival order.
#[derive(Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<String>>>);

impl RequestLog {
    pub fn paths(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|p| *p == path).count()
    }

    fn push(&self, path: String) {
        self.0.lock().unwrap().push(path);
    }
}

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` receives the request path and returns the status and body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, RequestLog)
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log = RequestLog::default();
    let f = Arc::new(f);

    let requests = log.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let requests = requests.clone();
                    tokio::spawn(async move {
                        let Some(path) = read_request_path(&mut socket).await else {
                            return;
                        };
                        requests.push(path.clone());

                        let (status, body) = f(path).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, log)
}

/// Read the request head and return the path of the request line.
async fn read_request_path(socket: &mut tokio::net::TcpStream) -> Option<String> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut buf).await.ok()?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&buf[..n]);
    }

    let head = String::from_utf8_lossy(&head);
    head.lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn connection(addr: SocketAddr, app: &str) -> ConnectionOptions {
    ConnectionOptions {
        addr: format!("http://{}", addr),
        namespace: "test".into(),
        app: app.into(),
        access_key: "access".into(),
        secret_key: "secret".into(),
        socket_timeout_secs: 2,
    }
}

/// Wrap a payload the way mounted config and misc files are written.
pub fn envelope(content: &str) -> String {
    serde_json::json!({ "_content": content }).to_string()
}

pub fn write_file(dir: &Path, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).unwrap();
}

/// Poll `check` until it returns true or `timeout` elapses.
pub async fn eventually<F: Fn() -> bool>(timeout: Duration, check: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    check()
}
