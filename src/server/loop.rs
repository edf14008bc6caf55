// Server loop module
// Accepts connections until shutdown is requested, then lets in-flight ones drain

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::connection::accept_connection;
use crate::config;
use crate::logger;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Accept loop for the post server.
///
/// Must run inside a `LocalSet`: connections are served on local tasks.
/// Returns once `shutdown` is notified and open connections have finished,
/// or the drain deadline (the write timeout) has passed.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<config::AppState>,
    active_connections: Arc<AtomicUsize>,
    shutdown: Arc<Notify>,
) {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = shutdown.notified() => {
                logger::log_shutdown("Shutdown requested");
                break;
            }
        }
    }

    drop(listener);

    let deadline = Duration::from_secs(state.config.performance.write_timeout);
    if !drain_connections(&active_connections, deadline).await {
        logger::log_warning(&format!(
            "{} connection(s) still open after {}s, closing",
            active_connections.load(Ordering::SeqCst),
            deadline.as_secs()
        ));
    }
}

/// Wait until no connection is open; false when `deadline` elapsed first
async fn drain_connections(active_connections: &AtomicUsize, deadline: Duration) -> bool {
    let wait = async {
        while active_connections.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    };
    tokio::time::timeout(deadline, wait).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppState, Config};
    use crate::server::create_reusable_listener;
    use crate::store::MemoryStore;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn test_state(configure: impl FnOnce(&mut Config)) -> Arc<AppState> {
        let mut config = Config::defaults().unwrap();
        config.logging.access_log = false;
        configure(&mut config);
        Arc::new(AppState::new(config, Arc::new(MemoryStore::new())))
    }

    async fn roundtrip(addr: std::net::SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        String::from_utf8(raw).unwrap()
    }

    #[tokio::test]
    async fn test_serves_over_tcp_until_shutdown() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
                let addr = listener.local_addr().unwrap();
                let shutdown = Arc::new(Notify::new());
                let counter = Arc::new(AtomicUsize::new(0));

                let server = tokio::task::spawn_local(start_server_loop(
                    listener,
                    test_state(|_| {}),
                    Arc::clone(&counter),
                    Arc::clone(&shutdown),
                ));

                let body = r#"{"title":"A","contents":"B"}"#;
                let response = roundtrip(
                    addr,
                    &format!(
                        "POST /api/posts HTTP/1.1\r\nHost: localhost\r\n\
                         Content-Type: application/json\r\nContent-Length: {}\r\n\
                         Connection: close\r\n\r\n{body}",
                        body.len()
                    ),
                )
                .await;
                assert!(response.starts_with("HTTP/1.1 200"), "{response}");
                assert!(response.contains(r#"{"id":1,"title":"A","contents":"B"}"#));
                assert!(response.contains("server: postboard/0.1"));

                let response = roundtrip(
                    addr,
                    "GET /api/posts/1 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
                )
                .await;
                assert!(response.starts_with("HTTP/1.1 200"), "{response}");

                shutdown.notify_one();
                server.await.unwrap();
                assert_eq!(counter.load(Ordering::SeqCst), 0);
            })
            .await;
    }

    #[tokio::test]
    async fn test_rejects_over_connection_limit() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
                let addr = listener.local_addr().unwrap();
                let shutdown = Arc::new(Notify::new());
                // Pretend one connection is already open
                let counter = Arc::new(AtomicUsize::new(1));

                let server = tokio::task::spawn_local(start_server_loop(
                    listener,
                    test_state(|config| {
                        config.performance.max_connections = Some(1);
                        config.performance.write_timeout = 0;
                    }),
                    Arc::clone(&counter),
                    Arc::clone(&shutdown),
                ));

                let mut stream = TcpStream::connect(addr).await.unwrap();
                let mut buf = [0_u8; 64];
                let read = stream.read(&mut buf).await;
                assert!(matches!(read, Ok(0) | Err(_)), "{read:?}");
                assert_eq!(counter.load(Ordering::SeqCst), 1);

                shutdown.notify_one();
                server.await.unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn test_idle_connection_closed_after_read_timeout() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
                let addr = listener.local_addr().unwrap();
                let shutdown = Arc::new(Notify::new());
                let counter = Arc::new(AtomicUsize::new(0));

                let server = tokio::task::spawn_local(start_server_loop(
                    listener,
                    test_state(|config| {
                        config.performance.read_timeout = 1;
                        config.performance.write_timeout = 1;
                    }),
                    Arc::clone(&counter),
                    Arc::clone(&shutdown),
                ));

                // Connect and never send a request head
                let mut stream = TcpStream::connect(addr).await.unwrap();
                let mut raw = Vec::new();
                let closed =
                    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut raw))
                        .await;
                assert!(closed.is_ok(), "idle connection left open");

                shutdown.notify_one();
                server.await.unwrap();
                assert_eq!(counter.load(Ordering::SeqCst), 0);
            })
            .await;
    }

    #[tokio::test]
    async fn test_drain_connections() {
        let idle = AtomicUsize::new(0);
        assert!(drain_connections(&idle, Duration::from_millis(10)).await);

        let busy = AtomicUsize::new(2);
        assert!(!drain_connections(&busy, Duration::from_millis(100)).await);
    }
}
