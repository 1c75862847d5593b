// Boots the server once per test binary and hands out its base URL.
use std::{
    net::{SocketAddr, TcpStream},
    sync::{OnceLock, mpsc},
    time::Duration,
};

static SERVER_ADDR: OnceLock<SocketAddr> = OnceLock::new();

/// Starts the shared test server on first use and returns its base URL.
pub fn ensure_server() -> String {
    let addr = *SERVER_ADDR.get_or_init(|| {
        let (addr_tx, addr_rx) = mpsc::channel();
        // An OS thread with its own runtime, so the server outlives each
        // `#[tokio::test]` runtime in this binary.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Ephemeral port so test binaries never collide with local
                // services or each other.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                addr_tx.send(addr).expect("publish test server addr");
                simon_server::run(listener).await.expect("server failed");
            });
        });

        let addr = addr_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("server thread should publish its address");
        wait_until_accepting(addr);
        addr
    });
    format!("http://{addr}")
}

// The address is published as soon as the listener is bound; poll the
// socket until the accept loop is actually serving.
fn wait_until_accepting(addr: SocketAddr) {
    for _ in 0..100 {
        if TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("server did not become ready in time");
}
