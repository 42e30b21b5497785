//! Test harness: runs the mock agent in-process for end-to-end client tests.
//!
//! [`spawn_agent`] serves the agent on an ephemeral loopback port from a
//! dedicated thread with its own `tokio` runtime, since the client under
//! test is blocking.

use std::net::SocketAddr;
use std::sync::{mpsc, Arc};
use std::thread;

use eidagent_mock::{build_router, AgentConfig, AgentState};

/// A running mock agent.
pub struct TestAgent {
    pub addr: SocketAddr,
    /// The same state the agent's handlers use, for scripting and inspection.
    pub state: Arc<AgentState>,
    pub config: AgentConfig,
}

impl TestAgent {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// `http://127.0.0.1:<port>`
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Start an ephemeral mock agent with the default reader and PIN.
///
/// The server thread lives until the test process exits.
///
/// # Panics
///
/// Panics if the runtime cannot be built or the listener cannot be bound.
pub fn spawn_agent() -> TestAgent {
    let state = Arc::new(AgentState::new());
    let (tx, rx) = mpsc::channel();

    let server_state = Arc::clone(&state);
    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("build agent runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind ephemeral port");
            let addr = listener.local_addr().expect("get local addr");
            let config = AgentConfig {
                bind_addr: addr,
                ..AgentConfig::default()
            };
            let router = build_router(server_state, config.clone());
            tx.send(config).expect("report agent address");
            axum::serve(listener, router)
                .await
                .expect("conformance agent error");
        });
    });

    let config = rx.recv().expect("agent failed to start");
    TestAgent {
        addr: config.bind_addr,
        state,
        config,
    }
}
