use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use diagram_trace_plugin::plugin::DiagramTracePlugin;
use diagram_trace_plugin::storage::MemorySessionFactory;

pub struct TestServer {
    pub base_url: String,
    pub plugin: Arc<DiagramTracePlugin>,
    pub factory: MemorySessionFactory,
}

/// Serve the plugin in-process on a free port, backed by a fresh in-memory
/// store. Each test gets its own server so state never leaks between tests.
pub async fn spawn_server() -> Result<TestServer> {
    let factory = MemorySessionFactory::new();
    let plugin = Arc::new(
        DiagramTracePlugin::start(Arc::new(factory.clone()))
            .await
            .context("failed to start plugin")?,
    );

    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind test listener")?;

    let router = Arc::clone(&plugin).admin_router();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    let server = TestServer {
        base_url: format!("http://127.0.0.1:{}", port),
        plugin,
        factory,
    };
    wait_ready(&server, Duration::from_secs(10)).await?;
    Ok(server)
}

async fn wait_ready(server: &TestServer, timeout: Duration) -> Result<()> {
    let client = reqwest::Client::new();
    let deadline = Instant::now() + timeout;
    loop {
        if Instant::now() > deadline {
            break;
        }
        let url = format!("{}/health", server.base_url);
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return Ok(());
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    anyhow::bail!(
        "server did not become ready on {} within {:?}",
        server.base_url,
        timeout
    )
}
