use anyhow::Context;
use quad_core::config::Config;
use std::path::Path;

pub fn run(root: &Path, port: u16) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let name = config.project.name;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
            .await
            .with_context(|| format!("failed to bind port {port}"))?;
        let actual_port = listener.local_addr()?.port();

        println!(
            "QUAD API for '{name}' on http://localhost:{actual_port}  (PID {})",
            std::process::id()
        );

        tokio::select! {
            res = quad_server::serve_on(root, listener) => res,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                Ok(())
            }
        }
    })
}
