use std::io;
use std::net::TcpListener;
use std::path::PathBuf;
use std::thread;

use axum::Router;
use tower_http::services::ServeDir;

use vireo::{Chainable, Result};

/// Serves `dir` on every interface at `port` from a background thread.
/// Binding happens here so an occupied port fails fast, before the
/// server thread spawns.
pub fn serve(dir: PathBuf, port: u16) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .chain_with(|| vireo::error!("couldn't bind the server port", "port" => port))?;

    listener.set_nonblocking(true)
        .chain_with(|| vireo::error!("couldn't configure the server socket"))?;

    tracing::info!(port, dir = %dir.display(), "serving the site");
    thread::spawn(move || {
        if let Err(e) = serve_blocking(listener, dir) {
            tracing::error!("the file server failed: {}", e);
        }
    });

    Ok(())
}

fn serve_blocking(listener: TcpListener, dir: PathBuf) -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()?;

    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::from_std(listener)?;
        let app = Router::new().fallback_service(ServeDir::new(dir));
        axum::serve(listener, app).await
    })
}
