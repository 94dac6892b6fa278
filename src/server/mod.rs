mod search;
mod state;

pub use search::make_search_routes;
pub use state::ServerState;

use anyhow::Result;
use tracing::info;

/// Bind and serve the search API.
pub async fn run_server(state: ServerState, port: u16) -> Result<()> {
    let app = make_search_routes(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
