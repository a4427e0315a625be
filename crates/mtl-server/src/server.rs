use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use mtl_chain::InMemoryChain;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// Development node hosting the MilletTrace contract on an in-memory chain.
pub struct NodeServer {
    config: ServerConfig,
    chain: Arc<InMemoryChain>,
}

impl NodeServer {
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let chain = Arc::new(InMemoryChain::new(config.chain_config()));
        Ok(Self { config, chain })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn chain(&self) -> &Arc<InMemoryChain> {
        &self.chain
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(AppState::new(self.chain.clone()))
    }

    /// Bind `config.bind_addr` and serve until the process exits.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_on(self, listener: TcpListener) -> ServerResult<()> {
        let local: SocketAddr = listener.local_addr()?;
        tracing::info!(
            addr = %local,
            contract = %self.chain.contract_address(),
            admin = %self.chain.admin(),
            "MTL node listening"
        );
        axum::serve(listener, self.router())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
