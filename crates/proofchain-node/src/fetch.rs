//! HTTP transport for peer chain fetches.

use async_trait::async_trait;
use proofchain_consensus::{ChainFetcher, PeerAddress, PeerChain, PeerError};
use reqwest::Client;
use std::time::Duration;

/// Fetches a peer's chain with `GET http://{peer}{chain_path}`.
#[derive(Debug, Clone)]
pub struct HttpChainFetcher {
    client: Client,
    timeout: Duration,
    chain_path: String,
}

impl HttpChainFetcher {
    /// Creates a fetcher. `timeout` bounds each whole request.
    pub fn new(timeout: Duration, chain_path: impl Into<String>) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("proofchain-node/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            timeout,
            chain_path: chain_path.into(),
        })
    }

    /// Returns the URL the chain of `peer` is fetched from.
    pub fn chain_url(&self, peer: &PeerAddress) -> String {
        format!("http://{peer}{}", self.chain_path)
    }
}

#[async_trait]
impl ChainFetcher for HttpChainFetcher {
    async fn fetch_chain(&self, peer: &PeerAddress) -> Result<PeerChain, PeerError> {
        let url = self.chain_url(peer);
        let transport_error = |e: reqwest::Error| {
            if e.is_timeout() {
                PeerError::Timeout(self.timeout)
            } else {
                PeerError::Unreachable(e.to_string())
            }
        };

        let response = self.client.get(&url).send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(PeerError::Unreachable(format!("{url} answered {status}")));
        }

        let body = response.bytes().await.map_err(transport_error)?;
        let chain: PeerChain =
            serde_json::from_slice(&body).map_err(|e| PeerError::Malformed(e.to_string()))?;

        tracing::debug!(peer = %peer, length = chain.length, "fetched peer chain");
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Json, Router};
    use proofchain_consensus::{Block, Ledger, ProofOfWork};
    use std::net::SocketAddr;

    async fn spawn_peer(router: Router) -> PeerAddress {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        PeerAddress::parse(&addr.to_string()).unwrap()
    }

    fn sample_chain() -> PeerChain {
        let mut ledger = Ledger::with_genesis(ProofOfWork::new(2), Block::genesis(1700000000.25));
        ledger.mine().unwrap();
        PeerChain::new(ledger.chain().to_vec())
    }

    #[tokio::test]
    async fn test_chain_url() {
        let fetcher = HttpChainFetcher::new(Duration::from_secs(1), "/chain").unwrap();

        let v4 = PeerAddress::parse("10.0.0.5:5000").unwrap();
        assert_eq!(fetcher.chain_url(&v4), "http://10.0.0.5:5000/chain");

        let v6 = PeerAddress::parse("[::1]:5000").unwrap();
        assert_eq!(fetcher.chain_url(&v6), "http://[::1]:5000/chain");
    }

    #[tokio::test]
    async fn test_fetch_chain() {
        let chain = sample_chain();
        let served = chain.clone();
        let peer = spawn_peer(Router::new().route(
            "/chain",
            get(move || {
                let served = served.clone();
                async move { Json(served) }
            }),
        ))
        .await;
        let fetcher = HttpChainFetcher::new(Duration::from_secs(5), "/chain").unwrap();

        let fetched = fetcher.fetch_chain(&peer).await.unwrap();

        assert_eq!(fetched, chain);
        assert_eq!(fetched.chain[1].hash(), chain.chain[1].hash());
    }

    #[tokio::test]
    async fn test_fetch_malformed_body() {
        let peer = spawn_peer(Router::new().route("/chain", get(|| async { "not a chain" }))).await;
        let fetcher = HttpChainFetcher::new(Duration::from_secs(5), "/chain").unwrap();

        let result = fetcher.fetch_chain(&peer).await;

        assert!(matches!(result, Err(PeerError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let peer = spawn_peer(Router::new().route(
            "/chain",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        ))
        .await;
        let fetcher = HttpChainFetcher::new(Duration::from_secs(5), "/chain").unwrap();

        let result = fetcher.fetch_chain(&peer).await;

        assert!(matches!(result, Err(PeerError::Unreachable(_))));
    }

    #[tokio::test]
    async fn test_fetch_slow_peer_times_out() {
        let peer = spawn_peer(Router::new().route(
            "/chain",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "late"
            }),
        ))
        .await;
        let fetcher = HttpChainFetcher::new(Duration::from_millis(100), "/chain").unwrap();

        let result = fetcher.fetch_chain(&peer).await;

        assert_eq!(result, Err(PeerError::Timeout(Duration::from_millis(100))));
    }

    #[tokio::test]
    async fn test_fetch_unreachable() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let peer = PeerAddress::parse(&addr.to_string()).unwrap();
        let fetcher = HttpChainFetcher::new(Duration::from_secs(5), "/chain").unwrap();

        let result = fetcher.fetch_chain(&peer).await;

        assert!(matches!(result, Err(PeerError::Unreachable(_))));
    }
}
