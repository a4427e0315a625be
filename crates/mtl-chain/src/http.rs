use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use mtl_types::{AccountId, Address, BatchId, TraceabilityRecord, TxReceipt};

use crate::abi;
use crate::contract::{BatchInfo, BatchStatus, Query, Transaction};
use crate::error::{ChainError, ChainResult};
use crate::protocol::{endpoints, CallRequest, ContractInfo, HealthResponse, RpcResponse, SendRequest};
use crate::traits::ExecutionEnvironment;

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// [`ExecutionEnvironment`] backed by a remote node over HTTP.
#[derive(Clone, Debug)]
pub struct HttpChain {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpChain {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_timeout(endpoint, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: endpoint.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> ChainResult<HealthResponse> {
        let resp = self
            .http
            .get(self.url(endpoints::HEALTH))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ChainError::Transport(format!("health check returned {status}")));
        }
        resp.json()
            .await
            .map_err(|e| ChainError::Decode(format!("health response: {e}")))
    }

    pub async fn contract_info(&self, contract: &Address) -> ChainResult<ContractInfo> {
        let resp = self
            .http
            .get(self.url(&endpoints::contract(contract)))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        Self::parse(resp, contract).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn transport_error(&self, err: reqwest::Error) -> ChainError {
        if err.is_timeout() {
            ChainError::Timeout(self.timeout)
        } else {
            ChainError::Transport(err.to_string())
        }
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        contract: &Address,
    ) -> ChainResult<R> {
        let resp = self
            .http
            .post(self.url(path))
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        Self::parse(resp, contract).await
    }

    /// Unwrap the response envelope, mapping wire errors back to [`ChainError`].
    async fn parse<R: DeserializeOwned>(resp: reqwest::Response, contract: &Address) -> ChainResult<R> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ChainError::Transport(format!("reading response body: {e}")))?;
        trace!(%status, %body, "node response");

        match serde_json::from_str::<RpcResponse<R>>(&body) {
            Ok(envelope) => envelope
                .into_result()
                .map_err(|err| err.into_chain_error(contract)),
            Err(_) if !status.is_success() => {
                Err(ChainError::Transport(format!("node returned {status}: {body}")))
            }
            Err(e) => Err(ChainError::Decode(format!("response body: {e}"))),
        }
    }

    async fn call(&self, contract: &Address, query: Query) -> ChainResult<Value> {
        let request = CallRequest {
            method: query.method().to_string(),
            params: abi::encode_query(&query)?,
        };
        debug!(method = %request.method, contract = %contract.short(), "contract call");
        self.post(&endpoints::call(contract), &request, contract).await
    }
}

#[async_trait]
impl ExecutionEnvironment for HttpChain {
    async fn accounts(&self) -> ChainResult<Vec<AccountId>> {
        let resp = self
            .http
            .get(self.url(endpoints::ACCOUNTS))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        Self::parse(resp, &Address::ZERO).await
    }

    async fn is_deployed(&self, contract: &Address) -> ChainResult<bool> {
        match self.contract_info(contract).await {
            Ok(info) => Ok(info.deployed),
            Err(ChainError::UnknownContract(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn send(
        &self,
        contract: &Address,
        from: &AccountId,
        tx: &Transaction,
    ) -> ChainResult<TxReceipt> {
        let request = SendRequest {
            from: *from,
            method: tx.method().to_string(),
            params: abi::encode_transaction(tx)?,
        };
        debug!(method = %request.method, batch_id = %tx.batch_id(), from = %from.short(), "submitting transaction");
        self.post(&endpoints::send(contract), &request, contract).await
    }

    async fn batch_info(&self, contract: &Address, batch_id: &BatchId) -> ChainResult<BatchInfo> {
        let value = self
            .call(contract, Query::GetBatchInfo(batch_id.clone()))
            .await?;
        abi::decode_batch_info(value)
    }

    async fn batch_status(
        &self,
        contract: &Address,
        batch_id: &BatchId,
    ) -> ChainResult<BatchStatus> {
        let value = self
            .call(contract, Query::GetBatchStatus(batch_id.clone()))
            .await?;
        abi::decode_batch_status(value)
    }

    async fn traceability_records(
        &self,
        contract: &Address,
        batch_id: &BatchId,
    ) -> ChainResult<Vec<TraceabilityRecord>> {
        let value = self
            .call(contract, Query::GetTraceabilityRecords(batch_id.clone()))
            .await?;
        abi::decode_records(value)
    }

    async fn total_batches(&self, contract: &Address) -> ChainResult<u64> {
        let value = self.call(contract, Query::GetTotalBatches).await?;
        abi::decode_total(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash() {
        let chain = HttpChain::new("http://127.0.0.1:7545/");
        assert_eq!(chain.endpoint(), "http://127.0.0.1:7545");
        assert_eq!(chain.url(endpoints::HEALTH), "http://127.0.0.1:7545/v1/health");
    }

    #[tokio::test]
    async fn unreachable_node_is_a_transport_error() {
        // Port 9 (discard) is closed on test hosts.
        let chain = HttpChain::with_timeout("http://127.0.0.1:9", Duration::from_secs(2));
        let err = chain.accounts().await.unwrap_err();
        assert!(err.is_ambiguous(), "unexpected error: {err:?}");
    }
}
