use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Json;
use serde_json::Value;
use tracing::debug;

use mtl_chain::protocol::{
    CallRequest, ContractInfo, HealthResponse, MineRequest, MineResponse, SendRequest,
};
use mtl_chain::{
    abi, methods, ChainError, ExecutionEnvironment, InMemoryChain, Query, RevertReason,
    RpcResponse, CONTRACT_NAME,
};
use mtl_types::{AccountId, Address, TxReceipt};

use crate::error::{ApiError, ApiResult};

/// Shared state of every handler.
#[derive(Clone)]
pub struct AppState {
    pub chain: Arc<InMemoryChain>,
}

impl AppState {
    pub fn new(chain: Arc<InMemoryChain>) -> Self {
        Self { chain }
    }
}

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::bad_request(format!("address {raw:?}: {e}")))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

fn ok<T>(value: T) -> ApiResult<T> {
    Ok(Json(RpcResponse::Result(value)))
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(state.chain.block_number()))
}

pub async fn accounts_handler(State(state): State<AppState>) -> ApiResult<Vec<AccountId>> {
    ok(state.chain.accounts().await?)
}

pub async fn contract_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<ContractInfo> {
    let address = parse_address(&address)?;
    let deployed = state.chain.is_deployed(&address).await?;
    ok(ContractInfo {
        address,
        name: if deployed { CONTRACT_NAME.into() } else { String::new() },
        deployed,
    })
}

/// Read-only contract call. Results are positional values.
pub async fn call_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
    payload: Result<Json<CallRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let contract = parse_address(&address)?;
    let request = body(payload)?;
    let query = abi::decode_query(&request.method, request.params)?;
    debug!(method = query.method(), contract = %contract.short(), "call");

    let chain = &state.chain;
    let result = match query {
        Query::GetBatchInfo(id) => abi::encode_batch_info(&chain.batch_info(&contract, &id).await?)?,
        Query::GetBatchStatus(id) => {
            abi::encode_batch_status(&chain.batch_status(&contract, &id).await?)?
        }
        Query::GetTraceabilityRecords(id) => {
            abi::encode_records(&chain.traceability_records(&contract, &id).await?)?
        }
        Query::GetTotalBatches => abi::encode_total(chain.total_batches(&contract).await?)?,
    };
    ok(result)
}

/// Transaction submission. Answers once the transaction is mined or reverted.
pub async fn send_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> ApiResult<TxReceipt> {
    let contract = parse_address(&address)?;
    let request = body(payload)?;
    reject_empty_batch_id(&request)?;
    let tx = abi::decode_transaction(&request.method, request.params)?;
    ok(state.chain.send(&contract, &request.from, &tx).await?)
}

/// Dev-node only: advance the chain by empty blocks.
pub async fn mine_handler(
    State(state): State<AppState>,
    payload: Result<Json<MineRequest>, JsonRejection>,
) -> ApiResult<MineResponse> {
    let request = body(payload)?;
    let block_number = state.chain.mine_empty_blocks(request.blocks);
    ok(MineResponse { block_number })
}

/// Every transaction method takes the batch id first; an empty one reverts.
fn reject_empty_batch_id(request: &SendRequest) -> Result<(), ApiError> {
    let is_transaction = matches!(
        request.method.as_str(),
        methods::CREATE_MILLET_BATCH | methods::ADD_TRACEABILITY_RECORD | methods::VERIFY_BATCH
    );
    let empty = matches!(request.params.first(), Some(Value::String(s)) if s.trim().is_empty());
    if is_transaction && empty {
        return Err(ChainError::revert(RevertReason::EmptyBatchId, request.method.clone()).into());
    }
    Ok(())
}
