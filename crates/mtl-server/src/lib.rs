//! HTTP node for the Millet Trace Ledger.
//!
//! Hosts the MilletTrace contract on an in-memory chain and serves the
//! JSON call/send protocol that `mtl_chain::HttpChain` speaks.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ApiError, ServerError, ServerResult};
pub use handler::AppState;
pub use server::NodeServer;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    use mtl_chain::methods;
    use mtl_types::Address;

    fn node() -> NodeServer {
        NodeServer::new(ServerConfig::default()).unwrap()
    }

    async fn request(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn create_params(id: &str) -> Value {
        json!([id, "F1", "Pearl Millet", "HHB67", "2024-03-01", "A", true])
    }

    async fn send(node: &NodeServer, from: Address, method: &str, params: Value) -> (StatusCode, Value) {
        let contract = node.chain().contract_address();
        request(
            node.router(),
            "POST",
            &format!("/v1/contracts/{contract}/send"),
            Some(json!({"from": from, "method": method, "params": params})),
        )
        .await
    }

    async fn call(node: &NodeServer, method: &str, params: Value) -> (StatusCode, Value) {
        let contract = node.chain().contract_address();
        request(
            node.router(),
            "POST",
            &format!("/v1/contracts/{contract}/call"),
            Some(json!({"method": method, "params": params})),
        )
        .await
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (status, body) = request(node().router(), "GET", "/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["protocol_version"], 1);
    }

    #[tokio::test]
    async fn accounts_endpoint() {
        let node = node();
        let (status, body) = request(node.router(), "GET", "/v1/accounts", None).await;
        assert_eq!(status, StatusCode::OK);
        let accounts = body["result"].as_array().unwrap();
        assert_eq!(accounts.len(), 10);
        assert_eq!(accounts[0], json!(node.chain().admin()));
    }

    #[tokio::test]
    async fn contract_endpoint() {
        let node = node();
        let contract = node.chain().contract_address();
        let (_, body) = request(node.router(), "GET", &format!("/v1/contracts/{contract}"), None).await;
        assert_eq!(body["result"]["deployed"], true);
        assert_eq!(body["result"]["name"], "MilletTrace");

        let other = Address::derive("elsewhere");
        let (_, body) = request(node.router(), "GET", &format!("/v1/contracts/{other}"), None).await;
        assert_eq!(body["result"]["deployed"], false);
    }

    #[tokio::test]
    async fn create_then_read_positional() {
        let node = node();
        let owner = node.chain().account(1).unwrap();
        let (status, body) = send(&node, owner, methods::CREATE_MILLET_BATCH, create_params("B1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["blockNumber"], 1);
        assert!(body["result"]["transactionHash"].as_str().unwrap().starts_with("0x"));

        let (status, body) = call(&node, methods::GET_BATCH_INFO, json!(["B1"])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["result"],
            json!(["B1", "F1", "Pearl Millet", "HHB67", "2024-03-01", "A", true, owner, true])
        );

        let (_, body) = call(&node, methods::GET_TOTAL_BATCHES, json!([])).await;
        assert_eq!(body["result"], 1);
    }

    #[tokio::test]
    async fn records_are_parallel_columns() {
        let node = node();
        let admin = node.chain().admin();
        send(&node, admin, methods::CREATE_MILLET_BATCH, create_params("B1")).await;
        send(
            &node,
            admin,
            methods::ADD_TRACEABILITY_RECORD,
            json!(["B1", "harvesting", "Bihar", "Op1", "", "H"]),
        )
        .await;

        let (_, body) = call(&node, methods::GET_TRACEABILITY_RECORDS, json!(["B1"])).await;
        let columns = body["result"].as_array().unwrap();
        assert_eq!(columns.len(), 7);
        assert_eq!(columns[0], json!(["harvesting"]));
        assert_eq!(columns[1], json!(["Bihar"]));
        assert_eq!(columns[5], json!(["H"]));
        assert_eq!(columns[6], json!([false]));
    }

    #[tokio::test]
    async fn duplicate_create_is_conflict() {
        let node = node();
        let admin = node.chain().admin();
        send(&node, admin, methods::CREATE_MILLET_BATCH, create_params("B1")).await;
        let (status, body) = send(&node, admin, methods::CREATE_MILLET_BATCH, create_params("B1")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["kind"], "batch_exists");
    }

    #[tokio::test]
    async fn empty_batch_id_reverts() {
        let node = node();
        let (status, body) = send(&node, node.chain().admin(), methods::CREATE_MILLET_BATCH, create_params("")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "empty_batch_id");
    }

    #[tokio::test]
    async fn unauthorized_verify_is_forbidden() {
        let node = node();
        let owner = node.chain().account(1).unwrap();
        let stranger = node.chain().account(2).unwrap();
        send(&node, owner, methods::CREATE_MILLET_BATCH, create_params("B1")).await;
        let (status, body) = send(&node, stranger, methods::VERIFY_BATCH, json!(["B1", true])).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["kind"], "unauthorized");
    }

    #[tokio::test]
    async fn malformed_requests_are_bad_requests() {
        let node = node();
        let (status, body) = call(&node, "getEverything", json!([])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "bad_request");

        let (status, body) = call(&node, methods::GET_BATCH_INFO, json!([1, 2])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "bad_request");

        let contract = node.chain().contract_address();
        let (status, body) = request(
            node.router(),
            "POST",
            &format!("/v1/contracts/{contract}/send"),
            Some(json!({"method": "createMilletBatch"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "bad_request");

        let (status, _) = request(node.router(), "GET", "/v1/contracts/not-hex", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_contract_is_not_found() {
        let node = node();
        let other = Address::derive("elsewhere");
        let (status, body) = request(
            node.router(),
            "POST",
            &format!("/v1/contracts/{other}/call"),
            Some(json!({"method": "getTotalBatches", "params": []})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["kind"], "unknown_contract");
    }

    #[tokio::test]
    async fn mine_endpoint_advances_blocks() {
        let node = node();
        let (status, body) = request(node.router(), "POST", "/v1/dev/mine", Some(json!({"blocks": 3}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["block_number"], 3);
    }

    mod end_to_end {
        use std::net::SocketAddr;

        use tokio::net::TcpListener;

        use super::*;
        use mtl_chain::{ExecutionEnvironment, HttpChain};
        use mtl_ledger::{
            AccountSelector, BatchDraft, BatchId, ClientConfig, LedgerClient, LedgerError,
            RecordInput, Stage,
        };

        async fn spawn_node() -> (SocketAddr, Address) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let node = node();
            let contract = node.chain().contract_address();
            tokio::spawn(node.serve_on(listener));
            (addr, contract)
        }

        fn config(addr: SocketAddr, contract: Address, account: usize) -> ClientConfig {
            ClientConfig {
                endpoint: format!("http://{addr}"),
                account: AccountSelector::Index(account),
                ..ClientConfig::for_contract(contract)
            }
        }

        fn id(s: &str) -> BatchId {
            BatchId::new(s).unwrap()
        }

        #[tokio::test]
        async fn ledger_client_over_http() {
            let (addr, contract) = spawn_node().await;
            let client = LedgerClient::connect(&config(addr, contract, 0)).await.unwrap();
            let before = client.queries().total_batches().await.unwrap();

            let draft = BatchDraft {
                farmer_id: "F1".into(),
                millet_type: "Pearl Millet".into(),
                variety: "HHB67".into(),
                harvest_date: "2024-03-01".into(),
                quality_grade: "A".into(),
                organic_certified: true,
            };
            let input = draft.with_id(id("B1"));
            client.registry().create(input.clone()).await.unwrap();
            client
                .traceability()
                .append(
                    &id("B1"),
                    RecordInput::new(Stage::Harvesting, "Bihar", "Op1").with_certificate_hash("H"),
                )
                .await
                .unwrap();

            let batch = client.registry().get(&id("B1")).await.unwrap();
            assert!(batch.matches_input(&input));
            assert_eq!(batch.owner, client.account());

            let records = client.traceability().list(&id("B1")).await.unwrap();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].stage, Stage::Harvesting);
            assert_eq!(client.queries().total_batches().await.unwrap(), before + 1);

            let err = client.registry().create(input).await.unwrap_err();
            assert!(matches!(err, LedgerError::DuplicateBatch(_)));

            client.verification().verify(&id("B1"), true).await.unwrap();
            assert!(client.queries().batch_summary(&id("B1")).await.unwrap().is_verified());
        }

        #[tokio::test]
        async fn domain_errors_survive_http() {
            let (addr, contract) = spawn_node().await;
            let owner = LedgerClient::connect(&config(addr, contract, 1)).await.unwrap();
            let stranger = LedgerClient::connect(&config(addr, contract, 2)).await.unwrap();

            assert!(matches!(
                owner.registry().get(&id("ghost")).await.unwrap_err(),
                LedgerError::NotFound(_)
            ));
            assert!(matches!(
                owner
                    .traceability()
                    .append(&id("ghost"), RecordInput::new(Stage::Planting, "X", "Op"))
                    .await
                    .unwrap_err(),
                LedgerError::BatchNotFound(_)
            ));

            let draft = BatchDraft {
                farmer_id: "F2".into(),
                millet_type: "Little Millet".into(),
                variety: "OLM 203".into(),
                harvest_date: "2024-11-02".into(),
                quality_grade: "B".into(),
                organic_certified: false,
            };
            owner.registry().create(draft.with_id(id("B2"))).await.unwrap();
            assert!(matches!(
                stranger.verification().verify(&id("B2"), true).await.unwrap_err(),
                LedgerError::Unauthorized { .. }
            ));
        }

        #[tokio::test]
        async fn connect_rejects_unknown_contract() {
            let (addr, _) = spawn_node().await;
            let err = LedgerClient::connect(&config(addr, Address::derive("elsewhere"), 0))
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::Connection(_)));
        }

        #[tokio::test]
        async fn http_chain_health() {
            let (addr, contract) = spawn_node().await;
            let chain = HttpChain::new(format!("http://{addr}"));
            let health = chain.health().await.unwrap();
            assert_eq!(health.status, "ok");
            assert!(chain.is_deployed(&contract).await.unwrap());
            assert_eq!(chain.accounts().await.unwrap().len(), 10);
        }
    }
}
