//! Positional encoding of the contract call surface.
//!
//! Contract methods take and return positional values: parameters are JSON
//! arrays in declaration order, `getBatchInfo` returns a 9-tuple and
//! `getTraceabilityRecords` returns seven parallel columns. This module is
//! the only place that knows those positions; everything above it works with
//! the named types in [`crate::contract`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use mtl_types::{Address, BatchId, BatchInput, BlockTime, RecordInput, Stage, TraceabilityRecord};

use crate::contract::{methods, BatchInfo, BatchStatus, Query, Transaction};
use crate::error::{ChainError, ChainResult};

type CreateParams = (BatchId, String, String, String, String, String, bool);
type AddRecordParams = (BatchId, String, String, String, String, String);
type VerifyParams = (BatchId, bool);
type BatchIdParam = (BatchId,);

/// `[batchId, farmerId, milletType, variety, harvestDate, qualityGrade, organicCertified, owner, exists]`
#[derive(Serialize, Deserialize)]
struct BatchInfoTuple(String, String, String, String, String, String, bool, Address, bool);

/// `[verified, recordCount]`
#[derive(Serialize, Deserialize)]
struct BatchStatusTuple(bool, u64);

/// `[stages, locations, timestamps, operators, notes, certificateHashes, verifiedFlags]`
#[derive(Serialize, Deserialize)]
struct RecordColumns(
    Vec<String>,
    Vec<String>,
    Vec<u64>,
    Vec<String>,
    Vec<String>,
    Vec<String>,
    Vec<bool>,
);

fn to_value<T: Serialize>(value: &T) -> ChainResult<Value> {
    serde_json::to_value(value).map_err(|e| ChainError::Decode(format!("encode: {e}")))
}

fn to_params<T: Serialize>(value: &T) -> ChainResult<Vec<Value>> {
    match to_value(value)? {
        Value::Array(items) => Ok(items),
        other => Err(ChainError::Decode(format!("expected positional params, got {other}"))),
    }
}

fn from_params<T: DeserializeOwned>(method: &str, params: Vec<Value>) -> ChainResult<T> {
    serde_json::from_value(Value::Array(params))
        .map_err(|e| ChainError::BadRequest(format!("{method}: {e}")))
}

fn from_result<T: DeserializeOwned>(method: &str, value: Value) -> ChainResult<T> {
    serde_json::from_value(value).map_err(|e| ChainError::Decode(format!("{method}: {e}")))
}

/// Encode the positional parameters of a transaction.
pub fn encode_transaction(tx: &Transaction) -> ChainResult<Vec<Value>> {
    match tx {
        Transaction::CreateMilletBatch(input) => to_params::<CreateParams>(&(
            input.batch_id.clone(),
            input.farmer_id.clone(),
            input.millet_type.clone(),
            input.variety.clone(),
            input.harvest_date.clone(),
            input.quality_grade.clone(),
            input.organic_certified,
        )),
        Transaction::AddTraceabilityRecord { batch_id, record } => to_params::<AddRecordParams>(&(
            batch_id.clone(),
            record.stage.as_str().to_string(),
            record.location.clone(),
            record.operator.clone(),
            record.notes.clone(),
            record.certificate_hash.clone(),
        )),
        Transaction::VerifyBatch { batch_id, verified } => {
            to_params::<VerifyParams>(&(batch_id.clone(), *verified))
        }
    }
}

/// Decode a transaction from its method name and positional parameters.
pub fn decode_transaction(method: &str, params: Vec<Value>) -> ChainResult<Transaction> {
    match method {
        methods::CREATE_MILLET_BATCH => {
            let (batch_id, farmer_id, millet_type, variety, harvest_date, quality_grade, organic_certified): CreateParams =
                from_params(method, params)?;
            Ok(Transaction::CreateMilletBatch(BatchInput {
                batch_id,
                farmer_id,
                millet_type,
                variety,
                harvest_date,
                quality_grade,
                organic_certified,
            }))
        }
        methods::ADD_TRACEABILITY_RECORD => {
            let (batch_id, stage, location, operator, notes, certificate_hash): AddRecordParams =
                from_params(method, params)?;
            Ok(Transaction::AddTraceabilityRecord {
                batch_id,
                record: RecordInput {
                    stage: Stage::parse(&stage),
                    location,
                    operator,
                    notes,
                    certificate_hash,
                },
            })
        }
        methods::VERIFY_BATCH => {
            let (batch_id, verified): VerifyParams = from_params(method, params)?;
            Ok(Transaction::VerifyBatch { batch_id, verified })
        }
        other => Err(ChainError::BadRequest(format!("unknown transaction method: {other}"))),
    }
}

/// Encode the positional parameters of a query.
pub fn encode_query(query: &Query) -> ChainResult<Vec<Value>> {
    match query {
        Query::GetBatchInfo(id) | Query::GetBatchStatus(id) | Query::GetTraceabilityRecords(id) => {
            to_params::<BatchIdParam>(&(id.clone(),))
        }
        Query::GetTotalBatches => Ok(Vec::new()),
    }
}

/// Decode a query from its method name and positional parameters.
pub fn decode_query(method: &str, params: Vec<Value>) -> ChainResult<Query> {
    match method {
        methods::GET_BATCH_INFO => {
            let (id,): BatchIdParam = from_params(method, params)?;
            Ok(Query::GetBatchInfo(id))
        }
        methods::GET_BATCH_STATUS => {
            let (id,): BatchIdParam = from_params(method, params)?;
            Ok(Query::GetBatchStatus(id))
        }
        methods::GET_TRACEABILITY_RECORDS => {
            let (id,): BatchIdParam = from_params(method, params)?;
            Ok(Query::GetTraceabilityRecords(id))
        }
        methods::GET_TOTAL_BATCHES => {
            if !params.is_empty() {
                return Err(ChainError::BadRequest(format!(
                    "{method}: expected no parameters, got {}",
                    params.len()
                )));
            }
            Ok(Query::GetTotalBatches)
        }
        other => Err(ChainError::BadRequest(format!("unknown query method: {other}"))),
    }
}

pub fn encode_batch_info(info: &BatchInfo) -> ChainResult<Value> {
    to_value(&BatchInfoTuple(
        info.batch_id.clone(),
        info.farmer_id.clone(),
        info.millet_type.clone(),
        info.variety.clone(),
        info.harvest_date.clone(),
        info.quality_grade.clone(),
        info.organic_certified,
        info.owner,
        info.exists,
    ))
}

pub fn decode_batch_info(value: Value) -> ChainResult<BatchInfo> {
    let BatchInfoTuple(
        batch_id,
        farmer_id,
        millet_type,
        variety,
        harvest_date,
        quality_grade,
        organic_certified,
        owner,
        exists,
    ) = from_result(methods::GET_BATCH_INFO, value)?;
    Ok(BatchInfo {
        batch_id,
        farmer_id,
        millet_type,
        variety,
        harvest_date,
        quality_grade,
        organic_certified,
        owner,
        exists,
    })
}

pub fn encode_batch_status(status: &BatchStatus) -> ChainResult<Value> {
    to_value(&BatchStatusTuple(status.verified, status.record_count))
}

pub fn decode_batch_status(value: Value) -> ChainResult<BatchStatus> {
    let BatchStatusTuple(verified, record_count) = from_result(methods::GET_BATCH_STATUS, value)?;
    Ok(BatchStatus {
        verified,
        record_count,
    })
}

pub fn encode_records(records: &[TraceabilityRecord]) -> ChainResult<Value> {
    let mut columns = RecordColumns(
        Vec::with_capacity(records.len()),
        Vec::with_capacity(records.len()),
        Vec::with_capacity(records.len()),
        Vec::with_capacity(records.len()),
        Vec::with_capacity(records.len()),
        Vec::with_capacity(records.len()),
        Vec::with_capacity(records.len()),
    );
    for record in records {
        columns.0.push(record.stage.as_str().to_string());
        columns.1.push(record.location.clone());
        columns.2.push(record.timestamp.as_secs());
        columns.3.push(record.operator.clone());
        columns.4.push(record.notes.clone());
        columns.5.push(record.certificate_hash.clone());
        columns.6.push(record.verified);
    }
    to_value(&columns)
}

/// Decode the seven parallel record columns. Columns of unequal length are
/// rejected rather than truncated.
pub fn decode_records(value: Value) -> ChainResult<Vec<TraceabilityRecord>> {
    let RecordColumns(stages, locations, timestamps, operators, notes, hashes, verified) =
        from_result(methods::GET_TRACEABILITY_RECORDS, value)?;

    let len = stages.len();
    let lengths = [
        locations.len(),
        timestamps.len(),
        operators.len(),
        notes.len(),
        hashes.len(),
        verified.len(),
    ];
    if lengths.iter().any(|l| *l != len) {
        return Err(ChainError::Decode(format!(
            "{}: record columns have unequal lengths: {len} stages vs {lengths:?}",
            methods::GET_TRACEABILITY_RECORDS
        )));
    }

    let records = stages
        .into_iter()
        .zip(locations)
        .zip(timestamps)
        .zip(operators)
        .zip(notes)
        .zip(hashes)
        .zip(verified)
        .map(
            |((((((stage, location), timestamp), operator), notes), certificate_hash), verified)| {
                TraceabilityRecord {
                    stage: Stage::parse(&stage),
                    location,
                    timestamp: BlockTime::from_secs(timestamp),
                    operator,
                    notes,
                    certificate_hash,
                    verified,
                }
            },
        )
        .collect();
    Ok(records)
}

pub fn encode_total(total: u64) -> ChainResult<Value> {
    to_value(&total)
}

pub fn decode_total(value: Value) -> ChainResult<u64> {
    from_result(methods::GET_TOTAL_BATCHES, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(s: &str) -> BatchId {
        BatchId::new(s).unwrap()
    }

    #[test]
    fn create_params_follow_declaration_order() {
        let tx = Transaction::CreateMilletBatch(BatchInput {
            batch_id: id("B1"),
            farmer_id: "F1".into(),
            millet_type: "Pearl Millet".into(),
            variety: "HHB67".into(),
            harvest_date: "2024-03-01".into(),
            quality_grade: "A".into(),
            organic_certified: true,
        });
        let params = encode_transaction(&tx).unwrap();
        assert_eq!(
            Value::Array(params.clone()),
            json!(["B1", "F1", "Pearl Millet", "HHB67", "2024-03-01", "A", true])
        );
        assert_eq!(decode_transaction("createMilletBatch", params).unwrap(), tx);
    }

    #[test]
    fn record_params_keep_unknown_stage_verbatim() {
        let tx = Transaction::AddTraceabilityRecord {
            batch_id: id("B1"),
            record: RecordInput::new(Stage::parse("milling"), "Jaipur", "Op3").with_notes("stone mill"),
        };
        let params = encode_transaction(&tx).unwrap();
        assert_eq!(params[1], json!("milling"));
        assert_eq!(decode_transaction("addTraceabilityRecord", params).unwrap(), tx);
    }

    #[test]
    fn unknown_method_is_bad_request() {
        let err = decode_transaction("selfDestruct", vec![]).unwrap_err();
        assert!(matches!(err, ChainError::BadRequest(_)));
        let err = decode_query("getEverything", vec![]).unwrap_err();
        assert!(matches!(err, ChainError::BadRequest(_)));
    }

    #[test]
    fn wrong_arity_is_bad_request() {
        let err = decode_transaction("verifyBatch", vec![json!("B1")]).unwrap_err();
        assert!(matches!(err, ChainError::BadRequest(_)));
        let err = decode_query("getTotalBatches", vec![json!(1)]).unwrap_err();
        assert!(matches!(err, ChainError::BadRequest(_)));
    }

    #[test]
    fn empty_batch_id_param_is_bad_request() {
        let err = decode_query("getBatchInfo", vec![json!("")]).unwrap_err();
        assert!(matches!(err, ChainError::BadRequest(_)));
    }

    #[test]
    fn batch_info_is_a_nine_tuple() {
        let owner = Address::derive("owner");
        let info = BatchInfo {
            batch_id: "B1".into(),
            farmer_id: "F1".into(),
            millet_type: "Pearl Millet".into(),
            variety: "HHB67".into(),
            harvest_date: "2024-03-01".into(),
            quality_grade: "A".into(),
            organic_certified: true,
            owner,
            exists: true,
        };
        let value = encode_batch_info(&info).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 9);
        assert_eq!(items[7], json!(owner.to_hex()));
        assert_eq!(items[8], json!(true));
        assert_eq!(decode_batch_info(value).unwrap(), info);
    }

    #[test]
    fn records_decode_into_named_records() {
        let value = json!([
            ["planting", "harvesting"],
            ["Bihar", "Bihar"],
            [100, 200],
            ["Op1", "Op2"],
            ["", "dry season"],
            ["0x01", "0x02"],
            [false, true]
        ]);
        let records = decode_records(value).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].stage, Stage::Planting);
        assert_eq!(records[1].timestamp, BlockTime::from_secs(200));
        assert_eq!(records[1].notes, "dry season");
        assert!(records[1].verified);
    }

    #[test]
    fn records_with_unequal_columns_fail() {
        let value = json!([
            ["planting", "harvesting"],
            ["Bihar"],
            [100, 200],
            ["Op1", "Op2"],
            ["", ""],
            ["0x01", "0x02"],
            [false, false]
        ]);
        assert!(matches!(decode_records(value), Err(ChainError::Decode(_))));
    }

    #[test]
    fn empty_records_roundtrip() {
        let value = encode_records(&[]).unwrap();
        assert_eq!(value, json!([[], [], [], [], [], [], []]));
        assert!(decode_records(value).unwrap().is_empty());
    }

    #[test]
    fn status_and_total() {
        let status = BatchStatus {
            verified: true,
            record_count: 3,
        };
        let value = encode_batch_status(&status).unwrap();
        assert_eq!(value, json!([true, 3]));
        assert_eq!(decode_batch_status(value).unwrap(), status);
        assert_eq!(decode_total(encode_total(12).unwrap()).unwrap(), 12);
        assert!(matches!(decode_total(json!("twelve")), Err(ChainError::Decode(_))));
    }
}
