//! HTTP handlers for the ledger and the document processor.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::documents::DocumentKey;
use crate::error::{ApiError, DocumentError};
use crate::model::{Block, Record};
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

/// GET /
pub async fn root() -> Json<Message> {
    Json(Message {
        message: "Welcome to the document ledger".into(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionCreated {
    pub message: String,
    /// Block the record is expected to land in. Advisory.
    pub index: u64,
}

/// POST /transactions/new
pub async fn new_transaction(
    State(state): State<AppState>,
    payload: Result<Json<Record>, JsonRejection>,
) -> Result<Json<TransactionCreated>, ApiError> {
    let Json(record) = payload?;
    let index = state.ledger.write().await.push_record(record)?;
    Ok(Json(TransactionCreated {
        message: format!("Transaction will be added to Block {index}"),
        index,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

/// GET /chain
pub async fn full_chain(State(state): State<AppState>) -> Json<ChainResponse> {
    let ledger = state.ledger.read().await;
    Json(ChainResponse {
        chain: ledger.chain().to_vec(),
        length: ledger.len(),
    })
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SealRequest {
    #[serde(default)]
    pub previous_hash: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BlockForged {
    pub message: String,
    pub block: Block,
}

/// POST /blocks/new — an empty body seals with the computed back-link. Any
/// other body must parse as a `SealRequest` or nothing is sealed.
pub async fn new_block(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<BlockForged>, ApiError> {
    let req: SealRequest = if body.iter().all(u8::is_ascii_whitespace) {
        SealRequest::default()
    } else {
        serde_json::from_slice(&body)?
    };
    let block = state.ledger.write().await.seal_block(req.previous_hash);
    Ok(Json(BlockForged {
        message: "New block forged".into(),
        block,
    }))
}

/// GET /blocks/last
pub async fn last_block(State(state): State<AppState>) -> Json<Block> {
    Json(state.ledger.read().await.last_block().clone())
}

/// GET /blocks/:index/records
pub async fn block_records(
    State(state): State<AppState>,
    Path(index): Path<u64>,
) -> Result<Json<Vec<Record>>, ApiError> {
    let ledger = state.ledger.read().await;
    Ok(Json(ledger.fetch_records(index)?.to_vec()))
}

/// POST /clear
pub async fn clear(State(state): State<AppState>) -> Json<Message> {
    state.ledger.write().await.reset();
    Json(Message {
        message: "Blockchain cleared".into(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub message: String,
    pub verified: bool,
}

/// GET /verify
pub async fn verify(State(state): State<AppState>) -> Json<VerifyResponse> {
    let verified = state.ledger.read().await.verify();
    Json(VerifyResponse {
        message: "Blockchain verified".into(),
        verified,
    })
}

// Document processor. Binary payloads travel as hex strings.

fn decode(data: &str) -> Result<Vec<u8>, DocumentError> {
    hex::decode(data.trim()).map_err(|e| DocumentError::InvalidHex(e.to_string()))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DataRequest {
    pub data: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse {
    pub data: String,
}

impl DataResponse {
    fn from_bytes(bytes: Vec<u8>) -> Json<Self> {
        Json(DataResponse {
            data: hex::encode(bytes),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KeyResponse {
    pub key: String,
}

/// POST /documents/key
pub async fn generate_key(State(state): State<AppState>) -> Json<KeyResponse> {
    Json(KeyResponse {
        key: state.documents.generate_key().to_hex(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HashResponse {
    pub hash: String,
}

/// POST /documents/hash
pub async fn hash_document(
    State(state): State<AppState>,
    Json(req): Json<DataRequest>,
) -> Result<Json<HashResponse>, ApiError> {
    let data = decode(&req.data)?;
    Ok(Json(HashResponse {
        hash: state.documents.hash(&data),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyHashRequest {
    pub data: String,
    pub hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidResponse {
    pub valid: bool,
}

/// POST /documents/verify-hash
pub async fn verify_hash(
    State(state): State<AppState>,
    Json(req): Json<VerifyHashRequest>,
) -> Result<Json<ValidResponse>, ApiError> {
    let data = decode(&req.data)?;
    Ok(Json(ValidResponse {
        valid: state.documents.verify_hash(&data, &req.hash),
    }))
}

/// POST /documents/sign
pub async fn sign_document(
    State(state): State<AppState>,
    Json(req): Json<DataRequest>,
) -> Result<Json<DataResponse>, ApiError> {
    let data = decode(&req.data)?;
    Ok(DataResponse::from_bytes(state.documents.sign(&data)))
}

/// POST /documents/verify-signature
pub async fn verify_signature(
    State(state): State<AppState>,
    Json(req): Json<DataRequest>,
) -> Result<Json<ValidResponse>, ApiError> {
    let data = decode(&req.data)?;
    Ok(Json(ValidResponse {
        valid: state.documents.verify_signature(&data),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KeyedDataRequest {
    pub data: String,
    pub key: String,
}

/// POST /documents/encrypt
pub async fn encrypt_document(
    State(state): State<AppState>,
    Json(req): Json<KeyedDataRequest>,
) -> Result<Json<DataResponse>, ApiError> {
    let data = decode(&req.data)?;
    let key = DocumentKey::from_hex(&req.key)?;
    Ok(DataResponse::from_bytes(state.documents.encrypt(&data, &key)?))
}

/// POST /documents/decrypt
pub async fn decrypt_document(
    State(state): State<AppState>,
    Json(req): Json<KeyedDataRequest>,
) -> Result<Json<DataResponse>, ApiError> {
    let data = decode(&req.data)?;
    let key = DocumentKey::from_hex(&req.key)?;
    Ok(DataResponse::from_bytes(state.documents.decrypt(&data, &key)?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OwnerRequest {
    pub data: String,
    pub owner: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OwnerResponse {
    pub owner: String,
}

/// POST /documents/owner
pub async fn set_owner(
    State(state): State<AppState>,
    Json(req): Json<OwnerRequest>,
) -> Result<Json<DataResponse>, ApiError> {
    let data = decode(&req.data)?;
    Ok(DataResponse::from_bytes(
        state.documents.set_owner(&data, &req.owner)?,
    ))
}

/// POST /documents/owner/change
pub async fn change_owner(
    State(state): State<AppState>,
    Json(req): Json<OwnerRequest>,
) -> Result<Json<DataResponse>, ApiError> {
    let data = decode(&req.data)?;
    Ok(DataResponse::from_bytes(
        state.documents.change_owner(&data, &req.owner)?,
    ))
}

/// POST /documents/owner/read
pub async fn read_owner(
    State(state): State<AppState>,
    Json(req): Json<DataRequest>,
) -> Result<Json<OwnerResponse>, ApiError> {
    let data = decode(&req.data)?;
    Ok(Json(OwnerResponse {
        owner: state.documents.read_owner(&data)?,
    }))
}

/// POST /documents/owner/remove
pub async fn remove_owner(
    State(state): State<AppState>,
    Json(req): Json<DataRequest>,
) -> Result<Json<DataResponse>, ApiError> {
    let data = decode(&req.data)?;
    Ok(DataResponse::from_bytes(state.documents.remove_owner(&data)?))
}

/// GET /pubkey — hex verifying key of the document signer
#[derive(Debug, Serialize, Deserialize)]
pub struct PubKeyResp {
    pub pubkey_hex: String,
}
pub async fn pubkey(State(state): State<AppState>) -> Json<PubKeyResp> {
    Json(PubKeyResp {
        pubkey_hex: state.documents.public_key_hex(),
    })
}

/// GET /health
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
}
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// GET /version
#[derive(Serialize)]
pub struct Version {
    pub version: &'static str,
    pub git_sha: Option<&'static str>,
}
pub async fn version() -> Json<Version> {
    Json(Version {
        version: env!("CARGO_PKG_VERSION"),
        git_sha: option_env!("GIT_SHA"),
    })
}
