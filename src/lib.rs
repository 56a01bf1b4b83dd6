//! In-memory, hash-linked ledger of document transfer records, with an HTTP
//! facade and a document processor for preparing the content it references.

pub mod config;
pub mod crypto;
pub mod documents;
pub mod error;
pub mod hasher;
pub mod ledger;
pub mod model;
pub mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use documents::DocumentProcessor;
use ledger::Ledger;

/// Shared application state passed to Axum handlers.
///
/// Ledger mutators take the write lock; readers share the read lock.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<RwLock<Ledger>>,
    pub documents: Arc<dyn DocumentProcessor>,
}

impl AppState {
    pub fn new(ledger: Ledger, documents: impl DocumentProcessor + 'static) -> Self {
        AppState {
            ledger: Arc::new(RwLock::new(ledger)),
            documents: Arc::new(documents),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/transactions/new", post(routes::new_transaction))
        .route("/chain", get(routes::full_chain))
        .route("/blocks/new", post(routes::new_block))
        .route("/blocks/last", get(routes::last_block))
        .route("/blocks/:index/records", get(routes::block_records))
        .route("/clear", post(routes::clear))
        .route("/verify", get(routes::verify))
        .route("/documents/key", post(routes::generate_key))
        .route("/documents/hash", post(routes::hash_document))
        .route("/documents/verify-hash", post(routes::verify_hash))
        .route("/documents/sign", post(routes::sign_document))
        .route("/documents/verify-signature", post(routes::verify_signature))
        .route("/documents/encrypt", post(routes::encrypt_document))
        .route("/documents/decrypt", post(routes::decrypt_document))
        .route("/documents/owner", post(routes::set_owner))
        .route("/documents/owner/change", post(routes::change_owner))
        .route("/documents/owner/read", post(routes::read_owner))
        .route("/documents/owner/remove", post(routes::remove_owner))
        .route("/pubkey", get(routes::pubkey))
        .route("/health", get(routes::health))
        .route("/version", get(routes::version))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
