//! # Tessera
//!
//! A hybrid content-search and recommendation engine for membership
//! directories and knowledge bases: dense vector embeddings and a full-text
//! index stored side by side, queried independently, and fused into one
//! ranked result list.
//!
//! ## Features
//!
//! - Content index store keyed by `(content type, content id)`
//! - Approximate cosine nearest-neighbor search (HNSW) with exact-scan
//!   coverage of freshly ingested vectors
//! - Field-weighted BM25 keyword ranking
//! - Weighted-sum fusion with optional score normalization
//! - Item-to-item recommendations
//! - Best-effort query logging with click tracking
//!
//! ## Example
//!
//! ```
//! use tessera::content::{ContentKey, ContentType, LexicalFields};
//! use tessera::engine::{EngineConfig, SearchEngine};
//! use tessera::index::ContentUpdate;
//! use tessera::lexical::searcher::LexicalSearchRequest;
//! use tessera::vector::Vector;
//!
//! # fn main() -> tessera::error::Result<()> {
//! let engine = SearchEngine::new(EngineConfig::new(4));
//!
//! engine.upsert(
//!     ContentUpdate::new(ContentKey::new(ContentType::Faq, "faq-1"))
//!         .vector(Vector::new(vec![0.1, 0.9, 0.0, 0.0]))
//!         .lexical(LexicalFields::with_title("How do I renew my membership?")),
//! )?;
//!
//! let hits = engine.lexical_search("renew membership", &LexicalSearchRequest::new(10))?;
//! assert_eq!(hits.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cli;
pub mod content;
pub mod engine;
pub mod error;
pub mod filter;
pub mod hybrid;
pub mod index;
pub mod lexical;
pub mod maintenance;
pub mod querylog;
pub mod recommend;
pub mod storage;
pub mod vector;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
