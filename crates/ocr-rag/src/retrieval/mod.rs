//! Query path: hybrid retrieval, cross-encoder reranking, grounded synthesis

pub mod query_engine;

pub use query_engine::QueryEngine;
