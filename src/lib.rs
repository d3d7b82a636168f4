//! NexaDB - a small relational SQL engine in Rust
//!
//! This crate provides:
//! - SQL parsing (lexer, parser, AST)
//! - Cost analysis, execution plans and step-by-step explanations
//! - Statement execution over a table-oriented store
//! - Pluggable storage backends (in-memory, one file per table on disk)
//!   with an optional table cache

pub mod config;
pub mod error;
pub mod sql;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use sql::engine::{QueryResult, Session};
