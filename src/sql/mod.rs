//! SQL processing module
//!
//! This module provides:
//! - `parser`: SQL lexer and parser
//! - `types`: SQL data types and runtime values
//! - `schema`: Table and column schema definitions
//! - `plan`: Statement analysis and execution plans
//! - `executor`: Statement execution and explanations
//! - `engine`: Sessions and the top-level entry point

pub mod parser;
pub mod types;
pub mod schema;
pub mod plan;
pub mod executor;
pub mod engine;
