//! Redline - contract document intake and analysis pipeline.
//!
//! Uploaded contracts are fingerprinted for deduplication, converted to
//! text, then driven through three externally-delegated extraction stages
//! (basic info, clause analysis, service info) with durable per-document
//! status, crash recovery for abandoned runs, and an append-only ledger of
//! every processing attempt.

pub mod cli;
pub mod config;
pub mod migrations;
pub mod models;
pub mod repository;
pub mod schema;
pub mod server;
pub mod services;
pub mod storage;
