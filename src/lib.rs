//! # Tripitaka Ingest
//!
//! Structural ingestion of TEI-encoded canonical texts into SQLite.
//!
//! Each document is decoded from UTF-16 (either byte order), parsed into an
//! order-preserving tree, classified into sections, pages and text blocks,
//! and written inside a single per-document transaction that replaces any
//! earlier version of the same file.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────┐   ┌──────────┐   ┌────────┐   ┌──────────┐   ┌──────────┐
//! │ decode │──▶│  tree    │──▶│ walker │──▶│  store   │──▶│  SQLite  │
//! │ UTF-16 │   │ quick-xml│   │ classify│  │ 1 tx/doc │   │          │
//! └────────┘   └──────────┘   └────────┘   └──────────┘   └──────────┘
//!      │                          │
//!      ▼                          ▼
//!  ┌────────┐               ┌──────────┐
//!  │ header │               │ normalize│
//!  └────────┘               └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! tpk init                      # create database
//! tpk ingest                    # ingest the configured corpus
//! tpk ingest T01/T01n0001.xml   # ingest specific files
//! tpk outline T01/T01n0001.xml  # print a stored section tree
//! tpk stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`corpus`] | Corpus file enumeration |
//! | [`decode`] | UTF-16 byte-order resolution |
//! | [`header`] | `teiHeader` extraction |
//! | [`tree`] | Order-preserving markup tree |
//! | [`walker`] | Section / page / block classification |
//! | [`titles`] | Localized title lookup |
//! | [`normalize`] | Display normalization of block text |
//! | [`store`] | Per-document replace transaction |
//! | [`ingest`] | Batch pipeline and error policy |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod config;
pub mod corpus;
pub mod db;
pub mod decode;
pub mod error;
pub mod header;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod outline;
pub mod progress;
pub mod stats;
pub mod store;
pub mod titles;
pub mod tree;
pub mod walker;
