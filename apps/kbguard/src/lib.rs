//! kbguard core library.
//!
//! Policy-driven checks for a Markdown knowledge base: filenames, front-matter
//! metadata, directory structure and front-matter enforcement, all driven by
//! a single YAML policy.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `context`: Immutable check context shared by every checker.
//! - `filenames`: Per-file naming, pattern, extension and size checks.
//! - `metadata`: JSON Schema and vocabulary validation of documents.
//! - `structure`: Required paths, per-directory rules and global naming.
//! - `links`: Broken internal link detection.
//! - `enforce`: Front-matter inspection and generation.
//! - `frontmatter`, `naming`, `rules`, `schema`: shared engines.
//! - `models`: Policy schema plus violation and report structs.
//! - `output`: Human/JSON printers.
//! - `utils`: Supporting helpers.
pub mod cli;
pub mod config;
pub mod context;
pub mod enforce;
pub mod error;
pub mod filenames;
pub mod frontmatter;
pub mod links;
pub mod metadata;
pub mod models;
pub mod naming;
pub mod output;
pub mod rules;
pub mod schema;
pub mod structure;
pub mod utils;
