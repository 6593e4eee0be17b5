//! # CLI Module
//!
//! Command-line access to the schema generator. Every subcommand reads a
//! type graph file (see [`crate::types::file`]) and generates a document for
//! the selected roots.
//!
//! ## Commands
//!
//! ### `generate`
//!
//! ```bash
//! schemaforge generate --types types.yaml --root Order --spec-version 3.0 --format yaml
//! ```
//!
//! Options:
//! - `--types <FILE>` - type graph file (required)
//! - `--root <NAME>` - root type, repeatable; defaults to every declared type
//! - `--config <FILE>` - TOML generator configuration
//! - `--spec-version <V>` - `3.0` or `3.1`
//! - `--max-depth <N>` - recursion depth limit
//! - `--no-examples` - skip example synthesis
//! - `--format json|yaml`, `--output <FILE>`
//!
//! ### `fingerprint`
//!
//! Prints the SHA-256 of the canonical document. Two runs over the same
//! input print the same line.
//!
//! ### `ids`
//!
//! Prints the identifier table, lexically ordered, one `id<TAB>type` per line.
//!
//! Configuration flags override the TOML file; without `--config` the
//! `SCHEMAFORGE_*` environment variables are used.

mod commands;


pub use commands::{execute, run_cli, Cli, Commands, OutputFormat, SourceArgs};
