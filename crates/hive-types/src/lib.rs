//! Shared foundation for the hive runtime crates.
//!
//! # Layering
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  hive-cli      : binary, script execution                     │
//! ├───────────────────────────────────────────────────────────────┤
//! │  hive-lua      : execution contexts, user-facing Lua modules  │
//! ├───────────────────────────────────────────────────────────────┤
//! │  hive-runtime  : pool, ready queue, channel, process, instance│
//! ├───────────────────────────────────────────────────────────────┤
//! │  hive-types    : ErrorCode contract              ◄── HERE     │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! This crate intentionally has no dependencies. It carries the one
//! contract every other crate needs: the [`ErrorCode`] interface that
//! gives each error a stable machine-readable code.

mod error;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
