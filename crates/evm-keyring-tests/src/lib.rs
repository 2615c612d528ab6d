//! Integration test suite for evm-keyring.
//!
//! Tests under `tests/` drive the public API only: full controller
//! lifecycles, signing across every preset chain, and hostile inputs.

pub mod helpers;
