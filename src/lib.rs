//! atomic-caldera - Atomic Red Team to Caldera ability converter
//!
//! This library walks an Atomic Red Team `atomics` tree and writes every
//! supported test as a Caldera stockpile ability:
//! - Tactics are resolved against a local MITRE CTI checkout
//! - Converted tests are catalogued in a CSV ledger and never emitted twice
//! - Input argument defaults are catalogued in a second CSV ledger
//!
//! The binary is a thin shell over [`convert::run`]; see [`preflight`] for the
//! checks it performs before touching any data.

#![forbid(unsafe_code)]
#![cfg_attr(
    test,
    allow(
        clippy::uninlined_format_args,
        clippy::missing_const_for_fn,
        clippy::match_same_arms
    )
)]
#![allow(
    clippy::must_use_candidate,
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod ability;
pub mod atomic;
pub mod cli;
pub mod config;
pub mod convert;
pub mod emit;
pub mod error;
pub mod error_hints;
pub mod escape;
pub mod executor;
pub mod ledger;
pub mod preflight;
pub mod prompt;
pub mod taxonomy;

pub use error::{Error, Result};
