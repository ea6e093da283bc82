//! Core library for the sheet-vlookup command line application.
//!
//! The library performs a VLOOKUP-style left join between a sheet of a
//! "search" workbook and a sheet of a "master" workbook and writes the joined
//! rows to a new workbook. Workbook adapters live under [`io`], the in-memory
//! table representation inside [`model`], the lookup itself in [`join`], and
//! the end-to-end run under [`pipeline`].

pub mod config;
pub mod error;
pub mod io;
pub mod join;
pub mod model;
pub mod pipeline;
pub mod samples;

pub use config::JoinConfig;
pub use error::{Result, ToolError};
