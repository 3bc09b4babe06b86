//! `badger_core` is the engine behind the `badger` batch exporter. It fills svg templates with
//! the rows of a delimited data file and exports every filled page to a target format, for
//! example to print one name badge per attendee.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Data file
//!   → Row source (header + records, in file order)
//!   → per row: filename resolver (destination path with placeholders expanded)
//!   → per page: load a fresh template, substitute every column
//!   → per page: write svg, or convert it with an external program
//!   → per row: merge page files for multi-page formats
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Loads `badger.toml`, which holds converter and merge commands, dpi, timeouts and
//!   default modes.
//! - [`svg`]: A namespace-aware svg tree that keeps element text and tail text apart.
//!
//! ## Placeholders
//!
//! A column named `name` is looked up as `{{ name }}`, `%name%` or `${name}` depending on the
//! [`SubstMode`]. A column named `<name>` is looked up verbatim as `name`. With the default tree
//! [`Strategy`], a column named `image:photo.png` relinks every `<image>` whose link file name is
//! `photo.png`, and `text:name` only touches `<text>` content.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use badger_core::*;
//! use std::path::PathBuf;
//!
//! let config = BadgerConfig::default();
//! let options = BatchOptions {
//!     data_file: PathBuf::from("attendees.csv"),
//!     col_mode: ColMode::Comma,
//!     templates: vec![PathBuf::from("badge.svg")],
//!     output: PathBuf::from("out/badge_{{ name }}.pdf"),
//!     format: ExportFormat::Pdf,
//!     dpi: config.dpi,
//!     subst_mode: SubstMode::Jinja,
//!     strategy: Strategy::Tree,
//! };
//!
//! let report = run_batch(
//!     &options,
//!     &CommandConverter::new(&config),
//!     &CommandAssembler::new(&config),
//! )
//! .unwrap();
//! if !report.is_ok() {
//!     eprintln!("{} row(s) failed", report.failed_rows().count());
//! }
//! ```

pub use assemble::*;
pub use batch::*;
pub use config::*;
pub use error::*;
pub use export::*;
pub use filename::*;
pub use placeholder::*;
pub use report::*;
pub use rows::*;
pub use substitute::*;

mod assemble;
mod batch;
pub mod config;
#[allow(unused_assignments)]
mod error;
mod export;
mod filename;
mod placeholder;
mod report;
mod rows;
mod substitute;
pub mod svg;

#[cfg(test)]
mod __fixtures;
