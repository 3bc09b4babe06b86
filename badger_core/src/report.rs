use std::path::PathBuf;

use serde::Serialize;

use crate::ExportFormat;

/// A non-fatal problem noticed while processing a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowWarning {
	/// The column is empty; its token was replaced with nothing.
	MissingValue { field: String },
	/// The column's token did not occur in the page.
	NoReplacement { field: String },
	/// A placeholder in the destination path had no matching column.
	UnresolvedToken { token: String },
	/// The record had a different number of fields than the header.
	RaggedRow { expected: usize, found: usize },
	/// An earlier row resolved to the same destination, so this row was
	/// not exported.
	OutputCollision { path: PathBuf, first_row: usize },
}

/// What happened to one template page of one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageOutcome {
	/// The substituted svg was written to its final path.
	Written { path: PathBuf },
	/// The page was converted to its final path.
	Converted { path: PathBuf },
	/// The page was converted into the temporary directory and waits to be
	/// merged.
	Staged { path: PathBuf },
	/// The page was not attempted.
	Skipped { reason: String },
	/// Loading, writing or converting the page failed.
	Failed { reason: String },
}

impl PageOutcome {
	pub fn is_ok(&self) -> bool {
		matches!(
			self,
			Self::Written { .. } | Self::Converted { .. } | Self::Staged { .. }
		)
	}
}

/// Result of combining a row's pages into one multi-page file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssemblyStatus {
	Complete {
		pages: usize,
	},
	/// Only some pages could be produced; the output holds those pages.
	Partial {
		merged: Vec<usize>,
		missing: Vec<usize>,
	},
	Failed {
		reason: String,
	},
	/// No page was produced, so nothing was written.
	Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowReport {
	/// Zero-based index of the data row.
	pub index: usize,
	/// Resolved destination path of the row.
	pub output: PathBuf,
	/// Outcome per template page, in page order.
	pub pages: Vec<PageOutcome>,
	pub warnings: Vec<RowWarning>,
	/// Present only for multi-page formats.
	pub assembly: Option<AssemblyStatus>,
}

impl RowReport {
	/// Returns true if every page and the merge step succeeded.
	pub fn is_ok(&self) -> bool {
		self.pages.iter().all(PageOutcome::is_ok)
			&& self
				.assembly
				.as_ref()
				.is_none_or(|status| matches!(status, AssemblyStatus::Complete { .. }))
	}
}

/// Result of a whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
	pub format: ExportFormat,
	pub rows: Vec<RowReport>,
}

impl BatchReport {
	/// Returns true if every row succeeded.
	pub fn is_ok(&self) -> bool {
		self.rows.iter().all(RowReport::is_ok)
	}

	pub fn failed_rows(&self) -> impl Iterator<Item = &RowReport> {
		self.rows.iter().filter(|row| !row.is_ok())
	}

	pub fn warning_count(&self) -> usize {
		self.rows.iter().map(|row| row.warnings.len()).sum()
	}
}
