use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::AssemblyStatus;
use crate::BadgerConfig;
use crate::BadgerError;
use crate::BadgerResult;
use crate::export::run_command;

/// Converted page files of one row, keyed by page index.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PageArtifacts {
	pages: BTreeMap<usize, PathBuf>,
}

impl PageArtifacts {
	pub fn insert(&mut self, page: usize, path: PathBuf) {
		self.pages.insert(page, path);
	}

	pub fn len(&self) -> usize {
		self.pages.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pages.is_empty()
	}

	/// Page indices with an artifact, ascending.
	pub fn pages(&self) -> Vec<usize> {
		self.pages.keys().copied().collect()
	}

	/// Take all artifacts in page order, leaving the map empty.
	pub fn drain(&mut self) -> Vec<PathBuf> {
		std::mem::take(&mut self.pages).into_values().collect()
	}
}

/// Combines per-page files into a single multi-page document.
pub trait Assembler {
	/// Append `pages`, in the given order, into `output`.
	fn merge(&self, pages: &[PathBuf], output: &Path) -> BadgerResult<()>;
}

/// An [`Assembler`] that runs an external program such as `qpdf`.
///
/// The argv template expands `{inputs}` into one argument per page and
/// replaces `{file_out}` with the destination.
#[derive(Debug, Clone)]
pub struct CommandAssembler {
	command: Vec<String>,
	timeout: Duration,
}

impl CommandAssembler {
	pub fn new(config: &BadgerConfig) -> Self {
		Self {
			command: config.merge.clone(),
			timeout: config.timeout(),
		}
	}
}

impl Assembler for CommandAssembler {
	fn merge(&self, pages: &[PathBuf], output: &Path) -> BadgerResult<()> {
		let file_out = output.to_string_lossy();
		let mut argv = Vec::with_capacity(self.command.len() + pages.len());
		for arg in &self.command {
			if arg == "{inputs}" {
				argv.extend(pages.iter().map(|page| page.to_string_lossy().into_owned()));
			} else {
				argv.push(arg.replace("{file_out}", &file_out));
			}
		}

		tracing::debug!(?argv, "running merge command");
		run_command(&argv, self.timeout).map_err(|e| {
			BadgerError::MergeFailure {
				path: output.display().to_string(),
				pages: pages.len(),
				reason: e.to_string(),
			}
		})
	}
}

/// Combine a row's artifacts into `output` and empty the artifact map.
///
/// A single artifact is copied into place without invoking the assembler.
/// When fewer artifacts than `page_count` exist, whatever succeeded is
/// merged and the result is reported as [`AssemblyStatus::Partial`].
pub fn assemble_row(
	assembler: &dyn Assembler,
	artifacts: &mut PageArtifacts,
	page_count: usize,
	output: &Path,
) -> AssemblyStatus {
	let present = artifacts.pages();
	let missing: Vec<usize> = (0..page_count).filter(|page| !present.contains(page)).collect();
	let pages = artifacts.drain();

	if pages.is_empty() {
		tracing::error!(output = %output.display(), "no pages to merge");
		return AssemblyStatus::Empty;
	}

	tracing::info!(
		output = %output.display(),
		pages = pages.len(),
		"merging pages"
	);
	let result = if let [single] = pages.as_slice() {
		std::fs::copy(single, output)
			.map(|_| ())
			.map_err(BadgerError::from)
	} else {
		assembler.merge(&pages, output)
	};

	if let Err(e) = result {
		tracing::error!(output = %output.display(), "{e}");
		return AssemblyStatus::Failed {
			reason: e.to_string(),
		};
	}

	if missing.is_empty() {
		AssemblyStatus::Complete { pages: pages.len() }
	} else {
		tracing::warn!(
			output = %output.display(),
			?missing,
			"merged document is missing pages"
		);
		AssemblyStatus::Partial {
			merged: present,
			missing,
		}
	}
}
