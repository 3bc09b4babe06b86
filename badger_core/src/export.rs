use std::fmt;
use std::path::Path;
use std::process::Command;
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;

use crate::BadgerConfig;
use crate::BadgerError;
use crate::BadgerResult;

/// Target file format of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
	Eps,
	Pdf,
	Png,
	Ps,
	/// The native template format. Pages are written without conversion.
	Svg,
}

impl ExportFormat {
	pub const ALL: [Self; 5] = [Self::Eps, Self::Pdf, Self::Png, Self::Ps, Self::Svg];

	pub fn extension(self) -> &'static str {
		match self {
			Self::Eps => "eps",
			Self::Pdf => "pdf",
			Self::Png => "png",
			Self::Ps => "ps",
			Self::Svg => "svg",
		}
	}

	/// Whether pages of one row are combined into a single file.
	pub fn is_multipage(self) -> bool {
		matches!(self, Self::Pdf)
	}

	pub fn is_native(self) -> bool {
		matches!(self, Self::Svg)
	}

	/// Infer the format from the extension of `path`.
	pub fn from_path(path: &Path) -> BadgerResult<Self> {
		let ext = path
			.extension()
			.and_then(|ext| ext.to_str())
			.unwrap_or_default();
		ext.parse()
	}
}

impl fmt::Display for ExportFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.extension())
	}
}

impl FromStr for ExportFormat {
	type Err = BadgerError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let normalized = s.trim().trim_start_matches('.').to_ascii_lowercase();
		Self::ALL
			.into_iter()
			.find(|format| format.extension() == normalized)
			.ok_or(BadgerError::UnknownExportFormat(normalized))
	}
}

/// Turns an intermediate svg file into the requested format.
pub trait Converter {
	fn convert(&self, format: ExportFormat, input: &Path, output: &Path, dpi: u32) -> BadgerResult<()>;
}

/// A [`Converter`] that runs an external program per page.
///
/// Each format maps to an argv template where `{dpi}`, `{file_in}` and
/// `{file_out}` are replaced before the program is spawned. No shell is
/// involved.
#[derive(Debug, Clone)]
pub struct CommandConverter {
	config: BadgerConfig,
	timeout: Duration,
}

impl CommandConverter {
	pub fn new(config: &BadgerConfig) -> Self {
		Self {
			config: config.clone(),
			timeout: config.timeout(),
		}
	}

	#[must_use]
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}
}

impl Converter for CommandConverter {
	fn convert(&self, format: ExportFormat, input: &Path, output: &Path, dpi: u32) -> BadgerResult<()> {
		let template = self
			.config
			.converter(format)
			.ok_or_else(|| BadgerError::MissingConverter(format.to_string()))?;

		let dpi = dpi.to_string();
		let file_in = input.to_string_lossy();
		let file_out = output.to_string_lossy();
		let argv: Vec<String> = template
			.iter()
			.map(|arg| {
				arg.replace("{dpi}", &dpi)
					.replace("{file_in}", &file_in)
					.replace("{file_out}", &file_out)
			})
			.collect();

		tracing::debug!(?argv, "running converter");
		run_command(&argv, self.timeout)
	}
}

/// Run `argv` to completion, killing it once `timeout` has elapsed. Standard
/// output is discarded; standard error is passed through.
pub(crate) fn run_command(argv: &[String], timeout: Duration) -> BadgerResult<()> {
	let Some((program, args)) = argv.split_first() else {
		return Err(BadgerError::ConverterFailure {
			program: String::new(),
			reason: "empty command".to_string(),
		});
	};
	let failure = |reason: String| {
		BadgerError::ConverterFailure {
			program: program.clone(),
			reason,
		}
	};

	let mut child = Command::new(program)
		.args(args)
		.stdin(Stdio::null())
		.stdout(Stdio::null())
		.spawn()
		.map_err(|e| failure(e.to_string()))?;

	let deadline = Instant::now() + timeout;
	loop {
		if let Some(status) = child.try_wait().map_err(|e| failure(e.to_string()))? {
			if status.success() {
				return Ok(());
			}
			let code = status
				.code()
				.map_or_else(|| "unknown".to_string(), |code| code.to_string());
			return Err(failure(format!("command exited with status {code}")));
		}

		if Instant::now() >= deadline {
			let _ = child.kill();
			let _ = child.wait();
			return Err(failure(format!(
				"timed out after {}s",
				timeout.as_secs_f32()
			)));
		}

		std::thread::sleep(Duration::from_millis(20));
	}
}
