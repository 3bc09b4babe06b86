use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::BadgerError;
use crate::BadgerResult;
use crate::ColMode;
use crate::ExportFormat;
use crate::Strategy;
use crate::SubstMode;

/// Default export resolution in dpi.
pub const DEFAULT_DPI: u32 = 300;

/// Default limit for a single converter or merge invocation.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["badger.toml", ".badger.toml", ".config/badger.toml"];

/// Configuration loaded from a `badger.toml` file.
///
/// ```toml
/// dpi = 300
/// timeout_secs = 120
/// subst_mode = "jinja"
/// col_mode = "comma"
/// substitution = "tree"
/// merge = ["qpdf", "--empty", "--pages", "{inputs}", "--", "{file_out}"]
///
/// [converters]
/// png = ["rsvg-convert", "--dpi-x={dpi}", "--dpi-y={dpi}", "-o", "{file_out}", "{file_in}"]
/// ```
///
/// Every key is optional. Command-line flags take precedence over values
/// from the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BadgerConfig {
	/// Resolution for raster exports.
	#[serde(default = "default_dpi")]
	pub dpi: u32,
	/// Seconds a converter or merge command may run before it is killed.
	#[serde(default = "default_timeout_secs")]
	pub timeout_secs: u64,
	#[serde(default)]
	pub subst_mode: SubstMode,
	#[serde(default)]
	pub col_mode: ColMode,
	#[serde(default)]
	pub substitution: Strategy,
	/// Per-format argv templates overriding the built-in Inkscape commands.
	/// Placeholders: `{dpi}`, `{file_in}`, `{file_out}`.
	#[serde(default)]
	pub converters: BTreeMap<String, Vec<String>>,
	/// Argv template that appends page files into one multi-page document.
	/// `{inputs}` expands to one argument per page, in page order.
	#[serde(default = "default_merge_command")]
	pub merge: Vec<String>,
}

impl Default for BadgerConfig {
	fn default() -> Self {
		Self {
			dpi: DEFAULT_DPI,
			timeout_secs: DEFAULT_TIMEOUT_SECS,
			subst_mode: SubstMode::default(),
			col_mode: ColMode::default(),
			substitution: Strategy::default(),
			converters: BTreeMap::new(),
			merge: default_merge_command(),
		}
	}
}

impl BadgerConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> BadgerResult<Option<BadgerConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		Self::load_file(&config_path).map(Some)
	}

	/// Load the config from an explicit path.
	pub fn load_file(path: &Path) -> BadgerResult<BadgerConfig> {
		let content = std::fs::read_to_string(path)?;
		Self::parse(&content)
	}

	pub fn parse(content: &str) -> BadgerResult<BadgerConfig> {
		toml::from_str(content).map_err(|e| BadgerError::ConfigParse(e.to_string()))
	}

	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_secs)
	}

	/// The argv template used to produce `format`. The native format has no
	/// converter.
	pub fn converter(&self, format: ExportFormat) -> Option<Vec<String>> {
		if let Some(command) = self.converters.get(format.extension()) {
			return Some(command.clone());
		}

		let args: &[&str] = match format {
			ExportFormat::Svg => return None,
			ExportFormat::Png => &["--export-dpi={dpi}"],
			ExportFormat::Pdf => {
				&[
					"--export-dpi={dpi}",
					"--export-pdf-version=1.5",
					"--export-text-to-path",
				]
			}
			ExportFormat::Eps | ExportFormat::Ps => {
				&["--export-dpi={dpi}", "--export-text-to-path"]
			}
		};

		let mut command = vec!["inkscape".to_string()];
		command.extend(args.iter().map(ToString::to_string));
		command.push("--export-filename={file_out}".to_string());
		command.push("{file_in}".to_string());
		Some(command)
	}
}

fn default_dpi() -> u32 {
	DEFAULT_DPI
}

fn default_timeout_secs() -> u64 {
	DEFAULT_TIMEOUT_SECS
}

fn default_merge_command() -> Vec<String> {
	["qpdf", "--empty", "--pages", "{inputs}", "--", "{file_out}"]
		.into_iter()
		.map(ToString::to_string)
		.collect()
}
