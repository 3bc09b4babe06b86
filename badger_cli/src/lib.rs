use std::path::PathBuf;

use badger_core::ColMode;
use badger_core::ExportFormat;
use badger_core::SubstMode;
use clap::Parser;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Fill svg templates with the rows of a spreadsheet and export every row.",
	long_about = "badger reads a delimited data file and, for every row, fills one or more svg \
	              template pages with the row's values and exports the result as svg, png, pdf, \
	              ps or eps.\n\nThe header row names the placeholders. A column `name` fills \
	              `{{ name }}` in the templates and in the export filename.\n\nExample:\n  badger \
	              -c attendees.csv -o 'badges/{{ name }}.pdf' front.svg back.svg"
)]
pub struct BadgerCli {
	/// Destination path template. Placeholders are expanded per row, e.g.
	/// `out/badge_{{ name }}.pdf`.
	#[arg(long, short = 'o')]
	pub export_filename: PathBuf,

	/// Export format. Inferred from the extension of `--export-filename`
	/// when omitted.
	#[arg(long, value_enum)]
	pub export_type: Option<ExportType>,

	/// Resolution for raster exports, in dpi.
	#[arg(long, short = 'D')]
	pub export_dpi: Option<u32>,

	/// Column separator of the data file.
	#[arg(long, short = 'C', value_enum)]
	pub col_mode: Option<ColumnMode>,

	/// Placeholder syntax: `jinja` is `{{ key }}`, `shell` is `${key}` and
	/// `win` is `%key%`.
	#[arg(long, short = 's', value_enum)]
	pub subst_mode: Option<SubstitutionMode>,

	/// Replace placeholders anywhere in the template text instead of only
	/// in `<text>` content and `<image>` links.
	#[arg(long, default_value_t = false)]
	pub flat: bool,

	/// Delimited data file. Its header row names the fields.
	#[arg(long, short = 'c')]
	pub csv_in: PathBuf,

	/// Svg template pages, in page order.
	#[arg(required = true, num_args = 1..)]
	pub graphics_files: Vec<PathBuf>,

	/// Path to a `badger.toml` file. Defaults to the first of
	/// `badger.toml`, `.badger.toml` and `.config/badger.toml` in the
	/// working directory.
	#[arg(long)]
	pub config: Option<PathBuf>,

	/// Seconds a converter or merge command may run before it is killed.
	#[arg(long)]
	pub timeout: Option<u64>,

	/// Log level. `RUST_LOG` takes precedence when set.
	#[arg(long, short = 'v', value_enum, default_value_t = Verbosity::Info)]
	pub verbosity: Verbosity,

	/// Disable colored output.
	#[arg(long, default_value_t = false)]
	pub no_color: bool,

	/// Output format of the final summary.
	#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
	pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportType {
	Eps,
	Pdf,
	Png,
	Ps,
	Svg,
}

impl From<ExportType> for ExportFormat {
	fn from(value: ExportType) -> Self {
		match value {
			ExportType::Eps => Self::Eps,
			ExportType::Pdf => Self::Pdf,
			ExportType::Png => Self::Png,
			ExportType::Ps => Self::Ps,
			ExportType::Svg => Self::Svg,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColumnMode {
	Comma,
	Semicolon,
	Tab,
}

impl From<ColumnMode> for ColMode {
	fn from(value: ColumnMode) -> Self {
		match value {
			ColumnMode::Comma => Self::Comma,
			ColumnMode::Semicolon => Self::Semicolon,
			ColumnMode::Tab => Self::Tab,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SubstitutionMode {
	Jinja,
	Shell,
	Win,
}

impl From<SubstitutionMode> for SubstMode {
	fn from(value: SubstitutionMode) -> Self {
		match value {
			SubstitutionMode::Jinja => Self::Jinja,
			SubstitutionMode::Shell => Self::Shell,
			SubstitutionMode::Win => Self::Win,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Verbosity {
	Error,
	Warn,
	Info,
	Debug,
	Trace,
}

impl Verbosity {
	/// Directive understood by `tracing_subscriber::EnvFilter`.
	pub fn as_filter(self) -> &'static str {
		match self {
			Self::Error => "error",
			Self::Warn => "warn",
			Self::Info => "info",
			Self::Debug => "debug",
			Self::Trace => "trace",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// The full batch report as JSON for programmatic consumption.
	Json,
}
