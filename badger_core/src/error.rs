use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum BadgerError {
	#[error(transparent)]
	#[diagnostic(code(badger::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to read data file `{path}`: {reason}")]
	#[diagnostic(
		code(badger::data_format),
		help("the first line of the data file must be a header naming every column")
	)]
	DataFormat { path: String, reason: String },

	#[error("failed to parse template `{path}`: {reason}")]
	#[diagnostic(
		code(badger::template_parse),
		help("templates must be well-formed svg; use `--flat` to substitute without parsing")
	)]
	TemplateParse { path: String, reason: String },

	#[error("unknown export format: `{0}`")]
	#[diagnostic(
		code(badger::unknown_format),
		help("supported formats: eps, pdf, png, ps, svg")
	)]
	UnknownExportFormat(String),

	#[error("unknown substitution mode: `{0}`")]
	#[diagnostic(
		code(badger::unknown_subst_mode),
		help("supported substitution modes: jinja, shell, win")
	)]
	UnknownSubstMode(String),

	#[error("unknown column mode: `{0}`")]
	#[diagnostic(
		code(badger::unknown_col_mode),
		help("supported column modes: comma, semicolon, tab")
	)]
	UnknownColMode(String),

	#[error("the output folder `{0}` does not exist")]
	#[diagnostic(
		code(badger::output_directory),
		help("create the folder first; badger never creates output folders")
	)]
	OutputDirectory(String),

	#[error("refusing to overwrite template `{0}`")]
	#[diagnostic(
		code(badger::output_is_template),
		help("choose an export filename that differs from every template page")
	)]
	OutputIsTemplate(String),

	#[error("output `{path}` was already written by row {first_row}")]
	#[diagnostic(
		code(badger::output_collision),
		help("add a placeholder with a unique value to the export filename")
	)]
	OutputCollision { path: String, first_row: usize },

	#[error("no converter configured for format `{0}`")]
	#[diagnostic(
		code(badger::missing_converter),
		help("add an entry to the `[converters]` table in badger.toml")
	)]
	MissingConverter(String),

	#[error("converter `{program}` failed: {reason}")]
	#[diagnostic(code(badger::converter_failure))]
	ConverterFailure { program: String, reason: String },

	#[error("failed to merge {pages} page(s) into `{path}`: {reason}")]
	#[diagnostic(
		code(badger::merge_failure),
		help("check that the `merge` command in badger.toml is installed")
	)]
	MergeFailure {
		path: String,
		pages: usize,
		reason: String,
	},

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(badger::config_parse),
		help("check that badger.toml is valid TOML")
	)]
	ConfigParse(String),
}

pub type BadgerResult<T> = Result<T, BadgerError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
