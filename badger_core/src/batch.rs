use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use tempfile::TempDir;

use crate::Assembler;
use crate::BadgerError;
use crate::BadgerResult;
use crate::BatchReport;
use crate::ColMode;
use crate::Converter;
use crate::ExportFormat;
use crate::FieldSpec;
use crate::PageArtifacts;
use crate::PageOutcome;
use crate::Row;
use crate::RowReport;
use crate::RowSource;
use crate::RowWarning;
use crate::Strategy;
use crate::SubstMode;
use crate::Template;
use crate::assemble_row;
use crate::page_path;
use crate::resolve_filename;
use crate::substitute_row;
use crate::unresolved_tokens;
use crate::with_format_extension;

/// Everything a batch needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct BatchOptions {
	/// Delimited data file; its header names the fields.
	pub data_file: PathBuf,
	pub col_mode: ColMode,
	/// Template pages, in page order.
	pub templates: Vec<PathBuf>,
	/// Destination path template, usually containing placeholders.
	pub output: PathBuf,
	pub format: ExportFormat,
	pub dpi: u32,
	pub subst_mode: SubstMode,
	pub strategy: Strategy,
}

/// A running batch. Owns the scoped temporary directory, which is removed
/// when the batch is dropped.
pub struct Batch<'a> {
	options: &'a BatchOptions,
	converter: &'a dyn Converter,
	assembler: &'a dyn Assembler,
	temp_dir: TempDir,
}

/// Mutable state of one row. Never shared between rows.
struct RowContext<'r> {
	row: &'r Row,
	output: PathBuf,
	/// Canonical template paths, which no page may overwrite.
	templates: &'r HashSet<PathBuf>,
	warnings: Vec<RowWarning>,
	artifacts: PageArtifacts,
}

impl<'a> Batch<'a> {
	pub fn new(
		options: &'a BatchOptions,
		converter: &'a dyn Converter,
		assembler: &'a dyn Assembler,
	) -> BadgerResult<Self> {
		let temp_dir = tempfile::Builder::new().prefix("badger_").tempdir()?;
		tracing::debug!(path = %temp_dir.path().display(), "created temporary directory");

		Ok(Self {
			options,
			converter,
			assembler,
			temp_dir,
		})
	}

	pub fn temp_dir(&self) -> &Path {
		self.temp_dir.path()
	}

	/// Process every row of the data file.
	///
	/// Fails only when the data file or a template cannot be read at all.
	/// Per-row and per-page failures are logged and recorded in the report.
	pub fn run(&self) -> BadgerResult<BatchReport> {
		let templates = self.check_templates()?;

		let source = RowSource::open(&self.options.data_file, self.options.col_mode)?;
		let fields: Vec<FieldSpec> = source
			.headers()
			.iter()
			.map(|name| self.options.strategy.field(name))
			.collect();

		let mut outputs = HashMap::new();
		let mut rows = Vec::new();
		for row in source {
			let row = row?;
			rows.push(self.process_row(&fields, &row, &templates, &mut outputs));
		}

		Ok(BatchReport {
			format: self.options.format,
			rows,
		})
	}

	/// Make sure every template parses and return their canonical paths.
	fn check_templates(&self) -> BadgerResult<HashSet<PathBuf>> {
		let mut canonical = HashSet::new();
		for template in &self.options.templates {
			if !template.is_file() {
				return Err(BadgerError::Io(std::io::Error::new(
					std::io::ErrorKind::NotFound,
					format!("template `{}` not found", template.display()),
				)));
			}
			Template::load(template, self.options.strategy)?;
			canonical.insert(std::fs::canonicalize(template)?);
		}
		Ok(canonical)
	}

	fn process_row(
		&self,
		fields: &[FieldSpec],
		row: &Row,
		templates: &HashSet<PathBuf>,
		outputs: &mut HashMap<PathBuf, usize>,
	) -> RowReport {
		tracing::info!(row = row.index + 1, "processing row");

		let resolved = resolve_filename(&self.options.output, fields, row, self.options.subst_mode);
		let output = with_format_extension(
			&self.options.output,
			resolved,
			self.options.format.extension(),
		);

		let mut ctx = RowContext {
			row,
			output,
			templates,
			warnings: Vec::new(),
			artifacts: PageArtifacts::default(),
		};

		if let Some(ragged) = row.ragged {
			tracing::warn!(
				row = row.index + 1,
				expected = ragged.expected,
				found = ragged.found,
				"record field count does not match the header"
			);
			ctx.warnings.push(RowWarning::RaggedRow {
				expected: ragged.expected,
				found: ragged.found,
			});
		}

		for token in unresolved_tokens(&ctx.output, self.options.subst_mode) {
			tracing::warn!(%token, "unresolved placeholder in output filename");
			ctx.warnings.push(RowWarning::UnresolvedToken { token });
		}

		let key = std::path::absolute(&ctx.output).unwrap_or_else(|_| ctx.output.clone());
		if let Some(&first_row) = outputs.get(&key) {
			return collision(ctx, first_row, self.options.templates.len());
		}
		outputs.insert(key, row.index);

		let page_count = self.options.templates.len();
		let pages: Vec<PageOutcome> = self
			.options
			.templates
			.iter()
			.enumerate()
			.map(|(page, template)| {
				tracing::info!("processing page {}/{page_count}", page + 1);
				self.export_page(&mut ctx, fields, page, template)
			})
			.collect();

		let assembly = self.options.format.is_multipage().then(|| {
			assemble_row(self.assembler, &mut ctx.artifacts, page_count, &ctx.output)
		});

		RowReport {
			index: row.index,
			output: ctx.output,
			pages,
			warnings: ctx.warnings,
			assembly,
		}
	}

	fn export_page(
		&self,
		ctx: &mut RowContext<'_>,
		fields: &[FieldSpec],
		page: usize,
		template_path: &Path,
	) -> PageOutcome {
		let page_count = self.options.templates.len();
		let destination = page_path(&ctx.output, page, page_count);

		let out_dir = match destination.parent() {
			Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
			_ => PathBuf::from("."),
		};
		if !out_dir.is_dir() {
			let error = BadgerError::OutputDirectory(out_dir.display().to_string());
			tracing::error!("{error}");
			return PageOutcome::Skipped {
				reason: error.to_string(),
			};
		}

		let format = self.options.format;
		let final_path = if format.is_multipage() {
			&ctx.output
		} else {
			&destination
		};
		if is_template(ctx.templates, final_path) {
			let error = BadgerError::OutputIsTemplate(final_path.display().to_string());
			tracing::error!("{error}");
			return PageOutcome::Skipped {
				reason: error.to_string(),
			};
		}

		let mut template = match Template::load(template_path, self.options.strategy) {
			Ok(template) => template,
			Err(e) => return failed(&e),
		};
		let base_dir = template_path.parent().unwrap_or_else(|| Path::new(""));
		let warnings = substitute_row(
			&mut template,
			fields,
			ctx.row,
			self.options.subst_mode,
			base_dir,
		);
		ctx.warnings.extend(warnings);
		let svg = template.to_svg_string();

		if format.is_native() {
			tracing::info!(path = %destination.display(), "saving file");
			return match std::fs::write(&destination, svg) {
				Ok(()) => PageOutcome::Written { path: destination },
				Err(e) => failed(&e.into()),
			};
		}

		let stem = format!("row{}_page{page}", ctx.row.index);
		let intermediate = self.temp_dir().join(format!("{stem}.svg"));
		if let Err(e) = std::fs::write(&intermediate, svg) {
			return failed(&e.into());
		}

		let target = if format.is_multipage() {
			self.temp_dir().join(format!("{stem}.{}", format.extension()))
		} else {
			destination
		};

		tracing::info!(path = %target.display(), "converting file");
		if let Err(e) = self
			.converter
			.convert(format, &intermediate, &target, self.options.dpi)
		{
			return failed(&e);
		}

		if format.is_multipage() {
			ctx.artifacts.insert(page, target.clone());
			PageOutcome::Staged { path: target }
		} else {
			PageOutcome::Converted { path: target }
		}
	}
}

fn is_template(templates: &HashSet<PathBuf>, path: &Path) -> bool {
	std::fs::canonicalize(path).is_ok_and(|path| templates.contains(&path))
}

/// Report for a row whose destination an earlier row already claimed. None
/// of its pages are exported, so the earlier output survives.
fn collision(ctx: RowContext<'_>, first_row: usize, page_count: usize) -> RowReport {
	let error = BadgerError::OutputCollision {
		path: ctx.output.display().to_string(),
		first_row: first_row + 1,
	};
	tracing::warn!(row = ctx.row.index + 1, "{error}");

	let mut warnings = ctx.warnings;
	warnings.push(RowWarning::OutputCollision {
		path: ctx.output.clone(),
		first_row,
	});

	RowReport {
		index: ctx.row.index,
		output: ctx.output,
		pages: vec![
			PageOutcome::Skipped {
				reason: error.to_string(),
			};
			page_count
		],
		warnings,
		assembly: None,
	}
}

fn failed(error: &BadgerError) -> PageOutcome {
	tracing::error!("{error}");
	PageOutcome::Failed {
		reason: error.to_string(),
	}
}

/// Run a whole batch with a fresh temporary directory that is removed before
/// this function returns, whether the batch succeeded or not.
pub fn run_batch(
	options: &BatchOptions,
	converter: &dyn Converter,
	assembler: &dyn Assembler,
) -> BadgerResult<BatchReport> {
	let batch = Batch::new(options, converter, assembler)?;
	batch.run()
}
