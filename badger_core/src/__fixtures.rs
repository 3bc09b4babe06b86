use std::cell::RefCell;
use std::path::Path;
use std::path::PathBuf;

use crate::Assembler;
use crate::BadgerError;
use crate::BadgerResult;
use crate::BatchOptions;
use crate::ColMode;
use crate::Converter;
use crate::ExportFormat;
use crate::Strategy;
use crate::SubstMode;

pub const BADGE_SVG: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" xmlns:sodipodi="http://sodipodi.sourceforge.net/DTD/sodipodi-0.dtd" width="100" height="50">
  <!-- badge -->
  <desc>{{ name }}</desc>
  <text x="10" y="20"><tspan>{{ name }}</tspan> seat {{ seat }}</text>{{ name }}
  <image xlink:href="img/photo.png" sodipodi:absref="/old/img/photo.png" width="10" height="10"/>
  <image xlink:href="img/logo.png" width="10" height="10"/>
</svg>
"#;

pub const PLAIN_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"><text>{{ name }}</text></svg>"#;

/// Write `content` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
	let path = dir.join(name);
	std::fs::write(&path, content).unwrap_or_else(|e| panic!("write {name}: {e}"));
	path
}

pub fn batch_options(dir: &Path, templates: Vec<PathBuf>, output: &str, format: ExportFormat) -> BatchOptions {
	BatchOptions {
		data_file: dir.join("data.csv"),
		col_mode: ColMode::Comma,
		templates,
		output: dir.join(output),
		format,
		dpi: 96,
		subst_mode: SubstMode::Jinja,
		strategy: Strategy::Tree,
	}
}

/// Copies the intermediate svg to the requested output and records each
/// call. Pages listed in `fail_pages` (by intermediate file stem suffix)
/// fail instead.
#[derive(Debug, Default)]
pub struct CopyConverter {
	pub calls: RefCell<Vec<(PathBuf, PathBuf, u32)>>,
	pub fail_pages: Vec<usize>,
}

impl Converter for CopyConverter {
	fn convert(&self, _format: ExportFormat, input: &Path, output: &Path, dpi: u32) -> BadgerResult<()> {
		self.calls
			.borrow_mut()
			.push((input.to_path_buf(), output.to_path_buf(), dpi));

		let stem = input
			.file_stem()
			.map(|stem| stem.to_string_lossy().into_owned())
			.unwrap_or_default();
		if self
			.fail_pages
			.iter()
			.any(|page| stem.ends_with(&format!("_page{page}")))
		{
			return Err(BadgerError::ConverterFailure {
				program: "copy".to_string(),
				reason: "command exited with status 1".to_string(),
			});
		}

		std::fs::copy(input, output)?;
		Ok(())
	}
}

/// Concatenates page files with a `--page--` separator.
#[derive(Debug, Default)]
pub struct ConcatAssembler {
	pub merged: RefCell<Vec<Vec<PathBuf>>>,
}

impl Assembler for ConcatAssembler {
	fn merge(&self, pages: &[PathBuf], output: &Path) -> BadgerResult<()> {
		self.merged.borrow_mut().push(pages.to_vec());
		let mut content = String::new();
		for page in pages {
			content.push_str(&std::fs::read_to_string(page)?);
			content.push_str("--page--");
		}
		std::fs::write(output, content)?;
		Ok(())
	}
}
