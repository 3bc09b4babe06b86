use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::Path;

use derive_more::Deref;

use crate::BadgerError;
use crate::BadgerResult;
use crate::ColMode;

/// A record whose field count differs from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaggedRecord {
	/// Number of columns in the header.
	pub expected: usize,
	/// Number of fields the record actually had before padding or
	/// truncation.
	pub found: usize,
}

/// One data-file record as ordered `(field name, value)` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Deref)]
pub struct Row {
	/// Zero-based position of the record below the header.
	pub index: usize,
	#[deref]
	fields: Vec<(String, String)>,
	/// Set when the record was padded or truncated to fit the header.
	pub ragged: Option<RaggedRecord>,
}

impl Row {
	pub fn new(index: usize, fields: Vec<(String, String)>) -> Self {
		Self {
			index,
			fields,
			ragged: None,
		}
	}

	/// Value of the field named `name`.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.fields
			.iter()
			.find(|(field, _)| field == name)
			.map(|(_, value)| value.as_str())
	}
}

/// Lazily reads a delimited data file into [`Row`]s in file order.
///
/// Records with too few fields are padded with empty values and records with
/// too many are truncated; either way the row carries a [`RaggedRecord`]
/// marker so callers can warn about it.
pub struct RowSource<R: io::Read = File> {
	path: String,
	headers: Vec<String>,
	reader: csv::Reader<R>,
	record: csv::StringRecord,
	next_index: usize,
}

impl<R: io::Read> std::fmt::Debug for RowSource<R> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RowSource")
			.field("path", &self.path)
			.field("headers", &self.headers)
			.field("next_index", &self.next_index)
			.finish_non_exhaustive()
	}
}

impl RowSource<File> {
	/// Open the data file at `path`. The header is read eagerly so a missing
	/// or malformed header fails here rather than on the first row.
	pub fn open(path: &Path, col_mode: ColMode) -> BadgerResult<Self> {
		let display = path.display().to_string();
		let file = File::open(path).map_err(|e| {
			BadgerError::DataFormat {
				path: display.clone(),
				reason: e.to_string(),
			}
		})?;
		Self::from_reader(file, col_mode, &display)
	}
}

impl<R: io::Read> RowSource<R> {
	/// Read rows from any reader. `path` is only used in error messages.
	pub fn from_reader(reader: R, col_mode: ColMode, path: &str) -> BadgerResult<Self> {
		let mut reader = csv::ReaderBuilder::new()
			.has_headers(true)
			.flexible(true)
			.delimiter(col_mode.delimiter())
			.from_reader(reader);

		let headers: Vec<String> = reader
			.headers()
			.map_err(|e| data_error(path, &e))?
			.iter()
			.enumerate()
			.map(|(idx, name)| {
				if idx == 0 {
					name.trim_start_matches('\u{feff}').to_string()
				} else {
					name.to_string()
				}
			})
			.collect();

		if headers.is_empty() || headers.iter().all(String::is_empty) {
			return Err(BadgerError::DataFormat {
				path: path.to_string(),
				reason: "missing header row".to_string(),
			});
		}

		let mut seen = HashSet::new();
		for name in &headers {
			if !seen.insert(name.as_str()) {
				return Err(BadgerError::DataFormat {
					path: path.to_string(),
					reason: format!("duplicate column `{name}` in header"),
				});
			}
		}

		Ok(Self {
			path: path.to_string(),
			headers,
			reader,
			record: csv::StringRecord::new(),
			next_index: 0,
		})
	}

	/// Field names from the header, in column order.
	pub fn headers(&self) -> &[String] {
		&self.headers
	}
}

impl<R: io::Read> Iterator for RowSource<R> {
	type Item = BadgerResult<Row>;

	fn next(&mut self) -> Option<Self::Item> {
		match self.reader.read_record(&mut self.record) {
			Ok(false) => None,
			Err(e) => Some(Err(data_error(&self.path, &e))),
			Ok(true) => {
				let found = self.record.len();
				let expected = self.headers.len();
				let fields = self
					.headers
					.iter()
					.enumerate()
					.map(|(idx, name)| {
						let value = self.record.get(idx).unwrap_or_default();
						(name.clone(), value.to_string())
					})
					.collect();

				let mut row = Row::new(self.next_index, fields);
				if found != expected {
					row.ragged = Some(RaggedRecord { expected, found });
				}
				self.next_index += 1;

				Some(Ok(row))
			}
		}
	}
}

fn data_error(path: &str, error: &csv::Error) -> BadgerError {
	BadgerError::DataFormat {
		path: path.to_string(),
		reason: error.to_string(),
	}
}
