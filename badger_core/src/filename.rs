use std::path::Path;
use std::path::PathBuf;

use crate::FieldSpec;
use crate::Row;
use crate::SubstMode;

/// Expand the placeholders of `template` with the values of `row`.
///
/// Every column takes part, including `image` selectors, so a file name may
/// reuse a value that only drives an image link inside the document. Tokens
/// without a matching column stay in place; see [`unresolved_tokens`].
pub fn resolve_filename(template: &Path, fields: &[FieldSpec], row: &Row, mode: SubstMode) -> PathBuf {
	let mut resolved = template.to_string_lossy().into_owned();

	for field in fields {
		let token = field.filename_token(mode);
		if token.is_empty() {
			continue;
		}
		let value = row.get(&field.name).unwrap_or_default();
		resolved = resolved.replace(&token, value);
	}

	PathBuf::from(resolved)
}

/// Placeholder tokens of `mode` still present in `path`.
pub fn unresolved_tokens(path: &Path, mode: SubstMode) -> Vec<String> {
	let (prefix, suffix) = mode.delimiters();
	let text = path.to_string_lossy();
	let mut tokens = Vec::new();
	let mut rest = text.as_ref();

	while let Some(start) = rest.find(prefix) {
		let after_prefix = &rest[start + prefix.len()..];
		let Some(end) = after_prefix.find(suffix) else {
			break;
		};
		let key = &after_prefix[..end];
		if !key.is_empty() && !key.contains(['/', '\\']) {
			tokens.push(format!("{prefix}{key}{suffix}"));
		}
		rest = &after_prefix[end + suffix.len()..];
	}

	tokens
}

/// Output path of one page. With more than one template page the page
/// index is appended to the file stem: `badge_Ada.pdf` becomes
/// `badge_Ada_1.pdf` for page `1`.
pub fn page_path(output: &Path, page: usize, page_count: usize) -> PathBuf {
	if page_count <= 1 {
		return output.to_path_buf();
	}

	let stem = output
		.file_stem()
		.map(|stem| stem.to_string_lossy().into_owned())
		.unwrap_or_default();
	let file_name = match output.extension() {
		Some(ext) => format!("{stem}_{page}.{}", ext.to_string_lossy()),
		None => format!("{stem}_{page}"),
	};

	output.with_file_name(file_name)
}

/// Give `resolved` the extension `ext`.
///
/// The decision is made on the unresolved `template`, so a row value that
/// contains a dot is never mistaken for an extension: `{{ name }}` with the
/// value `J. Doe` becomes `J. Doe.svg`.
pub fn with_format_extension(template: &Path, resolved: PathBuf, ext: &str) -> PathBuf {
	match template.extension().and_then(|e| e.to_str()) {
		Some(current) if current == ext => resolved,
		Some(_) => resolved.with_extension(ext),
		None => {
			let mut path = resolved.into_os_string();
			path.push(".");
			path.push(ext);
			PathBuf::from(path)
		}
	}
}
