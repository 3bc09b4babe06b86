use std::ffi::OsStr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use url::Url;

use crate::BadgerResult;
use crate::ElementKind;
use crate::FieldSpec;
use crate::Row;
use crate::RowWarning;
use crate::SubstMode;
use crate::svg::Element;
use crate::svg::NodeKind;
use crate::svg::SODIPODI_NS;
use crate::svg::SVG_NS;
use crate::svg::SvgDocument;
use crate::svg::XLINK_NS;

/// How templates are loaded and rewritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
	/// Parse the svg and rewrite `text` content and `image` links.
	#[default]
	Tree,
	/// Treat the template as plain text and replace tokens everywhere,
	/// including inside markup.
	Flat,
}

impl Strategy {
	/// Interpret a header column name for this strategy.
	pub fn field(self, name: &str) -> FieldSpec {
		match self {
			Self::Tree => FieldSpec::tree(name),
			Self::Flat => FieldSpec::flat(name),
		}
	}
}

/// A freshly loaded template page, exclusively owned by one row/page
/// iteration.
#[derive(Debug, Clone)]
pub enum Template {
	Flat(String),
	Tree(SvgDocument),
}

impl Template {
	pub fn load(path: &Path, strategy: Strategy) -> BadgerResult<Self> {
		match strategy {
			Strategy::Flat => Ok(Self::Flat(std::fs::read_to_string(path)?)),
			Strategy::Tree => Ok(Self::Tree(SvgDocument::load(path)?)),
		}
	}

	/// Serialized svg markup.
	pub fn to_svg_string(&self) -> String {
		match self {
			Self::Flat(text) => text.clone(),
			Self::Tree(document) => document.to_xml_string(),
		}
	}

	/// Substitute one field, returning how many occurrences were rewritten.
	///
	/// `base_dir` is the directory of the template file and anchors relative
	/// image links.
	pub fn apply(&mut self, field: &FieldSpec, value: &str, mode: SubstMode, base_dir: &Path) -> usize {
		let token = field.document_token(mode);
		match self {
			Self::Flat(text) => replace_flat(text, &token, value),
			Self::Tree(document) => {
				match field.kind {
					Some(ElementKind::Image) => replace_image(document, &token, value, base_dir),
					Some(ElementKind::Text) | None => replace_text(document, &token, value),
				}
			}
		}
	}
}

/// Apply every column of `row` to `template` and collect the warnings the
/// substitution produced.
pub fn substitute_row(
	template: &mut Template,
	fields: &[FieldSpec],
	row: &Row,
	mode: SubstMode,
	base_dir: &Path,
) -> Vec<RowWarning> {
	let mut warnings = Vec::new();

	for field in fields {
		let value = row.get(&field.name).unwrap_or_default();
		tracing::debug!(
			column = %field.name,
			token = %field.document_token(mode),
			value,
			"substituting column"
		);

		if value.is_empty() {
			tracing::warn!(row = row.index, column = %field.name, "no value for key");
			warnings.push(RowWarning::MissingValue {
				field: field.name.clone(),
			});
		}

		if template.apply(field, value, mode, base_dir) == 0 {
			tracing::warn!(row = row.index, column = %field.name, "no replacement for key");
			warnings.push(RowWarning::NoReplacement {
				field: field.name.clone(),
			});
		}
	}

	warnings
}

/// Literal, case-sensitive, global replacement.
pub fn replace_flat(text: &mut String, token: &str, value: &str) -> usize {
	if token.is_empty() {
		return 0;
	}
	let count = text.matches(token).count();
	if count > 0 {
		*text = text.replace(token, value);
	}
	count
}

/// Replace `token` inside every svg `text` element: its own text and tail,
/// and the text and tails of everything nested inside it.
pub fn replace_text(document: &mut SvgDocument, token: &str, value: &str) -> usize {
	if token.is_empty() {
		return 0;
	}
	let mut count = 0;
	document.for_each_match_mut(SVG_NS, ElementKind::Text.tag(), |element, tail| {
		count += replace_in_subtree(element, token, value);
		if let Some(tail) = tail {
			count += replace_in_slot(tail, token, value);
		}
	});
	count
}

fn replace_in_subtree(element: &mut Element, token: &str, value: &str) -> usize {
	let mut count = replace_in_slot(&mut element.text, token, value);
	for child in &mut element.children {
		match &mut child.kind {
			NodeKind::Element(inner) => count += replace_in_subtree(inner, token, value),
			NodeKind::CData(data) => count += replace_flat(data, token, value),
			NodeKind::Comment(_) | NodeKind::ProcessingInstruction(_) => {}
		}
		count += replace_in_slot(&mut child.tail, token, value);
	}
	count
}

fn replace_in_slot(slot: &mut Option<String>, token: &str, value: &str) -> usize {
	slot.as_mut()
		.map_or(0, |text| replace_flat(text, token, value))
}

/// Point every svg `image` whose link file name equals `file_name` at
/// `value` in the same directory, and drop the stale `sodipodi:absref`.
///
/// The new link is written as a `file://` uri. An empty `value` counts as a
/// match but leaves the link untouched.
pub fn replace_image(
	document: &mut SvgDocument,
	file_name: &str,
	value: &str,
	base_dir: &Path,
) -> usize {
	let mut count = 0;
	document.for_each_element_mut(SVG_NS, ElementKind::Image.tag(), |element| {
		let Some((namespace, href)) = image_link(element) else {
			return;
		};
		let Some(link) = link_path(&href) else {
			return;
		};
		if link.file_name().and_then(OsStr::to_str) != Some(file_name) {
			return;
		}

		count += 1;
		if value.is_empty() {
			return;
		}

		let target = absolute(&base_dir.join(link.with_file_name(value)));
		let href = Url::from_file_path(&target)
			.map_or_else(|()| target.to_string_lossy().into_owned(), String::from);
		element.set_attribute(namespace, "href", &href);
		element.remove_attribute(Some(SODIPODI_NS), "absref");
	});
	count
}

/// The link of an image element, preferring `xlink:href` over the svg 2
/// plain `href`.
fn image_link(element: &Element) -> Option<(Option<&'static str>, String)> {
	if let Some(href) = element.attribute(Some(XLINK_NS), "href") {
		return Some((Some(XLINK_NS), href.to_string()));
	}
	element
		.attribute(None, "href")
		.map(|href| (None, href.to_string()))
}

/// Filesystem path of a link. `file:` uris are decoded, other uris such as
/// `data:` and `http:` have none.
fn link_path(href: &str) -> Option<PathBuf> {
	match Url::parse(href) {
		Ok(url) if url.scheme() == "file" => url.to_file_path().ok(),
		// Windows drive letters parse as a one-letter scheme.
		Ok(url) if url.scheme().len() > 1 => None,
		_ => Some(PathBuf::from(href)),
	}
}

fn absolute(path: &Path) -> PathBuf {
	std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
