use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::BadgerError;

/// Placeholder syntax used to find a field's token in templates and
/// destination paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubstMode {
	/// `{{ key }}`
	#[default]
	Jinja,
	/// `%key%`
	Win,
	/// `${key}`
	Shell,
}

impl SubstMode {
	/// The `(prefix, suffix)` pair wrapped around a key.
	pub fn delimiters(self) -> (&'static str, &'static str) {
		match self {
			Self::Jinja => ("{{ ", " }}"),
			Self::Win => ("%", "%"),
			Self::Shell => ("${", "}"),
		}
	}

	pub fn wrap(self, key: &str) -> String {
		let (prefix, suffix) = self.delimiters();
		format!("{prefix}{key}{suffix}")
	}
}

impl fmt::Display for SubstMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Jinja => "jinja",
			Self::Win => "win",
			Self::Shell => "shell",
		};
		f.write_str(name)
	}
}

impl FromStr for SubstMode {
	type Err = BadgerError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"jinja" => Ok(Self::Jinja),
			"win" => Ok(Self::Win),
			"shell" => Ok(Self::Shell),
			other => Err(BadgerError::UnknownSubstMode(other.to_string())),
		}
	}
}

/// Column delimiter of the data file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColMode {
	#[default]
	Comma,
	Semicolon,
	Tab,
}

impl ColMode {
	pub fn delimiter(self) -> u8 {
		match self {
			Self::Comma => b',',
			Self::Semicolon => b';',
			Self::Tab => b'\t',
		}
	}
}

impl fmt::Display for ColMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Comma => "comma",
			Self::Semicolon => "semicolon",
			Self::Tab => "tab",
		};
		f.write_str(name)
	}
}

impl FromStr for ColMode {
	type Err = BadgerError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"comma" => Ok(Self::Comma),
			"semicolon" => Ok(Self::Semicolon),
			"tab" => Ok(Self::Tab),
			other => Err(BadgerError::UnknownColMode(other.to_string())),
		}
	}
}

/// Returns the inner text when `key` is wrapped in `<` and `>`.
///
/// Raw keys opt out of delimiter wrapping and are matched verbatim.
pub fn raw_key(key: &str) -> Option<&str> {
	key.strip_prefix('<')
		.and_then(|rest| rest.strip_suffix('>'))
}

/// Compute the concrete token searched for in documents and filenames.
///
/// ```rust
/// use badger_core::SubstMode;
/// use badger_core::resolve;
///
/// assert_eq!(resolve("name", SubstMode::Jinja), "{{ name }}");
/// assert_eq!(resolve("name", SubstMode::Shell), "${name}");
/// assert_eq!(resolve("<@@name@@>", SubstMode::Win), "@@name@@");
/// ```
pub fn resolve(key: &str, mode: SubstMode) -> String {
	match raw_key(key) {
		Some(inner) => inner.to_string(),
		None => mode.wrap(key),
	}
}

/// Kind of svg element a tree-aware substitution targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
	/// Rendered text content of `<text>` elements and everything nested in
	/// them.
	Text,
	/// The linked file of `<image>` elements.
	Image,
}

impl ElementKind {
	/// Local name of the svg element this kind selects.
	pub fn tag(self) -> &'static str {
		match self {
			Self::Text => "text",
			Self::Image => "image",
		}
	}

	fn from_tag(tag: &str) -> Option<Self> {
		match tag {
			"text" => Some(Self::Text),
			"image" => Some(Self::Image),
			_ => None,
		}
	}
}

impl fmt::Display for ElementKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.tag())
	}
}

/// A data-file column name interpreted for substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
	/// The column name exactly as it appears in the header.
	pub name: String,
	/// Target element kind. Always `None` in flat-string mode.
	pub kind: Option<ElementKind>,
	/// The key left after removing the element-kind selector.
	pub key: String,
}

impl FieldSpec {
	/// Interpret a column name for flat-string substitution. The whole name
	/// is the key.
	pub fn flat(name: &str) -> Self {
		Self {
			name: name.to_string(),
			kind: None,
			key: name.to_string(),
		}
	}

	/// Interpret a column name for tree-aware substitution.
	///
	/// `kind:key` selects an element kind. Names without a known kind prefix
	/// (including raw `<...>` names) select `text` elements with the whole
	/// name as key.
	pub fn tree(name: &str) -> Self {
		if raw_key(name).is_none() {
			if let Some((tag, key)) = name.split_once(':') {
				if let Some(kind) = ElementKind::from_tag(tag) {
					return Self {
						name: name.to_string(),
						kind: Some(kind),
						key: key.to_string(),
					};
				}
			}
		}

		Self {
			name: name.to_string(),
			kind: Some(ElementKind::Text),
			key: name.to_string(),
		}
	}

	/// Token searched for inside the document.
	///
	/// `image` selectors compare against link file names, so their key is
	/// never delimiter-wrapped.
	pub fn document_token(&self, mode: SubstMode) -> String {
		match self.kind {
			Some(ElementKind::Image) => raw_key(&self.key).unwrap_or(&self.key).to_string(),
			Some(ElementKind::Text) | None => resolve(&self.key, mode),
		}
	}

	/// Token searched for inside the destination path template.
	pub fn filename_token(&self, mode: SubstMode) -> String {
		resolve(&self.key, mode)
	}
}
