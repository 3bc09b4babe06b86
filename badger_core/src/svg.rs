//! An owned, namespace-aware svg tree with `text` / `tail` text placement.
//!
//! Text that directly follows an element's start tag is stored in that
//! element's [`Element::text`]. Text that follows a child's end tag (before
//! the next sibling) is stored in that child's [`Node::tail`]. Rewriting the
//! rendered text of an element therefore means rewriting both.

use std::path::Path;

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::escape::partial_escape;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;

use crate::BadgerError;
use crate::BadgerResult;

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const SODIPODI_NS: &str = "http://sodipodi.sourceforge.net/DTD/sodipodi-0.dtd";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
	/// Qualified name as written, e.g. `xlink:href`.
	pub name: String,
	/// Resolved namespace URI. Unprefixed attributes have none.
	pub namespace: Option<String>,
	/// Unescaped value.
	pub value: String,
}

impl Attribute {
	pub fn local_name(&self) -> &str {
		local_part(&self.name)
	}

	fn is(&self, namespace: Option<&str>, local: &str) -> bool {
		self.namespace.as_deref() == namespace && self.local_name() == local
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
	Element(Element),
	Comment(String),
	ProcessingInstruction(String),
	CData(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
	pub kind: NodeKind,
	/// Text between this node's end and the next sibling.
	pub tail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
	/// Qualified name as written, e.g. `svg:text` or `text`.
	pub name: String,
	/// Resolved namespace URI.
	pub namespace: Option<String>,
	pub attributes: Vec<Attribute>,
	/// Text before the first child.
	pub text: Option<String>,
	pub children: Vec<Node>,
}

impl Element {
	pub fn local_name(&self) -> &str {
		local_part(&self.name)
	}

	/// Whether this element is `local` in `namespace`.
	pub fn is(&self, namespace: &str, local: &str) -> bool {
		self.namespace.as_deref() == Some(namespace) && self.local_name() == local
	}

	pub fn attribute(&self, namespace: Option<&str>, local: &str) -> Option<&str> {
		self.attributes
			.iter()
			.find(|attr| attr.is(namespace, local))
			.map(|attr| attr.value.as_str())
	}

	/// Replace the value of an existing attribute. Returns `false` when the
	/// element has no such attribute.
	pub fn set_attribute(&mut self, namespace: Option<&str>, local: &str, value: &str) -> bool {
		match self
			.attributes
			.iter_mut()
			.find(|attr| attr.is(namespace, local))
		{
			Some(attr) => {
				attr.value = value.to_string();
				true
			}
			None => false,
		}
	}

	pub fn remove_attribute(&mut self, namespace: Option<&str>, local: &str) -> Option<String> {
		let idx = self
			.attributes
			.iter()
			.position(|attr| attr.is(namespace, local))?;
		Some(self.attributes.remove(idx).value)
	}
}

/// A parsed svg template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgDocument {
	/// Raw markup and whitespace before the root element, excluding the xml
	/// declaration.
	prolog: Vec<String>,
	root: Element,
	/// Raw markup and whitespace after the root element.
	epilog: Vec<String>,
}

impl SvgDocument {
	/// Read and parse the template at `path`.
	pub fn load(path: &Path) -> BadgerResult<Self> {
		let source = std::fs::read_to_string(path)?;
		Self::parse_named(&source, &path.display().to_string())
	}

	pub fn parse(source: &str) -> BadgerResult<Self> {
		Self::parse_named(source, "<inline>")
	}

	fn parse_named(source: &str, name: &str) -> BadgerResult<Self> {
		TreeBuilder::new(source).build().map_err(|reason| {
			BadgerError::TemplateParse {
				path: name.to_string(),
				reason,
			}
		})
	}

	pub fn root(&self) -> &Element {
		&self.root
	}

	/// Call `visit` for every `local` element in `namespace`, in document
	/// order. The subtree of a matched element is handed to `visit` as a
	/// whole and not searched further.
	pub fn for_each_element_mut(
		&mut self,
		namespace: &str,
		local: &str,
		mut visit: impl FnMut(&mut Element),
	) {
		self.for_each_match_mut(namespace, local, |element, _| visit(element));
	}

	/// Like [`SvgDocument::for_each_element_mut`], but also hands over the
	/// tail that follows each matched element. The root has no tail.
	pub fn for_each_match_mut(
		&mut self,
		namespace: &str,
		local: &str,
		mut visit: impl FnMut(&mut Element, Option<&mut Option<String>>),
	) {
		if self.root.is(namespace, local) {
			visit(&mut self.root, None);
			return;
		}
		visit_matching(&mut self.root, namespace, local, &mut visit);
	}

	/// Serialize with an xml declaration. No indentation is added because
	/// whitespace inside svg text is significant.
	pub fn to_xml_string(&self) -> String {
		let mut out = String::with_capacity(4096);
		out.push_str(XML_DECLARATION);
		if !self
			.prolog
			.first()
			.is_some_and(|item| item.starts_with(char::is_whitespace))
		{
			out.push('\n');
		}
		for item in &self.prolog {
			out.push_str(item);
		}
		write_element(&mut out, &self.root);
		for item in &self.epilog {
			out.push_str(item);
		}
		out
	}
}

fn visit_matching(
	element: &mut Element,
	namespace: &str,
	local: &str,
	visit: &mut impl FnMut(&mut Element, Option<&mut Option<String>>),
) {
	for node in &mut element.children {
		let Node { kind, tail } = node;
		let NodeKind::Element(child) = kind else {
			continue;
		};
		if child.is(namespace, local) {
			visit(child, Some(tail));
		} else {
			visit_matching(child, namespace, local, visit);
		}
	}
}

fn local_part(name: &str) -> &str {
	name.rsplit_once(':').map_or(name, |(_, local)| local)
}

fn write_element(out: &mut String, element: &Element) {
	out.push('<');
	out.push_str(&element.name);
	for attr in &element.attributes {
		out.push(' ');
		out.push_str(&attr.name);
		out.push_str("=\"");
		out.push_str(&escape(attr.value.as_str()));
		out.push('"');
	}

	if element.text.is_none() && element.children.is_empty() {
		out.push_str("/>");
		return;
	}

	out.push('>');
	if let Some(text) = &element.text {
		out.push_str(&partial_escape(text.as_str()));
	}
	for child in &element.children {
		match &child.kind {
			NodeKind::Element(inner) => write_element(out, inner),
			NodeKind::Comment(comment) => {
				out.push_str("<!--");
				out.push_str(comment);
				out.push_str("-->");
			}
			NodeKind::ProcessingInstruction(pi) => {
				out.push_str("<?");
				out.push_str(pi);
				out.push_str("?>");
			}
			NodeKind::CData(data) => {
				out.push_str("<![CDATA[");
				out.push_str(data);
				out.push_str("]]>");
			}
		}
		if let Some(tail) = &child.tail {
			out.push_str(&partial_escape(tail.as_str()));
		}
	}
	out.push_str("</");
	out.push_str(&element.name);
	out.push('>');
}

/// Builds an [`SvgDocument`] from `quick-xml` events while tracking the
/// in-scope namespace declarations.
struct TreeBuilder<'a> {
	source: &'a str,
	reader: Reader<&'a [u8]>,
	/// One frame of `(prefix, uri)` declarations per open element. The empty
	/// prefix is the default namespace.
	scopes: Vec<Vec<(String, String)>>,
	stack: Vec<Element>,
	prolog: Vec<String>,
	epilog: Vec<String>,
	root: Option<Element>,
}

impl<'a> TreeBuilder<'a> {
	fn new(source: &'a str) -> Self {
		let mut reader = Reader::from_str(source);
		reader.config_mut().trim_text_start = false;
		reader.config_mut().trim_text_end = false;

		Self {
			source,
			reader,
			scopes: Vec::new(),
			stack: Vec::new(),
			prolog: Vec::new(),
			epilog: Vec::new(),
			root: None,
		}
	}

	fn build(mut self) -> Result<SvgDocument, String> {
		let source = self.source;
		loop {
			let start = self.reader.buffer_position() as usize;
			let event = self
				.reader
				.read_event()
				.map_err(|e| format!("{e} (at byte {})", self.reader.error_position()))?;
			let end = self.reader.buffer_position() as usize;
			let raw = source.get(start..end).unwrap_or_default();

			match event {
				Event::Start(e) => {
					let element = self.open_element(&e)?;
					self.stack.push(element);
				}
				Event::Empty(e) => {
					let element = self.open_element(&e)?;
					self.scopes.pop();
					self.attach(NodeKind::Element(element))?;
				}
				Event::End(_) => {
					let element = self
						.stack
						.pop()
						.ok_or_else(|| format!("unexpected closing tag at byte {start}"))?;
					self.scopes.pop();
					self.attach(NodeKind::Element(element))?;
				}
				Event::Text(e) => {
					let text = e.unescape().map_err(|err| err.to_string())?;
					self.push_text(&text, raw);
				}
				Event::CData(_) => {
					let inner = raw
						.strip_prefix("<![CDATA[")
						.and_then(|rest| rest.strip_suffix("]]>"))
						.unwrap_or(raw);
					self.push_markup(NodeKind::CData(inner.to_string()), raw)?;
				}
				Event::Comment(_) => {
					let inner = raw
						.strip_prefix("<!--")
						.and_then(|rest| rest.strip_suffix("-->"))
						.unwrap_or(raw);
					self.push_markup(NodeKind::Comment(inner.to_string()), raw)?;
				}
				Event::PI(_) => {
					let inner = raw
						.strip_prefix("<?")
						.and_then(|rest| rest.strip_suffix("?>"))
						.unwrap_or(raw);
					self.push_markup(NodeKind::ProcessingInstruction(inner.to_string()), raw)?;
				}
				Event::DocType(_) => {
					self.prolog.push(raw.to_string());
				}
				Event::Decl(_) => {}
				Event::Eof => break,
			}
		}

		if let Some(open) = self.stack.last() {
			return Err(format!("missing closing tag for `<{}>`", open.name));
		}

		let root = self
			.root
			.ok_or_else(|| "document has no root element".to_string())?;

		Ok(SvgDocument {
			prolog: self.prolog,
			root,
			epilog: self.epilog,
		})
	}

	/// Create an element from a start tag and push its namespace scope.
	fn open_element(&mut self, start: &BytesStart<'_>) -> Result<Element, String> {
		let name = String::from_utf8_lossy(start.name().as_ref()).to_string();

		let mut raw_attributes = Vec::new();
		let mut declarations = Vec::new();
		for attr in start.attributes() {
			let attr = attr.map_err(|e| e.to_string())?;
			let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
			let value = attr
				.unescape_value()
				.map_err(|e| format!("invalid value for attribute `{key}`: {e}"))?
				.into_owned();

			if key == "xmlns" {
				declarations.push((String::new(), value.clone()));
			} else if let Some(prefix) = key.strip_prefix("xmlns:") {
				declarations.push((prefix.to_string(), value.clone()));
			}
			raw_attributes.push((key, value));
		}
		self.scopes.push(declarations);

		let namespace = match name.split_once(':') {
			Some((prefix, _)) => Some(self.lookup(prefix).ok_or_else(|| {
				format!("undeclared namespace prefix `{prefix}` on `<{name}>`")
			})?),
			None => self.lookup(""),
		};

		let mut attributes = Vec::with_capacity(raw_attributes.len());
		for (key, value) in raw_attributes {
			let namespace = match key.split_once(':') {
				Some(("xmlns", _)) => None,
				Some((prefix, _)) => Some(self.lookup(prefix).ok_or_else(|| {
					format!("undeclared namespace prefix `{prefix}` on attribute `{key}`")
				})?),
				None => None,
			};
			attributes.push(Attribute {
				name: key,
				namespace,
				value,
			});
		}

		Ok(Element {
			name,
			namespace,
			attributes,
			text: None,
			children: Vec::new(),
		})
	}

	fn lookup(&self, prefix: &str) -> Option<String> {
		if prefix == "xml" {
			return Some(XML_NS.to_string());
		}

		self.scopes
			.iter()
			.rev()
			.flat_map(|frame| frame.iter().rev())
			.find(|(declared, _)| declared == prefix)
			.map(|(_, uri)| uri.clone())
			.filter(|uri| !uri.is_empty())
	}

	fn attach(&mut self, kind: NodeKind) -> Result<(), String> {
		if let Some(parent) = self.stack.last_mut() {
			parent.children.push(Node { kind, tail: None });
			return Ok(());
		}

		match kind {
			NodeKind::Element(element) => {
				if self.root.is_some() {
					return Err(format!(
						"second root element `<{}>` after the document root",
						element.name
					));
				}
				self.root = Some(element);
				Ok(())
			}
			_ => Ok(()),
		}
	}

	fn push_markup(&mut self, kind: NodeKind, raw: &str) -> Result<(), String> {
		if self.stack.is_empty() {
			self.outside_root().push(raw.to_string());
			return Ok(());
		}
		self.attach(kind)
	}

	fn push_text(&mut self, text: &str, raw: &str) {
		let Some(parent) = self.stack.last_mut() else {
			self.outside_root().push(raw.to_string());
			return;
		};

		let slot = match parent.children.last_mut() {
			Some(last) => &mut last.tail,
			None => &mut parent.text,
		};
		slot.get_or_insert_with(String::new).push_str(text);
	}

	fn outside_root(&mut self) -> &mut Vec<String> {
		if self.root.is_some() {
			&mut self.epilog
		} else {
			&mut self.prolog
		}
	}
}
