//! Whole-file XML tree used by the objective checks.
//!
//! The tree is built with the `quick-xml` pull reader and keeps only what the
//! checks look at: element names, attributes and nesting. Text, comments and
//! processing instructions are checked for well-formedness and then dropped.
//!
//! quick-xml is a lexer, not a conforming parser, so the well-formedness rules
//! it leaves out are enforced here: the `Name` and `Char` productions,
//! placement of the XML and DOCTYPE declarations, `<` in attribute values,
//! `]]>` in character data, and namespace prefixes bound by `xmlns:`.
//!
//! Names are stored the way ElementTree exposes them: a namespaced element or
//! attribute becomes `{uri}local`, and `xmlns` declarations are not kept as
//! attributes.

use encoding_rs::Encoding;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::borrow::Cow;
use std::fmt;

/// A well-formedness failure, positioned like expat reports it
/// (1-based line, 0-based column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ParseFailure {
    fn at(message: impl Into<String>, source: &str, offset: usize) -> Self {
        let (line, column) = line_column(source, offset);
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: line {}, column {}",
            self.message, self.line, self.column
        )
    }
}

impl std::error::Error for ParseFailure {}

fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let mut end = offset.min(source.len());
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    let before = &source[..end];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(nl) => before[nl + 1..].chars().count(),
        None => before.chars().count(),
    };
    (line, column)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Pre-order walk starting at this element.
    pub fn iter(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// First element named `tag` in document order, this element included.
    pub fn find(&self, tag: &str) -> Option<&Element> {
        self.iter().find(|e| e.name == tag)
    }

    /// First direct child named `tag`.
    pub fn find_child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|e| e.name == tag)
    }

    /// First element named `tag` strictly below this element.
    pub fn find_descendant(&self, tag: &str) -> Option<&Element> {
        self.iter().skip(1).find(|e| e.name == tag)
    }

    /// First element below this one named `tag` that carries `attr`, whatever its value.
    pub fn find_with_attribute(&self, tag: &str, attr: &str) -> Option<&Element> {
        self.iter()
            .skip(1)
            .find(|e| e.name == tag && e.has_attribute(attr))
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

impl Document {
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Parse raw file content. A byte-order mark or the `encoding` of the XML
    /// declaration selects the decoder; without either the content must be UTF-8.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Document, ParseFailure> {
        let text = decode(bytes)?;
        Self::parse(&text)
    }

    pub fn parse(source: &str) -> Result<Document, ParseFailure> {
        let source = source.strip_prefix('\u{FEFF}').unwrap_or(source);
        if let Some((offset, _)) = source.char_indices().find(|(_, c)| !is_xml_char(*c)) {
            return Err(ParseFailure::at(
                "not well-formed (invalid token)",
                source,
                offset,
            ));
        }

        let mut reader = Reader::from_str(source);
        reader.config_mut().check_end_names = true;

        let mut open: Vec<Element> = Vec::new();
        let mut scopes: Vec<Vec<(String, String)>> = Vec::new();
        let mut root: Option<Element> = None;
        let mut seen_doctype = false;

        loop {
            let start = reader.buffer_position() as usize;
            let event = reader.read_event().map_err(|e| {
                ParseFailure::at(e.to_string(), source, reader.error_position() as usize)
            })?;
            let offset = reader.buffer_position() as usize;
            let outside_root = open.is_empty();

            match event {
                Event::Start(tag) => {
                    if root.is_some() && outside_root {
                        return Err(ParseFailure::at("junk after document element", source, start));
                    }
                    open.push(open_element(&tag, &mut scopes, source, start)?);
                }
                Event::Empty(tag) => {
                    if root.is_some() && outside_root {
                        return Err(ParseFailure::at("junk after document element", source, start));
                    }
                    let element = open_element(&tag, &mut scopes, source, start)?;
                    scopes.pop();
                    close(element, &mut open, &mut root);
                }
                Event::End(_) => match open.pop() {
                    Some(element) => {
                        scopes.pop();
                        close(element, &mut open, &mut root);
                    }
                    None => {
                        return Err(ParseFailure::at("unexpected end tag", source, start));
                    }
                },
                Event::Text(text) => {
                    if text.windows(3).any(|w| w == b"]]>") {
                        return Err(ParseFailure::at(
                            "not well-formed (invalid token)",
                            source,
                            start,
                        ));
                    }
                    let content = text.unescape().map_err(|e| {
                        ParseFailure::at(format!("undefined entity ({e})"), source, start)
                    })?;
                    if !content.chars().all(is_xml_char) {
                        return Err(ParseFailure::at(
                            "reference to invalid character number",
                            source,
                            start,
                        ));
                    }
                    if outside_root && !content.trim().is_empty() {
                        let message = if root.is_some() {
                            "junk after document element"
                        } else {
                            "syntax error"
                        };
                        return Err(ParseFailure::at(message, source, start));
                    }
                }
                Event::CData(_) => {
                    if outside_root {
                        return Err(ParseFailure::at("syntax error", source, start));
                    }
                }
                Event::Decl(_) => {
                    if start != 0 {
                        return Err(ParseFailure::at(
                            "XML or text declaration not at start of entity",
                            source,
                            start,
                        ));
                    }
                }
                Event::PI(_) => {
                    let target = pi_target(&source[start..offset]);
                    if target.eq_ignore_ascii_case("xml") {
                        return Err(ParseFailure::at(
                            "XML or text declaration not at start of entity",
                            source,
                            start,
                        ));
                    }
                    if !is_name(target) {
                        return Err(ParseFailure::at(
                            "not well-formed (invalid token)",
                            source,
                            start,
                        ));
                    }
                }
                Event::DocType(_) => {
                    if seen_doctype || root.is_some() || !outside_root {
                        return Err(ParseFailure::at("syntax error", source, start));
                    }
                    seen_doctype = true;
                }
                Event::Comment(_) => {}
                Event::Eof => break,
            }
        }

        if !open.is_empty() {
            return Err(ParseFailure::at("unclosed token", source, source.len()));
        }

        root.map(|root| Document { root })
            .ok_or_else(|| ParseFailure::at("no element found", source, source.len()))
    }
}

fn decode(bytes: &[u8]) -> Result<Cow<'_, str>, ParseFailure> {
    let (encoding, body) = if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        (encoding_rs::UTF_8, rest)
    } else if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        (encoding, &bytes[bom_len..])
    } else {
        match declared_encoding(bytes) {
            Some(label) => {
                let encoding = Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
                    ParseFailure {
                        message: format!("unknown encoding '{}'", label),
                        line: 1,
                        column: 0,
                    }
                })?;
                (encoding, bytes)
            }
            None => (encoding_rs::UTF_8, bytes),
        }
    };

    let (text, had_errors) = encoding.decode_without_bom_handling(body);
    if had_errors {
        let offset = text.find('\u{FFFD}').unwrap_or(0);
        return Err(ParseFailure::at(
            "not well-formed (invalid token)",
            &text,
            offset,
        ));
    }
    Ok(text)
}

/// The `encoding` pseudo-attribute of a leading XML declaration, if any.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    if !bytes.starts_with(b"<?xml") {
        return None;
    }
    let mut reader = Reader::from_reader(bytes);
    match reader.read_event() {
        Ok(Event::Decl(decl)) => {
            let label = decl.encoding()?.ok()?;
            Some(String::from_utf8_lossy(&label).into_owned())
        }
        _ => None,
    }
}

fn pi_target(raw: &str) -> &str {
    let inner = raw.trim_start_matches("<?");
    inner
        .split(|c: char| c.is_whitespace() || c == '?')
        .next()
        .unwrap_or("")
}

fn close(element: Element, open: &mut Vec<Element>, root: &mut Option<Element>) {
    match open.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

/// Build an element from its start tag and push its namespace scope.
/// The caller pops the scope when the element closes.
fn open_element(
    tag: &BytesStart<'_>,
    scopes: &mut Vec<Vec<(String, String)>>,
    source: &str,
    offset: usize,
) -> Result<Element, ParseFailure> {
    let invalid = |message: &str| ParseFailure::at(message, source, offset);

    let qname = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
    if !is_qname(&qname) {
        return Err(invalid("not well-formed (invalid token)"));
    }

    let mut bindings = Vec::new();
    let mut raw_attributes = Vec::new();
    for attr in tag.attributes().with_checks(true) {
        let attr = attr.map_err(|e| invalid(&format!("not well-formed ({e})")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        if !is_qname(&key) {
            return Err(invalid("not well-formed (invalid token)"));
        }
        if attr.value.contains(&b'<') {
            return Err(invalid("not well-formed (invalid token)"));
        }
        let value = attr
            .unescape_value()
            .map_err(|e| invalid(&format!("undefined entity ({e})")))?
            .into_owned();
        if !value.chars().all(is_xml_char) {
            return Err(invalid("reference to invalid character number"));
        }

        if key == "xmlns" {
            bindings.push((String::new(), value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            if value.is_empty() {
                return Err(invalid("cannot undeclare a prefix"));
            }
            if prefix == "xmlns" {
                return Err(invalid("reserved prefix (xmlns) must not be declared or undeclared"));
            }
            bindings.push((prefix.to_string(), value));
        } else {
            raw_attributes.push((key, value));
        }
    }
    scopes.push(bindings);

    let name = expand(&qname, scopes, true).ok_or_else(|| invalid("unbound prefix"))?;
    let mut attributes: Vec<(String, String)> = Vec::with_capacity(raw_attributes.len());
    for (key, value) in raw_attributes {
        let key = expand(&key, scopes, false).ok_or_else(|| invalid("unbound prefix"))?;
        if attributes.iter().any(|(k, _)| *k == key) {
            return Err(invalid("duplicate attribute"));
        }
        attributes.push((key, value));
    }

    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
    })
}

/// `{uri}local` for namespaced names, the bare name otherwise. Unprefixed
/// attributes never take the default namespace. `None` for an unbound prefix.
fn expand(qname: &str, scopes: &[Vec<(String, String)>], is_element: bool) -> Option<String> {
    let (prefix, local) = match qname.split_once(':') {
        Some((prefix, local)) => (prefix, local),
        None if !is_element => return Some(qname.to_string()),
        None => ("", qname),
    };
    let uri = if prefix == "xml" {
        XML_NAMESPACE
    } else {
        scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
            .or(if prefix.is_empty() { Some("") } else { None })?
    };
    if uri.is_empty() {
        Some(local.to_string())
    } else {
        Some(format!("{{{}}}{}", uri, local))
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}'
            | '\u{300}'..='\u{36F}'
            | '\u{203F}'..='\u{2040}')
}

/// The XML 1.0 `Name` production.
pub fn is_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_name_start_char) && chars.all(is_name_char)
}

/// A `Name` with at most one colon, not at either end.
fn is_qname(name: &str) -> bool {
    if !is_name(name) {
        return false;
    }
    match name.split_once(':') {
        None => true,
        Some((prefix, local)) => {
            !prefix.is_empty() && !local.is_empty() && !local.contains(':')
        }
    }
}
