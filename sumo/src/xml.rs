//! A minimal owned XML tree for SUMO input files. Element names and attribute keys are kept
//! exactly as written (including any `xsi:` prefixes), attribute order is preserved, and
//! comments survive a load/save cycle. Whitespace-only text between elements is dropped; saving
//! re-indents with two spaces.

use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    /// Comments and processing instructions before the root element
    pub prolog: Vec<Node>,
    pub root: Element,
    /// Comments and processing instructions after the root element
    pub epilog: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new<S: Into<String>>(name: S) -> Element {
        Element {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Element {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Only looks at direct children.
    pub fn has_child(&self, name: &str) -> bool {
        self.child_elements().any(|e| e.name == name)
    }

    /// All elements below this one with a matching name, in document order. This element itself
    /// isn't included.
    pub fn descendants(&self, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for child in self.child_elements() {
            if child.name == name {
                found.push(child);
            }
            child.collect_descendants(name, found);
        }
    }

    /// Visits the same elements as `descendants`, in the same order, with mutable access. A
    /// matching element is visited before anything nested inside it.
    pub fn for_each_descendant_mut<F: FnMut(&mut Element)>(&mut self, name: &str, f: &mut F) {
        for node in &mut self.children {
            if let Node::Element(child) = node {
                if child.name == name {
                    f(child);
                }
                child.for_each_descendant_mut(name, f);
            }
        }
    }

    fn from_start(start: &BytesStart) -> std::result::Result<Element, String> {
        let mut elem = Element::new(utf8(start.name())?);
        for attr in start.attributes() {
            let attr = attr.map_err(|err| err.to_string())?;
            let value = attr.unescaped_value().map_err(|err| err.to_string())?;
            elem.attributes.push((utf8(attr.key)?, utf8(&value)?));
        }
        Ok(elem)
    }
}

impl Document {
    /// Reads and parses an XML file. Anything that isn't well-formed UTF-8 XML with exactly one
    /// root element is `Error::MalformedDocument`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Document> {
        let path = path.as_ref();
        let bytes = fs_err::read(path)?;
        let text = String::from_utf8(bytes).map_err(|err| Error::MalformedDocument {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        Document::parse(&text).map_err(|reason| Error::MalformedDocument {
            path: path.display().to_string(),
            reason,
        })
    }

    pub fn parse(text: &str) -> std::result::Result<Document, String> {
        let mut reader = Reader::from_str(text);
        reader.trim_text(true);
        reader.check_end_names(true);

        let mut tree = TreeBuilder::default();
        let mut buf = Vec::new();
        loop {
            let node = match reader.read_event(&mut buf) {
                Ok(Event::Start(e)) => {
                    tree.open.push(Element::from_start(&e)?);
                    None
                }
                Ok(Event::Empty(e)) => Some(Node::Element(Element::from_start(&e)?)),
                Ok(Event::End(_)) => match tree.open.pop() {
                    Some(elem) => Some(Node::Element(elem)),
                    None => return Err("closing tag without an opening tag".to_string()),
                },
                Ok(Event::Text(e)) => {
                    let text = e.unescaped().map_err(|err| err.to_string())?;
                    Some(Node::Text(utf8(&text)?))
                }
                Ok(Event::CData(e)) => Some(Node::CData(utf8(&e)?)),
                Ok(Event::Comment(e)) => Some(Node::Comment(utf8(&e)?)),
                Ok(Event::PI(e)) => Some(Node::ProcessingInstruction(utf8(&e)?)),
                // The declaration is always rewritten on save
                Ok(Event::Decl(_)) | Ok(Event::DocType(_)) => None,
                Ok(Event::Eof) => break,
                Err(err) => {
                    return Err(format!(
                        "{} at byte {}",
                        err,
                        reader.buffer_position()
                    ))
                }
            };
            if let Some(node) = node {
                tree.attach(node)?;
            }
            buf.clear();
        }
        tree.finish()
    }

    /// Serializes with a leading declaration and two-space indentation.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        write_document(self).map_err(|err| Error::Serialize(err.to_string()))
    }

    /// The output is fully serialized before the file is touched.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        fs_err::write(path.as_ref(), bytes)?;
        Ok(())
    }
}

#[derive(Default)]
struct TreeBuilder {
    prolog: Vec<Node>,
    root: Option<Element>,
    epilog: Vec<Node>,
    open: Vec<Element>,
}

impl TreeBuilder {
    fn attach(&mut self, node: Node) -> std::result::Result<(), String> {
        if let Some(parent) = self.open.last_mut() {
            parent.children.push(node);
            return Ok(());
        }
        match node {
            Node::Element(elem) => {
                if self.root.is_some() {
                    return Err(format!("second root element <{}>", elem.name));
                }
                self.root = Some(elem);
            }
            Node::Text(_) | Node::CData(_) => {
                return Err("text outside of the root element".to_string());
            }
            other => {
                if self.root.is_none() {
                    self.prolog.push(other);
                } else {
                    self.epilog.push(other);
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> std::result::Result<Document, String> {
        if let Some(elem) = self.open.last() {
            return Err(format!("<{}> is never closed", elem.name));
        }
        match self.root {
            Some(root) => Ok(Document {
                prolog: self.prolog,
                root,
                epilog: self.epilog,
            }),
            None => Err("no root element".to_string()),
        }
    }
}

fn write_document(doc: &Document) -> quick_xml::Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new(b"1.0", Some(b"UTF-8"), None)))?;
    for node in &doc.prolog {
        write_node(&mut writer, node)?;
    }
    write_element(&mut writer, &doc.root)?;
    for node in &doc.epilog {
        write_node(&mut writer, node)?;
    }
    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn write_element(writer: &mut Writer<Vec<u8>>, elem: &Element) -> quick_xml::Result<()> {
    let mut start = BytesStart::borrowed_name(elem.name.as_bytes());
    for (key, value) in &elem.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if elem.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for child in &elem.children {
        write_node(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::borrowed(elem.name.as_bytes())))?;
    Ok(())
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) -> quick_xml::Result<()> {
    match node {
        Node::Element(elem) => write_element(writer, elem)?,
        Node::Text(text) => {
            writer.write_event(Event::Text(BytesText::from_plain_str(text)))?;
        }
        Node::CData(text) => {
            writer.write_event(Event::CData(BytesText::from_escaped_str(text.as_str())))?;
        }
        Node::Comment(text) => {
            writer.write_event(Event::Comment(BytesText::from_escaped_str(text.as_str())))?;
        }
        Node::ProcessingInstruction(text) => {
            writer.write_event(Event::PI(BytesText::from_escaped_str(text.as_str())))?;
        }
    }
    Ok(())
}

fn utf8(bytes: &[u8]) -> std::result::Result<String, String> {
    std::str::from_utf8(bytes)
        .map(|s| s.to_string())
        .map_err(|err| err.to_string())
}
