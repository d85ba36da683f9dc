//! HTML fragment parsing and serialization.
//!
//! Markup is tokenized with `quick_xml` in a lenient mode suited to editor
//! content: unquoted and bare attributes, unclosed void elements, stray
//! closing tags and the full set of HTML character references.

use std::borrow::Cow;

use quick_xml::escape::{resolve_html5_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::{Document, NodeId, NodeKind};
use crate::error::{Error, Result};

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Parse `html` into new detached nodes of `doc`, returning the top-level ones.
pub fn parse_fragment(doc: &mut Document, html: &str) -> Result<Vec<NodeId>> {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.allow_dangling_amp = true;

    let mut roots = Vec::new();
    let mut open: Vec<NodeId> = Vec::new();
    // Text and character references arrive as separate events.
    let mut text = String::new();

    loop {
        let event = reader.read_event().map_err(|err| Error::Parse {
            offset: reader.error_position() as usize,
            message: err.to_string(),
        })?;
        match event {
            Event::Text(e) => text.push_str(&e.decode().map_err(|err| parse_error(&reader, err))?),
            Event::CData(e) => text.push_str(&e.decode().map_err(|err| parse_error(&reader, err))?),
            Event::GeneralRef(e) => {
                let name = e.decode().map_err(|err| parse_error(&reader, err))?;
                text.push_str(&decode_entities(&format!("&{name};")));
            }
            event => {
                flush_text(doc, &open, &mut roots, &mut text)?;
                match event {
                    Event::Start(e) => {
                        let node = create_element(doc, &reader, &e)?;
                        attach(doc, &open, &mut roots, node)?;
                        let tag = doc.tag(node).unwrap_or_default();
                        if !is_void(tag) {
                            open.push(node);
                        }
                    }
                    Event::Empty(e) => {
                        let node = create_element(doc, &reader, &e)?;
                        attach(doc, &open, &mut roots, node)?;
                    }
                    Event::End(e) => {
                        let name = tag_name(&reader, e.name().as_ref())?;
                        // Close up to the matching element; stray closers are ignored.
                        if let Some(depth) =
                            open.iter().rposition(|&n| doc.tag(n) == Some(name.as_str()))
                        {
                            open.truncate(depth);
                        }
                    }
                    Event::Eof => break,
                    _ => {}
                }
            }
        }
    }

    Ok(roots)
}

fn parse_error(reader: &Reader<&[u8]>, err: impl std::fmt::Display) -> Error {
    Error::Parse {
        offset: reader.buffer_position() as usize,
        message: err.to_string(),
    }
}

fn tag_name(reader: &Reader<&[u8]>, raw: &[u8]) -> Result<String> {
    let decoded = reader
        .decoder()
        .decode(raw)
        .map_err(|err| parse_error(reader, err))?;
    Ok(decoded.to_ascii_lowercase())
}

fn create_element(doc: &mut Document, reader: &Reader<&[u8]>, start: &BytesStart<'_>) -> Result<NodeId> {
    let node = doc.create_element(&tag_name(reader, start.name().as_ref())?);
    for attr in start.html_attributes() {
        let attr = attr.map_err(|err| parse_error(reader, err))?;
        let key = tag_name(reader, attr.key.as_ref())?;
        let value = attr
            .decode_and_unescape_value_with(reader.decoder(), resolve_html5_entity)
            .map_err(|err| parse_error(reader, err))?;
        doc.set_attribute(node, &key, &value)?;
    }
    Ok(node)
}

fn flush_text(
    doc: &mut Document,
    open: &[NodeId],
    roots: &mut Vec<NodeId>,
    text: &mut String,
) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    let node = doc.create_text(text);
    text.clear();
    attach(doc, open, roots, node)
}

fn attach(doc: &mut Document, open: &[NodeId], roots: &mut Vec<NodeId>, node: NodeId) -> Result<()> {
    match open.last() {
        Some(&parent) => doc.append_child(parent, node),
        None => {
            roots.push(node);
            Ok(())
        }
    }
}

/// Decode named and numeric HTML character references.
///
/// Unknown references are left as written.
pub fn decode_entities(text: &str) -> String {
    match unescape_with(text, resolve_html5_entity) {
        Ok(Cow::Borrowed(_)) => text.to_string(),
        Ok(Cow::Owned(decoded)) => decoded,
        Err(err) => {
            log::debug!("Keeping undecodable text {text:?}: {err}");
            text.to_string()
        }
    }
}

pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\u{a0}', "&nbsp;")
}

pub fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Append the outer HTML of `node` to `out`.
pub(crate) fn write_node(doc: &Document, node: NodeId, out: &mut String) {
    match doc.kind(node) {
        Some(NodeKind::Text(text)) => out.push_str(&escape_text(text)),
        Some(NodeKind::Element(element)) => {
            out.push('<');
            out.push_str(&element.tag);
            if !element.classes.is_empty() {
                out.push_str(" class=\"");
                out.push_str(&escape_attribute(&element.classes.join(" ")));
                out.push('"');
            }
            for (name, value) in &element.attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_attribute(value));
                out.push('"');
            }
            if !element.style.is_empty() {
                out.push_str(" style=\"");
                out.push_str(&escape_attribute(&element.style.to_css()));
                out.push('"');
            }
            out.push('>');
            if is_void(&element.tag) {
                return;
            }
            for &child in doc.children(node) {
                write_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(&element.tag);
            out.push('>');
        }
        None => {}
    }
}
