//! Minimal element tree over quick-xml events.
//!
//! Codebooks are read once and queried by path, so the markup is folded
//! into a small owned tree keyed by local (namespace-free) names.

use crate::error::{MicrodataError, Result};
use quick_xml::{Reader, events::Event};

#[derive(Debug, Clone, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Follow a path of child names, taking the first match at each step
    pub fn find(&self, path: &[&str]) -> Option<&XmlElement> {
        path.iter()
            .try_fold(self, |element, name| element.child(name))
    }

    /// All elements at the end of a path
    pub fn find_all(&self, path: &[&str]) -> Vec<&XmlElement> {
        let mut current = vec![self];
        for name in path {
            current = current
                .into_iter()
                .flat_map(|element| {
                    element
                        .children
                        .iter()
                        .filter(move |child| child.name == *name)
                })
                .collect();
        }
        current
    }

    /// Text at the end of a path, or an empty string
    pub fn text_at(&self, path: &[&str]) -> String {
        self.find(path)
            .map(|element| element.text.clone())
            .unwrap_or_default()
    }
}

/// Parse markup into an element tree rooted at the document element
pub fn parse_document(xml: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                stack.push(element_from_start(&e)?);
            }
            Ok(Event::Empty(e)) => {
                let element = element_from_start(&e)?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::End(_)) => {
                let element = stack.pop().ok_or_else(|| {
                    MicrodataError::malformed("document", "unbalanced closing tag")
                })?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::Text(t)) => {
                if let Some(current) = stack.last_mut() {
                    // Unknown entities in free text are kept verbatim
                    let text = t
                        .unescape()
                        .map(|text| text.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                    append_text(current, &text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(current) = stack.last_mut() {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    append_text(current, &text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(MicrodataError::malformed(
                    "document",
                    format!("XML error at position {}: {}", reader.buffer_position(), e),
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(MicrodataError::malformed(
            "document",
            format!("unclosed element <{}>", stack[stack.len() - 1].name),
        ));
    }

    root.ok_or_else(|| MicrodataError::malformed("document", "no root element found"))
}

fn element_from_start(e: &quick_xml::events::BytesStart) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

    let attributes = e
        .attributes()
        .map(|attr_result| {
            let attr = attr_result.map_err(|err| {
                MicrodataError::malformed(name.clone(), format!("invalid attribute: {}", err))
            })?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| {
                    MicrodataError::malformed(
                        name.clone(),
                        format!("invalid value for attribute {}: {}", key, err),
                    )
                })?
                .into_owned();
            Ok((key, value))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(XmlElement {
        name,
        attributes,
        ..Default::default()
    })
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn append_text(element: &mut XmlElement, text: &str) {
    if text.is_empty() {
        return;
    }
    if !element.text.is_empty() {
        element.text.push(' ');
    }
    element.text.push_str(text);
}
