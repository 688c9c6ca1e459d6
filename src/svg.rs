//! A small mutable SVG element tree.
//!
//! The renderer builds one of these for every draw, post-processors edit it in place,
//! and [`Element::to_svg_string`] turns it into markup for preview or export.
use core::fmt;

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// One SVG element with ordered attributes and child elements.
///
/// # Example
///
/// ```rust
/// use qistyle::svg::Element;
///
/// let mut svg = Element::new("svg").with_attr("width", "10");
/// svg.append(Element::new("rect").with_attr("id", "bg"));
/// assert!(svg.find_by_id("bg").is_some());
/// assert_eq!(svg.to_svg_string(), r#"<svg width="10"><rect id="bg"/></svg>"#);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder form of [`Element::set_attr`].
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.append(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Sets an attribute, replacing the value in place if it already exists.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter()
    }

    pub fn append(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Inserts `child` before every existing child.
    pub fn prepend(&mut self, child: Element) {
        self.children.insert(0, child);
    }

    /// First descendant (or self) with the given tag name, depth-first in document order.
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.child_elements().find_map(|child| child.find(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Element> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(name))
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        if self.attr("id") == Some(id) {
            return Some(self);
        }
        self.child_elements().find_map(|child| child.find_by_id(id))
    }

    /// Removes every descendant whose `id` equals `id` and returns how many were removed.
    ///
    /// The element itself is never removed, only its descendants.
    pub fn remove_by_id(&mut self, id: &str) -> usize {
        let before = self.children.len();
        self.children.retain(|child| child.attr("id") != Some(id));
        let removed = before - self.children.len();
        removed
            + self
                .children
                .iter_mut()
                .map(|child| child.remove_by_id(id))
                .sum::<usize>()
    }

    /// Number of elements named `name` in this subtree, self included.
    pub fn count(&self, name: &str) -> usize {
        let own = usize::from(self.name == name);
        own + self.child_elements().map(|child| child.count(name)).sum::<usize>()
    }

    /// Serializes the subtree without an XML declaration.
    pub fn to_svg_string(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_to(&mut out);
        out
    }

    /// Serializes the tree as a standalone SVG document.
    pub fn to_document(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = self.write_to(&mut out);
        out.push('\n');
        out
    }

    fn write_to<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        write!(out, "<{}", self.name)?;
        for (key, value) in &self.attributes {
            write!(out, " {}=\"{}\"", key, escape_xml(value))?;
        }
        if self.children.is_empty() {
            return out.write_str("/>");
        }
        out.write_str(">")?;
        for child in &self.children {
            child.write_to(out)?;
        }
        write!(out, "</{}>", self.name)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f)
    }
}

pub fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Formats a coordinate in its shortest form: `20` rather than `20.0`, at most four decimals.
pub fn fmt_num(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = (value * 10_000.0).round() / 10_000.0;
    if rounded == 0.0 {
        // Avoids "-0".
        return "0".to_string();
    }
    rounded.to_string()
}
