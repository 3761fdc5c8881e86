//! Minimal XML wire layer: an element tree, a writer, and a strict reader.
//!
//! This covers exactly what the administrative protocol puts on the wire:
//! elements, attributes, character data, CDATA, comments, and an optional
//! declaration. DOCTYPE and general entities are rejected; only the five
//! predefined entities and numeric character references are decoded.

use std::fmt;

/// Reader error with the byte offset where parsing stopped.
#[derive(Debug, thiserror::Error)]
#[error("{msg} at byte {pos}")]
pub struct XmlError {
    pub pos: usize,
    pub msg: String,
}

/// One element: name, ordered attributes, character data, and child elements.
///
/// `text` accumulates all character data directly inside the element; for
/// elements with children the interstitial whitespace lands here too and the
/// codec ignores it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: &str) -> Self {
        XmlElement {
            name: name.to_string(),
            ..XmlElement::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        self.attrs.push((name.to_string(), value.to_string()));
    }

    /// Serialize. Attribute order and escaping are stable, an element with no
    /// content is self-closing, text precedes children; equal trees always
    /// produce identical bytes.
    pub fn write(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            escape_into(out, value);
            out.push('"');
        }
        if self.text.is_empty() && self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if !self.text.is_empty() {
            escape_into(out, &self.text);
        }
        for child in &self.children {
            child.write(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write(&mut out);
        out
    }

    /// Parse one document: optional declaration and comments around a single
    /// document element. Anything else after the root is an error.
    pub fn parse(input: &str) -> Result<XmlElement, XmlError> {
        let mut r = Reader { input, pos: 0 };
        r.skip_misc()?;
        let root = r.parse_element()?;
        r.skip_misc()?;
        if r.pos != r.input.len() {
            return Err(r.err("content after document element"));
        }
        Ok(root)
    }
}

impl fmt::Display for XmlElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml())
    }
}

/// True when `s` is acceptable as an element or attribute name.
pub fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

pub fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
}

struct Reader<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn err(&self, msg: &str) -> XmlError {
        XmlError {
            pos: self.pos,
            msg: msg.to_string(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    fn eat(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, s: &str) -> Result<(), XmlError> {
        if self.eat(s) {
            Ok(())
        } else {
            Err(self.err(&format!("expected {:?}", s)))
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    /// Skip whitespace, comments, and declarations outside the root element.
    fn skip_misc(&mut self) -> Result<(), XmlError> {
        loop {
            self.skip_ws();
            if self.starts_with("<?") {
                self.skip_until("?>")?;
            } else if self.starts_with("<!--") {
                self.skip_until("-->")?;
            } else if self.starts_with("<!") {
                return Err(self.err("markup declarations are not supported"));
            } else {
                return Ok(());
            }
        }
    }

    fn skip_until(&mut self, end: &str) -> Result<(), XmlError> {
        match self.rest().find(end) {
            Some(i) => {
                self.pos += i + end.len();
                Ok(())
            }
            None => Err(self.err(&format!("unterminated construct, missing {:?}", end))),
        }
    }

    fn read_name(&mut self) -> Result<String, XmlError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            let c = c as char;
            let ok = if self.pos == start {
                c.is_ascii_alphabetic() || c == '_'
            } else {
                c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
            };
            if !ok {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.err("expected a name"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_element(&mut self) -> Result<XmlElement, XmlError> {
        self.expect("<")?;
        let name = self.read_name()?;
        let mut el = XmlElement::new(&name);

        loop {
            self.skip_ws();
            if self.eat("/>") {
                return Ok(el);
            }
            if self.eat(">") {
                break;
            }
            let attr_name = self.read_name()?;
            self.skip_ws();
            self.expect("=")?;
            self.skip_ws();
            let value = self.read_quoted()?;
            if el.attr(&attr_name).is_some() {
                return Err(self.err(&format!("duplicate attribute {}", attr_name)));
            }
            el.attrs.push((attr_name, value));
        }

        // Content until the matching close tag.
        loop {
            if self.pos >= self.input.len() {
                return Err(self.err(&format!("unexpected end of input inside <{}>", name)));
            }
            if self.eat("</") {
                let close = self.read_name()?;
                self.skip_ws();
                self.expect(">")?;
                if close != el.name {
                    return Err(self.err(&format!(
                        "mismatched close tag </{}> for <{}>",
                        close, el.name
                    )));
                }
                return Ok(el);
            }
            if self.starts_with("<!--") {
                self.skip_until("-->")?;
            } else if self.eat("<![CDATA[") {
                let rest = self.rest();
                let end = rest
                    .find("]]>")
                    .ok_or_else(|| self.err("unterminated CDATA section"))?;
                el.text.push_str(&rest[..end]);
                self.pos += end + 3;
            } else if self.starts_with("<?") {
                self.skip_until("?>")?;
            } else if self.starts_with("<!") {
                return Err(self.err("markup declarations are not supported"));
            } else if self.starts_with("<") {
                el.children.push(self.parse_element()?);
            } else {
                let rest = self.rest();
                let end = rest.find('<').unwrap_or(rest.len());
                let decoded = self.unescape(&rest[..end])?;
                el.text.push_str(&decoded);
                self.pos += end;
            }
        }
    }

    fn read_quoted(&mut self) -> Result<String, XmlError> {
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q as char,
            _ => return Err(self.err("expected a quoted attribute value")),
        };
        self.pos += 1;
        let rest = self.rest();
        let end = rest
            .find(quote)
            .ok_or_else(|| self.err("unterminated attribute value"))?;
        let raw = &rest[..end];
        if raw.contains('<') {
            return Err(self.err("'<' is not allowed in attribute values"));
        }
        let value = self.unescape(raw)?;
        self.pos += end + 1;
        Ok(value)
    }

    fn unescape(&self, raw: &str) -> Result<String, XmlError> {
        if !raw.contains('&') {
            return Ok(raw.to_string());
        }
        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;
        while let Some(i) = rest.find('&') {
            out.push_str(&rest[..i]);
            rest = &rest[i..];
            let end = rest
                .find(';')
                .filter(|&e| e <= 12)
                .ok_or_else(|| self.err("unterminated entity reference"))?;
            let entity = &rest[1..end];
            match entity {
                "lt" => out.push('<'),
                "gt" => out.push('>'),
                "amp" => out.push('&'),
                "quot" => out.push('"'),
                "apos" => out.push('\''),
                _ => {
                    let code = if let Some(hex) = entity.strip_prefix("#x") {
                        u32::from_str_radix(hex, 16).ok()
                    } else if let Some(dec) = entity.strip_prefix('#') {
                        dec.parse::<u32>().ok()
                    } else {
                        None
                    };
                    let c = code
                        .and_then(char::from_u32)
                        .ok_or_else(|| self.err(&format!("unknown entity &{};", entity)))?;
                    out.push(c);
                }
            }
            rest = &rest[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}
