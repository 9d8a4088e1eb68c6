//! Minimal element reader for annotation blocks.
//!
//! Annotations use an angle-bracket markup with elements, attributes,
//! text and self-closing tags. This reader covers exactly those plus the
//! five basic entities; it is deliberately not a conforming XML
//! implementation, since the annotation format needs nothing more.

use crate::error::SyntaxError;
use crate::lexer::Lexer;

/// One parsed markup element.
///
/// `line` is the 0-based line offset of the open tag within the block, so
/// that `SyntaxError::at` can add the block's own source line.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<Attribute>,
    pub children: Vec<Element>,
    pub text: String,
    pub line: usize,
}

/// A `name="value"` pair on an open tag.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Element {
    /// Value of the named attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// All child elements with the given tag name, in declaration order.
    pub fn children_named<'a, 's>(&'a self, name: &'s str) -> impl Iterator<Item = &'a Element> + use<'a, 's> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First child element with the given tag name.
    pub fn first_child(&self, name: &str) -> Option<&Element> {
        self.children_named(name).next()
    }

    /// Text of the first child with the given tag name, if any.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.first_child(name).map(|c| c.text.as_str())
    }
}

/// Parse one annotation block into its root element.
///
/// Content after the root element's close tag is ignored: an annotation
/// often shares its comment block with ordinary prose.
pub fn parse(data: &[u8]) -> Result<Element, SyntaxError> {
    let mut l = Lexer::new(data);
    l.skip_space(true);
    if !l.try_match("<") {
        return Err(err(&l, "", "expected an element"));
    }
    parse_element(&mut l)
}

/// Parse an element whose `<` has already been consumed.
fn parse_element(l: &mut Lexer) -> Result<Element, SyntaxError> {
    let line = l.line_of(l.pos()) - 1;
    let name = read_name(l);
    if name.is_empty() {
        return Err(err(l, "", "expected a tag name"));
    }

    let mut element = Element {
        name,
        line,
        ..Element::default()
    };

    loop {
        l.skip_space(true);
        if l.try_match("/>") {
            return Ok(element);
        }
        if l.try_match(">") {
            break;
        }
        element.attrs.push(parse_attribute(l, &element.name)?);
    }

    // Open tag consumed; read text and children until the close tag.
    let mut text = String::new();
    loop {
        let chunk = read_text(l);
        text.push_str(&chunk);
        if l.at_eof() {
            return Err(err(l, &element.name, "unexpected end of block"));
        }

        if l.try_match("</") {
            let close = read_name(l);
            if close != element.name {
                return Err(err(
                    l,
                    &element.name,
                    &format!("mismatched close tag `{close}`"),
                ));
            }
            l.skip_space(true);
            if !l.try_match(">") {
                return Err(err(l, &element.name, "malformed close tag"));
            }
            element.text = text.trim().to_string();
            return Ok(element);
        }

        if l.try_match("<") {
            let child = parse_element(l)?;
            element.children.push(child);
        }
    }
}

/// Parse one `name="value"` attribute.
fn parse_attribute(l: &mut Lexer, element: &str) -> Result<Attribute, SyntaxError> {
    let name = read_name(l);
    if name.is_empty() {
        return Err(err(l, element, "expected an attribute name"));
    }
    l.skip_space(true);
    if !l.try_match("=") {
        return Err(err(l, element, &format!("attribute `{name}` needs a value")));
    }
    l.skip_space(true);
    if !l.try_match("\"") {
        return Err(err(l, element, &format!("attribute `{name}` needs a value")));
    }

    let mut value = Vec::new();
    loop {
        match l.next_byte() {
            None => return Err(err(l, element, "unterminated attribute value")),
            Some(b'"') => break,
            Some(b'&') => value.push(read_entity(l) as u8),
            Some(b) => value.push(b),
        }
    }

    Ok(Attribute {
        name,
        value: String::from_utf8_lossy(&value).into_owned(),
    })
}

/// Read a tag or attribute name: letters, digits, `_` and `-`.
fn read_name(l: &mut Lexer) -> String {
    let mut name = String::new();
    while let Some(b) = l.peek() {
        if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' {
            name.push(b as char);
            l.advance(1);
        } else {
            break;
        }
    }
    name
}

/// Accumulate decoded text up to the next tag or EOF.
fn read_text(l: &mut Lexer) -> String {
    let mut text = Vec::new();
    while let Some(b) = l.peek() {
        match b {
            b'<' => break,
            b'&' => {
                l.advance(1);
                text.push(read_entity(l) as u8);
            }
            _ => {
                text.push(b);
                l.advance(1);
            }
        }
    }
    String::from_utf8_lossy(&text).into_owned()
}

/// Decode an entity whose `&` has already been consumed. The decoded set
/// is ASCII only, so the byte cast at the call sites is lossless. An
/// unknown sequence is kept literally.
fn read_entity(l: &mut Lexer) -> char {
    for (entity, ch) in [
        ("lt;", '<'),
        ("gt;", '>'),
        ("amp;", '&'),
        ("quot;", '"'),
        ("apos;", '\''),
    ] {
        if l.try_match(entity) {
            return ch;
        }
    }
    '&'
}

fn err(l: &Lexer, field: &str, message: &str) -> SyntaxError {
    let mut e = SyntaxError::new(field, message);
    e.line = l.line_of(l.pos()) - 1;
    e
}
