//! Markup scanner – finds the images a rendered template refers to.
//!
//! The rendering engine needs every image up front, keyed by the exact
//! `src` string used in the markup. This scanner walks the tags of the
//! merged markup and collects `src` attributes of `<img>` elements. It
//! does not build a tree: text, comments and other elements are skipped.
//!
//! It also holds the two passes the engine runs over merged markup before
//! layout: a well-formedness check and `font-family` unquoting.

use std::borrow::Cow;

use crate::error::{Error, Result};

const FONT_FAMILY: &str = "font-family";

/// `src` values of every `<img>` in `markup`, deduplicated, in document order.
/// Character references in attribute values are decoded.
pub fn image_sources(markup: &str) -> Vec<String> {
    let mut scanner = Scanner::new(markup);
    let mut sources: Vec<String> = Vec::new();
    while let Some(tag) = scanner.next_tag() {
        if !tag.name.eq_ignore_ascii_case("img") {
            continue;
        }
        let src = tag
            .attributes
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("src"));
        if let Some((_, src)) = src {
            let src = src.trim().to_string();
            if !src.is_empty() && !sources.contains(&src) {
                sources.push(src);
            }
        }
    }
    sources
}

/// Fail with [`Error::Render`] unless `markup` is well-formed XML.
///
/// A document type declaration is allowed; entities other than the five
/// predefined ones and numeric references are not.
pub fn check_well_formed(markup: &str) -> Result<()> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    roxmltree::Document::parse_with_options(markup, options)
        .map(|_| ())
        .map_err(|e| Error::Render(format!("malformed markup: {e}")))
}

/// Strip the quotes around family names in `font-family` declarations,
/// inline or in `<style>` blocks.
///
/// printpdf re-serializes styles into attributes with quotes escaped as
/// character references and matches the escaped text against font names,
/// so `'Noto Sans SC'` has to reach it as `Noto Sans SC`.
pub fn unquote_font_families(markup: &str) -> Cow<'_, str> {
    // ASCII lowercasing keeps byte offsets.
    let lower = markup.to_ascii_lowercase();
    let mut out = String::new();
    let mut copied = 0;
    let mut search = 0;

    while let Some(found) = lower[search..].find(FONT_FAMILY) {
        let after_name = search + found + FONT_FAMILY.len();
        search = after_name;
        let Some(value) = markup[after_name..].trim_start().strip_prefix(':') else {
            continue;
        };
        let mut pos = markup.len() - value.len();

        loop {
            pos = markup.len() - markup[pos..].trim_start().len();
            let rest = &markup[pos..];
            match rest.chars().next() {
                Some(quote @ ('"' | '\'')) => {
                    let body = &rest[1..];
                    let Some(close) = body.find(|c: char| c == quote || is_value_end(c)) else {
                        break;
                    };
                    if !body[close..].starts_with(quote) {
                        break;
                    }
                    out.push_str(&markup[copied..pos]);
                    out.push_str(&body[..close]);
                    pos += close + 2;
                    copied = pos;
                }
                Some(_) => {
                    let end = rest
                        .find(|c: char| matches!(c, ',' | '"' | '\'') || is_value_end(c))
                        .unwrap_or(rest.len());
                    pos += end;
                }
                None => break,
            }

            let tail = markup[pos..].trim_start();
            match tail.strip_prefix(',') {
                Some(next) => pos = markup.len() - next.len(),
                None => break,
            }
        }
        search = search.max(pos);
    }

    if copied == 0 {
        return Cow::Borrowed(markup);
    }
    out.push_str(&markup[copied..]);
    Cow::Owned(out)
}

fn is_value_end(c: char) -> bool {
    matches!(c, ';' | '}' | '<' | '>' | '\n')
}

/// A start tag with its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Advance to the next start tag, or `None` at end of input.
    fn next_tag(&mut self) -> Option<StartTag> {
        loop {
            let offset = self.rest().find('<')?;
            self.pos += offset;

            if self.starts_with("<!--") {
                self.skip_past("-->");
            } else if self.starts_with("<![CDATA[") {
                self.skip_past("]]>");
            } else if self.starts_with("<!") || self.starts_with("<?") || self.starts_with("</") {
                self.skip_past(">");
            } else {
                self.advance(1);
                let name = self.parse_name();
                if name.is_empty() {
                    continue;
                }
                let attributes = self.parse_attributes();
                return Some(StartTag { name, attributes });
            }
        }
    }

    fn parse_attributes(&mut self) -> Vec<(String, String)> {
        let mut attributes = Vec::new();
        loop {
            self.skip_whitespace();
            if self.eof() {
                break;
            }
            if self.starts_with("/>") {
                self.advance(2);
                break;
            }
            if self.starts_with(">") {
                self.advance(1);
                break;
            }
            let key = self.parse_name();
            if key.is_empty() {
                // Stray character inside the tag.
                self.advance(1);
                continue;
            }
            self.skip_whitespace();
            let value = if self.starts_with("=") {
                self.advance(1);
                self.skip_whitespace();
                self.parse_value()
            } else {
                String::new()
            };
            attributes.push((key, value));
        }
        attributes
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.current_char() {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '.') {
                self.advance(1);
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_value(&mut self) -> String {
        match self.current_char() {
            Some(quote @ ('"' | '\'')) => {
                self.advance(1);
                let start = self.pos;
                let end = self.rest().find(quote).map_or(self.input.len(), |i| self.pos + i);
                let raw = &self.input[start..end];
                self.pos = end;
                self.advance(1);
                decode_entities(raw)
            }
            _ => {
                let start = self.pos;
                while let Some(c) = self.current_char() {
                    if c.is_whitespace() || c == '>' {
                        break;
                    }
                    self.advance(1);
                }
                decode_entities(&self.input[start..self.pos])
            }
        }
    }

    fn skip_past(&mut self, terminator: &str) {
        self.pos = match self.rest().find(terminator) {
            Some(i) => self.pos + i + terminator.len(),
            None => self.input.len(),
        };
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance(1);
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self, n: usize) {
        // Advance by `n` characters (not bytes).
        for _ in 0..n {
            match self.current_char() {
                Some(c) => self.pos += c.len_utf8(),
                None => break,
            }
        }
    }
}

/// Decode the named references the templating engine emits plus numeric
/// references (`&#61;`, `&#x3D;`). Unknown references are left as-is.
fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{00A0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
