//! `@import` and `url()` extraction
//!
//! This is not a CSS parser. It walks the source once, skipping comments and
//! string literals, and records the byte ranges of the two constructs the
//! bundler rewrites. Anything it does not understand is left alone.

use std::ops::Range;

/// Quoting style of an import target or url value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Double,
    Single,
    None,
}

impl Quote {
    fn from_byte(byte: u8) -> Self {
        match byte {
            b'\'' => Quote::Single,
            _ => Quote::Double,
        }
    }

    pub fn wrap(&self, value: &str) -> String {
        match self {
            Quote::Double => format!("\"{}\"", value),
            Quote::Single => format!("'{}'", value),
            Quote::None => value.to_string(),
        }
    }
}

/// `@import "target" media;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRule {
    pub target: String,
    /// Media query list, trimmed; empty when absent
    pub media: String,
    /// Whole statement, from `@` through the terminating `;`
    pub span: Range<usize>,
}

/// `url(value)` outside of an `@import`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlReference {
    pub value: String,
    /// Declaration property the url belongs to, lowercased; empty if unknown
    pub property: String,
    pub quote: Quote,
    /// The value itself, without quotes or surrounding whitespace
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssReference {
    Import(ImportRule),
    Url(UrlReference),
}

impl CssReference {
    pub fn span(&self) -> &Range<usize> {
        match self {
            CssReference::Import(rule) => &rule.span,
            CssReference::Url(url) => &url.span,
        }
    }
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn starts_with_ignore_case(&self, at: usize, needle: &str) -> bool {
        self.bytes
            .get(at..at + needle.len())
            .is_some_and(|slice| slice.eq_ignore_ascii_case(needle.as_bytes()))
    }

    fn is_ident_byte(byte: u8) -> bool {
        byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' || byte >= 0x80
    }

    /// Skip a comment starting at `pos`; returns false if there is none
    fn skip_comment(&mut self) -> bool {
        if !self.bytes[self.pos..].starts_with(b"/*") {
            return false;
        }
        self.pos = match self.bytes[self.pos + 2..]
            .windows(2)
            .position(|pair| pair == b"*/")
        {
            Some(end) => self.pos + 2 + end + 2,
            None => self.bytes.len(),
        };
        true
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
                self.pos += 1;
            }
            if !self.skip_comment() {
                break;
            }
        }
    }

    /// Read a quoted string starting at `pos`; returns the content range
    fn read_string(&mut self) -> Option<Range<usize>> {
        let quote = self.peek()?;
        let start = self.pos + 1;
        let mut i = start;

        while let Some(&byte) = self.bytes.get(i) {
            match byte {
                b'\\' => i += 2,
                b'\n' => return None,
                _ if byte == quote => {
                    self.pos = i + 1;
                    return Some(start..i);
                }
                _ => i += 1,
            }
        }

        None
    }

    /// Read the inside of `url(` ... `)` with `pos` just after the `(`
    fn read_url_body(&mut self) -> Option<(Range<usize>, Quote)> {
        self.skip_whitespace_and_comments();

        let (range, quote) = match self.peek()? {
            quote @ (b'"' | b'\'') => (self.read_string()?, Quote::from_byte(quote)),
            _ => {
                let start = self.pos;
                while let Some(byte) = self.peek() {
                    if byte == b')' || byte.is_ascii_whitespace() {
                        break;
                    }
                    if matches!(byte, b'"' | b'\'' | b'(') {
                        return None;
                    }
                    self.pos += 1;
                }
                (start..self.pos, Quote::None)
            }
        };

        self.skip_whitespace_and_comments();
        if self.peek()? != b')' {
            return None;
        }
        self.pos += 1;

        Some((range, quote))
    }

    /// Parse `@import` with `pos` on the `@`
    fn read_import(&mut self) -> Option<ImportRule> {
        let start = self.pos;
        self.pos += "@import".len();
        self.skip_whitespace_and_comments();

        let target = match self.peek()? {
            b'"' | b'\'' => self.read_string()?,
            _ if self.starts_with_ignore_case(self.pos, "url(") => {
                self.pos += "url(".len();
                self.read_url_body()?.0
            }
            _ => return None,
        };

        let media_start = self.pos;
        let mut media_end = media_start;
        let end = loop {
            match self.bytes.get(media_end) {
                Some(b';') => break media_end + 1,
                Some(b'{') | Some(b'}') => return None,
                Some(_) => media_end += 1,
                None => break media_end,
            }
        };

        self.pos = end;

        Some(ImportRule {
            target: self.src[target].trim().to_string(),
            media: self.src[media_start..media_end].trim().to_string(),
            span: start..end,
        })
    }
}

/// Extract every `@import` rule and `url()` reference from a stylesheet, in
/// source order.
pub fn scan(source: &str) -> Vec<CssReference> {
    let mut scanner = Scanner::new(source);
    let mut references = Vec::new();
    let mut declaration_start = 0;
    let mut property = String::new();

    while let Some(byte) = scanner.peek() {
        match byte {
            b'/' if scanner.skip_comment() => {}
            b'"' | b'\'' => {
                if scanner.read_string().is_none() {
                    scanner.pos += 1;
                }
            }
            b'{' | b'}' | b';' => {
                scanner.pos += 1;
                declaration_start = scanner.pos;
                property.clear();
            }
            b':' => {
                let candidate = source[declaration_start..scanner.pos].trim();
                if !candidate.is_empty() && candidate.bytes().all(Scanner::is_ident_byte) {
                    property = candidate.to_ascii_lowercase();
                }
                scanner.pos += 1;
            }
            b'@' if scanner.starts_with_ignore_case(scanner.pos + 1, "import")
                && !scanner
                    .bytes
                    .get(scanner.pos + 7)
                    .is_some_and(|b| Scanner::is_ident_byte(*b)) =>
            {
                let start = scanner.pos;
                match scanner.read_import() {
                    Some(rule) => {
                        references.push(CssReference::Import(rule));
                        declaration_start = scanner.pos;
                        property.clear();
                    }
                    None => scanner.pos = start + 1,
                }
            }
            b'u' | b'U'
                if scanner.starts_with_ignore_case(scanner.pos, "url(")
                    && (scanner.pos == 0
                        || !Scanner::is_ident_byte(scanner.bytes[scanner.pos - 1])) =>
            {
                let start = scanner.pos;
                scanner.pos += "url(".len();
                match scanner.read_url_body() {
                    Some((range, quote)) => references.push(CssReference::Url(UrlReference {
                        value: source[range.clone()].to_string(),
                        property: property.clone(),
                        quote,
                        span: range,
                    })),
                    None => scanner.pos = start + 1,
                }
            }
            _ => scanner.pos += 1,
        }
    }

    references
}

/// Apply replacements to non-overlapping spans, in order
pub fn splice(source: &str, edits: &[(Range<usize>, String)]) -> String {
    let mut output = String::with_capacity(source.len());
    let mut cursor = 0;

    for (span, replacement) in edits {
        output.push_str(&source[cursor..span.start]);
        output.push_str(replacement);
        cursor = span.end;
    }

    output.push_str(&source[cursor..]);
    output
}
