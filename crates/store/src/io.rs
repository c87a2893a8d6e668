//! N-Triples reading and writing
//!
//! N-Triples is the line-based subset of Turtle: absolute IRIs, no
//! prefixes, one statement per line. The writer produces canonical
//! N-Triples (also valid Turtle); the reader accepts N-Triples and
//! tolerates Turtle prefix/base directives by skipping them, which covers
//! the graph payloads returned by SPARQL endpoints in practice.

use crate::{Graph, StoreError, StoreResult};
use mirella_model::{Term, Triple};
use std::fmt::Write as _;

/// Serialise a graph as N-Triples
pub fn write_ntriples(graph: &Graph) -> String {
    let mut out = String::new();
    for triple in graph.iter() {
        write_term(&triple.subject, &mut out);
        out.push(' ');
        write_term(&triple.predicate, &mut out);
        out.push(' ');
        write_term(&triple.object, &mut out);
        out.push_str(" .\n");
    }
    out
}

/// Serialise a single term in N-Triples syntax
pub fn write_term(term: &Term, out: &mut String) {
    match term {
        Term::Iri(iri) => {
            let _ = write!(out, "<{}>", iri);
        }
        Term::BlankNode(label) => {
            let _ = write!(out, "_:{}", label);
        }
        Term::Literal(lit) => {
            out.push('"');
            for c in lit.lexical.chars() {
                match c {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    _ => out.push(c),
                }
            }
            out.push('"');
            if let Some(lang) = &lit.language {
                let _ = write!(out, "@{}", lang);
            } else if let Some(dt) = &lit.datatype {
                let _ = write!(out, "^^<{}>", dt);
            }
        }
        Term::Variable(name) => {
            // Variables never occur in ground graphs; emitted for diagnostics only.
            let _ = write!(out, "?{}", name);
        }
    }
}

/// Parse an N-Triples document into a graph
///
/// Blank lines and `#` comments are skipped, as are `@prefix`/`@base`
/// directives (their abbreviation machinery is never needed, because the
/// accepted input only uses absolute IRIs).
pub fn read_ntriples(input: &str) -> StoreResult<Graph> {
    let mut graph = Graph::new();

    for (idx, raw_line) in input.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('@') {
            continue;
        }

        let line_no = idx + 1;
        let mut scanner = Scanner::new(line, line_no);

        let subject = scanner.term()?;
        let predicate = scanner.term()?;
        let object = scanner.term()?;
        scanner.end_of_statement()?;

        graph
            .insert(Triple::new(subject, predicate, object))
            .map_err(|e| StoreError::Syntax {
                line: line_no,
                message: e.to_string(),
            })?;
    }

    Ok(graph)
}

/// Single-line N-Triples scanner
struct Scanner<'a> {
    rest: &'a str,
    line: usize,
}

impl<'a> Scanner<'a> {
    fn new(line: &'a str, line_no: usize) -> Self {
        Self {
            rest: line,
            line: line_no,
        }
    }

    fn error(&self, message: impl Into<String>) -> StoreError {
        StoreError::Syntax {
            line: self.line,
            message: message.into(),
        }
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn term(&mut self) -> StoreResult<Term> {
        self.skip_ws();
        if let Some(rest) = self.rest.strip_prefix('<') {
            let end = rest
                .find('>')
                .ok_or_else(|| self.error("unterminated IRI"))?;
            let iri = &rest[..end];
            self.rest = &rest[end + 1..];
            Ok(Term::iri(iri))
        } else if let Some(rest) = self.rest.strip_prefix("_:") {
            let end = rest
                .find(|c: char| c.is_whitespace())
                .unwrap_or(rest.len());
            let label = &rest[..end];
            if label.is_empty() {
                return Err(self.error("empty blank node label"));
            }
            self.rest = &rest[end..];
            Ok(Term::blank(label))
        } else if self.rest.starts_with('"') {
            self.literal()
        } else {
            Err(self.error(format!("unexpected token: {}", self.rest)))
        }
    }

    fn literal(&mut self) -> StoreResult<Term> {
        let body = &self.rest[1..];
        let mut lexical = String::new();
        let mut chars = body.char_indices();
        let mut closed_at = None;

        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    closed_at = Some(i);
                    break;
                }
                '\\' => {
                    let (_, esc) = chars
                        .next()
                        .ok_or_else(|| self.error("dangling escape in literal"))?;
                    match esc {
                        't' => lexical.push('\t'),
                        'n' => lexical.push('\n'),
                        'r' => lexical.push('\r'),
                        '"' => lexical.push('"'),
                        '\\' => lexical.push('\\'),
                        'u' | 'U' => {
                            let len = if esc == 'u' { 4 } else { 8 };
                            let mut code = String::with_capacity(len);
                            for _ in 0..len {
                                let (_, h) = chars
                                    .next()
                                    .ok_or_else(|| self.error("truncated unicode escape"))?;
                                code.push(h);
                            }
                            let value = u32::from_str_radix(&code, 16)
                                .map_err(|_| self.error("invalid unicode escape"))?;
                            let c = char::from_u32(value)
                                .ok_or_else(|| self.error("invalid unicode code point"))?;
                            lexical.push(c);
                        }
                        other => return Err(self.error(format!("unknown escape: \\{}", other))),
                    }
                }
                _ => lexical.push(c),
            }
        }

        let closed_at = closed_at.ok_or_else(|| self.error("unterminated literal"))?;
        self.rest = &body[closed_at + 1..];

        if let Some(rest) = self.rest.strip_prefix('@') {
            let end = rest
                .find(|c: char| c.is_whitespace())
                .unwrap_or(rest.len());
            let lang = &rest[..end];
            if lang.is_empty() {
                return Err(self.error("empty language tag"));
            }
            self.rest = &rest[end..];
            Ok(Term::literal_lang(&lexical, lang))
        } else if let Some(rest) = self.rest.strip_prefix("^^<") {
            let end = rest
                .find('>')
                .ok_or_else(|| self.error("unterminated datatype IRI"))?;
            let datatype = &rest[..end];
            self.rest = &rest[end + 1..];
            Ok(Term::literal_typed(&lexical, datatype))
        } else {
            Ok(Term::literal(&lexical))
        }
    }

    fn end_of_statement(&mut self) -> StoreResult<()> {
        self.skip_ws();
        match self.rest.strip_prefix('.') {
            Some(rest) if rest.trim().is_empty() => Ok(()),
            _ => Err(self.error("statement must end with '.'")),
        }
    }
}
