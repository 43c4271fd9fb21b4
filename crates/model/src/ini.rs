//! Line-oriented INI reader.
//!
//! Only what device descriptions need: `[section]` headers, `key=value` or
//! `key: value` lines, `#`/`;` comment lines. Keys may be quoted literals,
//! which can themselves contain delimiters. Duplicate sections and keys are
//! kept as written so the validator can name them.

#[cfg(test)]
#[path = "tests/ini.rs"]
mod tests;

use thiserror::Error;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IniDocument {
    source_name: String,
    sections: Vec<Section>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Section {
    pub name: String,
    /// 1-based line of the header.
    pub line: usize,
    pub entries: Vec<Entry>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entry {
    pub key: String,
    pub value: String,
    pub line: usize,
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("{source_name}:{line}: {kind}")]
pub struct ParseError {
    pub source_name: String,
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum ParseErrorKind {
    #[error("key/value line before the first section header")]
    MissingSectionHeader,

    #[error("section header is missing its closing ']'")]
    UnterminatedHeader,

    #[error("empty section name")]
    EmptySectionName,

    #[error("quoted key is missing its closing '\"'")]
    UnterminatedQuote,

    #[error("expected '=' or ':' between key and value")]
    MissingDelimiter,
}

impl IniDocument {
    pub fn parse(source_name: impl Into<String>, text: &str) -> Result<Self, ParseError> {
        let source_name = source_name.into();
        let mut sections: Vec<Section> = Vec::new();

        for (line, raw) in (1..).zip(text.lines()) {
            let fail = |kind| ParseError {
                source_name: source_name.clone(),
                line,
                kind,
            };

            let trimmed = raw.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            if let Some(header) = trimmed.strip_prefix('[') {
                let name = header
                    .strip_suffix(']')
                    .ok_or_else(|| fail(ParseErrorKind::UnterminatedHeader))?
                    .trim();

                if name.is_empty() {
                    return Err(fail(ParseErrorKind::EmptySectionName));
                }

                sections.push(Section {
                    name: name.to_owned(),
                    line,
                    entries: Vec::new(),
                });
                continue;
            }

            let section = sections
                .last_mut()
                .ok_or_else(|| fail(ParseErrorKind::MissingSectionHeader))?;

            let (key, value) = split_entry(trimmed).map_err(fail)?;

            section.entries.push(Entry {
                key: key.to_owned(),
                value: value.to_owned(),
                line,
            });
        }

        Ok(Self {
            source_name,
            sections,
        })
    }

    #[must_use]
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Sections in declaration order.
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }
}

fn split_entry(line: &str) -> Result<(&str, &str), ParseErrorKind> {
    let key_end = if line.starts_with('"') {
        let close = line[1..]
            .find('"')
            .ok_or(ParseErrorKind::UnterminatedQuote)?;
        close + 2
    } else {
        line.find(['=', ':']).ok_or(ParseErrorKind::MissingDelimiter)?
    };

    let (key, rest) = line.split_at(key_end);
    let rest = rest.trim_start();

    let value = rest
        .strip_prefix(['=', ':'])
        .ok_or(ParseErrorKind::MissingDelimiter)?;

    Ok((key.trim_end(), value.trim()))
}
