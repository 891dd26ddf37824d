//! The ER7 ("pipe and hat") wire format.
//!
//! Segments are separated by carriage returns (line feeds are accepted too). Within a
//! segment the delimiters come from MSH-1 and MSH-2:
//!
//! ```text
//! MSH|^~\&|...
//!    │││││
//!    ││││└ sub-component
//!    │││└─ escape
//!    ││└── repetition
//!    │└─── component
//!    └──── field
//! ```
//!
//! Delimiters inside values travel as `\F\ \S\ \T\ \R\ \E\`. Other escape sequences
//! (highlighting, hex data, formatting commands) are kept verbatim in the decoded text. An
//! escaped escape character that would read as one of those stays as `\E\`.

use serde::Serialize;

use crate::error::{Hl7Error, Hl7Result};
use crate::model::{Component, Field, RawSegment, Repetition};

/// The five delimiters of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EncodingCharacters {
    pub field: char,
    pub component: char,
    pub repetition: char,
    pub escape: char,
    pub subcomponent: char,
}

impl Default for EncodingCharacters {
    fn default() -> Self {
        EncodingCharacters {
            field: '|',
            component: '^',
            repetition: '~',
            escape: '\\',
            subcomponent: '&',
        }
    }
}

impl EncodingCharacters {
    /// Reads the delimiters from the start of an MSH segment. MSH-2 may omit the escape and
    /// sub-component characters, which then keep their defaults.
    pub fn from_msh(segment: &str) -> Hl7Result<Self> {
        let mut chars = segment.strip_prefix("MSH").map(str::chars).ok_or_else(|| {
            Hl7Error::MissingHeader(segment.chars().take(3).collect())
        })?;
        let field = chars
            .next()
            .ok_or_else(|| Hl7Error::InvalidEncodingCharacters(segment.to_string()))?;
        let declared: Vec<char> = chars.take_while(|c| *c != field).collect();
        if !(2..=4).contains(&declared.len()) {
            return Err(Hl7Error::InvalidEncodingCharacters(
                declared.into_iter().collect(),
            ));
        }

        let defaults = EncodingCharacters::default();
        let encoding = EncodingCharacters {
            field,
            component: declared[0],
            repetition: declared[1],
            escape: declared.get(2).copied().unwrap_or(defaults.escape),
            subcomponent: declared.get(3).copied().unwrap_or(defaults.subcomponent),
        };
        if !encoding.all_distinct() || field.is_alphanumeric() {
            return Err(Hl7Error::InvalidEncodingCharacters(
                declared.into_iter().collect(),
            ));
        }
        Ok(encoding)
    }

    /// MSH-2 as it is written on the wire.
    pub fn msh2(&self) -> String {
        [self.component, self.repetition, self.escape, self.subcomponent]
            .into_iter()
            .collect()
    }

    fn all_distinct(&self) -> bool {
        let all = [
            self.field,
            self.component,
            self.repetition,
            self.escape,
            self.subcomponent,
        ];
        all.iter()
            .enumerate()
            .all(|(i, c)| !all[i + 1..].contains(c))
    }
}

/// Splits a message into segment strings, skipping blank lines.
pub fn split_segments(message: &str) -> impl Iterator<Item = &str> {
    message
        .split(['\r', '\n'])
        .filter(|segment| !segment.trim().is_empty())
}

/// Decodes one segment into its name and fields, field 1 first.
///
/// For MSH, field 1 is the field separator and field 2 the encoding characters, both kept
/// verbatim.
pub fn parse_segment(segment: &str, encoding: &EncodingCharacters) -> Hl7Result<RawSegment> {
    let name = segment.get(..3).unwrap_or(segment);
    let valid_name = name.len() == 3
        && name
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
    let rest = &segment[name.len()..];
    if !valid_name || !(rest.is_empty() || rest.starts_with(encoding.field)) {
        return Err(Hl7Error::InvalidSegmentName(segment.chars().take(10).collect()));
    }

    let mut fields = Vec::new();
    let mut values = rest.split(encoding.field).skip(1);
    if name == "MSH" {
        fields.push(Field::verbatim(encoding.field));
        fields.push(Field::verbatim(values.next().unwrap_or_default()));
    }
    fields.extend(values.map(|value| parse_field(value, encoding)));

    Ok(RawSegment {
        name: name.to_string(),
        fields,
    })
}

/// Decodes one field value. An empty value has no repetitions, and trailing empty
/// repetitions are dropped.
pub fn parse_field(value: &str, encoding: &EncodingCharacters) -> Field {
    let mut repetitions: Vec<Repetition> = value
        .split(encoding.repetition)
        .map(|rep| {
            Repetition::new(
                rep.split(encoding.component)
                    .map(|component| {
                        Component::new(
                            component
                                .split(encoding.subcomponent)
                                .map(|sub| unescape(sub, encoding))
                                .collect(),
                        )
                    })
                    .collect(),
            )
        })
        .collect();
    while repetitions.last().is_some_and(Repetition::is_empty) {
        repetitions.pop();
    }
    Field::new(repetitions)
}

/// Encodes a segment; trailing empty fields, components and sub-components are omitted.
pub fn encode_segment<'f>(
    name: &str,
    fields: impl Iterator<Item = &'f Field>,
    encoding: &EncodingCharacters,
) -> String {
    let fields: Vec<&Field> = fields.collect();
    let (leading, values): (String, &[&Field]) = if name == "MSH" {
        let msh2 = fields
            .get(1)
            .and_then(|f| f.repetitions().first())
            .and_then(|r| r.components().first())
            .and_then(|c| c.subcomponents().first())
            .cloned()
            .unwrap_or_else(|| encoding.msh2());
        (
            format!("MSH{}{}", encoding.field, msh2),
            fields.get(2..).unwrap_or_default(),
        )
    } else {
        (name.to_string(), &fields[..])
    };

    let mut encoded: Vec<String> = values.iter().map(|f| encode_field(f, encoding)).collect();
    while encoded.last().is_some_and(String::is_empty) {
        encoded.pop();
    }

    let mut out = leading;
    for value in encoded {
        out.push(encoding.field);
        out.push_str(&value);
    }
    out
}

pub fn encode_field(field: &Field, encoding: &EncodingCharacters) -> String {
    join_trimmed(
        field
            .repetitions()
            .iter()
            .map(|rep| encode_repetition(rep, encoding)),
        encoding.repetition,
    )
}

pub fn encode_repetition(repetition: &Repetition, encoding: &EncodingCharacters) -> String {
    join_trimmed(
        repetition.components().iter().map(|component| {
            join_trimmed(
                component
                    .subcomponents()
                    .iter()
                    .map(|sub| escape(sub, encoding)),
                encoding.subcomponent,
            )
        }),
        encoding.component,
    )
}

fn join_trimmed(parts: impl Iterator<Item = String>, separator: char) -> String {
    let mut parts: Vec<String> = parts.collect();
    while parts.last().is_some_and(String::is_empty) {
        parts.pop();
    }
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push(separator);
        }
        out.push_str(part);
    }
    out
}

/// Replaces delimiter escape sequences with the delimiters they stand for.
///
/// An escaped escape character decodes to the bare character, unless the text after it
/// would spell a preserved sequence. It then stays as `\E\` so that [`escape`] can tell it
/// apart from a real formatting command.
pub fn unescape(text: &str, encoding: &EncodingCharacters) -> String {
    if !text.contains(encoding.escape) {
        return text.to_string();
    }
    let tokens = decode_tokens(text, encoding);
    let starts_sequence = |token: &Decoded| match token {
        Decoded::Char(c) => *c == encoding.escape,
        Decoded::Escape | Decoded::Kept(_) => true,
    };
    let mut out = String::with_capacity(text.len());
    for (index, token) in tokens.iter().enumerate() {
        match token {
            Decoded::Char(c) => out.push(*c),
            Decoded::Kept(sequence) => out.push_str(sequence),
            Decoded::Escape => {
                let following = &tokens[index + 1..];
                let body_len = following.iter().take_while(|t| !starts_sequence(*t)).count();
                let closed = body_len < following.len();
                let body: String = following[..body_len]
                    .iter()
                    .filter_map(|t| match t {
                        Decoded::Char(c) => Some(*c),
                        _ => None,
                    })
                    .collect();
                out.push(encoding.escape);
                if closed && is_kept_body(&body, encoding) {
                    out.push('E');
                    out.push(encoding.escape);
                }
            }
        }
    }
    out
}

enum Decoded<'a> {
    Char(char),
    /// `\E\`
    Escape,
    /// A non-delimiter sequence, escape characters included.
    Kept(&'a str),
}

fn decode_tokens<'a>(text: &'a str, encoding: &EncodingCharacters) -> Vec<Decoded<'a>> {
    let esc = encoding.escape.len_utf8();
    let mut tokens = Vec::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(encoding.escape) {
        tokens.extend(rest[..start].chars().map(Decoded::Char));
        let after = &rest[start + esc..];
        let Some(end) = after.find(encoding.escape) else {
            tokens.extend(rest[start..].chars().map(Decoded::Char));
            return tokens;
        };
        let sequence = &after[..end];
        tokens.push(match delimiter_for(sequence, encoding) {
            Some(c) if c == encoding.escape => Decoded::Escape,
            Some(c) => Decoded::Char(c),
            None => Decoded::Kept(&rest[start..start + esc + end + esc]),
        });
        rest = &after[end + esc..];
    }
    tokens.extend(rest.chars().map(Decoded::Char));
    tokens
}

/// Escapes delimiters in a value. Formatting and hex sequences that [`unescape`] preserved
/// are written back unchanged.
pub fn escape(text: &str, encoding: &EncodingCharacters) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        if c == encoding.escape {
            if let Some(len) = preserved_sequence(rest, encoding) {
                out.push_str(&rest[..len]);
                rest = &rest[len..];
                continue;
            }
        }
        match sequence_for(c, encoding) {
            Some(code) => {
                out.push(encoding.escape);
                out.push(code);
                out.push(encoding.escape);
            }
            None => out.push(c),
        }
        rest = &rest[c.len_utf8()..];
    }
    out
}

fn delimiter_for(sequence: &str, encoding: &EncodingCharacters) -> Option<char> {
    match sequence {
        "F" => Some(encoding.field),
        "S" => Some(encoding.component),
        "T" => Some(encoding.subcomponent),
        "R" => Some(encoding.repetition),
        "E" => Some(encoding.escape),
        _ => None,
    }
}

fn sequence_for(c: char, encoding: &EncodingCharacters) -> Option<char> {
    if c == encoding.field {
        Some('F')
    } else if c == encoding.component {
        Some('S')
    } else if c == encoding.subcomponent {
        Some('T')
    } else if c == encoding.repetition {
        Some('R')
    } else if c == encoding.escape {
        Some('E')
    } else {
        None
    }
}

/// Byte length of a sequence at the start of `text` that [`escape`] writes back verbatim:
/// a non-delimiter sequence, or the `\E\` kept by [`unescape`].
fn preserved_sequence(text: &str, encoding: &EncodingCharacters) -> Option<usize> {
    let esc = encoding.escape.len_utf8();
    let body = text.get(esc..)?;
    let end = body.find(encoding.escape)?;
    let sequence = &body[..end];
    is_kept_body(sequence, encoding).then_some(esc + end + esc)
}

fn is_kept_body(sequence: &str, encoding: &EncodingCharacters) -> bool {
    let is_hex = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit());
    match sequence.chars().next() {
        Some('E' | 'H' | 'N') => sequence.len() == 1,
        Some('X' | 'C' | 'M') => is_hex(&sequence[1..]),
        Some('.') => {
            sequence.len() > 1
                && sequence[1..]
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'-')
        }
        Some('Z') => {
            sequence.len() > 1 && !sequence.contains(|c| sequence_for(c, encoding).is_some())
        }
        _ => false,
    }
}
