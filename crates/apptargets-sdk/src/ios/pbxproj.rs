//! Reader and writer for the OpenStep-style property list used by
//! `project.pbxproj`.
//!
//! The reader accepts what Xcode and third-party generators emit: dictionaries
//! `{ key = value; }`, arrays `( a, b, )`, quoted and unquoted strings, and both
//! comment styles. Comments are dropped on read. The writer produces Xcode's
//! canonical layout with objects grouped into `/* Begin <isa> section */`
//! blocks, so an unchanged graph serializes to the same bytes every time.

use std::path::Path;

use indexmap::IndexMap;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{is_not, tag, take_until, take_while1},
    character::complete::{char, multispace1},
    combinator::{all_consuming, cut, map, opt, value},
    error::{Error, ErrorKind},
    multi::many0,
    sequence::{delimited, pair, terminated, tuple},
};

use crate::types::TargetsError;

/// A value in a pbxproj document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PbxValue {
    String(String),
    Array(Vec<PbxValue>),
    Object(IndexMap<String, PbxValue>),
}

impl PbxValue {
    pub fn string(value: impl Into<String>) -> Self {
        PbxValue::String(value.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PbxValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PbxValue]> {
        match self {
            PbxValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, PbxValue>> {
        match self {
            PbxValue::Object(map) => Some(map),
            _ => None,
        }
    }
}

const HEADER: &str = "// !$*UTF8*$!\n";

/// Parses a complete pbxproj document. `path` is only used in error messages.
pub fn parse(text: &str, path: &Path) -> Result<IndexMap<String, PbxValue>, TargetsError> {
    let parse_error = |remaining: &str, message: &str| {
        let consumed = &text[..text.len() - remaining.len()];
        let line = consumed.matches('\n').count() + 1;
        TargetsError::Parse {
            path: path.to_path_buf(),
            message: format!("line {line}: {message}"),
        }
    };

    match all_consuming(delimited(ws, pbx_value, ws))(text) {
        Ok((_, PbxValue::Object(root))) => Ok(root),
        Ok(_) => Err(parse_error(text, "top-level value is not a dictionary")),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            Err(parse_error(e.input, &format!("unexpected input ({:?})", e.code)))
        }
        Err(nom::Err::Incomplete(_)) => Err(parse_error("", "unexpected end of input")),
    }
}

fn ws(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), tuple((tag("/*"), take_until("*/"), tag("*/")))),
            value((), pair(tag("//"), opt(is_not("\r\n")))),
        ))),
    )(input)
}

fn pbx_value(input: &str) -> IResult<&str, PbxValue> {
    alt((dictionary, array, map(string, PbxValue::String)))(input)
}

fn dictionary(input: &str) -> IResult<&str, PbxValue> {
    let (input, _) = char('{')(input)?;
    let (input, _) = ws(input)?;
    let (input, entries) = many0(terminated(entry, ws))(input)?;
    let (input, _) = cut(char('}'))(input)?;
    Ok((input, PbxValue::Object(entries.into_iter().collect())))
}

fn entry(input: &str) -> IResult<&str, (String, PbxValue)> {
    let (input, key) = string(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = cut(char('='))(input)?;
    let (input, _) = ws(input)?;
    let (input, item) = cut(pbx_value)(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = cut(char(';'))(input)?;
    Ok((input, (key, item)))
}

fn array(input: &str) -> IResult<&str, PbxValue> {
    let (input, _) = char('(')(input)?;
    let (input, _) = ws(input)?;
    let (input, items) = many0(terminated(pbx_value, tuple((ws, opt(char(',')), ws))))(input)?;
    let (input, _) = cut(char(')'))(input)?;
    Ok((input, PbxValue::Array(items)))
}

fn string(input: &str) -> IResult<&str, String> {
    alt((quoted, map(take_while1(is_unquoted_char), str::to_string)))(input)
}

fn is_unquoted_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_$/:.-+".contains(c)
}

fn quoted(input: &str) -> IResult<&str, String> {
    let (mut rest, _) = char('"')(input)?;
    let mut out = String::new();
    loop {
        let mut chars = rest.chars();
        match chars.next() {
            None => return Err(nom::Err::Failure(Error::new(rest, ErrorKind::Char))),
            Some('"') => return Ok((&rest[1..], out)),
            Some('\\') => {
                let Some(escaped) = chars.next() else {
                    return Err(nom::Err::Failure(Error::new(rest, ErrorKind::Escaped)));
                };
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
                rest = &rest[1 + escaped.len_utf8()..];
            }
            Some(c) => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
}

/// Serializes a document in Xcode's layout.
///
/// The `objects` dictionary is written as isa sections sorted by isa name, with
/// object ids sorted inside each section.
pub fn write(root: &IndexMap<String, PbxValue>) -> String {
    let mut out = String::from(HEADER);
    out.push_str("{\n");
    for (key, item) in root {
        match (key.as_str(), item) {
            ("objects", PbxValue::Object(objects)) => write_objects(&mut out, objects),
            _ => write_entry(&mut out, key, item, 1),
        }
    }
    out.push_str("}\n");
    out
}

fn write_objects(out: &mut String, objects: &IndexMap<String, PbxValue>) {
    let mut sections: IndexMap<&str, Vec<(&String, &PbxValue)>> = IndexMap::new();
    for (id, object) in objects {
        let isa = object
            .as_object()
            .and_then(|props| props.get("isa"))
            .and_then(PbxValue::as_str)
            .unwrap_or("");
        sections.entry(isa).or_default().push((id, object));
    }
    sections.sort_keys();

    out.push_str("\tobjects = {\n");
    for (isa, mut entries) in sections {
        entries.sort_by(|a, b| a.0.cmp(b.0));
        out.push_str(&format!("\n/* Begin {isa} section */\n"));
        for (id, object) in entries {
            write_entry(out, id, object, 2);
        }
        out.push_str(&format!("/* End {isa} section */\n"));
    }
    out.push_str("\t};\n");
}

fn write_entry(out: &mut String, key: &str, item: &PbxValue, depth: usize) {
    out.push_str(&"\t".repeat(depth));
    out.push_str(&quote(key));
    out.push_str(" = ");
    write_value(out, item, depth);
    out.push_str(";\n");
}

fn write_value(out: &mut String, item: &PbxValue, depth: usize) {
    let indent = "\t".repeat(depth);
    match item {
        PbxValue::String(s) => out.push_str(&quote(s)),
        PbxValue::Array(items) => {
            out.push_str("(\n");
            for element in items {
                out.push_str(&indent);
                out.push('\t');
                write_value(out, element, depth + 1);
                out.push_str(",\n");
            }
            out.push_str(&indent);
            out.push(')');
        }
        PbxValue::Object(props) => {
            out.push_str("{\n");
            for (key, value) in props {
                write_entry(out, key, value, depth + 1);
            }
            out.push_str(&indent);
            out.push('}');
        }
    }
}

fn quote(s: &str) -> String {
    let bare = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | '.'));
    if bare {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}
