//! SAT (Standard ACIS Text) record layer.
//!
//! Physical lines are merged into logical records terminated by `#`:
//!
//! ```text
//! body $-1 -1 $-1 $1 $-1 $2 #
//! -5 lump $-1 -1 $-1 $-1 $3 $0 #
//! ```
//!
//! A record starting with `-<N>` continues numbering at N. Tokens are split
//! on whitespace; `$<n>` is a pointer and `$-1` the null pointer. All other
//! tokens stay untyped until an entity layout reads them.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::entities::{DataExporter, DataLoader, WireFormat};
use crate::error::{AcisError, Result};
use crate::graph::EntityId;
use crate::header::AcisHeader;
use crate::record::{RawToken, Record, RecordPtr, RecordSet};
use crate::version::{self, Features, END_OF_ACIS_DATA};
use crate::Vec3;

/// A SAT token.
#[derive(Debug, Clone, PartialEq)]
pub enum SatToken {
    /// Pointer token (`$12`, `$-1`).
    Ptr(RecordPtr),
    /// Any other token, typed by the reader.
    Text(String),
}

impl SatToken {
    /// Parse one whitespace-separated token.
    pub fn parse(token: &str) -> Result<Self> {
        match token.strip_prefix('$') {
            Some(num) => {
                let value = num.parse::<i64>().map_err(|_| {
                    AcisError::parsing(None, format!("invalid pointer token: {token}"))
                })?;
                Ok(Self::Ptr(RecordPtr::new(value)?))
            }
            None => Ok(Self::Text(token.to_string())),
        }
    }

    fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

impl RawToken for SatToken {
    fn as_ptr(&self) -> Option<RecordPtr> {
        match self {
            Self::Ptr(ptr) => Some(*ptr),
            Self::Text(_) => None,
        }
    }
}

impl std::fmt::Display for SatToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ptr(ptr) => write!(f, "{ptr}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A SAT record.
pub type SatRecord = Record<SatToken>;

/// A parsed SAT file: header plus pointer-checked records.
pub type SatDocument = RecordSet<SatToken>;

/// Format a double in trimmed general notation.
///
/// Integral values print without a fraction, very small or very large
/// magnitudes use an exponent. The output always parses back to the same
/// value; positive infinity is written as `I`.
pub fn format_double(value: f64) -> String {
    if value == f64::INFINITY {
        return "I".to_string();
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && magnitude.is_finite() && !(1e-4..1e16).contains(&magnitude) {
        format!("{value:e}")
    } else {
        format!("{value}")
    }
}

/// Parse a SAT double, `I` is positive infinity.
pub fn parse_double(token: &str) -> Option<f64> {
    if token == "I" {
        Some(f64::INFINITY)
    } else {
        token.parse().ok()
    }
}

/// Merge physical lines into logical records, stopping at an end marker.
///
/// A record left without its closing `#` is an error.
fn merge_record_lines<S: AsRef<str>>(lines: &[S]) -> Result<Vec<String>> {
    let mut records = Vec::new();
    let mut current = String::new();
    for line in lines {
        let line = line.as_ref().trim_end();
        if version::is_end_marker(line.trim_start()) {
            break;
        }
        if line.is_empty() {
            continue;
        }
        current.push_str(line);
        if current.ends_with('#') {
            records.push(std::mem::take(&mut current));
        } else {
            current.push(' ');
        }
    }
    if !current.trim().is_empty() {
        return Err(AcisError::parsing(
            None,
            format!("unterminated record: {}", current.trim_end()),
        ));
    }
    Ok(records)
}

/// Split merged record strings into numbered SAT records.
fn parse_records(merged: &[String], version: i32) -> Result<Vec<SatRecord>> {
    let mut records = Vec::with_capacity(merged.len());
    let mut num = 0usize;
    for text in merged {
        let mut tokens: Vec<&str> = text.split_whitespace().collect();
        // drop the end-of-record marker, possibly glued to the last token
        if let Some(last) = tokens.pop() {
            let rest = last.trim_end_matches('#');
            if !rest.is_empty() {
                tokens.push(rest);
            }
        }
        if let Some(first) = tokens.first() {
            if let Some(digits) = first.strip_prefix('-') {
                num = digits.parse().map_err(|_| {
                    AcisError::parsing(Some(num), format!("invalid record number: {first}"))
                })?;
                tokens.remove(0);
            }
        }
        records.push(build_record(num, &tokens, version)?);
        num += 1;
    }
    Ok(records)
}

fn build_record(num: usize, tokens: &[&str], version: i32) -> Result<SatRecord> {
    let (name, attr, rest) = match tokens {
        [name, attr, rest @ ..] => (*name, *attr, rest),
        _ => return Err(AcisError::parsing(Some(num), "incomplete record")),
    };
    let attr = match SatToken::parse(attr).map_err(|e| e.in_record(num))? {
        SatToken::Ptr(ptr) => ptr,
        SatToken::Text(t) => {
            return Err(AcisError::parsing(
                Some(num),
                format!("expected attribute pointer, got '{t}'"),
            ))
        }
    };
    let (id, data) = if version >= Features::ENTITY_TAGS {
        match rest {
            [id, data @ ..] => {
                let id = id.parse().map_err(|_| {
                    AcisError::parsing(Some(num), format!("expected entity id, got '{id}'"))
                })?;
                (id, data)
            }
            [] => return Err(AcisError::parsing(Some(num), "missing entity id")),
        }
    } else {
        (-1, rest)
    };
    let data = data
        .iter()
        .map(|t| SatToken::parse(t))
        .collect::<Result<Vec<_>>>()
        .map_err(|e| e.in_record(num))?;
    Ok(Record {
        num,
        name: name.to_string(),
        attr,
        id,
        data,
    })
}

/// Field value produced by [`SatDocument::parse_data`].
#[derive(Debug, Clone, PartialEq)]
pub enum SatField {
    /// `f` field.
    Float(f64),
    /// `i` field.
    Int(i64),
    /// `s` string constant or `@` user string.
    Str(String),
    /// Pointer field, holds the target record number.
    Entity(usize),
}

impl RecordSet<SatToken> {
    /// Parse SAT content given as one string.
    pub fn parse_str(content: &str) -> Result<Self> {
        let lines: Vec<&str> = content.lines().collect();
        Self::parse(&lines)
    }

    /// Parse SAT content given as lines.
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Result<Self> {
        let (header, consumed) = AcisHeader::parse_sat(lines)?;
        let merged = merge_record_lines(&lines[consumed..])?;
        let records = parse_records(&merged, header.version)?;
        debug!(
            version = header.version,
            records = records.len(),
            "parsed SAT records"
        );
        Self::new(header, records)
    }

    /// Serialize header, records and the end marker as lines.
    pub fn dump(&self) -> Vec<String> {
        let version = self.header.version;
        let mut lines = self.header.dumps();
        lines.reserve(self.records().len() + 1);
        for record in self.records() {
            let mut tokens = vec![record.name.clone(), record.attr.to_string()];
            if version >= Features::ENTITY_TAGS {
                tokens.push(record.id.to_string());
            }
            tokens.extend(record.data.iter().map(ToString::to_string));
            tokens.push("#".to_string());
            lines.push(tokens.join(" "));
        }
        lines.push(END_OF_ACIS_DATA.to_string());
        lines
    }

    /// Read `record` against a `;`-separated field format.
    ///
    /// Field codes: `f` float (`I` is infinity), `i` integer, `s` string
    /// constant, `@` length-prefixed user string, `?` skip one token. Any
    /// other code names the expected type of the next pointer; pointers to
    /// other types are passed over. Reading stops once every field is
    /// consumed.
    pub fn parse_data(&self, record: &SatRecord, format: &str) -> Result<Vec<SatField>> {
        let mut fields: VecDeque<&str> = format.split(';').collect();
        let mut content = Vec::new();
        let mut tokens = record.data.iter();
        while let Some(token) = tokens.next() {
            let Some(&expected) = fields.front() else {
                break;
            };
            match token {
                SatToken::Ptr(ptr) => {
                    if let Some(target) = self.resolve(*ptr) {
                        if target.name == expected {
                            content.push(SatField::Entity(target.num));
                            fields.pop_front();
                        }
                    }
                }
                SatToken::Text(text) => {
                    fields.pop_front();
                    match expected {
                        "f" => content.push(SatField::Float(parse_double(text).ok_or_else(
                            || {
                                AcisError::parsing(
                                    Some(record.num),
                                    format!("expected a float: '{text}' in {}", record.name),
                                )
                            },
                        )?)),
                        "i" => content.push(SatField::Int(text.parse().map_err(|_| {
                            AcisError::parsing(
                                Some(record.num),
                                format!("expected an int: '{text}' in {}", record.name),
                            )
                        })?)),
                        "s" => content.push(SatField::Str(text.clone())),
                        "@" => {
                            let length = user_string_length(text).ok_or_else(|| {
                                AcisError::parsing(
                                    Some(record.num),
                                    format!("expected a length prefix: '{text}'"),
                                )
                            })?;
                            let words = tokens.by_ref().map(ToString::to_string);
                            content.push(SatField::Str(collect_user_string(words, length)));
                        }
                        "?" => {}
                        other => {
                            return Err(AcisError::parsing(
                                Some(record.num),
                                format!("expected field '{other}' not found in {}", record.name),
                            ))
                        }
                    }
                }
            }
        }
        Ok(content)
    }
}

fn user_string_length(token: &str) -> Option<usize> {
    token.strip_prefix('@')?.parse().ok()
}

/// Join whitespace-split words until `length` characters are collected.
fn collect_user_string(words: impl Iterator<Item = String>, length: usize) -> String {
    let mut text = String::new();
    for word in words {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(&word);
        if text.chars().count() >= length {
            break;
        }
    }
    text
}

/// Reads typed fields from the data tokens of one SAT record.
pub(crate) struct SatDataLoader<'a> {
    tokens: &'a [SatToken],
    pos: usize,
    version: i32,
}

impl<'a> SatDataLoader<'a> {
    pub(crate) fn new(tokens: &'a [SatToken], version: i32) -> Self {
        Self {
            tokens,
            pos: 0,
            version,
        }
    }

    fn next(&mut self) -> Result<&'a SatToken> {
        let token = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| AcisError::parsing(None, "unexpected end of record data"))?;
        self.pos += 1;
        Ok(token)
    }

    fn next_text(&mut self, what: &str) -> Result<&'a str> {
        match self.next()? {
            SatToken::Text(text) => Ok(text),
            SatToken::Ptr(ptr) => Err(AcisError::parsing(
                None,
                format!("expected {what}, got pointer {ptr}"),
            )),
        }
    }
}

impl DataLoader for SatDataLoader<'_> {
    fn format(&self) -> WireFormat {
        WireFormat::Sat
    }

    fn version(&self) -> i32 {
        self.version
    }

    fn read_int(&mut self, skip_sat: Option<i32>) -> Result<i32> {
        if let Some(value) = skip_sat {
            return Ok(value);
        }
        let text = self.next_text("an int")?;
        text.parse()
            .map_err(|_| AcisError::parsing(None, format!("expected an int, got '{text}'")))
    }

    fn read_double(&mut self) -> Result<f64> {
        let text = self.next_text("a float")?;
        parse_double(text)
            .ok_or_else(|| AcisError::parsing(None, format!("expected a float, got '{text}'")))
    }

    fn read_interval(&mut self) -> Result<f64> {
        if self.read_bool("F", "I")? {
            self.read_double()
        } else {
            Ok(f64::INFINITY)
        }
    }

    fn read_vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::new(
            self.read_double()?,
            self.read_double()?,
            self.read_double()?,
        ))
    }

    fn read_bool(&mut self, true_str: &str, false_str: &str) -> Result<bool> {
        let text = self.next_text("a bool")?;
        if text == true_str {
            Ok(true)
        } else if text == false_str {
            Ok(false)
        } else {
            Err(AcisError::parsing(
                None,
                format!("expected '{true_str}' or '{false_str}', got '{text}'"),
            ))
        }
    }

    fn read_str(&mut self) -> Result<String> {
        let text = self.next_text("a string")?;
        match user_string_length(text) {
            Some(length) => {
                let mut words = Vec::new();
                while self.pos < self.tokens.len() {
                    let word = self.next()?.to_string();
                    words.push(word);
                    if words.join(" ").chars().count() >= length {
                        break;
                    }
                }
                Ok(collect_user_string(words.into_iter(), length))
            }
            None => Ok(text.to_string()),
        }
    }

    fn read_ptr(&mut self) -> Result<RecordPtr> {
        match self.next()? {
            SatToken::Ptr(ptr) => Ok(*ptr),
            SatToken::Text(text) => Err(AcisError::parsing(
                None,
                format!("expected a pointer, got '{text}'"),
            )),
        }
    }
}

/// Collects SAT tokens for one record during export.
pub(crate) struct SatDataExporter<'a> {
    tokens: Vec<SatToken>,
    links: &'a dyn Fn(EntityId) -> Result<RecordPtr>,
    version: i32,
}

impl<'a> SatDataExporter<'a> {
    pub(crate) fn new(links: &'a dyn Fn(EntityId) -> Result<RecordPtr>, version: i32) -> Self {
        Self {
            tokens: Vec::new(),
            links,
            version,
        }
    }

    pub(crate) fn into_tokens(self) -> Vec<SatToken> {
        self.tokens
    }
}

impl DataExporter for SatDataExporter<'_> {
    fn format(&self) -> WireFormat {
        WireFormat::Sat
    }

    fn version(&self) -> i32 {
        self.version
    }

    fn write_int(&mut self, value: i32, skip_sat: bool) {
        if !skip_sat {
            self.tokens.push(SatToken::text(value.to_string()));
        }
    }

    fn write_double(&mut self, value: f64) {
        self.tokens.push(SatToken::text(format_double(value)));
    }

    fn write_interval(&mut self, value: f64) {
        if value.is_infinite() {
            self.tokens.push(SatToken::text("I"));
        } else {
            self.tokens.push(SatToken::text("F"));
            self.write_double(value);
        }
    }

    fn write_loc_vec3(&mut self, v: &Vec3) {
        v.iter().for_each(|&c| self.write_double(c));
    }

    fn write_dir_vec3(&mut self, v: &Vec3) {
        self.write_loc_vec3(v);
    }

    fn write_bool(&mut self, value: bool, true_str: &str, false_str: &str) {
        self.tokens
            .push(SatToken::text(if value { true_str } else { false_str }));
    }

    fn write_str(&mut self, s: &str) {
        self.tokens
            .push(SatToken::text(format!("@{}", s.chars().count())));
        self.tokens.push(SatToken::text(s));
    }

    fn write_literal_str(&mut self, s: &str) {
        self.write_str(s);
    }

    fn write_ptr(&mut self, entity: EntityId) -> Result<()> {
        let ptr = (self.links)(entity)?;
        trace!(%ptr, "sat pointer");
        self.tokens.push(SatToken::Ptr(ptr));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: [&str; 3] = [
        "700 0 1 0 ",
        "@8 BricsCAD @12 ACIS 7.00 NT @24 Sat Jan  1 10:00:00 2022 ",
        "1 9.9999999999999995e-007 1e-010 ",
    ];

    fn doc(records: &[&str]) -> Result<SatDocument> {
        let mut lines: Vec<&str> = HEADER.to_vec();
        lines.extend_from_slice(records);
        lines.push("End-of-ACIS-data");
        SatDocument::parse(&lines)
    }

    #[test]
    fn test_tokens() {
        assert_eq!(SatToken::parse("$12").unwrap(), SatToken::Ptr(RecordPtr::to_record(12)));
        assert_eq!(SatToken::parse("$-1").unwrap(), SatToken::Ptr(RecordPtr::NULL));
        assert_eq!(SatToken::parse("forward").unwrap(), SatToken::Text("forward".into()));
        assert!(SatToken::parse("$x").is_err());
        assert!(SatToken::parse("$-7").is_err());
    }

    #[test]
    fn test_format_double() {
        assert_eq!(format_double(1.0), "1");
        assert_eq!(format_double(-2.5), "-2.5");
        assert_eq!(format_double(0.0), "0");
        assert_eq!(format_double(1e-10), "1e-10");
        assert_eq!(format_double(f64::INFINITY), "I");
        assert_eq!(parse_double("I"), Some(f64::INFINITY));
        assert_eq!(parse_double("1e-010"), Some(1e-10));
    }

    #[test]
    fn test_multi_line_records() {
        let doc = doc(&[
            "body $-1 -1 $-1 $1 $-1",
            "$-1 #",
            "lump $-1 -1 $-1 $-1 $-1 $0 #",
        ])
        .unwrap();
        assert_eq!(doc.records().len(), 2);
        let body = &doc.records()[0];
        assert_eq!(body.name, "body");
        assert_eq!(body.id, -1);
        assert_eq!(body.data.len(), 4);
        assert_eq!(doc.records()[1].num, 1);
    }

    #[test]
    fn test_renumbering_directive() {
        let doc = doc(&[
            "-5 body $-1 -1 $-1 $6 $-1 $-1 #",
            "lump $-1 -1 $-1 $-1 $-1 $5 #",
        ])
        .unwrap();
        let nums: Vec<usize> = doc.records().iter().map(|r| r.num).collect();
        assert_eq!(nums, vec![5, 6]);
        assert_eq!(doc.get(6).map(|r| r.name.as_str()), Some("lump"));
    }

    #[test]
    fn test_parsing_stops_at_end_marker() {
        let mut lines: Vec<&str> = HEADER.to_vec();
        lines.push("point $-1 -1 $-1 0 0 0 #");
        lines.push("End-of-ACIS-data");
        lines.push("garbage that is never read");
        let doc = SatDocument::parse(&lines).unwrap();
        assert_eq!(doc.records().len(), 1);

        let mut lines: Vec<&str> = HEADER.to_vec();
        lines.push("point $-1 -1 $-1 0 0 0 #");
        lines.push("Begin-of-ACIS-History-Data");
        lines.push("history $-1 #");
        assert_eq!(SatDocument::parse(&lines).unwrap().records().len(), 1);
    }

    #[test]
    fn test_unterminated_record_is_an_error() {
        let err = doc(&["body $-1 -1 $-1 $-1 $-1 $-1 #", "lump $-1 -1 $-1 $-1"]).unwrap_err();
        assert!(matches!(err, AcisError::Parsing { record: None, .. }));

        let mut lines: Vec<&str> = HEADER.to_vec();
        lines.push("point $-1 -1 $-1 0 0 0");
        assert!(SatDocument::parse(&lines).is_err());
    }

    #[test]
    fn test_dangling_pointer_is_an_error() {
        let err = doc(&["body $-1 -1 $-1 $9 $-1 $-1 #"]).unwrap_err();
        assert!(matches!(err, AcisError::Parsing { record: Some(0), .. }));
    }

    #[test]
    fn test_missing_id_is_an_error() {
        assert!(doc(&["body $-1 #"]).is_err());
        assert!(doc(&["body $-1 $2 #"]).is_err());
    }

    #[test]
    fn test_dump_round_trip() {
        let doc = doc(&[
            "body $-1 -1 $-1 $1 $-1 $-1 #",
            "lump $-1 -1 $-1 $-1 $-1 $0 #",
        ])
        .unwrap();
        let lines = doc.dump();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[3], "body $-1 -1 $-1 $1 $-1 $-1 #");
        assert_eq!(lines[5], "End-of-ACIS-data");
        let again = SatDocument::parse(&lines).unwrap();
        assert_eq!(again.records(), doc.records());
    }

    #[test]
    fn test_parse_data() {
        let doc = doc(&[
            "edge $-1 -1 $-1 $1 0 $1 1.5 $-1 $-1 forward @7 unknown #",
            "vertex $-1 -1 $-1 $0 $2 #",
            "point $-1 -1 $-1 1 2 I #",
        ])
        .unwrap();
        let edge = &doc.records()[0];
        let fields = doc.parse_data(edge, "vertex;f;vertex;f;s;@").unwrap();
        assert_eq!(
            fields,
            vec![
                SatField::Entity(1),
                SatField::Float(0.0),
                SatField::Entity(1),
                SatField::Float(1.5),
                SatField::Str("forward".into()),
                SatField::Str("unknown".into()),
            ]
        );
        let point = &doc.records()[2];
        let fields = doc.parse_data(point, "f;?;f").unwrap();
        assert_eq!(fields, vec![SatField::Float(1.0), SatField::Float(f64::INFINITY)]);
        assert_eq!(doc.parse_data(point, "i").unwrap(), vec![SatField::Int(1)]);
        assert!(doc.parse_data(point, "f;f;i").is_err());
    }

    #[test]
    fn test_data_loader() {
        let tokens: Vec<SatToken> = "F 2.5 I reversed @7 unknown $3"
            .split_whitespace()
            .map(|t| SatToken::parse(t).unwrap())
            .collect();
        let mut loader = SatDataLoader::new(&tokens, 700);
        assert_eq!(loader.read_interval().unwrap(), 2.5);
        assert_eq!(loader.read_interval().unwrap(), f64::INFINITY);
        assert_eq!(loader.read_int(Some(0)).unwrap(), 0);
        assert!(loader.read_bool("reversed", "forward").unwrap());
        assert_eq!(loader.read_str().unwrap(), "unknown");
        assert_eq!(loader.read_ptr().unwrap(), RecordPtr::to_record(3));
        assert!(loader.read_double().is_err());
    }

    #[test]
    fn test_user_string_with_spaces() {
        let tokens: Vec<SatToken> = "@9 two words forward"
            .split_whitespace()
            .map(|t| SatToken::parse(t).unwrap())
            .collect();
        let mut loader = SatDataLoader::new(&tokens, 700);
        assert_eq!(loader.read_str().unwrap(), "two words");
        assert!(!loader.read_bool("reversed", "forward").unwrap());
    }
}
