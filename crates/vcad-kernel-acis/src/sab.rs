//! SAB (Standard ACIS Binary) record layer.
//!
//! A SAB stream is the binary header followed by tagged tokens. Each record
//! starts with its type name (zero or more `ENTITY_TYPE_EX` parts closed by
//! one `ENTITY_TYPE` part, joined with `-`), followed by the attribute
//! pointer, the id (version 700 and later), the data tokens and a
//! `RECORD_END` tag. All numbers are little endian.

use tracing::{debug, trace};

use crate::entities::{DataExporter, DataLoader, WireFormat};
use crate::error::{AcisError, Result};
use crate::graph::EntityId;
use crate::header::AcisHeader;
use crate::record::{RawToken, Record, RecordPtr, RecordSet};
use crate::version::{self, Features, END_OF_ACIS_DATA, END_OF_ASM_DATA};
use crate::Vec3;

/// File signature of a SAB stream.
pub const SIGNATURE: &[u8] = b"ACIS BinaryFile";

/// SAB token tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    /// i32
    Int = 0x04,
    /// f64
    Double = 0x06,
    /// u8 length + bytes
    Str = 0x07,
    /// Boolean true, no payload.
    BoolTrue = 0x0A,
    /// Boolean false, no payload.
    BoolFalse = 0x0B,
    /// i32 record number, -1 is null.
    Pointer = 0x0C,
    /// Last (or only) part of a type name.
    EntityType = 0x0D,
    /// Leading part of a composed type name.
    EntityTypeEx = 0x0E,
    /// Opens a nested sub-type block.
    SubtypeStart = 0x0F,
    /// Closes a nested sub-type block.
    SubtypeEnd = 0x10,
    /// End of record.
    RecordEnd = 0x11,
    /// u32 length + bytes
    LiteralStr = 0x12,
    /// 3 x f64 position
    LocationVec = 0x13,
    /// 3 x f64 direction
    DirectionVec = 0x14,
    /// i32 enumeration value
    Enum = 0x15,
    /// f64 of unknown meaning
    UnknownDouble = 0x17,
}

impl TryFrom<u8> for Tag {
    type Error = AcisError;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            0x04 => Tag::Int,
            0x06 => Tag::Double,
            0x07 => Tag::Str,
            0x0A => Tag::BoolTrue,
            0x0B => Tag::BoolFalse,
            0x0C => Tag::Pointer,
            0x0D => Tag::EntityType,
            0x0E => Tag::EntityTypeEx,
            0x0F => Tag::SubtypeStart,
            0x10 => Tag::SubtypeEnd,
            0x11 => Tag::RecordEnd,
            0x12 => Tag::LiteralStr,
            0x13 => Tag::LocationVec,
            0x14 => Tag::DirectionVec,
            0x15 => Tag::Enum,
            0x17 => Tag::UnknownDouble,
            other => {
                return Err(AcisError::parsing(
                    None,
                    format!("unknown SAB tag 0x{other:02x}"),
                ))
            }
        })
    }
}

/// A decoded SAB data token.
#[derive(Debug, Clone, PartialEq)]
pub enum SabToken {
    /// Integer value.
    Int(i32),
    /// Double value.
    Double(f64),
    /// Short string.
    Str(String),
    /// Boolean flag.
    Bool(bool),
    /// Record pointer.
    Pointer(RecordPtr),
    /// Type name inside record data.
    EntityType(String),
    /// Type name prefix inside record data.
    EntityTypeEx(String),
    /// Sub-type block start.
    SubtypeStart,
    /// Sub-type block end.
    SubtypeEnd,
    /// Long string.
    LiteralStr(String),
    /// Position vector.
    LocationVec(Vec3),
    /// Direction vector.
    DirectionVec(Vec3),
    /// Enumeration value.
    Enum(i32),
    /// Double of unknown meaning.
    UnknownDouble(f64),
}

impl RawToken for SabToken {
    fn as_ptr(&self) -> Option<RecordPtr> {
        match self {
            Self::Pointer(ptr) => Some(*ptr),
            _ => None,
        }
    }
}

/// A SAB record.
pub type SabRecord = Record<SabToken>;

/// A parsed SAB file: header plus pointer-checked records.
pub type SabDocument = RecordSet<SabToken>;

/// Little-endian reader over a SAB byte buffer.
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    /// Create a decoder positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Whether all bytes have been consumed.
    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Read `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                AcisError::parsing(
                    None,
                    format!("unexpected end of SAB data at byte {}", self.pos),
                )
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_bytes(N)?);
        Ok(buf)
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a little-endian i32.
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Read a little-endian u32.
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Read a little-endian f64.
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    fn read_vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::new(self.read_f64()?, self.read_f64()?, self.read_f64()?))
    }

    fn read_string(&mut self, len: usize) -> Result<String> {
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| AcisError::parsing(None, "invalid UTF-8 in SAB string"))
    }

    /// Read a tag byte.
    pub fn read_tag(&mut self) -> Result<Tag> {
        Tag::try_from(self.read_u8()?)
    }

    fn expect_tag(&mut self, expected: Tag) -> Result<()> {
        let tag = self.read_tag()?;
        if tag != expected {
            return Err(AcisError::parsing(
                None,
                format!("expected SAB tag {expected:?}, got {tag:?}"),
            ));
        }
        Ok(())
    }

    /// Read a `STR` or `LITERAL_STR` tagged string.
    pub fn read_str_tag(&mut self) -> Result<String> {
        let len = match self.read_tag()? {
            Tag::Str => self.read_u8()? as usize,
            Tag::LiteralStr => self.read_u32()? as usize,
            tag => {
                return Err(AcisError::parsing(
                    None,
                    format!("expected SAB tag Str, got {tag:?}"),
                ))
            }
        };
        self.read_string(len)
    }

    /// Read a `DOUBLE` tagged float.
    pub fn read_double_tag(&mut self) -> Result<f64> {
        self.expect_tag(Tag::Double)?;
        self.read_f64()
    }

    /// Read the next token, `None` at a record end.
    fn read_token(&mut self) -> Result<Option<SabToken>> {
        let token = match self.read_tag()? {
            Tag::Int => SabToken::Int(self.read_i32()?),
            Tag::Double => SabToken::Double(self.read_f64()?),
            Tag::Str => {
                let len = self.read_u8()? as usize;
                SabToken::Str(self.read_string(len)?)
            }
            Tag::BoolTrue => SabToken::Bool(true),
            Tag::BoolFalse => SabToken::Bool(false),
            Tag::Pointer => SabToken::Pointer(RecordPtr::new(i64::from(self.read_i32()?))?),
            Tag::EntityType => {
                let len = self.read_u8()? as usize;
                SabToken::EntityType(self.read_string(len)?)
            }
            Tag::EntityTypeEx => {
                let len = self.read_u8()? as usize;
                SabToken::EntityTypeEx(self.read_string(len)?)
            }
            Tag::SubtypeStart => SabToken::SubtypeStart,
            Tag::SubtypeEnd => SabToken::SubtypeEnd,
            Tag::RecordEnd => return Ok(None),
            Tag::LiteralStr => {
                let len = self.read_u32()? as usize;
                SabToken::LiteralStr(self.read_string(len)?)
            }
            Tag::LocationVec => SabToken::LocationVec(self.read_vec3()?),
            Tag::DirectionVec => SabToken::DirectionVec(self.read_vec3()?),
            Tag::Enum => SabToken::Enum(self.read_i32()?),
            Tag::UnknownDouble => SabToken::UnknownDouble(self.read_f64()?),
        };
        Ok(Some(token))
    }
}

/// Little-endian writer producing SAB bytes.
#[derive(Debug, Default)]
pub struct Encoder {
    buffer: Vec<u8>,
}

impl Encoder {
    /// Create an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    fn write_tag(&mut self, tag: Tag) {
        self.buffer.push(tag as u8);
    }

    /// Append a little-endian i32.
    pub fn write_i32(&mut self, value: i32) {
        self.write_bytes(&value.to_le_bytes());
    }

    fn write_f64(&mut self, value: f64) {
        self.write_bytes(&value.to_le_bytes());
    }

    fn write_vec3(&mut self, v: &Vec3) {
        v.iter().for_each(|&c| self.write_f64(c));
    }

    /// Append a string, as `STR` up to 255 bytes and `LITERAL_STR` beyond.
    pub fn write_str_tag(&mut self, s: &str) {
        match u8::try_from(s.len()) {
            Ok(len) => {
                self.write_tag(Tag::Str);
                self.buffer.push(len);
                self.write_bytes(s.as_bytes());
            }
            Err(_) => self.write_literal_str(s),
        }
    }

    fn write_literal_str(&mut self, s: &str) {
        self.write_tag(Tag::LiteralStr);
        self.write_bytes(&(s.len() as u32).to_le_bytes());
        self.write_bytes(s.as_bytes());
    }

    /// Append a `DOUBLE` tagged float.
    pub fn write_double_tag(&mut self, value: f64) {
        self.write_tag(Tag::Double);
        self.write_f64(value);
    }

    fn write_name_part(&mut self, tag: Tag, part: &str) {
        // type names are short ASCII identifiers
        let len = part.len().min(u8::MAX as usize);
        self.write_tag(tag);
        self.buffer.push(len as u8);
        self.write_bytes(&part.as_bytes()[..len]);
    }

    /// Append a record type name, split on `-`.
    pub fn write_record_name(&mut self, name: &str) {
        let parts: Vec<&str> = name.split('-').collect();
        if let Some((last, prefix)) = parts.split_last() {
            for part in prefix {
                self.write_name_part(Tag::EntityTypeEx, part);
            }
            self.write_name_part(Tag::EntityType, last);
        }
    }

    /// Append one data token.
    pub fn write_token(&mut self, token: &SabToken) {
        match token {
            SabToken::Int(v) => {
                self.write_tag(Tag::Int);
                self.write_i32(*v);
            }
            SabToken::Double(v) => self.write_double_tag(*v),
            SabToken::Str(s) => self.write_str_tag(s),
            SabToken::Bool(true) => self.write_tag(Tag::BoolTrue),
            SabToken::Bool(false) => self.write_tag(Tag::BoolFalse),
            SabToken::Pointer(ptr) => {
                self.write_tag(Tag::Pointer);
                self.write_i32(ptr.value() as i32);
            }
            SabToken::EntityType(s) => self.write_name_part(Tag::EntityType, s),
            SabToken::EntityTypeEx(s) => self.write_name_part(Tag::EntityTypeEx, s),
            SabToken::SubtypeStart => self.write_tag(Tag::SubtypeStart),
            SabToken::SubtypeEnd => self.write_tag(Tag::SubtypeEnd),
            SabToken::LiteralStr(s) => self.write_literal_str(s),
            SabToken::LocationVec(v) => {
                self.write_tag(Tag::LocationVec);
                self.write_vec3(v);
            }
            SabToken::DirectionVec(v) => {
                self.write_tag(Tag::DirectionVec);
                self.write_vec3(v);
            }
            SabToken::Enum(v) => {
                self.write_tag(Tag::Enum);
                self.write_i32(*v);
            }
            SabToken::UnknownDouble(v) => {
                self.write_tag(Tag::UnknownDouble);
                self.write_f64(*v);
            }
        }
    }

    /// Close the current record.
    pub fn write_record_end(&mut self) {
        self.write_tag(Tag::RecordEnd);
    }

    /// Consume the encoder and return the bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buffer
    }
}

/// Read the type name of the next record.
fn read_record_name(decoder: &mut Decoder<'_>) -> Result<String> {
    let mut parts = Vec::new();
    loop {
        match decoder.read_token()? {
            Some(SabToken::EntityTypeEx(part)) => parts.push(part),
            Some(SabToken::EntityType(part)) => {
                parts.push(part);
                return Ok(parts.join("-"));
            }
            other => {
                return Err(AcisError::parsing(
                    None,
                    format!("expected record type name, got {other:?}"),
                ))
            }
        }
    }
}

fn parse_record(decoder: &mut Decoder<'_>, num: usize, name: String, version: i32) -> Result<SabRecord> {
    let attr = match decoder.read_token()? {
        Some(SabToken::Pointer(ptr)) => ptr,
        other => {
            return Err(AcisError::parsing(
                None,
                format!("expected attribute pointer, got {other:?}"),
            ))
        }
    };
    let id = if version >= Features::ENTITY_TAGS {
        match decoder.read_token()? {
            Some(SabToken::Int(id)) => id,
            other => {
                return Err(AcisError::parsing(
                    None,
                    format!("expected entity id, got {other:?}"),
                ))
            }
        }
    } else {
        -1
    };
    let mut data = Vec::new();
    while let Some(token) = decoder.read_token()? {
        data.push(token);
    }
    Ok(Record {
        num,
        name,
        attr,
        id,
        data,
    })
}

impl RecordSet<SabToken> {
    /// Parse a SAB byte stream.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let header = AcisHeader::parse_sab(&mut decoder)?;
        let mut records = Vec::new();
        while !decoder.is_eof() {
            let num = records.len();
            let name = read_record_name(&mut decoder).map_err(|e| e.in_record(num))?;
            if version::is_end_marker(&name) {
                break;
            }
            trace!(num, name = name.as_str(), "sab record");
            let record =
                parse_record(&mut decoder, num, name, header.version).map_err(|e| e.in_record(num))?;
            records.push(record);
        }
        debug!(
            version = header.version,
            records = records.len(),
            "parsed SAB records"
        );
        Self::new(header, records)
    }

    /// Serialize header, records and the end marker.
    pub fn dump(&self) -> Vec<u8> {
        let version = self.header.version;
        let mut encoder = Encoder::new();
        encoder.write_bytes(&self.header.dumpb());
        for record in self.records() {
            encoder.write_record_name(&record.name);
            encoder.write_token(&SabToken::Pointer(record.attr));
            if version >= Features::ENTITY_TAGS {
                encoder.write_token(&SabToken::Int(record.id));
            }
            for token in &record.data {
                encoder.write_token(token);
            }
            encoder.write_record_end();
        }
        let end_marker = if self.header.has_asm_header() {
            END_OF_ASM_DATA
        } else {
            END_OF_ACIS_DATA
        };
        encoder.write_token(&SabToken::EntityType(end_marker.to_string()));
        encoder.finish()
    }
}

/// Reads typed fields from the data tokens of one SAB record.
pub(crate) struct SabDataLoader<'a> {
    tokens: &'a [SabToken],
    pos: usize,
    version: i32,
}

impl<'a> SabDataLoader<'a> {
    pub(crate) fn new(tokens: &'a [SabToken], version: i32) -> Self {
        Self {
            tokens,
            pos: 0,
            version,
        }
    }

    fn next(&mut self) -> Result<&'a SabToken> {
        let token = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| AcisError::parsing(None, "unexpected end of record data"))?;
        self.pos += 1;
        Ok(token)
    }
}

fn unexpected(what: &str, token: &SabToken) -> AcisError {
    AcisError::parsing(None, format!("expected {what}, got {token:?}"))
}

impl DataLoader for SabDataLoader<'_> {
    fn format(&self) -> WireFormat {
        WireFormat::Sab
    }

    fn version(&self) -> i32 {
        self.version
    }

    fn read_int(&mut self, _skip_sat: Option<i32>) -> Result<i32> {
        match self.next()? {
            SabToken::Int(v) | SabToken::Enum(v) => Ok(*v),
            other => Err(unexpected("an int", other)),
        }
    }

    fn read_double(&mut self) -> Result<f64> {
        match self.next()? {
            SabToken::Double(v) | SabToken::UnknownDouble(v) => Ok(*v),
            other => Err(unexpected("a double", other)),
        }
    }

    fn read_interval(&mut self) -> Result<f64> {
        if self.read_bool("F", "I")? {
            self.read_double()
        } else {
            Ok(f64::INFINITY)
        }
    }

    fn read_vec3(&mut self) -> Result<Vec3> {
        match self.next()? {
            SabToken::LocationVec(v) | SabToken::DirectionVec(v) => Ok(*v),
            other => Err(unexpected("a vector", other)),
        }
    }

    fn read_bool(&mut self, _true_str: &str, _false_str: &str) -> Result<bool> {
        match self.next()? {
            SabToken::Bool(v) => Ok(*v),
            other => Err(unexpected("a bool", other)),
        }
    }

    fn read_str(&mut self) -> Result<String> {
        match self.next()? {
            SabToken::Str(s) | SabToken::LiteralStr(s) => Ok(s.clone()),
            other => Err(unexpected("a string", other)),
        }
    }

    fn read_ptr(&mut self) -> Result<RecordPtr> {
        match self.next()? {
            SabToken::Pointer(ptr) => Ok(*ptr),
            other => Err(unexpected("a pointer", other)),
        }
    }
}

/// Collects SAB tokens for one record during export.
pub(crate) struct SabDataExporter<'a> {
    tokens: Vec<SabToken>,
    links: &'a dyn Fn(EntityId) -> Result<RecordPtr>,
    version: i32,
}

impl<'a> SabDataExporter<'a> {
    pub(crate) fn new(links: &'a dyn Fn(EntityId) -> Result<RecordPtr>, version: i32) -> Self {
        Self {
            tokens: Vec::new(),
            links,
            version,
        }
    }

    pub(crate) fn into_tokens(self) -> Vec<SabToken> {
        self.tokens
    }
}

impl DataExporter for SabDataExporter<'_> {
    fn format(&self) -> WireFormat {
        WireFormat::Sab
    }

    fn version(&self) -> i32 {
        self.version
    }

    fn write_int(&mut self, value: i32, _skip_sat: bool) {
        self.tokens.push(SabToken::Int(value));
    }

    fn write_double(&mut self, value: f64) {
        self.tokens.push(SabToken::Double(value));
    }

    fn write_interval(&mut self, value: f64) {
        if value.is_infinite() {
            self.tokens.push(SabToken::Bool(false));
        } else {
            self.tokens.push(SabToken::Bool(true));
            self.tokens.push(SabToken::Double(value));
        }
    }

    fn write_loc_vec3(&mut self, v: &Vec3) {
        self.tokens.push(SabToken::LocationVec(*v));
    }

    fn write_dir_vec3(&mut self, v: &Vec3) {
        self.tokens.push(SabToken::DirectionVec(*v));
    }

    fn write_bool(&mut self, value: bool, _true_str: &str, _false_str: &str) {
        self.tokens.push(SabToken::Bool(value));
    }

    fn write_str(&mut self, s: &str) {
        self.tokens.push(SabToken::Str(s.to_string()));
    }

    fn write_literal_str(&mut self, s: &str) {
        self.tokens.push(SabToken::LiteralStr(s.to_string()));
    }

    fn write_ptr(&mut self, entity: EntityId) -> Result<()> {
        let ptr = (self.links)(entity)?;
        self.tokens.push(SabToken::Pointer(ptr));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(version: i32) -> AcisHeader {
        let mut header = AcisHeader::default();
        header.set_version(version).unwrap();
        header
    }

    fn record(num: usize, name: &str, data: Vec<SabToken>) -> SabRecord {
        Record {
            num,
            name: name.into(),
            attr: RecordPtr::NULL,
            id: -1,
            data,
        }
    }

    #[test]
    fn test_tag_values() {
        assert_eq!(Tag::try_from(0x11).unwrap(), Tag::RecordEnd);
        assert_eq!(Tag::try_from(0x17).unwrap(), Tag::UnknownDouble);
        assert!(Tag::try_from(0x16).is_err());
        assert!(Tag::try_from(0x05).is_err());
    }

    #[test]
    fn test_str_tag_reads_both_string_tags() {
        let long = "p".repeat(300);
        let mut encoder = Encoder::new();
        encoder.write_str_tag("short");
        encoder.write_str_tag(&long);
        let bytes = encoder.finish();
        assert_eq!(bytes[0], Tag::Str as u8);
        assert_eq!(bytes[7], Tag::LiteralStr as u8);

        let mut decoder = Decoder::new(&bytes);
        assert_eq!(decoder.read_str_tag().unwrap(), "short");
        assert_eq!(decoder.read_str_tag().unwrap(), long);
        assert!(decoder.is_eof());
    }

    #[test]
    fn test_composed_record_name() {
        let mut encoder = Encoder::new();
        encoder.write_record_name("plane-surface");
        let bytes = encoder.finish();
        assert_eq!(bytes[0], Tag::EntityTypeEx as u8);
        assert_eq!(bytes[1], 5);
        assert_eq!(&bytes[2..7], b"plane");
        assert_eq!(bytes[7], Tag::EntityType as u8);

        let mut decoder = Decoder::new(&bytes);
        assert_eq!(read_record_name(&mut decoder).unwrap(), "plane-surface");
    }

    #[test]
    fn test_long_strings_use_literal_tag() {
        let long = "x".repeat(300);
        let mut encoder = Encoder::new();
        encoder.write_str_tag(&long);
        let bytes = encoder.finish();
        assert_eq!(bytes[0], Tag::LiteralStr as u8);
        assert_eq!(u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]), 300);

        let mut decoder = Decoder::new(&bytes);
        assert_eq!(decoder.read_token().unwrap(), Some(SabToken::LiteralStr(long)));
    }

    #[test]
    fn test_document_round_trip() {
        let records = vec![
            record(
                0,
                "body",
                vec![
                    SabToken::Pointer(RecordPtr::NULL),
                    SabToken::Pointer(RecordPtr::to_record(1)),
                    SabToken::Pointer(RecordPtr::NULL),
                    SabToken::Pointer(RecordPtr::NULL),
                ],
            ),
            record(
                1,
                "straight-curve",
                vec![
                    SabToken::Pointer(RecordPtr::NULL),
                    SabToken::LocationVec(Vec3::new(1.0, 2.0, 3.0)),
                    SabToken::DirectionVec(Vec3::new(0.0, 0.0, 1.0)),
                    SabToken::Bool(true),
                    SabToken::Double(-5.0),
                    SabToken::Bool(false),
                    SabToken::Enum(2),
                ],
            ),
        ];
        let doc = SabDocument::new(header(700), records).unwrap();
        let bytes = doc.dump();
        assert!(bytes.starts_with(SIGNATURE));

        let parsed = SabDocument::parse(&bytes).unwrap();
        assert_eq!(parsed.header.version, 700);
        assert_eq!(parsed.records(), doc.records());
        assert_eq!(parsed.bodies().len(), 1);
    }

    #[test]
    fn test_unknown_tag_is_an_error() {
        let mut bytes = header(700).dumpb();
        bytes.extend_from_slice(&[Tag::EntityType as u8, 4]);
        bytes.extend_from_slice(b"body");
        bytes.push(0x01);
        let err = SabDocument::parse(&bytes).unwrap_err();
        assert!(matches!(err, AcisError::Parsing { record: Some(0), .. }));
    }

    #[test]
    fn test_truncated_stream_is_an_error() {
        let doc = SabDocument::new(
            header(700),
            vec![record(0, "point", vec![SabToken::LocationVec(Vec3::zeros())])],
        )
        .unwrap();
        let bytes = doc.dump();
        assert!(SabDocument::parse(&bytes[..bytes.len() - 30]).is_err());
    }

    #[test]
    fn test_asm_end_marker() {
        let doc = SabDocument::new(header(20800), Vec::new()).unwrap();
        let bytes = doc.dump();
        assert!(bytes.ends_with(b"End-of-ASM-data"));
        assert!(SabDocument::parse(&bytes).unwrap().records().is_empty());
    }

    #[test]
    fn test_data_loader() {
        let tokens = vec![
            SabToken::Bool(true),
            SabToken::Double(2.5),
            SabToken::Bool(false),
            SabToken::Int(7),
            SabToken::LocationVec(Vec3::new(1.0, 0.0, 0.0)),
            SabToken::Str("unknown".into()),
        ];
        let mut loader = SabDataLoader::new(&tokens, 700);
        assert_eq!(loader.read_interval().unwrap(), 2.5);
        assert_eq!(loader.read_interval().unwrap(), f64::INFINITY);
        assert_eq!(loader.read_int(Some(0)).unwrap(), 7);
        assert_eq!(loader.read_vec3().unwrap(), Vec3::x());
        assert!(loader.read_ptr().is_err());
    }
}
