//! ACIS file header in its SAT (text) and SAB (binary) forms.
//!
//! SAT header layout:
//!
//! ```text
//! 700 0 1 0
//! @17 vcad ACIS Builder @12 ACIS 7.00 NT @24 Sat Jan  1 10:00:00 2022
//! 1 9.9999999999999995e-007 1e-010
//! ```
//!
//! Counts, date and units are informational: a malformed value keeps its
//! default instead of aborting the parse. The version is structural.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AcisError, Result};
use crate::sab::{Decoder, Encoder, SIGNATURE};
use crate::sat::format_double;
use crate::version::{self, Features, DEFAULT_ASM_VERSION};

/// `ctime()` layout used to write the creation date.
const DATE_FORMAT: &str = "%a %b %e %H:%M:%S %Y";
/// Layout used to read the creation date after whitespace is collapsed.
const DATE_PARSE_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Resolution and normal tolerance written after the unit scale.
const SAT_TOLERANCES: &str = "9.9999999999999995e-007 1e-010";
const RES_TOLERANCE: f64 = 9.9999999999999995e-7;
const NOR_TOLERANCE: f64 = 1e-10;

/// Default product id written by the exporter.
pub const DEFAULT_PRODUCT_ID: &str = "vcad ACIS Builder";

/// ACIS file header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcisHeader {
    /// Format version, gates optional record fields.
    pub version: i32,
    /// Record count, may be 0 (unknown).
    pub n_records: i32,
    /// Entity count, may be 0 (unknown).
    pub n_entities: i32,
    /// 1 if history data has been saved.
    pub history_flag: i32,
    /// Product that wrote the file.
    pub product_id: String,
    /// Human-readable version string, e.g. `ACIS 7.00 NT`.
    pub acis_version: String,
    /// Creation timestamp.
    pub creation_date: NaiveDateTime,
    /// Model units in millimeters.
    pub units_in_mm: f64,
    /// Version string of the `asmheader` record written for 20800+.
    pub asm_version: String,
}

impl Default for AcisHeader {
    fn default() -> Self {
        Self {
            version: 400,
            n_records: 0,
            n_entities: 0,
            history_flag: 0,
            product_id: DEFAULT_PRODUCT_ID.to_string(),
            acis_version: version::version_string(400)
                .unwrap_or_default()
                .to_string(),
            creation_date: Local::now().naive_local(),
            units_in_mm: 1.0,
            asm_version: DEFAULT_ASM_VERSION.to_string(),
        }
    }
}

impl AcisHeader {
    /// Set the version code and the matching version string.
    pub fn set_version(&mut self, version: i32) -> Result<()> {
        let name = version::version_string(version).ok_or(AcisError::InvalidVersion(version))?;
        self.version = version;
        self.acis_version = name.to_string();
        Ok(())
    }

    /// Whether an `asmheader` record leads the record section.
    pub fn has_asm_header(&self) -> bool {
        self.version >= Features::ASM_HEADER
    }

    /// Creation date in `ctime()` layout.
    pub fn date_string(&self) -> String {
        self.creation_date.format(DATE_FORMAT).to_string()
    }

    /// The three SAT header lines.
    pub fn dumps(&self) -> Vec<String> {
        vec![
            format!(
                "{} {} {} {} ",
                self.version, self.n_records, self.n_entities, self.history_flag
            ),
            self.header_strings(),
            format!("{} {} ", format_double(self.units_in_mm), SAT_TOLERANCES),
        ]
    }

    fn header_strings(&self) -> String {
        let date = self.date_string();
        let prefix = if self.version > 400 { "@" } else { "" };
        [self.product_id.as_str(), self.acis_version.as_str(), date.as_str()]
            .iter()
            .map(|s| format!("{prefix}{} {s} ", s.chars().count()))
            .collect()
    }

    /// Parse the SAT header from the first three lines.
    ///
    /// Returns the header and the number of lines consumed.
    pub fn parse_sat<S: AsRef<str>>(lines: &[S]) -> Result<(Self, usize)> {
        if lines.len() < 3 {
            return Err(AcisError::parsing(None, "incomplete SAT header"));
        }
        let mut header = Self::default();

        let mut tokens = lines[0].as_ref().split_whitespace();
        header.version = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| AcisError::parsing(None, "missing ACIS version in header"))?;
        for (field, value) in [
            ("n_records", &mut header.n_records),
            ("n_entities", &mut header.n_entities),
            ("history_flag", &mut header.history_flag),
        ] {
            match tokens.next().map(str::parse::<i32>) {
                Some(Ok(parsed)) => *value = parsed,
                _ => warn!(field, line = lines[0].as_ref(), "malformed header count, using default"),
            }
        }

        let strings = split_header_strings(lines[1].as_ref());
        if let [product_id, acis_version, ..] = strings.as_slice() {
            header.product_id = product_id.clone();
            header.acis_version = acis_version.clone();
        }
        if let Some(date) = strings.get(2) {
            header.set_date(date);
        }

        match lines[2]
            .as_ref()
            .split_whitespace()
            .next()
            .and_then(|t| t.parse::<f64>().ok())
        {
            Some(units) => header.units_in_mm = units,
            None => warn!(line = lines[2].as_ref(), "malformed units line, using 1.0"),
        }
        Ok((header, 3))
    }

    /// The SAB header bytes.
    pub fn dumpb(&self) -> Vec<u8> {
        let mut encoder = Encoder::new();
        encoder.write_bytes(SIGNATURE);
        for value in [
            self.version,
            self.n_records,
            self.n_entities,
            self.history_flag,
        ] {
            encoder.write_i32(value);
        }
        encoder.write_str_tag(&self.product_id);
        encoder.write_str_tag(&self.acis_version);
        encoder.write_str_tag(&self.date_string());
        encoder.write_double_tag(self.units_in_mm);
        encoder.write_double_tag(RES_TOLERANCE);
        encoder.write_double_tag(NOR_TOLERANCE);
        encoder.finish()
    }

    /// Parse the SAB header, leaving `decoder` at the first record.
    pub fn parse_sab(decoder: &mut Decoder<'_>) -> Result<Self> {
        if decoder.read_bytes(SIGNATURE.len())? != SIGNATURE {
            return Err(AcisError::parsing(None, "not a SAB file"));
        }
        let mut header = Self::default();
        header.version = decoder.read_i32()?;
        header.n_records = decoder.read_i32()?;
        header.n_entities = decoder.read_i32()?;
        header.history_flag = decoder.read_i32()?;
        header.product_id = decoder.read_str_tag()?;
        header.acis_version = decoder.read_str_tag()?;
        let date = decoder.read_str_tag()?;
        header.set_date(&date);
        header.units_in_mm = decoder.read_double_tag()?;
        // tolerances are not retained
        decoder.read_double_tag()?;
        decoder.read_double_tag()?;
        Ok(header)
    }

    fn set_date(&mut self, text: &str) {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        match NaiveDateTime::parse_from_str(&normalized, DATE_PARSE_FORMAT) {
            Ok(date) => self.creation_date = date,
            Err(_) => warn!(date = text, "unrecognized creation date, using now"),
        }
    }
}

/// Split the product/version/date line into its length-prefixed strings.
///
/// Accepts both `@7 unknown` and `7 unknown`; each string is exactly as
/// long as its prefix says, so strings may contain spaces.
fn split_header_strings(line: &str) -> Vec<String> {
    let mut strings = Vec::new();
    let mut digits = String::new();
    let mut remaining = 0usize;
    let mut current = String::new();
    for c in line.trim_end().chars() {
        if remaining > 0 {
            current.push(c);
            remaining -= 1;
            if remaining == 0 {
                strings.push(std::mem::take(&mut current));
            }
        } else if c.is_ascii_digit() {
            digits.push(c);
        } else if c == ' ' && !digits.is_empty() {
            remaining = digits.parse().unwrap_or(0);
            digits.clear();
        }
    }
    strings
}
