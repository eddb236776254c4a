//! ACIS version table and feature thresholds.
//!
//! Field presence in SAT/SAB records is gated by the version declared in the
//! file header. Every threshold is monotonic: a field exists for all versions
//! at or above its threshold.

/// Version codes known to this codec and their human-readable names.
///
/// DXF R2000 embeds 400 (no `@` length prefix in the header strings),
/// DXF R2004 embeds 700 and DXF R2013 and later embed 20800.
pub const ACIS_VERSIONS: &[(i32, &str)] = &[
    (400, "ACIS 4.00 NT"),
    (700, "ACIS 7.00 NT"),
    (20800, "ACIS 208.00 NT"),
];

/// Lowest version this codec writes.
pub const MIN_EXPORT_VERSION: i32 = 700;

/// Default version of the `asmheader` record written for 20800 and later.
pub const DEFAULT_ASM_VERSION: &str = "208.0.4.7009";

/// Terminator written after the last SAT record.
pub const END_OF_ACIS_DATA: &str = "End-of-ACIS-data";

/// Terminator used by files with an assembly header.
pub const END_OF_ASM_DATA: &str = "End-of-ASM-data";

/// Start of the history section, parsing stops here.
pub const BEGIN_OF_ACIS_HISTORY_DATA: &str = "Begin-of-ACIS-History-Data";

/// Minimum versions of optional record fields.
pub struct Features;

impl Features {
    /// Edge start/end parameters and the trailing convexity string.
    pub const TOL_MODELING: i32 = 500;
    /// Pattern back-reference on every pattern-capable entity.
    pub const PATTERN: i32 = 700;
    /// Integer id token after the attribute pointer of each record.
    pub const ENTITY_TAGS: i32 = 700;
    /// `asmheader` record at the start of the stream.
    pub const ASM_HEADER: i32 = 20800;
}

/// Human-readable version string for `version`, if the code is known.
pub fn version_string(version: i32) -> Option<&'static str> {
    ACIS_VERSIONS
        .iter()
        .find(|(v, _)| *v == version)
        .map(|(_, s)| *s)
}

/// Whether `version` can be used for export.
pub fn is_valid_export_version(version: i32) -> bool {
    version >= MIN_EXPORT_VERSION && version_string(version).is_some()
}

/// Whether `name` is one of the markers that end the record section.
pub fn is_end_marker(name: &str) -> bool {
    name.starts_with(END_OF_ACIS_DATA)
        || name.starts_with(END_OF_ASM_DATA)
        || name.starts_with(BEGIN_OF_ACIS_HISTORY_DATA)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_table() {
        assert_eq!(version_string(400), Some("ACIS 4.00 NT"));
        assert_eq!(version_string(20800), Some("ACIS 208.00 NT"));
        assert_eq!(version_string(401), None);
    }

    #[test]
    fn test_export_versions() {
        assert!(!is_valid_export_version(400));
        assert!(is_valid_export_version(700));
        assert!(is_valid_export_version(20800));
        assert!(!is_valid_export_version(21800));
    }
}
