//! Flat record representation shared by the SAT and SAB codecs.
//!
//! A record is the raw, untyped form of one entity: its number in the
//! stream, its type name, the attribute pointer, the id token and the
//! remaining data tokens. Records only live between tokenizing and entity
//! materialization; pointers are plain record numbers here.

use std::collections::HashMap;
use std::fmt;

use crate::error::{AcisError, Result};
use crate::header::AcisHeader;

/// Pointer to a record number as written in the stream.
///
/// `$-1` (SAT) and pointer value `-1` (SAB) are the null pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordPtr(i64);

impl RecordPtr {
    /// The null pointer.
    pub const NULL: RecordPtr = RecordPtr(-1);

    /// Create a pointer from a raw value, rejecting negatives other than `-1`.
    pub fn new(value: i64) -> Result<Self> {
        if value < -1 {
            return Err(AcisError::parsing(
                None,
                format!("invalid pointer value: {value}"),
            ));
        }
        Ok(Self(value))
    }

    /// Pointer to record number `num`.
    pub fn to_record(num: usize) -> Self {
        Self(num as i64)
    }

    /// Whether this is the null pointer.
    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    /// Target record number, `None` for the null pointer.
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    /// Raw pointer value.
    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// Token types that may carry a record pointer.
pub trait RawToken {
    /// The pointer carried by this token, if it is a pointer token.
    fn as_ptr(&self) -> Option<RecordPtr>;
}

/// One raw record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    /// Record number (`$num` pointers refer to it).
    pub num: usize,
    /// Entity type name, e.g. `body` or `plane-surface`.
    pub name: String,
    /// Attribute pointer.
    pub attr: RecordPtr,
    /// Entity id token, `-1` when absent (versions below 700).
    pub id: i32,
    /// Remaining data tokens.
    pub data: Vec<T>,
}

impl<T: RawToken> Record<T> {
    /// All pointer tokens of this record, attribute pointer first.
    pub fn pointers(&self) -> impl Iterator<Item = RecordPtr> + '_ {
        std::iter::once(self.attr).chain(self.data.iter().filter_map(RawToken::as_ptr))
    }
}

/// Header plus an ordered, pointer-checked record list.
#[derive(Debug, Clone)]
pub struct RecordSet<T> {
    /// File header.
    pub header: AcisHeader,
    records: Vec<Record<T>>,
    index: HashMap<usize, usize>,
}

impl<T: RawToken> RecordSet<T> {
    /// Build a record set and check that every pointer resolves.
    ///
    /// Fails on duplicate record numbers and on pointers to record numbers
    /// that were never defined.
    pub fn new(header: AcisHeader, records: Vec<Record<T>>) -> Result<Self> {
        let mut index = HashMap::with_capacity(records.len());
        for (pos, record) in records.iter().enumerate() {
            if index.insert(record.num, pos).is_some() {
                return Err(AcisError::parsing(
                    Some(record.num),
                    "duplicate record number",
                ));
            }
        }
        let set = Self {
            header,
            records,
            index,
        };
        for record in &set.records {
            for ptr in record.pointers() {
                if let Some(target) = ptr.index() {
                    if !set.index.contains_key(&target) {
                        return Err(AcisError::parsing(
                            Some(record.num),
                            format!("unresolvable pointer {ptr}"),
                        ));
                    }
                }
            }
        }
        Ok(set)
    }

    /// Records in stream order.
    pub fn records(&self) -> &[Record<T>] {
        &self.records
    }

    /// Record with number `num`.
    pub fn get(&self, num: usize) -> Option<&Record<T>> {
        self.index.get(&num).map(|&pos| &self.records[pos])
    }

    /// Record a pointer refers to, `None` for the null pointer.
    pub fn resolve(&self, ptr: RecordPtr) -> Option<&Record<T>> {
        ptr.index().and_then(|num| self.get(num))
    }

    /// Records for which `predicate` returns `true`.
    pub fn query<'a>(
        &'a self,
        predicate: impl Fn(&Record<T>) -> bool + 'a,
    ) -> impl Iterator<Item = &'a Record<T>> + 'a {
        self.records.iter().filter(move |r| predicate(r))
    }

    /// All `body` records.
    pub fn bodies(&self) -> Vec<&Record<T>> {
        self.query(|r| r.name == "body").collect()
    }

    /// All records of type `name` referenced by `record`.
    pub fn find_all<'a>(
        &'a self,
        record: &'a Record<T>,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Record<T>> + 'a {
        record
            .data
            .iter()
            .filter_map(RawToken::as_ptr)
            .filter_map(|ptr| self.resolve(ptr))
            .filter(move |r| r.name == name)
    }

    /// First record of type `name` referenced by `record`.
    pub fn find_first<'a>(&'a self, record: &'a Record<T>, name: &str) -> Option<&'a Record<T>> {
        record
            .data
            .iter()
            .filter_map(RawToken::as_ptr)
            .filter_map(|ptr| self.resolve(ptr))
            .find(|r| r.name == name)
    }

    /// Follow a path of type names like `"lump/shell/face"` starting at
    /// `record`, taking the first match at each step.
    pub fn find_path<'a>(&'a self, record: &'a Record<T>, path: &str) -> Option<&'a Record<T>> {
        path.split('/')
            .try_fold(record, |current, name| self.find_first(current, name))
    }

    /// Consume the set, returning the header and records.
    pub fn into_parts(self) -> (AcisHeader, Vec<Record<T>>) {
        (self.header, self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Tok(Option<RecordPtr>);

    impl RawToken for Tok {
        fn as_ptr(&self) -> Option<RecordPtr> {
            self.0
        }
    }

    fn record(num: usize, name: &str, ptrs: &[i64]) -> Record<Tok> {
        Record {
            num,
            name: name.into(),
            attr: RecordPtr::NULL,
            id: -1,
            data: ptrs
                .iter()
                .map(|&p| Tok(Some(RecordPtr::new(p).unwrap())))
                .collect(),
        }
    }

    #[test]
    fn test_pointer_values() {
        assert!(RecordPtr::NULL.is_null());
        assert_eq!(RecordPtr::NULL.index(), None);
        assert_eq!(RecordPtr::to_record(4).index(), Some(4));
        assert_eq!(RecordPtr::to_record(4).to_string(), "$4");
        assert!(RecordPtr::new(-2).is_err());
    }

    #[test]
    fn test_dangling_pointer_rejected() {
        let records = vec![record(0, "body", &[-1, 3])];
        let err = RecordSet::new(AcisHeader::default(), records).unwrap_err();
        assert!(matches!(err, AcisError::Parsing { record: Some(0), .. }));
    }

    #[test]
    fn test_duplicate_number_rejected() {
        let records = vec![record(0, "body", &[]), record(0, "lump", &[])];
        assert!(RecordSet::new(AcisHeader::default(), records).is_err());
    }

    #[test]
    fn test_find_path() {
        let records = vec![
            record(0, "body", &[-1, 1, -1, -1]),
            record(1, "lump", &[-1, -1, 2, 0]),
            record(2, "shell", &[-1, -1, -1, 3]),
            record(3, "face", &[]),
        ];
        let set = RecordSet::new(AcisHeader::default(), records).unwrap();
        let body = set.bodies()[0];
        assert_eq!(set.find_path(body, "lump/shell/face").map(|r| r.num), Some(3));
        assert!(set.find_path(body, "lump/face").is_none());
        assert_eq!(set.find_all(body, "lump").count(), 1);
    }
}
