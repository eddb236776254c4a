//! Two-pass loader building an [`EntityGraph`] from SAT or SAB records.

use std::borrow::Cow;

use tracing::{debug, trace};

use crate::entities::{Body, DataLoader, LinkTable};
use crate::error::Result;
use crate::graph::{EntityGraph, EntityId};
use crate::header::AcisHeader;
use crate::record::{RawToken, RecordSet};
use crate::registry;
use crate::sab::{SabDataLoader, SabDocument, SabToken};
use crate::sat::{SatDataLoader, SatDocument, SatToken};

/// Input of [`load`]: text lines are SAT, bytes are SAB.
#[derive(Debug, Clone)]
pub enum AcisSource<'a> {
    /// SAT lines.
    Sat(Vec<&'a str>),
    /// SAB bytes.
    Sab(Cow<'a, [u8]>),
}

impl<'a> From<&'a str> for AcisSource<'a> {
    fn from(text: &'a str) -> Self {
        Self::Sat(text.lines().collect())
    }
}

impl<'a> From<&'a String> for AcisSource<'a> {
    fn from(text: &'a String) -> Self {
        Self::from(text.as_str())
    }
}

impl<'a, 'b: 'a> From<&'a [&'b str]> for AcisSource<'a> {
    fn from(lines: &'a [&'b str]) -> Self {
        Self::Sat(lines.to_vec())
    }
}

impl<'a> From<&'a [String]> for AcisSource<'a> {
    fn from(lines: &'a [String]) -> Self {
        Self::Sat(lines.iter().map(String::as_str).collect())
    }
}

impl<'a> From<&'a Vec<String>> for AcisSource<'a> {
    fn from(lines: &'a Vec<String>) -> Self {
        Self::from(lines.as_slice())
    }
}

impl<'a> From<&'a [u8]> for AcisSource<'a> {
    fn from(data: &'a [u8]) -> Self {
        Self::Sab(Cow::Borrowed(data))
    }
}

impl<'a> From<&'a Vec<u8>> for AcisSource<'a> {
    fn from(data: &'a Vec<u8>) -> Self {
        Self::Sab(Cow::Borrowed(data.as_slice()))
    }
}

impl<'a> From<&'a [Vec<u8>]> for AcisSource<'a> {
    fn from(chunks: &'a [Vec<u8>]) -> Self {
        Self::Sab(Cow::Owned(chunks.concat()))
    }
}

/// A loaded ACIS model.
#[derive(Debug, Clone, Default)]
pub struct AcisData {
    /// File header.
    pub header: AcisHeader,
    /// All entities of the file.
    pub graph: EntityGraph,
    /// `body` entities in record order.
    pub bodies: Vec<EntityId>,
}

impl AcisData {
    /// Build the entity graph from parsed SAT records.
    pub fn from_sat(doc: &SatDocument) -> Result<Self> {
        build_graph(doc, sat_loader)
    }

    /// Build the entity graph from parsed SAB records.
    pub fn from_sab(doc: &SabDocument) -> Result<Self> {
        build_graph(doc, sab_loader)
    }
}

/// Load SAT or SAB data.
///
/// ```
/// let sat = "700 0 1 0\n@4 test @12 ACIS 7.00 NT @24 Sat Jan  1 10:00:00 2022\n1 1e-06 1e-10\n\
///            body $-1 -1 $-1 $-1 $-1 $-1 #\nEnd-of-ACIS-data\n";
/// let data = vcad_kernel_acis::load(sat).unwrap();
/// assert_eq!(data.bodies.len(), 1);
/// ```
pub fn load<'a>(source: impl Into<AcisSource<'a>>) -> Result<AcisData> {
    match source.into() {
        AcisSource::Sat(lines) if lines.is_empty() => Ok(AcisData::default()),
        AcisSource::Sab(bytes) if bytes.is_empty() => Ok(AcisData::default()),
        AcisSource::Sat(lines) => AcisData::from_sat(&SatDocument::parse(&lines)?),
        AcisSource::Sab(bytes) => AcisData::from_sab(&SabDocument::parse(&bytes)?),
    }
}

fn sat_loader(tokens: &[SatToken], version: i32) -> Box<dyn DataLoader + '_> {
    Box::new(SatDataLoader::new(tokens, version))
}

fn sab_loader(tokens: &[SabToken], version: i32) -> Box<dyn DataLoader + '_> {
    Box::new(SabDataLoader::new(tokens, version))
}

fn build_graph<T, F>(doc: &RecordSet<T>, make_loader: F) -> Result<AcisData>
where
    T: RawToken,
    F: for<'t> Fn(&'t [T], i32) -> Box<dyn DataLoader + 't>,
{
    let version = doc.header.version;
    let mut graph = EntityGraph::new();
    let mut links = LinkTable::default();
    let mut handles = Vec::with_capacity(doc.records().len());

    for record in doc.records() {
        let id = graph.add(registry::create(&record.name));
        links.insert(record.num, id, &record.name);
        handles.push(id);
    }

    for (record, &id) in doc.records().iter().zip(&handles) {
        trace!(num = record.num, name = record.name.as_str(), "restore record");
        let attributes = links.get(record.attr).map_err(|e| e.in_record(record.num))?;
        let Some(entity) = graph.get_mut(id) else {
            continue;
        };
        entity.id = record.id;
        entity.attributes = attributes;
        let mut loader = make_loader(&record.data, version);
        entity
            .kind
            .restore(loader.as_mut(), &links)
            .map_err(|e| e.in_record(record.num))?;
    }

    let bodies: Vec<EntityId> = handles
        .into_iter()
        .filter(|&id| graph.get_as::<Body>(id).is_some())
        .collect();
    debug!(
        version,
        entities = graph.len(),
        bodies = bodies.len(),
        "loaded ACIS entities"
    );
    Ok(AcisData {
        header: doc.header.clone(),
        graph,
        bodies,
    })
}
