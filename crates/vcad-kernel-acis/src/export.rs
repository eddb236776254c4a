//! Export of body graphs as SAT lines or SAB bytes.
//!
//! Records are numbered by a breadth-first traversal from the given bodies,
//! visiting references in field order. Attribute chains are not exported.

use std::collections::{HashMap, HashSet, VecDeque};

use slotmap::Key;
use tracing::debug;

use crate::config::ExportOptions;
use crate::entities::{AsmHeader, EntityKind};
use crate::error::{AcisError, Result};
use crate::graph::{EntityGraph, EntityId};
use crate::header::AcisHeader;
use crate::record::{Record, RecordPtr, RecordSet};
use crate::sab::{SabDataExporter, SabDocument, SabToken};
use crate::sat::{SatDataExporter, SatDocument, SatToken};

type LinkFn<'a> = dyn Fn(EntityId) -> Result<RecordPtr> + 'a;

/// Export `bodies` as SAT lines.
pub fn export_sat(graph: &EntityGraph, bodies: &[EntityId], version: i32) -> Result<Vec<String>> {
    export_sat_with(graph, bodies, &ExportOptions::with_version(version))
}

/// Export `bodies` as SAB bytes.
pub fn export_sab(graph: &EntityGraph, bodies: &[EntityId], version: i32) -> Result<Vec<u8>> {
    export_sab_with(graph, bodies, &ExportOptions::with_version(version))
}

/// Export `bodies` as SAT lines using `options`.
pub fn export_sat_with(
    graph: &EntityGraph,
    bodies: &[EntityId],
    options: &ExportOptions,
) -> Result<Vec<String>> {
    let doc: SatDocument = build_document(graph, bodies, options, sat_tokens)?;
    Ok(doc.dump())
}

/// Export `bodies` as SAB bytes using `options`.
pub fn export_sab_with(
    graph: &EntityGraph,
    bodies: &[EntityId],
    options: &ExportOptions,
) -> Result<Vec<u8>> {
    let doc: SabDocument = build_document(graph, bodies, options, sab_tokens)?;
    Ok(doc.dump())
}

fn sat_tokens(kind: &EntityKind, links: &LinkFn<'_>, version: i32) -> Result<Vec<SatToken>> {
    let mut exporter = SatDataExporter::new(links, version);
    kind.write(&mut exporter)?;
    Ok(exporter.into_tokens())
}

fn sab_tokens(kind: &EntityKind, links: &LinkFn<'_>, version: i32) -> Result<Vec<SabToken>> {
    let mut exporter = SabDataExporter::new(links, version);
    kind.write(&mut exporter)?;
    Ok(exporter.into_tokens())
}

/// Entities reachable from `bodies` in breadth-first, first-visit order.
///
/// Fails if a root is not a body of `graph`, if any reachable reference
/// leaves the graph or if a reachable entity cannot be exported.
pub fn export_order(graph: &EntityGraph, bodies: &[EntityId]) -> Result<Vec<EntityId>> {
    let mut order = Vec::new();
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    for &body in bodies {
        match graph.get(body).map(|e| &e.kind) {
            Some(EntityKind::Body(_)) => {}
            Some(other) => {
                return Err(AcisError::export(format!(
                    "export root is a {}, not a body",
                    other.type_name()
                )))
            }
            None => {
                return Err(AcisError::InvalidLinkStructure(
                    "export root is not part of the graph".into(),
                ))
            }
        }
        if seen.insert(body) {
            queue.push_back(body);
        }
    }
    while let Some(id) = queue.pop_front() {
        let entity = graph.get(id).ok_or_else(|| {
            AcisError::InvalidLinkStructure("reference to an entity outside the graph".into())
        })?;
        if !entity.kind.is_exportable() {
            return Err(AcisError::export(format!(
                "unsupported entity type: {}",
                entity.type_name()
            )));
        }
        order.push(id);
        for target in entity.kind.references() {
            if !target.is_null() && seen.insert(target) {
                queue.push_back(target);
            }
        }
    }
    Ok(order)
}

fn build_document<T, F>(
    graph: &EntityGraph,
    bodies: &[EntityId],
    options: &ExportOptions,
    write: F,
) -> Result<RecordSet<T>>
where
    T: crate::record::RawToken,
    F: Fn(&EntityKind, &LinkFn<'_>, i32) -> Result<Vec<T>>,
{
    let mut header: AcisHeader = options.header()?;
    let version = header.version;
    let order = export_order(graph, bodies)?;

    let offset = usize::from(header.has_asm_header());
    let index: HashMap<EntityId, usize> = order
        .iter()
        .enumerate()
        .map(|(pos, &id)| (id, pos + offset))
        .collect();
    let links = |id: EntityId| -> Result<RecordPtr> {
        if id.is_null() {
            return Ok(RecordPtr::NULL);
        }
        index
            .get(&id)
            .map(|&num| RecordPtr::to_record(num))
            .ok_or_else(|| {
                AcisError::InvalidLinkStructure(format!(
                    "{} is not part of the exported records",
                    graph.type_name(id).unwrap_or("entity")
                ))
            })
    };

    let mut records = Vec::with_capacity(order.len() + offset);
    if offset == 1 {
        let asm = EntityKind::from(AsmHeader {
            version: header.asm_version.clone(),
        });
        records.push(Record {
            num: 0,
            name: asm.type_name().to_string(),
            attr: RecordPtr::NULL,
            id: -1,
            data: write(&asm, &links, version)?,
        });
    }
    for (pos, &id) in order.iter().enumerate() {
        let Some(entity) = graph.get(id) else {
            continue;
        };
        records.push(Record {
            num: pos + offset,
            name: entity.type_name().to_string(),
            attr: RecordPtr::NULL,
            id: entity.id,
            data: write(&entity.kind, &links, version)?,
        });
    }

    header.n_records = records.len() as i32;
    header.n_entities = (bodies.len() + offset) as i32;
    debug!(version, records = records.len(), "exported ACIS records");
    RecordSet::new(header, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Body, Lump, Point, Shell, Transform};

    fn simple_body(graph: &mut EntityGraph) -> EntityId {
        let body = graph.add(Body::default());
        let shell = graph.add(Shell::default());
        let lump = graph.add(Lump {
            shell,
            body,
            ..Default::default()
        });
        graph.get_as_mut::<Shell>(shell).unwrap().lump = lump;
        graph.get_as_mut::<Body>(body).unwrap().lump = lump;
        body
    }

    #[test]
    fn test_breadth_first_order() {
        let mut graph = EntityGraph::new();
        let body = simple_body(&mut graph);
        let transform = graph.add(Transform::default());
        graph.get_as_mut::<Body>(body).unwrap().transform = transform;

        let order = export_order(&graph, &[body]).unwrap();
        let names: Vec<_> = order
            .iter()
            .map(|&id| graph.type_name(id).unwrap())
            .collect();
        assert_eq!(names, vec!["body", "lump", "transform", "shell"]);
    }

    #[test]
    fn test_sat_records() {
        let mut graph = EntityGraph::new();
        let body = simple_body(&mut graph);
        let lines = export_sat(&graph, &[body], 700).unwrap();
        assert_eq!(lines[0], "700 3 1 0 ");
        assert_eq!(lines[3], "body $-1 -1 $-1 $1 $-1 $-1 #");
        assert_eq!(lines[4], "lump $-1 -1 $-1 $-1 $2 $0 #");
        assert_eq!(lines[5], "shell $-1 -1 $-1 $-1 $-1 $-1 $-1 $1 #");
        assert_eq!(lines.last().unwrap(), "End-of-ACIS-data");
    }

    #[test]
    fn test_asm_header_leads_20800() {
        let mut graph = EntityGraph::new();
        let body = simple_body(&mut graph);
        let lines = export_sat(&graph, &[body], 20800).unwrap();
        assert_eq!(lines[0], "20800 4 2 0 ");
        assert_eq!(lines[3], "asmheader $-1 -1 @12 208.0.4.7009 #");
        assert_eq!(lines[4], "body $-1 -1 $-1 $2 $-1 $-1 #");
    }

    #[test]
    fn test_unreachable_entities_are_skipped() {
        let mut graph = EntityGraph::new();
        let body = simple_body(&mut graph);
        graph.add(Point::default());
        graph.add(EntityKind::Unsupported {
            type_name: "spline-surface".into(),
        });
        assert_eq!(export_order(&graph, &[body]).unwrap().len(), 3);
    }

    #[test]
    fn test_unsupported_entity_fails_export() {
        let mut graph = EntityGraph::new();
        let body = simple_body(&mut graph);
        let wire = graph.add(crate::entities::Wire);
        graph.get_as_mut::<Body>(body).unwrap().wire = wire;
        assert!(matches!(
            export_sat(&graph, &[body], 700),
            Err(AcisError::Export(_))
        ));
        assert!(matches!(
            export_sab(&graph, &[body], 700),
            Err(AcisError::Export(_))
        ));
    }

    #[test]
    fn test_invalid_version_rejected() {
        let mut graph = EntityGraph::new();
        let body = simple_body(&mut graph);
        assert!(matches!(
            export_sat(&graph, &[body], 400),
            Err(AcisError::Export(_))
        ));
        assert!(export_sab(&graph, &[body], 21800).is_err());
    }

    #[test]
    fn test_reference_outside_graph_fails_export() {
        let mut other = EntityGraph::new();
        let foreign = (0..8).map(|_| other.add(Lump::default())).last().unwrap();

        let mut graph = EntityGraph::new();
        let body = graph.add(Body {
            lump: foreign,
            ..Default::default()
        });
        assert!(!graph.contains(foreign));
        assert!(matches!(
            export_order(&graph, &[body]),
            Err(AcisError::InvalidLinkStructure(_))
        ));
        assert!(matches!(
            export_sat(&graph, &[body], 700),
            Err(AcisError::InvalidLinkStructure(_))
        ));
        assert!(matches!(
            export_sab(&graph, &[body], 20800),
            Err(AcisError::InvalidLinkStructure(_))
        ));
    }

    #[test]
    fn test_root_must_be_body() {
        let mut graph = EntityGraph::new();
        let point = graph.add(Point::default());
        assert!(matches!(
            export_sat(&graph, &[point], 700),
            Err(AcisError::Export(_))
        ));
        assert!(matches!(
            export_sat(&graph, &[EntityId::null()], 700),
            Err(AcisError::InvalidLinkStructure(_))
        ));
    }
}
