//! Topology entities: body, lump, shell, face, loop, coedge, edge and vertex.

use slotmap::Key;

use super::{
    restore_entity, restore_pattern, write_pattern, AcisEntity, DataExporter, DataLoader,
    LinkTable,
};
use crate::error::Result;
use crate::graph::{EntityGraph, EntityId};
use crate::version::Features;

/// `body` entity, the root of a solid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Body {
    /// Pattern reference.
    pub pattern: EntityId,
    /// First lump.
    pub lump: EntityId,
    /// Wire body.
    pub wire: EntityId,
    /// Placement transformation.
    pub transform: EntityId,
}

impl AcisEntity for Body {
    const TYPE: &'static str = "body";

    fn restore_common(&mut self, loader: &mut dyn DataLoader, links: &LinkTable) -> Result<()> {
        self.pattern = restore_pattern(loader, links)?;
        self.lump = restore_entity("lump", loader, links)?;
        self.wire = restore_entity("wire", loader, links)?;
        self.transform = restore_entity("transform", loader, links)?;
        Ok(())
    }

    fn write_common(&self, exporter: &mut dyn DataExporter) -> Result<()> {
        write_pattern(exporter, self.pattern)?;
        exporter.write_ptr(self.lump)?;
        exporter.write_ptr(self.wire)?;
        exporter.write_ptr(self.transform)
    }

    fn references(&self) -> Vec<EntityId> {
        vec![self.pattern, self.lump, self.wire, self.transform]
    }
}

/// `lump` entity, a connected region of a body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lump {
    /// Pattern reference.
    pub pattern: EntityId,
    /// Next lump of the same body.
    pub next_lump: EntityId,
    /// First shell.
    pub shell: EntityId,
    /// Owning body.
    pub body: EntityId,
}

impl AcisEntity for Lump {
    const TYPE: &'static str = "lump";

    fn restore_common(&mut self, loader: &mut dyn DataLoader, links: &LinkTable) -> Result<()> {
        self.pattern = restore_pattern(loader, links)?;
        self.next_lump = restore_entity("lump", loader, links)?;
        self.shell = restore_entity("shell", loader, links)?;
        self.body = restore_entity("body", loader, links)?;
        Ok(())
    }

    fn write_common(&self, exporter: &mut dyn DataExporter) -> Result<()> {
        write_pattern(exporter, self.pattern)?;
        exporter.write_ptr(self.next_lump)?;
        exporter.write_ptr(self.shell)?;
        exporter.write_ptr(self.body)
    }

    fn references(&self) -> Vec<EntityId> {
        vec![self.pattern, self.next_lump, self.shell, self.body]
    }
}

/// `shell` entity, a connected set of faces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shell {
    /// Pattern reference.
    pub pattern: EntityId,
    /// Next shell of the same lump.
    pub next_shell: EntityId,
    /// First subshell.
    pub subshell: EntityId,
    /// First face.
    pub face: EntityId,
    /// First wire.
    pub wire: EntityId,
    /// Owning lump.
    pub lump: EntityId,
}

impl AcisEntity for Shell {
    const TYPE: &'static str = "shell";

    fn restore_common(&mut self, loader: &mut dyn DataLoader, links: &LinkTable) -> Result<()> {
        self.pattern = restore_pattern(loader, links)?;
        self.next_shell = restore_entity("shell", loader, links)?;
        self.subshell = restore_entity("subshell", loader, links)?;
        self.face = restore_entity("face", loader, links)?;
        self.wire = restore_entity("wire", loader, links)?;
        self.lump = restore_entity("lump", loader, links)?;
        Ok(())
    }

    fn write_common(&self, exporter: &mut dyn DataExporter) -> Result<()> {
        write_pattern(exporter, self.pattern)?;
        exporter.write_ptr(self.next_shell)?;
        exporter.write_ptr(self.subshell)?;
        exporter.write_ptr(self.face)?;
        exporter.write_ptr(self.wire)?;
        exporter.write_ptr(self.lump)
    }

    fn references(&self) -> Vec<EntityId> {
        vec![
            self.pattern,
            self.next_shell,
            self.subshell,
            self.face,
            self.wire,
            self.lump,
        ]
    }
}

/// `face` entity, a bounded region of a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// Pattern reference.
    pub pattern: EntityId,
    /// Next face of the same shell.
    pub next_face: EntityId,
    /// First loop.
    pub loop_: EntityId,
    /// Owning shell.
    pub shell: EntityId,
    /// Owning subshell.
    pub subshell: EntityId,
    /// Underlying surface.
    pub surface: EntityId,
    /// `true` = reversed, `false` = forward.
    pub sense: bool,
    /// `true` = double sided, `false` = single sided.
    pub double_sided: bool,
    /// For double sided faces: `true` = in, `false` = out.
    pub containment: bool,
}

impl Default for Face {
    fn default() -> Self {
        Self {
            pattern: EntityId::null(),
            next_face: EntityId::null(),
            loop_: EntityId::null(),
            shell: EntityId::null(),
            subshell: EntityId::null(),
            surface: EntityId::null(),
            sense: true,
            double_sided: false,
            containment: false,
        }
    }
}

impl AcisEntity for Face {
    const TYPE: &'static str = "face";

    fn restore_common(&mut self, loader: &mut dyn DataLoader, links: &LinkTable) -> Result<()> {
        self.pattern = restore_pattern(loader, links)?;
        self.next_face = restore_entity("face", loader, links)?;
        self.loop_ = restore_entity("loop", loader, links)?;
        self.shell = restore_entity("shell", loader, links)?;
        self.subshell = restore_entity("subshell", loader, links)?;
        self.surface = restore_entity("surface", loader, links)?;
        self.sense = loader.read_bool("reversed", "forward")?;
        self.double_sided = loader.read_bool("double", "single")?;
        if self.double_sided {
            self.containment = loader.read_bool("in", "out")?;
        }
        Ok(())
    }

    fn write_common(&self, exporter: &mut dyn DataExporter) -> Result<()> {
        write_pattern(exporter, self.pattern)?;
        exporter.write_ptr(self.next_face)?;
        exporter.write_ptr(self.loop_)?;
        exporter.write_ptr(self.shell)?;
        exporter.write_ptr(self.subshell)?;
        exporter.write_ptr(self.surface)?;
        exporter.write_bool(self.sense, "reversed", "forward");
        exporter.write_bool(self.double_sided, "double", "single");
        if self.double_sided {
            exporter.write_bool(self.containment, "in", "out");
        }
        Ok(())
    }

    fn references(&self) -> Vec<EntityId> {
        vec![
            self.pattern,
            self.next_face,
            self.loop_,
            self.shell,
            self.subshell,
            self.surface,
        ]
    }
}

/// `loop` entity, a closed ring of coedges bounding a face.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Loop {
    /// Pattern reference.
    pub pattern: EntityId,
    /// Next loop of the same face.
    pub next_loop: EntityId,
    /// First coedge of the ring.
    pub coedge: EntityId,
    /// Owning face.
    pub face: EntityId,
}

impl Loop {
    /// Coedges of the ring, starting at [`Loop::coedge`].
    ///
    /// Follows `next_coedge` until the ring closes, a link is null or the
    /// target is not a coedge.
    pub fn coedges(&self, graph: &EntityGraph) -> Vec<EntityId> {
        let mut coedges = Vec::new();
        let mut current = self.coedge;
        while !current.is_null() && coedges.len() < graph.len() {
            let Some(coedge) = graph.get_as::<Coedge>(current) else {
                break;
            };
            coedges.push(current);
            current = coedge.next_coedge;
            if current == self.coedge {
                break;
            }
        }
        coedges
    }
}

impl AcisEntity for Loop {
    const TYPE: &'static str = "loop";

    fn restore_common(&mut self, loader: &mut dyn DataLoader, links: &LinkTable) -> Result<()> {
        self.pattern = restore_pattern(loader, links)?;
        self.next_loop = restore_entity("loop", loader, links)?;
        self.coedge = restore_entity("coedge", loader, links)?;
        self.face = restore_entity("face", loader, links)?;
        Ok(())
    }

    fn write_common(&self, exporter: &mut dyn DataExporter) -> Result<()> {
        write_pattern(exporter, self.pattern)?;
        exporter.write_ptr(self.next_loop)?;
        exporter.write_ptr(self.coedge)?;
        exporter.write_ptr(self.face)
    }

    fn references(&self) -> Vec<EntityId> {
        vec![self.pattern, self.next_loop, self.coedge, self.face]
    }
}

/// `coedge` entity, the use of an edge by one loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Coedge {
    /// Pattern reference.
    pub pattern: EntityId,
    /// Next coedge in the loop.
    pub next_coedge: EntityId,
    /// Previous coedge in the loop.
    pub prev_coedge: EntityId,
    /// Coedge of the adjacent face sharing the same edge.
    pub partner_coedge: EntityId,
    /// Underlying edge.
    pub edge: EntityId,
    /// `true` = reversed against the edge, `false` = forward.
    pub sense: bool,
    /// Owning loop.
    pub loop_: EntityId,
    /// Integer present only in SAB records.
    pub unknown: i32,
    /// Parameter-space curve.
    pub pcurve: EntityId,
}

impl Default for Coedge {
    fn default() -> Self {
        Self {
            pattern: EntityId::null(),
            next_coedge: EntityId::null(),
            prev_coedge: EntityId::null(),
            partner_coedge: EntityId::null(),
            edge: EntityId::null(),
            sense: true,
            loop_: EntityId::null(),
            unknown: 0,
            pcurve: EntityId::null(),
        }
    }
}

impl AcisEntity for Coedge {
    const TYPE: &'static str = "coedge";

    fn restore_common(&mut self, loader: &mut dyn DataLoader, links: &LinkTable) -> Result<()> {
        self.pattern = restore_pattern(loader, links)?;
        self.next_coedge = restore_entity("coedge", loader, links)?;
        self.prev_coedge = restore_entity("coedge", loader, links)?;
        self.partner_coedge = restore_entity("coedge", loader, links)?;
        self.edge = restore_entity("edge", loader, links)?;
        self.sense = loader.read_bool("reversed", "forward")?;
        self.loop_ = restore_entity("loop", loader, links)?;
        self.unknown = loader.read_int(Some(0))?;
        self.pcurve = restore_entity("pcurve", loader, links)?;
        Ok(())
    }

    fn write_common(&self, exporter: &mut dyn DataExporter) -> Result<()> {
        write_pattern(exporter, self.pattern)?;
        exporter.write_ptr(self.next_coedge)?;
        exporter.write_ptr(self.prev_coedge)?;
        exporter.write_ptr(self.partner_coedge)?;
        exporter.write_ptr(self.edge)?;
        exporter.write_bool(self.sense, "reversed", "forward");
        exporter.write_ptr(self.loop_)?;
        exporter.write_int(self.unknown, true);
        exporter.write_ptr(self.pcurve)
    }

    fn references(&self) -> Vec<EntityId> {
        vec![
            self.pattern,
            self.next_coedge,
            self.prev_coedge,
            self.partner_coedge,
            self.edge,
            self.loop_,
            self.pcurve,
        ]
    }
}

/// `edge` entity, a bounded piece of a curve between two vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Pattern reference.
    pub pattern: EntityId,
    /// Start vertex.
    pub start_vertex: EntityId,
    /// Curve parameter at the start vertex.
    pub start_param: f64,
    /// End vertex.
    pub end_vertex: EntityId,
    /// Curve parameter at the end vertex.
    pub end_param: f64,
    /// One of the coedges using this edge.
    pub coedge: EntityId,
    /// Underlying curve.
    pub curve: EntityId,
    /// `true` = reversed against the curve, `false` = forward.
    pub sense: bool,
    /// Convexity string, `unknown` if not computed.
    pub convexity: String,
}

impl Default for Edge {
    fn default() -> Self {
        Self {
            pattern: EntityId::null(),
            start_vertex: EntityId::null(),
            start_param: 0.0,
            end_vertex: EntityId::null(),
            end_param: 0.0,
            coedge: EntityId::null(),
            curve: EntityId::null(),
            sense: true,
            convexity: "unknown".to_string(),
        }
    }
}

impl AcisEntity for Edge {
    const TYPE: &'static str = "edge";

    fn restore_common(&mut self, loader: &mut dyn DataLoader, links: &LinkTable) -> Result<()> {
        let tol_modeling = loader.version() >= Features::TOL_MODELING;
        self.pattern = restore_pattern(loader, links)?;
        self.start_vertex = restore_entity("vertex", loader, links)?;
        if tol_modeling {
            self.start_param = loader.read_double()?;
        }
        self.end_vertex = restore_entity("vertex", loader, links)?;
        if tol_modeling {
            self.end_param = loader.read_double()?;
        }
        self.coedge = restore_entity("coedge", loader, links)?;
        self.curve = restore_entity("curve", loader, links)?;
        self.sense = loader.read_bool("reversed", "forward")?;
        if tol_modeling {
            self.convexity = loader.read_str()?;
        }
        Ok(())
    }

    fn write_common(&self, exporter: &mut dyn DataExporter) -> Result<()> {
        let tol_modeling = exporter.version() >= Features::TOL_MODELING;
        write_pattern(exporter, self.pattern)?;
        exporter.write_ptr(self.start_vertex)?;
        if tol_modeling {
            exporter.write_double(self.start_param);
        }
        exporter.write_ptr(self.end_vertex)?;
        if tol_modeling {
            exporter.write_double(self.end_param);
        }
        exporter.write_ptr(self.coedge)?;
        exporter.write_ptr(self.curve)?;
        exporter.write_bool(self.sense, "reversed", "forward");
        if tol_modeling {
            exporter.write_str(&self.convexity);
        }
        Ok(())
    }

    fn references(&self) -> Vec<EntityId> {
        vec![
            self.pattern,
            self.start_vertex,
            self.end_vertex,
            self.coedge,
            self.curve,
        ]
    }
}

/// `vertex` entity, the topological end of an edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vertex {
    /// Pattern reference.
    pub pattern: EntityId,
    /// One of the edges using this vertex.
    pub edge: EntityId,
    /// Integer present only in SAB records.
    pub unknown: i32,
    /// Location.
    pub point: EntityId,
}

impl AcisEntity for Vertex {
    const TYPE: &'static str = "vertex";

    fn restore_common(&mut self, loader: &mut dyn DataLoader, links: &LinkTable) -> Result<()> {
        self.pattern = restore_pattern(loader, links)?;
        self.edge = restore_entity("edge", loader, links)?;
        self.unknown = loader.read_int(Some(0))?;
        self.point = restore_entity("point", loader, links)?;
        Ok(())
    }

    fn write_common(&self, exporter: &mut dyn DataExporter) -> Result<()> {
        write_pattern(exporter, self.pattern)?;
        exporter.write_ptr(self.edge)?;
        exporter.write_int(self.unknown, true);
        exporter.write_ptr(self.point)
    }

    fn references(&self) -> Vec<EntityId> {
        vec![self.pattern, self.edge, self.point]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordPtr;
    use crate::sab::{SabDataLoader, SabToken};
    use crate::sat::{SatDataExporter, SatDataLoader, SatToken};

    fn tokens(text: &str) -> Vec<SatToken> {
        text.split_whitespace()
            .map(|t| SatToken::parse(t).unwrap())
            .collect()
    }

    fn links(graph: &mut EntityGraph, names: &[&str]) -> (LinkTable, Vec<EntityId>) {
        let mut table = LinkTable::default();
        let mut ids = Vec::new();
        for (num, name) in names.iter().enumerate() {
            let id = graph.add(crate::registry::create(name));
            table.insert(num, id, name);
            ids.push(id);
        }
        (table, ids)
    }

    fn sat_text(entity: &impl AcisEntity, ids: &[EntityId], version: i32) -> String {
        let map = |id: EntityId| -> Result<RecordPtr> {
            if id.is_null() {
                return Ok(RecordPtr::NULL);
            }
            let pos = ids.iter().position(|&i| i == id).unwrap();
            Ok(RecordPtr::to_record(pos))
        };
        let mut exporter = SatDataExporter::new(&map, version);
        entity.write_common(&mut exporter).unwrap();
        entity.write_data(&mut exporter).unwrap();
        exporter
            .into_tokens()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_face_layout() {
        let mut graph = EntityGraph::new();
        let (table, ids) = links(&mut graph, &["face", "loop", "shell", "plane-surface"]);
        let data = tokens("$-1 $-1 $1 $2 $-1 $3 forward double in");
        let mut face = Face::default();
        face.restore_common(&mut SatDataLoader::new(&data, 700), &table)
            .unwrap();
        assert_eq!(face.loop_, ids[1]);
        assert_eq!(face.surface, ids[3]);
        assert!(!face.sense);
        assert!(face.double_sided);
        assert!(face.containment);
        assert_eq!(
            sat_text(&face, &ids, 700),
            "$-1 $-1 $1 $2 $-1 $3 forward double in"
        );

        face.double_sided = false;
        assert_eq!(
            sat_text(&face, &ids, 700),
            "$-1 $-1 $1 $2 $-1 $3 forward single"
        );
    }

    #[test]
    fn test_edge_version_gating() {
        let mut graph = EntityGraph::new();
        let (table, ids) = links(&mut graph, &["vertex", "vertex", "coedge", "straight-curve"]);

        let data = tokens("$-1 $0 0 $1 10 $2 $3 forward @7 unknown");
        let mut edge = Edge::default();
        edge.restore_common(&mut SatDataLoader::new(&data, 700), &table)
            .unwrap();
        assert_eq!(edge.end_param, 10.0);
        assert_eq!(edge.curve, ids[3]);
        assert!(!edge.sense);

        let data = tokens("$0 $1 $2 $3 reversed");
        let mut old = Edge::default();
        old.restore_common(&mut SatDataLoader::new(&data, 400), &table)
            .unwrap();
        assert_eq!(old.start_vertex, ids[0]);
        assert_eq!(old.end_param, 0.0);
        assert!(old.sense);
        assert_eq!(old.convexity, "unknown");
        assert_eq!(sat_text(&old, &ids, 400), "$0 $1 $2 $3 reversed");
    }

    #[test]
    fn test_edge_rejects_wrong_target_type() {
        let mut graph = EntityGraph::new();
        let (table, _) = links(&mut graph, &["point"]);
        let data = tokens("$-1 $0 0 $-1 1 $-1 $-1 forward @7 unknown");
        let mut edge = Edge::default();
        assert!(edge
            .restore_common(&mut SatDataLoader::new(&data, 700), &table)
            .is_err());
    }

    #[test]
    fn test_coedge_sab_only_int() {
        let mut graph = EntityGraph::new();
        let (table, ids) = links(&mut graph, &["coedge", "edge", "loop"]);
        let data = tokens("$-1 $0 $0 $-1 $1 reversed $2 $-1");
        let mut coedge = Coedge::default();
        coedge
            .restore_common(&mut SatDataLoader::new(&data, 700), &table)
            .unwrap();
        assert_eq!(coedge.unknown, 0);
        assert_eq!(coedge.loop_, ids[2]);
        assert_eq!(sat_text(&coedge, &ids, 700), "$-1 $0 $0 $-1 $1 reversed $2 $-1");

        let data = vec![
            SabToken::Pointer(RecordPtr::NULL),
            SabToken::Pointer(RecordPtr::to_record(0)),
            SabToken::Pointer(RecordPtr::to_record(0)),
            SabToken::Pointer(RecordPtr::NULL),
            SabToken::Pointer(RecordPtr::to_record(1)),
            SabToken::Bool(false),
            SabToken::Pointer(RecordPtr::to_record(2)),
            SabToken::Int(3),
            SabToken::Pointer(RecordPtr::NULL),
        ];
        let mut coedge = Coedge::default();
        coedge
            .restore_common(&mut SabDataLoader::new(&data, 700), &table)
            .unwrap();
        assert_eq!(coedge.unknown, 3);
        assert!(!coedge.sense);
    }

    #[test]
    fn test_loop_coedges_ring() {
        let mut graph = EntityGraph::new();
        let a = graph.add(Coedge::default());
        let b = graph.add(Coedge::default());
        let c = graph.add(Coedge::default());
        for (id, next) in [(a, b), (b, c), (c, a)] {
            graph.get_as_mut::<Coedge>(id).unwrap().next_coedge = next;
        }
        let lp = Loop {
            coedge: a,
            ..Default::default()
        };
        assert_eq!(lp.coedges(&graph), vec![a, b, c]);

        graph.get_as_mut::<Coedge>(c).unwrap().next_coedge = EntityId::null();
        assert_eq!(lp.coedges(&graph), vec![a, b, c]);
        assert!(Loop::default().coedges(&graph).is_empty());
    }
}
