//! Graph inspection helpers for dumps and debugging.

use std::collections::HashSet;

use slotmap::Key;

use crate::entities::{Coedge, EntityKind, Face, Loop};
use crate::graph::{EntityGraph, EntityId};

/// Read-only walker over an [`EntityGraph`].
pub struct GraphWalker<'a> {
    graph: &'a EntityGraph,
}

impl<'a> GraphWalker<'a> {
    /// Create a walker for `graph`.
    pub fn new(graph: &'a EntityGraph) -> Self {
        Self { graph }
    }

    /// Entities reachable from `root` in depth-first preorder, each once.
    pub fn walk(&self, root: EntityId) -> Vec<EntityId> {
        let mut visited = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if id.is_null() || !seen.insert(id) {
                continue;
            }
            let Some(entity) = self.graph.get(id) else {
                continue;
            };
            visited.push(id);
            let refs = entity.kind.references();
            stack.extend(refs.into_iter().rev());
        }
        visited
    }

    /// Entities of type `name` reachable from `root`.
    pub fn filter_type(&self, root: EntityId, name: &str) -> Vec<EntityId> {
        self.walk(root)
            .into_iter()
            .filter(|&id| self.graph.type_name(id) == Some(name))
            .collect()
    }

    /// One line per field of the entity, prefixed by `indent` spaces.
    pub fn entity_lines(&self, id: EntityId, indent: usize) -> Vec<String> {
        let Some(entity) = self.graph.get(id) else {
            return Vec::new();
        };
        let pad = " ".repeat(indent);
        let mut lines = vec![
            format!("{pad}type: {}", entity.type_name()),
            format!("{pad}id: {}", entity.id),
        ];
        if !entity.attributes.is_null() {
            lines.push(format!("{pad}attributes: {}", self.label(entity.attributes)));
        }
        // drop the variant and struct name lines of the pretty debug output
        let skip = if matches!(entity.kind, EntityKind::Unsupported { .. }) {
            1
        } else {
            2
        };
        let fields = format!("{:#?}", entity.kind);
        lines.extend(
            fields
                .lines()
                .skip(skip)
                .filter(|line| line.trim() != ")" && line.trim() != "}" && line.trim() != "},")
                .map(|line| format!("{pad}{}", line.trim())),
        );
        lines
    }

    /// Face ring starting at `face`, one line per face listing the faces
    /// adjacent through partner coedges.
    pub fn face_link_structure(&self, face: EntityId, indent: usize) -> Vec<String> {
        let pad = " ".repeat(indent);
        let mut lines = Vec::new();
        let mut seen = HashSet::new();
        let mut current = face;
        while !current.is_null() && seen.insert(current) {
            let Some(data) = self.graph.get_as::<Face>(current) else {
                break;
            };
            let partners: Vec<String> = self
                .partner_faces(current)
                .into_iter()
                .map(|id| self.label(id))
                .collect();
            lines.push(format!(
                "{pad}{} >> [{}]",
                self.label(current),
                partners.join(", ")
            ));
            current = data.next_face;
        }
        lines
    }

    /// Faces on the other side of every coedge of every loop of `face`.
    pub fn partner_faces(&self, face: EntityId) -> Vec<EntityId> {
        let Some(face) = self.graph.get_as::<Face>(face) else {
            return Vec::new();
        };
        let mut faces = Vec::new();
        let mut seen_loops = HashSet::new();
        let mut current = face.loop_;
        while !current.is_null() && seen_loops.insert(current) {
            let Some(lp) = self.graph.get_as::<Loop>(current) else {
                break;
            };
            for coedge in lp.coedges(self.graph) {
                let partner_face = self
                    .graph
                    .get_as::<Coedge>(coedge)
                    .and_then(|c| self.graph.get_as::<Coedge>(c.partner_coedge))
                    .and_then(|p| self.graph.get_as::<Loop>(p.loop_))
                    .map(|l| l.face);
                if let Some(id) = partner_face.filter(|id| !id.is_null()) {
                    faces.push(id);
                }
            }
            current = lp.next_loop;
        }
        faces
    }

    /// `type#id` label, falling back to the handle for unnumbered entities.
    pub fn label(&self, id: EntityId) -> String {
        match self.graph.get(id) {
            Some(entity) if entity.id >= 0 => format!("{}#{}", entity.type_name(), entity.id),
            Some(entity) => format!("{}{:?}", entity.type_name(), id),
            None => "none".to_string(),
        }
    }

    /// Number of entities of every type in the graph, sorted by type name.
    pub fn type_counts(&self) -> Vec<(String, usize)> {
        let mut counts = std::collections::BTreeMap::new();
        for (_, entity) in self.graph.iter() {
            *counts.entry(entity.type_name().to_string()).or_insert(0) += 1;
        }
        counts.into_iter().collect()
    }

    /// Whether any entity of the graph has no typed layout.
    pub fn has_unsupported(&self) -> bool {
        self.graph
            .iter()
            .any(|(_, e)| matches!(e.kind, EntityKind::Unsupported { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Body, Lump, Shell};

    /// Two faces sharing one edge through a pair of partner coedges.
    fn two_faces(graph: &mut EntityGraph) -> (EntityId, EntityId, EntityId) {
        let face_a = graph.add(Face::default());
        let face_b = graph.add(Face::default());
        let loop_a = graph.add(Loop {
            face: face_a,
            ..Default::default()
        });
        let loop_b = graph.add(Loop {
            face: face_b,
            ..Default::default()
        });
        let co_a = graph.add(Coedge {
            loop_: loop_a,
            ..Default::default()
        });
        let co_b = graph.add(Coedge {
            loop_: loop_b,
            partner_coedge: co_a,
            ..Default::default()
        });
        {
            let co = graph.get_as_mut::<Coedge>(co_a).unwrap();
            co.next_coedge = co_a;
            co.partner_coedge = co_b;
        }
        graph.get_as_mut::<Coedge>(co_b).unwrap().next_coedge = co_b;
        graph.get_as_mut::<Loop>(loop_a).unwrap().coedge = co_a;
        graph.get_as_mut::<Loop>(loop_b).unwrap().coedge = co_b;
        {
            let face = graph.get_as_mut::<Face>(face_a).unwrap();
            face.loop_ = loop_a;
            face.next_face = face_b;
        }
        graph.get_as_mut::<Face>(face_b).unwrap().loop_ = loop_b;

        let shell = graph.add(Shell {
            face: face_a,
            ..Default::default()
        });
        let lump = graph.add(Lump {
            shell,
            ..Default::default()
        });
        let body = graph.add(Body {
            lump,
            ..Default::default()
        });
        (body, face_a, face_b)
    }

    #[test]
    fn test_walk_visits_once() {
        let mut graph = EntityGraph::new();
        let (body, _, _) = two_faces(&mut graph);
        let walker = GraphWalker::new(&graph);
        let visited = walker.walk(body);
        assert_eq!(visited.len(), graph.len());
        assert_eq!(visited[0], body);
        assert_eq!(walker.filter_type(body, "coedge").len(), 2);
        assert!(walker.walk(EntityId::null()).is_empty());
    }

    #[test]
    fn test_partner_faces() {
        let mut graph = EntityGraph::new();
        let (_, face_a, face_b) = two_faces(&mut graph);
        graph.get_mut(face_a).unwrap().id = 1;
        graph.get_mut(face_b).unwrap().id = 2;
        let walker = GraphWalker::new(&graph);
        assert_eq!(walker.partner_faces(face_a), vec![face_b]);
        assert_eq!(
            walker.face_link_structure(face_a, 2),
            vec!["  face#1 >> [face#2]", "  face#2 >> [face#1]"]
        );
    }

    #[test]
    fn test_entity_lines() {
        let mut graph = EntityGraph::new();
        let (_, face_a, _) = two_faces(&mut graph);
        let walker = GraphWalker::new(&graph);
        let lines = walker.entity_lines(face_a, 0);
        assert_eq!(lines[0], "type: face");
        assert!(lines.iter().any(|l| l.starts_with("sense: true")));
        assert_eq!(walker.type_counts().len(), 6);
        assert!(!walker.has_unsupported());
    }
}
