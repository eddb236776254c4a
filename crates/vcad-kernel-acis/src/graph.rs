//! Arena that owns every entity of one ACIS model.
//!
//! Relations between entities are [`EntityId`] handles into the arena. The
//! slotmap null key is the "no reference" sentinel: it never indexes an
//! entity and is tested with [`Key::is_null`].

use slotmap::{new_key_type, Key, SlotMap};

use crate::entities::{Body, EntityKind, EntityVariant};
use crate::error::{AcisError, Result};

new_key_type! {
    /// Handle of an entity inside an [`EntityGraph`].
    pub struct EntityId;
}

/// One entity: common header fields plus its typed data.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Id token from the record, `-1` until assigned.
    pub id: i32,
    /// Attribute chain, null if the entity has no attributes.
    pub attributes: EntityId,
    /// Type-specific fields.
    pub kind: EntityKind,
}

impl Entity {
    /// A new entity without id and attributes.
    pub fn new(kind: impl Into<EntityKind>) -> Self {
        Self {
            id: -1,
            attributes: EntityId::null(),
            kind: kind.into(),
        }
    }

    /// Type name as written in SAT/SAB records.
    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }
}

/// Owner of all entities of a model.
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    entities: SlotMap<EntityId, Entity>,
}

impl EntityGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity and return its handle.
    pub fn add(&mut self, kind: impl Into<EntityKind>) -> EntityId {
        self.entities.insert(Entity::new(kind))
    }

    /// Add a fully built entity.
    pub fn insert(&mut self, entity: Entity) -> EntityId {
        self.entities.insert(entity)
    }

    /// Entity for `id`, `None` for the null handle or a foreign handle.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Mutable entity for `id`.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Typed view of the entity, `None` if it has another kind.
    ///
    /// ```
    /// use vcad_kernel_acis::{Body, EntityGraph};
    ///
    /// let mut graph = EntityGraph::new();
    /// let body = graph.add(Body::default());
    /// assert!(graph.get_as::<Body>(body).is_some());
    /// ```
    pub fn get_as<T: EntityVariant>(&self, id: EntityId) -> Option<&T> {
        self.get(id).and_then(|e| T::from_kind(&e.kind))
    }

    /// Mutable typed view of the entity.
    pub fn get_as_mut<T: EntityVariant>(&mut self, id: EntityId) -> Option<&mut T> {
        self.get_mut(id).and_then(|e| T::from_kind_mut(&mut e.kind))
    }

    /// Whether `id` refers to an entity of this graph.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Type name of the entity, `None` for null or foreign handles.
    pub fn type_name(&self, id: EntityId) -> Option<&str> {
        self.get(id).map(Entity::type_name)
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the graph holds no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All entities in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter()
    }

    /// Handles of all `body` entities in arena order.
    pub fn bodies(&self) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, e)| Body::from_kind(&e.kind).is_some())
            .map(|(id, _)| id)
            .collect()
    }

    /// Check that every non-null reference points into this graph.
    pub fn validate_links(&self) -> Result<()> {
        for (id, entity) in &self.entities {
            let refs = std::iter::once(entity.attributes).chain(entity.kind.references());
            for target in refs {
                if !target.is_null() && !self.contains(target) {
                    return Err(AcisError::InvalidLinkStructure(format!(
                        "{} {:?} references an entity outside the graph",
                        entity.type_name(),
                        id
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Lump, Point};

    #[test]
    fn test_null_handle() {
        let graph = EntityGraph::new();
        let null = EntityId::null();
        assert!(null.is_null());
        assert!(graph.get(null).is_none());
        assert!(graph.type_name(null).is_none());
    }

    #[test]
    fn test_typed_access() {
        let mut graph = EntityGraph::new();
        let body = graph.add(Body::default());
        let point = graph.add(Point::default());
        assert_eq!(graph.type_name(body), Some("body"));
        assert!(graph.get_as::<Point>(body).is_none());
        graph.get_as_mut::<Point>(point).unwrap().location.x = 3.0;
        assert_eq!(graph.get_as::<Point>(point).unwrap().location.x, 3.0);
        assert_eq!(graph.bodies(), vec![body]);
        assert_eq!(graph.get(body).unwrap().id, -1);
    }

    #[test]
    fn test_validate_links() {
        let mut graph = EntityGraph::new();
        let stale = graph.add(Lump::default());
        graph.remove_for_test(stale);
        let lump = graph.add(Lump::default());
        let body = graph.add(Body {
            lump,
            ..Default::default()
        });
        assert!(graph.validate_links().is_ok());

        graph.get_as_mut::<Body>(body).unwrap().lump = stale;
        assert!(matches!(
            graph.validate_links(),
            Err(AcisError::InvalidLinkStructure(_))
        ));
    }

    impl EntityGraph {
        fn remove_for_test(&mut self, id: EntityId) {
            self.entities.remove(id);
        }
    }
}
