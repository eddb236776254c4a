//! ACIS entity types and their record layouts.
//!
//! Every typed entity restores itself from a [`DataLoader`] and writes
//! itself to a [`DataExporter`]. Both halves are split into a common part
//! (the explicit per-version layout) and a data part, and both consult the
//! same [`Features`] thresholds so that reading and writing stay symmetric.

pub mod curves;
pub mod geometry;
pub mod surfaces;
pub mod topology;

pub use curves::*;
pub use geometry::*;
pub use surfaces::*;
pub use topology::*;

use std::collections::HashMap;

use slotmap::Key;

use crate::error::{AcisError, Result};
use crate::graph::EntityId;
use crate::record::RecordPtr;
use crate::version::Features;
use crate::Vec3;

/// Physical encoding of an ACIS stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// Text records.
    Sat,
    /// Tagged binary records.
    Sab,
}

/// Typed field reader over the data tokens of one record.
pub(crate) trait DataLoader {
    fn format(&self) -> WireFormat;

    fn version(&self) -> i32;

    /// Read an int; SAT returns `skip_sat` without consuming a token when
    /// it is set, for fields that exist only in SAB.
    fn read_int(&mut self, skip_sat: Option<i32>) -> Result<i32>;

    fn read_double(&mut self) -> Result<f64>;

    /// Read a bound, infinite if not finite.
    fn read_interval(&mut self) -> Result<f64>;

    fn read_vec3(&mut self) -> Result<Vec3>;

    /// Read a named-pair bool; SAT compares against the two words.
    fn read_bool(&mut self, true_str: &str, false_str: &str) -> Result<bool>;

    fn read_str(&mut self) -> Result<String>;

    fn read_ptr(&mut self) -> Result<RecordPtr>;
}

/// Typed field writer collecting the data tokens of one record.
pub(crate) trait DataExporter {
    fn format(&self) -> WireFormat;

    fn version(&self) -> i32;

    /// Write an int; skipped in SAT when `skip_sat` is set.
    fn write_int(&mut self, value: i32, skip_sat: bool);

    fn write_double(&mut self, value: f64);

    fn write_interval(&mut self, value: f64);

    fn write_loc_vec3(&mut self, v: &Vec3);

    fn write_dir_vec3(&mut self, v: &Vec3);

    fn write_bool(&mut self, value: bool, true_str: &str, false_str: &str);

    fn write_str(&mut self, s: &str);

    fn write_literal_str(&mut self, s: &str);

    /// Write a reference; null writes the null pointer, an entity outside
    /// the exported set is an [`AcisError::InvalidLinkStructure`].
    fn write_ptr(&mut self, entity: EntityId) -> Result<()>;
}

/// Record number to entity handle map built in the first load pass.
#[derive(Debug, Default)]
pub(crate) struct LinkTable {
    links: HashMap<usize, (EntityId, String)>,
}

impl LinkTable {
    pub(crate) fn insert(&mut self, num: usize, id: EntityId, name: &str) {
        self.links.insert(num, (id, name.to_string()));
    }

    /// Resolve a pointer without a type check.
    pub(crate) fn get(&self, ptr: RecordPtr) -> Result<EntityId> {
        self.lookup(ptr).map(|(id, _)| id)
    }

    fn lookup(&self, ptr: RecordPtr) -> Result<(EntityId, &str)> {
        let Some(num) = ptr.index() else {
            return Ok((EntityId::null(), ""));
        };
        self.links
            .get(&num)
            .map(|(id, name)| (*id, name.as_str()))
            .ok_or_else(|| AcisError::parsing(None, format!("unresolvable pointer {ptr}")))
    }
}

/// Read a reference and check its target type.
///
/// The target type name must end with `expected`, so a `plane-surface`
/// satisfies `surface`. The null pointer yields the null handle.
pub(crate) fn restore_entity(
    expected: &str,
    loader: &mut dyn DataLoader,
    links: &LinkTable,
) -> Result<EntityId> {
    let ptr = loader.read_ptr()?;
    let (id, name) = links.lookup(ptr)?;
    if id.is_null() || name.ends_with(expected) {
        Ok(id)
    } else {
        Err(AcisError::type_mismatch(expected, name))
    }
}

/// Read the pattern reference of a pattern-capable entity.
pub(crate) fn restore_pattern(loader: &mut dyn DataLoader, links: &LinkTable) -> Result<EntityId> {
    if loader.version() >= Features::PATTERN {
        restore_entity("pattern", loader, links)
    } else {
        Ok(EntityId::null())
    }
}

pub(crate) fn write_pattern(exporter: &mut dyn DataExporter, pattern: EntityId) -> Result<()> {
    if exporter.version() >= Features::PATTERN {
        exporter.write_ptr(pattern)?;
    }
    Ok(())
}

/// Layout of one entity type.
pub(crate) trait AcisEntity {
    /// Type name in SAT/SAB records.
    const TYPE: &'static str;

    fn restore_common(&mut self, _loader: &mut dyn DataLoader, _links: &LinkTable) -> Result<()> {
        Ok(())
    }

    fn restore_data(&mut self, _loader: &mut dyn DataLoader) -> Result<()> {
        Ok(())
    }

    /// Write the common part; entities without a known layout refuse.
    fn write_common(&self, _exporter: &mut dyn DataExporter) -> Result<()> {
        Err(AcisError::export(format!(
            "unsupported entity type: {}",
            Self::TYPE
        )))
    }

    fn write_data(&self, _exporter: &mut dyn DataExporter) -> Result<()> {
        Ok(())
    }

    /// Referenced entities in field order.
    fn references(&self) -> Vec<EntityId> {
        Vec::new()
    }
}

/// Typed access to one [`EntityKind`] variant.
pub trait EntityVariant: Sized {
    /// The variant data if `kind` holds this type.
    fn from_kind(kind: &EntityKind) -> Option<&Self>;

    /// Mutable variant data if `kind` holds this type.
    fn from_kind_mut(kind: &mut EntityKind) -> Option<&mut Self>;
}

fn new_kind<T: Default + Into<EntityKind>>() -> EntityKind {
    T::default().into()
}

macro_rules! entity_kinds {
    ($($(#[$doc:meta])* $variant:ident($ty:ty),)*) => {
        /// Typed data of an entity.
        #[derive(Debug, Clone, PartialEq)]
        pub enum EntityKind {
            $($(#[$doc])* $variant($ty),)*
            /// Entity type without a known layout; its data is not loaded
            /// and it cannot be exported.
            Unsupported {
                /// Type name from the record.
                type_name: String,
            },
        }

        $(
            impl From<$ty> for EntityKind {
                fn from(entity: $ty) -> Self {
                    EntityKind::$variant(entity)
                }
            }

            impl EntityVariant for $ty {
                fn from_kind(kind: &EntityKind) -> Option<&Self> {
                    match kind {
                        EntityKind::$variant(entity) => Some(entity),
                        _ => None,
                    }
                }

                fn from_kind_mut(kind: &mut EntityKind) -> Option<&mut Self> {
                    match kind {
                        EntityKind::$variant(entity) => Some(entity),
                        _ => None,
                    }
                }
            }
        )*

        impl EntityKind {
            /// Type name as written in SAT/SAB records.
            pub fn type_name(&self) -> &str {
                match self {
                    $(EntityKind::$variant(_) => <$ty as AcisEntity>::TYPE,)*
                    EntityKind::Unsupported { type_name } => type_name,
                }
            }

            /// Referenced entities in field order, null handles included.
            pub fn references(&self) -> Vec<EntityId> {
                match self {
                    $(EntityKind::$variant(entity) => entity.references(),)*
                    EntityKind::Unsupported { .. } => Vec::new(),
                }
            }

            pub(crate) fn restore(
                &mut self,
                loader: &mut dyn DataLoader,
                links: &LinkTable,
            ) -> Result<()> {
                match self {
                    $(EntityKind::$variant(entity) => {
                        entity.restore_common(loader, links)?;
                        entity.restore_data(loader)
                    })*
                    EntityKind::Unsupported { .. } => Ok(()),
                }
            }

            pub(crate) fn write(&self, exporter: &mut dyn DataExporter) -> Result<()> {
                match self {
                    $(EntityKind::$variant(entity) => {
                        entity.write_common(exporter)?;
                        entity.write_data(exporter)
                    })*
                    EntityKind::Unsupported { type_name } => Err(AcisError::export(format!(
                        "unsupported entity type: {type_name}"
                    ))),
                }
            }
        }

        /// Constructors of all typed entity kinds.
        pub(crate) const ENTITY_TYPES: &[(&str, fn() -> EntityKind)] = &[
            $((<$ty as AcisEntity>::TYPE, new_kind::<$ty>),)*
        ];
    };
}

entity_kinds! {
    /// `body`
    Body(Body),
    /// `lump`
    Lump(Lump),
    /// `shell`
    Shell(Shell),
    /// `subshell`, placeholder
    Subshell(Subshell),
    /// `face`
    Face(Face),
    /// `loop`
    Loop(Loop),
    /// `coedge`
    Coedge(Coedge),
    /// `edge`
    Edge(Edge),
    /// `vertex`
    Vertex(Vertex),
    /// `wire`, placeholder
    Wire(Wire),
    /// `curve`
    Curve(Curve),
    /// `straight-curve`
    StraightCurve(StraightCurve),
    /// `pcurve`, placeholder
    PCurve(PCurve),
    /// `surface`
    Surface(Surface),
    /// `plane-surface`
    Plane(Plane),
    /// `point`
    Point(Point),
    /// `transform`
    Transform(Transform),
    /// `pattern`, placeholder
    Pattern(Pattern),
    /// `asmheader`
    AsmHeader(AsmHeader),
}

impl EntityKind {
    /// Whether this kind can be written to SAT/SAB.
    pub fn is_exportable(&self) -> bool {
        !matches!(
            self,
            EntityKind::Unsupported { .. }
                | EntityKind::Subshell(_)
                | EntityKind::Wire(_)
                | EntityKind::PCurve(_)
                | EntityKind::Pattern(_)
        )
    }
}

/// Declares entity types that are typed for link validation only.
macro_rules! placeholder_entities {
    ($($(#[$doc:meta])* $name:ident => $type_name:literal,)*) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Default, PartialEq)]
            pub struct $name;

            impl AcisEntity for $name {
                const TYPE: &'static str = $type_name;
            }
        )*
    };
}

placeholder_entities! {
    /// Wire body, layout not modeled.
    Wire => "wire",
    /// Pattern, layout not modeled.
    Pattern => "pattern",
    /// Subshell, layout not modeled.
    Subshell => "subshell",
    /// Parameter-space curve, layout not modeled.
    PCurve => "pcurve",
}
