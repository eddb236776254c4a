#![warn(missing_docs)]

//! ACIS SAT/SAB import/export for the vcad kernel.
//!
//! Translates between the ACIS text (SAT) and binary (SAB) encodings, as
//! embedded in DXF 3DSOLID/BODY entities, and an in-memory graph of typed
//! B-rep entities. Loading resolves record pointers in two passes; export
//! assigns dense record numbers by a breadth-first traversal from the
//! caller's bodies.
//!
//! # Example
//!
//! ```
//! use vcad_kernel_acis::{export_sab, export_sat, load};
//!
//! let sat = [
//!     "700 0 1 0",
//!     "@4 test @12 ACIS 7.00 NT @24 Sat Jan  1 10:00:00 2022",
//!     "1 9.9999999999999995e-007 1e-010",
//!     "body $-1 -1 $-1 $1 $-1 $-1 #",
//!     "lump $-1 -1 $-1 $-1 $-1 $0 #",
//!     "End-of-ACIS-data",
//! ];
//! let data = load(&sat[..]).unwrap();
//! assert_eq!(data.bodies.len(), 1);
//!
//! // re-emit as binary and load again
//! let sab = export_sab(&data.graph, &data.bodies, 700).unwrap();
//! let again = load(&sab).unwrap();
//! assert_eq!(again.graph.len(), 2);
//!
//! let lines = export_sat(&again.graph, &again.bodies, 700).unwrap();
//! assert_eq!(lines[3], "body $-1 -1 $-1 $1 $-1 $-1 #");
//! ```

mod config;
pub mod debug;
pub mod entities;
mod error;
mod export;
mod graph;
mod header;
mod loader;
pub mod record;
pub mod registry;
pub mod sab;
pub mod sat;
pub mod version;

/// 3D vector type used for locations and directions.
pub type Vec3 = nalgebra::Vector3<f64>;

pub use config::ExportOptions;
pub use entities::{
    AsmHeader, Body, Coedge, Curve, Edge, EntityKind, EntityVariant, Face, Loop, Lump, Plane,
    Point, Shell, StraightCurve, Surface, Transform, Vertex, WireFormat,
};
pub use error::{AcisError, Result};
pub use export::{export_order, export_sab, export_sab_with, export_sat, export_sat_with};
pub use graph::{Entity, EntityGraph, EntityId};
pub use header::{AcisHeader, DEFAULT_PRODUCT_ID};
pub use loader::{load, AcisData, AcisSource};
pub use sab::SabDocument;
pub use sat::SatDocument;
pub use slotmap::Key;
