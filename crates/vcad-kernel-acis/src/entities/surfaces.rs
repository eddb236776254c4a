//! Surface entities.

use super::{restore_pattern, write_pattern, AcisEntity, DataExporter, DataLoader, LinkTable};
use crate::error::Result;
use crate::graph::EntityId;
use crate::Vec3;

const INF: f64 = f64::INFINITY;

/// Generic `surface` entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    /// Pattern reference.
    pub pattern: EntityId,
    /// Bounds in u direction.
    pub u_bounds: (f64, f64),
    /// Bounds in v direction.
    pub v_bounds: (f64, f64),
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            pattern: EntityId::default(),
            u_bounds: (INF, INF),
            v_bounds: (INF, INF),
        }
    }
}

fn restore_uv_bounds(loader: &mut dyn DataLoader) -> Result<[(f64, f64); 2]> {
    Ok([
        (loader.read_interval()?, loader.read_interval()?),
        (loader.read_interval()?, loader.read_interval()?),
    ])
}

fn write_uv_bounds(exporter: &mut dyn DataExporter, u: (f64, f64), v: (f64, f64)) {
    for value in [u.0, u.1, v.0, v.1] {
        exporter.write_interval(value);
    }
}

impl AcisEntity for Surface {
    const TYPE: &'static str = "surface";

    fn restore_common(&mut self, loader: &mut dyn DataLoader, links: &LinkTable) -> Result<()> {
        self.pattern = restore_pattern(loader, links)?;
        Ok(())
    }

    fn restore_data(&mut self, loader: &mut dyn DataLoader) -> Result<()> {
        [self.u_bounds, self.v_bounds] = restore_uv_bounds(loader)?;
        Ok(())
    }

    fn write_common(&self, exporter: &mut dyn DataExporter) -> Result<()> {
        write_pattern(exporter, self.pattern)
    }

    fn write_data(&self, exporter: &mut dyn DataExporter) -> Result<()> {
        write_uv_bounds(exporter, self.u_bounds, self.v_bounds);
        Ok(())
    }

    fn references(&self) -> Vec<EntityId> {
        vec![self.pattern]
    }
}

/// `plane-surface` entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    /// Pattern reference.
    pub pattern: EntityId,
    /// Point on the plane.
    pub origin: Vec3,
    /// Normal, pointing outside.
    pub normal: Vec3,
    /// Unit vector of the u direction.
    pub u_dir: Vec3,
    /// `true` = reverse_v, `false` = forward_v.
    pub reverse_v: bool,
    /// Bounds in u direction.
    pub u_bounds: (f64, f64),
    /// Bounds in v direction.
    pub v_bounds: (f64, f64),
}

impl Default for Plane {
    fn default() -> Self {
        Self {
            pattern: EntityId::default(),
            origin: Vec3::zeros(),
            normal: Vec3::z(),
            u_dir: Vec3::x(),
            reverse_v: true,
            u_bounds: (INF, INF),
            v_bounds: (INF, INF),
        }
    }
}

impl Plane {
    /// Direction of v, `normal × u_dir`, negated for `reverse_v`.
    pub fn v_dir(&self) -> Vec3 {
        let v_dir = self.normal.cross(&self.u_dir);
        if self.reverse_v {
            -v_dir
        } else {
            v_dir
        }
    }
}

impl AcisEntity for Plane {
    const TYPE: &'static str = "plane-surface";

    fn restore_common(&mut self, loader: &mut dyn DataLoader, links: &LinkTable) -> Result<()> {
        self.pattern = restore_pattern(loader, links)?;
        self.origin = loader.read_vec3()?;
        self.normal = loader.read_vec3()?;
        self.u_dir = loader.read_vec3()?;
        self.reverse_v = loader.read_bool("reverse_v", "forward_v")?;
        Ok(())
    }

    fn restore_data(&mut self, loader: &mut dyn DataLoader) -> Result<()> {
        [self.u_bounds, self.v_bounds] = restore_uv_bounds(loader)?;
        Ok(())
    }

    fn write_common(&self, exporter: &mut dyn DataExporter) -> Result<()> {
        write_pattern(exporter, self.pattern)?;
        exporter.write_loc_vec3(&self.origin);
        exporter.write_dir_vec3(&self.normal);
        exporter.write_dir_vec3(&self.u_dir);
        exporter.write_bool(self.reverse_v, "reverse_v", "forward_v");
        Ok(())
    }

    fn write_data(&self, exporter: &mut dyn DataExporter) -> Result<()> {
        write_uv_bounds(exporter, self.u_bounds, self.v_bounds);
        Ok(())
    }

    fn references(&self) -> Vec<EntityId> {
        vec![self.pattern]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordPtr;
    use crate::sab::{SabDataExporter, SabDataLoader, SabToken};
    use crate::sat::{SatDataLoader, SatToken};

    #[test]
    fn test_plane_sat_layout() {
        let data: Vec<SatToken> = "$-1 0 0 1 0 0 1 1 0 0 forward_v I I F 0 F 2"
            .split_whitespace()
            .map(|t| SatToken::parse(t).unwrap())
            .collect();
        let mut loader = SatDataLoader::new(&data, 700);
        let mut plane = Plane::default();
        plane.restore_common(&mut loader, &LinkTable::default())
            .unwrap();
        plane.restore_data(&mut loader).unwrap();
        assert_eq!(plane.origin, Vec3::new(0.0, 0.0, 1.0));
        assert!(!plane.reverse_v);
        assert_eq!(plane.u_bounds, (INF, INF));
        assert_eq!(plane.v_bounds, (0.0, 2.0));
        assert_eq!(plane.v_dir(), Vec3::y());
    }

    #[test]
    fn test_plane_sab_vectors() {
        let plane = Plane {
            origin: Vec3::new(1.0, 2.0, 3.0),
            ..Default::default()
        };
        let links = |_: EntityId| -> Result<RecordPtr> { Ok(RecordPtr::NULL) };
        let mut exporter = SabDataExporter::new(&links, 700);
        plane.write_common(&mut exporter).unwrap();
        plane.write_data(&mut exporter).unwrap();
        let tokens = exporter.into_tokens();
        assert_eq!(tokens[1], SabToken::LocationVec(plane.origin));
        assert_eq!(tokens[2], SabToken::DirectionVec(Vec3::z()));
        assert_eq!(tokens[4], SabToken::Bool(true));
        assert_eq!(tokens.len(), 9);

        let mut restored = Plane::default();
        let mut loader = SabDataLoader::new(&tokens, 700);
        restored
            .restore_common(&mut loader, &LinkTable::default())
            .unwrap();
        restored.restore_data(&mut loader).unwrap();
        assert_eq!(restored, plane);
        assert_eq!(restored.v_dir(), -Vec3::y());
    }
}
