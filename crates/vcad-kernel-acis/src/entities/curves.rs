//! Curve entities.

use super::{restore_pattern, write_pattern, AcisEntity, DataExporter, DataLoader, LinkTable};
use crate::error::Result;
use crate::graph::EntityId;
use crate::Vec3;

/// Parameter bounds of a curve, infinite when unbounded.
pub type Bounds = (f64, f64);

const UNBOUNDED: Bounds = (f64::INFINITY, f64::INFINITY);

fn restore_bounds(loader: &mut dyn DataLoader) -> Result<Bounds> {
    Ok((loader.read_interval()?, loader.read_interval()?))
}

fn write_bounds(exporter: &mut dyn DataExporter, bounds: Bounds) {
    exporter.write_interval(bounds.0);
    exporter.write_interval(bounds.1);
}

/// Generic `curve` entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    /// Pattern reference.
    pub pattern: EntityId,
    /// Parameter bounds.
    pub bounds: Bounds,
}

impl Default for Curve {
    fn default() -> Self {
        Self {
            pattern: EntityId::default(),
            bounds: UNBOUNDED,
        }
    }
}

impl AcisEntity for Curve {
    const TYPE: &'static str = "curve";

    fn restore_common(&mut self, loader: &mut dyn DataLoader, links: &LinkTable) -> Result<()> {
        self.pattern = restore_pattern(loader, links)?;
        Ok(())
    }

    fn restore_data(&mut self, loader: &mut dyn DataLoader) -> Result<()> {
        self.bounds = restore_bounds(loader)?;
        Ok(())
    }

    fn write_common(&self, exporter: &mut dyn DataExporter) -> Result<()> {
        write_pattern(exporter, self.pattern)
    }

    fn write_data(&self, exporter: &mut dyn DataExporter) -> Result<()> {
        write_bounds(exporter, self.bounds);
        Ok(())
    }

    fn references(&self) -> Vec<EntityId> {
        vec![self.pattern]
    }
}

/// `straight-curve` entity, an infinite line.
#[derive(Debug, Clone, PartialEq)]
pub struct StraightCurve {
    /// Pattern reference.
    pub pattern: EntityId,
    /// Point on the line.
    pub origin: Vec3,
    /// Line direction.
    pub direction: Vec3,
    /// Parameter bounds.
    pub bounds: Bounds,
}

impl Default for StraightCurve {
    fn default() -> Self {
        Self {
            pattern: EntityId::default(),
            origin: Vec3::zeros(),
            direction: Vec3::x(),
            bounds: UNBOUNDED,
        }
    }
}

impl StraightCurve {
    /// Point at parameter `t`.
    pub fn point_at(&self, t: f64) -> Vec3 {
        self.origin + self.direction * t
    }
}

impl AcisEntity for StraightCurve {
    const TYPE: &'static str = "straight-curve";

    fn restore_common(&mut self, loader: &mut dyn DataLoader, links: &LinkTable) -> Result<()> {
        self.pattern = restore_pattern(loader, links)?;
        Ok(())
    }

    fn restore_data(&mut self, loader: &mut dyn DataLoader) -> Result<()> {
        self.origin = loader.read_vec3()?;
        self.direction = loader.read_vec3()?;
        self.bounds = restore_bounds(loader)?;
        Ok(())
    }

    fn write_common(&self, exporter: &mut dyn DataExporter) -> Result<()> {
        write_pattern(exporter, self.pattern)
    }

    fn write_data(&self, exporter: &mut dyn DataExporter) -> Result<()> {
        exporter.write_loc_vec3(&self.origin);
        exporter.write_dir_vec3(&self.direction);
        write_bounds(exporter, self.bounds);
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
    use crate::sat::{SatDataExporter, SatDataLoader, SatToken};

    fn tokens(text: &str) -> Vec<SatToken> {
        text.split_whitespace()
            .map(|t| SatToken::parse(t).unwrap())
            .collect()
    }

    #[test]
    fn test_straight_curve_layout() {
        let data = tokens("$-1 0 0 0 1 0 0 F -5 I");
        let mut loader = SatDataLoader::new(&data, 700);
        let mut line = StraightCurve::default();
        line.restore_common(&mut loader, &LinkTable::default())
            .unwrap();
        line.restore_data(&mut loader).unwrap();
        assert_eq!(line.bounds, (-5.0, f64::INFINITY));
        assert_eq!(line.point_at(2.0), Vec3::new(2.0, 0.0, 0.0));

        let links = |_: EntityId| -> Result<RecordPtr> { Ok(RecordPtr::NULL) };
        let mut exporter = SatDataExporter::new(&links, 700);
        line.write_common(&mut exporter).unwrap();
        line.write_data(&mut exporter).unwrap();
        assert_eq!(exporter.into_tokens(), data);
    }

    #[test]
    fn test_curve_defaults_unbounded() {
        let curve = Curve::default();
        assert!(curve.bounds.0.is_infinite() && curve.bounds.1.is_infinite());
    }
}
