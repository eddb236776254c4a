//! Point, transformation and assembly header entities.

use nalgebra::Matrix4;

use super::{
    restore_pattern, write_pattern, AcisEntity, DataExporter, DataLoader, LinkTable, WireFormat,
};
use crate::error::{AcisError, Result};
use crate::graph::EntityId;
use crate::record::RecordPtr;
use crate::sat::{SatDataExporter, SatDataLoader, SatToken};
use crate::version::DEFAULT_ASM_VERSION;
use crate::Vec3;

/// `point` entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Point {
    /// Pattern reference.
    pub pattern: EntityId,
    /// Location in model units.
    pub location: Vec3,
}

impl AcisEntity for Point {
    const TYPE: &'static str = "point";

    fn restore_common(&mut self, loader: &mut dyn DataLoader, links: &LinkTable) -> Result<()> {
        self.pattern = restore_pattern(loader, links)?;
        Ok(())
    }

    fn restore_data(&mut self, loader: &mut dyn DataLoader) -> Result<()> {
        self.location = loader.read_vec3()?;
        Ok(())
    }

    fn write_common(&self, exporter: &mut dyn DataExporter) -> Result<()> {
        write_pattern(exporter, self.pattern)
    }

    fn write_data(&self, exporter: &mut dyn DataExporter) -> Result<()> {
        exporter.write_loc_vec3(&self.location);
        Ok(())
    }

    fn references(&self) -> Vec<EntityId> {
        vec![self.pattern]
    }
}

/// `transform` entity, an affine placement.
///
/// The 3x3 part and the translation are stored as twelve numbers, followed
/// by a uniform scale and the rotate/reflect/shear flags. SAT writes them
/// as discrete tokens, SAB as one literal string in SAT notation.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Homogeneous matrix for column vectors.
    pub matrix: Matrix4<f64>,
    /// Uniform scale factor.
    pub scale: f64,
    /// Whether the matrix rotates.
    pub rotate: bool,
    /// Whether the matrix mirrors.
    pub reflect: bool,
    /// Whether the matrix shears.
    pub shear: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            matrix: Matrix4::identity(),
            scale: 1.0,
            rotate: false,
            reflect: false,
            shear: false,
        }
    }
}

impl Transform {
    /// Build a transform, deriving scale and rotate flag from `matrix`.
    ///
    /// A uniform scale is assumed: the scale is the length of the image of
    /// the x-axis, rounded to six decimals.
    pub fn from_matrix(matrix: Matrix4<f64>) -> Self {
        let image = matrix.fixed_view::<3, 3>(0, 0) * Vec3::x();
        let scale = (image.norm() * 1e6).round() / 1e6;
        let rotate = image
            .try_normalize(f64::EPSILON)
            .map_or(false, |dir| (dir - Vec3::x()).norm() > 1e-9);
        Self {
            matrix,
            scale,
            rotate,
            reflect: false,
            shear: false,
        }
    }

    /// Translation part.
    pub fn translation(&self) -> Vec3 {
        self.matrix.fixed_view::<3, 1>(0, 3).into_owned()
    }

    fn restore_values(&mut self, loader: &mut dyn DataLoader) -> Result<()> {
        let mut matrix = Matrix4::identity();
        for col in 0..4 {
            for row in 0..3 {
                matrix[(row, col)] = loader.read_double()?;
            }
        }
        self.matrix = matrix;
        self.scale = loader.read_double()?;
        self.rotate = loader.read_bool("rotate", "no_rotate")?;
        self.reflect = loader.read_bool("reflect", "no_reflect")?;
        self.shear = loader.read_bool("shear", "no_shear")?;
        Ok(())
    }

    fn write_values(&self, exporter: &mut dyn DataExporter) {
        for col in 0..4 {
            for row in 0..3 {
                exporter.write_double(self.matrix[(row, col)]);
            }
        }
        exporter.write_double(self.scale);
        exporter.write_bool(self.rotate, "rotate", "no_rotate");
        exporter.write_bool(self.reflect, "reflect", "no_reflect");
        exporter.write_bool(self.shear, "shear", "no_shear");
    }
}

impl AcisEntity for Transform {
    const TYPE: &'static str = "transform";

    fn restore_data(&mut self, loader: &mut dyn DataLoader) -> Result<()> {
        match loader.format() {
            WireFormat::Sat => self.restore_values(loader),
            WireFormat::Sab => {
                let text = loader.read_str()?;
                let tokens = text
                    .split_whitespace()
                    .map(SatToken::parse)
                    .collect::<Result<Vec<_>>>()?;
                self.restore_values(&mut SatDataLoader::new(&tokens, loader.version()))
            }
        }
    }

    fn write_common(&self, exporter: &mut dyn DataExporter) -> Result<()> {
        match exporter.format() {
            WireFormat::Sat => self.write_values(exporter),
            WireFormat::Sab => {
                let no_links = |_: EntityId| -> Result<RecordPtr> {
                    Err(AcisError::InvalidLinkStructure(
                        "transform data has no references".into(),
                    ))
                };
                let mut sat = SatDataExporter::new(&no_links, exporter.version());
                self.write_values(&mut sat);
                let text = sat
                    .into_tokens()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                exporter.write_literal_str(&text);
            }
        }
        Ok(())
    }
}

/// `asmheader` record leading streams of version 20800 and later.
#[derive(Debug, Clone, PartialEq)]
pub struct AsmHeader {
    /// Assembly modeler version, e.g. `208.0.4.7009`.
    pub version: String,
}

impl Default for AsmHeader {
    fn default() -> Self {
        Self {
            version: DEFAULT_ASM_VERSION.to_string(),
        }
    }
}

impl AcisEntity for AsmHeader {
    const TYPE: &'static str = "asmheader";

    fn restore_common(&mut self, loader: &mut dyn DataLoader, _links: &LinkTable) -> Result<()> {
        self.version = loader.read_str()?;
        Ok(())
    }

    fn write_common(&self, exporter: &mut dyn DataExporter) -> Result<()> {
        exporter.write_str(&self.version);
        Ok(())
    }
}
