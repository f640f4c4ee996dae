//! Triangulated spacecraft shell
//!
//! The structure is an arena of vertices plus triangles that index into it.
//! Geometry (normal, area, centroid, twist, shove) is fixed once
//! [`Structure::mass_properties`] has run; thermal and electrical
//! propagators only touch the per-triangle energy fields.

use super::error::{PhysicsError, PhysicsResult};
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Vertices closer than this are merged (m)
pub const VERTEX_TOLERANCE: f64 = 0.001;

/// Grid spacing of the shove surface integral (m)
const SHOVE_STEP: f64 = 0.01;

/// Normalization applied to the shove sum
const SHOVE_SCALE: f64 = 10_000.0;

/// Which way a triangle faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum External {
    /// Inside the body, no surface forces
    Internal,
    /// Exposed, normal pointing away from the body
    #[default]
    Outward,
    /// Exposed, normal pointing into the body
    Inward,
}

impl External {
    pub fn is_external(&self) -> bool {
        !matches!(self, Self::Internal)
    }
}

/// Optical, thermal and photovoltaic properties of a face
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Solar absorptivity
    pub abs: f64,
    /// Infrared emissivity
    pub emi: f64,
    /// Specific heat capacity (J/kg/K)
    pub hcap: f64,
    /// Fraction of the face covered by solar cells
    pub pcell: f64,
    /// Cell efficiency at 0 K
    pub ecellbase: f64,
    /// Cell efficiency change per kelvin
    pub ecellslope: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            abs: 0.88,
            emi: 0.88,
            hcap: 900.0,
            pcell: 0.0,
            ecellbase: 0.25,
            ecellslope: -0.0004,
        }
    }
}

impl Material {
    /// Body panel with the given solar-cell coverage
    pub fn with_cells(mut self, pcell: f64) -> Self {
        self.pcell = pcell;
        self
    }
}

/// One face of the mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    /// Vertex indices into [`Structure::vertices`]
    pub tidx: [usize; 3],
    pub external: External,
    pub material: Material,

    /// Unit normal
    pub normal: Vector3<f64>,
    /// Centroid in the construction frame (m)
    pub com: Vector3<f64>,
    /// Area (m²)
    pub area: f64,
    /// Perimeter (m)
    pub perimeter: f64,
    /// Mass (kg)
    pub mass: f64,
    /// Pressure-to-torque factor about the centre of mass (m³)
    pub twist: Vector3<f64>,
    /// Pressure-to-force factor (m)
    pub shove: Vector3<f64>,

    /// Solar irradiation on the face (W/m²)
    pub sirradiation: f64,
    /// Earth infrared irradiation on the face (W/m²)
    pub eirradiation: f64,
    /// Heat content (J)
    pub heat: f64,
    /// Temperature (K)
    pub temp: f64,
    /// Photovoltaic power (W)
    pub power: f64,
    pub volt: f64,
    pub amp: f64,
}

impl Triangle {
    /// Heat capacity of the face (J/K)
    pub fn heat_capacity(&self) -> f64 {
        self.mass * self.material.hcap
    }

    /// Photovoltaic output at the current temperature and solar irradiation (W)
    pub fn pv_power(&self) -> f64 {
        if self.material.pcell <= 0.0 || self.sirradiation <= 0.0 {
            return 0.0;
        }
        let efficiency =
            (self.material.ecellbase + self.material.ecellslope * self.temp).max(0.0);
        self.material.pcell * self.area * efficiency * self.sirradiation
    }
}

/// Standard bus shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StructureType {
    /// Faces supplied by the caller
    Custom,
    U1,
    #[serde(alias = "U1.5")]
    U1_5,
    U2,
    #[default]
    U3,
    U6,
    U12,
    /// Hexagonal prism, 65 cm wide and 80 cm high
    Hex65W80H,
    /// Octagonal prism, 60 cm wide and 60 cm high
    Oct60W60H,
}

impl StructureType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Custom => "Custom",
            Self::U1 => "U1",
            Self::U1_5 => "U1.5",
            Self::U2 => "U2",
            Self::U3 => "U3",
            Self::U6 => "U6",
            Self::U12 => "U12",
            Self::Hex65W80H => "HEX65W80H",
            Self::Oct60W60H => "OCT60W60H",
        }
    }

    pub fn all() -> &'static [StructureType] {
        &[
            Self::Custom,
            Self::U1,
            Self::U1_5,
            Self::U2,
            Self::U3,
            Self::U6,
            Self::U12,
            Self::Hex65W80H,
            Self::Oct60W60H,
        ]
    }

    /// Legacy numeric tag
    pub fn from_tag(tag: u16) -> PhysicsResult<Self> {
        Self::all()
            .get(tag as usize)
            .copied()
            .ok_or_else(|| PhysicsError::out_of_range(format!("structure type tag {}", tag)))
    }

    /// Outer dimensions of the cuboid types (m)
    fn cuboid_size(&self) -> Option<Vector3<f64>> {
        match self {
            Self::U1 => Some(Vector3::new(0.1, 0.1, 0.1)),
            Self::U1_5 => Some(Vector3::new(0.1, 0.1, 0.15)),
            Self::U2 => Some(Vector3::new(0.1, 0.1, 0.2)),
            Self::U3 => Some(Vector3::new(0.1, 0.1, 0.3)),
            Self::U6 => Some(Vector3::new(0.3, 0.2, 0.1)),
            Self::U12 => Some(Vector3::new(0.3, 0.2, 0.2)),
            _ => None,
        }
    }
}

impl FromStr for StructureType {
    type Err = PhysicsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('_', ".");
        Self::all()
            .iter()
            .find(|t| t.name().to_ascii_uppercase() == wanted)
            .copied()
            .ok_or_else(|| PhysicsError::out_of_range(format!("structure type {:?}", s)))
    }
}

/// Aggregate mass properties of a finished structure
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassProperties {
    /// Total mass (kg)
    pub mass: f64,
    /// Centre of mass in the construction frame (m)
    pub com: Vector3<f64>,
    /// Principal moments of inertia (kg m²)
    pub moi: Vector3<f64>,
    /// Total heat capacity (J/K)
    pub heat_capacity: f64,
    /// Total area (m²)
    pub area: f64,
}

/// Vertex arena plus the triangles that reference it
#[derive(Debug, Clone, Default)]
pub struct Structure {
    pub kind: StructureType,
    pub vertices: Vec<Vector3<f64>>,
    pub triangles: Vec<Triangle>,
}

impl Structure {
    /// Empty structure for caller-supplied faces
    pub fn custom() -> Self {
        Self {
            kind: StructureType::Custom,
            ..Default::default()
        }
    }

    /// Build one of the standard bus shapes with uniform areal density
    pub fn setup(kind: StructureType, material: &Material, mass: f64) -> PhysicsResult<Self> {
        let mut structure = Self {
            kind,
            ..Default::default()
        };
        let body = *material;
        let id = UnitQuaternion::identity();
        let zero = Vector3::zeros();

        if let Some(size) = kind.cuboid_size() {
            structure.add_cuboid(&size, &id, &zero, &body)?;
        } else {
            match kind {
                StructureType::Hex65W80H => structure.add_prism(6, 0.65, 0.8, &body)?,
                StructureType::Oct60W60H => structure.add_prism(8, 0.6, 0.6, &body)?,
                StructureType::Custom => {}
                _ => {
                    return Err(PhysicsError::out_of_range(format!(
                        "no geometry for {}",
                        kind.name()
                    )))
                }
            }
        }

        structure.distribute_mass(mass);
        log::info!(
            "Built {} structure: {} vertices, {} triangles, {:.4} m²",
            kind.name(),
            structure.vertices.len(),
            structure.triangles.len(),
            structure.area()
        );
        Ok(structure)
    }

    /// Total area (m²)
    pub fn area(&self) -> f64 {
        self.triangles.iter().map(|t| t.area).sum()
    }

    /// Index of a vertex, merging with any existing one within 1 mm
    pub fn add_vertex(&mut self, p: Vector3<f64>) -> usize {
        if let Some(i) = self
            .vertices
            .iter()
            .position(|v| (v - p).norm() < VERTEX_TOLERANCE)
        {
            return i;
        }
        self.vertices.push(p);
        self.vertices.len() - 1
    }

    /// Add a single triangle; returns its index
    ///
    /// External triangles are wound so that the normal points away from
    /// (outward) or towards (inward) the construction origin.
    pub fn add_triangle(
        &mut self,
        a: Vector3<f64>,
        b: Vector3<f64>,
        c: Vector3<f64>,
        external: External,
        material: &Material,
    ) -> PhysicsResult<usize> {
        let cross = (b - a).cross(&(c - a));
        let area = cross.norm() / 2.0;
        if area < VERTEX_TOLERANCE * VERTEX_TOLERANCE {
            return Err(PhysicsError::out_of_range("degenerate triangle"));
        }

        let mut tidx = [self.add_vertex(a), self.add_vertex(b), self.add_vertex(c)];
        let com = (a + b + c) / 3.0;
        let mut normal = cross / (2.0 * area);
        let facing = normal.dot(&com);
        let flip = match external {
            External::Outward => facing < 0.0,
            External::Inward => facing > 0.0,
            External::Internal => false,
        };
        if flip {
            normal = -normal;
            tidx.swap(1, 2);
        }

        self.triangles.push(Triangle {
            tidx,
            external,
            material: *material,
            normal,
            com,
            area,
            perimeter: (b - a).norm() + (c - b).norm() + (a - c).norm(),
            mass: 0.0,
            twist: Vector3::zeros(),
            shove: Vector3::zeros(),
            sirradiation: 0.0,
            eirradiation: 0.0,
            heat: 0.0,
            temp: 0.0,
            power: 0.0,
            volt: 0.0,
            amp: 0.0,
        });
        Ok(self.triangles.len() - 1)
    }

    /// Add a planar face given its corners; returns the number of triangles
    ///
    /// Corners are rotated by `orientation` then shifted by `offset`.
    /// Triangles are kept as is; anything larger is fanned around the centroid.
    pub fn add_face(
        &mut self,
        points: &[Vector3<f64>],
        orientation: &UnitQuaternion<f64>,
        offset: &Vector3<f64>,
        external: External,
        material: &Material,
    ) -> PhysicsResult<usize> {
        if points.len() < 3 {
            return Err(PhysicsError::out_of_range(format!(
                "face needs at least 3 corners, got {}",
                points.len()
            )));
        }
        let corners: Vec<Vector3<f64>> = points.iter().map(|p| orientation * p + offset).collect();

        if corners.len() == 3 {
            self.add_triangle(corners[0], corners[1], corners[2], external, material)?;
            return Ok(1);
        }

        let centroid = corners.iter().sum::<Vector3<f64>>() / corners.len() as f64;
        for (i, p) in corners.iter().enumerate() {
            let q = corners[(i + 1) % corners.len()];
            self.add_triangle(*p, q, centroid, external, material)?;
        }
        Ok(corners.len())
    }

    /// Six outward faces of a box centred on `offset`
    pub fn add_cuboid(
        &mut self,
        size: &Vector3<f64>,
        orientation: &UnitQuaternion<f64>,
        offset: &Vector3<f64>,
        material: &Material,
    ) -> PhysicsResult<usize> {
        let h = size / 2.0;
        let mut count = 0;
        for sign in [-1.0, 1.0] {
            let x = sign * h.x;
            count += self.add_face(
                &[
                    Vector3::new(x, -h.y, -h.z),
                    Vector3::new(x, h.y, -h.z),
                    Vector3::new(x, h.y, h.z),
                    Vector3::new(x, -h.y, h.z),
                ],
                orientation,
                offset,
                External::Outward,
                material,
            )?;
            let y = sign * h.y;
            count += self.add_face(
                &[
                    Vector3::new(-h.x, y, -h.z),
                    Vector3::new(h.x, y, -h.z),
                    Vector3::new(h.x, y, h.z),
                    Vector3::new(-h.x, y, h.z),
                ],
                orientation,
                offset,
                External::Outward,
                material,
            )?;
            let z = sign * h.z;
            count += self.add_face(
                &[
                    Vector3::new(-h.x, -h.y, z),
                    Vector3::new(h.x, -h.y, z),
                    Vector3::new(h.x, h.y, z),
                    Vector3::new(-h.x, h.y, z),
                ],
                orientation,
                offset,
                External::Outward,
                material,
            )?;
        }
        Ok(count)
    }

    /// Regular prism about z with an internal mid-height deck
    fn add_prism(
        &mut self,
        sides: usize,
        width: f64,
        height: f64,
        material: &Material,
    ) -> PhysicsResult<()> {
        let id = UnitQuaternion::identity();
        let zero = Vector3::zeros();
        let radius = width / 2.0;
        let ring = |z: f64| -> Vec<Vector3<f64>> {
            (0..sides)
                .map(|k| {
                    let angle = std::f64::consts::TAU * k as f64 / sides as f64;
                    Vector3::new(radius * angle.cos(), radius * angle.sin(), z)
                })
                .collect()
        };
        let bottom = ring(-height / 2.0);
        let top = ring(height / 2.0);

        for k in 0..sides {
            let n = (k + 1) % sides;
            self.add_face(
                &[bottom[k], bottom[n], top[n], top[k]],
                &id,
                &zero,
                External::Outward,
                material,
            )?;
        }
        self.add_face(&top, &id, &zero, External::Outward, material)?;
        self.add_face(&bottom, &id, &zero, External::Outward, material)?;
        self.add_face(&ring(0.0), &id, &zero, External::Internal, &material.with_cells(0.0))?;
        Ok(())
    }

    /// Spread `mass` over all faces in proportion to area
    pub fn distribute_mass(&mut self, mass: f64) {
        let area = self.area();
        if area <= 0.0 {
            return;
        }
        let density = mass / area;
        for triangle in &mut self.triangles {
            triangle.mass = density * triangle.area;
        }
    }

    /// Total mass, centre of mass and diagonal inertia; freezes twist and shove
    ///
    /// Fails with `MassTooLow` when the structure carries no mass.
    pub fn mass_properties(&mut self) -> PhysicsResult<MassProperties> {
        let mass: f64 = self.triangles.iter().map(|t| t.mass).sum();
        if mass <= 0.0 {
            return Err(PhysicsError::MassTooLow { mass });
        }

        let com = self
            .triangles
            .iter()
            .fold(Vector3::zeros(), |acc, t| acc + t.mass * t.com)
            / mass;

        let mut moi = Vector3::zeros();
        for t in &self.triangles {
            let c = t.com - com;
            moi.x += t.mass * (c.y * c.y + c.z * c.z);
            moi.y += t.mass * (c.x * c.x + c.z * c.z);
            moi.z += t.mass * (c.x * c.x + c.y * c.y);
        }

        for i in 0..self.triangles.len() {
            if !self.triangles[i].external.is_external() {
                continue;
            }
            let corners = self.triangles[i].tidx.map(|k| self.vertices[k] - com);
            let t = &mut self.triangles[i];
            let c = t.com - com;
            t.twist = -t.area * c.cross(&t.normal);
            t.shove = shove(&c, &corners);
        }

        let properties = MassProperties {
            mass,
            com,
            moi,
            heat_capacity: self.triangles.iter().map(|t| t.heat_capacity()).sum(),
            area: self.area(),
        };
        log::debug!(
            "Mass properties: {:.3} kg, com {:?}, moi {:?}",
            properties.mass,
            properties.com,
            properties.moi
        );
        Ok(properties)
    }
}

/// Discretized inverse-square surface sum over a triangle
///
/// The triangle is walked as three sub-triangles from the centroid to each
/// edge in 1 cm steps; each sample point adds `p / |p|²`.
fn shove(centroid: &Vector3<f64>, corners: &[Vector3<f64>; 3]) -> Vector3<f64> {
    let mut sum = Vector3::zeros();
    for i in 0..3 {
        let tv0 = corners[i] - centroid;
        let tv1 = corners[(i + 1) % 3] - centroid;
        let ta = tv0.norm();
        if ta <= 0.0 {
            continue;
        }
        let mut j = 0.0;
        while j <= ta / SHOVE_STEP {
            let tv2 = tv0 * (SHOVE_STEP * j / ta);
            let tv3 = tv1 * (SHOVE_STEP * j / ta);
            let dv = tv3 - tv2;
            let tb = dv.norm();
            let mut k = 0.0;
            while k < tb / SHOVE_STEP {
                let sv = centroid + tv2 + dv * (SHOVE_STEP * k / tb);
                let r2 = sv.norm_squared();
                if r2 > 0.0 {
                    sum += sv / r2;
                }
                k += 1.0;
            }
            j += 1.0;
        }
    }
    -sum / SHOVE_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuboid_mass_properties() {
        let mut structure = Structure::setup(StructureType::U3, &Material::default(), 4.0).unwrap();
        let face_mass: f64 = structure.triangles.iter().map(|t| t.mass).sum();
        let props = structure.mass_properties().unwrap();

        assert!(props.com.norm() < 0.001);
        assert!((props.mass - face_mass).abs() < 1e-12);
        assert!((props.mass - 4.0).abs() < 1e-12);
        // Long axis has the smallest moment
        assert!(props.moi.z < props.moi.x);
        assert!((props.moi.x - props.moi.y).abs() < 1e-12);
    }

    #[test]
    fn test_vertex_deduplication() {
        let mut structure =
            Structure::setup(StructureType::U1, &Material::default(), 1.0).unwrap();
        // 8 corners plus one centroid per face
        assert_eq!(structure.vertices.len(), 14);
        assert_eq!(structure.triangles.len(), 24);
        let idx = structure.add_vertex(Vector3::new(0.05, 0.05, 0.0502));
        assert!(idx < 14);
    }

    #[test]
    fn test_outward_normals() {
        for kind in [StructureType::U6, StructureType::Hex65W80H, StructureType::Oct60W60H] {
            let structure = Structure::setup(kind, &Material::default(), 10.0).unwrap();
            for t in structure.triangles.iter().filter(|t| t.external.is_external()) {
                assert!(t.normal.dot(&t.com) > 0.0, "{} face points inward", kind.name());
                assert!((t.normal.norm() - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_twist_cancels_on_symmetric_body() {
        let mut structure =
            Structure::setup(StructureType::U2, &Material::default(), 2.0).unwrap();
        structure.mass_properties().unwrap();
        let twist: Vector3<f64> = structure.triangles.iter().map(|t| t.twist).sum();
        assert!(twist.norm() < 1e-12);
        let top = structure
            .triangles
            .iter()
            .find(|t| t.normal.z > 0.99)
            .unwrap();
        // Pressure on the +z face pushes towards -z
        assert!(top.shove.z < 0.0);
    }

    #[test]
    fn test_unknown_tag_and_empty_custom() {
        assert!(matches!(
            StructureType::from_tag(42),
            Err(PhysicsError::OutOfRange { .. })
        ));
        assert_eq!(StructureType::from_tag(7).unwrap(), StructureType::Hex65W80H);
        assert_eq!("u1.5".parse::<StructureType>().unwrap(), StructureType::U1_5);
        assert!("U5".parse::<StructureType>().is_err());

        let mut empty = Structure::setup(StructureType::Custom, &Material::default(), 1.0).unwrap();
        let err = empty.mass_properties().unwrap_err();
        assert_eq!(err, PhysicsError::MassTooLow { mass: 0.0 });
        assert_eq!(err.code(), -1);
    }

    #[test]
    fn test_face_needs_three_corners() {
        let mut structure = Structure::custom();
        let err = structure.add_face(
            &[Vector3::x(), Vector3::y()],
            &UnitQuaternion::identity(),
            &Vector3::zeros(),
            External::Outward,
            &Material::default(),
        );
        assert!(err.is_err());
    }
}
