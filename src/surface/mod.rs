//! Read-only terrain surfaces queried by the projector.

#[cfg(test)]
pub(crate) mod fixtures;
mod tin;

pub use tin::Tin;

use slotmap::SlotMap;

use crate::math::Point3;

slotmap::new_key_type! {
    /// Handle of a surface registered in a [`SurfaceRegistry`].
    pub struct SurfaceId;
}

/// Index of a triangle within one surface.
pub type TriangleId = usize;

/// Result of locating a plan point on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLocation {
    Triangle(TriangleId),
    External,
    Void(TriangleId),
}

impl PointLocation {
    #[must_use]
    pub fn triangle(self) -> Option<TriangleId> {
        match self {
            Self::Triangle(t) => Some(t),
            Self::External | Self::Void(_) => None,
        }
    }
}

/// How a draped point relates to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrapeStatus {
    Inside,
    /// Outside the hull but within point tolerance of it.
    OnHull,
    External,
    Void,
}

/// Where a segment walk goes next from the current triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NextCrossing {
    /// The segment ends inside the current triangle.
    EndsInside,
    /// The segment leaves the current triangle at parameter `t`.
    Crosses {
        t: f64,
        /// Crossing point with the surface elevation at that point.
        point: Point3,
        next: PointLocation,
    },
}

/// Kind of boundary a segment runs into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptKind {
    Hull,
    Void,
}

/// First crossing of a segment with a hull or void boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intercept {
    pub t: f64,
    /// Crossing point with the boundary elevation at that point.
    pub point: Point3,
    pub kind: InterceptKind,
}

/// A triangulated terrain surface. All queries are non-mutating.
pub trait TerrainSurface: Send + Sync {
    /// Locates the triangle containing the plan position of `p`.
    fn locate_point(&self, p: &Point3) -> PointLocation;

    /// Surface elevation at the plan position of `p`.
    fn drape_point(&self, p: &Point3) -> (Option<f64>, DrapeStatus);

    /// Vertices of a triangle, anticlockwise.
    fn triangle(&self, id: TriangleId) -> [Point3; 3];

    /// Next edge crossed by the plan segment `from -> to` after parameter
    /// `t_enter`, starting in triangle `current`.
    ///
    /// Returns `None` when the surface topology offers no way forward.
    fn walk_next_edge_crossing(
        &self,
        from: &Point3,
        to: &Point3,
        current: TriangleId,
        t_enter: f64,
    ) -> Option<NextCrossing>;

    /// Hull edge closest to the plan position of `p`.
    fn closest_hull_edge(&self, p: &Point3) -> Option<(Point3, Point3)>;

    /// First hull or void boundary crossed by the plan segment `from -> to`.
    fn find_hull_or_void_intercept(&self, from: &Point3, to: &Point3) -> Option<Intercept>;

    /// Elevation of triangle `id`'s plane at the plan position of `p`.
    fn triangle_elevation(&self, id: TriangleId, p: &Point3) -> f64 {
        let [a, b, c] = self.triangle(id);
        plane_elevation(&a, &b, &c, p)
    }
}

/// Elevation at `p` of the plane through `a`, `b`, `c`.
///
/// Falls back to the mean vertex elevation for degenerate triangles.
#[must_use]
pub fn plane_elevation(a: &Point3, b: &Point3, c: &Point3, p: &Point3) -> f64 {
    let det = (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y);
    if det.abs() < crate::math::TOLERANCE {
        return (a.z + b.z + c.z) / 3.0;
    }
    let l1 = ((b.y - c.y) * (p.x - c.x) + (c.x - b.x) * (p.y - c.y)) / det;
    let l2 = ((c.y - a.y) * (p.x - c.x) + (a.x - c.x) * (p.y - c.y)) / det;
    let l3 = 1.0 - l1 - l2;
    l1 * a.z + l2 * b.z + l3 * c.z
}

/// Owns the terrain surfaces that vertices refer to by [`SurfaceId`].
#[derive(Default)]
pub struct SurfaceRegistry {
    surfaces: SlotMap<SurfaceId, Box<dyn TerrainSurface>>,
}

impl std::fmt::Debug for SurfaceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceRegistry")
            .field("len", &self.surfaces.len())
            .finish()
    }
}

impl SurfaceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a surface and returns its handle.
    pub fn insert(&mut self, surface: impl TerrainSurface + 'static) -> SurfaceId {
        self.surfaces.insert(Box::new(surface))
    }

    /// Looks up a registered surface.
    #[must_use]
    pub fn get(&self, id: SurfaceId) -> Option<&dyn TerrainSurface> {
        self.surfaces.get(id).map(AsRef::as_ref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn plane_elevation_interpolates() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(10.0, 0.0, 10.0);
        let c = Point3::new(0.0, 10.0, 0.0);
        let z = plane_elevation(&a, &b, &c, &Point3::new(4.0, 3.0, 0.0));
        assert!((z - 4.0).abs() < 1e-9, "z={z}");
    }

    #[test]
    fn registry_round_trip() {
        let mut registry = SurfaceRegistry::new();
        assert!(registry.is_empty());
        let id = registry.insert(Tin::flat(-10.0, -10.0, 10.0, 10.0, 2.0).unwrap());
        assert_eq!(registry.len(), 1);
        let surface = registry.get(id).unwrap();
        let (z, status) = surface.drape_point(&Point3::new(1.0, 1.0, 0.0));
        assert_eq!(status, DrapeStatus::Inside);
        assert!((z.unwrap() - 2.0).abs() < 1e-9);
    }
}
