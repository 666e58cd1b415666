use std::collections::HashMap;

use spade::handles::{FixedFaceHandle, InnerTag};
use spade::{DelaunayTriangulation, InsertionError, Point2 as SpadePoint2, PositionInTriangulation, Triangulation};

use super::{DrapeStatus, Intercept, InterceptKind, NextCrossing, PointLocation, TerrainSurface, TriangleId};
use crate::error::InputError;
use crate::math::distance_2d::closest_point_on_segment;
use crate::math::intersect_2d::{line_line_intersect_2d, segment_segment_intersect_2d};
use crate::math::polygon_2d::point_in_polygon_2d;
use crate::math::{plan_distance, Point3, TOLERANCE};

/// Barycentric slack used when testing whether a point is inside a triangle.
const INSIDE_EPS: f64 = 1e-9;

/// Triangulated irregular network built from 3D points.
///
/// The plan triangulation is Delaunay; triangles whose centroid falls inside
/// a registered void polygon are void. Point location goes through the
/// spade triangulation the TIN was built from.
#[derive(Debug, Clone)]
pub struct Tin {
    dt: DelaunayTriangulation<SpadePoint2<f64>>,
    /// Triangle built from each spade face, indexed by face handle.
    face_triangles: Vec<Option<TriangleId>>,
    points: Vec<Point3>,
    /// Anticlockwise vertex indices.
    triangles: Vec<[usize; 3]>,
    /// Neighbour across edge `k` (from vertex `k` to vertex `k + 1`).
    neighbors: Vec<[Option<TriangleId>; 3]>,
    void_triangles: Vec<bool>,
    voids: Vec<Vec<Point3>>,
    /// Hull edges as (triangle, edge index).
    hull_edges: Vec<(TriangleId, usize)>,
    pp_tolerance: f64,
}

impl Tin {
    /// Builds a TIN from 3D points using Delaunay triangulation in plan.
    ///
    /// Points sharing a plan position keep the last elevation given.
    ///
    /// # Errors
    ///
    /// Returns `InputError::Degenerate` if a point cannot be inserted or the
    /// points do not span any triangle.
    pub fn from_points(points: &[Point3]) -> Result<Self, InputError> {
        let mut dt: DelaunayTriangulation<SpadePoint2<f64>> = DelaunayTriangulation::new();
        let mut elevations: HashMap<usize, f64> = HashMap::new();
        for p in points {
            let handle = dt
                .insert(SpadePoint2::new(p.x, p.y))
                .map_err(|e: InsertionError| InputError::Degenerate(format!("TIN insert: {e}")))?;
            elevations.insert(handle.index(), p.z);
        }

        let mut tin_points = vec![Point3::origin(); dt.num_vertices()];
        for vh in dt.vertices() {
            let idx = vh.fix().index();
            let pos = vh.position();
            let z = elevations.get(&idx).copied().unwrap_or_default();
            tin_points[idx] = Point3::new(pos.x, pos.y, z);
        }

        let mut face_triangles = vec![None; dt.num_all_faces()];
        let mut triangles: Vec<[usize; 3]> = Vec::with_capacity(dt.num_inner_faces());
        for face in dt.inner_faces() {
            face_triangles[face.fix().index()] = Some(triangles.len());
            let [a, b, c] = face.vertices();
            triangles.push([a.fix().index(), b.fix().index(), c.fix().index()]);
        }
        if triangles.is_empty() {
            return Err(InputError::Degenerate(
                "TIN points do not span a triangle".to_owned(),
            ));
        }

        Ok(Self::assemble(dt, face_triangles, tin_points, triangles))
    }

    /// A flat rectangular surface at elevation `z`.
    ///
    /// # Errors
    ///
    /// Returns `InputError::Degenerate` if the rectangle has no area.
    pub fn flat(min_x: f64, min_y: f64, max_x: f64, max_y: f64, z: f64) -> Result<Self, InputError> {
        Self::plane(min_x, min_y, max_x, max_y, z, 0.0, 0.0)
    }

    /// A rectangular plane `z = z0 + gx * x + gy * y`.
    ///
    /// # Errors
    ///
    /// Returns `InputError::Degenerate` if the rectangle has no area.
    pub fn plane(
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
        z0: f64,
        gx: f64,
        gy: f64,
    ) -> Result<Self, InputError> {
        let z = |x: f64, y: f64| z0 + gx * x + gy * y;
        Self::from_points(&[
            Point3::new(min_x, min_y, z(min_x, min_y)),
            Point3::new(max_x, min_y, z(max_x, min_y)),
            Point3::new(max_x, max_y, z(max_x, max_y)),
            Point3::new(min_x, max_y, z(min_x, max_y)),
        ])
    }

    fn assemble(
        dt: DelaunayTriangulation<SpadePoint2<f64>>,
        face_triangles: Vec<Option<TriangleId>>,
        points: Vec<Point3>,
        triangles: Vec<[usize; 3]>,
    ) -> Self {
        let mut edge_owner: HashMap<(usize, usize), (TriangleId, usize)> = HashMap::new();
        for (t, tri) in triangles.iter().enumerate() {
            for k in 0..3 {
                edge_owner.insert((tri[k], tri[(k + 1) % 3]), (t, k));
            }
        }

        let mut neighbors = vec![[None; 3]; triangles.len()];
        let mut hull_edges = Vec::new();
        for (t, tri) in triangles.iter().enumerate() {
            for k in 0..3 {
                let twin = edge_owner.get(&(tri[(k + 1) % 3], tri[k])).map(|&(nt, _)| nt);
                neighbors[t][k] = twin;
                if twin.is_none() {
                    hull_edges.push((t, k));
                }
            }
        }

        let void_triangles = vec![false; triangles.len()];
        Self {
            dt,
            face_triangles,
            points,
            triangles,
            neighbors,
            void_triangles,
            voids: Vec::new(),
            hull_edges,
            pp_tolerance: 1e-4,
        }
    }

    /// Marks every triangle whose centroid lies inside `polygon` as void.
    #[must_use]
    pub fn with_void(mut self, polygon: Vec<Point3>) -> Self {
        for (t, tri) in self.triangles.iter().enumerate() {
            let [a, b, c] = tri.map(|i| self.points[i]);
            let centroid = Point3::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0, 0.0);
            if point_in_polygon_2d(&centroid, &polygon) {
                self.void_triangles[t] = true;
            }
        }
        self.voids.push(polygon);
        self
    }

    /// Sets the distance within which points outside the hull snap onto it.
    #[must_use]
    pub fn with_pp_tolerance(mut self, tolerance: f64) -> Self {
        self.pp_tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    fn corners(&self, t: TriangleId) -> [Point3; 3] {
        self.triangles[t].map(|i| self.points[i])
    }

    fn contains(&self, t: TriangleId, p: &Point3) -> bool {
        let [a, b, c] = self.corners(t);
        let det = (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y);
        if det.abs() < TOLERANCE {
            return false;
        }
        let l1 = ((b.y - c.y) * (p.x - c.x) + (c.x - b.x) * (p.y - c.y)) / det;
        let l2 = ((c.y - a.y) * (p.x - c.x) + (a.x - c.x) * (p.y - c.y)) / det;
        let l3 = 1.0 - l1 - l2;
        l1 >= -INSIDE_EPS && l2 >= -INSIDE_EPS && l3 >= -INSIDE_EPS
    }

    fn location_of(&self, t: TriangleId) -> PointLocation {
        if self.void_triangles[t] {
            PointLocation::Void(t)
        } else {
            PointLocation::Triangle(t)
        }
    }

    fn edge_points(&self, t: TriangleId, k: usize) -> (Point3, Point3) {
        let tri = self.triangles[t];
        (self.points[tri[k]], self.points[tri[(k + 1) % 3]])
    }

    fn face_triangle(&self, face: Option<FixedFaceHandle<InnerTag>>) -> Option<TriangleId> {
        face.and_then(|f| self.face_triangles.get(f.index()).copied().flatten())
    }

    /// Triangle containing the plan position of `p`.
    ///
    /// Points on an edge or vertex resolve to any adjacent triangle. Points
    /// just outside the hull still belong to the hull triangle when they lie
    /// within the barycentric slack.
    fn find_triangle(&self, p: &Point3) -> Option<TriangleId> {
        match self.dt.locate(SpadePoint2::new(p.x, p.y)) {
            PositionInTriangulation::OnFace(face) => self.face_triangle(Some(face)),
            PositionInTriangulation::OnEdge(edge) => {
                let edge = self.dt.directed_edge(edge);
                let face = edge.face().as_inner().or_else(|| edge.rev().face().as_inner());
                self.face_triangle(face.map(|f| f.fix()))
            }
            PositionInTriangulation::OnVertex(vertex) => {
                let face = self.dt.vertex(vertex).out_edges().find_map(|e| e.face().as_inner());
                self.face_triangle(face.map(|f| f.fix()))
            }
            PositionInTriangulation::OutsideOfConvexHull(edge) => {
                let edge = self.dt.directed_edge(edge);
                let face = [edge.face(), edge.rev().face()].into_iter().find_map(|f| f.as_inner());
                self.face_triangle(face.map(|f| f.fix())).filter(|&t| self.contains(t, p))
            }
            PositionInTriangulation::NoTriangulation => None,
        }
    }

    /// Closest hull edge to `p` with the triangle owning it.
    fn nearest_hull_edge(&self, p: &Point3) -> Option<(TriangleId, Point3, Point3, f64)> {
        self.hull_edges
            .iter()
            .map(|&(t, k)| {
                let (a, b) = self.edge_points(t, k);
                let (c, _) = closest_point_on_segment(p, &a, &b);
                (t, a, b, plan_distance(p, &c))
            })
            .min_by(|x, y| x.3.total_cmp(&y.3))
    }
}

impl TerrainSurface for Tin {
    fn locate_point(&self, p: &Point3) -> PointLocation {
        if let Some(t) = self.find_triangle(p) {
            return self.location_of(t);
        }
        match self.nearest_hull_edge(p) {
            Some((t, _, _, d)) if d <= self.pp_tolerance => self.location_of(t),
            _ => PointLocation::External,
        }
    }

    fn drape_point(&self, p: &Point3) -> (Option<f64>, DrapeStatus) {
        if let Some(t) = self.find_triangle(p) {
            if self.void_triangles[t] {
                return (None, DrapeStatus::Void);
            }
            return (Some(self.triangle_elevation(t, p)), DrapeStatus::Inside);
        }
        match self.nearest_hull_edge(p) {
            Some((t, a, b, d)) if d <= self.pp_tolerance => {
                if self.void_triangles[t] {
                    return (None, DrapeStatus::Void);
                }
                let (c, _) = closest_point_on_segment(p, &a, &b);
                (Some(c.z), DrapeStatus::OnHull)
            }
            _ => (None, DrapeStatus::External),
        }
    }

    fn triangle(&self, id: TriangleId) -> [Point3; 3] {
        self.corners(id)
    }

    fn walk_next_edge_crossing(
        &self,
        from: &Point3,
        to: &Point3,
        current: TriangleId,
        t_enter: f64,
    ) -> Option<NextCrossing> {
        if current >= self.triangles.len() {
            return None;
        }
        let dir = to - from;
        let len = dir.xy().norm();
        if len < TOLERANCE {
            return Some(NextCrossing::EndsInside);
        }
        let t_eps = INSIDE_EPS / len.max(1.0);

        let mut best: Option<(f64, usize, f64)> = None;
        for k in 0..3 {
            let (a, b) = self.edge_points(current, k);
            let Some((t, u)) = line_line_intersect_2d(from, &dir, &a, &(b - a)) else {
                continue;
            };
            if t <= t_enter + t_eps || !(-INSIDE_EPS..=1.0 + INSIDE_EPS).contains(&u) {
                continue;
            }
            if best.map_or(true, |(bt, _, _)| t < bt) {
                best = Some((t, k, u.clamp(0.0, 1.0)));
            }
        }

        match best {
            Some((t, _, _)) if t > 1.0 && self.contains(current, to) => Some(NextCrossing::EndsInside),
            Some((t, k, u)) if t <= 1.0 => {
                let (a, b) = self.edge_points(current, k);
                let point = Point3::new(from.x + dir.x * t, from.y + dir.y * t, a.z + (b.z - a.z) * u);
                let next = self.neighbors[current][k].map_or(PointLocation::External, |n| self.location_of(n));
                Some(NextCrossing::Crosses { t, point, next })
            }
            _ if self.contains(current, to) => Some(NextCrossing::EndsInside),
            _ => {
                // The segment grazes a vertex: relocate just past the entry point.
                let t = t_enter + t_eps * 10.0;
                let ahead = Point3::new(from.x + dir.x * t, from.y + dir.y * t, 0.0);
                let next = self.locate_point(&ahead);
                match next {
                    PointLocation::Triangle(n) | PointLocation::Void(n) if n != current => {
                        let z = self.triangle_elevation(n, &ahead);
                        Some(NextCrossing::Crosses { t, point: Point3::new(ahead.x, ahead.y, z), next })
                    }
                    _ => None,
                }
            }
        }
    }

    fn closest_hull_edge(&self, p: &Point3) -> Option<(Point3, Point3)> {
        self.nearest_hull_edge(p).map(|(_, a, b, _)| (a, b))
    }

    fn find_hull_or_void_intercept(&self, from: &Point3, to: &Point3) -> Option<Intercept> {
        let hull = self.hull_edges.iter().map(|&(t, k)| {
            let (a, b) = self.edge_points(t, k);
            (a, b, InterceptKind::Hull)
        });
        let voids = self.voids.iter().flat_map(|poly| {
            let n = poly.len();
            (0..n).map(move |i| (poly[i], poly[(i + 1) % n], InterceptKind::Void))
        });

        hull.chain(voids)
            .filter_map(|(a, b, kind)| {
                segment_segment_intersect_2d(from, to, &a, &b).map(|(pt, t, u)| Intercept {
                    t,
                    point: Point3::new(pt.x, pt.y, a.z + (b.z - a.z) * u),
                    kind,
                })
            })
            .min_by(|x, y| x.t.total_cmp(&y.t))
    }
}
