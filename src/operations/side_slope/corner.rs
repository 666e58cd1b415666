use crate::config::{Side, MAX_PLANAR_DEVIATION, MAX_SLOPE_DEVIATION, NORMAL_ANGLE_TOLERANCE};
use crate::diagnostics::{DiagnosticsContext, Stage};
use crate::element::{next_index, prev_index, CornerType, SideSlopeVertex};
use crate::math::angle_2d::{angle_between, bisect, strictly_between, vector_bearing};
use crate::math::intersect_2d::line_line_intersect_2d;
use crate::math::polygon_2d::{left_normal, segment_direction};
use crate::math::{plan_distance, Point3, Vector3, TOLERANCE};

/// Angle and slope chosen for one vertex's radial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerSolution {
    pub corner_type: CornerType,
    /// Plan bearing of the radial.
    pub angle: f64,
    /// Signed radial slope.
    pub slope: f64,
    /// Distance ratio between the radial and its neighbouring offsets; 1 for
    /// non-reflex vertices.
    pub extension_ratio: f64,
    /// The planar solution was rejected in favour of the level one.
    pub level_fallback: bool,
}

/// Plan geometry of the segments meeting at a vertex.
#[derive(Debug, Clone, Copy)]
struct Neighbourhood {
    /// Unit directions and along-segment grades of the incoming and outgoing
    /// segments, when present.
    incoming: Option<(Vector3, f64)>,
    outgoing: Option<(Vector3, f64)>,
}

/// Classifies corners and solves each active vertex's radial direction.
pub struct CornerSolver {
    side: Side,
    closed: bool,
}

impl CornerSolver {
    #[must_use]
    pub fn new(side: Side, closed: bool) -> Self {
        Self { side, closed }
    }

    /// Writes corner type, angle and slope into every vertex.
    ///
    /// Inactive vertices are classified too so neighbouring runs see a
    /// consistent table. The closing vertex of a closed element mirrors the
    /// first.
    pub fn execute(&self, vertices: &mut [SideSlopeVertex], diagnostics: &mut DiagnosticsContext) {
        let len = vertices.len();
        let last_solved = if self.closed { len.saturating_sub(1) } else { len };
        let solutions: Vec<Option<CornerSolution>> = (0..last_solved).map(|i| self.solve(vertices, i)).collect();

        for (i, solution) in solutions.into_iter().enumerate() {
            let Some(s) = solution else { continue };
            if s.level_fallback {
                diagnostics.level_fallbacks += 1;
                diagnostics.record(Stage::Corner, &format!("vertex {i}: planar solution rejected, using level"));
            }
            let v = &mut vertices[i];
            v.corner_type = s.corner_type;
            v.angle = s.angle;
            v.slope = s.slope;
        }

        if self.closed && len >= 2 {
            let (corner_type, angle, slope) = {
                let first = &vertices[0];
                (first.corner_type, first.angle, first.slope)
            };
            let last = &mut vertices[len - 1];
            last.corner_type = corner_type;
            last.angle = angle;
            last.slope = slope;
        }
    }

    /// Solves vertex `i`, or `None` if it has no segment of non-zero length.
    #[must_use]
    pub fn solve(&self, vertices: &[SideSlopeVertex], i: usize) -> Option<CornerSolution> {
        let hood = self.neighbourhood(vertices, i);
        let v = &vertices[i];
        let s = v.slope;

        let (incoming, outgoing) = match (hood.incoming, hood.outgoing) {
            (Some(a), Some(b)) => (a, b),
            (Some((u, _)), None) | (None, Some((u, _))) => {
                return Some(self.normal_solution(u, s));
            }
            (None, None) => return None,
        };
        let (u1, g1) = incoming;
        let (u2, g2) = outgoing;
        let n1 = self.outward_normal(u1);
        let n2 = self.outward_normal(u2);

        let turn = u1.x * u2.y - u1.y * u2.x;
        let turn_angle = turn.atan2(u1.dot(&u2));
        if turn_angle.abs() < NORMAL_ANGLE_TOLERANCE {
            return Some(CornerSolution {
                corner_type: CornerType::Normal,
                angle: vector_bearing(&(n1 + n2)),
                slope: s,
                extension_ratio: 1.0,
                level_fallback: false,
            });
        }

        let corner_type = if turn_angle * self.side.sign() < 0.0 {
            CornerType::Convex
        } else {
            CornerType::Concave
        };
        let level = level_angle(u1, n1, n2, corner_type);

        if self.adjoins_sign_change(vertices, i) {
            return Some(CornerSolution {
                corner_type,
                angle: level,
                slope: s,
                extension_ratio: 1.0,
                level_fallback: false,
            });
        }

        let (angle, level_fallback) = match planar_angle(u1, g1, n1, u2, g2, n2, s) {
            Some(planar) if angle_between(planar, level) <= MAX_PLANAR_DEVIATION => (planar, false),
            Some(_) => (level, true),
            // Coincident planes or a level ray: the level solution is exact.
            None if s == 0.0 || (g1 - g2).abs() < TOLERANCE => (level, false),
            None => (level, true),
        };

        if corner_type == CornerType::Concave {
            if let Some((reflex_angle, ratio)) = reflex_extension(&v.position, u1, n1, u2, n2) {
                let blended = s / ratio;
                let slope = if s == 0.0 || (1.0 - blended / s).abs() > MAX_SLOPE_DEVIATION {
                    s
                } else {
                    blended
                };
                return Some(CornerSolution {
                    corner_type,
                    angle: bisect(angle, reflex_angle),
                    slope,
                    extension_ratio: ratio,
                    level_fallback,
                });
            }
        }

        Some(CornerSolution {
            corner_type,
            angle,
            slope: s,
            extension_ratio: 1.0,
            level_fallback,
        })
    }

    fn normal_solution(&self, u: Vector3, slope: f64) -> CornerSolution {
        CornerSolution {
            corner_type: CornerType::Normal,
            angle: vector_bearing(&self.outward_normal(u)),
            slope,
            extension_ratio: 1.0,
            level_fallback: false,
        }
    }

    fn outward_normal(&self, u: Vector3) -> Vector3 {
        left_normal(u) * self.side.sign()
    }

    fn neighbourhood(&self, vertices: &[SideSlopeVertex], i: usize) -> Neighbourhood {
        let len = vertices.len();
        let p = &vertices[i].position;
        let segment = |a: &Point3, b: &Point3| {
            let u = segment_direction(a, b)?;
            let run = plan_distance(a, b);
            Some((u, (b.z - a.z) / run))
        };
        Neighbourhood {
            incoming: prev_index(i, len, self.closed).and_then(|j| segment(&vertices[j].position, p)),
            outgoing: next_index(i, len, self.closed).and_then(|j| segment(p, &vertices[j].position)),
        }
    }

    fn adjoins_sign_change(&self, vertices: &[SideSlopeVertex], i: usize) -> bool {
        let len = vertices.len();
        let s = vertices[i].slope;
        [prev_index(i, len, self.closed), next_index(i, len, self.closed)]
            .into_iter()
            .flatten()
            .any(|j| {
                let other = vertices[j].slope;
                s != 0.0 && other != 0.0 && s.signum() != other.signum()
            })
    }
}

/// Bearing of the level solution: the bisector of the two outward normals.
///
/// A full reversal has opposite normals; the convex radial then continues
/// along the incoming segment and the concave one turns back.
fn level_angle(u1: Vector3, n1: Vector3, n2: Vector3, corner_type: CornerType) -> f64 {
    let sum = n1 + n2;
    if sum.norm() < TOLERANCE {
        return match corner_type {
            CornerType::Convex => vector_bearing(&u1),
            _ => vector_bearing(&-u1),
        };
    }
    vector_bearing(&sum)
}

/// Bearing of the line where the side-slope planes of both segments meet.
///
/// Each plane holds its segment and rises at `slope` along the segment's
/// outward normal. The solution is accepted only if its own slope has the
/// sign of `slope` and it points strictly between the two normals.
fn planar_angle(u1: Vector3, g1: f64, n1: Vector3, u2: Vector3, g2: f64, n2: Vector3, slope: f64) -> Option<f64> {
    if slope == 0.0 {
        return None;
    }
    let w = u1 * g1 + n1 * slope - u2 * g2 - n2 * slope;
    if w.norm() < TOLERANCE {
        return None;
    }
    let mut d = left_normal(w.normalize());
    if d.dot(&(n1 + n2)) < 0.0 {
        d = -d;
    }
    let implied = g1 * u1.dot(&d) + slope * n1.dot(&d);
    if implied == 0.0 || implied.signum() != slope.signum() {
        return None;
    }
    let angle = vector_bearing(&d);
    strictly_between(angle, vector_bearing(&n1), vector_bearing(&n2), 0.0).then_some(angle)
}

/// Meets unit offsets of both segments beyond a reflex vertex.
///
/// Returns the bearing from the vertex to the meeting point and its distance.
fn reflex_extension(v: &Point3, u1: Vector3, n1: Vector3, u2: Vector3, n2: Vector3) -> Option<(f64, f64)> {
    let p1 = v + n1;
    let p2 = v + n2;
    let (t, _) = line_line_intersect_2d(&p1, &u1, &p2, &u2)?;
    let x = p1 + u1 * t;
    let offset = Vector3::new(x.x - v.x, x.y - v.y, 0.0);
    let ratio = offset.norm();
    (ratio >= 1.0 - TOLERANCE).then(|| (vector_bearing(&offset), ratio))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::element::SlopeTargetKind;

    fn table(coords: &[(f64, f64, f64)], slope: f64, closed: bool) -> Vec<SideSlopeVertex> {
        let mut vs: Vec<_> = coords
            .iter()
            .map(|&(x, y, z)| {
                let mut v = SideSlopeVertex::new(Point3::new(x, y, z), SlopeTargetKind::ToSurface, 0.5, 0.5);
                v.slope = slope;
                v
            })
            .collect();
        if closed {
            vs.push(vs[0].clone());
        }
        vs
    }

    #[test]
    fn square_pad_corners_are_convex_on_the_outside() {
        let mut vs = table(&[(0.0, 0.0, 5.0), (10.0, 0.0, 5.0), (10.0, 10.0, 5.0), (0.0, 10.0, 5.0)], -0.5, true);
        CornerSolver::new(Side::Right, true).execute(&mut vs, &mut DiagnosticsContext::new());
        assert!(vs.iter().all(|v| v.corner_type == CornerType::Convex));
        assert_abs_diff_eq!(vs[1].angle, -FRAC_PI_4, epsilon = 1e-12);
        assert_abs_diff_eq!(vs[0].angle, -3.0 * FRAC_PI_4, epsilon = 1e-12);
        assert_abs_diff_eq!(vs[4].angle, vs[0].angle);
        assert!(vs.iter().all(|v| (v.slope + 0.5).abs() < 1e-12));
    }

    #[test]
    fn inside_of_square_is_concave() {
        let mut vs = table(&[(0.0, 0.0, 5.0), (10.0, 0.0, 5.0), (10.0, 10.0, 5.0), (0.0, 10.0, 5.0)], 0.5, true);
        CornerSolver::new(Side::Left, true).execute(&mut vs, &mut DiagnosticsContext::new());
        assert!(vs.iter().all(|v| v.corner_type == CornerType::Concave));
        assert_abs_diff_eq!(vs[1].angle, 3.0 * FRAC_PI_4, epsilon = 1e-12);
        // A right angle deviates more than the allowed blend, so the slope is nominal.
        assert_abs_diff_eq!(vs[1].slope, 0.5);
    }

    #[test]
    fn shallow_reflex_corner_blends_slope() {
        let vs = table(&[(0.0, 0.0, 0.0), (10.0, 0.0, 0.0), (20.0, 2.0, 0.0)], 0.5, false);
        let solution = CornerSolver::new(Side::Left, false).solve(&vs, 1).unwrap();
        assert_eq!(solution.corner_type, CornerType::Concave);
        assert!(solution.extension_ratio > 1.0);
        assert_abs_diff_eq!(solution.slope, 0.5 / solution.extension_ratio, epsilon = 1e-12);
    }

    #[test]
    fn collinear_vertex_is_normal() {
        let vs = table(&[(0.0, 0.0, 0.0), (5.0, 0.0, 0.0), (10.0, 0.0, 0.0)], -0.5, false);
        let solver = CornerSolver::new(Side::Left, false);
        let mid = solver.solve(&vs, 1).unwrap();
        assert_eq!(mid.corner_type, CornerType::Normal);
        assert_abs_diff_eq!(mid.angle, FRAC_PI_2, epsilon = 1e-12);
        let start = solver.solve(&vs, 0).unwrap();
        assert_abs_diff_eq!(start.angle, FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn sloping_segments_tilt_the_corner_radial() {
        // Incoming segment climbs, outgoing is level.
        let vs = table(&[(0.0, -10.0, 0.0), (0.0, 0.0, 1.0), (10.0, 0.0, 1.0)], -0.5, false);
        let solution = CornerSolver::new(Side::Left, false).solve(&vs, 1).unwrap();
        assert_eq!(solution.corner_type, CornerType::Convex);
        assert!(!solution.level_fallback);
        let level = 3.0 * FRAC_PI_4;
        assert!(angle_between(solution.angle, level) > 1e-6);
        assert!(angle_between(solution.angle, level) <= MAX_PLANAR_DEVIATION);
    }

    #[test]
    fn steep_grade_falls_back_to_level() {
        let vs = table(&[(0.0, -10.0, 0.0), (0.0, 0.0, 30.0), (10.0, 0.0, 30.0)], -0.5, false);
        let mut diag = DiagnosticsContext::new();
        let mut copy = vs.clone();
        CornerSolver::new(Side::Left, false).execute(&mut copy, &mut diag);
        assert_abs_diff_eq!(copy[1].angle, 3.0 * FRAC_PI_4, epsilon = 1e-12);
        assert_eq!(diag.level_fallbacks, 1);
    }

    #[test]
    fn slope_sign_change_keeps_raw_bisector() {
        let mut vs = table(&[(0.0, -10.0, 0.0), (0.0, 0.0, 2.0), (10.0, 0.0, 2.0)], -0.5, false);
        vs[2].slope = 0.5;
        let solution = CornerSolver::new(Side::Left, false).solve(&vs, 1).unwrap();
        assert_abs_diff_eq!(solution.angle, 3.0 * FRAC_PI_4, epsilon = 1e-12);
    }

    #[test]
    fn reversal_points_along_incoming_segment() {
        let vs = table(&[(0.0, 0.0, 0.0), (10.0, 0.0, 0.0), (0.0, 0.0, 0.0)], -0.5, false);
        let right = CornerSolver::new(Side::Right, false).solve(&vs, 1).unwrap();
        let left = CornerSolver::new(Side::Left, false).solve(&vs, 1).unwrap();
        let convex = if right.corner_type == CornerType::Convex { right } else { left };
        assert_abs_diff_eq!(convex.angle, 0.0, epsilon = 1e-9);
        let concave = if right.corner_type == CornerType::Concave { right } else { left };
        assert_abs_diff_eq!(concave.angle.abs(), PI, epsilon = 1e-9);
    }
}
