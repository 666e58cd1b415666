use crate::config::{CornerMode, Side};
use crate::diagnostics::{DiagnosticsContext, Stage};
use crate::element::{next_index, prev_index, CornerType, Genesis, SideSlopeVertex, VertexStatus};
use crate::error::{try_grow, AllocationError};
use crate::math::angle_2d::{direction, lerp_angle, normalize_angle, vector_bearing};
use crate::math::intersect_2d::line_line_intersect_2d;
use crate::math::polygon_2d::{left_normal, segment_direction};
use crate::math::{Point3, TOLERANCE};

/// Fans extra radials around sharp convex corners.
pub struct CornerStroker {
    mode: CornerMode,
    tolerance: f64,
}

/// Radials inserted on either side of one corner radial.
#[derive(Debug, Default)]
struct Fan {
    before: Vec<SideSlopeVertex>,
    after: Vec<SideSlopeVertex>,
}

impl Fan {
    fn len(&self) -> usize {
        self.before.len() + self.after.len()
    }
}

impl CornerStroker {
    #[must_use]
    pub fn new(mode: CornerMode, tolerance: f64) -> Self {
        Self { mode, tolerance }
    }

    /// Inserts stroked radials around every convex corner whose toe chord
    /// exceeds the tolerance. Inserted vertices await reprojection.
    ///
    /// Returns the number of vertices inserted.
    ///
    /// # Errors
    ///
    /// Returns `AllocationError` if the table cannot grow.
    pub fn execute(
        &self,
        vertices: &mut Vec<SideSlopeVertex>,
        side: Side,
        closed: bool,
        diagnostics: &mut DiagnosticsContext,
    ) -> Result<usize, AllocationError> {
        if self.tolerance <= 0.0 {
            return Ok(0);
        }
        let len = vertices.len();
        let solved = if closed { len.saturating_sub(1) } else { len };
        let fans: Vec<Fan> = (0..solved).map(|i| self.fan(vertices, i, side, closed)).collect();
        let inserted: usize = fans.iter().map(Fan::len).sum();
        if inserted == 0 {
            return Ok(0);
        }

        let mut out: Vec<SideSlopeVertex> = Vec::new();
        try_grow(&mut out, len + inserted)?;
        for (i, v) in vertices.iter().enumerate() {
            if closed && i + 1 == len {
                // The first corner's leading fan sits before the closing duplicate.
                out.extend(fans[0].before.iter().cloned());
                out.push(v.clone());
                continue;
            }
            let fan = &fans[i];
            if !(closed && i == 0) {
                out.extend(fan.before.iter().cloned());
            }
            out.push(v.clone());
            out.extend(fan.after.iter().cloned());
        }
        *vertices = out;

        diagnostics.radials_stroked += inserted;
        diagnostics.record(Stage::Stroke, &format!("inserted {inserted} stroked radials"));
        Ok(inserted)
    }

    fn fan(&self, vertices: &[SideSlopeVertex], i: usize, side: Side, closed: bool) -> Fan {
        let v = &vertices[i];
        if !v.is_active() || v.corner_type != CornerType::Convex {
            return Fan::default();
        }
        let len = vertices.len();
        let (Some(p), Some(n)) = (prev_index(i, len, closed), next_index(i, len, closed)) else {
            return Fan::default();
        };
        let (Some(u1), Some(u2)) = (
            segment_direction(&vertices[p].position, &v.position),
            segment_direction(&v.position, &vertices[n].position),
        ) else {
            return Fan::default();
        };
        let a1 = vector_bearing(&(left_normal(u1) * side.sign()));
        let a2 = vector_bearing(&(left_normal(u2) * side.sign()));

        let length = v.radial_length();
        if length <= TOLERANCE {
            return Fan::default();
        }
        let sweep = normalize_angle(a2 - a1).abs();
        let chord = 2.0 * length * (sweep * 0.5).sin();
        if chord <= self.tolerance {
            return Fan::default();
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = ((chord / self.tolerance).floor() as usize).max(2);
        let count_before = count / 2;
        let count_after = count - count_before;

        let rise = v.terminal_point.z - v.position.z;
        let leg_start = v.position + direction(a1) * length;
        let leg_end = v.position + direction(a2) * length;
        let corner = Point3::new(v.terminal_point.x, v.terminal_point.y, v.position.z);

        let make = |angle: f64, leg: (&Point3, &Point3)| {
            let mut s = v.derive_at(v.position, Genesis::Stroked);
            s.status = VertexStatus::PendingResolution;
            s.corner_type = CornerType::Convex;
            s.angle = angle;
            s.slope = match self.mode {
                CornerMode::Round => v.slope,
                CornerMode::Square => {
                    let reach = leg_reach(&v.position, angle, leg.0, leg.1).unwrap_or(length);
                    rise / reach
                }
            };
            s
        };

        #[allow(clippy::cast_precision_loss)]
        let before = (0..count_before)
            .map(|j| make(lerp_angle(a1, v.angle, j as f64 / count_before as f64), (&leg_start, &corner)))
            .collect();
        #[allow(clippy::cast_precision_loss)]
        let after = (1..=count_after)
            .map(|j| make(lerp_angle(v.angle, a2, j as f64 / count_after as f64), (&corner, &leg_end)))
            .collect();
        Fan { before, after }
    }
}

/// Plan distance from `origin` along `angle` to the leg line `a -> b`.
fn leg_reach(origin: &Point3, angle: f64, a: &Point3, b: &Point3) -> Option<f64> {
    let (t, _) = line_line_intersect_2d(origin, &direction(angle), a, &(b - a))?;
    (t > TOLERANCE).then_some(t)
}
