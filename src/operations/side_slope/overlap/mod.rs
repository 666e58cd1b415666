//! Detection and resolution of crossing radials within one active run.

mod cleanup;
mod sweep;
mod truncate;

pub use cleanup::{remove_covered, truncate_at_baseline};
pub use sweep::{sweep_crossings, Crossing};
pub use truncate::{is_superseded, propagate_elevations, tie_break, Verdict};

use crate::diagnostics::{DiagnosticsContext, Stage};
use crate::element::OverlapRadial;
use crate::math::intersect_2d::segment_crossing_2d;
use crate::math::{plan_distance, Point3};

/// Counts of what one resolution did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlapReport {
    pub passes: usize,
    pub truncations: usize,
    /// Truncations forced after the lookback rule blocked every remaining crossing.
    pub forced: usize,
    pub baseline_truncations: usize,
    pub removed: usize,
}

/// Truncates radials of a run until no two of them properly cross.
pub struct OverlapResolver {
    closed: bool,
    pp_tolerance: f64,
    elevation_tolerance: f64,
}

impl OverlapResolver {
    #[must_use]
    pub fn new(closed: bool, pp_tolerance: f64, elevation_tolerance: f64) -> Self {
        Self {
            closed,
            pp_tolerance,
            elevation_tolerance,
        }
    }

    /// Resolves every crossing among `radials`, in run order.
    pub fn execute(&self, radials: &mut [OverlapRadial], diagnostics: &mut DiagnosticsContext) -> OverlapReport {
        let mut report = OverlapReport::default();
        // Every applied truncation removes at least one crossing pair and
        // shortening never creates new ones.
        let max_passes = radials.len() * radials.len() + 2;

        loop {
            report.passes += 1;
            let crossings = self.crossings(radials);
            if crossings.is_empty() || report.passes > max_passes {
                break;
            }
            let applied = self.apply(radials, &crossings, true, diagnostics);
            report.truncations += applied;
            if applied == 0 {
                let forced = self.apply(radials, &crossings, false, diagnostics);
                report.forced += forced;
                report.truncations += forced;
                if forced == 0 {
                    break;
                }
            }
        }

        report.baseline_truncations = truncate_at_baseline(radials, self.closed, self.pp_tolerance);
        propagate_elevations(radials, self.pp_tolerance);
        report.removed = remove_covered(radials, self.closed, self.pp_tolerance);

        diagnostics.truncations += report.truncations + report.baseline_truncations;
        diagnostics.radials_removed += report.removed;
        diagnostics.record(
            Stage::Overlap,
            &format!(
                "{} passes, {} truncations ({} forced), {} at baseline, {} removed",
                report.passes, report.truncations, report.forced, report.baseline_truncations, report.removed
            ),
        );
        report
    }

    /// Current proper crossings between live radials, nearest to an origin first.
    fn crossings(&self, radials: &[OverlapRadial]) -> Vec<Crossing> {
        let live: Vec<usize> = (0..radials.len())
            .filter(|&i| !radials[i].removed && !radials[i].is_degenerate(self.pp_tolerance))
            .collect();
        let segments: Vec<(Point3, Point3)> = live
            .iter()
            .map(|&i| (radials[i].origin, radials[i].current_terminus))
            .collect();

        let mut found: Vec<Crossing> = sweep_crossings(&segments, |_, _| true)
            .into_iter()
            .map(|c| Crossing {
                a: live[c.a],
                b: live[c.b],
                ..c
            })
            .collect();
        let reach = |c: &Crossing| {
            plan_distance(&radials[c.a].origin, &c.point).min(plan_distance(&radials[c.b].origin, &c.point))
        };
        found.sort_by(|x, y| reach(x).total_cmp(&reach(y)));
        found
    }

    /// Applies the tie-break to each crossing still present. With `lookback`,
    /// truncations resting on superseded crossings are skipped.
    fn apply(
        &self,
        radials: &mut [OverlapRadial],
        crossings: &[Crossing],
        lookback: bool,
        diagnostics: &mut DiagnosticsContext,
    ) -> usize {
        let mut applied = 0;
        for c in crossings {
            let (a, b) = (c.a, c.b);
            if radials[a].removed || radials[b].removed {
                continue;
            }
            // Earlier truncations in this pass may have moved either terminus.
            let Some((point, _, _)) = segment_crossing_2d(
                &radials[a].origin,
                &radials[a].current_terminus,
                &radials[b].origin,
                &radials[b].current_terminus,
            ) else {
                continue;
            };

            let losers = match tie_break(&radials[a], &radials[b], &point, self.elevation_tolerance) {
                Verdict::TruncateA => [Some((a, b)), None],
                Verdict::TruncateB => [Some((b, a)), None],
                Verdict::TruncateBoth => [Some((a, b)), Some((b, a))],
            };
            // Both losers of one crossing are judged before either is cut, so
            // the first cut cannot mark the second as superseded.
            let cuts: Vec<(usize, usize)> = losers
                .into_iter()
                .flatten()
                .filter(|&(loser, winner)| {
                    let superseded = lookback && is_superseded(radials, loser, winner);
                    if superseded {
                        diagnostics.record(
                            Stage::Overlap,
                            &format!("radial {loser}: crossing with {winner} superseded"),
                        );
                    }
                    !superseded
                })
                .collect();
            for (loser, winner) in cuts {
                if radials[loser].truncate_to(point, Some(winner)) {
                    applied += 1;
                }
            }
        }
        applied
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::element::CornerType;
    use crate::math::intersect_2d::segments_properly_cross;

    fn radial(vertex: usize, origin: (f64, f64, f64), hit: (f64, f64, f64), corner: CornerType) -> OverlapRadial {
        OverlapRadial::new(
            vertex,
            Point3::new(origin.0, origin.1, origin.2),
            Point3::new(hit.0, hit.1, hit.2),
            corner,
        )
    }

    fn assert_no_crossings(radials: &[OverlapRadial]) {
        for i in 0..radials.len() {
            for j in (i + 1)..radials.len() {
                let (a, b) = (&radials[i], &radials[j]);
                if a.removed || b.removed {
                    continue;
                }
                assert!(
                    !segments_properly_cross(&a.origin, &a.current_terminus, &b.origin, &b.current_terminus),
                    "radials {i} and {j} still cross"
                );
            }
        }
    }

    /// Radials converging into a notch, each crossing the next.
    fn fan_into_notch() -> Vec<OverlapRadial> {
        vec![
            radial(0, (0.0, 0.0, 5.0), (12.0, 10.0, 0.0), CornerType::Normal),
            radial(1, (4.0, 0.0, 5.0), (9.0, 10.0, 0.0), CornerType::Concave),
            radial(2, (8.0, 0.0, 5.0), (3.0, 10.0, 1.0), CornerType::Normal),
            radial(3, (12.0, 0.0, 5.0), (-1.0, 10.0, 0.0), CornerType::Normal),
        ]
    }

    #[test]
    fn crossing_pair_is_resolved() {
        let mut radials = vec![
            radial(0, (0.0, 0.0, 10.0), (10.0, 10.0, 0.0), CornerType::Normal),
            radial(1, (10.0, 0.0, 10.0), (0.0, 10.0, 8.0), CornerType::Normal),
        ];
        let report = OverlapResolver::new(false, 1e-6, 1e-6).execute(&mut radials, &mut DiagnosticsContext::new());
        assert_eq!(report.truncations, 1);
        assert!(radials[0].is_truncated());
        assert!(!radials[1].is_truncated());
        assert!((radials[0].current_terminus.x - 5.0).abs() < 1e-9);
        // The cut toe sits on the surviving batter.
        assert!((radials[0].current_terminus.z - radials[1].elevation_at(&radials[0].current_terminus)).abs() < 1e-9);
        assert_no_crossings(&radials);
    }

    #[test]
    fn equal_elevation_crossing_cuts_both() {
        // Both rays are at elevation 5 where they meet at (5, 5).
        let mut radials = vec![
            radial(0, (0.0, 0.0, 10.0), (10.0, 10.0, 0.0), CornerType::Normal),
            radial(1, (10.0, 0.0, 10.0), (0.0, 10.0, 0.0), CornerType::Normal),
        ];
        let report = OverlapResolver::new(false, 1e-6, 1e-6).execute(&mut radials, &mut DiagnosticsContext::new());
        assert_eq!(report.truncations, 2);
        assert_eq!(report.forced, 0);
        for (r, other) in [(0, 1), (1, 0)] {
            let radial = &radials[r];
            assert_eq!(radial.truncating_radial, Some(other));
            assert!(!radial.removed);
            assert!((radial.current_terminus.x - 5.0).abs() < 1e-9);
            assert!((radial.current_terminus.y - 5.0).abs() < 1e-9);
            assert!((radial.current_terminus.z - 5.0).abs() < 1e-9);
        }
        assert_no_crossings(&radials);
    }

    #[test]
    fn concave_pair_at_equal_elevation_cuts_both() {
        let mut radials = vec![
            radial(0, (0.0, 0.0, 10.0), (10.0, 10.0, 0.0), CornerType::Concave),
            radial(1, (10.0, 0.0, 10.0), (0.0, 10.0, 0.0), CornerType::Concave),
        ];
        let report = OverlapResolver::new(false, 1e-6, 1e-6).execute(&mut radials, &mut DiagnosticsContext::new());
        assert_eq!(report.truncations, 2);
        assert!(radials.iter().all(OverlapRadial::is_truncated));
    }

    #[test]
    fn fan_resolves_without_residual_crossings() {
        let mut radials = fan_into_notch();
        let before: Vec<f64> = radials.iter().map(OverlapRadial::current_length).collect();
        let mut diag = DiagnosticsContext::new();
        let report = OverlapResolver::new(false, 1e-6, 1e-6).execute(&mut radials, &mut diag);
        assert!(report.truncations > 0);
        assert_eq!(diag.truncations, report.truncations + report.baseline_truncations);
        assert_no_crossings(&radials);
        for (r, len) in radials.iter().zip(before) {
            assert!(r.current_length() <= len + 1e-12);
        }
    }

    #[test]
    fn truncation_is_monotone_across_passes() {
        let resolver = OverlapResolver::new(false, 1e-6, 1e-6);
        let mut radials = fan_into_notch();
        let mut diag = DiagnosticsContext::new();
        let mut last: Vec<f64> = radials.iter().map(OverlapRadial::current_length).collect();
        for _ in 0..3 {
            resolver.execute(&mut radials, &mut diag);
            let now: Vec<f64> = radials.iter().map(OverlapRadial::current_length).collect();
            for (n, l) in now.iter().zip(&last) {
                assert!(*n <= *l + 1e-12);
            }
            last = now;
        }
    }

    #[test]
    fn parallel_radials_are_untouched() {
        let mut radials: Vec<OverlapRadial> = (0..5_u32)
            .map(|i| {
                let x = f64::from(i) * 2.0;
                radial(i as usize, (x, 0.0, 5.0), (x, -10.0, 0.0), CornerType::Normal)
            })
            .collect();
        let report = OverlapResolver::new(false, 1e-6, 1e-6).execute(&mut radials, &mut DiagnosticsContext::new());
        assert_eq!(report.truncations, 0);
        assert_eq!(report.removed, 0);
        assert!(radials.iter().all(|r| !r.is_truncated()));
    }

    #[test]
    fn degenerate_radials_are_ignored() {
        let mut radials = vec![
            radial(0, (5.0, 5.0, 0.0), (5.0, 5.0, 0.0), CornerType::Normal),
            radial(1, (0.0, 0.0, 5.0), (10.0, 10.0, 0.0), CornerType::Normal),
        ];
        let report = OverlapResolver::new(false, 1e-6, 1e-6).execute(&mut radials, &mut DiagnosticsContext::new());
        assert_eq!(report.truncations, 0);
        assert!(!radials[1].is_truncated());
    }
}
