//! Side-slope surface models and the feature store they are written to.

use slotmap::SlotMap;

use crate::config::Side;
use crate::element::OverlapRadial;
use crate::math::Point3;

slotmap::new_key_type! {
    /// Identifier of a stored feature.
    pub struct FeatureId;
}

/// Kind of a stored feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Breakline,
    Hull,
    Hole,
    SlopeToe,
}

/// A stored feature: its kind and ordered points.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub kind: FeatureKind,
    pub points: Vec<Point3>,
}

/// Append-only sink for generated features.
pub trait FeatureStore {
    /// Stores a feature and returns its identifier.
    fn store_feature(&mut self, kind: FeatureKind, points: Vec<Point3>) -> FeatureId;
}

/// A piece of slope toe together with its bench membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchSegment {
    pub feature: FeatureId,
    pub on_bench: bool,
}

/// Result of one active run on one side of an element.
#[derive(Debug, Clone)]
pub struct SurfaceModel {
    side: Side,
    closed: bool,
    features: SlotMap<FeatureId, Feature>,
    boundary: Option<FeatureId>,
    holes: Vec<FeatureId>,
    slope_toes: Vec<FeatureId>,
    breaklines: Vec<FeatureId>,
    bench_segments: Vec<BenchSegment>,
    radials: Vec<OverlapRadial>,
}

impl FeatureStore for SurfaceModel {
    fn store_feature(&mut self, kind: FeatureKind, points: Vec<Point3>) -> FeatureId {
        let id = self.features.insert(Feature { kind, points });
        match kind {
            // The first hull is the boundary; later hulls are extra outer loops.
            FeatureKind::Hull => {
                if self.boundary.is_none() {
                    self.boundary = Some(id);
                }
            }
            FeatureKind::Hole => self.holes.push(id),
            FeatureKind::SlopeToe => self.slope_toes.push(id),
            FeatureKind::Breakline => self.breaklines.push(id),
        }
        id
    }
}

impl SurfaceModel {
    /// Creates an empty model for `side`.
    #[must_use]
    pub fn new(side: Side, closed: bool) -> Self {
        Self {
            side,
            closed,
            features: SlotMap::with_key(),
            boundary: None,
            holes: Vec::new(),
            slope_toes: Vec::new(),
            breaklines: Vec::new(),
            bench_segments: Vec::new(),
            radials: Vec::new(),
        }
    }

    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Whether the run this model came from was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn feature(&self, id: FeatureId) -> Option<&Feature> {
        self.features.get(id)
    }

    /// All stored features.
    pub fn features(&self) -> impl Iterator<Item = (FeatureId, &Feature)> {
        self.features.iter()
    }

    /// Boundary polygon, anticlockwise, without a repeated closing point.
    #[must_use]
    pub fn boundary(&self) -> Option<&[Point3]> {
        self.boundary
            .and_then(|id| self.features.get(id))
            .map(|f| f.points.as_slice())
    }

    /// Hole polygons, clockwise.
    #[must_use]
    pub fn holes(&self) -> Vec<&[Point3]> {
        self.points_of(&self.holes)
    }

    #[must_use]
    pub fn slope_toes(&self) -> Vec<&[Point3]> {
        self.points_of(&self.slope_toes)
    }

    #[must_use]
    pub fn breaklines(&self) -> Vec<&[Point3]> {
        self.points_of(&self.breaklines)
    }

    #[must_use]
    pub fn bench_segments(&self) -> &[BenchSegment] {
        &self.bench_segments
    }

    /// Resolved radials of the run, in element order.
    #[must_use]
    pub fn radials(&self) -> &[OverlapRadial] {
        &self.radials
    }

    pub(crate) fn set_radials(&mut self, radials: Vec<OverlapRadial>) {
        self.radials = radials;
    }

    pub(crate) fn push_bench_segment(&mut self, segment: BenchSegment) {
        self.bench_segments.push(segment);
    }

    fn points_of(&self, ids: &[FeatureId]) -> Vec<&[Point3]> {
        ids.iter()
            .filter_map(|&id| self.features.get(id))
            .map(|f| f.points.as_slice())
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ring() -> Vec<Point3> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn features_are_indexed_by_kind() {
        let mut model = SurfaceModel::new(Side::Right, true);
        let hull = model.store_feature(FeatureKind::Hull, ring());
        model.store_feature(FeatureKind::Hull, ring());
        model.store_feature(FeatureKind::Hole, ring());
        model.store_feature(FeatureKind::SlopeToe, ring());
        model.store_feature(FeatureKind::Breakline, ring());
        assert_eq!(model.boundary().unwrap().len(), 3);
        assert_eq!(model.feature(hull).unwrap().kind, FeatureKind::Hull);
        assert_eq!(model.holes().len(), 1);
        assert_eq!(model.slope_toes().len(), 1);
        assert_eq!(model.breaklines().len(), 1);
        assert_eq!(model.features().count(), 5);
        assert_eq!(model.side(), Side::Right);
        assert!(model.is_closed());
    }

    #[test]
    fn empty_model_has_no_boundary() {
        let model = SurfaceModel::new(Side::Left, false);
        assert!(model.boundary().is_none());
        assert!(model.radials().is_empty());
    }
}
