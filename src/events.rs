use std::cmp::Ordering;

use geo::Coordinate;

/// A predicted arc-vanish event.
///
/// Produced by the engine when three adjacent arcs' sites admit a
/// circumcircle the sweep line has yet to pass. The prediction is lazily
/// invalidated: `arc_version` is compared against the owning arc's current
/// version when the event is popped, and stale entries are discarded
/// silently (they are never removed from the heap).
#[derive(Debug, Clone)]
pub struct CircleEvent {
    /// Circumcenter of the triple; recorded as a diagram vertex if the
    /// event fires.
    pub center: Coordinate<f64>,
    /// Circumcircle radius.
    pub radius: f64,
    /// Sweep Y at which the sweep line becomes tangent to the circumcircle
    /// (`center.y + radius`).
    pub y: f64,
    /// (previous, doomed, next) sites at prediction time.
    pub triple: [Coordinate<f64>; 3],
    /// Arena key of the doomed arc.
    pub(crate) arc: usize,
    /// Arc version captured at prediction time.
    pub(crate) arc_version: u64,
}

/// A sweep event: either an input site entering the front, or a predicted
/// arc vanish.
#[derive(Debug, Clone)]
pub enum SweepEvent {
    Site(Coordinate<f64>),
    Circle(CircleEvent),
}

impl SweepEvent {
    /// The sweep position at which this event fires.
    pub fn y(&self) -> f64 {
        match self {
            SweepEvent::Site(s) => s.y,
            SweepEvent::Circle(e) => e.y,
        }
    }

    fn x(&self) -> f64 {
        match self {
            SweepEvent::Site(s) => s.x,
            SweepEvent::Circle(e) => e.center.x,
        }
    }

    /// Tie-break rank for events at exactly the same Y: sites first.
    fn rank(&self) -> u8 {
        match self {
            SweepEvent::Site(_) => 0,
            SweepEvent::Circle(_) => 1,
        }
    }

    pub(crate) fn site(site: Coordinate<f64>) -> Self {
        assert!(
            site.x.is_finite() && site.y.is_finite(),
            "sweep event requires finite coordinates"
        );
        SweepEvent::Site(site)
    }
}

/// Equality consistent with the heap ordering; ignores the event payload.
impl PartialEq for SweepEvent {
    fn eq(&self, other: &Self) -> bool {
        self.y() == other.y() && self.rank() == other.rank() && self.x() == other.x()
    }
}

impl Eq for SweepEvent {}

/// Ordering for use with a max-heap (`BinaryHeap`): ascending Y, ties
/// broken arbitrarily but consistently (sites before circles, then by X).
impl PartialOrd for SweepEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(
            self.y()
                .partial_cmp(&other.y())?
                .then_with(|| self.rank().cmp(&other.rank()))
                .then(self.x().partial_cmp(&other.x())?)
                .reverse(),
        )
    }
}

/// Derive `Ord` from `PartialOrd` and expect to not fail; event
/// coordinates are asserted finite on construction.
impl Ord for SweepEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap()
    }
}
