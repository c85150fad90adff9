use std::collections::BinaryHeap;

use geo::{Coordinate, Rect};
use log::{debug, trace};

use crate::beachline::{Beachline, Prediction};
use crate::events::{CircleEvent, SweepEvent};
use crate::geometry::{circumcenter, orientation};

/// Fortune's sweep over a set of planar sites.
///
/// This is the incremental engine: a heap of site and circle events, and
/// the beachline of parabolic arcs. Each [`step`](Sweep::step) pops the
/// minimum-Y event and performs one atomic transition. Stale circle events
/// are discarded at pop time by comparing the arc version captured at
/// prediction time; they are never removed from the heap.
pub struct Sweep {
    sites: Vec<Coordinate<f64>>,
    bounds: Rect<f64>,
    beachline: Beachline,
    events: BinaryHeap<SweepEvent>,
    sweep_y: f64,
    vertices: Vec<Coordinate<f64>>,
    fired: Vec<CircleEvent>,
    fired_total: usize,
    last: Option<SweepEvent>,
}

impl Sweep {
    /// Construct an engine over `sites` (pairwise distinct for well-defined
    /// geometry; near-duplicates degrade numerically and are not defended
    /// against) within the given world bounds.
    pub fn new(sites: &[Coordinate<f64>], bounds: Rect<f64>) -> Self {
        let mut events = BinaryHeap::with_capacity(sites.len());
        for &site in sites {
            events.push(SweepEvent::site(site));
        }
        Sweep {
            sites: sites.to_vec(),
            bounds,
            beachline: Beachline::new(),
            events,
            sweep_y: f64::NEG_INFINITY,
            vertices: Vec::new(),
            fired: Vec::new(),
            fired_total: 0,
            last: None,
        }
    }

    pub fn sites(&self) -> &[Coordinate<f64>] {
        &self.sites
    }

    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    /// Sweep position of the last processed event.
    pub fn sweep_y(&self) -> f64 {
        self.sweep_y
    }

    /// Read-only view of the current arc sequence.
    pub fn beachline(&self) -> &Beachline {
        &self.beachline
    }

    /// Diagram vertices recorded so far (circumcenters of fired events).
    pub fn vertices(&self) -> &[Coordinate<f64>] {
        &self.vertices
    }

    /// The event processed by the most recent `step`, or `None` if that
    /// step only discarded a stale entry.
    pub fn last_event(&self) -> Option<&SweepEvent> {
        self.last.as_ref()
    }

    /// Y of the next queued event, stale entries included.
    pub fn next_event_y(&self) -> Option<f64> {
        self.events.peek().map(|e| e.y())
    }

    /// Total number of circle events fired since construction.
    pub fn fired_count(&self) -> usize {
        self.fired_total
    }

    /// Drain the circle events fired since the last call.
    pub fn take_fired(&mut self) -> Vec<CircleEvent> {
        std::mem::take(&mut self.fired)
    }

    /// Process one event. Returns `false` once the queue is exhausted.
    pub fn step(&mut self) -> bool {
        let event = match self.events.pop() {
            Some(e) => e,
            None => return false,
        };
        debug_assert!(
            event.y() >= self.sweep_y - 1e-9,
            "event queue regressed below the sweep line"
        );
        match event {
            SweepEvent::Site(site) => {
                self.sweep_y = site.y;
                self.handle_site(site);
                self.last = Some(SweepEvent::Site(site));
            }
            SweepEvent::Circle(ev) => {
                if !self.is_live(&ev) {
                    trace!("discarding stale circle event at y={}", ev.y);
                    self.last = None;
                    return true;
                }
                self.sweep_y = ev.y;
                self.handle_circle(&ev);
                self.fired.push(ev.clone());
                self.fired_total += 1;
                self.last = Some(SweepEvent::Circle(ev));
            }
        }
        true
    }

    /// Process every queued event strictly below `y`.
    ///
    /// This is the rebuild-and-replay primitive of the event selector: a
    /// fresh engine replayed to a probe position yields the beachline as it
    /// stands with the directrix at `y`.
    pub fn replay_to(&mut self, y: f64) {
        while self.next_event_y().map_or(false, |ny| ny < y) {
            self.step();
        }
    }

    /// Run the queue to exhaustion; returns the number of events popped.
    pub fn finish(&mut self) -> usize {
        let mut n = 0;
        while self.step() {
            n += 1;
        }
        n
    }

    fn is_live(&self, ev: &CircleEvent) -> bool {
        self.beachline
            .get(ev.arc)
            .map_or(false, |arc| arc.version == ev.arc_version)
    }

    fn handle_site(&mut self, site: Coordinate<f64>) {
        trace!("site event: {:?}", site);
        if self.beachline.is_empty() {
            self.beachline.install_first(site);
            return;
        }
        let above = self
            .beachline
            .arc_above(site.x, site.y)
            .expect("a non-empty beachline spans the whole line");
        let (left, middle, right) = self.beachline.split(above, site);
        // Three fresh adjacencies, three chances for a prediction.
        for &key in &[left, middle, right] {
            self.maybe_create_circle_event(key);
        }
    }

    fn handle_circle(&mut self, ev: &CircleEvent) {
        debug!(
            "circle event fires: y={:.6}, center=({:.6}, {:.6})",
            ev.y, ev.center.x, ev.center.y
        );
        self.vertices.push(ev.center);
        let (prev, next) = self.beachline.splice(ev.arc);
        for key in prev.into_iter().chain(next.into_iter()) {
            self.maybe_create_circle_event(key);
        }
    }

    /// Predict a vanish for the arc at `key`, if its triple converges.
    fn maybe_create_circle_event(&mut self, key: usize) {
        let (site, prev_key, next_key) = {
            let arc = match self.beachline.get(key) {
                Some(a) => a,
                None => return,
            };
            match (arc.prev(), arc.next()) {
                (Some(p), Some(n)) => (arc.site, p, n),
                _ => return,
            }
        };
        let prev_site = self.beachline.get(prev_key).expect("linked prev arc").site;
        let next_site = self.beachline.get(next_key).expect("linked next arc").site;

        // The breakpoints converge only when the triple turns leftward;
        // collinear or rightward triples diverge.
        if orientation(prev_site, site, next_site) <= 0. {
            return;
        }
        let center = match circumcenter(prev_site, site, next_site) {
            Some(c) => c,
            None => return,
        };
        let radius = ((site.x - center.x).powi(2) + (site.y - center.y).powi(2)).sqrt();
        let y = center.y + radius;
        // Not strictly in the future: floating-point noise around the
        // current event could otherwise re-enqueue it forever.
        if y <= self.sweep_y {
            return;
        }

        if self.beachline.live_prediction(key).is_some() {
            self.beachline.invalidate(key);
        }
        let version = self.beachline.version(key);
        trace!(
            "predicting vanish of arc {} at y={:.6} (triple {:?}, {:?}, {:?})",
            key,
            y,
            prev_site,
            site,
            next_site
        );
        self.beachline.set_prediction(
            key,
            Prediction {
                y,
                center_x: center.x,
                version,
            },
        );
        self.events.push(SweepEvent::Circle(CircleEvent {
            center,
            radius,
            y,
            triple: [prev_site, site, next_site],
            arc: key,
            arc_version: version,
        }));
    }
}
