//! The beachline: an ordered, doubly linked sequence of parabolic arcs.
//!
//! Arcs live in a [`Slab`] arena and link to their neighbors by key, so
//! splicing an arc out on a circle event is O(1) without any raw-pointer
//! cycles. Each arc carries a monotonically increasing version; a circle
//! event captures the version at prediction time and is stale once the
//! arc's neighborhood has changed. This is the lazy-invalidation idiom for
//! heaps that lack arbitrary-element removal.

use geo::Coordinate;
use slab::Slab;
use smallvec::SmallVec;

use crate::geometry::{parabola_intersection_x, parabola_intersection_x_near_circle_event};

/// Sweep positions closer than this to a predicted vanish switch breakpoint
/// root selection to the target-tracking variant.
const NEAR_EVENT_EPS: f64 = 1e-6;

/// Live circle-event prediction owned by an arc.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Prediction {
    /// Sweep Y at which the owning arc is predicted to vanish.
    pub y: f64,
    /// Circumcenter X the arc's breakpoints converge to.
    pub center_x: f64,
    /// Arc version captured when the prediction was installed.
    pub version: u64,
}

/// One arc of the beachline: the maximal segment currently governed by
/// `site`'s parabola.
#[derive(Debug, Clone)]
pub struct Arc {
    pub site: Coordinate<f64>,
    pub(crate) prev: Option<usize>,
    pub(crate) next: Option<usize>,
    /// Bumped whenever the arc's immediate neighborhood changes; any
    /// prediction captured under an older version is stale.
    pub(crate) version: u64,
    pub(crate) prediction: Option<Prediction>,
}

impl Arc {
    pub fn prev(&self) -> Option<usize> {
        self.prev
    }

    pub fn next(&self) -> Option<usize> {
        self.next
    }
}

/// The X-extent of one arc instance at a fixed directrix.
#[derive(Debug, Clone, Copy)]
pub struct ArcSpan {
    pub key: usize,
    pub site: Coordinate<f64>,
    pub left: f64,
    pub right: f64,
}

/// Arena-backed arc list. The public surface is read-only; mutation happens
/// through the engine.
#[derive(Debug, Default)]
pub struct Beachline {
    arcs: Slab<Arc>,
    head: Option<usize>,
    next_version: u64,
}

impl Beachline {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Number of live arcs.
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// Key of the leftmost arc.
    pub fn head(&self) -> Option<usize> {
        self.head
    }

    pub fn get(&self, key: usize) -> Option<&Arc> {
        self.arcs.get(key)
    }

    pub(crate) fn version(&self, key: usize) -> u64 {
        self.arcs[key].version
    }

    /// The arc's prediction, if it is still current.
    pub(crate) fn live_prediction(&self, key: usize) -> Option<Prediction> {
        let arc = &self.arcs[key];
        arc.prediction.filter(|p| p.version == arc.version)
    }

    pub(crate) fn set_prediction(&mut self, key: usize, prediction: Prediction) {
        debug_assert_eq!(prediction.version, self.arcs[key].version);
        self.arcs[key].prediction = Some(prediction);
    }

    fn fresh_version(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }

    /// Drop the arc's prediction and bump its version, so that any heap
    /// entry captured earlier is stale at pop time.
    pub(crate) fn invalidate(&mut self, key: usize) {
        let version = self.fresh_version();
        let arc = &mut self.arcs[key];
        arc.version = version;
        arc.prediction = None;
    }

    /// Install the very first arc.
    pub(crate) fn install_first(&mut self, site: Coordinate<f64>) -> usize {
        debug_assert!(self.is_empty());
        let version = self.fresh_version();
        let key = self.arcs.insert(Arc {
            site,
            prev: None,
            next: None,
            version,
            prediction: None,
        });
        self.head = Some(key);
        key
    }

    /// Split the arc at `above` for an incoming `site`.
    ///
    /// `above` is reused as the left remnant (its pending prediction is
    /// invalidated: splitting destroys any timing that depended on its old
    /// neighbors); a fresh right remnant carries the old site and the new
    /// site's arc lands between them. Returns `(left, middle, right)` keys.
    pub(crate) fn split(&mut self, above: usize, site: Coordinate<f64>) -> (usize, usize, usize) {
        let old_site = self.arcs[above].site;
        let old_next = self.arcs[above].next;
        self.invalidate(above);

        let version = self.fresh_version();
        let right = self.arcs.insert(Arc {
            site: old_site,
            prev: None,
            next: old_next,
            version,
            prediction: None,
        });
        let version = self.fresh_version();
        let middle = self.arcs.insert(Arc {
            site,
            prev: Some(above),
            next: Some(right),
            version,
            prediction: None,
        });
        self.arcs[right].prev = Some(middle);
        self.arcs[above].next = Some(middle);
        if let Some(n) = old_next {
            self.arcs[n].prev = Some(right);
        }
        (above, middle, right)
    }

    /// Splice `doomed` out of the list, linking its neighbors directly and
    /// invalidating their predictions (their triples just changed).
    /// Returns the `(prev, next)` keys.
    pub(crate) fn splice(&mut self, doomed: usize) -> (Option<usize>, Option<usize>) {
        let arc = self.arcs.remove(doomed);
        if let Some(p) = arc.prev {
            self.arcs[p].next = arc.next;
            self.invalidate(p);
        }
        if let Some(n) = arc.next {
            self.arcs[n].prev = arc.prev;
            self.invalidate(n);
        }
        if self.head == Some(doomed) {
            self.head = arc.next;
        }
        (arc.prev, arc.next)
    }

    /// In-order traversal from the leftmost arc.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Arc)> + '_ {
        let mut cur = self.head;
        std::iter::from_fn(move || {
            let key = cur?;
            let arc = &self.arcs[key];
            cur = arc.next;
            Some((key, arc))
        })
    }

    fn breakpoint(&self, a: &Arc, b: &Arc, directrix: f64) -> f64 {
        // A breakpoint pair about to vanish converges on the predicted
        // circle center; the side-probing root selection is unreliable
        // there and would pick the diverging outer root.
        let near = [a, b].iter().find_map(|arc| {
            arc.prediction
                .filter(|p| p.version == arc.version && (p.y - directrix).abs() < NEAR_EVENT_EPS)
        });
        match near {
            Some(p) => {
                parabola_intersection_x_near_circle_event(a.site, b.site, directrix, p.center_x)
            }
            None => parabola_intersection_x(a.site, b.site, directrix),
        }
    }

    /// The arcs' X-extents at the given directrix, left to right.
    ///
    /// Outermost spans extend to infinity. Spans never overlap: a
    /// breakpoint that lands (numerically) left of its predecessor is
    /// clamped to a zero-width span.
    pub fn spans(&self, directrix: f64) -> SmallVec<[ArcSpan; 16]> {
        let mut out = SmallVec::new();
        let mut left = f64::NEG_INFINITY;
        let mut iter = self.iter().peekable();
        while let Some((key, arc)) = iter.next() {
            let right = match iter.peek() {
                Some(&(_, next)) => self.breakpoint(arc, next, directrix).max(left),
                None => f64::INFINITY,
            };
            out.push(ArcSpan {
                key,
                site: arc.site,
                left,
                right,
            });
            left = right;
        }
        out
    }

    /// The arc whose parabola is topmost at `x`.
    pub fn arc_above(&self, x: f64, directrix: f64) -> Option<usize> {
        self.spans(directrix)
            .into_iter()
            .find(|s| s.left <= x && x <= s.right)
            .map(|s| s.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: f64, y: f64) -> Coordinate<f64> {
        Coordinate { x, y }
    }

    fn sites_in_order(bl: &Beachline) -> Vec<Coordinate<f64>> {
        bl.iter().map(|(_, a)| a.site).collect()
    }

    #[test]
    fn split_links_and_orders() {
        let mut bl = Beachline::new();
        let first = bl.install_first(c(5., 0.));
        assert_eq!(bl.len(), 1);

        let (l, m, r) = bl.split(first, c(6., 2.));
        assert_eq!(bl.len(), 3);
        assert_eq!(l, first);
        assert_eq!(bl.get(l).unwrap().next, Some(m));
        assert_eq!(bl.get(m).unwrap().prev, Some(l));
        assert_eq!(bl.get(m).unwrap().next, Some(r));
        assert_eq!(bl.get(r).unwrap().prev, Some(m));
        assert_eq!(bl.get(r).unwrap().next, None);
        assert_eq!(
            sites_in_order(&bl),
            vec![c(5., 0.), c(6., 2.), c(5., 0.)]
        );
    }

    #[test]
    fn split_invalidates_interrupted_arc() {
        let mut bl = Beachline::new();
        let first = bl.install_first(c(0., 0.));
        let version = bl.version(first);
        bl.set_prediction(
            first,
            Prediction {
                y: 10.,
                center_x: 0.,
                version,
            },
        );
        assert!(bl.live_prediction(first).is_some());

        bl.split(first, c(1., 1.));
        assert!(bl.live_prediction(first).is_none());
        assert!(bl.version(first) > version);
    }

    #[test]
    fn splice_relinks_and_invalidates_neighbors() {
        let mut bl = Beachline::new();
        let first = bl.install_first(c(5., 0.));
        let (l, m, r) = bl.split(first, c(6., 2.));
        let (vl, vr) = (bl.version(l), bl.version(r));

        let (p, n) = bl.splice(m);
        assert_eq!((p, n), (Some(l), Some(r)));
        assert_eq!(bl.len(), 2);
        assert_eq!(bl.get(l).unwrap().next, Some(r));
        assert_eq!(bl.get(r).unwrap().prev, Some(l));
        assert!(bl.version(l) > vl);
        assert!(bl.version(r) > vr);
    }

    #[test]
    fn spans_partition_the_line() {
        let mut bl = Beachline::new();
        let first = bl.install_first(c(0., 0.));
        bl.split(first, c(10., 5.));

        let spans = bl.spans(10.);
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].left, f64::NEG_INFINITY);
        assert_eq!(spans[2].right, f64::INFINITY);
        for w in spans.windows(2) {
            assert_eq!(w[0].right, w[1].left);
            assert!(w[0].left <= w[0].right);
        }
    }

    #[test]
    fn arc_above_selects_topmost() {
        let mut bl = Beachline::new();
        let first = bl.install_first(c(0., 0.));
        let (l, m, r) = bl.split(first, c(10., 5.));

        // The new site's arc governs around its own X; the old site's
        // remnants govern far out on either side.
        assert_eq!(bl.arc_above(10., 10.), Some(m));
        assert_eq!(bl.arc_above(-100., 10.), Some(l));
        assert_eq!(bl.arc_above(100., 10.), Some(r));
    }
}
