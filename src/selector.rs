//! Event eligibility selection for staged walkthroughs.
//!
//! Given the input sites and a camera, the selector scans the circle
//! events a fresh engine produces, and for each candidate decides whether
//! it can be presented in stages: a WAKE position where all three arcs of
//! the triple are comfortably visible, and an APPROACH position where the
//! doomed arc is most nearly vanished. Probing is done by rebuilding a
//! fresh engine and replaying it to the probe Y, so that a later replay of
//! the chosen event sees exactly what selection saw.

use float_next_after::NextAfter;
use geo::{Coordinate, Rect};
use itertools::Itertools;
use log::debug;

use crate::events::CircleEvent;
use crate::geometry::{site_eq, SITE_EPS};
use crate::sweep::Sweep;
use crate::visibility::{measure_arc_instance_px, sample_beachline, Camera};

/// Margin added above the triple's highest site when opening the search
/// window: probing exactly at a site Y lands on a degenerate arc.
const GUARD_MARGIN: f64 = 1e-3;

/// Coarse probe count for the WAKE scan.
const WAKE_SCAN_STEPS: usize = 32;

/// Probe count for the APPROACH argmin scan.
const APPROACH_SCAN_STEPS: usize = 48;

/// Hard cap on WAKE bisection refinement.
const BISECT_MAX_ITERS: usize = 40;

/// Pixel thresholds and search budgets, supplied by the presentation
/// layer.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Minimum rendered length of the doomed-triple's middle arc at the
    /// window midpoint.
    pub min_arc_len_px: f64,
    /// Gap kept between the end of the search window and the event Y.
    pub epsilon: f64,
    /// Reject events closer than this to their own sites' arrival;
    /// near-simultaneous triples are numerically unstable.
    pub min_event_dy: f64,
    /// Candidate scan budget: how many fired circle events to consider.
    pub max_circle_events_to_scan: usize,
    /// All three triple arcs must render at least this long at WAKE.
    pub wake_px: f64,
    /// The doomed arc counts as "nearly vanished" below this; the
    /// APPROACH scan stops early once it gets there.
    pub approach_px: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        SelectorConfig {
            min_arc_len_px: 2.,
            epsilon: 1e-2,
            min_event_dy: 1.,
            max_circle_events_to_scan: 64,
            wake_px: 6.,
            approach_px: 2.,
        }
    }
}

/// A finalized, reproducible event selection.
#[derive(Debug, Clone)]
pub struct ChosenEvent {
    /// (previous, middle, next) sites of the circle event.
    pub triple: [Coordinate<f64>; 3],
    /// Sweep Y at which the event fires.
    pub event_y: f64,
    pub center: Coordinate<f64>,
    pub radius: f64,
    /// The site whose arc instance actually vanishes.
    pub doomed_site: Coordinate<f64>,
    /// Midpoint of the search window; the selection score is the doomed
    /// arc's rendered length here.
    pub preview_y: f64,
    pub preview_doomed_len_px: f64,
    /// Earliest Y where all three triple arcs clear the wake threshold.
    pub wake_y: f64,
    /// Y in `[wake_y, event_y)` where the doomed arc is most nearly
    /// vanished.
    pub approach_y: f64,
    /// Diagnostics: the limiting measurements at the two checkpoints.
    pub min_len_at_wake_px: f64,
    pub doomed_len_at_approach_px: f64,
}

/// Scans candidate circle events and stages the best eligible one.
pub struct EventSelector {
    camera: Camera,
    config: SelectorConfig,
    rejections: Vec<String>,
}

impl EventSelector {
    pub fn new(camera: Camera, config: SelectorConfig) -> Self {
        EventSelector {
            camera,
            config,
            rejections: Vec::new(),
        }
    }

    /// Human-readable reasons for every candidate rejected by the last
    /// [`find_eligible_event`](EventSelector::find_eligible_event) call.
    pub fn rejections(&self) -> &[String] {
        &self.rejections
    }

    /// Pick one circle event plus its WAKE and APPROACH checkpoints.
    ///
    /// Candidates are the first `max_circle_events_to_scan` circle events
    /// of a fresh sweep, optionally filtered to those whose triple
    /// contains `required_site`. Among the eligible ones, the event whose
    /// doomed arc renders longest at its preview midpoint wins; ties go to
    /// the larger `event_y - preview_y` gap. Returns `None` (with
    /// [`rejections`](EventSelector::rejections) populated) when nothing
    /// qualifies.
    ///
    /// # Panics
    ///
    /// If the selected event cannot be re-located by replaying a freshly
    /// constructed engine: that is a reproducibility bug, never expected
    /// control flow.
    pub fn find_eligible_event(
        &mut self,
        sites: &[Coordinate<f64>],
        bounds: Rect<f64>,
        required_site: Option<Coordinate<f64>>,
    ) -> Option<ChosenEvent> {
        self.rejections.clear();

        let candidates = self.scan_candidates(sites, bounds, required_site);
        debug!("selector: {} candidate circle events", candidates.len());

        let mut best: Option<ChosenEvent> = None;
        for candidate in candidates {
            match self.evaluate(sites, bounds, &candidate) {
                Ok(chosen) => {
                    let better = match &best {
                        None => true,
                        Some(b) => {
                            chosen.preview_doomed_len_px > b.preview_doomed_len_px
                                || (chosen.preview_doomed_len_px == b.preview_doomed_len_px
                                    && chosen.event_y - chosen.preview_y
                                        > b.event_y - b.preview_y)
                        }
                    };
                    if better {
                        best = Some(chosen);
                    }
                }
                Err(reason) => {
                    let msg = format!(
                        "event y={:.4} triple {:?}: {}",
                        candidate.y, candidate.triple, reason
                    );
                    debug!("selector rejected {}", msg);
                    self.rejections.push(msg);
                }
            }
        }

        if let Some(chosen) = &best {
            self.assert_reproducible(sites, bounds, chosen);
        }
        best
    }

    fn scan_candidates(
        &self,
        sites: &[Coordinate<f64>],
        bounds: Rect<f64>,
        required_site: Option<Coordinate<f64>>,
    ) -> Vec<CircleEvent> {
        let mut sweep = Sweep::new(sites, bounds);
        while sweep.fired_count() < self.config.max_circle_events_to_scan && sweep.step() {}
        let mut fired = sweep.take_fired();
        fired.truncate(self.config.max_circle_events_to_scan);
        if let Some(required) = required_site {
            fired.retain(|ev| ev.triple.iter().any(|&s| site_eq(s, required, SITE_EPS)));
        }
        fired
    }

    /// Rebuild a fresh engine and replay it to the probe position.
    fn engine_at(&self, sites: &[Coordinate<f64>], bounds: Rect<f64>, y: f64) -> Sweep {
        let mut sweep = Sweep::new(sites, bounds);
        sweep.replay_to(y);
        sweep
    }

    fn evaluate(
        &self,
        sites: &[Coordinate<f64>],
        bounds: Rect<f64>,
        ev: &CircleEvent,
    ) -> Result<ChosenEvent, String> {
        let cfg = &self.config;

        // 1. Safe search window.
        let max_site_y = ev
            .triple
            .iter()
            .map(|s| s.y)
            .fold(f64::NEG_INFINITY, f64::max);
        if ev.y - max_site_y < cfg.min_event_dy {
            return Err(format!(
                "event only {:.4} above its latest site",
                ev.y - max_site_y
            ));
        }
        let y_start = max_site_y + GUARD_MARGIN;
        let y_end = (ev.y - cfg.epsilon).min(ev.y.next_after(f64::NEG_INFINITY));
        if y_start >= y_end {
            return Err("degenerate search window".to_string());
        }

        // 2. Midpoint probe: the triple must exist and its middle arc must
        // be comfortably visible.
        let preview_y = (y_start + y_end) / 2.;
        let preview = self.engine_at(sites, bounds, preview_y);
        let middle = find_triple_arc(&preview, ev.triple)
            .ok_or_else(|| "triple not present at window midpoint".to_string())?;
        let segments = sample_beachline(preview.beachline(), preview_y, &self.camera);
        let mid_len = measure_arc_instance_px(&segments, middle, &self.camera)
            .ok_or_else(|| "middle arc off-screen at window midpoint".to_string())?;
        if mid_len < cfg.min_arc_len_px {
            return Err(format!(
                "middle arc only {:.1}px at window midpoint",
                mid_len
            ));
        }

        // 3. The triple must survive to the end of the window.
        let near_end = self.engine_at(sites, bounds, y_end);
        let middle_end = find_triple_arc(&near_end, ev.triple)
            .ok_or_else(|| "triple not present near the event".to_string())?;

        // 4. Which site actually vanishes: the triple ordering alone does
        // not say, so measure all three instances just before the event
        // and take the smallest. An arc too narrow to catch a sample is as
        // good as vanished.
        let doomed_site = self
            .measure_triple(&near_end, y_end, middle_end)
            .iter()
            .min_by(|a, b| {
                a.1.unwrap_or(0.)
                    .partial_cmp(&b.1.unwrap_or(0.))
                    .expect("pixel lengths are finite")
            })
            .map(|&(site, _)| site)
            .expect("triple has three entries");

        // 5. WAKE: first Y where all three arcs clear the threshold,
        // coarse scan then bisection to sub-pixel precision.
        let coarse = (y_end - y_start) / WAKE_SCAN_STEPS as f64;
        let mut bracket = None;
        let mut below = y_start;
        for i in 0..=WAKE_SCAN_STEPS {
            let y = y_start + coarse * i as f64;
            let probe = self.engine_at(sites, bounds, y);
            let key = match find_triple_arc(&probe, ev.triple) {
                Some(k) => k,
                None => {
                    return Err(format!("triple dissolved at y={:.4} before waking", y));
                }
            };
            if self.min_triple_len(&probe, y, key) >= cfg.wake_px {
                bracket = Some((below, y));
                break;
            }
            below = y;
        }
        let (mut lo, mut hi) =
            bracket.ok_or_else(|| "triple never cleared the wake threshold".to_string())?;
        for _ in 0..BISECT_MAX_ITERS {
            if (hi - lo) * self.camera.zoom <= 0.25 {
                break;
            }
            let mid = (lo + hi) / 2.;
            let probe = self.engine_at(sites, bounds, mid);
            let qualified = find_triple_arc(&probe, ev.triple)
                .map(|key| self.min_triple_len(&probe, mid, key) >= cfg.wake_px)
                .unwrap_or(false);
            if qualified {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        let wake_y = hi;
        let wake_probe = self.engine_at(sites, bounds, wake_y);
        let wake_key = find_triple_arc(&wake_probe, ev.triple)
            .ok_or_else(|| "triple not present at wake".to_string())?;
        let min_len_at_wake_px = self.min_triple_len(&wake_probe, wake_y, wake_key);

        // 6. APPROACH: argmin of the doomed arc's length over
        // [wake, y_end], stopping early once it is as vanished as
        // configured or the triple dissolves.
        let step = (y_end - wake_y) / APPROACH_SCAN_STEPS as f64;
        if step <= 0. {
            return Err("wake landed at the end of the window".to_string());
        }
        let mut approach: Option<(f64, f64)> = None;
        for i in 1..=APPROACH_SCAN_STEPS {
            let y = wake_y + step * i as f64;
            let probe = self.engine_at(sites, bounds, y);
            let key = match find_triple_arc(&probe, ev.triple) {
                Some(k) => k,
                None => break,
            };
            let len = self.doomed_len(&probe, y, key, doomed_site);
            if approach.map_or(true, |(_, best)| len < best) {
                approach = Some((y, len));
            }
            if len <= cfg.approach_px {
                break;
            }
        }
        let (approach_y, doomed_len_at_approach_px) = approach
            .ok_or_else(|| "triple dissolved immediately after wake".to_string())?;

        // 7. Staging order.
        if !(wake_y < approach_y && approach_y < ev.y) {
            return Err(format!(
                "staging order violated (wake={:.4}, approach={:.4}, event={:.4})",
                wake_y, approach_y, ev.y
            ));
        }

        let preview_doomed_len_px = self.doomed_len(&preview, preview_y, middle, doomed_site);

        Ok(ChosenEvent {
            triple: ev.triple,
            event_y: ev.y,
            center: ev.center,
            radius: ev.radius,
            doomed_site,
            preview_y,
            preview_doomed_len_px,
            wake_y,
            approach_y,
            min_len_at_wake_px,
            doomed_len_at_approach_px,
        })
    }

    /// Rendered lengths of `(prev, middle, next)` at the probe position,
    /// tagged with their sites. `None` means off-screen.
    fn measure_triple(
        &self,
        probe: &Sweep,
        y: f64,
        middle: usize,
    ) -> [(Coordinate<f64>, Option<f64>); 3] {
        let bl = probe.beachline();
        let arc = bl.get(middle).expect("matched middle arc");
        let keys = [
            arc.prev().expect("triple arc has a prev"),
            middle,
            arc.next().expect("triple arc has a next"),
        ];
        let segments = sample_beachline(bl, y, &self.camera);
        let mut out = [(Coordinate { x: 0., y: 0. }, None); 3];
        for (slot, &key) in out.iter_mut().zip(keys.iter()) {
            *slot = (
                bl.get(key).expect("linked neighbor arc").site,
                measure_arc_instance_px(&segments, key, &self.camera),
            );
        }
        out
    }

    fn min_triple_len(&self, probe: &Sweep, y: f64, middle: usize) -> f64 {
        self.measure_triple(probe, y, middle)
            .iter()
            .map(|(_, len)| len.unwrap_or(0.))
            .fold(f64::INFINITY, f64::min)
    }

    fn doomed_len(
        &self,
        probe: &Sweep,
        y: f64,
        middle: usize,
        doomed_site: Coordinate<f64>,
    ) -> f64 {
        self.measure_triple(probe, y, middle)
            .iter()
            .find(|(site, _)| site_eq(*site, doomed_site, SITE_EPS))
            .and_then(|(_, len)| *len)
            .unwrap_or(0.)
    }

    /// The one hard invariant: a selection that a fresh replay cannot
    /// re-locate is a reproducibility bug between selection time and
    /// replay time, and must abort loudly rather than degrade silently.
    fn assert_reproducible(
        &self,
        sites: &[Coordinate<f64>],
        bounds: Rect<f64>,
        chosen: &ChosenEvent,
    ) {
        let replay = self.engine_at(sites, bounds, chosen.preview_y);
        if find_triple_arc(&replay, chosen.triple).is_none() {
            panic!(
                "chosen event is not reproducible: replay to y={:.6} no longer finds triple {:?}",
                chosen.preview_y, chosen.triple
            );
        }
    }
}

/// Locate the arc whose `(prev, self, next)` sites match `triple` under
/// epsilon-tolerant, order-independent comparison.
fn find_triple_arc(probe: &Sweep, triple: [Coordinate<f64>; 3]) -> Option<usize> {
    let bl = probe.beachline();
    bl.iter().find_map(|(key, arc)| {
        let prev = arc.prev()?;
        let next = arc.next()?;
        let candidate = [
            bl.get(prev).expect("linked prev arc").site,
            arc.site,
            bl.get(next).expect("linked next arc").site,
        ];
        if triple_matches(candidate, triple) {
            Some(key)
        } else {
            None
        }
    })
}

fn triple_matches(a: [Coordinate<f64>; 3], b: [Coordinate<f64>; 3]) -> bool {
    (0..3usize).permutations(3).any(|perm| {
        perm.iter()
            .zip(a.iter())
            .all(|(&i, &site)| site_eq(site, b[i], SITE_EPS))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn c(x: f64, y: f64) -> Coordinate<f64> {
        Coordinate { x, y }
    }

    fn bounds() -> Rect<f64> {
        Rect::new(c(-100., -100.), c(100., 100.))
    }

    fn camera() -> Camera {
        Camera {
            zoom: 10.,
            focus: c(10., 5.),
            screen_center: c(400., 300.),
            screen_width: 800.,
            screen_height: 600.,
        }
    }

    fn config() -> SelectorConfig {
        SelectorConfig {
            min_arc_len_px: 2.,
            epsilon: 1e-2,
            min_event_dy: 5.,
            max_circle_events_to_scan: 10,
            wake_px: 3.,
            approach_px: 2.,
        }
    }

    /// A leftward triangle whose circle event fires at y=20, flanked by
    /// outriggers whose events fire much earlier (and get rejected by the
    /// `min_event_dy` gate), plus two late arrivals.
    fn cluster() -> Vec<Coordinate<f64>> {
        vec![
            c(10., -5.),
            c(-40., -2.),
            c(60., -2.),
            c(0., 0.),
            c(20., 0.),
            c(-45., 40.),
            c(65., 40.),
        ]
    }

    fn init_log() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn triple_matching_is_order_independent() {
        let t = [c(0., 0.), c(10., -5.), c(20., 0.)];
        assert!(triple_matches([t[2], t[0], t[1]], t));
        assert!(triple_matches([t[1], t[2], t[0]], t));
        assert!(!triple_matches([t[0], t[1], t[1]], t));
        // Within the site tolerance.
        assert!(triple_matches(
            [c(1e-8, 0.), t[1], t[2]],
            t
        ));
    }

    #[test]
    fn cluster_yields_the_triangle_event() {
        init_log();
        let sites = cluster();
        let mut selector = EventSelector::new(camera(), config());
        let chosen = selector
            .find_eligible_event(&sites, bounds(), Some(c(10., -5.)))
            .expect("the triangle event is eligible");

        assert_relative_eq!(chosen.event_y, 20., max_relative = 1e-9);
        assert_relative_eq!(chosen.center.x, 10., max_relative = 1e-9);
        assert_relative_eq!(chosen.center.y, 7.5, max_relative = 1e-9);
        assert_relative_eq!(chosen.radius, 12.5, max_relative = 1e-9);
        assert_eq!(chosen.doomed_site, c(10., -5.));

        assert!(0. <= chosen.wake_y);
        assert!(chosen.wake_y < chosen.approach_y);
        assert!(chosen.approach_y < chosen.event_y);
        assert!(chosen.preview_doomed_len_px >= config().min_arc_len_px);
        assert!(chosen.min_len_at_wake_px >= config().wake_px);

        // The two outrigger events share the required site but sit too
        // close to their own sites; both must be rejected with reasons.
        assert_eq!(selector.rejections().len(), 2);
        for reason in selector.rejections() {
            assert!(reason.contains("above its latest site"), "{}", reason);
        }
    }

    #[test]
    fn doomed_arc_shrinks_monotonically() {
        let sites = cluster();
        let mut selector = EventSelector::new(camera(), config());
        let chosen = selector
            .find_eligible_event(&sites, bounds(), Some(c(10., -5.)))
            .unwrap();

        let mut lengths = Vec::new();
        for &t in &[0.25, 0.5, 0.75] {
            let y = chosen.wake_y + t * (chosen.approach_y - chosen.wake_y);
            let probe = selector.engine_at(&sites, bounds(), y);
            let key = find_triple_arc(&probe, chosen.triple).expect("triple present");
            lengths.push(selector.doomed_len(&probe, y, key, chosen.doomed_site));
        }
        assert!(
            lengths[0] > lengths[1] && lengths[1] > lengths[2],
            "doomed arc must shrink towards the event: {:?}",
            lengths
        );
    }

    #[test]
    fn impossible_thresholds_reject_everything() {
        let sites = vec![c(0., 0.), c(10., -5.), c(20., 0.)];
        let mut selector = EventSelector::new(
            camera(),
            SelectorConfig {
                wake_px: 1e9,
                min_event_dy: 1.,
                ..config()
            },
        );
        assert!(selector
            .find_eligible_event(&sites, bounds(), None)
            .is_none());
        assert_eq!(selector.rejections().len(), 1);
        assert!(selector.rejections()[0].contains("wake threshold"));
    }

    #[test]
    fn required_site_filters_candidates() {
        let sites = cluster();
        let mut selector = EventSelector::new(camera(), config());
        // No circle event involves the late top-left arrival within the
        // scan budget's eligible window.
        let chosen = selector.find_eligible_event(&sites, bounds(), Some(c(-45., 40.)));
        if let Some(ev) = chosen {
            assert!(ev
                .triple
                .iter()
                .any(|&s| site_eq(s, c(-45., 40.), SITE_EPS)));
        }
    }
}
