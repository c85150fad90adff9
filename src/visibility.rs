//! Screen-space measurement of beachline arcs.
//!
//! The selector's eligibility gates are all phrased in rendered pixels, so
//! this module is the single source of truth for "how much of this arc is
//! on screen": every consumer samples and measures through the same two
//! functions to keep selection and later replay in agreement.

use geo::Coordinate;
use itertools::Itertools;

use crate::beachline::Beachline;
use crate::geometry::parabola_y;

/// Beachline sampling density, in screen pixels per sample.
pub const SAMPLE_STEP_PX: f64 = 2.0;

/// World-to-screen transform supplied by the presentation layer.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub zoom: f64,
    /// World point the camera looks at.
    pub focus: Coordinate<f64>,
    /// Screen point `focus` maps to.
    pub screen_center: Coordinate<f64>,
    pub screen_width: f64,
    pub screen_height: f64,
}

impl Camera {
    pub fn to_screen(&self, world: Coordinate<f64>) -> Coordinate<f64> {
        Coordinate {
            x: (world.x - self.focus.x) * self.zoom + self.screen_center.x,
            y: (world.y - self.focus.y) * self.zoom + self.screen_center.y,
        }
    }

    /// World X that projects to the given screen X.
    pub fn world_x_at(&self, screen_x: f64) -> f64 {
        (screen_x - self.screen_center.x) / self.zoom + self.focus.x
    }

    /// The world-X interval visible on screen.
    pub fn visible_world_x(&self) -> (f64, f64) {
        (self.world_x_at(0.), self.world_x_at(self.screen_width))
    }
}

/// The visible rendering of one arc instance: the arc's arena key, its
/// site, and the sampled world points in left-to-right order.
///
/// Identity is the arc instance, not the site: a site can simultaneously
/// own two disjoint arcs, which yield two segments.
#[derive(Debug, Clone)]
pub struct ArcSegment {
    pub arc: usize,
    pub site: Coordinate<f64>,
    pub points: Vec<Coordinate<f64>>,
}

/// Sample the beachline across the visible world-X range at
/// [`SAMPLE_STEP_PX`] density, grouping consecutive samples that land on
/// the same arc instance.
pub fn sample_beachline(
    beachline: &Beachline,
    directrix: f64,
    camera: &Camera,
) -> Vec<ArcSegment> {
    let spans = beachline.spans(directrix);
    if spans.is_empty() {
        return Vec::new();
    }
    let (x0, x1) = camera.visible_world_x();
    let step = SAMPLE_STEP_PX / camera.zoom;

    let mut segments: Vec<ArcSegment> = Vec::new();
    let mut span_idx = 0;
    let mut x = x0;
    while x <= x1 {
        while span_idx + 1 < spans.len() && x > spans[span_idx].right {
            span_idx += 1;
        }
        let span = &spans[span_idx];
        let y = parabola_y(span.site, x, directrix);
        if y.is_finite() {
            match segments.last_mut() {
                Some(seg) if seg.arc == span.key => seg.points.push(Coordinate { x, y }),
                _ => segments.push(ArcSegment {
                    arc: span.key,
                    site: span.site,
                    points: vec![Coordinate { x, y }],
                }),
            }
        }
        x += step;
    }
    segments
}

/// Summed screen-space polyline length of the segments belonging to the
/// arc instance `arc`.
///
/// `None` when no segment matched: the instance is entirely off-screen (or
/// too narrow to catch a sample).
pub fn measure_arc_instance_px(
    segments: &[ArcSegment],
    arc: usize,
    camera: &Camera,
) -> Option<f64> {
    let mut found = false;
    let mut total = 0.;
    for seg in segments.iter().filter(|s| s.arc == arc) {
        found = true;
        total += seg
            .points
            .iter()
            .map(|&p| camera.to_screen(p))
            .tuple_windows()
            .map(|(a, b)| ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt())
            .sum::<f64>();
    }
    if found {
        Some(total)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::Sweep;
    use approx::assert_relative_eq;
    use geo::Rect;

    fn c(x: f64, y: f64) -> Coordinate<f64> {
        Coordinate { x, y }
    }

    fn camera() -> Camera {
        Camera {
            zoom: 4.,
            focus: c(10., 5.),
            screen_center: c(400., 300.),
            screen_width: 800.,
            screen_height: 600.,
        }
    }

    #[test]
    fn transform_round_trip() {
        let cam = camera();
        let w = c(-3.25, 7.5);
        let s = cam.to_screen(w);
        assert_relative_eq!(cam.world_x_at(s.x), w.x, max_relative = 1e-12);
        let (x0, x1) = cam.visible_world_x();
        assert_relative_eq!(x0, 10. - 100.);
        assert_relative_eq!(x1, 10. + 100.);
    }

    #[test]
    fn single_arc_spans_the_screen() {
        let cam = camera();
        let mut sweep = Sweep::new(&[c(10., 0.)], Rect::new(c(-100., -100.), c(100., 100.)));
        assert!(sweep.step());

        let segments = sample_beachline(sweep.beachline(), 10., &cam);
        assert_eq!(segments.len(), 1);
        let arc = segments[0].arc;
        let len = measure_arc_instance_px(&segments, arc, &cam).unwrap();
        // At least as long as the screen is wide; the parabola only adds.
        assert!(len >= cam.screen_width - SAMPLE_STEP_PX);

        assert!(measure_arc_instance_px(&segments, arc + 1, &cam).is_none());
    }

    #[test]
    fn split_site_owns_two_instances() {
        let cam = camera();
        let mut sweep = Sweep::new(
            &[c(10., 0.), c(10., 5.)],
            Rect::new(c(-100., -100.), c(100., 100.)),
        );
        while sweep.step() {}

        // Beachline is [old, new, old]: the old site owns two disjoint
        // instances which must measure as distinct segments.
        let segments = sample_beachline(sweep.beachline(), 10., &cam);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].site, segments[2].site);
        assert_ne!(segments[0].arc, segments[2].arc);
        assert_eq!(segments[1].site, c(10., 5.));

        for seg in &segments {
            assert!(measure_arc_instance_px(&segments, seg.arc, &cam).unwrap() > 0.);
        }
    }

    #[test]
    fn off_screen_arc_is_not_found() {
        let cam = Camera {
            zoom: 40.,
            focus: c(-80., 5.),
            ..camera()
        };
        let mut sweep = Sweep::new(
            &[c(10., 0.), c(10., 5.)],
            Rect::new(c(-100., -100.), c(100., 100.)),
        );
        while sweep.step() {}

        // Zoomed far left, only the leftmost old-site instance is visible.
        let segments = sample_beachline(sweep.beachline(), 10., &cam);
        let spans = sweep.beachline().spans(10.);
        let middle = spans[1].key;
        assert!(measure_arc_instance_px(&segments, middle, &cam).is_none());
    }
}
