//! Numeric primitives for the parabolic front.
//!
//! Everything here is stateless and concrete over `f64`: the sweep works in
//! world coordinates where the configured guards are absolute quantities.
//! The beachline is the pointwise greatest-Y envelope of the arcs' parabolas,
//! and all root selection below is consistent with that convention.

use geo::Coordinate;

/// Tolerance under which two sites are considered the same input point.
pub const SITE_EPS: f64 = 1e-6;

/// Below this, a denominator (twice a signed area, or the focus-directrix
/// gap) is treated as degenerate.
pub(crate) const DEGENERATE_EPS: f64 = 1e-9;

/// Signed cross product `(b - a) x (c - a)`.
///
/// Positive for a counter-clockwise (leftward) turn, zero for collinear
/// points. Antisymmetric in its last two arguments.
pub fn orientation(a: Coordinate<f64>, b: Coordinate<f64>, c: Coordinate<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Coordinate-wise equality under `eps`.
pub fn site_eq(a: Coordinate<f64>, b: Coordinate<f64>, eps: f64) -> bool {
    (a.x - b.x).abs() <= eps && (a.y - b.y).abs() <= eps
}

/// Evaluate the parabola with the given focus and directrix at `x`.
///
/// Non-finite when `focus.y == directrix`; callers filter on `is_finite`.
pub fn parabola_y(focus: Coordinate<f64>, x: f64, directrix: f64) -> f64 {
    let dx = x - focus.x;
    dx * dx / (2. * (focus.y - directrix)) + (focus.y + directrix) / 2.
}

/// Circumcenter of the triangle `a b c`.
///
/// `None` when twice the signed area is below [`DEGENERATE_EPS`] in
/// magnitude (collinear or nearly so).
pub fn circumcenter(
    a: Coordinate<f64>,
    b: Coordinate<f64>,
    c: Coordinate<f64>,
) -> Option<Coordinate<f64>> {
    let two_area = orientation(a, b, c);
    if two_area.abs() < DEGENERATE_EPS {
        return None;
    }
    let d = 2. * two_area;
    let (na, nb, nc) = (
        a.x * a.x + a.y * a.y,
        b.x * b.x + b.y * b.y,
        c.x * c.x + c.y * c.y,
    );
    Some(Coordinate {
        x: (na * (b.y - c.y) + nb * (c.y - a.y) + nc * (a.y - b.y)) / d,
        y: (na * (c.x - b.x) + nb * (a.x - c.x) + nc * (b.x - a.x)) / d,
    })
}

/// The zero, one or two solutions of `parabola_y(f1, x) == parabola_y(f2, x)`.
enum Roots {
    /// Degenerate directrix handled by short-circuit.
    Forced(f64),
    Single(f64),
    /// Ordered: first root is the smaller x.
    Pair(f64, f64),
}

fn breakpoint_roots(f1: Coordinate<f64>, f2: Coordinate<f64>, directrix: f64) -> Roots {
    let d1 = f1.y - directrix;
    let d2 = f2.y - directrix;
    // A focus sitting on the directrix pins its parabola to a vertical ray;
    // the breakpoint collapses onto the focus X (or the midpoint when both
    // are pinned).
    if d1.abs() < DEGENERATE_EPS && d2.abs() < DEGENERATE_EPS {
        return Roots::Forced((f1.x + f2.x) / 2.);
    }
    if d1.abs() < DEGENERATE_EPS {
        return Roots::Forced(f1.x);
    }
    if d2.abs() < DEGENERATE_EPS {
        return Roots::Forced(f2.x);
    }

    // parabola_y(f, x) = (x - f.x)^2 / (2 d) + (f.y + directrix) / 2
    let a = 1. / (2. * d1) - 1. / (2. * d2);
    let b = -f1.x / d1 + f2.x / d2;
    let c = f1.x * f1.x / (2. * d1) - f2.x * f2.x / (2. * d2) + (f1.y - f2.y) / 2.;

    if a.abs() < DEGENERATE_EPS {
        // Equal focus depths: the difference is linear.
        return Roots::Single(-c / b);
    }
    let disc = b * b - 4. * a * c;
    if disc <= 0. {
        // Tangent or (numerically) disjoint parabolas.
        return Roots::Single(-b / (2. * a));
    }
    let sq = disc.sqrt();
    let r1 = (-b - sq) / (2. * a);
    let r2 = (-b + sq) / (2. * a);
    if r1 <= r2 {
        Roots::Pair(r1, r2)
    } else {
        Roots::Pair(r2, r1)
    }
}

/// Breakpoint between the arc of `f1` and the arc of `f2`, with `f1`'s arc
/// lying to the left of `f2`'s.
///
/// When two real roots exist, the correct one is found by probing the sign
/// of `parabola_y(f1, x) - parabola_y(f2, x)` at `x ± eps`: at the sought
/// root the difference transitions from non-negative (f1 on top, left side)
/// to non-positive (f2 on top, right side). If the probe accepts neither or
/// both roots, fall back to the root between the two foci's X coordinates,
/// then to the root nearest their midpoint.
pub fn parabola_intersection_x(f1: Coordinate<f64>, f2: Coordinate<f64>, directrix: f64) -> f64 {
    let (r1, r2) = match breakpoint_roots(f1, f2, directrix) {
        Roots::Forced(x) | Roots::Single(x) => return x,
        Roots::Pair(r1, r2) => (r1, r2),
    };

    let probe = |x: f64| {
        let h = 1e-6 * (1. + x.abs());
        let left = parabola_y(f1, x - h, directrix) - parabola_y(f2, x - h, directrix);
        let right = parabola_y(f1, x + h, directrix) - parabola_y(f2, x + h, directrix);
        left >= 0. && right <= 0.
    };
    match (probe(r1), probe(r2)) {
        (true, false) => return r1,
        (false, true) => return r2,
        // Numerically ambiguous; fall through to the heuristics.
        _ => {}
    }

    let (lo, hi) = if f1.x <= f2.x { (f1.x, f2.x) } else { (f2.x, f1.x) };
    let between1 = (lo..=hi).contains(&r1);
    let between2 = (lo..=hi).contains(&r2);
    if between1 != between2 {
        return if between1 { r1 } else { r2 };
    }

    let mid = (f1.x + f2.x) / 2.;
    if (r1 - mid).abs() <= (r2 - mid).abs() {
        r1
    } else {
        r2
    }
}

/// Breakpoint selection for a sweep position extremely close to a predicted
/// circle event.
///
/// Near the vanishing point the two roots almost coincide with the circle
/// center X and the side probe of [`parabola_intersection_x`] becomes
/// unreliable, tending to pick the diverging outer root. Here we simply take
/// whichever root lies closest to `target_x`, the center X of the predicted
/// circle.
pub fn parabola_intersection_x_near_circle_event(
    f1: Coordinate<f64>,
    f2: Coordinate<f64>,
    directrix: f64,
    target_x: f64,
) -> f64 {
    match breakpoint_roots(f1, f2, directrix) {
        Roots::Forced(x) | Roots::Single(x) => x,
        Roots::Pair(r1, r2) => {
            if (r1 - target_x).abs() <= (r2 - target_x).abs() {
                r1
            } else {
                r2
            }
        }
    }
}
