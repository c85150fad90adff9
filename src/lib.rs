//! Incremental Voronoi structure via Fortune's sweep, plus staged
//! circle-event selection for visual walkthroughs.
//!
//! 1. [Sweep engine](#sweep-engine)
//! 1. [Event selection](#event-selection)
//!
//! # Sweep engine
//!
//! [`Sweep`] implements [Fortune's algorithm]: a heap of site and circle
//! events processed in ascending Y, against a beachline of parabolic arcs
//! kept in an arena. Each [`Sweep::step`] performs one atomic transition
//! and the engine exposes read-only queries over its current state
//! (beachline, vertices, fired circle events).
//!
//! ```rust
//! use geo::{Coordinate, Rect};
//! use voronoi_sweep::Sweep;
//!
//! let sites = vec![
//!     Coordinate { x: 0., y: 0. },
//!     Coordinate { x: 10., y: -5. },
//!     Coordinate { x: 20., y: 0. },
//! ];
//! let bounds = Rect::new(
//!     Coordinate { x: -50., y: -50. },
//!     Coordinate { x: 50., y: 50. },
//! );
//! let mut sweep = Sweep::new(&sites, bounds);
//! while sweep.step() {}
//! // The leftward-turning triangle produces exactly one diagram vertex.
//! assert_eq!(sweep.vertices().len(), 1);
//! ```
//!
//! # Event selection
//!
//! [`EventSelector`] searches the circle events a fresh engine produces
//! for one suitable for staged presentation: it re-drives the engine at
//! probe sweep positions, measures on-screen arc visibility under a
//! [`Camera`] transform, and locates the WAKE and APPROACH checkpoints by
//! coarse scan, bisection and argmin search. See [`SelectorConfig`] for
//! the thresholds supplied by the presentation layer.
//!
//! [Fortune's algorithm]: //en.wikipedia.org/wiki/Fortune%27s_algorithm

mod geometry;
pub use geometry::{
    circumcenter, orientation, parabola_intersection_x,
    parabola_intersection_x_near_circle_event, parabola_y, site_eq, SITE_EPS,
};

mod events;
pub use events::{CircleEvent, SweepEvent};

mod beachline;
pub use beachline::{Arc, ArcSpan, Beachline};

mod sweep;
pub use sweep::Sweep;

mod visibility;
pub use visibility::{
    measure_arc_instance_px, sample_beachline, ArcSegment, Camera, SAMPLE_STEP_PX,
};

mod selector;
pub use selector::{ChosenEvent, EventSelector, SelectorConfig};
