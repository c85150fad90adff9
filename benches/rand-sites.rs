use criterion::*;
use geo::{Coordinate, Rect};
use rand::{thread_rng, Rng};

use voronoi_sweep::Sweep;

const BBOX: f64 = 1024.;

fn uniform_sites<R: Rng>(rng: &mut R, n: usize) -> Vec<Coordinate<f64>> {
    (0..n)
        .map(|_| Coordinate {
            x: rng.gen_range(0.0..BBOX),
            y: rng.gen_range(0.0..BBOX),
        })
        .collect()
}

fn sweep_uniform(c: &mut Criterion) {
    let bounds = Rect::new(
        Coordinate { x: 0., y: 0. },
        Coordinate { x: BBOX, y: BBOX },
    );

    for &n in &[64usize, 256, 1024] {
        let sites = uniform_sites(&mut thread_rng(), n);
        c.bench_function(&format!("Fortune sweep - {} uniform sites", n), |b| {
            b.iter(|| {
                let mut sweep = Sweep::new(&sites, bounds);
                black_box(sweep.finish());
            })
        });
    }
}

criterion_group!(benches, sweep_uniform);
criterion_main!(benches);
