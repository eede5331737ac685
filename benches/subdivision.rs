//! Benchmarks for subdivision refinement.

use criterion::{criterion_group, criterion_main, Criterion};
use nalgebra::Point3;
use quadrille::prelude::*;
use quadrille::subdivide::{refine_halfedges, Subd};

fn create_grid_cage(n: usize) -> Cage {
    let mut points = Vec::with_capacity((n + 1) * (n + 1));
    let mut faces = Vec::with_capacity(n * n);

    for j in 0..=n {
        for i in 0..=n {
            vertices_push(&mut points, i as f32, j as f32);
        }
    }

    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + (n + 1);
            let v11 = v01 + 1;
            faces.push([v00, v10, v11, v01]);
        }
    }

    build_from_quads(&points, &faces).unwrap()
}

fn vertices_push(points: &mut Vec<Point3<f32>>, x: f32, y: f32) {
    // A gentle bump keeps the geometry non-planar.
    points.push(Point3::new(x, y, (x * 0.7).sin() * (y * 0.7).cos()));
}

fn bench_topology_refinement(c: &mut Criterion) {
    let cage = create_grid_cage(32);

    c.bench_function("refine_halfedges_depth_3", |b| {
        let mut subd = Subd::new(&cage, 3).unwrap();
        b.iter(|| refine_halfedges(&mut subd));
    });
}

fn bench_gather_vs_scatter(c: &mut Criterion) {
    let cage = create_grid_cage(32);

    c.bench_function("refine_gather_depth_3", |b| {
        let mut subd = Subd::new(&cage, 3).unwrap();
        b.iter(|| refine_gather(&mut subd));
    });

    c.bench_function("refine_scatter_depth_3", |b| {
        let mut subd = Subd::new(&cage, 3).unwrap();
        b.iter(|| refine_scatter(&mut subd));
    });
}

fn bench_creased_refinement(c: &mut Criterion) {
    let n = 32;
    let mut points = Vec::with_capacity((n + 1) * (n + 1));
    for j in 0..=n {
        for i in 0..=n {
            vertices_push(&mut points, i as f32, j as f32);
        }
    }
    let mut builder = CageBuilder::new(&points);
    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            builder = builder.quad([v00, v00 + 1, v00 + n + 2, v00 + n + 1]);
        }
    }
    // A sharp feature curve along the bottom row.
    for i in 0..n {
        builder = builder.sharp_edge(i, i + 1, 2.0);
    }
    let cage = builder.build().unwrap();

    c.bench_function("refine_gather_creased_depth_3", |b| {
        let mut subd = Subd::new(&cage, 3).unwrap();
        b.iter(|| refine_gather(&mut subd));
    });
}

criterion_group!(
    benches,
    bench_topology_refinement,
    bench_gather_vs_scatter,
    bench_creased_refinement
);
criterion_main!(benches);
