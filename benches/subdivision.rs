//! Benchmarks for cage refinement and plane sections.

use criterion::{criterion_group, criterion_main, Criterion};
use keelson::prelude::*;
use nalgebra::{Point3, Vector3};

fn create_grid_cage(n: usize) -> Surface {
    let mut surface = Surface::new();
    let mut points = Vec::with_capacity((n + 1) * (n + 1));

    // A gently curved sheet standing in the xz plane
    for j in 0..=n {
        for i in 0..=n {
            let x = i as f64;
            let y = ((i as f64) * 0.35).sin() * 0.5;
            points.push(surface.add_control_point(Point3::new(x, y, j as f64)));
        }
    }

    // Wire it up as quads
    for j in 0..n {
        for i in 0..n {
            let p00 = j * (n + 1) + i;
            let p10 = p00 + 1;
            let p01 = p00 + (n + 1);
            let p11 = p01 + 1;

            surface
                .add_control_face(&[points[p00], points[p10], points[p11], points[p01]], None)
                .unwrap();
        }
    }

    surface
}

fn bench_cage_construction(c: &mut Criterion) {
    c.bench_function("build_cage_10x10", |b| {
        b.iter(|| {
            let surface = create_grid_cage(10);
            surface.control_face_ids().len()
        });
    });
}

fn bench_refinement(c: &mut Criterion) {
    for level in 1..=3 {
        c.bench_function(&format!("subdivide_grid_20x20_level_{level}"), |b| {
            let mut surface = create_grid_cage(20);
            surface.set_desired_subdivision_level(level);

            b.iter(|| {
                surface.set_build(false).unwrap();
                surface.set_build(true).unwrap();
                surface.number_of_points().unwrap()
            });
        });
    }
}

fn bench_sections(c: &mut Criterion) {
    let mut surface = create_grid_cage(20);
    surface.set_desired_subdivision_level(2);
    let faces = surface.face_ids().unwrap();
    let waterplane =
        Plane::from_point_normal(&Point3::new(0.0, 0.0, 10.5), &Vector3::z());

    c.bench_function("waterline_sections_20x20", |b| {
        b.iter(|| {
            surface
                .calculate_intersections(&waterplane, &faces)
                .unwrap()
                .len()
        });
    });
}

criterion_group!(
    benches,
    bench_cage_construction,
    bench_refinement,
    bench_sections
);
criterion_main!(benches);
