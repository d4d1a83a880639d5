//! Benchmarks for mesh operations.

use criterion::{criterion_group, criterion_main, Criterion};
use nalgebra::Point3;
use tessera::prelude::*;

/// Gently rippled `n × n` grid, so that merging has several planes to find.
fn create_grid_mesh(n: usize) -> MeshBuffer {
    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    let mut faces = Vec::with_capacity(n * n * 2);

    for j in 0..=n {
        for i in 0..=n {
            let z = if (i / 4 + j / 4) % 2 == 0 { 0.0 } else { 0.05 * i as f64 };
            vertices.push(Point3::new(i as f64, j as f64, z));
        }
    }

    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + (n + 1);
            let v11 = v01 + 1;

            faces.push([v00, v10, v11]);
            faces.push([v00, v11, v01]);
        }
    }

    MeshBuffer::from_parts(vertices, faces).unwrap()
}

fn bench_mesh_construction(c: &mut Criterion) {
    let mesh = create_grid_mesh(50);
    let positions = mesh.to_flat_positions();
    let indices = mesh.to_flat_indices();

    c.bench_function("from_flat_grid_50x50", |b| {
        b.iter(|| MeshBuffer::from_flat(&positions, Some(&indices)).unwrap());
    });

    c.bench_function("weld_grid_50x50", |b| {
        b.iter(|| mesh.weld(1e-3).num_logical());
    });
}

fn bench_reconstruct(c: &mut Criterion) {
    let mesh = create_grid_mesh(20);

    let mut group = c.benchmark_group("reconstruct_grid_20x20");
    group.bench_function("parallel", |b| {
        b.iter(|| reconstruct(&mesh, &MergeOptions::default()).unwrap().len());
    });
    group.bench_function("sequential", |b| {
        let options = MergeOptions::default().sequential();
        b.iter(|| reconstruct(&mesh, &options).unwrap().len());
    });
    group.bench_function("all_pairs", |b| {
        let options = MergeOptions::default().with_bucket_by_normal(false);
        b.iter(|| reconstruct(&mesh, &options).unwrap().len());
    });
    group.finish();

    let gear = SolidCache::new().get("gear").unwrap();
    c.bench_function("reconstruct_gear", |b| {
        b.iter(|| reconstruct(&gear, &MergeOptions::default()).unwrap().len());
    });
}

fn bench_simplify(c: &mut Criterion) {
    let grid = create_grid_mesh(30);
    let cylinder = SolidCache::new().get("cylinder").unwrap();

    c.bench_function("simplify_grid_30x30", |b| {
        let options = SimplifyOptions::with_target(0.5).with_refresh_overlay(false);
        b.iter(|| simplify(&grid, &options).unwrap().reduction_achieved);
    });

    c.bench_function("simplify_cylinder_with_overlay", |b| {
        let options = SimplifyOptions::with_target(0.3);
        b.iter(|| simplify(&cylinder, &options).unwrap().reduction_achieved);
    });
}

fn bench_solids(c: &mut Criterion) {
    c.bench_function("solid_cache_init", |b| {
        b.iter(|| SolidCache::new().init());
    });
}

criterion_group!(
    benches,
    bench_mesh_construction,
    bench_reconstruct,
    bench_simplify,
    bench_solids
);
criterion_main!(benches);
