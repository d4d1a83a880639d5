//! Geometry constructors for the procedural solid catalogue.
//!
//! Every constructor returns convex polygons wound counter-clockwise when
//! seen from outside the solid. Concave caps (gear, star, cross) are split
//! into convex pieces that share edges.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use nalgebra::Point3;

use crate::error::Result;

/// One polygon of a solid, as ordered positions.
pub type Polygon = Vec<Point3<f64>>;

type Point2 = (f64, f64);

/// Regular `n`-gon of circumradius `r`, counter-clockwise, first vertex at
/// angle `phase`.
fn regular_polygon(n: usize, r: f64, phase: f64) -> Vec<Point2> {
    (0..n)
        .map(|i| {
            let a = phase + TAU * i as f64 / n as f64;
            (r * a.cos(), r * a.sin())
        })
        .collect()
}

fn at(p: Point2, z: f64) -> Point3<f64> {
    Point3::new(p.0, p.1, z)
}

/// Extrude a counter-clockwise outline along z, centred on the origin.
///
/// `caps` are convex counter-clockwise pieces tiling the outline; each is
/// emitted on top as given and reversed on the bottom.
fn extrude_outline(outline: &[Point2], caps: &[Vec<Point2>], height: f64) -> Vec<Polygon> {
    let (z0, z1) = (-height / 2.0, height / 2.0);
    let n = outline.len();
    let mut polygons = Vec::with_capacity(n + 2 * caps.len());
    for i in 0..n {
        let (a, b) = (outline[i], outline[(i + 1) % n]);
        polygons.push(vec![at(a, z0), at(b, z0), at(b, z1), at(a, z1)]);
    }
    for cap in caps {
        polygons.push(cap.iter().map(|&p| at(p, z1)).collect());
        polygons.push(cap.iter().rev().map(|&p| at(p, z0)).collect());
    }
    polygons
}

/// Prism over a regular `n`-gon.
fn regular_prism(n: usize, r: f64, height: f64) -> Vec<Polygon> {
    let base = regular_polygon(n, r, FRAC_PI_2);
    extrude_outline(&base, &[base.clone()], height)
}

/// Pyramid over a regular `n`-gon with its apex on the +z axis.
fn regular_pyramid(n: usize, r: f64, height: f64, phase: f64) -> Vec<Polygon> {
    let (z0, z1) = (-height / 2.0, height / 2.0);
    let base = regular_polygon(n, r, phase);
    let apex = Point3::new(0.0, 0.0, z1);
    let mut polygons: Vec<Polygon> = (0..n)
        .map(|i| vec![at(base[i], z0), at(base[(i + 1) % n], z0), apex])
        .collect();
    polygons.push(base.iter().rev().map(|&p| at(p, z0)).collect());
    polygons
}

/// Axis-aligned cube with edge length 2.
pub fn cube() -> Result<Vec<Polygon>> {
    let square = vec![(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
    Ok(extrude_outline(&square, &[square.clone()], 2.0))
}

/// Regular tetrahedron inscribed in the cube `[-1, 1]³`.
pub fn tetrahedron() -> Result<Vec<Polygon>> {
    let a = Point3::new(1.0, 1.0, 1.0);
    let b = Point3::new(1.0, -1.0, -1.0);
    let c = Point3::new(-1.0, 1.0, -1.0);
    let d = Point3::new(-1.0, -1.0, 1.0);
    Ok(vec![vec![a, b, c], vec![a, c, d], vec![a, d, b], vec![b, d, c]])
}

/// Regular octahedron with vertices on the unit axes.
pub fn octahedron() -> Result<Vec<Polygon>> {
    let mut polygons = Vec::with_capacity(8);
    for sx in [1.0, -1.0] {
        for sy in [1.0, -1.0] {
            for sz in [1.0, -1.0] {
                let x = Point3::new(sx, 0.0, 0.0);
                let y = Point3::new(0.0, sy, 0.0);
                let z = Point3::new(0.0, 0.0, sz);
                if sx * sy * sz > 0.0 {
                    polygons.push(vec![x, y, z]);
                } else {
                    polygons.push(vec![x, z, y]);
                }
            }
        }
    }
    Ok(polygons)
}

/// Prism over an equilateral triangle.
pub fn triangular_prism() -> Result<Vec<Polygon>> {
    Ok(regular_prism(3, 1.0, 2.0))
}

/// Prism over a regular pentagon.
pub fn pentagonal_prism() -> Result<Vec<Polygon>> {
    Ok(regular_prism(5, 1.0, 1.5))
}

/// Prism over a regular hexagon.
pub fn hexagonal_prism() -> Result<Vec<Polygon>> {
    Ok(regular_prism(6, 1.0, 1.5))
}

/// Prism over a right triangle.
pub fn wedge() -> Result<Vec<Polygon>> {
    let profile = vec![(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0)];
    Ok(extrude_outline(&profile, &[profile.clone()], 2.0))
}

/// Pyramid over a square.
pub fn square_pyramid() -> Result<Vec<Polygon>> {
    Ok(regular_pyramid(4, 2.0_f64.sqrt(), 2.0, PI / 4.0))
}

/// Cone approximated by 24 segments.
pub fn cone() -> Result<Vec<Polygon>> {
    Ok(regular_pyramid(24, 1.0, 2.0, 0.0))
}

/// Cylinder approximated by 24 segments.
pub fn cylinder() -> Result<Vec<Polygon>> {
    Ok(regular_prism(24, 1.0, 2.0))
}

/// Spur gear with 8 trapezoidal teeth around a 16-sided hub.
pub fn gear() -> Result<Vec<Polygon>> {
    const TEETH: usize = 8;
    let (r_hub, r_tip) = (1.0, 1.3);
    let step = PI / TEETH as f64;
    let taper = 0.15 * step;

    let hub = regular_polygon(2 * TEETH, r_hub, 0.0);
    let polar = |r: f64, a: f64| (r * a.cos(), r * a.sin());

    let mut outline = Vec::with_capacity(4 * TEETH);
    let mut caps = vec![hub.clone()];
    for k in 0..TEETH {
        let (a0, a1) = ((2 * k) as f64 * step, (2 * k + 1) as f64 * step);
        let tooth = vec![
            hub[2 * k],
            polar(r_tip, a0 + taper),
            polar(r_tip, a1 - taper),
            hub[2 * k + 1],
        ];
        outline.extend_from_slice(&tooth);
        caps.push(tooth);
    }
    Ok(extrude_outline(&outline, &caps, 0.5))
}

/// Five-pointed star: an inner pentagon plus one triangle per tip.
pub fn star() -> Result<Vec<Polygon>> {
    const POINTS: usize = 5;
    let (r_outer, r_inner) = (1.0, 0.45);
    let step = TAU / POINTS as f64;
    let outer = regular_polygon(POINTS, r_outer, FRAC_PI_2);
    let inner = regular_polygon(POINTS, r_inner, FRAC_PI_2 + step / 2.0);

    let mut outline = Vec::with_capacity(2 * POINTS);
    let mut caps = vec![inner.clone()];
    for k in 0..POINTS {
        outline.push(outer[k]);
        outline.push(inner[k]);
        let prev = inner[(k + POINTS - 1) % POINTS];
        caps.push(vec![prev, outer[k], inner[k]]);
    }
    Ok(extrude_outline(&outline, &caps, 0.4))
}

/// Plus-shaped cross: a centre square plus four arms.
pub fn cross() -> Result<Vec<Polygon>> {
    let (a, b) = (0.35, 1.0);
    let outline = vec![
        (b, -a),
        (b, a),
        (a, a),
        (a, b),
        (-a, b),
        (-a, a),
        (-b, a),
        (-b, -a),
        (-a, -a),
        (-a, -b),
        (a, -b),
        (a, -a),
    ];
    let caps = vec![
        vec![(-a, -a), (a, -a), (a, a), (-a, a)],
        vec![(a, -a), (b, -a), (b, a), (a, a)],
        vec![(-a, a), (a, a), (a, b), (-a, b)],
        vec![(-b, -a), (-a, -a), (-a, a), (-b, a)],
        vec![(-a, -b), (a, -b), (a, -a), (-a, -a)],
    ];
    Ok(extrude_outline(&outline, &caps, 0.5))
}

/// Flat ring approximated by 24 segments.
pub fn washer() -> Result<Vec<Polygon>> {
    const SEGMENTS: usize = 24;
    let (r_in, r_out, height) = (0.5, 1.0, 0.3);
    let (z0, z1) = (-height / 2.0, height / 2.0);
    let inner = regular_polygon(SEGMENTS, r_in, 0.0);
    let outer = regular_polygon(SEGMENTS, r_out, 0.0);

    let mut polygons = Vec::with_capacity(4 * SEGMENTS);
    for i in 0..SEGMENTS {
        let j = (i + 1) % SEGMENTS;
        polygons.push(vec![at(inner[i], z1), at(outer[i], z1), at(outer[j], z1), at(inner[j], z1)]);
        polygons.push(vec![at(inner[j], z0), at(outer[j], z0), at(outer[i], z0), at(inner[i], z0)]);
        polygons.push(vec![at(outer[i], z0), at(outer[j], z0), at(outer[j], z1), at(outer[i], z1)]);
        polygons.push(vec![at(inner[j], z0), at(inner[i], z0), at(inner[i], z1), at(inner[j], z1)]);
    }
    Ok(polygons)
}
