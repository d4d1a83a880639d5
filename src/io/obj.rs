//! Wavefront OBJ support with polygon faces.
//!
//! OBJ is the polygon-preserving exchange format: the writer emits one `f`
//! record per polygon face, and the reader fan-triangulates every `f` record
//! into the triangle buffer while keeping the polygon as an overlay face.
//! Only `v` and `f` records are interpreted; texture and normal references
//! in `f` records (`v/vt/vn`) are accepted and ignored.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;
use nalgebra::{Point3, Vector3};

use crate::error::{MeshError, Result};
use crate::mesh::{newell_normal, MeshBuffer, PolygonFace, VertexWeld};
use crate::tolerance::DISTANCE_TOLERANCE;

/// Write polygon faces as OBJ. Vertices shared between faces (within the
/// default distance tolerance) are written once.
pub fn write_polygons<W: Write>(w: &mut W, name: &str, faces: &[PolygonFace]) -> Result<()> {
    let corners: Vec<Point3<f64>> = faces.iter().flat_map(|f| f.vertices.iter().copied()).collect();
    let weld = VertexWeld::build(&corners, DISTANCE_TOLERANCE);

    writeln!(w, "# tessera polygon mesh")?;
    writeln!(w, "o {}", name)?;
    for p in weld.representatives() {
        writeln!(w, "v {} {} {}", p.x, p.y, p.z)?;
    }

    let mut corner = 0usize;
    for face in faces {
        let mut record = String::from("f");
        for _ in &face.vertices {
            record.push_str(&format!(" {}", weld.logical(corner) + 1));
            corner += 1;
        }
        if face.num_vertices() >= 3 {
            writeln!(w, "{}", record)?;
        }
    }
    Ok(())
}

/// Render polygon faces as OBJ text.
pub fn polygons_to_string(name: &str, faces: &[PolygonFace]) -> Result<String> {
    let mut buf = Vec::new();
    write_polygons(&mut buf, name, faces)?;
    String::from_utf8(buf).map_err(|e| MeshError::InvalidState(e.to_string()))
}

/// Write a mesh as OBJ: its polygon overlay when fresh, its triangles
/// otherwise.
pub fn write_mesh<W: Write>(w: &mut W, name: &str, mesh: &MeshBuffer) -> Result<()> {
    if let Some(faces) = mesh.overlay() {
        return write_polygons(w, name, faces);
    }
    writeln!(w, "# tessera triangle mesh")?;
    writeln!(w, "o {}", name)?;
    for p in mesh.positions() {
        writeln!(w, "v {} {} {}", p.x, p.y, p.z)?;
    }
    for [a, b, c] in mesh.triangles() {
        writeln!(w, "f {} {} {}", a + 1, b + 1, c + 1)?;
    }
    Ok(())
}

/// Parse OBJ text into a buffer with the polygon overlay attached.
///
/// The overlay is only attached when every polygon has a well-defined
/// normal.
pub fn parse(text: &str) -> Result<MeshBuffer> {
    parse_named(text, Path::new("<memory>"))
}

fn parse_named(text: &str, path: &Path) -> Result<MeshBuffer> {
    let fail = |line: usize, message: String| MeshError::LoadError {
        path: path.to_path_buf(),
        message: format!("line {}: {}", line, message),
    };

    let mut positions: Vec<Point3<f64>> = Vec::new();
    let mut polygons: Vec<Vec<usize>> = Vec::new();

    for (number, line) in text.lines().enumerate() {
        let number = number + 1;
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let coords: Vec<f64> = tokens
                    .take(3)
                    .map(str::parse::<f64>)
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| fail(number, format!("bad vertex: {}", e)))?;
                if coords.len() != 3 {
                    return Err(fail(number, "vertex needs three coordinates".into()));
                }
                positions.push(Point3::new(coords[0], coords[1], coords[2]));
            }
            Some("f") => {
                let mut polygon = Vec::new();
                for token in tokens {
                    let index = token.split('/').next().unwrap_or(token);
                    let raw: i64 = index
                        .parse()
                        .map_err(|_| fail(number, format!("bad face index {:?}", token)))?;
                    let resolved = match raw {
                        r if r > 0 => (r - 1) as usize,
                        r if r < 0 && (-r) as usize <= positions.len() => {
                            positions.len() - (-r) as usize
                        }
                        _ => return Err(fail(number, format!("face index {} out of range", raw))),
                    };
                    if resolved >= positions.len() {
                        return Err(fail(number, format!("face index {} out of range", raw)));
                    }
                    polygon.push(resolved);
                }
                if polygon.len() < 3 {
                    return Err(fail(number, "face needs at least three vertices".into()));
                }
                polygons.push(polygon);
            }
            _ => {}
        }
    }

    if polygons.is_empty() {
        return Err(MeshError::LoadError {
            path: path.to_path_buf(),
            message: "OBJ text contains no faces".to_string(),
        });
    }

    let mut triangles: Vec<[usize; 3]> = Vec::new();
    let mut faces: Vec<PolygonFace> = Vec::with_capacity(polygons.len());
    let mut complete = true;
    for polygon in &polygons {
        let first = triangles.len();
        for i in 1..polygon.len() - 1 {
            triangles.push([polygon[0], polygon[i], polygon[i + 1]]);
        }
        let vertices: Vec<Point3<f64>> = polygon.iter().map(|&i| positions[i]).collect();
        let normal = newell_normal(&vertices).unwrap_or_else(|| {
            complete = false;
            Vector3::zeros()
        });
        faces.push(PolygonFace::new(vertices, normal, (first..triangles.len()).collect()));
    }

    let mut mesh = MeshBuffer::from_parts(positions, triangles)?;
    if complete {
        mesh.apply_overlay(faces)?;
    } else {
        debug!("{}: degenerate polygon present; overlay not attached", path.display());
    }
    Ok(mesh)
}

/// Load an OBJ file.
///
/// # Example
///
/// ```no_run
/// use tessera::io::obj;
///
/// let mesh = obj::load("model.obj").unwrap();
/// println!("{} polygon faces", mesh.overlay().map_or(0, |o| o.len()));
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<MeshBuffer> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    parse_named(&text, path)
}

/// Save a mesh to an OBJ file (see [`write_mesh`]).
pub fn save<P: AsRef<Path>>(mesh: &MeshBuffer, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("mesh");
    write_mesh(&mut writer, name, mesh).map_err(|e| MeshError::SaveError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::FaceType;

    const SQUARE_AND_TRIANGLE: &str = "\
# test
o sample
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 0.5 0.5 1
f 1 2 3 4
f 1/1/1 2/2/2 5/5/5
";

    #[test]
    fn test_parse_polygons() {
        let mesh = parse(SQUARE_AND_TRIANGLE).unwrap();
        assert_eq!(mesh.num_vertices(), 5);
        assert_eq!(mesh.num_triangles(), 3);

        let overlay = mesh.overlay().unwrap();
        assert_eq!(overlay.len(), 2);
        assert_eq!(overlay[0].face_type, FaceType::Quad);
        assert_eq!(overlay[0].source_triangles, vec![0, 1]);
        assert_eq!(overlay[1].source_triangles, vec![2]);
        assert!((overlay[0].normal - Vector3::z()).norm() < 1e-12);
    }

    #[test]
    fn test_negative_indices() {
        let mesh = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n").unwrap();
        assert_eq!(mesh.triangles(), &[[0, 1, 2]]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse("v 0 0 0\n"), Err(MeshError::LoadError { .. })));
        assert!(matches!(
            parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n"),
            Err(MeshError::LoadError { .. })
        ));
        assert!(matches!(
            parse("v 0 zero 0\nf 1 1 1\n"),
            Err(MeshError::LoadError { .. })
        ));
    }

    #[test]
    fn test_write_then_parse_keeps_polygons() {
        let mesh = parse(SQUARE_AND_TRIANGLE).unwrap();
        let mut out = Vec::new();
        write_mesh(&mut out, "again", &mesh).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("o again"));
        assert!(text.contains("f 1 2 3 4"));

        let again = parse(&text).unwrap();
        assert_eq!(again.num_vertices(), 5);
        assert_eq!(again.overlay().unwrap().len(), 2);
    }

    #[test]
    fn test_write_triangles_without_overlay() {
        let mut mesh = parse(SQUARE_AND_TRIANGLE).unwrap();
        mesh.clear_overlay();
        let mut out = Vec::new();
        write_mesh(&mut out, "tris", &mesh).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with("f ")).count(), 3);
    }
}
