//! STL (stereolithography) format support.
//!
//! STL stores every triangle corner separately, and the buffer keeps it that
//! way: a loaded mesh has three vertex entries per triangle. Logical vertex
//! identity is recovered by welding where an algorithm needs it. Both binary
//! and ASCII files load; saving writes binary.

use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::Path;

use nalgebra::Point3;

use crate::error::{MeshError, Result};
use crate::mesh::MeshBuffer;

/// Read STL data into a non-shared buffer.
pub fn read<R: Read + Seek>(reader: &mut R) -> std::io::Result<MeshBuffer> {
    let stl = stl_io::read_stl(reader)?;

    let mut positions: Vec<Point3<f64>> = Vec::with_capacity(stl.faces.len() * 3);
    let mut triangles: Vec<[usize; 3]> = Vec::with_capacity(stl.faces.len());
    for tri in &stl.faces {
        let start = positions.len();
        for &i in &tri.vertices {
            let v = &stl.vertices[i];
            positions.push(Point3::new(v[0] as f64, v[1] as f64, v[2] as f64));
        }
        triangles.push([start, start + 1, start + 2]);
    }

    MeshBuffer::from_parts(positions, triangles)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
}

/// Write a buffer as binary STL, using its flat normals.
pub fn write<W: Write>(writer: &mut W, mesh: &MeshBuffer) -> std::io::Result<()> {
    let normals = mesh.flat_normals();
    let triangles: Vec<stl_io::Triangle> = (0..mesh.num_triangles())
        .map(|t| {
            let [p0, p1, p2] = mesh.triangle_positions(t);
            let n = normals[t];
            stl_io::Triangle {
                normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: [
                    stl_io::Vertex::new([p0.x as f32, p0.y as f32, p0.z as f32]),
                    stl_io::Vertex::new([p1.x as f32, p1.y as f32, p1.z as f32]),
                    stl_io::Vertex::new([p2.x as f32, p2.y as f32, p2.z as f32]),
                ],
            }
        })
        .collect();
    stl_io::write_stl(writer, triangles.iter())
}

/// Load a mesh from an STL file.
///
/// # Example
///
/// ```no_run
/// use tessera::io::stl;
///
/// let mesh = stl::load("model.stl").unwrap();
/// assert_eq!(mesh.num_vertices(), 3 * mesh.num_triangles());
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<MeshBuffer> {
    let path = path.as_ref();
    let mut file = File::open(path)?;

    let mesh = read(&mut file).map_err(|e| MeshError::LoadError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if mesh.num_non_degenerate() == 0 {
        return Err(MeshError::LoadError {
            path: path.to_path_buf(),
            message: "STL file contains no valid triangles".to_string(),
        });
    }
    Ok(mesh)
}

/// Save a mesh to a binary STL file.
pub fn save<P: AsRef<Path>>(mesh: &MeshBuffer, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    write(&mut writer, mesh).map_err(|e| MeshError::SaveError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    writer.flush()?;
    Ok(())
}
