//! Mesh file I/O.
//!
//! Thin adapters between files and [`MeshBuffer`].
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | Notes |
//! |--------|-----------|------|------|-------|
//! | Wavefront OBJ | `.obj` | ✓ | ✓ | Polygon faces kept as overlay |
//! | STL | `.stl` | ✓ | ✓ | Binary and ASCII; one vertex per corner |
//!
//! # Usage
//!
//! ```no_run
//! use tessera::io::{load, save};
//!
//! // Load with automatic format detection
//! let mesh = load("model.stl").unwrap();
//!
//! // Save with automatic format detection
//! save(&mesh, "output.obj").unwrap();
//! ```

pub mod obj;
pub mod stl;

use std::path::Path;

use crate::error::{MeshError, Result};
use crate::mesh::MeshBuffer;

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Wavefront OBJ format.
    Obj,
    /// STL (stereolithography) format.
    Stl,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "obj" => Some(Format::Obj),
            "stl" => Some(Format::Stl),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }

    /// Upper-case tag, as used in service headers.
    pub fn tag(self) -> &'static str {
        match self {
            Format::Obj => "OBJ",
            Format::Stl => "STL",
        }
    }
}

fn detect(path: &Path) -> Result<Format> {
    Format::from_path(path).ok_or_else(|| MeshError::UnsupportedFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    })
}

/// Load a mesh from a file with automatic format detection.
///
/// The format is determined by the file extension.
pub fn load<P: AsRef<Path>>(path: P) -> Result<MeshBuffer> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Obj => obj::load(path),
        Format::Stl => stl::load(path),
    }
}

/// Save a mesh to a file with automatic format detection.
///
/// The format is determined by the file extension.
pub fn save<P: AsRef<Path>>(mesh: &MeshBuffer, path: P) -> Result<()> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Obj => obj::save(mesh, path),
        Format::Stl => stl::save(mesh, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::from_path("a/b/model.OBJ"), Some(Format::Obj));
        assert_eq!(Format::from_path("model.stl"), Some(Format::Stl));
        assert_eq!(Format::from_path("model.ply"), None);
        assert_eq!(Format::Stl.tag(), "STL");
    }

    #[test]
    fn test_unsupported_extension() {
        match load("mesh.gltf") {
            Err(MeshError::UnsupportedFormat { extension }) => assert_eq!(extension, "gltf"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            save(&MeshBuffer::new(), "mesh"),
            Err(MeshError::UnsupportedFormat { .. })
        ));
    }
}
