//! Procedural solid catalogue.
//!
//! [`SolidCache`] turns the polygon constructors in [`generators`] into
//! indexed buffers. Each solid is written as polygon OBJ text and parsed
//! back, so every cached buffer carries its polygon overlay and its
//! exchange text is available verbatim.
//!
//! ```
//! use tessera::solids::SolidCache;
//!
//! let cache = SolidCache::new();
//! let cube = cache.get("cube").unwrap();
//! assert_eq!(cube.num_vertices(), 8);
//! assert_eq!(cube.num_triangles(), 12);
//! assert_eq!(cube.overlay().map(|o| o.len()), Some(6));
//! ```

pub mod generators;

use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use rand::Rng;

use crate::error::{MeshError, Result};
use crate::io::obj;
use crate::mesh::{newell_normal, MeshBuffer, PolygonFace};

pub use generators::Polygon;

/// A solid constructor.
pub type Generator = fn() -> Result<Vec<Polygon>>;

/// The standard catalogue, in listing order.
const CATALOGUE: [(&str, Generator); 14] = [
    ("cube", generators::cube),
    ("tetrahedron", generators::tetrahedron),
    ("octahedron", generators::octahedron),
    ("triangular_prism", generators::triangular_prism),
    ("pentagonal_prism", generators::pentagonal_prism),
    ("hexagonal_prism", generators::hexagonal_prism),
    ("wedge", generators::wedge),
    ("square_pyramid", generators::square_pyramid),
    ("cone", generators::cone),
    ("cylinder", generators::cylinder),
    ("gear", generators::gear),
    ("star", generators::star),
    ("cross", generators::cross),
    ("washer", generators::washer),
];

#[derive(Debug)]
struct CachedSolid {
    name: &'static str,
    exchange: String,
    mesh: MeshBuffer,
}

/// Lazily built, read-only table of named solids.
///
/// The table is built once on first access (or by [`SolidCache::init`]) and
/// never changes afterwards. Reads hand out clones, so the cache can be
/// shared freely between threads.
#[derive(Debug)]
pub struct SolidCache {
    generators: Vec<(&'static str, Generator)>,
    table: OnceCell<Vec<CachedSolid>>,
}

impl Default for SolidCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SolidCache {
    /// Cache over the standard catalogue.
    pub fn new() -> Self {
        Self::with_generators(CATALOGUE.to_vec())
    }

    /// Cache over a custom catalogue.
    pub fn with_generators(generators: Vec<(&'static str, Generator)>) -> Self {
        Self {
            generators,
            table: OnceCell::new(),
        }
    }

    /// Build the table if needed. Returns the number of cached solids.
    pub fn init(&self) -> usize {
        self.table().len()
    }

    /// A copy of the named solid.
    pub fn get(&self, name: &str) -> Option<MeshBuffer> {
        self.find(name).map(|solid| solid.mesh.clone())
    }

    /// A uniformly chosen solid with its name.
    pub fn get_random<R: Rng>(&self, rng: &mut R) -> Option<(&str, MeshBuffer)> {
        let table = self.table();
        if table.is_empty() {
            return None;
        }
        let solid = &table[rng.random_range(0..table.len())];
        Some((solid.name, solid.mesh.clone()))
    }

    /// Names of the cached solids, in catalogue order.
    pub fn list(&self) -> Vec<&str> {
        self.table().iter().map(|solid| solid.name).collect()
    }

    /// The polygon OBJ text the named solid was parsed from.
    pub fn exchange_text(&self, name: &str) -> Option<&str> {
        self.find(name).map(|solid| solid.exchange.as_str())
    }

    fn find(&self, name: &str) -> Option<&CachedSolid> {
        self.table().iter().find(|solid| solid.name == name)
    }

    fn table(&self) -> &Vec<CachedSolid> {
        self.table.get_or_init(|| build_table(&self.generators))
    }
}

fn build_table(generators: &[(&'static str, Generator)]) -> Vec<CachedSolid> {
    let mut table = Vec::with_capacity(generators.len());
    for &(name, generate) in generators {
        match build_solid(name, generate) {
            Ok(solid) => {
                debug!(
                    "solid {}: {} vertices, {} triangles",
                    name,
                    solid.mesh.num_vertices(),
                    solid.mesh.num_triangles()
                );
                table.push(solid);
            }
            Err(e) => warn!("skipping solid: {}", e),
        }
    }

    if table.is_empty() {
        warn!("no solid could be generated; falling back to a cube");
        match build_solid("cube", generators::cube) {
            Ok(solid) => table.push(solid),
            Err(e) => warn!("fallback cube failed: {}", e),
        }
    }

    info!("solid cache ready with {} solids", table.len());
    table
}

fn build_solid(name: &'static str, generate: Generator) -> Result<CachedSolid> {
    let failed = |message: String| MeshError::GeneratorFailed {
        name: name.to_string(),
        message,
    };

    let polygons = generate().map_err(|e| failed(e.to_string()))?;
    if polygons.is_empty() {
        return Err(failed("no polygons".to_string()));
    }

    let mut faces = Vec::with_capacity(polygons.len());
    for (i, polygon) in polygons.into_iter().enumerate() {
        let normal = newell_normal(&polygon)
            .ok_or_else(|| failed(format!("polygon {} is degenerate", i)))?;
        faces.push(PolygonFace::new(polygon, normal, Vec::new()));
    }

    let exchange = obj::polygons_to_string(name, &faces)?;
    let mesh = obj::parse(&exchange).map_err(|e| failed(e.to_string()))?;
    if mesh.num_vertices() == 0 {
        return Err(failed("no vertices".to_string()));
    }
    Ok(CachedSolid {
        name,
        exchange,
        mesh,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn failing() -> Result<Vec<Polygon>> {
        Err(MeshError::invalid_param("sides", 0, "must be at least 3"))
    }

    fn empty() -> Result<Vec<Polygon>> {
        Ok(Vec::new())
    }

    fn collinear() -> Result<Vec<Polygon>> {
        Ok(vec![vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ]])
    }

    #[test]
    fn test_standard_catalogue() {
        let cache = SolidCache::new();
        assert_eq!(cache.init(), 14);
        assert_eq!(cache.init(), 14);
        let names = cache.list();
        assert_eq!(names[0], "cube");
        assert_eq!(names[13], "washer");

        for name in names {
            let mesh = cache.get(name).unwrap();
            let overlay = mesh.overlay().unwrap_or_else(|| panic!("{} has no overlay", name));
            assert!(mesh.num_non_degenerate() > 0, "{}", name);
            let covered: usize = overlay.iter().map(|f| f.source_triangles.len()).sum();
            assert_eq!(covered, mesh.num_triangles(), "{}", name);
        }
    }

    #[test]
    fn test_shared_vertices() {
        let cache = SolidCache::new();
        let prism = cache.get("hexagonal_prism").unwrap();
        assert_eq!(prism.num_vertices(), 12);
        assert_eq!(prism.num_triangles(), 6 * 2 + 2 * 4);
        let tetra = cache.get("tetrahedron").unwrap();
        assert_eq!(tetra.stats().unique_vertices, 4);
    }

    #[test]
    fn test_exchange_text() {
        let cache = SolidCache::new();
        let text = cache.exchange_text("cube").unwrap();
        assert!(text.contains("o cube"));
        assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 8);
        assert_eq!(text.lines().filter(|l| l.starts_with("f ")).count(), 6);
        assert!(cache.exchange_text("teapot").is_none());
        assert!(cache.get("teapot").is_none());
    }

    #[test]
    fn test_get_returns_independent_copies() {
        let cache = SolidCache::new();
        let mut a = cache.get("cube").unwrap();
        a.set_position(0, Point3::new(9.0, 9.0, 9.0));
        let b = cache.get("cube").unwrap();
        assert_ne!(a.positions()[0], b.positions()[0]);
        assert!(b.overlay().is_some());
    }

    #[test]
    fn test_random_is_deterministic_for_seed() {
        let cache = SolidCache::new();
        let (first, _) = cache.get_random(&mut StdRng::seed_from_u64(7)).unwrap();
        let (second, mesh) = cache.get_random(&mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(first, second);
        assert!(cache.list().contains(&first));
        assert!(mesh.num_triangles() > 0);
    }

    #[test]
    fn test_failures_are_skipped() {
        let cache = SolidCache::with_generators(vec![
            ("broken", failing as Generator),
            ("nothing", empty),
            ("flat", collinear),
            ("tetrahedron", generators::tetrahedron),
        ]);
        assert_eq!(cache.list(), vec!["tetrahedron"]);
    }

    #[test]
    fn test_empty_catalogue_falls_back_to_cube() {
        let cache = SolidCache::with_generators(vec![("broken", failing as Generator)]);
        assert_eq!(cache.list(), vec!["cube"]);
        assert_eq!(cache.get("cube").unwrap().num_triangles(), 12);

        let cache = SolidCache::with_generators(Vec::new());
        assert_eq!(cache.init(), 1);
    }

    #[test]
    fn test_cache_is_sync() {
        fn assert_sync<T: Sync + Send>() {}
        assert_sync::<SolidCache>();
    }
}
