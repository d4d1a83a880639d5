//! Tessera CLI - polygon-aware mesh editing tool.
//!
//! Usage: tessera <COMMAND> [OPTIONS] <INPUT> [OUTPUT]
//!
//! Run `tessera --help` for available commands. Set `RUST_LOG=debug` for
//! detailed logging.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use log::warn;
use rand::rngs::StdRng;
use rand::SeedableRng;

use tessera::algo::merge::MergeOptions;
use tessera::algo::painter::{collapse_edge, PainterOptions};
use tessera::algo::reconstruct::reconstruct_overlay;
use tessera::algo::simplify::{simplify, CollapseCost, SimplifyOptions};
use tessera::algo::Progress;
use tessera::io;
use tessera::mesh::MeshBuffer;
use tessera::nalgebra::Point3;
use tessera::solids::SolidCache;
use tessera::tolerance::Tolerances;

#[derive(Parser)]
#[command(name = "tessera")]
#[command(author, version, about = "Polygon-aware mesh editing CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh information
    Info {
        /// Input mesh file
        input: PathBuf,

        /// Reconstruct polygon faces and report them by type
        #[arg(long)]
        polygons: bool,
    },

    /// Merge coplanar triangles into polygon faces
    Reconstruct {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file (use .obj to keep the polygons)
        output: PathBuf,

        /// Point/plane coincidence distance
        #[arg(short, long, default_value = "0.001")]
        distance: f64,

        /// Minimum normal cosine for two faces to share a plane
        #[arg(short, long, default_value = "0.999")]
        normal: f64,

        /// Compare every face pair instead of bucketing by normal
        #[arg(long)]
        no_bucket: bool,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },

    /// Simplify a mesh without changing its triangle count
    Simplify {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Fraction of vertices to remove (0.0 to 1.0)
        #[arg(short, long, default_value = "0.5")]
        target: f64,

        /// Triangle floor
        #[arg(short, long, default_value = "12")]
        min_triangles: usize,

        /// Collapse ordering
        #[arg(short, long, value_enum, default_value = "edge-length")]
        cost: CostMethod,

        /// Do not rebuild the polygon overlay of the result
        #[arg(long)]
        no_overlay: bool,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },

    /// Collapse one edge onto a target point
    Collapse {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// First endpoint (buffer vertex index)
        v1: usize,

        /// Second endpoint (buffer vertex index)
        v2: usize,

        /// Target position (default: edge midpoint)
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
        target: Option<Vec<f64>>,

        /// Edit the triangle buffer only, without a polygon overlay
        #[arg(long)]
        basic: bool,
    },

    /// Procedural solid catalogue
    Solids {
        #[command(subcommand)]
        command: SolidsCommand,
    },
}

#[derive(Subcommand)]
enum SolidsCommand {
    /// List available solids
    List,

    /// Write a solid to a mesh file
    Export {
        /// Solid name (see `tessera solids list`)
        name: String,

        /// Output mesh file
        output: PathBuf,
    },

    /// Write a randomly chosen solid to a mesh file
    Random {
        /// Output mesh file
        output: PathBuf,

        /// Random seed
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum CostMethod {
    /// Shortest edges first
    EdgeLength,
    /// Quadric error first
    Quadric,
}

impl From<CostMethod> for CollapseCost {
    fn from(method: CostMethod) -> Self {
        match method {
            CostMethod::EdgeLength => CollapseCost::EdgeLength,
            CostMethod::Quadric => CollapseCost::Quadric,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { input, polygons } => {
            cmd_info(&input, polygons)?;
        }

        Commands::Reconstruct {
            input,
            output,
            distance,
            normal,
            no_bucket,
            sequential,
        } => {
            let tolerances = Tolerances::default()
                .with_distance(distance)
                .with_normal(normal);
            tolerances.validate()?;
            let options = MergeOptions::default()
                .with_tolerances(tolerances)
                .with_bucket_by_normal(!no_bucket)
                .with_parallel(!sequential);
            cmd_reconstruct(&input, &output, &options)?;
        }

        Commands::Simplify {
            input,
            output,
            target,
            min_triangles,
            cost,
            no_overlay,
            sequential,
        } => {
            let merge = MergeOptions::default().with_parallel(!sequential);
            let options = SimplifyOptions::with_target(target)
                .with_min_triangles(min_triangles)
                .with_cost(cost.into())
                .with_merge(merge)
                .with_refresh_overlay(!no_overlay)
                .with_progress(create_progress());
            cmd_simplify(&input, &output, &options)?;
        }

        Commands::Collapse {
            input,
            output,
            v1,
            v2,
            target,
            basic,
        } => {
            let target = target.map(|t| Point3::new(t[0], t[1], t[2]));
            cmd_collapse(&input, &output, v1, v2, target, basic)?;
        }

        Commands::Solids { command } => {
            cmd_solids(command)?;
        }
    }

    Ok(())
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0)); // Track highest percent seen (monotonic)

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }

        let raw_percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        // Only ever increase, so sub-task transitions do not bounce the bar
        let (percent, increased) = loop {
            let old_max = max_percent.load(Ordering::Relaxed);
            let new_max = old_max.max(raw_percent);
            if new_max == old_max {
                break (old_max, false);
            }
            match max_percent.compare_exchange_weak(
                old_max,
                new_max,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break (new_max, true),
                Err(_) => continue,
            }
        };

        if !increased && percent != 100 {
            return;
        }

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        eprint!("\r[{}{}] {:3}% {}", bar, space, percent, message);
        let _ = std::io::stderr().flush();

        if current >= total {
            eprintln!();
        }
    })
}

fn print_summary(label: &str, mesh: &MeshBuffer) {
    let stats = mesh.stats();
    let faces = match stats.polygon_faces {
        Some(n) => format!("{} polygon faces", n),
        None => "no polygon overlay".to_string(),
    };
    println!(
        "{}: {} vertices ({} unique), {} triangles ({} non-degenerate), {}",
        label,
        stats.vertices,
        stats.unique_vertices,
        stats.triangles,
        stats.non_degenerate_triangles,
        faces
    );
}

fn cmd_info(input: &Path, polygons: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh = io::load(input)?;

    println!("File: {}", input.display());
    print_summary("Mesh", &mesh);

    let total_area: f64 = (0..mesh.num_triangles())
        .map(|t| {
            let [a, b, c] = mesh.triangle_positions(t);
            (b - a).cross(&(c - a)).norm() / 2.0
        })
        .sum();
    println!("Surface area: {:.6}", total_area);

    if let Some((min, max)) = mesh.bounding_box() {
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
        let diag = max - min;
        println!("Dimensions: {:.3} x {:.3} x {:.3}", diag.x, diag.y, diag.z);
    }

    if polygons {
        if mesh.overlay().is_none() {
            reconstruct_overlay(&mut mesh, &MergeOptions::default())?;
        }
        let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
        for face in mesh.overlay().unwrap_or_default() {
            *by_type.entry(face.face_type.as_str()).or_default() += 1;
        }
        println!("\nPolygon faces:");
        for (kind, count) in by_type {
            println!("  {:<10} {}", kind, count);
        }
    }

    Ok(())
}

fn cmd_reconstruct(
    input: &Path,
    output: &Path,
    options: &MergeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh = io::load(input)?;
    print_summary("Loaded", &mesh);

    let mode = if options.parallel { "parallel" } else { "sequential" };
    println!("Merging coplanar triangles ({})...", mode);

    let start = Instant::now();
    let faces = reconstruct_overlay(&mut mesh, options)?;
    let elapsed = start.elapsed();

    println!("{} polygon faces in {:.2?}", faces, elapsed);
    io::save(&mesh, output)?;
    println!("Saved: {}", output.display());
    Ok(())
}

fn cmd_simplify(
    input: &Path,
    output: &Path,
    options: &SimplifyOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = io::load(input)?;
    print_summary("Loaded", &mesh);

    println!(
        "Simplifying (target {:.0}%, floor {} triangles)...",
        options.target_reduction * 100.0,
        options.min_triangles
    );

    let start = Instant::now();
    let result = simplify(&mesh, options)?;
    let elapsed = start.elapsed();

    println!(
        "Strategy: {} (requested {:.3}, effective {:.3}, achieved {:.3}) in {:.2?}",
        result.strategy,
        result.requested_reduction,
        result.effective_reduction,
        result.reduction_achieved,
        elapsed
    );
    print_summary("Result", &result.mesh);

    io::save(&result.mesh, output)?;
    println!("Saved: {}", output.display());
    Ok(())
}

fn cmd_collapse(
    input: &Path,
    output: &Path,
    v1: usize,
    v2: usize,
    target: Option<Point3<f64>>,
    basic: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh = io::load(input)?;
    print_summary("Loaded", &mesh);

    if basic {
        mesh.clear_overlay();
    } else if mesh.overlay().is_none() {
        if let Err(e) = reconstruct_overlay(&mut mesh, &MergeOptions::default()) {
            warn!("no polygon overlay, collapsing in basic mode: {}", e);
        }
    }

    let target = match target {
        Some(t) => t,
        None => match (mesh.position(v1), mesh.position(v2)) {
            (Some(a), Some(b)) => Point3::from((a.coords + b.coords) / 2.0),
            // Let collapse_edge report the bad index.
            _ => Point3::origin(),
        },
    };

    let result = collapse_edge(&mesh, v1, v2, target, &PainterOptions::default())?;
    println!("{}", result.message);
    print_summary("Result", &result.mesh);

    io::save(&result.mesh, output)?;
    println!("Saved: {}", output.display());
    Ok(())
}

fn cmd_solids(command: SolidsCommand) -> Result<(), Box<dyn std::error::Error>> {
    let cache = SolidCache::new();
    match command {
        SolidsCommand::List => {
            for name in cache.list() {
                if let Some(mesh) = cache.get(name) {
                    let stats = mesh.stats();
                    println!(
                        "{:<18} {:>4} vertices {:>4} triangles {:>3} faces",
                        name,
                        stats.vertices,
                        stats.triangles,
                        stats.polygon_faces.unwrap_or(0)
                    );
                }
            }
        }

        SolidsCommand::Export { name, output } => {
            let mesh = cache
                .get(&name)
                .ok_or_else(|| format!("unknown solid {:?}; try `tessera solids list`", name))?;
            io::save(&mesh, &output)?;
            println!("Saved {}: {}", name, output.display());
        }

        SolidsCommand::Random { output, seed } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            let (name, mesh) = cache.get_random(&mut rng).ok_or("solid catalogue is empty")?;
            io::save(&mesh, &output)?;
            println!("Saved {}: {}", name, output.display());
        }
    }
    Ok(())
}
