//! pdx - inspect and validate PDX asset files (.mesh / .anim).

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use pdx_asset::codec::read_file;
use pdx_asset::schema::{names, AnimFile, MeshFile};
use pdx_asset::skeleton::validate_order;
use pdx_asset::skin::SkinPacker;
use pdx_asset::{anim, AttributeValue, PdxConfig, TaggedNode};

#[derive(Parser)]
#[command(name = "pdx")]
#[command(about = "Inspect and validate PDX asset files")]
#[command(version)]
struct Cli {
    /// Debug output (-vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Codec config (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version and content summary
    #[command(alias = "i")]
    Info { file: PathBuf },

    /// Show the node hierarchy with attribute types and counts
    #[command(alias = "t")]
    Tree { file: PathBuf },

    /// Print the full tree
    Dump {
        file: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode and validate against the asset schema
    Check { file: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => PdxConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => PdxConfig::default(),
    };

    match cli.command {
        Commands::Info { file } => cmd_info(&file),
        Commands::Tree { file } => cmd_tree(&file),
        Commands::Dump { file, json } => cmd_dump(&file, json),
        Commands::Check { file } => cmd_check(&file, &config),
    }
}

fn open(path: &Path) -> Result<TaggedNode> {
    tracing::info!("Opening {}", path.display());
    read_file(path).with_context(|| format!("failed to read {}", path.display()))
}

fn is_anim(root: &TaggedNode) -> bool {
    root.child(names::INFO).is_some()
}

fn cmd_info(path: &Path) -> Result<()> {
    let root = open(path)?;
    let version = root.ints(names::VERSION)?.unwrap_or_default();

    println!("File: {}", path.display());
    println!("Version: {:?}", version);
    println!();

    if is_anim(&root) {
        let anim = AnimFile::from_tree(&root)?;
        let animated = anim.info.bones.iter().filter(|b| !b.channels.is_empty()).count();
        println!("Animation:");
        println!("  FPS:     {}", anim.info.fps);
        println!("  Frames:  {}", anim.info.frames);
        println!("  Bones:   {} ({} animated)", anim.info.bones.len(), animated);
        println!(
            "  Samples: t {}, q {}, s {}",
            anim.samples.translations.len() / 3,
            anim.samples.rotations.len() / 4,
            anim.samples.scales.len()
        );
        return Ok(());
    }

    let mesh = MeshFile::from_tree(&root)?;
    let verts: usize = mesh.shapes.iter().flat_map(|s| &s.meshes).map(|m| m.vertex_count()).sum();
    let tris: usize = mesh.shapes.iter().flat_map(|s| &s.meshes).map(|m| m.triangles.len() / 3).sum();
    println!("Mesh:");
    println!("  Shapes:   {}", mesh.shapes.len());
    println!("  Meshes:   {} ({} vertices, {} triangles)", mesh.mesh_count(), verts, tris);
    println!("  Bones:    {}", mesh.bone_count());
    println!("  Locators: {}", mesh.locators.len());
    Ok(())
}

fn cmd_tree(path: &Path) -> Result<()> {
    let root = open(path)?;
    println!("File: {}", path.display());
    println!();
    print_tree(&root, 0, false);
    println!();
    println!("Total nodes: {}", root.count_nodes());
    Ok(())
}

fn cmd_dump(path: &Path, json: bool) -> Result<()> {
    let root = open(path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&root)?);
    } else {
        print_tree(&root, 0, true);
    }
    Ok(())
}

fn print_tree(node: &TaggedNode, depth: usize, values: bool) {
    let indent = "  ".repeat(depth);
    println!("{}{}", indent, node.name);
    for (name, value) in node.attributes() {
        if values {
            println!("{}  .{} = {}", indent, name, format_value(value));
        } else {
            println!("{}  .{}: {}[{}]", indent, name, value.attr_type(), value.len());
        }
    }
    for child in node.children() {
        print_tree(child, depth + 1, values);
    }
}

fn format_value(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Int(v) => format!("{:?}", v),
        AttributeValue::Float(v) => format!("{:?}", v),
        AttributeValue::String(v) => format!("{:?}", v),
    }
}

fn cmd_check(path: &Path, config: &PdxConfig) -> Result<()> {
    let root = open(path)?;

    if is_anim(&root) {
        let file = AnimFile::from_tree(&root)?;
        let keys = anim::unpack(&file.info.bones, &file.samples, file.info.frames as usize)?;
        tracing::debug!("unpacked {} bone tracks", keys.len());
        println!("{}: OK (animation, {} bones, {} frames)", path.display(), keys.len(), file.info.frames);
        return Ok(());
    }

    let file = MeshFile::from_tree(&root)?;
    let packer = SkinPacker::new(config.max_influences);
    for shape in &file.shapes {
        validate_order(&shape.skeleton).with_context(|| format!("shape {}", shape.name))?;
        for (i, mesh) in shape.meshes.iter().enumerate() {
            let Some(skin) = &mesh.skin else { continue };
            let influences = packer.unpack(skin).with_context(|| format!("shape {} mesh {}", shape.name, i))?;
            if influences.len() != mesh.vertex_count() {
                bail!(
                    "shape {} mesh {}: {} skinned vertices for {} vertices",
                    shape.name,
                    i,
                    influences.len(),
                    mesh.vertex_count()
                );
            }
            let bones = shape.skeleton.len();
            if let Some(&(bone, _)) = influences.iter().flatten().find(|(b, _)| *b as usize >= bones) {
                bail!("shape {} mesh {}: bone index {} outside skeleton of {}", shape.name, i, bone, bones);
            }
        }
    }
    println!(
        "{}: OK ({} shapes, {} meshes, {} bones, {} locators)",
        path.display(),
        file.shapes.len(),
        file.mesh_count(),
        file.bone_count(),
        file.locators.len()
    );
    Ok(())
}
