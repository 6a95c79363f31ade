use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stilt::content::ContentTree;
use stilt::mirror::DirNode;
use stilt::render::Site;
use stilt::templates::TemplateDir;
use stilt::{config, config::CONFIG_DIR};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stilt")]
#[command(about = "Incremental static site generator")]
#[command(long_about = "\
Incremental static site generator

Mirrors a content tree of HTML pages (with optional YAML sidecars) into
a build tree of rendered artifacts. Sections, categories, and listing
templates come from YAML files under config/; templates are minijinja
files under templates/. Only artifacts whose inputs changed are
re-rendered; stale destination directories are pruned.

Project structure:

  site/
  ├── config/
  │   ├── _site.yaml             # site settings + variables
  │   └── blog.yaml              # one file per section
  ├── templates/
  │   ├── layout.html            # shared outer layout
  │   └── blog/                  # per-section templates
  ├── content/
  │   └── blog/
  │       ├── post.html          # a page
  │       └── post.yaml          # its sidecar metadata
  └── build/                     # generated

Set RUST_LOG (e.g. RUST_LOG=stilt=debug) for diagnostics.")]
#[command(version)]
struct Cli {
    /// Project directory containing config/, templates/ and content/
    #[arg(long, default_value = ".", global = true)]
    source: PathBuf,

    /// Output directory for rendered artifacts
    #[arg(long, default_value = "build", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render the site into the output directory
    Build {
        /// Rebuild every artifact even if up to date
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Build { force } => build(&cli, force),
    }
}

fn build(cli: &Cli, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "==> Loading configuration from {}",
        cli.source.join(CONFIG_DIR).display()
    );
    let conf = config::load(&cli.source)?;

    println!("==> Loading templates");
    let tmpls = TemplateDir::load(&cli.source.join("templates"))?;

    println!("==> Scanning content");
    let content = ContentTree::new(&cli.source.join("content"))?;

    std::fs::create_dir_all(&cli.output)?;
    let mut dst = DirNode::build(&cli.output)?;

    println!("==> Rendering → {}", cli.output.display());
    let site = Site::new(&conf, &tmpls)?;
    site.render(&content, &mut dst, force)?;

    println!("==> Build complete: {}", cli.output.display());
    Ok(())
}
