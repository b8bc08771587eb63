//! Command-line tools for the halo image browser.
//!
//! - `make-page`: turn a run configuration (YAML or JSON) into the page's
//!   `params.json` plus the `index.html` template
//! - `resolve`: print the image path a selection maps to
//! - `check`: report images the page would ask for but cannot show

mod assets;
mod config;
mod controls;
mod page;
mod render;
mod resolver;
mod selection;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use config::Configuration;
use controls::Group;
use page::{InputEvent, PageController, Profile};

#[derive(Parser, Debug)]
#[command(name = "halo-viewer")]
#[command(author, version, about = "Browse pre-rendered halo images by branch, particle subset and component")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write params.json and the index.html page template for a run configuration.
    ///
    /// index.html keeps its {{particles}} {{branches}} {{ptypes}} {{index}} {{image}}
    /// slots; serve it with `halo-viewer-web --config <out_dir>/params.json
    /// --template <out_dir>/index.html`.
    MakePage {
        /// YAML or JSON run configuration
        config: PathBuf,
        /// Output directory (defaults to the configuration's out_dir)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Print the image path for a selection; prints nothing if it is incomplete
    Resolve {
        /// Configuration for the dynamic layout; the hardcoded layout is used without one
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 0)]
        index: u32,
        /// fof, central or satellite
        #[arg(long)]
        particles: Option<String>,
        #[arg(long)]
        branch: Option<String>,
        #[arg(long)]
        component: Option<String>,
    },

    /// Check that every image reachable from the controls exists and decodes
    Check {
        config: PathBuf,
        /// Directory the image paths are relative to
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Use the hardcoded images/..._0123 layout
        #[arg(long)]
        fixed_layout: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::MakePage { config, out_dir } => make_page(&config, out_dir),
        Command::Resolve {
            config,
            index,
            particles,
            branch,
            component,
        } => {
            let profile = match config {
                Some(path) => Profile::Dynamic(Arc::new(read_config(&path)?)),
                None => Profile::Static,
            };
            let src = resolve(profile, index, particles, branch, component)?;
            if !src.is_empty() {
                println!("{src}");
            }
            Ok(())
        }
        Command::Check {
            config,
            root,
            fixed_layout,
        } => check(&config, &root, fixed_layout),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_config(path: &Path) -> Result<Configuration> {
    Configuration::read(path).with_context(|| format!("load configuration {}", path.display()))
}

fn make_page(config_path: &Path, out_dir: Option<PathBuf>) -> Result<()> {
    let config = read_config(config_path)?;
    let Some(dest) = out_dir.or_else(|| config.out_dir()) else {
        bail!("no --out-dir given and the configuration has no out_dir");
    };
    fs::create_dir_all(&dest).with_context(|| format!("create {}", dest.display()))?;

    let html_path = dest.join("index.html");
    fs::write(&html_path, render::INDEX_HTML)
        .with_context(|| format!("write {}", html_path.display()))?;

    let params_path = dest.join("params.json");
    fs::write(&params_path, config.to_json_pretty()?)
        .with_context(|| format!("write {}", params_path.display()))?;

    info!(
        out_dir = %dest.display(),
        template = %html_path.display(),
        snap_nr = config.snap_nr,
        nr_halos = config.nr_halos,
        "page written"
    );
    Ok(())
}

/// Replays the given choices on a fresh page. Unset choices leave the page defaults.
fn resolve(
    profile: Profile,
    index: u32,
    particles: Option<String>,
    branch: Option<String>,
    component: Option<String>,
) -> Result<String> {
    let mut page = PageController::new(profile);
    page.initialize()?;
    let choices = [
        (Group::Particles, particles),
        (Group::Branch, branch),
        (Group::Component, component),
    ];
    for (group, key) in choices {
        let event = match key {
            Some(key) if key.is_empty() => InputEvent::Clear(group),
            Some(key) => InputEvent::Check { group, key },
            None => continue,
        };
        page.handle(event)?;
    }
    page.handle(InputEvent::HaloIndex(index.to_string()))?;
    Ok(page.image_source().to_string())
}

fn check(config_path: &Path, root: &Path, fixed_layout: bool) -> Result<()> {
    let config = read_config(config_path)?;
    let layout = if fixed_layout {
        resolver::PathLayout::fixed()
    } else {
        resolver::PathLayout::for_snapshot(config.snap_nr)
    };
    let report = assets::check_assets(root, &config, &layout);
    for path in &report.missing {
        println!("missing     {}", path.display());
    }
    for (path, err) in &report.unreadable {
        println!("unreadable  {} ({err})", path.display());
    }
    println!(
        "{} images checked, {} missing, {} unreadable",
        report.checked,
        report.missing.len(),
        report.unreadable.len()
    );
    if !report.is_complete() {
        warn!(root = %root.display(), "image set is incomplete");
        bail!("image set under {} is incomplete", root.display());
    }
    Ok(())
}
