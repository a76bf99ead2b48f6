use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use formats::{fixtures, AssetFormat, AssetRequest, AssetSpec, ImporterParser, RawStructureProbe};
use loader::{AssetLoadFlow, LoadStatus, Page, PageContent, ProbeConfig, SourceConfig, BUCHAREST};
use runtime::DiagnosticLog;
use scene::Placement;
use streaming::Locator;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod serve;

#[derive(Parser, Debug)]
#[command(author, version, about = "Load, place and diagnose 3D map assets")]
struct Args {
    /// TOML config; built-in pages are used when absent
    #[arg(long, env = "PROBE_CONFIG")]
    config: Option<PathBuf>,

    /// Read assets from this directory
    #[arg(long, env = "PROBE_ASSET_ROOT", conflicts_with = "base_url")]
    asset_root: Option<PathBuf>,

    /// Fetch assets over HTTP relative to this URL
    #[arg(long, env = "PROBE_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List page variants and their routes
    Variants,
    /// Mount a page headlessly and run its model load to completion
    Load {
        /// Variant name or route
        #[arg(long, default_value = "debug")]
        variant: String,
        /// Frames to render once the load has settled
        #[arg(long, default_value_t = 3)]
        frames: u32,
        #[arg(long)]
        json: bool,
    },
    /// Run the structural probe on one asset
    Inspect {
        locator: String,
        #[arg(long, value_enum)]
        format: FormatArg,
        /// Material library for OBJ assets
        #[arg(long)]
        mtl: Option<String>,
    },
    /// Serve the asset directory over HTTP
    Serve {
        #[arg(long, env = "PROBE_ADDR", default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
    },
    /// Write small sample assets matching the built-in pages
    Sample {
        #[arg(long, default_value = "public")]
        out: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Glb,
    Obj,
}

impl From<FormatArg> for AssetFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Glb => AssetFormat::Glb,
            FormatArg::Obj => AssetFormat::Obj,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ProbeConfig::load(path)?,
        None => ProbeConfig::default(),
    };
    if let Some(root) = &args.asset_root {
        config.source = SourceConfig::Directory { root: root.clone() };
    }
    if let Some(url) = &args.base_url {
        config.source = SourceConfig::Http {
            base_url: Some(url.clone()),
        };
    }

    match args.command {
        Command::Variants => {
            for v in &config.variants {
                let kind = match &v.page {
                    PageContent::Basemap => "basemap".to_string(),
                    PageContent::Primitives { primitives } => {
                        format!("{} primitives", primitives.len())
                    }
                    PageContent::Model {
                        asset, placement, ..
                    } => format!(
                        "{} {} ({:?})",
                        asset.format(),
                        asset.locator(),
                        placement.policy
                    ),
                };
                println!("{:<12} {:<12} {kind}", v.name, v.route);
            }
            Ok(())
        }
        Command::Load {
            variant,
            frames,
            json,
        } => load(&config, &variant, frames, json).await,
        Command::Inspect {
            locator,
            format,
            mtl,
        } => inspect(&config, &locator, format.into(), mtl.as_deref()).await,
        Command::Serve { addr } => {
            let root = match &config.source {
                SourceConfig::Directory { root } => root.clone(),
                SourceConfig::Http { .. } => bail!("serve needs a directory source"),
            };
            serve::run(addr, root).await
        }
        Command::Sample { out } => write_samples(&out),
    }
}

fn build_flow(config: &ProbeConfig) -> anyhow::Result<Arc<AssetLoadFlow>> {
    let fetcher = config.source.build()?;
    Ok(Arc::new(AssetLoadFlow::new(
        Arc::new(fetcher),
        Arc::new(ImporterParser),
        Arc::new(RawStructureProbe),
        config.loader,
    )))
}

async fn load(config: &ProbeConfig, key: &str, frames: u32, json: bool) -> anyhow::Result<()> {
    let variant = config
        .variant(key)
        .with_context(|| format!("no page variant `{key}`"))?;
    let flow = build_flow(config)?;

    let mut page = Page::mount(variant, &config.map, flow)?;
    page.style_ready();
    let state = page.settled().await;
    for _ in 0..frames {
        page.render_frame();
    }
    info!(
        frames = page.map().frames_rendered(),
        objects = page.overlay().len(),
        "page rendered"
    );
    let report = page.unmount();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for entry in &report.log {
            println!("{entry}");
        }
    }

    match state.map(|s| s.status) {
        None | Some(LoadStatus::Loaded) => Ok(()),
        Some(LoadStatus::Pending) => bail!("load did not complete"),
        Some(LoadStatus::Failed { reason }) => bail!("load failed: {reason}"),
    }
}

async fn inspect(
    config: &ProbeConfig,
    locator: &str,
    format: AssetFormat,
    mtl: Option<&str>,
) -> anyhow::Result<()> {
    let url = Locator::parse(locator)?;
    let asset = match format {
        AssetFormat::Glb => AssetSpec::glb(url),
        AssetFormat::Obj => AssetSpec::obj(url, mtl.map(Locator::parse).transpose()?),
    };
    let request = AssetRequest::new(asset, Placement::new(BUCHAREST));
    let flow = build_flow(config)?;

    let log = DiagnosticLog::new();
    let verdict = flow.run_diagnostic(&request, &log).await;
    for line in log.lines() {
        println!("{line}");
    }
    println!("{}", serde_json::to_string_pretty(&verdict?)?);
    Ok(())
}

fn write_samples(out: &Path) -> anyhow::Result<()> {
    let buildings = out.join("models").join("buildings");
    std::fs::create_dir_all(&buildings)
        .with_context(|| format!("creating {}", buildings.display()))?;

    let files = [
        (out.join("cantina.glb"), fixtures::triangle_glb(None)),
        (
            buildings.join("cantinaUTCB.obj"),
            fixtures::TRIANGLE_OBJ
                .replace("triangle.mtl", "cantinaUTCB.mtl")
                .into_bytes(),
        ),
        (
            buildings.join("cantinaUTCB.mtl"),
            fixtures::TRIANGLE_MTL.as_bytes().to_vec(),
        ),
    ];
    for (path, bytes) in files {
        std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
        println!("wrote {}", path.display());
    }
    Ok(())
}
