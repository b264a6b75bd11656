use std::path::PathBuf;

use anyhow::Result;
use winit::dpi::LogicalSize;

use quadview_engine::assets::AssetBundle;
use quadview_engine::device::GpuInit;
use quadview_engine::logging::{init_logging, LoggingConfig};
use quadview_engine::window::{Runtime, RuntimeConfig};
use quadview_engine::RendererConfig;

/// Directory searched for images when `QUADVIEW_ASSETS` is unset.
const DEFAULT_ASSET_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets");

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let asset_dir = std::env::var_os("QUADVIEW_ASSETS")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSET_DIR));

    let mut renderer = RendererConfig {
        assets: AssetBundle::from_dir(&asset_dir),
        ..RendererConfig::default()
    };
    if let Some(name) = std::env::args().nth(1) {
        renderer.asset_name = name;
    }

    log::info!(
        "showing {} from {}",
        renderer.asset_name,
        asset_dir.display()
    );

    let config = RuntimeConfig {
        title: format!("quadview - {}", renderer.asset_name),
        initial_size: LogicalSize::new(640.0, 640.0),
    };

    Runtime::run(config, GpuInit::default(), renderer)
}
