//! snapframe — render one frame of the scene to a PNG file.
//!
//! Rotations are in radians. Set `RUST_LOG=debug` for per-request logging.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use snapframe::prelude::*;

/// Render one frame of the scene to a PNG file.
#[derive(Parser, Debug)]
#[command(name = "snapframe", version)]
struct Args {
    /// Renderer configuration as JSON. Missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Image to put on the cube instead of the built-in checker.
    #[arg(long)]
    texture: Option<PathBuf>,

    /// Where to write the PNG.
    #[arg(long, default_value = "frame.png")]
    out: PathBuf,

    /// Camera position.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    x: f32,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    y: f32,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    z: f32,

    /// Camera rotation about its own axes, in radians.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    rx: f32,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    ry: f32,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    rz: f32,

    /// Output width in pixels.
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Output height in pixels.
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Print service counters as JSON after rendering.
    #[arg(long)]
    stats: bool,
}

impl Args {
    fn request(&self) -> RenderRequest {
        RenderRequest {
            x: self.x,
            y: self.y,
            z: self.z,
            rx: self.rx,
            ry: self.ry,
            rz: self.rz,
            width: self.width,
            height: self.height,
        }
    }
}

fn load_texture(path: &Path) -> Result<DecodedImage> {
    let rgba = image::open(path)
        .with_context(|| format!("failed to decode texture {}", path.display()))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage {
        pixels: rgba.into_raw(),
        width,
        height,
        channels: 4,
    })
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => RenderConfig::from_json_file(path)?,
        None => RenderConfig::default(),
    };

    let mut assets = SceneAssets::builtin();
    if let Some(path) = &args.texture {
        assets.cube_texture = load_texture(path)?;
        log::info!(
            "using texture {} ({}x{})",
            path.display(),
            assets.cube_texture.width,
            assets.cube_texture.height
        );
    }

    let service = RenderService::start(config, assets).context("failed to start renderer")?;
    let png = service
        .render(args.request())
        .context("failed to render frame")?;
    std::fs::write(&args.out, &png)
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    log::info!("wrote {} ({} bytes)", args.out.display(), png.len());

    if args.stats {
        println!("{}", serde_json::to_string_pretty(&service.stats())?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("snapframe").chain(args.iter().copied()))
    }

    #[test]
    fn arguments_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_without_arguments() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.request(), RenderRequest::default());
        assert_eq!(args.out, PathBuf::from("frame.png"));
        assert!(args.config.is_none());
        assert!(!args.stats);
    }

    #[test]
    fn pose_and_size_are_parsed() {
        let args = parse(&["--z", "0.5", "--ry", "-1.2", "--width", "320", "--stats"]).unwrap();
        let request = args.request();
        assert_eq!(request.z, 0.5);
        assert_eq!(request.ry, -1.2);
        assert_eq!(request.width, 320);
        assert_eq!(request.height, 600);
        assert!(args.stats);
    }

    #[test]
    fn bad_number_is_reported() {
        let err = parse(&["--width", "wide"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(err.to_string().contains("--width"));
    }

    #[test]
    fn missing_value_is_reported() {
        assert!(parse(&["--out"]).is_err());
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let err = parse(&["--fov", "90"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn help_is_generated() {
        let err = parse(&["--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
