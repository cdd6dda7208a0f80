//! Render a short orbit around the scene into `orbit-NN.png` files.
//!
//! Run with `RUST_LOG=info cargo run -p snapframe --example orbit`.

use snapframe::prelude::*;

const FRAMES: u32 = 8;
const RADIUS: f32 = 3.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let service = RenderService::start(RenderConfig::default(), SceneAssets::builtin())?;

    // Circle the cube at (0, 0, -3), always facing its center.
    for i in 0..FRAMES {
        let angle = i as f32 / FRAMES as f32 * std::f32::consts::TAU;
        let request = RenderRequest {
            x: RADIUS * angle.sin(),
            z: -3.0 + RADIUS * angle.cos(),
            // Turning by -angle about Y points the camera back at the center.
            ry: -angle,
            width: 480,
            height: 360,
            ..Default::default()
        };
        let png = service.render(request)?;
        let path = format!("orbit-{i:02}.png");
        std::fs::write(&path, png)?;
        println!("wrote {path}");
    }

    println!("{}", serde_json::to_string_pretty(&service.stats())?);
    Ok(())
}
