//! Headless golden path: step the demo world, display frames, export
//! a plain and a magnified image.
//!
//! ```text
//! snapshot [frames] [magnification]
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use spindle::{DemoSimulation, Player, PpmEncoder};
use spindle_rendering::interop::SimGate;
use spindle_rendering::props::PlayProps;
use spindle_rendering::surfaces::HeadlessSurface;
use spindle_rendering::SoftwareBackend;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut args = std::env::args().skip(1);
    let frames: u32 = args.next().and_then(|a| a.parse().ok()).unwrap_or(25);
    let mag: u32 = args.next().and_then(|a| a.parse().ok()).unwrap_or(3);

    let mut world = DemoSimulation::new(2024, 24, 8);
    world.set_display_string("style = 2\nauto_scale = 5\ntrack = 1");
    let gate = Arc::new(SimGate::new(world));

    let play = PlayProps {
        image_format: "ppm".to_owned(),
        ..PlayProps::default()
    };
    let mut player = Player::new(
        Arc::clone(&gate),
        SoftwareBackend::new(800, 600),
        PpmEncoder,
        play,
    );
    player
        .surfaces_mut()
        .push(Box::new(HeadlessSurface::new(800, 600, true)));
    player.set_style(2);

    let stepper = spindle::player::spawn_simulation(
        Arc::clone(&gate),
        frames,
        4,
        0.01,
        DemoSimulation::step,
    );

    let mut drawn = 0_u32;
    while drawn < frames {
        if player.display() {
            drawn += 1;
        }
    }
    if let Err(err) = stepper.join() {
        warn!(?err, "simulation thread panicked");
    }

    match player.save_view() {
        Ok(saved) => info!(name = %saved.name, "wrote frame"),
        Err(err) => warn!(%err, "plain export failed"),
    }
    match player.save_view_magnified(mag) {
        Ok(saved) => {
            info!(name = %saved.name, saved.width, saved.height, "wrote magnified frame");
        }
        Err(err) => warn!(%err, "magnified export failed"),
    }
    if player.take_redraw_request() {
        info!("redraw requested after export");
    }
}
