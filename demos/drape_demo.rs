//! Decomposes two draped lines, builds the batch and recolors one line.
//!
//! ```text
//! cargo run --example drape_demo
//! RUST_LOG=drapewall=debug cargo run --example drape_demo
//! ```

use drapewall::attribute::{COLOR, SHOW};
use drapewall::math::Cartographic;
use drapewall::{DecomposeOptions, DrapeError, DrapedWallPrimitive, LogicalLine, TerrainHeights};

fn main() -> Result<(), DrapeError> {
    // Default: WARN for everything, INFO for drapewall.
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("drapewall=info".parse().unwrap_or_default());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let trail = LogicalLine::new(
        "trail",
        vec![
            Cartographic::from_degrees(-122.40, 37.80, 0.0),
            Cartographic::from_degrees(-122.39, 37.81, 0.0),
            Cartographic::from_degrees(-122.37, 37.81, 0.0),
        ],
        4.0,
    )
    .with_color([255, 255, 0, 255])
    .with_show(true);
    let border = LogicalLine::new(
        "border",
        vec![
            Cartographic::from_degrees(-120.0, 42.0, 0.0),
            Cartographic::from_degrees(-114.0, 42.0, 0.0),
        ],
        10.0,
    )
    .with_color([255, 255, 255, 255])
    .with_show(true);

    let options = DecomposeOptions {
        release_geometry: true,
        ..DecomposeOptions::default()
    };
    let mut primitive = DrapedWallPrimitive::new(options);
    let _ = primitive.add_line(trail);
    let _ = primitive.add_line(border);

    let skipped = primitive.decompose(TerrainHeights::new(-100.0, 4_500.0)?)?;
    for (id, err) in &skipped {
        tracing::warn!(%id, "line skipped: {err}");
    }
    primitive.build_batch()?;

    for (id, range) in primitive.range_index().iter() {
        tracing::info!(%id, first = range.first(), last = range.last(), "segment range");
    }

    if let Some(border) = primitive.attributes_for("border")? {
        border.set_components(COLOR, &[255.0, 0.0, 0.0, 255.0])?;
        tracing::info!(color = ?border.get(COLOR)?, "recolored border");
    }
    if let Some(trail) = primitive.attributes_for("trail")? {
        trail.set(SHOW, 0.0)?;
        tracing::info!(show = ?trail.get(SHOW)?, "hid trail");
    }
    Ok(())
}
