use anyhow::{Context, Result};

use crate::classify::{assign_bins, ckmeans};
use crate::config::AppConfig;
use crate::data;
use crate::grid::hex_grid;
use crate::join::{spatial_join, JoinStats};
use crate::types::{BinnedCell, PointRecord};
use crate::wurman::{wurman_dots, CircleFeature};

type Symbols = (Vec<CircleFeature>, Vec<CircleFeature>);

/// Full run: load points, aggregate, classify, write the output documents.
pub fn run(config: &AppConfig) -> Result<()> {
    let loaded = data::load_points(&config.input, &config.payload_key)?;
    println!(
        "Loaded {} points ({} malformed records skipped)",
        loaded.points.len(),
        loaded.skipped
    );

    let (cells, symbols, stats) = run_stages(config, &loaded.points)?;
    println!(
        "Joined {} points into {} occupied hexbins ({} points outside the grid)",
        stats.joined,
        cells.len(),
        stats.dropped
    );

    if config.hex {
        data::write_hexbins(&config.output, &cells)?;
        println!("Output hexagon file: {:?}", config.output);
    }

    if let Some((outer, inner)) = symbols {
        let outer_path = config.wurman_outer_path();
        let inner_path = config.wurman_inner_path();
        data::write_circles(&outer_path, &outer)?;
        data::write_circles(&inner_path, &inner)?;
        println!("Output Wurman files: {:?}, {:?}", outer_path, inner_path);
    }

    Ok(())
}

/// The pure part of the pipeline: grid → join → classify → annotate →
/// optional symbolization, no file I/O. Each stage returns new records, so
/// the stages can be tested in isolation and composed deterministically.
pub fn run_stages(
    config: &AppConfig,
    points: &[PointRecord],
) -> Result<(Vec<BinnedCell>, Option<Symbols>, JoinStats)> {
    let grid = hex_grid(&config.bbox, config.side, config.units)
        .context("hex grid generation failed")?;

    let (joined, stats) = spatial_join(grid, points);

    let counts: Vec<u32> = joined.iter().map(|cell| cell.count()).collect();
    let classes = ckmeans(&counts, config.classes).context("classification failed")?;
    let cells = assign_bins(joined, &classes);

    let symbols = if config.wurman {
        Some(
            wurman_dots(
                &cells,
                config.side,
                config.shrink,
                &config.breaks,
                &config.multipliers,
                config.units,
            )
            .context("symbolization failed")?,
        )
    } else {
        None
    };

    Ok((cells, symbols, stats))
}
