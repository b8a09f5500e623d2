use anyhow::{Context, Result};
use epi_common::{DiseaseParameters, OutputConfig, Snapshot};
use log::{info, warn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Snapshot encodings selectable with `output.format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Bincode,
    MessagePack,
}

impl OutputFormat {
    /// Parses `output.format`; absent means JSON, unknown names fall back to
    /// JSON with a warning.
    pub fn from_config(format: Option<&str>) -> Self {
        match format.unwrap_or("json") {
            "json" => OutputFormat::Json,
            "bincode" => OutputFormat::Bincode,
            "messagepack" => OutputFormat::MessagePack,
            other => {
                warn!("Unknown output format: {}. Using JSON instead.", other);
                OutputFormat::Json
            }
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Bincode => "bin",
            OutputFormat::MessagePack => "msgpack",
        }
    }
}

/// Writes all snapshots to `<dir>/<base_filename>_snapshots.<ext>` and returns
/// the path written.
pub fn save_snapshots(dir: &Path, output: &OutputConfig, snapshots: &[Snapshot]) -> Result<PathBuf> {
    let format = OutputFormat::from_config(output.format.as_deref());
    let path = dir.join(format!("{}_snapshots.{}", output.base_filename, format.extension()));
    let file = File::create(&path).with_context(|| format!("Error creating snapshot file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        OutputFormat::Json => serde_json::to_writer(&mut writer, snapshots)?,
        OutputFormat::Bincode => bincode::serialize_into(&mut writer, snapshots)?,
        OutputFormat::MessagePack => rmp_serde::encode::write(&mut writer, snapshots)?,
    }
    writer.flush()?;
    info!("All snapshots saved to {} ({:?} format)", path.display(), format);
    Ok(path)
}

/// Writes one CSV row per snapshot and disease to
/// `<dir>/<base_filename>_totals.csv`.
pub fn save_totals_csv(
    dir: &Path,
    output: &OutputConfig,
    diseases: &[DiseaseParameters],
    snapshots: &[Snapshot],
) -> Result<PathBuf> {
    let path = dir.join(format!("{}_totals.csv", output.base_filename));
    let mut writer =
        csv::Writer::from_path(&path).with_context(|| format!("Error creating CSV file '{}'", path.display()))?;
    writer.write_record(["step", "disease", "susceptible", "infected", "immune", "dead", "withdrawn"])?;
    for snapshot in snapshots {
        for (params, totals) in diseases.iter().zip(&snapshot.totals) {
            writer.write_record([
                snapshot.step.to_string(),
                params.name.clone(),
                totals.susceptible.to_string(),
                totals.infected.to_string(),
                totals.immune.to_string(),
                totals.dead.to_string(),
                snapshot.withdrawn.to_string(),
            ])?;
        }
    }
    writer.flush()?;
    info!("Per-step totals saved to {}", path.display());
    Ok(path)
}
