pub mod chart;
pub mod excel;
pub mod map;

use crate::core::orchestrator::PipelineReport;
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use std::path::{Path, PathBuf};

pub const MAP_FILE: &str = "mapa_generado.html";
pub const CHART_FILE: &str = "evolucion_historica.html";
pub const WORKBOOK_FILE: &str = "detalle_incendios.xlsx";

#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub map: PathBuf,
    pub chart: PathBuf,
    pub workbook: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            map: dir.join(MAP_FILE),
            chart: dir.join(CHART_FILE),
            workbook: dir.join(WORKBOOK_FILE),
        }
    }
}

/// Renders the map, the evolution chart and the workbook into `output_dir`,
/// replacing earlier files of the same name.
pub fn write_artifacts(output_dir: &Path, report: &PipelineReport, generated_at: DateTime<FixedOffset>) -> Result<ArtifactPaths> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output dir {}", output_dir.display()))?;
    let paths = ArtifactPaths::in_dir(output_dir);

    let html = map::render_map(&report.detections, report.start_date, generated_at);
    std::fs::write(&paths.map, html).with_context(|| format!("Failed to write {}", paths.map.display()))?;
    log::info!("Map written: {}", paths.map.display());

    let html = chart::render_evolution_chart(&report.evolution, report.start_date, generated_at);
    std::fs::write(&paths.chart, html).with_context(|| format!("Failed to write {}", paths.chart.display()))?;
    log::info!("Chart written: {}", paths.chart.display());

    excel::export_workbook(report, generated_at, &paths.workbook)?;

    Ok(paths)
}
