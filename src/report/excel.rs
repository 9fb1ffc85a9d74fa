use crate::analysis::statistics::format_thousands;
use crate::core::orchestrator::PipelineReport;
use crate::models::{DailyAggregate, RiskCategory, WeatherOrigin};
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;

pub const SHEET_NAMES: [&str; 6] = [
    "Detalle",
    "Evolución Diaria",
    "Resumen Semanal",
    "Top 10 Días",
    "Resumen Meteorológico",
    "Resumen General",
];

pub const TOP_DAYS: usize = 10;

#[derive(Debug, PartialEq)]
enum Cell {
    Text(String),
    Number(f64),
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl From<usize> for Cell {
    fn from(v: usize) -> Self {
        Cell::Number(v as f64)
    }
}

fn write_table(sheet: &mut Worksheet, name: &str, headers: &[&str], rows: Vec<Vec<Cell>>) -> Result<()> {
    let bold = Format::new().set_bold();
    sheet.set_name(name)?;

    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }

    for (r, row) in rows.into_iter().enumerate() {
        let row_idx = (r + 1) as u32;
        for (col, cell) in row.into_iter().enumerate() {
            match cell {
                Cell::Text(s) => sheet.write_string(row_idx, col as u16, s)?,
                Cell::Number(v) => sheet.write_number(row_idx, col as u16, v)?,
            };
        }
    }

    sheet.autofit();
    Ok(())
}

fn detail_sheet(sheet: &mut Worksheet, report: &PipelineReport) -> Result<()> {
    let headers = [
        "acq_date", "acq_time", "latitude", "longitude", "frp", "confidence",
        "viento_kmh", "humedad_relativa", "temperatura_c", "lluvia_7d_mm",
        "indice_riesgo", "nivel_riesgo", "clima", "satellite", "instrument", "daynight",
    ];
    let rows = report
        .detections
        .iter()
        .map(|e| {
            let d = &e.detection;
            let w = &e.weather;
            vec![
                d.acq_date.format("%Y-%m-%d").to_string().into(),
                d.acq_time_label().into(),
                d.latitude.into(),
                d.longitude.into(),
                d.frp.into(),
                d.confidence.into(),
                w.wind_kmh.into(),
                w.humidity_pct.into(),
                w.temperature_c.into(),
                w.rain_7d_mm.into(),
                e.risk.index.into(),
                e.risk.category.label().into(),
                match w.origin {
                    WeatherOrigin::Observed => "observado",
                    WeatherOrigin::Fallback => "por defecto",
                }
                .into(),
                d.satellite.clone().unwrap_or_default().into(),
                d.instrument.clone().unwrap_or_default().into(),
                d.daynight.clone().unwrap_or_default().into(),
            ]
        })
        .collect();
    write_table(sheet, SHEET_NAMES[0], &headers, rows)
}

fn daily_sheet(sheet: &mut Worksheet, report: &PipelineReport) -> Result<()> {
    let headers = [
        "acq_date", "focos_nuevos", "frp_total", "frp_promedio", "frp_maximo",
        "confianza", "focos_acumulados", "superficie_estimada_ha",
    ];
    let rows = report
        .evolution
        .iter()
        .map(|d| {
            vec![
                d.date.format("%Y-%m-%d").to_string().into(),
                d.new_detections.into(),
                d.frp_sum.into(),
                d.frp_mean.into(),
                d.frp_max.into(),
                d.confidence_mean.into(),
                d.cumulative_detections.into(),
                d.cumulative_area_ha.into(),
            ]
        })
        .collect();
    write_table(sheet, SHEET_NAMES[1], &headers, rows)
}

fn weekly_sheet(sheet: &mut Worksheet, report: &PipelineReport) -> Result<()> {
    let headers = [
        "año", "semana", "focos", "frp_promedio", "frp_maximo", "frp_total",
        "confianza_promedio", "fecha_inicio", "fecha_fin", "superficie_estimada_ha",
    ];
    let rows = report
        .weekly
        .iter()
        .map(|w| {
            vec![
                (w.iso_year as f64).into(),
                (w.iso_week as f64).into(),
                w.detections.into(),
                w.frp_mean.into(),
                w.frp_max.into(),
                w.frp_sum.into(),
                w.confidence_mean.into(),
                w.first_date.format("%Y-%m-%d").to_string().into(),
                w.last_date.format("%Y-%m-%d").to_string().into(),
                w.estimated_area_ha.into(),
            ]
        })
        .collect();
    write_table(sheet, SHEET_NAMES[2], &headers, rows)
}

/// Area is the cumulative estimate as of each day, as in the daily sheet.
fn top_days_rows(top: &[DailyAggregate]) -> Vec<Vec<Cell>> {
    top.iter()
        .map(|d| {
            vec![
                d.date.format("%Y-%m-%d").to_string().into(),
                d.new_detections.into(),
                d.frp_max.into(),
                d.frp_mean.into(),
                d.cumulative_area_ha.into(),
            ]
        })
        .collect()
}

fn top_days_sheet(sheet: &mut Worksheet, report: &PipelineReport) -> Result<()> {
    let headers = [
        "Fecha", "Focos Detectados", "FRP Máximo (MW)", "FRP Promedio (MW)", "Superficie Estimada (ha)",
    ];
    write_table(sheet, SHEET_NAMES[3], &headers, top_days_rows(&report.top_days))
}

fn metric(name: &str, value: impl Into<Cell>) -> Vec<Cell> {
    vec![name.into(), value.into()]
}

fn weather_sheet(sheet: &mut Worksheet, report: &PipelineReport) -> Result<()> {
    let s = &report.stats;
    let mut rows = vec![
        metric("Número total de incendios analizados", s.total_detections),
        metric("Índice de riesgo promedio", format!("{:.1}", s.risk_index_mean)),
        metric("Nivel de riesgo predominante", s.dominant_risk.label()),
    ];
    for category in RiskCategory::ALL {
        let count = s.risk_distribution.get(&category).copied().unwrap_or(0);
        rows.push(metric(&format!("Incendios con riesgo {}", category.label()), count));
    }
    rows.extend([
        metric("Porcentaje con riesgo ALTO o superior", format!("{:.1}%", s.high_risk_share_pct)),
        metric("Viento promedio (km/h)", format!("{:.1}", s.wind_mean_kmh)),
        metric("Humedad relativa promedio (%)", format!("{:.1}", s.humidity_mean_pct)),
        metric("Temperatura promedio (°C)", format!("{:.1}", s.temperature_mean_c)),
        metric("Lluvia 7d promedio (mm)", format!("{:.1}", s.rain_mean_mm)),
    ]);
    write_table(sheet, SHEET_NAMES[4], &["Métrica", "Valor"], rows)
}

fn general_sheet(sheet: &mut Worksheet, report: &PipelineReport, generated_at: DateTime<FixedOffset>) -> Result<()> {
    let s = &report.stats;
    let high_confidence = report
        .detections
        .iter()
        .filter(|d| d.detection.confidence >= report.min_confidence)
        .count();

    let rows = vec![
        metric("Fecha inicio", s.first_date.format("%d/%m/%Y").to_string()),
        metric("Fecha fin", s.last_date.format("%d/%m/%Y").to_string()),
        metric("Días totales analizados", s.days_spanned as f64),
        metric("Total de detecciones", s.total_detections),
        metric(&format!("Total de detecciones alta confianza (>={:.0}%)", report.min_confidence), high_confidence),
        metric("Superficie estimada total (hectáreas)", format_thousands(s.total_area_ha)),
        metric("FRP promedio general (MW)", format!("{:.1}", s.frp_mean)),
        metric("FRP máximo registrado (MW)", format!("{:.1}", s.frp_max)),
        metric("Confianza promedio (%)", format!("{:.1}", s.confidence_mean)),
        metric("Día con más focos", s.peak_day.format("%d/%m/%Y").to_string()),
        metric("Cantidad máxima de focos en un día", s.peak_day_detections),
        metric("Índice de riesgo promedio", format!("{:.1}/100", s.risk_index_mean)),
        metric("Nivel de riesgo predominante", s.dominant_risk.label()),
        metric("Última actualización", generated_at.format("%d/%m/%Y %H:%M").to_string()),
    ];
    write_table(sheet, SHEET_NAMES[5], &["Métrica", "Valor"], rows)
}

/// Six-sheet workbook covering detail rows, daily and weekly evolution,
/// the busiest days and the weather/risk summaries.
pub fn build_workbook(report: &PipelineReport, generated_at: DateTime<FixedOffset>) -> Result<Workbook> {
    let mut workbook = Workbook::new();

    detail_sheet(workbook.add_worksheet(), report)?;
    daily_sheet(workbook.add_worksheet(), report)?;
    weekly_sheet(workbook.add_worksheet(), report)?;
    top_days_sheet(workbook.add_worksheet(), report)?;
    weather_sheet(workbook.add_worksheet(), report)?;
    general_sheet(workbook.add_worksheet(), report, generated_at)?;

    Ok(workbook)
}

pub fn export_workbook(report: &PipelineReport, generated_at: DateTime<FixedOffset>, path: &Path) -> Result<()> {
    let mut workbook = build_workbook(report, generated_at)?;
    workbook
        .save(path)
        .with_context(|| format!("Failed to write workbook {}", path.display()))?;
    log::info!("Workbook written: {} ({} sheets)", path.display(), SHEET_NAMES.len());
    Ok(())
}
