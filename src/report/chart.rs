use crate::models::DailyAggregate;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde_json::{json, Value};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

fn traces(evolution: &[DailyAggregate]) -> Value {
    let dates: Vec<String> = evolution.iter().map(|d| d.date.format("%Y-%m-%d").to_string()).collect();
    let daily: Vec<usize> = evolution.iter().map(|d| d.new_detections).collect();
    let cumulative: Vec<usize> = evolution.iter().map(|d| d.cumulative_detections).collect();
    let area: Vec<f64> = evolution.iter().map(|d| d.cumulative_area_ha).collect();
    let frp: Vec<f64> = evolution.iter().map(|d| d.frp_mean).collect();

    json!([
        {
            "type": "bar", "x": dates, "y": daily, "name": "Focos por día",
            "marker": { "color": "orangered" },
            "xaxis": "x", "yaxis": "y",
            "hovertemplate": "<b>%{x|%d/%m/%Y}</b><br>Focos: %{y}<extra></extra>"
        },
        {
            "type": "scatter", "mode": "lines", "x": dates, "y": cumulative, "name": "Focos acumulados",
            "line": { "color": "crimson", "width": 3 },
            "fill": "tozeroy", "fillcolor": "rgba(220, 20, 60, 0.2)",
            "xaxis": "x2", "yaxis": "y2",
            "hovertemplate": "<b>%{x|%d/%m/%Y}</b><br>Total: %{y:,}<extra></extra>"
        },
        {
            "type": "scatter", "mode": "lines+markers", "x": dates, "y": area, "name": "Superficie",
            "line": { "color": "darkred", "width": 3 }, "marker": { "size": 6 },
            "xaxis": "x3", "yaxis": "y3",
            "hovertemplate": "<b>%{x|%d/%m/%Y}</b><br>%{y:,.0f} ha<extra></extra>"
        },
        {
            "type": "scatter", "mode": "lines+markers", "x": dates, "y": frp, "name": "FRP promedio",
            "line": { "color": "orange", "width": 2 }, "marker": { "size": 6 },
            "xaxis": "x4", "yaxis": "y4",
            "hovertemplate": "<b>%{x|%d/%m/%Y}</b><br>%{y:.1f} MW<extra></extra>"
        }
    ])
}

fn layout(start: NaiveDate, generated_at: DateTime<FixedOffset>) -> Value {
    // four equal rows, 0.08 spacing, top to bottom
    let domains = [[0.79, 1.0], [0.527, 0.737], [0.263, 0.473], [0.0, 0.21]];
    let titles = [
        "Focos detectados por día",
        "Focos acumulados en el tiempo",
        "Superficie estimada afectada (hectáreas)",
        "Intensidad promedio del fuego (FRP)",
    ];
    let y_titles = ["Cantidad", "Focos totales", "Hectáreas", "MW"];

    let mut layout = json!({
        "height": 1200,
        "title": {
            "text": format!(
                "<b>Evolución de Incendios Patagonia Argentina - Del {} al {}</b>",
                start.format("%d/%m/%Y"),
                generated_at.format("%d/%m/%Y")
            ),
            "font": { "size": 18 }
        },
        "showlegend": false,
        "template": "plotly_white",
        "hovermode": "x unified",
        "annotations": []
    });

    for (i, domain) in domains.iter().enumerate() {
        let suffix = if i == 0 { String::new() } else { (i + 1).to_string() };
        let mut xaxis = json!({ "anchor": format!("y{}", suffix), "domain": [0.0, 1.0], "type": "date" });
        if i == domains.len() - 1 {
            xaxis["title"] = json!({ "text": "Fecha" });
        }
        layout[format!("xaxis{}", suffix)] = xaxis;
        layout[format!("yaxis{}", suffix)] = json!({
            "anchor": format!("x{}", suffix),
            "domain": domain,
            "title": { "text": y_titles[i] }
        });
        if let Some(annotations) = layout["annotations"].as_array_mut() {
            annotations.push(json!({
                "text": titles[i], "showarrow": false,
                "xref": "paper", "yref": "paper", "x": 0.5, "y": domain[1],
                "xanchor": "center", "yanchor": "bottom", "font": { "size": 14 }
            }));
        }
    }

    layout
}

/// Standalone Plotly page with four stacked panels: daily detections,
/// cumulative detections, cumulative area and mean FRP.
pub fn render_evolution_chart(evolution: &[DailyAggregate], start: NaiveDate, generated_at: DateTime<FixedOffset>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Evolución de incendios</title>
<script src="{cdn}"></script>
</head>
<body>
<div id="chart" style="width:100%;height:1200px;"></div>
<script>
Plotly.newPlot('chart', {traces}, {layout}, {{ responsive: true }});
</script>
</body>
</html>
"#,
        cdn = PLOTLY_CDN,
        traces = traces(evolution),
        layout = layout(start, generated_at),
    )
}
