use crate::config::AppConfig;
use crate::projection::Mercator;
use crate::tooltip::{escape, Tooltip};
use crate::view::{ShapeState, ViewState};
use anyhow::{Context, Result};
use geo::{LineString, MultiPolygon};
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use tracing::info;

pub fn write_outputs(config: &AppConfig, state: &ViewState) -> Result<()> {
    let svg = render_svg(config, state);
    let html = render_html(config, &svg, state.tooltip());

    write_file(&config.output.svg, &svg)?;
    write_file(&config.output.html, &html)?;

    info!(svg = ?config.output.svg, html = ?config.output.html, "map written");
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create directory {:?}", dir))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {:?}", path))
}

/// One `<path>` per feature, filled from the current join.
pub fn render_svg(config: &AppConfig, state: &ViewState) -> String {
    let projection = Mercator::new(&config.projection);
    let regions = state.regions();

    let shapes: Vec<String> = state
        .features()
        .par_iter()
        .zip(regions.par_iter())
        .map(|(feature, region)| {
            format!(
                r#"<path class="{class}" data-code="{code}" fill="{fill}" d="{d}"><title>{title}</title></path>"#,
                class = match state.shape_state(&region.code) {
                    ShapeState::Idle => "region",
                    ShapeState::ShowingTooltip => "region hovered",
                },
                code = escape(&region.code),
                fill = escape(&region.fill),
                d = path_data(&feature.geometry, &projection),
                title = escape(&Tooltip::for_region(region).to_text()),
            )
        })
        .collect();

    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}">
<style>{css}</style>
<g class="regions">
{shapes}
</g>
</svg>
"#,
        w = config.projection.width,
        h = config.projection.height,
        css = region_css(&config.palette.hover_color),
        shapes = shapes.join("\n"),
    )
}

/// Default, hover and pressed looks for a region shape.
fn region_css(hover_color: &str) -> String {
    format!(
        ".region {{ outline: none; stroke: #fff; stroke-width: 0.5; }}\n\
         .region:hover, .region.hovered {{ fill: {hover}; transition: all 250ms; outline: none; }}\n\
         .region:active {{ outline: none; }}",
        hover = escape(hover_color)
    )
}

fn path_data(geometry: &MultiPolygon<f64>, projection: &Mercator) -> String {
    let mut d = String::new();
    for polygon in geometry {
        push_ring(&mut d, polygon.exterior(), projection);
        for interior in polygon.interiors() {
            push_ring(&mut d, interior, projection);
        }
    }
    d
}

fn push_ring(d: &mut String, ring: &LineString<f64>, projection: &Mercator) {
    for (i, coord) in ring.coords().enumerate() {
        let (x, y) = projection.project(coord.x, coord.y);
        let cmd = if i == 0 { 'M' } else { 'L' };
        d.push_str(&format!("{}{:.2},{:.2}", cmd, x, y));
    }
    if ring.coords().next().is_some() {
        d.push('Z');
    }
}

pub fn render_html(config: &AppConfig, svg: &str, tooltip: Option<&Tooltip>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Corona Tracker</title>
    <style>{css}</style>
</head>
<body>
    <div class="full-width-height container">
        <h1 class="no-margin center">Corona Tracker</h1>
        <div id="tooltip" class="tooltip-slot"{hidden}>{tooltip}</div>
        <div class="map" style="max-width: {w}px">
{svg}
        </div>
    </div>
    <script>{js}</script>
</body>
</html>
"#,
        css = PAGE_CSS,
        hidden = if tooltip.is_some() { "" } else { " hidden" },
        tooltip = tooltip.map(Tooltip::to_html).unwrap_or_default(),
        w = config.projection.width,
        svg = svg,
        js = PAGE_JS,
    )
}

const PAGE_CSS: &str = r#"
body { font-family: sans-serif; margin: 0; }
.full-width-height { width: 100%; height: 100%; }
.container { display: flex; flex-direction: column; align-items: center; }
.no-margin { margin: 0; }
.center { text-align: center; }
.map svg { width: 100%; height: auto; }
.tooltip-slot { position: fixed; pointer-events: none; background: #222; color: #fff;
    padding: 6px 10px; border-radius: 4px; font-size: 12px; }
.tooltip-slot h2 { margin: 0 0 4px; font-size: 14px; }
.tooltip-slot ul { margin: 0; padding-left: 16px; }
"#;

// Pointer events go to the server, which owns the single tooltip slot.
const PAGE_JS: &str = r#"
(function () {
  const slot = document.getElementById('tooltip');
  function show(t) {
    slot.replaceChildren();
    if (!t) { slot.hidden = true; return; }
    const h = document.createElement('h2');
    h.textContent = t.title;
    const ul = document.createElement('ul');
    for (const row of t.rows) {
      const li = document.createElement('li');
      const s = document.createElement('strong');
      s.textContent = row.label + ':';
      li.append(s, ' ' + row.value);
      ul.append(li);
    }
    slot.append(h, ul);
    slot.hidden = false;
  }
  document.querySelectorAll('path.region').forEach(function (shape) {
    shape.addEventListener('mouseenter', function () {
      fetch('/api/hover/' + encodeURIComponent(shape.dataset.code), { method: 'POST' })
        .then(function (r) { return r.ok ? r.json() : null; })
        .then(show)
        .catch(function () {});
    });
    shape.addEventListener('mouseleave', function () {
      show(null);
      fetch('/api/leave/' + encodeURIComponent(shape.dataset.code), { method: 'POST' })
        .catch(function () {});
    });
  });
  document.addEventListener('mousemove', function (e) {
    slot.style.left = (e.clientX + 12) + 'px';
    slot.style.top = (e.clientY + 12) + 'px';
  });
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Datasets;
    use crate::types::{GeographyFeature, RegionStat};
    use crate::view::Event;
    use geo::{polygon, MultiPolygon};

    fn square(code: &str, name: &str, lon: f64) -> GeographyFeature {
        let poly = polygon![
            (x: lon, y: 20.0),
            (x: lon + 1.0, y: 20.0),
            (x: lon + 1.0, y: 21.0),
            (x: lon, y: 21.0),
        ];
        GeographyFeature {
            code: code.into(),
            name: name.into(),
            geometry: MultiPolygon::new(vec![poly]),
        }
    }

    fn state(config: &AppConfig) -> ViewState {
        ViewState::new(
            vec![square("MH", "Maharashtra", 74.0), square("LD", "Lakshadweep", 72.0)],
            config.palette.colors.clone(),
            config.palette.default_color.clone(),
        )
    }

    #[test]
    fn test_svg_fills() {
        let config = AppConfig::default();
        let state = state(&config).apply(Event::DataLoaded(Datasets {
            stats: vec![RegionStat {
                code: "MH".into(),
                name: "Maharashtra".into(),
                active: Some(100),
                confirmed: Some(250),
                deaths: Some(10),
                recovered: Some(140),
            }],
            tests: vec![],
        }));

        let svg = render_svg(&config, &state);
        assert_eq!(svg.matches("<path ").count(), 2);
        assert!(svg.contains(r##"data-code="LD" fill="#EEE""##));
        // a single-value domain lands in the last bucket
        assert!(svg.contains(r##"data-code="MH" fill="#782618""##));
        assert!(svg.contains("Tested: -"));
        assert!(svg.contains("fill: #ccc; transition: all 250ms"));
        assert!(!svg.contains("hovered\""));

        let svg = render_svg(&config, &state.apply(Event::PointerEnter { code: "LD".into() }));
        assert!(svg.contains(r#"class="region hovered" data-code="LD""#));
    }

    #[test]
    fn test_path_data_closes_rings() {
        let config = AppConfig::default();
        let feature = square("MH", "Maharashtra", 74.0);
        let d = path_data(&feature.geometry, &Mercator::new(&config.projection));
        assert!(d.starts_with('M'));
        assert!(d.ends_with('Z'));
        assert_eq!(d.matches('L').count(), 4);
    }

    #[test]
    fn test_write_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.output.svg = dir.path().join("out/map.svg");
        config.output.html = dir.path().join("out/index.html");

        write_outputs(&config, &state(&config)).unwrap();

        let html = fs::read_to_string(&config.output.html).unwrap();
        assert!(html.contains("Corona Tracker"));
        assert!(html.contains("<svg"));
        assert!(html.contains(r#"class="tooltip-slot" hidden></div>"#));
        assert!(config.output.svg.exists());
    }
}
