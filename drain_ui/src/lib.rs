#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Terminal presentation for the drainage monitor.
//!
//! - `TextRenderer`: human-readable panel, one block per snapshot.
//! - `JsonlRenderer`: one JSON object per line, for piping into other tools.
//! - `PrintMapLauncher`: prints a `geo:` URI instead of opening an app.
use std::io::Write;

use drain_core::gps::geo_uri;
use drain_core::{ActuatorState, GeoPoint, MapLauncher, Renderer, Severity, ViewModel};
use drain_traits::BoxError;
use serde_json::json;

fn on_off(b: bool) -> &'static str {
    if b { "ON" } else { "OFF" }
}

/// Multi-line panel for a single view model.
pub fn format_view(view: &ViewModel) -> String {
    let mut out = String::new();
    let marker = match view.alert.severity {
        Severity::Normal => "",
        Severity::Elevated => " [!]",
    };
    out.push_str(&format!("[{}] {}{}\n", view.timestamp_s, view.alert.text, marker));
    for c in &view.chambers {
        out.push_str(&format!(
            "  Chamber {}: {:<7} fill {:>3}%\n",
            c.index, c.status, c.fill_percent
        ));
    }
    out.push_str(&format!("  {}\n", view.proximity_text));
    for line in view.readout.lines() {
        out.push_str(&format!("  {line}\n"));
    }
    out.push_str(&format!("  GPS: {}\n", view.gps));
    out
}

/// Writes the panel to any `Write` (stdout in the CLI, a buffer in tests).
pub struct TextRenderer<W: Write> {
    out: W,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|()| self.out.flush()) {
            tracing::warn!(error = %e, "renderer write failed");
        }
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn render(&mut self, view: &ViewModel) {
        let text = format_view(view);
        self.emit(&text);
    }

    fn actuator(&mut self, state: &ActuatorState) {
        let line = format!(
            "  servo: {}  auto: {}{}\n",
            on_off(state.servo_on),
            on_off(state.auto_mode),
            if state.running_since.is_some() { "  (auto run)" } else { "" }
        );
        self.emit(&line);
    }

    fn status(&mut self, message: &str) {
        self.emit(&format!("status: {message}\n"));
    }
}

/// One JSON object per event: `{"type": "view"|"actuator"|"status", ...}`.
pub struct JsonlRenderer<W: Write> {
    out: W,
}

impl<W: Write> JsonlRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, v: &serde_json::Value) {
        let res = serde_json::to_writer(&mut self.out, v)
            .map_err(std::io::Error::from)
            .and_then(|()| self.out.write_all(b"\n"))
            .and_then(|()| self.out.flush());
        if let Err(e) = res {
            tracing::warn!(error = %e, "renderer write failed");
        }
    }
}

impl<W: Write> Renderer for JsonlRenderer<W> {
    fn render(&mut self, view: &ViewModel) {
        self.emit(&json!({"type": "view", "view": view}));
    }

    fn actuator(&mut self, state: &ActuatorState) {
        self.emit(&json!({
            "type": "actuator",
            "servo_on": state.servo_on,
            "auto_mode": state.auto_mode,
            "running": state.running_since.is_some(),
            "episode_latched": state.episode_latched,
        }));
    }

    fn status(&mut self, message: &str) {
        self.emit(&json!({"type": "status", "message": message}));
    }
}

/// "Opens" the map by printing its `geo:` URI.
pub struct PrintMapLauncher<W: Write> {
    out: W,
}

impl<W: Write> PrintMapLauncher<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> MapLauncher for PrintMapLauncher<W> {
    fn open_external_map(&mut self, lat: f64, lon: f64) -> Result<(), BoxError> {
        let p = GeoPoint::new(lat, lon).ok_or_else(|| format!("coordinate out of range: {lat},{lon}"))?;
        writeln!(self.out, "{}", geo_uri(p))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drain_core::config::{EngineCfg, NormalizeCfg};
    use drain_core::{normalize, reconcile};

    fn view(raw: serde_json::Value) -> ViewModel {
        let snap = normalize(&raw, &NormalizeCfg::default());
        reconcile(&snap, &ActuatorState::default(), &EngineCfg::default()).view
    }

    #[test]
    fn text_panel_shows_alert_chambers_and_sensors() {
        let mut r = TextRenderer::new(Vec::new());
        r.render(&view(json!({
            "data": {"water_levels": [1, 1, 0], "distance1": 12.5},
            "timestamp": 42,
        })));
        let text = String::from_utf8(r.into_inner()).unwrap();
        assert!(text.starts_with("[42] Blockage Detected: Unknown [!]\n"));
        assert!(text.contains("Chamber 3: BLOCKED"));
        assert!(text.contains("Chamber 1: OK"));
        assert!(text.contains("fill 100%"));
        assert!(text.contains("Sonar 1: 12.5 cm"));
        assert!(text.contains("Proximity: Safe"));
        assert!(text.contains("GPS: Lat: 23.811855, Lon: 90.357140 (no lock)"));
    }

    #[test]
    fn jsonl_lines_are_tagged() {
        let mut r = JsonlRenderer::new(Vec::new());
        r.render(&view(json!({})));
        r.status("Store error: offline");
        r.actuator(&ActuatorState::default());
        let text = String::from_utf8(r.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["type"], "view");
        assert_eq!(lines[0]["view"]["alert"]["text"], "No alerts");
        assert_eq!(lines[0]["view"]["alert"]["severity"], "normal");
        assert_eq!(lines[1]["message"], "Store error: offline");
        assert_eq!(lines[2]["servo_on"], false);
    }

    #[test]
    fn map_launcher_prints_geo_uri() {
        let mut m = PrintMapLauncher::new(Vec::new());
        m.open_external_map(23.811855, 90.35714).unwrap();
        assert!(m.open_external_map(120.0, 0.0).is_err());
        let text = String::from_utf8(m.into_inner()).unwrap();
        assert_eq!(text, "geo:23.811855,90.357140?q=23.811855,90.357140\n");
    }
}
