//! HTML dashboard
//!
//! Renders the same [`StatusSnapshot`] the JSON endpoint returns. Buttons
//! post to `/spoofr`.

use axum::{extract::State, response::Html};

use crate::{AppState, AppResult};
use crate::models::{DetectedDevice, IdentityKind, StatusSnapshot};

pub async fn page(State(state): State<AppState>) -> AppResult<Html<String>> {
    let engine = state.engine.clone();
    let snapshot = tokio::task::spawn_blocking(move || engine.snapshot()).await?;
    Ok(Html(render(&snapshot)))
}

pub fn render(snapshot: &StatusSnapshot) -> String {
    let current = snapshot
        .status
        .active
        .as_ref()
        .map(|a| escape(&a.to_string()))
        .unwrap_or_else(|| "None".to_string());

    let units = device_list(snapshot.candidates.iter().filter(|d| d.record.kind == IdentityKind::Network));
    let radios = device_list(snapshot.candidates.iter().filter(|d| d.record.kind == IdentityKind::Radio));

    let gps = match &snapshot.gps {
        Some(fix) => format!(
            "<p>Latitude: {:.4}, Longitude: {:.4}, Altitude: {:.1}m, Satellites: {}</p>",
            fix.latitude, fix.longitude, fix.altitude, fix.satellites
        ),
        None => "<p>No GPS data</p>".to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<title>Spoofr Dashboard</title>
<meta name="viewport" content="width=device-width, initial-scale=1">
<style>
body {{ font-family: sans-serif; padding: 20px; background: #f8f9fa; }}
section {{ background: #fff; border: 1px solid #ddd; border-radius: 4px; padding: 12px; margin-bottom: 16px; }}
li {{ margin: 4px 0; }}
button {{ margin-left: 8px; }}
</style>
</head>
<body>
<h1>Spoofr Dashboard</h1>
<section>
<h2>Current Spoof</h2>
<p><strong>Status:</strong> {current}</p>
<button onclick="post({{action: 'revert'}})">Stop Spoofing</button>
</section>
<section>
<h2>Detected Devices</h2>
<h3>Wi-Fi</h3>
<ul>{units}</ul>
<h3>Radio</h3>
<ul>{radios}</ul>
</section>
<section>
<h2>GPS Data</h2>
{gps}
</section>
<script>
function post(body) {{
  fetch('/spoofr', {{
    method: 'POST',
    headers: {{'Content-Type': 'application/json'}},
    body: JSON.stringify(body)
  }}).then(() => location.reload());
}}
function spoof(button) {{
  post({{action: 'spoof', type: button.dataset.type, name: button.dataset.name}});
}}
</script>
</body>
</html>
"#
    )
}

fn device_list<'a>(devices: impl Iterator<Item = &'a DetectedDevice>) -> String {
    let items: Vec<String> = devices
        .map(|d| {
            let name = escape(&d.record.name);
            let rssi = d.rssi.map(|r| format!(", RSSI: {}", r)).unwrap_or_default();
            let kind = d
                .detector_type
                .as_deref()
                .map(|t| format!(", Type: {}", escape(t)))
                .unwrap_or_default();
            format!(
                r#"<li>Name: {name}{kind}{rssi}<button data-type="{}" data-name="{name}" onclick="spoof(this)">Spoof</button></li>"#,
                d.record.kind.as_str()
            )
        })
        .collect();

    if items.is_empty() {
        "<li>None</li>".to_string()
    } else {
        items.concat()
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
