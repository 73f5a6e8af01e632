//! HTML export of a finished (or paused) game

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use crate::game::RoundKind;
use crate::snapshot::{self, Snapshot};

const GAME_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>beepboop {{session_id}}</title>
<style>
body { font-family: sans-serif; max-width: 720px; margin: 2em auto; color: #222; }
.round { border-bottom: 1px solid #ddd; padding: 1em 0; }
.round h2 { font-size: 0.9em; color: #888; margin: 0 0 0.5em; }
.round p { font-size: 1.3em; margin: 0; }
.round img { max-width: 100%; }
.meta { color: #666; }
</style>
</head>
<body>
<h1>Game {{session_id}}</h1>
{{#if style}}<p class="meta">Style: {{style}}</p>{{/if}}
{{#if describe_prompt}}<p class="meta">Describe prompt: {{describe_prompt}}</p>{{/if}}
{{#each rounds}}
<div class="round">
<h2>Round {{round_number}}</h2>
{{#if is_image}}<img src="{{href}}" alt="Round {{round_number}}">{{else}}<p>{{content}}</p>{{/if}}
</div>
{{/each}}
</body>
</html>
"#;

#[derive(Debug, Serialize)]
struct GameView {
    session_id: String,
    style: Option<String>,
    describe_prompt: Option<String>,
    rounds: Vec<RoundView>,
}

#[derive(Debug, Serialize)]
struct RoundView {
    round_number: u32,
    is_image: bool,
    content: String,
    href: String,
}

/// Default export location: `game_{id}.html` next to the snapshot
pub fn default_html_path(snapshot_path: &Path, snapshot: &Snapshot) -> PathBuf {
    snapshot::snapshot_dir(snapshot_path).join(format!("game_{}.html", snapshot.session_id))
}

/// Link to an image as seen from `html_dir`
///
/// Images that sit next to the page are linked by file name, anything else by
/// the path recorded in the snapshot.
fn image_href(artifact: &str, html_dir: &Path) -> String {
    let path = Path::new(artifact);
    match path.file_name() {
        Some(name) if html_dir.join(name).exists() => name.to_string_lossy().into_owned(),
        _ => artifact.to_string(),
    }
}

/// Render the snapshot as a standalone HTML page
pub fn render_html(snapshot: &Snapshot, html_dir: &Path) -> Result<String> {
    debug!(session_id = %snapshot.session_id, html_dir = %html_dir.display(), "render_html: called");
    let rounds = snapshot
        .entries
        .entries()
        .iter()
        .map(|entry| {
            let is_image = entry.kind == RoundKind::Image;
            RoundView {
                round_number: entry.round_number,
                is_image,
                content: entry.content.clone(),
                href: if is_image {
                    image_href(&entry.content, html_dir)
                } else {
                    String::new()
                },
            }
        })
        .collect();

    let view = GameView {
        session_id: snapshot.session_id.to_string(),
        style: snapshot.style.clone(),
        describe_prompt: snapshot.describe_prompt.clone(),
        rounds,
    };

    Handlebars::new()
        .render_template(GAME_TEMPLATE, &view)
        .map_err(|e| eyre!("Failed to render game page: {}", e))
}

/// Export the snapshot at `snapshot_path` to HTML, returning the page location
pub fn export(snapshot_path: &Path, out: Option<&Path>) -> Result<PathBuf> {
    debug!(snapshot_path = %snapshot_path.display(), ?out, "export: called");
    let snapshot = snapshot::load(snapshot_path)?;
    let html_path = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_html_path(snapshot_path, &snapshot));

    let html_dir = snapshot::snapshot_dir(&html_path);
    let html = render_html(&snapshot, &html_dir)?;

    fs::create_dir_all(&html_dir).context(format!("Failed to create {}", html_dir.display()))?;
    fs::write(&html_path, html).context(format!("Failed to write {}", html_path.display()))?;

    info!(path = %html_path.display(), rounds = snapshot.entries.len(), "Game exported");
    Ok(html_path)
}
