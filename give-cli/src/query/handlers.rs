use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;
use log::{info, warn};
use serde_json::Value;

use give_core::models::Region;
use give_core::utils::get_dynamic_reader;
use give_tracks::interaction::{DEFAULT_THRESHOLD, parse_interaction_lines};
use give_tracks::{Browser, QueryIntent, Response, SignalDisplay, parse_response};

///
/// Regions a response for `window` answers. Tracks spanning two windows
/// query the same window for both ends.
///
fn query_regions(window: &Region, window_span: u32) -> Vec<Region> {
    vec![window.clone(); window_span.max(1) as usize]
}

fn read_response(path: &Path, lines: bool, regions: &[Region]) -> Result<Response> {
    let mut text = String::new();
    get_dynamic_reader(path)?
        .read_to_string(&mut text)
        .with_context(|| format!("Failed to read {:?}", path))?;
    if lines {
        Ok(parse_interaction_lines(&text, regions))
    } else {
        Ok(parse_response(&text)?)
    }
}

pub fn query(browser: &mut Browser, matches: &ArgMatches) -> Result<Value> {
    let track_id = matches
        .get_one::<String>("track")
        .expect("A track ID is required.");
    let window: Region = matches
        .get_one::<String>("window")
        .expect("A window is required.")
        .parse()?;
    let resolution = *matches
        .get_one::<u32>("resolution")
        .expect("Resolution has a default.");
    let intent = match matches.get_flag("summary") {
        true => QueryIntent::Summary,
        false => QueryIntent::Entries,
    };

    if let Some(data) = matches.get_one::<String>("data") {
        let regions = query_regions(&window, browser.track(track_id)?.window_span());
        let response = read_response(Path::new(data), matches.get_flag("lines"), &regions)?;
        let report = browser.ingest(track_id, &response, &regions)?;
        info!(
            "Ingested {} records into '{}' ({} warnings)",
            report.inserted,
            track_id,
            report.warnings.len()
        );
    }

    let result = browser.query(track_id, &window, resolution, intent)?;
    if !result.is_fetched() {
        warn!("{} has not been fetched for '{}'", window, track_id);
    }
    let mut output = serde_json::to_value(result)?;

    let track = browser.track(track_id)?;
    if let Some(width) = matches.get_one::<u32>("width") {
        match track.adapter().as_bigwig() {
            Some(adapter) => {
                let display = SignalDisplay::from_settings(track.settings());
                let view = adapter.view(&window, *width, &display, Some(browser.reference()))?;
                output["view"] = serde_json::to_value(view)?;
            }
            None => warn!("'{}' is not a signal track, ignoring --width", track_id),
        }
    }
    if matches.get_flag("links") {
        match track.adapter().as_interaction() {
            Some(adapter) => {
                let windows = query_regions(&window, track.window_span());
                let threshold = matches
                    .get_one::<f64>("threshold")
                    .copied()
                    .or_else(|| track.settings().get_float("threshold"))
                    .unwrap_or(DEFAULT_THRESHOLD);
                let quantiles = adapter.threshold_quantiles(track.settings(), &windows)?;
                let links = adapter.links_above(&windows, threshold, quantiles.as_deref())?;
                output["links"] = serde_json::to_value(links)?;
            }
            None => warn!("'{}' is not an interaction track, ignoring --links", track_id),
        }
    }
    Ok(output)
}

pub fn run_query(matches: &ArgMatches) -> Result<()> {
    let config = matches
        .get_one::<String>("config")
        .expect("A path to a config file is required.");
    let mut browser = Browser::from_path(Path::new(config))
        .with_context(|| format!("Failed to load config {}", config))?;

    let output = query(&mut browser, matches)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::query::cli::create_query_cli;

    const CONFIG: &str = r#"
[reference]
db = "test"
chromosomes = { chr1 = 100000, chr2 = 100000 }

[[tracks]]
id = "signal"
type = "bigWig"

[[tracks]]
id = "loops"
type = "interaction"
"#;

    #[fixture]
    fn workspace() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("browser.toml"), CONFIG).unwrap();
        std::fs::write(
            dir.path().join("signal.json"),
            json!({
                "chr1:0-20": [
                    { "regionString": "chr1:0-10", "data": { "value": 2.0 } },
                    { "regionString": "chr1:10-20", "data": { "value": 4.0 } }
                ]
            })
            .to_string(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("loops.txt"),
            "chr1 100 200 + chr2 500 600 -\nchr1 5000 5100 + chr1 9000 9100 +\n",
        )
        .unwrap();
        dir
    }

    fn run(dir: &TempDir, args: &[&str]) -> Value {
        let config = dir.path().join("browser.toml");
        let mut browser = Browser::from_path(&config).unwrap();
        let mut argv = vec!["query", "-c", config.to_str().unwrap()];
        argv.extend_from_slice(args);
        let matches = create_query_cli().get_matches_from(argv);
        query(&mut browser, &matches).unwrap()
    }

    #[rstest]
    fn test_summary_query(workspace: TempDir) {
        let data = workspace.path().join("signal.json");
        let output = run(
            &workspace,
            &["-t", "signal", "-w", "chr1:0-20", "-r", "20", "--summary", "-d", data.to_str().unwrap()],
        );
        assert_eq!(output["status"], json!("summary"));
        assert_eq!(output["result"]["sum_data"], json!(60.0));
    }

    #[rstest]
    fn test_unfetched_query(workspace: TempDir) {
        let output = run(&workspace, &["-t", "signal", "-w", "chr1:0-20"]);
        assert_eq!(output["status"], json!("not_fetched"));
    }

    #[rstest]
    fn test_interaction_lines(workspace: TempDir) {
        let data = workspace.path().join("loops.txt");
        let output = run(
            &workspace,
            &["-t", "loops", "-w", "chr1:0-1000", "--lines", "-d", data.to_str().unwrap()],
        );
        assert_eq!(output["status"], json!("entries"));
        assert_eq!(output["result"].as_array().unwrap().len(), 1);
    }

    #[rstest]
    fn test_signal_view(workspace: TempDir) {
        let data = workspace.path().join("signal.json");
        let output = run(
            &workspace,
            &["-t", "signal", "-w", "chr1:0-20", "--width", "2", "-d", data.to_str().unwrap()],
        );
        assert_eq!(output["view"]["resolution"], json!(10));
        assert_eq!(output["view"]["points"].as_array().unwrap().len(), 2);
        assert!(output["view"]["scale"].is_array());

        let ignored = run(&workspace, &["-t", "signal", "-w", "chr1:0-20", "--links"]);
        assert!(ignored.get("links").is_none());
    }

    #[rstest]
    fn test_links_above_threshold(workspace: TempDir) {
        let data = workspace.path().join("loops.txt");
        let output = run(
            &workspace,
            &["-t", "loops", "-w", "chr1:0-1000", "--lines", "--links", "-d", data.to_str().unwrap()],
        );
        assert_eq!(output["links"]["1"].as_array().unwrap().len(), 1);
        assert!(output["links"].get("2").is_none());
    }
}
