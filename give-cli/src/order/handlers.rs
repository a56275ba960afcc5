use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::Serialize;

use give_tracks::{Browser, EffectivePriority};

#[derive(Debug, Serialize, PartialEq)]
pub struct OrderRow {
    pub id: String,
    pub title: String,
    #[serde(flatten)]
    pub position: EffectivePriority,
    pub priorities: [f64; 2],
}

pub fn track_order(browser: &Browser, reversed: bool) -> Result<Vec<OrderRow>> {
    let mut rows = Vec::new();
    for id in browser.priorities().ordered_ids(reversed) {
        let track = browser.track(id)?;
        let position = browser
            .priorities()
            .effective_priority(id)
            .with_context(|| format!("Track '{}' lost its slot", id))?;
        rows.push(OrderRow {
            id: id.to_string(),
            title: track.title(),
            position,
            priorities: track.priorities(browser.reference()),
        });
    }
    Ok(rows)
}

fn format_priority(priority: f64) -> String {
    if priority == f64::MAX {
        "-".to_string()
    } else {
        priority.to_string()
    }
}

pub fn run_order(matches: &ArgMatches) -> Result<()> {
    let config = matches
        .get_one::<String>("config")
        .expect("A path to a config file is required.");
    let browser = Browser::from_path(Path::new(config))
        .with_context(|| format!("Failed to load config {}", config))?;

    let rows = track_order(&browser, matches.get_flag("reversed"))?;
    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    for row in rows {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            row.position.slot,
            row.position.index,
            row.id,
            format_priority(row.priorities[0]),
            format_priority(row.priorities[1]),
            row.title
        );
    }
    Ok(())
}
