use std::path::Path;

use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;

use give_core::models::{ChromSizes, ExtendDirection, Extension, Reference, Region};
use give_tracks::BrowserConfig;

///
/// `500bp` and plain integers are bases, anything else with a decimal point
/// is a ratio of the current length.
///
pub fn parse_extension(text: &str) -> Result<Extension> {
    let text = text.trim();
    if let Some(bases) = text.strip_suffix("bp") {
        return Ok(Extension::Bases(bases.trim().parse()?));
    }
    if let Ok(bases) = text.parse::<i64>() {
        return Ok(Extension::Bases(bases));
    }
    text.parse::<f64>()
        .map(Extension::Ratio)
        .map_err(|_| anyhow!("Invalid extension '{}'", text))
}

fn parse_direction(text: &str) -> ExtendDirection {
    match text {
        "left" => ExtendDirection::Left,
        "right" => ExtendDirection::Right,
        _ => ExtendDirection::Both,
    }
}

fn load_reference(config: &str) -> Result<Reference> {
    let path = Path::new(config);
    let browser_config = BrowserConfig::try_from(path)
        .with_context(|| format!("Failed to load config {}", config))?;
    Ok(browser_config.build_reference(path.parent().unwrap_or(Path::new(".")))?)
}

pub fn normalize_region(matches: &ArgMatches) -> Result<String> {
    let text = matches
        .get_one::<String>("region")
        .expect("A region is required.");
    let mut region: Region = text.parse()?;

    if let Some(shift) = matches.get_one::<i64>("shift") {
        region.move_by(*shift);
    }

    let reference = match matches.get_one::<String>("config") {
        Some(config) => Some(load_reference(config)?),
        None => None,
    };
    let sizes = reference.as_ref().map(|reference| reference as &dyn ChromSizes);

    region = match matches.get_one::<String>("extend") {
        Some(amount) => {
            let direction = matches
                .get_one::<String>("direction")
                .map(|direction| parse_direction(direction))
                .unwrap_or_default();
            region.extension(parse_extension(amount)?, direction, sizes)?
        }
        None => match sizes {
            Some(sizes) => region.clip(sizes)?,
            None => region,
        },
    };

    Ok(region.to_string_with_strand(!matches.get_flag("no-strand")))
}

pub fn run_region(matches: &ArgMatches) -> Result<()> {
    println!("{}", normalize_region(matches)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use crate::region::cli::create_region_cli;

    fn normalize(args: &[&str]) -> String {
        let mut argv = vec!["region"];
        argv.extend_from_slice(args);
        normalize_region(&create_region_cli().get_matches_from(argv)).unwrap()
    }

    #[rstest]
    #[case(&["chr2:100-200(-)"], "chr2:100-200 (-)")]
    #[case(&["chr2:100-200(-)", "--no-strand"], "chr2:100-200")]
    #[case(&["chr1 1,000 2,000"], "chr1:1000-2000")]
    #[case(&["chr1:1000-2000", "-e", "1.0"], "chr1:500-2500")]
    #[case(&["chr1:1000-2000", "-e", "500bp", "--direction", "right"], "chr1:1000-2500")]
    #[case(&["chr1:1000-2000", "--shift", "-1500"], "chr1:0-1000")]
    fn test_normalize(#[case] args: &[&str], #[case] expected: &str) {
        assert_eq!(normalize(args), expected);
    }

    #[rstest]
    #[case("500bp", Extension::Bases(500))]
    #[case("-20", Extension::Bases(-20))]
    #[case("0.25", Extension::Ratio(0.25))]
    fn test_parse_extension(#[case] text: &str, #[case] expected: Extension) {
        assert_eq!(parse_extension(text).unwrap(), expected);
    }

    #[rstest]
    fn test_clip_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("browser.toml");
        std::fs::write(&path, "[reference]\ndb = \"t\"\nchromosomes = { chr1 = 1500 }\n").unwrap();
        let config = path.to_str().unwrap();
        assert_eq!(
            normalize(&["chr1:1000-2000", "-c", config]),
            "chr1:1000-1500"
        );
        assert_eq!(
            normalize(&["chr1:1000-2000", "-e", "1.0", "-c", config]),
            "chr1:500-1500"
        );
        assert!(parse_extension("wide").is_err());
    }
}
