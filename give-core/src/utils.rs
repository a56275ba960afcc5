use std::ffi::OsStr;
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use fxhash::FxHashMap;

use crate::errors::ReferenceError;

fn open_maybe_gzipped(path: &Path) -> std::io::Result<BufReader<Box<dyn Read>>> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path)?;
    let file: Box<dyn Read> = match is_gzipped {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    Ok(BufReader::new(file))
}

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    open_maybe_gzipped(path).with_context(|| format!("Failed to open file: {:?}", path))
}

///
/// Read a two column `chrom.sizes` file into a map of chromosome lengths.
/// Blank lines and `#` comments are skipped.
///
pub fn read_chrom_sizes(path: &Path) -> Result<FxHashMap<String, u32>, ReferenceError> {
    let reader = open_maybe_gzipped(path)?;
    let mut chrom_sizes = FxHashMap::default();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split_whitespace();
        let (Some(chr), Some(size)) = (fields.next(), fields.next()) else {
            return Err(ReferenceError::ChromSizesParse(line.to_string()));
        };
        let size = size
            .parse::<u32>()
            .map_err(|_| ReferenceError::ChromSizesParse(line.to_string()))?;

        chrom_sizes.insert(chr.to_string(), size);
    }

    Ok(chrom_sizes)
}
