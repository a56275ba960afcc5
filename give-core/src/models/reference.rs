use std::collections::HashMap;
use std::hash::BuildHasher;
use std::path::Path;

use fxhash::FxHashMap;

use crate::errors::ReferenceError;
use crate::utils::read_chrom_sizes;

///
/// Anything that can tell the bounds of a chromosome.
///
pub trait ChromSizes {
    /// `[start, end)` of the chromosome.
    fn chrom_range(&self, chr: &str) -> Result<(u32, u32), ReferenceError>;
}

impl<S: BuildHasher> ChromSizes for HashMap<String, u32, S> {
    fn chrom_range(&self, chr: &str) -> Result<(u32, u32), ReferenceError> {
        self.get(chr)
            .map(|len| (0, *len))
            .ok_or_else(|| ReferenceError::UnknownChromosome {
                db: String::new(),
                chr: chr.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackGroup {
    pub id: String,
    pub priority: f64,
}

///
/// A genome reference: chromosome sizes plus the track groups defined on it.
///
/// Chromosome metadata may not be available yet (e.g. still being loaded by
/// whoever owns the reference). Until [Reference::mark_ready] is called every
/// coordinate lookup fails with [ReferenceError::NotReady] and callers are
/// expected to retry later.
///
#[derive(Debug, Clone)]
pub struct Reference {
    pub db: String,
    chromosomes: Option<FxHashMap<String, u32>>,
    groups: FxHashMap<String, TrackGroup>,
}

impl Reference {
    /// A reference whose chromosome metadata has not arrived yet.
    pub fn pending(db: &str) -> Self {
        Reference {
            db: db.to_string(),
            chromosomes: None,
            groups: FxHashMap::default(),
        }
    }

    pub fn new(db: &str, chromosomes: FxHashMap<String, u32>) -> Self {
        Reference {
            db: db.to_string(),
            chromosomes: Some(chromosomes),
            groups: FxHashMap::default(),
        }
    }

    ///
    /// Build a reference from a `chrom.sizes` file (optionally gzipped).
    ///
    pub fn from_chrom_sizes<P: AsRef<Path>>(db: &str, path: P) -> Result<Self, ReferenceError> {
        let chromosomes = read_chrom_sizes(path.as_ref())?;
        Ok(Reference::new(db, chromosomes))
    }

    pub fn mark_ready(&mut self, chromosomes: FxHashMap<String, u32>) {
        self.chromosomes = Some(chromosomes);
    }

    pub fn is_ready(&self) -> bool {
        self.chromosomes.is_some()
    }

    ///
    /// Chromosome names in natural order.
    ///
    pub fn chromosome_names(&self) -> Result<Vec<String>, ReferenceError> {
        let chromosomes = self
            .chromosomes
            .as_ref()
            .ok_or_else(|| ReferenceError::NotReady(self.db.clone()))?;
        let mut names: Vec<String> = chromosomes.keys().cloned().collect();
        names.sort_by(|a, b| crate::models::region::compare_chromosomes(a, b));
        Ok(names)
    }

    pub fn add_group(&mut self, id: &str, priority: f64) {
        self.groups.insert(
            id.to_string(),
            TrackGroup {
                id: id.to_string(),
                priority,
            },
        );
    }

    pub fn group(&self, id: &str) -> Option<&TrackGroup> {
        self.groups.get(id)
    }

    pub fn group_priority(&self, id: &str) -> Option<f64> {
        self.groups.get(id).map(|g| g.priority)
    }
}

impl ChromSizes for Reference {
    fn chrom_range(&self, chr: &str) -> Result<(u32, u32), ReferenceError> {
        let chromosomes = self
            .chromosomes
            .as_ref()
            .ok_or_else(|| ReferenceError::NotReady(self.db.clone()))?;
        chromosomes
            .get(chr)
            .map(|len| (0, *len))
            .ok_or_else(|| ReferenceError::UnknownChromosome {
                db: self.db.clone(),
                chr: chr.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[rstest]
    fn test_pending_reference_is_not_ready() {
        let mut reference = Reference::pending("hg38");
        assert!(matches!(
            reference.chrom_range("chr1"),
            Err(ReferenceError::NotReady(_))
        ));

        let mut chromosomes = FxHashMap::default();
        chromosomes.insert("chr1".to_string(), 248956422);
        reference.mark_ready(chromosomes);
        assert_eq!(reference.chrom_range("chr1").unwrap(), (0, 248956422));
    }

    #[rstest]
    fn test_from_chrom_sizes() {
        let mut file = NamedTempFile::with_suffix(".chrom.sizes").unwrap();
        writeln!(file, "chr1\t1000").unwrap();
        writeln!(file, "chr10\t500").unwrap();
        writeln!(file, "chr2\t800").unwrap();

        let reference = Reference::from_chrom_sizes("test", file.path()).unwrap();
        assert_eq!(reference.chrom_range("chr2").unwrap(), (0, 800));
        assert_eq!(
            reference.chromosome_names().unwrap(),
            vec!["chr1", "chr2", "chr10"]
        );
        assert!(matches!(
            reference.chrom_range("chrM"),
            Err(ReferenceError::UnknownChromosome { .. })
        ));
    }

    #[rstest]
    fn test_groups() {
        let mut reference = Reference::pending("mm10");
        reference.add_group("genes", 1.0);
        assert_eq!(reference.group_priority("genes"), Some(1.0));
        assert_eq!(reference.group_priority("other"), None);
    }
}
