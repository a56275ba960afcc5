use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::errors::{ReferenceError, RegionError};
use crate::models::reference::ChromSizes;

///
/// Strand of a region. The tri-state (unknown, forward, reverse) is expressed
/// as `Option<Strand>` on [Region].
///
#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn as_char(&self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }

    ///
    /// Parse a strand token. `.` means "no strand" and yields `None`.
    ///
    pub fn parse_token(token: &str) -> Result<Option<Strand>, RegionError> {
        match token.trim() {
            "+" => Ok(Some(Strand::Forward)),
            "-" => Ok(Some(Strand::Reverse)),
            "." => Ok(None),
            other => Err(RegionError::InvalidStrand(other.to_string())),
        }
    }
}

impl FromStr for Strand {
    type Err = RegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strand::parse_token(s)?.ok_or_else(|| RegionError::InvalidStrand(s.to_string()))
    }
}

///
/// How far [Region::extension] should grow (or shrink, when negative) a region.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Extension {
    /// Relative to the current length, `1.0` doubles the region.
    Ratio(f64),
    /// Absolute number of bases.
    Bases(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtendDirection {
    /// Split the extension evenly between both ends.
    #[default]
    Both,
    /// Only move the start.
    Left,
    /// Only move the end.
    Right,
}

///
/// A half-open `[start, end)` interval on a named chromosome, 0-based.
///
#[derive(Eq, PartialEq, Hash, Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Region {
    pub chr: String,
    pub start: u32,
    pub end: u32,

    pub strand: Option<Strand>,
}

impl Region {
    pub fn new(chr: &str, start: u32, end: u32) -> Self {
        Region {
            chr: chr.to_string(),
            start,
            end,
            strand: None,
        }
    }

    pub fn with_strand(mut self, strand: Option<Strand>) -> Self {
        self.strand = strand;
        self
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    ///
    /// Length of the overlap between two regions. Regions on different
    /// chromosomes never overlap.
    ///
    pub fn overlaps(&self, other: &Region) -> u32 {
        if self.chr != other.chr {
            return 0;
        }
        self.end
            .min(other.end)
            .saturating_sub(self.start.max(other.start))
    }

    pub fn contains_point(&self, chr: &str, pos: u32) -> bool {
        self.chr == chr && self.start <= pos && pos < self.end
    }

    pub fn contains(&self, other: &Region) -> bool {
        self.chr == other.chr && self.start <= other.start && other.end <= self.end
    }

    pub fn intersection(&self, other: &Region) -> Option<Region> {
        if self.overlaps(other) == 0 {
            return None;
        }
        Some(Region {
            chr: self.chr.clone(),
            start: self.start.max(other.start),
            end: self.end.min(other.end),
            strand: self.strand,
        })
    }

    ///
    /// Grow `self` to the union of both regions when they touch or overlap.
    /// Returns `false` (leaving `self` unchanged) otherwise.
    ///
    pub fn concat(&mut self, other: &Region) -> bool {
        if self.chr != other.chr || other.start > self.end || other.end < self.start {
            return false;
        }
        self.start = self.start.min(other.start);
        self.end = self.end.max(other.end);
        true
    }

    ///
    /// Shift the region by `distance` bases in place. The start never goes
    /// below zero; the length is preserved.
    ///
    pub fn move_by(&mut self, distance: i64) {
        let len = self.len();
        let new_start = (self.start as i64 + distance).clamp(0, (u32::MAX - len) as i64) as u32;
        self.start = new_start;
        self.end = new_start + len;
    }

    ///
    /// Clip the region to the bounds of its chromosome.
    ///
    pub fn clip(&self, sizes: &dyn ChromSizes) -> Result<Region, ReferenceError> {
        let (chr_start, chr_end) = sizes.chrom_range(&self.chr)?;
        Ok(Region {
            chr: self.chr.clone(),
            start: self.start.clamp(chr_start, chr_end),
            end: self.end.clamp(chr_start, chr_end),
            strand: self.strand,
        })
    }

    ///
    /// Produce a new region extended outward (or shrunk inward for negative
    /// extensions, never below one base).
    ///
    /// # Arguments
    /// - extension: ratio of the current length or absolute bases
    /// - direction: which end(s) move
    /// - sizes: when given, the result is clipped to the chromosome bounds
    ///
    pub fn extension(
        &self,
        extension: Extension,
        direction: ExtendDirection,
        sizes: Option<&dyn ChromSizes>,
    ) -> Result<Region, ReferenceError> {
        let len = self.len() as i64;
        let delta = match extension {
            Extension::Ratio(ratio) => (ratio * len as f64).round() as i64,
            Extension::Bases(bases) => bases,
        };
        let mut new_len = len + delta;
        if delta < 0 {
            new_len = new_len.max(1.min(len));
        }
        let diff = new_len - len;

        let (mut start, mut end) = (self.start as i64, self.end as i64);
        match direction {
            ExtendDirection::Both => {
                let left = diff.div_euclid(2);
                start -= left;
                end += diff - left;
            }
            ExtendDirection::Left => start -= diff,
            ExtendDirection::Right => end += diff,
        }
        start = start.max(0);
        end = end.clamp(start, u32::MAX as i64);

        let extended = Region {
            chr: self.chr.clone(),
            start: start as u32,
            end: end as u32,
            strand: self.strand,
        };
        match sizes {
            Some(sizes) => extended.clip(sizes),
            None => Ok(extended),
        }
    }

    ///
    /// Canonical string form, `chr:start-end` followed by ` (+)`/` (-)` when
    /// the strand is known and requested.
    ///
    pub fn to_string_with_strand(&self, include_strand: bool) -> String {
        match (include_strand, self.strand) {
            (true, Some(strand)) => format!(
                "{}:{}-{} ({})",
                self.chr,
                self.start,
                self.end,
                strand.as_char()
            ),
            _ => format!("{}:{}-{}", self.chr, self.start, self.end),
        }
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_with_strand(true))
    }
}

impl FromStr for Region {
    type Err = RegionError;

    ///
    /// Parse `chr:start-end`, `chr:start-end(+)`, `chr:start-end (-)` or
    /// `chr start end [strand]`. Thousands separators are ignored.
    ///
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let format_error = || RegionError::Format(text.to_string());
        let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
        let mut body = cleaned.as_str();
        let mut strand = None;

        // trailing "(+)" / "( - )"
        if body.ends_with(')') {
            let open = body.rfind('(').ok_or_else(format_error)?;
            strand = Strand::parse_token(&body[open + 1..body.len() - 1])
                .map_err(|_| format_error())?;
            body = &body[..open];
        }

        let tokens: Vec<&str> = body.split_whitespace().collect();

        // "chr:start-end" or "chr start end", optionally followed by a strand
        let (chr, start, end, rest) = match tokens.as_slice() {
            [location, rest @ ..] if location.contains(':') => {
                let (chr, range) = location.rsplit_once(':').ok_or_else(format_error)?;
                let (start, end) = range.split_once('-').ok_or_else(format_error)?;
                (chr, start, end, rest)
            }
            [chr, start, end, rest @ ..] => (*chr, *start, *end, rest),
            _ => return Err(format_error()),
        };
        match rest {
            [] => {}
            [token] if strand.is_none() => {
                strand = Strand::parse_token(token).map_err(|_| format_error())?;
            }
            _ => return Err(format_error()),
        }
        if chr.is_empty() {
            return Err(format_error());
        }

        let start: u32 = start.parse().map_err(|_| format_error())?;
        let end: u32 = end.parse().map_err(|_| format_error())?;
        if end < start {
            return Err(RegionError::InvertedRange(text.to_string()));
        }

        Ok(Region {
            chr: chr.to_string(),
            start,
            end,
            strand,
        })
    }
}

impl TryFrom<&str> for Region {
    type Error = RegionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

///
/// Natural chromosome order: numbered chromosomes first (numerically), then
/// named ones (lexicographically), ignoring a leading `chr`. Ties fall back
/// to the full name so the order stays total.
///
pub fn compare_chromosomes(a: &str, b: &str) -> Ordering {
    chromosome_key(a)
        .cmp(&chromosome_key(b))
        .then_with(|| a.cmp(b))
}

fn chromosome_key(chr: &str) -> (u8, u64, &str) {
    let trimmed = if chr.len() > 3 && chr[..3].eq_ignore_ascii_case("chr") {
        &chr[3..]
    } else {
        chr
    };
    match trimmed.parse::<u64>() {
        Ok(number) => (0, number, trimmed),
        Err(_) => (1, 0, trimmed),
    }
}

impl Ord for Region {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_chromosomes(&self.chr, &other.chr)
            .then(self.start.cmp(&other.start))
            .then(self.end.cmp(&other.end))
            .then(self.strand.cmp(&other.strand))
    }
}

impl PartialOrd for Region {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use fxhash::FxHashMap;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn sizes() -> FxHashMap<String, u32> {
        let mut sizes = FxHashMap::default();
        sizes.insert("chr1".to_string(), 1000);
        sizes
    }

    #[rstest]
    #[case("chr2:100-200 (-)")]
    #[case("chr2:100-200 (+)")]
    #[case("chrX:0-1")]
    #[case("chr10:12345-67890")]
    fn test_round_trip(#[case] text: &str) {
        let region: Region = text.parse().unwrap();
        assert_eq!(region.to_string(), text);
    }

    #[rstest]
    fn test_canonical_strand_spacing() {
        let region: Region = "chr2:100-200(-)".parse().unwrap();
        assert_eq!(region.to_string(), "chr2:100-200 (-)");
        assert_eq!(region.to_string_with_strand(false), "chr2:100-200");
        assert_eq!(region.strand, Some(Strand::Reverse));
    }

    #[rstest]
    #[case("chr1 100 200", Region::new("chr1", 100, 200))]
    #[case("chr1:1,000-2,000", Region::new("chr1", 1000, 2000))]
    #[case("chr1 100 200 +", Region::new("chr1", 100, 200).with_strand(Some(Strand::Forward)))]
    #[case("chr1:100-200( - )", Region::new("chr1", 100, 200).with_strand(Some(Strand::Reverse)))]
    #[case("chr1:100-200(.)", Region::new("chr1", 100, 200))]
    #[case("chr1 100 200 -", Region::new("chr1", 100, 200).with_strand(Some(Strand::Reverse)))]
    #[case("chr1:100-200 -", Region::new("chr1", 100, 200).with_strand(Some(Strand::Reverse)))]
    #[case("HLA-A*01:01:100-200", Region::new("HLA-A*01:01", 100, 200))]
    fn test_parse_variants(#[case] text: &str, #[case] expected: Region) {
        assert_eq!(text.parse::<Region>().unwrap(), expected);
    }

    #[rstest]
    #[case("chr1")]
    #[case("chr1:100")]
    #[case("chr1:abc-200")]
    #[case("chr1:100-200(x)")]
    #[case("chr1:100-200-300-400")]
    #[case("chr1:-5-10")]
    #[case(":100-200")]
    #[case("chr1 100 200 - (+)")]
    #[case("chr1 100 200 + extra")]
    #[case("")]
    fn test_parse_malformed(#[case] text: &str) {
        assert!(matches!(
            text.parse::<Region>(),
            Err(RegionError::Format(_))
        ));
    }

    #[rstest]
    fn test_parse_inverted() {
        assert_eq!(
            "chr1:200-100".parse::<Region>(),
            Err(RegionError::InvertedRange("chr1:200-100".to_string()))
        );
    }

    #[rstest]
    #[case(Region::new("chr1", 0, 10), Region::new("chr1", 5, 20), 5)]
    #[case(Region::new("chr1", 0, 10), Region::new("chr1", 10, 20), 0)]
    #[case(Region::new("chr1", 0, 10), Region::new("chr2", 0, 10), 0)]
    #[case(Region::new("chr1", 0, 100), Region::new("chr1", 20, 30), 10)]
    fn test_overlaps_symmetric(#[case] a: Region, #[case] b: Region, #[case] expected: u32) {
        assert_eq!(a.overlaps(&b), expected);
        assert_eq!(b.overlaps(&a), expected);
    }

    #[rstest]
    fn test_contains() {
        let region = Region::new("chr1", 10, 20);
        assert!(region.contains_point("chr1", 10));
        assert!(!region.contains_point("chr1", 20));
        assert!(region.contains(&Region::new("chr1", 12, 20)));
        assert!(!region.contains(&Region::new("chr2", 12, 20)));
    }

    #[rstest]
    fn test_ordering() {
        let mut regions = vec![
            Region::new("chrX", 0, 10),
            Region::new("chr10", 5, 10),
            Region::new("chr2", 5, 10),
            Region::new("chr2", 5, 8),
            Region::new("chr2", 1, 100),
        ];
        regions.sort();
        let names: Vec<String> = regions.iter().map(|r| r.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "chr2:1-100",
                "chr2:5-8",
                "chr2:5-10",
                "chr10:5-10",
                "chrX:0-10"
            ]
        );
    }

    #[rstest]
    fn test_extension_ratio_both() {
        let region = Region::new("chr1", 100, 200);
        let extended = region
            .extension(Extension::Ratio(1.0), ExtendDirection::Both, None)
            .unwrap();
        assert_eq!(extended, Region::new("chr1", 50, 250));
    }

    #[rstest]
    fn test_extension_never_negative() {
        let region = Region::new("chr1", 10, 20);
        let extended = region
            .extension(Extension::Bases(100), ExtendDirection::Left, None)
            .unwrap();
        assert_eq!(extended.start, 0);
        assert_eq!(extended.end, 20);
    }

    #[rstest]
    fn test_extension_clipped(sizes: FxHashMap<String, u32>) {
        let region = Region::new("chr1", 900, 990);
        let extended = region
            .extension(Extension::Bases(200), ExtendDirection::Both, Some(&sizes))
            .unwrap();
        assert_eq!(extended, Region::new("chr1", 800, 1000));
    }

    #[rstest]
    fn test_extension_shrink_keeps_one_base() {
        let region = Region::new("chr1", 100, 110);
        let shrunk = region
            .extension(Extension::Bases(-50), ExtendDirection::Right, None)
            .unwrap();
        assert_eq!(shrunk, Region::new("chr1", 100, 101));
    }

    #[rstest]
    fn test_clip_unknown_chromosome(sizes: FxHashMap<String, u32>) {
        let region = Region::new("chr7", 0, 10);
        assert!(matches!(
            region.clip(&sizes),
            Err(ReferenceError::UnknownChromosome { .. })
        ));
    }

    #[rstest]
    fn test_move_and_concat() {
        let mut region = Region::new("chr1", 10, 20);
        region.move_by(-15);
        assert_eq!(region, Region::new("chr1", 0, 10));

        assert!(region.concat(&Region::new("chr1", 10, 30)));
        assert_eq!(region, Region::new("chr1", 0, 30));
        assert!(!region.concat(&Region::new("chr1", 31, 40)));
    }

    #[rstest]
    fn test_intersection() {
        let a = Region::new("chr1", 0, 50);
        assert_eq!(
            a.intersection(&Region::new("chr1", 40, 60)),
            Some(Region::new("chr1", 40, 50))
        );
        assert_eq!(a.intersection(&Region::new("chr1", 50, 60)), None);
    }
}
