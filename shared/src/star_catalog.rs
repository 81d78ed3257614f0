//! Declination-bucketed star catalog for nearest reference star lookup.
//!
//! Stars are partitioned into fixed-width declination bands ("buckets"). A
//! query only scans the bucket holding the target declination, widened by one
//! neighbouring bucket when the target sits close to a band edge:
//!
//! ```text
//! bucket(dec) = floor((dec - min_declination) / bucket_width)
//! ```
//!
//! which is the same partition as `floor((dec - dec mod w + w) / w) + offset`
//! with the offset chosen so that `min_declination` lands in bucket 0.
//!
//! Distances are squared Euclidean in raw (RA, Dec) degrees. RA is not scaled
//! by cos(dec) and the 0/360 wrap is not handled, so results are only
//! meaningful for sparse catalogs and small separations.

use crate::coordinate::Coordinate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while building, checking or querying a [`StarCatalog`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Invalid bucket configuration: {0}")]
    InvalidConfig(String),

    #[error("Catalog entry {index} has declination {declination} outside the indexed span (bucket {bucket})")]
    EntryOutOfRange {
        index: usize,
        declination: f64,
        bucket: i64,
    },

    #[error("Expected {expected} buckets, got {got}")]
    BucketCountMismatch { expected: usize, got: usize },

    /// An entry is stored in a bucket its declination does not hash to.
    #[error("Index inconsistent: entry {entry} stored in bucket {bucket} but hashes to bucket {expected_bucket}")]
    IndexInconsistent {
        bucket: usize,
        expected_bucket: i64,
        entry: Coordinate,
    },

    /// The query declination falls outside the indexed declination span.
    #[error("Declination {declination} maps to bucket {bucket}, outside the indexed range")]
    OutOfRange { declination: f64, bucket: i64 },

    #[error("No catalog stars near declination {declination} (bucket {bucket})")]
    NotFound { declination: f64, bucket: usize },
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Declination partition parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Lowest indexed declination in degrees (inclusive lower edge of bucket 0)
    pub min_declination: f64,
    /// Width of each bucket in degrees
    pub bucket_width: f64,
    /// Number of buckets
    pub bucket_count: usize,
    /// Include the lower neighbour when the offset into the bucket is below this
    pub lower_widen_below: f64,
    /// Include the upper neighbour when the offset into the bucket is above this
    pub upper_widen_above: f64,
}

impl BucketConfig {
    /// Layout tuned for the UCAC3 extract: 219 half-degree buckets over [-20, 89.5).
    pub fn ucac3() -> Self {
        Self {
            min_declination: -20.0,
            bucket_width: 0.5,
            bucket_count: 219,
            lower_widen_below: 0.1,
            upper_widen_above: 0.4,
        }
    }

    pub fn validate(&self) -> CatalogResult<()> {
        if !(self.bucket_width.is_finite() && self.bucket_width > 0.0) {
            return Err(CatalogError::InvalidConfig(format!(
                "bucket width must be positive, got {}",
                self.bucket_width
            )));
        }
        if self.bucket_count == 0 {
            return Err(CatalogError::InvalidConfig(
                "bucket count must be non-zero".to_string(),
            ));
        }
        if !(-90.0..=90.0).contains(&self.min_declination) {
            return Err(CatalogError::InvalidConfig(format!(
                "minimum declination {} is outside [-90, 90]",
                self.min_declination
            )));
        }
        let margins_ok = 0.0 <= self.lower_widen_below
            && self.lower_widen_below <= self.upper_widen_above
            && self.upper_widen_above <= self.bucket_width;
        if !margins_ok {
            return Err(CatalogError::InvalidConfig(format!(
                "widening margins must satisfy 0 <= {} <= {} <= {}",
                self.lower_widen_below, self.upper_widen_above, self.bucket_width
            )));
        }
        Ok(())
    }

    /// Upper (exclusive) edge of the indexed declination span.
    pub fn max_declination(&self) -> f64 {
        self.min_declination + self.bucket_width * self.bucket_count as f64
    }

    /// Bucket a declination hashes to. May lie outside `[0, bucket_count)`.
    pub fn bucket_of(&self, dec: f64) -> i64 {
        ((dec - self.min_declination) / self.bucket_width).floor() as i64
    }

    /// Bucket index if it lies inside the table.
    pub fn bucket_index(&self, dec: f64) -> Option<usize> {
        let bucket = self.bucket_of(dec);
        if bucket >= 0 && (bucket as usize) < self.bucket_count {
            Some(bucket as usize)
        } else {
            None
        }
    }

    /// Distance in degrees from the lower edge of the declination's bucket.
    pub fn offset_in_bucket(&self, dec: f64) -> f64 {
        (dec - self.min_declination).rem_euclid(self.bucket_width)
    }

    fn lower_edge(&self, bucket: usize) -> f64 {
        self.min_declination + self.bucket_width * bucket as f64
    }
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self::ucac3()
    }
}

/// Static nearest-neighbour index over catalog stars.
///
/// Immutable after construction; run [`StarCatalog::validate`] once before
/// trusting query results from a table that was not built by hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "CatalogTable")]
pub struct StarCatalog {
    config: BucketConfig,
    buckets: Vec<Vec<Coordinate>>,
}

/// Serialized form of a [`StarCatalog`], checked through [`StarCatalog::from_buckets`] on load.
#[derive(Deserialize)]
struct CatalogTable {
    config: BucketConfig,
    buckets: Vec<Vec<Coordinate>>,
}

impl TryFrom<CatalogTable> for StarCatalog {
    type Error = CatalogError;

    fn try_from(table: CatalogTable) -> CatalogResult<Self> {
        Self::from_buckets(table.config, table.buckets)
    }
}

impl StarCatalog {
    /// Build the index by hashing every entry into its bucket.
    ///
    /// Fails on the first entry whose declination falls outside the indexed span.
    pub fn build<I>(config: BucketConfig, entries: I) -> CatalogResult<Self>
    where
        I: IntoIterator<Item = Coordinate>,
    {
        config.validate()?;
        let mut buckets = vec![Vec::new(); config.bucket_count];

        for (index, entry) in entries.into_iter().enumerate() {
            let bucket = config
                .bucket_index(entry.dec)
                .ok_or_else(|| CatalogError::EntryOutOfRange {
                    index,
                    declination: entry.dec,
                    bucket: config.bucket_of(entry.dec),
                })?;
            buckets[bucket].push(entry);
        }

        let catalog = Self { config, buckets };
        debug!(
            "Built star catalog: {} stars in {} buckets",
            catalog.len(),
            catalog.bucket_count()
        );
        Ok(catalog)
    }

    /// Fill buckets by walking declination-sorted input with a moving bucket cursor.
    ///
    /// No per-entry hashing happens; the cursor only advances when an entry
    /// crosses the next bucket edge. Unsorted input or entries outside the
    /// span end up in the wrong bucket, which [`StarCatalog::validate`] reports.
    pub fn from_sorted_entries<I>(config: BucketConfig, entries: I) -> CatalogResult<Self>
    where
        I: IntoIterator<Item = Coordinate>,
    {
        config.validate()?;
        let last = config.bucket_count - 1;
        let mut buckets = vec![Vec::new(); config.bucket_count];
        let mut cursor = 0usize;

        for entry in entries {
            while cursor < last && entry.dec >= config.lower_edge(cursor + 1) {
                cursor += 1;
            }
            buckets[cursor].push(entry);
        }

        Ok(Self { config, buckets })
    }

    /// Wrap an already partitioned table (e.g. from a cache file).
    ///
    /// Only the bucket count is checked here.
    pub fn from_buckets(config: BucketConfig, buckets: Vec<Vec<Coordinate>>) -> CatalogResult<Self> {
        config.validate()?;
        if buckets.len() != config.bucket_count {
            return Err(CatalogError::BucketCountMismatch {
                expected: config.bucket_count,
                got: buckets.len(),
            });
        }
        Ok(Self { config, buckets })
    }

    /// Re-hash every stored entry and report the first one stored in the wrong bucket.
    pub fn validate(&self) -> CatalogResult<()> {
        self.config.validate()?;
        if self.buckets.len() != self.config.bucket_count {
            return Err(CatalogError::BucketCountMismatch {
                expected: self.config.bucket_count,
                got: self.buckets.len(),
            });
        }
        for (bucket, entries) in self.buckets.iter().enumerate() {
            for entry in entries {
                let expected_bucket = self.config.bucket_of(entry.dec);
                if expected_bucket != bucket as i64 {
                    warn!(
                        "Catalog entry {entry} in bucket {bucket} hashes to {expected_bucket}"
                    );
                    return Err(CatalogError::IndexInconsistent {
                        bucket,
                        expected_bucket,
                        entry: *entry,
                    });
                }
            }
        }
        Ok(())
    }

    /// True when every entry sits in the bucket its declination hashes to.
    pub fn is_consistent(&self) -> bool {
        self.validate().is_ok()
    }

    /// Nearest catalog star to `target`.
    pub fn find_nearest(&self, target: &Coordinate) -> CatalogResult<Coordinate> {
        self.find_nearest_with_distance(target).map(|(star, _)| star)
    }

    /// Nearest catalog star together with its squared planar distance.
    ///
    /// Candidates come from the target's bucket, plus the lower neighbour
    /// when the target is within `lower_widen_below` of the bucket's lower
    /// edge, otherwise plus the upper neighbour when it is past
    /// `upper_widen_above`. Ties go to the first candidate encountered.
    pub fn find_nearest_with_distance(&self, target: &Coordinate) -> CatalogResult<(Coordinate, f64)> {
        let primary = self
            .config
            .bucket_index(target.dec)
            .ok_or_else(|| CatalogError::OutOfRange {
                declination: target.dec,
                bucket: self.config.bucket_of(target.dec),
            })?;

        let offset = self.config.offset_in_bucket(target.dec);
        let neighbour = if offset < self.config.lower_widen_below && primary > 0 {
            Some(primary - 1)
        } else if offset > self.config.upper_widen_above && primary + 1 < self.buckets.len() {
            Some(primary + 1)
        } else {
            None
        };

        let primary_entries = self
            .buckets
            .get(primary)
            .ok_or(CatalogError::BucketCountMismatch {
                expected: self.config.bucket_count,
                got: self.buckets.len(),
            })?;
        let candidates = primary_entries.iter().chain(
            neighbour
                .and_then(|b| self.buckets.get(b))
                .into_iter()
                .flatten(),
        );

        let mut nearest: Option<(Coordinate, f64)> = None;
        for star in candidates {
            let dist_sq = target.planar_distance_sq(star);
            match nearest {
                Some((_, best)) if dist_sq >= best => {}
                _ => nearest = Some((*star, dist_sq)),
            }
        }

        nearest.ok_or(CatalogError::NotFound {
            declination: target.dec,
            bucket: primary,
        })
    }

    pub fn config(&self) -> &BucketConfig {
        &self.config
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Entries stored in one bucket, in insertion order.
    pub fn bucket(&self, index: usize) -> Option<&[Coordinate]> {
        self.buckets.get(index).map(Vec::as_slice)
    }

    /// Total number of stars.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Load from JSON file.
    ///
    /// The layout and bucket count are checked on load; run
    /// [`StarCatalog::validate`] to also re-hash the entries.
    pub fn load_from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
