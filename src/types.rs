use geo::MultiPolygon;
use serde::Serialize;

/// Per-region case counts, keyed by `code`.
///
/// A count is `None` when the source sent something that is not a number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionStat {
    pub code: String,
    pub name: String,
    pub active: Option<u64>,
    pub confirmed: Option<u64>,
    pub deaths: Option<u64>,
    pub recovered: Option<u64>,
}

/// Testing figure for a region. Joined to `RegionStat` by `name`, not by code.
///
/// `total_tested` is kept as the source reported it; entries with an empty
/// value never get this far.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionTestStat {
    pub name: String,
    pub total_tested: String,
}

/// A renderable region boundary loaded from the static geometry file.
#[derive(Debug, Clone)]
pub struct GeographyFeature {
    pub code: String,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}
