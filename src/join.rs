//! Joins the geometry with both datasets and assigns each region its fill.
//!
//! The lookup runs in two steps. First the feature code is matched against
//! `RegionStat::code`. Then the matched stat's *name* is matched against
//! `RegionTestStat::name`. A region whose name is spelled differently in the
//! two datasets shows no testing figure.

use crate::scale::QuantileScale;
use crate::types::{GeographyFeature, RegionStat, RegionTestStat};
use serde::Serialize;

/// Outcome of matching a feature code against the stat list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatLookup<'a> {
    Found(&'a RegionStat),
    NotFound,
}

/// Outcome of matching a stat's name against the test list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TestLookup<'a> {
    Found(&'a RegionTestStat),
    NotFound,
    /// No stat matched the feature, so the name lookup never ran.
    Skipped,
}

pub fn lookup_stat<'a>(stats: &'a [RegionStat], code: &str) -> StatLookup<'a> {
    match stats.iter().find(|s| s.code == code) {
        Some(stat) => StatLookup::Found(stat),
        None => StatLookup::NotFound,
    }
}

pub fn lookup_tests<'a>(tests: &'a [RegionTestStat], stat: StatLookup<'_>) -> TestLookup<'a> {
    match stat {
        StatLookup::NotFound => TestLookup::Skipped,
        StatLookup::Found(stat) => match tests.iter().find(|t| t.name == stat.name) {
            Some(test) => TestLookup::Found(test),
            None => TestLookup::NotFound,
        },
    }
}

/// Fill for a feature. Unmatched features, and every feature while no scale
/// exists yet, get the default color.
pub fn fill_for<'a>(
    stat: StatLookup<'_>,
    scale: Option<&'a QuantileScale>,
    default_color: &'a str,
) -> &'a str {
    match (stat, scale) {
        (StatLookup::Found(RegionStat { active: Some(active), .. }), Some(scale)) => {
            scale.color(*active as f64)
        }
        _ => default_color,
    }
}

/// One feature after the join, ready for rendering or for the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionView {
    pub code: String,
    pub name: String,
    pub fill: String,
    pub stat: Option<RegionStat>,
    pub total_tested: Option<String>,
}

pub fn join_feature(
    feature: &GeographyFeature,
    stats: &[RegionStat],
    tests: &[RegionTestStat],
    scale: Option<&QuantileScale>,
    default_color: &str,
) -> RegionView {
    let stat = lookup_stat(stats, &feature.code);
    let tested = lookup_tests(tests, stat);

    RegionView {
        code: feature.code.clone(),
        name: feature.name.clone(),
        fill: fill_for(stat, scale, default_color).to_string(),
        stat: match stat {
            StatLookup::Found(s) => Some(s.clone()),
            StatLookup::NotFound => None,
        },
        total_tested: match tested {
            TestLookup::Found(t) => Some(t.total_tested.clone()),
            TestLookup::NotFound | TestLookup::Skipped => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::MultiPolygon;

    fn stat(code: &str, name: &str, active: u64) -> RegionStat {
        RegionStat {
            code: code.into(),
            name: name.into(),
            active: Some(active),
            confirmed: Some(active * 2),
            deaths: Some(1),
            recovered: Some(active),
        }
    }

    fn feature(code: &str, name: &str) -> GeographyFeature {
        GeographyFeature {
            code: code.into(),
            name: name.into(),
            geometry: MultiPolygon::new(vec![]),
        }
    }

    fn palette() -> Vec<String> {
        (0..9).map(|i| format!("#00000{}", i)).collect()
    }

    #[test]
    fn test_code_then_name_lookup() {
        let stats = vec![stat("MH", "Maharashtra", 100)];
        let tests = vec![RegionTestStat {
            name: "Maharashtra".into(),
            total_tested: "500".into(),
        }];

        let found = lookup_stat(&stats, "MH");
        assert_eq!(found, StatLookup::Found(&stats[0]));
        assert_eq!(lookup_tests(&tests, found), TestLookup::Found(&tests[0]));

        let missing = lookup_stat(&stats, "KL");
        assert_eq!(missing, StatLookup::NotFound);
        assert_eq!(lookup_tests(&tests, missing), TestLookup::Skipped);
    }

    #[test]
    fn test_name_mismatch_yields_no_test_data() {
        let stats = vec![stat("OR", "Odisha", 5)];
        let tests = vec![RegionTestStat {
            name: "Orissa".into(),
            total_tested: "77".into(),
        }];

        let found = lookup_stat(&stats, "OR");
        assert_eq!(lookup_tests(&tests, found), TestLookup::NotFound);
    }

    #[test]
    fn test_unmatched_feature_gets_default_color() {
        let stats = vec![stat("MH", "Maharashtra", 100), stat("KL", "Kerala", 3)];
        let range = palette();
        let scale = QuantileScale::new(stats.iter().filter_map(|s| s.active).map(|a| a as f64), &range);

        let view = join_feature(&feature("LD", "Lakshadweep"), &stats, &[], scale.as_ref(), "#EEE");
        assert_eq!(view.fill, "#EEE");
        assert!(view.stat.is_none());
        assert!(view.total_tested.is_none());
    }

    #[test]
    fn test_no_scale_means_default_color() {
        let stats = vec![stat("MH", "Maharashtra", 100)];
        let view = join_feature(&feature("MH", "Maharashtra"), &stats, &[], None, "#EEE");
        assert_eq!(view.fill, "#EEE");
        assert!(view.stat.is_some());
    }

    #[test]
    fn test_non_numeric_active_gets_default_color() {
        let mut unknown = stat("UN", "Unassigned", 0);
        unknown.active = None;
        let stats = vec![stat("MH", "Maharashtra", 100), unknown];
        let range = palette();
        let scale = QuantileScale::new(stats.iter().filter_map(|s| s.active).map(|a| a as f64), &range);

        let view = join_feature(&feature("UN", "Unassigned"), &stats, &[], scale.as_ref(), "#EEE");
        assert_eq!(view.fill, "#EEE");
        assert!(view.stat.is_some());
    }

    #[test]
    fn test_low_and_high_regions_get_distinct_palette_colors() {
        let stats = vec![stat("AA", "Low", 10), stat("BB", "High", 1000)];
        let range = palette();
        let scale = QuantileScale::new(stats.iter().filter_map(|s| s.active).map(|a| a as f64), &range);

        let low = join_feature(&feature("AA", "Low"), &stats, &[], scale.as_ref(), "#EEE");
        let high = join_feature(&feature("BB", "High"), &stats, &[], scale.as_ref(), "#EEE");

        assert_ne!(low.fill, high.fill);
        assert_eq!(low.fill, range[0]);
        assert_eq!(high.fill, range[8]);
    }
}
