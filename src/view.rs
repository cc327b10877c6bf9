//! Display state for the map and its one tooltip slot.
//!
//! All updates go through [`ViewState::apply`], a pure transition from the old
//! state and an event to the new state.

use crate::fetch::Datasets;
use crate::join::{join_feature, RegionView};
use crate::scale::QuantileScale;
use crate::tooltip::Tooltip;
use crate::types::{GeographyFeature, RegionStat, RegionTestStat};

#[derive(Debug, Clone)]
pub enum Event {
    DataLoaded(Datasets),
    FetchFailed,
    PointerEnter { code: String },
    /// Only clears the slot while it still belongs to `code`.
    PointerLeave { code: String },
}

/// Per-shape interaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeState {
    Idle,
    ShowingTooltip,
}

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    features: Vec<GeographyFeature>,
    palette: Vec<String>,
    default_color: String,
    stats: Vec<RegionStat>,
    tests: Vec<RegionTestStat>,
    scale: Option<QuantileScale>,
    tooltip: Option<Tooltip>,
}

impl ViewState {
    pub fn new(features: Vec<GeographyFeature>, palette: Vec<String>, default_color: String) -> Self {
        Self {
            features,
            palette,
            default_color,
            stats: Vec::new(),
            tests: Vec::new(),
            scale: None,
            tooltip: None,
        }
    }

    pub fn apply(self, event: Event) -> Self {
        match event {
            Event::DataLoaded(data) => {
                let scale =
                    QuantileScale::new(data.stats.iter().filter_map(|s| s.active).map(|a| a as f64), &self.palette);
                Self {
                    stats: data.stats,
                    tests: data.tests,
                    scale,
                    ..self
                }
            }
            // last-good state stays on screen
            Event::FetchFailed => self,
            Event::PointerEnter { code } => match self.region(&code) {
                Some(region) => {
                    let tooltip = Tooltip::for_region(&region);
                    Self {
                        tooltip: Some(tooltip),
                        ..self
                    }
                }
                None => self,
            },
            Event::PointerLeave { code } => match &self.tooltip {
                Some(t) if t.code == code => Self {
                    tooltip: None,
                    ..self
                },
                _ => self,
            },
        }
    }

    pub fn features(&self) -> &[GeographyFeature] {
        &self.features
    }

    pub fn stats(&self) -> &[RegionStat] {
        &self.stats
    }

    pub fn tests(&self) -> &[RegionTestStat] {
        &self.tests
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.as_ref()
    }

    pub fn shape_state(&self, code: &str) -> ShapeState {
        match &self.tooltip {
            Some(t) if t.code == code => ShapeState::ShowingTooltip,
            _ => ShapeState::Idle,
        }
    }

    pub fn region(&self, code: &str) -> Option<RegionView> {
        self.features
            .iter()
            .find(|f| f.code == code)
            .map(|f| self.join(f))
    }

    pub fn regions(&self) -> Vec<RegionView> {
        self.features.iter().map(|f| self.join(f)).collect()
    }

    fn join(&self, feature: &GeographyFeature) -> RegionView {
        join_feature(
            feature,
            &self.stats,
            &self.tests,
            self.scale.as_ref(),
            &self.default_color,
        )
    }
}
