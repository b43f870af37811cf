use crate::config::ConfigurationError;
use crate::context::requirements::{ContextComponent, ContextRequirements};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DEFAULT_WEIGHTS: [u32; 8] = [150, 300, 200, 100, 250, 200, 150, 400];

/// Token weight per component, indexed like [`ContextComponent::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostWeights {
    weights: [u32; 8],
}

impl CostWeights {
    /// The full table must sum without overflow so every estimate fits.
    pub fn new(weights: [u32; 8]) -> Result<Self, ConfigurationError> {
        weights
            .iter()
            .try_fold(0u32, |acc, &w| acc.checked_add(w))
            .ok_or(ConfigurationError::WeightOverflow)?;
        Ok(Self { weights })
    }

    pub fn weight(&self, component: ContextComponent) -> u32 {
        self.weights[component.index()]
    }
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    /// Every component, 0 when inactive
    pub per_component_cost: BTreeMap<String, u32>,
    pub total_estimated_tokens: u32,
}

/// Pure function of the requirements and the weight table.
pub fn estimate(requirements: &ContextRequirements, weights: &CostWeights) -> CostEstimate {
    let mut per_component_cost = BTreeMap::new();
    let mut total = 0u32;
    for component in ContextComponent::ALL {
        let cost = if requirements.is_active(component) {
            weights.weight(component)
        } else {
            0
        };
        // Cannot overflow: the whole table was summed at construction.
        total = total.saturating_add(cost);
        per_component_cost.insert(component.key().to_string(), cost);
    }
    CostEstimate {
        per_component_cost,
        total_estimated_tokens: total,
    }
}
