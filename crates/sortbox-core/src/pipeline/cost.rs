//! Token-to-cents costing for classification runs.
//!
//! Prices are USD per one million tokens, as providers publish them; run
//! records carry cents.

use std::collections::HashMap;

use tracing::warn;

use sortbox_types::config::{ModelPrice, PricingConfig};

/// Per-model price lookup.
#[derive(Debug, Clone)]
pub struct PricingTable {
    models: HashMap<String, ModelPrice>,
    fallback: Option<ModelPrice>,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PricingTable {
    /// Table with the prices shipped with sortbox.
    pub fn builtin() -> Self {
        Self::from(&PricingConfig::default())
    }

    /// Price for `model`, or the fallback when it is not listed.
    pub fn price_for(&self, model: &str) -> Option<ModelPrice> {
        self.models.get(model).copied().or(self.fallback)
    }

    /// Cost of a run in cents. Unpriced models cost 0 and log a warning.
    pub fn cost_cents(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        let Some(price) = self.price_for(model) else {
            warn!(model, "no price configured for model, recording zero cost");
            return 0.0;
        };
        let input_usd = input_tokens as f64 / 1_000_000.0 * price.input_per_million;
        let output_usd = output_tokens as f64 / 1_000_000.0 * price.output_per_million;
        (input_usd + output_usd) * 100.0
    }
}

impl From<&PricingConfig> for PricingTable {
    fn from(config: &PricingConfig) -> Self {
        Self {
            models: config.models.clone(),
            fallback: config.fallback,
        }
    }
}

/// Round to 1/100 of a cent, the precision the `complete` event reports.
pub fn round_cents(cents: f64) -> f64 {
    (cents * 100.0).round() / 100.0
}
