//! Admission Filter
//!
//! Numeric acceptance band over the creator's initial buy. The band test is a
//! pure predicate; the single-shot mode adds a one-way "already fired" latch
//! that only a restart clears.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use super::launch::LaunchEvent;

/// How approved launches are forwarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionMode {
    /// Every passing launch is forwarded
    #[default]
    Continuous,
    /// Only the first passing launch is forwarded
    SingleShot,
}

/// Closed band `[min, max]` on `initial_sol_buy`, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmissionBand {
    pub min_initial_buy_sol: f64,
    pub max_initial_buy_sol: f64,
}

impl Default for AdmissionBand {
    fn default() -> Self {
        Self {
            min_initial_buy_sol: 0.05,
            max_initial_buy_sol: 0.75,
        }
    }
}

impl AdmissionBand {
    pub fn new(min_initial_buy_sol: f64, max_initial_buy_sol: f64) -> Self {
        Self {
            min_initial_buy_sol,
            max_initial_buy_sol,
        }
    }

    /// Pure band test
    pub fn test(&self, event: &LaunchEvent) -> bool {
        let buy = event.initial_sol_buy;
        buy >= self.min_initial_buy_sol && buy <= self.max_initial_buy_sol
    }
}

/// Band test plus forwarding mode
#[derive(Debug)]
pub struct AdmissionFilter {
    band: AdmissionBand,
    mode: AdmissionMode,
    fired: AtomicBool,
}

impl AdmissionFilter {
    pub fn new(band: AdmissionBand, mode: AdmissionMode) -> Self {
        Self {
            band,
            mode,
            fired: AtomicBool::new(false),
        }
    }

    /// Pure predicate, no latch involved
    pub fn test(&self, event: &LaunchEvent) -> bool {
        self.band.test(event)
    }

    /// Decide whether to forward a launch
    ///
    /// In single-shot mode the latch is taken with a compare-exchange, so two
    /// launches racing through here cannot both be admitted.
    pub fn admit(&self, event: &LaunchEvent) -> bool {
        match self.mode {
            AdmissionMode::Continuous => self.test(event),
            AdmissionMode::SingleShot => {
                if self.fired.load(Ordering::Acquire) || !self.test(event) {
                    return false;
                }
                self.fired
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
            }
        }
    }

    pub fn mode(&self) -> AdmissionMode {
        self.mode
    }

    pub fn band(&self) -> AdmissionBand {
        self.band
    }

    /// True once a single-shot filter has forwarded its launch
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::launch::TOKEN_DECIMALS;

    fn launch_with_buy(initial_sol_buy: f64) -> LaunchEvent {
        LaunchEvent {
            mint: format!("Mint{}", initial_sol_buy),
            name: "Test".to_string(),
            symbol: "TST".to_string(),
            creator: "Creator".to_string(),
            bonding_curve: "Curve".to_string(),
            curve_vault: "Vault".to_string(),
            uri: String::new(),
            initial_sol_buy,
            tokens_in_curve: 1_000_000_000.0,
            sol_in_curve: 30.0 + initial_sol_buy,
            decimals: TOKEN_DECIMALS,
            detected_at_ms: 0,
        }
    }

    #[test]
    fn test_band_boundaries_inclusive() {
        let filter = AdmissionFilter::new(AdmissionBand::new(0.25, 1.1), AdmissionMode::Continuous);
        assert!(!filter.test(&launch_with_buy(0.24)));
        assert!(filter.test(&launch_with_buy(0.25)));
        assert!(filter.test(&launch_with_buy(1.1)));
        assert!(!filter.test(&launch_with_buy(1.101)));
    }

    #[test]
    fn test_predicate_is_repeatable() {
        let filter = AdmissionFilter::new(AdmissionBand::new(0.25, 1.1), AdmissionMode::SingleShot);
        let event = launch_with_buy(0.5);
        for _ in 0..5 {
            assert!(filter.test(&event));
        }
        assert!(!filter.has_fired());
    }

    #[test]
    fn test_continuous_forwards_every_pass() {
        let filter = AdmissionFilter::new(AdmissionBand::default(), AdmissionMode::Continuous);
        assert!(filter.admit(&launch_with_buy(0.1)));
        assert!(filter.admit(&launch_with_buy(0.2)));
        assert!(!filter.admit(&launch_with_buy(0.9)));
    }

    #[test]
    fn test_single_shot_forwards_once() {
        let filter = AdmissionFilter::new(AdmissionBand::default(), AdmissionMode::SingleShot);
        // A rejected launch does not consume the shot
        assert!(!filter.admit(&launch_with_buy(0.01)));
        assert!(!filter.has_fired());

        assert!(filter.admit(&launch_with_buy(0.1)));
        assert!(filter.has_fired());
        assert!(!filter.admit(&launch_with_buy(0.2)));
    }

    #[test]
    fn test_mode_deserializes_snake_case() {
        let mode: AdmissionMode = serde_json::from_str("\"single_shot\"").unwrap();
        assert_eq!(mode, AdmissionMode::SingleShot);
    }
}
