//! Sustainability impact of running a task in a chosen window
//!
//! Pure arithmetic over the baseline and expected intensities. Every output is
//! clamped to be non-negative, and all of them are zero when the chosen window
//! is no cleaner than running now.

use serde::{Deserialize, Serialize};

use crate::config::{ImpactConfig, PowerFactors};
use crate::jobs::ResourceUsage;

/// Grams in a kilogram; intensities are per kWh in grams
pub const GRAMS_PER_KG: f64 = 1000.0;

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct SustainabilityImpact {
    /// Reduction relative to baseline, in [0, 100]
    pub carbon_reduction_percentage: f64,
    pub equivalent_trees_planted: f64,
    pub energy_cost_savings: f64,
}

#[derive(Clone, Debug)]
pub struct ImpactCalculator {
    config: ImpactConfig,
    power_factors: PowerFactors,
}

impl ImpactCalculator {
    pub fn new(config: ImpactConfig, power_factors: PowerFactors) -> Self {
        Self {
            config,
            power_factors,
        }
    }

    /// kg of CO2 avoided by running at `expected` instead of `baseline`
    pub fn kg_saved(
        &self,
        baseline: f64,
        expected: f64,
        duration_hours: f64,
        usage: ResourceUsage,
    ) -> f64 {
        let delta = (baseline - expected).max(0.0);
        let kg = delta * self.power_factors.factor(usage) * duration_hours / GRAMS_PER_KG;
        if kg.is_finite() {
            kg.max(0.0)
        } else {
            0.0
        }
    }

    pub fn calculate(
        &self,
        baseline: f64,
        expected: f64,
        duration_hours: f64,
        usage: ResourceUsage,
    ) -> SustainabilityImpact {
        if baseline.is_nan() || baseline <= 0.0 || expected >= baseline {
            return SustainabilityImpact::default();
        }

        let percentage = ((baseline - expected) / baseline * 100.0).clamp(0.0, 100.0);
        let kg_saved = self.kg_saved(baseline, expected, duration_hours, usage);
        let annualized = kg_saved * self.config.runs_per_year;

        SustainabilityImpact {
            carbon_reduction_percentage: percentage,
            equivalent_trees_planted: (annualized / self.config.tree_absorption_kg_per_year)
                .max(0.0),
            energy_cost_savings: (kg_saved * self.config.cost_per_kg_co2).max(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculator() -> ImpactCalculator {
        ImpactCalculator::new(ImpactConfig::default(), PowerFactors::default())
    }

    #[test]
    fn test_scenario_sixty_percent() {
        let impact = calculator().calculate(500.0, 200.0, 3.0, ResourceUsage::High);
        assert!((impact.carbon_reduction_percentage - 60.0).abs() < 1e-9);

        // 300 g/kWh * 1.0 kW * 3 h = 0.9 kg
        let kg = calculator().kg_saved(500.0, 200.0, 3.0, ResourceUsage::High);
        assert!((kg - 0.9).abs() < 1e-9);
        assert!((impact.energy_cost_savings - 0.9 * 0.05).abs() < 1e-9);
        assert!((impact.equivalent_trees_planted - 0.9 / 21.77).abs() < 1e-9);
    }

    #[test]
    fn test_no_improvement_is_all_zero() {
        let calc = calculator();
        assert_eq!(
            calc.calculate(300.0, 300.0, 2.0, ResourceUsage::Low),
            SustainabilityImpact::default()
        );
        assert_eq!(
            calc.calculate(300.0, 450.0, 2.0, ResourceUsage::VeryHigh),
            SustainabilityImpact::default()
        );
        assert_eq!(calc.kg_saved(300.0, 450.0, 2.0, ResourceUsage::High), 0.0);
    }

    #[test]
    fn test_zero_baseline_is_all_zero() {
        let impact = calculator().calculate(0.0, 0.0, 2.0, ResourceUsage::Medium);
        assert_eq!(impact, SustainabilityImpact::default());
    }

    #[test]
    fn test_percentage_capped_at_hundred() {
        let impact = calculator().calculate(400.0, 0.0, 1.0, ResourceUsage::Low);
        assert_eq!(impact.carbon_reduction_percentage, 100.0);
    }

    #[test]
    fn test_heavier_tiers_save_more() {
        let calc = calculator();
        let tiers = [
            ResourceUsage::Low,
            ResourceUsage::Medium,
            ResourceUsage::High,
            ResourceUsage::VeryHigh,
        ];
        let savings: Vec<f64> = tiers
            .iter()
            .map(|t| calc.kg_saved(500.0, 250.0, 4.0, *t))
            .collect();
        assert!(savings.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_runs_per_year_scales_trees_only() {
        let config = ImpactConfig {
            runs_per_year: 52.0,
            ..ImpactConfig::default()
        };
        let weekly = ImpactCalculator::new(config, PowerFactors::default())
            .calculate(500.0, 200.0, 3.0, ResourceUsage::High);
        let once = calculator().calculate(500.0, 200.0, 3.0, ResourceUsage::High);

        assert!((weekly.equivalent_trees_planted - once.equivalent_trees_planted * 52.0).abs() < 1e-9);
        assert_eq!(weekly.energy_cost_savings, once.energy_cost_savings);
    }
}
