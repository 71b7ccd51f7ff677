//! Proportional DCA allocation toward target weights.
//!
//! New capital is split across underweight projects in proportion to their
//! dollar shortfall. Overweight projects are never sold down, so a single
//! run only closes the whole gap when the new capital covers it.

use crate::core::model::ProjectAnalysis;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// A purchase ready for display and serialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub ticker: String,
    pub amount_usd: f64,
    pub current_price: f64,
    pub quantity: f64,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub struct Rebalancer {
    holdings: HashMap<String, f64>,
    dca_amount: f64,
}

impl Rebalancer {
    /// `holdings` maps tickers to their current USD value.
    pub fn new(holdings: HashMap<String, f64>, dca_amount: f64) -> Self {
        Self {
            holdings,
            dca_amount,
        }
    }

    /// Purchase amount per project. Always one non-negative entry per
    /// project; the entries sum to the DCA amount unless every project is at
    /// or above its target, in which case all are zero.
    pub fn recommend(&self, projects: &[ProjectAnalysis]) -> HashMap<String, f64> {
        let current_total: f64 = self.holdings.values().sum();
        let total_value = current_total + self.dca_amount;

        info!(
            current_total,
            dca_amount = self.dca_amount,
            new_total = total_value,
            "Calculating rebalance"
        );

        let mut recommendations: HashMap<String, f64> = projects
            .iter()
            .map(|project| {
                let ticker = project.ticker();
                let target_allocation = project.project.target_allocation;
                let target_value = total_value * target_allocation;
                let current_value = self.holdings.get(ticker).copied().unwrap_or(0.0);
                let gap = (target_value - current_value).max(0.0);

                debug!(
                    ticker,
                    target_allocation, current_value, target_value, gap, "Allocation calculated"
                );
                (ticker.to_string(), gap)
            })
            .collect();

        let total_gap: f64 = recommendations.values().sum();

        if total_gap > 0.0 {
            let scale_factor = self.dca_amount / total_gap;
            for amount in recommendations.values_mut() {
                *amount *= scale_factor;
            }
            info!(total_gap, scale_factor, "Rebalance scaled");
        } else {
            info!("Portfolio balanced: all positions at or above target allocation");
        }

        recommendations
    }

    /// Display records for every positive amount, largest first.
    pub fn format(
        recommendations: &HashMap<String, f64>,
        projects: &[ProjectAnalysis],
    ) -> Vec<Recommendation> {
        let project_map: HashMap<&str, &ProjectAnalysis> =
            projects.iter().map(|p| (p.ticker(), p)).collect();

        let mut formatted: Vec<Recommendation> = recommendations
            .iter()
            .filter(|(_, amount)| **amount > 0.0)
            .filter_map(|(ticker, amount)| {
                let Some(project) = project_map.get(ticker.as_str()) else {
                    warn!(%ticker, "Recommendation for unknown project skipped");
                    return None;
                };
                let price = project.market_data.price;
                let quantity = if price > 0.0 {
                    round_to(amount / price, 8)
                } else {
                    0.0
                };
                Some(Recommendation {
                    ticker: ticker.clone(),
                    amount_usd: round_to(*amount, 2),
                    current_price: price,
                    quantity,
                })
            })
            .collect();

        formatted.sort_by(|a, b| b.amount_usd.total_cmp(&a.amount_usd));
        formatted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Category, Fdv, MarketData, ProjectConfig};

    fn analysis(ticker: &str, target: f64, price: f64) -> ProjectAnalysis {
        let slug = ticker.to_lowercase();
        let project =
            ProjectConfig::new(ticker, ticker, &slug, vec![], Category::Core, target).unwrap();
        let market_data = MarketData::new(ticker, price, 900.0, Fdv::Exact(1000.0), None).unwrap();
        ProjectAnalysis::new(project, market_data, 150)
    }

    fn btc_eth() -> Vec<ProjectAnalysis> {
        vec![
            analysis("BTC", 0.60, 95000.0),
            analysis("ETH", 0.40, 4200.0),
        ]
    }

    fn holdings(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries.iter().map(|(t, v)| (t.to_string(), *v)).collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() <= b.abs() * 0.01
    }

    #[test]
    fn test_empty_portfolio() {
        let rebalancer = Rebalancer::new(holdings(&[("BTC", 0.0), ("ETH", 0.0)]), 1000.0);
        let recs = rebalancer.recommend(&btc_eth());
        assert!(approx(recs["BTC"], 600.0));
        assert!(approx(recs["ETH"], 400.0));
    }

    #[test]
    fn test_underweight_eth_gets_more() {
        let rebalancer = Rebalancer::new(holdings(&[("BTC", 6000.0), ("ETH", 1000.0)]), 1000.0);
        let recs = rebalancer.recommend(&btc_eth());
        assert!(recs["ETH"] > recs["BTC"]);
        assert!((recs.values().sum::<f64>() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_on_target_portfolio_recomputes_proportionally() {
        let rebalancer = Rebalancer::new(holdings(&[("BTC", 9600.0), ("ETH", 6400.0)]), 1000.0);
        let recs = rebalancer.recommend(&btc_eth());
        assert!(approx(recs["BTC"], 600.0));
        assert!(approx(recs["ETH"], 400.0));
    }

    #[test]
    fn test_single_project_gets_entire_capital() {
        let rebalancer = Rebalancer::new(holdings(&[("BTC", 5000.0)]), 1000.0);
        let recs = rebalancer.recommend(&[analysis("BTC", 1.0, 95000.0)]);
        assert!(approx(recs["BTC"], 1000.0));
    }

    #[test]
    fn test_overweight_project_is_clamped_to_zero() {
        // BTC far above target; ETH absorbs the whole DCA amount.
        let rebalancer = Rebalancer::new(holdings(&[("BTC", 50_000.0)]), 1000.0);
        let recs = rebalancer.recommend(&btc_eth());
        assert_eq!(recs["BTC"], 0.0);
        assert!((recs["ETH"] - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_new_capital_and_balanced_gives_zeros() {
        let rebalancer = Rebalancer::new(holdings(&[("BTC", 600.0), ("ETH", 400.0)]), 0.0);
        let recs = rebalancer.recommend(&btc_eth());
        assert_eq!(recs.len(), 2);
        assert!(recs.values().all(|v| *v == 0.0));
    }

    #[test]
    fn test_missing_holding_counts_as_zero() {
        let rebalancer = Rebalancer::new(HashMap::new(), 500.0);
        let recs = rebalancer.recommend(&btc_eth());
        assert!((recs["BTC"] - 300.0).abs() < 1e-9);
        assert!((recs["ETH"] - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_recommendations_are_non_negative_and_sum_to_capital() {
        let cases = [
            (holdings(&[("BTC", 0.0), ("ETH", 0.0)]), 1000.0),
            (holdings(&[("BTC", 12_000.0), ("ETH", 300.0)]), 250.0),
            (holdings(&[("BTC", 10.0), ("ETH", 99_999.0)]), 5000.0),
            (holdings(&[("BTC", 3.5)]), 0.01),
        ];
        for (h, capital) in cases {
            let recs = Rebalancer::new(h, capital).recommend(&btc_eth());
            assert_eq!(recs.len(), 2);
            assert!(recs.values().all(|v| *v >= 0.0));
            assert!((recs.values().sum::<f64>() - capital).abs() < 1e-6);
        }
    }

    #[test]
    fn test_format_recommendations() {
        let projects = btc_eth();
        let recs = Rebalancer::new(HashMap::new(), 1000.0).recommend(&projects);
        let formatted = Rebalancer::format(&recs, &projects);

        assert_eq!(formatted.len(), 2);
        assert_eq!(formatted[0].ticker, "BTC");
        assert_eq!(formatted[0].amount_usd, 600.0);
        assert_eq!(formatted[0].current_price, 95000.0);
        assert_eq!(formatted[0].quantity, round_to(600.0 / 95000.0, 8));
        assert_eq!(formatted[1].ticker, "ETH");
        assert_eq!(formatted[1].amount_usd, 400.0);
    }

    #[test]
    fn test_format_drops_zero_amounts_and_sorts_descending() {
        let projects = vec![
            analysis("BTC", 0.2, 95000.0),
            analysis("ETH", 0.3, 4200.0),
            analysis("SOL", 0.5, 150.0),
        ];
        let recs = holdings(&[("BTC", 0.0), ("ETH", 123.456), ("SOL", 876.544)]);
        let formatted = Rebalancer::format(&recs, &projects);

        let tickers: Vec<_> = formatted.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["SOL", "ETH"]);
        assert_eq!(formatted[0].amount_usd, 876.54);
        assert_eq!(formatted[1].amount_usd, 123.46);
    }

    #[test]
    fn test_format_zero_price_gives_zero_quantity() {
        let projects = vec![analysis("NEW", 1.0, 0.0)];
        let recs = holdings(&[("NEW", 100.0)]);
        let formatted = Rebalancer::format(&recs, &projects);
        assert_eq!(formatted.len(), 1);
        assert_eq!(formatted[0].quantity, 0.0);
    }

    #[test]
    fn test_format_skips_unknown_ticker() {
        let recs = holdings(&[("DOGE", 100.0)]);
        assert!(Rebalancer::format(&recs, &btc_eth()).is_empty());
    }
}
