//! ABC/XYZ classification.
//!
//! ABC ranks SKUs by their share of total revenue over the window (Pareto
//! cut-offs). XYZ buckets SKUs by the coefficient of variation of units sold
//! per period. Ranking is population-wide, so it runs only after every SKU
//! profile has been computed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use stockwise_core::{AnalyticsError, AnalyticsResult, SkuId};
use stockwise_inventory::UsageSeries;

use crate::config::{AbcThresholds, AnalyticsConfig, XyzThresholds};
use crate::stats::coefficient_of_variation;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AbcClass {
    A,
    B,
    C,
}

impl AbcClass {
    pub fn index(self) -> usize {
        match self {
            AbcClass::A => 0,
            AbcClass::B => 1,
            AbcClass::C => 2,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum XyzClass {
    X,
    Y,
    Z,
}

impl XyzClass {
    pub fn index(self) -> usize {
        match self {
            XyzClass::X => 0,
            XyzClass::Y => 1,
            XyzClass::Z => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub sku: SkuId,
    pub abc_class: AbcClass,
    pub xyz_class: XyzClass,
    /// Share of the population's value basis (revenue, or units when revenue is zero).
    pub revenue_share: f64,
    /// `None` when mean demand is zero.
    pub coefficient_of_variation: Option<f64>,
    pub total_revenue: f64,
    /// 1-based position in the ABC ranking.
    pub rank: usize,
}

/// Per-SKU classification inputs. Computed independently per SKU.
#[derive(Debug, Clone, PartialEq)]
pub struct SkuProfile {
    pub sku: SkuId,
    pub revenue: f64,
    pub units_sold: u64,
    pub coefficient_of_variation: Option<f64>,
}

impl SkuProfile {
    pub fn from_series(series: &UsageSeries) -> AnalyticsResult<Self> {
        let revenue = series.total_revenue();
        if !revenue.is_finite() {
            return Err(AnalyticsError::computation(format!(
                "total revenue is not finite (sku={})",
                series.sku
            )));
        }

        let cv = coefficient_of_variation(&series.sold_quantities());
        if let Some(v) = cv {
            if !v.is_finite() {
                return Err(AnalyticsError::computation(format!(
                    "coefficient of variation is not finite (sku={})",
                    series.sku
                )));
            }
        }

        Ok(Self {
            sku: series.sku.clone(),
            revenue,
            units_sold: series.total_sold(),
            coefficient_of_variation: cv,
        })
    }
}

#[derive(Debug, Copy, Clone)]
enum ValueBasis {
    Revenue,
    Units,
}

impl ValueBasis {
    fn value(self, profile: &SkuProfile) -> f64 {
        match self {
            ValueBasis::Revenue => profile.revenue,
            ValueBasis::Units => profile.units_sold as f64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    abc: AbcThresholds,
    xyz: XyzThresholds,
}

impl Classifier {
    pub fn new(abc: AbcThresholds, xyz: XyzThresholds) -> Self {
        Self { abc, xyz }
    }

    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self::new(config.abc_thresholds, config.xyz_thresholds)
    }

    /// Classify a whole population of series.
    ///
    /// Fails on the first SKU whose statistics cannot be computed; the engine
    /// profiles SKUs individually instead so one bad SKU is only excluded.
    pub fn classify(
        &self,
        all_series: &BTreeMap<SkuId, UsageSeries>,
    ) -> AnalyticsResult<BTreeMap<SkuId, Classification>> {
        let profiles = all_series
            .values()
            .map(SkuProfile::from_series)
            .collect::<AnalyticsResult<Vec<_>>>()?;
        Ok(self.rank(profiles))
    }

    pub fn xyz_class(&self, cv: Option<f64>) -> XyzClass {
        match cv {
            None => XyzClass::Z,
            Some(v) if v <= self.xyz.x => XyzClass::X,
            Some(v) if v <= self.xyz.y => XyzClass::Y,
            Some(_) => XyzClass::Z,
        }
    }

    /// Population-wide ABC ranking plus XYZ bucketing.
    ///
    /// Shares always sum to 1 for a non-empty population.
    pub fn rank(&self, profiles: Vec<SkuProfile>) -> BTreeMap<SkuId, Classification> {
        let total_revenue: f64 = profiles.iter().map(|p| p.revenue).sum();
        let total_units: u128 = profiles.iter().map(|p| u128::from(p.units_sold)).sum();

        let basis = if total_revenue > 0.0 {
            ValueBasis::Revenue
        } else if total_units > 0 {
            ValueBasis::Units
        } else {
            return self.rank_without_value(profiles);
        };

        let total: f64 = profiles.iter().map(|p| basis.value(p)).sum();
        let mut ranked: Vec<(f64, SkuProfile)> = profiles.into_iter().map(|p| (basis.value(&p), p)).collect();
        ranked.sort_by(|(va, a), (vb, b)| vb.total_cmp(va).then_with(|| a.sku.cmp(&b.sku)));

        let mut out = BTreeMap::new();
        let mut cumulative = 0.0;
        for (idx, (value, profile)) in ranked.into_iter().enumerate() {
            let share = value / total;
            let abc_class = if cumulative < self.abc.a {
                AbcClass::A
            } else if cumulative < self.abc.b {
                AbcClass::B
            } else {
                AbcClass::C
            };
            cumulative += share;

            out.insert(
                profile.sku.clone(),
                Classification {
                    xyz_class: self.xyz_class(profile.coefficient_of_variation),
                    sku: profile.sku,
                    abc_class,
                    revenue_share: share,
                    coefficient_of_variation: profile.coefficient_of_variation,
                    total_revenue: profile.revenue,
                    rank: idx + 1,
                },
            );
        }
        out
    }

    /// Nothing sold at all: equal shares, everything class C.
    fn rank_without_value(&self, mut profiles: Vec<SkuProfile>) -> BTreeMap<SkuId, Classification> {
        profiles.sort_by(|a, b| a.sku.cmp(&b.sku));
        let share = 1.0 / profiles.len().max(1) as f64;
        profiles
            .into_iter()
            .enumerate()
            .map(|(idx, p)| {
                let c = Classification {
                    xyz_class: self.xyz_class(p.coefficient_of_variation),
                    sku: p.sku.clone(),
                    abc_class: AbcClass::C,
                    revenue_share: share,
                    coefficient_of_variation: p.coefficient_of_variation,
                    total_revenue: p.revenue,
                    rank: idx + 1,
                };
                (p.sku, c)
            })
            .collect()
    }
}
