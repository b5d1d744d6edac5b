//! Fee policy and price oracles.
//!
//! Fees are set in USD and paid in winston to the fee wallet. The first
//! `free_creates` credentials of an address are free; shares always cost.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use sera_core::Winston;

use crate::error::{Result, VaultError};

/// Default recipient of create and share fees.
pub const FEE_WALLET: &str = "68JAKmnxrHOiNSXGzBk3O8Z7Mxdy3l4wUdJpnPlsNLw";

/// Fees are quoted in AR with four decimal places.
const AR_DECIMALS: i32 = 4;

/// Operations that may carry a fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeKind {
    Create,
    Share,
}

/// Fee schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    /// Address receiving fees.
    pub fee_wallet: String,
    /// Creates an address may publish before creates start costing.
    pub free_creates: usize,
    pub create_fee_usd: f64,
    pub share_fee_usd: f64,
}

impl FeeConfig {
    /// USD owed for `kind`, given how many creates the address already published.
    pub fn usd_for(&self, kind: FeeKind, prior_creates: usize) -> f64 {
        match kind {
            FeeKind::Create if prior_creates < self.free_creates => 0.0,
            FeeKind::Create => self.create_fee_usd,
            FeeKind::Share => self.share_fee_usd,
        }
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            fee_wallet: FEE_WALLET.to_owned(),
            free_creates: 2,
            create_fee_usd: 0.5,
            share_fee_usd: 0.25,
        }
    }
}

/// Convert a USD amount to winston at `usd_per_ar`, rounding to four AR decimals.
pub fn usd_to_winston(usd: f64, usd_per_ar: f64) -> Result<Winston> {
    if !usd_per_ar.is_finite() || usd_per_ar <= 0.0 {
        return Err(VaultError::PriceUnavailable(format!(
            "unusable quote: {usd_per_ar} USD/AR"
        )));
    }
    let scale = 10f64.powi(AR_DECIMALS);
    let ar = (usd / usd_per_ar * scale).round() / scale;
    Ok(Winston::from_ar(ar))
}

/// Source of the AR/USD exchange rate.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Price of one AR in USD.
    async fn usd_per_ar(&self) -> Result<f64>;
}

/// A constant quote, for tests and offline hosts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPriceOracle(pub f64);

#[async_trait]
impl PriceOracle for FixedPriceOracle {
    async fn usd_per_ar(&self) -> Result<f64> {
        Ok(self.0)
    }
}

/// Tries `primary`, then `secondary` when the primary fails or quotes nonsense.
pub struct FallbackOracle<P, S> {
    primary: P,
    secondary: S,
}

impl<P, S> FallbackOracle<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl<P, S> PriceOracle for FallbackOracle<P, S>
where
    P: PriceOracle,
    S: PriceOracle,
{
    async fn usd_per_ar(&self) -> Result<f64> {
        match self.primary.usd_per_ar().await {
            Ok(price) if price.is_finite() && price > 0.0 => return Ok(price),
            Ok(price) => tracing::warn!(price, "primary oracle returned an unusable quote"),
            Err(e) => tracing::warn!("primary oracle failed: {}", e),
        }
        self.secondary.usd_per_ar().await
    }
}
