//! Error types for the simulation engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerraSimError {
    /// Substance name is absent from the material catalog.
    #[error("unknown material: {0}")]
    UnknownMaterial(String),

    /// Negative or non-finite mass handed to an add/remove operation.
    #[error("invalid amount {amount} kg for {name}")]
    InvalidAmount { name: String, amount: f64 },

    /// Ledger sums did not reconcile after a transfer. Never corrected silently.
    #[error("mass invariant violated for {substance}: expected {expected} kg, found {actual} kg")]
    InvariantViolation {
        substance: String,
        expected: f64,
        actual: f64,
    },

    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("catalog parse error: {0}")]
    Catalog(#[from] serde_json::Error),

    #[error("file system error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TerraSimError>;

impl TerraSimError {
    #[must_use]
    pub fn unknown_material<S: Into<String>>(name: S) -> Self {
        Self::UnknownMaterial(name.into())
    }

    #[must_use]
    pub fn invalid_amount<S: Into<String>>(name: S, amount: f64) -> Self {
        Self::InvalidAmount {
            name: name.into(),
            amount,
        }
    }

    /// True for errors that abort a tick instead of skipping one compound.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }
}

/// Rejects negative, NaN and infinite masses.
pub(crate) fn check_amount(name: &str, amount: f64) -> Result<()> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(TerraSimError::invalid_amount(name, amount))
    }
}
