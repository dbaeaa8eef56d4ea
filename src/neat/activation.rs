//! Node activation functions.
//!
//! The set is closed: new behaviour means a new variant, not a new impl.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Activation applied to a node's weighted input sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activation {
    /// `f(x) = x`.
    Identity,
    /// Logistic sigmoid, `f(x) = 1 / (1 + e^-x)`, range (0, 1).
    Sigmoid,
    /// `f(x) = x`; used by input nodes, which never sum in-edges.
    PassThrough,
}

impl Activation {
    /// Apply the activation to `x`.
    #[must_use]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Identity | Self::PassThrough => x,
            Self::Sigmoid => 1.0 / (1.0 + (-x).exp()),
        }
    }

    /// Name used in persisted genomes.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Identity => "Identity",
            Self::Sigmoid => "Sigmoid",
            Self::PassThrough => "PassThrough",
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when an activation name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown activation function: {0:?}")]
pub struct UnknownActivation(pub String);

impl FromStr for Activation {
    type Err = UnknownActivation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // Older saves call the identity function "Linear".
            "Identity" | "Linear" => Ok(Self::Identity),
            "Sigmoid" => Ok(Self::Sigmoid),
            "PassThrough" => Ok(Self::PassThrough),
            other => Err(UnknownActivation(other.to_string())),
        }
    }
}
