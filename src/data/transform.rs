use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::Sample;

/// Cofactor used by `asinh` when none is given; the usual choice for
/// conventional (non-spectral) cytometers.
pub const DEFAULT_ASINH_COFACTOR: f64 = 150.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformParseError {
    #[error("unknown transform '{0}' (expected none, log10, ln, asinh or asinh:<cofactor>)")]
    Unknown(String),
    #[error("asinh cofactor must be a positive number, got '{0}'")]
    BadCofactor(String),
}

/// Elementwise rescaling applied to both channels before binning.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Transform {
    Identity,
    #[default]
    Log10,
    Ln,
    Asinh { cofactor: f64 },
}

impl Transform {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Transform::Identity => value,
            Transform::Log10 => value.log10(),
            Transform::Ln => value.ln(),
            Transform::Asinh { cofactor } => (value / cofactor).asinh(),
        }
    }

    /// Transform both channels of `sample`, keeping its label.
    pub fn apply_to_sample(self, sample: &Sample) -> Sample {
        if self == Transform::Identity {
            return sample.clone();
        }
        Sample::from_pairs(
            sample.label.clone(),
            sample.pairs().map(|(p, s)| (self.apply(p), self.apply(s))),
        )
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Identity => write!(f, "none"),
            Transform::Log10 => write!(f, "log10"),
            Transform::Ln => write!(f, "ln"),
            Transform::Asinh { cofactor } => write!(f, "asinh:{cofactor}"),
        }
    }
}

impl FromStr for Transform {
    type Err = TransformParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "none" | "identity" | "linear" => Ok(Transform::Identity),
            "log10" | "log" => Ok(Transform::Log10),
            "ln" => Ok(Transform::Ln),
            "asinh" => Ok(Transform::Asinh {
                cofactor: DEFAULT_ASINH_COFACTOR,
            }),
            other => {
                let Some(cofactor) = other.strip_prefix("asinh:") else {
                    return Err(TransformParseError::Unknown(s.to_string()));
                };
                match cofactor.parse::<f64>() {
                    Ok(c) if c.is_finite() && c > 0.0 => Ok(Transform::Asinh { cofactor: c }),
                    _ => Err(TransformParseError::BadCofactor(cofactor.to_string())),
                }
            }
        }
    }
}

impl TryFrom<String> for Transform {
    type Error = TransformParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Transform> for String {
    fn from(value: Transform) -> Self {
        value.to_string()
    }
}
