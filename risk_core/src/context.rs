//! Closed vocabularies for the trip context and zone labels.
//!
//! Wire labels match the column values of the trip data set
//! (`dia`, `noite`, ... / `Control`, `Risk`).

use crate::error::RiskError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const FEATURE_SPEED: &str = "speed_kmh";
pub const FEATURE_TIME_OF_DAY: &str = "hora_do_dia";
pub const FEATURE_WEATHER: &str = "clima";

/// Feature order fed to the classifier.
pub const FEATURE_NAMES: [&str; 3] = [FEATURE_SPEED, FEATURE_TIME_OF_DAY, FEATURE_WEATHER];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Dia,
    Noite,
    Crepusculo,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 3] = [TimeOfDay::Dia, TimeOfDay::Noite, TimeOfDay::Crepusculo];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeOfDay::Dia => "dia",
            TimeOfDay::Noite => "noite",
            TimeOfDay::Crepusculo => "crepusculo",
        }
    }

    /// Sampling weight used by the trip generator.
    pub fn weight(self) -> f64 {
        match self {
            TimeOfDay::Dia => 0.6,
            TimeOfDay::Noite => 0.3,
            TimeOfDay::Crepusculo => 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    Limpo,
    Chuva,
    Neblina,
}

impl Weather {
    pub const ALL: [Weather; 3] = [Weather::Limpo, Weather::Chuva, Weather::Neblina];

    pub fn as_str(self) -> &'static str {
        match self {
            Weather::Limpo => "limpo",
            Weather::Chuva => "chuva",
            Weather::Neblina => "neblina",
        }
    }

    /// Sampling weight used by the trip generator.
    pub fn weight(self) -> f64 {
        match self {
            Weather::Limpo => 0.7,
            Weather::Chuva => 0.2,
            Weather::Neblina => 0.1,
        }
    }
}

/// Segment of a trip relative to the risk zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    Control,
    Risk,
}

impl Zone {
    pub fn as_str(self) -> &'static str {
        match self {
            Zone::Control => "Control",
            Zone::Risk => "Risk",
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeOfDay::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| RiskError::InvalidArgument(format!("unknown time of day '{}'", s)))
    }
}

impl FromStr for Weather {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Weather::ALL
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| RiskError::InvalidArgument(format!("unknown weather '{}'", s)))
    }
}

impl FromStr for Zone {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Control" => Ok(Zone::Control),
            "Risk" => Ok(Zone::Risk),
            other => Err(RiskError::InvalidArgument(format!("unknown zone '{}'", other))),
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_parse_back() {
        for t in TimeOfDay::ALL {
            assert_eq!(t.as_str().parse::<TimeOfDay>().unwrap(), t);
        }
        for w in Weather::ALL {
            assert_eq!(w.as_str().parse::<Weather>().unwrap(), w);
        }
        assert_eq!("Risk".parse::<Zone>().unwrap(), Zone::Risk);
    }

    #[test]
    fn test_unknown_label_rejected() {
        assert!(matches!(
            "midday_storm".parse::<TimeOfDay>(),
            Err(RiskError::InvalidArgument(_))
        ));
        assert!("Dia".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_weights_sum_to_one() {
        let t: f64 = TimeOfDay::ALL.iter().map(|t| t.weight()).sum();
        let w: f64 = Weather::ALL.iter().map(|w| w.weight()).sum();
        assert!((t - 1.0).abs() < 1e-12);
        assert!((w - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_serde_uses_wire_labels() {
        assert_eq!(serde_json::to_string(&TimeOfDay::Crepusculo).unwrap(), "\"crepusculo\"");
        assert_eq!(serde_json::to_string(&Weather::Neblina).unwrap(), "\"neblina\"");
        assert_eq!(serde_json::to_string(&Zone::Control).unwrap(), "\"Control\"");
    }
}
