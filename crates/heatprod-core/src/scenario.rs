use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Climate-projection pathway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Ssp126,
    Ssp245,
    Ssp370,
    Ssp585,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [Scenario::Ssp126, Scenario::Ssp245, Scenario::Ssp370, Scenario::Ssp585];

    pub fn as_str(self) -> &'static str {
        match self {
            Scenario::Ssp126 => "ssp126",
            Scenario::Ssp245 => "ssp245",
            Scenario::Ssp370 => "ssp370",
            Scenario::Ssp585 => "ssp585",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Scenario::ALL
            .into_iter()
            .find(|sc| sc.as_str() == s)
            .ok_or_else(|| format!("unknown scenario '{s}' (expected one of ssp126, ssp245, ssp370, ssp585)"))
    }
}

/// Heat-stress to productivity-loss function the grids were computed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LossFunction {
    #[default]
    Hothaps,
    Iso,
    Niosh,
}

impl LossFunction {
    pub fn as_str(self) -> &'static str {
        match self {
            LossFunction::Hothaps => "HOTHAPS",
            LossFunction::Iso => "ISO",
            LossFunction::Niosh => "NIOSH",
        }
    }
}

impl fmt::Display for LossFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LossFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HOTHAPS" => Ok(LossFunction::Hothaps),
            "ISO" => Ok(LossFunction::Iso),
            "NIOSH" => Ok(LossFunction::Niosh),
            other => Err(format!("unknown loss function '{other}' (expected HOTHAPS, ISO or NIOSH)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_parse_is_case_insensitive() {
        assert_eq!("SSP245".parse::<Scenario>(), Ok(Scenario::Ssp245));
        assert_eq!(" ssp585 ".parse::<Scenario>(), Ok(Scenario::Ssp585));
        assert!("ssp999".parse::<Scenario>().is_err());
    }

    #[test]
    fn loss_function_parse_and_serde() {
        assert_eq!("niosh".parse::<LossFunction>(), Ok(LossFunction::Niosh));
        assert!("WBGT".parse::<LossFunction>().is_err());
        let json = serde_json::to_string(&LossFunction::Iso).unwrap();
        assert_eq!(json, "\"ISO\"");
        let sc: Scenario = serde_json::from_str("\"ssp370\"").unwrap();
        assert_eq!(sc, Scenario::Ssp370);
    }
}
