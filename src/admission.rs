use serde::Serialize;

use crate::pokeapi::VariantDetail;

/// Cosmetic and special variants that are never ingested as forms.
pub fn default_exclusions() -> Vec<String> {
    [
        "pikachu-",
        "-starter",
        "-totem",
        "koraidon-",
        "miraidon-",
        "-power-construct",
        "-meteor",
        "-eternamax",
        "-dada",
    ]
    .iter()
    .map(|value| value.to_string())
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Admission {
    Accepted,
    BattleOnly,
    Excluded { pattern: String },
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accepted)
    }

    pub fn reason(&self) -> Option<String> {
        match self {
            Admission::Accepted => None,
            Admission::BattleOnly => Some("battle-only form".to_string()),
            Admission::Excluded { pattern } => Some(format!("excluded by pattern {pattern:?}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdmissionFilter {
    exclusions: Vec<String>,
}

impl AdmissionFilter {
    pub fn new(exclusions: Vec<String>) -> Self {
        Self { exclusions }
    }

    pub fn exclusions(&self) -> &[String] {
        &self.exclusions
    }

    pub fn admit(&self, variant: &VariantDetail) -> Admission {
        self.decide(variant.is_battle_only, &variant.name)
    }

    pub fn decide(&self, is_battle_only: bool, name: &str) -> Admission {
        if is_battle_only {
            return Admission::BattleOnly;
        }
        match self
            .exclusions
            .iter()
            .find(|pattern| name.contains(pattern.as_str()))
        {
            Some(pattern) => Admission::Excluded {
                pattern: pattern.clone(),
            },
            None => Admission::Accepted,
        }
    }
}

impl Default for AdmissionFilter {
    fn default() -> Self {
        Self::new(default_exclusions())
    }
}
