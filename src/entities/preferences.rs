// ⚙️ Preferences - single record steering optimization suggestions

use super::{choice, number, one_of, strict_bool};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationFocus {
    Debt,
    Savings,
    #[default]
    Balanced,
}

impl OptimizationFocus {
    const OPTIONS: [(&'static str, OptimizationFocus); 3] = [
        ("debt", OptimizationFocus::Debt),
        ("savings", OptimizationFocus::Savings),
        ("balanced", OptimizationFocus::Balanced),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizationFocus::Debt => "debt",
            OptimizationFocus::Savings => "savings",
            OptimizationFocus::Balanced => "balanced",
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        choice(value, &Self::OPTIONS)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub optimization_focus: OptimizationFocus,

    #[serde(default = "default_protect_essentials")]
    pub protect_essentials: bool,

    /// Largest fractional change suggested for any single category
    #[serde(default = "default_max_change")]
    pub max_desired_change_per_category: f64,
}

fn default_protect_essentials() -> bool {
    true
}

fn default_max_change() -> f64 {
    0.2
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            optimization_focus: OptimizationFocus::default(),
            protect_essentials: default_protect_essentials(),
            max_desired_change_per_category: default_max_change(),
        }
    }
}

// ============================================================================
// PREFERENCE ATTRIBUTE LOCATOR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceField {
    OptimizationFocus,
    ProtectEssentials,
    MaxDesiredChangePerCategory,
}

impl PreferenceField {
    pub const ALL: [PreferenceField; 3] = [
        PreferenceField::OptimizationFocus,
        PreferenceField::ProtectEssentials,
        PreferenceField::MaxDesiredChangePerCategory,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PreferenceField::OptimizationFocus => "optimization_focus",
            PreferenceField::ProtectEssentials => "protect_essentials",
            PreferenceField::MaxDesiredChangePerCategory => "max_desired_change_per_category",
        }
    }

    /// Look up by the first path segment
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    pub fn expected(&self) -> String {
        match self {
            PreferenceField::OptimizationFocus => one_of(&["debt", "savings", "balanced"]),
            PreferenceField::ProtectEssentials => "boolean".to_string(),
            PreferenceField::MaxDesiredChangePerCategory => "number".to_string(),
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            PreferenceField::OptimizationFocus => OptimizationFocus::from_value(value).is_some(),
            PreferenceField::ProtectEssentials => strict_bool(value).is_some(),
            PreferenceField::MaxDesiredChangePerCategory => number(value).is_some(),
        }
    }

    pub fn set(&self, preferences: &mut Preferences, value: &Value) -> bool {
        match self {
            PreferenceField::OptimizationFocus => OptimizationFocus::from_value(value)
                .map(|focus| preferences.optimization_focus = focus)
                .is_some(),
            PreferenceField::ProtectEssentials => strict_bool(value)
                .map(|b| preferences.protect_essentials = b)
                .is_some(),
            PreferenceField::MaxDesiredChangePerCategory => number(value)
                .map(|n| preferences.max_desired_change_per_category = n)
                .is_some(),
        }
    }
}
