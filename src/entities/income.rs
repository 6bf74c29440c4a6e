// 💵 Income Entity - income streams feeding the budget
//
// `name` is a display label AND an alias source for identifier resolution.
// The "primary" income is computed from monthly amounts, never stored.

use super::{choice, non_empty_str, one_of};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// INCOME ENUMS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomeType {
    /// Wages, salary, self-employment
    Earned,
    /// Rent, dividends, interest
    Passive,
    /// Benefits, support, gifts
    Transfer,
}

impl IncomeType {
    const OPTIONS: [(&'static str, IncomeType); 3] = [
        ("earned", IncomeType::Earned),
        ("passive", IncomeType::Passive),
        ("transfer", IncomeType::Transfer),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncomeType::Earned => "earned",
            IncomeType::Passive => "passive",
            IncomeType::Transfer => "transfer",
        }
    }

    /// Case-insensitive parse from a JSON string value
    pub fn from_value(value: &Value) -> Option<Self> {
        choice(value, &Self::OPTIONS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomeStability {
    Stable,
    Variable,
    Seasonal,
}

impl IncomeStability {
    const OPTIONS: [(&'static str, IncomeStability); 3] = [
        ("stable", IncomeStability::Stable),
        ("variable", IncomeStability::Variable),
        ("seasonal", IncomeStability::Seasonal),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncomeStability::Stable => "stable",
            IncomeStability::Variable => "variable",
            IncomeStability::Seasonal => "seasonal",
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        choice(value, &Self::OPTIONS)
    }
}

// ============================================================================
// INCOME ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Income {
    /// Stable identity - exact-match key for field_ids
    #[serde(default)]
    pub id: String,

    /// Display label (e.g., "Salary", "Rental Unit B")
    #[serde(default)]
    pub name: String,

    /// Non-negative monthly amount
    #[serde(default)]
    pub monthly_amount: f64,

    /// None = not yet classified
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub income_type: Option<IncomeType>,

    /// None = not yet classified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stability: Option<IncomeStability>,

    /// Free-form answers (e.g., metadata.net_or_gross = "net")
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Income {
    pub fn new(id: impl Into<String>, name: impl Into<String>, monthly_amount: f64) -> Self {
        Income {
            id: id.into(),
            name: name.into(),
            monthly_amount,
            income_type: None,
            stability: None,
            metadata: Map::new(),
        }
    }

    /// Builder: set income type
    pub fn with_type(mut self, income_type: IncomeType) -> Self {
        self.income_type = Some(income_type);
        self
    }

    /// Builder: set stability
    pub fn with_stability(mut self, stability: IncomeStability) -> Self {
        self.stability = Some(stability);
        self
    }

    /// Both type and stability have been answered
    pub fn is_classified(&self) -> bool {
        self.income_type.is_some() && self.stability.is_some()
    }

    /// Read a metadata value at a nested key path
    pub fn metadata_at(&self, keys: &[String]) -> Option<&Value> {
        let (first, rest) = keys.split_first()?;
        let mut current = self.metadata.get(first)?;
        for key in rest {
            current = current.as_object()?.get(key)?;
        }
        Some(current)
    }

    /// Write a metadata value, creating intermediate objects as needed.
    /// A non-object value sitting on the path is replaced.
    fn set_metadata(&mut self, keys: &[String], value: Value) {
        let Some((last, parents)) = keys.split_last() else {
            return;
        };

        let mut current = &mut self.metadata;
        for key in parents {
            let slot = current
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            current = match slot {
                Value::Object(map) => map,
                _ => return,
            };
        }
        current.insert(last.clone(), value);
    }
}

// ============================================================================
// INCOME ATTRIBUTE LOCATOR
// ============================================================================

/// Attributes of an income that answers may write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomeField {
    Type,
    Stability,
    /// Nested metadata key path (at least one key)
    Metadata(Vec<String>),
}

impl IncomeField {
    /// Map a binding path onto a locator.
    ///
    /// Supported heads: `type`, `stability`, and `metadata` followed by at
    /// least one key. Only the head is significant for type/stability.
    pub fn from_path(path: &[String]) -> Option<Self> {
        match path {
            [head, ..] if head == "type" => Some(IncomeField::Type),
            [head, ..] if head == "stability" => Some(IncomeField::Stability),
            [head, keys @ ..] if head == "metadata" && !keys.is_empty() => {
                Some(IncomeField::Metadata(keys.to_vec()))
            }
            _ => None,
        }
    }

    /// Human-readable expectation for `invalid_type` details
    pub fn expected(&self) -> String {
        match self {
            IncomeField::Type => one_of(&["earned", "passive", "transfer"]),
            IncomeField::Stability => one_of(&["stable", "variable", "seasonal"]),
            IncomeField::Metadata(_) => "non-empty string".to_string(),
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            IncomeField::Type => IncomeType::from_value(value).is_some(),
            IncomeField::Stability => IncomeStability::from_value(value).is_some(),
            IncomeField::Metadata(_) => non_empty_str(value).is_some(),
        }
    }

    /// Store the coerced value. Returns false (and writes nothing) if the
    /// value does not coerce.
    pub fn set(&self, income: &mut Income, value: &Value) -> bool {
        match self {
            IncomeField::Type => match IncomeType::from_value(value) {
                Some(t) => {
                    income.income_type = Some(t);
                    true
                }
                None => false,
            },
            IncomeField::Stability => match IncomeStability::from_value(value) {
                Some(s) => {
                    income.stability = Some(s);
                    true
                }
                None => false,
            },
            IncomeField::Metadata(keys) => match non_empty_str(value) {
                Some(text) => {
                    income.set_metadata(keys, Value::String(text.to_string()));
                    true
                }
                None => false,
            },
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
