// 💳 Debt Entity - balances, rates and minimum payments
//
// `name` is the display label and the alias source.
// Debt attributes are addressed two ways by field_ids:
// - legacy suffix form:  "<debt id>_interest_rate"
// - dot-path form:       "debts.<debt id>.interest_rate"
// Both forms land on the same DebtField locator.

use super::{choice, non_empty_str, number, one_of, strict_bool};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// DEBT PRIORITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl DebtPriority {
    const OPTIONS: [(&'static str, DebtPriority); 3] = [
        ("high", DebtPriority::High),
        ("medium", DebtPriority::Medium),
        ("low", DebtPriority::Low),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DebtPriority::High => "high",
            DebtPriority::Medium => "medium",
            DebtPriority::Low => "low",
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        choice(value, &Self::OPTIONS)
    }
}

// ============================================================================
// DEBT ENTITY
// ============================================================================

/// A scheduled rate change (e.g., promotional APR ending).
/// Either half may be unset while the user is still answering questions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RateChange {
    #[serde(default)]
    pub date: Option<String>,

    #[serde(default)]
    pub new_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    /// Stable identity (e.g., "debt-1")
    #[serde(default)]
    pub id: String,

    /// Display label (e.g., "Visa", "Car Loan")
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub balance: f64,

    /// Annual percentage rate
    #[serde(default)]
    pub interest_rate: f64,

    #[serde(default)]
    pub min_payment: f64,

    #[serde(default)]
    pub priority: DebtPriority,

    /// Values are user estimates, not statement figures
    #[serde(default)]
    pub approximate: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rate_changes: Vec<RateChange>,
}

impl Debt {
    pub fn new(id: impl Into<String>, name: impl Into<String>, balance: f64) -> Self {
        Debt {
            id: id.into(),
            name: name.into(),
            balance,
            interest_rate: 0.0,
            min_payment: 0.0,
            priority: DebtPriority::default(),
            approximate: false,
            rate_changes: Vec::new(),
        }
    }

    /// Builder: set rate and minimum payment
    pub fn with_terms(mut self, interest_rate: f64, min_payment: f64) -> Self {
        self.interest_rate = interest_rate;
        self.min_payment = min_payment;
        self
    }

    /// Interest rate and minimum payment are both populated
    pub fn has_terms(&self) -> bool {
        self.interest_rate != 0.0 && self.min_payment != 0.0
    }

    /// First scheduled rate change, created empty if absent
    fn first_rate_change_mut(&mut self) -> &mut RateChange {
        if self.rate_changes.is_empty() {
            self.rate_changes.push(RateChange::default());
        }
        &mut self.rate_changes[0]
    }
}

// ============================================================================
// DEBT ATTRIBUTE LOCATOR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebtField {
    Balance,
    InterestRate,
    MinPayment,
    Priority,
    Approximate,
    RateChangeDate,
    RateChangeNewRate,
}

impl DebtField {
    /// Suffix match order for legacy "<id><suffix>" field_ids.
    /// Rate-change suffixes come first so "_rate_change_new_rate" is never
    /// read as a debt id ending in "_rate_change_new" plus "_rate".
    pub const LEGACY_SUFFIX_ORDER: [DebtField; 7] = [
        DebtField::RateChangeNewRate,
        DebtField::RateChangeDate,
        DebtField::InterestRate,
        DebtField::MinPayment,
        DebtField::Balance,
        DebtField::Priority,
        DebtField::Approximate,
    ];

    /// Attribute name as used in legacy suffixes and error details
    pub fn name(&self) -> &'static str {
        match self {
            DebtField::Balance => "balance",
            DebtField::InterestRate => "interest_rate",
            DebtField::MinPayment => "min_payment",
            DebtField::Priority => "priority",
            DebtField::Approximate => "approximate",
            DebtField::RateChangeDate => "rate_change_date",
            DebtField::RateChangeNewRate => "rate_change_new_rate",
        }
    }

    /// Legacy suffix, e.g. "_min_payment"
    pub fn legacy_suffix(&self) -> String {
        format!("_{}", self.name())
    }

    /// Dot-path segments locating the attribute inside a debt
    pub fn path(&self) -> &'static [&'static str] {
        match self {
            DebtField::Balance => &["balance"],
            DebtField::InterestRate => &["interest_rate"],
            DebtField::MinPayment => &["min_payment"],
            DebtField::Priority => &["priority"],
            DebtField::Approximate => &["approximate"],
            DebtField::RateChangeDate => &["rate_changes", "0", "date"],
            DebtField::RateChangeNewRate => &["rate_changes", "0", "new_rate"],
        }
    }

    /// Exact match against the known attribute paths
    pub fn from_path(path: &[String]) -> Option<Self> {
        Self::LEGACY_SUFFIX_ORDER.into_iter().find(|field| {
            let known = field.path();
            known.len() == path.len() && known.iter().zip(path).all(|(a, b)| *a == b.as_str())
        })
    }

    pub fn expected(&self) -> String {
        match self {
            DebtField::Balance
            | DebtField::InterestRate
            | DebtField::MinPayment
            | DebtField::RateChangeNewRate => "number".to_string(),
            DebtField::Priority => one_of(&["high", "medium", "low"]),
            DebtField::Approximate => "boolean".to_string(),
            DebtField::RateChangeDate => "non-empty string".to_string(),
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            DebtField::Balance
            | DebtField::InterestRate
            | DebtField::MinPayment
            | DebtField::RateChangeNewRate => number(value).is_some(),
            DebtField::Priority => DebtPriority::from_value(value).is_some(),
            DebtField::Approximate => strict_bool(value).is_some(),
            DebtField::RateChangeDate => non_empty_str(value).is_some(),
        }
    }

    /// Store the coerced value. Returns false (and writes nothing) if the
    /// value does not coerce.
    pub fn set(&self, debt: &mut Debt, value: &Value) -> bool {
        match self {
            DebtField::Balance => number(value).map(|n| debt.balance = n).is_some(),
            DebtField::InterestRate => number(value).map(|n| debt.interest_rate = n).is_some(),
            DebtField::MinPayment => number(value).map(|n| debt.min_payment = n).is_some(),
            DebtField::Priority => DebtPriority::from_value(value)
                .map(|p| debt.priority = p)
                .is_some(),
            DebtField::Approximate => strict_bool(value).map(|b| debt.approximate = b).is_some(),
            DebtField::RateChangeDate => match non_empty_str(value) {
                Some(date) => {
                    debt.first_rate_change_mut().date = Some(date.to_string());
                    true
                }
                None => false,
            },
            DebtField::RateChangeNewRate => match number(value) {
                Some(rate) => {
                    debt.first_rate_change_mut().new_rate = Some(rate);
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
