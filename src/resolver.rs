// 🔎 Identifier Resolver - maps loose identifiers onto model entities
//
// Resolution order:
// 1. Exact id match
// 2. "primary" / "primary_income" / empty → primary income (income only)
// 3. Slug alias match over id + display label
// 4. Debts only: fall back to the expense aliases
//
// Alias tie-break rule: the FIRST entity claiming a slug owns it. Later
// entities with the same slug are reachable only through their exact id.

use crate::model::UnifiedBudgetModel;
use std::collections::HashMap;

/// Lowercase, trim, collapse every non-alphanumeric run into "_", strip
/// leading/trailing "_".
///
/// "Credit Card" → "credit_card", "  Car-Loan #2 " → "car_loan_2"
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut pending_separator = false;

    for ch in label.trim().to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(ch);
        } else {
            pending_separator = true;
        }
    }

    slug
}

// ============================================================================
// DEBT RESOLUTION
// ============================================================================

/// Outcome of resolving a debt identifier.
///
/// At most one of `debt` / `expense` is set. `expense` is populated only by
/// the cross-collection fallback; callers must treat a debt-shaped answer
/// that landed on an expense as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebtResolution {
    pub debt: Option<usize>,
    pub expense: Option<usize>,
    /// Slug of the identifier that was looked up
    pub normalized_id: String,
}

impl DebtResolution {
    pub fn is_debt(&self) -> bool {
        self.debt.is_some()
    }

    pub fn is_expense_only(&self) -> bool {
        self.debt.is_none() && self.expense.is_some()
    }
}

// ============================================================================
// RESOLVER CONTEXT
// ============================================================================

/// Lookup tables built once per validation batch from one snapshot.
/// Holds indices into the snapshot's collections.
#[derive(Debug)]
pub struct ResolverContext<'a> {
    model: &'a UnifiedBudgetModel,
    primary_income: Option<usize>,

    income_by_id: HashMap<&'a str, usize>,
    income_by_alias: HashMap<String, usize>,

    expense_by_id: HashMap<&'a str, usize>,
    expense_by_alias: HashMap<String, usize>,

    debt_by_id: HashMap<&'a str, usize>,
    debt_by_alias: HashMap<String, usize>,
}

impl<'a> ResolverContext<'a> {
    pub fn new(model: &'a UnifiedBudgetModel) -> Self {
        let (income_by_id, income_by_alias) =
            build_lookups(model.income.iter().map(|i| (i.id.as_str(), i.name.as_str())));
        let (expense_by_id, expense_by_alias) = build_lookups(
            model.expenses.iter().map(|e| (e.id.as_str(), e.category.as_str())),
        );
        let (debt_by_id, debt_by_alias) =
            build_lookups(model.debts.iter().map(|d| (d.id.as_str(), d.name.as_str())));

        ResolverContext {
            model,
            primary_income: model.primary_income_index(),
            income_by_id,
            income_by_alias,
            expense_by_id,
            expense_by_alias,
            debt_by_id,
            debt_by_alias,
        }
    }

    pub fn model(&self) -> &'a UnifiedBudgetModel {
        self.model
    }

    /// Empty identifier and "primary"/"primary_income" resolve to the
    /// primary income; an exact id always wins over the "primary" keyword.
    pub fn resolve_income(&self, identifier: &str) -> Option<usize> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return self.primary_income;
        }
        if let Some(&index) = self.income_by_id.get(identifier) {
            return Some(index);
        }

        let slug = slugify(identifier);
        if slug == "primary" || slug == "primary_income" {
            return self.primary_income;
        }
        self.income_by_alias.get(&slug).copied()
    }

    pub fn resolve_expense(&self, identifier: &str) -> Option<usize> {
        lookup(&self.expense_by_id, &self.expense_by_alias, identifier)
    }

    /// Debt lookup with the expense-alias fallback
    pub fn resolve_debt(&self, identifier: &str) -> DebtResolution {
        let normalized_id = slugify(identifier);

        if let Some(index) = lookup(&self.debt_by_id, &self.debt_by_alias, identifier) {
            return DebtResolution {
                debt: Some(index),
                expense: None,
                normalized_id,
            };
        }

        let expense = if normalized_id.is_empty() {
            None
        } else {
            self.expense_by_alias.get(&normalized_id).copied()
        };

        DebtResolution {
            debt: None,
            expense,
            normalized_id,
        }
    }
}

/// Exact-id table plus first-seen-wins alias table.
/// Entities without an id are skipped entirely.
fn build_lookups<'a>(
    entries: impl Iterator<Item = (&'a str, &'a str)>,
) -> (HashMap<&'a str, usize>, HashMap<String, usize>) {
    let mut by_id = HashMap::new();
    let mut by_alias = HashMap::new();

    for (index, (id, label)) in entries.enumerate() {
        if id.is_empty() {
            continue;
        }
        by_id.entry(id).or_insert(index);

        for candidate in [id, label] {
            let slug = slugify(candidate);
            if !slug.is_empty() {
                by_alias.entry(slug).or_insert(index);
            }
        }
    }

    (by_id, by_alias)
}

fn lookup(
    by_id: &HashMap<&str, usize>,
    by_alias: &HashMap<String, usize>,
    identifier: &str,
) -> Option<usize> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return None;
    }
    if let Some(&index) = by_id.get(identifier) {
        return Some(index);
    }

    let slug = slugify(identifier);
    if slug.is_empty() {
        return None;
    }
    by_alias.get(&slug).copied()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Debt, Expense, Income};

    fn sample_model() -> UnifiedBudgetModel {
        UnifiedBudgetModel::new()
            .with_income(Income::new("side", "Side Gig", 800.0))
            .with_income(Income::new("salary", "Primary Job", 4200.0))
            .with_expense(Expense::new("housing", "Housing", 1800.0))
            .with_expense(Expense::new("subs", "Subscription", 45.0))
            .with_debt(Debt::new("debt-1", "Credit Card", 3000.0))
            .with_debt(Debt::new("loan-a", "Loan", 9000.0))
            .with_debt(Debt::new("loan-b", "Loan", 4000.0))
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Credit Card"), "credit_card");
        assert_eq!(slugify("  Car-Loan #2 "), "car_loan_2");
        assert_eq!(slugify("debt-1"), "debt_1");
        assert_eq!(slugify("__Housing__"), "housing");
        assert_eq!(slugify("Rent & Utilities"), "rent_utilities");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_income_empty_and_primary_keywords() {
        let model = sample_model();
        let ctx = ResolverContext::new(&model);

        assert_eq!(ctx.resolve_income(""), Some(1));
        assert_eq!(ctx.resolve_income("primary"), Some(1));
        assert_eq!(ctx.resolve_income("Primary Income"), Some(1));
        assert_eq!(ctx.resolve_income("side"), Some(0));
        assert_eq!(ctx.resolve_income("Side Gig"), Some(0));
        assert_eq!(ctx.resolve_income("bonus"), None);
    }

    #[test]
    fn test_exact_income_id_beats_primary_keyword() {
        let model = UnifiedBudgetModel::new()
            .with_income(Income::new("primary", "Rental", 500.0))
            .with_income(Income::new("salary", "Salary", 4000.0));
        let ctx = ResolverContext::new(&model);

        assert_eq!(ctx.resolve_income("primary"), Some(0));
        assert_eq!(ctx.resolve_income("primary_income"), Some(1));
    }

    #[test]
    fn test_expense_alias_lookup() {
        let model = sample_model();
        let ctx = ResolverContext::new(&model);

        assert_eq!(ctx.resolve_expense("housing"), Some(0));
        assert_eq!(ctx.resolve_expense("HOUSING"), Some(0));
        assert_eq!(ctx.resolve_expense("subscription"), Some(1));
        assert_eq!(ctx.resolve_expense(""), None);
        assert_eq!(ctx.resolve_expense("travel"), None);
    }

    #[test]
    fn test_alias_first_seen_wins() {
        let model = sample_model();
        let ctx = ResolverContext::new(&model);

        // Both debts are named "Loan": the alias belongs to the first
        assert_eq!(ctx.resolve_debt("loan").debt, Some(1));
        assert_eq!(ctx.resolve_debt("Loan").debt, Some(1));
        // The second is reachable by exact id only
        assert_eq!(ctx.resolve_debt("loan-b").debt, Some(2));
    }

    #[test]
    fn test_debt_alias_from_id_slug() {
        let model = sample_model();
        let ctx = ResolverContext::new(&model);

        assert_eq!(ctx.resolve_debt("debt-1").debt, Some(0));
        assert_eq!(ctx.resolve_debt("debt_1").debt, Some(0));
        assert_eq!(ctx.resolve_debt("credit card").debt, Some(0));
    }

    #[test]
    fn test_debt_falls_back_to_expense_alias() {
        let model = sample_model();
        let ctx = ResolverContext::new(&model);

        let resolution = ctx.resolve_debt("subscription");
        assert!(!resolution.is_debt());
        assert!(resolution.is_expense_only());
        assert_eq!(resolution.expense, Some(1));
        assert_eq!(resolution.normalized_id, "subscription");

        let missing = ctx.resolve_debt("mortgage");
        assert_eq!(missing.debt, None);
        assert_eq!(missing.expense, None);
    }

    #[test]
    fn test_entities_without_id_are_skipped() {
        let model = UnifiedBudgetModel::new()
            .with_expense(Expense::new("", "Housing", 1800.0))
            .with_expense(Expense::new("rent", "Housing", 1200.0));
        let ctx = ResolverContext::new(&model);

        assert_eq!(ctx.resolve_expense("housing"), Some(1));
    }
}
