//! Spending analytics derived from a collection of transactions.
//!
//! Every function here is a pure function of its input and never fails: an empty collection
//! produces zero totals and empty series, and sums too large for a `Decimal` saturate rather than
//! overflow. Amounts are taken as the service reports them, including any that are not positive.
//! Views are recomputed from the full collection each time; the only memoization is
//! [`SummaryCache`], which skips recomputation while the underlying collection is the same one it
//! last saw.

use crate::model::{Amount, Category, Transaction};
use chrono::Datelike;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

/// Three-letter month labels, January first.
pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Sums the amount of every transaction.
pub fn total_spent(transactions: &[Transaction]) -> Amount {
    transactions.iter().map(Transaction::amount).sum()
}

/// Per-category totals, in the order each category first appears in the input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CategoryTotals(Vec<(Category, Amount)>);

impl CategoryTotals {
    pub fn get(&self, category: Category) -> Option<Amount> {
        self.0
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, amount)| *amount)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Category, Amount)> {
        self.0.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = Amount> + '_ {
        self.0.iter().map(|(_, amount)| *amount)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<(Category, Amount)> {
        self.0
    }
}

/// Sums amounts by category. Iteration order is first-seen order.
pub fn category_totals(transactions: &[Transaction]) -> CategoryTotals {
    let mut totals: Vec<(Category, Amount)> = Vec::new();
    for transaction in transactions {
        match totals
            .iter_mut()
            .find(|(category, _)| *category == transaction.category())
        {
            Some((_, total)) => *total += transaction.amount(),
            None => totals.push((transaction.category(), transaction.amount())),
        }
    }
    CategoryTotals(totals)
}

/// Category totals ordered by total, largest first. Categories with equal totals keep their
/// first-seen order.
pub fn sorted_category_breakdown(transactions: &[Transaction]) -> Vec<(Category, Amount)> {
    let mut breakdown = category_totals(transactions).into_vec();
    // `sort_by` is stable, which is what keeps ties in first-seen order.
    breakdown.sort_by(|(_, a), (_, b)| b.cmp(a));
    breakdown
}

/// The total for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthTotal {
    month: &'static str,
    total: Amount,
}

impl MonthTotal {
    pub fn new(month: &'static str, total: Amount) -> Self {
        Self { month, total }
    }

    pub fn month(&self) -> &'static str {
        self.month
    }

    pub fn total(&self) -> Amount {
        self.total
    }
}

/// Sums amounts by calendar month, ordered Jan through Dec, omitting months with no transactions.
///
/// Years are not distinguished: March 2023 and March 2024 land in the same `Mar` bucket. This
/// matches the monthly overview chart of the dashboard, which shows at most twelve bars.
pub fn monthly_series(transactions: &[Transaction]) -> Vec<MonthTotal> {
    let mut buckets: [Option<Amount>; 12] = [None; 12];
    for transaction in transactions {
        let bucket = &mut buckets[transaction.date().month0() as usize];
        *bucket = Some(bucket.unwrap_or_default() + transaction.amount());
    }

    MONTHS
        .into_iter()
        .zip(buckets)
        .filter_map(|(month, total)| total.map(|total| MonthTotal::new(month, total)))
        .collect()
}

/// The `n` most recently added transactions, newest first. The service lists transactions in the
/// order they were added, so the newest is the last element of the input.
pub fn recent_transactions(transactions: &[Transaction], n: usize) -> Vec<&Transaction> {
    transactions.iter().rev().take(n).collect()
}

/// Returns `amount` as a percentage of `total`, for sizing breakdown bars. A zero total yields 0.
pub fn percent_of_total(amount: Amount, total: Amount) -> f64 {
    if total.is_zero() {
        return 0.0;
    }
    let exact = amount
        .value()
        .checked_div(total.value())
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED));
    match exact {
        Some(percent) => percent.round_dp(2).to_f64().unwrap_or_default(),
        None => {
            let ratio = amount.value().to_f64().unwrap_or_default()
                / total.value().to_f64().unwrap_or(1.0);
            (ratio * 100.0 * 100.0).round() / 100.0
        }
    }
}

/// One row of the category breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryShare {
    category: Category,
    total: Amount,
    percent: f64,
}

impl CategoryShare {
    pub fn category(&self) -> Category {
        self.category
    }

    pub fn total(&self) -> Amount {
        self.total
    }

    /// Share of the overall total, from 0 to 100.
    pub fn percent(&self) -> f64 {
        self.percent
    }
}

/// Everything the dashboard shows, derived in one pass over the transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    count: usize,
    total_spent: Amount,
    breakdown: Vec<CategoryShare>,
    monthly: Vec<MonthTotal>,
    recent: Vec<Transaction>,
}

impl Summary {
    pub fn compute(transactions: &[Transaction], recent: usize) -> Self {
        let total = total_spent(transactions);
        let breakdown = sorted_category_breakdown(transactions)
            .into_iter()
            .map(|(category, amount)| CategoryShare {
                category,
                total: amount,
                percent: percent_of_total(amount, total),
            })
            .collect();
        Self {
            count: transactions.len(),
            total_spent: total,
            breakdown,
            monthly: monthly_series(transactions),
            recent: recent_transactions(transactions, recent)
                .into_iter()
                .cloned()
                .collect(),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn total_spent(&self) -> Amount {
        self.total_spent
    }

    pub fn breakdown(&self) -> &[CategoryShare] {
        &self.breakdown
    }

    pub fn monthly(&self) -> &[MonthTotal] {
        &self.monthly
    }

    pub fn recent(&self) -> &[Transaction] {
        &self.recent
    }
}

/// Holds the last computed `Summary` and hands it back while the collection it was computed from
/// has not changed. Identity is the cache generation, which changes on every refetch.
#[derive(Debug, Default)]
pub struct SummaryCache {
    key: Option<(u64, usize)>,
    summary: Option<Summary>,
}

impl SummaryCache {
    pub fn get(
        &mut self,
        generation: u64,
        transactions: &[Transaction],
        recent: usize,
    ) -> &Summary {
        let key = (generation, recent);
        if self.key != Some(key) {
            self.key = Some(key);
            self.summary = None;
        }
        self.summary
            .get_or_insert_with(|| Summary::compute(transactions, recent))
    }
}
