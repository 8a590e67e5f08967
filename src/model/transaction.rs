use crate::error::{ApiError, ApiResult};
use crate::model::category::deserialize_lenient;
use crate::model::{Amount, Category};
use chrono::{Local, NaiveDate};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

/// The identifier the service assigns to a transaction when it is created. The client never
/// interprets it; the service happens to send numbers but strings are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TransactionId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().to_string()))
    }
}

impl From<&str> for TransactionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for TransactionId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for TransactionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = TransactionId;

            fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str("a numeric or string transaction id")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(TransactionId(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(TransactionId(v.to_string()))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(TransactionId(v.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// Decodes the amount of a stored transaction. The service does not enforce positive amounts on
/// records it already holds, so anything else is kept as-is but logged.
fn deserialize_recorded_amount<'de, D>(deserializer: D) -> Result<Amount, D::Error>
where
    D: Deserializer<'de>,
{
    let amount = Amount::deserialize(deserializer)?;
    if !amount.is_positive() {
        warn!("The service returned a transaction with a non-positive amount ({amount})");
    }
    Ok(amount)
}

/// A single recorded expense, as persisted by the service. Transactions are never edited in
/// place; they are created through the repository and removed through it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    #[serde(deserialize_with = "deserialize_recorded_amount")]
    amount: Amount,
    description: String,
    #[serde(deserialize_with = "deserialize_lenient")]
    category: Category,
    date: NaiveDate,
}

impl Transaction {
    pub fn new(
        id: impl Into<TransactionId>,
        amount: Amount,
        description: impl Into<String>,
        category: Category,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            amount,
            description: description.into(),
            category,
            date,
        }
    }

    /// Creates the persisted form of `draft` once the service has assigned it an `id`.
    pub(crate) fn from_draft(id: impl Into<TransactionId>, draft: &TransactionDraft) -> Self {
        Self::new(
            id,
            draft.amount,
            draft.description.clone(),
            draft.category,
            draft.date,
        )
    }

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

/// The data a user enters to record a new expense.
///
/// Each draft carries a submission key generated when the draft is built. Submitting the same
/// draft twice reuses the key, which lets the cache (and a service that honours the
/// `Idempotency-Key` header) recognize a double submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionDraft {
    amount: Amount,
    description: String,
    category: Category,
    date: NaiveDate,
    #[serde(skip)]
    submission_key: Uuid,
}

impl TransactionDraft {
    pub fn new(
        amount: Amount,
        description: impl Into<String>,
        category: Category,
        date: NaiveDate,
    ) -> Self {
        Self {
            amount,
            description: description.into().trim().to_string(),
            category,
            date,
            submission_key: Uuid::new_v4(),
        }
    }

    /// A draft with the form defaults: category `FOOD`, dated today.
    pub fn with_defaults(amount: Amount, description: impl Into<String>) -> Self {
        Self::new(
            amount,
            description,
            Category::default(),
            Local::now().date_naive(),
        )
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn submission_key(&self) -> Uuid {
        self.submission_key
    }

    /// Checks the rules the service enforces on create. Category and date are valid by
    /// construction.
    pub fn validate(&self) -> ApiResult<()> {
        if !self.amount.is_positive() {
            return Err(ApiError::Validation(format!(
                "Amount must be greater than zero, got {}",
                self.amount
            )));
        }
        if self.description.is_empty() {
            return Err(ApiError::Validation("Description is required".into()));
        }
        Ok(())
    }

    /// Returns true if `transaction` holds exactly the data of this draft.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        transaction.amount.value() == self.amount.value()
            && transaction.description == self.description
            && transaction.category == self.category
            && transaction.date == self.date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    #[test]
    fn test_deserialize_wire_shape() {
        let json = r#"{
            "id": 42,
            "amount": 12.5,
            "description": "Lunch",
            "category": "FOOD",
            "date": "2024-01-10",
            "user": null
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.id().as_str(), "42");
        assert_eq!(tx.amount(), amount("12.50"));
        assert_eq!(tx.description(), "Lunch");
        assert_eq!(tx.category(), Category::Food);
        assert_eq!(tx.date(), date("2024-01-10"));
    }

    #[test]
    fn test_deserialize_keeps_non_positive_amount() {
        let json = r#"{"id": 7, "amount": -4.5, "description": "Refund",
            "category": "OTHER", "date": "2024-05-01"}"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.amount(), amount("-4.5"));
        assert!(!tx.amount().is_positive());
    }

    #[test]
    fn test_deserialize_unknown_category() {
        let json = r#"{"id":"a1","amount":3,"description":"Gift","category":"GIFTS","date":"2024-05-01"}"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.category(), Category::Other);
    }

    #[test]
    fn test_deserialize_bad_date() {
        let json = r#"{"id":1,"amount":3,"description":"x","category":"FOOD","date":"2024-13-01"}"#;
        assert!(serde_json::from_str::<Transaction>(json).is_err());
    }

    #[test]
    fn test_draft_serializes_without_key() {
        let draft = TransactionDraft::new(
            amount("20"),
            "Bus pass",
            Category::Transport,
            date("2024-01-20"),
        );
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "amount": 20.0,
                "description": "Bus pass",
                "category": "TRANSPORT",
                "date": "2024-01-20"
            })
        );
    }

    #[test]
    fn test_validate_rejects_zero_amount() {
        let draft = TransactionDraft::with_defaults(Amount::ZERO, "Nothing");
        assert!(matches!(draft.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_negative_amount() {
        let draft = TransactionDraft::with_defaults(amount("-4"), "Refund");
        assert!(matches!(draft.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_blank_description() {
        let draft = TransactionDraft::with_defaults(amount("4"), "   ");
        assert_eq!(
            draft.validate(),
            Err(ApiError::Validation("Description is required".into()))
        );
    }

    #[test]
    fn test_with_defaults() {
        let draft = TransactionDraft::with_defaults(amount("4"), " Coffee ");
        assert_eq!(draft.category(), Category::Food);
        assert_eq!(draft.description(), "Coffee");
        assert_eq!(draft.date(), Local::now().date_naive());
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_clone_keeps_submission_key() {
        let draft = TransactionDraft::with_defaults(amount("4"), "Coffee");
        let again = TransactionDraft::with_defaults(amount("4"), "Coffee");
        assert_eq!(draft.clone().submission_key(), draft.submission_key());
        assert_ne!(again.submission_key(), draft.submission_key());
    }

    #[test]
    fn test_matches() {
        let draft = TransactionDraft::new(
            amount("9.5"),
            "Movie",
            Category::Entertainment,
            date("2024-02-02"),
        );
        let tx = Transaction::from_draft(7u64, &draft);
        assert!(draft.matches(&tx));
        let other = Transaction::new(
            8u64,
            amount("9.50"),
            "Movie",
            Category::Other,
            date("2024-02-02"),
        );
        assert!(!draft.matches(&other));
    }
}
