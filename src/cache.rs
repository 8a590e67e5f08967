//! The local copy of the user's transactions.
//!
//! The service is the system of record. `TransactionCache` fills itself with a full `list()` and,
//! after every successful create or delete, throws its contents away and fetches them again. It
//! never patches itself. If a call fails, the cached transactions are left exactly as they were.

use crate::aggregate::{Summary, SummaryCache};
use crate::api::{Repository, Token};
use crate::error::{ApiError, ApiResult, MutationError};
use crate::model::{Transaction, TransactionDraft, TransactionId};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Proof that the user explicitly agreed to delete something. Only an interactive confirmation
/// or an explicit `--yes` flag should produce one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation(());

impl Confirmation {
    /// The user answered yes to "Are you sure you want to delete this?".
    pub fn confirmed_by_user() -> Self {
        Self(())
    }
}

pub struct TransactionCache {
    repository: Arc<dyn Repository>,
    transactions: Vec<Transaction>,
    generation: u64,
    submitted: HashSet<Uuid>,
    summaries: SummaryCache,
}

impl TransactionCache {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self {
            repository,
            transactions: Vec::new(),
            generation: 0,
            submitted: HashSet::new(),
            summaries: SummaryCache::default(),
        }
    }

    /// The cached transactions in the order the service listed them.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Changes every time the contents are replaced, including by `clear`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// The dashboard figures for the cached transactions. Recomputed only when the contents or
    /// `recent` change.
    pub fn summary(&mut self, recent: usize) -> &Summary {
        self.summaries
            .get(self.generation, &self.transactions, recent)
    }

    /// Replaces the contents with a fresh listing from the service.
    pub async fn resync(&mut self, token: &Token) -> ApiResult<()> {
        let transactions = self.repository.list(token).await?;
        debug!(
            "Resynced {} transactions (generation {})",
            transactions.len(),
            self.generation + 1
        );
        self.replace(transactions);
        Ok(())
    }

    /// Creates a transaction from `draft` and then resyncs.
    ///
    /// A draft whose submission key has already been persisted through this cache is refused with
    /// `Validation`, so submitting the same form twice records one transaction. If the create
    /// succeeds but the resync fails, `MutationError::Resync` is returned and the contents stay as
    /// they were before the call.
    pub async fn create(
        &mut self,
        token: &Token,
        draft: &TransactionDraft,
    ) -> Result<Transaction, MutationError> {
        draft.validate()?;
        if self.submitted.contains(&draft.submission_key()) {
            return Err(MutationError::Rejected(ApiError::Validation(
                "This transaction has already been submitted".into(),
            )));
        }

        let created = self.repository.create(token, draft).await?;
        self.submitted.insert(draft.submission_key());
        info!(
            "Added transaction {} ({} {})",
            created.id(),
            created.amount(),
            created.category()
        );
        self.resync(token).await.map_err(MutationError::Resync)?;
        Ok(created)
    }

    /// Deletes the transaction `id` and then resyncs. On `NotFound`, or any other failure, the
    /// contents are unchanged.
    pub async fn delete(
        &mut self,
        token: &Token,
        id: &TransactionId,
        _confirmation: Confirmation,
    ) -> Result<(), MutationError> {
        self.repository.delete(token, id).await?;
        info!("Deleted transaction {id}");
        self.resync(token).await.map_err(MutationError::Resync)
    }

    /// Forgets everything, e.g. after the user logs out.
    pub fn clear(&mut self) {
        if !self.transactions.is_empty() || !self.submitted.is_empty() {
            debug!("Clearing the transaction cache");
        }
        self.submitted.clear();
        self.replace(Vec::new());
    }

    fn replace(&mut self, transactions: Vec<Transaction>) {
        self.transactions = transactions;
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AuthApi, Credentials, TestRemote, DEMO_PASSWORD, DEMO_USERNAME};
    use crate::model::{Amount, Category};
    use chrono::NaiveDate;
    use std::str::FromStr;

    async fn setup() -> (TestRemote, TransactionCache, Token) {
        let remote = TestRemote::seeded().unwrap();
        let token = remote
            .sign_in(&Credentials::new(DEMO_USERNAME, DEMO_PASSWORD))
            .await
            .unwrap();
        let mut cache = TransactionCache::new(Arc::new(remote.clone()));
        cache.resync(&token).await.unwrap();
        (remote, cache, token)
    }

    fn draft(amount: &str, description: &str) -> TransactionDraft {
        TransactionDraft::new(
            Amount::from_str(amount).unwrap(),
            description,
            Category::Health,
            NaiveDate::from_str("2024-04-02").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_resync_fills_cache() {
        let (_, cache, _) = setup().await;
        assert_eq!(cache.len(), 12);
        assert_eq!(cache.generation(), 1);
    }

    #[tokio::test]
    async fn test_create_resyncs() {
        let (remote, mut cache, token) = setup().await;
        let created = cache.create(&token, &draft("15", "Vitamins")).await.unwrap();
        assert_eq!(cache.len(), 13);
        assert_eq!(cache.transactions().last(), Some(&created));
        assert_eq!(cache.generation(), 2);
        assert_eq!(
            cache.transactions(),
            remote.transactions_of(DEMO_USERNAME).await.as_slice()
        );
    }

    #[tokio::test]
    async fn test_create_invalid_draft_leaves_cache() {
        let (remote, mut cache, token) = setup().await;
        let result = cache.create(&token, &draft("0", "Nothing")).await;
        assert!(matches!(
            result,
            Err(MutationError::Rejected(ApiError::Validation(_)))
        ));
        assert_eq!(cache.len(), 12);
        assert_eq!(cache.generation(), 1);
        assert_eq!(remote.transactions_of(DEMO_USERNAME).await.len(), 12);
    }

    #[tokio::test]
    async fn test_double_submission_is_refused() {
        let (remote, mut cache, token) = setup().await;
        let draft = draft("15", "Vitamins");
        cache.create(&token, &draft).await.unwrap();
        let again = cache.create(&token, &draft.clone()).await;
        assert!(matches!(
            again,
            Err(MutationError::Rejected(ApiError::Validation(_)))
        ));
        assert_eq!(remote.transactions_of(DEMO_USERNAME).await.len(), 13);
        assert_eq!(cache.len(), 13);
    }

    #[tokio::test]
    async fn test_identical_but_separate_drafts_are_both_kept() {
        let (_, mut cache, token) = setup().await;
        cache.create(&token, &draft("3", "Coffee")).await.unwrap();
        cache.create(&token, &draft("3", "Coffee")).await.unwrap();
        assert_eq!(cache.len(), 14);
    }

    #[tokio::test]
    async fn test_delete_missing_leaves_cache() {
        let (_, mut cache, token) = setup().await;
        let before = cache.transactions().to_vec();
        let id = TransactionId::from("404");
        let result = cache
            .delete(&token, &id, Confirmation::confirmed_by_user())
            .await;
        assert_eq!(result, Err(MutationError::Rejected(ApiError::NotFound(id))));
        assert_eq!(cache.transactions(), before.as_slice());
        assert_eq!(cache.generation(), 1);
    }

    #[tokio::test]
    async fn test_delete_resyncs() {
        let (_, mut cache, token) = setup().await;
        let id = cache.transactions()[0].id().clone();
        cache
            .delete(&token, &id, Confirmation::confirmed_by_user())
            .await
            .unwrap();
        assert_eq!(cache.len(), 11);
        assert!(cache.transactions().iter().all(|t| t.id() != &id));
    }

    #[tokio::test]
    async fn test_failed_resync_after_create_keeps_old_contents() {
        let (remote, mut cache, token) = setup().await;
        let before = cache.transactions().to_vec();

        remote
            .fail_next_list(ApiError::Network("offline".into()))
            .await;
        let result = cache.create(&token, &draft("15", "Vitamins")).await;
        assert!(matches!(result, Err(MutationError::Resync(ApiError::Network(_)))));
        assert_eq!(cache.transactions(), before.as_slice());
        assert_eq!(remote.transactions_of(DEMO_USERNAME).await.len(), 13);

        cache.resync(&token).await.unwrap();
        assert_eq!(cache.len(), 13);
    }

    #[tokio::test]
    async fn test_failed_resync_after_delete_is_reported_as_resync() {
        let (remote, mut cache, token) = setup().await;
        let id = cache.transactions()[0].id().clone();

        remote
            .fail_next_list(ApiError::Network("offline".into()))
            .await;
        let result = cache
            .delete(&token, &id, Confirmation::confirmed_by_user())
            .await;
        assert_eq!(
            result,
            Err(MutationError::Resync(ApiError::Network("offline".into())))
        );
        assert_eq!(cache.len(), 12);
        assert_eq!(remote.transactions_of(DEMO_USERNAME).await.len(), 11);
    }

    #[tokio::test]
    async fn test_network_failure_on_create_leaves_cache() {
        let (remote, mut cache, token) = setup().await;
        remote.fail_next(ApiError::Network("offline".into())).await;
        let draft = draft("15", "Vitamins");
        let result = cache.create(&token, &draft).await;
        assert!(matches!(result, Err(MutationError::Rejected(ApiError::Network(_)))));
        assert_eq!(cache.len(), 12);

        // Nothing was persisted, so the same draft can be submitted again.
        cache.create(&token, &draft).await.unwrap();
        assert_eq!(cache.len(), 13);
    }

    #[tokio::test]
    async fn test_summary_is_reused_until_contents_change() {
        let (_, mut cache, token) = setup().await;
        let first = cache.summary(5).clone();
        assert_eq!(first.count(), 12);
        assert_eq!(cache.summary(5), &first);

        cache.create(&token, &draft("15", "Vitamins")).await.unwrap();
        let second = cache.summary(5).clone();
        assert_eq!(second.count(), 13);
        assert_eq!(second.recent()[0].description(), "Vitamins");
    }

    #[tokio::test]
    async fn test_clear() {
        let (_, mut cache, _) = setup().await;
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.generation(), 2);
        assert_eq!(cache.summary(5).count(), 0);
    }
}
