use crate::aggregate::total_spent;
use crate::api::Remote;
use crate::commands::{ready_gate, Out};
use crate::model::{Transaction, TransactionDraft};
use crate::{Config, Result};
use anyhow::Context;

/// Records a new transaction and reports the new total.
pub async fn add(
    config: &Config,
    remote: &Remote,
    draft: TransactionDraft,
) -> Result<Out<Transaction>> {
    draft.validate().context("The transaction was not added")?;
    let mut gate = ready_gate(config, remote).await?;
    let created = gate
        .create(&draft)
        .await
        .context("Unable to add the transaction")?;
    let total = total_spent(gate.cache().transactions());
    Ok(Out::new(
        format!(
            "Added '{}' ({}, {}) on {} as #{}. Total spent is now {total}",
            created.description(),
            created.amount().as_expense(),
            created.category(),
            created.date(),
            created.id()
        ),
        created,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::DEMO_USERNAME;
    use crate::error::ApiError;
    use crate::model::{Amount, Category};
    use crate::test::TestEnv;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn draft(amount: &str, description: &str) -> TransactionDraft {
        TransactionDraft::new(
            Amount::from_str(amount).unwrap(),
            description,
            Category::Transport,
            NaiveDate::from_str("2024-04-10").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_add() {
        let env = TestEnv::signed_in().await;
        let out = add(env.config(), &env.remote(), draft("12.5", "Train"))
            .await
            .unwrap();
        let created = out.structure().unwrap();
        assert_eq!(created.id().as_str(), "13");
        // The seeded expenses add up to $602.35.
        assert!(out.message().ends_with("Total spent is now $614.85"), "{}", out.message());
        assert_eq!(
            env.test_remote().transactions_of(DEMO_USERNAME).await.len(),
            13
        );
    }

    #[tokio::test]
    async fn test_add_invalid() {
        let env = TestEnv::signed_in().await;
        let error = add(env.config(), &env.remote(), draft("0", "Train"))
            .await
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<ApiError>(),
            Some(ApiError::Validation(_))
        ));
        assert_eq!(
            env.test_remote().transactions_of(DEMO_USERNAME).await.len(),
            12
        );
    }
}
