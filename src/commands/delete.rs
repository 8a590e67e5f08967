use crate::api::Remote;
use crate::cache::Confirmation;
use crate::commands::{ready_gate, Out};
use crate::model::TransactionId;
use crate::{Config, Result};
use anyhow::Context;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;

const PROMPT: &str = "Are you sure you want to delete this?";

/// Asks the user to confirm a deletion, unless `yes` already says so. Returns `None` if the user
/// declined.
pub fn confirm_delete(id: &TransactionId, yes: bool) -> Result<Option<Confirmation>> {
    if yes {
        return Ok(Some(Confirmation::confirmed_by_user()));
    }
    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Transaction #{id}: {PROMPT}"))
        .default(false)
        .interact()
        .context("Unable to ask for confirmation, pass --yes to skip the prompt")?;
    Ok(confirmed.then(Confirmation::confirmed_by_user))
}

/// Deletes the transaction `id`.
pub async fn delete(
    config: &Config,
    remote: &Remote,
    id: TransactionId,
    confirmation: Confirmation,
) -> Result<Out<TransactionId>> {
    let mut gate = ready_gate(config, remote).await?;
    gate.delete(&id, confirmation)
        .await
        .with_context(|| format!("Unable to delete transaction #{id}"))?;
    Ok(Out::new(
        format!(
            "Deleted transaction #{id}, {} Item(s) remain",
            gate.cache().len()
        ),
        id,
    ))
}
