use crate::api::Remote;
use crate::commands::{ready_gate, Out};
use crate::model::Transaction;
use crate::{Config, Result};

/// Lists every transaction, newest first.
pub async fn list(config: &Config, remote: &Remote) -> Result<Out<Vec<Transaction>>> {
    let gate = ready_gate(config, remote).await?;
    let newest_first: Vec<Transaction> =
        gate.cache().transactions().iter().rev().cloned().collect();

    let mut message = format!("{} Item(s)", newest_first.len());
    for transaction in &newest_first {
        message.push('\n');
        message.push_str(&format_line(transaction));
    }
    Ok(Out::new(message, newest_first))
}

/// One transaction as a line of text, e.g. `#7  2024-01-10  FOOD  Groceries  -$50.00`.
pub(crate) fn format_line(transaction: &Transaction) -> String {
    format!(
        "#{:<5} {}  {:<13} {:<32} {:>12}",
        transaction.id(),
        transaction.date(),
        transaction.category(),
        transaction.description(),
        transaction.amount().as_expense()
    )
}
