use crate::aggregate::Summary;
use crate::api::Remote;
use crate::cache::TransactionCache;
use crate::commands::list::format_line;
use crate::commands::{fetch_error, open_session, Out};
use crate::gate::{ViewGate, ViewState};
use crate::{Config, Result};
use serde::Serialize;

/// What an anonymous user sees.
pub const LANDING: &str = "Master Your Money with AI-Powered Precision

Track expenses effortlessly, visualize your spending habits, and build a secure financial future.

Run 'finmate signup' to start your journey, or 'finmate signin' if you already have an account.";

const BAR_WIDTH: f64 = 20.0;

/// The structured output of the `dashboard` command.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum Dashboard {
    Landing,
    Ready(Summary),
}

/// Shows the landing text when nobody is signed in, otherwise the spending summary with the
/// `recent` most recent transactions.
pub async fn dashboard(config: &Config, remote: &Remote, recent: usize) -> Result<Out<Dashboard>> {
    let session = open_session(config).await?;
    let mut gate = ViewGate::new(session, remote.repository());
    match gate.evaluate().await?.clone() {
        ViewState::Anonymous => Ok(Out::new(LANDING, Dashboard::Landing)),
        ViewState::Loading { error } => Err(fetch_error(error)),
        ViewState::Ready => {
            let summary = gate.cache_mut().summary(recent).clone();
            Ok(Out::new(render_summary(&summary), Dashboard::Ready(summary)))
        }
    }
}

/// Renders whatever `state` calls for.
pub(crate) fn render_view(
    state: &ViewState,
    cache: &mut TransactionCache,
    recent: usize,
) -> String {
    match state {
        ViewState::Anonymous => LANDING.to_string(),
        ViewState::Loading { error: None } => "Loading your transactions...".to_string(),
        ViewState::Loading { error: Some(e) } => {
            format!(
                "Unable to load your transactions: {e}\nRun 'finmate dashboard' to try again."
            )
        }
        ViewState::Ready => render_summary(cache.summary(recent)),
    }
}

/// Renders the dashboard as text.
pub fn render_summary(summary: &Summary) -> String {
    let mut lines = vec![
        "Here's what your finances look like.".to_string(),
        String::new(),
        format!(
            "Total Net Spending: {} ({} Item(s))",
            summary.total_spent(),
            summary.count()
        ),
        String::new(),
        "By Category".to_string(),
    ];
    if summary.breakdown().is_empty() {
        lines.push("  No data yet.".to_string());
    }
    lines.extend(summary.breakdown().iter().map(|share| {
        let width = (share.percent() / 100.0 * BAR_WIDTH).round() as usize;
        format!(
            "  {:<13} {:>12} {:>7.2}%  {}",
            share.category(),
            share.total().to_string(),
            share.percent(),
            "#".repeat(width)
        )
    }));

    lines.push(String::new());
    lines.push("Monthly Overview".to_string());
    if summary.monthly().is_empty() {
        lines.push("  No data yet.".to_string());
    }
    lines.extend(
        summary
            .monthly()
            .iter()
            .map(|month| format!("  {:<4} {:>12}", month.month(), month.total().to_string())),
    );

    lines.push(String::new());
    lines.push("Recent Transactions".to_string());
    if summary.recent().is_empty() {
        lines.push("  No transactions recorded.".to_string());
    }
    lines.extend(
        summary
            .recent()
            .iter()
            .map(|transaction| format!("  {}", format_line(transaction))),
    );
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_dashboard_anonymous() {
        let env = TestEnv::new().await;
        let out = dashboard(env.config(), &env.remote(), 5).await.unwrap();
        assert_eq!(out.message(), LANDING);
        assert!(matches!(out.structure(), Some(Dashboard::Landing)));
    }

    #[tokio::test]
    async fn test_dashboard_ready() {
        let env = TestEnv::signed_in().await;
        let out = dashboard(env.config(), &env.remote(), 3).await.unwrap();
        let Some(Dashboard::Ready(summary)) = out.structure() else {
            panic!("expected a summary, got {:?}", out.structure());
        };
        assert_eq!(summary.count(), 12);
        assert_eq!(summary.recent().len(), 3);
        assert_eq!(summary.monthly().len(), 3);
        // FOOD: 84.20 + 46.90 + 91.45
        assert_eq!(summary.breakdown()[0].total().to_string(), "$222.55");
        assert!(out.message().contains("Total Net Spending: $602.35 (12 Item(s))"));
        assert!(out.message().contains("Birthday gift"));
    }

    #[test]
    fn test_render_empty_summary() {
        let text = render_summary(&Summary::compute(&[], 5));
        assert!(text.contains("Total Net Spending: $0.00 (0 Item(s))"));
        assert!(text.ends_with("No transactions recorded."));
    }
}
