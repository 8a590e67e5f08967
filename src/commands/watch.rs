use crate::api::Remote;
use crate::commands::dashboard::render_view;
use crate::commands::{open_session, Out};
use crate::gate::ViewGate;
use crate::{Config, Result};
use std::future::Future;
use tracing::{info, warn};

/// Keeps the dashboard on screen, re-rendering it whenever the user signs in or out (from this or
/// any other terminal), until Ctrl-C.
pub async fn watch(config: &Config, remote: &Remote, recent: usize) -> Result<Out<()>> {
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Unable to listen for Ctrl-C, stopping: {e}");
        }
    };
    let frames = watch_until(config, remote, recent, shutdown, |frame| info!("\n{frame}")).await?;
    Ok(format!("Stopped watching after {frames} update(s)").into())
}

/// Runs the view gate until `shutdown` resolves, handing each rendered frame to `show`. Returns
/// the number of frames shown.
pub(crate) async fn watch_until<F, S>(
    config: &Config,
    remote: &Remote,
    recent: usize,
    shutdown: F,
    mut show: S,
) -> Result<usize>
where
    F: Future<Output = ()>,
    S: FnMut(&str),
{
    let session = open_session(config).await?;
    let mut gate = ViewGate::new(session, remote.repository());
    let mut frames = 0;
    gate.run(config.session_poll_interval(), shutdown, |state, cache| {
        frames += 1;
        show(&render_view(state, cache, recent));
    })
    .await?;
    Ok(frames)
}
