//! Ctrl-C handling for batch runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use anyhow::{Context, Result};

/// Flag raised by the first Ctrl-C. Documents already in flight still finish.
///
/// When no handler can be installed the flag is returned anyway and simply
/// never fires.
pub fn cancel_on_ctrl_c() -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    if let Err(err) = spawn_listener(cancel.clone()) {
        tracing::warn!(error = %err, "Ctrl-C will not stop the batch");
    }
    cancel
}

fn spawn_listener(cancel: Arc<AtomicBool>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start signal runtime")?;
    thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("Ctrl-C received, finishing in-flight documents");
                        cancel.store(true, Ordering::Relaxed);
                    }
                    Err(err) => tracing::warn!(error = %err, "failed to listen for Ctrl-C"),
                }
            });
        })
        .context("failed to spawn signal thread")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_starts_lowered() {
        let cancel = cancel_on_ctrl_c();
        assert!(!cancel.load(Ordering::Relaxed));
    }
}
