use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{attendance::AttendanceState, models::KnownLabels};

use super::{
    loop_worker::{prediction_loop, LoopConfig},
    Classifier, FrameSource,
};

/// Owns the spawned prediction loop. At most one loop runs at a time.
pub struct SensingController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl Default for SensingController {
    fn default() -> Self {
        Self::new()
    }
}

impl SensingController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start_sensing(
        &mut self,
        mut source: Box<dyn FrameSource>,
        classifier: Arc<dyn Classifier>,
        known: Arc<KnownLabels>,
        state: Arc<Mutex<AttendanceState>>,
        config: LoopConfig,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("sensing already active");
        }

        source.start().context("failed to start frame source")?;

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(prediction_loop(
            source,
            classifier,
            known,
            state,
            config,
            cancel_token.clone(),
        ));

        info!(
            "prediction loop started (every {} ms)",
            config.tick_interval.as_millis()
        );
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Cancels the loop and waits for it, so no tick runs after this returns.
    pub async fn stop_sensing(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("prediction loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}
