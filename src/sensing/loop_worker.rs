use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::{
    sync::{Mutex, Semaphore},
    time::{Duration, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    attendance::{AttendanceState, FrameOutcome},
    error::{InferenceError, TickError},
    models::{KnownLabels, RawPrediction},
};

use super::{frame_records, Classifier, FrameSource};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone, Copy)]
pub struct LoopConfig {
    pub tick_interval: Duration,
    pub inference_timeout: Duration,
    /// Log every applied frame, not just admissions.
    pub verbose_frames: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            inference_timeout: Duration::from_secs(2),
            verbose_frames: false,
        }
    }
}

/// Capture plus inference, run on the blocking pool.
///
/// There is a single slot. A call abandoned by the timeout keeps the slot until
/// the classifier returns, and ticks that find it taken are skipped.
pub(crate) struct FramePipeline {
    source: Arc<StdMutex<Box<dyn FrameSource>>>,
    classifier: Arc<dyn Classifier>,
    slot: Arc<Semaphore>,
}

impl FramePipeline {
    pub(crate) fn new(source: Box<dyn FrameSource>, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            source: Arc::new(StdMutex::new(source)),
            classifier,
            slot: Arc::new(Semaphore::new(1)),
        }
    }

    async fn capture_and_predict(
        &self,
        timeout: Duration,
    ) -> Result<(DateTime<Utc>, Vec<RawPrediction>), TickError> {
        let permit = Arc::clone(&self.slot)
            .try_acquire_owned()
            .map_err(|_| InferenceError::Busy)?;
        let source = Arc::clone(&self.source);
        let classifier = Arc::clone(&self.classifier);

        let worker = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let frame = source
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .current_frame()?;
            let observed_at = Utc::now();
            let predictions = classifier.predict(&frame)?;
            Ok::<_, TickError>((observed_at, predictions))
        });

        match tokio::time::timeout(timeout, worker).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                log_error!("classifier worker died: {join_err}");
                Err(InferenceError::Failed(join_err.to_string()).into())
            }
            Err(_) => Err(InferenceError::TimedOut(timeout.as_millis() as u64).into()),
        }
    }

    /// Waits out any abandoned call, then releases the source.
    async fn shutdown(&self) {
        let _idle = self.slot.acquire().await;
        self.source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stop();
    }

    #[cfg(test)]
    pub(crate) fn is_busy(&self) -> bool {
        self.slot.available_permits() == 0
    }
}

pub async fn prediction_loop(
    source: Box<dyn FrameSource>,
    classifier: Arc<dyn Classifier>,
    known: Arc<KnownLabels>,
    state: Arc<Mutex<AttendanceState>>,
    config: LoopConfig,
    cancel_token: CancellationToken,
) {
    let pipeline = FramePipeline::new(source, classifier);
    let mut ticker = tokio::time::interval(config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("prediction loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                match perform_tick(&pipeline, &known, &state, config).await {
                    Ok(outcome) => {
                        if !outcome.admitted.is_empty() {
                            let names: Vec<&str> = outcome.admitted.iter().map(|l| l.as_str()).collect();
                            log_info!("marked present: {}", names.join(", "));
                        } else if config.verbose_frames {
                            match &outcome.best {
                                Some(best) if outcome.confident => log_info!("{}: {:.2}", best.label, best.probability),
                                _ => log_info!("no confident match this frame"),
                            }
                        }
                    }
                    Err(TickError::Inference(InferenceError::Busy)) => {
                        state.lock().await.record_skip();
                    }
                    Err(err) => {
                        state.lock().await.record_skip();
                        log_warn!("prediction tick skipped: {err}");
                    }
                }
            }
        }
    }

    pipeline.shutdown().await;
}

/// One capture → inference → log/roster pass. Any collaborator failure leaves
/// the state untouched for this frame.
pub(crate) async fn perform_tick(
    pipeline: &FramePipeline,
    known: &KnownLabels,
    state: &Mutex<AttendanceState>,
    config: LoopConfig,
) -> Result<FrameOutcome, TickError> {
    let (observed_at, predictions) = pipeline
        .capture_and_predict(config.inference_timeout)
        .await?;
    let records = frame_records(known, predictions, observed_at)?;

    let mut guard = state.lock().await;
    Ok(guard.apply_frame(&records))
}
