//! Throttled sampling loop
//!
//! One task pulls a frame, hands it to the sink, then sleeps for the
//! configured delay. There is no queue between pull and sink: a frame is
//! pulled only when the previous one has been consumed, so slow consumers
//! see gaps rather than a backlog.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::SourceConfig;
use crate::error::{Result, SamplerError};
use crate::protocol::SamplerState;
use crate::sampler::sink::{Control, FrameSink};
use crate::source::SourceAdapter;

/// Shared, read-only view of the sampler state
#[derive(Clone, Default)]
pub struct StateHandle(Arc<Mutex<SamplerState>>);

impl StateHandle {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(SamplerState::Idle)))
    }

    pub fn get(&self) -> SamplerState {
        *self.0.lock()
    }

    fn set(&self, state: SamplerState) {
        *self.0.lock() = state;
    }
}

/// Drives a source adapter at a bounded rate
pub struct Sampler {
    /// Parked here while no loop is running
    adapter: Option<SourceAdapter>,
    config: SourceConfig,
    sink: Arc<dyn FrameSink>,
    state: StateHandle,
    stop_tx: Option<watch::Sender<bool>>,
    /// Loop task, returns the adapter once the source is released
    task: Option<JoinHandle<SourceAdapter>>,
}

impl Sampler {
    pub fn new(adapter: SourceAdapter, config: SourceConfig, sink: Arc<dyn FrameSink>) -> Self {
        Self {
            adapter: Some(adapter),
            config,
            sink,
            state: StateHandle::new(),
            stop_tx: None,
            task: None,
        }
    }

    pub fn state(&self) -> SamplerState {
        self.state.get()
    }

    pub fn state_handle(&self) -> StateHandle {
        self.state.clone()
    }

    /// Acquire the source and spawn the sampling loop
    pub async fn start(&mut self, delay: Duration) -> Result<()> {
        if self.task.is_some() {
            if self.state.get() == SamplerState::Running {
                return Err(SamplerError::AlreadyStarted.into());
            }
            // A loop that halted on its own still holds the adapter
            self.finish(false).await?;
        }

        let mut adapter = self
            .adapter
            .take()
            .ok_or_else(|| SamplerError::TaskFailed("source adapter lost".into()))?;

        if let Err(e) = adapter.start(&self.config) {
            self.adapter = Some(adapter);
            return Err(e.into());
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        self.state.set(SamplerState::Running);
        self.stop_tx = Some(stop_tx);
        self.task = Some(tokio::spawn(run_loop(
            adapter,
            self.sink.clone(),
            delay,
            stop_rx,
            self.state.clone(),
        )));

        tracing::info!("Sampler started, {:?} between frames", delay);
        Ok(())
    }

    /// Stop the loop and wait until the source has been released
    pub async fn stop(&mut self) -> Result<()> {
        self.finish(true).await
    }

    /// Wait for the loop to halt on its own
    pub async fn wait(&mut self) -> Result<()> {
        self.finish(false).await
    }

    async fn finish(&mut self, signal: bool) -> Result<()> {
        let task = self.task.take().ok_or(SamplerError::NotStarted)?;
        let stop_tx = self.stop_tx.take();

        if signal {
            if self.state.get() == SamplerState::Running {
                self.state.set(SamplerState::Stopping);
            }
            if let Some(stop_tx) = &stop_tx {
                let _ = stop_tx.send(true);
            }
        }

        let adapter = task
            .await
            .map_err(|e| SamplerError::TaskFailed(e.to_string()))?;
        self.adapter = Some(adapter);
        self.state.set(SamplerState::Idle);

        tracing::info!("Sampler stopped");
        Ok(())
    }
}

async fn run_loop(
    mut adapter: SourceAdapter,
    sink: Arc<dyn FrameSink>,
    delay: Duration,
    mut stop_rx: watch::Receiver<bool>,
    state: StateHandle,
) -> SourceAdapter {
    loop {
        if *stop_rx.borrow() {
            break;
        }

        let pulled = tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            pulled = adapter.pull() => pulled,
        };

        let frame = match pulled {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("Sample source failed, halting sampler: {}", e);
                break;
            }
        };

        tracing::debug!("Collected {} samples (frame {})", frame.len(), frame.sequence);
        let sequence = frame.sequence;

        match sink.consume(frame).await {
            Control::Continue => {}
            Control::Stop => {
                tracing::info!("Sink asked to stop after frame {}", sequence);
                break;
            }
            Control::Error(e) => {
                tracing::warn!("Frame {} dropped: {}", sequence, e);
            }
        }

        tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    state.set(SamplerState::Stopping);
    if let Err(e) = adapter.stop().await {
        tracing::error!("Failed to release sample source: {}", e);
    }
    state.set(SamplerState::Idle);

    adapter
}
