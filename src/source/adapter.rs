//! Pull-based adapter over a blocking sample driver
//!
//! The driver lives on its own reader thread while the adapter is
//! started. Each `pull` asks that thread for exactly one frame, so nothing
//! is read ahead and nothing is buffered beyond the frame in hand.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio::sync::{mpsc, oneshot};

use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::source::driver::SampleSource;
use crate::source::frame::SampleFrame;

type FrameReply = oneshot::Sender<Result<SampleFrame, SourceError>>;

/// Owner of the sampling hardware.
///
/// Not `Clone`: whoever holds the adapter holds the device.
pub struct SourceAdapter {
    /// Driver, parked here while the adapter is stopped
    driver: Option<Box<dyn SampleSource>>,

    /// Frame requests to the reader thread
    request_tx: Option<mpsc::Sender<FrameReply>>,

    /// Reader thread, hands the driver back when it exits
    thread_handle: Option<JoinHandle<Box<dyn SampleSource>>>,

    /// Cleared on stop so a blocked driver read can bail out
    running: Arc<AtomicBool>,

    /// Frames delivered since construction
    frames_read: Arc<AtomicU64>,
}

impl SourceAdapter {
    pub fn new(driver: Box<dyn SampleSource>) -> Self {
        Self {
            driver: Some(driver),
            request_tx: None,
            thread_handle: None,
            running: Arc::new(AtomicBool::new(false)),
            frames_read: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Acquire the device and start the reader thread
    pub fn start(&mut self, config: &SourceConfig) -> Result<(), SourceError> {
        if self.is_running() {
            return Err(SourceError::AlreadyStarted);
        }

        let mut driver = self.driver.take().ok_or_else(|| {
            SourceError::DeviceUnavailable("driver lost by a previous reader thread".into())
        })?;

        if let Err(e) = driver.open(config) {
            self.driver = Some(driver);
            return Err(e);
        }

        tracing::info!(
            "Source '{}' started: {:.0} Hz @ {:.3} MHz, {} samples/frame",
            driver.name(),
            config.sample_rate,
            config.center_freq / 1e6,
            config.samples_per_frame
        );

        let (request_tx, mut request_rx) = mpsc::channel::<FrameReply>(1);
        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let frames_read = self.frames_read.clone();
        let num_samples = config.samples_per_frame;
        let sample_rate = config.sample_rate;
        let center_freq = config.center_freq;

        let handle = thread::Builder::new()
            .name("source-reader".to_string())
            .spawn(move || {
                let mut sequence: u64 = 0;

                // Ends when the adapter drops its request sender
                while let Some(reply) = request_rx.blocking_recv() {
                    let result = driver
                        .read(num_samples, &running)
                        .map(|samples| SampleFrame::new(samples, sample_rate, center_freq, sequence));

                    if result.is_ok() {
                        sequence += 1;
                        frames_read.fetch_add(1, Ordering::Relaxed);
                    }

                    // Requester may have given up on this frame
                    let _ = reply.send(result);
                }

                driver.close();
                tracing::debug!("Source '{}' closed", driver.name());
                driver
            })
            .map_err(|e| SourceError::DeviceUnavailable(e.to_string()))?;

        self.request_tx = Some(request_tx);
        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Read one frame from the device
    pub async fn pull(&mut self) -> Result<SampleFrame, SourceError> {
        let request_tx = self.request_tx.as_ref().ok_or(SourceError::NotStarted)?;

        let (reply_tx, reply_rx) = oneshot::channel();
        request_tx
            .send(reply_tx)
            .await
            .map_err(|_| SourceError::Disconnected)?;

        reply_rx.await.map_err(|_| SourceError::Disconnected)?
    }

    /// Release the device. Returns once the driver has been closed.
    pub async fn stop(&mut self) -> Result<(), SourceError> {
        let handle = self.thread_handle.take().ok_or(SourceError::NotStarted)?;

        // Interrupt any read in progress, then close the request channel so
        // the reader closes the driver and exits
        self.running.store(false, Ordering::SeqCst);
        self.request_tx = None;

        let joined = tokio::task::spawn_blocking(move || handle.join())
            .await
            .map_err(|e| SourceError::ReadFailed(e.to_string()))?;

        match joined {
            Ok(driver) => {
                tracing::info!("Source '{}' stopped, device released", driver.name());
                self.driver = Some(driver);
                Ok(())
            }
            Err(_) => Err(SourceError::Disconnected),
        }
    }

    /// Check if the reader thread is running
    pub fn is_running(&self) -> bool {
        self.thread_handle.is_some()
    }

    /// Frames delivered since construction
    pub fn frames_read(&self) -> u64 {
        self.frames_read.load(Ordering::Relaxed)
    }
}

impl Drop for SourceAdapter {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.request_tx = None;
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}
