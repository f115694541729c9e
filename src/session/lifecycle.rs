use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::remote::SpeechSession;
use crate::audio::{CaptureDevice, OutputDevice};
use crate::playback::PlaybackScheduler;

/// Everything a call holds while it is not `Idle`
///
/// `release` tears all of it down and is safe to call any number of times.
#[derive(Default)]
pub struct CallResources {
    capture: Option<Box<dyn CaptureDevice>>,
    output: Option<Box<dyn OutputDevice>>,
    session: Option<Arc<dyn SpeechSession>>,
    uplink: Option<JoinHandle<()>>,
    /// Dropping this stops the call's event dispatcher
    shutdown: Option<oneshot::Sender<()>>,
}

impl CallResources {
    /// True when nothing is held
    pub fn is_empty(&self) -> bool {
        self.capture.is_none()
            && self.output.is_none()
            && self.session.is_none()
            && self.uplink.is_none()
            && self.shutdown.is_none()
    }

    pub fn set_capture(&mut self, capture: Box<dyn CaptureDevice>) {
        self.capture = Some(capture);
    }

    pub fn set_output(&mut self, output: Box<dyn OutputDevice>) {
        self.output = Some(output);
    }

    pub fn set_session(&mut self, session: Arc<dyn SpeechSession>) {
        self.session = Some(session);
    }

    pub fn set_uplink(&mut self, uplink: JoinHandle<()>) {
        self.uplink = Some(uplink);
    }

    pub fn set_shutdown(&mut self, shutdown: oneshot::Sender<()>) {
        self.shutdown = Some(shutdown);
    }

    pub fn capture_mut(&mut self) -> Option<&mut (dyn CaptureDevice + 'static)> {
        self.capture.as_deref_mut()
    }

    pub fn output_mut(&mut self) -> Option<&mut (dyn OutputDevice + 'static)> {
        self.output.as_deref_mut()
    }

    pub fn session(&self) -> Option<Arc<dyn SpeechSession>> {
        self.session.clone()
    }

    pub fn take_session(&mut self) -> Option<Arc<dyn SpeechSession>> {
        self.session.take()
    }

    /// Release capture, playback and the session reference
    ///
    /// Order: capture tracks, uplink, in-flight playback units (stopped on
    /// the output while it is still open), output context, session handle.
    /// The start clock is rewound to zero. Returns whether anything was held.
    pub async fn release(&mut self, scheduler: &mut PlaybackScheduler) -> bool {
        let held = !self.is_empty();

        if let Some(mut capture) = self.capture.take() {
            if let Err(e) = capture.stop().await {
                warn!("Failed to stop capture device {}: {:#}", capture.name(), e);
            }
        }

        if let Some(uplink) = self.uplink.take() {
            uplink.abort();
        }

        let stopped = match self.output.as_deref_mut() {
            Some(output) => scheduler.interrupt(output),
            None => scheduler.clear(),
        };
        if stopped > 0 {
            debug!("Stopped {} playback units during teardown", stopped);
        }

        if let Some(mut output) = self.output.take() {
            if let Err(e) = output.close().await {
                warn!("Failed to close output device {}: {:#}", output.name(), e);
            }
        }

        self.session = None;
        self.shutdown = None;

        held
    }
}
