//! Background segmentation worker
//!
//! Segmentation runs on one dedicated thread so the caller stays responsive.
//! Requests and responses travel over typed channels; at most one request is
//! meant to be in flight, which the session enforces.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use image::Rgba;
use imageproc::definitions::Image;

use crate::error::Error;
use crate::matte::apply_alpha_mask::ModifyAlpha;
use crate::matte::mask::AlphaMask;
use crate::matte::segmentation::{segment, SegmentationParams};

const THREAD_NAME: &str = "matte-segmentation";

/// Work item sent to the worker
#[derive(Debug, Clone)]
pub struct SegmentationRequest {
    /// Caller-chosen id echoed back in the response
    pub id: u64,
    pub image: Arc<Image<Rgba<u8>>>,
    pub params: SegmentationParams,
}

/// Successful segmentation output
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationOutput {
    /// Source image with the computed mask as its alpha channel
    pub image: Image<Rgba<u8>>,
    pub mask: AlphaMask,
}

/// Worker reply for one request
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationResponse {
    pub id: u64,
    pub result: Result<SegmentationOutput, Error>,
}

enum Command {
    Segment(SegmentationRequest),
    Shutdown,
}

/// Handle to the segmentation thread
///
/// Dropping the handle stops the thread and waits for it.
#[derive(Debug)]
pub struct SegmentationWorker {
    commands: Option<Sender<Command>>,
    responses: Receiver<SegmentationResponse>,
    handle: Option<JoinHandle<()>>,
}

impl SegmentationWorker {
    /// Starts a worker running the built-in gradient segmentation.
    ///
    /// # Errors
    ///
    /// * `Error::WorkerUnavailable` - When the thread cannot be spawned
    pub fn spawn() -> Result<Self, Error> {
        Self::spawn_with(segment)
    }

    /// Starts a worker around a custom engine.
    ///
    /// The engine must return a mask with the dimensions of its input. A
    /// panicking engine is reported as `Error::SegmentationFailed` and the
    /// worker keeps serving requests.
    ///
    /// # Errors
    ///
    /// * `Error::WorkerUnavailable` - When the thread cannot be spawned
    pub fn spawn_with<F>(engine: F) -> Result<Self, Error>
    where
        F: Fn(&Image<Rgba<u8>>, &SegmentationParams) -> AlphaMask + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel::<Command>();
        let (response_tx, response_rx) = mpsc::channel::<SegmentationResponse>();

        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_owned())
            .spawn(move || run(&engine, &command_rx, &response_tx))
            .map_err(|e| Error::WorkerUnavailable(e.to_string()))?;

        tracing::debug!(thread = THREAD_NAME, "segmentation worker started");

        Ok(Self {
            commands: Some(command_tx),
            responses: response_rx,
            handle: Some(handle),
        })
    }

    /// Queues a request.
    ///
    /// # Errors
    ///
    /// * `Error::WorkerUnavailable` - When the worker was stopped or its thread is gone
    pub fn submit(&self, request: SegmentationRequest) -> Result<(), Error> {
        let commands = self
            .commands
            .as_ref()
            .ok_or_else(|| Error::WorkerUnavailable("worker stopped".to_owned()))?;

        commands
            .send(Command::Segment(request))
            .map_err(|_| Error::WorkerUnavailable("worker thread exited".to_owned()))
    }

    /// Returns a finished response without blocking.
    ///
    /// # Errors
    ///
    /// * `Error::WorkerUnavailable` - When no response can ever arrive
    pub fn try_recv(&self) -> Result<Option<SegmentationResponse>, Error> {
        match self.responses.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                Err(Error::WorkerUnavailable("worker thread exited".to_owned()))
            }
        }
    }

    /// Blocks until the next response arrives.
    ///
    /// # Errors
    ///
    /// * `Error::WorkerUnavailable` - When no response can ever arrive
    pub fn recv(&self) -> Result<SegmentationResponse, Error> {
        self.responses
            .recv()
            .map_err(|_| Error::WorkerUnavailable("worker thread exited".to_owned()))
    }

    /// Asks the thread to exit and waits for it.
    ///
    /// Requests queued before the call are still processed. Calling it again is a no-op.
    pub fn stop(&mut self) {
        if let Some(commands) = self.commands.take() {
            // A send error means the thread is already gone.
            let _ = commands.send(Command::Shutdown);
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!(thread = THREAD_NAME, "segmentation worker panicked on exit");
            }
            tracing::debug!(thread = THREAD_NAME, "segmentation worker stopped");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for SegmentationWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<F>(engine: &F, commands: &Receiver<Command>, responses: &Sender<SegmentationResponse>)
where
    F: Fn(&Image<Rgba<u8>>, &SegmentationParams) -> AlphaMask,
{
    while let Ok(command) = commands.recv() {
        let request = match command {
            Command::Segment(request) => request,
            Command::Shutdown => break,
        };

        tracing::debug!(
            id = request.id,
            width = request.image.width(),
            height = request.image.height(),
            "segmentation request received"
        );

        let result = process(engine, &request);
        if let Err(error) = &result {
            tracing::warn!(id = request.id, %error, "segmentation request failed");
        }

        let response = SegmentationResponse {
            id: request.id,
            result,
        };
        if responses.send(response).is_err() {
            // Nobody is listening anymore.
            break;
        }
    }
}

fn process<F>(engine: &F, request: &SegmentationRequest) -> Result<SegmentationOutput, Error>
where
    F: Fn(&Image<Rgba<u8>>, &SegmentationParams) -> AlphaMask,
{
    let mask = catch_unwind(AssertUnwindSafe(|| engine(&request.image, &request.params)))
        .map_err(|payload| Error::SegmentationFailed(panic_message(payload.as_ref())))?;

    let mut image = (*request.image).clone();
    image.replace_alpha_mut(&mask)?;
    Ok(SegmentationOutput { image, mask })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
