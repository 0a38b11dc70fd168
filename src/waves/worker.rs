//! Background wave texture generation
//!
//! Texture synthesis strokes one line per column and is too slow to run on
//! the frame clock. Requests go to a dedicated thread; finished textures are
//! picked up with a non-blocking [`TextureWorker::poll`] once per frame.

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::texture::{self, TextureError, TextureKey, WaveGeometry, WaveTexture};

/// Result of one generation request
pub type TextureResult = (TextureKey, Result<WaveTexture, TextureError>);

/// Handle to the texture generation thread
pub struct TextureWorker {
    requests: Option<UnboundedSender<TextureKey>>,
    results: UnboundedReceiver<TextureResult>,
    handle: Option<JoinHandle<()>>,
}

impl TextureWorker {
    /// Spawn the worker thread
    pub fn spawn(geometry: WaveGeometry) -> std::io::Result<Self> {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<TextureKey>();
        let (result_tx, result_rx) = mpsc::unbounded_channel();

        let handle = std::thread::Builder::new()
            .name("wave-texture".to_string())
            .spawn(move || {
                while let Some(mut key) = request_rx.blocking_recv() {
                    // Only the newest request matters after a burst of resizes
                    while let Ok(newer) = request_rx.try_recv() {
                        key = newer;
                    }

                    log::debug!("Texture worker: generating {}x{}", key.width, key.height);
                    let result = texture::generate(key.width, key.height, key.color(), &geometry);
                    if result_tx.send((key, result)).is_err() {
                        break;
                    }
                }
                log::debug!("Texture worker: exiting");
            })?;

        Ok(Self {
            requests: Some(request_tx),
            results: result_rx,
            handle: Some(handle),
        })
    }

    /// Queue a texture for generation. Returns false if the worker is gone.
    pub fn request(&self, key: TextureKey) -> bool {
        match &self.requests {
            Some(requests) => requests.send(key).is_ok(),
            None => false,
        }
    }

    /// Take the newest finished texture, if any
    pub fn poll(&mut self) -> Option<TextureResult> {
        let mut latest = None;
        while let Ok(result) = self.results.try_recv() {
            latest = Some(result);
        }
        latest
    }

    /// Block until a texture arrives or `timeout` passes
    pub fn wait(&mut self, timeout: Duration) -> Option<TextureResult> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(result) = self.poll() {
                return Some(result);
            }
            if Instant::now() >= deadline || self.handle.as_ref().is_none_or(|h| h.is_finished()) {
                return None;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Stop the thread and wait for it to finish its current texture
    pub fn shutdown(&mut self) {
        self.requests = None;
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::warn!("Texture worker panicked");
        }
    }
}

impl Drop for TextureWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
