use crate::error::ScannerError;
use crate::traits::camera::{Camera, Frame};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio_util::sync::CancellationToken;

/// A "camera" fed by a line-oriented reader, one line per frame.
///
/// Used with a USB/HID barcode scanner that types the decoded text followed by
/// Enter, or with stdin when testing a station by hand. A non-empty line is a
/// decode; an empty line is a frame with nothing in view.
pub struct LineCamera<R> {
    reader: Arc<AsyncMutex<R>>,
    running: Mutex<Option<CancellationToken>>,
}

impl<R> LineCamera<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self::shared(Arc::new(AsyncMutex::new(reader)))
    }

    /// Reads from a reader that something else also uses while the camera is stopped.
    pub fn shared(reader: Arc<AsyncMutex<R>>) -> Self {
        Self {
            reader,
            running: Mutex::new(None),
        }
    }
}

#[async_trait]
impl<R> Camera for LineCamera<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn start(&self, frames: mpsc::Sender<Frame>) -> Result<(), ScannerError> {
        let token = CancellationToken::new();
        {
            let mut running = self.running.lock().unwrap_or_else(|p| p.into_inner());
            if running.is_some() {
                return Err(ScannerError::Busy);
            }
            *running = Some(token.clone());
        }

        let reader = self.reader.clone();
        tokio::spawn(async move {
            let mut reader = reader.lock().await;
            let mut line = String::new();
            loop {
                line.clear();
                let read = tokio::select! {
                    _ = token.cancelled() => break,
                    read = reader.read_line(&mut line) => read,
                };
                let frame = match read {
                    Ok(0) | Err(_) => break,
                    Ok(_) => match line.trim() {
                        "" => Frame::Miss("empty frame".into()),
                        text => Frame::Decoded(text.to_string()),
                    },
                };
                if frames.send(frame).await.is_err() {
                    break;
                }
            }
        });

        Ok(())
    }

    async fn stop(&self) {
        let token = self
            .running
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(token) = token {
            token.cancel();
        }
    }
}
