// vigil-camera/src/stream.rs
use crate::{Frame, Result};
use futures_core::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

// back‑pressure: source thread → channel → consumer
const DEPTH: usize = 4;

/// Anything that can hand out frames one at a time.
///
/// `next_frame` may block; `Ok(None)` means the source is exhausted.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Adapts an iterator of frames into a [`FrameSource`].
pub struct IterSource<I> {
    frames: I,
}

impl<I> IterSource<I> {
    pub fn new(frames: I) -> Self {
        Self { frames }
    }
}

impl<I> FrameSource for IterSource<I>
where
    I: Iterator<Item = Frame> + Send,
{
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.next())
    }
}

/// Drive `source` on its own thread and expose it as an async stream.
///
/// The stream ends after the source is exhausted or after the first error,
/// which is yielded before closing.
pub fn frame_stream<S>(mut source: S) -> impl Stream<Item = Result<Frame>>
where
    S: FrameSource + 'static,
{
    let (tx, rx) = mpsc::channel(DEPTH);

    std::thread::spawn(move || loop {
        match source.next_frame() {
            Ok(Some(f)) => {
                if tx.blocking_send(Ok(f)).is_err() {
                    break; // consumer dropped
                }
            }
            Ok(None) => break,
            Err(e) => {
                log::warn!("frame source stopped: {}", e);
                let _ = tx.blocking_send(Err(e));
                break;
            }
        }
    });

    ReceiverStream::new(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CameraError, PixelFormat};
    use tokio_stream::StreamExt;

    struct FailingSource {
        remaining: usize,
    }

    impl FrameSource for FailingSource {
        fn next_frame(&mut self) -> Result<Option<Frame>> {
            if self.remaining == 0 {
                return Err(CameraError::Source("sensor unplugged".into()));
            }
            self.remaining -= 1;
            Frame::new(vec![0u8; 3], PixelFormat::Rgb8, 1, 1).map(Some)
        }
    }

    #[tokio::test]
    async fn iterator_source_streams_every_frame() -> anyhow::Result<()> {
        let frames = (0..6).map(|_| Frame::new(vec![0u8; 12], PixelFormat::Rgba8, 1, 3));
        let frames: Vec<Frame> = frames.collect::<Result<_>>()?;
        let stream = frame_stream(IterSource::new(frames.into_iter()));
        let received: Vec<_> = stream.collect().await;
        assert_eq!(received.len(), 6);
        assert!(received.iter().all(|r| r.is_ok()));
        Ok(())
    }

    #[tokio::test]
    async fn source_error_is_yielded_then_stream_ends() {
        let stream = frame_stream(FailingSource { remaining: 2 });
        let received: Vec<_> = stream.collect().await;
        assert_eq!(received.len(), 3);
        assert!(matches!(received[2], Err(CameraError::Source(_))));
    }
}
