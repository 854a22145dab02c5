//! I/O callback wrappers / IO回调包装器
//!
//! Report each chunk that passes through a reader or writer to an
//! [`IoCallback`], so the host can track transfer progress without the
//! driver buffering anything.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use super::IoCallback;

/// Reader that reports bytes read / 读取时回调已读字节数
pub struct CallbackReader<R> {
    inner: R,
    callback: IoCallback,
}

impl<R> CallbackReader<R> {
    pub fn new(inner: R, callback: IoCallback) -> Self {
        Self { inner, callback }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for CallbackReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            let n = buf.filled().len() - before;
            if n > 0 {
                (this.callback)(n);
            }
        }
        poll
    }
}

/// Writer that reports bytes written / 写入时回调已写字节数
pub struct CallbackWriter<W> {
    inner: W,
    callback: IoCallback,
}

impl<W> CallbackWriter<W> {
    pub fn new(inner: W, callback: IoCallback) -> Self {
        Self { inner, callback }
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for CallbackWriter<W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = &poll {
            if *n > 0 {
                (this.callback)(*n);
            }
        }
        poll
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_reader_reports_all_bytes() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let callback: IoCallback = Arc::new(move |n| {
            counter.fetch_add(n, Ordering::SeqCst);
        });

        let data = vec![7u8; 10_000];
        let mut reader = CallbackReader::new(std::io::Cursor::new(data), callback);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();

        assert_eq!(out.len(), 10_000);
        assert_eq!(seen.load(Ordering::SeqCst), 10_000);
    }

    #[tokio::test]
    async fn test_writer_reports_all_bytes() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let callback: IoCallback = Arc::new(move |n| {
            counter.fetch_add(n, Ordering::SeqCst);
        });

        let mut writer = CallbackWriter::new(Vec::new(), callback);
        writer.write_all(b"hello kodo").await.unwrap();
        writer.shutdown().await.unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 10);
    }
}
