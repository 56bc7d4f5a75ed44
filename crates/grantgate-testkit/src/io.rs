//! Response sinks that misbehave on purpose.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::BytesMut;
use grantgate::{ResponseHead, ResponseSink};
use tokio::io::AsyncWrite;

/// Accepts `limit` body bytes, then fails every write with `BrokenPipe`,
/// like a client that disconnected.
#[derive(Debug)]
pub struct FailingSink {
    head: Option<ResponseHead>,
    body: BytesMut,
    remaining: usize,
}

impl FailingSink {
    pub fn new(limit: usize) -> Self {
        Self {
            head: None,
            body: BytesMut::new(),
            remaining: limit,
        }
    }

    pub fn head(&self) -> Option<&ResponseHead> {
        self.head.as_ref()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

#[async_trait]
impl ResponseSink for FailingSink {
    async fn begin(&mut self, head: ResponseHead) -> io::Result<()> {
        self.head = Some(head);
        Ok(())
    }
}

impl AsyncWrite for FailingSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.remaining == 0 {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "client disconnected",
            )));
        }

        let n = buf.len().min(this.remaining);
        this.body.extend_from_slice(&buf[..n]);
        this.remaining -= n;
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Accepts `limit` body bytes, then never makes progress again, like a
/// client that stopped reading. Used to cancel a download mid-stream.
#[derive(Debug)]
pub struct StallingSink {
    body: BytesMut,
    remaining: usize,
}

impl StallingSink {
    pub fn new(limit: usize) -> Self {
        Self {
            body: BytesMut::new(),
            remaining: limit,
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

#[async_trait]
impl ResponseSink for StallingSink {
    async fn begin(&mut self, _head: ResponseHead) -> io::Result<()> {
        Ok(())
    }
}

impl AsyncWrite for StallingSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.remaining == 0 {
            return Poll::Pending;
        }

        let n = buf.len().min(this.remaining);
        this.body.extend_from_slice(&buf[..n]);
        this.remaining -= n;
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        if self.remaining == 0 {
            Poll::Pending
        } else {
            Poll::Ready(Ok(()))
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
