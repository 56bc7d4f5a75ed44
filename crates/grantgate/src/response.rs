//! The response side of a download.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::AsyncWrite;

/// Response metadata sent before the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHead {
    pub content_length: u64,
    pub content_type: &'static str,
}

/// Destination for a file download.
///
/// `begin` is called once with the headers, then the body is written
/// through `AsyncWrite`. A front end adapts its connection to this trait.
#[async_trait]
pub trait ResponseSink: AsyncWrite + Unpin + Send {
    async fn begin(&mut self, head: ResponseHead) -> io::Result<()>;
}

/// A sink that keeps the whole response in memory.
#[derive(Debug, Default)]
pub struct BufferedResponse {
    head: Option<ResponseHead>,
    body: BytesMut,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn head(&self) -> Option<&ResponseHead> {
        self.head.as_ref()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body.freeze()
    }
}

#[async_trait]
impl ResponseSink for BufferedResponse {
    async fn begin(&mut self, head: ResponseHead) -> io::Result<()> {
        if self.head.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "response already started",
            ));
        }
        self.head = Some(head);
        Ok(())
    }
}

impl AsyncWrite for BufferedResponse {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.get_mut().body.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_buffered_response() {
        let mut response = BufferedResponse::new();
        let head = ResponseHead {
            content_length: 5,
            content_type: "text/plain",
        };

        response.begin(head).await.unwrap();
        response.write_all(b"hello").await.unwrap();

        assert_eq!(response.head(), Some(&head));
        assert!(response.begin(head).await.is_err());
        assert_eq!(response.into_body(), Bytes::from_static(b"hello"));
    }
}
