//! Streaming exclusive files with a complete audit trail.
//!
//! Every download that gets past path resolution produces exactly one
//! [`DownloadEvent`], whether it completes, fails part-way, or is abandoned
//! because the request future was dropped. The recorded hash always covers
//! exactly the bytes the client was sent.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

use grantgate_core::{now_millis, AccessDecision, DownloadEvent};
use grantgate_store::{AuditLog, StoreError};

use crate::content_type::content_type_for;
use crate::error::{GateError, Result};
use crate::filter::{ContentFilter, FilterContext};
use crate::response::{ResponseHead, ResponseSink};

/// A completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub event_id: i64,
    pub event: DownloadEvent,
    pub bytes_sent: u64,
}

/// Running digest over the bytes accepted by the sink.
#[derive(Default)]
struct SentDigest {
    hasher: blake3::Hasher,
    written: u64,
}

impl SentDigest {
    fn hex(&self) -> String {
        hex::encode(self.hasher.finalize().as_bytes())
    }
}

/// Hashes exactly what the inner writer accepts.
struct HashingWriter<'a, W: ?Sized> {
    inner: &'a mut W,
    digest: &'a mut SentDigest,
}

impl<'a, W: ?Sized> HashingWriter<'a, W> {
    fn new(inner: &'a mut W, digest: &'a mut SentDigest) -> Self {
        Self { inner, digest }
    }

    fn written(&self) -> u64 {
        self.digest.written
    }
}

impl<W: AsyncWrite + Unpin + ?Sized> AsyncWrite for HashingWriter<'_, W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let n = ready!(Pin::new(&mut *this.inner).poll_write(cx, buf))?;
        // Only the accepted prefix counts as sent.
        this.digest.hasher.update(&buf[..n]);
        this.digest.written += n as u64;
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.get_mut().inner).poll_shutdown(cx)
    }
}

/// Owns the pending audit record for one download.
///
/// `finish` appends it. If the guard is dropped while still armed (the
/// request future was cancelled mid-stream), the append is spawned onto the
/// current runtime instead.
struct AuditGuard<A: AuditLog + 'static> {
    audit: Arc<A>,
    decision: AccessDecision,
    file_name: String,
    client_ip: String,
    download_time: i64,
    digest: SentDigest,
    armed: bool,
}

impl<A: AuditLog + 'static> AuditGuard<A> {
    fn new(audit: Arc<A>, decision: &AccessDecision, file_name: &str, client_ip: &str) -> Self {
        Self {
            audit,
            decision: decision.clone(),
            file_name: file_name.to_string(),
            client_ip: client_ip.to_string(),
            download_time: now_millis(),
            digest: SentDigest::default(),
            armed: true,
        }
    }

    fn event(&self) -> DownloadEvent {
        DownloadEvent::new(
            &self.decision,
            self.file_name.clone(),
            self.digest.hex(),
            self.download_time,
            self.client_ip.clone(),
        )
    }

    async fn finish(mut self) -> std::result::Result<(i64, DownloadEvent), StoreError> {
        // Disarm first: a blocking-pool insert already in flight completes
        // even if this future is dropped, so a second append would duplicate.
        self.armed = false;
        let event = self.event();
        let id = self.audit.append_download_event(&event).await?;
        Ok((id, event))
    }
}

impl<A: AuditLog + 'static> Drop for AuditGuard<A> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let event = self.event();
        warn!(
            file_name = %event.file_name,
            bytes_sent = self.digest.written,
            "download abandoned, recording partial event"
        );

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let audit = Arc::clone(&self.audit);
                handle.spawn(async move {
                    if let Err(e) = audit.append_download_event(&event).await {
                        error!(error = %e, file_name = %event.file_name, "failed to record download event");
                    }
                });
            }
            Err(_) => {
                error!(file_name = %event.file_name, "no runtime to record abandoned download event");
            }
        }
    }
}

/// Streams files from the exclusive-content root through a [`ContentFilter`].
pub struct ContentDeliveryPipeline<A, F> {
    root: PathBuf,
    audit: Arc<A>,
    filter: Arc<F>,
}

impl<A: AuditLog + 'static, F: ContentFilter> ContentDeliveryPipeline<A, F> {
    pub fn new(root: impl Into<PathBuf>, audit: Arc<A>, filter: Arc<F>) -> Self {
        Self {
            root: root.into(),
            audit,
            filter,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a file name to a path under the root.
    ///
    /// Only a single plain path segment is accepted. Anything that could
    /// name a file outside the root resolves to `None`.
    pub fn resolve(&self, file_name: &str) -> Option<PathBuf> {
        if file_name.contains(|c| c == '/' || c == '\\' || c == '\0') {
            return None;
        }

        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Some(self.root.join(name)),
            _ => None,
        }
    }

    /// Stream `file_name` to `sink` and record the download.
    ///
    /// A missing file is [`GateError::NotFound`] and records nothing. Once
    /// the file is found, exactly one event is recorded however streaming
    /// ends; a streaming failure is returned as [`GateError::Transport`]
    /// after the event is written.
    pub async fn serve<W>(
        &self,
        file_name: &str,
        decision: &AccessDecision,
        client_ip: &str,
        sink: &mut W,
    ) -> Result<DeliveryReport>
    where
        W: ResponseSink + ?Sized,
    {
        let path = self
            .resolve(file_name)
            .ok_or_else(|| GateError::NotFound(file_name.to_string()))?;

        let original_length = match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => return Err(GateError::NotFound(file_name.to_string())),
        };

        let mut guard = AuditGuard::new(Arc::clone(&self.audit), decision, file_name, client_ip);
        let ctx = FilterContext {
            file_name,
            decision,
            client_ip,
        };

        let streamed = self
            .stream(&path, original_length, &ctx, sink, &mut guard.digest)
            .await;
        let bytes_sent = guard.digest.written;
        let recorded = guard.finish().await;

        match (streamed, recorded) {
            (Ok(()), Ok((event_id, event))) => {
                info!(
                    event_id,
                    file_name,
                    access_type = %event.access_type,
                    tag = %event.tag,
                    bytes_sent,
                    "download complete"
                );
                Ok(DeliveryReport {
                    event_id,
                    event,
                    bytes_sent,
                })
            }
            (Ok(()), Err(e)) => {
                error!(error = %e, file_name, "failed to record download event");
                Err(GateError::Store(e))
            }
            (Err(e), recorded) => {
                if let Err(store_err) = recorded {
                    error!(error = %store_err, file_name, "failed to record download event");
                }
                warn!(error = %e, file_name, bytes_sent, "download interrupted");
                Err(GateError::Transport(e))
            }
        }
    }

    async fn stream<W>(
        &self,
        path: &Path,
        original_length: u64,
        ctx: &FilterContext<'_>,
        sink: &mut W,
        digest: &mut SentDigest,
    ) -> io::Result<()>
    where
        W: ResponseSink + ?Sized,
    {
        let final_length = self.filter.final_length(ctx, original_length);
        let mut reader = BufReader::new(File::open(path).await?);

        sink.begin(ResponseHead {
            content_length: final_length,
            content_type: content_type_for(ctx.file_name),
        })
        .await?;

        let mut writer = HashingWriter::new(sink, digest);
        self.filter.write_data(ctx, &mut reader, &mut writer).await?;
        writer.flush().await?;

        let written = writer.written();
        if written != final_length {
            warn!(
                file_name = ctx.file_name,
                announced = final_length,
                written,
                "filter output length mismatch"
            );
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("announced {final_length} bytes but wrote {written}"),
            ));
        }

        Ok(())
    }
}
