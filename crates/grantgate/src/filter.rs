//! Content filters applied between the file and the client.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use grantgate_core::AccessDecision;

/// What a filter knows about the download it is transforming.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    pub file_name: &'a str,
    pub decision: &'a AccessDecision,
    pub client_ip: &'a str,
}

/// Transforms file content on its way to the client.
///
/// `final_length` must report exactly the number of bytes `write_data` will
/// emit for the same context; the pipeline announces it as the content
/// length before streaming starts.
#[async_trait]
pub trait ContentFilter: Send + Sync {
    fn final_length(&self, ctx: &FilterContext<'_>, original_length: u64) -> u64;

    async fn write_data(
        &self,
        ctx: &FilterContext<'_>,
        input: &mut (dyn AsyncRead + Unpin + Send),
        output: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> io::Result<()>;
}

/// Sends the file unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughFilter;

#[async_trait]
impl ContentFilter for PassthroughFilter {
    fn final_length(&self, _ctx: &FilterContext<'_>, original_length: u64) -> u64 {
        original_length
    }

    async fn write_data(
        &self,
        _ctx: &FilterContext<'_>,
        input: &mut (dyn AsyncRead + Unpin + Send),
        output: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> io::Result<()> {
        tokio::io::copy(input, output).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grantgate_core::AccessType;

    #[tokio::test]
    async fn test_passthrough_copies_everything() {
        let decision = AccessDecision::new(AccessType::User, "patron-1");
        let ctx = FilterContext {
            file_name: "a.bin",
            decision: &decision,
            client_ip: "::1",
        };
        let data: Vec<u8> = (0..=255u8).cycle().take(100_000).collect();

        let mut input: &[u8] = &data;
        let mut output = Vec::new();
        PassthroughFilter
            .write_data(&ctx, &mut input, &mut output)
            .await
            .unwrap();

        assert_eq!(output, data);
        assert_eq!(PassthroughFilter.final_length(&ctx, 42), 42);
    }
}
