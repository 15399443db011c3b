use async_trait::async_trait;
use tracing::info;

use crate::domain::repository::LinkDelivery;
use crate::domain::types::LinkMessage;

/// Records that a link is ready without retaining it.
///
/// Fallback delivery for stores that have no outbox of their own. The link is
/// a bearer credential, so only the attempt id reaches the log; with
/// `EXPOSE_LINK` the caller still receives it in the issuance response.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogLinkDelivery;

#[async_trait]
impl LinkDelivery for LogLinkDelivery {
    async fn deliver(&self, message: &LinkMessage) -> anyhow::Result<()> {
        info!(attempt_id = %message.attempt_id, "login link ready, no outbox configured");
        Ok(())
    }
}
