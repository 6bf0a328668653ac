use tracing::{info, instrument};

use crate::error::ApiError;
use crate::format::{Attachment, SUMMARY_TEXT};
use crate::retry::{with_rate_limit_retry, Sleeper};
use crate::slack::ChatPlatform;

/// Post `attachments` to `channel`. Returns `false` without calling Slack when
/// there is nothing to report.
#[instrument(skip(chat, sleeper, attachments), fields(attachment_count = attachments.len()))]
pub async fn deliver(
    chat: &dyn ChatPlatform,
    sleeper: &dyn Sleeper,
    channel: &str,
    attachments: &[Attachment],
) -> Result<bool, ApiError> {
    if attachments.is_empty() {
        info!("no failed check runs; nothing to send");
        return Ok(false);
    }
    with_rate_limit_retry("slack chat.postMessage", sleeper, || {
        chat.post_message(channel, SUMMARY_TEXT, attachments)
    })
    .await?;
    info!("notification delivered");
    Ok(true)
}
