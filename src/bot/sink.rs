//! Outbound boundary of the purchase flow.

use async_trait::async_trait;

use crate::bot::prompt::Prompt;
use crate::errors::{error_logging, AppResult};

/// Where prompts go. The Discord adapter implements this over the REST API;
/// tests implement it with a recorder.
#[async_trait]
pub trait PromptSink: Send + Sync {
    /// Post a message into a channel, returning the new message id
    async fn send(&self, channel_id: u64, prompt: Prompt) -> AppResult<u64>;

    /// Delete a message. Deleting a message that is already gone succeeds.
    async fn delete(&self, channel_id: u64, message_id: u64) -> AppResult<()>;

    /// Replace the channel's current prompt with `prompt`.
    ///
    /// The current prompt is deleted first so only one prompt is visible.
    /// A failed delete is logged and does not stop the new prompt.
    async fn replace_prompt(
        &self,
        channel_id: u64,
        current: Option<u64>,
        prompt: Prompt,
    ) -> AppResult<u64> {
        if let Some(message_id) = current {
            if let Err(e) = self.delete(channel_id, message_id).await {
                error_logging::log_discord_error(&e, "delete_prompt", channel_id);
            }
        }
        self.send(channel_id, prompt).await
    }
}
