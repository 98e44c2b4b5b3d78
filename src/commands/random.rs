// ABOUTME: random command picking one of its arguments uniformly
// ABOUTME: With no arguments there is nothing to pick and nothing is sent

use anyhow::Result;
use async_trait::async_trait;
use gordy_core::{utils::escape_html, BotCommand, CommandContext};
use rand::seq::SliceRandom;

#[derive(Debug, Default)]
pub struct RandomCommand;

#[async_trait]
impl BotCommand for RandomCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<()> {
        let choice = ctx.args().choose(&mut rand::thread_rng()).cloned();
        match choice {
            Some(choice) => {
                ctx.reply(&escape_html(&choice)).await;
            }
            None => tracing::debug!(room_id = %ctx.room_id, "random: no choices given"),
        }
        Ok(())
    }
}
