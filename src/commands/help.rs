// ABOUTME: help command listing every registered command with its documentation
// ABOUTME: Output is a preformatted block, one "name - documentation" line per command

use anyhow::Result;
use async_trait::async_trait;
use gordy_core::{utils::escape_html, BotCommand, CommandContext, CommandRegistry};

#[derive(Debug, Default)]
pub struct HelpCommand;

/// Render the help block; the registry iterates in name order
pub fn render_help(registry: &CommandRegistry) -> String {
    let lines: Vec<String> = registry
        .iter()
        .map(|cmd| {
            format!(
                "{} - {}",
                escape_html(&cmd.name),
                escape_html(cmd.documentation.trim())
            )
        })
        .collect();
    format!("<pre>{}</pre>", lines.join("\n"))
}

#[async_trait]
impl BotCommand for HelpCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<()> {
        ctx.reply(&render_help(&ctx.registry)).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gordy_core::CommandDescriptor;

    #[test]
    fn test_render_help_sorted() {
        let mut registry = CommandRegistry::new();
        registry.register(CommandDescriptor::of::<HelpCommand>("zed", "Last"));
        registry.register(CommandDescriptor::of::<HelpCommand>("alpha", "First"));
        assert_eq!(
            render_help(&registry),
            "<pre>alpha - First\nzed - Last</pre>"
        );
    }

    #[test]
    fn test_render_help_empty_registry() {
        assert_eq!(render_help(&CommandRegistry::new()), "<pre></pre>");
    }

    #[test]
    fn test_render_help_escapes_markup() {
        let mut registry = CommandRegistry::new();
        registry.register(CommandDescriptor::of::<HelpCommand>("x", "a <b> & c"));
        assert_eq!(render_help(&registry), "<pre>x - a &lt;b&gt; &amp; c</pre>");
    }
}
