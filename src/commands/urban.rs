// ABOUTME: ud command looking up a term (or a random entry) on UrbanDictionary
// ABOUTME: Replies with the first definition as a blockquote and caches answers per term

use anyhow::{Context, Result};
use async_trait::async_trait;
use gordy_core::{utils::escape_html, BotCommand, CommandContext};
use serde::Deserialize;
use serde_json::Value;

const DEFINE_URL: &str = "https://api.urbandictionary.com/v0/define";
const RANDOM_URL: &str = "https://api.urbandictionary.com/v0/random";

/// Key inside the command's state slot holding term -> rendered reply
const CACHE_KEY: &str = "cache";

#[derive(Debug, Deserialize)]
pub struct UdResponse {
    #[serde(default)]
    pub list: Vec<UdEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UdEntry {
    pub word: String,
    pub definition: String,
}

pub fn format_entry(entry: &UdEntry) -> String {
    format!(
        "<blockquote><strong>{}</strong> - {}</blockquote>",
        escape_html(&entry.word),
        escape_html(&entry.definition)
    )
}

#[derive(Debug, Clone)]
pub struct UrbanDictionaryCommand {
    http: reqwest::Client,
}

impl UrbanDictionaryCommand {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn fetch(&self, term: Option<&str>) -> Result<UdResponse> {
        let request = match term {
            Some(term) => self.http.get(DEFINE_URL).query(&[("term", term)]),
            None => self.http.get(RANDOM_URL),
        };
        request
            .send()
            .await
            .context("UrbanDictionary request failed")?
            .error_for_status()
            .context("UrbanDictionary returned an error status")?
            .json::<UdResponse>()
            .await
            .context("UrbanDictionary returned malformed JSON")
    }
}

#[async_trait]
impl BotCommand for UrbanDictionaryCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<()> {
        ctx.typing().await;

        let term = ctx.invocation.query();
        let term = (!term.is_empty()).then_some(term);

        if let Some(term) = &term {
            let cached = ctx
                .state
                .lock()
                .await
                .get(CACHE_KEY)
                .and_then(|cache| cache.get(term))
                .and_then(Value::as_str)
                .map(str::to_string);
            if let Some(reply) = cached {
                tracing::debug!(%term, "ud: cache hit");
                ctx.reply(&reply).await;
                return Ok(());
            }
        }

        let response = self.fetch(term.as_deref()).await?;
        let Some(entry) = response.list.first() else {
            tracing::debug!(term = ?term, "ud: no definitions");
            return Ok(());
        };
        let reply = format_entry(entry);

        // Random entries are different every time
        if let Some(term) = term {
            let mut state = ctx.state.lock().await;
            if !state.get(CACHE_KEY).is_some_and(Value::is_object) {
                state[CACHE_KEY] = Value::Object(Default::default());
            }
            state[CACHE_KEY][term.as_str()] = Value::String(reply.clone());
        }

        ctx.reply(&reply).await;
        Ok(())
    }
}
