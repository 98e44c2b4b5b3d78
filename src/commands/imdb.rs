// ABOUTME: imdb command searching titles through IMDb's suggestion endpoint
// ABOUTME: Replies with the first title hit, its year, a cover link, and the title page

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use gordy_core::{utils::escape_html, BotCommand, CommandContext};
use reqwest::Url;
use serde::Deserialize;

const SUGGESTION_BASE: &str = "https://v3.sg.media-imdb.com/suggestion/";
const TITLE_URL_PREFIX: &str = "https://www.imdb.com/title/";

#[derive(Debug, Deserialize)]
pub struct SuggestionResponse {
    #[serde(default, rename = "d")]
    pub hits: Vec<Suggestion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Suggestion {
    pub id: String,
    #[serde(rename = "l")]
    pub title: Option<String>,
    #[serde(rename = "y")]
    pub year: Option<i32>,
    #[serde(rename = "i")]
    pub image: Option<SuggestionImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionImage {
    #[serde(rename = "imageUrl")]
    pub url: String,
}

impl Suggestion {
    /// Titles have `tt` ids; names (`nm`) and lists are skipped
    pub fn is_title(&self) -> bool {
        self.id.starts_with("tt") && self.title.is_some()
    }

    pub fn long_title(&self) -> String {
        let title = self.title.as_deref().unwrap_or_default();
        match self.year {
            Some(year) => format!("{} ({})", title, year),
            None => title.to_string(),
        }
    }

    pub fn url(&self) -> String {
        format!("{}{}/", TITLE_URL_PREFIX, self.id)
    }
}

/// Suggestion URL for a query. IMDb buckets suggestions by the first character.
pub fn suggestion_url(query: &str) -> Result<Url> {
    let normalized = query.trim().to_lowercase();
    let bucket = normalized
        .chars()
        .next()
        .filter(char::is_ascii_alphanumeric)
        .unwrap_or('x');

    let mut url = Url::parse(SUGGESTION_BASE).context("invalid suggestion base URL")?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("suggestion URL cannot take path segments"))?
        .pop_if_empty()
        .push(&bucket.to_string())
        .push(&format!("{}.json", normalized));
    Ok(url)
}

pub fn format_title(hit: &Suggestion) -> String {
    let mut msg = String::from("<p>");
    msg.push_str(&escape_html(&hit.long_title()));
    if let Some(image) = &hit.image {
        msg.push_str(&format!(
            "&nbsp;<a href=\"{}\">cover</a>",
            escape_html(&image.url)
        ));
    }
    msg.push_str(&format!(
        "&nbsp;<a href=\"{}\">url</a>",
        escape_html(&hit.url())
    ));
    msg.push_str("</p>");
    msg
}

#[derive(Debug, Clone)]
pub struct ImdbCommand {
    http: reqwest::Client,
}

impl ImdbCommand {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn search(&self, query: &str) -> Result<SuggestionResponse> {
        self.http
            .get(suggestion_url(query)?)
            .send()
            .await
            .context("IMDb request failed")?
            .error_for_status()
            .context("IMDb returned an error status")?
            .json::<SuggestionResponse>()
            .await
            .context("IMDb returned malformed JSON")
    }
}

#[async_trait]
impl BotCommand for ImdbCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<()> {
        let query = ctx.invocation.query();
        if query.is_empty() {
            return Ok(());
        }

        ctx.typing().await;

        let response = self.search(&query).await?;
        let Some(hit) = response.hits.iter().find(|hit| hit.is_title()) else {
            tracing::debug!(%query, "imdb: no title matches");
            return Ok(());
        };

        ctx.reply(&format_title(hit)).await;
        Ok(())
    }
}
