// ABOUTME: strain command searching Leafly's consumer API for an exact strain name
// ABOUTME: Matches the name or any "aka" alias case-insensitively and replies with a summary

use anyhow::{Context, Result};
use async_trait::async_trait;
use gordy_core::{utils::escape_html, BotCommand, CommandContext};
use serde::Deserialize;

const SEARCH_API: &str = "https://consumer-api.leafly.com/api/search/v1";
const STRAIN_URL_PREFIX: &str = "https://www.leafly.com/strains/";
const SEARCH_TAKE: u32 = 5;

#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: SearchHits,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchHits {
    #[serde(default)]
    pub strain: Vec<Strain>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strain {
    pub name: Option<String>,
    /// Alias list, e.g. "aka Blue Dream, Blueberry Haze"
    pub subtitle: Option<String>,
    pub slug: Option<String>,
    pub phenotype: Option<String>,
    pub short_description_plain: Option<String>,
    pub nug_image: Option<String>,
}

impl Strain {
    pub fn aliases(&self) -> Vec<&str> {
        let subtitle = self.subtitle.as_deref().unwrap_or_default();
        let subtitle = subtitle.strip_prefix("aka ").unwrap_or(subtitle);
        subtitle
            .split(',')
            .map(str::trim)
            .filter(|alias| !alias.is_empty())
            .collect()
    }

    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.name
            .as_deref()
            .into_iter()
            .chain(self.aliases())
            .any(|name| name.to_lowercase() == query)
    }

    pub fn url(&self) -> String {
        format!(
            "{}{}",
            STRAIN_URL_PREFIX,
            self.slug.as_deref().unwrap_or_default()
        )
    }
}

/// First strain, in API order, matching `query`
pub fn find_match<'a>(strains: &'a [Strain], query: &str) -> Option<&'a Strain> {
    strains.iter().find(|strain| strain.matches(query))
}

pub fn format_strain(strain: &Strain) -> String {
    let field = |value: &Option<String>| escape_html(value.as_deref().unwrap_or_default());
    format!(
        "<p><strong>{}</strong> <em>{}</em><br>({}) {}<br>\
         <a href=\"{}\">image</a> <a href=\"{}\">url</a></p>",
        field(&strain.name),
        field(&strain.subtitle),
        field(&strain.phenotype),
        field(&strain.short_description_plain),
        field(&strain.nug_image),
        escape_html(&strain.url()),
    )
}

#[derive(Debug, Clone)]
pub struct StrainCommand {
    http: reqwest::Client,
}

impl StrainCommand {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn search(&self, query: &str) -> Result<SearchResponse> {
        let take = SEARCH_TAKE.to_string();
        let params = [
            ("q", query),
            ("filter[all_strains]", "true"),
            ("skip", "0"),
            ("skip_aggs", "true"),
            ("take", take.as_str()),
        ];
        self.http
            .get(SEARCH_API)
            .query(&params)
            .send()
            .await
            .context("Leafly request failed")?
            .error_for_status()
            .context("Leafly returned an error status")?
            .json::<SearchResponse>()
            .await
            .context("Leafly returned malformed JSON")
    }
}

#[async_trait]
impl BotCommand for StrainCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<()> {
        ctx.typing().await;

        let query = ctx.invocation.query();
        let response = self.search(&query).await?;

        let Some(strain) = find_match(&response.hits.strain, &query) else {
            tracing::debug!(%query, "strain: no exact match");
            return Ok(());
        };

        ctx.reply(&format_strain(strain)).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strain(name: &str, subtitle: &str) -> Strain {
        Strain {
            name: Some(name.into()),
            subtitle: Some(subtitle.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_aliases_strip_aka() {
        let s = strain("Blue Dream", "aka Blueberry Haze, Azure Haze");
        assert_eq!(s.aliases(), vec!["Blueberry Haze", "Azure Haze"]);
    }

    #[test]
    fn test_matches_name_or_alias_case_insensitively() {
        let s = strain("Blue Dream", "aka Blueberry Haze");
        assert!(s.matches("blue dream"));
        assert!(s.matches("BLUEBERRY HAZE"));
        assert!(!s.matches("blue"));
    }

    #[test]
    fn test_find_match_takes_first_in_api_order() {
        let strains = vec![
            strain("Alpha", "aka Shared"),
            strain("Beta", "aka Shared"),
        ];
        let found = find_match(&strains, "shared").unwrap();
        assert_eq!(found.name.as_deref(), Some("Alpha"));
        assert!(find_match(&strains, "gamma").is_none());
    }

    #[test]
    fn test_parse_search_response() {
        let body = r#"{"hits":{"strain":[{
            "name":"Blue Dream","subtitle":"aka Azure Haze","slug":"blue-dream",
            "phenotype":"Hybrid","shortDescriptionPlain":"Sweet berry aroma.",
            "nugImage":"https://images.leafly.com/blue-dream.png"
        }]}}"#;
        let response: SearchResponse = serde_json::from_str(body).unwrap();
        let s = &response.hits.strain[0];
        assert_eq!(
            format_strain(s),
            "<p><strong>Blue Dream</strong> <em>aka Azure Haze</em><br>\
             (Hybrid) Sweet berry aroma.<br>\
             <a href=\"https://images.leafly.com/blue-dream.png\">image</a> \
             <a href=\"https://www.leafly.com/strains/blue-dream\">url</a></p>"
        );
    }

    #[test]
    fn test_missing_hits_is_empty() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(response.hits.strain.is_empty());
    }
}
