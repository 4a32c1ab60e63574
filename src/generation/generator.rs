//! LLM-backed recipe generation
//!
//! The generator is an external collaborator behind the `RecipeGenerator`
//! trait. The shipped implementation calls an Anthropic-style messages API,
//! asks for a JSON recipe document, and parses it into a `RecipeDraft`.
//! A generation failure is fatal to the current request: the orchestrator
//! retries diversity rejections, never generator outages.

use crate::error::{RepertoireError, Result};
use crate::types::{DiversityConstraints, RecipeDraft};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::debug;

/// Recipe generator contract
///
/// `temperature` controls sampling entropy and rises across retry attempts.
/// `constraints`, when present, carry the avoid/suggest hints derived from
/// the user's recent history.
#[async_trait]
pub trait RecipeGenerator: Send + Sync {
    async fn generate(
        &self,
        meal_type: &str,
        style_type: &str,
        constraints: Option<&DiversityConstraints>,
        temperature: f32,
    ) -> Result<RecipeDraft>;
}

/// Configuration for the LLM generator
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Anthropic API key
    pub api_key: String,

    /// Model to use
    pub model: String,

    /// Max tokens for responses
    pub max_tokens: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            model: "claude-3-5-haiku-20241022".to_string(),
            max_tokens: 2048,
        }
    }
}

/// Anthropic API message format
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: usize,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    text: String,
}

/// Recipe generator backed by an LLM messages API
#[derive(Debug)]
pub struct LlmRecipeGenerator {
    config: GeneratorConfig,
    client: Client,
}

impl LlmRecipeGenerator {
    /// Create a new generator with custom config
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(RepertoireError::config("ANTHROPIC_API_KEY not set"));
        }

        Ok(Self {
            config,
            client: Client::new(),
        })
    }

    /// Create with default config
    pub fn with_default() -> Result<Self> {
        Self::new(GeneratorConfig::default())
    }

    fn build_prompt(
        meal_type: &str,
        style_type: &str,
        constraints: Option<&DiversityConstraints>,
    ) -> String {
        let mut prompt = format!(
            r#"Create a {style} {meal} recipe.

Respond with ONLY a JSON object, no prose, with this shape:
{{
  "name": "...",
  "notes": "...",
  "ingredients": [{{"item": "...", "quantity": "..."}}],
  "instructions": ["step 1", "step 2"],
  "servings": 2,
  "prep_minutes": 10,
  "cook_minutes": 20,
  "nutrition": {{"calories": 0, "protein_g": 0, "carbs_g": 0, "fat_g": 0}},
  "metadata": {{"cuisine": "...", "primary_protein": "...", "cooking_method": "...", "meal_type": "{meal}"}}
}}
"#,
            style = style_type,
            meal = meal_type,
        );

        if let Some(c) = constraints.filter(|c| !c.is_empty()) {
            prompt.push('\n');
            if !c.avoid_cuisines.is_empty() {
                prompt.push_str(&format!("Avoid these cuisines: {}.\n", c.avoid_cuisines.join(", ")));
            }
            if !c.avoid_proteins.is_empty() {
                prompt.push_str(&format!("Avoid these proteins: {}.\n", c.avoid_proteins.join(", ")));
            }
            if !c.avoid_methods.is_empty() {
                prompt.push_str(&format!(
                    "Avoid these cooking methods: {}.\n",
                    c.avoid_methods.join(", ")
                ));
            }
            if !c.suggest_proteins.is_empty() {
                prompt.push_str(&format!(
                    "Prefer one of these proteins: {}.\n",
                    c.suggest_proteins.join(", ")
                ));
            }
        }

        prompt
    }

    /// Extract and parse the JSON document from the completion text
    ///
    /// Models occasionally wrap the JSON in prose or code fences, so we take
    /// the outermost braces.
    fn parse_draft(text: &str) -> Result<RecipeDraft> {
        let start = text.find('{');
        let end = text.rfind('}');

        let json = match (start, end) {
            (Some(s), Some(e)) if e > s => &text[s..=e],
            _ => {
                return Err(RepertoireError::Generation(
                    "No JSON object in generator response".to_string(),
                ))
            }
        };

        let draft: RecipeDraft = serde_json::from_str(json)
            .map_err(|e| RepertoireError::Generation(format!("Unparseable draft: {}", e)))?;

        Self::validate_draft(&draft)?;
        Ok(draft)
    }

    /// A usable draft has a name, ingredients, and instructions
    fn validate_draft(draft: &RecipeDraft) -> Result<()> {
        if draft.name.trim().is_empty() {
            return Err(RepertoireError::Generation(
                "Draft has an empty name".to_string(),
            ));
        }
        if draft.ingredients.is_empty() {
            return Err(RepertoireError::Generation(
                "Draft has no ingredients".to_string(),
            ));
        }
        if draft.instructions.is_empty() {
            return Err(RepertoireError::Generation(
                "Draft has no instructions".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RecipeGenerator for LlmRecipeGenerator {
    async fn generate(
        &self,
        meal_type: &str,
        style_type: &str,
        constraints: Option<&DiversityConstraints>,
        temperature: f32,
    ) -> Result<RecipeDraft> {
        debug!(meal_type, style_type, temperature, "Generating recipe draft");

        let request = AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature,
            messages: vec![Message {
                role: "user".to_string(),
                content: Self::build_prompt(meal_type, style_type, constraints),
            }],
        };

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RepertoireError::Generation(format!(
                "Generator API error (status {}): {}",
                status, body
            )));
        }

        let body: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| RepertoireError::Generation(e.to_string()))?;

        let text = body
            .content
            .first()
            .map(|c| c.text.as_str())
            .unwrap_or_default();

        Self::parse_draft(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IngredientEntry;

    #[test]
    fn test_parse_draft_from_fenced_response() {
        let text = r#"Here is your recipe:
```json
{
  "name": "Sumac Chicken",
  "ingredients": [{"item": "chicken thigh", "quantity": "500 g"}, "sumac"],
  "instructions": ["Season", "Grill"],
  "servings": 2,
  "metadata": {"cuisine": "turkish", "primary_protein": "chicken", "cooking_method": "grilling"}
}
```"#;

        let draft = LlmRecipeGenerator::parse_draft(text).unwrap();
        assert_eq!(draft.name, "Sumac Chicken");
        assert_eq!(draft.ingredients.len(), 2);
        assert_eq!(draft.ingredients[1], IngredientEntry::Raw("sumac".to_string()));
        assert_eq!(draft.metadata.cuisine.as_deref(), Some("turkish"));
    }

    #[test]
    fn test_parse_draft_rejects_prose() {
        let err = LlmRecipeGenerator::parse_draft("Sorry, I can't do that").unwrap_err();
        assert!(matches!(err, RepertoireError::Generation(_)));
    }

    #[test]
    fn test_parse_draft_rejects_empty_ingredients() {
        let text = r#"{"name": "Nothing", "ingredients": [], "instructions": ["step"]}"#;
        let err = LlmRecipeGenerator::parse_draft(text).unwrap_err();
        assert!(matches!(err, RepertoireError::Generation(_)));
    }

    #[test]
    fn test_prompt_carries_constraints() {
        let constraints = DiversityConstraints {
            avoid_proteins: vec!["chicken".to_string()],
            suggest_proteins: vec!["fish".to_string()],
            ..Default::default()
        };

        let prompt = LlmRecipeGenerator::build_prompt("dinner", "quick", Some(&constraints));
        assert!(prompt.contains("Avoid these proteins: chicken"));
        assert!(prompt.contains("Prefer one of these proteins: fish"));
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let result = LlmRecipeGenerator::new(GeneratorConfig {
            api_key: String::new(),
            ..Default::default()
        });
        assert!(matches!(result.unwrap_err(), RepertoireError::Config(_)));
    }
}
