//! `generateContent` with the file search tool, and citation extraction.

use {
    serde::{Deserialize, Serialize},
    serde_json::json,
    tracing::debug,
};

use crate::{GeminiClient, Result};

/// A citation linking the answer to a retrieved source chunk.
///
/// Optional fields the vendor left out are omitted from the serialized
/// form rather than treated as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingChunk {
    #[serde(default)]
    pub retrieved_context: Option<RetrievedContext>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievedContext {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }

    /// Citations from the first candidate's grounding metadata. Chunks
    /// without retrieved context are skipped.
    pub fn citations(&self) -> Vec<Citation> {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|grounding| {
                grounding
                    .grounding_chunks
                    .iter()
                    .filter_map(|chunk| chunk.retrieved_context.as_ref())
                    .map(|ctx| Citation {
                        title: ctx.title.clone(),
                        uri: ctx.uri.clone(),
                        text: ctx.text.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl GeminiClient {
    /// Run retrieval-augmented generation: the flattened prompt plus the
    /// `fileSearch` tool pointed at `store_names`, optionally narrowed by a
    /// metadata filter.
    pub async fn generate_with_file_search(
        &self,
        model: &str,
        prompt: &str,
        store_names: &[String],
        metadata_filter: Option<&str>,
    ) -> Result<GenerateContentResponse> {
        let mut file_search = json!({ "fileSearchStoreNames": store_names });
        if let Some(filter) = metadata_filter.filter(|f| !f.is_empty()) {
            file_search["metadataFilter"] = json!(filter);
        }

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "tools": [{ "fileSearch": file_search }],
        });

        let response = self
            .http
            .post(format!("{}:generateContent", self.url(&format!("models/{model}"))))
            .header("x-goog-api-key", self.api_key())
            .json(&body)
            .send()
            .await
            .map_err(Self::transport("models.generateContent"))?;
        let response = Self::check("models.generateContent", response).await?;
        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(Self::transport("models.generateContent"))?;
        debug!(
            model,
            citations = parsed.citations().len(),
            "generation complete"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use secrecy::Secret;

    use super::*;

    #[test]
    fn text_joins_parts() {
        let json = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "Hello, "}, {"text": "world."}]}
            }]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), "Hello, world.");
    }

    #[test]
    fn citations_extracted_with_partial_fields() {
        let json = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "answer"}]},
                "groundingMetadata": {
                    "groundingChunks": [
                        {"retrievedContext": {"title": "doc.pdf", "text": "chunk one"}},
                        {"retrievedContext": {"uri": "files/abc"}},
                        {}
                    ]
                }
            }]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let citations = response.citations();
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].title.as_deref(), Some("doc.pdf"));
        assert!(citations[0].uri.is_none());
        assert_eq!(citations[1].uri.as_deref(), Some("files/abc"));

        // Omitted fields stay out of the serialized citation.
        let serialized = serde_json::to_value(&citations[1]).unwrap();
        assert_eq!(serialized, serde_json::json!({"uri": "files/abc"}));
    }

    #[test]
    fn missing_grounding_metadata_is_empty_citations() {
        let json = r#"{"candidates": [{"content": {"parts": [{"text": "plain"}]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert!(response.citations().is_empty());
    }

    #[test]
    fn empty_response_yields_empty_text() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.text(), "");
        assert!(response.citations().is_empty());
    }

    #[tokio::test]
    async fn request_carries_tool_and_filter() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "contents": [{"parts": [{"text": "User: hi\n\nAssistant:"}]}],
                "tools": [{"fileSearch": {
                    "fileSearchStoreNames": ["fileSearchStores/abc"],
                    "metadataFilter": "author = \"ada\""
                }}]
            })))
            .with_body(r#"{"candidates": [{"content": {"parts": [{"text": "hello"}]}}]}"#)
            .create_async()
            .await;

        let client =
            GeminiClient::new(Secret::new("k".into())).with_base_url(server.url());
        let response = client
            .generate_with_file_search(
                "gemini-2.5-flash",
                "User: hi\n\nAssistant:",
                &["fileSearchStores/abc".to_string()],
                Some("author = \"ada\""),
            )
            .await
            .unwrap();
        assert_eq!(response.text(), "hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_filter_not_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/m:generateContent")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "contents": [{"parts": [{"text": "p"}]}],
                "tools": [{"fileSearch": {
                    "fileSearchStoreNames": ["fileSearchStores/x"]
                }}]
            })))
            .with_body(r#"{"candidates": []}"#)
            .create_async()
            .await;

        let client =
            GeminiClient::new(Secret::new("k".into())).with_base_url(server.url());
        client
            .generate_with_file_search("m", "p", &["fileSearchStores/x".to_string()], Some(""))
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
