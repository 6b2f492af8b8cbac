use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::GenerationError;
use crate::{config::GeminiConfig, types::Song, utils};

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Client for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(http: Client, config: GeminiConfig) -> Self {
        Self { http, config }
    }

    /// Sends `instruction` and returns the concatenated text of the first
    /// candidate.
    pub async fn complete(&self, instruction: &str) -> Result<String, GenerationError> {
        let url = format!(
            "{api}/models/{model}:generateContent",
            api = self.config.api_url,
            model = self.config.model
        );

        let body = GenerateContentRequest {
            contents: [Content {
                parts: [Part { text: instruction }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Upstream { status, body });
        }

        let json = response.json::<GenerateContentResponse>().await?;
        let text: String = json
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        Ok(text)
    }
}

/// The instruction sent to the model for a playlist request.
pub fn build_instruction(prompt: &str, num_songs: usize) -> String {
    format!(
        "Generate a playlist of {num_songs} songs based on this prompt: \"{prompt}\".\n\
         Return ONLY a JSON array of objects with \"title\" and \"artist\" properties.\n\
         Do not include any markdown formatting, code blocks, or additional text.\n\
         Example format: [{{\"title\": \"Song Name\", \"artist\": \"Artist Name\"}}]"
    )
}

/// Parses the model's answer into exactly `num_songs` songs.
///
/// Code fences and surrounding prose are stripped. Entries that are not
/// objects with non-empty string `title` and `artist` are dropped; if fewer
/// than `num_songs` remain the answer is rejected, surplus entries are cut.
pub fn parse_songs(text: &str, num_songs: usize) -> Result<Vec<Song>, GenerationError> {
    let cleaned = utils::strip_code_fences(text);
    let value: Value = match serde_json::from_str(&cleaned) {
        Ok(value) => value,
        Err(_) => serde_json::from_str(utils::extract_json_array(&cleaned))?,
    };

    let Value::Array(entries) = value else {
        return Err(GenerationError::NotAnArray);
    };

    let total = entries.len();
    let mut songs: Vec<Song> = entries
        .iter()
        .filter_map(|entry| {
            let title = entry.get("title")?.as_str()?.trim();
            let artist = entry.get("artist")?.as_str()?.trim();
            if title.is_empty() || artist.is_empty() {
                return None;
            }
            Some(Song::new(title, artist))
        })
        .collect();

    if songs.len() < total {
        debug!(dropped = total - songs.len(), "discarded malformed entries from model answer");
    }

    if songs.len() < num_songs {
        return Err(GenerationError::TooFewSongs {
            expected: num_songs,
            got: songs.len(),
        });
    }

    songs.truncate(num_songs);
    Ok(songs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_answer() {
        let text = "```json\n\
            [{\"title\": \"Song A\", \"artist\": \"Artist A\"}, \
            {\"title\": \"Song B\", \"artist\": \"Artist B\"}]\n```";
        let songs = parse_songs(text, 2).unwrap();

        assert_eq!(songs[0], Song::new("Song A", "Artist A"));
        assert_eq!(songs[1], Song::new("Song B", "Artist B"));
    }

    #[test]
    fn parses_answer_wrapped_in_prose() {
        let text = "Sure! Here is your playlist: [{\"title\": \"X\", \"artist\": \"Y\"}] Enjoy.";
        let songs = parse_songs(text, 1).unwrap();
        assert_eq!(songs, vec![Song::new("X", "Y")]);
    }

    #[test]
    fn truncates_surplus_entries() {
        let text = r#"[
            {"title":"1","artist":"a"},
            {"title":"2","artist":"b"},
            {"title":"3","artist":"c"}
        ]"#;
        let songs = parse_songs(text, 2).unwrap();
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[1].title, "2");
    }

    #[test]
    fn drops_malformed_entries_and_reports_shortfall() {
        let text = r#"[
            {"title":"1","artist":"a"},
            {"title":"","artist":"b"},
            {"title":3,"artist":"c"},
            "junk"
        ]"#;
        match parse_songs(text, 2) {
            Err(GenerationError::TooFewSongs { expected, got }) => {
                assert_eq!(expected, 2);
                assert_eq!(got, 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(
            parse_songs("I cannot help with that.", 1),
            Err(GenerationError::InvalidJson(_))
        ));
    }

    #[test]
    fn rejects_non_array() {
        assert!(matches!(
            parse_songs(r#"{"title":"1","artist":"a"}"#, 1),
            Err(GenerationError::NotAnArray)
        ));
    }

    #[test]
    fn instruction_mentions_prompt_and_count() {
        let instruction = build_instruction("rainy day jazz", 7);
        assert!(instruction.contains("7 songs"));
        assert!(instruction.contains("\"rainy day jazz\""));
        assert!(instruction.contains("[{\"title\": \"Song Name\""));
    }
}
