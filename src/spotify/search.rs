use super::{SpotifyClient, SpotifyError};
use crate::types::SearchResponse;

impl SpotifyClient {
    /// Returns the URI of the best catalog match for `query`, if any.
    pub async fn search_track(
        &self,
        token: &str,
        query: &str,
    ) -> Result<Option<String>, SpotifyError> {
        let url = self.api("/search");
        let response = self
            .send(|| {
                self.http
                    .get(&url)
                    .bearer_auth(token)
                    .query(&[("q", query), ("type", "track"), ("limit", "1")])
            })
            .await?;

        let json = response.json::<SearchResponse>().await?;
        Ok(json.tracks.items.into_iter().next().map(|t| t.uri))
    }
}
