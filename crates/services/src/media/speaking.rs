use async_trait::async_trait;
use serde_json::json;

use super::audio_session::{AudioSessionError, SpeakingStatusSink};

/// Reports the local microphone state through the room API on behalf of
/// the signed-in user.
#[derive(Debug, Clone)]
pub struct HttpSpeakingSink {
    client: reqwest::Client,
    api_base: String,
    access_token: String,
}

impl HttpSpeakingSink {
    pub fn new(client: reqwest::Client, api_base: &str, access_token: String) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token,
        }
    }

    fn endpoint(&self, room_id: &str) -> String {
        format!("{}/api/room/{room_id}/speaking", self.api_base)
    }
}

#[async_trait]
impl SpeakingStatusSink for HttpSpeakingSink {
    async fn update_speaking_status(
        &self,
        room_id: &str,
        is_speaking: bool,
    ) -> Result<(), AudioSessionError> {
        self.client
            .post(self.endpoint(room_id))
            .bearer_auth(&self.access_token)
            .json(&json!({ "is_speaking": is_speaking }))
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| AudioSessionError::Sink(e.to_string()))?;
        Ok(())
    }
}
