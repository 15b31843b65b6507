//! Recording downloads from the telephony provider

use std::time::Duration;

use agrow_config::TelephonyConfig;
use agrow_core::AudioClip;

use crate::ServerError;

pub struct RecordingFetcher {
    client: reqwest::Client,
    account_sid: Option<String>,
    auth_token: Option<String>,
}

impl RecordingFetcher {
    pub fn new(config: &TelephonyConfig) -> Result<Self, ServerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.download_timeout_ms))
            .build()
            .map_err(|e| ServerError::Startup(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    /// Download the recording at `recording_url` as WAV.
    ///
    /// Twilio serves a recording in the format named by the URL suffix, so
    /// bare URLs get `.wav` appended.
    #[tracing::instrument(skip(self))]
    pub async fn fetch(&self, recording_url: &str) -> Result<AudioClip, ServerError> {
        let url = wav_url(recording_url);
        let mut request = self.client.get(&url);
        if let Some(sid) = &self.account_sid {
            request = request.basic_auth(sid, self.auth_token.as_deref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ServerError::Recording(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServerError::Recording(format!("{} returned {}", url, status)));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServerError::Recording(e.to_string()))?
            .to_vec();

        let clip = AudioClip::from_bytes(bytes);
        tracing::debug!(bytes = clip.len(), format = ?clip.format, "Recording downloaded");
        Ok(clip)
    }
}

fn wav_url(recording_url: &str) -> String {
    let trimmed = recording_url.trim();
    if trimmed.ends_with(".wav") || trimmed.ends_with(".mp3") {
        trimmed.to_string()
    } else {
        format!("{}.wav", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_suffix() {
        assert_eq!(
            wav_url("https://api.twilio.com/2010-04-01/Accounts/AC1/Recordings/RE1"),
            "https://api.twilio.com/2010-04-01/Accounts/AC1/Recordings/RE1.wav"
        );
        assert_eq!(wav_url("https://x/RE1.mp3"), "https://x/RE1.mp3");
    }
}
