use bytes::Bytes;
use odiadev::{RetryPolicy, Sleeper};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use super::{send_with_retry, UpstreamError};

const SERVICE: &str = "tts";

/// Voices offered by the TTS backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Voice {
    #[default]
    NigerianFemale,
    NigerianMale,
    YorubaFemale,
    YorubaMale,
    IgboFemale,
    IgboMale,
    HausaFemale,
    HausaMale,
}

impl Voice {
    pub const ALL: [Voice; 8] = [
        Voice::NigerianFemale,
        Voice::NigerianMale,
        Voice::YorubaFemale,
        Voice::YorubaMale,
        Voice::IgboFemale,
        Voice::IgboMale,
        Voice::HausaFemale,
        Voice::HausaMale,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::NigerianFemale => "nigerian-female",
            Voice::NigerianMale => "nigerian-male",
            Voice::YorubaFemale => "yoruba-female",
            Voice::YorubaMale => "yoruba-male",
            Voice::IgboFemale => "igbo-female",
            Voice::IgboMale => "igbo-male",
            Voice::HausaFemale => "hausa-female",
            Voice::HausaMale => "hausa-male",
        }
    }
}

impl FromStr for Voice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Voice::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| format!("unknown voice: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Wav,
}

impl AudioFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
        }
    }
}

impl FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mp3" => Ok(AudioFormat::Mp3),
            "wav" => Ok(AudioFormat::Wav),
            other => Err(format!("unknown format: {other}")),
        }
    }
}

/// Body sent to the TTS backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TtsRequest {
    pub text: String,
    pub voice: Voice,
    pub speed: f64,
    pub pitch: f64,
    pub format: AudioFormat,
}

/// Synthesized audio and its content type.
#[derive(Debug, Clone)]
pub struct Audio {
    pub bytes: Bytes,
    pub content_type: &'static str,
}

#[derive(Clone)]
pub struct TtsClient {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl TtsClient {
    pub fn new(
        http: reqwest::Client,
        url: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            timeout,
            retry,
            sleeper,
        }
    }

    pub async fn synthesize(&self, request: &TtsRequest) -> Result<Audio, UpstreamError> {
        let bytes = send_with_retry(
            SERVICE,
            &self.retry,
            self.sleeper.as_ref(),
            self.timeout,
            || self.http.post(&self.url).json(request),
        )
        .await?;
        if bytes.is_empty() {
            return Err(UpstreamError::InvalidResponse {
                service: SERVICE,
                message: "empty audio body".to_string(),
            });
        }

        Ok(Audio {
            bytes,
            content_type: request.format.content_type(),
        })
    }
}
