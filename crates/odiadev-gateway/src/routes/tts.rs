use actix_web::{http::header, web, HttpRequest, HttpResponse};
use odiadev::validation::validate_input;
use odiadev::InputKind;
use serde_json::Value;
use std::str::FromStr;

use crate::error::GatewayError;
use crate::guard::{check_rate_limit, require_api_key};
use crate::metrics::TTS_REQUESTS_TOTAL;
use crate::routes::{method_not_allowed, read_sanitized_json};
use crate::state::AppState;
use crate::upstream::tts::{AudioFormat, TtsRequest, Voice};

const MIN_RATE: f64 = 0.5;
const MAX_RATE: f64 = 2.0;

/// Validate a `/tts/speak` body into an upstream request.
pub fn parse_tts_request(
    body: &Value,
    default_voice: Voice,
    max_text_len: usize,
) -> Result<TtsRequest, GatewayError> {
    let text = body
        .get("text")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    validate_input(
        &Value::from(text),
        InputKind::Text {
            min_len: 1,
            max_len: max_text_len,
        },
    )
    .into_result("text")?;

    let voice = match body.get("voice") {
        None | Some(Value::Null) => default_voice,
        Some(Value::String(v)) => Voice::from_str(v).map_err(|_| {
            GatewayError::validation(
                "voice",
                format!(
                    "must be one of {}",
                    Voice::ALL.map(|v| v.as_str()).join(", ")
                ),
            )
        })?,
        Some(_) => return Err(GatewayError::validation("voice", "must be a string")),
    };

    let format = match body.get("format") {
        None | Some(Value::Null) => AudioFormat::default(),
        Some(Value::String(f)) => AudioFormat::from_str(f)
            .map_err(|_| GatewayError::validation("format", "must be mp3 or wav"))?,
        Some(_) => return Err(GatewayError::validation("format", "must be a string")),
    };

    Ok(TtsRequest {
        text: text.to_string(),
        voice,
        speed: rate_field(body, "speed")?,
        pitch: rate_field(body, "pitch")?,
        format,
    })
}

/// Optional 0.5..=2.0 multiplier, defaulting to 1.0.
fn rate_field(body: &Value, field: &str) -> Result<f64, GatewayError> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(1.0),
        Some(v) => {
            validate_input(
                v,
                InputKind::Number {
                    min: MIN_RATE,
                    max: MAX_RATE,
                },
            )
            .into_result(field)?;
            Ok(v.as_f64().unwrap_or(1.0))
        }
    }
}

/// POST /tts/speak - Synthesize speech and relay the audio
pub async fn speak(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    check_rate_limit(&req, &state)?;
    require_api_key(&req, &state.config).await?;

    let body = read_sanitized_json(payload, state.config.max_request_size).await?;
    let request = parse_tts_request(
        &body,
        state.config.tts_default_voice,
        state.config.tts_max_text_length,
    )?;

    let audio = match state.tts.synthesize(&request).await {
        Ok(audio) => audio,
        Err(e) => {
            TTS_REQUESTS_TOTAL.with_label_values(&["failed"]).inc();
            tracing::warn!(voice = request.voice.as_str(), error = %e, "TTS synthesis failed");
            return Err(e.into());
        }
    };

    TTS_REQUESTS_TOTAL.with_label_values(&["success"]).inc();
    tracing::info!(
        voice = request.voice.as_str(),
        chars = request.text.chars().count(),
        bytes = audio.bytes.len(),
        "speech synthesized"
    );

    Ok(HttpResponse::Ok()
        .content_type(audio.content_type)
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .body(audio.bytes))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/tts/speak")
            .route(web::post().to(speak))
            .default_service(web::to(method_not_allowed)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: Value) -> Result<TtsRequest, GatewayError> {
        parse_tts_request(&body, Voice::NigerianFemale, 500)
    }

    #[test]
    fn test_defaults() {
        let req = parse(json!({"text": "Welcome to ODIADEV"})).unwrap();
        assert_eq!(req.voice, Voice::NigerianFemale);
        assert_eq!(req.format, AudioFormat::Mp3);
        assert_eq!(req.speed, 1.0);
        assert_eq!(req.pitch, 1.0);
    }

    #[test]
    fn test_text_required_and_bounded() {
        assert!(matches!(
            parse(json!({})),
            Err(GatewayError::Validation { ref field, .. }) if field == "text"
        ));
        assert!(parse(json!({"text": "   "})).is_err());
        assert!(parse(json!({"text": "a".repeat(501)})).is_err());
        assert!(parse(json!({"text": "a".repeat(500)})).is_ok());
    }

    #[test]
    fn test_voice_enum() {
        let req = parse(json!({"text": "Báwo ni", "voice": "yoruba-male"})).unwrap();
        assert_eq!(req.voice, Voice::YorubaMale);
        assert!(parse(json!({"text": "hi", "voice": "robot"})).is_err());
    }

    #[test]
    fn test_rates_bounded() {
        assert!(parse(json!({"text": "hi", "speed": 0.5, "pitch": 2.0})).is_ok());
        assert!(parse(json!({"text": "hi", "speed": 0.4})).is_err());
        assert!(parse(json!({"text": "hi", "pitch": 2.1})).is_err());
        assert!(parse(json!({"text": "hi", "speed": "fast"})).is_err());
    }

    #[test]
    fn test_format() {
        let req = parse(json!({"text": "hi", "format": "wav"})).unwrap();
        assert_eq!(req.format, AudioFormat::Wav);
        assert!(parse(json!({"text": "hi", "format": "ogg"})).is_err());
    }
}
