//! Schema-mode and free-text generation against a scripted backend

mod common;

use chrono::NaiveDate;
use common::ScriptedBackend;
use landmarkai::{CrowdLevel, LandmarkAiError, StructuredGenerationClient};
use rstest::rstest;

const DETAIL_JSON: &str = r#"{
    "summary": "An ivory-white marble mausoleum on the Yamuna.",
    "architecture": "Mughal, blending Persian and Indian styles.",
    "keyFacts": [
        {"label": "Built", "value": "1632-1653"},
        {"label": "Commissioned by", "value": "Shah Jahan"}
    ],
    "guidelines": "Shoe covers are required on the main platform.",
    "precautions": "Do not touch the inlay work."
}"#;

fn christmas() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 25).unwrap()
}

fn forecast_json(level: &str) -> String {
    format!(r#"{{"level": "{level}", "visitorCount": "20,000 - 25,000", "recommendation": "Arrive before 8am."}}"#)
}

#[tokio::test]
async fn test_fetch_landmark_detail() {
    let backend = ScriptedBackend::replying(DETAIL_JSON);
    let client = StructuredGenerationClient::new(backend.clone());

    let detail = client.fetch_landmark_detail("Taj Mahal").await.unwrap();
    assert_eq!(detail.key_facts.len(), 2);
    assert_eq!(detail.key_facts[1].value, "Shah Jahan");
    assert!(detail.architecture.starts_with("Mughal"));

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].prompt, "Provide detailed information for the monument: Taj Mahal.");
    assert!(requests[0].response_schema.is_some());
    assert!(requests[0].image.is_none());
}

#[rstest]
#[case::not_json("The Taj Mahal is a mausoleum.")]
#[case::truncated(r#"{"summary": "A mausoleum", "architecture": "#)]
#[case::missing_field(r#"{"summary": "x", "architecture": "y", "guidelines": "z", "precautions": "w"}"#)]
#[case::wrong_type(r#"{"summary": "x", "architecture": "y", "keyFacts": "none", "guidelines": "z", "precautions": "w"}"#)]
#[case::bad_nested_item(r#"{"summary": "x", "architecture": "y", "keyFacts": [{"label": "Built"}], "guidelines": "z", "precautions": "w"}"#)]
#[case::blank("   ")]
#[tokio::test]
async fn test_detail_failures_are_malformed(#[case] reply: &str) {
    let client = StructuredGenerationClient::new(ScriptedBackend::replying(reply));
    let err = client.fetch_landmark_detail("Taj Mahal").await.unwrap_err();
    assert!(matches!(err, LandmarkAiError::MalformedResponse { .. }), "got {err:?}");
    assert!(err.is_retryable());
}

#[rstest]
#[case("Low", CrowdLevel::Low)]
#[case("Medium", CrowdLevel::Medium)]
#[case("High", CrowdLevel::High)]
#[case("Very Busy", CrowdLevel::Medium)]
#[case("Extreme", CrowdLevel::Medium)]
#[tokio::test]
async fn test_crowd_level_normalization(#[case] level: &str, #[case] expected: CrowdLevel) {
    let client = StructuredGenerationClient::new(ScriptedBackend::replying(&forecast_json(level)));
    let forecast = client.fetch_crowd_forecast("India Gate", christmas()).await.unwrap();
    assert_eq!(forecast.level, expected);
    assert_eq!(forecast.visitor_count, "20,000 - 25,000");
    assert_eq!(forecast.recommendation, "Arrive before 8am.");
}

#[tokio::test]
async fn test_wrong_casing_is_malformed() {
    let client = StructuredGenerationClient::new(ScriptedBackend::replying(&forecast_json("high")));
    let err = client.fetch_crowd_forecast("India Gate", christmas()).await.unwrap_err();
    assert!(matches!(err, LandmarkAiError::MalformedResponse { .. }));
}

#[tokio::test]
async fn test_forecast_prompt_mentions_date() {
    let backend = ScriptedBackend::replying(&forecast_json("Low"));
    let client = StructuredGenerationClient::new(backend.clone());
    client.fetch_crowd_forecast("India Gate", christmas()).await.unwrap();

    let prompt = &backend.requests()[0].prompt;
    assert!(prompt.contains("India Gate"));
    assert!(prompt.contains("2024-12-25"));
    assert!(prompt.contains("holidays"));
}

#[tokio::test]
async fn test_service_errors_pass_through() {
    let backend = ScriptedBackend::new();
    backend.push_error(LandmarkAiError::unavailable("HTTP 500"));
    let client = StructuredGenerationClient::new(backend);

    let err = client.fetch_crowd_forecast("Red Fort", christmas()).await.unwrap_err();
    assert!(matches!(err, LandmarkAiError::ServiceUnavailable { .. }));
}

#[tokio::test]
async fn test_legacy_description_is_trimmed_text() {
    let backend = ScriptedBackend::replying("\n  Built by Shah Jahan. Entry: 50 INR.  \n");
    let client = StructuredGenerationClient::new(backend.clone());

    let description = client.describe_landmark_legacy_fields("Taj Mahal").await.unwrap();
    assert_eq!(description, "Built by Shah Jahan. Entry: 50 INR.");
    assert!(backend.requests()[0].response_schema.is_none());
}

#[tokio::test]
async fn test_legacy_description_blank_is_empty_response() {
    let client = StructuredGenerationClient::new(ScriptedBackend::replying(""));
    let err = client.describe_landmark_legacy_fields("Taj Mahal").await.unwrap_err();
    assert!(matches!(err, LandmarkAiError::EmptyResponse { .. }));
}
