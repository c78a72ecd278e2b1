//! Per-record coating classification with bounded retry.
//!
//! Each attempt renders the record, posts it with zero temperature, and
//! expects the reply content to be a JSON object holding `coating_type`
//! and optionally `confidence`. Any failure (transport, status, envelope,
//! content) is retried after an exponential backoff of `0.5 * 2^attempt`
//! seconds. Exhausting the attempts yields an empty [`Verdict`]; nothing is
//! raised to the caller.

use std::time::Duration;

use cancoat_core::{PatentRecord, is_known_coating};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::pause::Pause;
use crate::prompt::build_messages;
use crate::transport::{ChatRequest, ChatResponse, ChatTransport, ClassifyError};

pub const DEFAULT_MODEL: &str = "x-ai/grok-4-fast";
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// Knobs for a classification run.
///
/// `max_retries` bounds attempts per record; `delay` throttles between
/// records. The two are independent.
#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    pub model: String,
    pub max_retries: u32,
    pub delay: Duration,
    pub include_era: bool,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            delay: DEFAULT_DELAY,
            include_era: false,
        }
    }
}

/// The model's answer for one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Verdict {
    pub coating_type: Option<String>,
    pub confidence: Option<f64>,
}

/// Backoff before the attempt following `attempt` (1-based): 1s, 2s, 4s, ...
/// Saturates at [`Duration::MAX`].
pub fn backoff_delay(attempt: u32) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    Duration::try_from_secs_f64(0.5 * 2f64.powi(exponent)).unwrap_or(Duration::MAX)
}

/// Classifies records one at a time through a [`ChatTransport`].
pub struct CoatingClassifier {
    transport: Box<dyn ChatTransport>,
    pause: Box<dyn Pause>,
    settings: ClassifierSettings,
}

impl CoatingClassifier {
    pub fn new(
        transport: Box<dyn ChatTransport>,
        pause: Box<dyn Pause>,
        settings: ClassifierSettings,
    ) -> Self {
        Self {
            transport,
            pause,
            settings,
        }
    }

    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    pub(crate) async fn pause(&self, duration: Duration) {
        self.pause.pause(duration).await;
    }

    /// Classify one record. Never fails: exhausted retries give an empty verdict.
    pub async fn classify(&self, record: &PatentRecord) -> Verdict {
        let request = ChatRequest {
            model: self.settings.model.clone(),
            messages: build_messages(record),
            temperature: 0.0,
        };
        let max_retries = self.settings.max_retries;

        for attempt in 1..=max_retries {
            match self.transport.complete(&request).await.and_then(parse_reply) {
                Ok(verdict) => {
                    debug!(
                        publication_number = %record.publication_number,
                        attempt,
                        coating_type = ?verdict.coating_type,
                        "classified"
                    );
                    return verdict;
                }
                Err(e) => {
                    warn!(
                        publication_number = %record.publication_number,
                        attempt,
                        max_retries,
                        error = %e,
                        "classification attempt failed"
                    );
                }
            }
            if attempt < max_retries {
                self.pause.pause(backoff_delay(attempt)).await;
            }
        }

        error!(
            publication_number = %record.publication_number,
            max_retries,
            "classification failed after all attempts"
        );
        Verdict::default()
    }
}

/// Extract the verdict from a reply envelope.
pub fn parse_reply(response: ChatResponse) -> Result<Verdict, ClassifyError> {
    let content = response
        .choices
        .and_then(|choices| choices.into_iter().next())
        .ok_or(ClassifyError::MissingChoices)?
        .message
        .and_then(|m| m.content)
        .unwrap_or_default();
    let content = content.trim();
    if content.is_empty() {
        return Err(ClassifyError::EmptyContent);
    }

    let parsed: Value =
        serde_json::from_str(content).map_err(|source| ClassifyError::InvalidJson {
            content: content.to_string(),
            source,
        })?;
    let Value::Object(fields) = parsed else {
        return Err(ClassifyError::InvalidField {
            field: "reply",
            value: content.to_string(),
        });
    };

    let coating_type = match fields.get("coating_type") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            return Err(ClassifyError::InvalidField {
                field: "coating_type",
                value: other.to_string(),
            });
        }
    };

    let confidence = match fields.get("confidence") {
        None | Some(Value::Null) => None,
        Some(value) => Some(parse_confidence(value)?),
    };

    if let Some(label) = &coating_type
        && !is_known_coating(label)
    {
        warn!(coating_type = %label, "received coating_type outside expected choices");
    }

    Ok(Verdict {
        coating_type,
        confidence,
    })
}

fn parse_confidence(value: &Value) -> Result<f64, ClassifyError> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number
        .filter(|n| n.is_finite())
        .ok_or_else(|| ClassifyError::InvalidField {
            field: "confidence",
            value: value.to_string(),
        })
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::pause::testing::RecordingPause;

    fn record() -> PatentRecord {
        PatentRecord {
            publication_number: "US-1-B2".into(),
            publication_year: Some(2020),
            ..Default::default()
        }
    }

    fn classifier(
        transport: &ScriptedTransport,
        pause: &RecordingPause,
        max_retries: u32,
    ) -> CoatingClassifier {
        CoatingClassifier::new(
            Box::new(transport.clone()),
            Box::new(pause.clone()),
            ClassifierSettings {
                max_retries,
                ..Default::default()
            },
        )
    }

    #[test]
    fn backoff_doubles_from_one_second() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(3), Duration::from_secs(4));
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        assert_eq!(backoff_delay(70), Duration::MAX);
        assert_eq!(backoff_delay(u32::MAX), Duration::MAX);
        assert!(backoff_delay(60) < Duration::MAX);
    }

    #[tokio::test]
    async fn fails_twice_then_succeeds() {
        let transport = ScriptedTransport::new(
            vec![
                server_error(),
                reply("not json"),
                reply(r#"{"coating_type": "Polyester", "confidence": 0.82}"#),
            ],
            server_error,
        );
        let pause = RecordingPause::default();

        let verdict = classifier(&transport, &pause, 3).classify(&record()).await;

        assert_eq!(verdict.coating_type.as_deref(), Some("Polyester"));
        assert_eq!(verdict.confidence, Some(0.82));
        assert_eq!(transport.calls(), 3);
        assert_eq!(
            pause.recorded(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn always_failing_gives_up_after_max_retries() {
        for n in [1u32, 3, 5] {
            let transport = ScriptedTransport::always_failing();
            let pause = RecordingPause::default();

            let verdict = classifier(&transport, &pause, n).classify(&record()).await;

            assert_eq!(verdict, Verdict::default());
            assert_eq!(transport.calls(), n as usize);
            // No backoff after the final attempt.
            assert_eq!(pause.recorded().len(), n as usize - 1);
        }
    }

    #[tokio::test]
    async fn first_attempt_success_never_pauses() {
        let transport =
            ScriptedTransport::new(vec![reply(r#"{"coating_type": "Acrylic"}"#)], server_error);
        let pause = RecordingPause::default();

        let verdict = classifier(&transport, &pause, 3).classify(&record()).await;

        assert_eq!(verdict.coating_type.as_deref(), Some("Acrylic"));
        assert_eq!(verdict.confidence, None);
        assert!(pause.recorded().is_empty());
    }

    #[test]
    fn unknown_label_is_kept() {
        let verdict =
            parse_reply(envelope(r#"{"coating_type": "Lacquer"}"#)).unwrap();
        assert_eq!(verdict.coating_type.as_deref(), Some("Lacquer"));
    }

    #[test]
    fn out_of_range_confidence_is_not_clamped() {
        let verdict = parse_reply(envelope(
            r#"{"coating_type": "PVC", "confidence": 1.7}"#,
        ))
        .unwrap();
        assert_eq!(verdict.confidence, Some(1.7));
    }

    #[test]
    fn numeric_string_confidence_accepted() {
        let verdict = parse_reply(envelope(
            r#"{"coating_type": "PVC", "confidence": "0.5"}"#,
        ))
        .unwrap();
        assert_eq!(verdict.confidence, Some(0.5));
    }

    #[test]
    fn content_is_trimmed() {
        let verdict =
            parse_reply(envelope("  {\"coating_type\": \"Hybrid\"}\n")).unwrap();
        assert_eq!(verdict.coating_type.as_deref(), Some("Hybrid"));
    }

    #[test]
    fn envelope_failures() {
        assert!(matches!(
            parse_reply(ChatResponse::default()),
            Err(ClassifyError::MissingChoices)
        ));
        assert!(matches!(
            parse_reply(ChatResponse {
                choices: Some(vec![])
            }),
            Err(ClassifyError::MissingChoices)
        ));
        assert!(matches!(
            parse_reply(envelope("   ")),
            Err(ClassifyError::EmptyContent)
        ));
        assert!(matches!(
            parse_reply(envelope("```json {}```")),
            Err(ClassifyError::InvalidJson { .. })
        ));
    }

    #[test]
    fn content_failures() {
        assert!(matches!(
            parse_reply(envelope("[1, 2]")),
            Err(ClassifyError::InvalidField { field: "reply", .. })
        ));
        assert!(matches!(
            parse_reply(envelope(r#"{"coating_type": 3}"#)),
            Err(ClassifyError::InvalidField {
                field: "coating_type",
                ..
            })
        ));
        assert!(matches!(
            parse_reply(envelope(
                r#"{"coating_type": "PVC", "confidence": "high"}"#
            )),
            Err(ClassifyError::InvalidField {
                field: "confidence",
                ..
            })
        ));
    }

    #[test]
    fn missing_coating_type_is_none() {
        let verdict = parse_reply(envelope(r#"{"confidence": 0.1}"#)).unwrap();
        assert_eq!(verdict.coating_type, None);
        assert_eq!(verdict.confidence, Some(0.1));
    }
}
