//! Symptom-guidance flow.
//!
//! Turns a free-text symptom description into a list of specialties worth
//! consulting, general next steps, and a disclaimer. The model reply is
//! parsed and validated before anything reaches the caller; a reply that does
//! not fit the shape is a [`ValidationError`], never a partial result.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{AssistantError, ValidationError};
use crate::message::{SymptomGuidanceRequest, SymptomGuidanceResponse};
use crate::services::model_client::{ModelClient, ModelRequest};

const SYMPTOMS_PLACEHOLDER: &str = "{{symptoms}}";

pub const GUIDANCE_TEMPLATE: &str = "\
You are an AI assistant designed to help patients understand potential doctor specializations or general next steps based on their described symptoms. \
You are NOT a medical professional and must NOT provide a diagnosis, medical advice, or specific treatment recommendations. \
Your role is solely to guide the user towards appropriate medical consultation or information gathering.

Based on the following symptoms, provide:
1. A list of potential medical specializations a patient might consider consulting.
2. A list of general, non-diagnostic next steps the patient could take.
3. An explicit disclaimer stating that this information is not a medical diagnosis and professional medical advice should be sought.

Respond with a single JSON object with exactly these keys: \"specialties\" (array of strings), \"nextSteps\" (array of strings), \"disclaimer\" (string).

Symptoms: {{symptoms}}";

pub fn build_guidance_prompt(symptoms: &str) -> String {
    GUIDANCE_TEMPLATE.replace(SYMPTOMS_PLACEHOLDER, symptoms)
}

/// Response schema handed to the model alongside the prompt.
pub fn guidance_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "specialties": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Potential doctor specializations that might be relevant."
            },
            "nextSteps": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "General, non-diagnostic next steps the patient could take."
            },
            "disclaimer": {
                "type": "STRING",
                "description": "Statement that this is not a medical diagnosis and professional advice should be sought."
            }
        },
        "required": ["specialties", "nextSteps", "disclaimer"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGuidance {
    specialties: Option<Vec<String>>,
    next_steps: Option<Vec<String>>,
    disclaimer: Option<String>,
}

/// Parse and validate a model reply against the guidance shape.
pub fn parse_guidance_reply(text: &str) -> Result<SymptomGuidanceResponse, ValidationError> {
    let value: Value = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| ValidationError::Malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(ValidationError::Malformed("expected a JSON object".to_string()));
    }
    let raw: RawGuidance =
        serde_json::from_value(value).map_err(|e| ValidationError::Malformed(e.to_string()))?;

    let specialties = required_list("specialties", raw.specialties)?;
    let next_steps = required_list("nextSteps", raw.next_steps)?;
    let disclaimer = raw
        .disclaimer
        .ok_or(ValidationError::MissingField("disclaimer"))?
        .trim()
        .to_string();
    if disclaimer.is_empty() {
        return Err(ValidationError::BlankDisclaimer);
    }

    Ok(SymptomGuidanceResponse { specialties, next_steps, disclaimer })
}

fn required_list(
    field: &'static str,
    value: Option<Vec<String>>,
) -> Result<Vec<String>, ValidationError> {
    let items = value.ok_or(ValidationError::MissingField(field))?;
    if items.is_empty() {
        return Err(ValidationError::EmptyList(field));
    }
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let item = item.trim();
            if item.is_empty() {
                Err(ValidationError::BlankEntry { field, index })
            } else {
                Ok(item.to_string())
            }
        })
        .collect()
}

// Models sometimes wrap JSON in ```json ... ``` even when asked not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// `GetSpecialtyGuidance`: one model call, strictly validated.
pub async fn get_specialty_guidance(
    model: &dyn ModelClient,
    request: &SymptomGuidanceRequest,
) -> Result<SymptomGuidanceResponse, AssistantError> {
    let symptoms = request.symptoms.trim();
    if symptoms.is_empty() {
        return Err(AssistantError::InvalidRequest(
            "Symptoms cannot be empty".to_string(),
        ));
    }

    let model_request =
        ModelRequest::text(build_guidance_prompt(symptoms)).with_json_schema(guidance_schema());

    let reply = model.generate(&model_request).await.map_err(|err| {
        tracing::warn!(client = model.name(), error = %err, "guidance model call failed");
        AssistantError::Upstream(err)
    })?;

    let guidance = parse_guidance_reply(&reply.text).map_err(|err| {
        tracing::warn!(client = model.name(), error = %err, "guidance reply rejected");
        AssistantError::Validation(err)
    })?;

    tracing::info!(
        specialties = guidance.specialties.len(),
        next_steps = guidance.next_steps.len(),
        "guidance produced"
    );
    Ok(guidance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_interpolates_symptoms() {
        let prompt = build_guidance_prompt("sharp lower back pain for 3 days");
        assert!(prompt.ends_with("Symptoms: sharp lower back pain for 3 days"));
        assert!(prompt.contains("must NOT provide a diagnosis"));
        assert!(!prompt.contains(SYMPTOMS_PLACEHOLDER));
    }

    #[test]
    fn parses_valid_reply() {
        let reply = r#"{
            "specialties": ["Orthopedics", " Physiotherapy "],
            "nextSteps": ["Book a consultation"],
            "disclaimer": "This is not a medical diagnosis."
        }"#;
        let guidance = parse_guidance_reply(reply).unwrap();
        assert_eq!(guidance.specialties, vec!["Orthopedics", "Physiotherapy"]);
        assert_eq!(guidance.next_steps, vec!["Book a consultation"]);
    }

    #[test]
    fn accepts_fenced_reply_and_extra_keys() {
        let reply = "```json\n{\"specialties\":[\"Cardiology\"],\"nextSteps\":[\"Rest\"],\"disclaimer\":\"Not a diagnosis.\",\"confidence\":0.4}\n```";
        assert!(parse_guidance_reply(reply).is_ok());
    }

    #[test]
    fn fence_tag_is_case_insensitive() {
        let reply = "```JSON\n{\"specialties\":[\"Neurology\"],\"nextSteps\":[\"Keep a headache diary\"],\"disclaimer\":\"Not a diagnosis.\"}\n```";
        let guidance = parse_guidance_reply(reply).unwrap();
        assert_eq!(guidance.specialties, vec!["Neurology"]);

        let untagged = "```\n{\"specialties\":[\"ENT\"],\"nextSteps\":[\"Rest\"],\"disclaimer\":\"x\"}\n```";
        assert!(parse_guidance_reply(untagged).is_ok());
    }

    #[test]
    fn rejects_missing_fields() {
        assert_eq!(
            parse_guidance_reply(r#"{"nextSteps":["Rest"],"disclaimer":"x"}"#),
            Err(ValidationError::MissingField("specialties"))
        );
        assert_eq!(
            parse_guidance_reply(r#"{"specialties":["ENT"],"disclaimer":"x"}"#),
            Err(ValidationError::MissingField("nextSteps"))
        );
        assert_eq!(
            parse_guidance_reply(r#"{"specialties":["ENT"],"nextSteps":["Rest"],"disclaimer":null}"#),
            Err(ValidationError::MissingField("disclaimer"))
        );
    }

    #[test]
    fn rejects_empty_or_blank_values() {
        assert_eq!(
            parse_guidance_reply(r#"{"specialties":[],"nextSteps":["Rest"],"disclaimer":"x"}"#),
            Err(ValidationError::EmptyList("specialties"))
        );
        assert_eq!(
            parse_guidance_reply(r#"{"specialties":["ENT"],"nextSteps":["Rest","  "],"disclaimer":"x"}"#),
            Err(ValidationError::BlankEntry { field: "nextSteps", index: 1 })
        );
        assert_eq!(
            parse_guidance_reply(r#"{"specialties":["ENT"],"nextSteps":["Rest"],"disclaimer":" "}"#),
            Err(ValidationError::BlankDisclaimer)
        );
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(
            parse_guidance_reply("You should see a cardiologist."),
            Err(ValidationError::Malformed(_))
        ));
        assert!(matches!(
            parse_guidance_reply(r#"["Cardiology"]"#),
            Err(ValidationError::Malformed(_))
        ));
    }
}
