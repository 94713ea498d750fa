use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AppError;

/// Name the output schema is registered under with the inference API.
pub const SCHEMA_NAME: &str = "Treatment";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Diseased,
    #[serde(rename = "Not Diseased")]
    NotDiseased,
}

/// Structured answer returned by the inference API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Diagnosis {
    pub disease_name: String,
    pub treatment: String,
    pub reason: String,
    pub decision: Decision,
}

/// What gets written to the store. The store assigns `_id` on insert.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisRecord {
    #[serde(flatten)]
    pub diagnosis: Diagnosis,
    pub base64_image: String,
}

/// Body of a successful `POST /analyze`, also the payload of the `result` event.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisResponse {
    #[serde(flatten)]
    pub record: DiagnosisRecord,
    pub id: String,
}

/// Parses the raw inference text and checks it against the diagnosis shape.
///
/// Text that is not JSON at all is [`AppError::UnparsableResponse`]; JSON with missing,
/// extra or mistyped fields is [`AppError::SchemaMismatch`].
pub fn parse_diagnosis(text: &str) -> Result<Diagnosis, AppError> {
    let value: Value = serde_json::from_str(text).map_err(AppError::UnparsableResponse)?;
    serde_json::from_value(value).map_err(AppError::SchemaMismatch)
}

/// JSON schema the inference API must constrain its answer to.
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "disease_name": {
                "type": "string",
                "description": "Name of the disease"
            },
            "treatment": {
                "type": "string",
                "description": "Treatment for the disease"
            },
            "reason": {
                "type": "string",
                "description": "Reason for the disease"
            },
            "decision": {
                "type": "string",
                "enum": ["Diseased", "Not Diseased"],
                "description": "Decision on whether the leaf image indicates diseased or not."
            }
        },
        "required": ["disease_name", "treatment", "decision", "reason"],
        "additionalProperties": false
    })
}
