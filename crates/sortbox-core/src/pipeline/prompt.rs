//! Prompt text and structured-output contract sent to the model.

use serde_json::{Value, json};

use sortbox_types::{BucketDefinition, ClassificationCandidate};

/// Name of the JSON schema in the `response_format` contract.
pub const RESPONSE_SCHEMA_NAME: &str = "email_classification";

/// System prompt listing the buckets, the rules and the answer contract.
pub fn build_system_prompt(buckets: &[BucketDefinition]) -> String {
    let bucket_lines = buckets
        .iter()
        .map(|b| format!("- \"{}\": {}", b.name, b.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are an expert email classifier. Your job is to categorize email threads \
into exactly one bucket based on their subject line, preview snippet, and sender.

Available buckets:
{bucket_lines}

Rules:
- Every thread MUST be assigned to exactly one bucket
- Choose the MOST specific matching bucket
- If uncertain between two buckets, prefer the more actionable one
- Return a confidence score from 0.0 to 1.0 for each classification

Respond with a JSON array. Each element must have:
- \"threadId\": the exact thread ID provided
- \"bucket\": the exact bucket name (must match one from the list above)
- \"confidence\": a number from 0.0 to 1.0"
    )
}

/// One thread block of the user prompt.
pub fn format_thread_for_prompt(candidate: &ClassificationCandidate) -> String {
    format!(
        "Thread ID: {}\nFrom: {}\nSubject: {}\nPreview: {}\nDate: {}\n---",
        candidate.thread_id, candidate.sender, candidate.subject, candidate.snippet, candidate.date
    )
}

/// User prompt for one batch. An empty batch yields `""`.
pub fn build_user_prompt(batch: &[ClassificationCandidate]) -> String {
    batch
        .iter()
        .map(format_thread_for_prompt)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strict JSON-schema `response_format` for chat completion requests.
///
/// The model answers `{"classifications": [{threadId, bucket, confidence}]}`.
pub fn response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": RESPONSE_SCHEMA_NAME,
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "classifications": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "threadId": { "type": "string" },
                                "bucket": { "type": "string" },
                                "confidence": { "type": "number" }
                            },
                            "required": ["threadId", "bucket", "confidence"],
                            "additionalProperties": false
                        }
                    }
                },
                "required": ["classifications"],
                "additionalProperties": false
            }
        }
    })
}
