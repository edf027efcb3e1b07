use serde::Deserialize;
use serde_json::Value;

/// One element of the upstream `data[]` array. Required scalars stay as raw
/// [`Value`]s so coercion failures can be reported per field. Nested optional
/// objects are also kept raw and decoded into the typed payloads below one at
/// a time, so a badly shaped one is dropped on its own. Unknown keys are
/// ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct PetitionPayload {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub links: Option<Value>,
    #[serde(default)]
    pub attributes: Option<AttributesPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceLinks {
    #[serde(rename = "self")]
    pub self_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttributesPayload {
    #[serde(default)]
    pub action: Option<Value>,
    #[serde(default)]
    pub state: Option<Value>,
    #[serde(default)]
    pub signature_count: Option<Value>,
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default)]
    pub opened_at: Option<Value>,
    #[serde(default)]
    pub closed_at: Option<Value>,
    #[serde(default)]
    pub rejected_at: Option<Value>,
    #[serde(default)]
    pub response_threshold_reached_at: Option<Value>,
    #[serde(default)]
    pub debate_threshold_reached_at: Option<Value>,
    #[serde(default)]
    pub government_response_at: Option<Value>,
    #[serde(default)]
    pub scheduled_debate_date: Option<Value>,
    #[serde(default)]
    pub debate_outcome_at: Option<Value>,
    #[serde(default)]
    pub departments: Option<Value>,
    #[serde(default)]
    pub government_response: Option<Value>,
    #[serde(default)]
    pub debate: Option<Value>,
    #[serde(default)]
    pub rejection: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepartmentPayload {
    pub name: Option<String>,
    pub acronym: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GovernmentResponsePayload {
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DebatePayload {
    pub video_url: Option<String>,
    pub transcript_url: Option<String>,
    pub debate_pack_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RejectionPayload {
    pub code: Option<String>,
}
