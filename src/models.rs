/// Request bodies accepted from the frontend and the payloads sent upstream.
///
/// Frontend bodies use camelCase field names; the snake_case spellings are accepted
/// as aliases. Upstream payloads follow the DashScope schemas.
use serde::{Deserialize, Serialize};

/// Speech synthesis model used for `/tts`.
pub const SPEECH_MODEL: &str = "qwen3-tts-flash";

/// Chat model used for `/ttt`.
pub const CHAT_MODEL: &str = "qwen-flash";

/// System prompt for `/ttt`: grade five bracket-removal exercises and summarise in ~50 characters.
pub const GRADING_PROMPT: &str = "你是一个专业的数学老师，擅长分析初中数学题的去括号运算。请根据学生做的5道题，分析答题的正确率、错误类型，并给出50字左右的总结评价。";

pub const DEFAULT_VOICE: &str = "Cherry";
pub const DEFAULT_LANGUAGE_TYPE: &str = "Chinese";

fn default_voice() -> String {
    DEFAULT_VOICE.to_owned()
}

fn default_language_type() -> String {
    DEFAULT_LANGUAGE_TYPE.to_owned()
}

/// Body of `POST /tts`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRequest {
    pub text: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_language_type", alias = "language_type")]
    pub language_type: String,
}

/// Body of `POST /ttt`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(alias = "user_text")]
    pub user_text: String,
}

/// Multimodal-generation payload for the speech endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeechPayload {
    pub model: String,
    pub input: SpeechInput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeechInput {
    pub text: String,
    pub voice: String,
    pub language_type: String,
}

/// Chat-completions payload for the analysis endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatPayload {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl SpeechRequest {
    pub fn into_payload(self, model: &str) -> SpeechPayload {
        SpeechPayload {
            model: model.to_owned(),
            input: SpeechInput {
                text: self.text,
                voice: self.voice,
                language_type: self.language_type,
            },
        }
    }
}

impl AnalysisRequest {
    /// The grading prompt always comes first, followed by the student's answers.
    pub fn into_payload(self, model: &str) -> ChatPayload {
        ChatPayload {
            model: model.to_owned(),
            messages: vec![
                ChatMessage {
                    role: Role::System,
                    content: GRADING_PROMPT.to_owned(),
                },
                ChatMessage {
                    role: Role::User,
                    content: self.user_text,
                },
            ],
        }
    }
}

/// Returned by `GET /`.
#[derive(Debug, Clone, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub docs: &'static str,
}

/// Returned by `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
