use serde::{Deserialize, Serialize};

/// Problem metadata extracted from an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub extracted_text: String,
    pub problem_type: String,
    pub subject: String,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub key_concepts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemContext {
    pub extracted_text: String,
    pub problem_type: String,
    pub subject: String,
}

impl From<&Analysis> for ProblemContext {
    fn from(analysis: &Analysis) -> Self {
        Self {
            extracted_text: analysis.extracted_text.clone(),
            problem_type: analysis.problem_type.clone(),
            subject: analysis.subject.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub problem: ProblemContext,
    pub messages: Vec<ChatMessage>,
    pub user_message: String,
}

fn default_hint_type() -> String {
    "question".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default = "default_hint_type")]
    pub hint_type: String,
}

/// Parameters of the older single-shot hint endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HintQuery {
    pub problem_text: String,
    pub problem_type: String,
    pub subject: String,
    pub user_question: Option<String>,
    pub previous_hints: Vec<String>,
}

impl HintQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![
            ("problem_text", self.problem_text.as_str()),
            ("problem_type", self.problem_type.as_str()),
            ("subject", self.subject.as_str()),
        ];
        if let Some(question) = self.user_question.as_deref().filter(|q| !q.is_empty()) {
            pairs.push(("user_question", question));
        }
        for hint in &self.previous_hints {
            pairs.push(("previous_hints", hint.as_str()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintReply {
    pub hint: String,
    pub hint_type: String,
    #[serde(default)]
    pub follow_up: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}

impl Health {
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }
}
