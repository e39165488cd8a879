use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "system")]
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
}

fn default_model() -> String {
    "gpt".to_string()
}

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    #[serde(rename = "chatHistory", default)]
    pub chat_history: Vec<ChatMessage>,
    #[serde(default = "default_model")]
    pub model: String,
}

impl PromptRequest {
    pub fn prompt(&self) -> Option<&str> {
        self.chat_history
            .last()
            .map(|message| message.content.as_str())
            .filter(|content| !content.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSelector {
    Image,
    ChatGpt,
    Gpt,
    // any other value
    Code,
}

impl ModelSelector {
    pub fn parse(model: &str) -> Self {
        match model {
            "image" => ModelSelector::Image,
            "chatgpt" => ModelSelector::ChatGpt,
            "gpt" => ModelSelector::Gpt,
            _ => ModelSelector::Code,
        }
    }

    pub fn completion_model(self) -> &'static str {
        match self {
            ModelSelector::Gpt => "text-davinci-003",
            _ => "code-davinci-002",
        }
    }

    pub fn max_tokens(self) -> u32 {
        match self {
            ModelSelector::Gpt => 4000,
            _ => 8000,
        }
    }
}
