use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Answer the model gives when the documentation does not cover a question
pub const REFUSAL: &str = "Sorry, I don't know how to help with that.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One role-tagged message of a chat prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Chat completion service
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String>;
}

/// Builds the grounded question-answering prompt
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    product: String,
}

impl PromptTemplate {
    pub fn new(product: impl Into<String>) -> Self {
        PromptTemplate {
            product: product.into(),
        }
    }

    /// Prefix of the message carrying the documentation context
    pub fn documentation_header(&self) -> String {
        format!("Here is the documentation for {}:\n", self.product)
    }

    /// Messages asking the model to answer `query` from `context` only
    pub fn build_messages(&self, context: &str, query: &str) -> Vec<ChatMessage> {
        let system = format!(
            "You are a very enthusiastic {product} AI who loves to help people! Given the following information from the {product} documentation, answer the user's question using only that information, outputted in markdown format.\n\
             If you are unsure and the answer is not explicitly written in the documentation, say \"{refusal}\"\n\
             Always include related code snippets if available.",
            product = self.product,
            refusal = REFUSAL,
        );

        let rules = format!(
            "Answer my next question using only the above documentation.\n\
             You must also follow the below rules when answering:\n\
             -Do not make up answers that are not provided in the documentation.\n\
             -If you are unsure and the answer is not explicitly written in the documentation context, say \"{}\"\n\
             -Prefer splitting your response into multiple paragraphs.\n\
             -Output as pretty markdown with code snippets if available.",
            REFUSAL
        );

        vec![
            ChatMessage::system(system),
            ChatMessage::user(format!("{}{}", self.documentation_header(), context)),
            ChatMessage::user(rules),
            ChatMessage::user(format!("Here is my question:\n{}", query)),
        ]
    }
}
