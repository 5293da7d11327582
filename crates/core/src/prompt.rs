use serde::{Deserialize, Serialize};

/// Fixed reply the model is told to give when the context has no answer.
pub const ANSWER_NOT_FOUND: &str = "Answer not found in the documents.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prompt {
    pub context: String,
    pub question: String,
}

impl Prompt {
    pub fn render(&self) -> String {
        format!(
            "Use the following context to answer the question.\n\
             If the answer is not found, respond with '{ANSWER_NOT_FOUND}'\n\
             \n\
             Context:\n\
             {context}\n\
             \n\
             Question: {question}\n\
             Answer:",
            context = self.context,
            question = self.question,
        )
    }
}

pub fn build_prompt(context: impl Into<String>, question: impl Into<String>) -> Prompt {
    Prompt {
        context: context.into(),
        question: question.into(),
    }
}
