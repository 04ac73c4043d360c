// gemini integration - answers user questions with a model fallback chain

use crate::Error;
use serde::{Deserialize, Serialize};

/// Marker prefix on the reply text when every candidate model has failed.
pub const FAILURE_MARKER: &str = "SYSTEM FAILURE: All models failed.";

/// One text-generation backend. The relay only needs this seam, so tests
/// can script a fake provider instead of calling the real API.
pub trait TextModel {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
    ) -> impl Future<Output = Result<String, Error>> + Send;
}

/// What the fallback chain produced. Exhaustion stays distinguishable from
/// a real answer until the HTTP layer renders it.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayOutcome {
    Answered(String),
    Exhausted { last_error: String },
}

impl RelayOutcome {
    /// Render the outcome as chat text. Exhaustion becomes a reply carrying
    /// the marker and the last provider error verbatim, so the chat window
    /// shows what actually went wrong.
    pub fn into_reply(self) -> String {
        match self {
            Self::Answered(text) => text,
            Self::Exhausted { last_error } => {
                format!("{FAILURE_MARKER} Last Error: {last_error}")
            }
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

/// Try each candidate model in order and return the first answer.
///
/// Strictly sequential: a candidate is only attempted after the previous one
/// has failed, each failure is logged and the chain moves on, and no model is
/// ever retried. Once every candidate has failed, the last error is kept.
pub async fn relay(
    client: &impl TextModel,
    candidates: &[String],
    prompt: &str,
) -> RelayOutcome {
    let mut last_error = String::new();

    for model in candidates {
        tracing::info!(%model, "attempting model");

        match client.generate(model, prompt).await {
            Ok(text) => {
                tracing::info!(%model, "model answered");
                return RelayOutcome::Answered(text);
            }
            Err(e) => {
                tracing::warn!(%model, error = %e, "model failed, trying next");
                last_error = e.to_string();
            }
        }
    }

    RelayOutcome::Exhausted { last_error }
}

/// Plain Q&A framing for a standalone question.
pub fn question_prompt(question: &str, allergy: &str) -> String {
    format!("User has {allergy} allergy. Question: {question}. Answer briefly.")
}

/// Persona framing for the in-app assistant, with the user's name and
/// allergy injected so the model can personalize its answers.
pub fn assistant_prompt(question: &str, allergy: &str, name: &str) -> String {
    format!(
        r#"You are "AllergyGuard", a warm and protective health assistant.

CURRENT USER DETAILS:
- Name: {name}
- Allergy: {allergy}

YOUR INSTRUCTIONS:
1. "Who am I?" -> If the user asks this, reply exactly: "You are {name}, and you have a {allergy} allergy. I am here to keep you safe!"
2. GREETINGS -> If they say "Hello", greet them by name ({name}).
3. SAFETY -> Always check food questions against their {allergy} allergy.
4. TONE -> Be concise and friendly.

User Question: "{question}"
"#
    )
}

/// Client for the Google Generative Language API.
#[derive(Clone)]
pub struct Gemini {
    client: reqwest::Client,
    api_key: String,
}

// what we send to gemini
#[derive(Serialize)]
struct Request {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

// what gemini sends back
#[derive(Deserialize)]
struct Response {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: ContentResponse,
}

#[derive(Deserialize)]
struct ContentResponse {
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: String,
}

impl Gemini {
    pub fn new(api_key: Option<String>) -> Result<Self, Error> {
        // flag takes priority, then the usual env var
        let api_key = match api_key {
            Some(key) => key,
            None => std::env::var("GEMINI_API_KEY").map_err(|_| Error::MissingApiKey)?,
        };

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
        })
    }
}

impl TextModel for Gemini {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, Error> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            model, self.api_key
        );

        let request = Request {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Gemini(format!("{status} - {body}")));
        }

        let response: Response = response.json().await?;

        response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .ok_or_else(|| Error::Gemini("empty response from model".to_string()))
    }
}
