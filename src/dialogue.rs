//! Dialogue-generation boundary and conversation state
//!
//! The external service is stateless per call: every request carries the
//! complete turn history, priming pair included. All conversation state
//! lives in `DialogueEngine`, which is owned by the session task alone.

use crate::error::{SessionError, SessionResult};
use crate::session::{ConversationTurn, Role, SessionConfig};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Boundary for turning the conversation so far into the next interviewer
/// utterance. Stateless per call.
#[async_trait::async_trait]
pub trait DialogueService: Send + Sync {
    /// Generate the next interviewer utterance from the full turn history.
    async fn generate(
        &self,
        system_prompt: &str,
        turns: &[ConversationTurn],
    ) -> SessionResult<String>;
}

/// Chat-completions client for any OpenAI-compatible dialogue host
/// (`POST {base}/chat/completions`).
#[derive(Debug, Clone)]
pub struct HttpDialogueService {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl HttpDialogueService {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> SessionResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| SessionError::Dialogue(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    /// Build from the environment: DIALOGUE_API_KEY plus optional
    /// DIALOGUE_API_URL and DIALOGUE_MODEL overrides.
    pub fn from_env() -> SessionResult<Self> {
        let base_url = std::env::var("DIALOGUE_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("DIALOGUE_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| {
                SessionError::Dialogue("DIALOGUE_API_KEY or OPENAI_API_KEY not set".to_string())
            })?;
        let model = std::env::var("DIALOGUE_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        Self::new(base_url, api_key, model)
    }

    fn wire_role(role: Role) -> &'static str {
        match role {
            // The priming document rides in a user slot, as the service
            // contract expects alternating user/assistant content.
            Role::System | Role::Candidate => "user",
            Role::Interviewer => "assistant",
        }
    }
}

#[async_trait::async_trait]
impl DialogueService for HttpDialogueService {
    async fn generate(
        &self,
        system_prompt: &str,
        turns: &[ConversationTurn],
    ) -> SessionResult<String> {
        let mut messages = vec![json!({"role": "system", "content": system_prompt})];
        for turn in turns {
            messages.push(json!({
                "role": Self::wire_role(turn.role),
                "content": turn.content,
            }));
        }

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": 1024,
            "temperature": 0.5,
        });

        debug!("Dialogue request with {} turns of history", turns.len());

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SessionError::Dialogue(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::Dialogue(format!(
                "dialogue API error {}: {}",
                status, body
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SessionError::Dialogue(e.to_string()))?;
        let text = json
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                SessionError::Dialogue("dialogue response had no message content".to_string())
            })?;

        Ok(text.to_string())
    }
}

/// Preamble attached to the CV block in the priming turn.
const PRIMING_PREFIX: &str = "The following is a CV that I am providing you with. \
You are to keep this document in the back of your mind and consider it or use it, \
should it be relevant to the discussion.";

/// Fixed acknowledgement completing the priming pair.
const PRIMING_ACK: &str =
    "Understood! I'll keep this CV in the back of my mind and use it should it be \
relevant to the discussion.";

/// Compose the interviewer persona prompt from the session's role metadata.
pub fn interviewer_prompt(config: &SessionConfig) -> String {
    format!(
        "You are a skilled interviewer conducting an initial phone screening interview \
for a candidate for a {skill} {role} role, to see if the candidate is at minimum \
somewhat qualified for the role and worth a full interview. The role and company \
description is copied from the job posting as follows: {description}. Parse through it \
to extract any information you feel is relevant.\n\
Begin a friendly discussion with the candidate and ask questions relevant to the \
{role} role, which may or may not be based on the candidate's CV, which you have \
access to. Stick to this topic even if the candidate tries to steer the conversation \
elsewhere.\n\
After the candidate responds, do not summarise or provide feedback on their \
responses. Keep your responses short and concise. You can ask follow-up questions if \
you wish.\n\
Once you have asked sufficient questions to judge whether the candidate fits the \
role, end the interview by thanking the candidate for their time and informing them \
that they will receive word soon on the outcome of the screening interview. If the \
candidate does not seem fitting, or seems unconfident or very vague, feel free to end \
the interview early. Do not share your opinion of their performance.\n\
The candidate will begin the interview by greeting you. Greet them back and begin \
the interview.",
        skill = config.candidate_skill,
        role = config.job_role,
        description = config.role_description,
    )
}

/// Owns the ordered turn history and drives the dialogue boundary.
///
/// Construction injects the priming pair exactly once; every later call
/// resends the full history, never the reference document a second time as
/// new content.
pub struct DialogueEngine {
    service: Box<dyn DialogueService>,
    system_prompt: String,
    turns: Vec<ConversationTurn>,
    next_sequence: u32,
}

impl DialogueEngine {
    /// Create an engine primed with the reference document (e.g. CV text).
    pub fn new(
        service: Box<dyn DialogueService>,
        system_prompt: impl Into<String>,
        priming_context: &str,
    ) -> Self {
        let mut engine = Self {
            service,
            system_prompt: system_prompt.into(),
            turns: Vec::new(),
            next_sequence: 0,
        };

        let document = format!("{}\n\nDocument below:\n\n{}", PRIMING_PREFIX, priming_context);
        engine.append_turn(Role::System, document, None);
        engine.append_turn(Role::Interviewer, PRIMING_ACK, None);
        info!("Dialogue engine primed ({} chars of context)", priming_context.len());

        engine
    }

    fn append_turn(&mut self, role: Role, content: impl Into<String>, audio: Option<PathBuf>) {
        let mut turn = ConversationTurn::new(role, content, self.next_sequence);
        if let Some(path) = audio {
            turn = turn.with_audio(path);
        }
        self.next_sequence += 1;
        self.turns.push(turn);
    }

    /// Append the candidate utterance, ask the service for the next
    /// interviewer utterance over the complete history, append it, and
    /// return the new text.
    ///
    /// An empty candidate utterance is forwarded unchanged. On service
    /// failure the candidate turn stays in the history: it is fully formed
    /// and the session is ending anyway.
    pub async fn respond(
        &mut self,
        candidate_utterance: &str,
        audio: Option<PathBuf>,
    ) -> SessionResult<String> {
        self.append_turn(Role::Candidate, candidate_utterance, audio);

        let reply = self
            .service
            .generate(&self.system_prompt, &self.turns)
            .await?;

        self.append_turn(Role::Interviewer, reply.clone(), None);
        Ok(reply)
    }

    /// Ordered turn history, priming pair first.
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Consume the engine, yielding the turn history for persistence.
    pub fn into_turns(self) -> Vec<ConversationTurn> {
        self.turns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedService {
        reply: String,
    }

    #[async_trait::async_trait]
    impl DialogueService for CannedService {
        async fn generate(
            &self,
            _system_prompt: &str,
            _turns: &[ConversationTurn],
        ) -> SessionResult<String> {
            Ok(self.reply.clone())
        }
    }

    fn engine(reply: &str) -> DialogueEngine {
        DialogueEngine::new(
            Box::new(CannedService {
                reply: reply.to_string(),
            }),
            "prompt",
            "CV text",
        )
    }

    #[test]
    fn priming_pair_is_injected_once() {
        let engine = engine("hello");
        let turns = engine.turns();

        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::System);
        assert!(turns[0].content.contains("CV text"));
        assert_eq!(turns[1].role, Role::Interviewer);
        assert_eq!(turns[0].sequence, 0);
        assert_eq!(turns[1].sequence, 1);
    }

    #[tokio::test]
    async fn respond_appends_candidate_then_interviewer() {
        let mut engine = engine("Tell me about your experience.");

        let reply = engine.respond("Hi, I'm here for the interview.", None).await.unwrap();
        assert_eq!(reply, "Tell me about your experience.");

        let turns = engine.turns();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[2].role, Role::Candidate);
        assert_eq!(turns[3].role, Role::Interviewer);
        assert_eq!(turns[3].sequence, 3);
    }

    #[tokio::test]
    async fn empty_utterance_is_forwarded() {
        let mut engine = engine("Could you repeat that?");

        engine.respond("", None).await.unwrap();
        assert_eq!(engine.turns()[2].content, "");
    }

    #[test]
    fn persona_prompt_carries_role_metadata() {
        let config = SessionConfig {
            job_role: "RAG AI Engineer".to_string(),
            candidate_skill: "Entry-Level".to_string(),
            role_description: "London (Hybrid)".to_string(),
            ..SessionConfig::default()
        };

        let prompt = interviewer_prompt(&config);
        assert!(prompt.contains("RAG AI Engineer"));
        assert!(prompt.contains("Entry-Level"));
        assert!(prompt.contains("London (Hybrid)"));
    }
}
