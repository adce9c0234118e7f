use serde::{Deserialize, Serialize};

/// Immutable settings for one interview session. Created once at session
/// start from the application config and passed by reference into the
/// orchestrator; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Role the candidate is being screened for (e.g. "RAG AI Engineer")
    pub job_role: String,

    /// Expected seniority (e.g. "Entry-Level")
    pub candidate_skill: String,

    /// Full job-posting text handed to the interviewer persona
    pub role_description: String,

    /// Pass mark (0-100) carried for the external post-call evaluator
    pub pass_threshold: u8,

    /// Capture sample rate in Hz
    pub sample_rate: u32,

    /// Samples read per capture iteration
    pub chunk_size: u32,

    /// Playback speed multiplier for synthesized speech
    pub speaking_speed: f32,

    /// Language hint forwarded to the speech-to-text boundary
    pub language: String,

    /// Marker phrase in an interviewer utterance that ends the session
    /// after that turn's playback (matched case-insensitively)
    pub termination_phrase: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            job_role: "Software Engineer".to_string(),
            candidate_skill: "Entry-Level".to_string(),
            role_description: String::new(),
            pass_threshold: 50,
            sample_rate: 44100,
            chunk_size: 1024,
            speaking_speed: 1.1,
            language: "en".to_string(),
            termination_phrase: "thank you for your time".to_string(),
        }
    }
}
