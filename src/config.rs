use crate::session::SessionConfig;
use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub interview: InterviewConfig,
    pub audio: AudioConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct InterviewConfig {
    pub job_role: String,
    pub candidate_skill: String,
    /// Job-posting text injected into the interviewer persona
    pub role_description: String,
    pub pass_threshold: u8,
    /// Already-extracted CV text used as the priming context
    pub cv_path: PathBuf,
    pub termination_phrase: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// Root under which `interviews/{sessionId}/` is created
    pub data_path: PathBuf,
    pub sample_rate: u32,
    pub chunk_size: u32,
    pub speaking_speed: f32,
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Freeze the per-session settings out of the application config.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            job_role: self.interview.job_role.clone(),
            candidate_skill: self.interview.candidate_skill.clone(),
            role_description: self.interview.role_description.clone(),
            pass_threshold: self.interview.pass_threshold,
            sample_rate: self.audio.sample_rate,
            chunk_size: self.audio.chunk_size,
            speaking_speed: self.audio.speaking_speed,
            language: self.audio.language.clone(),
            termination_phrase: self.interview.termination_phrase.clone(),
        }
    }
}
