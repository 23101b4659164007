//! HTTP endpoints for the phone sales assistant.
//!
//! # Overview
//! - `POST /api/webhook` turns a finished call into a lead record.
//! - `POST /api/retell` provisions a voice agent and a phone number.
//!
//! Both talk to their collaborators through seams held in `AppState`: the
//! record store client from `meli-core`, a `LeadExtractor` and a
//! `VoicePlatform`.

pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod provision;
pub mod voice;
pub mod webhook;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use meli_core::{RecordClient, ReqwestTransport};
use secrecy::SecretString;

use crate::config::AppConfig;
use crate::extract::{LeadExtractor, OpenAiExtractor};
use crate::voice::{RetellClient, VoicePlatform};

#[derive(Clone)]
pub struct AppState {
    pub records: Arc<RecordClient<ReqwestTransport>>,
    pub extractor: Arc<dyn LeadExtractor>,
    pub voice: Arc<dyn VoicePlatform>,
    pub cal_api_key: SecretString,
    pub default_voice_id: String,
}

impl AppState {
    /// Wire the production collaborators from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self {
            records: Arc::new(RecordClient::new(
                &config.records,
                ReqwestTransport::new(http.clone()),
            )),
            extractor: Arc::new(OpenAiExtractor::new(http.clone(), config.openai.clone())),
            voice: Arc::new(RetellClient::new(http, &config.voice)),
            cal_api_key: config.voice.cal_api_key.clone(),
            default_voice_id: config.voice.voice_id.clone(),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/webhook", post(webhook::handle_webhook))
        .route("/api/retell", post(provision::handle_provision))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}
