//! Inference collaborator: turn a stored raster image plus instruction text
//! into a reply.
//!
//! The pipeline only sees the [`FeedbackProvider`] trait; the shipped
//! implementation, [`VisionFeedbackProvider`], reads the image back from
//! the object store, base64-encodes it, and sends one vision chat request
//! via `edgequake-llm`. There is deliberately no retry loop here — a failed
//! call is terminal for the submission and the placeholder record stays
//! queryable, so the user can simply resubmit.
//!
//! ## Message layout
//!
//! 1. **System message** — the reviewer role prompt
//!    ([`crate::prompts::FEEDBACK_SYSTEM_PROMPT`])
//! 2. **User message** — the rendered instruction text with the page PNG
//!    attached as a base64 image
//!
//! PNG + `detail: "high"` keeps small résumé type readable for the model;
//! a low-detail overview tile loses exactly the fine print an ATS check
//! cares about.

use crate::config::AnalysisConfig;
use crate::store::ObjectStore;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// A failed inference call.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The provider API returned an error.
    #[error("inference call failed: {0}")]
    Api(String),

    /// The referenced image could not be read back from storage.
    #[error("could not read image at '{path}': {detail}")]
    ImageUnavailable { path: String, detail: String },

    /// The provider answered, but with no usable text.
    #[error("provider returned an empty reply")]
    EmptyReply,

    /// No provider could be constructed from config or environment.
    #[error("no inference provider configured: {0}")]
    NotConfigured(String),
}

/// The textual reply plus token accounting when the backend reports it.
#[derive(Debug, Clone, Default)]
pub struct InferenceReply {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// The narrow inference seam the pipeline drives.
#[async_trait]
pub trait FeedbackProvider: Send + Sync {
    /// Analyse the image at `image_path` according to `instructions` and
    /// return the raw reply text.
    async fn infer(
        &self,
        image_path: &str,
        instructions: &str,
    ) -> Result<InferenceReply, InferenceError>;
}

/// Production [`FeedbackProvider`] backed by an `edgequake-llm` vision model.
pub struct VisionFeedbackProvider {
    store: Arc<dyn ObjectStore>,
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl VisionFeedbackProvider {
    /// Wrap an already-resolved provider.
    pub fn new(store: Arc<dyn ObjectStore>, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            store,
            provider,
            temperature: 0.1,
            max_tokens: 4096,
        }
    }

    /// Build from an [`AnalysisConfig`], resolving the provider via
    /// [`resolve_provider`].
    pub fn from_config(
        store: Arc<dyn ObjectStore>,
        config: &AnalysisConfig,
    ) -> Result<Self, InferenceError> {
        let provider = resolve_provider(config)?;
        Ok(Self {
            store,
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl FeedbackProvider for VisionFeedbackProvider {
    async fn infer(
        &self,
        image_path: &str,
        instructions: &str,
    ) -> Result<InferenceReply, InferenceError> {
        let bytes = self.store.read(image_path).await.map_err(|e| {
            InferenceError::ImageUnavailable {
                path: image_path.to_string(),
                detail: e.to_string(),
            }
        })?;

        let b64 = STANDARD.encode(&bytes);
        debug!("encoded image → {} bytes base64", b64.len());
        let image = ImageData::new(b64, "image/png").with_detail("high");

        let messages = vec![
            ChatMessage::system(crate::prompts::FEEDBACK_SYSTEM_PROMPT),
            ChatMessage::user_with_images(instructions, vec![image]),
        ];

        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| InferenceError::Api(e.to_string()))?;

        if response.content.trim().is_empty() {
            return Err(InferenceError::EmptyReply);
        }

        Ok(InferenceReply {
            text: response.content,
            input_tokens: response.prompt_tokens as u32,
            output_tokens: response.completion_tokens as u32,
        })
    }
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — the caller constructed
///    and configured it entirely; used as-is. Useful in tests or when the
///    caller needs custom middleware.
/// 2. **Named provider + model** (`config.provider_name`) — reads the
///    matching API key from the environment.
/// 3. **Environment pair** (`CVLENS_LLM_PROVIDER` + `CVLENS_MODEL`) —
///    checked before full auto-detection so an explicit choice is honoured
///    even when multiple API keys are present.
/// 4. **Full auto-detection** (`ProviderFactory::from_env`) — the factory
///    scans known API-key variables and picks the first available
///    provider, preferring OpenAI when its key is set.
pub fn resolve_provider(config: &AnalysisConfig) -> Result<Arc<dyn LLMProvider>, InferenceError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("CVLENS_LLM_PROVIDER"),
        std::env::var("CVLENS_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_vision_provider("openai", model);
        }
    }

    let (provider, _embedding) = ProviderFactory::from_env().map_err(|e| {
        InferenceError::NotConfigured(format!(
            "no LLM provider auto-detected from environment; \
             set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider: {e}"
        ))
    })?;

    Ok(provider)
}

/// Default vision model when none is configured.
const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, InferenceError> {
    ProviderFactory::create_llm_provider(provider_name, model)
        .map_err(|e| InferenceError::NotConfigured(format!("{provider_name}: {e}")))
}
