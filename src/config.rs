//! Configuration types for résumé analysis.
//!
//! All pipeline behaviour is controlled through [`AnalysisConfig`], built
//! via its [`AnalysisConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across threads and to diff two runs to
//! understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A many-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest.

use crate::error::AnalysisError;
use crate::pipeline::render::DEFAULT_SCALE;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Configuration for one analysis run.
///
/// Built via [`AnalysisConfig::builder()`] or using
/// [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use cvlens::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .scale(2.0)
///     .model("gpt-4.1-nano")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Viewport magnification for the page-1 raster. Range: 0.5–4.0.
    /// Default: 2.0.
    ///
    /// 2× matches typical device pixel ratios, trading fidelity for file
    /// size. Increase for small-font résumés; decrease when upload size
    /// matters more than crispness.
    pub scale: f32,

    /// LLM model identifier, e.g. "gpt-4.1-nano", "claude-sonnet-4-20250514".
    /// If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is auto-detected from
    /// the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the completion. Default: 0.1.
    ///
    /// Low temperature keeps the model faithful to what it sees on the
    /// page and keeps the reply JSON well-formed; higher values mostly add
    /// creative prose the extractor then has to strip.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    ///
    /// A fully populated feedback object with examples runs to roughly
    /// 2 000 output tokens; setting this too low truncates the JSON
    /// mid-object and forfeits the whole submission.
    pub max_tokens: usize,

    /// Progress-event receiver. Default: none.
    pub progress_callback: Option<ProgressCallback>,

    /// Cooperative abandonment flag. Default: none.
    pub abandon: Option<AbandonHandle>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            progress_callback: None,
            abandon: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("scale", &self.scale)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("abandoned", &self.abandon.as_ref().map(AbandonHandle::is_abandoned))
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// True once the caller has signalled abandonment.
    pub fn is_abandoned(&self) -> bool {
        self.abandon.as_ref().is_some_and(AbandonHandle::is_abandoned)
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn scale(mut self, scale: f32) -> Self {
        self.config.scale = scale.clamp(0.5, 4.0);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn abandon_handle(mut self, handle: AbandonHandle) -> Self {
        self.config.abandon = Some(handle);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, AnalysisError> {
        let c = &self.config;
        if !(0.5..=4.0).contains(&c.scale) {
            return Err(AnalysisError::Validation {
                detail: format!("scale must be 0.5–4.0, got {}", c.scale),
            });
        }
        if c.max_tokens == 0 {
            return Err(AnalysisError::Validation {
                detail: "max_tokens must be ≥ 1".into(),
            });
        }
        Ok(self.config)
    }
}

/// Cooperative abandonment signal for an in-flight submission.
///
/// Cloneable; the caller keeps one clone and hands the other to the config.
/// Once [`abandon`](AbandonHandle::abandon) is called the pipeline issues
/// no further stage transitions — the in-flight collaborator call is not
/// interrupted, and already-written uploads and records are left intact.
#[derive(Clone, Debug, Default)]
pub struct AbandonHandle(Arc<AtomicBool>);

impl AbandonHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal that no further stages should run.
    pub fn abandon(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once [`abandon`](AbandonHandle::abandon) has been called.
    pub fn is_abandoned(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let c = AnalysisConfig::default();
        assert_eq!(c.scale, 2.0);
        assert_eq!(c.temperature, 0.1);
        assert_eq!(c.max_tokens, 4096);
        assert!(!c.is_abandoned());
    }

    #[test]
    fn builder_clamps_scale_and_temperature() {
        let c = AnalysisConfig::builder()
            .scale(10.0)
            .temperature(-1.0)
            .build()
            .unwrap();
        assert_eq!(c.scale, 4.0);
        assert_eq!(c.temperature, 0.0);
    }

    #[test]
    fn zero_max_tokens_is_rejected() {
        let err = AnalysisConfig::builder().max_tokens(0).build().unwrap_err();
        assert!(err.to_string().contains("max_tokens"));
    }

    #[test]
    fn abandon_handle_is_shared_across_clones() {
        let handle = AbandonHandle::new();
        let config = AnalysisConfig::builder()
            .abandon_handle(handle.clone())
            .build()
            .unwrap();

        assert!(!config.is_abandoned());
        handle.abandon();
        assert!(config.is_abandoned());
    }
}
