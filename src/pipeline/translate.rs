//! Block translation: one external call per text block.
//!
//! [`translate_blocks`] always returns exactly one [`BlockTranslation`] per
//! input block, in block order. A block whose call fails becomes
//! [`BlockTranslation::Failed`] in its own slot, so the blocks after it keep
//! their positions and the annotator never pairs a translation with the
//! wrong box. Failed calls are not re-sent.

use crate::config::{AnnotateConfig, TranslatorBackend};
use crate::error::{TranslateError, TranslatePdfError};
use crate::pipeline::blocks::TextBlock;
use crate::pipeline::postprocess::clean_translation;
use crate::prompts::translation_system_prompt;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

const GOOGLE_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// A text-translation service with a fixed language pair.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Short name used in logs, e.g. `"google"`.
    fn name(&self) -> &str;

    /// Translate one block of text.
    async fn translate(&self, text: &str) -> Result<String, TranslateError>;
}

/// Outcome of translating one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockTranslation {
    /// Translated text; empty when the block text was empty.
    Translated(String),
    /// Every attempt failed. `block` is the 0-indexed block position on its page.
    Failed { block: usize, detail: String },
}

impl BlockTranslation {
    /// Text to draw for this block, if any.
    pub fn overlay_text(&self) -> Option<&str> {
        match self {
            BlockTranslation::Translated(t) if !t.trim().is_empty() => Some(t),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, BlockTranslation::Failed { .. })
    }
}

/// Translate a single string, skipping the service for empty input.
pub async fn translate_block(
    translator: &dyn Translator,
    text: &str,
) -> Result<String, TranslateError> {
    if text.trim().is_empty() {
        return Ok(String::new());
    }
    translator.translate(text).await
}

/// Translate every block of one page, preserving index alignment.
pub async fn translate_blocks(
    translator: &dyn Translator,
    page_num: usize,
    blocks: &[TextBlock],
    config: &AnnotateConfig,
) -> Vec<BlockTranslation> {
    let mut results = Vec::with_capacity(blocks.len());

    for (idx, block) in blocks.iter().enumerate() {
        let outcome = match translate_block(translator, &block.text).await {
            Ok(translated) => {
                debug!(
                    "Page {} block {}: {} chars → {} chars via {}",
                    page_num,
                    idx,
                    block.text.chars().count(),
                    translated.chars().count(),
                    translator.name()
                );
                BlockTranslation::Translated(translated)
            }
            Err(e) => {
                warn!("Page {} block {}: translation failed: {}", page_num, idx, e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_block_error(page_num, idx, &e.to_string());
                }
                BlockTranslation::Failed {
                    block: idx,
                    detail: e.to_string(),
                }
            }
        };
        results.push(outcome);
    }

    results
}

// ── Google backend ───────────────────────────────────────────────────────

/// Google's keyless web translation endpoint (`client=gtx`).
pub struct GoogleTranslator {
    client: reqwest::Client,
    endpoint: String,
    source: String,
    target: String,
    timeout_secs: u64,
}

impl GoogleTranslator {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, TranslatePdfError> {
        Self::with_endpoint(GOOGLE_ENDPOINT, source, target, timeout_secs)
    }

    /// Point the translator at a different endpoint with the same protocol.
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, TranslatePdfError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TranslatePdfError::TranslatorNotConfigured {
                backend: "google".to_string(),
                hint: e.to_string(),
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            source: source.into(),
            target: target.into(),
            timeout_secs,
        })
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    fn name(&self) -> &str {
        "google"
    }

    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", self.source.as_str()),
                ("tl", self.target.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TranslateError::Timeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    TranslateError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TranslateError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(TranslateError::Http {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        parse_google_response(&body)
    }
}

/// Extract the translated text from a `translate_a/single?dt=t` response.
///
/// The body is a nested JSON array whose first element lists sentence
/// segments as `[translated, original, …]`; segments are concatenated.
pub fn parse_google_response(body: &str) -> Result<String, TranslateError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| TranslateError::Malformed(e.to_string()))?;

    let segments = value
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| TranslateError::Malformed("missing segment list".to_string()))?;

    Ok(segments
        .iter()
        .filter_map(|seg| seg.get(0).and_then(|s| s.as_str()))
        .collect())
}

// ── LLM backend ──────────────────────────────────────────────────────────

/// Translation through any edgequake-llm chat provider.
pub struct LlmTranslator {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    timeout_secs: u64,
}

impl LlmTranslator {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        source: &str,
        target: &str,
        timeout_secs: u64,
    ) -> Self {
        Self {
            provider,
            system_prompt: translation_system_prompt(source, target),
            timeout_secs,
        }
    }
}

#[async_trait]
impl Translator for LlmTranslator {
    fn name(&self) -> &str {
        "llm"
    }

    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(text),
        ];
        let options = CompletionOptions {
            temperature: Some(0.0),
            max_tokens: Some(1024),
            ..Default::default()
        };

        let response = timeout(
            Duration::from_secs(self.timeout_secs),
            self.provider.chat(&messages, Some(&options)),
        )
        .await
        .map_err(|_| TranslateError::Timeout {
            secs: self.timeout_secs,
        })?
        .map_err(|e| TranslateError::Llm(e.to_string()))?;

        Ok(clean_translation(&response.content))
    }
}

// ── Resolution ───────────────────────────────────────────────────────────

/// Resolve the translator, from most-specific to least-specific:
/// a pre-built translator, then the configured backend.
pub fn resolve_translator(config: &AnnotateConfig) -> Result<Arc<dyn Translator>, TranslatePdfError> {
    if let Some(ref translator) = config.translator {
        return Ok(Arc::clone(translator));
    }

    match config.backend {
        TranslatorBackend::Google => Ok(Arc::new(GoogleTranslator::new(
            &config.source_lang,
            &config.target_lang,
            config.api_timeout_secs,
        )?)),
        TranslatorBackend::Llm {
            ref provider,
            ref model,
        } => {
            let provider = resolve_llm_provider(provider.as_deref(), model.as_deref())?;
            Ok(Arc::new(LlmTranslator::new(
                provider,
                &config.source_lang,
                &config.target_lang,
                config.api_timeout_secs,
            )))
        }
    }
}

/// Named provider, then `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, then
/// full environment auto-detection.
fn resolve_llm_provider(
    provider: Option<&str>,
    model: Option<&str>,
) -> Result<Arc<dyn LLMProvider>, TranslatePdfError> {
    if let Some(name) = provider {
        return create_provider(name, model.unwrap_or("gpt-4.1-nano"));
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| TranslatePdfError::TranslatorNotConfigured {
            backend: "llm".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, TranslatePdfError> {
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        TranslatePdfError::TranslatorNotConfigured {
            backend: format!("llm:{name}"),
            hint: format!("{e}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::blocks::{BoundingBox, WordDetection};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Uppercases its input and counts calls.
    #[derive(Default)]
    struct CountingTranslator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Translator for CountingTranslator {
        fn name(&self) -> &str {
            "counting"
        }

        async fn translate(&self, text: &str) -> Result<String, TranslateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(text.to_uppercase())
        }
    }

    /// Fails for any text containing "bad"; also fails the first `flaky` calls.
    struct FailingTranslator {
        flaky: AtomicUsize,
    }

    #[async_trait]
    impl Translator for FailingTranslator {
        fn name(&self) -> &str {
            "failing"
        }

        async fn translate(&self, text: &str) -> Result<String, TranslateError> {
            if text.contains("bad") {
                return Err(TranslateError::Http {
                    status: 500,
                    body: "boom".into(),
                });
            }
            if self
                .flaky
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(TranslateError::Transport("reset".into()));
            }
            Ok(format!("<{text}>"))
        }
    }

    fn block(text: &str, index: u32) -> TextBlock {
        let bbox = BoundingBox::new(0, 0, 10, 10);
        TextBlock {
            block_index: index,
            bbox,
            text: text.to_string(),
            words: vec![WordDetection::new(text, index, bbox, 90.0)],
        }
    }

    #[tokio::test]
    async fn empty_text_skips_the_service() {
        let t = CountingTranslator::default();
        assert_eq!(translate_block(&t, "").await.unwrap(), "");
        assert_eq!(translate_block(&t, "   \n").await.unwrap(), "");
        assert_eq!(t.calls.load(Ordering::SeqCst), 0);

        assert_eq!(translate_block(&t, "abc").await.unwrap(), "ABC");
        assert_eq!(t.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn one_translation_per_block_in_order() {
        let t = CountingTranslator::default();
        let blocks = vec![block("a", 1), block("b", 2), block("c", 3)];
        let out = translate_blocks(&t, 1, &blocks, &AnnotateConfig::default()).await;
        assert_eq!(
            out,
            vec![
                BlockTranslation::Translated("A".into()),
                BlockTranslation::Translated("B".into()),
                BlockTranslation::Translated("C".into()),
            ]
        );
    }

    #[tokio::test]
    async fn failed_block_keeps_its_slot() {
        let t = FailingTranslator {
            flaky: AtomicUsize::new(0),
        };
        let blocks = vec![block("ok1", 1), block("bad", 2), block("ok2", 3)];
        let out = translate_blocks(&t, 4, &blocks, &AnnotateConfig::default()).await;

        assert_eq!(out.len(), blocks.len());
        assert_eq!(out[0], BlockTranslation::Translated("<ok1>".into()));
        assert!(matches!(out[1], BlockTranslation::Failed { block: 1, .. }));
        assert_eq!(out[2], BlockTranslation::Translated("<ok2>".into()));
        assert_eq!(out[1].overlay_text(), None);
    }

    #[tokio::test]
    async fn failed_call_is_not_resent() {
        let t = FailingTranslator {
            flaky: AtomicUsize::new(1),
        };
        let out = translate_blocks(&t, 1, &[block("x", 1), block("y", 2)], &AnnotateConfig::default()).await;
        assert!(out[0].is_failed());
        assert_eq!(out[1], BlockTranslation::Translated("<y>".into()));
    }

    #[tokio::test]
    async fn block_errors_reach_the_progress_callback() {
        use crate::progress::AnnotateProgressCallback;
        use std::sync::Mutex;

        #[derive(Default)]
        struct Recorder(Mutex<Vec<(usize, usize)>>);
        impl AnnotateProgressCallback for Recorder {
            fn on_block_error(&self, page_num: usize, block: usize, _error: &str) {
                self.0.lock().unwrap().push((page_num, block));
            }
        }

        let recorder = Arc::new(Recorder::default());
        let config = AnnotateConfig::builder()
            .progress_callback(recorder.clone())
            .build()
            .unwrap();
        let t = FailingTranslator {
            flaky: AtomicUsize::new(0),
        };
        let blocks = vec![block("ok", 1), block("bad", 2), block("bad too", 3)];
        translate_blocks(&t, 5, &blocks, &config).await;
        assert_eq!(*recorder.0.lock().unwrap(), vec![(5, 1), (5, 2)]);
    }

    #[test]
    fn overlay_text_ignores_blank_translations() {
        assert_eq!(BlockTranslation::Translated("  ".into()).overlay_text(), None);
        assert_eq!(
            BlockTranslation::Translated("Hello".into()).overlay_text(),
            Some("Hello")
        );
    }

    #[test]
    fn parses_google_segments() {
        let body = r#"[[["Hello. ","こんにちは。",null,null,10],["World","世界",null,null,10]],null,"ja"]"#;
        assert_eq!(parse_google_response(body).unwrap(), "Hello. World");
    }

    #[test]
    fn rejects_malformed_google_body() {
        assert!(matches!(
            parse_google_response("<html>"),
            Err(TranslateError::Malformed(_))
        ));
        assert!(matches!(
            parse_google_response("[null]"),
            Err(TranslateError::Malformed(_))
        ));
    }

    #[test]
    fn resolve_prefers_injected_translator() {
        let injected: Arc<dyn Translator> = Arc::new(CountingTranslator::default());
        let config = AnnotateConfig::builder()
            .translator(Arc::clone(&injected))
            .build()
            .unwrap();
        let resolved = resolve_translator(&config).unwrap();
        assert_eq!(resolved.name(), "counting");
    }
}
