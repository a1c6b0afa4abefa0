//! The extraction ladder: ordered (model × image variant × prompt) attempts,
//! first grammar match wins.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info, warn};

use flexscan_core::{
    ExtractionResult, FlexscanError, IdentifierExtractor, IdentifierKind, VisionClient,
    VisionRequest,
};

use crate::enhance::{self, ImageVariant};
use crate::grammar;
use crate::prompts::PromptStrategy;

/// Tuning for the ladder.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Models in fallback order. The first is the primary.
    pub models: Vec<String>,
    /// Response cap; identifiers are short.
    pub max_tokens: u32,
    /// Bound on every single vision call.
    pub attempt_timeout: Duration,
    /// Whether to try an enhanced re-encoding of the photo.
    pub enhance: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            models: vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()],
            max_tokens: 50,
            attempt_timeout: Duration::from_secs(30),
            enhance: true,
        }
    }
}

/// One rung of the ladder.
#[derive(Debug, Clone, Copy)]
pub struct Attempt<'a> {
    pub model: &'a str,
    pub variant: &'a ImageVariant,
    pub strategy: PromptStrategy,
}

/// Flatten models, variants, and strategies into the order they are tried:
/// every variant × strategy pair for the primary model, then the same for the
/// next model.
pub fn ladder<'a>(models: &'a [String], variants: &'a [ImageVariant]) -> Vec<Attempt<'a>> {
    models
        .iter()
        .flat_map(|model| {
            variants.iter().flat_map(move |variant| {
                PromptStrategy::ORDER.into_iter().map(move |strategy| Attempt {
                    model: model.as_str(),
                    variant,
                    strategy,
                })
            })
        })
        .collect()
}

/// Run the grammar of `kind` over untrusted model text.
pub fn match_kind(kind: IdentifierKind, text: &str) -> ExtractionResult {
    match kind {
        IdentifierKind::Container => grammar::extract_container(text),
        IdentifierKind::Flex => grammar::extract_flex(text),
    }
}

pub struct ExtractionPipeline {
    client: Arc<dyn VisionClient>,
    config: PipelineConfig,
}

impl ExtractionPipeline {
    pub fn new(client: Arc<dyn VisionClient>, config: PipelineConfig) -> Self {
        Self { client, config }
    }

    /// Extract one identifier from a photo. Never fails; exhaustion yields
    /// [`ExtractionResult::NotFound`].
    pub async fn extract(&self, image: &Bytes, kind: IdentifierKind) -> ExtractionResult {
        let start = Instant::now();
        let variants = self.build_variants(image).await;
        let attempts = ladder(&self.config.models, &variants);

        for (index, attempt) in attempts.iter().enumerate() {
            let text = match self.run_attempt(attempt, kind).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(
                        kind = %kind,
                        model = attempt.model,
                        variant = attempt.variant.label,
                        strategy = attempt.strategy.label(),
                        error = %e,
                        "Vision attempt failed"
                    );
                    continue;
                }
            };

            let result = match_kind(kind, &text.to_uppercase());
            if result.found() {
                info!(
                    kind = %kind,
                    model = attempt.model,
                    variant = attempt.variant.label,
                    strategy = attempt.strategy.label(),
                    attempt = index + 1,
                    needs_review = result.needs_review(),
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Identifier extracted"
                );
                return result;
            }
            debug!(
                kind = %kind,
                model = attempt.model,
                variant = attempt.variant.label,
                strategy = attempt.strategy.label(),
                "No token in vision response"
            );
        }

        info!(
            kind = %kind,
            attempts = attempts.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Identifier not found"
        );
        ExtractionResult::NotFound
    }

    async fn build_variants(&self, image: &Bytes) -> Vec<ImageVariant> {
        let owned = image.clone();
        let enhance = self.config.enhance;
        match tokio::task::spawn_blocking(move || enhance::variants(&owned, enhance)).await {
            Ok(variants) => variants,
            Err(e) => {
                warn!(error = %e, "Image preparation task failed, using original only");
                enhance::variants(image, false)
            }
        }
    }

    async fn run_attempt(
        &self,
        attempt: &Attempt<'_>,
        kind: IdentifierKind,
    ) -> Result<String, FlexscanError> {
        let request = VisionRequest {
            model: attempt.model.to_string(),
            system_prompt: attempt.strategy.system_prompt(),
            prompt: attempt.strategy.user_prompt(kind),
            image_b64: attempt.variant.b64.clone(),
            mime_type: attempt.variant.mime_type.clone(),
            max_tokens: self.config.max_tokens,
        };

        let timeout = self.config.attempt_timeout;
        match tokio::time::timeout(timeout, self.client.query(&request)).await {
            Ok(result) => result,
            Err(_) => Err(FlexscanError::timeout("vision query", timeout.as_millis() as u64)),
        }
    }
}

#[async_trait]
impl IdentifierExtractor for ExtractionPipeline {
    async fn extract(&self, image: Bytes, kind: IdentifierKind) -> ExtractionResult {
        ExtractionPipeline::extract(self, &image, kind).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Vision mock answering from a closure and recording every request.
    struct ScriptedVision {
        answer: Box<dyn Fn(&VisionRequest) -> Result<String, FlexscanError> + Send + Sync>,
        delay: Option<Duration>,
        seen: Mutex<Vec<VisionRequest>>,
    }

    impl ScriptedVision {
        fn new(
            answer: impl Fn(&VisionRequest) -> Result<String, FlexscanError> + Send + Sync + 'static,
        ) -> Self {
            Self { answer: Box::new(answer), delay: None, seen: Mutex::new(Vec::new()) }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl VisionClient for ScriptedVision {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn query(&self, request: &VisionRequest) -> Result<String, FlexscanError> {
            self.seen.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            (self.answer)(request)
        }
    }

    fn pipeline(client: Arc<ScriptedVision>, enhance: bool) -> ExtractionPipeline {
        ExtractionPipeline::new(
            client,
            PipelineConfig {
                models: vec!["primary".into(), "fallback".into()],
                max_tokens: 40,
                attempt_timeout: Duration::from_millis(50),
                enhance,
            },
        )
    }

    // Not decodable, so only the original variant is built.
    fn opaque_photo() -> Bytes {
        Bytes::from_static(b"\xff\xd8\xffnot really a jpeg")
    }

    // Decodable, so an enhanced JPEG variant follows the original PNG.
    fn decodable_photo() -> Bytes {
        let img = image::RgbImage::from_fn(24, 12, |x, _| {
            if x % 3 == 0 { image::Rgb([230, 230, 230]) } else { image::Rgb([15, 15, 15]) }
        });
        let mut out = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        Bytes::from(out)
    }

    fn vision_down(model: &str) -> FlexscanError {
        FlexscanError::Vision { model: model.into(), message: "503".into() }
    }

    #[test]
    fn ladder_is_model_major() {
        let variants = enhance::variants(&opaque_photo(), false);
        let models = vec!["a".to_string(), "b".to_string()];
        let order: Vec<_> = ladder(&models, &variants)
            .iter()
            .map(|a| (a.model, a.strategy))
            .collect();
        assert_eq!(
            order,
            vec![
                ("a", PromptStrategy::Descriptive),
                ("a", PromptStrategy::StrictPattern),
                ("b", PromptStrategy::Descriptive),
                ("b", PromptStrategy::StrictPattern),
            ]
        );
    }

    #[test]
    fn ladder_covers_every_variant_before_next_model() {
        let variants = enhance::variants(&decodable_photo(), true);
        let models = vec!["a".to_string(), "b".to_string()];
        let order: Vec<_> = ladder(&models, &variants)
            .iter()
            .map(|a| (a.model, a.variant.label, a.strategy))
            .collect();
        assert_eq!(
            order,
            vec![
                ("a", "original", PromptStrategy::Descriptive),
                ("a", "original", PromptStrategy::StrictPattern),
                ("a", "enhanced", PromptStrategy::Descriptive),
                ("a", "enhanced", PromptStrategy::StrictPattern),
                ("b", "original", PromptStrategy::Descriptive),
                ("b", "original", PromptStrategy::StrictPattern),
                ("b", "enhanced", PromptStrategy::Descriptive),
                ("b", "enhanced", PromptStrategy::StrictPattern),
            ]
        );
    }

    #[tokio::test]
    async fn enhanced_variant_is_queried_before_fallback_model() {
        let vision = Arc::new(ScriptedVision::new(|_| Ok("nothing legible".into())));
        let result = pipeline(vision.clone(), true)
            .extract(&decodable_photo(), IdentifierKind::Container)
            .await;
        assert_eq!(result, ExtractionResult::NotFound);

        let seen = vision.seen.lock().unwrap();
        let order: Vec<_> = seen
            .iter()
            .map(|r| (r.model.as_str(), r.mime_type.as_str(), r.system_prompt.is_some()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("primary", "image/png", false),
                ("primary", "image/png", true),
                ("primary", "image/jpeg", false),
                ("primary", "image/jpeg", true),
                ("fallback", "image/png", false),
                ("fallback", "image/png", true),
                ("fallback", "image/jpeg", false),
                ("fallback", "image/jpeg", true),
            ]
        );
    }

    #[tokio::test]
    async fn first_match_short_circuits() {
        let vision = Arc::new(ScriptedVision::new(|_| Ok("container: msku1234565".into())));
        let result = pipeline(vision.clone(), false)
            .extract(&opaque_photo(), IdentifierKind::Container)
            .await;
        assert_eq!(result, ExtractionResult::Validated("MSKU1234565".into()));
        assert_eq!(vision.calls(), 1);
    }

    #[tokio::test]
    async fn strict_prompt_is_tried_after_chatty_miss() {
        let vision = Arc::new(ScriptedVision::new(|req| {
            Ok(match req.system_prompt {
                Some(_) => "B3G24071283B-26Q".into(),
                None => "I can see a flexitank label but it is blurry".into(),
            })
        }));
        let result = pipeline(vision.clone(), false)
            .extract(&opaque_photo(), IdentifierKind::Flex)
            .await;
        assert_eq!(result, ExtractionResult::Validated("B3G24071283B-26Q".into()));
        assert_eq!(vision.calls(), 2);
    }

    #[tokio::test]
    async fn falls_back_to_second_model() {
        let vision = Arc::new(ScriptedVision::new(|req| {
            if req.model == "primary" {
                Err(vision_down(&req.model))
            } else {
                Ok("CSQU3054383".into())
            }
        }));
        let result = pipeline(vision.clone(), false)
            .extract(&opaque_photo(), IdentifierKind::Container)
            .await;
        assert_eq!(result, ExtractionResult::Validated("CSQU3054383".into()));
        let seen = vision.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2].model, "fallback");
        assert_eq!(seen[2].max_tokens, 40);
    }

    #[tokio::test]
    async fn exhaustion_returns_not_found() {
        let vision = Arc::new(ScriptedVision::new(|req| Err(vision_down(&req.model))));
        let result = pipeline(vision.clone(), false)
            .extract(&opaque_photo(), IdentifierKind::Flex)
            .await;
        assert_eq!(result, ExtractionResult::NotFound);
        assert_eq!(vision.calls(), 4);
    }

    #[tokio::test]
    async fn sentinel_answer_is_a_miss() {
        let vision = Arc::new(ScriptedVision::new(|_| Ok("не удалось".into())));
        let result = pipeline(vision.clone(), false)
            .extract(&opaque_photo(), IdentifierKind::Container)
            .await;
        assert_eq!(result, ExtractionResult::NotFound);
    }

    #[tokio::test]
    async fn slow_attempts_time_out_and_ladder_continues() {
        let vision = Arc::new(
            ScriptedVision::new(|_| Ok("MSKU1234565".into())).with_delay(Duration::from_secs(5)),
        );
        let result = pipeline(vision.clone(), false)
            .extract(&opaque_photo(), IdentifierKind::Container)
            .await;
        assert_eq!(result, ExtractionResult::NotFound);
        assert_eq!(vision.calls(), 4);
    }

    #[tokio::test]
    async fn checksum_mismatch_is_returned_for_review() {
        let vision = Arc::new(ScriptedVision::new(|_| Ok("MSKU1234560".into())));
        let result = pipeline(vision, false)
            .extract(&opaque_photo(), IdentifierKind::Container)
            .await;
        assert!(result.found());
        assert!(result.needs_review());
    }
}
