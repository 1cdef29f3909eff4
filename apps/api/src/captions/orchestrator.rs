//! Variant Orchestrator: runs the caption pipeline once per requested variant.
//!
//! Flow per index: build_prompt → generate → parse → score → safety check → Variant.
//!
//! Provider calls fan out with bounded parallelism and are collected as they
//! complete, then put back in request order. The first failed call fails the whole
//! batch the moment it arrives: outstanding calls are dropped and no partial list
//! is returned.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use futures::TryFutureExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::captions::cancel::CancelToken;
use crate::captions::parser::parse_response;
use crate::captions::prompt_builder::build_prompt;
use crate::captions::safety::check_safety;
use crate::captions::scoring::{CaptionScorer, ScoreInput};
use crate::llm_client::{Generation, GenerationError, TextGenerator};
use crate::models::persona::PersonaVoiceProfile;
use crate::models::request::GenerationRequest;
use crate::models::variant::{CostEstimate, CostUnit, Variant};

pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

pub struct VariantOrchestrator {
    generator: Arc<dyn TextGenerator>,
    scorer: Arc<dyn CaptionScorer>,
    max_concurrency: usize,
}

impl VariantOrchestrator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        scorer: Arc<dyn CaptionScorer>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            generator,
            scorer,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Exactly `request.requested_variant_count` variants, in index order, or the
    /// first provider error.
    #[allow(dead_code)]
    pub async fn generate_variants(
        &self,
        request: &GenerationRequest,
        persona: Option<&PersonaVoiceProfile>,
    ) -> Result<Vec<Variant>, GenerationError> {
        self.generate_variants_cancellable(request, persona, &CancelToken::new())
            .await
    }

    /// Same as `generate_variants`, aborting with `GenerationError::Cancelled`
    /// as soon as `cancel` fires. In-flight provider calls are dropped.
    pub async fn generate_variants_cancellable(
        &self,
        request: &GenerationRequest,
        persona: Option<&PersonaVoiceProfile>,
        cancel: &CancelToken,
    ) -> Result<Vec<Variant>, GenerationError> {
        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }

        let count = request.variant_count();
        let prompt = build_prompt(request, persona);

        info!(
            count,
            max_concurrency = self.max_concurrency,
            scorer = self.scorer.backend(),
            "Generating caption variants"
        );

        let batch = stream::iter(0..count)
            .map(|index| {
                self.generate_one(index, &prompt, request)
                    .map_ok(move |variant| (index, variant))
            })
            .buffer_unordered(self.max_concurrency)
            .try_collect::<Vec<_>>();

        let mut indexed = tokio::select! {
            result = batch => result?,
            _ = cancel.cancelled() => {
                warn!(count, "Variant batch cancelled, discarding outstanding calls");
                return Err(GenerationError::Cancelled);
            }
        };

        indexed.sort_unstable_by_key(|(index, _)| *index);
        let variants: Vec<Variant> = indexed.into_iter().map(|(_, variant)| variant).collect();

        let unsafe_count = variants.iter().filter(|v| !v.safety().ok).count();
        let best_score = variants.iter().map(Variant::score).max().unwrap_or(0);
        info!(
            count = variants.len(),
            unsafe_count,
            best_score,
            "Caption variants generated"
        );

        Ok(variants)
    }

    async fn generate_one(
        &self,
        index: usize,
        prompt: &str,
        request: &GenerationRequest,
    ) -> Result<Variant, GenerationError> {
        let generation = self.generator.generate(prompt).await.map_err(|e| {
            warn!(
                index,
                reason = e.reason().as_str(),
                error = %e,
                "Variant generation failed"
            );
            e
        })?;

        // Score and gate the post as published: caption plus its hashtags.
        let published = generation.text.trim();
        let parsed = parse_response(published);
        let breakdown = self.scorer.score(&ScoreInput {
            text: published,
            brief: &request.brief,
            target_audience: &request.target_audience,
        });
        let safety = check_safety(published);

        if !safety.ok {
            warn!(index, reasons = ?safety.reasons, "Variant flagged by safety gate");
        }

        Ok(Variant::new(
            Uuid::new_v4().to_string(),
            parsed.caption,
            parsed.hashtags,
            breakdown.score,
            breakdown.reasons,
            safety,
            estimate_cost(prompt, &generation),
        ))
    }
}

/// Provider token counts when reported, character counts otherwise.
fn estimate_cost(prompt: &str, generation: &Generation) -> CostEstimate {
    match generation.usage {
        Some(usage) => CostEstimate {
            input_units: u64::from(usage.input_tokens),
            output_units: u64::from(usage.output_tokens),
            unit: CostUnit::Tokens,
        },
        None => CostEstimate {
            input_units: prompt.chars().count() as u64,
            output_units: generation.text.chars().count() as u64,
            unit: CostUnit::Characters,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::num::NonZeroU32;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::captions::safety::{REASON_EXCESSIVE_CAPS, REASON_PROBLEMATIC_WORDS};
    use crate::captions::scoring::HeuristicScorer;
    use crate::llm_client::{GenerationErrorReason, TokenUsage};

    const FIXED_TEXT: &str = "Great news! Our product rocks. #New #Launch #Sale";

    /// Returns the same text on every call, optionally failing one call by number.
    struct ScriptedGenerator {
        text: String,
        usage: Option<TokenUsage>,
        fail_on_call: Option<usize>,
        delay: Duration,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedGenerator {
        fn returning(text: &str) -> Self {
            Self {
                text: text.to_string(),
                usage: None,
                fail_on_call: None,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<Generation, GenerationError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_on_call == Some(call) {
                return Err(GenerationError::RateLimited("quota exhausted".to_string()));
            }
            Ok(Generation {
                text: self.text.clone(),
                usage: self.usage,
            })
        }
    }

    /// Earlier calls take longer, so completion order is the reverse of call order.
    struct SlowFirstGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for SlowFirstGenerator {
        async fn generate(&self, _prompt: &str) -> Result<Generation, GenerationError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let delay_ms = 100u64.saturating_sub(call as u64 * 20);
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            Ok(Generation {
                text: format!("Caption number {call} #a #b #c"),
                usage: None,
            })
        }
    }

    fn make_request(count: u32) -> GenerationRequest {
        GenerationRequest {
            brief: "Great product launch".to_string(),
            target_audience: "young adults".to_string(),
            persona_voice_traits: vec!["upbeat".to_string()],
            tone_level: 0.8,
            emoji_level: 1.0,
            requested_variant_count: NonZeroU32::new(count).unwrap(),
        }
    }

    fn orchestrator(generator: Arc<dyn TextGenerator>, max_concurrency: usize) -> VariantOrchestrator {
        VariantOrchestrator::new(generator, Arc::new(HeuristicScorer), max_concurrency)
    }

    #[tokio::test]
    async fn test_fixed_text_yields_identical_variants_with_distinct_ids() {
        let generator = Arc::new(ScriptedGenerator::returning(FIXED_TEXT));
        let variants = orchestrator(generator.clone(), DEFAULT_MAX_CONCURRENCY)
            .generate_variants(&make_request(3), None)
            .await
            .unwrap();

        assert_eq!(variants.len(), 3);
        assert_eq!(generator.calls(), 3);

        let ids: HashSet<&str> = variants.iter().map(Variant::id).collect();
        assert_eq!(ids.len(), 3, "ids must be unique");

        for v in &variants {
            assert_eq!(v.text(), variants[0].text());
            assert_eq!(v.score(), variants[0].score());
            assert_eq!(v.safety(), variants[0].safety());
        }
    }

    #[tokio::test]
    async fn test_variant_fields_come_from_parse_score_and_safety() {
        let generator = Arc::new(ScriptedGenerator::returning(FIXED_TEXT));
        let variants = orchestrator(generator, 2)
            .generate_variants(&make_request(1), None)
            .await
            .unwrap();

        let v = &variants[0];
        assert_eq!(v.text(), "Great news! Our product rocks.");
        assert_eq!(v.hashtags(), ["#New", "#Launch", "#Sale"]);
        // 50 - 10 (short) + 15 (3 tags) + 10 ("great", "product")
        assert_eq!(v.score(), 65);
        assert_eq!(v.score_reasons(), ["Good hashtag count", "Brand relevant"]);
        assert!(v.safety().ok);
    }

    #[tokio::test]
    async fn test_unsafe_output_is_returned_flagged_not_dropped() {
        let generator = Arc::new(ScriptedGenerator::returning("THIS IS AMAZING SPAM DEAL"));
        let variants = orchestrator(generator, 2)
            .generate_variants(&make_request(2), None)
            .await
            .unwrap();

        assert_eq!(variants.len(), 2);
        assert!(!variants[0].safety().ok);
        assert_eq!(
            variants[0].safety().reasons,
            vec![REASON_PROBLEMATIC_WORDS, REASON_EXCESSIVE_CAPS]
        );
    }

    #[tokio::test]
    async fn test_variant_count_matches_request() {
        for count in [1, 4, 7] {
            let generator = Arc::new(ScriptedGenerator::returning(FIXED_TEXT));
            let variants = orchestrator(generator, 3)
                .generate_variants(&make_request(count), None)
                .await
                .unwrap();
            assert_eq!(variants.len(), count as usize);
        }
    }

    #[tokio::test]
    async fn test_failure_on_second_call_fails_whole_batch() {
        let mut generator = ScriptedGenerator::returning(FIXED_TEXT);
        generator.fail_on_call = Some(2);
        let generator = Arc::new(generator);

        let err = orchestrator(generator, DEFAULT_MAX_CONCURRENCY)
            .generate_variants(&make_request(3), None)
            .await
            .unwrap_err();

        assert_eq!(err.reason(), GenerationErrorReason::RateLimited);
    }

    /// First call hangs for 30 s, second is rate limited at once, the rest take 1 s.
    struct StalledThenThrottledGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for StalledThenThrottledGenerator {
        async fn generate(&self, _prompt: &str) -> Result<Generation, GenerationError> {
            match self.calls.fetch_add(1, Ordering::SeqCst) {
                0 => tokio::time::sleep(Duration::from_secs(30)).await,
                1 => return Err(GenerationError::RateLimited("quota".to_string())),
                _ => tokio::time::sleep(Duration::from_secs(1)).await,
            }
            Ok(Generation {
                text: FIXED_TEXT.to_string(),
                usage: None,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_returns_without_waiting_for_slower_earlier_calls() {
        let generator = Arc::new(StalledThenThrottledGenerator {
            calls: AtomicUsize::new(0),
        });
        let started = tokio::time::Instant::now();

        let err = orchestrator(generator.clone(), 2)
            .generate_variants(&make_request(6), None)
            .await
            .unwrap_err();

        assert_eq!(err.reason(), GenerationErrorReason::RateLimited);
        assert!(
            started.elapsed() < Duration::from_secs(1),
            "batch held the error for {:?}",
            started.elapsed()
        );
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_follow_request_order_not_completion_order() {
        let generator = Arc::new(SlowFirstGenerator {
            calls: AtomicUsize::new(0),
        });
        let variants = orchestrator(generator, 5)
            .generate_variants(&make_request(4), None)
            .await
            .unwrap();

        let texts: Vec<&str> = variants.iter().map(Variant::text).collect();
        assert_eq!(
            texts,
            vec![
                "Caption number 0",
                "Caption number 1",
                "Caption number 2",
                "Caption number 3"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallelism_is_bounded() {
        let mut generator = ScriptedGenerator::returning(FIXED_TEXT);
        generator.delay = Duration::from_millis(50);
        let generator = Arc::new(generator);

        let variants = orchestrator(generator.clone(), 3)
            .generate_variants(&make_request(8), None)
            .await
            .unwrap();

        assert_eq!(variants.len(), 8);
        let peak = generator.max_in_flight.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight was {peak}");
        assert!(peak > 1, "calls should overlap, peak was {peak}");
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_treated_as_one() {
        let generator = Arc::new(ScriptedGenerator::returning(FIXED_TEXT));
        let variants = orchestrator(generator.clone(), 0)
            .generate_variants(&make_request(2), None)
            .await
            .unwrap();
        assert_eq!(variants.len(), 2);
        assert_eq!(generator.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_outstanding_calls() {
        let mut generator = ScriptedGenerator::returning(FIXED_TEXT);
        generator.delay = Duration::from_secs(30);
        let generator = Arc::new(generator);
        let orchestrator = orchestrator(generator, 5);

        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = orchestrator
            .generate_variants_cancellable(&make_request(3), None, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Cancelled));
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_makes_no_calls() {
        let generator = Arc::new(ScriptedGenerator::returning(FIXED_TEXT));
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = orchestrator(generator.clone(), 5)
            .generate_variants_cancellable(&make_request(3), None, &cancel)
            .await
            .unwrap_err();

        assert_eq!(err.reason(), GenerationErrorReason::Cancelled);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_cost_uses_character_counts_without_usage() {
        let generator = Arc::new(ScriptedGenerator::returning(FIXED_TEXT));
        let request = make_request(1);
        let variants = orchestrator(generator, 1)
            .generate_variants(&request, None)
            .await
            .unwrap();

        let cost = variants[0].cost();
        assert_eq!(cost.unit, CostUnit::Characters);
        assert_eq!(
            cost.input_units,
            build_prompt(&request, None).chars().count() as u64
        );
        assert_eq!(cost.output_units, FIXED_TEXT.chars().count() as u64);
    }

    #[tokio::test]
    async fn test_cost_prefers_provider_token_counts() {
        let mut generator = ScriptedGenerator::returning(FIXED_TEXT);
        generator.usage = Some(TokenUsage {
            input_tokens: 120,
            output_tokens: 18,
        });
        let variants = orchestrator(Arc::new(generator), 1)
            .generate_variants(&make_request(1), None)
            .await
            .unwrap();

        let cost = variants[0].cost();
        assert_eq!(cost.unit, CostUnit::Tokens);
        assert_eq!(cost.input_units, 120);
        assert_eq!(cost.output_units, 18);
    }

    #[tokio::test]
    async fn test_empty_provider_output_degrades_gracefully() {
        let generator = Arc::new(ScriptedGenerator::returning("   "));
        let variants = orchestrator(generator, 1)
            .generate_variants(&make_request(1), None)
            .await
            .unwrap();

        let v = &variants[0];
        assert_eq!(v.text(), "");
        assert!(v.hashtags().is_empty());
        assert!(v.safety().ok);
        // 50 - 10 (short) - 10 (no tags)
        assert_eq!(v.score(), 30);
    }
}
