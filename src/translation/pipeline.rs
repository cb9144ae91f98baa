/*!
 * Translation pipeline orchestrator.
 *
 * Runs the linear per-job state machine:
 * blueprint (keywords → grounding → assembly) → indexing → batched translation
 * with per-line model triage → memory cleanup → final render. Every phase
 * transition goes through the [`StageReporter`] so persisted progress and the
 * event bus stay in step; any phase error unwinds to the worker pool, which
 * alone decides between retry and terminal failure.
 */

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};

use crate::errors::{AiError, PipelineError};
use crate::memory::{ContextMemory, DEFAULT_TOP_K};
use crate::providers::{AiProvider, ModelTier};
use crate::queue::models::Job;
use crate::queue::worker::{JobProcessor, StageReporter};
use crate::subtitle_processor::{SubtitleCollection, SubtitleLine, TranslatedLine};
use crate::translation::blueprint::{
    GroundedKeyword, KeywordEntry, TranslationBlueprint, TriageClassification,
};
use crate::translation::prompts;

/// Configuration for the translation pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Lines per translation batch
    pub batch_size: usize,

    /// Context lines retrieved per translated line
    pub context_top_k: usize,

    /// Model id behind the fast tier
    pub fast_model: String,

    /// Model id behind the deep tier
    pub deep_model: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 15,
            context_top_k: DEFAULT_TOP_K,
            fast_model: "gemini-2.0-flash".to_string(),
            deep_model: "gemini-2.5-pro".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Resolve a tier to its configured model id
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast_model,
            ModelTier::Deep => &self.deep_model,
        }
    }
}

/// The per-job translation orchestrator
pub struct TranslationPipeline {
    provider: Arc<dyn AiProvider>,
    memory: ContextMemory,
    config: PipelineConfig,
}

impl TranslationPipeline {
    /// Create a pipeline over the given gateway and memory store
    pub fn new(
        provider: Arc<dyn AiProvider>,
        memory: ContextMemory,
        config: PipelineConfig,
    ) -> Self {
        Self {
            provider,
            memory,
            config,
        }
    }

    /// Phase 1: synthesize the blueprint with three sequential AI calls.
    ///
    /// Each call feeds the next: extracted keywords are grounded into
    /// candidate translations, and the grounded set plus the user glossary
    /// inform the final assembly. The sacrosanct-glossary invariant is
    /// enforced after assembly rather than trusted to the model.
    async fn build_blueprint(
        &self,
        job: &Job,
        script: &str,
        reporter: &StageReporter,
    ) -> Result<TranslationBlueprint, PipelineError> {
        reporter
            .report_stage("Building blueprint: extracting keywords")
            .await;

        let raw = self
            .provider
            .generate_structured(
                self.config.model_for(ModelTier::Fast),
                &prompts::keyword_extraction(script),
            )
            .await?;
        let keywords: Vec<KeywordEntry> = decode_structured(raw, "keyword extraction")?;
        info!(
            "Job {}: extracted {} keyword(s)",
            short_id(&job.id),
            keywords.len()
        );

        reporter
            .report_stage("Building blueprint: grounding terms")
            .await;

        // An empty keyword list is a valid result; skip the grounding call
        let grounded: Vec<GroundedKeyword> = if keywords.is_empty() {
            Vec::new()
        } else {
            let raw = self
                .provider
                .generate_structured(
                    self.config.model_for(ModelTier::Fast),
                    &prompts::keyword_grounding(&keywords),
                )
                .await?;
            decode_structured(raw, "keyword grounding")?
        };

        reporter
            .report_stage("Building blueprint: assembling brief")
            .await;

        let raw = self
            .provider
            .generate_structured(
                self.config.model_for(ModelTier::Deep),
                &prompts::blueprint_assembly(
                    script,
                    &job.payload.tone,
                    &grounded,
                    &job.payload.user_glossary,
                ),
            )
            .await?;

        // A blueprint without its glossary field fails deserialization and
        // the job: there is no usable brief without the glossary.
        let mut blueprint: TranslationBlueprint = serde_json::from_value(raw)
            .map_err(|e| PipelineError::InvalidBlueprint(e.to_string()))?;

        blueprint.apply_user_glossary(&job.payload.user_glossary);

        Ok(blueprint)
    }

    /// Phase 3a: classify one batch of lines into model tiers.
    ///
    /// Triage is an optimization, not a correctness gate: a failed or
    /// malformed triage call degrades the batch to the fast tier instead of
    /// failing the job, and any line absent from the result defaults to fast.
    async fn triage_batch(&self, batch: &[SubtitleLine]) -> HashMap<usize, ModelTier> {
        let response = self
            .provider
            .generate_structured(
                self.config.model_for(ModelTier::Fast),
                &prompts::batch_triage(batch),
            )
            .await;

        match response.map(parse_triage) {
            Ok(classifications) => classifications
                .into_iter()
                .map(|c| (c.line_id, c.tier))
                .collect(),
            Err(e) => {
                warn!("Triage call failed, defaulting batch to fast tier: {e}");
                HashMap::new()
            }
        }
    }

    /// Phase 3b: translate one line with retrieved context at its tier
    async fn translate_line(
        &self,
        job: &Job,
        brief: &str,
        line: &SubtitleLine,
        tier: ModelTier,
    ) -> Result<TranslatedLine, PipelineError> {
        let context = self
            .memory
            .query(&job.id, &line.text, self.config.context_top_k)
            .await?;

        let prompt = prompts::line_translation(brief, &context, line, &job.payload.tone);
        let translated = self
            .provider
            .generate_text(self.config.model_for(tier), &prompt)
            .await?;

        Ok(TranslatedLine::new(line.clone(), translated))
    }
}

#[async_trait]
impl JobProcessor for TranslationPipeline {
    async fn process(&self, job: &Job, reporter: &StageReporter) -> Result<String, PipelineError> {
        // Parsing degrades but never fails
        let collection = SubtitleCollection::parse(&job.payload.subtitle_content);
        if collection.degraded {
            warn!(
                "Job {}: subtitle input did not parse structurally, lines carry no timing",
                short_id(&job.id)
            );
        }
        let script = collection.full_text();

        // Phase 1: blueprint
        let blueprint = self.build_blueprint(job, &script, reporter).await?;
        reporter.publish(crate::events::ProgressEvent::BlueprintReady(
            blueprint.clone(),
        ));
        let brief = blueprint.to_brief();

        // Phase 2: index the job's lines into context memory
        reporter
            .report_stage("Indexing lines into context memory")
            .await;
        self.memory.index(&job.id, &collection.lines).await?;

        // Phase 3: batched translation, strictly sequential
        let total_batches = collection.lines.len().div_ceil(self.config.batch_size).max(1);
        let mut translated: Vec<TranslatedLine> = Vec::with_capacity(collection.lines.len());

        for (batch_index, batch) in collection.lines.chunks(self.config.batch_size).enumerate() {
            reporter
                .report_stage(&format!(
                    "Translating batch {} of {}",
                    batch_index + 1,
                    total_batches
                ))
                .await;

            // Thinking mode routes every line to the deep tier outright
            let tiers = if job.payload.thinking_mode {
                batch
                    .iter()
                    .map(|line| (line.seq_num, ModelTier::Deep))
                    .collect()
            } else {
                self.triage_batch(batch).await
            };

            let mut batch_output = Vec::with_capacity(batch.len());
            for line in batch {
                let tier = tiers.get(&line.seq_num).copied().unwrap_or(ModelTier::Fast);
                batch_output.push(self.translate_line(job, &brief, line, tier).await?);
            }

            // Reassemble by sequence id in case a future version parallelizes
            batch_output.sort_by_key(|entry| entry.line.seq_num);
            translated.extend(batch_output);
        }

        // Phase 4: cleanup is best-effort and never fails the job
        reporter.report_stage("Cleaning up context memory").await;
        self.memory.purge(&job.id).await;

        // Phase 5: render the final output
        Ok(SubtitleCollection::render(&translated))
    }
}

/// Decode a structured-generation payload into the expected schema
fn decode_structured<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
    context: &str,
) -> Result<T, PipelineError> {
    serde_json::from_value(value).map_err(|e| {
        PipelineError::Ai(AiError::ParseError(format!(
            "{context} returned unexpected schema: {e}"
        )))
    })
}

/// Parse triage output leniently: entries that do not match the schema are
/// dropped, falling back to the per-line fast default
fn parse_triage(value: serde_json::Value) -> Vec<TriageClassification> {
    match value {
        serde_json::Value::Array(entries) => entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect(),
        _ => Vec::new(),
    }
}

/// First eight characters of a job id for log lines
fn short_id(job_id: &str) -> &str {
    &job_id[..8.min(job_id.len())]
}
