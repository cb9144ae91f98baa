/*!
 * AI-powered translation pipeline.
 *
 * Module layout:
 * - `blueprint`: the structured brief synthesized once per job
 * - `prompts`: templates for the five AI call shapes
 * - `pipeline`: the multi-phase orchestrator run by the worker pool
 */

pub mod blueprint;
pub mod pipeline;
pub mod prompts;

// Re-export main types
pub use blueprint::{GlossaryTerm, TranslationBlueprint, TranslationType, UserGlossaryEntry};
pub use pipeline::{PipelineConfig, TranslationPipeline};
