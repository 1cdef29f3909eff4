// AI Workbench caption pipeline.
// Implements: prompt building, response parsing, scoring, safety gating, variant orchestration.
// All provider calls go through llm_client; no direct HTTP calls here.

pub mod cancel;
pub mod handlers;
pub mod inflight;
pub mod orchestrator;
pub mod parser;
pub mod prompt_builder;
pub mod safety;
pub mod scoring;
pub mod tone;
