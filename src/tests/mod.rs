//! End-to-end scenarios exercising the full propagation and learning pipeline.
mod engine_scenarios;
