// ============================================================
// Layer 5: ML / Model Layer (Burn)
// ============================================================
// All Burn modules live here, together with the factories that
// build them from a PipelineConfig.
//
//   model.rs     : CAW scoring model
//                  Node and edge feature tables, linear
//                  projections, and a merge MLP that turns a
//                  (src, dst, edge) triple into a logit.
//
//   executor.rs  : Task executors
//                  Wrap a model for one task (link prediction
//                  or node classification) and own its
//                  checkpoint files.
//
//   evaluator.rs : Metric collection
//                  Accuracy, average precision and ROC-AUC over
//                  collected labels and scores.
//
// Every component is looked up by name in a Registry, so an
// unknown model, task or evaluator name is reported as
// NotFound rather than failing deep inside the pipeline.

/// CAW model architecture and the model factory
pub mod model;

/// Task executors and the executor factory
pub mod executor;

/// Evaluators and the evaluator factory
pub mod evaluator;
