//! Contains the conflict analysis algorithms: 1-UIP clause learning over the reason DAG and the
//! extraction of incompatible decision sets for assumption cores.
mod conflict_analysis_context;
mod resolution_conflict_analyser;

pub(crate) use conflict_analysis_context::ConflictAnalysisContext;
pub(crate) use resolution_conflict_analyser::ConflictAnalysisResult;
pub(crate) use resolution_conflict_analyser::ResolutionConflictAnalyser;
