pub mod analyzer;
pub mod apply;
pub mod config;
pub mod diff;
pub mod evidence;
pub mod generate;
pub mod ops;
pub mod profile;
pub mod recommendation;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod test_helpers;

pub use analyzer::{Analyzer, AnalyzerError, AnalyzerReply, AnalyzerRequest, CommandAnalyzer, RawDraft};
pub use apply::{ApplyOutcome, SkipReason, SkippedRecommendation, apply_edit};
pub use config::{AnalyzerConfig, Config, EvidenceConfig, ProjectConfig};
pub use diff::{DiffOp, DiffSpan, diff_words, is_effective_change};
pub use evidence::{EvidencePolicy, TestComment};
pub use generate::{DroppedDraft, GenerateOutcome};
pub use ops::{OpError, ProfileSnapshot};
pub use profile::{AgentProfile, ProfileVersion, SectionKey, VersionSource};
pub use recommendation::{
    Alignment, AnalysisSummary, Edit, RecStatus, Recommendation, RecommendationSet,
};
pub use store::{ProfileStore, StoreError, load_store, save_store, store_path};
