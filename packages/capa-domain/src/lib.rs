pub mod keyword;
pub mod knowledge;
pub mod normalize;
pub mod similarity;
pub mod time_serde;

pub use knowledge::{CandidateKind, KnowledgeRecord, QueryContext};
