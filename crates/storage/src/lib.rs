#![forbid(unsafe_code)]

pub mod memory;
pub mod repository;

pub use memory::InMemoryRepository;
pub use repository::{
    AttemptSink, CandidateFilter, CandidatePage, CandidateQuery, FlagSink, HistoryStore,
    QuestionRecord, QuestionStore, ReviewQueue, Storage, StorageError,
};
