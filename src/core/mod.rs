pub mod etl;
pub mod runner;
pub mod transform;

pub use crate::domain::model::{CaseMapping, Chunk, Record, RunState, RunStatus, RunSummary};
pub use crate::domain::ports::{
    ChunkListener, ConfigProvider, RecordSink, RecordSource, RecordTransformer,
};
pub use crate::utils::error::Result;
