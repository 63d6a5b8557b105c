// Adapters layer: file-backed implementations of the record source and sink ports.

pub mod file_sink;
pub mod file_source;

pub use file_sink::{DelimitedFileSink, SinkOptions};
pub use file_source::{DelimitedFileSource, FieldMapping, SourceOptions};
