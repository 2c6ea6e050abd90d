// Library interface for fetchcast modules
// This allows tests and other binaries to import modules

pub mod download;
pub mod ingestion;
pub mod limiter;
pub mod notify;
pub mod schedule;
pub mod sink;
pub mod storage;
pub mod watcher;
