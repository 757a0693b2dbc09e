//! Destinations for tick and run reports.

use async_trait::async_trait;
use config::OutputConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Result, SamplerError};
use crate::record::{RunReport, TickReport};

#[async_trait]
pub trait ReportSink: Send {
    /// Called once per completed tick, in order.
    async fn write_tick(&mut self, report: &TickReport) -> Result<()>;

    /// Called once when the run ends, however it ends.
    async fn finish(&mut self, report: &RunReport) -> Result<()>;
}

/// Writes `prices_{unix_ts}.json` per tick and `run_{unix_ts}.json` at the end.
pub struct JsonFileSink {
    directory: PathBuf,
    per_tick_files: bool,
    run_file: bool,
}

impl JsonFileSink {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            directory: config.directory.clone(),
            per_tick_files: config.per_tick_files,
            run_file: config.run_file,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn tick_path(&self, report: &TickReport) -> PathBuf {
        self.directory.join(format!("prices_{}.json", report.timestamp))
    }

    pub fn run_path(&self, report: &RunReport) -> PathBuf {
        self.directory
            .join(format!("run_{}.json", report.started_at.timestamp()))
    }

    async fn write_json<T: Serialize + Sync>(&self, path: PathBuf, value: &T) -> Result<()> {
        let json = serde_json::to_vec_pretty(value)?;

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|source| SamplerError::Io {
                path: self.directory.clone(),
                source,
            })?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|source| SamplerError::Io {
                path: path.clone(),
                source,
            })?;

        info!(path = %path.display(), "Report written");
        Ok(())
    }
}

#[async_trait]
impl ReportSink for JsonFileSink {
    async fn write_tick(&mut self, report: &TickReport) -> Result<()> {
        if !self.per_tick_files {
            return Ok(());
        }
        self.write_json(self.tick_path(report), &report.strikes).await
    }

    async fn finish(&mut self, report: &RunReport) -> Result<()> {
        if !self.run_file {
            return Ok(());
        }
        self.write_json(self.run_path(report), report).await
    }
}

/// Keeps reports in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub ticks: Vec<TickReport>,
    pub run: Option<RunReport>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn write_tick(&mut self, report: &TickReport) -> Result<()> {
        self.ticks.push(report.clone());
        Ok(())
    }

    async fn finish(&mut self, report: &RunReport) -> Result<()> {
        self.run = Some(report.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RunStatus, StrikeKey, StrikeRecords};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn tick(timestamp: i64) -> TickReport {
        let mut strikes = BTreeMap::new();
        strikes.insert(StrikeKey::from(95000.0), StrikeRecords::default());
        TickReport {
            tick: 0,
            timestamp,
            offset_ms: 0,
            strikes,
        }
    }

    fn run(ticks: Vec<TickReport>) -> RunReport {
        RunReport {
            expiry: "27JUN25".to_string(),
            testnet: true,
            estimator: "fallback_chain".to_string(),
            duration_seconds: 20,
            interval_seconds: 5,
            started_at: Utc.timestamp_opt(1_750_000_000, 0).unwrap(),
            finished_at: None,
            status: RunStatus::Completed,
            ticks,
        }
    }

    #[tokio::test]
    async fn test_json_file_sink_writes_tick_and_run_files() {
        let directory = std::env::temp_dir().join(format!("markx-sink-{}", std::process::id()));
        let mut sink = JsonFileSink::new(&OutputConfig {
            directory: directory.clone(),
            per_tick_files: true,
            run_file: true,
        });

        let report = tick(1_750_000_005);
        sink.write_tick(&report).await.unwrap();
        sink.finish(&run(vec![report.clone()])).await.unwrap();

        let tick_file = directory.join("prices_1750000005.json");
        let text = tokio::fs::read_to_string(&tick_file).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(value.get("95000").is_some());

        let run_file = directory.join("run_1750000000.json");
        let text = tokio::fs::read_to_string(&run_file).await.unwrap();
        let parsed: RunReport = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.ticks, vec![report]);

        tokio::fs::remove_dir_all(&directory).await.ok();
    }

    #[tokio::test]
    async fn test_disabled_outputs_write_nothing() {
        let directory = std::env::temp_dir().join(format!("markx-sink-off-{}", std::process::id()));
        let mut sink = JsonFileSink::new(&OutputConfig {
            directory: directory.clone(),
            per_tick_files: false,
            run_file: false,
        });

        sink.write_tick(&tick(1)).await.unwrap();
        sink.finish(&run(Vec::new())).await.unwrap();
        assert!(!directory.exists());
    }

    #[tokio::test]
    async fn test_memory_sink_keeps_everything() {
        let mut sink = MemorySink::new();
        sink.write_tick(&tick(1)).await.unwrap();
        sink.write_tick(&tick(2)).await.unwrap();
        sink.finish(&run(Vec::new())).await.unwrap();

        assert_eq!(sink.ticks.len(), 2);
        assert!(sink.run.is_some());
    }
}
