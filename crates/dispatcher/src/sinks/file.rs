//! FileSink - appends outputs to a JSON Lines file

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use contracts::{ContractError, EngineOutput, GeoPoint, OutputSink};
use serde::Serialize;
use tracing::{debug, error, instrument};

use crate::error::DispatcherError;

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file; parent directories are created
    pub path: PathBuf,
    /// Append to an existing file instead of truncating it
    pub append: bool,
}

impl FileSinkConfig {
    /// Read `path` (required) and `append` (optional, "true"/"false")
    pub fn from_params(name: &str, params: &HashMap<String, String>) -> Result<Self, DispatcherError> {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .ok_or_else(|| DispatcherError::MissingParam {
                name: name.to_string(),
                param: "path",
            })?;
        let append = params
            .get("append")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Ok(Self { path, append })
    }
}

/// One line of the output file
#[derive(Debug, Serialize)]
struct OutputRecord<'a> {
    recorded_at: String,
    update_count: u64,
    centroid: &'a GeoPoint,
    average_accuracy: f64,
}

impl<'a> OutputRecord<'a> {
    fn new(output: &'a EngineOutput, now: DateTime<Utc>) -> Self {
        Self {
            recorded_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            update_count: output.update_count,
            centroid: &output.centroid,
            average_accuracy: output.average_accuracy,
        }
    }
}

/// Sink that writes one JSON object per output
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    writer: BufWriter<File>,
}

impl FileSink {
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(config.append)
            .truncate(!config.append)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            config,
            writer: BufWriter::new(file),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, DispatcherError> {
        let name = name.into();
        let config = FileSinkConfig::from_params(&name, params)?;
        let path = config.path.clone();
        Self::new(name.clone(), config).map_err(|e| DispatcherError::sink_open(name, path, e))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.config.path
    }

    fn append_record(&mut self, output: &EngineOutput) -> std::io::Result<()> {
        let record = OutputRecord::new(output, Utc::now());
        serde_json::to_writer(&mut self.writer, &record).map_err(std::io::Error::other)?;
        self.writer.write_all(b"\n")
    }

    fn sink_error(&self, e: std::io::Error) -> ContractError {
        ContractError::sink_write(&self.name, e.to_string())
    }
}

impl OutputSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, output),
        fields(sink = %self.name, update_count = output.update_count)
    )]
    async fn write(&mut self, output: &EngineOutput) -> Result<(), ContractError> {
        self.append_record(output).map_err(|e| {
            error!(error = %e, "Write failed");
            self.sink_error(e)
        })
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        self.writer.flush().map_err(|e| self.sink_error(e))
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.writer.flush().map_err(|e| self.sink_error(e))?;
        debug!(sink = %self.name, path = %self.config.path.display(), "FileSink closed");
        Ok(())
    }
}
