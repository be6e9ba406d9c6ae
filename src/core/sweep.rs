//! Benchmark sweeps - one pipeline run per configuration and capacity.
//!
//! [`run_sweep`] runs every [`PipelineConfig`] against every capacity on a
//! fresh queue. The resulting reports can be exported as CSV, one flat row
//! per run.

use crate::config::PipelineConfig;
use crate::core::engine::{BenchmarkReport, PipelineEngine};
use crate::error::{QueueError, QueueResult};
use crate::queue::BoundedQueue;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Run each configuration once per capacity, each run on its own queue.
///
/// Reports come back in order: all capacities of the first configuration,
/// then all capacities of the next. The first invalid configuration or
/// failed run aborts the sweep.
pub async fn run_sweep(
    configs: &[PipelineConfig],
    capacities: &[usize],
) -> QueueResult<Vec<BenchmarkReport>> {
    for config in configs {
        config
            .validate()
            .map_err(|errors| QueueError::config(errors.join("; ")))?;
    }

    tracing::info!(
        "Starting sweep of {} configurations over {} capacities",
        configs.len(),
        capacities.len()
    );

    let mut reports = Vec::with_capacity(configs.len() * capacities.len());
    for config in configs {
        for &capacity in capacities {
            let queue = Arc::new(BoundedQueue::new(capacity));
            let report = PipelineEngine::new(config.clone(), queue).run().await?;
            reports.push(report);
        }
    }

    tracing::info!("Sweep finished with {} runs", reports.len());
    Ok(reports)
}

/// One CSV row: a [`BenchmarkReport`] with its queue statistics flattened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRow {
    pub name: String,
    pub capacity: usize,
    pub producers: usize,
    pub consumers: usize,
    pub tasks_produced: usize,
    pub tasks_consumed: usize,
    pub elapsed_micros: i64,
    pub throughput_per_sec: f64,
    pub avg_enqueue_micros: f64,
    pub avg_dequeue_micros: f64,
    pub max_enqueue_micros: i64,
    pub min_enqueue_micros: i64,
    pub max_dequeue_micros: i64,
    pub min_dequeue_micros: i64,
    pub block_count: i64,
    pub max_len: usize,
}

impl From<&BenchmarkReport> for BenchmarkRow {
    fn from(report: &BenchmarkReport) -> Self {
        Self {
            name: report.name.clone(),
            capacity: report.capacity,
            producers: report.producers,
            consumers: report.consumers,
            tasks_produced: report.tasks_produced,
            tasks_consumed: report.tasks_consumed,
            elapsed_micros: report.elapsed_micros,
            throughput_per_sec: report.throughput_per_sec,
            avg_enqueue_micros: report.queue.enqueue.average_micros,
            avg_dequeue_micros: report.queue.dequeue.average_micros,
            max_enqueue_micros: report.queue.enqueue.max_micros,
            min_enqueue_micros: report.queue.enqueue.min_micros,
            max_dequeue_micros: report.queue.dequeue.max_micros,
            min_dequeue_micros: report.queue.dequeue.min_micros,
            block_count: report.queue.block_count,
            max_len: report.queue.max_len,
        }
    }
}

/// Write reports as CSV with a header row. Nothing is written for an empty
/// slice.
pub fn write_csv<W: io::Write>(reports: &[BenchmarkReport], writer: W) -> QueueResult<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for report in reports {
        writer.serialize(BenchmarkRow::from(report))?;
    }
    writer.flush()?;
    Ok(())
}

/// Render reports as a CSV string.
pub fn to_csv(reports: &[BenchmarkReport]) -> QueueResult<String> {
    let mut buffer = Vec::new();
    write_csv(reports, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Write reports to a CSV file, replacing it if it exists.
pub fn export_csv(reports: &[BenchmarkReport], path: impl AsRef<Path>) -> QueueResult<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path)?;
    write_csv(reports, file)?;
    tracing::info!("Exported {} reports to {}", reports.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sweep_configs() -> Vec<PipelineConfig> {
        vec![
            PipelineConfig::new(1, 1).with_name("one").with_total_tasks(20),
            PipelineConfig::new(3, 2).with_name("many").with_total_tasks(31),
        ]
    }

    #[tokio::test]
    async fn test_sweep_runs_every_combination() {
        let reports = run_sweep(&sweep_configs(), &[0, 1, 8]).await.unwrap();

        assert_eq!(reports.len(), 6);
        let runs: Vec<_> = reports
            .iter()
            .map(|r| (r.name.as_str(), r.capacity))
            .collect();
        assert_eq!(
            runs,
            vec![
                ("one", 0),
                ("one", 1),
                ("one", 8),
                ("many", 0),
                ("many", 1),
                ("many", 8)
            ]
        );

        for report in &reports {
            let expected = if report.name == "one" { 20 } else { 31 };
            assert_eq!(report.tasks_produced, expected);
            assert_eq!(report.tasks_consumed, expected);
            assert_eq!(report.queue.enqueue.count, expected as i64);
            assert!(report.queue.max_len <= report.capacity);
        }
    }

    #[tokio::test]
    async fn test_sweep_rejects_invalid_config() {
        let configs = vec![PipelineConfig::new(1, 1), PipelineConfig::new(0, 1)];
        let err = run_sweep(&configs, &[4]).await.unwrap_err();
        assert!(matches!(err, QueueError::Config { .. }));
    }

    #[tokio::test]
    async fn test_sweep_without_capacities_is_empty() {
        let reports = run_sweep(&sweep_configs(), &[]).await.unwrap();
        assert!(reports.is_empty());
    }

    #[tokio::test]
    async fn test_csv_has_header_and_one_row_per_report() {
        let reports = run_sweep(&sweep_configs()[..1], &[0, 4]).await.unwrap();

        let csv = to_csv(&reports).unwrap();
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("name,capacity,producers,consumers"));
        assert!(header.ends_with("block_count,max_len"));
        assert_eq!(lines.count(), 2);

        let rows: Vec<BenchmarkRow> = csv::Reader::from_reader(csv.as_bytes())
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rows[0], BenchmarkRow::from(&reports[0]));
        assert_eq!(rows[1].capacity, 4);
        assert_eq!(rows[1].tasks_consumed, 20);
    }

    #[test]
    fn test_csv_of_no_reports_is_empty() {
        assert_eq!(to_csv(&[]).unwrap(), "");
    }

    #[tokio::test]
    async fn test_export_csv_writes_file() {
        let reports = run_sweep(&sweep_configs()[..1], &[2]).await.unwrap();
        let path = std::env::temp_dir().join(format!("tallyq-sweep-{}.csv", std::process::id()));

        export_csv(&reports, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(written, to_csv(&reports).unwrap());
        assert_eq!(written.lines().count(), 2);
    }
}
