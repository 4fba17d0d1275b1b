//! Wiring: configuration in, a running crawler/worker pipeline out.

use std::future::Future;

use anyhow::Context as _;
use rf_core::{Config, RecordSink};
use rf_output::WriterFactory;
use rf_rules::{ActionProcessor, MemorySink, RuleError, StatsSnapshot};
use rf_watcher::{Crawler, PendingQueue, scan_inputs};

use crate::worker::Worker;

/// Builds the rule engine with one [`BufferedWriter`](rf_output::BufferedWriter)
/// per configured action.
///
/// Must be called within a Tokio runtime when output buffering is enabled.
///
/// # Errors
///
/// Fails if a condition is invalid or an output directory cannot be created.
pub fn build_processor(config: &Config) -> anyhow::Result<ActionProcessor> {
    let factory = WriterFactory::from_config(config);
    ActionProcessor::new(&config.actions, |action| factory.create_sink(action))
        .with_context(|| format!("failed to configure actions for {}", factory.output_folder()))
}

/// Validates the configuration and builds its actions against in-memory
/// outputs, touching nothing on disk.
///
/// # Errors
///
/// Fails if the configuration or any condition is invalid.
pub fn check(config: &Config) -> anyhow::Result<ActionProcessor> {
    config.validate().context("invalid configuration")?;
    let processor = ActionProcessor::new(&config.actions, |_| {
        Ok::<_, RuleError>(Box::new(MemorySink::new()) as Box<dyn RecordSink>)
    })?;
    Ok(processor)
}

/// Watches the input folder and processes files until `shutdown` resolves.
///
/// Files already present are processed first, in file name order. On
/// shutdown the crawler stops, the file in progress is finished, and every
/// output is flushed before this returns.
///
/// # Errors
///
/// Fails on invalid configuration, on output directory errors, or if the
/// crawler cannot start.
pub async fn run<S>(config: Config, shutdown: S) -> anyhow::Result<StatsSnapshot>
where
    S: Future<Output = ()>,
{
    config.validate().context("invalid configuration")?;
    let processor = build_processor(&config)?;

    let (mut crawler, notices) = Crawler::new(config.input_folder.clone(), &config.watch);
    let worker = Worker::new(processor, crawler.queue(), config.reader);
    crawler
        .start()
        .await
        .with_context(|| format!("failed to watch {}", config.input_folder))?;

    tracing::info!(
        input = %config.input_folder,
        output = %config.output_folder,
        actions = config.actions.len(),
        "Service started"
    );

    let worker_task = tokio::task::spawn_blocking(move || worker.run_blocking(notices));

    shutdown.await;
    tracing::info!("Shutdown requested");
    crawler.shutdown().await;

    let snapshot = worker_task.await.context("worker thread panicked")?;
    tracing::info!("Service stopped");
    Ok(snapshot)
}

/// Processes the input files present now, then returns.
///
/// # Errors
///
/// Fails on invalid configuration, on output directory errors, or if the
/// input folder cannot be listed.
pub async fn run_once(config: Config) -> anyhow::Result<StatsSnapshot> {
    config.validate().context("invalid configuration")?;
    let processor = build_processor(&config)?;

    let queue = PendingQueue::new();
    for input in scan_inputs(&config.input_folder, &config.watch.extension)? {
        queue.push_unique(input);
    }
    tracing::info!(
        input = %config.input_folder,
        files = queue.len(),
        "Processing present files"
    );

    let mut worker = Worker::new(processor, queue, config.reader);
    let snapshot = tokio::task::spawn_blocking(move || {
        worker.drain();
        worker.finish()
    })
    .await
    .context("worker thread panicked")?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use rf_core::{ActionConfig, ActionKind, ConditionConfig};
    use std::fs;
    use tempfile::TempDir;

    fn config(root: &TempDir) -> Config {
        let root = Utf8PathBuf::from_path_buf(root.path().to_path_buf()).unwrap();
        let input = root.join("in");
        fs::create_dir_all(&input).unwrap();

        let mut action = ActionConfig::new(ActionKind::Group);
        action.group_name = "Adults".to_owned();
        action.conditions.push(ConditionConfig::IsInRange {
            field: "Age".to_owned(),
            range_start: 18,
            range_end: 100,
        });

        Config {
            input_folder: input,
            output_folder: root.join("out"),
            actions: vec![action],
            ..Config::default()
        }
    }

    #[test]
    fn test_check_builds_without_touching_disk() {
        let root = TempDir::new().unwrap();
        let config = config(&root);
        let processor = check(&config).unwrap();
        assert_eq!(processor.actions().len(), 1);
        assert!(!config.output_folder.exists());
    }

    #[test]
    fn test_check_rejects_invalid_condition() {
        let root = TempDir::new().unwrap();
        let mut config = config(&root);
        config.actions[0].conditions.push(ConditionConfig::IsAllowed {
            field: String::new(),
            value: "x".to_owned(),
        });
        assert!(check(&config).is_err());
    }

    #[tokio::test]
    async fn test_run_once_processes_present_files() {
        let root = TempDir::new().unwrap();
        let config = config(&root);
        fs::write(
            config.input_folder.join("acme_people_20240101.csv"),
            "FirstName,Age\nJohn,32\nJane,12\n",
        )
        .unwrap();
        fs::write(config.input_folder.join("readme.txt"), "ignored").unwrap();

        let snapshot = run_once(config.clone()).await.unwrap();
        assert_eq!(snapshot.files_started, 1);
        assert_eq!(snapshot.records_evaluated, 2);

        let output = config.output_folder.join("acme_people_20240101_groupAdults.csv");
        assert_eq!(fs::read_to_string(output).unwrap(), "FirstName,Age\nJohn,32\n");
    }
}
