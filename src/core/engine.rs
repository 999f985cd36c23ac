use crate::core::dataset::{load_csv_dir, split_data};
use crate::core::training::{evaluate, train_model, training_report};
use crate::core::{ConfigProvider, RunInfo, RunStatus, RunSummary, Tracker};
use crate::ml::LogisticRegression;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use std::collections::BTreeMap;

/// Runs load → split → fit → evaluate inside one tracking run. The run is
/// always closed: `FINISHED` on success, `FAILED` when any step errors.
pub struct TrainingEngine<C: ConfigProvider> {
    config: C,
    tracker: Box<dyn Tracker>,
    monitor: SystemMonitor,
}

impl<C: ConfigProvider> TrainingEngine<C> {
    pub fn new(config: C, tracker: Box<dyn Tracker>) -> Self {
        Self::new_with_monitoring(config, tracker, false)
    }

    pub fn new_with_monitoring(config: C, tracker: Box<dyn Tracker>, monitor: bool) -> Self {
        Self {
            config,
            tracker,
            monitor: SystemMonitor::new(monitor),
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        tracing::info!("Received training_data path: {}", self.config.training_data());
        tracing::info!("Received reg_rate: {}", self.config.reg_rate());

        let experiment_id = self
            .tracker
            .set_experiment(self.config.experiment_name())
            .await?;
        let run = self.tracker.start_run(&experiment_id).await?;
        tracing::info!("Running tracking run with ID: {}", run.run_id);

        let outcome = self.train_and_log(&run).await;
        let status = if outcome.is_ok() {
            RunStatus::Finished
        } else {
            RunStatus::Failed
        };

        match self.tracker.end_run(&run, status).await {
            Ok(()) => tracing::debug!("Run {} closed as {}", run.run_id, status),
            Err(e) if outcome.is_ok() => return Err(e),
            Err(e) => tracing::warn!("Could not mark run {} as {}: {}", run.run_id, status, e),
        }

        self.monitor.log_final_stats();
        outcome
    }

    async fn train_and_log(&self, run: &RunInfo) -> Result<RunSummary> {
        let dataset = load_csv_dir(self.config.training_data())?;
        self.monitor.phase_done("Load");

        let split = split_data(&dataset, self.config.test_size(), self.config.random_state())?;
        self.monitor.phase_done("Split");

        let model = train_model(self.config.reg_rate(), self.config.max_iter(), &split)?;
        let training = training_report(&model, &split)?;
        self.monitor.phase_done("Train");

        let evaluation = evaluate(&model, &split)?;
        tracing::info!(
            "Test accuracy: {:.4}, AUC: {:.4}",
            evaluation.accuracy,
            evaluation.auc
        );
        self.monitor.phase_done("Evaluate");

        self.log_params(run).await?;

        let mut metrics = BTreeMap::new();
        metrics.extend(training.named("training_"));
        metrics.insert("accuracy".to_string(), evaluation.accuracy);
        metrics.insert("auc".to_string(), evaluation.auc);
        for (key, value) in &metrics {
            self.tracker.log_metric(run, key, *value, 0).await?;
        }

        let model_artifact = format!("model_{}/model.json", run.run_id);
        self.tracker
            .log_artifact(run, &model_artifact, &model.to_json()?)
            .await?;
        self.monitor.phase_done("Log");

        Ok(RunSummary {
            run_id: run.run_id.clone(),
            experiment_id: run.experiment_id.clone(),
            metrics,
            model_artifact,
        })
    }

    async fn log_params(&self, run: &RunInfo) -> Result<()> {
        let estimator = LogisticRegression::from_reg_rate(self.config.reg_rate())?
            .with_max_iter(self.config.max_iter());

        let mut params: Vec<(String, String)> = estimator
            .params()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        params.push(("reg_rate".to_string(), self.config.reg_rate().to_string()));
        params.push(("test_size".to_string(), self.config.test_size().to_string()));
        params.push((
            "random_state".to_string(),
            self.config.random_state().to_string(),
        ));

        for (key, value) in &params {
            self.tracker.log_param(run, key, value).await?;
        }
        Ok(())
    }
}
