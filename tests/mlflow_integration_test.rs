use anyhow::Result;
use httpmock::prelude::*;
use diabetes_train::{tracker_from_config, TomlConfig, TrainError, TrainingEngine};
use std::path::Path;
use tempfile::TempDir;

fn write_csv(dir: &Path) -> Result<()> {
    let mut content = String::from(
        "Pregnancies,PlasmaGlucose,DiastolicBloodPressure,TricepsThickness,SerumInsulin,BMI,DiabetesPedigree,Age,Diabetic\n",
    );
    for i in 0..100usize {
        let glucose = 70 + (i * 41) % 120;
        let age = 21 + (i * 7) % 45;
        let diabetic = u8::from(glucose + age > 165 || i % 11 == 0);
        content.push_str(&format!(
            "{},{},70,25,{},{}.0,0.5,{},{}\n",
            i % 6,
            glucose,
            40 + (i * 13) % 200,
            20 + i % 20,
            age,
            diabetic
        ));
    }
    std::fs::write(dir.join("diabetes.csv"), content)?;
    Ok(())
}

fn config_for(server: &MockServer, data: &Path) -> Result<TomlConfig> {
    let config = TomlConfig::from_toml_str(&format!(
        r#"
[data]
training_data = "{}"

[tracking]
uri = "{}"
token = "test-token"
"#,
        data.display().to_string().replace('\\', "/"),
        server.base_url()
    ))?;
    Ok(config)
}

#[tokio::test]
async fn test_run_against_mlflow_server() -> Result<()> {
    let data = TempDir::new()?;
    write_csv(data.path())?;
    let server = MockServer::start();

    let experiment_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/2.0/mlflow/experiments/get-by-name")
            .query_param("experiment_name", "train-diabetes-classification")
            .header("Authorization", "Bearer test-token");
        then.status(200).json_body(serde_json::json!({
            "experiment": {"experiment_id": "11", "name": "train-diabetes-classification"}
        }));
    });
    let run_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/2.0/mlflow/runs/create")
            .json_body_partial(r#"{"experiment_id": "11"}"#);
        then.status(200).json_body(serde_json::json!({
            "run": {"info": {
                "run_id": "feedface",
                "experiment_id": "11",
                "artifact_uri": "mlflow-artifacts:/11/feedface/artifacts",
                "start_time": 1
            }}
        }));
    });
    let reg_rate_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/2.0/mlflow/runs/log-parameter")
            .json_body_partial(r#"{"key": "reg_rate", "value": "0.01"}"#);
        then.status(200).json_body(serde_json::json!({}));
    });
    let param_mock = server.mock(|when, then| {
        when.method(POST).path("/api/2.0/mlflow/runs/log-parameter");
        then.status(200).json_body(serde_json::json!({}));
    });
    let accuracy_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/2.0/mlflow/runs/log-metric")
            .json_body_partial(r#"{"run_id": "feedface", "key": "accuracy"}"#);
        then.status(200).json_body(serde_json::json!({}));
    });
    let auc_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/2.0/mlflow/runs/log-metric")
            .json_body_partial(r#"{"run_id": "feedface", "key": "auc"}"#);
        then.status(200).json_body(serde_json::json!({}));
    });
    let metric_mock = server.mock(|when, then| {
        when.method(POST).path("/api/2.0/mlflow/runs/log-metric");
        then.status(200).json_body(serde_json::json!({}));
    });
    let artifact_mock = server.mock(|when, then| {
        when.method(PUT).path(
            "/api/2.0/mlflow-artifacts/artifacts/11/feedface/artifacts/model_feedface/model.json",
        );
        then.status(200).json_body(serde_json::json!({}));
    });
    let finish_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/2.0/mlflow/runs/update")
            .json_body_partial(r#"{"run_id": "feedface", "status": "FINISHED"}"#);
        then.status(200).json_body(serde_json::json!({}));
    });

    let config = config_for(&server, data.path())?;
    let tracker = tracker_from_config(&config)?;
    let summary = TrainingEngine::new(config, tracker).run().await?;

    experiment_mock.assert();
    run_mock.assert();
    reg_rate_mock.assert();
    accuracy_mock.assert();
    auc_mock.assert();
    artifact_mock.assert();
    finish_mock.assert();
    assert!(param_mock.hits() > 0);
    assert!(metric_mock.hits() > 0);

    assert_eq!(summary.run_id, "feedface");
    assert_eq!(summary.model_artifact, "model_feedface/model.json");
    Ok(())
}

#[tokio::test]
async fn test_artifact_failure_marks_run_failed() -> Result<()> {
    let data = TempDir::new()?;
    write_csv(data.path())?;
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/api/2.0/mlflow/experiments/get-by-name");
        then.status(200)
            .json_body(serde_json::json!({"experiment": {"experiment_id": "1"}}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/2.0/mlflow/runs/create");
        then.status(200).json_body(serde_json::json!({
            "run": {"info": {"run_id": "r9", "experiment_id": "1"}}
        }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/2.0/mlflow/runs/log-parameter");
        then.status(200).json_body(serde_json::json!({}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/2.0/mlflow/runs/log-metric");
        then.status(200).json_body(serde_json::json!({}));
    });
    server.mock(|when, then| {
        when.method(PUT).path_contains("/api/2.0/mlflow-artifacts/artifacts/");
        then.status(503).body("artifact store unavailable");
    });
    let failed_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/2.0/mlflow/runs/update")
            .json_body_partial(r#"{"run_id": "r9", "status": "FAILED"}"#);
        then.status(200).json_body(serde_json::json!({}));
    });

    let config = config_for(&server, data.path())?;
    let tracker = tracker_from_config(&config)?;
    let err = TrainingEngine::new(config, tracker)
        .run()
        .await
        .expect_err("artifact upload should fail");

    failed_mock.assert();
    assert!(matches!(err, TrainError::TrackingError { status: 503, .. }));
    assert_eq!(err.exit_code(), 2);
    Ok(())
}
