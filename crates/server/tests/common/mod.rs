//! Common test utilities: an in-process server with the mock cloner
//! injected, driven through the router without binding a socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use storyforge_core::{
    matcher::HashEmbedder,
    testing::{write_dialogue_json, write_script_json, write_test_wav, MockCloner},
    Config, GpuGate, JsonTaskStore, Pipeline, Scheduler, SchedulerConfig, TaskRegistry,
};

use storyforge_server::{create_router, AppState};

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// In-process server fixture with controllable mocks.
pub struct TestFixture {
    pub router: Router,
    pub registry: Arc<TaskRegistry>,
    pub cloner: Arc<MockCloner>,
    pub temp_dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_scheduler(SchedulerConfig {
            workers: 2,
            queue_capacity: 8,
            gpu_permits: 1,
        })
    }

    pub fn with_scheduler(scheduler_config: SchedulerConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_root = temp_dir.path().join("data");

        let mut config = Config::default();
        config.storage.data_root = data_root.clone();
        config.scheduler = scheduler_config.clone();

        let store = Arc::new(JsonTaskStore::new(&data_root));
        let registry = Arc::new(
            TaskRegistry::open(store, config.storage.tasks_root()).expect("open registry"),
        );

        let cloner = Arc::new(MockCloner::new());
        let pipeline = Arc::new(Pipeline::new(
            Arc::clone(&registry),
            Arc::new(GpuGate::new(scheduler_config.gpu_permits)),
            cloner.clone(),
            Arc::new(HashEmbedder::default()),
            config.pipeline.clone(),
            config.matcher.clone(),
        ));
        let scheduler = Scheduler::start(scheduler_config, pipeline);

        let state = Arc::new(AppState::new(config, Arc::clone(&registry), scheduler));
        let router = create_router(state);

        Self {
            router,
            registry,
            cloner,
            temp_dir,
        }
    }

    /// Write a complete, valid set of input files and return the request
    /// body pointing at them.
    pub fn valid_generate_body(&self) -> Value {
        let root = self.temp_dir.path();
        let path = |name: &str| root.join(name).display().to_string();

        write_test_wav(&root.join("speaker.wav"), 800);
        write_test_wav(&root.join("source.wav"), 5000);
        write_test_wav(&root.join("bgm.wav"), 1000);
        write_test_wav(&root.join("emotions/calm.wav"), 300);
        write_dialogue_json(
            &root.join("dialogue.json"),
            &[json!({
                "sort": 1,
                "text": "hello",
                "emo_audio": "calm.wav",
                "role": "narrator",
                "vocal_mode": "modal_warm",
                "energy_level": 2.0,
                "pitch_curve": "stable"
            })],
        );
        write_script_json(
            &root.join("script.json"),
            &[json!({
                "expected_text": "hello",
                "expected_duration_ms": 800,
                "expected_role": "narrator",
                "start_ms": 0,
                "vocal_mode": "modal_warm",
                "energy_level": 2.0,
                "pitch_curve": "stable"
            })],
        );

        json!({
            "speaker_wav": path("speaker.wav"),
            "dialogue_json": path("dialogue.json"),
            "emotion_dir": root.join("emotions").display().to_string(),
            "source_audio": path("source.wav"),
            "script_json": path("script.json"),
            "bgm": path("bgm.wav"),
            "name": "test story"
        })
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse { status, body }
    }

    /// Poll until a task reaches a terminal status.
    pub async fn wait_terminal(&self, task_id: &str) -> String {
        for _ in 0..300 {
            let response = self.get(&format!("/api/task/{}", task_id)).await;
            let status = response.body["status"].as_str().unwrap_or("").to_string();
            if status == "completed" || status == "failed" {
                return status;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("task {} did not reach a terminal state", task_id);
    }
}
