//! Scheduler integration tests: queue admission, worker dispatch and
//! GPU serialization across concurrent tasks.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use tokio::time::{sleep, timeout};

use storyforge_core::{
    matcher::HashEmbedder,
    pipeline::Pipeline,
    scheduler::{GpuGate, Scheduler, SchedulerConfig, SchedulerError},
    task::{JsonTaskStore, TaskInputs, TaskRegistry, TaskStatus},
    testing::{write_dialogue_json, write_script_json, write_test_wav, MockCloner},
    MatcherConfig, PipelineConfig,
};

struct TestHarness {
    registry: Arc<TaskRegistry>,
    scheduler: Scheduler,
    cloner: Arc<MockCloner>,
    inputs: TaskInputs,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new(config: SchedulerConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_root = temp_dir.path().join("data");

        let speaker_wav = temp_dir.path().join("speaker.wav");
        write_test_wav(&speaker_wav, 600);
        let source_audio = temp_dir.path().join("source.wav");
        write_test_wav(&source_audio, 5000);
        let bgm = temp_dir.path().join("bgm.wav");
        write_test_wav(&bgm, 1000);
        let emotion_dir = temp_dir.path().join("emotions");
        write_test_wav(&emotion_dir.join("calm.wav"), 300);

        let inputs = TaskInputs {
            speaker_wav,
            dialogue_json: temp_dir.path().join("dialogue.json"),
            emotion_dir,
            source_audio,
            script_json: temp_dir.path().join("script.json"),
            bgm,
        };

        write_dialogue_json(
            &inputs.dialogue_json,
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
            &inputs.script_json,
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

        let store = Arc::new(JsonTaskStore::new(&data_root));
        let registry =
            Arc::new(TaskRegistry::open(store, data_root.join("tasks")).expect("open registry"));
        let cloner = Arc::new(MockCloner::new());
        let gate = Arc::new(GpuGate::new(config.gpu_permits));
        let pipeline = Arc::new(Pipeline::new(
            Arc::clone(&registry),
            gate,
            cloner.clone(),
            Arc::new(HashEmbedder::default()),
            PipelineConfig::default(),
            MatcherConfig::default(),
        ));
        let scheduler = Scheduler::start(config, pipeline);

        Self {
            registry,
            scheduler,
            cloner,
            inputs,
            _temp_dir: temp_dir,
        }
    }

    fn create_task(&self) -> String {
        self.registry
            .create(self.inputs.clone(), None)
            .expect("create task")
            .task_id
    }

    async fn wait_terminal(&self, task_id: &str) -> TaskStatus {
        timeout(Duration::from_secs(30), async {
            loop {
                let task = self.registry.get(task_id).expect("task exists");
                if task.status.is_terminal() {
                    return task.status;
                }
                sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("task did not reach a terminal state")
    }
}

#[tokio::test]
async fn test_submitted_task_runs_to_completion() {
    let harness = TestHarness::new(SchedulerConfig::default());
    let task_id = harness.create_task();

    harness.scheduler.submit(task_id.clone()).unwrap();
    let status = harness.wait_terminal(&task_id).await;
    assert_eq!(status, TaskStatus::Completed);
}

#[tokio::test]
async fn test_queue_saturation_rejects_submissions() {
    // One busy worker and a one-slot queue.
    let harness = TestHarness::new(SchedulerConfig {
        workers: 1,
        queue_capacity: 1,
        gpu_permits: 1,
    });
    harness.cloner.set_delay(Duration::from_millis(800));

    let first = harness.create_task();
    harness.scheduler.submit(first.clone()).unwrap();
    // Let the worker pull the first task off the queue.
    sleep(Duration::from_millis(150)).await;

    let second = harness.create_task();
    harness.scheduler.submit(second.clone()).unwrap();

    let third = harness.create_task();
    let err = harness.scheduler.submit(third).unwrap_err();
    assert!(matches!(err, SchedulerError::QueueFull { capacity: 1 }));

    // The accepted tasks still finish.
    assert_eq!(harness.wait_terminal(&first).await, TaskStatus::Completed);
    assert_eq!(harness.wait_terminal(&second).await, TaskStatus::Completed);
}

#[tokio::test]
async fn test_gpu_bound_step_is_serialized_across_tasks() {
    let harness = TestHarness::new(SchedulerConfig {
        workers: 3,
        queue_capacity: 8,
        gpu_permits: 1,
    });
    harness.cloner.set_delay(Duration::from_millis(150));

    // Three tasks submitted back to back.
    let ids: Vec<String> = (0..3).map(|_| harness.create_task()).collect();
    for id in &ids {
        harness.scheduler.submit(id.clone()).unwrap();
    }

    for id in &ids {
        assert_eq!(harness.wait_terminal(id).await, TaskStatus::Completed);
    }

    // With one permit, clone invocations never overlap even though three
    // workers were live.
    assert_eq!(harness.cloner.max_concurrency(), 1);
}

#[tokio::test]
async fn test_worker_marks_task_processing_while_running() {
    let harness = TestHarness::new(SchedulerConfig::default());
    harness.cloner.set_delay(Duration::from_millis(400));

    let task_id = harness.create_task();
    harness.scheduler.submit(task_id.clone()).unwrap();

    // Sample the state mid-flight.
    sleep(Duration::from_millis(200)).await;
    let task = harness.registry.get(&task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Processing);
    assert!(task.current_step >= 1);

    assert_eq!(harness.wait_terminal(&task_id).await, TaskStatus::Completed);
}
