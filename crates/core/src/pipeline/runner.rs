//! Pipeline runner: drives one task through all four steps.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::cloner::TtsCloner;
use crate::matcher::{EmbeddingProvider, MatcherConfig};
use crate::metrics;
use crate::scheduler::GpuGate;
use crate::steps::{AlignStep, CloneStep, SequenceStep, TrimStep};
use crate::task::{step_name, StepStatus, TaskError, TaskRegistry, TaskStatus, TOTAL_STEPS};

use super::config::PipelineConfig;
use super::context::StepContext;
use super::{Step, StepError};

/// Executes tasks step by step, updating the registry at every boundary.
pub struct Pipeline {
    registry: Arc<TaskRegistry>,
    gate: Arc<GpuGate>,
    steps: Vec<Box<dyn Step>>,
}

impl Pipeline {
    pub fn new(
        registry: Arc<TaskRegistry>,
        gate: Arc<GpuGate>,
        cloner: Arc<dyn TtsCloner>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: PipelineConfig,
        matcher: MatcherConfig,
    ) -> Self {
        let steps: Vec<Box<dyn Step>> = vec![
            Box::new(CloneStep::new(cloner, config.clone())),
            Box::new(TrimStep::new(config.clone())),
            Box::new(SequenceStep::new(matcher, embedder, config.clone())),
            Box::new(AlignStep::new(config)),
        ];
        Self {
            registry,
            gate,
            steps,
        }
    }

    /// Run a task to its terminal state.
    ///
    /// The calling worker owns the task exclusively; all observable state
    /// changes go through the registry and are flushed before the next
    /// step starts.
    pub async fn run(&self, task_id: &str) -> Result<(), TaskError> {
        let task = self.registry.get(task_id)?;
        let task_dir = self.registry.task_dir(task_id);
        let ctx = StepContext::new(task_dir.clone(), task.inputs.clone());

        info!(task_id, "pipeline starting");
        self.registry.update(task_id, |t| {
            t.status = TaskStatus::Processing;
            t.started_at = Some(Utc::now());
        })?;

        // The scratch area is created up front and kept on failure so
        // partial outputs remain inspectable.
        if let Err(e) = std::fs::create_dir_all(&task_dir) {
            let reason = format!("create task directory: {}", e);
            self.fail_task(task_id, 1, &reason)?;
            return Ok(());
        }

        for step in &self.steps {
            let number = step.number();
            self.registry.update(task_id, |t| {
                t.current_step = number;
                t.progress_message =
                    format!("Step {}/{}: {}", number, TOTAL_STEPS, step.name());
                let record = t.step_mut(number);
                record.status = StepStatus::Running;
                record.started_at = Some(Utc::now());
            })?;

            // Serialize GPU-bound work across tasks.
            let permit = if step.needs_gpu() {
                let waited = Instant::now();
                let permit = self.gate.acquire().await;
                metrics::GPU_GATE_WAIT_SECONDS.observe(waited.elapsed().as_secs_f64());
                Some(permit)
            } else {
                None
            };

            let started = Instant::now();
            let outcome = match timeout(step.timeout(), step.run(&ctx)).await {
                Ok(result) => result,
                Err(_) => Err(StepError::Timeout {
                    timeout_secs: step.timeout().as_secs(),
                }),
            };
            drop(permit);

            metrics::STEP_DURATION_SECONDS
                .with_label_values(&[step.name()])
                .observe(started.elapsed().as_secs_f64());

            match outcome {
                Ok(result) => {
                    info!(task_id, step = step.name(), "step completed");
                    self.registry.update(task_id, |t| {
                        let record = t.step_mut(number);
                        record.status = StepStatus::Completed;
                        record.result = Some(result);
                        record.finished_at = Some(Utc::now());
                    })?;
                }
                Err(e) => {
                    warn!(task_id, step = step.name(), error = %e, "step failed");
                    self.registry.update(task_id, |t| {
                        let record = t.step_mut(number);
                        record.status = StepStatus::Failed;
                        record.error = Some(e.to_string());
                        record.finished_at = Some(Utc::now());
                    })?;
                    self.fail_task(task_id, number, &e.to_string())?;
                    return Ok(());
                }
            }
        }

        let output_path = ctx.output_path();
        self.registry.update(task_id, |t| {
            t.status = TaskStatus::Completed;
            t.output_path = Some(output_path.clone());
            t.progress_message = "Completed: all steps finished".to_string();
            t.finished_at = Some(Utc::now());
        })?;
        metrics::TASKS_COMPLETED.inc();
        info!(task_id, "pipeline completed");
        Ok(())
    }

    fn fail_task(&self, task_id: &str, step_number: u32, reason: &str) -> Result<(), TaskError> {
        error!(task_id, step_number, reason, "task failed");
        metrics::TASKS_FAILED.inc();
        self.registry.update(task_id, |t| {
            t.status = TaskStatus::Failed;
            t.error = Some(format!(
                "{} failed: {}",
                step_name(step_number),
                reason
            ));
            t.progress_message = format!("Failed at step {}/{}", step_number, TOTAL_STEPS);
            t.finished_at = Some(Utc::now());
        })?;
        Ok(())
    }
}
