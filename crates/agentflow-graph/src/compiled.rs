use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use uuid::Uuid;

use agentflow_checkpoint::prelude::{
    Checkpoint, CheckpointConfigExt, CheckpointMetadata, CheckpointSource, CheckpointStore,
    GraphOutput, PendingTask, PendingWrite, config_keys,
};
use agentflow_core::config::RunnableConfig;
use agentflow_core::error::{FlowError, GraphError, Result};
use agentflow_core::runnable::Runnable;

use crate::channel::{ChannelSpec, Channels};
use crate::constants::{END, START};
use crate::edge::{ConditionalEdge, SendEdge};
use crate::node::NodeFn;

/// A committed task, reported to observers after its super-step commits.
#[derive(Debug, Clone)]
pub struct StepInfo {
    /// Super-step number, counted from the start of the thread.
    pub step: usize,
    pub node: String,
    pub task_id: String,
    /// The partial update the task returned.
    pub update: Value,
    /// State right after this task's update was merged.
    pub state_after: Value,
}

type Observer<'a> = &'a (dyn Fn(&StepInfo) + Send + Sync);

/// A compiled state graph ready for execution.
///
/// Created by `StateGraph::compile()`. Runs as a sequence of super-steps:
/// every task of a step runs concurrently against the same state snapshot,
/// and their updates are merged one at a time in completion order.
pub struct CompiledStateGraph {
    pub(crate) nodes: HashMap<String, NodeFn>,
    pub(crate) edges: HashMap<String, Vec<String>>,
    pub(crate) conditional_edges: HashMap<String, Vec<ConditionalEdge>>,
    pub(crate) send_edges: HashMap<String, Vec<SendEdge>>,
    pub(crate) channel_specs: HashMap<String, ChannelSpec>,
}

/// Where a run picks up: fresh input or a restored checkpoint.
struct RunState {
    channels: Channels,
    tasks: Vec<PendingTask>,
    step: usize,
    /// Writes of first-step tasks that already completed before an interrupt.
    reused: Vec<PendingWrite>,
    /// The interrupted task and the answers its `interrupt` calls return.
    resume: Option<(String, Vec<Value>)>,
}

enum StepOutcome {
    Completed(Vec<PendingWrite>),
    Interrupted {
        writes: Vec<PendingWrite>,
        task_id: String,
        payload: Value,
        resume_values: Vec<Value>,
    },
}

struct Suspended {
    step: usize,
    channel_values: HashMap<String, Value>,
    tasks: Vec<PendingTask>,
    writes: Vec<PendingWrite>,
    task_id: String,
    payload: Value,
    resume_values: Vec<Value>,
    state: Value,
}

enum RunOutcome {
    Complete(Value),
    Interrupted(Suspended),
}

impl CompiledStateGraph {
    /// Get the names of all nodes in the graph.
    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.keys().map(|s| s.as_str()).collect()
    }

    /// Static edge targets of a node (or `START`).
    pub fn edges_from(&self, node: &str) -> &[String] {
        self.edges.get(node).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn node(&self, name: &str) -> Option<&NodeFn> {
        self.nodes.get(name)
    }

    /// Check if a channel is declared.
    pub fn has_channel(&self, name: &str) -> bool {
        self.channel_specs.contains_key(name)
    }

    /// Run to completion, calling `observer` for every committed task.
    ///
    /// A node interrupt fails the run with `GraphError::Interrupted`; use
    /// [`invoke_resumable`](Self::invoke_resumable) to suspend instead.
    pub async fn invoke_with_observer<F>(
        &self,
        input: Value,
        config: &RunnableConfig,
        observer: F,
    ) -> Result<Value>
    where
        F: Fn(&StepInfo) + Send + Sync,
    {
        match self.execute(self.start(input)?, config, &observer).await? {
            RunOutcome::Complete(state) => Ok(state),
            RunOutcome::Interrupted(suspended) => {
                Err(GraphError::Interrupted(suspended.payload).into())
            }
        }
    }

    /// Run with checkpoint support.
    ///
    /// Uses `config.thread_id()` or generates one. A node interrupt writes a
    /// checkpoint and returns `GraphOutput::Interrupted`. Starting a fresh
    /// run on a thread discards any suspended run on it.
    pub async fn invoke_resumable(
        &self,
        input: Value,
        config: &RunnableConfig,
        store: &dyn CheckpointStore,
    ) -> Result<GraphOutput> {
        self.invoke_resumable_with_observer(input, config, store, |_| {})
            .await
    }

    pub async fn invoke_resumable_with_observer<F>(
        &self,
        input: Value,
        config: &RunnableConfig,
        store: &dyn CheckpointStore,
        observer: F,
    ) -> Result<GraphOutput>
    where
        F: Fn(&StepInfo) + Send + Sync,
    {
        let thread_id = config
            .thread_id()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let config = config.clone().with_thread_id(thread_id.as_str());

        let run = self.start(input)?;
        store.delete_thread(&thread_id).await?;
        let outcome = self.execute(run, &config, &observer).await?;
        self.finish(outcome, &thread_id, None, store).await
    }

    /// Continue a suspended run.
    ///
    /// Loads the checkpoint named by `config.checkpoint_id()`, or the latest
    /// one for `config.thread_id()`, and re-runs the interrupted task. Its
    /// earlier `interrupt` calls get the answers of previous resumes and the
    /// call that suspended it gets `resume_value`; a further call suspends
    /// the run again. The recorded updates of its siblings are reused. The checkpoint is consumed when the
    /// run completes or interrupts again; on error it stays in place.
    pub async fn resume(
        &self,
        config: &RunnableConfig,
        resume_value: Value,
        store: &dyn CheckpointStore,
    ) -> Result<GraphOutput> {
        self.resume_with_observer(config, resume_value, store, |_| {})
            .await
    }

    pub async fn resume_with_observer<F>(
        &self,
        config: &RunnableConfig,
        resume_value: Value,
        store: &dyn CheckpointStore,
        observer: F,
    ) -> Result<GraphOutput>
    where
        F: Fn(&StepInfo) + Send + Sync,
    {
        let thread_id = config.thread_id().ok_or_else(|| {
            GraphError::Checkpoint("a thread_id is required to resume".to_string())
        })?;

        let checkpoint = match config.checkpoint_id() {
            Some(id) => store.get(&thread_id, &id).await?,
            None => store.get_latest(&thread_id).await?,
        }
        .ok_or_else(|| GraphError::NoCheckpoint(thread_id.clone()))?;

        tracing::info!(
            thread_id = %thread_id,
            checkpoint_id = %checkpoint.id,
            step = checkpoint.step,
            "resuming run"
        );

        let mut answers = checkpoint.resume_values.clone();
        answers.push(resume_value);
        let run = RunState {
            channels: Channels::from_values(&self.channel_specs, &checkpoint.channel_values),
            tasks: checkpoint.pending_tasks.clone(),
            step: checkpoint.step,
            reused: checkpoint.pending_writes.clone(),
            resume: Some((checkpoint.interrupted_task.clone(), answers)),
        };
        let config = config
            .clone()
            .with_thread_id(thread_id.as_str())
            .without_configurable(config_keys::CHECKPOINT_ID);

        let outcome = self.execute(run, &config, &observer).await?;
        let output = self
            .finish(outcome, &thread_id, Some(&checkpoint.id), store)
            .await?;
        store.delete(&thread_id, &checkpoint.id).await?;
        Ok(output)
    }

    fn start(&self, input: Value) -> Result<RunState> {
        let mut channels = Channels::new(&self.channel_specs);
        match &input {
            Value::Object(map) => channels.apply(map),
            Value::Null => {}
            other => {
                return Err(GraphError::InvalidUpdate {
                    node: START.to_string(),
                    reason: format!("graph input must be a JSON object, got {other}"),
                }
                .into());
            }
        }
        let tasks = self.next_tasks([START], &channels.state())?;
        Ok(RunState {
            channels,
            tasks,
            step: 0,
            reused: Vec::new(),
            resume: None,
        })
    }

    /// The super-step loop.
    async fn execute(
        &self,
        mut run: RunState,
        config: &RunnableConfig,
        observer: Observer<'_>,
    ) -> Result<RunOutcome> {
        let base_config = config.clone().without_resume_values();
        let mut supersteps = 0usize;

        while !run.tasks.is_empty() {
            if supersteps >= config.recursion_limit {
                return Err(GraphError::MaxIterationsExceeded {
                    limit: config.recursion_limit,
                }
                .into());
            }

            tracing::debug!(step = run.step, tasks = run.tasks.len(), "starting super-step");
            let state = run.channels.state();
            let outcome = self
                .run_superstep(
                    &run.tasks,
                    std::mem::take(&mut run.reused),
                    run.resume.take(),
                    &state,
                    &base_config,
                )
                .await?;

            let writes = match outcome {
                StepOutcome::Completed(writes) => writes,
                StepOutcome::Interrupted {
                    writes,
                    task_id,
                    payload,
                    resume_values,
                } => {
                    return Ok(RunOutcome::Interrupted(Suspended {
                        step: run.step,
                        channel_values: run.channels.values(),
                        tasks: run.tasks,
                        writes,
                        task_id,
                        payload,
                        resume_values,
                        state,
                    }));
                }
            };

            let snapshot = run.channels.values();
            match self.commit(&mut run.channels, &writes, run.step) {
                Ok((next, infos)) => {
                    for info in &infos {
                        observer(info);
                    }
                    run.tasks = next;
                }
                Err(err) => {
                    run.channels = Channels::from_values(&self.channel_specs, &snapshot);
                    return Err(err);
                }
            }

            run.step += 1;
            supersteps += 1;
        }

        Ok(RunOutcome::Complete(run.channels.state()))
    }

    /// Run every task of a super-step concurrently and collect their updates
    /// in completion order. Tasks with a reused write are not run again.
    async fn run_superstep(
        &self,
        tasks: &[PendingTask],
        reused: Vec<PendingWrite>,
        resume: Option<(String, Vec<Value>)>,
        state: &Value,
        config: &RunnableConfig,
    ) -> Result<StepOutcome> {
        let done: HashSet<String> = reused.iter().map(|w| w.task_id.clone()).collect();
        let mut writes = reused;
        let answers_for = |task_id: &str| match &resume {
            Some((id, answers)) if id == task_id => answers.clone(),
            _ => Vec::new(),
        };

        let mut running: FuturesUnordered<_> = tasks
            .iter()
            .filter(|task| !done.contains(&task.id))
            .map(|task| {
                // `interrupt` calls are counted per task.
                let task_config = config.clone().with_resume_values(answers_for(&task.id));
                self.run_task(task, state, task_config)
            })
            .collect();

        let mut interrupt: Option<(String, Value, Vec<Value>)> = None;
        while let Some((task, result)) = running.next().await {
            match result {
                Ok(update) => {
                    self.check_update(task, &update, state)?;
                    writes.push(PendingWrite {
                        task_id: task.id.clone(),
                        node: task.node.clone(),
                        update,
                    });
                }
                Err(FlowError::Graph(GraphError::Interrupted(payload))) => {
                    tracing::debug!(node = %task.node, task_id = %task.id, "task interrupted");
                    // A second interrupting sibling stays pending and runs again on resume.
                    if interrupt.is_none() {
                        interrupt = Some((task.id.clone(), payload, answers_for(&task.id)));
                    }
                }
                Err(err) => return Err(run_error(&task.node, state, err)),
            }
        }

        Ok(match interrupt {
            Some((task_id, payload, resume_values)) => StepOutcome::Interrupted {
                writes,
                task_id,
                payload,
                resume_values,
            },
            None => StepOutcome::Completed(writes),
        })
    }

    async fn run_task<'a>(
        &'a self,
        task: &'a PendingTask,
        state: &Value,
        config: RunnableConfig,
    ) -> (&'a PendingTask, Result<Value>) {
        let input = task_input(state, task.input.as_ref());
        let result = match self.nodes.get(&task.node) {
            Some(node) => {
                tracing::debug!(node = %task.node, task_id = %task.id, "running task");
                node.invoke(input, &config).await
            }
            None => Err(GraphError::InvalidGraph(format!(
                "Node '{}' not found during execution",
                task.node
            ))
            .into()),
        };
        (task, result)
    }

    /// Updates must be objects (or null) that only touch declared outputs.
    fn check_update(&self, task: &PendingTask, update: &Value, state: &Value) -> Result<()> {
        let invalid = |reason: String| {
            run_error(
                &task.node,
                state,
                GraphError::InvalidUpdate {
                    node: task.node.clone(),
                    reason,
                }
                .into(),
            )
        };

        match update {
            Value::Null => Ok(()),
            Value::Object(map) => {
                let Some(node) = self.nodes.get(&task.node) else {
                    return Ok(());
                };
                match map.keys().find(|field| !node.writes(field)) {
                    Some(field) => Err(invalid(format!(
                        "field '{field}' is not a declared output"
                    ))),
                    None => Ok(()),
                }
            }
            other => Err(invalid(format!(
                "expected an object or null, got {other}"
            ))),
        }
    }

    /// Merge writes in order, then resolve the next super-step's tasks.
    fn commit(
        &self,
        channels: &mut Channels,
        writes: &[PendingWrite],
        step: usize,
    ) -> Result<(Vec<PendingTask>, Vec<StepInfo>)> {
        let mut infos = Vec::with_capacity(writes.len());
        for write in writes {
            if let Value::Object(map) = &write.update {
                channels.apply(map);
            }
            infos.push(StepInfo {
                step,
                node: write.node.clone(),
                task_id: write.task_id.clone(),
                update: write.update.clone(),
                state_after: channels.state(),
            });
        }

        let state = channels.state();
        let next = self.next_tasks(writes.iter().map(|w| w.node.as_str()), &state)?;
        Ok((next, infos))
    }

    /// Resolve the outgoing edges of each completed source. Plain node
    /// targets are deduplicated; every send directive becomes its own task.
    fn next_tasks<'a>(
        &self,
        sources: impl IntoIterator<Item = &'a str>,
        state: &Value,
    ) -> Result<Vec<PendingTask>> {
        let mut next = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut push_node = |target: &str, next: &mut Vec<PendingTask>| {
            if target != END && seen.insert(target.to_string()) {
                next.push(PendingTask {
                    id: Uuid::new_v4().to_string(),
                    node: target.to_string(),
                    input: None,
                });
            }
        };

        for source in sources {
            for target in self.edges_from(source) {
                push_node(target, &mut next);
            }
            for edge in self.conditional_edges.get(source).into_iter().flatten() {
                for target in edge.resolve(state)? {
                    push_node(&target, &mut next);
                }
            }
            for edge in self.send_edges.get(source).into_iter().flatten() {
                for send in edge.resolve(state)? {
                    next.push(PendingTask {
                        id: Uuid::new_v4().to_string(),
                        node: send.node,
                        input: Some(send.input),
                    });
                }
            }
        }
        Ok(next)
    }

    async fn finish(
        &self,
        outcome: RunOutcome,
        thread_id: &str,
        parent_id: Option<&str>,
        store: &dyn CheckpointStore,
    ) -> Result<GraphOutput> {
        let suspended = match outcome {
            RunOutcome::Complete(state) => {
                tracing::info!(thread_id, "run complete");
                return Ok(GraphOutput::Complete(state));
            }
            RunOutcome::Interrupted(suspended) => suspended,
        };

        let node_name = suspended
            .tasks
            .iter()
            .find(|t| t.id == suspended.task_id)
            .map(|t| t.node.clone());
        let checkpoint = Checkpoint {
            id: Uuid::new_v4().to_string(),
            thread_id: thread_id.to_string(),
            parent_id: parent_id.map(String::from),
            step: suspended.step,
            channel_values: suspended.channel_values,
            pending_tasks: suspended.tasks,
            pending_writes: suspended.writes,
            interrupted_task: suspended.task_id,
            resume_values: suspended.resume_values,
            interrupt_value: suspended.payload.clone(),
            metadata: CheckpointMetadata {
                source: if parent_id.is_some() {
                    CheckpointSource::Resume
                } else {
                    CheckpointSource::Input
                },
                step: suspended.step,
                node_name: node_name.clone(),
            },
            created_at: Utc::now(),
        };
        let checkpoint_id = checkpoint.id.clone();
        store.put(checkpoint).await?;

        tracing::info!(
            thread_id,
            checkpoint_id = %checkpoint_id,
            node = node_name.as_deref().unwrap_or_default(),
            "run interrupted"
        );
        Ok(GraphOutput::Interrupted {
            checkpoint_id,
            interrupt_value: suspended.payload,
            state: suspended.state,
        })
    }
}

/// The state a task sees: the snapshot, overlaid with a send task's private
/// object input. A non-object private input is passed as-is.
fn task_input(state: &Value, input: Option<&Value>) -> Value {
    match (state, input) {
        (_, None) => state.clone(),
        (Value::Object(base), Some(Value::Object(private))) => {
            let mut merged = base.clone();
            merged.extend(private.clone());
            Value::Object(merged)
        }
        (_, Some(other)) => other.clone(),
    }
}

fn run_error(node: &str, state: &Value, source: FlowError) -> FlowError {
    GraphError::Run {
        node: node.to_string(),
        state: state.clone(),
        source: Box::new(source),
    }
    .into()
}

#[async_trait]
impl Runnable for CompiledStateGraph {
    type Input = Value;
    type Output = Value;

    async fn invoke(&self, input: Self::Input, config: &RunnableConfig) -> Result<Self::Output> {
        self.invoke_with_observer(input, config, |_| {}).await
    }
}
