use std::sync::Arc;

use serde_json::json;
use shared_logging::{LogLevel, Telemetry};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::{
    collaborators::{AccessControl, ModelGroupManager, ModelMetaStore},
    error::RegistrationError,
    loopback::{
        InMemoryAccessControl, InMemoryModelGroupManager, InMemoryModelMetaStore,
        ModelGroupDirectory,
    },
    response::{RegisterModelMetaResponse, TaskResponse, TaskState, TaskType},
    state::{Phase, Registration},
    task::RegistrationTask,
};

/// Outcome of one registration run.
pub type RegistrationResult = Result<RegisterModelMetaResponse, RegistrationError>;

/// Builder used to configure a [`RegistrationOrchestrator`].
pub struct RegistrationOrchestratorBuilder {
    access: Arc<dyn AccessControl>,
    groups: Arc<dyn ModelGroupManager>,
    store: Arc<dyn ModelMetaStore>,
    telemetry: Option<Telemetry>,
}

impl Default for RegistrationOrchestratorBuilder {
    fn default() -> Self {
        let directory = ModelGroupDirectory::new();
        Self {
            access: Arc::new(InMemoryAccessControl::new(directory.clone()).enabled(false)),
            groups: Arc::new(InMemoryModelGroupManager::new(directory.clone())),
            store: Arc::new(InMemoryModelMetaStore::new(directory)),
            telemetry: None,
        }
    }
}

impl RegistrationOrchestratorBuilder {
    /// Overrides access control.
    #[must_use]
    pub fn access_control(mut self, access: Arc<dyn AccessControl>) -> Self {
        self.access = access;
        self
    }

    /// Overrides the group manager.
    #[must_use]
    pub fn group_manager(mut self, groups: Arc<dyn ModelGroupManager>) -> Self {
        self.groups = groups;
        self
    }

    /// Overrides the metadata store.
    #[must_use]
    pub fn meta_store(mut self, store: Arc<dyn ModelMetaStore>) -> Self {
        self.store = store;
        self
    }

    /// Attaches telemetry sinks.
    #[must_use]
    pub fn telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Finalizes the builder returning a [`RegistrationOrchestrator`].
    #[must_use]
    pub fn build(self) -> RegistrationOrchestrator {
        RegistrationOrchestrator {
            access: self.access,
            groups: self.groups,
            store: self.store,
            telemetry: self.telemetry,
        }
    }
}

/// Drives registrations through access check, optional group creation and metadata storage.
///
/// Runs share nothing but the collaborators; every run owns its task.
#[derive(Clone)]
pub struct RegistrationOrchestrator {
    access: Arc<dyn AccessControl>,
    groups: Arc<dyn ModelGroupManager>,
    store: Arc<dyn ModelMetaStore>,
    telemetry: Option<Telemetry>,
}

impl RegistrationOrchestrator {
    /// Creates a builder backed by in-memory collaborators.
    #[must_use]
    pub fn builder() -> RegistrationOrchestratorBuilder {
        RegistrationOrchestratorBuilder::default()
    }

    /// Runs one registration to completion.
    pub async fn register_model(&self, task: RegistrationTask) -> RegistrationResult {
        self.run(&Uuid::new_v4().to_string(), task).await
    }

    /// Starts a registration in the background.
    ///
    /// The returned handle resolves exactly once, with the run's result. Must be called
    /// within a tokio runtime context.
    #[must_use]
    pub fn submit(&self, task: RegistrationTask) -> RegistrationHandle {
        let task_id = Uuid::new_v4().to_string();
        self.log(
            LogLevel::Info,
            "registration.accepted",
            json!({ "task_id": task_id, "model_name": task.input.name }),
        );
        let (tx, rx) = oneshot::channel();
        let orchestrator = self.clone();
        let run_id = task_id.clone();
        tokio::spawn(async move {
            let result = orchestrator.run(&run_id, task).await;
            let _ = tx.send(result);
        });
        RegistrationHandle { task_id, rx }
    }

    async fn run(&self, run_id: &str, task: RegistrationTask) -> RegistrationResult {
        let mut state = Registration::start(task);
        loop {
            let from = state.phase();
            state = match state {
                Registration::AccessCheck(step) => {
                    let outcome = self
                        .access
                        .check_access(step.requester(), step.model_group_id())
                        .await;
                    step.complete(outcome)
                }
                Registration::GroupCreate(step) => {
                    let outcome = self.groups.create_group(step.request()).await;
                    step.complete(outcome)
                }
                Registration::MetadataRegister(step) => {
                    let outcome = self.store.register_meta(step.descriptor().clone()).await;
                    if let (Err(err), Some(group_id)) = (&outcome, step.created_group()) {
                        self.log(
                            LogLevel::Warn,
                            "registration.group.orphaned",
                            json!({
                                "run_id": run_id,
                                "group_id": group_id,
                                "error": format!("{err:#}"),
                            }),
                        );
                    }
                    step.complete(outcome)
                }
                Registration::Done(response) => {
                    self.finished(run_id, &response).await;
                    return Ok(response);
                }
                Registration::Failed(err) => {
                    self.failed(run_id, &err).await;
                    return Err(err);
                }
            };
            self.transition(run_id, from, state.phase()).await;
        }
    }

    async fn transition(&self, run_id: &str, from: Phase, to: Phase) {
        tracing::debug!(run_id, %from, %to, "registration transition");
        let payload = json!({ "run_id": run_id, "from": from, "to": to });
        self.log(LogLevel::Debug, "registration.transition", payload.clone());
        self.emit("registration.transition", payload).await;
    }

    async fn finished(&self, run_id: &str, response: &RegisterModelMetaResponse) {
        let payload = json!({
            "run_id": run_id,
            "model_id": response.model_id,
            "status": response.status,
        });
        self.log(LogLevel::Info, "registration.completed", payload.clone());
        self.emit("registration.completed", payload).await;
    }

    async fn failed(&self, run_id: &str, err: &RegistrationError) {
        let payload = json!({
            "run_id": run_id,
            "step": err.step(),
            "error": err.to_string(),
        });
        self.log(LogLevel::Error, "registration.failed", payload.clone());
        self.emit("registration.failed", payload).await;
    }

    fn log(&self, level: LogLevel, message: &str, metadata: serde_json::Value) {
        if let Some(tel) = &self.telemetry {
            let _ = tel.log(level, message, metadata);
        }
    }

    async fn emit(&self, event_type: &str, payload: serde_json::Value) {
        if let Some(tel) = &self.telemetry {
            let _ = tel.emit(event_type, payload).await;
        }
    }
}

/// Handle returned by [`RegistrationOrchestrator::submit`].
#[derive(Debug)]
pub struct RegistrationHandle {
    task_id: String,
    rx: oneshot::Receiver<RegistrationResult>,
}

impl RegistrationHandle {
    /// Id assigned to the background run.
    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Acknowledgement suitable for replying before the run finishes.
    #[must_use]
    pub fn ack(&self) -> TaskResponse {
        TaskResponse {
            task_id: self.task_id.clone(),
            task_type: Some(TaskType::RegisterModel),
            status: TaskState::Created,
        }
    }

    /// Awaits the final result.
    pub async fn outcome(self) -> RegistrationResult {
        self.rx.await.map_err(|_| RegistrationError::Dispatch)?
    }
}
