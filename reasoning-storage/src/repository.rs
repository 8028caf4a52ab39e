//! `ReasoningRepository` - the durable store for sessions, turns, tasks,
//! context entries, trace events, and clarifications.
//!
//! Grounded on `caliber-api::db::DbClient`'s shape (a `Pool` wrapped in a
//! `Clone`-able client, one method per entity operation) but without the
//! teacher's `caliber_*` pg_extern indirection - there is no equivalent
//! stored-procedure layer here, so operations issue parameterized SQL
//! directly against plain tables.
//!
//! Expected schema (DDL lives in the deployment's migration tooling, out of
//! scope for this crate): `reasoning_sessions`, `reasoning_turns`,
//! `reasoning_tasks`, `reasoning_context_entries`, `reasoning_trace_events`,
//! `reasoning_clarifications`, each with a `tenant_id` column indexed for
//! tenant isolation, plus a unique `(session_id, turn_no)` on turns.

use chrono::Utc;
use deadpool_postgres::Pool;
use reasoning_core::{
    ClarificationId, ClarificationKind, ClarificationStatus, ContextEntryId, ContextScope,
    EntityIdType, LlmProvider, ReasoningClarification, ReasoningContextEntry, ReasoningError,
    ReasoningResult, ReasoningSession, ReasoningTask, ReasoningTraceEvent, ReasoningTurn,
    SessionId, SessionStatus, StorageError, SystemRuntimeConfig, TaskId, TaskStatus, TaskType,
    TenantId, TenantLlmConfig, TenantRuntimeConfig, TraceEventId, TurnId, TurnStatus,
};
use serde_json::Value as JsonValue;
use std::str::FromStr;
use tokio_postgres::Row;
use uuid::Uuid;

/// A connection-pooled handle to the reasoning schema.
#[derive(Clone)]
pub struct ReasoningRepository {
    pool: Pool,
}

fn not_found(entity: &str, id: impl std::fmt::Display) -> ReasoningError {
    ReasoningError::Storage(StorageError::NotFound {
        entity: entity.to_string(),
        id: id.to_string(),
    })
}

fn db_err(op: &str, e: tokio_postgres::Error) -> ReasoningError {
    ReasoningError::Storage(StorageError::TransactionFailed {
        reason: format!("{op}: {e}"),
    })
}

fn pool_err(e: deadpool_postgres::PoolError) -> ReasoningError {
    ReasoningError::Storage(StorageError::TransactionFailed {
        reason: format!("failed to check out connection: {e}"),
    })
}

impl ReasoningRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    pub async fn create_session(
        &self,
        tenant_id: reasoning_core::TenantId,
        metadata: Option<JsonValue>,
    ) -> ReasoningResult<ReasoningSession> {
        let conn = self.pool.get().await.map_err(pool_err)?;
        let now = Utc::now();
        let session_id = SessionId::now_v7();
        conn.execute(
            "INSERT INTO reasoning_sessions \
             (session_id, tenant_id, status, created_at, updated_at, ended_at, metadata) \
             VALUES ($1, $2, $3, $4, $5, NULL, $6)",
            &[
                &session_id.as_uuid(),
                &tenant_id.as_uuid(),
                &SessionStatus::Created.to_string(),
                &now,
                &now,
                &metadata,
            ],
        )
        .await
        .map_err(|e| db_err("create_session", e))?;

        Ok(ReasoningSession {
            session_id,
            tenant_id,
            status: SessionStatus::Created,
            created_at: now,
            updated_at: now,
            ended_at: None,
            metadata,
        })
    }

    pub async fn get_session(
        &self,
        session_id: SessionId,
        tenant_id: reasoning_core::TenantId,
    ) -> ReasoningResult<Option<ReasoningSession>> {
        let conn = self.pool.get().await.map_err(pool_err)?;
        let row = conn
            .query_opt(
                "SELECT session_id, tenant_id, status, created_at, updated_at, ended_at, metadata \
                 FROM reasoning_sessions WHERE session_id = $1 AND tenant_id = $2",
                &[&session_id.as_uuid(), &tenant_id.as_uuid()],
            )
            .await
            .map_err(|e| db_err("get_session", e))?;

        row.map(session_from_row).transpose()
    }

    /// `status` transitions are one-way once terminal; callers are expected
    /// to have already checked [`SessionStatus::is_terminal`] before calling.
    pub async fn update_session_status(
        &self,
        session_id: SessionId,
        status: SessionStatus,
        ended_at: Option<reasoning_core::Timestamp>,
    ) -> ReasoningResult<()> {
        let conn = self.pool.get().await.map_err(pool_err)?;
        let updated = conn
            .execute(
                "UPDATE reasoning_sessions SET status = $1, updated_at = $2, ended_at = $3 \
                 WHERE session_id = $4",
                &[&status.to_string(), &Utc::now(), &ended_at, &session_id.as_uuid()],
            )
            .await
            .map_err(|e| db_err("update_session_status", e))?;

        if updated == 0 {
            return Err(not_found("session", session_id));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Turns
    // ------------------------------------------------------------------

    /// Opens the next turn for `session_id`: `turn_no` is
    /// `max(turn_no) + 1`, computed in the same statement to keep the
    /// "strictly increasing and contiguous" invariant under concurrent runs.
    pub async fn create_turn(
        &self,
        session_id: SessionId,
        user_input: &str,
    ) -> ReasoningResult<ReasoningTurn> {
        let mut conn = self.pool.get().await.map_err(pool_err)?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| db_err("create_turn/begin", e))?;

        let next_turn_no: i32 = tx
            .query_one(
                "SELECT COALESCE(MAX(turn_no), 0) + 1 FROM reasoning_turns WHERE session_id = $1",
                &[&session_id.as_uuid()],
            )
            .await
            .map_err(|e| db_err("create_turn/next_no", e))?
            .get(0);

        let turn_id = TurnId::now_v7();
        let now = Utc::now();
        tx.execute(
            "INSERT INTO reasoning_turns \
             (turn_id, session_id, turn_no, user_input, status, model_output, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, NULL, $6, $6)",
            &[
                &turn_id.as_uuid(),
                &session_id.as_uuid(),
                &next_turn_no,
                &user_input,
                &TurnStatus::Running.to_string(),
                &now,
            ],
        )
        .await
        .map_err(|e| db_err("create_turn/insert", e))?;

        tx.commit().await.map_err(|e| db_err("create_turn/commit", e))?;

        Ok(ReasoningTurn {
            turn_id,
            session_id,
            turn_no: next_turn_no,
            user_input: user_input.to_string(),
            status: TurnStatus::Running,
            model_output: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_latest_turn(
        &self,
        session_id: SessionId,
    ) -> ReasoningResult<Option<ReasoningTurn>> {
        let conn = self.pool.get().await.map_err(pool_err)?;
        let row = conn
            .query_opt(
                "SELECT turn_id, session_id, turn_no, user_input, status, model_output, created_at, updated_at \
                 FROM reasoning_turns WHERE session_id = $1 ORDER BY turn_no DESC LIMIT 1",
                &[&session_id.as_uuid()],
            )
            .await
            .map_err(|e| db_err("get_latest_turn", e))?;

        row.map(turn_from_row).transpose()
    }

    pub async fn complete_turn(
        &self,
        turn_id: TurnId,
        model_output: JsonValue,
    ) -> ReasoningResult<()> {
        self.set_turn_status(turn_id, TurnStatus::Completed, Some(model_output))
            .await
    }

    pub async fn fail_turn(&self, turn_id: TurnId) -> ReasoningResult<()> {
        self.set_turn_status(turn_id, TurnStatus::Failed, None).await
    }

    pub async fn set_turn_waiting(
        &self,
        turn_id: TurnId,
        status: TurnStatus,
    ) -> ReasoningResult<()> {
        self.set_turn_status(turn_id, status, None).await
    }

    async fn set_turn_status(
        &self,
        turn_id: TurnId,
        status: TurnStatus,
        model_output: Option<JsonValue>,
    ) -> ReasoningResult<()> {
        let conn = self.pool.get().await.map_err(pool_err)?;
        let updated = conn
            .execute(
                "UPDATE reasoning_turns SET status = $1, \
                 model_output = COALESCE($2, model_output), updated_at = $3 WHERE turn_id = $4",
                &[&status.to_string(), &model_output, &Utc::now(), &turn_id.as_uuid()],
            )
            .await
            .map_err(|e| db_err("set_turn_status", e))?;

        if updated == 0 {
            return Err(not_found("turn", turn_id));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    pub async fn create_task(
        &self,
        session_id: SessionId,
        turn_id: TurnId,
        task_type: TaskType,
        task_payload: JsonValue,
    ) -> ReasoningResult<ReasoningTask> {
        let conn = self.pool.get().await.map_err(pool_err)?;
        let task_id = TaskId::now_v7();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO reasoning_tasks \
             (task_id, session_id, turn_id, task_type, task_payload, status, retry_count, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $7)",
            &[
                &task_id.as_uuid(),
                &session_id.as_uuid(),
                &turn_id.as_uuid(),
                &task_type.to_string(),
                &task_payload,
                &TaskStatus::Pending.to_string(),
                &now,
            ],
        )
        .await
        .map_err(|e| db_err("create_task", e))?;

        Ok(ReasoningTask {
            task_id,
            session_id,
            turn_id,
            task_type,
            task_payload,
            status: TaskStatus::Pending,
            retry_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn mark_task_status(&self, task_id: TaskId, status: TaskStatus) -> ReasoningResult<()> {
        let conn = self.pool.get().await.map_err(pool_err)?;
        let updated = conn
            .execute(
                "UPDATE reasoning_tasks SET status = $1, updated_at = $2 WHERE task_id = $3",
                &[&status.to_string(), &Utc::now(), &task_id.as_uuid()],
            )
            .await
            .map_err(|e| db_err("mark_task_status", e))?;

        if updated == 0 {
            return Err(not_found("task", task_id));
        }
        Ok(())
    }

    pub async fn list_tasks_for_turn(&self, turn_id: TurnId) -> ReasoningResult<Vec<ReasoningTask>> {
        let conn = self.pool.get().await.map_err(pool_err)?;
        let rows = conn
            .query(
                "SELECT task_id, session_id, turn_id, task_type, task_payload, status, retry_count, created_at, updated_at \
                 FROM reasoning_tasks WHERE turn_id = $1 ORDER BY created_at ASC",
                &[&turn_id.as_uuid()],
            )
            .await
            .map_err(|e| db_err("list_tasks_for_turn", e))?;

        rows.into_iter().map(task_from_row).collect()
    }

    // ------------------------------------------------------------------
    // Context store (append-only, versioned per (session, scope, key))
    // ------------------------------------------------------------------

    pub async fn put_context(
        &self,
        session_id: SessionId,
        scope: ContextScope,
        key: &str,
        value: JsonValue,
    ) -> ReasoningResult<ReasoningContextEntry> {
        let mut conn = self.pool.get().await.map_err(pool_err)?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| db_err("put_context/begin", e))?;

        let next_version: i32 = tx
            .query_one(
                "SELECT COALESCE(MAX(version), 0) + 1 FROM reasoning_context_entries \
                 WHERE session_id = $1 AND scope = $2 AND key = $3",
                &[&session_id.as_uuid(), &scope.to_string(), &key],
            )
            .await
            .map_err(|e| db_err("put_context/next_version", e))?
            .get(0);

        let context_entry_id = ContextEntryId::now_v7();
        let now = Utc::now();
        tx.execute(
            "INSERT INTO reasoning_context_entries \
             (context_entry_id, session_id, scope, key, value, version, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
            &[
                &context_entry_id.as_uuid(),
                &session_id.as_uuid(),
                &scope.to_string(),
                &key,
                &value,
                &next_version,
                &now,
            ],
        )
        .await
        .map_err(|e| db_err("put_context/insert", e))?;

        tx.commit().await.map_err(|e| db_err("put_context/commit", e))?;

        Ok(ReasoningContextEntry {
            context_entry_id,
            session_id,
            scope,
            key: key.to_string(),
            value,
            version: next_version,
            created_at: now,
        })
    }

    /// Latest version of `key` within `scope` for `session_id`, or `None`
    /// if no version has ever been written.
    pub async fn get_latest_context(
        &self,
        session_id: SessionId,
        scope: ContextScope,
        key: &str,
    ) -> ReasoningResult<Option<JsonValue>> {
        let conn = self.pool.get().await.map_err(pool_err)?;
        let row = conn
            .query_opt(
                "SELECT value FROM reasoning_context_entries \
                 WHERE session_id = $1 AND scope = $2 AND key = $3 \
                 ORDER BY version DESC LIMIT 1",
                &[&session_id.as_uuid(), &scope.to_string(), &key],
            )
            .await
            .map_err(|e| db_err("get_latest_context", e))?;

        Ok(row.map(|r| r.get::<_, JsonValue>(0)))
    }

    // ------------------------------------------------------------------
    // Clarifications
    // ------------------------------------------------------------------

    /// Enforces the "at most one pending clarification per session"
    /// invariant by checking before inserting; the session's status
    /// transition to `waiting_*` is the caller's responsibility.
    pub async fn create_clarification(
        &self,
        session_id: SessionId,
        kind: ClarificationKind,
        question: JsonValue,
    ) -> ReasoningResult<ReasoningClarification> {
        if self.get_pending_clarification(session_id).await?.is_some() {
            return Err(ReasoningError::Storage(StorageError::Conflict {
                entity: "clarification".to_string(),
                reason: format!("session {session_id} already has a pending clarification"),
            }));
        }

        let conn = self.pool.get().await.map_err(pool_err)?;
        let clarification_id = ClarificationId::now_v7();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO reasoning_clarifications \
             (clarification_id, session_id, kind, question, status, answer, created_at, answered_at) \
             VALUES ($1, $2, $3, $4, $5, NULL, $6, NULL)",
            &[
                &clarification_id.as_uuid(),
                &session_id.as_uuid(),
                &kind.to_string(),
                &question,
                &ClarificationStatus::Pending.to_string(),
                &now,
            ],
        )
        .await
        .map_err(|e| db_err("create_clarification", e))?;

        Ok(ReasoningClarification {
            clarification_id,
            session_id,
            kind,
            question,
            status: ClarificationStatus::Pending,
            answer: None,
            created_at: now,
            answered_at: None,
        })
    }

    pub async fn get_pending_clarification(
        &self,
        session_id: SessionId,
    ) -> ReasoningResult<Option<ReasoningClarification>> {
        let conn = self.pool.get().await.map_err(pool_err)?;
        let row = conn
            .query_opt(
                "SELECT clarification_id, session_id, kind, question, status, answer, created_at, answered_at \
                 FROM reasoning_clarifications \
                 WHERE session_id = $1 AND status = $2 \
                 ORDER BY created_at DESC LIMIT 1",
                &[&session_id.as_uuid(), &ClarificationStatus::Pending.to_string()],
            )
            .await
            .map_err(|e| db_err("get_pending_clarification", e))?;

        row.map(clarification_from_row).transpose()
    }

    pub async fn answer_clarification(
        &self,
        clarification_id: ClarificationId,
        answer: JsonValue,
    ) -> ReasoningResult<ReasoningClarification> {
        let conn = self.pool.get().await.map_err(pool_err)?;
        let now = Utc::now();
        let updated = conn
            .execute(
                "UPDATE reasoning_clarifications SET status = $1, answer = $2, answered_at = $3 \
                 WHERE clarification_id = $4 AND status = $5",
                &[
                    &ClarificationStatus::Answered.to_string(),
                    &answer,
                    &now,
                    &clarification_id.as_uuid(),
                    &ClarificationStatus::Pending.to_string(),
                ],
            )
            .await
            .map_err(|e| db_err("answer_clarification", e))?;

        if updated == 0 {
            return Err(not_found("clarification", clarification_id));
        }

        let conn = self.pool.get().await.map_err(pool_err)?;
        let row = conn
            .query_one(
                "SELECT clarification_id, session_id, kind, question, status, answer, created_at, answered_at \
                 FROM reasoning_clarifications WHERE clarification_id = $1",
                &[&clarification_id.as_uuid()],
            )
            .await
            .map_err(|e| db_err("answer_clarification/reload", e))?;

        clarification_from_row(row)
    }

    // ------------------------------------------------------------------
    // Trace events
    // ------------------------------------------------------------------

    /// Persists one trace row verbatim; closed-set validation/rewriting
    /// happens in [`crate::trace_sink::TraceSink`] before this is called.
    pub async fn insert_trace_event(
        &self,
        session_id: SessionId,
        turn_id: Option<TurnId>,
        step: &str,
        event_type: &str,
        payload: JsonValue,
        external_trace_id: Option<String>,
    ) -> ReasoningResult<ReasoningTraceEvent> {
        let conn = self.pool.get().await.map_err(pool_err)?;
        let trace_event_id = TraceEventId::now_v7();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO reasoning_trace_events \
             (trace_event_id, session_id, turn_id, step, event_type, payload, external_trace_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            &[
                &trace_event_id.as_uuid(),
                &session_id.as_uuid(),
                &turn_id.map(|t| t.as_uuid()),
                &step,
                &event_type,
                &payload,
                &external_trace_id,
                &now,
            ],
        )
        .await
        .map_err(|e| db_err("insert_trace_event", e))?;

        Ok(ReasoningTraceEvent {
            trace_event_id,
            session_id,
            turn_id,
            step: step.to_string(),
            event_type: event_type.to_string(),
            payload,
            external_trace_id,
            created_at: now,
        })
    }

    pub async fn list_trace_events(
        &self,
        session_id: SessionId,
    ) -> ReasoningResult<Vec<ReasoningTraceEvent>> {
        let conn = self.pool.get().await.map_err(pool_err)?;
        let rows = conn
            .query(
                "SELECT trace_event_id, session_id, turn_id, step, event_type, payload, external_trace_id, created_at \
                 FROM reasoning_trace_events WHERE session_id = $1 ORDER BY created_at ASC",
                &[&session_id.as_uuid()],
            )
            .await
            .map_err(|e| db_err("list_trace_events", e))?;

        rows.into_iter().map(trace_event_from_row).collect()
    }

    // ------------------------------------------------------------------
    // Tenant LLM config
    // ------------------------------------------------------------------

    pub async fn get_tenant_llm_config(
        &self,
        tenant_id: TenantId,
    ) -> ReasoningResult<Option<TenantLlmConfig>> {
        let conn = self.pool.get().await.map_err(pool_err)?;
        let row = conn
            .query_opt(
                "SELECT tenant_id, provider, model, fallback_provider, fallback_model, \
                 api_key_cipher_by_provider, extra_json, created_at, updated_at \
                 FROM reasoning_tenant_llm_config WHERE tenant_id = $1",
                &[&tenant_id.as_uuid()],
            )
            .await
            .map_err(|e| db_err("get_tenant_llm_config", e))?;

        row.map(tenant_llm_config_from_row).transpose()
    }

    /// Upsert keyed on `tenant_id`; callers own merging `api_key_cipher_by_provider`
    /// with any existing ciphertexts before calling this (§4.7).
    pub async fn upsert_tenant_llm_config(
        &self,
        config: &TenantLlmConfig,
    ) -> ReasoningResult<TenantLlmConfig> {
        let conn = self.pool.get().await.map_err(pool_err)?;
        let now = Utc::now();
        let ciphers = serde_json::to_value(&config.api_key_cipher_by_provider)
            .expect("string map always serializes");
        conn.execute(
            "INSERT INTO reasoning_tenant_llm_config \
             (tenant_id, provider, model, fallback_provider, fallback_model, \
              api_key_cipher_by_provider, extra_json, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) \
             ON CONFLICT (tenant_id) DO UPDATE SET \
               provider = EXCLUDED.provider, \
               model = EXCLUDED.model, \
               fallback_provider = EXCLUDED.fallback_provider, \
               fallback_model = EXCLUDED.fallback_model, \
               api_key_cipher_by_provider = EXCLUDED.api_key_cipher_by_provider, \
               extra_json = EXCLUDED.extra_json, \
               updated_at = EXCLUDED.updated_at",
            &[
                &config.tenant_id.as_uuid(),
                &config.provider.to_string(),
                &config.model,
                &config.fallback_provider.as_ref().map(|p| p.to_string()),
                &config.fallback_model,
                &ciphers,
                &config.extra_json,
                &now,
            ],
        )
        .await
        .map_err(|e| db_err("upsert_tenant_llm_config", e))?;

        Ok(TenantLlmConfig {
            updated_at: now,
            ..config.clone()
        })
    }

    // ------------------------------------------------------------------
    // Runtime config (§10.5)
    // ------------------------------------------------------------------

    /// Exactly one row is expected to exist; seeded by deployment tooling.
    pub async fn get_system_runtime_config(&self) -> ReasoningResult<SystemRuntimeConfig> {
        let conn = self.pool.get().await.map_err(pool_err)?;
        let row = conn
            .query_one(
                "SELECT enabled, endpoint, public_key, secret_key_cipher, updated_at \
                 FROM reasoning_system_runtime_config LIMIT 1",
                &[],
            )
            .await
            .map_err(|e| db_err("get_system_runtime_config", e))?;

        Ok(SystemRuntimeConfig {
            enabled: row.get("enabled"),
            endpoint: row.get("endpoint"),
            public_key: row.get("public_key"),
            secret_key_cipher: row.get("secret_key_cipher"),
            updated_at: row.get("updated_at"),
        })
    }

    pub async fn get_tenant_runtime_config(
        &self,
        tenant_id: TenantId,
    ) -> ReasoningResult<Option<TenantRuntimeConfig>> {
        let conn = self.pool.get().await.map_err(pool_err)?;
        let row = conn
            .query_opt(
                "SELECT tenant_id, audit_payload_max_chars, created_at, updated_at \
                 FROM reasoning_tenant_runtime_config WHERE tenant_id = $1",
                &[&tenant_id.as_uuid()],
            )
            .await
            .map_err(|e| db_err("get_tenant_runtime_config", e))?;

        Ok(row.map(|r| TenantRuntimeConfig {
            tenant_id: TenantId::new(r.get::<_, Uuid>("tenant_id")),
            audit_payload_max_chars: r.get("audit_payload_max_chars"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }))
    }

    pub async fn upsert_tenant_runtime_config(
        &self,
        tenant_id: TenantId,
        audit_payload_max_chars: i32,
    ) -> ReasoningResult<TenantRuntimeConfig> {
        let clamped = TenantRuntimeConfig::clamp_audit_payload_max_chars(audit_payload_max_chars);
        let conn = self.pool.get().await.map_err(pool_err)?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO reasoning_tenant_runtime_config \
             (tenant_id, audit_payload_max_chars, created_at, updated_at) \
             VALUES ($1, $2, $3, $3) \
             ON CONFLICT (tenant_id) DO UPDATE SET \
               audit_payload_max_chars = EXCLUDED.audit_payload_max_chars, \
               updated_at = EXCLUDED.updated_at",
            &[&tenant_id.as_uuid(), &clamped, &now],
        )
        .await
        .map_err(|e| db_err("upsert_tenant_runtime_config", e))?;

        Ok(TenantRuntimeConfig {
            tenant_id,
            audit_payload_max_chars: clamped,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Implements [`reasoning_graph::TaskRecorder`] over `create_task`/
/// `mark_task_status` above, bound to one session/turn pair for the
/// lifetime of a single `run` (§4.8.1.5: "creates a persistent
/// `ReasoningTask` record ... with `status=pending`, then invokes the
/// executor ... on success, marks the task `completed`").
pub struct RepositoryTaskRecorder {
    repo: ReasoningRepository,
    session_id: SessionId,
    turn_id: TurnId,
}

impl RepositoryTaskRecorder {
    pub fn new(repo: ReasoningRepository, session_id: SessionId, turn_id: TurnId) -> Self {
        Self { repo, session_id, turn_id }
    }
}

#[async_trait::async_trait]
impl reasoning_graph::TaskRecorder for RepositoryTaskRecorder {
    async fn create(&self, task_type: TaskType, task_payload: JsonValue) -> ReasoningResult<TaskId> {
        let task = self
            .repo
            .create_task(self.session_id, self.turn_id, task_type, task_payload)
            .await?;
        Ok(task.task_id)
    }

    async fn mark_status(&self, task_id: TaskId, status: TaskStatus) -> ReasoningResult<()> {
        self.repo.mark_task_status(task_id, status).await
    }
}

fn tenant_llm_config_from_row(row: Row) -> ReasoningResult<TenantLlmConfig> {
    let provider_raw: String = row.get("provider");
    let fallback_provider_raw: Option<String> = row.get("fallback_provider");
    let ciphers_json: JsonValue = row.get("api_key_cipher_by_provider");
    let api_key_cipher_by_provider = serde_json::from_value(ciphers_json).map_err(|e| {
        ReasoningError::Storage(StorageError::TransactionFailed {
            reason: format!("corrupt api_key_cipher_by_provider column: {e}"),
        })
    })?;

    Ok(TenantLlmConfig {
        tenant_id: TenantId::new(row.get::<_, Uuid>("tenant_id")),
        provider: parse_enum(&provider_raw, "LlmProvider")?,
        model: row.get("model"),
        fallback_provider: fallback_provider_raw
            .map(|raw| parse_enum::<LlmProvider>(&raw, "LlmProvider"))
            .transpose()?,
        fallback_model: row.get("fallback_model"),
        api_key_cipher_by_provider,
        extra_json: row.get("extra_json"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ------------------------------------------------------------------
// Row -> entity conversions
// ------------------------------------------------------------------

fn parse_enum<T: FromStr>(raw: &str, entity: &str) -> ReasoningResult<T> {
    raw.parse().map_err(|_| {
        ReasoningError::Storage(StorageError::TransactionFailed {
            reason: format!("invalid {entity} value in row: {raw}"),
        })
    })
}

fn session_from_row(row: Row) -> ReasoningResult<ReasoningSession> {
    let status_raw: String = row.get("status");
    Ok(ReasoningSession {
        session_id: SessionId::new(row.get::<_, Uuid>("session_id")),
        tenant_id: reasoning_core::TenantId::new(row.get::<_, Uuid>("tenant_id")),
        status: parse_enum(&status_raw, "SessionStatus")?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        ended_at: row.get("ended_at"),
        metadata: row.get("metadata"),
    })
}

fn turn_from_row(row: Row) -> ReasoningResult<ReasoningTurn> {
    let status_raw: String = row.get("status");
    Ok(ReasoningTurn {
        turn_id: TurnId::new(row.get::<_, Uuid>("turn_id")),
        session_id: SessionId::new(row.get::<_, Uuid>("session_id")),
        turn_no: row.get("turn_no"),
        user_input: row.get("user_input"),
        status: parse_enum(&status_raw, "TurnStatus")?,
        model_output: row.get("model_output"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn task_from_row(row: Row) -> ReasoningResult<ReasoningTask> {
    let task_type_raw: String = row.get("task_type");
    let status_raw: String = row.get("status");
    Ok(ReasoningTask {
        task_id: TaskId::new(row.get::<_, Uuid>("task_id")),
        session_id: SessionId::new(row.get::<_, Uuid>("session_id")),
        turn_id: TurnId::new(row.get::<_, Uuid>("turn_id")),
        task_type: parse_enum(&task_type_raw, "TaskType")?,
        task_payload: row.get("task_payload"),
        status: parse_enum(&status_raw, "TaskStatus")?,
        retry_count: row.get("retry_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn clarification_from_row(row: Row) -> ReasoningResult<ReasoningClarification> {
    let kind_raw: String = row.get("kind");
    let status_raw: String = row.get("status");
    let kind = match kind_raw.as_str() {
        "no_attribute_match" => ClarificationKind::NoAttributeMatch,
        "no_ontology_match" => ClarificationKind::NoOntologyMatch,
        "anchor_ontology_missing" => ClarificationKind::AnchorOntologyMissing,
        "no_executable_resource" => ClarificationKind::NoExecutableResource,
        "traversal_confirmation" => ClarificationKind::TraversalConfirmation,
        _ => ClarificationKind::Other,
    };
    Ok(ReasoningClarification {
        clarification_id: ClarificationId::new(row.get::<_, Uuid>("clarification_id")),
        session_id: SessionId::new(row.get::<_, Uuid>("session_id")),
        kind,
        question: row.get("question"),
        status: parse_enum(&status_raw, "ClarificationStatus")?,
        answer: row.get("answer"),
        created_at: row.get("created_at"),
        answered_at: row.get("answered_at"),
    })
}

fn trace_event_from_row(row: Row) -> ReasoningResult<ReasoningTraceEvent> {
    Ok(ReasoningTraceEvent {
        trace_event_id: TraceEventId::new(row.get::<_, Uuid>("trace_event_id")),
        session_id: SessionId::new(row.get::<_, Uuid>("session_id")),
        turn_id: row.get::<_, Option<Uuid>>("turn_id").map(TurnId::new),
        step: row.get("step"),
        event_type: row.get("event_type"),
        payload: row.get("payload"),
        external_trace_id: row.get("external_trace_id"),
        created_at: row.get("created_at"),
    })
}
