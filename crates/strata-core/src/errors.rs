use strata_core_types::{RequestId, TraceId};

/// Result type alias using StrataError
pub type Result<T> = std::result::Result<T, StrataError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// This taxonomy provides a stable, structured classification of all errors
/// in the strata system. Each kind maps to a stable error code that can be
/// used for programmatic error handling, testing, and external API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrataErrorKind {
    /// Malformed request: missing key field, unsupported value shape,
    /// bad pagination bounds
    Validation,
    /// Records are empty or produce inconsistent/ambiguous column types
    SchemaInference,
    /// A comparison or join key is not unique within a dataset
    AmbiguousKey,
    /// A version race was detected while assigning a snapshot version
    ConcurrencyConflict,
    /// A pipeline step failed; carries step index and step kind
    StepExecution,
    /// Inserting a lineage edge would create a cycle in the DAG
    Cycle,
    /// Snapshot, data source, pipeline, or execution does not exist
    NotFound,
    /// Persistence-layer failure
    Storage,
    /// Filesystem/IO failure
    Io,
    /// JSON (de)serialization failure
    Serialization,
    /// The operation observed its cancellation token and unwound
    Cancelled,
    /// Invariant breach that should never occur in correct builds
    Internal,
}

impl StrataErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            StrataErrorKind::Validation => "ERR_VALIDATION",
            StrataErrorKind::SchemaInference => "ERR_SCHEMA_INFERENCE",
            StrataErrorKind::AmbiguousKey => "ERR_AMBIGUOUS_KEY",
            StrataErrorKind::ConcurrencyConflict => "ERR_CONCURRENCY_CONFLICT",
            StrataErrorKind::StepExecution => "ERR_STEP_EXECUTION",
            StrataErrorKind::Cycle => "ERR_CYCLE",
            StrataErrorKind::NotFound => "ERR_NOT_FOUND",
            StrataErrorKind::Storage => "ERR_STORAGE",
            StrataErrorKind::Io => "ERR_IO",
            StrataErrorKind::Serialization => "ERR_SERIALIZATION",
            StrataErrorKind::Cancelled => "ERR_CANCELLED",
            StrataErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Provides a structured representation of errors with classification
/// fields for programmatic handling and rich context for debugging.
/// The `{kind, message, context}` boundary shape consumed by external
/// callers is rendered by [`StrataError::to_context_value`].
#[derive(Debug, Clone)]
pub struct StrataError {
    kind: StrataErrorKind,
    op: Option<String>,
    data_source_id: Option<String>,
    snapshot_id: Option<String>,
    step_index: Option<usize>,
    step_kind: Option<String>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
    source: Option<Box<StrataError>>,
}

impl StrataError {
    /// Create a new error with the specified kind
    pub fn new(kind: StrataErrorKind) -> Self {
        Self {
            kind,
            op: None,
            data_source_id: None,
            snapshot_id: None,
            step_index: None,
            step_kind: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add data source ID context
    pub fn with_data_source_id(mut self, id: impl Into<String>) -> Self {
        self.data_source_id = Some(id.into());
        self
    }

    /// Add snapshot ID context
    pub fn with_snapshot_id(mut self, id: impl Into<String>) -> Self {
        self.snapshot_id = Some(id.into());
        self
    }

    /// Add pipeline step context (index and step kind)
    pub fn with_step(mut self, index: usize, kind: impl Into<String>) -> Self {
        self.step_index = Some(index);
        self.step_kind = Some(kind.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add trace ID context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: StrataError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> StrataErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the data source ID context, if any
    pub fn data_source_id(&self) -> Option<&str> {
        self.data_source_id.as_deref()
    }

    /// Get the snapshot ID context, if any
    pub fn snapshot_id(&self) -> Option<&str> {
        self.snapshot_id.as_deref()
    }

    /// Get the step index context, if any
    pub fn step_index(&self) -> Option<usize> {
        self.step_index
    }

    /// Get the step kind context, if any
    pub fn step_kind(&self) -> Option<&str> {
        self.step_kind.as_deref()
    }

    /// Get the request ID context, if any
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Get the trace ID context, if any
    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&StrataError> {
        self.source.as_deref()
    }

    /// Render the `{kind, message, context}` shape surfaced at the API
    /// boundary.
    pub fn to_context_value(&self) -> serde_json::Value {
        let mut context = serde_json::Map::new();
        if let Some(op) = &self.op {
            context.insert("op".to_string(), serde_json::Value::String(op.clone()));
        }
        if let Some(id) = &self.data_source_id {
            context.insert(
                "data_source_id".to_string(),
                serde_json::Value::String(id.clone()),
            );
        }
        if let Some(id) = &self.snapshot_id {
            context.insert(
                "snapshot_id".to_string(),
                serde_json::Value::String(id.clone()),
            );
        }
        if let Some(index) = self.step_index {
            context.insert("step_index".to_string(), serde_json::json!(index));
        }
        if let Some(kind) = &self.step_kind {
            context.insert(
                "step_kind".to_string(),
                serde_json::Value::String(kind.clone()),
            );
        }
        if let Some(request_id) = &self.request_id {
            context.insert(
                "request_id".to_string(),
                serde_json::Value::String(request_id.to_string()),
            );
        }
        if let Some(source) = &self.source {
            context.insert("cause".to_string(), source.to_context_value());
        }
        serde_json::json!({
            "kind": self.code(),
            "message": self.message,
            "context": serde_json::Value::Object(context),
        })
    }
}

impl std::fmt::Display for StrataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(id) = &self.data_source_id {
            write!(f, " (data_source_id: {})", id)?;
        }
        if let Some(id) = &self.snapshot_id {
            write!(f, " (snapshot_id: {})", id)?;
        }
        if let (Some(index), Some(kind)) = (self.step_index, &self.step_kind) {
            write!(f, " (step {} [{}])", index, kind)?;
        }
        Ok(())
    }
}

impl std::error::Error for StrataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(StrataErrorKind::Validation.code(), "ERR_VALIDATION");
        assert_eq!(StrataErrorKind::AmbiguousKey.code(), "ERR_AMBIGUOUS_KEY");
        assert_eq!(StrataErrorKind::StepExecution.code(), "ERR_STEP_EXECUTION");
        assert_eq!(StrataErrorKind::Cycle.code(), "ERR_CYCLE");
    }

    #[test]
    fn test_builder_accumulates_context() {
        let err = StrataError::new(StrataErrorKind::NotFound)
            .with_op("get_by_id")
            .with_snapshot_id("snap:1")
            .with_message("snapshot not found");
        assert_eq!(err.kind(), StrataErrorKind::NotFound);
        assert_eq!(err.op(), Some("get_by_id"));
        assert_eq!(err.snapshot_id(), Some("snap:1"));
        assert_eq!(err.message(), "snapshot not found");
    }

    #[test]
    fn test_display_includes_code_and_step() {
        let err = StrataError::new(StrataErrorKind::StepExecution)
            .with_op("execute")
            .with_step(2, "filter")
            .with_message("boom");
        let rendered = err.to_string();
        assert!(rendered.contains("ERR_STEP_EXECUTION"));
        assert!(rendered.contains("step 2 [filter]"));
    }

    #[test]
    fn test_context_value_shape() {
        let cause = StrataError::new(StrataErrorKind::AmbiguousKey).with_message("dup key");
        let err = StrataError::new(StrataErrorKind::StepExecution)
            .with_op("execute")
            .with_step(1, "join")
            .with_message("join failed")
            .with_source(cause);
        let value = err.to_context_value();
        assert_eq!(value["kind"], "ERR_STEP_EXECUTION");
        assert_eq!(value["message"], "join failed");
        assert_eq!(value["context"]["step_index"], 1);
        assert_eq!(value["context"]["cause"]["kind"], "ERR_AMBIGUOUS_KEY");
    }
}
