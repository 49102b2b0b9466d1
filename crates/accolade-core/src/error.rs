//! Error types for accolade operations.
//!
//! Definition errors are fatal at load time (the engine refuses to start on a
//! malformed forest); store errors are recoverable and never propagate out of
//! the evaluation path.

use thiserror::Error;

use crate::types::{CriterionId, NodeId, SubjectId};

/// Result type alias for accolade operations.
pub type AccoladeResult<T> = Result<T, AccoladeError>;

/// Main error type for all accolade operations.
#[derive(Error, Debug)]
pub enum AccoladeError {
    /// The criteria forest contains a cycle.
    #[error("Cyclic criteria tree: node {node} participates in a cycle")]
    CyclicTree { node: NodeId, code: ErrorCode },

    /// A tree node references a child that does not exist.
    #[error("Dangling child reference: node {node} lists unknown child {child}")]
    DanglingChild {
        node: NodeId,
        child: NodeId,
        code: ErrorCode,
    },

    /// A leaf node references a criterion that does not exist.
    #[error("Dangling criterion reference: node {node} references unknown criterion {criterion}")]
    DanglingCriterion {
        node: NodeId,
        criterion: CriterionId,
        code: ErrorCode,
    },

    /// An achievement references a root node that does not exist.
    #[error("Dangling achievement root: achievement {achievement} references unknown node {node}")]
    DanglingRoot {
        achievement: u32,
        node: NodeId,
        code: ErrorCode,
    },

    /// A tree node claims more than one parent.
    #[error("Node {node} is listed as a child of both {first} and {second}")]
    SharedChild {
        node: NodeId,
        first: NodeId,
        second: NodeId,
        code: ErrorCode,
    },

    /// An internal node carries a criterion reference, or a leaf carries none.
    #[error("Malformed node {node}: {message}")]
    MalformedNode {
        node: NodeId,
        message: String,
        code: ErrorCode,
    },

    /// A subject is not attached to the engine.
    #[error("Subject {subject} is not attached")]
    SubjectNotAttached { subject: SubjectId, code: ErrorCode },

    /// Snapshot store operation failed.
    #[error("Store error: {message}")]
    Store {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Definitions (DEF_xxx)
    DefCyclicTree,
    DefDanglingChild,
    DefDanglingCriterion,
    DefDanglingRoot,
    DefSharedChild,
    DefMalformedNode,

    // Subjects (SUB_xxx)
    SubNotAttached,

    // Store (STO_xxx)
    StoLoadFailed,
    StoWriteFailed,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DefCyclicTree => "DEF_001",
            ErrorCode::DefDanglingChild => "DEF_002",
            ErrorCode::DefDanglingCriterion => "DEF_003",
            ErrorCode::DefDanglingRoot => "DEF_004",
            ErrorCode::DefSharedChild => "DEF_005",
            ErrorCode::DefMalformedNode => "DEF_006",
            ErrorCode::SubNotAttached => "SUB_001",
            ErrorCode::StoLoadFailed => "STO_001",
            ErrorCode::StoWriteFailed => "STO_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl AccoladeError {
    /// Create a cyclic-tree error.
    pub fn cyclic_tree(node: NodeId) -> Self {
        Self::CyclicTree {
            node,
            code: ErrorCode::DefCyclicTree,
        }
    }

    /// Create a dangling-child error.
    pub fn dangling_child(node: NodeId, child: NodeId) -> Self {
        Self::DanglingChild {
            node,
            child,
            code: ErrorCode::DefDanglingChild,
        }
    }

    /// Create a dangling-criterion error.
    pub fn dangling_criterion(node: NodeId, criterion: CriterionId) -> Self {
        Self::DanglingCriterion {
            node,
            criterion,
            code: ErrorCode::DefDanglingCriterion,
        }
    }

    /// Create a malformed-node error.
    pub fn malformed_node(node: NodeId, message: impl Into<String>) -> Self {
        Self::MalformedNode {
            node,
            message: message.into(),
            code: ErrorCode::DefMalformedNode,
        }
    }

    /// Create a subject-not-attached error.
    pub fn subject_not_attached(subject: SubjectId) -> Self {
        Self::SubjectNotAttached {
            subject,
            code: ErrorCode::SubNotAttached,
        }
    }

    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            code: ErrorCode::StoWriteFailed,
            source: None,
        }
    }

    /// Create a store error wrapping an underlying cause.
    pub fn store_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Store {
            message: message.into(),
            code: ErrorCode::StoWriteFailed,
            source: Some(source),
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::CyclicTree { code, .. } => *code,
            Self::DanglingChild { code, .. } => *code,
            Self::DanglingCriterion { code, .. } => *code,
            Self::DanglingRoot { code, .. } => *code,
            Self::SharedChild { code, .. } => *code,
            Self::MalformedNode { code, .. } => *code,
            Self::SubjectNotAttached { code, .. } => *code,
            Self::Store { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether this error is fatal at definition-load time.
    ///
    /// Fatal errors abort startup; everything else is recoverable at runtime.
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Self::CyclicTree { .. }
                | Self::DanglingChild { .. }
                | Self::DanglingCriterion { .. }
                | Self::DanglingRoot { .. }
                | Self::SharedChild { .. }
                | Self::MalformedNode { .. }
        )
    }
}
