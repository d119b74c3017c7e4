//! Inert resource records. Synthesis builds these once; they carry no
//! runtime behavior of their own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Container-backed serverless function. The image URI embeds an immutable
/// digest, so the record only changes when the pinned digest constant does.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerFunction {
    pub function_name: String,
    pub image_uri: String,
    pub timeout_secs: u32,
    pub memory_mb: u32,
    /// Key-value runtime parameters surfaced to the job as environment
    /// variables.
    pub runtime_parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyStatement {
    pub sid: String,
    pub actions: Vec<String>,
    pub resources: Vec<String>,
}

/// Execution identity for the function. Holds exactly the grants the job
/// needs: the managed logging baseline plus the inline statements built
/// during synthesis. Anything beyond that set is a correctness regression.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionRole {
    pub role_name: String,
    pub assume_service: String,
    pub managed_policy_arns: Vec<String>,
    pub statements: Vec<PolicyStatement>,
}

/// Time-based trigger bound to one function target. Fires on schedule
/// regardless of whether the previous run has finished; there is no
/// run-overlap protection in this design.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleRule {
    pub rule_name: String,
    pub schedule_expression: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Statistic {
    Sum,
    Maximum,
    Minimum,
    Average,
}

impl Statistic {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "Sum",
            Self::Maximum => "Maximum",
            Self::Minimum => "Minimum",
            Self::Average => "Average",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ComparisonOperator {
    GreaterThanOrEqualToThreshold,
    GreaterThanThreshold,
    LessThanThreshold,
    LessThanOrEqualToThreshold,
}

impl ComparisonOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GreaterThanOrEqualToThreshold => "GreaterThanOrEqualToThreshold",
            Self::GreaterThanThreshold => "GreaterThanThreshold",
            Self::LessThanThreshold => "LessThanThreshold",
            Self::LessThanOrEqualToThreshold => "LessThanOrEqualToThreshold",
        }
    }
}

/// Metric-threshold alarm over the observed function's metric stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricAlarm {
    pub alarm_name: String,
    pub namespace: String,
    pub metric_name: String,
    pub statistic: Statistic,
    pub period_secs: u32,
    pub evaluation_periods: u32,
    pub threshold: f64,
    pub comparison: ComparisonOperator,
    pub description: String,
}

/// Fan-out alert destination with email subscribers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertTopic {
    pub topic_name: String,
    pub email_subscribers: Vec<String>,
}

/// Fixed-retention log destination scoped to the function's log namespace.
/// Destroyed with the stack, not retained.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogGroup {
    pub log_group_name: String,
    pub retention_days: u32,
}

/// One provisioned resource record, keyed by logical id in the graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Resource {
    Function(ContainerFunction),
    Role(ExecutionRole),
    Schedule(ScheduleRule),
    Alarm(MetricAlarm),
    Topic(AlertTopic),
    Logs(LogGroup),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Function,
    Role,
    Schedule,
    Alarm,
    Topic,
    Logs,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Role => "role",
            Self::Schedule => "schedule",
            Self::Alarm => "alarm",
            Self::Topic => "topic",
            Self::Logs => "logs",
        }
    }
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Function(_) => ResourceKind::Function,
            Self::Role(_) => ResourceKind::Role,
            Self::Schedule(_) => ResourceKind::Schedule,
            Self::Alarm(_) => ResourceKind::Alarm,
            Self::Topic(_) => ResourceKind::Topic,
            Self::Logs(_) => ResourceKind::Logs,
        }
    }
}
