//! Stack assembly for the nightly data-transformation job.
//!
//! `StackDefinition` is evaluated once per target environment and produces a
//! fully-linked [`ResourceGraph`]: one container function, its
//! least-privilege execution role, a fixed-retention log group, three metric
//! alarms fanned out to two email topics, and the daily trigger. No loops,
//! no retries, no branching.

use std::collections::BTreeMap;

use crate::environment::Environment;
use crate::error::ValidationError;
use crate::graph::{EdgeKind, ResourceGraph, SynthContext};
use crate::identifiers::{
    function_log_group_name, image_uri, repository_arn, validate_email,
    validate_repository_name, validate_schedule_expression, ImageDigest, SecretArn,
};
use crate::resources::{
    AlertTopic, ComparisonOperator, ContainerFunction, ExecutionRole, LogGroup, MetricAlarm,
    PolicyStatement, Resource, ScheduleRule, Statistic,
};

/// Repository holding the transform job's container image.
pub const IMAGE_REPOSITORY_NAME: &str = "data-platform/nightly-transform";

/// Pinned image digest. Redeploys are idempotent until this constant changes.
pub const IMAGE_DIGEST: &str =
    "sha256:c5b7a9e1f2d4083b6a5c9e7d1f0b3a8c2e4d6f8091a3b5c7d9e1f20436587a9b";

/// Warehouse credentials the job reads at startup.
pub const CREDENTIALS_SECRET_ARN: &str =
    "arn:aws:secretsmanager:eu-central-1:210987654321:secret:nightly-transform/warehouse-Xq4TzD";

/// Recipient for both alert topics.
pub const NOTIFICATION_EMAIL: &str = "data-platform-alerts@example.com";

pub const FUNCTION_NAME: &str = "nightly-transform";
pub const FUNCTION_TIMEOUT_SECS: u32 = 900;
pub const FUNCTION_MEMORY_MB: u32 = 1024;
pub const LOG_RETENTION_DAYS: u32 = 30;

/// The upstream trip-data sync lands by 05:00 UTC; run 15 minutes after.
pub const DAILY_SCHEDULE: &str = "cron(15 5 * * ? *)";

/// All three alarms evaluate one 15-minute window.
pub const ALARM_WINDOW_SECS: u32 = 900;

/// Safety margin below the 900 s hard timeout, so near-timeout runs are
/// surfaced before the platform kills them. Duration metrics are reported
/// in milliseconds.
pub const DURATION_ALARM_THRESHOLD_MS: f64 = 840_000.0;

pub const LAMBDA_BASIC_EXECUTION_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

// Logical ids double as the update-in-place keys for redeploys.
pub const FUNCTION_LOGICAL_ID: &str = "TransformFunction";
pub const ROLE_LOGICAL_ID: &str = "TransformExecutionRole";
pub const LOG_GROUP_LOGICAL_ID: &str = "TransformLogGroup";
pub const ERROR_ALARM_LOGICAL_ID: &str = "TransformErrorAlarm";
pub const DURATION_ALARM_LOGICAL_ID: &str = "TransformDurationAlarm";
pub const INVOCATION_ALARM_LOGICAL_ID: &str = "TransformInvocationAlarm";
pub const ERROR_TOPIC_LOGICAL_ID: &str = "TransformErrorTopic";
pub const HEARTBEAT_TOPIC_LOGICAL_ID: &str = "TransformHeartbeatTopic";
pub const SCHEDULE_LOGICAL_ID: &str = "TransformDailySchedule";

/// Deployment constants for one stack instance, with production defaults.
#[derive(Debug, Clone)]
pub struct StackParams {
    pub function_name: String,
    pub repository_name: String,
    pub image_digest: String,
    pub credentials_secret_arn: String,
    pub notification_email: String,
    pub schedule_expression: String,
    pub timeout_secs: u32,
    pub memory_mb: u32,
    pub log_retention_days: u32,
    pub alarm_window_secs: u32,
    pub duration_alarm_threshold_ms: f64,
    /// Extra key-value runtime parameters for the job. The credentials
    /// secret ARN is always injected on top of these.
    pub runtime_parameters: BTreeMap<String, String>,
}

impl Default for StackParams {
    fn default() -> Self {
        Self {
            function_name: FUNCTION_NAME.to_string(),
            repository_name: IMAGE_REPOSITORY_NAME.to_string(),
            image_digest: IMAGE_DIGEST.to_string(),
            credentials_secret_arn: CREDENTIALS_SECRET_ARN.to_string(),
            notification_email: NOTIFICATION_EMAIL.to_string(),
            schedule_expression: DAILY_SCHEDULE.to_string(),
            timeout_secs: FUNCTION_TIMEOUT_SECS,
            memory_mb: FUNCTION_MEMORY_MB,
            log_retention_days: LOG_RETENTION_DAYS,
            alarm_window_secs: ALARM_WINDOW_SECS,
            duration_alarm_threshold_ms: DURATION_ALARM_THRESHOLD_MS,
            runtime_parameters: BTreeMap::from([(
                "TRANSFORM_LOG_LEVEL".to_string(),
                "info".to_string(),
            )]),
        }
    }
}

impl StackParams {
    pub fn with_image_digest(mut self, digest: impl Into<String>) -> Self {
        self.image_digest = digest.into();
        self
    }

    pub fn with_notification_email(mut self, address: impl Into<String>) -> Self {
        self.notification_email = address.into();
        self
    }

    pub fn with_schedule_expression(mut self, expression: impl Into<String>) -> Self {
        self.schedule_expression = expression.into();
        self
    }

    pub fn with_runtime_parameter(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.runtime_parameters.insert(key.into(), value.into());
        self
    }
}

/// Declarative stack assembly. Evaluated once to produce the deployment
/// plan; has no runtime behavior of its own.
#[derive(Debug, Clone, Default)]
pub struct StackDefinition {
    pub params: StackParams,
}

impl StackDefinition {
    pub fn new(params: StackParams) -> Self {
        Self { params }
    }

    pub fn synthesize(&self, environment: &Environment) -> Result<ResourceGraph, ValidationError> {
        let params = &self.params;

        validate_repository_name(&params.repository_name)?;
        let secret = SecretArn::parse(&params.credentials_secret_arn)?;
        let digest = ImageDigest::parse(&params.image_digest)?;
        validate_email(&params.notification_email)?;
        validate_schedule_expression(&params.schedule_expression)?;

        if params.timeout_secs == 0 {
            return Err(ValidationError::new("function timeout must be positive"));
        }
        if params.memory_mb == 0 {
            return Err(ValidationError::new("function memory must be positive"));
        }
        if params.log_retention_days == 0 {
            return Err(ValidationError::new("log retention must be positive"));
        }
        if params.alarm_window_secs == 0 {
            return Err(ValidationError::new("alarm window must be positive"));
        }
        if params.duration_alarm_threshold_ms >= f64::from(params.timeout_secs) * 1000.0 {
            return Err(ValidationError::new(format!(
                "duration alarm threshold {}ms must stay below the {}s function timeout",
                params.duration_alarm_threshold_ms, params.timeout_secs
            )));
        }

        let mut ctx = SynthContext::new();

        let pull_resource = repository_arn(
            &environment.account_id,
            &environment.region,
            &params.repository_name,
        );
        ctx.register(
            ROLE_LOGICAL_ID,
            Resource::Role(ExecutionRole {
                role_name: format!("{}-execution", params.function_name),
                assume_service: "lambda.amazonaws.com".to_string(),
                managed_policy_arns: vec![LAMBDA_BASIC_EXECUTION_POLICY_ARN.to_string()],
                statements: vec![
                    PolicyStatement {
                        sid: "ReadJobCredentials".to_string(),
                        actions: vec!["secretsmanager:GetSecretValue".to_string()],
                        resources: vec![secret.as_str().to_string()],
                    },
                    PolicyStatement {
                        sid: "PullJobImage".to_string(),
                        actions: vec![
                            "ecr:BatchCheckLayerAvailability".to_string(),
                            "ecr:BatchGetImage".to_string(),
                            "ecr:GetDownloadUrlForLayer".to_string(),
                        ],
                        resources: vec![pull_resource],
                    },
                ],
            }),
        )?;

        let mut runtime_parameters = params.runtime_parameters.clone();
        runtime_parameters.insert(
            "CREDENTIALS_SECRET_ARN".to_string(),
            secret.as_str().to_string(),
        );
        ctx.register(
            FUNCTION_LOGICAL_ID,
            Resource::Function(ContainerFunction {
                function_name: params.function_name.clone(),
                image_uri: image_uri(
                    &environment.account_id,
                    &environment.region,
                    &params.repository_name,
                    &digest,
                ),
                timeout_secs: params.timeout_secs,
                memory_mb: params.memory_mb,
                runtime_parameters,
            }),
        )?;
        ctx.connect(EdgeKind::SecuredBy, FUNCTION_LOGICAL_ID, ROLE_LOGICAL_ID);

        ctx.register(
            LOG_GROUP_LOGICAL_ID,
            Resource::Logs(LogGroup {
                log_group_name: function_log_group_name(&params.function_name),
                retention_days: params.log_retention_days,
            }),
        )?;
        ctx.connect(
            EdgeKind::WritesLogsTo,
            FUNCTION_LOGICAL_ID,
            LOG_GROUP_LOGICAL_ID,
        );

        ctx.register(
            ERROR_TOPIC_LOGICAL_ID,
            Resource::Topic(AlertTopic {
                topic_name: format!("{}-errors", params.function_name),
                email_subscribers: vec![params.notification_email.clone()],
            }),
        )?;
        ctx.register(
            HEARTBEAT_TOPIC_LOGICAL_ID,
            Resource::Topic(AlertTopic {
                topic_name: format!("{}-heartbeat", params.function_name),
                email_subscribers: vec![params.notification_email.clone()],
            }),
        )?;

        ctx.register(
            ERROR_ALARM_LOGICAL_ID,
            Resource::Alarm(MetricAlarm {
                alarm_name: format!("{}-errors", params.function_name),
                namespace: "AWS/Lambda".to_string(),
                metric_name: "Errors".to_string(),
                statistic: Statistic::Sum,
                period_secs: params.alarm_window_secs,
                evaluation_periods: 1,
                threshold: 1.0,
                comparison: ComparisonOperator::GreaterThanOrEqualToThreshold,
                description: "Transform job reported at least one error".to_string(),
            }),
        )?;
        ctx.register(
            DURATION_ALARM_LOGICAL_ID,
            Resource::Alarm(MetricAlarm {
                alarm_name: format!("{}-duration", params.function_name),
                namespace: "AWS/Lambda".to_string(),
                metric_name: "Duration".to_string(),
                statistic: Statistic::Maximum,
                period_secs: params.alarm_window_secs,
                evaluation_periods: 1,
                threshold: params.duration_alarm_threshold_ms,
                comparison: ComparisonOperator::GreaterThanOrEqualToThreshold,
                description: "Transform job ran close to its hard timeout".to_string(),
            }),
        )?;
        ctx.register(
            INVOCATION_ALARM_LOGICAL_ID,
            Resource::Alarm(MetricAlarm {
                alarm_name: format!("{}-invocations", params.function_name),
                namespace: "AWS/Lambda".to_string(),
                metric_name: "Invocations".to_string(),
                statistic: Statistic::Sum,
                period_secs: params.alarm_window_secs,
                evaluation_periods: 1,
                threshold: 1.0,
                comparison: ComparisonOperator::GreaterThanOrEqualToThreshold,
                description: "Transform job liveness heartbeat".to_string(),
            }),
        )?;

        for alarm_id in [
            ERROR_ALARM_LOGICAL_ID,
            DURATION_ALARM_LOGICAL_ID,
            INVOCATION_ALARM_LOGICAL_ID,
        ] {
            ctx.connect(EdgeKind::Observes, alarm_id, FUNCTION_LOGICAL_ID);
        }
        ctx.connect(
            EdgeKind::Notifies,
            ERROR_ALARM_LOGICAL_ID,
            ERROR_TOPIC_LOGICAL_ID,
        );
        ctx.connect(
            EdgeKind::Notifies,
            DURATION_ALARM_LOGICAL_ID,
            ERROR_TOPIC_LOGICAL_ID,
        );
        ctx.connect(
            EdgeKind::Notifies,
            INVOCATION_ALARM_LOGICAL_ID,
            HEARTBEAT_TOPIC_LOGICAL_ID,
        );

        ctx.register(
            SCHEDULE_LOGICAL_ID,
            Resource::Schedule(ScheduleRule {
                rule_name: format!("{}-daily", params.function_name),
                schedule_expression: params.schedule_expression.clone(),
            }),
        )?;
        ctx.connect(EdgeKind::Invokes, SCHEDULE_LOGICAL_ID, FUNCTION_LOGICAL_ID);

        ctx.finish()
    }
}
