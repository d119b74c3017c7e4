//! Rendering of a validated [`ResourceGraph`] into the provider's native
//! declarative template, plus canonical-JSON fingerprinting.
//!
//! Rendering resolves edges into native reference properties. Key order is
//! deterministic, so identical input yields byte-identical output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::error::ValidationError;
use crate::graph::{EdgeKind, ResourceGraph};
use crate::resources::{
    AlertTopic, ContainerFunction, ExecutionRole, LogGroup, MetricAlarm, Resource, ScheduleRule,
};

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";
pub const TEMPLATE_DESCRIPTION: &str =
    "Scheduled data-transformation job: container function, daily trigger, alarms, alerting";

/// The deployment descriptor consumed by the external provisioning tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, Value>,
}

pub fn render_template(graph: &ResourceGraph) -> Result<Template, ValidationError> {
    let mut rendered = BTreeMap::new();

    for (logical_id, resource) in &graph.resources {
        let entry = match resource {
            Resource::Role(role) => render_role(role),
            Resource::Function(function) => render_function(graph, logical_id, function)?,
            Resource::Logs(log_group) => render_log_group(log_group),
            Resource::Topic(topic) => render_topic(topic),
            Resource::Alarm(alarm) => render_alarm(graph, logical_id, alarm)?,
            Resource::Schedule(rule) => {
                let target_id = single_target(graph, EdgeKind::Invokes, logical_id)?;
                let permission_id = format!("{logical_id}InvokePermission");
                if graph.resources.contains_key(&permission_id) {
                    return Err(ValidationError::new(format!(
                        "derived logical id '{permission_id}' conflicts with a registered resource"
                    )));
                }
                rendered.insert(permission_id, render_invoke_permission(logical_id, target_id));
                render_schedule(rule, target_id)
            }
        };
        rendered.insert(logical_id.clone(), entry);
    }

    Ok(Template {
        format_version: TEMPLATE_FORMAT_VERSION.to_string(),
        description: TEMPLATE_DESCRIPTION.to_string(),
        resources: rendered,
    })
}

/// Canonical JSON for fingerprinting and byte-stable comparison.
pub fn stable_template_json(template: &Template) -> String {
    serde_json::to_string(template).expect("serialization of template value should not fail")
}

pub fn template_fingerprint(template: &Template) -> String {
    let mut hasher = Sha256::new();
    hasher.update(stable_template_json(template));
    format!("{:x}", hasher.finalize())
}

fn render_role(role: &ExecutionRole) -> Value {
    let statements: Vec<Value> = role
        .statements
        .iter()
        .map(|statement| {
            json!({
                "Sid": statement.sid,
                "Effect": "Allow",
                "Action": statement.actions,
                "Resource": statement.resources,
            })
        })
        .collect();

    json!({
        "Type": "AWS::IAM::Role",
        "Properties": {
            "RoleName": role.role_name,
            "AssumeRolePolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": { "Service": role.assume_service },
                    "Action": "sts:AssumeRole",
                }],
            },
            "ManagedPolicyArns": role.managed_policy_arns,
            "Policies": [{
                "PolicyName": format!("{}-grants", role.role_name),
                "PolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": statements,
                },
            }],
        },
    })
}

fn render_function(
    graph: &ResourceGraph,
    logical_id: &str,
    function: &ContainerFunction,
) -> Result<Value, ValidationError> {
    let role_id = single_target(graph, EdgeKind::SecuredBy, logical_id)?;
    let log_group_id = single_target(graph, EdgeKind::WritesLogsTo, logical_id)?;

    Ok(json!({
        "Type": "AWS::Lambda::Function",
        "DependsOn": [log_group_id],
        "Properties": {
            "FunctionName": function.function_name,
            "PackageType": "Image",
            "Code": { "ImageUri": function.image_uri },
            "Role": { "Fn::GetAtt": [role_id, "Arn"] },
            "Timeout": function.timeout_secs,
            "MemorySize": function.memory_mb,
            "Environment": { "Variables": function.runtime_parameters },
        },
    }))
}

fn render_log_group(log_group: &LogGroup) -> Value {
    json!({
        "Type": "AWS::Logs::LogGroup",
        "DeletionPolicy": "Delete",
        "Properties": {
            "LogGroupName": log_group.log_group_name,
            "RetentionInDays": log_group.retention_days,
        },
    })
}

fn render_topic(topic: &AlertTopic) -> Value {
    let subscriptions: Vec<Value> = topic
        .email_subscribers
        .iter()
        .map(|address| json!({ "Endpoint": address, "Protocol": "email" }))
        .collect();

    json!({
        "Type": "AWS::SNS::Topic",
        "Properties": {
            "TopicName": topic.topic_name,
            "Subscription": subscriptions,
        },
    })
}

fn render_alarm(
    graph: &ResourceGraph,
    logical_id: &str,
    alarm: &MetricAlarm,
) -> Result<Value, ValidationError> {
    let function_id = single_target(graph, EdgeKind::Observes, logical_id)?;
    let mut topic_ids = graph.edge_targets(EdgeKind::Notifies, logical_id);
    if topic_ids.is_empty() {
        return Err(ValidationError::new(format!(
            "alarm '{logical_id}' notifies no topic"
        )));
    }
    topic_ids.sort_unstable();
    let actions: Vec<Value> = topic_ids
        .iter()
        .map(|topic_id| json!({ "Ref": topic_id }))
        .collect();

    Ok(json!({
        "Type": "AWS::CloudWatch::Alarm",
        "Properties": {
            "AlarmName": alarm.alarm_name,
            "AlarmDescription": alarm.description,
            "Namespace": alarm.namespace,
            "MetricName": alarm.metric_name,
            "Statistic": alarm.statistic.as_str(),
            "Period": alarm.period_secs,
            "EvaluationPeriods": alarm.evaluation_periods,
            "Threshold": alarm.threshold,
            "ComparisonOperator": alarm.comparison.as_str(),
            "Dimensions": [{ "Name": "FunctionName", "Value": { "Ref": function_id } }],
            "AlarmActions": actions,
            "TreatMissingData": "notBreaching",
        },
    }))
}

fn render_schedule(rule: &ScheduleRule, target_id: &str) -> Value {
    json!({
        "Type": "AWS::Events::Rule",
        "Properties": {
            "Name": rule.rule_name,
            "ScheduleExpression": rule.schedule_expression,
            "State": "ENABLED",
            "Targets": [{
                "Arn": { "Fn::GetAtt": [target_id, "Arn"] },
                "Id": target_id,
            }],
        },
    })
}

fn render_invoke_permission(schedule_id: &str, function_id: &str) -> Value {
    json!({
        "Type": "AWS::Lambda::Permission",
        "Properties": {
            "Action": "lambda:InvokeFunction",
            "FunctionName": { "Ref": function_id },
            "Principal": "events.amazonaws.com",
            "SourceArn": { "Fn::GetAtt": [schedule_id, "Arn"] },
        },
    })
}

fn single_target<'graph>(
    graph: &'graph ResourceGraph,
    kind: EdgeKind,
    from: &str,
) -> Result<&'graph str, ValidationError> {
    let targets = graph.edge_targets(kind, from);
    match targets.as_slice() {
        &[target] => Ok(target),
        &[] => Err(ValidationError::new(format!(
            "resource '{from}' is missing its {kind:?} edge"
        ))),
        _ => Err(ValidationError::new(format!(
            "resource '{from}' has more than one {kind:?} edge"
        ))),
    }
}
