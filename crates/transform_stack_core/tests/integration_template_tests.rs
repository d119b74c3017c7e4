use serde_json::json;
use transform_stack_core::stack::{
    FUNCTION_LOGICAL_ID, LOG_GROUP_LOGICAL_ID, ROLE_LOGICAL_ID, SCHEDULE_LOGICAL_ID,
};
use transform_stack_core::template::stable_template_json;
use transform_stack_core::{
    render_template, template_fingerprint, Environment, StackDefinition, StackParams, Template,
};

fn environment() -> Environment {
    Environment::new("123456789012", "eu-central-1").expect("environment should pass")
}

fn rendered_default() -> Template {
    let graph = StackDefinition::default()
        .synthesize(&environment())
        .expect("synthesis should pass");
    render_template(&graph).expect("rendering should pass")
}

#[test]
fn template_contains_every_logical_id_plus_derived_permission() {
    let template = rendered_default();

    let keys: Vec<&str> = template.resources.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "TransformDailySchedule",
            "TransformDailyScheduleInvokePermission",
            "TransformDurationAlarm",
            "TransformErrorAlarm",
            "TransformErrorTopic",
            "TransformExecutionRole",
            "TransformFunction",
            "TransformHeartbeatTopic",
            "TransformInvocationAlarm",
            "TransformLogGroup",
        ]
    );
}

#[test]
fn function_entry_references_role_and_log_group() {
    let template = rendered_default();
    let function = &template.resources[FUNCTION_LOGICAL_ID];

    assert_eq!(function["Type"], json!("AWS::Lambda::Function"));
    assert_eq!(function["DependsOn"], json!([LOG_GROUP_LOGICAL_ID]));
    assert_eq!(
        function["Properties"]["Role"],
        json!({ "Fn::GetAtt": [ROLE_LOGICAL_ID, "Arn"] })
    );
    assert_eq!(function["Properties"]["PackageType"], json!("Image"));
    assert_eq!(function["Properties"]["Timeout"], json!(900));
    assert_eq!(
        function["Properties"]["Code"]["ImageUri"],
        json!(
            "123456789012.dkr.ecr.eu-central-1.amazonaws.com/data-platform/nightly-transform@sha256:c5b7a9e1f2d4083b6a5c9e7d1f0b3a8c2e4d6f8091a3b5c7d9e1f20436587a9b"
        )
    );
}

#[test]
fn schedule_entry_is_rendered_exactly() {
    let template = rendered_default();

    assert_eq!(
        template.resources[SCHEDULE_LOGICAL_ID],
        json!({
            "Type": "AWS::Events::Rule",
            "Properties": {
                "Name": "nightly-transform-daily",
                "ScheduleExpression": "cron(15 5 * * ? *)",
                "State": "ENABLED",
                "Targets": [{
                    "Arn": { "Fn::GetAtt": [FUNCTION_LOGICAL_ID, "Arn"] },
                    "Id": FUNCTION_LOGICAL_ID,
                }],
            },
        })
    );
}

#[test]
fn invoke_permission_grants_events_principal() {
    let template = rendered_default();
    let permission = &template.resources["TransformDailyScheduleInvokePermission"];

    assert_eq!(permission["Type"], json!("AWS::Lambda::Permission"));
    assert_eq!(
        permission["Properties"]["Principal"],
        json!("events.amazonaws.com")
    );
    assert_eq!(
        permission["Properties"]["FunctionName"],
        json!({ "Ref": FUNCTION_LOGICAL_ID })
    );
}

#[test]
fn alarms_fan_out_to_the_designed_topics() {
    let template = rendered_default();

    assert_eq!(
        template.resources["TransformErrorAlarm"]["Properties"]["AlarmActions"],
        json!([{ "Ref": "TransformErrorTopic" }])
    );
    assert_eq!(
        template.resources["TransformDurationAlarm"]["Properties"]["AlarmActions"],
        json!([{ "Ref": "TransformErrorTopic" }])
    );
    assert_eq!(
        template.resources["TransformInvocationAlarm"]["Properties"]["AlarmActions"],
        json!([{ "Ref": "TransformHeartbeatTopic" }])
    );
    assert_eq!(
        template.resources["TransformDurationAlarm"]["Properties"]["Threshold"],
        json!(840_000.0)
    );
}

#[test]
fn log_group_is_destroyed_with_the_stack() {
    let template = rendered_default();
    let log_group = &template.resources[LOG_GROUP_LOGICAL_ID];

    assert_eq!(log_group["DeletionPolicy"], json!("Delete"));
    assert_eq!(log_group["Properties"]["RetentionInDays"], json!(30));
}

#[test]
fn rendering_is_byte_identical_across_runs() {
    let first = rendered_default();
    let second = rendered_default();

    assert_eq!(stable_template_json(&first), stable_template_json(&second));
    assert_eq!(template_fingerprint(&first), template_fingerprint(&second));
}

#[test]
fn digest_change_perturbs_only_the_function_entry_and_fingerprint() {
    let base = rendered_default();
    let graph = StackDefinition::new(StackParams::default().with_image_digest(
        "sha256:0f1e2d3c4b5a69788796a5b4c3d2e1f00112233445566778899aabbccddeeff0",
    ))
    .synthesize(&environment())
    .expect("synthesis should pass");
    let bumped = render_template(&graph).expect("rendering should pass");

    assert_ne!(template_fingerprint(&base), template_fingerprint(&bumped));
    for (logical_id, entry) in &base.resources {
        if logical_id == FUNCTION_LOGICAL_ID {
            assert_ne!(entry, &bumped.resources[logical_id]);
        } else {
            assert_eq!(entry, &bumped.resources[logical_id]);
        }
    }
}
