//! End-to-end executions driven through the local components.
//!
//! Every task here is picked up the way a remote worker would: from the
//! queued context, through `Executor::hydrate`, never from the executor that
//! dispatched it.

use serde_json::{json, Value};
use stately::context::Context;
use stately::definition::StateMachine;
use stately::executor::{is_execution_context, DispatchOutcome, Executor, ExecutorError, NO_MATCHING_CATCHER};
use stately::local::LocalComponents;
use stately::{ExecutionState, Status};

fn machine(document: Value) -> StateMachine {
    StateMachine::from_representation(document).unwrap()
}

fn single_task() -> StateMachine {
    machine(json!({
        "StartAt": "Begin",
        "States": {"Begin": {"Type": "Task", "Resource": "R", "End": true}}
    }))
}

fn guarded_task() -> StateMachine {
    machine(json!({
        "StartAt": "Work",
        "States": {
            "Work": {
                "Type": "Task",
                "Resource": "work",
                "Next": "Done",
                "Catch": [{"ErrorEquals": ["States.ALL"], "Next": "Cleanup"}]
            },
            "Cleanup": {"Type": "Task", "Resource": "cleanup", "End": true},
            "Done": {"Type": "Succeed"}
        }
    }))
}

fn worker(local: &LocalComponents) -> Executor {
    let task = local.dispatcher().take_next().expect("a task was dispatched");
    Executor::hydrate(&task.context, local.components()).unwrap()
}

#[test]
fn dispatch_hands_exactly_one_task_to_the_dispatcher() {
    let local = LocalComponents::new();
    let mut executor = Executor::create(&single_task(), local.components()).unwrap();

    let outcome = executor.dispatch(json!({"x": 0})).unwrap();

    assert_eq!(
        outcome,
        DispatchOutcome::Suspended {
            state: "Begin".to_string(),
            resource: "R".to_string(),
        }
    );
    assert_eq!(local.dispatcher().dispatched(), 1);

    let queued = local.dispatcher().queued();
    let queued = &queued[0];
    assert_eq!(queued.resource, "R");
    assert_eq!(queued.input, json!({"x": 0}));
    assert!(is_execution_context(&queued.context));
}

#[test]
fn dispatched_context_records_task_input() {
    let local = LocalComponents::new();
    let mut executor = Executor::create(&single_task(), local.components()).unwrap();
    executor.dispatch(json!({"x": 0})).unwrap();

    let resumed = worker(&local);
    let (state, result) = resumed.current_state_and_result().unwrap();

    assert_eq!(state, Some(ExecutionState::new("Begin").with_data(json!({"x": 0}))));
    assert_eq!(result, None);
}

#[test]
fn end_task_success_finishes_with_output() {
    let local = LocalComponents::new();
    let mut executor = Executor::create(&single_task(), local.components()).unwrap();
    executor.dispatch(json!({})).unwrap();

    let outcome = worker(&local)
        .run_task(|| Ok::<_, String>(json!({"x": 1})), |e| e.clone())
        .unwrap();

    let result = outcome.result().unwrap();
    assert_eq!(result.status, Status::Succeeded);
    assert_eq!(result.output, Some(json!({"x": 1})));
    assert_eq!(local.dispatcher().dispatched(), 1);
    assert_eq!(local.dispatcher().pending(), 0);
}

#[test]
fn successful_task_continues_to_next() {
    let local = LocalComponents::new();
    let mut executor = Executor::create(&guarded_task(), local.components()).unwrap();
    executor.dispatch(json!({})).unwrap();

    let outcome = worker(&local)
        .run_task(|| Ok::<_, String>(json!({"done": true})), |e| e.clone())
        .unwrap();

    // Done is a Succeed state: the run ends without output.
    assert_eq!(outcome.result().map(|r| r.status), Some(Status::Succeeded));
    assert_eq!(outcome.result().and_then(|r| r.output.clone()), None);
}

#[test]
fn caught_failure_moves_to_catcher_next_with_empty_input() {
    let local = LocalComponents::new();
    let mut executor = Executor::create(&guarded_task(), local.components()).unwrap();
    executor.dispatch(json!({"n": 1})).unwrap();

    let outcome = worker(&local)
        .run_task(|| Err::<Value, _>("Boom".to_string()), |e| e.clone())
        .unwrap();

    assert_eq!(
        outcome,
        DispatchOutcome::Suspended {
            state: "Cleanup".to_string(),
            resource: "cleanup".to_string(),
        }
    );
    let queued = local.dispatcher().queued();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].input, json!({}));

    let outcome = worker(&local)
        .run_task(|| Ok::<_, String>(json!("cleaned")), |e| e.clone())
        .unwrap();
    assert_eq!(outcome.result().and_then(|r| r.output.clone()), Some(json!("cleaned")));
}

#[test]
fn uncaught_failure_fails_the_execution() {
    let local = LocalComponents::new();
    let mut executor = Executor::create(&single_task(), local.components()).unwrap();
    executor.dispatch(json!({})).unwrap();

    let outcome = worker(&local)
        .run_task(|| Err::<Value, _>("Boom"), |e| e.to_string())
        .unwrap();

    let result = outcome.result().unwrap();
    assert_eq!(result.status, Status::Failed);
    assert_eq!(
        result.output,
        Some(json!({"Error": "States.TaskFailed", "Cause": NO_MATCHING_CATCHER}))
    );
    assert_eq!(local.dispatcher().pending(), 0);
}

#[test]
fn specific_catcher_only_sees_its_codes() {
    let definition = machine(json!({
        "StartAt": "Work",
        "States": {
            "Work": {
                "Type": "Task",
                "Resource": "work",
                "End": true,
                "Catch": [
                    {"ErrorEquals": ["Timeout"], "Next": "Retry"},
                    {"ErrorEquals": ["States.ALL"], "Next": "Give up"}
                ]
            },
            "Retry": {"Type": "Fail", "Error": "Retry", "Cause": "timed out"},
            "Give up": {"Type": "Fail", "Error": "GaveUp", "Cause": "other"}
        }
    }));

    for (code, expected) in [("Timeout", "Retry"), ("Denied", "GaveUp")] {
        let local = LocalComponents::new();
        let mut executor = Executor::create(&definition, local.components()).unwrap();
        executor.dispatch(json!({})).unwrap();

        let outcome = worker(&local)
            .run_task(|| Err::<Value, _>(code), |e| e.to_string())
            .unwrap();

        let output = outcome.result().and_then(|r| r.output.clone()).unwrap();
        assert_eq!(output["Error"], json!(expected));
    }
}

#[test]
fn fail_state_ends_with_its_error_and_cause() {
    let definition = machine(json!({
        "StartAt": "Stop",
        "States": {"Stop": {"Type": "Fail", "Error": "Nope", "Cause": "Bad input"}}
    }));
    let local = LocalComponents::new();
    let mut executor = Executor::create(&definition, local.components()).unwrap();

    let outcome = executor.dispatch(json!({})).unwrap();

    let result = outcome.result().unwrap();
    assert_eq!(result.status, Status::Failed);
    assert_eq!(result.output, Some(json!({"Error": "Nope", "Cause": "Bad input"})));
    assert_eq!(local.dispatcher().dispatched(), 0);
}

#[test]
fn dispatch_replays_a_finished_execution() {
    let definition = machine(json!({
        "StartAt": "Done",
        "States": {"Done": {"Type": "Succeed"}}
    }));
    let local = LocalComponents::new();
    let mut executor = Executor::create(&definition, local.components()).unwrap();

    let first = executor.dispatch(json!({})).unwrap();
    let second = executor.dispatch(json!({"ignored": true})).unwrap();

    assert_eq!(first, second);
    assert_eq!(local.dispatcher().dispatched(), 0);
}

#[test]
fn run_task_on_finished_execution_is_rejected() {
    let local = LocalComponents::new();
    let mut executor = Executor::create(&single_task(), local.components()).unwrap();
    executor.dispatch(json!({})).unwrap();
    let mut resumed = worker(&local);
    resumed
        .run_task(|| Ok::<_, String>(json!(1)), |e| e.clone())
        .unwrap();

    let err = resumed
        .run_task(|| Ok::<_, String>(json!(2)), |e| e.clone())
        .unwrap_err();

    assert!(matches!(err, ExecutorError::AlreadyFinished(Status::Succeeded)));
}

#[test]
fn export_then_hydrate_exports_the_same_context() {
    let local = LocalComponents::new();
    let mut executor = Executor::create(&guarded_task(), local.components()).unwrap();
    executor.dispatch(json!({"n": 7})).unwrap();
    let exported = executor.export_context().unwrap();

    let wire = exported.to_json_string().unwrap();
    let decoded = Context::from_json_str(&wire).unwrap();
    let resumed = Executor::hydrate(&decoded, local.components()).unwrap();

    assert_eq!(resumed.export_context().unwrap(), exported);
    assert_eq!(resumed.execution_id(), executor.execution_id());
    assert_ne!(resumed.executor_id(), executor.executor_id());
}

#[test]
fn null_task_input_survives_hydration() {
    let local = LocalComponents::new();
    let mut executor = Executor::create(&single_task(), local.components()).unwrap();
    executor.dispatch(Value::Null).unwrap();
    let before = executor.current_state_and_result().unwrap();

    let wire = executor.export_context().unwrap().to_json_string().unwrap();
    let context = Context::from_json_str(&wire).unwrap();
    let resumed = Executor::hydrate(&context, local.components()).unwrap();

    assert_eq!(before.0, Some(ExecutionState::new("Begin").with_data(Value::Null)));
    assert_eq!(resumed.current_state_and_result().unwrap(), before);
}

#[test]
fn null_task_output_survives_hydration() {
    let local = LocalComponents::new();
    let mut executor = Executor::create(&single_task(), local.components()).unwrap();
    executor.dispatch(json!({})).unwrap();
    let mut finished = worker(&local);
    finished
        .run_task(|| Ok::<_, String>(Value::Null), |e| e.clone())
        .unwrap();

    let context = finished.export_context().unwrap();
    let resumed = Executor::hydrate(&context, local.components()).unwrap();
    let (_, result) = resumed.current_state_and_result().unwrap();

    assert_eq!(result.map(|r| r.output), Some(Some(Value::Null)));
}

#[test]
fn central_store_keeps_state_out_of_the_context() {
    let local = LocalComponents::central();
    let mut executor = Executor::create(&single_task(), local.components()).unwrap();
    executor.dispatch(json!({"x": 0})).unwrap();
    let execution_id = executor.execution_id().to_string();

    let context = executor.export_context().unwrap();
    assert!(context.slice("execution").is_empty());

    let outcome = worker(&local)
        .run_task(|| Ok::<_, String>(json!({"x": 1})), |e| e.clone())
        .unwrap();
    assert_eq!(outcome.result().map(|r| r.status), Some(Status::Succeeded));

    let record = local
        .central_store()
        .and_then(|store| store.record(&execution_id))
        .unwrap();
    assert_eq!(record.state, None);
    assert_eq!(record.result.map(|r| r.output), Some(Some(json!({"x": 1}))));
}

#[test]
fn log_sequence_continues_across_invocations() {
    let local = LocalComponents::new();
    let mut executor = Executor::create(&guarded_task(), local.components()).unwrap();
    executor.dispatch(json!({})).unwrap();
    let execution_id = executor.execution_id().to_string();

    worker(&local)
        .run_task(|| Err::<Value, _>("Boom".to_string()), |e| e.clone())
        .unwrap();
    worker(&local)
        .run_task(|| Ok::<_, String>(json!({})), |e| e.clone())
        .unwrap();

    let lines = local.logs().lines_for(&execution_id);
    let sequences: Vec<u64> = lines.iter().map(|line| line.sequence).collect();
    let expected: Vec<u64> = (1..=lines.len() as u64).collect();
    assert!(lines.len() >= 4);
    assert_eq!(sequences, expected);

    let executors: std::collections::BTreeSet<_> =
        lines.iter().map(|line| line.executor_id.clone()).collect();
    assert_eq!(executors.len(), 3);
}

#[test]
fn log_lines_name_executor_resource_and_state() {
    let local = LocalComponents::new();
    let mut executor = Executor::create(&single_task(), local.components()).unwrap();
    executor.dispatch(json!({})).unwrap();

    let lines = local.logs().lines_for(executor.execution_id());
    let suffix = &executor.executor_id()[executor.executor_id().len() - 4..];
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].message, format!("[{suffix}:R] Begin dispatching"));
}

#[test]
fn finishing_from_a_task_logs_its_resource() {
    let local = LocalComponents::new();
    let mut executor = Executor::create(&single_task(), local.components()).unwrap();
    executor.dispatch(json!({})).unwrap();
    let mut resumed = worker(&local);
    resumed
        .run_task(|| Ok::<_, String>(json!({})), |e| e.clone())
        .unwrap();

    let lines = local.logs().lines_for(resumed.execution_id());
    let suffix = &resumed.executor_id()[resumed.executor_id().len() - 4..];
    assert_eq!(
        lines.last().map(|line| line.message.clone()),
        Some(format!("[{suffix}:R] Begin finished SUCCEEDED"))
    );
}

#[test]
fn run_until_idle_drives_a_chain() {
    let definition = machine(json!({
        "StartAt": "Fetch",
        "States": {
            "Fetch": {"Type": "Task", "Resource": "fetch", "Next": "Parse"},
            "Parse": {"Type": "Task", "Resource": "parse", "Next": "Store"},
            "Store": {"Type": "Task", "Resource": "store", "End": true}
        }
    }));
    let local = LocalComponents::new();
    let mut executor = Executor::create(&definition, local.components()).unwrap();
    executor.dispatch(json!({"trail": []})).unwrap();

    let outcomes = local
        .dispatcher()
        .run_until_idle(
            &local.components(),
            |resource, input| {
                let mut trail = input["trail"].as_array().cloned().unwrap_or_default();
                trail.push(json!(resource));
                Ok::<_, String>(json!({"trail": trail}))
            },
            |e| e.clone(),
            10,
        )
        .unwrap();

    assert_eq!(outcomes.len(), 3);
    assert_eq!(
        outcomes.last().and_then(DispatchOutcome::result).and_then(|r| r.output.clone()),
        Some(json!({"trail": ["fetch", "parse", "store"]}))
    );
}

#[test]
fn run_until_idle_stops_runaway_loops() {
    let definition = machine(json!({
        "StartAt": "Spin",
        "States": {"Spin": {"Type": "Task", "Resource": "spin", "Next": "Spin"}}
    }));
    let local = LocalComponents::new();
    let mut executor = Executor::create(&definition, local.components()).unwrap();
    executor.dispatch(json!({})).unwrap();

    let err = local
        .dispatcher()
        .run_until_idle(
            &local.components(),
            |_resource, input| Ok::<_, String>(input.clone()),
            |e| e.clone(),
            5,
        )
        .unwrap_err();

    assert!(matches!(err, ExecutorError::Component(_)));
    assert_eq!(local.dispatcher().pending(), 1);
}

#[tokio::test]
async fn task_resumes_on_another_thread() {
    let local = LocalComponents::new();
    let mut executor = Executor::create(&single_task(), local.components()).unwrap();
    executor.dispatch(json!({"n": 20})).unwrap();
    let task = local.dispatcher().take_next().unwrap();
    let wire = task.context.to_json_string().unwrap();

    let components = local.components();
    let outcome = tokio::task::spawn_blocking(move || {
        let context = Context::from_json_str(&wire).unwrap();
        let mut resumed = Executor::hydrate(&context, components).unwrap();
        resumed.run_task(
            || Ok::<_, String>(json!({"n": task.input["n"].as_i64().unwrap_or(0) + 1})),
            |e| e.clone(),
        )
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(
        outcome.result().and_then(|r| r.output.clone()),
        Some(json!({"n": 21}))
    );
}
