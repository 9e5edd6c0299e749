mod common;

use std::future::IntoFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};
use shim_chain::{
    wrap_command, AfterCommandEvent, CommandCall, CommandError, CommandEvent, ExecutionScope, Hook,
    HookError, Resolved, RetryPolicy,
};

use common::{browser, call_log, calls, count};

type Seen = Arc<Mutex<Vec<String>>>;

fn recording_before(seen: &Seen) -> Hook<CommandEvent> {
    let seen = Arc::clone(seen);
    Hook::from_fn(move |event: Option<CommandEvent>| {
        if let Some(event) = event {
            seen.lock().push(event.command);
        }
        Ok(Value::Null)
    })
}

fn recording_after(seen: &Seen) -> Hook<AfterCommandEvent> {
    let seen = Arc::clone(seen);
    Hook::from_fn(move |event: Option<AfterCommandEvent>| {
        if let Some(event) = event {
            let status = if event.is_success() { "ok" } else { "err" };
            seen.lock().push(format!("{}:{status}", event.command()));
        }
        Ok(Value::Null)
    })
}

async fn exploding_after(_: Option<AfterCommandEvent>) -> Result<Value, HookError> {
    panic!("after hook blew up")
}

#[tokio::test]
async fn one_round_of_each_hook_per_call() {
    let before: Seen = Default::default();
    let after: Seen = Default::default();
    let scope = ExecutionScope::builder()
        .before_command(recording_before(&before))
        .after_command(recording_after(&after))
        .build();
    let log = call_log();

    let title = browser(&scope, &log, 0).call("getTitle", vec![]).await.unwrap();

    assert_eq!(title.to_json(), json!("Fixture page"));
    assert_eq!(*before.lock(), vec!["getTitle"]);
    assert_eq!(*after.lock(), vec!["getTitle:ok"]);
    assert_eq!(scope.hook_depth(), 0);
}

#[tokio::test]
async fn commands_issued_by_a_hook_fire_no_hooks() {
    let before: Seen = Default::default();
    let after: Seen = Default::default();
    let nested_runs = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&nested_runs);
    let get_url = wrap_command("getUrl", move |_call: CommandCall| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, CommandError>(Resolved::scalar("https://example.test/")) }
    });
    let issuing = Hook::new(move |event: Option<CommandEvent>| {
        let get_url = get_url.clone();
        async move {
            let event = event.ok_or_else(|| HookError::new("missing event"))?;
            if event.command == "getTitle" {
                get_url.call(&event.scope, vec![]).await.map_err(HookError::new)?;
            }
            Ok::<_, HookError>(Value::Null)
        }
    });

    let scope = ExecutionScope::builder()
        .before_command(issuing)
        .before_command(recording_before(&before))
        .after_command(recording_after(&after))
        .build();
    let log = call_log();

    browser(&scope, &log, 0).call("getTitle", vec![]).await.unwrap();

    assert_eq!(nested_runs.load(Ordering::SeqCst), 1);
    assert_eq!(*before.lock(), vec!["getTitle"]);
    assert_eq!(*after.lock(), vec!["getTitle:ok"]);
    assert_eq!(scope.hook_depth(), 0);
}

#[tokio::test]
async fn commands_issued_by_an_after_hook_fire_no_hooks() {
    let before: Seen = Default::default();
    let after: Seen = Default::default();
    let nested: Arc<Mutex<Vec<Value>>> = Default::default();

    let get_url = wrap_command("getUrl", |_call: CommandCall| async {
        Ok::<_, CommandError>(Resolved::scalar("https://example.test/"))
    });
    let captured = Arc::clone(&nested);
    let issuing = Hook::new(move |event: Option<AfterCommandEvent>| {
        let get_url = get_url.clone();
        let captured = Arc::clone(&captured);
        async move {
            let event = event.ok_or_else(|| HookError::new("missing event"))?;
            let url = get_url.call(&event.event.scope, vec![]).await.map_err(HookError::new)?;
            captured.lock().push(url.to_json());
            Ok::<_, HookError>(Value::Null)
        }
    });

    let scope = ExecutionScope::builder()
        .before_command(recording_before(&before))
        .after_command(issuing)
        .after_command(recording_after(&after))
        .build();
    let log = call_log();

    browser(&scope, &log, 0).call("getTitle", vec![]).await.unwrap();

    assert_eq!(*nested.lock(), vec![json!("https://example.test/")]);
    assert_eq!(*before.lock(), vec!["getTitle"]);
    assert_eq!(*after.lock(), vec!["getTitle:ok"]);
    assert_eq!(scope.hook_depth(), 0);
}

#[tokio::test]
async fn panicking_hooks_release_the_hook_window() {
    let before: Seen = Default::default();
    let scope = ExecutionScope::builder()
        .before_command(Hook::from_fn(|_: Option<CommandEvent>| -> Result<Value, HookError> {
            panic!("before hook blew up")
        }))
        .before_command(recording_before(&before))
        .after_command(Hook::new(exploding_after))
        .build();
    let log = call_log();

    let title = browser(&scope, &log, 0).call("getTitle", vec![]).await.unwrap();
    assert_eq!(title.to_json(), json!("Fixture page"));
    assert_eq!(scope.hook_depth(), 0);

    // Hooks still fire for the next call, so the window really closed.
    browser(&scope, &log, 0).call("getTitle", vec![]).await.unwrap();
    assert_eq!(*before.lock(), vec!["getTitle", "getTitle"]);
    assert_eq!(scope.hook_depth(), 0);
}

#[tokio::test]
async fn timed_out_calls_still_settle_their_lifecycle() {
    let before: Seen = Default::default();
    let after: Seen = Default::default();
    let scope = ExecutionScope::builder()
        .before_command(recording_before(&before))
        .after_command(recording_after(&after))
        .build();
    let slow = wrap_command("slow", |_call: CommandCall| async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, CommandError>(Resolved::scalar(true))
    });

    let waited = tokio::time::timeout(
        Duration::from_millis(5),
        slow.call(&scope, vec![]).into_future(),
    )
    .await;
    assert!(waited.is_err());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(*before.lock(), vec!["slow"]);
    assert_eq!(*after.lock(), vec!["slow:ok"]);
    assert_eq!(scope.hook_depth(), 0);
}

#[tokio::test]
async fn after_hooks_observe_failures_without_swallowing_them() {
    let after: Seen = Default::default();
    let errors: Seen = Default::default();
    let captured = Arc::clone(&errors);
    let scope = ExecutionScope::builder()
        .after_command(recording_after(&after))
        .after_command(Hook::from_fn(move |event: Option<AfterCommandEvent>| {
            if let Some(err) = event.as_ref().and_then(AfterCommandEvent::error) {
                captured.lock().push(err.to_string());
            }
            Ok(Value::Null)
        }))
        .build();
    let log = call_log();

    let err = browser(&scope, &log, 0)
        .call("findElement", vec![json!("video")])
        .await
        .unwrap_err();

    assert_eq!(err, CommandError::failed("no such element"));
    assert_eq!(*after.lock(), vec!["findElement:err"]);
    assert_eq!(*errors.lock(), vec!["no such element"]);
    assert_eq!(scope.hook_depth(), 0);
}

#[tokio::test]
async fn failing_hooks_do_not_affect_the_command() {
    let scope = ExecutionScope::builder()
        .before_command(Hook::from_fn(|_| Err(HookError::new("before failed"))))
        .after_command(Hook::new(|_event: Option<AfterCommandEvent>| async {
            Err::<Value, _>(HookError::new("after failed"))
        }))
        .build();
    let log = call_log();

    let tag = browser(&scope, &log, 0)
        .call("findElement", vec![json!("button")])
        .call("getTagName", vec![])
        .await
        .unwrap();

    assert_eq!(tag.to_json(), json!("button"));
    assert_eq!(calls(&log), vec!["findElement", "getTagName"]);
}

#[tokio::test]
async fn hook_events_carry_protocol_metadata() {
    let events: Arc<Mutex<Vec<CommandEvent>>> = Default::default();
    let captured = Arc::clone(&events);
    let scope = ExecutionScope::builder()
        .before_command(Hook::from_fn(move |event: Option<CommandEvent>| {
            captured.lock().extend(event);
            Ok(Value::Null)
        }))
        .build();
    let log = call_log();

    browser(&scope, &log, 0)
        .call("findElements", vec![json!("a")])
        .await
        .unwrap();

    let events = events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].command, "findElements");
    assert_eq!(events[0].method.as_deref(), Some("POST"));
    assert_eq!(events[0].endpoint.as_deref(), Some("/session/:sessionId/elements"));
    assert_eq!(events[0].args, vec![json!("a")]);
}

#[tokio::test]
async fn scope_policy_retries_until_success() {
    let before: Seen = Default::default();
    let after: Seen = Default::default();
    let scope = ExecutionScope::builder()
        .before_command(recording_before(&before))
        .after_command(recording_after(&after))
        .retry("flaky", RetryPolicy::new(3))
        .build();
    let log = call_log();

    let value = browser(&scope, &log, 2).call("flaky", vec![]).await.unwrap();

    assert_eq!(value.to_json(), json!(true));
    assert_eq!(count(&log, "flaky"), 3);
    assert_eq!(scope.retries(), Some(2));
    let policy = scope.retry_policy("flaky").expect("policy attached");
    assert_eq!(policy.lock().attempts, 2);
    // Retries happen inside one lifecycle.
    assert_eq!(*before.lock(), vec!["flaky"]);
    assert_eq!(*after.lock(), vec!["flaky:ok"]);
}

#[tokio::test]
async fn exhausted_policy_surfaces_the_last_failure() {
    let scope = ExecutionScope::builder()
        .retry("flaky", RetryPolicy::new(1))
        .build();
    let log = call_log();

    let err = browser(&scope, &log, 5).call("flaky", vec![]).await.unwrap_err();

    assert_eq!(err, CommandError::failed("flaky failure 2"));
    assert_eq!(count(&log, "flaky"), 2);
    assert_eq!(scope.retries(), Some(1));
}

#[tokio::test]
async fn no_policy_means_a_single_attempt() {
    let scope = ExecutionScope::builder().build();
    let log = call_log();

    let err = browser(&scope, &log, 1).call("flaky", vec![]).await.unwrap_err();

    assert_eq!(err, CommandError::failed("flaky failure 1"));
    assert_eq!(count(&log, "flaky"), 1);
    assert_eq!(scope.retries(), None);
}

#[tokio::test]
async fn limit_changes_made_during_a_call_are_kept() {
    let scope = ExecutionScope::builder()
        .retry("adjusting", RetryPolicy::new(3))
        .build();
    let runs = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&runs);
    let adjusting = wrap_command("adjusting", move |call: CommandCall| {
        let run = counter.fetch_add(1, Ordering::SeqCst) + 1;
        if run == 1 {
            if let Some(policy) = call.scope.retry_policy("adjusting") {
                policy.lock().limit = 5;
            }
        }
        async move {
            if run <= 2 {
                Err::<Resolved, _>(CommandError::failed(format!("attempt {run} failed")))
            } else {
                Ok(Resolved::scalar(run as u64))
            }
        }
    });

    let value = adjusting.call(&scope, vec![]).await.unwrap();

    assert_eq!(value.to_json(), json!(3));
    let policy = scope.retry_policy("adjusting").expect("policy attached");
    assert_eq!(*policy.lock(), RetryPolicy { limit: 5, attempts: 2 });
}
