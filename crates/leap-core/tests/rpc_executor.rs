// crates/leap-core/tests/rpc_executor.rs
// ============================================================================
// Module: RPC Executor Tests
// Description: Gating, logging, and failure taxonomy of RPC execution.
// Purpose: Cover every skip-flag combination and the call scenarios.
// ============================================================================

//! ## Overview
//! Drives [`leap_core::execute`] against an in-memory store with a small
//! test library so every flag combination is exercised.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::sync::Arc;
use std::sync::Mutex;

use leap_core::CallFailure;
use leap_core::CallLogEntry;
use leap_core::CallLogStore;
use leap_core::CallRequest;
use leap_core::ExperimentContext;
use leap_core::ExperimentMetadata;
use leap_core::ExperimentName;
use leap_core::FunctionDef;
use leap_core::FunctionLibrary;
use leap_core::FunctionModule;
use leap_core::InMemoryExperimentStore;
use leap_core::LogOptions;
use leap_core::LogQuery;
use leap_core::NewCallLog;
use leap_core::RpcError;
use leap_core::SharedExperimentStore;
use leap_core::Student;
use leap_core::StoreError;
use leap_core::StudentId;
use leap_core::StudentRegistry;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn library(calls: Arc<Mutex<u32>>) -> FunctionLibrary {
    let counted = Arc::clone(&calls);
    FunctionLibrary::new()
        .with_module(
            FunctionModule::new("math_funcs")
                .with(
                    FunctionDef::new("square", |args| {
                        let x = args.value(0, "x")?;
                        match x.as_i64() {
                            Some(int) => Ok(json!(int * int)),
                            None => {
                                let x = args.f64(0, "x")?;
                                Ok(json!(x * x))
                            }
                        }
                    })
                    .signature("(x: float) -> float")
                    .doc("Return x squared."),
                )
                .with(FunctionDef::new("boom", |_| Err(CallFailure::value_error("boom")))),
        )
        .with_module(
            FunctionModule::new("open_funcs")
                .with(FunctionDef::new("echo", |args| Ok(args.value(0, "x")?.clone())).noregcheck())
                .with(
                    FunctionDef::new("quiet_echo", |args| Ok(args.value(0, "x")?.clone()))
                        .noregcheck()
                        .nolog(),
                ),
        )
        .with_module(
            FunctionModule::new("fast")
                .with(
                    FunctionDef::new("fast_step", move |_| {
                        *counted.lock().unwrap() += 1;
                        Ok(json!({"x": 1.0}))
                    })
                    .nolog(),
                )
                .with(FunctionDef::new("fast_fail", |_| Err(CallFailure::type_error("bad"))).nolog()),
        )
}

struct Fixture {
    _dir: TempDir,
    ctx: ExperimentContext,
    calls: Arc<Mutex<u32>>,
}

fn fixture_with(metadata: ExperimentMetadata, store: SharedExperimentStore) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let funcs = dir.path().join("funcs");
    fs::create_dir_all(&funcs).unwrap();
    for module in ["math_funcs", "open_funcs", "fast"] {
        fs::write(funcs.join(format!("{module}.toml")), "").unwrap();
    }
    let calls = Arc::new(Mutex::new(0));
    let ctx = ExperimentContext::new(
        ExperimentName::parse("default").unwrap(),
        dir.path().to_path_buf(),
        metadata,
        Arc::new(library(Arc::clone(&calls))),
        store,
    );
    Fixture {
        _dir: dir,
        ctx,
        calls,
    }
}

fn fixture() -> Fixture {
    fixture_with(
        ExperimentMetadata::default(),
        SharedExperimentStore::from_store(InMemoryExperimentStore::new()),
    )
}

fn register(ctx: &ExperimentContext, id: &str) {
    ctx.add_student(id, "Test Student", None).unwrap();
}

fn all_logs(ctx: &ExperimentContext) -> Vec<CallLogEntry> {
    ctx.query_logs(&LogQuery {
        limit: 10_000,
        ..LogQuery::default()
    })
    .unwrap()
}

/// Store whose log appends always fail.
#[derive(Default)]
struct FailingLogStore {
    inner: InMemoryExperimentStore,
}

impl StudentRegistry for FailingLogStore {
    fn add_student(&self, student: &Student) -> Result<Student, StoreError> {
        self.inner.add_student(student)
    }

    fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        self.inner.list_students()
    }

    fn delete_student(&self, student_id: &str) -> Result<bool, StoreError> {
        self.inner.delete_student(student_id)
    }

    fn is_registered(&self, student_id: &str) -> Result<bool, StoreError> {
        self.inner.is_registered(student_id)
    }

    fn count_students(&self) -> Result<u64, StoreError> {
        self.inner.count_students()
    }
}

impl CallLogStore for FailingLogStore {
    fn append_log(&self, _record: &NewCallLog) -> Result<CallLogEntry, StoreError> {
        Err(StoreError::Unavailable("disk gone".to_string()))
    }

    fn query_logs(&self, query: &LogQuery) -> Result<Vec<CallLogEntry>, StoreError> {
        self.inner.query_logs(query)
    }

    fn log_options(&self) -> Result<LogOptions, StoreError> {
        self.inner.log_options()
    }

    fn count_logs(&self) -> Result<u64, StoreError> {
        self.inner.count_logs()
    }
}

// ============================================================================
// SECTION: Scenarios
// ============================================================================

#[test]
fn registered_square_call_is_logged() {
    let fx = fixture();
    register(&fx.ctx, "s001");
    let result = fx.ctx.call(CallRequest::new("square", "s001", vec![json!(7)])).unwrap();
    assert_eq!(result, json!(49));

    let logs = all_logs(&fx.ctx);
    assert_eq!(logs.len(), 1);
    let entry = &logs[0];
    assert_eq!(entry.func_name, "square");
    assert_eq!(entry.args, json!([7]));
    assert_eq!(entry.result, json!(49));
    assert_eq!(entry.error, None);
    assert_eq!(entry.student_id, "s001");
    assert_eq!(entry.experiment, "default");
}

#[test]
fn noregcheck_echo_serves_unregistered_caller_and_logs() {
    let fx = fixture();
    let result = fx.ctx.call(CallRequest::new("echo", "anon", vec![json!("hi")])).unwrap();
    assert_eq!(result, json!("hi"));
    let logs = all_logs(&fx.ctx);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].student_id, "anon");
}

#[test]
fn nolog_function_never_logs() {
    let fx = fixture();
    register(&fx.ctx, "s001");
    for _ in 0 .. 3 {
        fx.ctx.call(CallRequest::new("fast_step", "s001", vec![])).unwrap();
    }
    assert_eq!(*fx.calls.lock().unwrap(), 3);
    let err = fx.ctx.call(CallRequest::new("fast_fail", "s001", vec![])).unwrap_err();
    assert_eq!(err, RpcError::ExecutionFailed("TypeError: bad".to_string()));
    assert_eq!(fx.ctx.store().count_logs().unwrap(), 0);
}

#[test]
fn nolog_function_still_requires_registration() {
    let fx = fixture();
    let err = fx.ctx.call(CallRequest::new("fast_step", "ghost", vec![])).unwrap_err();
    assert_eq!(err, RpcError::NotRegistered("ghost".to_string()));
    assert_eq!(*fx.calls.lock().unwrap(), 0);
}

#[test]
fn nolog_noregcheck_function_is_open_and_silent() {
    let fx = fixture();
    let result = fx.ctx.call(CallRequest::new("quiet_echo", "anon", vec![json!(1)])).unwrap();
    assert_eq!(result, json!(1));
    assert_eq!(fx.ctx.store().count_logs().unwrap(), 0);
}

#[test]
fn unknown_function_is_reported_before_identity_and_registration() {
    let fx = fixture();
    let err = fx.ctx.call(CallRequest::new("missing", "bad id!", vec![])).unwrap_err();
    assert_eq!(err, RpcError::UnknownFunction("missing".to_string()));
    assert_eq!(err.to_string(), "Unknown function: 'missing'");
    assert_eq!(fx.ctx.store().count_logs().unwrap(), 0);
}

#[test]
fn identity_validation_is_never_skipped() {
    let fx = fixture();
    let err = fx.ctx.call(CallRequest::new("echo", "bad id!", vec![json!(1)])).unwrap_err();
    assert_eq!(err, RpcError::InvalidIdentity("bad id!".to_string()));
    let err = fx.ctx.call(CallRequest::new("quiet_echo", "", vec![json!(1)])).unwrap_err();
    assert!(matches!(err, RpcError::InvalidIdentity(_)));
    assert_eq!(fx.ctx.store().count_logs().unwrap(), 0);
}

#[test]
fn unregistered_caller_is_rejected_without_logging() {
    let fx = fixture();
    let err = fx.ctx.call(CallRequest::new("square", "s404", vec![json!(2)])).unwrap_err();
    assert_eq!(err.to_string(), "Student 's404' is not registered");
    assert_eq!(fx.ctx.store().count_logs().unwrap(), 0);
}

#[test]
fn registration_not_required_opens_every_function() {
    let metadata = ExperimentMetadata {
        require_registration: false,
        ..ExperimentMetadata::default()
    };
    let fx = fixture_with(metadata, SharedExperimentStore::from_store(InMemoryExperimentStore::new()));
    let result = fx.ctx.call(CallRequest::new("square", "walkin", vec![json!(3)])).unwrap();
    assert_eq!(result, json!(9));
    assert_eq!(fx.ctx.store().count_logs().unwrap(), 1);
}

#[test]
fn failing_call_is_logged_with_tagged_error_and_null_result() {
    let fx = fixture();
    register(&fx.ctx, "s001");
    let err = fx
        .ctx
        .call(CallRequest::new("boom", "s001", vec![json!(1), json!([2, 3])]).with_trial("t1"))
        .unwrap_err();
    assert_eq!(err, RpcError::ExecutionFailed("ValueError: boom".to_string()));

    let logs = all_logs(&fx.ctx);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].error.as_deref(), Some("ValueError: boom"));
    assert_eq!(logs[0].result, Value::Null);
    assert_eq!(logs[0].args, json!([1, [2, 3]]));
    assert_eq!(logs[0].trial.as_deref(), Some("t1"));
}

#[test]
fn keyword_arguments_bind_by_name() {
    let fx = fixture();
    register(&fx.ctx, "s001");
    let kwargs = json!({"x": 5}).as_object().cloned().unwrap();
    let result =
        fx.ctx.call(CallRequest::new("square", "s001", vec![]).with_kwargs(kwargs.clone())).unwrap();
    assert_eq!(result, json!(25));
    let err = fx
        .ctx
        .call(CallRequest::new("square", "s001", vec![json!(5)]).with_kwargs(kwargs))
        .unwrap_err();
    assert_eq!(
        err,
        RpcError::ExecutionFailed("TypeError: got multiple values for argument 'x'".to_string())
    );
}

#[test]
fn log_append_failure_does_not_mask_result() {
    let store = FailingLogStore::default();
    store
        .add_student(&Student::new(StudentId::parse("s001").unwrap(), "S", None))
        .unwrap();
    let fx = fixture_with(ExperimentMetadata::default(), SharedExperimentStore::from_store(store));
    let result = fx.ctx.call(CallRequest::new("square", "s001", vec![json!(4)])).unwrap();
    assert_eq!(result, json!(16));
    let err = fx.ctx.call(CallRequest::new("boom", "s001", vec![])).unwrap_err();
    assert_eq!(err, RpcError::ExecutionFailed("ValueError: boom".to_string()));
}
