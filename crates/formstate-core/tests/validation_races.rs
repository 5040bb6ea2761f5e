//! Overlapping and late validation results.
//!
//! Completion order is driven by the order in which the returned futures
//! are awaited; requests still parked on a oneshot model a slow validator.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use async_trait::async_trait;
use formstate_core::{
    ErrorMap, FnValidator, Form, FormConfig, MergePolicy, SetValueOptions, Validator,
    ValidatorError,
};
use formstate_doc::Path;
use futures::FutureExt;
use futures::channel::oneshot;
use futures::executor::block_on;
use serde_json::{Value, json};

// ── Helpers ────────────────────────────────────────────────────────────

/// Flags odd numbers at any path.
fn odd_is_bad() -> FnValidator {
    FnValidator::new()
        .on_field(|path, values| {
            let odd = formstate_doc::access::get(values, path)
                .and_then(Value::as_i64)
                .is_some_and(|n| n % 2 != 0);
            Ok(if odd { vec![format!("{path} is odd")] } else { Vec::new() })
        })
        .on_form(|values| {
            let mut map = ErrorMap::new();
            if let Some(obj) = values.as_object() {
                for (key, value) in obj {
                    if value.as_i64().is_some_and(|n| n % 2 != 0) {
                        map.insert(key.clone(), vec![format!("{key} is odd")]);
                    }
                }
            }
            Ok(map)
        })
}

/// Each call parks on the next queued receiver.
#[derive(Default)]
struct Gated {
    field: RefCell<VecDeque<oneshot::Receiver<Vec<String>>>>,
}

impl Gated {
    fn gate(&self) -> oneshot::Sender<Vec<String>> {
        let (tx, rx) = oneshot::channel();
        self.field.borrow_mut().push_back(rx);
        tx
    }
}

struct GatedValidator(Rc<Gated>);

#[async_trait(?Send)]
impl Validator for GatedValidator {
    async fn validate_field(
        &self,
        _path: &Path,
        _values: &Value,
    ) -> Result<Vec<String>, ValidatorError> {
        let rx = self.0.field.borrow_mut().pop_front();
        match rx {
            Some(rx) => rx.await.map_err(|_| ValidatorError::Unavailable),
            None => Ok(Vec::new()),
        }
    }

    async fn validate(&self, _values: &Value) -> Result<ErrorMap, ValidatorError> {
        Ok(ErrorMap::new())
    }
}

fn odd_form(policy: MergePolicy) -> Form {
    Form::builder()
        .initial(json!({"n": 0}))
        .validator(odd_is_bad())
        .config(FormConfig::default().with_merge_policy(policy))
        .build()
}

// ═══════════════════════════════════════════════════════════════════════
// Field-level ordering
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn latest_request_wins_over_late_completion() {
    let form = odd_form(MergePolicy::LatestWins);
    let first = form.set_value("n", json!(1), SetValueOptions::default());
    let second = form.set_value("n", json!(2), SetValueOptions::default());

    assert!(block_on(second));
    assert!(form.field("n").is_validating());
    // The older request sees n = 1 and reports an error, which is dropped.
    assert!(!block_on(first));

    assert!(form.field("n").errors().is_empty());
    assert!(form.is_valid());
    assert!(!form.field("n").is_validating());
}

#[test]
fn last_write_wins_keeps_completion_order() {
    let form = odd_form(MergePolicy::LastWriteWins);
    let first = form.set_value("n", json!(1), SetValueOptions::default());
    let second = form.set_value("n", json!(2), SetValueOptions::default());

    assert!(block_on(second));
    assert!(!block_on(first));

    assert_eq!(form.field("n").errors(), vec!["n is odd"]);
}

#[test]
fn field_result_after_reset_is_discarded() {
    let gated = Rc::new(Gated::default());
    let form = Form::builder()
        .initial(json!({"n": 0}))
        .validator(GatedValidator(Rc::clone(&gated)))
        .build();
    let tx = gated.gate();

    let mut pending = form.validate_field("n");
    assert!((&mut pending).now_or_never().is_none());
    assert!(form.is_validating());

    form.reset();
    assert!(!form.is_validating());

    tx.send(vec!["late".into()]).unwrap();
    assert!(!block_on(pending));
    assert!(form.get_errors().is_empty());
    assert!(!form.field("n").was_validated());
}

#[test]
fn array_edit_discards_results_for_shifted_rows() {
    let gated = Rc::new(Gated::default());
    let form = Form::builder()
        .initial(json!({"items": ["a", "b"]}))
        .validator(GatedValidator(Rc::clone(&gated)))
        .config(FormConfig::default().with_validate_on_array_edit(false))
        .build();
    let tx = gated.gate();
    let b = form.field("items.1");

    let mut pending = form.validate_field("items.1");
    assert!((&mut pending).now_or_never().is_none());

    let _ = form.array_insert("items", 0, json!("z"));
    assert_eq!(b.path(), "items.2");

    tx.send(vec!["b is bad".into()]).unwrap();
    let _ = block_on(pending);
    assert!(form.get_errors().is_empty());
    assert!(b.errors().is_empty());
    assert!(!b.is_validating());
}

#[test]
fn abandoned_validator_is_a_success_for_the_field() {
    let gated = Rc::new(Gated::default());
    let form = Form::builder()
        .validator(GatedValidator(Rc::clone(&gated)))
        .build();
    let tx = gated.gate();
    form.set_field_errors("n", vec!["before".into()]);

    let pending = form.validate_field("n");
    drop(tx);

    assert!(block_on(pending));
    assert_eq!(form.field("n").errors(), vec!["before"]);
    assert!(form.field("n").was_validated());
}

// ═══════════════════════════════════════════════════════════════════════
// Form-level ordering
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn older_form_validation_is_dropped() {
    let form = odd_form(MergePolicy::LatestWins);
    let _ = form.set_value("n", json!(3), SetValueOptions::silent());
    let first = form.validate();
    let _ = form.set_value("n", json!(4), SetValueOptions::silent());
    let second = form.validate();

    assert!(block_on(second));
    assert!(form.is_validating());
    assert!(!block_on(first));
    assert!(form.is_valid());
    assert!(!form.is_validating());
}

#[test]
fn newer_field_result_survives_an_older_form_result() {
    let form = odd_form(MergePolicy::LatestWins);
    let _ = form.set_value("n", json!(3), SetValueOptions::silent());
    let whole = form.validate();
    let field = form.set_value("n", json!(4), SetValueOptions::default());

    assert!(block_on(field));
    assert!(!block_on(whole));
    assert!(form.field("n").errors().is_empty());
}

#[test]
fn older_field_result_cannot_override_a_newer_form_result() {
    let form = odd_form(MergePolicy::LatestWins);
    let _ = form.set_value("n", json!(3), SetValueOptions::silent());
    let field = form.validate_field("n");
    let _ = form.set_value("n", json!(4), SetValueOptions::silent());
    let whole = form.validate();

    assert!(block_on(whole));
    assert!(!block_on(field));
    assert!(form.is_valid());
}
