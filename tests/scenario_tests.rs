//! End-to-end scenario runs through the public API.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use drt_harness::logger::jsonl::{JsonlConfig, JsonlWriter};
use drt_harness::prelude::*;
use proptest::prelude::*;

fn quick_settings() -> RunSettings {
    RunSettings {
        default_wait: Duration::from_millis(50),
        pump_slice: Duration::from_millis(5),
        ..RunSettings::default()
    }
}

/// `[Init -> Pass, Animate -> Pass, Verify(actual, Red)]`
fn animation_scenario(actual: Color) -> Scenario {
    let element = Tagged::for_test(PropertyBag::new());
    element.set_value("Fill", Color::WHITE);
    let (init_el, anim_el, verify_el) = (element.clone(), element.clone(), element);

    Scenario::builder("RectangleFill")
        .area("Shapes.Rectangle")
        .initialize("Init", move |ctx| {
            ctx.status("rectangle created");
            Ok(StepOutcome::check(init_el.is_test(), "element not tagged"))
        })
        .step("Animate", move |ctx| {
            let (target, handle) = (anim_el.clone(), ctx.handle());
            ctx.post_after(Duration::from_millis(10), move || {
                target.set_value("Fill", actual);
                handle.signal("AnimationCompleted", TestResult::Pass);
            });
            ctx.expect_signal("AnimationCompleted", Duration::from_secs(2))
        })
        .step("Verify", move |ctx| {
            ctx.verify_property(&verify_el, "Fill", Color::RED, "Fill");
            Ok(StepOutcome::Pass)
        })
        .build()
}

#[test]
fn red_fill_passes() {
    let mut sink = MemorySink::default();
    let mut scenario = animation_scenario(Color::RED);
    let status = Sequencer::with_settings(quick_settings())
        .run(&mut scenario, &mut sink)
        .unwrap();
    assert_eq!(status, FinalStatus::Passed);
    assert_eq!(
        sink.verdicts(),
        vec![("RectangleFill".to_string(), Verdict::Pass)]
    );
    assert!(
        sink.evidence_for("RectangleFill")
            .contains(&"Fill -- Act: Red / Exp: Red [PASS]")
    );
}

#[test]
fn blue_fill_fails_with_act_exp_evidence() {
    let mut sink = MemorySink::default();
    let mut scenario = animation_scenario(Color::BLUE);
    let status = Sequencer::with_settings(quick_settings())
        .run(&mut scenario, &mut sink)
        .unwrap();
    assert_eq!(status.verdict(), Verdict::Fail);
    assert!(status.diagnostic().unwrap().contains("Act: Blue / Exp: Red"));
    assert_eq!(scenario.status(), ScenarioStatus::Failed);
}

#[test]
fn unsignalled_wait_fails_with_timeout_message() {
    let mut sink = MemorySink::default();
    let mut scenario = Scenario::builder("Stalled")
        .step("Wait", |ctx| {
            ctx.wait_default("TestFinished")?;
            Ok(StepOutcome::Pass)
        })
        .step("After", |_| Ok(StepOutcome::fail("must be skipped")))
        .build();
    let report = Sequencer::with_settings(quick_settings())
        .execute(&mut scenario, &mut sink)
        .unwrap();
    match &report.outcome {
        FinalStatus::Failed {
            step,
            cause,
            diagnostic,
        } => {
            assert_eq!(step, "Wait");
            assert_eq!(*cause, FailureCause::Timeout);
            assert!(diagnostic.contains("timed out waiting for signal TestFinished"));
        }
        FinalStatus::Passed => panic!("expected timeout"),
    }
    assert!(
        sink.evidence_for("Stalled")
            .contains(&"step After: skipped")
    );
}

#[test]
fn signal_verdict_round_trips_through_wait() {
    let mut sink = MemorySink::default();
    let mut scenario = Scenario::builder("Cumulative")
        .step("Checks", |ctx| {
            ctx.verify(1, 1, "Count");
            ctx.verify(90.0, 90.000_000_1, "Angle");
            ctx.signal_verdict("VerifyResults");
            ctx.expect_signal("VerifyResults", Duration::from_millis(50))
        })
        .build();
    let status = Sequencer::with_settings(quick_settings())
        .run(&mut scenario, &mut sink)
        .unwrap();
    assert!(status.is_pass());
}

#[test]
fn expectation_table_reports_every_row() {
    let element = PropertyBag::new();
    element.set_value("Width", 160);
    element.set_value("Text", "Animation");
    let table = ExpectationTable::new()
        .expect("Width", 200)
        .expect("Text", "Animation");

    let mut sink = MemorySink::default();
    let mut scenario = Scenario::builder("Table")
        .step("Verify", move |ctx| {
            ctx.verify_table(&element, &table, "TextBox");
            Ok(StepOutcome::Pass)
        })
        .build();
    let status = Sequencer::with_settings(quick_settings())
        .run(&mut scenario, &mut sink)
        .unwrap();
    assert_eq!(status.verdict(), Verdict::Fail);
    let evidence = sink.evidence_for("Table");
    assert!(evidence.contains(&"TextBox.Width -- Act: 160 / Exp: 200 [FAIL]"));
    assert!(evidence.contains(&"TextBox.Text -- Act: Animation / Exp: Animation [PASS]"));
}

#[test]
fn jsonl_transcript_records_batch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.jsonl");
    let writer = JsonlWriter::open(JsonlConfig {
        path: path.clone(),
        fallback_path: None,
        max_size_bytes: 1024 * 1024,
        max_rotated_files: 2,
    });
    let mut sink = JsonlSink::new(writer);

    let mut suite = Suite::new();
    suite.register_variations("Fill", "Shapes", 0, ["Red", "Blue"], |b| {
        let actual: Color = b
            .current_variation()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Color::BLACK);
        b.step("Verify", move |ctx| {
            ctx.verify(actual, Color::RED, "Fill");
            Ok(StepOutcome::Pass)
        })
        .build()
    });
    let report = suite.run(&Config::default(), &mut sink, None).unwrap();
    drop(sink);
    assert_eq!((report.passed, report.failed), (1, 1));

    let raw = std::fs::read_to_string(&path).unwrap();
    let events: Vec<serde_json::Value> = raw
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(events.first().unwrap()["event"], "batch_start");
    assert_eq!(events.last().unwrap()["event"], "batch_summary");
    let verdicts: Vec<&serde_json::Value> = events
        .iter()
        .filter(|e| e["event"] == "scenario_result")
        .map(|e| &e["verdict"])
        .collect();
    assert_eq!(verdicts, vec!["pass", "fail"]);
    assert!(raw.contains("Act: Blue / Exp: Red"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Steps run in declared order and nothing runs after the first failure.
    #[test]
    fn steps_run_in_order_and_stop_at_first_failure(
        outcomes in prop::collection::vec(0u8..3, 1..12)
    ) {
        let ran = Rc::new(RefCell::new(Vec::new()));
        let mut builder = Scenario::builder("Ordered");
        for (i, kind) in outcomes.iter().copied().enumerate() {
            let ran = Rc::clone(&ran);
            builder = builder.step(format!("s{i}"), move |_| {
                ran.borrow_mut().push(i);
                Ok(match kind {
                    0 => StepOutcome::Pass,
                    1 => StepOutcome::skip("n/a"),
                    _ => StepOutcome::fail("boom"),
                })
            });
        }
        let mut scenario = builder.build();
        let mut sink = MemorySink::default();
        let status = Sequencer::with_settings(quick_settings())
            .run(&mut scenario, &mut sink)
            .unwrap();

        let first_fail = outcomes.iter().position(|&k| k == 2);
        let expected: Vec<usize> = match first_fail {
            Some(idx) => (0..=idx).collect(),
            None => (0..outcomes.len()).collect(),
        };
        prop_assert_eq!(&*ran.borrow(), &expected);
        prop_assert_eq!(status.is_pass(), first_fail.is_none());
    }
}
