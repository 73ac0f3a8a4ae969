//! End-to-end runs of the generation pipeline

use pretty_assertions::assert_eq;
use std::path::Path;
use utgen_core::{CancellationToken, CompilationUnit};
use utgen_engine::{
    all_methods, select_named, ArtifactStrategy, ClassModel, ConfigError, FailureKind,
    GeneratorConfig, InMemoryProvider, MethodError, MethodOutcome, MethodStage, MethodUnderTest,
    Orchestrator, PartialResultPolicy, PipelineError, TempRetention, UnitProvider, MAX_BOUND,
};
use utgen_vm::{BuildBridge, LoadableUnit};

const CALC: &str = r#"
package demo;

public class Calc {
    public static int clamp(int x, int lo, int hi) {
        if (x < lo) {
            return lo;
        }
        if (x > hi) {
            return hi;
        }
        return x;
    }

    public static int sumTo(int n) {
        int total = 0;
        for (int i = 1; i <= n; i++) {
            total += i;
        }
        return total;
    }

    public static int answer() {
        return 42;
    }

    public static int risky(int x) {
        if (x > 100) {
            return 10 / (x - x);
        }
        return x;
    }

    public boolean accepts(Widget w, int limit) {
        return limit > 0;
    }
}
"#;

fn class() -> ClassModel {
    ClassModel::from_source(CALC).unwrap()
}

fn select(class: &ClassModel, names: &[&str]) -> Vec<MethodUnderTest> {
    let mut methods = all_methods(class);
    let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
    assert!(select_named(&mut methods, &names).is_empty());
    methods
}

fn in_memory() -> GeneratorConfig {
    GeneratorConfig {
        artifacts: ArtifactStrategy::InMemory,
        ..GeneratorConfig::with_bound(3)
    }
}

fn calls<'a>(source: &'a str, call: &str) -> Vec<Vec<&'a str>> {
    source
        .lines()
        .filter_map(|line| {
            let start = line.find(call)? + call.len();
            let end = start + line[start..].find(')')?;
            Some(line[start..end].split(", ").collect())
        })
        .collect()
}

#[test]
fn test_clamp_suite() {
    let class = class();
    let outcome = Orchestrator::new(in_memory())
        .unwrap()
        .generate(&class, &select(&class, &["clamp"]))
        .unwrap();

    assert_eq!(outcome.generated(), 3);
    assert_eq!(outcome.suite.class_name(), "CalcTest");
    let source = outcome.source();
    assert!(source.starts_with("package demo;\n"));
    assert!(source.contains("assertEquals(0, Calc.clamp(0, 0, 0));"));
    assert!(source.contains("public void test_clamp_1()"));
    assert!(source.contains("public void test_clamp_3()"));
    assert!(!source.contains("test_clamp_4"));

    let report = outcome.report.method("clamp").unwrap();
    assert_eq!(report.stage, MethodStage::Rendered);
    assert_eq!(report.outcome, MethodOutcome::Succeeded);
    assert_eq!(report.branch_probes, 2);
    assert_eq!(report.paths, 3);
    assert_eq!(report.generated, 3);
    assert_eq!(outcome.artifacts, None);
}

#[test]
fn test_inputs_match_parameter_list() {
    let class = class();
    let outcome = Orchestrator::new(in_memory())
        .unwrap()
        .generate(&class, &select(&class, &["clamp"]))
        .unwrap();

    let calls = calls(outcome.source(), "Calc.clamp(");
    assert_eq!(calls.len(), 3);
    for args in calls {
        assert_eq!(args.len(), 3);
        for arg in args {
            assert!(arg.parse::<i32>().is_ok(), "not an int literal: {}", arg);
        }
    }
}

#[test]
fn test_loop_unrolled_to_bound() {
    let class = class();
    let outcome = Orchestrator::new(in_memory())
        .unwrap()
        .generate(&class, &select(&class, &["sumTo"]))
        .unwrap();

    let report = outcome.report.method("sumTo").unwrap();
    assert!(report.rounds >= 2);
    assert_eq!(outcome.generated(), 4);
    let returns: Vec<&str> = outcome
        .source()
        .lines()
        .filter_map(|l| l.trim().strip_prefix("assertEquals("))
        .filter_map(|l| l.split(',').next())
        .collect();
    let mut returns = returns;
    returns.sort_unstable();
    assert_eq!(returns, vec!["0", "1", "3", "6"]);
}

#[test]
fn test_unsupported_parameter_isolated() {
    let class = class();
    let outcome = Orchestrator::new(in_memory())
        .unwrap()
        .generate(&class, &select(&class, &["clamp", "accepts"]))
        .unwrap();

    assert_eq!(outcome.report.methods.len(), 2);
    let accepts = outcome.report.method("accepts").unwrap();
    assert_eq!(accepts.stage, MethodStage::Selected);
    assert_eq!(accepts.outcome.failure_kind(), Some(FailureKind::UnsupportedType));
    assert_eq!(accepts.generated, 0);
    assert_eq!(outcome.report.succeeded(), 1);
    assert_eq!(outcome.generated(), 3);
    assert!(!outcome.source().contains("accepts"));
}

#[test]
fn test_method_without_parameters_skipped() {
    let class = class();
    let outcome = Orchestrator::new(in_memory())
        .unwrap()
        .generate(&class, &select(&class, &["clamp", "answer"]))
        .unwrap();

    let answer = outcome.report.method("answer").unwrap();
    assert_eq!(answer.final_stage(), MethodStage::Skipped);
    assert_eq!(outcome.report.skipped(), 1);
    assert!(!outcome.source().contains("answer"));
}

/// Loads a class that does not compile for one namespace
struct BrokenFor {
    namespace: &'static str,
    bridge: BuildBridge,
    inner: InMemoryProvider,
}

impl UnitProvider for BrokenFor {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn record_preprocessed(
        &self,
        unit: &CompilationUnit,
        dir: &Path,
    ) -> Result<Option<std::path::PathBuf>, MethodError> {
        self.inner.record_preprocessed(unit, dir)
    }

    fn load(&self, unit: &CompilationUnit, dir: &Path) -> Result<LoadableUnit, MethodError> {
        let package = unit.package.clone().unwrap_or_default();
        if !package.ends_with(self.namespace) {
            return self.inner.load(unit, dir);
        }
        let source = format!(
            "package {}; class {} {{ static int f() {{ return true; }} }}",
            package, unit.class.name
        );
        Ok(self.bridge.compile_in_memory(&unit.qualified_name(), &source)?)
    }
}

#[test]
fn test_compile_failure_isolated() {
    let class = class();
    let bridge = BuildBridge::new();
    let provider = BrokenFor {
        namespace: "m0_clamp",
        bridge: bridge.clone(),
        inner: InMemoryProvider::new(bridge),
    };
    let outcome = Orchestrator::new(in_memory())
        .unwrap()
        .with_provider(Box::new(provider))
        .generate(&class, &select(&class, &["clamp", "sumTo"]))
        .unwrap();

    let clamp = outcome.report.method("clamp").unwrap();
    assert_eq!(clamp.stage, MethodStage::Instrumented);
    match &clamp.outcome {
        MethodOutcome::Failed {
            kind, diagnostics, ..
        } => {
            assert_eq!(*kind, FailureKind::Compile);
            assert!(!diagnostics.is_empty());
        }
        other => panic!("expected a compile failure, got {:?}", other),
    }
    assert_eq!(outcome.report.method("sumTo").unwrap().outcome, MethodOutcome::Succeeded);
    assert_eq!(outcome.generated(), 4);
}

#[test]
fn test_rewrite_failure_isolated() {
    let class = class();
    let config = GeneratorConfig {
        max_rewrite_iterations: 1,
        ..in_memory()
    };
    let outcome = Orchestrator::new(config)
        .unwrap()
        .generate(&class, &select(&class, &["clamp", "sumTo"]))
        .unwrap();

    let sum = outcome.report.method("sumTo").unwrap();
    assert_eq!(sum.stage, MethodStage::Preprocessing);
    assert_eq!(sum.outcome.failure_kind(), Some(FailureKind::Rewrite));
    assert_eq!(outcome.generated(), 3);
}

#[test]
fn test_only_selected_methods_run() {
    let class = class();
    let mut methods = all_methods(&class);
    methods[1].set_selected(true);
    let outcome = Orchestrator::new(in_memory())
        .unwrap()
        .generate(&class, &methods)
        .unwrap();

    assert_eq!(outcome.report.methods.len(), 1);
    assert_eq!(outcome.report.methods[0].ordinal, 1);
    assert!(!outcome.source().contains("clamp"));
}

#[test]
fn test_partial_results_kept() {
    let class = class();
    let outcome = Orchestrator::new(in_memory())
        .unwrap()
        .generate(&class, &select(&class, &["clamp", "risky"]))
        .unwrap();

    let risky = outcome.report.method("risky").unwrap();
    assert_eq!(risky.outcome.failure_kind(), Some(FailureKind::Execution));
    assert_eq!(risky.stage, MethodStage::Executed);
    assert_eq!(risky.generated, 1);
    assert!(outcome.source().contains("assertEquals(0, Calc.risky(0));"));
    assert_eq!(outcome.generated(), 4);
}

#[test]
fn test_partial_results_discarded() {
    let class = class();
    let config = GeneratorConfig {
        partial_results: PartialResultPolicy::Discard,
        ..in_memory()
    };
    let outcome = Orchestrator::new(config)
        .unwrap()
        .generate(&class, &select(&class, &["clamp", "risky"]))
        .unwrap();

    let risky = outcome.report.method("risky").unwrap();
    assert_eq!(risky.outcome.failure_kind(), Some(FailureKind::Execution));
    assert_eq!(risky.generated, 0);
    assert!(!outcome.source().contains("Calc.risky("));
    assert_eq!(outcome.generated(), 3);
}

#[test]
fn test_all_methods_failed() {
    let class = class();
    let err = Orchestrator::new(in_memory())
        .unwrap()
        .generate(&class, &select(&class, &["accepts"]))
        .unwrap_err();
    match err {
        PipelineError::AllMethodsFailed { report } => {
            assert_eq!(report.failed(), 1);
            assert_eq!(report.generated, 0);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_keep_temp_directory() {
    let root = tempfile::tempdir().unwrap();
    let config = GeneratorConfig {
        retention: TempRetention::KeepTemp,
        temp_root: Some(root.path().to_path_buf()),
        ..GeneratorConfig::with_bound(3)
    };
    let class = class();
    let outcome = Orchestrator::new(config)
        .unwrap()
        .generate(&class, &select(&class, &["clamp"]))
        .unwrap();

    let run_dir = outcome.artifacts.expect("run directory kept");
    assert!(run_dir.starts_with(root.path()));
    let method_dir = run_dir.join("m0_clamp");
    let preprocessed = method_dir.join("preprocess/demo/instrumented/m0_clamp/Calc.java");
    assert!(preprocessed.is_file());
    let text = std::fs::read_to_string(&preprocessed).unwrap();
    assert!(text.contains("package demo.instrumented.m0_clamp;"));
    assert!(method_dir
        .join("compiled/demo/instrumented/m0_clamp/Calc.java")
        .is_file());
}

#[test]
fn test_delete_temp_directory() {
    let root = tempfile::tempdir().unwrap();
    let config = GeneratorConfig {
        temp_root: Some(root.path().to_path_buf()),
        ..GeneratorConfig::with_bound(3)
    };
    let class = class();
    let outcome = Orchestrator::new(config)
        .unwrap()
        .generate(&class, &select(&class, &["clamp"]))
        .unwrap();

    assert_eq!(outcome.artifacts, None);
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    assert_eq!(outcome.generated(), 3);
}

#[test]
fn test_rerun_supersedes_loaded_units() {
    let class = class();
    let methods = select(&class, &["clamp"]);
    let orchestrator = Orchestrator::new(in_memory()).unwrap();
    let name = "demo.instrumented.m0_clamp.Calc";

    orchestrator.generate(&class, &methods).unwrap();
    let first = orchestrator.loader().current_revision(name).unwrap();
    let again = orchestrator.generate(&class, &methods).unwrap();
    let second = orchestrator.loader().current_revision(name).unwrap();

    assert!(second > first);
    assert_eq!(again.generated(), 3);
}

#[test]
fn test_cancelled_before_run() {
    let class = class();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = Orchestrator::new(in_memory())
        .unwrap()
        .with_cancellation(cancel)
        .generate(&class, &select(&class, &["clamp", "sumTo"]))
        .unwrap_err();
    assert!(matches!(err, PipelineError::Cancelled));
}

#[test]
fn test_nothing_selected() {
    let class = class();
    let err = Orchestrator::new(in_memory())
        .unwrap()
        .generate(&class, &all_methods(&class))
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoMethodSelected));
}

#[test]
fn test_method_of_another_class() {
    let class = class();
    let other = ClassModel::from_source("package demo; class Other { static int id(int x) { return x; } }")
        .unwrap();
    let mut foreign = all_methods(&other);
    foreign[0].set_selected(true);
    let err = Orchestrator::new(in_memory())
        .unwrap()
        .generate(&class, &foreign)
        .unwrap_err();
    match err {
        PipelineError::UnknownMethod { class, signature } => {
            assert_eq!(class, "demo.Calc");
            assert_eq!(signature, "id(int)");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_parallel_run_is_deterministic() {
    let class = class();
    let methods = select(&class, &["clamp", "sumTo", "risky"]);
    let sequential = Orchestrator::new(in_memory()).unwrap().generate(&class, &methods).unwrap();
    let parallel = Orchestrator::new(GeneratorConfig { jobs: 3, ..in_memory() })
        .unwrap()
        .generate(&class, &methods)
        .unwrap();

    assert_eq!(parallel.source(), sequential.source());
    let ordinals: Vec<usize> = parallel.report.methods.iter().map(|m| m.ordinal).collect();
    assert_eq!(ordinals, vec![0, 1, 3]);
}

const COUNTER: &str = r#"
package demo;

public class Counter {
    public static int countDown(int x) {
        int steps = 0;
        while (x > 0) {
            x = x - 1;
            steps++;
        }
        return steps;
    }
}
"#;

fn expected_and_args<'a>(source: &'a str, call: &str) -> Vec<(i64, Vec<&'a str>)> {
    source
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("assertEquals(")?;
            let expected = rest.split(',').next()?.trim_end_matches('L').parse().ok()?;
            let start = rest.find(call)? + call.len();
            let end = start + rest[start..].find(')')?;
            Some((expected, rest[start..end].split(", ").collect()))
        })
        .collect()
}

#[test]
fn test_large_bound_unrolls_and_runs() {
    let class = ClassModel::from_source(COUNTER).unwrap();
    let mut config = GeneratorConfig {
        artifacts: ArtifactStrategy::InMemory,
        ..GeneratorConfig::with_bound(300)
    };
    config.solver.max_paths = 8;
    let outcome = Orchestrator::new(config)
        .unwrap()
        .generate(&class, &select(&class, &["countDown"]))
        .unwrap();

    let report = outcome.report.method("countDown").unwrap();
    assert_eq!(report.outcome, MethodOutcome::Succeeded);
    assert!(outcome.generated() > 1);
    let cases = expected_and_args(outcome.source(), "Counter.countDown(");
    assert_eq!(cases.len(), outcome.generated());
    for (expected, args) in cases {
        assert_eq!(args.len(), 1);
        let x: i64 = args[0].parse().unwrap();
        assert_eq!(expected, x.max(0));
    }
}

#[test]
fn test_bound_beyond_limit_rejected() {
    assert!(matches!(
        Orchestrator::new(GeneratorConfig::with_bound(MAX_BOUND + 1)),
        Err(PipelineError::Config(ConfigError::BoundTooLarge { .. }))
    ));
}

const LIMITS: &str = r#"
package demo;

public class Limits {
    public int clamp(int x) {
        while (x > 100) {
            x = x - 50;
        }
        return x;
    }
}
"#;

#[test]
fn test_single_parameter_loop_method() {
    let class = ClassModel::from_source(LIMITS).unwrap();
    let outcome = Orchestrator::new(in_memory())
        .unwrap()
        .generate(&class, &select(&class, &["clamp"]))
        .unwrap();

    // No iteration, then one case per unrolled copy; more iterations exceed k = 3
    assert_eq!(outcome.generated(), 4);
    let source = outcome.source();
    for n in 1..=4 {
        assert!(source.contains(&format!("public void test_clamp_{}()", n)));
    }
    assert!(!source.contains("test_clamp_5"));

    let cases = expected_and_args(source, "new Limits().clamp(");
    assert_eq!(cases.len(), 4);
    let mut iterations = Vec::new();
    for (expected, args) in cases {
        assert_eq!(args.len(), 1);
        let mut x: i64 = args[0].parse().unwrap();
        let mut n = 0;
        while x > 100 {
            x -= 50;
            n += 1;
        }
        assert_eq!(expected, x);
        iterations.push(n);
    }
    iterations.sort_unstable();
    assert_eq!(iterations, vec![0, 1, 2, 3]);
}

#[test]
fn test_sibling_scopes_reuse_local_name() {
    let class = ClassModel::from_source(
        r#"
        package demo;
        public class Mixed {
            public static long mix(int n) {
                long s = 0L;
                for (int i = 0; i < n; i++) { s += i; }
                for (long i = 0L; i < 2L; i++) { s += i; }
                return s;
            }
        }
        "#,
    )
    .unwrap();
    let outcome = Orchestrator::new(in_memory())
        .unwrap()
        .generate(&class, &select(&class, &["mix"]))
        .unwrap();

    let report = outcome.report.method("mix").unwrap();
    assert_eq!(report.outcome, MethodOutcome::Succeeded);
    // n <= 0, then one case per unrolled copy of the first loop
    assert_eq!(outcome.generated(), 4);
    let cases = expected_and_args(outcome.source(), "Mixed.mix(");
    assert_eq!(cases.len(), 4);
    for (expected, args) in cases {
        let n: i64 = args[0].parse().unwrap();
        assert_eq!(expected, (0..n.max(0)).sum::<i64>() + 1);
    }
}
