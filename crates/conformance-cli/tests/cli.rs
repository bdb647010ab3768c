//! Argument parsing and option building for the CLI

use std::time::Duration;

use clap::Parser;

use conformance_cli::commands::run::RunArgs;
use conformance_cli::{Cli, Commands, Error};
use conformance_common::telemetry::LogFormat;
use conformance_suite::cases;

fn parse(args: &[&str]) -> Cli {
    let mut argv = vec!["inference-conformance"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

fn run_args(args: &[&str]) -> RunArgs {
    let mut argv = vec!["run", "--controller-name", "example.com/gateway"];
    argv.extend_from_slice(args);
    match parse(&argv).command {
        Commands::Run(args) => args,
        other => panic!("Expected run command, got {other:?}"),
    }
}

#[test]
fn run_defaults_match_engine_defaults() {
    let args = run_args(&[]);
    let timeouts = args.timeouts.to_config().unwrap();
    assert_eq!(timeouts, conformance_common::TimeoutConfig::default());

    let options = args.runner_options(&cases::registry()).unwrap();
    assert!(options.cleanup);
    assert_eq!(
        options.base_manifests,
        vec!["resources/manifests/manifests.yaml".to_string()]
    );
    assert_eq!(options.manifest_dir, std::path::PathBuf::from("conformance"));
    assert!(args.features().unwrap().is_empty());
}

#[test]
fn run_requires_controller_name() {
    let err = Cli::try_parse_from(["inference-conformance", "run"]).unwrap_err();
    assert!(err.to_string().contains("--controller-name"));
}

#[test]
fn timeout_flags_override_one_class() {
    let args = run_args(&[
        "--pool-timeout-secs",
        "60",
        "--pool-interval-secs",
        "2",
        "--settle-delay-ms",
        "250",
        "--request-timeout-secs",
        "3",
    ]);
    let timeouts = args.timeouts.to_config().unwrap();
    assert_eq!(timeouts.pool_condition.timeout, Duration::from_secs(60));
    assert_eq!(timeouts.pool_condition.poll_interval, Duration::from_secs(2));
    assert_eq!(timeouts.settle_delay, Duration::from_millis(250));
    assert_eq!(timeouts.request_timeout, Duration::from_secs(3));
    assert_eq!(timeouts.route_condition.timeout, Duration::from_secs(60));
    assert_eq!(timeouts.gateway_condition.timeout, Duration::from_secs(180));
}

#[test]
fn zero_poll_interval_is_rejected() {
    let args = run_args(&["--route-interval-secs", "0"]);
    let err = args.timeouts.to_config().unwrap_err();
    assert!(matches!(err, Error::Conformance(_)));
    assert!(err.to_string().contains("poll interval"));
}

#[test]
fn overflowing_timeout_is_rejected() {
    let args = run_args(&["--pool-timeout-secs", "18446744073709551615"]);
    let err = args.timeouts.to_config().unwrap_err();
    assert!(err.to_string().contains("exceeds the maximum"));
}

#[test]
fn features_are_checked_against_known_names() {
    let args = run_args(&["--supported-features", "SupportInferenceModel,SupportInferencePool"]);
    let features = args.features().unwrap();
    assert!(features.contains("SupportInferenceModel"));
    assert_eq!(features.len(), 2);

    let args = run_args(&["--supported-features", "SupportTeleport"]);
    let err = args.features().unwrap_err();
    assert!(err.to_string().contains("unknown features: SupportTeleport"));

    let args = run_args(&["--all-features"]);
    assert_eq!(args.features().unwrap().len(), 2);
}

#[test]
fn test_selection_flags_build_runner_options() {
    let args = run_args(&[
        "--skip-test",
        "InferencePoolStatusNoMatchingPods,InferenceModelAccepted",
        "--run-test",
        "InferencePoolResolvedRefsCondition",
        "--no-cleanup",
        "--base-manifest",
        "a.yaml",
        "--base-manifest",
        "b.yaml",
    ]);
    let options = args.runner_options(&cases::registry()).unwrap();
    assert_eq!(options.skip_tests.len(), 2);
    assert_eq!(
        options.run_test.as_deref(),
        Some("InferencePoolResolvedRefsCondition")
    );
    assert!(!options.cleanup);
    assert_eq!(options.base_manifests, vec!["a.yaml", "b.yaml"]);
}

#[test]
fn unknown_test_name_is_rejected() {
    let args = run_args(&["--run-test", "NoSuchTest"]);
    let err = args.runner_options(&cases::registry()).unwrap_err();
    assert!(err.to_string().contains("unknown test: NoSuchTest"));
}

#[test]
fn log_format_is_global() {
    let cli = parse(&["list", "--log-format", "json", "--verbose"]);
    assert_eq!(cli.log_format, LogFormat::Json);
    match cli.command {
        Commands::List(args) => assert!(args.verbose),
        other => panic!("Expected list command, got {other:?}"),
    }

    assert!(Cli::try_parse_from(["inference-conformance", "--log-format", "xml", "list"]).is_err());
}

/// Full run against the cluster in the current kubeconfig context
///
/// Requires the implementation under test and the conformance manifests;
/// set CONFORMANCE_CONTROLLER_NAME and CONFORMANCE_MANIFEST_DIR.
#[tokio::test]
#[ignore]
async fn conformance_run_against_cluster() {
    let cli = parse(&["run"]);
    cli.run().await.unwrap();
}
