use predicates::str::{contains, diff};
use std::time::Duration;

#[test]
fn summary_baseline_is_stable() {
    let expected = concat!(
        "Metadata:\n",
        "mode: virtual\n",
        "jitter: zero\n",
        "base_users: 10\n",
        "multiplier: 1x\n",
        "tick_rate_ms: 1000\n",
        "Summary:\n",
        "ticks: 3\n",
        "avg_response: 52ms\n",
        "p95_response: 52ms\n",
        "p99_response: 52ms\n",
        "peak_response: 52ms\n",
        "peak_error_rate: 0.10%\n",
        "peak_cpu: 3%\n",
        "peak_memory: 3%\n",
        "avg_throughput: 20\n",
        "bottlenecks_triggered: none\n",
        "Final:\n",
        "status: healthy\n",
        "stress: normal\n",
        "active_bottlenecks: none\n",
        "next_bottleneck_at: 500\n",
    );

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("scale-sim");
    cmd.args([
        "run", "--ticks", "3", "--jitter", "zero", "--format", "summary",
    ]);
    cmd.assert().success().stdout(diff(expected));
}

#[test]
fn human_output_lists_every_tick() {
    let expected = concat!(
        "Metadata:\n",
        "mode: virtual\n",
        "jitter: zero\n",
        "base_users: 10\n",
        "multiplier: 100x\n",
        "tick_rate_ms: 1000\n",
        "Ticks:\n",
        "#1 users=950 rps=1900 latency=13958ms errors=50.00% cpu=100% mem=100% throughput=81 status=critical bottlenecks=db-connections,no-cache\n",
        "#2 users=950 rps=1900 latency=13958ms errors=50.00% cpu=100% mem=100% throughput=81 status=critical bottlenecks=db-connections,no-cache\n",
        "Summary:\n",
        "ticks: 2\n",
        "avg_response: 13958ms\n",
        "p95_response: 13958ms\n",
        "p99_response: 13958ms\n",
        "peak_response: 13958ms\n",
        "peak_error_rate: 50.00%\n",
        "peak_cpu: 100%\n",
        "peak_memory: 100%\n",
        "avg_throughput: 81\n",
        "bottlenecks_triggered: db-connections,no-cache\n",
        "Final:\n",
        "status: critical\n",
        "stress: warning\n",
        "active_bottlenecks: db-connections,no-cache\n",
        "next_bottleneck_at: 1000\n",
    );

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("scale-sim");
    cmd.args([
        "run",
        "--multiplier",
        "100",
        "--ticks",
        "2",
        "--jitter",
        "zero",
    ]);
    cmd.assert().success().stdout(diff(expected));
}

#[test]
fn json_output_carries_snapshot_contract() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("scale-sim");
    cmd.args([
        "run", "--ticks", "2", "--jitter", "zero", "--format", "json",
    ]);
    let output = cmd.output().expect("command should run");
    assert!(output.status.success());

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(report["metadata"]["mode"], "virtual");
    assert_eq!(report["summary"]["ticks"], 2);
    assert_eq!(report["samples"].as_array().map(Vec::len), Some(2));
    assert_eq!(report["samples"][0]["metrics"]["responseTime"], 52);
    assert_eq!(report["samples"][0]["metrics"]["activeUsers"], 10);

    let snapshot = &report["finalSnapshot"];
    assert_eq!(snapshot["config"]["userMultiplier"], 1);
    assert_eq!(snapshot["config"]["tickRate"], 1000);
    assert_eq!(snapshot["config"]["isPaused"], false);
    assert_eq!(snapshot["history"].as_array().map(Vec::len), Some(2));
    assert_eq!(snapshot["allBottlenecks"].as_array().map(Vec::len), Some(5));
    assert_eq!(snapshot["allBottlenecks"][0]["triggersAt"], 500);
    assert_eq!(snapshot["allBottlenecks"][0]["severity"], "medium");
    assert_eq!(snapshot["status"], "healthy");

    let history = snapshot["history"].as_array().expect("history array");
    let first = history[0]["timestamp"].as_u64().expect("timestamp");
    let second = history[1]["timestamp"].as_u64().expect("timestamp");
    assert_eq!(second - first, 1000);
}

#[test]
fn seeded_runs_are_repeatable() {
    let run = || {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("scale-sim");
        cmd.args(["run", "--ticks", "5", "--seed", "42", "--multiplier", "50"]);
        let output = cmd.output().expect("command should run");
        assert!(output.status.success());
        output.stdout
    };
    let first = String::from_utf8(run()).expect("utf8 output");
    assert!(first.contains("jitter: seeded(42)"));
    assert_eq!(first, String::from_utf8(run()).expect("utf8 output"));
}

#[test]
fn realtime_run_stops_after_requested_ticks() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("scale-sim");
    cmd.args([
        "run",
        "--realtime",
        "--ticks",
        "2",
        "--tick-rate-ms",
        "10",
        "--jitter",
        "zero",
    ]);
    cmd.write_stdin("");
    cmd.assert()
        .success()
        .stdout(contains("#1 users=10 rps=20 latency=52ms"))
        .stdout(contains("#2 users=10"))
        .stdout(contains("mode: realtime"))
        .stdout(contains("ticks: 2\n"));
}

#[test]
fn realtime_json_stream_is_one_document_per_line() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("scale-sim");
    cmd.args([
        "run",
        "--realtime",
        "--ticks",
        "2",
        "--tick-rate-ms",
        "10",
        "--jitter",
        "zero",
        "--format",
        "json",
    ]);
    cmd.write_stdin("");
    let output = cmd.output().expect("command should run");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("utf8 output");
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be JSON"))
        .collect();
    let last = events.last().expect("at least one line");
    assert_eq!(last["event"], "report");
    assert_eq!(last["report"]["summary"]["ticks"], 2);
    let ticks = events.iter().filter(|event| event["event"] == "tick").count();
    assert_eq!(ticks, 2);
}

#[test]
fn realtime_exits_when_stdin_closes_while_paused() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("scale-sim");
    cmd.args([
        "run",
        "--realtime",
        "--ticks",
        "5",
        "--jitter",
        "zero",
        "--format",
        "summary",
    ]);
    cmd.write_stdin("pause\n");
    cmd.timeout(Duration::from_secs(10));
    cmd.assert()
        .success()
        .stdout(contains("mode: realtime"))
        .stdout(contains("ticks: 1\n"));
}
