use std::{
    env,
    fs,
    path::PathBuf,
    process::Command,
};

fn norm_newlines(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "")
}

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../fixtures/sample_4k.osu")
}

#[test]
fn inspect_success_writes_output_json() {
    let exe = env!("CARGO_BIN_EXE_osu_cli");

    let dir = env::temp_dir().join(format!("osu_cli_inspect_success_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let output_path = dir.join("out.json");

    let out = Command::new(exe)
        .args([
            "inspect",
            fixture().to_str().unwrap(),
            "-o",
            output_path.to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert!(out.status.success());
    assert!(output_path.exists());

    let json = fs::read_to_string(&output_path).unwrap();
    let v: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(v.get("meta").is_some());
    assert_eq!(v["meta"]["title"], "Sample Song");
    assert_eq!(v["difficulties"].as_array().map(|d| d.len()), Some(1));
    assert_eq!(v["difficulties"][0]["playfield"]["columns"].as_array().map(|c| c.len()), Some(4));
}

#[test]
fn inspect_directory_loads_every_chart() {
    let exe = env!("CARGO_BIN_EXE_osu_cli");

    let dir = env::temp_dir().join(format!("osu_cli_inspect_directory_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();

    let chart = fs::read_to_string(fixture()).unwrap();
    fs::write(dir.join("a.osu"), &chart).unwrap();
    fs::write(dir.join("b.osu"), chart.replace("Version:Normal", "Version:Hard")).unwrap();
    fs::write(dir.join("broken.osu"), "not a chart\n").unwrap();
    fs::write(dir.join("audio.mp3"), b"").unwrap();

    let out = Command::new(exe)
        .args(["inspect", dir.to_str().unwrap(), "--parallel"])
        .output()
        .unwrap();

    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let names: Vec<&str> = v["difficulties"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Normal", "Hard"]);

    let stderr = norm_newlines(&String::from_utf8_lossy(&out.stderr));
    assert!(stderr.contains("E1001"));
}

#[test]
fn inspect_missing_input_fails() {
    let exe = env!("CARGO_BIN_EXE_osu_cli");

    let missing = env::temp_dir().join(format!("osu_cli_missing_input_{}.osu", std::process::id()));
    let _ = fs::remove_file(&missing);

    let output = Command::new(exe)
        .args(["inspect", missing.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));

    let stderr = norm_newlines(&String::from_utf8_lossy(&output.stderr));
    assert!(stderr.contains("Error: load failed: "));
    assert!(stderr.contains("Caused by:"));
    assert!(stderr.contains("failed to read:"));
}

#[test]
fn inspect_invalid_chart_reports_error_code() {
    let exe = env!("CARGO_BIN_EXE_osu_cli");

    let tmp = env::temp_dir().join(format!("osu_cli_invalid_chart_{}.osu", std::process::id()));
    fs::write(&tmp, "[General]\nAudioFilename: a.mp3\n").unwrap();

    let output = Command::new(exe)
        .args(["inspect", tmp.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));

    let stderr = norm_newlines(&String::from_utf8_lossy(&output.stderr));
    assert!(stderr.contains("Error: load failed: "));
    assert!(stderr.contains("E5001"));
    assert!(stderr.contains("E1001"));
}

#[test]
fn osz_archives_are_reported_unsupported() {
    let exe = env!("CARGO_BIN_EXE_osu_cli");

    let tmp = env::temp_dir().join(format!("osu_cli_archive_{}.osz", std::process::id()));
    fs::write(&tmp, b"PK").unwrap();

    let output = Command::new(exe)
        .args(["inspect", tmp.to_str().unwrap()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = norm_newlines(&String::from_utf8_lossy(&output.stderr));
    assert!(stderr.contains(".osz archives are not supported"));
}

#[test]
fn inspect_output_write_failure_is_reported_stably() {
    let exe = env!("CARGO_BIN_EXE_osu_cli");

    let dir = env::temp_dir().join(format!("osu_cli_write_failure_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();

    let missing_parent = dir.join(format!("missing_dir_{}", std::process::id()));
    let _ = fs::remove_dir_all(&missing_parent);
    let output_path = missing_parent.join("out.json");

    let out = Command::new(exe)
        .args([
            "inspect",
            fixture().to_str().unwrap(),
            "-o",
            output_path.to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(1));
    let stderr = norm_newlines(&String::from_utf8_lossy(&out.stderr));
    assert!(stderr.contains("Error: failed to write:"));
    assert!(stderr.contains("out.json"));
    assert!(stderr.contains("Caused by:"));
}

#[test]
fn simulate_prints_timeline() {
    let exe = env!("CARGO_BIN_EXE_osu_cli");

    let out = Command::new(exe)
        .args(["simulate", fixture().to_str().unwrap()])
        .output()
        .unwrap();

    assert!(out.status.success());
    let stdout = norm_newlines(&String::from_utf8_lossy(&out.stdout));
    assert!(stdout.contains("Simulation of [Normal] (4 columns, 5 objects)"));
    assert!(stdout.contains("Time(ms)"));
    assert!(stdout.contains("BPM: 120.0 4/4"));
    assert!(stdout.contains("break start"));

    let hold_row = stdout
        .lines()
        .find(|l| l.trim_start().starts_with("1000 |"))
        .unwrap();
    assert!(hold_row.contains(". . H ."));
}

#[test]
fn simulate_marks_events_sharing_a_millisecond() {
    let exe = env!("CARGO_BIN_EXE_osu_cli");

    // column 2: a tap on the hold's last millisecond, then a lone tap later
    let chart = fs::read_to_string(fixture()).unwrap().replace(
        "64,192,3500,1,0,0:0:0:0:",
        "320,192,1500,1,0,0:0:0:0:\n64,192,3500,1,0,0:0:0:0:",
    );
    let tmp = env::temp_dir().join(format!("osu_cli_simulate_overlap_{}.osu", std::process::id()));
    fs::write(&tmp, chart).unwrap();

    let out = Command::new(exe)
        .args(["simulate", tmp.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(out.status.success());
    let stdout = norm_newlines(&String::from_utf8_lossy(&out.stdout));
    let row = |ms: &str| {
        stdout
            .lines()
            .find(|l| l.trim_start().starts_with(&format!("{ms} |")))
            .unwrap()
            .to_string()
    };

    assert!(row("1500").contains(". . * ."));
    // the hold is closed even though a tap shares its end
    assert!(row("2000").contains(". . . ."));
}

#[test]
fn inspect_meta_only_leaves_chart_body_empty() {
    let exe = env!("CARGO_BIN_EXE_osu_cli");

    let out = Command::new(exe)
        .args(["inspect", fixture().to_str().unwrap(), "--meta-only"])
        .output()
        .unwrap();

    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["meta"]["title"], "Sample Song");
    let d = &v["difficulties"][0];
    assert_eq!(d["name"], "Normal");
    assert_eq!(d["timing_points"].as_array().map(|t| t.len()), Some(0));
    assert_eq!(d["hit_objects"].as_array().map(|h| h.len()), Some(0));
    assert_eq!(d["playfield"]["columns"].as_array().map(|c| c.len()), Some(0));
}

#[test]
fn simulate_rejects_out_of_range_difficulty() {
    let exe = env!("CARGO_BIN_EXE_osu_cli");

    let out = Command::new(exe)
        .args(["simulate", fixture().to_str().unwrap(), "-d", "3"])
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(1));
    let stderr = norm_newlines(&String::from_utf8_lossy(&out.stderr));
    assert!(stderr.contains("difficulty index 3 out of range (set has 1)"));
}

#[test]
fn help_mentions_subcommands() {
    let exe = env!("CARGO_BIN_EXE_osu_cli");

    let output = Command::new(exe).arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = norm_newlines(&String::from_utf8_lossy(&output.stdout));
    assert!(stdout.contains("inspect"));
    assert!(stdout.contains("simulate"));
}
