use chatset_convert::{convert_file, ConvertError, ConvertJob, ConvertOptions, RoleMap};
use chatset_types::{FallbackPolicy, TargetFormat};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

fn write_json(path: &Path, value: &Value) {
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn mixed_dataset() -> Value {
    json!([
        {"messages": [
            {"role": "system", "content": "You are a tool assistant."},
            {"role": "user", "content": [
                {"type": "text", "text": "What is this?"},
                {"type": "image_url", "image_url": "http://x/y.jpg"}
            ]},
            {"role": "assistant", "content": "A wrench."}
        ]},
        {"conversations": [
            {"from": "human", "value": "Hello"},
            {"from": "gpt", "value": "Hi"}
        ]},
        {"messages": [{"role": "user", "content": "never answered"}]}
    ])
}

#[test]
fn converts_mixed_dataset_to_alpaca() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("dataset.json");
    let output = dir.path().join("alpaca_data_cleaned.json");
    write_json(&input, &mixed_dataset());

    let options = ConvertOptions::for_target(TargetFormat::Alpaca);
    let report = convert_file(&ConvertJob::new(&input, &output), &options).unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.converted, 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].index, 2);
    assert!(!report.fallback_used);

    assert_eq!(
        read_json(&output),
        json!([
            {"instruction": "What is this?\n<img>http://x/y.jpg</img>", "input": "", "output": "A wrench."},
            {"instruction": "Hello", "input": "", "output": "Hi"}
        ])
    );
}

#[test]
fn output_is_two_space_indented_and_keeps_unicode() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("dataset.json");
    let output = dir.path().join("out.json");
    write_json(
        &input,
        &json!([{"messages": [
            {"role": "user", "content": "Qu'est-ce que c'est ? 这是什么"},
            {"role": "assistant", "content": "Un café ☕"}
        ]}]),
    );

    let options = ConvertOptions::for_target(TargetFormat::Alpaca);
    convert_file(&ConvertJob::new(&input, &output), &options).unwrap();

    let text = fs::read_to_string(&output).unwrap();
    assert!(text.contains("这是什么"));
    assert!(text.contains("Un café ☕"));
    assert!(text.starts_with("[\n  {\n    \"instruction\""));
}

#[test]
fn sharegpt_passthrough_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("dataset.json");
    let output = dir.path().join("out.json");
    let dataset = json!([{"conversations": [
        {"from": "system", "value": "sys"},
        {"from": "human", "value": "Hello"},
        {"from": "gpt", "value": "Hi"}
    ]}]);
    write_json(&input, &dataset);

    convert_file(&ConvertJob::new(&input, &output), &ConvertOptions::default()).unwrap();

    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        fs::read_to_string(&input).unwrap()
    );
}

#[test]
fn empty_input_is_an_error_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("dataset.json");
    let output = dir.path().join("out.json");
    write_json(&input, &json!([]));

    let err = convert_file(&ConvertJob::new(&input, &output), &ConvertOptions::default())
        .unwrap_err();
    assert!(matches!(err, ConvertError::NoRecords { total: 0 }));
    assert!(!output.exists());
}

#[test]
fn empty_input_writes_samples_when_asked() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("dataset.json");
    let output = dir.path().join("out.json");
    write_json(&input, &json!([]));

    let options = ConvertOptions {
        target: TargetFormat::Alpaca,
        fallback: FallbackPolicy::Samples,
        ..Default::default()
    };
    let report = convert_file(&ConvertJob::new(&input, &output), &options).unwrap();

    assert!(report.fallback_used);
    assert_eq!(report.written, 3);
    let written = read_json(&output);
    assert_eq!(written.as_array().unwrap().len(), 3);
    assert_ne!(written, json!([]));
}

#[test]
fn empty_policy_writes_empty_array() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("dataset.json");
    let output = dir.path().join("out.json");
    write_json(&input, &json!([{"messages": []}]));

    let options = ConvertOptions {
        fallback: FallbackPolicy::Empty,
        ..Default::default()
    };
    let report = convert_file(&ConvertJob::new(&input, &output), &options).unwrap();
    assert_eq!(report.written, 0);
    assert_eq!(read_json(&output), json!([]));
}

#[test]
fn strict_mode_fails_on_skipped_records() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("dataset.json");
    let output = dir.path().join("out.json");
    write_json(&input, &mixed_dataset());

    let options = ConvertOptions {
        strict: true,
        ..Default::default()
    };
    let err = convert_file(&ConvertJob::new(&input, &output), &options).unwrap_err();
    assert!(matches!(err, ConvertError::RecordsSkipped { count: 1 }));
    assert!(!output.exists());
}

#[test]
fn in_place_keeps_backup_of_original() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("dataset.json");
    write_json(&input, &mixed_dataset());
    let original = fs::read_to_string(&input).unwrap();

    let options = ConvertOptions {
        roles: RoleMap::fold_system_into_gpt(),
        ..Default::default()
    };
    let job = ConvertJob::in_place(&input);
    let report = convert_file(&job, &options).unwrap();

    let backup = dir.path().join("dataset.json.bak");
    assert_eq!(report.backup_path.as_deref(), Some(backup.as_path()));
    assert_eq!(fs::read_to_string(&backup).unwrap(), original);
    assert!(!dir.path().join("dataset.json.tmp").exists());

    let replaced = read_json(&input);
    assert_eq!(replaced.as_array().unwrap().len(), 2);
    assert_eq!(replaced[0]["conversations"][0]["from"], json!("gpt"));
}

#[test]
fn dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("dataset.json");
    let output = dir.path().join("out.json");
    write_json(&input, &mixed_dataset());

    let mut job = ConvertJob::new(&input, &output);
    job.dry_run = true;
    let report = convert_file(&job, &ConvertOptions::default()).unwrap();

    assert_eq!(report.written, 2);
    assert_eq!(report.output_path, None);
    assert!(!output.exists());
}

#[test]
fn non_array_input_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("dataset.json");
    write_json(&input, &json!({"messages": []}));

    let err = convert_file(
        &ConvertJob::new(&input, dir.path().join("out.json")),
        &ConvertOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ConvertError::NotAnArray { .. }));
}

#[test]
fn missing_input_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = convert_file(
        &ConvertJob::new(dir.path().join("missing.json"), dir.path().join("out.json")),
        &ConvertOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ConvertError::Io { .. }));
}
