use std::fs;

use serde_json::{Value, json};
use tempfile::tempdir;

use simord::apps::{build_with, run_analyze, run_build};
use simord::source::primock::combine_transcript;
use simord::{
    ConsultationKey, EncounterIndex, EncounterKey, InMemoryConsultations, OutputRow,
    PipelineConfig, SimordError,
};

fn textgrid(intervals: &[(f64, &str)]) -> String {
    let mut body = String::from("File type = \"ooTextFile\"\nObject class = \"TextGrid\"\n");
    for (idx, (from, text)) in intervals.iter().enumerate() {
        body.push_str(&format!(
            "intervals [{}]:\n xmin = {}\n xmax = {}\n text = \"{}\"\n",
            idx + 1,
            from,
            from + 1.0,
            text
        ));
    }
    body
}

fn seed_data(config: &PipelineConfig) {
    let original = config.original_dir();
    fs::create_dir_all(&original).unwrap();
    fs::write(
        original.join("train.json"),
        json!([
            {"id": "acibench_D2N001_virtassist_train", "expected_orders": [{"order_type": "lab", "description": "CBC"}]},
            {"id": "acibench_D2N088_virtassist_clinicalnlp_taskB_test1", "expected_orders": [{"order_type": "imaging", "description": "x-ray"}]},
            {"id": "primock57_4_1", "expected_orders": []}
        ])
        .to_string(),
    )
    .unwrap();
    fs::write(
        original.join("dev.json"),
        json!([{"id": "acibench_D2N010_aci_valid"}]).to_string(),
    )
    .unwrap();
    fs::write(
        original.join("test.json"),
        json!([{"id": "acibench_D2N020_virtscribe_test2", "expected_orders": [{"k": "v"}]}])
            .to_string(),
    )
    .unwrap();
}

fn collaborators() -> (InMemoryConsultations, EncounterIndex) {
    let mut consultations = InMemoryConsultations::new("primock57");
    consultations.insert(
        ConsultationKey { day: 4, consultation: 1 },
        combine_transcript(
            &textgrid(&[(0.0, "Hello."), (4.0, "Any <UNSURE>allergies</UNSURE>?")]),
            &textgrid(&[(2.0, "Hi, I have a cough.")]),
        ),
    );

    let mut encounters = EncounterIndex::new("aci_bench");
    encounters.insert_first(EncounterKey::new("D2N001", "virtassist"), "[doctor] one");
    encounters.insert_first(EncounterKey::new("D2N088", "virtassist"), "[doctor] eighty-eight");
    encounters.insert_first(EncounterKey::new("D2N010", "aci"), "[doctor] ten");
    (consultations, encounters)
}

fn read_rows(path: &std::path::Path) -> Vec<OutputRow> {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn build_assembles_rows_from_the_stored_map() {
    let temp = tempdir().unwrap();
    let config = PipelineConfig::with_data_dir(temp.path());
    seed_data(&config);
    let map = run_analyze(&config).unwrap();
    assert_eq!(
        map.splits.test1,
        vec![
            "acibench_D2N010_aci_valid",
            "acibench_D2N088_virtassist_clinicalnlp_taskB_test1"
        ]
    );

    let (consultations, encounters) = collaborators();
    let outcome = build_with(&config, &map, &consultations, &encounters).unwrap();

    assert_eq!(outcome.stats.total, 5);
    assert_eq!(outcome.stats.primock, 1);
    assert_eq!(outcome.stats.acibench, 4);
    assert_eq!(outcome.stats.missing_transcript, 1);
    assert_eq!(outcome.stats.missing_orders, 0);
    assert_eq!(outcome.stats.success, 4);
    assert!(!outcome.validation.all_match());
    assert_eq!(outcome.validation.missing(), 1);

    let train = read_rows(&config.new_dir().join("train.json"));
    assert_eq!(
        train,
        vec![
            OutputRow {
                id: "acibench_virtassist_train_D2N001".into(),
                transcript: "[doctor] one".into(),
                orders: vec![json!({"order_type": "lab", "description": "CBC"})],
            },
            OutputRow {
                id: "primock57_4_1".into(),
                transcript: "[doctor] Hello.\n[patient] Hi, I have a cough.\n[doctor] Any allergies?"
                    .into(),
                orders: vec![],
            },
        ]
    );

    let test1 = read_rows(&config.new_dir().join("test1.json"));
    let ids: Vec<&str> = test1.iter().map(|row| row.id.as_str()).collect();
    assert_eq!(ids, vec!["acibench_aci_valid_D2N010", "acibench_virtassist_test1_D2N088"]);
    assert!(test1[0].orders.is_empty());

    let test2: Value =
        serde_json::from_str(&fs::read_to_string(config.new_dir().join("test2.json")).unwrap())
            .unwrap();
    assert_eq!(test2, json!([]));
}

#[test]
fn build_rejects_a_map_that_no_longer_matches_the_origins() {
    let temp = tempdir().unwrap();
    let config = PipelineConfig::with_data_dir(temp.path());
    seed_data(&config);
    let mut map = run_analyze(&config).unwrap();
    let moved = map.splits.test2.pop().unwrap();
    map.splits.train.push(moved);

    let (consultations, encounters) = collaborators();
    let err = build_with(&config, &map, &consultations, &encounters).unwrap_err();
    assert!(matches!(err, SimordError::VerificationFailed { .. }));
    assert!(!config.new_dir().exists());
}

#[test]
fn build_rejects_a_stale_map_before_fetching_transcripts() {
    let temp = tempdir().unwrap();
    let mut config = PipelineConfig::with_data_dir(temp.path());
    config.primock_base_url = "http://127.0.0.1:9".to_string();
    seed_data(&config);
    let mut map = run_analyze(&config).unwrap();
    let moved = map.splits.test2.pop().unwrap();
    map.splits.train.push(moved);
    fs::write(config.map_path(), serde_json::to_string_pretty(&map).unwrap()).unwrap();

    let err = run_build(&config).unwrap_err();
    assert!(matches!(err, SimordError::VerificationFailed { .. }));
    assert!(!config.aci_bench().cache_dir.exists());
    assert!(!config.new_dir().exists());
}
