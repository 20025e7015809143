use schemars::schema_for;
use seedwork_core::GenerationConfig;

#[test]
fn json_schema_lists_every_option() {
    let generated = schema_for!(GenerationConfig);
    let json = serde_json::to_value(&generated).expect("serialize generated schema");
    let properties = json
        .get("properties")
        .and_then(|value| value.as_object())
        .expect("properties object");

    for key in [
        "organizations",
        "users",
        "history_months",
        "tasks_per_user",
        "seed",
        "reference_time",
        "unassigned_rate",
        "completion_rates",
        "day_weights",
        "two_week_sprint_rate",
        "secondary_team_rate",
        "manager_creator_rate",
        "non_manager_assignee_rate",
        "dependency_rate",
    ] {
        assert!(properties.contains_key(key), "missing property {key}");
    }
}

#[test]
fn completion_rates_serialize_with_snake_case_keys() {
    let config = GenerationConfig::default();
    let json = serde_json::to_value(&config).expect("serialize config");
    let rates = json
        .get("completion_rates")
        .and_then(|value| value.as_object())
        .expect("completion_rates object");
    let keys: Vec<&str> = rates.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        ["campaign", "cross_functional", "oversight", "process", "sprint"]
    );
    assert!(json.get("seed").is_none());
}
