use schemars::schema_for;
use seedwork_core::GenerationConfig;

fn main() {
    let schema = schema_for!(GenerationConfig);
    let json = serde_json::to_string_pretty(&schema).expect("serialize json schema");
    println!("{json}");
}
