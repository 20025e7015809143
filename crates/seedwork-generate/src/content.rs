use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::{Rng, RngCore};
use serde::Deserialize;

use crate::errors::GenerationError;

/// Weighted-random lookups over curated reference tables.
///
/// Given the same generator state the result is deterministic.
pub trait ContentProvider {
    fn weighted_choice(
        &self,
        category: &str,
        rng: &mut dyn RngCore,
    ) -> Result<String, GenerationError>;

    fn random_person_name(
        &self,
        rng: &mut dyn RngCore,
    ) -> Result<(String, String), GenerationError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    pub value: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone)]
struct WeightedTable {
    values: Vec<String>,
    index: WeightedIndex<f64>,
}

/// Tables bundled with the crate, keyed by category.
const BUILTIN: &[(&str, &str)] = &[
    ("surname", include_str!("../assets/content/surname.json")),
    (
        "first_name.male",
        include_str!("../assets/content/first_name.male.json"),
    ),
    (
        "first_name.female",
        include_str!("../assets/content/first_name.female.json"),
    ),
    ("company", include_str!("../assets/content/company.json")),
    ("component", include_str!("../assets/content/component.json")),
    ("feature", include_str!("../assets/content/feature.json")),
    ("error", include_str!("../assets/content/error.json")),
    ("quality", include_str!("../assets/content/quality.json")),
    ("technology", include_str!("../assets/content/technology.json")),
    ("client", include_str!("../assets/content/client.json")),
    ("deliverable", include_str!("../assets/content/deliverable.json")),
    (
        "project.sprint",
        include_str!("../assets/content/project.sprint.json"),
    ),
    (
        "project.campaign",
        include_str!("../assets/content/project.campaign.json"),
    ),
    (
        "project.process",
        include_str!("../assets/content/project.process.json"),
    ),
    (
        "project.cross_functional",
        include_str!("../assets/content/project.cross_functional.json"),
    ),
    (
        "project.oversight",
        include_str!("../assets/content/project.oversight.json"),
    ),
];

/// In-memory curated content: surnames, first names, company names and task
/// vocabulary.
#[derive(Debug, Clone, Default)]
pub struct CuratedContent {
    tables: BTreeMap<String, WeightedTable>,
}

impl CuratedContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content compiled into the crate.
    pub fn builtin() -> Result<Self, GenerationError> {
        let mut content = Self::new();
        for (category, raw) in BUILTIN {
            let entries: Vec<ContentEntry> = serde_json::from_str(raw).map_err(|err| {
                GenerationError::Content(format!("builtin table '{category}': {err}"))
            })?;
            content.insert(category, entries)?;
        }
        Ok(content)
    }

    /// Builtin content with every `<category>.json` in `dir` layered on top.
    pub fn with_overrides(dir: &Path) -> Result<Self, GenerationError> {
        let mut content = Self::builtin()?;
        content.load_dir(dir)?;
        Ok(content)
    }

    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, GenerationError> {
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        for path in &paths {
            let Some(category) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let raw = fs::read_to_string(path)?;
            let entries: Vec<ContentEntry> = serde_json::from_str(&raw).map_err(|err| {
                GenerationError::Content(format!("invalid table {}: {err}", path.display()))
            })?;
            self.insert(category, entries)?;
        }

        Ok(paths.len())
    }

    /// Replace a table. An empty table is stored and fails at lookup time.
    pub fn insert(
        &mut self,
        category: &str,
        entries: Vec<ContentEntry>,
    ) -> Result<(), GenerationError> {
        if entries.is_empty() {
            self.tables.remove(category);
            return Ok(());
        }
        let index = WeightedIndex::new(entries.iter().map(|entry| entry.weight))
            .map_err(|err| GenerationError::Content(format!("table '{category}': {err}")))?;
        let values = entries.into_iter().map(|entry| entry.value).collect();
        self.tables
            .insert(category.to_string(), WeightedTable { values, index });
        Ok(())
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// All values of a table in file order.
    pub fn values(&self, category: &str) -> Result<&[String], GenerationError> {
        self.table(category).map(|table| table.values.as_slice())
    }

    fn table(&self, category: &str) -> Result<&WeightedTable, GenerationError> {
        self.tables
            .get(category)
            .ok_or_else(|| GenerationError::EmptySource {
                category: category.to_string(),
            })
    }
}

impl ContentProvider for CuratedContent {
    fn weighted_choice(
        &self,
        category: &str,
        rng: &mut dyn RngCore,
    ) -> Result<String, GenerationError> {
        let table = self.table(category)?;
        let position = table.index.sample(rng);
        Ok(table.values[position].clone())
    }

    fn random_person_name(
        &self,
        rng: &mut dyn RngCore,
    ) -> Result<(String, String), GenerationError> {
        let category = if rng.random_bool(0.5) {
            "first_name.male"
        } else {
            "first_name.female"
        };
        let first = self.weighted_choice(category, rng)?;
        let last = self.weighted_choice("surname", rng)?;
        Ok((first, last))
    }
}
