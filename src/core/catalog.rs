use crate::core::io::Storage;
use crate::core::state::{CastContext, Entity};
use anyhow::{anyhow, Context, Result};
use log::info;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::BTreeMap;
use std::path::Path;

/// Sample sizes used when the cast has to be picked at random.
pub const FALLBACK_SAMPLE_SIZES: &[(&str, usize)] = &[("people", 5), ("planets", 3), ("starships", 2)];

/// Read-only table of narrative entities, loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureCatalog {
    categories: BTreeMap<String, Vec<Entity>>,
}

impl FixtureCatalog {
    pub fn new(categories: BTreeMap<String, Vec<Entity>>) -> Self {
        Self { categories }
    }

    /// Loads every `<category>.json` file under `folder`.
    pub async fn load(storage: &dyn Storage, folder: &str) -> Result<Self> {
        if !storage.exists(folder).await? {
            return Err(anyhow!(
                "Fixture folder '{}' was not found. Populate it with <category>.json files first.",
                folder
            ));
        }

        let mut categories = BTreeMap::new();
        for path_str in storage.list(folder).await? {
            let path = Path::new(&path_str);
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let Some(category) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };

            let bytes = storage.read(&path_str).await?;
            let entities: Vec<Entity> = serde_json::from_slice(&bytes)
                .with_context(|| format!("Failed to parse fixture file {}", path_str))?;
            info!("Loaded {} {} from {}", entities.len(), category, path_str);
            categories.insert(category, entities);
        }

        Ok(Self { categories })
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    pub fn entities(&self, category: &str) -> &[Entity] {
        self.categories.get(category).map_or(&[], Vec::as_slice)
    }

    pub fn names(&self, category: &str) -> Vec<&str> {
        self.entities(category)
            .iter()
            .filter_map(Entity::display_name)
            .collect()
    }

    /// Keeps, for each known category, the entities whose display name was selected.
    pub fn filter(&self, selected: &BTreeMap<String, Vec<String>>) -> CastContext {
        let mut cast = CastContext::default();
        for (category, names) in selected {
            if !self.contains(category) {
                continue;
            }
            let chosen = self
                .entities(category)
                .iter()
                .filter(|e| e.display_name().is_some_and(|n| names.iter().any(|s| s == n)))
                .cloned()
                .collect();
            cast.categories.insert(category.clone(), chosen);
        }
        cast
    }

    /// Picks a small random cast, each category capped at what is available.
    pub fn random_cast<R: Rng + ?Sized>(&self, rng: &mut R) -> CastContext {
        let mut cast = CastContext::default();
        for (category, size) in FALLBACK_SAMPLE_SIZES {
            let pool = self.entities(category);
            let amount = (*size).min(pool.len());
            let sample = pool.choose_multiple(rng, amount).cloned().collect();
            cast.categories.insert(category.to_string(), sample);
        }
        cast
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::io::NativeStorage;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    pub(crate) fn sample_catalog() -> FixtureCatalog {
        let people: Vec<Entity> = [
            "Luke Skywalker", "Darth Vader", "Leia Organa", "Han Solo",
            "Chewbacca", "Obi-Wan Kenobi", "Yoda",
        ]
        .iter()
        .map(|n| serde_json::from_value(json!({"name": n, "gender": "n/a"})).unwrap())
        .collect();
        let planets: Vec<Entity> = ["Tatooine", "Mustafar", "Hoth", "Endor"]
            .iter()
            .map(|n| serde_json::from_value(json!({"name": n})).unwrap())
            .collect();
        let starships: Vec<Entity> = ["X-wing", "Millennium Falcon", "TIE Advanced x1"]
            .iter()
            .map(|n| serde_json::from_value(json!({"name": n})).unwrap())
            .collect();
        let films: Vec<Entity> = ["A New Hope", "Revenge of the Sith"]
            .iter()
            .map(|t| serde_json::from_value(json!({"title": t})).unwrap())
            .collect();

        let mut categories = BTreeMap::new();
        categories.insert("people".to_string(), people);
        categories.insert("planets".to_string(), planets);
        categories.insert("starships".to_string(), starships);
        categories.insert("films".to_string(), films);
        FixtureCatalog::new(categories)
    }

    #[tokio::test]
    async fn test_load_reads_json_files_by_category() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path();
        std::fs::write(root.join("people.json"), r#"[{"name": "Luke Skywalker"}, {"name": "Leia Organa"}]"#)?;
        std::fs::write(root.join("films.json"), r#"[{"title": "A New Hope"}]"#)?;
        std::fs::write(root.join("README.txt"), "ignored")?;

        let storage = NativeStorage::new();
        let catalog = FixtureCatalog::load(&storage, root.to_str().unwrap()).await?;

        assert_eq!(catalog.categories().collect::<Vec<_>>(), vec!["films", "people"]);
        assert_eq!(catalog.names("people"), vec!["Luke Skywalker", "Leia Organa"]);
        assert_eq!(catalog.names("films"), vec!["A New Hope"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_fails_when_folder_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("swapi_data");
        let storage = NativeStorage::new();

        let result = FixtureCatalog::load(&storage, missing.to_str().unwrap()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_fixture() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        std::fs::write(temp_dir.path().join("people.json"), "{not json")?;
        let storage = NativeStorage::new();

        let result = FixtureCatalog::load(&storage, temp_dir.path().to_str().unwrap()).await;
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn test_filter_keeps_selected_names_in_known_categories() {
        let catalog = sample_catalog();
        let mut selected = BTreeMap::new();
        selected.insert("people".to_string(), vec!["Darth Vader".to_string(), "Nobody".to_string()]);
        selected.insert("films".to_string(), vec!["A New Hope".to_string()]);
        selected.insert("vehicles".to_string(), vec!["Sand Crawler".to_string()]);

        let cast = catalog.filter(&selected);
        assert_eq!(cast.names("people"), vec!["Darth Vader"]);
        assert_eq!(cast.names("films"), vec!["A New Hope"]);
        assert!(!cast.categories.contains_key("vehicles"));
    }

    #[test]
    fn test_random_cast_respects_sample_caps() {
        let catalog = sample_catalog();
        let mut rng = StdRng::seed_from_u64(7);
        let cast = catalog.random_cast(&mut rng);

        assert_eq!(cast.len("people"), 5);
        assert_eq!(cast.len("planets"), 3);
        assert_eq!(cast.len("starships"), 2);
        assert!(!cast.categories.contains_key("films"));
    }

    #[test]
    fn test_random_cast_caps_at_available_count() {
        let mut categories = BTreeMap::new();
        categories.insert(
            "people".to_string(),
            vec![serde_json::from_value(json!({"name": "Rey"})).unwrap()],
        );
        let catalog = FixtureCatalog::new(categories);
        let mut rng = StdRng::seed_from_u64(1);
        let cast = catalog.random_cast(&mut rng);

        assert_eq!(cast.len("people"), 1);
        assert_eq!(cast.len("planets"), 0);
        assert_eq!(cast.len("starships"), 0);
    }
}
