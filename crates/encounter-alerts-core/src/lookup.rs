//! Static name and translation tables used for rendering.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::model::EntityId;

const UNKNOWN: &str = "Unknown";
const DEFAULT_FORM: &str = "Normal";
const ENGLISH: &str = "en";

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MasterFile {
    #[serde(default)]
    pub pokemon: HashMap<String, EntityEntry>,
    #[serde(default)]
    pub moves: HashMap<String, MoveEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityEntry {
    pub name: String,
    #[serde(default, rename = "pokedexId")]
    pub pokedex_id: Option<EntityId>,
    #[serde(default)]
    pub forms: HashMap<String, FormEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormEntry {
    pub name: String,
    #[serde(default, rename = "isCostume")]
    pub is_costume: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MoveEntry {
    pub name: String,
}

/// Language code to (English key to translated text).
pub type Translations = HashMap<String, HashMap<String, String>>;

/// A non-default form of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormInfo {
    pub id: u32,
    pub name: String,
    pub is_costume: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NameTable {
    master: MasterFile,
    translations: Translations,
    by_name: HashMap<String, EntityId>,
}

impl NameTable {
    pub fn new(master: MasterFile, translations: Translations) -> Self {
        let mut by_name = HashMap::new();
        for (key, entity) in &master.pokemon {
            let Some(id) = entity.pokedex_id.or_else(|| key.parse().ok()) else {
                continue;
            };
            by_name.insert(entity.name.to_lowercase(), id);
            for table in translations.values() {
                if let Some(translated) = table.get(&entity.name) {
                    by_name.insert(translated.to_lowercase(), id);
                }
            }
        }

        Self {
            master,
            translations,
            by_name,
        }
    }

    pub fn from_json(master: &str, translations: &str) -> Result<Self, LookupError> {
        let master = serde_json::from_str(master).map_err(|source| LookupError::Parse {
            what: "masterfile".to_string(),
            source,
        })?;
        let translations =
            serde_json::from_str(translations).map_err(|source| LookupError::Parse {
                what: "translations".to_string(),
                source,
            })?;
        Ok(Self::new(master, translations))
    }

    pub fn load(master_path: &Path, translations_path: &Path) -> Result<Self, LookupError> {
        let master: MasterFile = read_json(master_path)?;
        let translations: Translations = read_json(translations_path)?;

        info!(
            entities = master.pokemon.len(),
            moves = master.moves.len(),
            "Loaded masterfile from {}",
            master_path.display()
        );
        for (language, table) in &translations {
            info!(language = %language, keys = table.len(), "Loaded translations");
        }

        Ok(Self::new(master, translations))
    }

    /// Text for `key` in `language`. English and every miss return the key.
    pub fn translate(&self, key: &str, language: &str) -> String {
        if language == ENGLISH {
            return key.to_string();
        }
        match self.translations.get(language) {
            Some(table) => match table.get(key) {
                Some(text) => return text.clone(),
                None => warn!(key = %key, language = %language, "Translation key not found"),
            },
            None => warn!(language = %language, "Translation language not found"),
        }
        key.to_string()
    }

    pub fn entity_name(&self, entity_id: EntityId, language: &str) -> String {
        match self.master.pokemon.get(&entity_id.to_string()) {
            Some(entity) => self.translate(&entity.name, language),
            None => self.translate(UNKNOWN, language),
        }
    }

    pub fn move_name(&self, move_id: u32, language: &str) -> String {
        match self.master.moves.get(&move_id.to_string()) {
            Some(entry) => self.translate(&entry.name, language),
            None => self.translate(UNKNOWN, language),
        }
    }

    /// The named form, unless it is missing, zero or the default form.
    pub fn form(&self, entity_id: EntityId, form_id: Option<u32>) -> Option<FormInfo> {
        let form_id = form_id.filter(|id| *id > 0)?;
        let entity = self.master.pokemon.get(&entity_id.to_string())?;
        let form = entity.forms.get(&form_id.to_string())?;
        if form.name == DEFAULT_FORM {
            return None;
        }
        Some(FormInfo {
            id: form_id,
            name: form.name.clone(),
            is_costume: form.is_costume,
        })
    }

    /// Case-insensitive lookup over English and translated entity names.
    pub fn resolve_entity_id(&self, name: &str) -> Option<EntityId> {
        self.by_name.get(&name.trim().to_lowercase()).copied()
    }

    pub fn entity_count(&self) -> usize {
        self.master.pokemon.len()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, LookupError> {
    let data = std::fs::read_to_string(path).map_err(|source| LookupError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| LookupError::Parse {
        what: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MASTER: &str = r#"{
        "pokemon": {
            "16": {"name": "Pidgey", "pokedexId": 16, "forms": {"0": {"name": "Normal"}}},
            "25": {"name": "Pikachu", "pokedexId": 25, "forms": {
                "598": {"name": "Normal"},
                "2668": {"name": "Party Hat", "isCostume": true},
                "950": {"name": "Libre"}
            }}
        },
        "moves": {"221": {"name": "Tackle"}, "13": {"name": "Wrap"}}
    }"#;

    const TRANSLATIONS: &str = r#"{
        "de": {"Pidgey": "Taubsi", "Tackle": "Tackle", "Unknown": "Unbekannt", "Party Hat": "Partyhut"}
    }"#;

    fn table() -> NameTable {
        NameTable::from_json(MASTER, TRANSLATIONS).unwrap()
    }

    #[test]
    fn english_returns_key() {
        assert_eq!(table().translate("Whatever", "en"), "Whatever");
        assert_eq!(table().entity_name(16, "en"), "Pidgey");
    }

    #[test]
    fn translated_names_and_fallbacks() {
        let names = table();
        assert_eq!(names.entity_name(16, "de"), "Taubsi");
        assert_eq!(names.entity_name(9999, "de"), "Unbekannt");
        assert_eq!(names.entity_name(25, "de"), "Pikachu");
        assert_eq!(names.move_name(13, "fr"), "Wrap");
        assert_eq!(names.move_name(4242, "en"), "Unknown");
    }

    #[test]
    fn default_forms_are_hidden() {
        let names = table();
        assert_eq!(names.form(25, Some(598)), None);
        assert_eq!(names.form(25, None), None);
        assert_eq!(names.form(25, Some(0)), None);
        assert_eq!(
            names.form(25, Some(2668)),
            Some(FormInfo {
                id: 2668,
                name: "Party Hat".to_string(),
                is_costume: true,
            })
        );
    }

    #[test]
    fn resolves_names_in_any_language() {
        let names = table();
        assert_eq!(names.resolve_entity_id("pidgey"), Some(16));
        assert_eq!(names.resolve_entity_id(" TAUBSI "), Some(16));
        assert_eq!(names.resolve_entity_id("Glurak"), None);
    }

    #[test]
    fn load_reports_missing_file() {
        let mut master = tempfile::NamedTempFile::new().unwrap();
        master.write_all(MASTER.as_bytes()).unwrap();

        let err = NameTable::load(master.path(), Path::new("/nonexistent/translations.json"))
            .unwrap_err();
        assert!(matches!(err, LookupError::Io { .. }));

        let mut translations = tempfile::NamedTempFile::new().unwrap();
        translations.write_all(TRANSLATIONS.as_bytes()).unwrap();
        let names = NameTable::load(master.path(), translations.path()).unwrap();
        assert_eq!(names.entity_count(), 2);
    }
}
