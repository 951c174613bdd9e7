use crate::error::Result;
use crate::types::{ActionDefinition, ActionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Where the catalog comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CatalogSource {
    /// The compiled table below.
    #[default]
    Builtin,
    /// A YAML data sheet: a list of rows, rows with empty names skipped.
    Sheet { path: PathBuf },
}

/// One row of an external action data sheet.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetRow {
    pub id: ActionId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon_id: u16,
    #[serde(default)]
    pub cost: u32,
}

// (id, name, description, icon, cost)
const BUILTIN: &[(ActionId, &str, &str, u16, u32)] = &[
    (0, "The Heat of Battle", "Increases EXP earned by 5%", 60801, 240),
    (1, "The Heat of Battle II", "Increases EXP earned by 10%", 60802, 360),
    (2, "The Heat of Battle III", "Increases EXP earned by 15%", 60803, 480),
    (3, "In Control", "Increases control by 5%", 60810, 240),
    (4, "In Control II", "Increases control by 10%", 60811, 360),
    (5, "In Control III", "Increases control by 15%", 60812, 480),
    (6, "Survival Manual", "Increases gathering EXP by 5%", 60804, 240),
    (7, "Survival Manual II", "Increases gathering EXP by 10%", 60805, 360),
    (8, "Survival Manual III", "Increases gathering EXP by 15%", 60806, 480),
    (9, "Earth and Water", "Reduces gathering attempts by 1", 60807, 240),
    (10, "Earth and Water II", "Reduces gathering attempts by 2", 60808, 360),
    (11, "What You See", "Increases gathering attempts by 1", 60809, 240),
    (12, "What You See II", "Increases gathering attempts by 2", 60819, 360),
    (13, "Helping Hand", "Increases crafting progress by 5%", 60813, 240),
    (14, "Helping Hand II", "Increases crafting progress by 10%", 60814, 360),
    (15, "Helping Hand III", "Increases crafting progress by 15%", 60815, 480),
    (16, "Back on Your Feet", "Reduces durability loss by 5", 60816, 240),
    (17, "Back on Your Feet II", "Reduces durability loss by 10", 60817, 360),
    (18, "Back on Your Feet III", "Reduces durability loss by 15", 60818, 480),
    (19, "Meat and Mead", "Reduces teleportation costs by 10%", 60820, 240),
    (20, "Meat and Mead II", "Reduces teleportation costs by 20%", 60821, 360),
    (21, "That Which Binds Us", "Increases spiritbond gain by 10%", 60822, 240),
    (22, "That Which Binds Us II", "Increases spiritbond gain by 20%", 60823, 360),
    (23, "That Which Binds Us III", "Reduces gear spiritbond requirement", 60824, 480),
    (24, "Seal Sweetener", "Increases GC seals by 10%", 60825, 240),
    (25, "Seal Sweetener II", "Increases GC seals by 15%", 60826, 360),
    (26, "Seal Sweetener III", "Increases GC seals by 20%", 60827, 480),
    (27, "Proper Care", "Reduces gear degradation by 10%", 60828, 240),
    (28, "Proper Care II", "Reduces gear degradation by 20%", 60829, 360),
    (29, "Live off the Land", "Increases enmity generation for tanks", 60830, 240),
    (30, "A Man's Best Friend", "Increases chocobo EXP by 5%", 60831, 240),
    (31, "A Man's Best Friend II", "Increases chocobo EXP by 10%", 60832, 360),
];

/// Read-only action metadata, keyed by id.
///
/// Loaded once and never mutated; cheap to share behind an `Arc` and safe to
/// query from any context.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    actions: BTreeMap<ActionId, ActionDefinition>,
}

impl Catalog {
    pub fn builtin() -> Self {
        let actions = BUILTIN
            .iter()
            .map(|&(id, name, description, icon_id, cost)| {
                (
                    id,
                    ActionDefinition {
                        id,
                        name: name.to_string(),
                        description: description.to_string(),
                        icon_id,
                        cost,
                    },
                )
            })
            .collect();
        Self { actions }
    }

    /// Build from data-sheet rows, skipping rows whose name is blank.
    /// A later row with the same id replaces an earlier one.
    pub fn from_rows(rows: impl IntoIterator<Item = SheetRow>) -> Self {
        let actions = rows
            .into_iter()
            .filter(|row| !row.name.trim().is_empty())
            .map(|row| {
                (
                    row.id,
                    ActionDefinition {
                        id: row.id,
                        name: row.name,
                        description: row.description,
                        icon_id: row.icon_id,
                        cost: row.cost,
                    },
                )
            })
            .collect();
        Self { actions }
    }

    pub fn load_sheet(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let rows: Vec<SheetRow> = serde_yaml::from_str(&data)?;
        Ok(Self::from_rows(rows))
    }

    /// Load the catalog described by `source`. Relative sheet paths resolve
    /// against `base_dir` (normally the config file's directory).
    pub fn from_source(source: &CatalogSource, base_dir: &Path) -> Result<Self> {
        match source {
            CatalogSource::Builtin => Ok(Self::builtin()),
            CatalogSource::Sheet { path } => Self::load_sheet(&base_dir.join(path)),
        }
    }

    pub fn get(&self, id: ActionId) -> Option<&ActionDefinition> {
        self.actions.get(&id)
    }

    /// All actions in id order.
    pub fn all(&self) -> Vec<ActionDefinition> {
        self.actions.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn builtin_has_32_actions_in_id_order() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.len(), 32);
        let ids: Vec<_> = catalog.all().iter().map(|a| a.id).collect();
        assert_eq!(ids, (0..32).collect::<Vec<_>>());
        assert_eq!(catalog.get(5).unwrap().name, "In Control III");
        assert_eq!(catalog.get(9).unwrap().cost, 240);
        assert!(catalog.get(32).is_none());
    }

    #[test]
    fn sheet_rows_with_empty_names_are_skipped() {
        let catalog = Catalog::from_rows(vec![
            SheetRow {
                id: 1,
                name: "Alpha".into(),
                description: String::new(),
                icon_id: 0,
                cost: 0,
            },
            SheetRow {
                id: 2,
                name: "   ".into(),
                description: String::new(),
                icon_id: 0,
                cost: 0,
            },
        ]);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get(2).is_none());
    }

    #[test]
    fn load_sheet_reads_yaml_rows() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(
            f,
            "- id: 5\n  name: Alpha\n  cost: 100\n- id: 9\n  name: Beta\n- id: 10\n  name: ''"
        )
        .unwrap();
        let catalog = Catalog::load_sheet(f.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(5).unwrap().cost, 100);
        assert_eq!(catalog.get(9).unwrap().name, "Beta");
    }

    #[test]
    fn source_yaml_is_internally_tagged() {
        let src: CatalogSource = serde_yaml::from_str("source: sheet\npath: actions.yaml").unwrap();
        assert_eq!(
            src,
            CatalogSource::Sheet {
                path: PathBuf::from("actions.yaml")
            }
        );
        let src: CatalogSource = serde_yaml::from_str("source: builtin").unwrap();
        assert_eq!(src, CatalogSource::Builtin);
    }
}
