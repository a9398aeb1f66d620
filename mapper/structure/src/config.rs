use serde::{Deserialize, Serialize};

/// Configuration of the structure mapping: which payload fields are projected
/// into the flat record and how the distinct user is derived from it.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct StructureMapperConfig {
    pub structure: Vec<GroupConfig>,
    pub user: UserConfig,
}

/// One top-level payload group: the `source` key to read from the payload and
/// the ordered projections applied to its sub-keys. Groups are applied in
/// declared order; colliding output names are overwritten by later entries.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct GroupConfig {
    pub source: String,
    pub fields: Vec<FieldMapping>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct FieldMapping {
    pub from: String,
    pub to: String,
}

/// `key` is the output field the user value is looked up under in the
/// flattened data, not in the raw payload; `property` is the output field the
/// resolved value is written back to.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct UserConfig {
    pub key: String,
    pub property: String,
}
