use hookrelay_common_api::{EventRecord, FlatData};
use hookrelay_mapper_common::{Mapper, MapperError};
use log::{error, trace};
use serde_json::Value;

pub mod config;

use crate::config::{GroupConfig, StructureMapperConfig, UserConfig};

/// Renders a payload value the way the ingestion API expects property values:
/// scalars as their plain string forms ("42", "true", "null", strings
/// unquoted), containers as compact JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.to_owned(),
        other => other.to_string(),
    }
}

/// Projects a raw payload onto the flat structure declared in the mapping
/// configuration.
#[derive(Clone)]
pub struct StructureMapper {
    groups: Vec<GroupConfig>,
}

impl StructureMapper {
    pub fn new(groups: Vec<GroupConfig>) -> StructureMapper {
        StructureMapper { groups }
    }

    /// Produces the flattened data for a payload. Groups whose source key is
    /// absent contribute nothing, absent sub-keys are skipped, and a null or
    /// non-object payload produces an empty result.
    pub fn flatten(&self, payload: &Value) -> FlatData {
        let mut data = FlatData::new();
        for group in &self.groups {
            if let Some(source) = payload.get(&group.source) {
                for field in &group.fields {
                    if let Some(value) = source.get(&field.from) {
                        data.insert(field.to.to_owned(), stringify(value));
                    }
                }
            }
        }
        data
    }
}

/// Derives the distinct user from the flattened data using the configured
/// key, and mirrors it under the configured output property.
#[derive(Clone)]
pub struct UserResolver {
    config: UserConfig,
}

impl UserResolver {
    pub fn new(config: UserConfig) -> UserResolver {
        UserResolver { config }
    }

    /// Returns the user value if the configured key is present in the
    /// flattened data, writing it back under the configured property.
    /// Resolving twice over the same data yields the same result.
    pub fn resolve(&self, data: &mut FlatData) -> Option<String> {
        let user = data.get(&self.config.key).cloned()?;
        data.insert(self.config.property.to_owned(), user.clone());
        Some(user)
    }
}

/// The end-to-end mapper: flattens the payload, resolves the user and
/// assembles the EventRecord.
#[derive(Clone)]
pub struct EventMapper {
    structure: StructureMapper,
    user: UserResolver,
}

impl EventMapper {
    pub fn new(config: StructureMapperConfig) -> EventMapper {
        EventMapper {
            structure: StructureMapper::new(config.structure),
            user: UserResolver::new(config.user),
        }
    }

    /// Assembles a record from a payload and the two mapping components.
    /// A missing input is an expected, recoverable condition: it is logged
    /// and yields the empty record, which fails the completeness gate.
    ///
    /// The event name is stringified without any presence check, so a payload
    /// without an `event` field gets the name "null".
    pub fn assemble(
        payload: Option<&Value>,
        structure: Option<&StructureMapper>,
        user: Option<&UserResolver>,
    ) -> EventRecord {
        match (payload, structure, user) {
            (Some(payload), Some(structure), Some(user)) => {
                let name = stringify(payload.get("event").unwrap_or(&Value::Null));
                let mut data = structure.flatten(payload);
                let resolved = user.resolve(&mut data);
                EventRecord::new(Some(name), data, resolved)
            }
            (payload, structure, user) => {
                error!(
                    "EventMapper - cannot assemble a record, one or more inputs are missing. payload: {}, structure: {}, user: {}",
                    payload.is_some(),
                    structure.is_some(),
                    user.is_some()
                );
                EventRecord::empty()
            }
        }
    }

    /// Maps an already parsed payload. Never fails: an absent payload
    /// degrades to the empty record.
    pub fn record(&self, payload: Option<&Value>) -> EventRecord {
        EventMapper::assemble(payload, Some(&self.structure), Some(&self.user))
    }
}

impl<'a> Mapper<&'a str> for EventMapper {
    fn to_record(&self, input: &'a str) -> Result<EventRecord, MapperError> {
        trace!("EventMapper - received payload: {}", input);

        let payload: Value =
            serde_json::from_str(input).map_err(|err| MapperError::JsonParsingError {
                message: format!("Cannot parse received json. Err: {:?} - Json: {}.", err, input),
            })?;
        Ok(self.record(Some(&payload)))
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::config::FieldMapping;
    use maplit::hashmap;
    use serde_json::json;
    use std::fs;

    fn group(source: &str, fields: &[(&str, &str)]) -> GroupConfig {
        GroupConfig {
            source: source.to_owned(),
            fields: fields
                .iter()
                .map(|(from, to)| FieldMapping { from: (*from).to_owned(), to: (*to).to_owned() })
                .collect(),
        }
    }

    fn user_config(key: &str, property: &str) -> UserConfig {
        UserConfig { key: key.to_owned(), property: property.to_owned() }
    }

    #[test]
    fn stringify_should_render_scalars_as_plain_strings() {
        assert_eq!("42", stringify(&json!(42)));
        assert_eq!("19.9", stringify(&json!(19.9)));
        assert_eq!("true", stringify(&json!(true)));
        assert_eq!("null", stringify(&Value::Null));
        assert_eq!("X1", stringify(&json!("X1")));
    }

    #[test]
    fn stringify_should_render_containers_as_compact_json() {
        assert_eq!(r#"{"a":1}"#, stringify(&json!({"a": 1})));
        assert_eq!("[1,2]", stringify(&json!([1, 2])));
    }

    #[test]
    fn flatten_should_project_declared_fields() {
        // Arrange
        let mapper = StructureMapper::new(vec![group("acct", &[("id", "Account")])]);
        let payload = json!({"event": "Signup", "acct": {"id": 42}});

        // Act
        let data = mapper.flatten(&payload);

        // Assert
        assert_eq!(hashmap!["Account".to_owned() => "42".to_owned()], data);
    }

    #[test]
    fn flatten_should_skip_absent_groups() {
        // Arrange
        let mapper = StructureMapper::new(vec![
            group("acct", &[("id", "Account")]),
            group("order", &[("sku", "SKU")]),
        ]);
        let payload = json!({"order": {"sku": "X1"}});

        // Act
        let data = mapper.flatten(&payload);

        // Assert
        assert_eq!(hashmap!["SKU".to_owned() => "X1".to_owned()], data);
    }

    #[test]
    fn flatten_should_skip_absent_sub_keys_and_keep_the_rest() {
        // Arrange
        let mapper =
            StructureMapper::new(vec![group("order", &[("sku", "SKU"), ("qty", "Qty")])]);
        let payload = json!({"order": {"qty": 3}});

        // Act
        let data = mapper.flatten(&payload);

        // Assert
        assert_eq!(hashmap!["Qty".to_owned() => "3".to_owned()], data);
    }

    #[test]
    fn flatten_should_tolerate_a_null_payload() {
        // Arrange
        let mapper = StructureMapper::new(vec![group("acct", &[("id", "Account")])]);

        // Act
        let data = mapper.flatten(&Value::Null);

        // Assert
        assert!(data.is_empty());
    }

    #[test]
    fn flatten_should_include_present_null_values() {
        // Arrange
        let mapper = StructureMapper::new(vec![group("acct", &[("id", "Account")])]);
        let payload = json!({"acct": {"id": null}});

        // Act
        let data = mapper.flatten(&payload);

        // Assert
        assert_eq!(hashmap!["Account".to_owned() => "null".to_owned()], data);
    }

    #[test]
    fn flatten_should_let_later_groups_overwrite_colliding_output_names() {
        // Arrange
        let mapper = StructureMapper::new(vec![
            group("acct", &[("id", "Ref")]),
            group("order", &[("sku", "Ref")]),
        ]);
        let payload = json!({"acct": {"id": 42}, "order": {"sku": "X1"}});

        // Act
        let data = mapper.flatten(&payload);

        // Assert
        assert_eq!(hashmap!["Ref".to_owned() => "X1".to_owned()], data);
    }

    #[test]
    fn resolve_should_return_the_user_and_mirror_it() {
        // Arrange
        let resolver = UserResolver::new(user_config("Account", "distinct_id"));
        let mut data = hashmap!["Account".to_owned() => "42".to_owned()];

        // Act
        let user = resolver.resolve(&mut data);

        // Assert
        assert_eq!(Some("42".to_owned()), user);
        assert_eq!(Some(&"42".to_owned()), data.get("distinct_id"));
    }

    #[test]
    fn resolve_should_be_idempotent() {
        // Arrange
        let resolver = UserResolver::new(user_config("Account", "distinct_id"));
        let mut data = hashmap!["Account".to_owned() => "42".to_owned()];

        // Act
        resolver.resolve(&mut data);
        let snapshot = data.clone();
        let user = resolver.resolve(&mut data);

        // Assert
        assert_eq!(Some("42".to_owned()), user);
        assert_eq!(snapshot, data);
    }

    #[test]
    fn resolve_should_return_none_when_the_key_is_absent() {
        // Arrange
        let resolver = UserResolver::new(user_config("Account", "distinct_id"));
        let mut data = hashmap!["SKU".to_owned() => "X1".to_owned()];

        // Act
        let user = resolver.resolve(&mut data);

        // Assert
        assert_eq!(None, user);
        assert!(!data.contains_key("distinct_id"));
    }

    #[test]
    fn resolve_should_handle_property_equal_to_key() {
        // Arrange
        let resolver = UserResolver::new(user_config("Account", "Account"));
        let mut data = hashmap!["Account".to_owned() => "42".to_owned()];

        // Act
        let user = resolver.resolve(&mut data);

        // Assert
        assert_eq!(Some("42".to_owned()), user);
        assert_eq!(1, data.len());
    }

    #[test]
    fn assemble_should_yield_the_empty_record_when_inputs_are_missing() {
        // Arrange
        let structure = StructureMapper::new(vec![group("acct", &[("id", "Account")])]);
        let resolver = UserResolver::new(user_config("Account", "distinct_id"));
        let payload = json!({"event": "Signup"});

        // Act & Assert
        let record = EventMapper::assemble(None, Some(&structure), Some(&resolver));
        assert_eq!(EventRecord::empty(), record);
        assert!(!record.complete());

        let record = EventMapper::assemble(Some(&payload), None, Some(&resolver));
        assert_eq!(EventRecord::empty(), record);

        let record = EventMapper::assemble(Some(&payload), Some(&structure), None);
        assert_eq!(EventRecord::empty(), record);
    }

    #[test]
    fn assemble_should_stringify_a_missing_event_name() {
        // Arrange
        let mapper = EventMapper::new(StructureMapperConfig {
            structure: vec![group("acct", &[("id", "Account")])],
            user: user_config("Account", "distinct_id"),
        });
        let payload = json!({"acct": {"id": 42}});

        // Act
        let record = mapper.record(Some(&payload));

        // Assert
        assert_eq!(Some("null"), record.name());
    }

    #[test]
    fn record_should_assemble_name_data_and_user() {
        // Arrange
        let mapper = EventMapper::new(StructureMapperConfig {
            structure: vec![group("acct", &[("id", "Account")])],
            user: user_config("Account", "distinct_id"),
        });
        let payload = json!({"event": "Signup", "acct": {"id": 42}});

        // Act
        let record = mapper.record(Some(&payload));

        // Assert
        assert_eq!(Some("Signup"), record.name());
        assert_eq!(Some("42"), record.user());
        assert_eq!(
            &hashmap![
                "Account".to_owned() => "42".to_owned(),
                "distinct_id".to_owned() => "42".to_owned(),
            ],
            record.data()
        );
        assert!(record.complete());
    }

    #[test]
    fn to_record_should_fail_on_invalid_json() {
        // Arrange
        let mapper = EventMapper::new(StructureMapperConfig {
            structure: vec![],
            user: user_config("Account", "distinct_id"),
        });

        // Act
        let result = mapper.to_record("{event: 'Signup'}");

        // Assert
        assert!(result.is_err());
        match result {
            Err(MapperError::JsonParsingError { .. }) => {}
            _ => panic!("expected a JsonParsingError"),
        }
    }

    #[test]
    fn to_record_should_map_a_purchase_payload() {
        // Arrange
        let mapper = EventMapper::new(StructureMapperConfig {
            structure: vec![group("order", &[("sku", "SKU"), ("qty", "Qty")])],
            user: user_config("Account", "distinct_id"),
        });

        // Act
        let record = mapper
            .to_record(r#"{"event": "Purchase", "order": {"sku": "X1", "qty": 3}}"#)
            .unwrap();

        // Assert
        assert_eq!(Some("Purchase"), record.name());
        assert_eq!(None, record.user());
        assert_eq!(
            &hashmap![
                "SKU".to_owned() => "X1".to_owned(),
                "Qty".to_owned() => "3".to_owned(),
            ],
            record.data()
        );
        assert!(record.complete());
    }

    #[test]
    fn verify_expected_io() {
        verify_io(
            "./test_resources/01_config.json",
            "./test_resources/01_input.json",
            "./test_resources/01_output.json",
        );
        verify_io(
            "./test_resources/02_config.json",
            "./test_resources/02_input.json",
            "./test_resources/02_output.json",
        );
    }

    fn verify_io(config_path: &str, input_path: &str, output_path: &str) {
        // Arrange
        let config_json = fs::read_to_string(config_path)
            .unwrap_or_else(|_| panic!("Unable to open the file [{}]", config_path));
        let config: StructureMapperConfig = serde_json::from_str(&config_json)
            .unwrap_or_else(|e| panic!("Cannot parse config json. Err: {:?}", e));

        let mapper = EventMapper::new(config);

        let input_json = fs::read_to_string(input_path)
            .unwrap_or_else(|_| panic!("Unable to open the file [{}]", input_path));

        let output_json = fs::read_to_string(output_path)
            .unwrap_or_else(|_| panic!("Unable to open the file [{}]", output_path));
        let expected_record: EventRecord = serde_json::from_str(&output_json)
            .unwrap_or_else(|e| panic!("Cannot parse output json. Err: {:?}", e));

        // Act
        let result = mapper.to_record(input_json.as_str());

        // Assert
        assert!(result.is_ok());
        assert_eq!(expected_record, result.unwrap());
    }
}
