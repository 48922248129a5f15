//! Responsible parties and employee records.

use serde::Deserialize;

use super::entity::deserialize_id;

/// A responsible/owner reference: either the name is embedded or only the employee id is known.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ResponsibleParty {
    Named { name: String },
    Reference {
        #[serde(deserialize_with = "deserialize_id")]
        id: String,
    },
}

impl ResponsibleParty {
    pub fn embedded_name(&self) -> Option<&str> {
        match self {
            ResponsibleParty::Named { name } => Some(name),
            ResponsibleParty::Reference { .. } => None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Employee {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::ResponsibleParty;
    use serde_json::json;

    #[test]
    fn embedded_name_wins_over_id() {
        let party: ResponsibleParty =
            serde_json::from_value(json!({"id": "1", "name": "Анна Петрова"})).unwrap();
        assert_eq!(party.embedded_name(), Some("Анна Петрова"));
    }

    #[test]
    fn bare_reference_has_no_name() {
        let party: ResponsibleParty =
            serde_json::from_value(json!({"id": 1000005, "contentType": "Employee"})).unwrap();
        assert_eq!(
            party,
            ResponsibleParty::Reference {
                id: "1000005".to_string()
            }
        );
        assert_eq!(party.embedded_name(), None);
    }
}
