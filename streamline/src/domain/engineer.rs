use serde::{Deserialize, Serialize};

/// A Site Engineer a Development Officer can assign an activity to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engineer {
    #[serde(rename = "engineer_id")]
    pub id: i64,
    #[serde(rename = "engineer_name")]
    pub name: String,
    #[serde(default)]
    pub specialization: Option<String>,
}

impl Engineer {
    /// `Name (Specialization)`, or just the name.
    pub fn label(&self) -> String {
        match self.specialization.as_deref() {
            Some(s) if !s.trim().is_empty() => format!("{} ({})", self.name, s),
            _ => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_engineer_rows() {
        let engineer: Engineer = serde_json::from_str(
            r#"{"engineer_id": 3, "engineer_name": "N. Perera", "specialization": "Civil"}"#,
        )
        .unwrap();
        assert_eq!(engineer.id, 3);
        assert_eq!(engineer.label(), "N. Perera (Civil)");

        let engineer: Engineer =
            serde_json::from_str(r#"{"engineer_id": 4, "engineer_name": "A. Silva"}"#).unwrap();
        assert_eq!(engineer.label(), "A. Silva");
    }
}
