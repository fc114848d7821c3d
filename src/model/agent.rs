//! Agents recorded in description-document headers.

use serde::Serialize;

/// Kind of agent, per the header vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AgentType {
    Individual,
    Organization,
    Other,
}

impl AgentType {
    pub fn name(&self) -> &'static str {
        match self {
            AgentType::Individual => "INDIVIDUAL",
            AgentType::Organization => "ORGANIZATION",
            AgentType::Other => "OTHER",
        }
    }

    /// Unknown declared types fall back to `Other`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_uppercase()) {
            Some(s) if s == "INDIVIDUAL" => AgentType::Individual,
            Some(s) if s == "ORGANIZATION" => AgentType::Organization,
            _ => AgentType::Other,
        }
    }
}

/// One agent (creator, submitter, preservation software, ...) attached to a
/// package or representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IPAgent {
    pub name: String,
    pub role: Option<String>,
    pub other_role: Option<String>,
    pub agent_type: AgentType,
    pub other_type: Option<String>,
    pub note: Option<String>,
}

impl IPAgent {
    pub fn new(name: impl Into<String>, agent_type: AgentType) -> Self {
        Self {
            name: name.into(),
            role: None,
            other_role: None,
            agent_type,
            other_type: None,
            note: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_other_role(mut self, other_role: impl Into<String>) -> Self {
        self.other_role = Some(other_role.into());
        self
    }

    pub fn with_other_type(mut self, other_type: impl Into<String>) -> Self {
        self.other_type = Some(other_type.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// The conventional "creator software" agent attached to built packages.
    pub fn creator_software(name: impl Into<String>) -> Self {
        IPAgent::new(name, AgentType::Other)
            .with_role("CREATOR")
            .with_other_type("SOFTWARE")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_type_fallback() {
        assert_eq!(AgentType::parse(Some("INDIVIDUAL")), AgentType::Individual);
        assert_eq!(AgentType::parse(Some("organization")), AgentType::Organization);
        assert_eq!(AgentType::parse(Some("ROBOT")), AgentType::Other);
        assert_eq!(AgentType::parse(None), AgentType::Other);
    }
}
