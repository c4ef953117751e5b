//! The two legally separate businesses served by the pipeline.

use std::fmt;
use std::str::FromStr;

/// Selects one of two otherwise-identical persistence namespaces.
///
/// The categorization cache (`cache/`) is shared across both; everything
/// else in `repository/` and `review/` is routed per-entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Corp,
    SoleProp,
}

impl Entity {
    /// The Postgres schema name this entity is routed to.
    pub fn schema(&self) -> &'static str {
        match self {
            Entity::Corp => "corp",
            Entity::SoleProp => "soleprop",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.schema())
    }
}

impl FromStr for Entity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "corp" => Ok(Entity::Corp),
            "soleprop" => Ok(Entity::SoleProp),
            other => Err(format!("unknown entity: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_schema_name() {
        for e in [Entity::Corp, Entity::SoleProp] {
            assert_eq!(Entity::from_str(e.schema()).unwrap(), e);
        }
    }

    #[test]
    fn rejects_unknown_entity() {
        assert!(Entity::from_str("other_business").is_err());
    }
}
