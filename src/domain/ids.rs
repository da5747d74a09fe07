//! Entity Identifiers
//!
//! Distinct newtypes per entity so a crop id can never build a plot key.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(String);

            impl $name {
                pub fn new(id: impl Into<String>) -> Self {
                    Self(id.into())
                }

                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<&str> for $name {
                fn from(id: &str) -> Self {
                    Self(id.to_string())
                }
            }

            impl From<String> for $name {
                fn from(id: String) -> Self {
                    Self(id)
                }
            }
        )+
    };
}

entity_id!(
    /// Field agent
    AgentId,
    PlotId,
    CropId,
    OperationId,
    ObservationId,
    VisitId,
    AlertId,
    /// Farmer
    ProducerId,
);
