//! Reusable component categories.

use std::fmt;

use serde::Serialize;

/// The nine reusable component kinds of an OpenAPI `components` section.
///
/// Declaration order is the order lifted components are written back into
/// the root document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Schemas,
    Responses,
    Parameters,
    Examples,
    RequestBodies,
    Headers,
    Links,
    Callbacks,
    PathItems,
}

impl Category {
    /// All categories in write-back order.
    pub const ALL: [Self; 9] = [
        Self::Schemas,
        Self::Responses,
        Self::Parameters,
        Self::Examples,
        Self::RequestBodies,
        Self::Headers,
        Self::Links,
        Self::Callbacks,
        Self::PathItems,
    ];

    /// The key under `components` (`schemas`, `requestBodies`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Schemas => "schemas",
            Self::Responses => "responses",
            Self::Parameters => "parameters",
            Self::Examples => "examples",
            Self::RequestBodies => "requestBodies",
            Self::Headers => "headers",
            Self::Links => "links",
            Self::Callbacks => "callbacks",
            Self::PathItems => "pathItems",
        }
    }

    /// Parse a `components` key.
    #[must_use]
    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == segment)
    }

    /// Same-document pointer to the component `name` (already unescaped).
    #[must_use]
    pub fn local_ref(self, name: &str) -> String {
        format!(
            "#/components/{}/{}",
            self.as_str(),
            stitch_index::pointer::escape(name)
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
