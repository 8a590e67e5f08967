use serde::{Deserialize, Deserializer, Serialize};

/// The closed set of spending categories known to the service.
///
/// Parsing with `FromStr` (user input) is strict. Decoding a transaction that came back from the
/// service goes through [`Category::decode`], which maps anything unrecognized to `Other` so that
/// a newer service cannot break an older client.
#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    #[default]
    Food,
    Transport,
    Utilities,
    Entertainment,
    Health,
    Other,
}

serde_plain::derive_display_from_serialize!(Category);
serde_plain::derive_fromstr_from_deserialize!(Category);

impl Category {
    /// All categories in the order the service declares them.
    pub const ALL: [Category; 6] = [
        Category::Food,
        Category::Transport,
        Category::Utilities,
        Category::Entertainment,
        Category::Health,
        Category::Other,
    ];

    /// Decodes a category name received from the service. Unknown names become `Other`.
    pub fn decode(s: &str) -> Category {
        s.trim().to_uppercase().parse().unwrap_or(Category::Other)
    }
}

/// Serde helper for the `category` field of records received from the service.
pub(crate) fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Category, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(Category::decode(&s))
}
