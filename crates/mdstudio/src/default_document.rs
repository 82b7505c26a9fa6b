/// Document shown on first start, after a schema version change, and on reset.
pub const DEFAULT_DOCUMENT: &str = include_str!("../assets/default.md");
