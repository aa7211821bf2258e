use convert_case::{Case, Casing};
use serde::{Deserialize, Serialize};

/// How criteria field names (Rust identifiers) map onto stored names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldNaming {
    #[default]
    AsIs,
    CamelCase,
    SnakeCase,
}

impl FieldNaming {
    pub fn apply(&self, name: &str) -> String {
        match self {
            FieldNaming::AsIs => name.to_string(),
            FieldNaming::CamelCase => name.to_case(Case::Camel),
            FieldNaming::SnakeCase => name.to_case(Case::Snake),
        }
    }

    /// Applies the naming to every segment of a dotted path.
    pub fn apply_path(&self, path: &str) -> String {
        path.split('.')
            .map(|segment| self.apply(segment))
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    Sqlite,
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        }
    }
}

/// Compiler settings a host application can load from its own config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub naming: FieldNaming,
    /// Joins nested criteria paths into one relational column name.
    pub column_separator: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            naming: FieldNaming::AsIs,
            column_separator: "_".to_string(),
        }
    }
}

impl CompilerConfig {
    /// Document path for a nested field path, e.g. `valid_for.start_date`.
    pub fn document_path(&self, path: &[&str]) -> String {
        path.iter()
            .map(|segment| self.naming.apply(segment))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Column name for a nested field path, e.g. `valid_for_start_date`.
    /// Naming applies per segment; the separator is kept as configured.
    pub fn column_name(&self, path: &[&str]) -> String {
        path.iter()
            .map(|segment| self.naming.apply(segment))
            .collect::<Vec<_>>()
            .join(&self.column_separator)
    }

    /// Column for a dotted name coming from includes or sort directives.
    pub fn column_for_dotted(&self, dotted: &str) -> String {
        let segments: Vec<&str> = dotted.split('.').collect();
        self.column_name(&segments)
    }
}
