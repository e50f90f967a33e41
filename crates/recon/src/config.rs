use serde::Deserialize;

use crate::error::ReconError;
use crate::model::Field;

/// Presentation value for a missing cell.
pub const DEFAULT_MISSING_VALUE: &str = "N/A";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Merge behaviour: column aliases, key priority and the missing-value marker.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub columns: ColumnMap,
    /// Fields tried in order when picking the master's key column.
    pub key_priority: Vec<Field>,
    /// Written for absent values; read back as absent.
    pub missing_value: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            columns: ColumnMap::default(),
            key_priority: vec![Field::Website, Field::Name],
            missing_value: DEFAULT_MISSING_VALUE.to_string(),
        }
    }
}

impl MergeConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: MergeConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.key_priority.is_empty() {
            return Err(ReconError::ConfigValidation("key_priority must not be empty".into()));
        }
        if self.key_priority.iter().any(|f| f.is_phone()) {
            return Err(ReconError::ConfigValidation(
                "phone fields cannot be merge keys".into(),
            ));
        }
        for field in Field::ALL {
            if self.columns.aliases(field).is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "columns.{field}: at least one column name is required"
                )));
            }
        }
        Ok(())
    }

    /// True for blank cells and the missing-value marker.
    pub fn is_missing(&self, cell: &str) -> bool {
        let trimmed = cell.trim();
        trimmed.is_empty() || trimmed.eq_ignore_ascii_case(&self.missing_value)
    }

    /// `cell` with the missing-value marker mapped to `None`.
    pub fn present<'a>(&self, cell: &'a str) -> Option<&'a str> {
        if self.is_missing(cell) {
            None
        } else {
            Some(cell.trim())
        }
    }
}

// ---------------------------------------------------------------------------
// Column aliases
// ---------------------------------------------------------------------------

/// Column names per field. The first alias is what exports write; any alias
/// is accepted on read. Matching is on the trimmed header text.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub name: Vec<String>,
    pub mobile: Vec<String>,
    pub landline: Vec<String>,
    pub email: Vec<String>,
    pub website: Vec<String>,
    pub city: Vec<String>,
    pub address: Vec<String>,
    pub maps_url: Vec<String>,
    pub external_id: Vec<String>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            name: names(&["Nombre", "Name"]),
            mobile: names(&["WhatsApp", "Celular", "Mobile"]),
            landline: names(&["Telefono", "Teléfono", "Phone"]),
            email: names(&["Correo", "Email"]),
            website: names(&["Pagina Web", "Página Web", "Website"]),
            city: names(&["Ciudad", "City"]),
            address: names(&["Direccion", "Dirección", "Address"]),
            maps_url: names(&["Google Maps", "Maps URL"]),
            external_id: names(&["Place ID", "External ID"]),
        }
    }
}

impl ColumnMap {
    pub fn aliases(&self, field: Field) -> &[String] {
        match field {
            Field::Name => &self.name,
            Field::Mobile => &self.mobile,
            Field::Landline => &self.landline,
            Field::Email => &self.email,
            Field::Website => &self.website,
            Field::City => &self.city,
            Field::Address => &self.address,
            Field::MapsUrl => &self.maps_url,
            Field::ExternalId => &self.external_id,
        }
    }

    /// Column name written for `field` on export.
    pub fn primary(&self, field: Field) -> &str {
        self.aliases(field).first().map(String::as_str).unwrap_or(field.as_str())
    }

    /// Index of the column designated for `field`: the first alias present.
    pub fn resolve(&self, field: Field, columns: &[String]) -> Option<usize> {
        self.aliases(field)
            .iter()
            .find_map(|alias| columns.iter().position(|c| c.trim() == alias.trim()))
    }

    /// Which field a header names, if any.
    pub fn field_for(&self, header: &str) -> Option<Field> {
        let header = header.trim();
        Field::ALL
            .into_iter()
            .find(|f| self.aliases(*f).iter().any(|a| a.trim() == header))
    }
}
