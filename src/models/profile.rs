use chrono::{ DateTime, Utc };
use serde::{ Serialize, Deserialize };

pub const PROFILE_SCHEMA_VERSION: u32 = 1;

/// User migration profile. Required fields are validated at the write
/// boundary before anything reaches the document store; timestamps are
/// server-assigned on write.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub nombre: String,
    pub email: String,
    pub pais_origen: String,
    pub pais_destino: String,
    pub motivo_migracion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nivel_educativo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experiencia_laboral: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado_documentos: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_provider: Option<String>,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_schema_version() -> u32 {
    PROFILE_SCHEMA_VERSION
}

impl UserProfile {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("id", &self.id),
            ("nombre", &self.nombre),
            ("email", &self.email),
            ("paisOrigen", &self.pais_origen),
            ("paisDestino", &self.pais_destino),
            ("motivoMigracion", &self.motivo_migracion),
        ] {
            if value.trim().is_empty() {
                return Err(format!("El campo '{}' es requerido", name));
            }
        }
        if !self.email.contains('@') {
            return Err("El email no es válido".to_string());
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ChecklistItem {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("El campo 'title' es requerido".to_string());
        }
        if self.category.trim().is_empty() {
            return Err("El campo 'category' es requerido".to_string());
        }
        Ok(())
    }
}
