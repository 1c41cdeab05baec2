//! # Metadados de Entradas do Dicionário
//!
//! O autômato é genérico sobre o tipo de metadado `V`. O adaptador etiquetado só
//! precisa ler **um campo nomeado** de cada valor, o que é expresso pelo trait
//! [`MetadataFields`].
//!
//! [`EntryMetadata`] é o tipo usado pelo pipeline e pelo formato textual do dicionário.
//! O lado direito de `chaves => metadado` aceita três formas:
//!
//! | Forma                          | Campos resultantes                 |
//! |--------------------------------|------------------------------------|
//! | `LOC`                          | `label=LOC`                        |
//! | `label=LOC; id=Q60`            | `label=LOC`, `id=Q60`              |
//! | `{"label": "LOC", "pop": 8}`   | `label=LOC`, `pop=8`               |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Campo usado quando o metadado é um valor simples (sem `chave=valor`).
pub const LABEL_FIELD: &str = "label";

/// Acesso a campos nomeados de um metadado.
pub trait MetadataFields {
    fn field(&self, name: &str) -> Option<&str>;
}

/// Uma `String` é um metadado de um único valor: qualquer campo resolve para ela.
impl MetadataFields for String {
    fn field(&self, _name: &str) -> Option<&str> {
        Some(self.as_str())
    }
}

/// Metadado estruturado de uma entrada do dicionário.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Texto original após `=>`.
    pub raw: String,
    /// Campos interpretados, em ordem alfabética.
    pub fields: BTreeMap<String, String>,
}

impl EntryMetadata {
    /// Metadado com apenas o campo `label`.
    pub fn label(value: impl Into<String>) -> Self {
        let value = value.into();
        let mut fields = BTreeMap::new();
        fields.insert(LABEL_FIELD.to_string(), value.clone());
        Self { raw: value, fields }
    }

    /// Interpreta o lado direito de uma linha do dicionário.
    ///
    /// Retorna `Err(motivo)`; quem chama anexa linha e conteúdo ao erro.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err("metadado vazio".to_string());
        }

        let fields = if raw.starts_with('{') {
            parse_json_fields(raw)?
        } else if raw.contains('=') {
            parse_pairs(raw)?
        } else {
            let mut fields = BTreeMap::new();
            fields.insert(LABEL_FIELD.to_string(), raw.to_string());
            fields
        };

        Ok(Self {
            raw: raw.to_string(),
            fields,
        })
    }
}

impl MetadataFields for EntryMetadata {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

fn parse_json_fields(raw: &str) -> Result<BTreeMap<String, String>, String> {
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(raw).map_err(|e| format!("JSON inválido: {}", e))?;

    Ok(object
        .into_iter()
        .map(|(k, v)| {
            let value = match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (k, value)
        })
        .collect())
}

fn parse_pairs(raw: &str) -> Result<BTreeMap<String, String>, String> {
    let mut fields = BTreeMap::new();
    for pair in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("par sem '=': {:?}", pair))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("campo sem nome: {:?}", pair));
        }
        fields.insert(key.to_string(), value.trim().to_string());
    }
    Ok(fields)
}
