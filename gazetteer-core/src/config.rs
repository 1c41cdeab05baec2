//! # Configuração
//!
//! Todas as opções reconhecidas pelo gazetteer, em JSON (`snake_case`):
//!
//! ```json
//! {
//!   "normalization_fallback_to_covered_text": true,
//!   "key_feature": "lemma",
//!   "case_folding": "lowercase",
//!   "boundary_region_source": "sentence",
//!   "adapter_variant": "tagged",
//!   "tag_metadata_field": "label",
//!   "multiple_metadata_policy": "emit_one_per_value",
//!   "dictionary_path": "dados/cidades.txt"
//! }
//! ```
//!
//! Opções ausentes assumem o valor padrão. Variantes desconhecidas de adaptador ou
//! de fonte de fronteiras, e o adaptador `tagged` sem `tag_metadata_field`, são erros
//! de configuração fatais na inicialização.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::adapter::{AnnotationAdapter, MultipleMetadataPolicy};
use crate::boundary::BoundarySource;
use crate::error::{GazetteerError, Result};
use crate::normalizer::{CaseFolding, Normalizer};
use crate::tokenizer::LEMMA_FEATURE;

/// Variante de adaptador, como aparece na configuração.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterVariant {
    Default,
    Tagged,
}

impl Default for AdapterVariant {
    fn default() -> Self {
        AdapterVariant::Default
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GazetteerConfig {
    /// Usa o texto literal do token quando não há forma normalizada.
    pub normalization_fallback_to_covered_text: bool,
    /// Feature lida como forma normalizada.
    pub key_feature: String,
    pub case_folding: CaseFolding,
    pub boundary_region_source: BoundarySource,
    pub adapter_variant: AdapterVariant,
    /// Campo do metadado exposto como tag (obrigatório com `tagged`).
    pub tag_metadata_field: Option<String>,
    pub multiple_metadata_policy: MultipleMetadataPolicy,
    /// Arquivo do dicionário, relativo ao diretório de trabalho.
    pub dictionary_path: Option<PathBuf>,
}

impl Default for GazetteerConfig {
    fn default() -> Self {
        Self {
            normalization_fallback_to_covered_text: true,
            key_feature: LEMMA_FEATURE.to_string(),
            case_folding: CaseFolding::default(),
            boundary_region_source: BoundarySource::default(),
            adapter_variant: AdapterVariant::default(),
            tag_metadata_field: None,
            multiple_metadata_policy: MultipleMetadataPolicy::default(),
            dictionary_path: None,
        }
    }
}

impl GazetteerConfig {
    /// Lê e valida uma configuração JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| GazetteerError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| GazetteerError::io(path, e))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.key_feature.trim().is_empty() {
            return Err(GazetteerError::config("key_feature não pode ser vazio"));
        }
        if self.adapter_variant == AdapterVariant::Tagged {
            match self.tag_metadata_field.as_deref().map(str::trim) {
                Some(field) if !field.is_empty() => {}
                _ => {
                    return Err(GazetteerError::config(
                        "adapter_variant = tagged exige tag_metadata_field",
                    ))
                }
            }
        }
        Ok(())
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(
            self.key_feature.trim(),
            self.normalization_fallback_to_covered_text,
            self.case_folding,
        )
    }

    /// Monta o adaptador configurado. Valida antes.
    pub fn adapter(&self) -> Result<AnnotationAdapter> {
        self.validate()?;
        Ok(match self.adapter_variant {
            AdapterVariant::Default => AnnotationAdapter::Default,
            AdapterVariant::Tagged => AnnotationAdapter::Tagged {
                field: self
                    .tag_metadata_field
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_string(),
                policy: self.multiple_metadata_policy,
            },
        })
    }
}
