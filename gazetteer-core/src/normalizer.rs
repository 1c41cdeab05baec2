//! # Normalizador: Token → Chave de Busca
//!
//! Cada token é convertido em uma **chave normalizada** antes de percorrer o autômato.
//! A mesma política de caixa é aplicada às chaves do dicionário (via
//! [`Normalizer::normalize_key`]), de modo que dicionário e entrada sejam sempre comparados
//! por igualdade exata.
//!
//! ## Ordem de resolução
//!
//! 1. Feature configurada (ex: `lemma`), se presente e não vazia.
//! 2. Texto coberto pelo token, se `fallback_to_covered_text` estiver ligado.
//! 3. `None`: o token não inicia nem continua nenhum casamento.

use serde::{Deserialize, Serialize};

use crate::tokenizer::{TokenView, LEMMA_FEATURE};

/// Política de caixa aplicada a dicionário e entrada.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseFolding {
    /// Compara exatamente como escrito.
    Preserve,
    /// Converte tudo para minúsculas (Unicode).
    Lowercase,
}

impl Default for CaseFolding {
    fn default() -> Self {
        CaseFolding::Lowercase
    }
}

/// Converte tokens em chaves normalizadas. Função pura da configuração e do token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Normalizer {
    /// Feature lida primeiro (ex: "lemma").
    pub key_feature: String,
    /// Usa o texto literal quando a feature está ausente.
    pub fallback_to_covered_text: bool,
    pub case_folding: CaseFolding,
}

impl Normalizer {
    pub fn new(key_feature: impl Into<String>, fallback_to_covered_text: bool, case_folding: CaseFolding) -> Self {
        Self {
            key_feature: key_feature.into(),
            fallback_to_covered_text,
            case_folding,
        }
    }

    /// Resolve a chave normalizada de um token.
    pub fn normalize<T: TokenView + ?Sized>(&self, token: &T) -> Option<String> {
        if let Some(value) = token.feature(&self.key_feature) {
            if !value.trim().is_empty() {
                return Some(self.normalize_key(value));
            }
        }

        if self.fallback_to_covered_text {
            let text = token.covered_text();
            if !text.trim().is_empty() {
                return Some(self.normalize_key(text));
            }
        }

        None
    }

    /// Aplica a política de caixa a uma chave (do dicionário ou da entrada).
    pub fn normalize_key(&self, key: &str) -> String {
        let key = key.trim();
        match self.case_folding {
            CaseFolding::Preserve => key.to_string(),
            CaseFolding::Lowercase => key.to_lowercase(),
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(LEMMA_FEATURE, true, CaseFolding::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::Token;

    #[test]
    fn test_feature_has_priority() {
        let n = Normalizer::default();
        let token = Token::new("Cidades", 0, 7, 0).with_lemma("cidade");
        assert_eq!(n.normalize(&token), Some("cidade".to_string()));
    }

    #[test]
    fn test_fallback_to_covered_text() {
        let n = Normalizer::new(LEMMA_FEATURE, true, CaseFolding::Lowercase);
        let token = Token::new("York", 0, 4, 0);
        assert_eq!(n.normalize(&token), Some("york".to_string()));
    }

    #[test]
    fn test_no_fallback_yields_none() {
        let n = Normalizer::new(LEMMA_FEATURE, false, CaseFolding::Lowercase);
        let token = Token::new("York", 0, 4, 0);
        assert_eq!(n.normalize(&token), None);
    }

    #[test]
    fn test_blank_lemma_falls_through() {
        let n = Normalizer::default();
        let token = Token::new("York", 0, 4, 0).with_lemma("  ");
        assert_eq!(n.normalize(&token), Some("york".to_string()));

        let strict = Normalizer::new(LEMMA_FEATURE, false, CaseFolding::Lowercase);
        assert_eq!(strict.normalize(&token), None);
    }

    #[test]
    fn test_preserve_case() {
        let n = Normalizer::new(LEMMA_FEATURE, true, CaseFolding::Preserve);
        let token = Token::new("York", 0, 4, 0);
        assert_eq!(n.normalize(&token), Some("York".to_string()));
        assert_eq!(n.normalize_key(" York "), "York");
    }

    #[test]
    fn test_custom_feature_name() {
        let n = Normalizer::new("text", false, CaseFolding::Lowercase);
        let token = Token::new("NOVA", 0, 4, 0);
        assert_eq!(n.normalize(&token), Some("nova".to_string()));
    }
}
