//! # Adaptador de Anotações
//!
//! Projeta cada [`Match`] (intervalo de índices de token + metadados) em uma
//! [`Annotation`] sobre o texto original, usando os offsets dos tokens das pontas:
//! `tokens[start].begin .. tokens[end - 1].end`.
//!
//! O conjunto de variantes é **fechado** ([`AnnotationAdapter`]) e escolhido pela
//! configuração:
//!
//! - **Default**: um span genérico, sem tag.
//! - **Tagged**: o span recebe como tag o valor de um campo do metadado. Quando o nó
//!   terminal tem mais de um metadado, a [`MultipleMetadataPolicy`] decide entre usar o
//!   primeiro inserido ou emitir uma anotação por valor.
//!
//! Adaptadores não alteram o autômato nem os casamentos.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::matcher::Match;
use crate::metadata::MetadataFields;
use crate::tokenizer::TokenView;

/// Anotação emitida para o pipeline hospedeiro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Offset inicial (byte) no texto original.
    pub start: usize,
    /// Offset final (byte, exclusivo).
    pub end: usize,
    /// Índice do primeiro token coberto.
    pub start_token: usize,
    /// Índice do token seguinte ao último coberto (exclusivo).
    pub end_token: usize,
    /// Texto coberto (vazio se o texto original não foi fornecido).
    pub text: String,
    /// Tag extraída do metadado (apenas na variante etiquetada).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Destino das anotações emitidas.
pub trait AnnotationSink {
    fn push(&mut self, annotation: Annotation);
}

impl AnnotationSink for Vec<Annotation> {
    fn push(&mut self, annotation: Annotation) {
        Vec::push(self, annotation);
    }
}

/// O que fazer quando um casamento carrega mais de um metadado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultipleMetadataPolicy {
    /// Usa o primeiro metadado inserido no dicionário.
    FirstWins,
    /// Emite uma anotação por metadado, na ordem de inserção.
    EmitOnePerValue,
}

impl Default for MultipleMetadataPolicy {
    fn default() -> Self {
        MultipleMetadataPolicy::FirstWins
    }
}

/// Variantes de adaptador disponíveis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "variant")]
pub enum AnnotationAdapter {
    Default,
    Tagged {
        /// Campo do metadado usado como tag.
        field: String,
        policy: MultipleMetadataPolicy,
    },
}

impl Default for AnnotationAdapter {
    fn default() -> Self {
        AnnotationAdapter::Default
    }
}

impl AnnotationAdapter {
    pub fn tagged(field: impl Into<String>, policy: MultipleMetadataPolicy) -> Self {
        AnnotationAdapter::Tagged {
            field: field.into(),
            policy,
        }
    }

    /// Emite a(s) anotação(ões) de um casamento.
    ///
    /// Um casamento vazio ou que aponta para fora de `tokens` é ignorado.
    /// `text` é o documento original; se os offsets dos tokens não couberem nele
    /// (ou se `text` estiver vazio), o campo `text` da anotação fica vazio.
    pub fn emit<V, T, S>(&self, m: &Match<'_, V>, tokens: &[T], text: &str, sink: &mut S)
    where
        V: MetadataFields,
        T: TokenView,
        S: AnnotationSink + ?Sized,
    {
        let bounds = if m.is_empty() { None } else { tokens.get(m.start).zip(tokens.get(m.end - 1)) };
        let Some((first, last)) = bounds else {
            warn!(start = m.start, end = m.end, tokens = tokens.len(), "casamento fora da sequência de tokens ignorado");
            return;
        };
        let (start, _) = first.span();
        let (_, end) = last.span();
        let covered = text.get(start..end).unwrap_or_default().to_string();

        let base = Annotation {
            start,
            end,
            start_token: m.start,
            end_token: m.end,
            text: covered,
            tag: None,
        };

        match self {
            AnnotationAdapter::Default => sink.push(base),
            AnnotationAdapter::Tagged { field, policy } => match policy {
                MultipleMetadataPolicy::FirstWins => {
                    let tag = m.metadata.first().and_then(|v| v.field(field)).map(str::to_string);
                    sink.push(Annotation { tag, ..base });
                }
                MultipleMetadataPolicy::EmitOnePerValue => {
                    for value in m.metadata {
                        sink.push(Annotation {
                            tag: value.field(field).map(str::to_string),
                            ..base.clone()
                        });
                    }
                }
            },
        }
    }

    /// Emite todos os casamentos, na ordem, para um novo `Vec`.
    pub fn emit_all<V, T>(&self, matches: &[Match<'_, V>], tokens: &[T], text: &str) -> Vec<Annotation>
    where
        V: MetadataFields,
        T: TokenView,
    {
        let mut out = Vec::with_capacity(matches.len());
        for m in matches {
            self.emit(m, tokens, text, &mut out);
        }
        out
    }
}
