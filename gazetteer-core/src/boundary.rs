//! # Fontes de Regiões de Fronteira
//!
//! As regiões que limitam os casamentos normalmente vêm de um componente externo
//! (segmentador de sentenças, chunker sintático). Para o servidor de demonstração e
//! para testes, o crate oferece fontes simples, selecionadas por configuração:
//!
//! | Fonte      | Regiões                                                   |
//! |------------|-----------------------------------------------------------|
//! | `document` | uma única região com todos os tokens                       |
//! | `sentence` | uma região por sentença (termina em `.`, `!`, `?`, `;`, `…`) |
//! | `supplied` | fornecidas pelo chamador a cada requisição                 |

use serde::{Deserialize, Serialize};

use crate::matcher::BoundaryRegion;
use crate::tokenizer::Token;

/// Qual componente fornece as regiões de fronteira.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundarySource {
    Document,
    Sentence,
    Supplied,
}

impl Default for BoundarySource {
    fn default() -> Self {
        BoundarySource::Document
    }
}

impl BoundarySource {
    /// Calcula as regiões para os tokens do documento.
    ///
    /// `supplied` são as regiões vindas do chamador. Para `Supplied`, a ausência
    /// delas significa "documento inteiro" (retorna `None`, que o casador interpreta assim).
    /// Para as demais fontes, regiões fornecidas têm precedência.
    pub fn resolve(&self, tokens: &[Token], supplied: Option<Vec<BoundaryRegion>>) -> Option<Vec<BoundaryRegion>> {
        if supplied.is_some() {
            return supplied;
        }
        match self {
            BoundarySource::Document => Some(document_regions(tokens.len())),
            BoundarySource::Sentence => Some(sentence_regions(tokens)),
            BoundarySource::Supplied => None,
        }
    }
}

/// Uma região cobrindo o documento inteiro (nenhuma se o documento for vazio).
pub fn document_regions(token_count: usize) -> Vec<BoundaryRegion> {
    if token_count == 0 {
        Vec::new()
    } else {
        vec![BoundaryRegion::new(0, token_count)]
    }
}

/// Uma região por sentença. A pontuação final pertence à sentença que ela encerra.
///
/// Uma abreviação como "etc." seguida de palavra maiúscula também fecha a sentença,
/// já que o tokenizador cola o ponto nela.
pub fn sentence_regions(tokens: &[Token]) -> Vec<BoundaryRegion> {
    let mut regions = Vec::new();
    let mut start = 0;

    for (i, token) in tokens.iter().enumerate() {
        let closes_with_abbreviation = token.is_closing_abbreviation()
            && tokens.get(i + 1).map(Token::is_capitalized).unwrap_or(false);

        if token.is_sentence_final() || closes_with_abbreviation {
            regions.push(BoundaryRegion::new(start, i + 1));
            start = i + 1;
        }
    }
    if start < tokens.len() {
        regions.push(BoundaryRegion::new(start, tokens.len()));
    }

    regions
}
