//! # Tokens e Tokenizador
//!
//! O motor de casamento não é dono dos tokens: eles vêm de um componente externo
//! (tokenizador + morfologia) e são lidos através do trait [`TokenView`], que expõe
//! apenas o que o casamento precisa:
//!
//! - o intervalo de bytes `[begin, end)` no texto original;
//! - o texto coberto (usado como fallback de normalização);
//! - features nomeadas (ex: `lemma`), quando a morfologia as preencheu.
//!
//! Para uso isolado (testes, servidor de demonstração) o crate oferece o seu próprio
//! [`Token`] e um tokenizador simples baseado em fronteiras de palavra Unicode (UAX #29).
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use gazetteer_core::tokenizer::tokenize;
//!
//! // "Dr." fica junto; "curou-se" também; o ponto final é um token próprio
//! let tokens = tokenize("Dr. Silva curou-se.");
//! let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
//! assert_eq!(texts, vec!["Dr.", "Silva", "curou-se", "."]);
//! ```

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Nome da feature de forma normalizada (lema) em [`Token`].
pub const LEMMA_FEATURE: &str = "lemma";
/// Nome da feature que devolve o próprio texto do token.
pub const TEXT_FEATURE: &str = "text";

/// Visão somente-leitura de um token pertencente ao documento.
///
/// Implementado pelo [`Token`] do crate, mas qualquer tipo do pipeline hospedeiro
/// pode implementá-lo para evitar cópias.
pub trait TokenView {
    /// Intervalo de bytes `[begin, end)` no texto original.
    fn span(&self) -> (usize, usize);
    /// Texto literal coberto pelo token.
    fn covered_text(&self) -> &str;
    /// Valor de uma feature nomeada (ex: `lemma`), se disponível.
    fn feature(&self, name: &str) -> Option<&str>;
}

/// Um token extraído do texto original.
///
/// Mantém a posição exata no texto (`start` e `end`), o que permite projetar
/// um casamento de índices de token de volta para offsets de caractere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    /// O texto do token (ex: "Nova", ",", "York").
    pub text: String,
    /// Índice de byte inicial no texto original (inclusive).
    pub start: usize,
    /// Índice de byte final no texto original (exclusivo).
    pub end: usize,
    /// Índice sequencial do token no documento (0, 1, 2...).
    pub index: usize,
    /// Forma normalizada fornecida pela morfologia (se houver).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lemma: Option<String>,
}

impl Token {
    pub fn new(text: impl Into<String>, start: usize, end: usize, index: usize) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            index,
            lemma: None,
        }
    }

    /// Builder: define o lema do token.
    pub fn with_lemma(mut self, lemma: impl Into<String>) -> Self {
        self.lemma = Some(lemma.into());
        self
    }

    /// Pontuação que encerra uma sentença.
    pub fn is_sentence_final(&self) -> bool {
        SENTENCE_FINAL.contains(&self.text.as_str())
    }

    /// Abreviação cujo ponto também pode encerrar a sentença (ex: "etc.").
    ///
    /// Títulos como "Dr." ficam de fora: eles precedem um nome próprio.
    pub fn is_closing_abbreviation(&self) -> bool {
        CLOSING_ABBREVIATIONS.contains(&self.text.as_str())
    }

    /// Começa com letra maiúscula.
    pub fn is_capitalized(&self) -> bool {
        self.text.chars().next().map(char::is_uppercase).unwrap_or(false)
    }
}

impl TokenView for Token {
    fn span(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    fn covered_text(&self) -> &str {
        &self.text
    }

    fn feature(&self, name: &str) -> Option<&str> {
        match name {
            LEMMA_FEATURE | "normal_form" => self.lemma.as_deref(),
            TEXT_FEATURE => Some(&self.text),
            _ => None,
        }
    }
}

impl<T: TokenView + ?Sized> TokenView for &T {
    fn span(&self) -> (usize, usize) {
        (**self).span()
    }

    fn covered_text(&self) -> &str {
        (**self).covered_text()
    }

    fn feature(&self, name: &str) -> Option<&str> {
        (**self).feature(name)
    }
}

/// Abreviações comuns que mantêm o ponto colado (ex: "Dr.")
const ABBREVIATIONS: &[&str] = &[
    "Dr", "Dra", "Sr", "Sra", "Prof", "Profa", "Gov", "Dep", "Sen", "Min",
    "Gen", "Cap", "Av", "St", "Mr", "Mrs", "Ms", "etc", "vol", "art", "pág",
];

/// Abreviações que podem fechar a frase com o próprio ponto ("frutas etc. Depois...")
const CLOSING_ABBREVIATIONS: &[&str] = &["etc.", "vol.", "art.", "pág."];

/// Pontuações que encerram uma sentença (usadas pela fonte de fronteiras `sentence`)
const SENTENCE_FINAL: &[&str] = &[".", "!", "?", ";", "…"];

/// Tokeniza um texto em palavras e pontuações, preservando offsets de byte.
///
/// Parte das fronteiras de palavra Unicode e faz dois ajustes:
/// - abreviação seguida de ponto vira um único token ("Dr.");
/// - palavras ligadas por hífen ficam juntas ("curou-se", "Rio-Niterói").
pub fn tokenize(text: &str) -> Vec<Token> {
    let segments: Vec<(usize, &str)> = text
        .split_word_bound_indices()
        .filter(|(_, s)| !s.chars().all(char::is_whitespace))
        .collect();

    let mut tokens: Vec<Token> = Vec::with_capacity(segments.len());
    let mut i = 0;

    while i < segments.len() {
        let (offset, seg) = segments[i];
        let end = offset + seg.len();

        if let Some(prev) = tokens.last_mut() {
            let adjacent = prev.end == offset;

            // "Dr" + "." -> "Dr."
            if adjacent && seg == "." && ABBREVIATIONS.contains(&prev.text.as_str()) {
                prev.text.push('.');
                prev.end = end;
                i += 1;
                continue;
            }

            // "curou" + "-" + "se" -> "curou-se"
            if adjacent && seg == "-" && is_word(&prev.text) {
                if let Some(&(next_offset, next)) = segments.get(i + 1) {
                    if next_offset == end && is_word(next) {
                        prev.text.push('-');
                        prev.text.push_str(next);
                        prev.end = next_offset + next.len();
                        i += 2;
                        continue;
                    }
                }
            }
        }

        let index = tokens.len();
        tokens.push(Token::new(seg, offset, end, index));
        i += 1;
    }

    tokens
}

fn is_word(s: &str) -> bool {
    s.chars().next().map(char::is_alphanumeric).unwrap_or(false)
}
