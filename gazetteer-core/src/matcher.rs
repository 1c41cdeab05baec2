//! # Casador (Chunker): Varredura por Casamento Mais Longo
//!
//! Percorre a sequência de tokens de um documento contra o [`Automaton`] e devolve
//! casamentos **não sobrepostos**, respeitando as regiões de fronteira fornecidas
//! pelo pipeline hospedeiro.
//!
//! ## Algoritmo
//!
//! Para cada região `[s, e)`, de forma independente:
//!
//! 1. A partir da posição `i`, caminha na trie seguindo a chave normalizada de
//!    `tokens[i]`, `tokens[i+1]`, ... enquanto houver aresta e o passo estiver dentro de `[s, e)`.
//!    Um token sem chave (`None`) interrompe a caminhada.
//! 2. Guarda o nó terminal **mais profundo** alcançado (casamento mais longo em `i`).
//! 3. Se houve terminal em `j`, emite `(i, j)` e recomeça em `j`; senão recomeça em `i + 1`.
//!
//! O resultado é a cobertura gulosa da esquerda para a direita, mais longa primeiro.
//!
//! ```text
//! tokens:   new   york   city   is   big
//! regiões: [──────────────────────────────)
//! casam.:  [────────────────)               (0,3) CITY_LONG, não (0,2) CITY
//! ```
//!
//! Regiões malformadas (vazias, fora do documento, fora de ordem ou sobrepostas) são
//! erro do chamador: [`GazetteerError::InvalidBoundary`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dictionary::Automaton;
use crate::error::{GazetteerError, Result};
use crate::normalizer::Normalizer;
use crate::tokenizer::TokenView;

/// Intervalo `[start, end)` de índices de token que um casamento não pode atravessar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundaryRegion {
    pub start: usize,
    pub end: usize,
}

impl BoundaryRegion {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, start: usize, end: usize) -> bool {
        self.start <= start && end <= self.end
    }
}

/// Uma ocorrência de entrada do dicionário: `[start, end)` em índices de token.
///
/// `metadata` empresta o conjunto de valores do nó terminal do autômato.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match<'a, V> {
    pub start: usize,
    pub end: usize,
    pub metadata: &'a [V],
}

impl<V> Match<'_, V> {
    /// Número de tokens cobertos.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn overlaps(&self, other: &Match<'_, V>) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Verifica as pré-condições das regiões para um documento com `token_count` tokens.
pub fn validate_boundaries(regions: &[BoundaryRegion], token_count: usize) -> Result<()> {
    let mut previous: Option<&BoundaryRegion> = None;

    for region in regions {
        if region.start >= region.end {
            return Err(GazetteerError::invalid_boundary(format!(
                "região [{}, {}) vazia ou invertida",
                region.start, region.end
            )));
        }
        if region.end > token_count {
            return Err(GazetteerError::invalid_boundary(format!(
                "região [{}, {}) ultrapassa o documento de {} tokens",
                region.start, region.end, token_count
            )));
        }
        if let Some(prev) = previous {
            if region.start < prev.end {
                return Err(GazetteerError::invalid_boundary(format!(
                    "região [{}, {}) sobrepõe ou precede [{}, {})",
                    region.start, region.end, prev.start, prev.end
                )));
            }
        }
        previous = Some(region);
    }

    Ok(())
}

/// Casador guloso por casamento mais longo.
///
/// Apenas empresta o autômato e o normalizador: o mesmo autômato pode ser usado por
/// vários `Chunker`s em threads diferentes ao mesmo tempo.
#[derive(Debug)]
pub struct Chunker<'a, V> {
    automaton: &'a Automaton<V>,
    normalizer: &'a Normalizer,
}

impl<'a, V> Chunker<'a, V> {
    pub fn new(automaton: &'a Automaton<V>, normalizer: &'a Normalizer) -> Self {
        Self { automaton, normalizer }
    }

    /// Varre os tokens e devolve os casamentos ordenados por início.
    ///
    /// `boundaries = None` trata o documento inteiro como uma única região.
    /// Uma lista vazia de regiões não produz casamentos.
    pub fn scan<T: TokenView>(
        &self,
        tokens: &[T],
        boundaries: Option<&[BoundaryRegion]>,
    ) -> Result<Vec<Match<'a, V>>> {
        let whole;
        let regions = match boundaries {
            Some(regions) => regions,
            None if tokens.is_empty() => &[][..],
            None => {
                whole = [BoundaryRegion::new(0, tokens.len())];
                &whole[..]
            }
        };

        validate_boundaries(regions, tokens.len())?;

        if regions.is_empty() || self.automaton.is_empty() {
            return Ok(Vec::new());
        }

        // Chaves calculadas uma vez por token, por documento
        let keys: Vec<Option<String>> = tokens.iter().map(|t| self.normalizer.normalize(t)).collect();

        let mut matches = Vec::new();
        for region in regions {
            self.scan_region(&keys, region, &mut matches);
        }

        debug!(
            tokens = tokens.len(),
            regions = regions.len(),
            matches = matches.len(),
            "varredura concluída"
        );

        Ok(matches)
    }

    fn scan_region(&self, keys: &[Option<String>], region: &BoundaryRegion, out: &mut Vec<Match<'a, V>>) {
        let mut i = region.start;
        while i < region.end {
            match self.longest_at(keys, i, region.end) {
                Some((end, metadata)) => {
                    out.push(Match { start: i, end, metadata });
                    i = end;
                }
                None => i += 1,
            }
        }
    }

    /// Caminha na trie a partir de `start` e devolve o terminal mais profundo.
    fn longest_at(&self, keys: &[Option<String>], start: usize, limit: usize) -> Option<(usize, &'a [V])> {
        let automaton: &'a Automaton<V> = self.automaton;
        let mut node = automaton.root();
        let mut best = None;

        for (pos, key) in keys.iter().enumerate().take(limit).skip(start) {
            let Some(key) = key else { break };
            let Some(next) = automaton.step(node, key) else { break };
            node = next;
            if automaton.is_terminal(node) {
                best = Some((pos + 1, automaton.values(node)));
            }
        }

        best
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::dictionary::DictionaryBuilder;
    use crate::normalizer::CaseFolding;
    use crate::tokenizer::{Token, LEMMA_FEATURE};
    use proptest::prelude::*;

    const ALPHABET: [&str; 3] = ["a", "b", "c"];
    const MAX_TOKENS: usize = 16;

    // -- Strategy helpers --

    fn arb_dictionary() -> impl Strategy<Value = Vec<Vec<usize>>> {
        prop::collection::vec(prop::collection::vec(0..ALPHABET.len(), 1..4), 1..6)
    }

    /// `(letra, tem_lema)`: sem lema e sem fallback o token fica sem chave.
    fn arb_tokens() -> impl Strategy<Value = Vec<(usize, bool)>> {
        prop::collection::vec((0..ALPHABET.len(), prop::bool::weighted(0.85)), 0..MAX_TOKENS)
    }

    fn build(entries: &[Vec<usize>]) -> Automaton<String> {
        let mut b = DictionaryBuilder::new(Normalizer::default());
        for (i, keys) in entries.iter().enumerate() {
            let keys: Vec<&str> = keys.iter().map(|&k| ALPHABET[k]).collect();
            b.add_entry(&keys, format!("E{}", i)).unwrap();
        }
        b.build().unwrap()
    }

    fn make_tokens(spec: &[(usize, bool)]) -> Vec<Token> {
        spec.iter()
            .enumerate()
            .map(|(i, &(letter, has_lemma))| {
                let token = Token::new(ALPHABET[letter], i * 2, i * 2 + 1, i);
                if has_lemma {
                    token.with_lemma(ALPHABET[letter])
                } else {
                    token
                }
            })
            .collect()
    }

    /// Particiona `[0, n)` nos pontos de corte e descarta as regiões não mantidas.
    fn make_regions(n: usize, cuts: &[bool], keep: &[bool]) -> Vec<BoundaryRegion> {
        let mut regions = Vec::new();
        let mut start = 0;
        for pos in 1..=n {
            if pos == n || cuts[pos] {
                regions.push(BoundaryRegion::new(start, pos));
                start = pos;
            }
        }
        regions
            .into_iter()
            .enumerate()
            .filter(|(i, _)| keep[*i])
            .map(|(_, r)| r)
            .collect()
    }

    fn terminal<'a>(
        automaton: &'a Automaton<String>,
        keys: &[Option<String>],
        start: usize,
        end: usize,
    ) -> Option<&'a [String]> {
        let path: Option<Vec<&str>> = keys[start..end].iter().map(|k| k.as_deref()).collect();
        automaton.lookup(&path?[..])
    }

    proptest! {
        #[test]
        fn scan_invariants_hold(
            entries in arb_dictionary(),
            spec in arb_tokens(),
            cuts in prop::collection::vec(any::<bool>(), MAX_TOKENS),
            keep in prop::collection::vec(prop::bool::weighted(0.8), MAX_TOKENS),
        ) {
            let automaton = build(&entries);
            let normalizer = Normalizer::new(LEMMA_FEATURE, false, CaseFolding::Lowercase);
            let toks = make_tokens(&spec);
            let regions = make_regions(toks.len(), &cuts, &keep);
            let chunker = Chunker::new(&automaton, &normalizer);

            let found = chunker.scan(&toks, Some(&regions[..])).unwrap();
            let again = chunker.scan(&toks, Some(&regions[..])).unwrap();
            prop_assert_eq!(&found, &again);

            let keys: Vec<Option<String>> = toks.iter().map(|t| normalizer.normalize(t)).collect();

            for (i, m) in found.iter().enumerate() {
                prop_assert!(m.start < m.end);
                if let Some(next) = found.get(i + 1) {
                    prop_assert!(m.end <= next.start, "{:?} sobrepõe {:?}", m, next);
                }

                let containing: Vec<&BoundaryRegion> =
                    regions.iter().filter(|r| r.contains(m.start, m.end)).collect();
                prop_assert_eq!(containing.len(), 1);
                let region = containing[0];

                prop_assert_eq!(terminal(&automaton, &keys, m.start, m.end), Some(m.metadata));

                for end in m.end + 1..=region.end {
                    prop_assert!(terminal(&automaton, &keys, m.start, end).is_none());
                }
            }

            // Posição não coberta não inicia nenhum casamento dentro da sua região
            for region in &regions {
                for pos in region.start..region.end {
                    if found.iter().any(|m| m.start <= pos && pos < m.end) {
                        continue;
                    }
                    for end in pos + 1..=region.end {
                        prop_assert!(terminal(&automaton, &keys, pos, end).is_none());
                    }
                }
            }
        }
    }
}
