//! # Dicionário: Construtor e Autômato (Trie de Chaves)
//!
//! O gazetteer é compilado **uma única vez** na inicialização em um [`Automaton`]:
//! uma trie cujas arestas são chaves normalizadas inteiras (palavras, não caracteres).
//!
//! ```text
//! raiz ──nova──▶ n1 ──york──▶ n2 {CITY} ──city──▶ n3 {CITY_LONG}
//!   └───são───▶ n4 ──paulo──▶ n5 {LOC, ORG}
//! ```
//!
//! - Cada nó terminal guarda o **conjunto** de metadados das entradas que terminam nele
//!   (duas entradas podem ter a mesma sequência de chaves com metadados distintos).
//! - Os nós vivem em uma arena (`Vec`) e se referenciam por índice: sem ponteiros,
//!   sem ciclos, e o autômato é `Send + Sync` sempre que `V` for.
//! - Depois de `build()` o construtor fica congelado: novas entradas retornam
//!   [`GazetteerError::AutomatonFrozen`].
//!
//! ## Formato textual
//!
//! ```text
//! # comentários e linhas em branco são ignorados
//! nova york        => CITY
//! nova york city   => label=CITY_LONG; id=Q60
//! são paulo        => {"label": "LOC"}
//! ```

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{GazetteerError, Result};
use crate::metadata::EntryMetadata;
use crate::normalizer::Normalizer;

/// Separador entre chaves e metadado no formato textual.
pub const ENTRY_SEPARATOR: &str = "=>";

/// Identificador de nó na arena do autômato.
pub type NodeId = usize;

/// Uma entrada do dicionário: sequência não vazia de chaves + metadado.
#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryEntry<V> {
    pub keys: Vec<String>,
    pub metadata: V,
}

#[derive(Debug, Clone)]
struct Node<V> {
    children: HashMap<String, NodeId>,
    values: Vec<V>,
}

impl<V> Node<V> {
    fn new() -> Self {
        Self {
            children: HashMap::new(),
            values: Vec::new(),
        }
    }
}

/// Trie imutável sobre chaves normalizadas.
#[derive(Debug, Clone)]
pub struct Automaton<V> {
    nodes: Vec<Node<V>>,
    entry_count: usize,
}

impl<V> Automaton<V> {
    /// Nó raiz (sempre o índice 0 da arena).
    pub fn root(&self) -> NodeId {
        0
    }

    /// Segue a aresta `key` a partir de `node`.
    pub fn step(&self, node: NodeId, key: &str) -> Option<NodeId> {
        self.nodes.get(node)?.children.get(key).copied()
    }

    /// Metadados do nó (vazio se não for terminal).
    pub fn values(&self, node: NodeId) -> &[V] {
        self.nodes
            .get(node)
            .map(|n| n.values.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_terminal(&self, node: NodeId) -> bool {
        !self.values(node).is_empty()
    }

    /// Busca exata de uma sequência de chaves já normalizadas.
    pub fn lookup<S: AsRef<str>>(&self, keys: &[S]) -> Option<&[V]> {
        let mut node = self.root();
        for key in keys {
            node = self.step(node, key.as_ref())?;
        }
        let values = self.values(node);
        if values.is_empty() {
            None
        } else {
            Some(values)
        }
    }

    /// Número de nós (incluindo a raiz).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Número de sequências de chaves distintas (nós terminais).
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Número total de metadados guardados.
    pub fn value_count(&self) -> usize {
        self.nodes.iter().map(|n| n.values.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }
}

/// Construtor do autômato: acumula entradas e compila em `build()`.
#[derive(Debug)]
pub struct DictionaryBuilder<V> {
    normalizer: Normalizer,
    pending: Vec<DictionaryEntry<V>>,
    frozen: bool,
}

impl<V: PartialEq> DictionaryBuilder<V> {
    /// O normalizador define a política de caixa aplicada às chaves.
    /// Deve ser o mesmo usado na varredura.
    pub fn new(normalizer: Normalizer) -> Self {
        Self {
            normalizer,
            pending: Vec::new(),
            frozen: false,
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Entradas aguardando `build()`.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Registra uma entrada. As chaves passam pela política de caixa do normalizador.
    pub fn add_entry<S: AsRef<str>>(&mut self, keys: &[S], metadata: V) -> Result<()> {
        if self.frozen {
            return Err(GazetteerError::AutomatonFrozen);
        }
        let keys = self.normalize_keys(keys, None)?;
        self.pending.push(DictionaryEntry { keys, metadata });
        Ok(())
    }

    /// Compila as entradas pendentes e congela o construtor.
    ///
    /// Custo O(soma dos comprimentos das entradas).
    pub fn build(&mut self) -> Result<Automaton<V>> {
        if self.frozen {
            return Err(GazetteerError::AutomatonFrozen);
        }
        self.frozen = true;

        let pending = std::mem::take(&mut self.pending);
        let total = pending.len();
        let mut nodes: Vec<Node<V>> = vec![Node::new()];
        let mut entry_count = 0;

        for entry in pending {
            let mut current = 0;
            for key in entry.keys {
                let existing = nodes[current].children.get(&key).copied();
                current = match existing {
                    Some(next) => next,
                    None => {
                        let next = nodes.len();
                        nodes.push(Node::new());
                        nodes[current].children.insert(key, next);
                        next
                    }
                };
            }

            let terminal = &mut nodes[current];
            if terminal.values.is_empty() {
                entry_count += 1;
            }
            if terminal.values.contains(&entry.metadata) {
                debug!("metadado duplicado ignorado (nó {})", current);
            } else {
                terminal.values.push(entry.metadata);
            }
        }

        info!(
            entries = total,
            sequences = entry_count,
            nodes = nodes.len(),
            "autômato do gazetteer construído"
        );

        Ok(Automaton { nodes, entry_count })
    }

    fn normalize_keys<S: AsRef<str>>(&self, keys: &[S], line: Option<usize>) -> Result<Vec<String>> {
        let content = || {
            keys.iter()
                .map(|k| k.as_ref())
                .collect::<Vec<_>>()
                .join(" ")
        };

        if keys.is_empty() {
            return Err(GazetteerError::malformed_entry(line, content(), "sequência de chaves vazia"));
        }

        let normalized: Vec<String> = keys.iter().map(|k| self.normalizer.normalize_key(k.as_ref())).collect();
        if normalized.iter().any(|k| k.is_empty()) {
            return Err(GazetteerError::malformed_entry(line, content(), "chave vazia na sequência"));
        }
        Ok(normalized)
    }
}

impl DictionaryBuilder<EntryMetadata> {
    /// Interpreta uma fonte textual no formato `chave1 chave2 => metadado`.
    ///
    /// A fonte inteira é validada antes de qualquer entrada ser registrada.
    /// Retorna o número de entradas adicionadas.
    pub fn add_source(&mut self, source: &str) -> Result<usize> {
        if self.frozen {
            return Err(GazetteerError::AutomatonFrozen);
        }

        let mut parsed = Vec::new();
        for (i, line) in source.lines().enumerate() {
            if let Some(entry) = self.parse_line(line, i + 1)? {
                parsed.push(entry);
            }
        }

        let added = parsed.len();
        self.pending.extend(parsed);
        debug!("{} entradas lidas da fonte do dicionário", added);
        Ok(added)
    }

    /// Lê um arquivo de dicionário do disco.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| GazetteerError::io(path, e))?;
        let added = self.add_source(&source)?;
        info!("{} entradas carregadas de {}", added, path.display());
        Ok(added)
    }

    fn parse_line(&self, line: &str, line_no: usize) -> Result<Option<DictionaryEntry<EntryMetadata>>> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }

        let (lhs, rhs) = trimmed.split_once(ENTRY_SEPARATOR).ok_or_else(|| {
            GazetteerError::malformed_entry(Some(line_no), line, format!("faltando '{}'", ENTRY_SEPARATOR))
        })?;

        let raw_keys: Vec<&str> = lhs.split_whitespace().collect();
        let keys = self
            .normalize_keys(&raw_keys, Some(line_no))
            .map_err(|_| GazetteerError::malformed_entry(Some(line_no), line, "sequência de chaves vazia"))?;

        let metadata = EntryMetadata::parse(rhs)
            .map_err(|reason| GazetteerError::malformed_entry(Some(line_no), line, reason))?;

        Ok(Some(DictionaryEntry { keys, metadata }))
    }
}
