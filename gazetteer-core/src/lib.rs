//! # gazetteer-core: Anotação por Dicionários Multi-palavra
//!
//! Este crate localiza, em uma sequência de tokens, as ocorrências **mais longas** de
//! entradas de um dicionário curado (gazetteer) e as projeta como anotações sobre o
//! texto original, carregando os metadados de cada entrada.
//!
//! ## Arquitetura do Sistema
//!
//! 1.  **Normalização** ([`normalizer`]): cada token vira uma chave de busca (lema ou texto literal).
//! 2.  **Dicionário** ([`dictionary`]): entradas `chaves => metadado` são compiladas uma vez em
//!     uma trie imutável, compartilhada entre threads.
//! 3.  **Casamento** ([`matcher`]): varredura gulosa, mais longa primeiro, sem sobreposição e
//!     sem atravessar regiões de fronteira ([`boundary`]).
//! 4.  **Adaptação** ([`adapter`]): cada casamento vira uma [`Annotation`] com offsets de caractere
//!     e, opcionalmente, uma tag tirada do metadado.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use gazetteer_core::{GazetteerConfig, GazetteerPipeline};
//!
//! let dictionary = "\
//! nova york      => LOC
//! nova york city => LOC
//! banco central  => ORG
//! ";
//!
//! let pipeline = GazetteerPipeline::from_config(&GazetteerConfig::default(), dictionary).unwrap();
//! let result = pipeline.annotate("O Banco Central de Nova York City").unwrap();
//!
//! let found: Vec<&str> = result.annotations.iter().map(|a| a.text.as_str()).collect();
//! assert_eq!(found, vec!["Banco Central", "Nova York City"]);
//! ```
//!
//! ## Módulos Principais
//!
//! - [`pipeline`]: orquestrador que conecta todos os estágios.
//! - [`config`]: opções reconhecidas e sua validação.
//! - [`error`]: taxonomia de erros.

pub mod adapter;
pub mod boundary;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod matcher;
pub mod metadata;
pub mod normalizer;
pub mod pipeline;
pub mod tokenizer;

pub use adapter::{Annotation, AnnotationAdapter, AnnotationSink, MultipleMetadataPolicy};
pub use boundary::BoundarySource;
pub use config::{AdapterVariant, GazetteerConfig};
pub use dictionary::{Automaton, DictionaryBuilder, DictionaryEntry};
pub use error::{GazetteerError, Result};
pub use matcher::{BoundaryRegion, Chunker, Match};
pub use metadata::{EntryMetadata, MetadataFields};
pub use normalizer::{CaseFolding, Normalizer};
pub use pipeline::{AnnotationResult, GazetteerPipeline, PipelineEvent};
pub use tokenizer::{Token, TokenView};
