//! # Pipeline do Gazetteer: Orquestrador com Eventos Observáveis
//!
//! Conecta tokenizador, fonte de fronteiras, casador e adaptador. O autômato é
//! construído uma única vez e compartilhado (`Arc`) entre todas as chamadas; o estado
//! de cada documento (tokens, chaves, casamentos) pertence só à chamada que o processa.
//!
//! Como no restante do crate, cada passo pode ser observado por um canal `mpsc`
//! ([`GazetteerPipeline::annotate_streaming`]), o que permite a um servidor transmitir
//! o progresso em tempo real.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::adapter::{Annotation, AnnotationAdapter};
use crate::boundary::BoundarySource;
use crate::config::GazetteerConfig;
use crate::dictionary::{Automaton, DictionaryBuilder};
use crate::error::{GazetteerError, Result};
use crate::matcher::{BoundaryRegion, Chunker};
use crate::metadata::EntryMetadata;
use crate::normalizer::Normalizer;
use crate::tokenizer::{tokenize, Token};

/// Eventos emitidos durante o processamento de um documento.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    /// **Passo 1**: tokens disponíveis (do tokenizador ou do chamador).
    TokenizationDone { tokens: Vec<Token>, total: usize },
    /// **Passo 2**: regiões de fronteira efetivamente usadas.
    RegionsResolved { regions: Vec<BoundaryRegion> },
    /// **Passo 3**: um casamento selecionado pelo casador.
    MatchFound {
        start_token: usize,
        end_token: usize,
        metadata: Vec<EntryMetadata>,
    },
    /// **Passo 4**: uma anotação produzida pelo adaptador.
    AnnotationEmitted { annotation: Annotation },
    /// **Conclusão**.
    Done {
        annotations: Vec<Annotation>,
        total_tokens: usize,
        total_matches: usize,
        processing_ms: u64,
    },
    /// **Falha**: o documento foi abandonado; nenhum outro é afetado.
    Error { message: String },
}

/// Resultado síncrono de um documento.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationResult {
    pub tokens: Vec<Token>,
    pub annotations: Vec<Annotation>,
    pub total_matches: usize,
}

/// O pipeline principal.
///
/// `Clone` é barato: o autômato é compartilhado por `Arc`.
#[derive(Debug, Clone)]
pub struct GazetteerPipeline {
    automaton: Arc<Automaton<EntryMetadata>>,
    normalizer: Normalizer,
    adapter: AnnotationAdapter,
    boundary_source: BoundarySource,
}

impl GazetteerPipeline {
    pub fn new(
        automaton: Arc<Automaton<EntryMetadata>>,
        normalizer: Normalizer,
        adapter: AnnotationAdapter,
        boundary_source: BoundarySource,
    ) -> Self {
        Self {
            automaton,
            normalizer,
            adapter,
            boundary_source,
        }
    }

    /// Constrói o pipeline a partir da configuração e do texto do dicionário.
    pub fn from_config(config: &GazetteerConfig, dictionary_source: &str) -> Result<Self> {
        let adapter = config.adapter()?;
        let normalizer = config.normalizer();

        let mut builder = DictionaryBuilder::new(normalizer.clone());
        builder.add_source(dictionary_source)?;
        let automaton = builder.build()?;
        if automaton.is_empty() {
            warn!("dicionário vazio: nenhuma anotação será produzida");
        }

        Ok(Self::new(Arc::new(automaton), normalizer, adapter, config.boundary_region_source))
    }

    /// Como [`from_config`](Self::from_config), lendo o dicionário de `dictionary_path`.
    pub fn from_config_file(config: &GazetteerConfig) -> Result<Self> {
        let path = config
            .dictionary_path
            .as_ref()
            .ok_or_else(|| GazetteerError::config("dictionary_path não configurado"))?;
        let source = std::fs::read_to_string(path).map_err(|e| GazetteerError::io(path, e))?;
        Self::from_config(config, &source)
    }

    pub fn automaton(&self) -> &Arc<Automaton<EntryMetadata>> {
        &self.automaton
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn adapter(&self) -> &AnnotationAdapter {
        &self.adapter
    }

    pub fn boundary_source(&self) -> BoundarySource {
        self.boundary_source
    }

    /// Tokeniza e anota um texto.
    pub fn annotate(&self, text: &str) -> Result<AnnotationResult> {
        self.annotate_tokens(text, tokenize(text), None)
    }

    /// Anota tokens (e regiões, opcionalmente) fornecidos pelo pipeline hospedeiro.
    pub fn annotate_tokens(
        &self,
        text: &str,
        tokens: Vec<Token>,
        regions: Option<Vec<BoundaryRegion>>,
    ) -> Result<AnnotationResult> {
        self.run(text, tokens, regions, &mut |_| {})
    }

    /// Executa o pipeline enviando eventos de progresso pelo canal `tx`.
    ///
    /// Sempre termina com `Done` ou `Error`.
    pub fn annotate_streaming(
        &self,
        text: &str,
        regions: Option<Vec<BoundaryRegion>>,
        tx: mpsc::Sender<PipelineEvent>,
    ) {
        let tokens = tokenize(text);
        let result = self.run(text, tokens, regions, &mut |event| {
            let _ = tx.send(event);
        });
        if let Err(e) = result {
            let _ = tx.send(PipelineEvent::Error { message: e.to_string() });
        }
    }

    /// Anota vários documentos em paralelo sobre o mesmo autômato.
    pub fn annotate_batch(&self, texts: &[&str]) -> Vec<Result<AnnotationResult>> {
        texts.par_iter().map(|text| self.annotate(text)).collect()
    }

    fn run(
        &self,
        text: &str,
        tokens: Vec<Token>,
        regions: Option<Vec<BoundaryRegion>>,
        emit: &mut dyn FnMut(PipelineEvent),
    ) -> Result<AnnotationResult> {
        let start = Instant::now();

        // === Passo 1: Tokens ===
        emit(PipelineEvent::TokenizationDone {
            tokens: tokens.clone(),
            total: tokens.len(),
        });

        // === Passo 2: Regiões ===
        let regions = self.boundary_source.resolve(&tokens, regions);
        emit(PipelineEvent::RegionsResolved {
            regions: regions
                .clone()
                .unwrap_or_else(|| crate::boundary::document_regions(tokens.len())),
        });

        // === Passo 3: Varredura ===
        let chunker = Chunker::new(&self.automaton, &self.normalizer);
        let matches = chunker.scan(&tokens, regions.as_deref())?;

        // === Passo 4: Projeção em anotações ===
        let mut annotations = Vec::with_capacity(matches.len());
        for m in &matches {
            emit(PipelineEvent::MatchFound {
                start_token: m.start,
                end_token: m.end,
                metadata: m.metadata.to_vec(),
            });

            let first_new = annotations.len();
            self.adapter.emit(m, &tokens, text, &mut annotations);
            for annotation in &annotations[first_new..] {
                emit(PipelineEvent::AnnotationEmitted {
                    annotation: annotation.clone(),
                });
            }
        }

        let processing_ms = start.elapsed().as_millis() as u64;
        debug!(
            tokens = tokens.len(),
            matches = matches.len(),
            annotations = annotations.len(),
            processing_ms,
            "documento anotado"
        );

        emit(PipelineEvent::Done {
            annotations: annotations.clone(),
            total_tokens: tokens.len(),
            total_matches: matches.len(),
            processing_ms,
        });

        Ok(AnnotationResult {
            total_matches: matches.len(),
            tokens,
            annotations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MultipleMetadataPolicy;
    use crate::config::AdapterVariant;

    const DICTIONARY: &str = "\
nova york => label=LOC; id=Q60
nova york city => label=LOC
são paulo => LOC
são paulo => ORG
banco central => ORG
";

    fn tagged_config() -> GazetteerConfig {
        GazetteerConfig {
            adapter_variant: AdapterVariant::Tagged,
            tag_metadata_field: Some("label".to_string()),
            ..GazetteerConfig::default()
        }
    }

    #[test]
    fn test_annotate_default() {
        let pipeline = GazetteerPipeline::from_config(&GazetteerConfig::default(), DICTIONARY).unwrap();
        let result = pipeline.annotate("O Banco Central fica longe de Nova York.").unwrap();

        let texts: Vec<&str> = result.annotations.iter().map(|a| a.text.as_str()).collect();
        assert_eq!(texts, vec!["Banco Central", "Nova York"]);
        assert!(result.annotations.iter().all(|a| a.tag.is_none()));
        assert_eq!(result.total_matches, 2);
    }

    #[test]
    fn test_annotate_tagged_policies() {
        let pipeline = GazetteerPipeline::from_config(&tagged_config(), DICTIONARY).unwrap();
        let result = pipeline.annotate("Visitei São Paulo").unwrap();
        assert_eq!(result.annotations.len(), 1);
        assert_eq!(result.annotations[0].tag.as_deref(), Some("LOC"));

        let config = GazetteerConfig {
            multiple_metadata_policy: MultipleMetadataPolicy::EmitOnePerValue,
            ..tagged_config()
        };
        let pipeline = GazetteerPipeline::from_config(&config, DICTIONARY).unwrap();
        let result = pipeline.annotate("Visitei São Paulo").unwrap();
        let tags: Vec<Option<&str>> = result.annotations.iter().map(|a| a.tag.as_deref()).collect();
        assert_eq!(tags, vec![Some("LOC"), Some("ORG")]);
        assert_eq!(result.total_matches, 1);
    }

    #[test]
    fn test_sentence_boundaries_block_cross_sentence_matches() {
        let text = "Vim de Nova. York é outra.";
        let doc = GazetteerPipeline::from_config(&GazetteerConfig::default(), "nova york => LOC").unwrap();
        // "Nova . York" não casa mesmo sem fronteiras: o ponto está no meio
        assert!(doc.annotate(text).unwrap().annotations.is_empty());

        let tokens = vec![
            Token::new("Nova", 0, 4, 0),
            Token::new("York", 5, 9, 1),
        ];
        let regions = Some(vec![BoundaryRegion::new(0, 1), BoundaryRegion::new(1, 2)]);
        let result = doc.annotate_tokens("Nova York", tokens.clone(), regions).unwrap();
        assert!(result.annotations.is_empty());

        let result = doc.annotate_tokens("Nova York", tokens, None).unwrap();
        assert_eq!(result.annotations.len(), 1);
    }

    #[test]
    fn test_sentence_source() {
        let config = GazetteerConfig {
            boundary_region_source: BoundarySource::Sentence,
            ..GazetteerConfig::default()
        };
        let pipeline = GazetteerPipeline::from_config(&config, "fim de semana => TIME").unwrap();
        let result = pipeline.annotate("Chegou o fim. De semana em semana.").unwrap();
        assert!(result.annotations.is_empty());

        let result = pipeline.annotate("Chegou o fim de semana.").unwrap();
        assert_eq!(result.annotations.len(), 1);
        assert_eq!(result.annotations[0].text, "fim de semana");
    }

    #[test]
    fn test_host_supplied_lemmas() {
        let config = GazetteerConfig {
            normalization_fallback_to_covered_text: false,
            ..GazetteerConfig::default()
        };
        let pipeline = GazetteerPipeline::from_config(&config, "estado unido => LOC").unwrap();
        let text = "Estados Unidos";
        let tokens = vec![
            Token::new("Estados", 0, 7, 0).with_lemma("estado"),
            Token::new("Unidos", 8, 14, 1).with_lemma("unido"),
        ];
        let result = pipeline.annotate_tokens(text, tokens, None).unwrap();
        assert_eq!(result.annotations.len(), 1);
        assert_eq!(result.annotations[0].text, "Estados Unidos");

        // Sem lema e sem fallback, nada casa
        assert!(pipeline.annotate(text).unwrap().annotations.is_empty());
    }

    #[test]
    fn test_invalid_regions_fail_only_that_call() {
        let pipeline = GazetteerPipeline::from_config(&GazetteerConfig::default(), DICTIONARY).unwrap();
        let tokens = tokenize("Nova York");
        let err = pipeline
            .annotate_tokens("Nova York", tokens, Some(vec![BoundaryRegion::new(0, 5)]))
            .unwrap_err();
        assert!(matches!(err, GazetteerError::InvalidBoundary { .. }));

        // O autômato compartilhado continua íntegro
        assert_eq!(pipeline.annotate("Nova York").unwrap().annotations.len(), 1);
    }

    #[test]
    fn test_streaming_events() {
        let pipeline = GazetteerPipeline::from_config(&GazetteerConfig::default(), DICTIONARY).unwrap();
        let (tx, rx) = mpsc::channel();
        pipeline.annotate_streaming("Moro em Nova York City.", None, tx);

        let events: Vec<PipelineEvent> = rx.try_iter().collect();
        assert!(matches!(&events[0], PipelineEvent::TokenizationDone { total: 6, .. }));
        assert!(matches!(&events[1], PipelineEvent::RegionsResolved { .. }));
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::MatchFound { start_token: 2, end_token: 5, .. }
        )));
        match events.last().unwrap() {
            PipelineEvent::Done { annotations, total_matches, .. } => {
                assert_eq!(*total_matches, 1);
                assert_eq!(annotations[0].text, "Nova York City");
            }
            other => panic!("último evento inesperado: {:?}", other),
        }
    }

    #[test]
    fn test_streaming_error_event() {
        let pipeline = GazetteerPipeline::from_config(&GazetteerConfig::default(), DICTIONARY).unwrap();
        let (tx, rx) = mpsc::channel();
        pipeline.annotate_streaming("Nova York", Some(vec![BoundaryRegion::new(1, 0)]), tx);

        let events: Vec<PipelineEvent> = rx.try_iter().collect();
        assert!(matches!(events.last().unwrap(), PipelineEvent::Error { .. }));
    }

    #[test]
    fn test_batch_is_deterministic() {
        let pipeline = GazetteerPipeline::from_config(&GazetteerConfig::default(), DICTIONARY).unwrap();
        let texts = ["Nova York", "São Paulo e Nova York", "", "nada aqui"];

        let results = pipeline.annotate_batch(&texts);
        let counts: Vec<usize> = results.iter().map(|r| r.as_ref().unwrap().annotations.len()).collect();
        assert_eq!(counts, vec![1, 2, 0, 0]);

        let again = pipeline.annotate_batch(&texts);
        for (a, b) in results.iter().zip(again.iter()) {
            assert_eq!(a.as_ref().unwrap().annotations, b.as_ref().unwrap().annotations);
        }
    }

    #[test]
    fn test_malformed_dictionary_aborts_construction() {
        let err = GazetteerPipeline::from_config(&GazetteerConfig::default(), "ok => A\nquebrada\n").unwrap_err();
        assert!(matches!(err, GazetteerError::MalformedEntry { line: Some(2), .. }));
    }

    #[test]
    fn test_bundled_demo_data() {
        let config = GazetteerConfig::from_json_str(include_str!("../../data/config.json")).unwrap();
        let pipeline = GazetteerPipeline::from_config(&config, include_str!("../../data/gazetteer.txt")).unwrap();

        let result = pipeline
            .annotate("O Supremo Tribunal Federal fica longe de São Paulo.")
            .unwrap();
        let tags: Vec<Option<&str>> = result.annotations.iter().map(|a| a.tag.as_deref()).collect();
        assert_eq!(tags, vec![Some("ORG"), Some("LOC"), Some("ORG")]);
        assert_eq!(result.total_matches, 2);
    }

    #[test]
    fn test_missing_dictionary_path() {
        let err = GazetteerPipeline::from_config_file(&GazetteerConfig::default()).unwrap_err();
        assert!(matches!(err, GazetteerError::Config(_)));
    }

    #[test]
    fn test_sentence_closed_by_abbreviation_blocks_match() {
        let config = GazetteerConfig {
            boundary_region_source: BoundarySource::Sentence,
            ..GazetteerConfig::default()
        };
        let pipeline = GazetteerPipeline::from_config(&config, "etc. banco => ORG\nbanco => ORG\n").unwrap();

        let result = pipeline.annotate("Comprou frutas etc. Banco fechou.").unwrap();
        let found: Vec<&str> = result.annotations.iter().map(|a| a.text.as_str()).collect();
        assert_eq!(found, vec!["Banco"]);
    }

    #[test]
    fn test_unreadable_dictionary_names_the_file() {
        let config = GazetteerConfig {
            dictionary_path: Some("/nao/existe/gaz.txt".into()),
            ..GazetteerConfig::default()
        };
        let err = GazetteerPipeline::from_config_file(&config).unwrap_err();
        assert!(matches!(err, GazetteerError::Io { .. }));
        assert!(err.to_string().contains("/nao/existe/gaz.txt"));
    }
}
