//! # Taxonomia de Erros
//!
//! Todos os erros do crate são variantes de [`GazetteerError`]. Eles se dividem em
//! três famílias:
//!
//! - **Construção** ([`GazetteerError::MalformedEntry`], [`GazetteerError::AutomatonFrozen`]):
//!   fatais, interrompem a inicialização e identificam a linha ofensora do dicionário.
//! - **Configuração** ([`GazetteerError::Config`]): opção desconhecida ou incompleta.
//! - **Pré-condição de varredura** ([`GazetteerError::InvalidBoundary`]): erro do chamador,
//!   aborta apenas o documento em questão; o autômato compartilhado não é afetado.
//!
//! Um token sem forma normalizada **não** é erro: ele simplesmente não casa.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Erro principal do gazetteer.
#[derive(Error, Debug)]
pub enum GazetteerError {
    /// Entrada de dicionário vazia ou que não pôde ser interpretada.
    #[error("entrada de dicionário malformada{}: {reason} (conteúdo: {content:?})", line_suffix(.line))]
    MalformedEntry {
        /// Número da linha (1-based) quando a entrada veio de um arquivo/fonte textual.
        line: Option<usize>,
        /// Conteúdo original da linha ou representação da sequência de chaves.
        content: String,
        reason: String,
    },

    /// Tentativa de alterar o dicionário depois de `build()`.
    #[error("o autômato já foi construído e não aceita novas entradas")]
    AutomatonFrozen,

    /// Região de fronteira malformada, fora do documento ou sobreposta a outra.
    #[error("região de fronteira inválida: {reason}")]
    InvalidBoundary { reason: String },

    /// Opção de configuração desconhecida, ausente ou inconsistente.
    #[error("erro de configuração: {0}")]
    Config(String),

    /// Falha ao ler um arquivo de dicionário ou de configuração.
    #[error("erro de E/S ao ler {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(n) => format!(" na linha {}", n),
        None => String::new(),
    }
}

impl GazetteerError {
    pub fn malformed_entry(line: Option<usize>, content: impl Into<String>, reason: impl Into<String>) -> Self {
        GazetteerError::MalformedEntry {
            line,
            content: content.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_boundary(reason: impl Into<String>) -> Self {
        GazetteerError::InvalidBoundary { reason: reason.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        GazetteerError::Config(msg.into())
    }

    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        GazetteerError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Indica se o erro é culpa da entrada do chamador (e não do ambiente).
    ///
    /// Usado pelo servidor web para decidir entre `400` e `500`.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            GazetteerError::MalformedEntry { .. } | GazetteerError::InvalidBoundary { .. }
        )
    }
}

/// Alias de resultado usado em todo o crate.
pub type Result<T> = std::result::Result<T, GazetteerError>;
