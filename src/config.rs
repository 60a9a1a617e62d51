//! Configuração do CAPA carregada a partir de `capa.toml`.
//!
//! Valores ausentes no arquivo usam defaults sensíveis. A variável de ambiente
//! `ANTHROPIC_API_KEY` tem precedência sobre o arquivo. A configuração é lida
//! uma única vez em `main` e repassada explicitamente aos componentes.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::action::DEFAULT_FOLIO_PREFIX;
use crate::error::{CapaError, Result};
use crate::permission::PermissionSet;
use crate::suggest::SamplingParams;

pub const DEFAULT_CONFIG_FILE: &str = "capa.toml";

/// Configuração de nível superior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CapaConfig {
    /// Chave da API do provedor de sugestões. Vazia desativa as sugestões.
    pub api_key: String,

    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,

    /// Diretório com `actions.json` e `users.json`.
    pub data_dir: PathBuf,

    /// Prefixo dos folios, ex.: `CAPA-0001`.
    pub folio_prefix: String,

    /// Ações permitidas a quem usa esta instalação.
    pub permissions: PermissionSet,
}

impl Default for CapaConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "claude-haiku-4-5-20251001".to_string(),
            max_tokens: 1024,
            temperature: 0.4,
            top_p: 0.9,
            top_k: 40,
            data_dir: PathBuf::from(".capa"),
            folio_prefix: DEFAULT_FOLIO_PREFIX.to_string(),
            permissions: PermissionSet::default(),
        }
    }
}

impl CapaConfig {
    /// Carrega `path`, ou os defaults se o arquivo não existir.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<CapaConfig>(&contents)?
        } else {
            Self::default()
        };
        config.with_env_key(std::env::var("ANTHROPIC_API_KEY").ok())
    }

    // A chave do ambiente, quando não vazia, substitui a do arquivo.
    fn with_env_key(mut self, env_key: Option<String>) -> Result<Self> {
        if let Some(key) = env_key.filter(|k| !k.trim().is_empty()) {
            self.api_key = key;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(CapaError::Config(format!(
                "temperature must be between 0 and 1, got {}",
                self.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.top_p) || self.top_p == 0.0 {
            return Err(CapaError::Config(format!(
                "top_p must be in (0, 1], got {}",
                self.top_p
            )));
        }
        if self.max_tokens == 0 {
            return Err(CapaError::Config("max_tokens must be positive".into()));
        }
        if self.folio_prefix.trim().is_empty() {
            return Err(CapaError::Config("folio_prefix must not be empty".into()));
        }
        Ok(())
    }

    /// `None` quando nenhuma chave foi configurada.
    pub fn api_key(&self) -> Option<&str> {
        Some(self.api_key.as_str()).filter(|k| !k.trim().is_empty())
    }

    pub fn sampling(&self) -> SamplingParams {
        SamplingParams {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
        }
    }
}
