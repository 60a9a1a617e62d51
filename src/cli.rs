//! Interface de linha de comando do CAPA baseada em clap.
//!
//! Define a struct [`Cli`] com um subcomando por operação do ciclo de vida
//! (create, update, transition, delete, list, show), além de export, users e
//! dos pedidos de sugestão ao provedor de texto.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::action::{ActionStatus, ActionType, ContentUpdate, NewAction};
use crate::config::DEFAULT_CONFIG_FILE;

/// CAPA: rastreamento de ações corretivas e preventivas.
#[derive(Debug, Parser)]
#[command(name = "capa", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Arquivo de configuração.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Habilita logs detalhados em stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Tipo de ação aceito pela CLI.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TypeArg {
    Corrective,
    Preventive,
}

impl From<TypeArg> for ActionType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::Corrective => ActionType::Corrective,
            TypeArg::Preventive => ActionType::Preventive,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Registra uma nova ação (status inicial: Open).
    Create(CreateArgs),

    /// Edita campos de conteúdo de uma ação existente.
    Update(UpdateArgs),

    /// Muda o status de uma ação.
    Transition {
        /// Id ou folio da ação.
        id: String,

        /// open, in-progress, closed ou cancelled.
        status: String,

        /// Como a eficácia foi verificada (obrigatório para closed).
        #[arg(long)]
        notes: Option<String>,
    },

    /// Remove uma ação permanentemente.
    Delete {
        id: String,

        /// Confirma a remoção sem perguntar.
        #[arg(long)]
        yes: bool,
    },

    /// Lista as ações.
    List {
        /// Mostra apenas ações neste status.
        #[arg(long)]
        status: Option<String>,
    },

    /// Mostra uma ação em detalhe.
    Show { id: String },

    /// Lista o diretório de usuários.
    Users,

    /// Exporta todas as ações em CSV.
    Export {
        /// Arquivo de saída; stdout quando omitido.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Pede ao provedor um rascunho de plano de ação.
    SuggestPlan {
        /// Descrição do problema.
        problem: String,
    },

    /// Pede ao provedor um resumo gerencial do incidente.
    Summarize {
        /// Descrição do incidente.
        description: String,
    },
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Origem do achado (auditoria, reclamação, ...).
    #[arg(long)]
    pub source: String,

    #[arg(long)]
    pub description: String,

    /// Plano de ação. Com --suggest-plan pode ser omitido.
    #[arg(long, required_unless_present = "suggest_plan")]
    pub plan: Option<String>,

    /// Preenche o plano com uma sugestão do provedor.
    #[arg(long)]
    pub suggest_plan: bool,

    #[arg(long = "type", value_enum)]
    pub action_type: TypeArg,

    /// Data de compromisso (AAAA-MM-DD).
    #[arg(long)]
    pub commitment_date: NaiveDate,

    /// Id do usuário responsável.
    #[arg(long)]
    pub responsible: String,
}

impl CreateArgs {
    pub fn into_new_action(self, plan: String) -> NewAction {
        NewAction {
            source: self.source,
            description: self.description,
            plan,
            action_type: self.action_type.into(),
            commitment_date: self.commitment_date,
            responsible_user_id: self.responsible,
        }
    }
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Id ou folio da ação.
    pub id: String,

    #[arg(long)]
    pub source: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub plan: Option<String>,

    #[arg(long = "type", value_enum)]
    pub action_type: Option<TypeArg>,

    #[arg(long)]
    pub commitment_date: Option<NaiveDate>,

    #[arg(long)]
    pub responsible: Option<String>,
}

impl UpdateArgs {
    pub fn content_update(&self) -> ContentUpdate {
        ContentUpdate {
            source: self.source.clone(),
            description: self.description.clone(),
            plan: self.plan.clone(),
            action_type: self.action_type.map(Into::into),
            commitment_date: self.commitment_date,
            responsible_user_id: self.responsible.clone(),
        }
    }
}

/// Converte o texto do usuário em status, com erro de validação se desconhecido.
pub fn parse_status(s: &str) -> crate::error::Result<ActionStatus> {
    s.parse()
}
