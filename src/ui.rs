//! Saída de terminal do CAPA: tabelas coloridas e spinner.
//!
//! Usa `console` para cores e `indicatif` para o spinner exibido enquanto
//! uma sugestão é gerada.

use std::time::Duration;

use chrono::NaiveDate;
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::action::{ActionRecord, ActionStatus, User};

/// Estilos compartilhados pela saída da CLI.
pub struct Printer {
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
    bold: Style,
}

impl Default for Printer {
    fn default() -> Self {
        Self {
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
            bold: Style::new().bold(),
        }
    }
}

impl Printer {
    pub fn success(&self, msg: &str) {
        println!("  {} {msg}", self.green.apply_to("✓"));
    }

    pub fn notice(&self, msg: &str) {
        println!("  {} {msg}", self.yellow.apply_to("!"));
    }

    fn status_style(&self, status: ActionStatus) -> &Style {
        match status {
            ActionStatus::Open => &self.bold,
            ActionStatus::InProgress => &self.yellow,
            ActionStatus::Closed => &self.green,
            ActionStatus::Cancelled => &self.dim,
        }
    }

    /// Uma linha por ação; atrasadas marcadas em vermelho.
    pub fn table(&self, records: &[ActionRecord], users: &[User], today: NaiveDate) {
        if records.is_empty() {
            println!("{}", self.dim.apply_to("No actions recorded."));
            return;
        }
        println!(
            "{}",
            self.bold.apply_to(format!(
                "{:<10} {:<11} {:<11} {:<11} {:<20} {}",
                "FOLIO", "TYPE", "STATUS", "DUE", "RESPONSIBLE", "DESCRIPTION"
            ))
        );
        for r in records {
            let status = format!("{:<11}", r.status.to_string());
            let due = format!("{:<11}", r.commitment_date.format("%Y-%m-%d"));
            let due = if r.is_overdue(today) {
                self.red.apply_to(due).to_string()
            } else {
                due
            };
            println!(
                "{:<10} {:<11} {} {} {:<20} {}",
                r.folio,
                r.action_type.to_string(),
                self.status_style(r.status).apply_to(status),
                due,
                truncate(user_name(users, &r.responsible_user_id), 20),
                truncate(&r.description, 48),
            );
        }
        let counts: Vec<String> = ActionStatus::ALL
            .iter()
            .map(|s| format!("{s}: {}", records.iter().filter(|r| r.status == *s).count()))
            .collect();
        let overdue = records.iter().filter(|r| r.is_overdue(today)).count();
        println!(
            "{}",
            self.dim
                .apply_to(format!("{} | overdue: {overdue}", counts.join(" | ")))
        );
    }

    pub fn detail(&self, r: &ActionRecord, users: &[User], today: NaiveDate) {
        let label = |name: &str| self.bold.apply_to(format!("{name:<19}"));
        println!("{} {}", label("Folio"), r.folio);
        println!("{} {}", label("Id"), self.dim.apply_to(&r.id));
        println!(
            "{} {}",
            label("Status"),
            self.status_style(r.status).apply_to(r.status)
        );
        println!("{} {}", label("Type"), r.action_type);
        println!("{} {}", label("Source"), r.source);
        println!("{} {}", label("Description"), r.description);
        println!("{} {}", label("Plan"), r.plan);
        println!(
            "{} {} ({})",
            label("Responsible"),
            user_name(users, &r.responsible_user_id),
            r.responsible_user_id
        );
        println!("{} {}", label("Created"), r.creation_date);
        let overdue = if r.is_overdue(today) {
            format!(" {}", self.red.apply_to("OVERDUE"))
        } else {
            String::new()
        };
        println!("{} {}{overdue}", label("Commitment date"), r.commitment_date);
        if let Some(date) = r.close_date {
            println!("{} {date}", label("Closed"));
        }
        if let Some(notes) = &r.verification_notes {
            println!("{} {notes}", label("Verification"));
        }
    }

    pub fn users(&self, users: &[User]) {
        if users.is_empty() {
            println!("{}", self.dim.apply_to("User directory is empty."));
            return;
        }
        for u in users {
            let email = u.email.as_deref().unwrap_or("");
            println!("{:<12} {:<24} {}", u.id, u.name, self.dim.apply_to(email));
        }
    }
}

fn user_name<'a>(users: &'a [User], id: &str) -> &'a str {
    users
        .iter()
        .find(|u| u.id == id)
        .map(|u| u.name.as_str())
        .unwrap_or("Unknown")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

/// Spinner exibido durante uma chamada ao provedor.
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    pub fn finish(self) {
        self.pb.finish_and_clear();
    }
}

/// Awaits `work`, with a spinner on screen meanwhile when `show` is set.
pub async fn with_spinner<T>(show: bool, message: &str, work: impl Future<Output = T>) -> T {
    if !show {
        return work.await;
    }
    let spinner = Spinner::start(message);
    let out = work.await;
    spinner.finish();
    out
}
