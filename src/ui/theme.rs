//! Terminal styles, keyed by what a value means rather than by color

use owo_colors::Style;
use std::sync::OnceLock;

use crate::model::{CreateState, RunStatus};

static THEME: OnceLock<Theme> = OnceLock::new();

/// How a pipeline or run state reads at a glance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Finished and good
    Good,
    /// Finished and bad
    Bad,
    /// Still moving
    Active,
    /// Cancelled, or a state this build does not know
    Neutral,
}

impl From<CreateState> for Tone {
    fn from(state: CreateState) -> Self {
        match state {
            CreateState::Success => Tone::Good,
            CreateState::Failed => Tone::Bad,
            CreateState::Running => Tone::Active,
            CreateState::Unknown => Tone::Neutral,
        }
    }
}

impl From<RunStatus> for Tone {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Success => Tone::Good,
            RunStatus::Failed => Tone::Bad,
            RunStatus::Scheduled | RunStatus::Running => Tone::Active,
            RunStatus::Cancelled | RunStatus::Unknown => Tone::Neutral,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub dim: Style,
    pub muted: Style,
    pub good: Style,
    pub bad: Style,
    pub active: Style,
    pub neutral: Style,
}

impl Theme {
    /// Colored on a terminal unless `NO_COLOR` is set
    pub fn detect() -> Self {
        if std::env::var_os("NO_COLOR").is_some() || !console::Term::stdout().is_term() {
            return Self::plain();
        }
        Self::colored()
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            dim: Style::new().white().dimmed(),
            muted: Style::new().bright_black(),
            good: Style::new().green().bold(),
            bad: Style::new().red().bold(),
            active: Style::new().yellow(),
            neutral: Style::new().blue(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            dim: Style::new(),
            muted: Style::new(),
            good: Style::new(),
            bad: Style::new(),
            active: Style::new(),
            neutral: Style::new(),
        }
    }

    pub fn tone(&self, tone: Tone) -> &Style {
        match tone {
            Tone::Good => &self.good,
            Tone::Bad => &self.bad,
            Tone::Active => &self.active,
            Tone::Neutral => &self.neutral,
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
