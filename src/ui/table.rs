use tabled::{settings::Style, Table, Tabled};

use crate::model::PendingPipeline;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

#[derive(Tabled)]
pub struct PendingRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Type")]
    pub kind: String,
    #[tabled(rename = "State")]
    pub state: String,
    #[tabled(rename = "Progress")]
    pub progress: String,
    #[tabled(rename = "Created")]
    pub created: String,
}

impl From<&PendingPipeline> for PendingRow {
    fn from(p: &PendingPipeline) -> Self {
        Self {
            id: p.id.clone(),
            name: p.pipeline.name.clone(),
            kind: p.pipeline.kind.to_string(),
            state: p.state.to_string(),
            progress: format!("{}%", p.status),
            created: p.created.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

pub fn pending_table(pending: &[PendingPipeline]) -> String {
    if pending.is_empty() {
        return String::new();
    }

    let rows: Vec<PendingRow> = pending.iter().map(PendingRow::from).collect();
    Table::new(&rows).with(Style::rounded()).to_string()
}
