pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, header, info, muted, run_line, state_counts, state_summary, success, warn};
pub use table::{PendingRow, TableBuilder, pending_table, stats_table};
pub use theme::{theme, Theme, Tone};
