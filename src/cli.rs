use clap::Parser;
use serde::Serialize;

use crate::core::ranking::RankingMode;

#[derive(Debug, Default, Parser, Serialize)]
#[command(name = "pp-watcher", about = "Watches the osu! ranking for notable pp changes")]
pub struct Cli {
    /// Ranking to watch (osu, taiko, fruits, mania)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking_mode: Option<RankingMode>,

    /// Minimum pp difference between two sightings worth a notification
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pp_change_threshold: Option<f64>,

    /// TRACE, DEBUG, INFO, WARN or ERROR
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_level: Option<String>,
}
