use crate::{
    core::{ranking::RankedUser, templates::MessageTemplate},
    error::BotResult,
    utils::{format_pp, format_rank_delta, format_signed},
};

use minijinja::context;
use serde::Serialize;

/// Notable difference between two successive sightings of the same player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    pub previous: RankedUser,
    pub current: RankedUser,
    pub pp_delta: f64,
    pub rank_delta: i64,
}

impl ChangeEvent {
    pub fn between(previous: RankedUser, current: RankedUser) -> Self {
        let pp_delta = current.pp - previous.pp;
        let rank_delta = i64::from(current.rank) - i64::from(previous.rank);
        Self {
            previous,
            current,
            pp_delta,
            rank_delta,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    PerformanceChanged(ChangeEvent),
    // One-time signal, emitted when the first full cycle over the ranking completed.
    CacheWarmed { users: usize },
}

impl Event {
    /// Only status events go to the monitoring channel.
    pub fn is_monitoring(&self) -> bool {
        matches!(self, Event::CacheWarmed { .. })
    }

    /// Slack text for the event.
    pub fn render(&self) -> BotResult<String> {
        match self {
            Event::PerformanceChanged(change) => {
                MessageTemplate::PerformanceChange.render(context! {
                    gained => change.pp_delta >= 0.0,
                    name => change.current.name,
                    delta => format_signed(change.pp_delta),
                    previous_pp => format_pp(change.previous.pp),
                    current_pp => format_pp(change.current.pp),
                    rank => change.current.rank,
                    rank_delta => format_rank_delta(change.rank_delta),
                    profile_url => change.current.profile_url(),
                })
            }
            Event::CacheWarmed { users } => {
                MessageTemplate::CacheWarmed.render(context! { users => users })
            }
        }
    }
}
