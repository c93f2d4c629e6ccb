use crate::error::BotResult;
use minijinja::{Environment, Value};
use once_cell::sync::Lazy;
use strum::{EnumIter, IntoEnumIterator};
use tracing::info;

static TEMPLATES_ENVIRONMENT: Lazy<Environment> = Lazy::new(|| {
    info!("Initializing templating engine environment.");
    let mut env = Environment::new();

    // Use strum to iterate over the variants of the enum.
    for template in MessageTemplate::iter() {
        // Sources are static and covered by tests.
        if let Err(e) = env.add_template(template.name(), template.template()) {
            tracing::error!("Could not load template {}. {e}", template.name());
        }
    }

    info!("Templates loaded in templating engine environment.");

    env
});

#[derive(Debug, Clone, Copy, EnumIter)]
pub enum MessageTemplate {
    PerformanceChange,
    CacheWarmed,
}

impl MessageTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            MessageTemplate::PerformanceChange => "performance_change.txt",
            MessageTemplate::CacheWarmed => "cache_warmed.txt",
        }
    }

    pub fn render(&self, context: Value) -> BotResult<String> {
        render_named(self.name(), context)
    }

    pub fn template(&self) -> &'static str {
        match self {
            MessageTemplate::PerformanceChange => {
                "{{ '📈' if gained else '📉' }} *{{ name }}* {{ delta }}pp \
                ({{ previous_pp }} → {{ current_pp }}pp) • #{{ rank }}\
                {% if rank_delta %} ({{ rank_delta }}){% endif %} • {{ profile_url }}"
            }
            MessageTemplate::CacheWarmed => {
                "🔥 Ranking cache warmed up with *{{ users }}* players, pp changes are now tracked."
            }
        }
    }
}

fn render_named(name: &str, context: Value) -> BotResult<String> {
    Ok(TEMPLATES_ENVIRONMENT.get_template(name)?.render(context)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BotError;
    use minijinja::context;

    #[test]
    fn every_template_compiles() {
        for template in MessageTemplate::iter() {
            assert!(
                TEMPLATES_ENVIRONMENT.get_template(template.name()).is_ok(),
                "{} failed to load",
                template.name()
            );
        }
    }

    #[test]
    fn unknown_template_is_a_template_error() {
        assert!(matches!(
            render_named("missing.txt", context! { users => 1 }),
            Err(BotError::Template(_))
        ));
    }
}
