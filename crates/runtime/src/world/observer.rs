use game_core::AgentId;

/// Notified once when an agent in the world dies.
///
/// Called from inside [`World::tick`](super::World::tick) after the agent's
/// events were drained, so the agent is still present and lingering.
pub trait DeathObserver: Send + Sync {
    fn on_agent_death(&self, agent: AgentId, archetype: &str);
}

impl<F> DeathObserver for F
where
    F: Fn(AgentId, &str) + Send + Sync,
{
    fn on_agent_death(&self, agent: AgentId, archetype: &str) {
        self(agent, archetype)
    }
}
