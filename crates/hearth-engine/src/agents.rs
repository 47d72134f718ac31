//! Default participant roster: a triage agent that delegates to one agent per
//! plugin, each of which can hand control back to the user.

use std::collections::HashSet;

use hearth_core::messages::USER;

use crate::registry::{ToolFilter, ToolRegistry};
use crate::tools::{LIGHTS_PLUGIN, MEALS_PLUGIN};

pub const TRIAGE_AGENT: &str = "triage_agent";
pub const LIGHTS_AGENT: &str = "lights_agent";
pub const MEALS_AGENT: &str = "meals_agent";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentProfile {
    pub name: String,
    /// How the agent introduces itself when it cannot act on a message.
    pub description: String,
    /// Participants this agent may hand off to.
    pub handoffs: Vec<String>,
    /// Plugins whose tools this agent may call.
    pub plugins: Vec<String>,
}

impl AgentProfile {
    pub fn can_hand_off_to(&self, target: &str) -> bool {
        self.handoffs.iter().any(|h| h == target)
    }

    pub fn owns_plugin(&self, plugin: &str) -> bool {
        self.plugins.iter().any(|p| p == plugin)
    }

    pub fn tool_filter(&self) -> ToolFilter {
        ToolFilter::Plugins(self.plugins.iter().cloned().collect::<HashSet<_>>())
    }

    /// The slice of `registry` this agent is allowed to call.
    pub fn tools(&self, registry: &ToolRegistry) -> ToolRegistry {
        registry.clone_filtered(&self.tool_filter())
    }
}

/// Ordered roster. The first profile speaks first on an unaddressed message.
#[derive(Clone, Debug)]
pub struct AgentRoster {
    profiles: Vec<AgentProfile>,
}

impl AgentRoster {
    pub fn new(profiles: Vec<AgentProfile>) -> Self {
        Self { profiles }
    }

    pub fn get(&self, name: &str) -> Option<&AgentProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn profiles(&self) -> &[AgentProfile] {
        &self.profiles
    }

    pub fn first(&self) -> Option<&AgentProfile> {
        self.profiles.first()
    }

    pub fn owner_of_plugin(&self, plugin: &str) -> Option<&AgentProfile> {
        self.profiles.iter().find(|p| p.owns_plugin(plugin))
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name.as_str()).collect()
    }
}

impl Default for AgentRoster {
    fn default() -> Self {
        Self::new(vec![
            AgentProfile {
                name: TRIAGE_AGENT.into(),
                description: "I pass lighting requests to lights_agent and dish or meal \
                    timing requests to meals_agent."
                    .into(),
                handoffs: vec![MEALS_AGENT.into(), LIGHTS_AGENT.into(), USER.into()],
                plugins: vec![],
            },
            AgentProfile {
                name: LIGHTS_AGENT.into(),
                description: "I report which lights are on and switch them on or off.".into(),
                handoffs: vec![TRIAGE_AGENT.into(), USER.into()],
                plugins: vec![LIGHTS_PLUGIN.into()],
            },
            AgentProfile {
                name: MEALS_AGENT.into(),
                description: "I keep the dish list and work out when each preparation \
                    step has to start."
                    .into(),
                handoffs: vec![TRIAGE_AGENT.into(), USER.into()],
                plugins: vec![MEALS_PLUGIN.into()],
            },
        ])
    }
}
