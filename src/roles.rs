//! Roles and casts
//!
//! A role is an identifier plus static instructions and an optional private
//! memory store. Casts are ordered: position decides turn order.

use crate::memory::MemoryStore;
use crate::prompts;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoleId {
    Bull,
    Bear,
    ResearchManager,
    Trader,
    Risky,
    Safe,
    Neutral,
    PortfolioManager,
}

impl RoleId {
    /// Speaker name used in transcript lines
    pub fn display_name(&self) -> &'static str {
        match self {
            RoleId::Bull => "Bull Analyst",
            RoleId::Bear => "Bear Analyst",
            RoleId::ResearchManager => "Research Manager",
            RoleId::Trader => "Trader",
            RoleId::Risky => "Risky Analyst",
            RoleId::Safe => "Safe Analyst",
            RoleId::Neutral => "Neutral Analyst",
            RoleId::PortfolioManager => "Portfolio Manager",
        }
    }

    pub fn instructions(&self) -> &'static str {
        match self {
            RoleId::Bull => prompts::BULL_INSTRUCTIONS,
            RoleId::Bear => prompts::BEAR_INSTRUCTIONS,
            RoleId::ResearchManager => prompts::RESEARCH_MANAGER_INSTRUCTIONS,
            RoleId::Trader => prompts::TRADER_INSTRUCTIONS,
            RoleId::Risky => prompts::RISKY_INSTRUCTIONS,
            RoleId::Safe => prompts::SAFE_INSTRUCTIONS,
            RoleId::Neutral => prompts::NEUTRAL_INSTRUCTIONS,
            RoleId::PortfolioManager => prompts::PORTFOLIO_MANAGER_INSTRUCTIONS,
        }
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[derive(Clone)]
pub struct Role {
    id: RoleId,
    instructions: String,
    memory: Option<Arc<dyn MemoryStore>>,
}

impl Role {
    /// Role with its standard instructions and no memory
    pub fn new(id: RoleId) -> Self {
        Self {
            id,
            instructions: id.instructions().to_string(),
            memory: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn id(&self) -> RoleId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.id.display_name()
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn memory(&self) -> Option<&Arc<dyn MemoryStore>> {
        self.memory.as_ref()
    }
}

impl fmt::Debug for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Role")
            .field("id", &self.id)
            .field("has_memory", &self.memory.is_some())
            .finish()
    }
}

/// Ordered list of debaters
#[derive(Debug, Clone, Default)]
pub struct Cast {
    roles: Vec<Role>,
}

impl Cast {
    pub fn new(roles: Vec<Role>) -> Self {
        Self { roles }
    }

    /// Bull opens, Bear answers; each keeps a private memory
    pub fn research(bull_memory: Arc<dyn MemoryStore>, bear_memory: Arc<dyn MemoryStore>) -> Self {
        Self::new(vec![
            Role::new(RoleId::Bull).with_memory(bull_memory),
            Role::new(RoleId::Bear).with_memory(bear_memory),
        ])
    }

    /// Risky, Safe, Neutral in that order; no memory
    pub fn risk() -> Self {
        Self::new(vec![
            Role::new(RoleId::Risky),
            Role::new(RoleId::Safe),
            Role::new(RoleId::Neutral),
        ])
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn speaker_names(&self) -> Vec<&'static str> {
        self.roles.iter().map(Role::name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryMemoryStore;

    #[test]
    fn test_research_cast_order_and_memory() {
        let cast = Cast::research(
            Arc::new(InMemoryMemoryStore::new("bull")),
            Arc::new(InMemoryMemoryStore::new("bear")),
        );
        assert_eq!(cast.speaker_names(), vec!["Bull Analyst", "Bear Analyst"]);
        assert!(cast.roles().iter().all(|r| r.memory().is_some()));
    }

    #[test]
    fn test_risk_cast_order() {
        let cast = Cast::risk();
        assert_eq!(
            cast.speaker_names(),
            vec!["Risky Analyst", "Safe Analyst", "Neutral Analyst"]
        );
        assert!(cast.roles().iter().all(|r| r.memory().is_none()));
    }

    #[test]
    fn test_instructions_default_and_override() {
        let role = Role::new(RoleId::Trader);
        assert!(role.instructions().contains("FINAL TRANSACTION PROPOSAL"));

        let custom = Role::new(RoleId::Bull).with_instructions("ROLE: Optimist");
        assert_eq!(custom.instructions(), "ROLE: Optimist");
        assert_eq!(custom.name(), "Bull Analyst");
    }
}
