//! Built-in roles
//!
//! The default team is five agents in fixed order: plan, query, analyse,
//! chart, code. Only the query agent is bound to `run_sql`.

use super::{Agent, AgentSettings, AgentSpec};
use crate::error::{Error, Result};
use council_llm::LlmProvider;
use council_tools::{DataStore, SqlQueryTool};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Role of a built-in agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Plans which tables and columns answer the question
    Schema,
    /// Runs the query through `run_sql`
    Query,
    /// Turns query results into bullet insights
    Analysis,
    /// Emits Vega-Lite specs on `CHART_JSON:` lines
    Viz,
    /// Emits an optional plotting snippet after `CODE_PY:`
    Code,
}

impl Role {
    /// Team order
    pub const ALL: [Role; 5] = [
        Role::Schema,
        Role::Query,
        Role::Analysis,
        Role::Viz,
        Role::Code,
    ];

    /// Agent name used as message source
    #[must_use]
    pub fn agent_name(&self) -> &'static str {
        match self {
            Role::Schema => "SchemaAgent",
            Role::Query => "QueryAgent",
            Role::Analysis => "AnalysisAgent",
            Role::Viz => "VizAgent",
            Role::Code => "CodeAgent",
        }
    }

    /// System directive for this role. `schema` is only embedded for
    /// [`Role::Schema`].
    #[must_use]
    pub fn directive(&self, schema: &str) -> String {
        match self {
            Role::Schema => format!(
                "You are a data architect. Given the schema below, decide which \
                 tables and columns are needed and outline a simple data-fetch plan.\n\n\
                 SCHEMA:\n{}",
                schema
            ),
            Role::Query => "You are an SQL expert. Follow SchemaAgent's plan. Call run_sql \
                 with a single SELECT. After the tool responds, send one short sentence \
                 summarising what you fetched."
                .to_string(),
            Role::Analysis => "You are a business analyst. Interpret the table provided by \
                 QueryAgent (it arrives as JSON). Produce concise bullet insights. \
                 Do NOT create charts or code."
                .to_string(),
            Role::Viz => "You are a visualisation specialist. Produce 1-2 Vega-Lite specs. \
                 Put each spec on its own line starting with CHART_JSON: and use inline \
                 data values (no URLs)."
                .to_string(),
            Role::Code => "You are a Python plotting expert. Optionally emit runnable code \
                 on one line starting with CODE_PY: followed by ```python fenced code```. \
                 The environment has pandas as pd, altair as alt, matplotlib.pyplot as plt, \
                 and df_latest (the latest table). Your code must create either `fig` \
                 (matplotlib) or `chart` (Altair)."
                .to_string(),
        }
    }

    /// Spec for this role. The query role binds `run_sql` over `store`.
    #[must_use]
    pub fn spec(&self, schema: &str, store: &Arc<DataStore>) -> AgentSpec {
        let spec = AgentSpec::new(self.agent_name(), self.directive(schema));
        match self {
            Role::Query => spec
                .with_tool(Arc::new(SqlQueryTool::new(Arc::clone(store))))
                .with_reflection(true),
            _ => spec,
        }
    }
}

/// Specs for the default five-agent team
#[must_use]
pub fn default_specs(schema: &str, store: &Arc<DataStore>) -> Vec<AgentSpec> {
    Role::ALL.iter().map(|role| role.spec(schema, store)).collect()
}

/// Bind `specs` to a provider, in order.
///
/// Fails when the team is empty or two agents share a name.
pub fn build_team(
    specs: Vec<AgentSpec>,
    llm: Arc<dyn LlmProvider>,
    settings: &AgentSettings,
) -> Result<Vec<Agent>> {
    if specs.is_empty() {
        return Err(Error::Configuration("team has no agents".to_string()));
    }

    let mut seen = HashSet::new();
    for spec in &specs {
        if !seen.insert(spec.name.as_str()) {
            return Err(Error::Configuration(format!(
                "duplicate agent name: {}",
                spec.name
            )));
        }
    }

    Ok(specs
        .into_iter()
        .map(|spec| Agent::new(spec, Arc::clone(&llm), settings.clone()))
        .collect())
}
