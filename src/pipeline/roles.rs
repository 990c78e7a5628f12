//! Pipeline roles.
//!
//! The role set is closed: a run always binds exactly a planner, a writer
//! and a critic. Their titles, goals, backstories and model identifiers come
//! from a YAML file validated once at load; malformed files fail fast with a
//! descriptive error instead of surfacing mid-run.

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Placeholder in a role's model string resolved against the configured
/// default model.
const MODEL_PLACEHOLDER: &str = "${MODEL}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRole {
    Planner,
    Writer,
    Critic,
}

pub const ROLES: [AgentRole; 3] = [AgentRole::Planner, AgentRole::Writer, AgentRole::Critic];

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Writer => "writer",
            Self::Critic => "critic",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum RoleConfigError {
    #[error("failed to read role file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("role file is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("role file must be a mapping of role name to config")]
    NotAMapping,

    #[error("role '{role}' is missing from the role file")]
    MissingRole { role: &'static str },

    #[error("role '{role}' must be a mapping (role/goal/backstory/llm)")]
    MalformedEntry { role: &'static str },
}

/// Entry shape as written in the YAML file. All fields optional; defaults
/// are filled at load.
#[derive(Debug, Deserialize)]
struct RawRole {
    role: Option<String>,
    goal: Option<String>,
    backstory: Option<String>,
    llm: Option<String>,
}

/// A validated role binding.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleBinding {
    pub role: AgentRole,
    /// Display title, e.g. "Case Study Writer".
    pub title: String,
    pub goal: String,
    pub backstory: String,
    /// Resolved model identifier.
    pub model: String,
}

/// The closed planner/writer/critic set, loaded and validated once per run.
#[derive(Debug, Clone)]
pub struct RoleSet {
    planner: RoleBinding,
    writer: RoleBinding,
    critic: RoleBinding,
}

impl RoleSet {
    /// Load and validate a role file.
    pub fn load(path: &Path, default_model: &str) -> Result<Self, RoleConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|e| RoleConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&yaml, default_model)
    }

    /// The role definitions embedded at compile time.
    pub fn embedded(default_model: &str) -> Result<Self, RoleConfigError> {
        Self::from_yaml(include_str!("../../resources/roles.yaml"), default_model)
    }

    pub fn from_yaml(yaml: &str, default_model: &str) -> Result<Self, RoleConfigError> {
        let doc: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        if !doc.is_mapping() {
            return Err(RoleConfigError::NotAMapping);
        }

        let mut bindings = Vec::with_capacity(ROLES.len());
        for role in ROLES {
            let name = role.as_str();
            let entry = doc
                .get(name)
                .ok_or(RoleConfigError::MissingRole { role: name })?;
            if !entry.is_mapping() {
                return Err(RoleConfigError::MalformedEntry { role: name });
            }
            let raw: RawRole = serde_yaml::from_value(entry.clone())
                .map_err(|_| RoleConfigError::MalformedEntry { role: name })?;

            bindings.push(RoleBinding {
                role,
                title: raw.role.unwrap_or_else(|| capitalize(name)),
                goal: raw.goal.unwrap_or_default(),
                backstory: raw.backstory.unwrap_or_default(),
                model: resolve_model(raw.llm.as_deref(), default_model),
            });
        }

        let mut bindings = bindings.into_iter();
        Ok(Self {
            planner: bindings.next().expect("planner binding"),
            writer: bindings.next().expect("writer binding"),
            critic: bindings.next().expect("critic binding"),
        })
    }

    pub fn get(&self, role: AgentRole) -> &RoleBinding {
        match role {
            AgentRole::Planner => &self.planner,
            AgentRole::Writer => &self.writer,
            AgentRole::Critic => &self.critic,
        }
    }
}

/// Resolve a role's model string: absent means the default, and the
/// `${MODEL}` placeholder expands to it.
fn resolve_model(raw: Option<&str>, default_model: &str) -> String {
    match raw {
        None => default_model.to_string(),
        Some(s) => s.replace(MODEL_PLACEHOLDER, default_model).trim().to_string(),
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
