//! Declarative product/port configuration (`portside.toml`).
//!
//! ```toml
//! [products.web]
//! run = "pnpm --filter web dev"
//! modes = ["local", "dev"]
//!
//! [[products.web.ports]]
//! port = 3888
//! service = "web"
//! flexible = true
//! option = "port"
//!
//! [stack]
//! start = "docker compose -f dev/stack.yml up --detach"
//! stop = "docker compose -f dev/stack.yml down"
//!
//! [[stack.ports]]
//! port = 9099
//! service = "auth-emulator"
//! ```

use crate::context::RunContext;
use crate::error::{ConfigError, ConfigParseError, find_similar_product};
use crate::conflict::PortBinding;
use crate::{Result, env};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct PortsideToml {
    #[serde(default)]
    pub products: IndexMap<String, Product>,
    #[serde(default)]
    pub stack: Option<Stack>,
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct Product {
    /// Hand-off command, run after conflict negotiation completes.
    pub run: String,
    /// Run modes the product supports; empty means all.
    #[serde(default)]
    pub modes: Vec<crate::context::RunMode>,
    #[serde(default)]
    pub ports: Vec<PortDecl>,
}

#[derive(Debug, Deserialize)]
pub struct Stack {
    pub start: String,
    #[serde(default)]
    pub stop: Option<String>,
    #[serde(default)]
    pub ports: Vec<PortDecl>,
}

/// One declared port→service binding, before run-context evaluation.
#[derive(Debug, Deserialize)]
pub struct PortDecl {
    pub port: u16,
    pub service: String,
    #[serde(default)]
    pub flexible: bool,
    #[serde(default)]
    pub option: Option<String>,
}

impl PortsideToml {
    /// Locate the config: `PORTSIDE_CONFIG` if set, otherwise the nearest
    /// `portside.toml` walking up from the working directory (monorepo
    /// roots are usually a few levels up from wherever the dev ran us).
    pub fn load() -> Result<Self> {
        if let Some(path) = env::PORTSIDE_CONFIG.as_ref() {
            return Self::read(path);
        }
        let mut dir = Some(env::CWD.as_path());
        while let Some(d) = dir {
            let candidate = d.join("portside.toml");
            if candidate.exists() {
                return Self::read(&candidate);
            }
            dir = d.parent();
        }
        Err(ConfigError::NotFound {
            searched_from: env::CWD.display().to_string(),
        }
        .into())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config: PortsideToml = toml::from_str(&contents)
            .map_err(|e| ConfigParseError::from_toml_error(path, contents.clone(), e))?;
        config.path = path.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, product) in &self.products {
            for decl in &product.ports {
                if decl.port == 0 {
                    return Err(ConfigError::InvalidPort {
                        product: name.clone(),
                        service: decl.service.clone(),
                    }
                    .into());
                }
            }
        }
        if let Some(stack) = &self.stack {
            for decl in &stack.ports {
                if decl.port == 0 {
                    return Err(ConfigError::InvalidPort {
                        product: "stack".to_string(),
                        service: decl.service.clone(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Look up a product, with a fuzzy "did you mean" suggestion on miss.
    pub fn product(&self, name: &str) -> Result<&Product> {
        self.products.get(name).ok_or_else(|| {
            ConfigError::UnknownProduct {
                name: name.to_string(),
                path: self.path.display().to_string(),
                suggestion: find_similar_product(name, self.products.keys().map(String::as_str)),
            }
            .into()
        })
    }

    /// Ports owned by the local stack for this run. Empty outside `local`
    /// mode or when no stack is configured; the driver excludes these from
    /// product-level conflict collection.
    pub fn stack_ports(&self, ctx: &RunContext) -> Vec<PortBinding> {
        if ctx.mode != crate::context::RunMode::Local {
            return vec![];
        }
        self.stack
            .as_ref()
            .map(|stack| stack.port_plan())
            .unwrap_or_default()
    }
}

impl Product {
    pub fn supports_mode(&self, mode: crate::context::RunMode) -> bool {
        self.modes.is_empty() || self.modes.contains(&mode)
    }

    pub fn supported_modes(&self) -> String {
        if self.modes.is_empty() {
            "local, dev, prod".to_string()
        } else {
            self.modes.iter().map(|m| m.to_string()).join(", ")
        }
    }

    /// Evaluate the declared bindings against the run context. A binding
    /// whose option key has a value in the context takes its effective port
    /// from there, so `-o port=3889` moves the binding before collection.
    pub fn port_plan(&self, ctx: &RunContext) -> Result<Vec<PortBinding>> {
        self.ports
            .iter()
            .map(|decl| {
                let port = match decl.option.as_deref().and_then(|key| ctx.option(key)) {
                    Some(value) => match value.parse::<u16>() {
                        Ok(port) if port > 0 => port,
                        _ => {
                            return Err(ConfigError::InvalidOptionValue {
                                option: decl.option.clone().unwrap_or_default(),
                                value: value.to_string(),
                            }
                            .into());
                        }
                    },
                    None => decl.port,
                };
                Ok(PortBinding {
                    port,
                    service: decl.service.clone(),
                    flexible: decl.flexible,
                    option: decl.option.clone(),
                })
            })
            .collect()
    }
}

impl Stack {
    /// Stack bindings are never flexible: the stack's services advertise
    /// fixed ports to every product.
    pub fn port_plan(&self) -> Vec<PortBinding> {
        self.ports
            .iter()
            .map(|decl| PortBinding::new(decl.port, decl.service.clone()))
            .collect()
    }
}
