#![allow(dead_code)]

use std::collections::BTreeMap;

use procrun::config::{CommandConfig, ConfigFile, ExecutorSection, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                executor: ExecutorSection::default(),
                vars: BTreeMap::new(),
                env: BTreeMap::new(),
                command: BTreeMap::new(),
            },
        }
    }

    pub fn with_command(mut self, name: &str, cmd: CommandConfig) -> Self {
        self.config.command.insert(name.to_string(), cmd);
        self
    }

    pub fn with_var(mut self, name: &str, value: impl Into<toml::Value>) -> Self {
        self.config.vars.insert(name.to_string(), value.into());
        self
    }

    pub fn with_env(mut self, name: &str, value: &str) -> Self {
        self.config.env.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_default_timeout(mut self, timeout: &str) -> Self {
        self.config.executor.timeout = Some(timeout.to_string());
        self
    }

    pub fn with_default_exit_values(mut self, codes: &[i32]) -> Self {
        self.config.executor.exit_values = Some(codes.to_vec());
        self
    }

    pub fn inherit_env(mut self, val: bool) -> Self {
        self.config.executor.inherit_env = val;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `CommandConfig`.
pub struct CommandConfigBuilder {
    cmd: CommandConfig,
}

impl CommandConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            cmd: CommandConfig {
                cmd: cmd.to_string(),
                working_dir: None,
                exit_values: None,
                check_exit: None,
                timeout: None,
                inherit_env: None,
                env: BTreeMap::new(),
            },
        }
    }

    pub fn exit_values(mut self, codes: &[i32]) -> Self {
        self.cmd.exit_values = Some(codes.to_vec());
        self
    }

    pub fn check_exit(mut self, val: bool) -> Self {
        self.cmd.check_exit = Some(val);
        self
    }

    pub fn timeout(mut self, timeout: &str) -> Self {
        self.cmd.timeout = Some(timeout.to_string());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.cmd.working_dir = Some(dir.into());
        self
    }

    pub fn inherit_env(mut self, val: bool) -> Self {
        self.cmd.inherit_env = Some(val);
        self
    }

    pub fn env(mut self, name: &str, value: &str) -> Self {
        self.cmd.env.insert(name.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> CommandConfig {
        self.cmd
    }
}
