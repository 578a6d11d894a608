use hashbrown::HashMap;
use parsecast_types::ServerConfig;

/// Resolves an opaque upload key to the identity that owns its data.
pub trait OwnerDirectory: Send + Sync {
    fn resolve(&self, upload_key: &str) -> Option<String>;
}

/// Upload keys from the server config. In dev mode unknown keys own themselves.
#[derive(Debug, Clone, Default)]
pub struct ConfigKeyDirectory {
    keys: HashMap<String, String>,
    dev_mode: bool,
}

impl ConfigKeyDirectory {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            keys: config
                .upload_keys
                .iter()
                .map(|entry| (entry.key.clone(), entry.owner.clone()))
                .collect(),
            dev_mode: config.dev_mode,
        }
    }
}

impl OwnerDirectory for ConfigKeyDirectory {
    fn resolve(&self, upload_key: &str) -> Option<String> {
        let key = upload_key.trim();
        if key.is_empty() {
            return None;
        }
        match self.keys.get(key) {
            Some(owner) => Some(owner.clone()),
            None if self.dev_mode => Some(key.to_string()),
            None => None,
        }
    }
}
