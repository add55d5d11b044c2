use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub network_id: Ipv4Addr,
    pub subnet_mask: Ipv4Addr,
    pub lease_duration_seconds: u32,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network_id: Ipv4Addr::new(192, 168, 45, 0),
            subnet_mask: Ipv4Addr::new(255, 255, 255, 240),
            lease_duration_seconds: 60,
            port: 12000,
        }
    }
}

impl Config {
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            Ok(config)
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let mask = u32::from(self.subnet_mask);

        if mask.leading_ones() + mask.trailing_zeros() != 32 {
            return Err(Error::InvalidConfig(format!(
                "subnet mask {} is not a contiguous prefix",
                self.subnet_mask
            )));
        }

        if mask.count_zeros() < 2 {
            return Err(Error::InvalidConfig(format!(
                "subnet mask {} leaves no assignable host addresses",
                self.subnet_mask
            )));
        }

        if self.lease_duration_seconds == 0 {
            return Err(Error::InvalidConfig(
                "lease_duration_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// The network identifier with host bits masked off.
    pub fn network_base(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.network_id) & u32::from(self.subnet_mask))
    }
}
