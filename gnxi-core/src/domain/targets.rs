use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TesterError};

/// Connection descriptor for a device under test.
///
/// `ca`, `cert` and `key` reference uploaded files by id while stored; the
/// resolver replaces them with readable paths in the run snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    #[serde(default)]
    pub name: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl TargetDescriptor {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            ca: None,
            cert: None,
            key: None,
            options: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        super::validate_name("target", &self.name)?;

        let address = self.address.trim();
        let Some((host, port)) = address.rsplit_once(':') else {
            return Err(TesterError::invalid(format!(
                "target address '{}' must be host:port",
                self.address
            )));
        };
        if host.is_empty() || port.parse::<u16>().is_err() {
            return Err(TesterError::invalid(format!(
                "target address '{}' must be host:port",
                self.address
            )));
        }

        for file_id in self.file_refs().into_iter().filter_map(|(_, id)| id) {
            super::validate_name("file", file_id)?;
        }
        Ok(())
    }

    /// File references carried by the descriptor, in flag order.
    pub fn file_refs(&self) -> [(&'static str, Option<&str>); 3] {
        [
            ("ca", self.ca.as_deref()),
            ("cert", self.cert.as_deref()),
            ("key", self.key.as_deref()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::TargetDescriptor;

    #[test]
    fn address_requires_host_and_port() {
        assert!(TargetDescriptor::new("dut", "10.0.0.1:9339").validate().is_ok());
        assert!(TargetDescriptor::new("dut", "[::1]:9339").validate().is_ok());
        assert!(TargetDescriptor::new("dut", "10.0.0.1").validate().is_err());
        assert!(TargetDescriptor::new("dut", ":9339").validate().is_err());
        assert!(TargetDescriptor::new("dut", "host:notaport").validate().is_err());
    }

    #[test]
    fn tls_files_must_be_stored_file_names() {
        let mut target = TargetDescriptor::new("dut", "10.0.0.1:9339");
        target.ca = Some("ca.pem".to_string());
        assert!(target.validate().is_ok());

        target.key = Some("/etc/ssl/private/key.pem".to_string());
        assert!(target.validate().is_err());
    }
}
