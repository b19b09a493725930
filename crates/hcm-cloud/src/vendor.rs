//! Supported cloud vendors

use crate::error::CloudError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    #[serde(rename = "tcloud")]
    TCloud,
    Aws,
    Gcp,
    Azure,
    #[serde(rename = "huawei")]
    HuaWei,
}

impl Vendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::TCloud => "tcloud",
            Vendor::Aws => "aws",
            Vendor::Gcp => "gcp",
            Vendor::Azure => "azure",
            Vendor::HuaWei => "huawei",
        }
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Vendor {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcloud" => Ok(Vendor::TCloud),
            "aws" => Ok(Vendor::Aws),
            "gcp" => Ok(Vendor::Gcp),
            "azure" => Ok(Vendor::Azure),
            "huawei" => Ok(Vendor::HuaWei),
            other => Err(CloudError::UnsupportedVendor(other.to_string())),
        }
    }
}
