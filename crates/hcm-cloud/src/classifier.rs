//! Grouping of heterogeneous resources for vendor batch APIs
//!
//! Vendor batch calls only accept resources of one account in one region.
//! The helpers here partition input accordingly. They never split a group
//! into chunks: a group larger than the vendor limit is a caller error.

use crate::error::{CloudError, Result};
use crate::vendor::Vendor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Maximum number of resources accepted by a single batch operation
pub const BATCH_OPERATION_MAX_LIMIT: usize = 100;

/// Minimal identity of a cloud resource needed to route a vendor call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBasicInfo {
    /// Local resource id
    pub id: String,
    /// Vendor-side resource id
    pub cloud_id: String,
    pub vendor: Vendor,
    pub account_id: String,
    pub region: String,
}

/// Key of an account/region batch group
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountRegion {
    pub account_id: String,
    pub region: String,
}

impl std::fmt::Display for AccountRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.account_id, self.region)
    }
}

/// Group items by a key, preserving input order within each group
pub fn classify_slice<T, K, I, F>(items: I, key: F) -> HashMap<K, Vec<T>>
where
    I: IntoIterator<Item = T>,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut groups: HashMap<K, Vec<T>> = HashMap::new();
    for item in items {
        groups.entry(key(&item)).or_default().push(item);
    }
    groups
}

pub fn classify_by_vendor(
    infos: impl IntoIterator<Item = ResourceBasicInfo>,
) -> BTreeMap<Vendor, Vec<ResourceBasicInfo>> {
    let mut groups: BTreeMap<Vendor, Vec<ResourceBasicInfo>> = BTreeMap::new();
    for info in infos {
        groups.entry(info.vendor).or_default().push(info);
    }
    groups
}

pub fn classify_by_account_region(
    infos: impl IntoIterator<Item = ResourceBasicInfo>,
) -> BTreeMap<AccountRegion, Vec<ResourceBasicInfo>> {
    let mut groups: BTreeMap<AccountRegion, Vec<ResourceBasicInfo>> = BTreeMap::new();
    for info in infos {
        let key = AccountRegion {
            account_id: info.account_id.clone(),
            region: info.region.clone(),
        };
        groups.entry(key).or_default().push(info);
    }
    groups
}

/// Reject batches over `limit`
pub fn ensure_batch_limit(len: usize, limit: usize) -> Result<()> {
    if len > limit {
        return Err(CloudError::invalid_param(format!(
            "batch of {len} exceeds the limit of {limit}"
        )));
    }
    Ok(())
}
