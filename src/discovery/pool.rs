//! Capacity Pools
//!
//! A pool is one aggregate as offered to the orchestrator, together with the
//! storage attributes it can satisfy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Storage Attributes
// =============================================================================

/// Attribute names understood by storage class matching
pub mod attr {
    pub const MEDIA: &str = "media";
    pub const BACKEND_TYPE: &str = "backendType";
    pub const SNAPSHOTS: &str = "snapshots";
    pub const CLONES: &str = "clones";
    pub const ENCRYPTION: &str = "encryption";
    pub const PROVISIONING_TYPE: &str = "provisioningType";
}

/// What a pool offers for one attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Offer {
    Bool(bool),
    String(String),
    /// Any of the listed values
    StringList(Vec<String>),
}

impl Offer {
    pub fn string(value: impl Into<String>) -> Self {
        Offer::String(value.into())
    }

    pub fn strings<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Offer::StringList(values.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// Media
// =============================================================================

/// Physical media class of an aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Media {
    Hdd,
    Hybrid,
    Ssd,
}

impl Media {
    /// Classify an aggregate type string; `None` for types outside the closed set
    pub fn from_aggregate_type(aggregate_type: &str) -> Option<Self> {
        match aggregate_type {
            "hdd" => Some(Media::Hdd),
            "hybrid" => Some(Media::Hybrid),
            "ssd" => Some(Media::Ssd),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Media::Hdd => "hdd",
            Media::Hybrid => "hybrid",
            Media::Ssd => "ssd",
        }
    }

    /// Attribute offers implied by this media class
    pub fn offers(&self) -> BTreeMap<String, Offer> {
        BTreeMap::from([(attr::MEDIA.to_string(), Offer::string(self.as_str()))])
    }
}

impl std::fmt::Display for Media {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Capacity Pool
// =============================================================================

/// One aggregate offered for provisioning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityPool {
    /// Aggregate name
    pub name: String,
    /// Backend owning the pool
    pub backend: String,
    pub attributes: BTreeMap<String, Offer>,
}

impl CapacityPool {
    pub fn new(backend: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backend: backend.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add or replace attribute offers
    pub fn merge_attributes(&mut self, offers: &BTreeMap<String, Offer>) {
        for (name, offer) in offers {
            self.attributes.insert(name.clone(), offer.clone());
        }
    }

    /// Media class, if discovery could determine it
    pub fn media(&self) -> Option<Media> {
        match self.attributes.get(attr::MEDIA) {
            Some(Offer::String(value)) => Media::from_aggregate_type(value),
            _ => None,
        }
    }
}
