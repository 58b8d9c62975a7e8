use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Normalized map of entities keyed by their canonical identifier.
pub type ById<T> = BTreeMap<String, T>;

/// A record that can live in a by-id slice.
///
/// The wire name of the identifier differs per OpenSRP resource
/// (`identifier`, `id`, `plan_id`); serde attributes on each entity fold it
/// into one field so nothing past deserialization has to care.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: &'static str;

    fn id(&self) -> &str;
}

/// Build a by-id map from a fetched list. Later duplicates in the same batch win.
#[must_use]
pub fn key_by_id<T: Entity>(list: impl IntoIterator<Item = T>) -> ById<T> {
    list.into_iter().map(|entity| (entity.id().to_string(), entity)).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(from = "String", into = "String")]
pub enum PlanStatus {
    Draft,
    Active,
    Complete,
    Retired,
    Other(String),
}

impl PlanStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Complete => "complete",
            Self::Retired => "retired",
            Self::Other(value) => value,
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "active" => Some(Self::Active),
            "complete" => Some(Self::Complete),
            "retired" => Some(Self::Retired),
            _ => None,
        }
    }
}

impl From<String> for PlanStatus {
    fn from(value: String) -> Self {
        Self::parse(&value).unwrap_or(Self::Other(value))
    }
}

impl From<PlanStatus> for String {
    fn from(value: PlanStatus) -> Self {
        value.as_str().to_string()
    }
}

impl Display for PlanStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(from = "String", into = "String")]
pub enum InterventionType {
    Fi,
    Irs,
    Mda,
    MdaPoint,
    DynamicFi,
    DynamicIrs,
    DynamicMda,
    Other(String),
}

impl InterventionType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Fi => "FI",
            Self::Irs => "IRS",
            Self::Mda => "MDA",
            Self::MdaPoint => "MDA-Point",
            Self::DynamicFi => "Dynamic-FI",
            Self::DynamicIrs => "Dynamic-IRS",
            Self::DynamicMda => "Dynamic-MDA",
            Self::Other(value) => value,
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "FI" => Some(Self::Fi),
            "IRS" => Some(Self::Irs),
            "MDA" => Some(Self::Mda),
            "MDA-Point" => Some(Self::MdaPoint),
            "Dynamic-FI" => Some(Self::DynamicFi),
            "Dynamic-IRS" => Some(Self::DynamicIrs),
            "Dynamic-MDA" => Some(Self::DynamicMda),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::DynamicFi | Self::DynamicIrs | Self::DynamicMda)
    }
}

impl From<String> for InterventionType {
    fn from(value: String) -> Self {
        Self::parse(&value).unwrap_or(Self::Other(value))
    }
}

impl From<InterventionType> for String {
    fn from(value: InterventionType) -> Self {
        value.as_str().to_string()
    }
}

impl Display for InterventionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a focus investigation was opened.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(from = "String", into = "String")]
pub enum FiReason {
    Routine,
    CaseTriggered,
    Other(String),
}

impl FiReason {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Routine => "Routine",
            Self::CaseTriggered => "Case Triggered",
            Self::Other(value) => value,
        }
    }

    /// Accepts both the display form (`Case Triggered`) and the slug form
    /// (`Case-triggered`) that older plan payloads carry.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Routine" | "routine" => Some(Self::Routine),
            "Case Triggered" | "Case-triggered" | "case-triggered" | "Case-Triggered" => {
                Some(Self::CaseTriggered)
            }
            _ => None,
        }
    }
}

impl From<String> for FiReason {
    fn from(value: String) -> Self {
        Self::parse(&value).unwrap_or(Self::Other(value))
    }
}

impl From<FiReason> for String {
    fn from(value: FiReason) -> Self {
        value.as_str().to_string()
    }
}

impl Display for FiReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Focus investigation classification of the area under investigation.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(from = "String", into = "String")]
pub enum FiStatus {
    A1,
    A2,
    B1,
    B2,
    Other(String),
}

impl FiStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::B1 => "B1",
            Self::B2 => "B2",
            Self::Other(value) => value,
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A1" => Some(Self::A1),
            "A2" => Some(Self::A2),
            "B1" => Some(Self::B1),
            "B2" => Some(Self::B2),
            _ => None,
        }
    }
}

impl From<String> for FiStatus {
    fn from(value: String) -> Self {
        Self::parse(&value).unwrap_or(Self::Other(value))
    }
}

impl From<FiStatus> for String {
    fn from(value: FiStatus) -> Self {
        value.as_str().to_string()
    }
}

impl Display for FiStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
