//! Contract aggregate
//!
//! A contract references one template version and one fee structure and
//! carries free-form field values per namespace. Rendering writes back the
//! last rendered HTML and the storage key of its snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::{Namespace, Scalar};

/// Key/value bag for a single namespace
pub type ScalarMap = BTreeMap<String, Scalar>;

/// Field values keyed by namespace.
///
/// `None` means the namespace was never written; `Some(empty)` means it was
/// written empty. The distinction matters for the shallow merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examiner: Option<ScalarMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<ScalarMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thrive: Option<ScalarMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<ScalarMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fees_overrides: Option<ScalarMap>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values stored for a namespace.
    ///
    /// `Fees` is never stored; its values come from the fee structure.
    pub fn namespace(&self, namespace: Namespace) -> Option<&ScalarMap> {
        match namespace {
            Namespace::Examiner => self.examiner.as_ref(),
            Namespace::Contract => self.contract.as_ref(),
            Namespace::Thrive => self.thrive.as_ref(),
            Namespace::Org => self.org.as_ref(),
            Namespace::FeesOverrides => self.fees_overrides.as_ref(),
            Namespace::Fees => None,
        }
    }

    fn slot_mut(&mut self, namespace: Namespace) -> Option<&mut Option<ScalarMap>> {
        match namespace {
            Namespace::Examiner => Some(&mut self.examiner),
            Namespace::Contract => Some(&mut self.contract),
            Namespace::Thrive => Some(&mut self.thrive),
            Namespace::Org => Some(&mut self.org),
            Namespace::FeesOverrides => Some(&mut self.fees_overrides),
            Namespace::Fees => None,
        }
    }

    /// Replace a whole namespace. Returns false for `Fees`, which is not stored.
    pub fn set_namespace(&mut self, namespace: Namespace, values: ScalarMap) -> bool {
        match self.slot_mut(namespace) {
            Some(slot) => {
                *slot = Some(values);
                true
            }
            None => false,
        }
    }

    /// Set a single key inside a namespace, keeping the other keys.
    pub fn set_value(
        &mut self,
        namespace: Namespace,
        key: impl Into<String>,
        value: Scalar,
    ) -> bool {
        match self.slot_mut(namespace) {
            Some(slot) => {
                slot.get_or_insert_with(ScalarMap::new)
                    .insert(key.into(), value);
                true
            }
            None => false,
        }
    }

    pub fn with_value(
        mut self,
        namespace: Namespace,
        key: impl Into<String>,
        value: impl Into<Scalar>,
    ) -> Self {
        self.set_value(namespace, key, value.into());
        self
    }

    /// Shallow merge: every namespace present in `incoming` replaces the
    /// stored namespace wholesale; namespaces absent from `incoming` are kept.
    ///
    /// Supplying `examiner: {phone}` drops any previously stored examiner keys.
    pub fn merge_shallow(&mut self, mut incoming: FieldValues) {
        for namespace in Namespace::STORED {
            let values = incoming.slot_mut(namespace).and_then(Option::take);
            if let (Some(values), Some(slot)) = (values, self.slot_mut(namespace)) {
                *slot = Some(values);
            }
        }
    }

    /// Override for a fee key, if one is stored
    pub fn fee_override(&self, key: &str) -> Option<&Scalar> {
        self.fees_overrides.as_ref().and_then(|m| m.get(key))
    }
}

/// Snapshot data written back by rendering
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractData {
    #[serde(default)]
    pub rendered_html: Option<String>,
    /// Storage key of the last uploaded unsigned snapshot
    #[serde(default)]
    pub unsigned_html_key: Option<String>,
    #[serde(default)]
    pub last_rendered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: Uuid,
    pub template_version_id: Uuid,
    pub fee_structure_id: Uuid,
    #[serde(default)]
    pub field_values: FieldValues,
    #[serde(default)]
    pub signed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: ContractData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    pub fn new(
        template_version_id: Uuid,
        fee_structure_id: Uuid,
        field_values: FieldValues,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            template_version_id,
            fee_structure_id,
            field_values,
            signed_at: None,
            data: ContractData::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.signed_at.is_some()
    }
}

/// Request to create a contract
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContract {
    pub template_version_id: Uuid,
    pub fee_structure_id: Uuid,
    #[serde(default)]
    pub field_values: FieldValues,
}

/// Immutable template body referenced by contracts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateVersion {
    pub id: Uuid,
    pub template_id: Uuid,
    pub version: u32,
    pub body_html: String,
}

impl TemplateVersion {
    pub fn new(template_id: Uuid, version: u32, body_html: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            template_id,
            version,
            body_html: body_html.into(),
        }
    }
}
