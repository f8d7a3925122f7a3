//! Attribute catalog domain model.
//!
//! # Responsibility
//! - Define attribute definitions, value options and item assignments.
//! - Provide the storage tokens shared by repository and serialization.
//!
//! # Invariants
//! - `AttributeDefinition::name` is unique across all definitions.
//! - Value options exist only for selection input kinds.
//! - One assignment row per `(item_id, attribute_id)`.

use serde::{Deserialize, Serialize};

/// Store-assigned attribute definition identifier.
pub type AttributeId = i64;

/// Store-assigned value option identifier.
pub type ValueId = i64;

/// Item identifier owned by the item service.
pub type ItemId = i64;

/// Scope an attribute definition applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeClassification {
    /// Describes the product as a whole.
    Product,
    /// Distinguishes sellable SKUs of one product.
    Sku,
}

impl AttributeClassification {
    /// Storage token for this classification.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Sku => "sku",
        }
    }

    /// Parses a storage token.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "product" => Some(Self::Product),
            "sku" => Some(Self::Sku),
            _ => None,
        }
    }
}

/// How a value is entered for an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Free text stored on the assignment itself.
    Text,
    /// Exactly one value option.
    SingleSelect,
    /// One or more value options.
    MultiSelect,
}

impl InputKind {
    /// Returns whether values come from the attribute's value options.
    pub fn is_selection(self) -> bool {
        matches!(self, Self::SingleSelect | Self::MultiSelect)
    }

    /// Storage token for this input kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::SingleSelect => "single_select",
            Self::MultiSelect => "multi_select",
        }
    }

    /// Parses a storage token.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "single_select" => Some(Self::SingleSelect),
            "multi_select" => Some(Self::MultiSelect),
            _ => None,
        }
    }
}

/// Named, typed characteristic that can be attached to items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub id: AttributeId,
    pub name: String,
    pub classification: AttributeClassification,
    pub input_kind: InputKind,
    pub required: bool,
    pub searchable: bool,
    /// Ascending display order.
    pub sort_weight: i64,
    pub visible: bool,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds. Only moves when a field actually changes.
    pub updated_at: i64,
}

/// Definition fields before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttribute {
    pub name: String,
    pub classification: AttributeClassification,
    pub input_kind: InputKind,
    pub required: bool,
    pub searchable: bool,
    pub sort_weight: i64,
    pub visible: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl NewAttribute {
    /// Attaches the store-assigned id.
    pub fn into_definition(self, id: AttributeId) -> AttributeDefinition {
        AttributeDefinition {
            id,
            name: self.name,
            classification: self.classification,
            input_kind: self.input_kind,
            required: self.required,
            searchable: self.searchable,
            sort_weight: self.sort_weight,
            visible: self.visible,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Changed fields of one definition. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeChanges {
    pub name: Option<String>,
    pub classification: Option<AttributeClassification>,
    pub input_kind: Option<InputKind>,
    pub required: Option<bool>,
    pub searchable: Option<bool>,
    pub sort_weight: Option<i64>,
    pub visible: Option<bool>,
}

impl AttributeChanges {
    /// Returns whether no field is set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.classification.is_none()
            && self.input_kind.is_none()
            && self.required.is_none()
            && self.searchable.is_none()
            && self.sort_weight.is_none()
            && self.visible.is_none()
    }
}

/// One selectable value of a selection-kind attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValueOption {
    pub id: ValueId,
    /// Owning definition. The option never outlives it.
    pub attribute_id: AttributeId,
    pub value: String,
    pub sort_weight: i64,
}

/// Value option fields before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewValueOption {
    pub attribute_id: AttributeId,
    pub value: String,
    pub sort_weight: i64,
}

/// Definition read model with its value options attached.
///
/// `values` is empty unless `definition.input_kind.is_selection()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeWithValues {
    pub definition: AttributeDefinition,
    pub values: Vec<AttributeValueOption>,
}

/// Fact that an item carries an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAttributeAssignment {
    pub item_id: ItemId,
    pub attribute_id: AttributeId,
    /// Selected option, used by selection kinds.
    pub value_id: Option<ValueId>,
    /// Literal text, used by `InputKind::Text`.
    pub input_value: Option<String>,
    /// Epoch milliseconds.
    pub created_at: i64,
}
