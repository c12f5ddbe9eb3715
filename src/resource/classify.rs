//! Variant classification
//!
//! Routes a loosely shaped JSON value into exactly one member of a closed set
//! of variants. Each variant names the field that marks it; a value must carry
//! the marker of one variant and no other, so overlapping shapes are rejected
//! rather than resolved by probe order.

use super::kind::ResourceKind;
use crate::error::ClassifyError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A closed set of variants, each identified by one marker field
pub trait Variant: Sized + Copy + 'static {
    const MARKERS: &'static [(&'static str, Self)];
}

impl Variant for ResourceKind {
    const MARKERS: &'static [(&'static str, Self)] = &[
        ("completed", ResourceKind::Todos),
        ("body", ResourceKind::Posts),
    ];
}

/// Determine which variant `value` belongs to.
///
/// A marker whose value is `null` counts as absent.
pub fn classify<V: Variant>(value: &Value) -> Result<V, ClassifyError> {
    let Some(map) = value.as_object() else {
        return Err(ClassifyError::NotAnObject);
    };

    let present: Vec<(&'static str, V)> = V::MARKERS
        .iter()
        .copied()
        .filter(|(field, _)| map.get(*field).is_some_and(|v| !v.is_null()))
        .collect();

    match present.as_slice() {
        [] => Err(ClassifyError::Unrecognized),
        [(_, variant)] => Ok(*variant),
        many => Err(ClassifyError::Ambiguous(
            many.iter().map(|(field, _)| *field).collect(),
        )),
    }
}

/// Which record shape a single item has
pub fn classify_record(value: &Value) -> Result<ResourceKind, ClassifyError> {
    classify(value)
}

/// Payment capability tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Card,
    Cash,
}

impl Variant for PaymentMethod {
    const MARKERS: &'static [(&'static str, Self)] = &[
        ("cardId", PaymentMethod::Card),
        ("amount", PaymentMethod::Cash),
    ];
}

/// Exactly one way of paying; never both, never neither
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PaymentWire", into = "PaymentWire")]
pub enum Payment {
    Card { card_id: String },
    Cash { amount: f64 },
}

impl Payment {
    pub fn method(&self) -> PaymentMethod {
        match self {
            Self::Card { .. } => PaymentMethod::Card,
            Self::Cash { .. } => PaymentMethod::Cash,
        }
    }

    /// Classify then decode a loosely shaped value
    pub fn from_value(value: &Value) -> Result<Self, ClassifyError> {
        if !value.is_object() {
            return Err(ClassifyError::NotAnObject);
        }
        let wire = PaymentWire::deserialize(value).map_err(|e| ClassifyError::Invalid(e.to_string()))?;
        Self::try_from(wire)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PaymentWire {
    #[serde(rename = "cardId", default, skip_serializing_if = "Option::is_none")]
    card_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    amount: Option<f64>,
}

impl TryFrom<PaymentWire> for Payment {
    type Error = ClassifyError;

    fn try_from(wire: PaymentWire) -> Result<Self, Self::Error> {
        match (wire.card_id, wire.amount) {
            (Some(card_id), None) => Ok(Self::Card { card_id }),
            (None, Some(amount)) => Ok(Self::Cash { amount }),
            (Some(_), Some(_)) => Err(ClassifyError::Ambiguous(vec!["cardId", "amount"])),
            (None, None) => Err(ClassifyError::Unrecognized),
        }
    }
}

impl From<Payment> for PaymentWire {
    fn from(payment: Payment) -> Self {
        match payment {
            Payment::Card { card_id } => Self {
                card_id: Some(card_id),
                amount: None,
            },
            Payment::Cash { amount } => Self {
                card_id: None,
                amount: Some(amount),
            },
        }
    }
}
