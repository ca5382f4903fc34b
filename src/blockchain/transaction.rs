use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::value::RawValue;

use std::fmt;

use super::crypto::Address;

/// Represents a value transfer between two addresses
///
/// The serialized key names and their order are part of the block hash, so
/// they must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender's address
    #[serde(rename = "send_blockchain_address")]
    pub sender: Address,

    /// Recipient's address
    #[serde(rename = "recipient_blockchain_address")]
    pub recipient: Address,

    /// Amount being transferred
    #[serde(serialize_with = "serialize_value")]
    pub value: f32,
}

impl Transaction {
    /// Creates a new transaction
    ///
    /// No checks are made on the addresses or the sign of the value.
    ///
    /// # Arguments
    ///
    /// * `sender` - The address of the sender
    /// * `recipient` - The address of the recipient
    /// * `value` - The amount to transfer
    ///
    /// # Returns
    ///
    /// A new Transaction instance
    pub fn new(sender: impl Into<Address>, recipient: impl Into<Address>, value: f32) -> Self {
        Transaction {
            sender: sender.into(),
            recipient: recipient.into(),
            value,
        }
    }

    /// Signed effect of this transaction on the balance of `address`
    pub fn balance_delta(&self, address: &str) -> f32 {
        let mut delta = 0.0;

        if self.recipient.as_str() == address {
            delta += self.value;
        }
        if self.sender.as_str() == address {
            delta -= self.value;
        }

        delta
    }
}

/// Renders an amount the way Go's encoding/json renders a float32
///
/// Shortest round-trip digits with no trailing ".0", and exponent form with
/// an explicit sign outside [1e-6, 1e21). Non-finite values have no JSON form.
fn format_value(value: f32) -> Option<String> {
    if !value.is_finite() {
        return None;
    }

    let abs = value.abs();
    if abs == 0.0 || (1e-6..1e21).contains(&abs) {
        return Some(value.to_string());
    }

    let text = format!("{:e}", value);
    Some(match text.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => text,
    })
}

fn serialize_value<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
    let text = format_value(*value)
        .ok_or_else(|| S::Error::custom(format!("unsupported value: {}", value)))?;

    RawValue::from_string(text)
        .map_err(S::Error::custom)?
        .serialize(serializer)
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "-".repeat(40))?;
        writeln!(f, " send_blockchain_address: {}", self.sender)?;
        writeln!(f, " recipient_blockchain_address: {}", self.recipient)?;
        write!(f, " value: {:.1}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transaction() {
        let transaction = Transaction::new("alice", "bob", 2.5);

        assert_eq!(transaction.sender, Address::from("alice"));
        assert_eq!(transaction.recipient, Address::from("bob"));
        assert_eq!(transaction.value, 2.5);
    }

    #[test]
    fn test_canonical_encoding() {
        let transaction = Transaction::new("A", "B", 5.0);

        let json = serde_json::to_string(&transaction).unwrap();
        assert_eq!(
            json,
            r#"{"send_blockchain_address":"A","recipient_blockchain_address":"B","value":5}"#
        );
    }

    #[test]
    fn test_value_rendering() {
        assert_eq!(format_value(1.0).unwrap(), "1");
        assert_eq!(format_value(-3.0).unwrap(), "-3");
        assert_eq!(format_value(0.0).unwrap(), "0");
        assert_eq!(format_value(2.01).unwrap(), "2.01");
        assert_eq!(format_value(10.187).unwrap(), "10.187");
        assert_eq!(format_value(0.25).unwrap(), "0.25");
        assert_eq!(format_value(1e20).unwrap(), "100000000000000000000");
        assert_eq!(format_value(1e21).unwrap(), "1e+21");
        assert_eq!(format_value(1e-7).unwrap(), "1e-7");
        assert!(format_value(f32::NAN).is_none());
        assert!(format_value(f32::INFINITY).is_none());
    }

    #[test]
    fn test_non_finite_value_fails_to_encode() {
        let transaction = Transaction::new("A", "B", f32::NAN);

        assert!(serde_json::to_string(&transaction).is_err());
    }

    #[test]
    fn test_integral_value_decodes() {
        let json = concat!(
            r#"{"send_blockchain_address":"A","#,
            r#""recipient_blockchain_address":"B","value":5}"#
        );

        let transaction: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(transaction, Transaction::new("A", "B", 5.0));
    }

    #[test]
    fn test_balance_delta() {
        let transaction = Transaction::new("A", "B", 5.0);

        assert_eq!(transaction.balance_delta("A"), -5.0);
        assert_eq!(transaction.balance_delta("B"), 5.0);
        assert_eq!(transaction.balance_delta("C"), 0.0);

        // A self-transfer leaves the balance unchanged
        let self_transfer = Transaction::new("A", "A", 3.0);
        assert_eq!(self_transfer.balance_delta("A"), 0.0);
    }

    #[test]
    fn test_negative_value_is_accepted() {
        let transaction = Transaction::new("A", "B", -1.0);

        assert_eq!(transaction.balance_delta("A"), 1.0);
    }

    #[test]
    fn test_display() {
        let transaction = Transaction::new("A", "B", 10.187);
        let rendered = transaction.to_string();

        assert!(rendered.contains("send_blockchain_address: A"));
        assert!(rendered.contains("recipient_blockchain_address: B"));
        assert!(rendered.contains("value: 10.2"));
    }
}
