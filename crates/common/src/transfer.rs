//! Host-side description of a payment to verify.
//!
//! `TransferDetails` mirrors the `TransactionSigned` event the checkout iframe
//! posts back to the shop, so it deserializes straight from that JSON payload.
//! `PaymentTerms` is what the shop itself expects to have been paid.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::proto::{TransferVerificationRequest, TrustedData, UntrustedData};

/// Payment terms set by the merchant. These are trusted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTerms {
    /// Logical asset ticker, e.g. "USD" or "ETH"
    pub currency: String,
    /// Decimal amount denominated in `currency`
    pub amount: String,
    pub receiver_address: String,
    /// Tokens the merchant accepts (empty = any)
    #[serde(default)]
    pub token_tickers: Vec<String>,
    /// Chains the merchant accepts (empty = any)
    #[serde(default)]
    pub chain_ids: Vec<u64>,
    #[serde(default)]
    pub verify_eip1271_signature: bool,
}

/// Transfer details reported by the buyer's browser. Never trusted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferDetails {
    pub transaction_hash: String,
    pub chain_id: u64,
    pub sender_address: String,
    /// CAIP-222 style signature, either `0x...` or `eip1271-chainId-<n>`
    pub signature: String,
    /// The message that was signed
    pub message: String,
}

/// Everything needed to build one verification request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationInput {
    pub terms: PaymentTerms,
    pub transfer: TransferDetails,
}

impl TransferDetails {
    /// Cheap shape checks before anything goes over the wire.
    ///
    /// The verification service does the real checking; this only rejects
    /// payloads that can't possibly be valid.
    pub fn validate(&self) -> Result<()> {
        let hash = self
            .transaction_hash
            .strip_prefix("0x")
            .ok_or_else(|| Error::InvalidInput("transaction hash must start with 0x".into()))?;
        if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidInput(format!(
                "transaction hash must be 32 hex-encoded bytes: {}",
                self.transaction_hash
            )));
        }

        if self.chain_id == 0 {
            return Err(Error::InvalidInput("chain id must be non-zero".into()));
        }

        if self.sender_address.is_empty() {
            return Err(Error::InvalidInput("sender address is empty".into()));
        }

        Ok(())
    }
}

impl VerificationInput {
    /// Parse from the JSON form `{"terms": {...}, "transfer": {...}}`
    pub fn from_json(json: &str) -> Result<Self> {
        let input: Self = serde_json::from_str(json)?;
        input.transfer.validate()?;
        Ok(input)
    }

    /// Build the wire request
    pub fn into_request(self) -> TransferVerificationRequest {
        let Self { terms, transfer } = self;

        TransferVerificationRequest {
            trusted: Some(TrustedData {
                currency: terms.currency,
                amount: terms.amount,
                receiver_address: terms.receiver_address,
                token_tickers: terms.token_tickers,
                chain_ids: terms.chain_ids,
                should_verify_eip1271_signature: terms.verify_eip1271_signature,
            }),
            untrusted_to_be_verified: Some(UntrustedData {
                transaction_hash: transfer.transaction_hash,
                chain_id: transfer.chain_id,
                sender_address: transfer.sender_address,
                caip222_style_signature: transfer.signature,
                caip222_style_message: transfer.message,
            }),
        }
    }
}

impl From<VerificationInput> for TransferVerificationRequest {
    fn from(input: VerificationInput) -> Self {
        input.into_request()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TX_HASH: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

    fn sample_json() -> String {
        format!(
            r#"{{
                "terms": {{
                    "currency": "USD",
                    "amount": "25.00",
                    "receiverAddress": "0x000000000000000000000000000000000000dEaD",
                    "chainIds": [1, 10]
                }},
                "transfer": {{
                    "transactionHash": "{TX_HASH}",
                    "chainId": 10,
                    "senderAddress": "0x1111111111111111111111111111111111111111",
                    "signature": "0xabcdef",
                    "message": "Sign in to pay"
                }}
            }}"#
        )
    }

    #[test]
    fn test_from_json_camel_case() {
        let input = VerificationInput::from_json(&sample_json()).unwrap();

        assert_eq!(input.terms.currency, "USD");
        assert_eq!(input.terms.chain_ids, vec![1, 10]);
        assert!(input.terms.token_tickers.is_empty());
        assert!(!input.terms.verify_eip1271_signature);
        assert_eq!(input.transfer.chain_id, 10);
        assert_eq!(input.transfer.transaction_hash, TX_HASH);
    }

    #[test]
    fn test_into_request_maps_trusted_and_untrusted() {
        let req = VerificationInput::from_json(&sample_json())
            .unwrap()
            .into_request();

        let trusted = req.trusted.unwrap();
        assert_eq!(trusted.amount, "25.00");
        assert_eq!(trusted.chain_ids, vec![1, 10]);

        let untrusted = req.untrusted_to_be_verified.unwrap();
        assert_eq!(untrusted.transaction_hash, TX_HASH);
        assert_eq!(untrusted.caip222_style_signature, "0xabcdef");
        assert_eq!(untrusted.caip222_style_message, "Sign in to pay");
    }

    #[test]
    fn test_validate_rejects_bad_hash() {
        let mut transfer = TransferDetails {
            transaction_hash: "5c50".to_string(),
            chain_id: 1,
            sender_address: "0x1111111111111111111111111111111111111111".to_string(),
            ..Default::default()
        };
        assert!(matches!(transfer.validate(), Err(Error::InvalidInput(_))));

        transfer.transaction_hash = "0x5c50".to_string();
        assert!(matches!(transfer.validate(), Err(Error::InvalidInput(_))));

        transfer.transaction_hash = TX_HASH.to_string();
        assert!(transfer.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_chain_id() {
        let transfer = TransferDetails {
            transaction_hash: TX_HASH.to_string(),
            chain_id: 0,
            sender_address: "0x1111111111111111111111111111111111111111".to_string(),
            ..Default::default()
        };
        assert!(matches!(transfer.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        assert!(matches!(
            VerificationInput::from_json("{not json"),
            Err(Error::Json(_))
        ));
    }
}
