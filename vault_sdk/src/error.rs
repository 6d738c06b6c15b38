use alloy::primitives::TxHash;
use alloy::transports::TransportError;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SdkError>;

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Source ledger unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Source query rejected: {0}")]
    SourceQuery(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid event data: {0}")]
    InvalidEventData(String),

    #[error("Batch {batch_index} rejected: {reason}")]
    BatchRejected {
        batch_index: usize,
        reason: String,
        code: Option<String>,
    },

    #[error("Batch {batch_index} not confirmed within {waited:?}")]
    SubmissionTimeout { batch_index: usize, waited: Duration },

    #[error("Verification read failed: {0}")]
    VerificationRead(String),

    #[error("Withdrawals are not enabled on this vault")]
    WithdrawDisabled,

    #[error("No deposit available to withdraw")]
    NothingToWithdraw,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid signing key")]
    InvalidSigningKey,

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl SdkError {
    /// Fatal kinds abort the pipeline; everything else is folded into the report.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SdkError::SourceUnavailable(_) | SdkError::SourceQuery(_) | SdkError::InvalidConfig(_)
        )
    }
}

impl From<String> for SdkError {
    fn from(s: String) -> Self {
        SdkError::Other(s)
    }
}

impl From<&str> for SdkError {
    fn from(s: &str) -> Self {
        SdkError::Other(s.to_string())
    }
}

/// Failure reported by a ledger endpoint, before it is attributed to a pipeline stage.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("endpoint unreachable: {0}")]
    Unavailable(String),

    #[error("{reason}")]
    Rejected { reason: String, code: Option<i64> },

    #[error("transaction {0} reverted")]
    Reverted(TxHash),

    #[error("{0}")]
    Decode(String),
}

impl LedgerError {
    pub fn code(&self) -> Option<String> {
        match self {
            LedgerError::Rejected { code, .. } => code.map(|c| c.to_string()),
            LedgerError::Reverted(_) => Some("CALL_EXCEPTION".to_string()),
            _ => None,
        }
    }
}

impl From<TransportError> for LedgerError {
    fn from(err: TransportError) -> Self {
        match err.as_error_resp() {
            Some(payload) => LedgerError::Rejected {
                reason: payload.message.to_string(),
                code: Some(payload.code),
            },
            None => LedgerError::Unavailable(err.to_string()),
        }
    }
}

impl From<alloy::contract::Error> for LedgerError {
    fn from(err: alloy::contract::Error) -> Self {
        match err {
            alloy::contract::Error::TransportError(e) => e.into(),
            other => LedgerError::Decode(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::rpc::json_rpc::{ErrorPayload, RpcError};
    use alloy::transports::TransportErrorKind;

    #[test]
    fn test_fatal_kinds() {
        assert!(SdkError::SourceUnavailable("down".into()).is_fatal());
        assert!(SdkError::InvalidConfig("batch size".into()).is_fatal());
        assert!(!SdkError::VerificationRead("x".into()).is_fatal());
        assert!(!SdkError::BatchRejected {
            batch_index: 2,
            reason: "invalid member".into(),
            code: None,
        }
        .is_fatal());
    }

    #[test]
    fn test_ledger_error_code() {
        let rejected = LedgerError::Rejected {
            reason: "execution reverted: not owner".into(),
            code: Some(3),
        };
        assert_eq!(rejected.code().as_deref(), Some("3"));
        assert_eq!(LedgerError::Unavailable("refused".into()).code(), None);
    }

    fn error_response(code: i64, message: &str) -> TransportError {
        let payload: ErrorPayload =
            serde_json::from_value(serde_json::json!({ "code": code, "message": message })).unwrap();
        RpcError::ErrorResp(payload)
    }

    #[test]
    fn test_error_response_is_rejection() {
        let err = LedgerError::from(error_response(-32005, "query returned more than 10000 results"));
        assert_eq!(
            err,
            LedgerError::Rejected {
                reason: "query returned more than 10000 results".into(),
                code: Some(-32005),
            }
        );
        assert_eq!(err.code().as_deref(), Some("-32005"));
    }

    #[test]
    fn test_transport_failure_is_unavailable() {
        let err = LedgerError::from(TransportErrorKind::custom_str("connection refused"));
        assert!(matches!(err, LedgerError::Unavailable(ref msg) if msg.contains("connection refused")));
    }

    #[test]
    fn test_contract_error_mapping() {
        let wrapped = alloy::contract::Error::TransportError(error_response(3, "execution reverted"));
        assert!(matches!(
            LedgerError::from(wrapped),
            LedgerError::Rejected { code: Some(3), .. }
        ));

        let down = alloy::contract::Error::TransportError(TransportErrorKind::custom_str("timed out"));
        assert!(matches!(LedgerError::from(down), LedgerError::Unavailable(_)));

        let unknown = alloy::contract::Error::UnknownFunction("migrateAll".into());
        assert!(matches!(LedgerError::from(unknown), LedgerError::Decode(_)));
    }
}
