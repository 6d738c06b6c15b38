use crate::error::{LedgerError, Result, SdkError};
use crate::ledger::{EventQuery, EventSource};
use crate::types::MigrationEvent;
use alloy::primitives::{Address, B256};
use log::{debug, info};

/// Attribute a ledger failure to the source side of the pipeline.
fn source_error(err: LedgerError) -> SdkError {
    match err {
        LedgerError::Unavailable(msg) => SdkError::SourceUnavailable(msg),
        other => SdkError::SourceQuery(other.to_string()),
    }
}

/// Inclusive block windows covering `[from, to]`.
pub fn block_windows(from: u64, to: u64, chunk: Option<u64>) -> Vec<(u64, u64)> {
    let Some(chunk) = chunk.filter(|c| *c > 0) else {
        return vec![(from, to)];
    };

    let mut windows = Vec::new();
    let mut start = from;
    loop {
        let end = start.saturating_add(chunk - 1).min(to);
        windows.push((start, end));
        if end >= to {
            break;
        }
        start = end + 1;
    }
    windows
}

/// Read every migration event emitted by `contract` between `from_block` and
/// `to_block` (latest when None). Paging over `chunk` block windows is
/// transparent to the caller; results stay in emission order.
pub async fn fetch_events(
    source: &dyn EventSource,
    contract: Address,
    event_signature: B256,
    from_block: u64,
    to_block: Option<u64>,
    chunk: Option<u64>,
) -> Result<Vec<MigrationEvent>> {
    let to_block = match to_block {
        Some(to) => to,
        None => source.latest_block().await.map_err(source_error)?,
    };

    if to_block < from_block {
        return Err(SdkError::SourceQuery(format!(
            "block range {}..={} is empty",
            from_block, to_block
        )));
    }

    let windows = block_windows(from_block, to_block, chunk);
    info!(
        "Querying {} from blocks {}..={} ({} window(s))",
        contract,
        from_block,
        to_block,
        windows.len()
    );

    let mut events = Vec::new();
    for (start, end) in windows {
        let query = EventQuery {
            contract,
            event_signature,
            from_block: start,
            to_block: end,
        };
        let page = source.fetch_range(&query).await.map_err(source_error)?;
        debug!("Blocks {}..={}: {} event(s)", start, end, page.len());
        events.extend(page);
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySource;
    use alloy::primitives::U256;
    use alloy::rpc::json_rpc::{ErrorPayload, RpcError};
    use alloy::transports::{TransportError, TransportErrorKind};

    #[test]
    fn test_single_window() {
        assert_eq!(block_windows(0, 100, None), vec![(0, 100)]);
        assert_eq!(block_windows(5, 5, Some(10)), vec![(5, 5)]);
    }

    #[test]
    fn test_chunked_windows() {
        assert_eq!(
            block_windows(0, 25, Some(10)),
            vec![(0, 9), (10, 19), (20, 25)]
        );
        assert_eq!(block_windows(1, 10, Some(10)), vec![(1, 10)]);
    }

    #[tokio::test]
    async fn test_paged_fetch_keeps_order() {
        let contract = Address::repeat_byte(0xaa);
        let mut source = MemorySource::new(contract);
        for block in [3u64, 12, 12, 27, 40] {
            source.push(
                block,
                MigrationEvent::new(Address::repeat_byte(block as u8), U256::from(block), block),
            );
        }

        let sig = MemorySource::migration_topic();
        let all = fetch_events(&source, contract, sig, 0, None, Some(10)).await.unwrap();
        let blocks: Vec<_> = all.iter().map(|e| e.block_number.unwrap()).collect();
        assert_eq!(blocks, vec![3, 12, 12, 27, 40]);

        let some = fetch_events(&source, contract, sig, 10, Some(30), Some(7)).await.unwrap();
        assert_eq!(some.len(), 3);
    }

    #[test]
    fn test_endpoint_failures_attributed_to_source() {
        let down = LedgerError::from(TransportErrorKind::custom_str("connection refused"));
        let err = source_error(down);
        assert!(matches!(err, SdkError::SourceUnavailable(_)));
        assert!(err.is_fatal());

        let payload: ErrorPayload = serde_json::from_value(
            serde_json::json!({ "code": -32602, "message": "invalid block range" }),
        )
        .unwrap();
        let response: TransportError = RpcError::ErrorResp(payload);
        let refused = LedgerError::from(response);
        let err = source_error(refused);
        assert!(matches!(err, SdkError::SourceQuery(ref msg) if msg.contains("invalid block range")));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_unreachable_source_is_fatal() {
        let source = MemorySource::new(Address::ZERO).unavailable();
        let err = fetch_events(&source, Address::ZERO, B256::ZERO, 0, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::SourceUnavailable(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_wrong_signature_rejected() {
        let contract = Address::repeat_byte(1);
        let source = MemorySource::new(contract);
        let err = fetch_events(&source, contract, B256::repeat_byte(7), 0, Some(10), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::SourceQuery(_)));
    }
}
