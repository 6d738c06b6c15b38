use crate::error::SdkError;
use crate::types::MigrationEvent;
use alloy::primitives::{Address, U256};
use log::warn;

/// An event can be imported iff it names a real user and carries a non-zero amount.
pub fn is_valid(event: &MigrationEvent) -> bool {
    event.user != Address::ZERO && event.amount > U256::ZERO
}

/// Keep valid events in their original order. Dropped events are logged with their raw fields.
pub fn filter_valid(events: &[MigrationEvent]) -> Vec<MigrationEvent> {
    events
        .iter()
        .filter(|event| {
            let valid = is_valid(event);
            if !valid {
                let err = SdkError::InvalidEventData(format!(
                    "user={} amount={} timestamp={} block={:?}",
                    event.user, event.amount, event.timestamp, event.block_number
                ));
                warn!("Dropping event: {}", err);
            }
            valid
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(user: Address, amount: u64) -> MigrationEvent {
        MigrationEvent::new(user, U256::from(amount), 1)
    }

    #[test]
    fn test_zero_address_invalid() {
        assert!(!is_valid(&event(Address::ZERO, 100)));
    }

    #[test]
    fn test_zero_amount_invalid() {
        assert!(!is_valid(&event(Address::repeat_byte(1), 0)));
    }

    #[test]
    fn test_valid_event() {
        assert!(is_valid(&event(Address::repeat_byte(1), 1)));
        assert!(is_valid(&MigrationEvent::new(Address::repeat_byte(9), U256::MAX, 0)));
    }

    #[test]
    fn test_filter_preserves_order() {
        let events = vec![
            event(Address::repeat_byte(1), 5),
            event(Address::ZERO, 5),
            event(Address::repeat_byte(2), 0),
            event(Address::repeat_byte(3), 7),
            event(Address::repeat_byte(4), 9),
        ];
        let valid = filter_valid(&events);

        let users: Vec<_> = valid.iter().map(|e| e.user).collect();
        assert_eq!(
            users,
            vec![Address::repeat_byte(1), Address::repeat_byte(3), Address::repeat_byte(4)]
        );
        // input untouched, result deterministic
        assert_eq!(events.len(), 5);
        assert_eq!(filter_valid(&events), valid);
    }
}
