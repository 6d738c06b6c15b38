//! Contract bindings for the vault and its deposit token.

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IVault {
        event UserDepositMigrated(address indexed user, uint256 amount, uint256 timestamp);

        function importUserDepositsBatch(
            address[] users,
            uint256[] amounts,
            uint256[] timestamps,
            bool[] refundedStatus
        ) external;

        function totalDeposits() external view returns (uint256);
        function getDepositorCount() external view returns (uint256);
        function getUserDeposit(address user)
            external
            view
            returns (uint256 amount, uint256 timestamp, bool refunded, bool migrated);
        function withdrawAllowed() external view returns (bool);
        function getCurrentPrice() external view returns (uint256);
        function TARGET_PRICE() external view returns (uint256);
        function TOKEN() external view returns (address);

        function deposit(uint256 amount) external;
        function withdrawRefund() external;
    }

    #[sol(rpc)]
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::keccak256;
    use alloy::sol_types::SolEvent;

    #[test]
    fn test_migration_topic() {
        assert_eq!(
            IVault::UserDepositMigrated::SIGNATURE_HASH,
            keccak256("UserDepositMigrated(address,uint256,uint256)")
        );
    }
}
