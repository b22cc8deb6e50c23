//! Contract read surfaces queried for oracle values.

use alloy_sol_types::sol;

sol! {
    /// ERC20 read functions used as the slot search oracle.
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
    }

    /// Permit2 `AllowanceTransfer` read function.
    interface IAllowanceTransfer {
        function allowance(address owner, address token, address spender)
            external
            view
            returns (uint160 amount, uint48 expiration, uint48 nonce);
    }
}
