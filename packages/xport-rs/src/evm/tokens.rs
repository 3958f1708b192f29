//! ERC20 Token Helpers
//!
//! Balance, allowance and metadata reads for MockERC20 (Sepolia) and
//! Erc20TokenRemote (VeChain). Both expose the same ERC20 read surface, so the
//! MockERC20 bindings are used for either.

use alloy::primitives::{Address, U256};

use crate::error::BridgeError;
use crate::evm::contracts::MockERC20;
use crate::evm::reader::{read, ChainReader};

/// Get the ERC20 token balance of an address
pub async fn get_token_balance(
    reader: &dyn ChainReader,
    token: Address,
    account: Address,
) -> Result<U256, BridgeError> {
    let ret = read(reader, token, MockERC20::balanceOfCall { account }).await?;
    Ok(ret._0)
}

/// Get the ERC20 token allowance
pub async fn get_token_allowance(
    reader: &dyn ChainReader,
    token: Address,
    owner: Address,
    spender: Address,
) -> Result<U256, BridgeError> {
    let ret = read(reader, token, MockERC20::allowanceCall { owner, spender }).await?;
    Ok(ret._0)
}

/// Token info helper struct
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Get complete token info
pub async fn get_token_info(
    reader: &dyn ChainReader,
    token: Address,
) -> Result<TokenInfo, BridgeError> {
    let (name, symbol, decimals) = tokio::try_join!(
        async { read(reader, token, MockERC20::nameCall {}).await.map(|r| r._0) },
        async { read(reader, token, MockERC20::symbolCall {}).await.map(|r| r._0) },
        async { read(reader, token, MockERC20::decimalsCall {}).await.map(|r| r._0) },
    )?;

    Ok(TokenInfo {
        address: token,
        name,
        symbol,
        decimals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChainReader;
    use alloy::sol_types::SolCall;

    #[tokio::test]
    async fn test_get_token_balance_decodes_word() {
        let reader = MockChainReader::new();
        let token = Address::with_last_byte(7);
        let account = Address::with_last_byte(9);
        reader.respond(
            token,
            MockERC20::balanceOfCall::SELECTOR,
            U256::from(1234u64).to_be_bytes::<32>().to_vec(),
        );

        let balance = get_token_balance(&reader, token, account).await.unwrap();
        assert_eq!(balance, U256::from(1234u64));
        assert_eq!(reader.call_count(), 1);
    }

    #[tokio::test]
    async fn test_get_token_allowance_missing_contract_errors() {
        let reader = MockChainReader::new();
        let result = get_token_allowance(
            &reader,
            Address::with_last_byte(1),
            Address::with_last_byte(2),
            Address::with_last_byte(3),
        )
        .await;
        assert!(result.is_err());
    }
}
