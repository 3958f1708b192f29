//! XPort contract ABI definitions
//!
//! Uses alloy's sol! macro to generate call encoders/decoders for the four
//! externally deployed contracts. Calls are encoded here and sent through a
//! wallet backend or a [`ChainReader`](super::reader::ChainReader); no
//! provider is bound to the bindings themselves.

#![allow(clippy::too_many_arguments)]

use alloy::sol;

sol! {
    /// Test token deployed on Sepolia (ERC20 + open mint)
    contract MockERC20 {
        function mint(address to, uint256 amount) external;
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
    }
}

sol! {
    /// Home-side bridge contract on Sepolia (locks MockERC20)
    contract Erc20TokenHome {
        function crossTo(address toUser, uint256 amount) external payable;
        function token() external view returns (address);
        function estimateFee(uint256 remoteChainId, uint256 gasLimit) external view returns (uint256);
        function wmbGateway() external view returns (address);
        function remoteSC() external view returns (address);
        function remoteChainId() external view returns (uint256);
    }
}

sol! {
    /// Remote-side bridge token on VeChain (mints/burns)
    contract Erc20TokenRemote {
        function crossBack(address toUser, uint256 amount) external payable;
        function estimateFee(uint256 remoteChainId, uint256 gasLimit) external view returns (uint256);
        function wmbGateway() external view returns (address);
        function remoteSC() external view returns (address);
        function remoteChainId() external view returns (uint256);
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

sol! {
    /// WMB message gateway (fee estimation and admin surface)
    contract WmbGateway {
        function chainId() external view returns (uint256);
        function estimateFee(uint256 targetChainId, uint256 gasLimit) external view returns (uint256);
        function dispatchMessage(uint256 toChainId, address to, bytes data) external payable returns (bytes32);

        function DEFAULT_ADMIN_ROLE() external view returns (bytes32);
        function baseFees(uint256 chainId) external view returns (uint256);
        function defaultGasLimit() external view returns (uint256);
        function maxGasLimit() external view returns (uint256);
        function minGasLimit() external view returns (uint256);
        function maxMessageLength() external view returns (uint256);
        function signatureVerifier() external view returns (address);
        function wanchainStoremanAdminSC() external view returns (address);
        function supportedDstChains(uint256 chainId) external view returns (bool);
        function hasRole(bytes32 role, address account) external view returns (bool);

        function setGasLimit(uint256 _maxGasLimit, uint256 _minGasLimit, uint256 _defaultGasLimit) external;
        function setMaxMessageLength(uint256 _maxMessageLength) external;
        function setSignatureVerifier(address _signatureVerifier) external;
        function setSupportedDstChains(uint256[] targetChainIds, bool[] supported) external;
        function batchSetBaseFees(uint256[] _targetChainIds, uint256[] _baseFees) external;
        function withdrawFee(address _to) external;
    }
}
