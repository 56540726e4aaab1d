pub mod rpc;

pub use rpc::{SolanaRpcClient, SolanaRpcConfig};
