pub mod collection;
pub mod decay;
pub mod indexer;
pub mod rpc;
