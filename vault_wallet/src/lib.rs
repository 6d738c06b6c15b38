pub mod display;
pub mod migrate;
pub mod signer;
