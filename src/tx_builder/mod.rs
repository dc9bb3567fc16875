//! Transaction builder collaborator
//!
//! Produces the `SignedTransaction` the engine submits. The engine never
//! looks inside a transaction; this module is the only place instructions,
//! fee payers and signers are handled.
//!
//! - **errors**: builder error taxonomy
//! - **builder**: `TransactionBuilder` trait, blockhash sources and the
//!   default instruction-list builder

pub mod builder;
pub mod errors;

pub use builder::{
    BlockhashSource, InstructionTxBuilder, StaticBlockhash, TransactionBuilder, TransactionRequest,
};
pub use errors::TransactionBuilderError;
