//! The five batch file types.
//!
//! An anchored batch spreads its content over a Core Index file, an
//! optional Core Proof file, an optional Provisional Index file, an
//! optional Provisional Proof file, and a Chunk file. Parsers here decode
//! raw (already gunzipped) bytes into immutable value objects and enforce
//! the per-file size caps; they perform no cross-file validation. The
//! cross-file invariants live in each file's `validate` step, which takes
//! the accumulated batch context as explicit parameters.

mod chunk;
mod core_index;
mod core_proof;
mod patch;
mod provisional_index;
mod provisional_proof;

pub use chunk::{ChunkFile, Delta};
pub use core_index::{CoreIndexFile, CoreOperations, CreateEntry, OperationReference, SuffixData};
pub use core_proof::{CoreProofFile, CoreProofOperations};
pub use patch::{Patch, PatchError, PublicKeyEntry, ServiceEntry};
pub use provisional_index::{ChunkEntry, ProvisionalIndexFile, ProvisionalOperations};
pub use provisional_proof::{ProvisionalProofFile, ProvisionalProofOperations};

use serde::de::DeserializeOwned;

use crate::error::{FileKind, ProcessError};
use crate::protocol::ProtocolParameters;

/// Size-caps and decodes one batch file.
fn parse_file<T: DeserializeOwned>(
    file: FileKind,
    bytes: &[u8],
    params: &ProtocolParameters,
) -> Result<T, ProcessError> {
    let max = params.max_size_for(file);
    if bytes.len() > max {
        return Err(ProcessError::FileTooLarge {
            file,
            size: bytes.len(),
            max,
        });
    }

    serde_json::from_slice(bytes).map_err(|err| ProcessError::MalformedFile {
        file,
        message: err.to_string(),
    })
}
