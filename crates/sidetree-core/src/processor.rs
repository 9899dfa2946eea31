//! The operations processor.
//!
//! One processor instance owns one anchor's lifecycle: it walks the file
//! graph in strict dependency order, validates each file against the
//! context accumulated from its predecessors, and emits the batch's
//! typed operations keyed by DID suffix.
//!
//! ```text
//! START -> CORE_INDEX_FETCHED -> CORE_INDEX_VALIDATED
//!       -> CORE_PROOF_FETCHED -> CORE_PROOF_VALIDATED          (iff named)
//!       -> PROV_INDEX_FETCHED -> PROV_INDEX_VALIDATED          (iff named)
//!       -> PROV_PROOF_FETCHED -> PROV_PROOF_VALIDATED          (iff updates)
//!       -> CHUNK_FETCHED -> CHUNK_VALIDATED                    (iff chunk)
//!       -> EMIT
//! ```
//!
//! Structural violations terminate the pipeline and reject the whole
//! batch. Per-DID verification failures (bad signature, reveal mismatch,
//! delta-hash mismatch) are logged, recorded in the rejected map, and
//! skip only that DID.

use std::sync::Arc;

use crate::anchor::{Anchor, ParsedAnchor};
use crate::cas::{CasError, ContentStore};
use crate::error::{FileKind, ProcessError, VerifyError};
use crate::files::{ChunkFile, CoreIndexFile, CoreProofFile, Delta, ProvisionalIndexFile, ProvisionalProofFile};
use crate::mapping::{DeltaMapping, SuffixSet};
use crate::operations::{
    CreateOperation, DeactivateOperation, ProcessedOperations, RecoverOperation, UpdateOperation,
};
use crate::options::ProcessorOptions;
use crate::signed_data;

/// Pipeline stages, advanced only on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    CoreIndexFetched,
    CoreIndexValidated,
    CoreProofFetched,
    CoreProofValidated,
    ProvisionalIndexFetched,
    ProvisionalIndexValidated,
    ProvisionalProofFetched,
    ProvisionalProofValidated,
    ChunkFetched,
    ChunkValidated,
    Emit,
}

/// Drives one anchor through fetch, validation, and emission.
///
/// The processor is single-owner: nothing it accumulates is shared or
/// published before emission.
pub struct OperationsProcessor<'a> {
    anchor: Anchor,
    parsed: ParsedAnchor,
    options: &'a ProcessorOptions,
    cas: Arc<dyn ContentStore>,
    stage: Stage,
    suffixes: SuffixSet,
    mapping: DeltaMapping,
    result: ProcessedOperations,
}

impl<'a> std::fmt::Debug for OperationsProcessor<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationsProcessor")
            .field("anchor", &self.anchor)
            .field("parsed", &self.parsed)
            .field("stage", &self.stage)
            .field("suffixes", &self.suffixes)
            .field("mapping", &self.mapping)
            .field("result", &self.result)
            .finish()
    }
}

impl<'a> OperationsProcessor<'a> {
    /// Creates a processor for one anchor.
    ///
    /// # Errors
    ///
    /// - [`ProcessError::InvalidMethod`] if the configured method prefix is
    ///   empty
    /// - [`ProcessError::InvalidCas`] if no content store is configured
    /// - [`ProcessError::EmptyAnchorUri`] if the anchor string violates the
    ///   `<opCount>.<CID>` grammar
    pub fn new(anchor: Anchor, options: &'a ProcessorOptions) -> Result<Self, ProcessError> {
        if options.method.is_empty() {
            return Err(ProcessError::InvalidMethod);
        }
        let cas = options.cas.clone().ok_or(ProcessError::InvalidCas)?;
        let parsed = anchor.parse()?;

        Ok(Self {
            result: ProcessedOperations::new(&anchor),
            anchor,
            parsed,
            options,
            cas,
            stage: Stage::Start,
            suffixes: SuffixSet::new(),
            mapping: DeltaMapping::new(),
        })
    }

    /// Runs the pipeline to completion.
    ///
    /// Never fails outward: a structural rejection is reported through the
    /// record's `error` field with empty operation maps.
    #[must_use]
    pub fn process(mut self) -> ProcessedOperations {
        tracing::debug!(
            anchor = %self.anchor.anchor_string,
            sequence = %self.anchor.sequence,
            method = %self.options.method,
            declared_ops = self.parsed.op_count,
            "processing anchor"
        );

        match self.run() {
            Ok(()) => {
                self.advance(Stage::Emit);
                self.apply_filter();
                self.result
            }
            Err(error) => {
                tracing::error!(
                    anchor = %self.anchor.anchor_string,
                    stage = ?self.stage,
                    %error,
                    "batch rejected"
                );
                ProcessedOperations::failed(&self.anchor, error)
            }
        }
    }

    fn run(&mut self) -> Result<(), ProcessError> {
        let core_index_cid = self.parsed.core_index_cid.clone();
        let bytes = self.fetch(FileKind::CoreIndex, &core_index_cid)?;
        self.advance(Stage::CoreIndexFetched);
        let core_index = CoreIndexFile::parse(&bytes, &self.options.protocol)?;

        self.apply_fee_gates(&core_index)?;

        let create_suffixes = core_index.validate(&mut self.suffixes, &mut self.mapping)?;
        self.advance(Stage::CoreIndexValidated);
        for (entry, suffix) in core_index.operations.create.iter().zip(&create_suffixes) {
            self.result.create_ops.insert(
                suffix.clone(),
                CreateOperation {
                    did_suffix: suffix.clone(),
                    suffix_data: entry.suffix_data.clone(),
                    delta: None,
                },
            );
        }

        if !core_index.core_proof_uri.is_empty() {
            let bytes = self.fetch(FileKind::CoreProof, &core_index.core_proof_uri)?;
            self.advance(Stage::CoreProofFetched);
            let core_proof = CoreProofFile::parse(&bytes, &self.options.protocol)?;
            core_proof.validate(&core_index)?;
            self.advance(Stage::CoreProofValidated);
            self.verify_core_proof(&core_proof, &core_index);
        }

        if core_index.provisional_index_uri.is_empty() {
            // Pure create/recover/deactivate batch: no chunk-derived state.
            return Ok(());
        }
        let bytes = self.fetch(FileKind::ProvisionalIndex, &core_index.provisional_index_uri)?;
        self.advance(Stage::ProvisionalIndexFetched);
        let provisional_index = ProvisionalIndexFile::parse(&bytes, &self.options.protocol)?;
        provisional_index.validate(&mut self.suffixes, &mut self.mapping, &self.options.protocol)?;
        self.advance(Stage::ProvisionalIndexValidated);

        if !provisional_index.operations.update.is_empty() {
            let bytes = self.fetch(
                FileKind::ProvisionalProof,
                &provisional_index.provisional_proof_uri,
            )?;
            self.advance(Stage::ProvisionalProofFetched);
            let provisional_proof = ProvisionalProofFile::parse(&bytes, &self.options.protocol)?;
            provisional_proof.validate(&provisional_index, &self.mapping)?;
            self.advance(Stage::ProvisionalProofValidated);
            self.verify_provisional_proof(&provisional_proof, &provisional_index);
        }

        let Some(chunk_entry) = provisional_index.chunks.first() else {
            return Ok(());
        };
        let chunk_cid = chunk_entry.chunk_file_uri.clone();
        let bytes = self.fetch(FileKind::Chunk, &chunk_cid)?;
        self.advance(Stage::ChunkFetched);
        let chunk = ChunkFile::parse(&bytes, &self.options.protocol)?;
        chunk.validate(&self.mapping)?;
        self.advance(Stage::ChunkValidated);
        self.pair_deltas(chunk);

        Ok(())
    }

    /// Runs the optional fee hooks. Hooks that are absent are bypassed.
    fn apply_fee_gates(&self, core_index: &CoreIndexFile) -> Result<(), ProcessError> {
        let fees = &self.options.fees;
        let sequence = self.anchor.sequence.as_str();
        let op_count = self.parsed.op_count;

        let base_fee = fees
            .base_fee
            .as_ref()
            .map_or(0, |base_fee| base_fee(op_count, sequence));

        if let Some(per_operation_fee) = &fees.per_operation_fee {
            if !per_operation_fee(base_fee, op_count, sequence) {
                return Err(ProcessError::FeeRejected);
            }
        }

        if let Some(value_lock) = &fees.value_lock {
            if !value_lock(&core_index.writer_lock_id, op_count, base_fee, sequence) {
                return Err(ProcessError::ValueLockRejected);
            }
        }

        Ok(())
    }

    /// Verifies each Core Proof entry against its position-aligned Core
    /// Index entry. Failures skip the DID, not the batch.
    fn verify_core_proof(&mut self, proof: &CoreProofFile, index: &CoreIndexFile) {
        for (i, entry) in proof.operations.recover.iter().enumerate() {
            let index_op = &index.operations.recover[i];
            match signed_data::verify_recover(&entry.signed_data, &index_op.reveal_value) {
                Ok(payload) => {
                    self.result.recover_ops.insert(
                        index_op.did_suffix.clone(),
                        RecoverOperation {
                            did_suffix: index_op.did_suffix.clone(),
                            reveal_value: index_op.reveal_value.clone(),
                            recovery_commitment: payload.recovery_commitment,
                            delta_hash: payload.delta_hash,
                            anchor_origin: payload.anchor_origin,
                            delta: None,
                        },
                    );
                }
                Err(err) => self.reject(index_op.did_suffix.clone(), err),
            }
        }

        for (i, entry) in proof.operations.deactivate.iter().enumerate() {
            let index_op = &index.operations.deactivate[i];
            match signed_data::verify_deactivate(&entry.signed_data, &index_op.reveal_value) {
                Ok(_payload) => {
                    self.result.deactivate_ops.insert(
                        index_op.did_suffix.clone(),
                        DeactivateOperation {
                            did_suffix: index_op.did_suffix.clone(),
                            reveal_value: index_op.reveal_value.clone(),
                        },
                    );
                }
                Err(err) => self.reject(index_op.did_suffix.clone(), err),
            }
        }
    }

    /// Verifies each Provisional Proof entry against its position-aligned
    /// update entry and records its delta hash for the chunk stage.
    fn verify_provisional_proof(
        &mut self,
        proof: &ProvisionalProofFile,
        index: &ProvisionalIndexFile,
    ) {
        for (i, entry) in proof.operations.update.iter().enumerate() {
            let Some(index_op) = index.update_at(i) else {
                break;
            };
            match signed_data::verify_update(&entry.signed_data, &index_op.reveal_value) {
                Ok(payload) => {
                    self.result.update_ops.insert(
                        index_op.did_suffix.clone(),
                        UpdateOperation {
                            did_suffix: index_op.did_suffix.clone(),
                            reveal_value: index_op.reveal_value.clone(),
                            delta_hash: payload.delta_hash,
                            delta: None,
                        },
                    );
                }
                Err(err) => self.reject(index_op.did_suffix.clone(), err),
            }
        }
    }

    /// Pairs each chunk delta with the operation owning its position.
    ///
    /// Recover and update deltas must hash to the value their signed data
    /// committed to; a mismatch drops the DID. Create deltas attach
    /// unchecked: their commitment lives in the suffix data and is the
    /// document layer's to enforce.
    fn pair_deltas(&mut self, chunk: ChunkFile) {
        for (i, delta) in chunk.deltas.into_iter().enumerate() {
            let Some(suffix) = self.mapping.suffix_at(i).map(str::to_string) else {
                break;
            };
            if self.result.rejected.contains_key(&suffix) {
                continue;
            }

            if let Some(op) = self.result.create_ops.get_mut(&suffix) {
                op.delta = Some(delta);
            } else if self.result.recover_ops.contains_key(&suffix) {
                let expected = self.result.recover_ops[suffix.as_str()].delta_hash.clone();
                match checked_delta(&expected, delta) {
                    Ok(delta) => {
                        if let Some(op) = self.result.recover_ops.get_mut(&suffix) {
                            op.delta = Some(delta);
                        }
                    }
                    Err(err) => {
                        self.result.recover_ops.remove(&suffix);
                        self.reject(suffix, err);
                    }
                }
            } else if self.result.update_ops.contains_key(&suffix) {
                let expected = self.result.update_ops[suffix.as_str()].delta_hash.clone();
                match checked_delta(&expected, delta) {
                    Ok(delta) => {
                        if let Some(op) = self.result.update_ops.get_mut(&suffix) {
                            op.delta = Some(delta);
                        }
                    }
                    Err(err) => {
                        self.result.update_ops.remove(&suffix);
                        self.reject(suffix, err);
                    }
                }
            } else {
                tracing::debug!(suffix = %suffix, position = i, "delta owner absent, skipping");
            }
        }
    }

    /// Applies the DID-of-interest filter at emission. An empty filter
    /// passes everything.
    fn apply_filter(&mut self) {
        let filter = &self.options.did_filter;
        if filter.is_empty() {
            return;
        }
        self.result.create_ops.retain(|suffix, _| filter.contains(suffix));
        self.result.recover_ops.retain(|suffix, _| filter.contains(suffix));
        self.result.update_ops.retain(|suffix, _| filter.contains(suffix));
        self.result
            .deactivate_ops
            .retain(|suffix, _| filter.contains(suffix));
    }

    fn reject(&mut self, suffix: String, error: VerifyError) {
        tracing::warn!(
            anchor = %self.anchor.anchor_string,
            suffix = %suffix,
            %error,
            "operation rejected, skipping DID"
        );
        self.result.rejected.insert(suffix, error);
    }

    fn fetch(&self, file: FileKind, cid: &str) -> Result<Vec<u8>, ProcessError> {
        tracing::debug!(%file, cid, "fetching batch file");
        self.cas
            .fetch(cid, self.options.fetch_deadline)
            .map_err(|err| match err {
                CasError::NotFound { .. } => ProcessError::CasNotFound {
                    file,
                    cid: cid.to_string(),
                },
                CasError::Timeout { .. } => ProcessError::CasTimeout {
                    file,
                    cid: cid.to_string(),
                },
                CasError::Backend { message } => ProcessError::CasFailure {
                    file,
                    cid: cid.to_string(),
                    message,
                },
            })
    }

    fn advance(&mut self, stage: Stage) {
        tracing::debug!(anchor = %self.anchor.anchor_string, from = ?self.stage, to = ?stage, "stage");
        self.stage = stage;
    }
}

/// Checks a delta against the hash its signed data committed to.
fn checked_delta(expected: &str, delta: Delta) -> Result<Delta, VerifyError> {
    let computed = delta.hash().map_err(|err| VerifyError::MalformedEncoding {
        message: err.to_string(),
    })?;
    if computed != expected {
        return Err(VerifyError::DeltaHashMismatch {
            expected: expected.to_string(),
            computed,
        });
    }
    Ok(delta)
}
