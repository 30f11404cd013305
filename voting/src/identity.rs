//! Content-addressed proposal identifiers

use relayvote_core::{ProposalContent, ProposalId, RelayVoteResult};
use relayvote_crypto::hashing::tagged_hash;

const PROPOSAL_DOMAIN: &[u8] = b"RELAYVOTE_PROPOSAL:";

/// Derive the proposal ID from its content.
///
/// Depends only on the content bytes, never on submitter, submission order or
/// wall-clock time, so every relayer observing the same event lands on the
/// same record.
pub fn identify(content: &ProposalContent) -> RelayVoteResult<ProposalId> {
    let bytes = content.canonical_bytes()?;
    Ok(tagged_hash(PROPOSAL_DOMAIN, &[bytes.as_slice()]))
}
