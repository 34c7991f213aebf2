use thiserror::Error;

use crate::cell::CellError;
use crate::placement::BlockId;
use crate::unit::BuildError;

/// Integrity errors that abort machine assembly.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblyError {
    #[error("block id {0} is placed more than once")]
    DuplicateBlock(BlockId),
    #[error("failed to build block {block} ({catalog_id}): {source}")]
    Build {
        block: BlockId,
        catalog_id: String,
        #[source]
        source: BuildError,
    },
    #[error("input '{input}' of block {block} is wired to unknown block {upstream}")]
    MissingUpstream {
        block: BlockId,
        input: String,
        upstream: BlockId,
    },
    #[error("block {upstream} has no output '{port}' for block {block}")]
    MissingUpstreamPort {
        block: BlockId,
        upstream: BlockId,
        port: String,
    },
    #[error("block {block} has no input '{input}'")]
    MissingInput { block: BlockId, input: String },
    #[error("cannot wire input '{input}' of block {block}: {source}")]
    Connect {
        block: BlockId,
        input: String,
        #[source]
        source: CellError,
    },
}
