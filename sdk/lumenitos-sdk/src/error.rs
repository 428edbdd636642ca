use thiserror::Error;

/// SDK-specific error types for Lumenitos operations
#[derive(Debug, Error)]
pub enum LumenitosSdkError {
    /// Owner key is malformed (wrong length or not an ed25519 curve point)
    #[error("Address derivation failed: {0}")]
    AddressDerivation(String),

    /// Contract call reverted or the simulator returned a diagnostic error.
    /// The message is the simulator's, verbatim.
    #[error("Simulation failed: {0}")]
    Simulation(String),

    /// Simulation reported archived entries in the footprint
    #[error("Simulation requires restoring archived entries first (min resource fee {min_resource_fee})")]
    RestoreRequired { min_resource_fee: i64 },

    /// No signer available for an address that must authorize the call
    #[error("No signing key available for {0}")]
    KeyMissing(String),

    /// Authorization entry has a shape the signer does not understand
    #[error("Authorization signing failed: {0}")]
    AuthSigning(String),

    /// Resource budget could not be adjusted
    #[error("Resource budget adjustment failed: {0}")]
    BudgetAdjustment(String),

    /// Network refused the envelope before it reached the ledger
    #[error("Submission rejected ({status}) for {hash}: {}", .detail.as_deref().unwrap_or("no detail"))]
    SubmissionRejected {
        status: String,
        hash: String,
        detail: Option<String>,
    },

    /// Confirmation was not observed in time. The transaction may still land;
    /// re-query `hash` before assuming failure.
    #[error("Transaction {hash} not confirmed after {attempts} polls; outcome unknown")]
    SubmissionTimeout { hash: String, attempts: u32 },

    /// Transaction was included in a ledger and failed
    #[error("Transaction {hash} failed: {detail}")]
    TransactionFailed { hash: String, detail: String },

    /// Ledger entry read failed
    #[error("TTL query failed: {0}")]
    TtlQuery(String),

    /// Connection or RPC error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Address string is not a valid account or contract strkey
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// A pipeline step was invoked out of order
    #[error("Invalid pipeline state: {0}")]
    InvalidPipelineState(String),

    /// XDR encoding/decoding error
    #[error("XDR error: {0}")]
    Xdr(#[from] stellar_xdr::curr::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, LumenitosSdkError>;
