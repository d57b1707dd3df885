/// Domain-specific error types for the auction engine.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    #[error("invalid value: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("an active auction named '{0}' already exists")]
    DuplicateName(String),

    #[error("the marketplace is closed")]
    GateClosed,

    #[error("conflicting state: {0}")]
    StateConflict(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("auction '{0}' already has a bid")]
    AuctionHasBids(String),

    #[error("insufficient funds to cover {0}")]
    InsufficientFunds(u64),

    #[error("the buyout was requested by another player")]
    WrongRequester,

    #[error("the buyout confirmation window has expired")]
    ExpiredConfirmation,

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MarketError {
    /// Whether this is a recoverable local outcome the command layer can
    /// report to the player verbatim. `Persistence`, `Serialization`, and
    /// wrapped infrastructure errors are logged and surfaced generically.
    pub const fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::Persistence(_) | Self::Serialization(_) | Self::Other(_)
        )
    }
}

/// Convenience type alias.
pub type MarketResult<T> = Result<T, MarketError>;
