use std::borrow::Cow;

/// Errors that can occur during event bus operations.
#[bazaar_derive::bazaar_error]
pub enum EventBusError {
    /// A stored channel did not have the type its topic promised.
    /// This indicates an invariant violation in the registry.
    #[error("Type mismatch{}: {message}", format_context(.context))]
    TypeMismatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Stream capacity must be greater than zero.
    #[error("Invalid capacity{}: {message}", format_context(.context))]
    InvalidCapacity { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
