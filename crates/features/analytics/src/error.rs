use std::borrow::Cow;

/// Analytics error type.
#[bazaar_derive::bazaar_error]
pub enum AnalyticsError {
    /// The sink refused or failed to record an event.
    #[error("Analytics sink failed{}: {message}", format_context(.context))]
    Sink { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
