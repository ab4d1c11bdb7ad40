pub mod areas;
pub mod floors;
pub mod names;
pub mod wizard;

/// Stable machine-readable code reported to clients alongside the message.
pub trait ErrorCode {
    fn code(&self) -> &'static str;
}
