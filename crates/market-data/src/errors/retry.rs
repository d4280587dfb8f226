/// Classification for the adapter retry loop.
///
/// Used to determine how an adapter responds to a failed upstream call.
///
/// # Behavior Summary
///
/// | Class | Retry same symbol? | Try next symbol variant? |
/// |-------|--------------------|--------------------------|
/// | `WithBackoff` | Yes, after a jittered delay | Once attempts run out |
/// | `NextVariant` | No | Yes |
/// | `Abort` | No | No (source gives up) |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Transient failure (timeout, network error, malformed response).
    /// Retry the same request after a backoff delay.
    WithBackoff,

    /// The upstream answered but had nothing usable for this symbol form.
    /// Move on to the next symbol variant without retrying.
    NextVariant,

    /// The source cannot serve anything right now (rate limited, missing
    /// credentials). Report failure so the orchestrator tries the next source.
    Abort,
}
