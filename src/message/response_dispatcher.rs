use crate::message::{MessageKind, ResponseEnvelope};

type ResponseHandler<'a> = Box<dyn FnOnce(ResponseEnvelope) + Send + 'a>;

/// One-shot correlation of responses to the single outstanding request.
///
/// The wire format carries no request ID, so the protocol allows only one
/// logical request in flight per connection; the caller registers interest
/// in the paired response kind right before sending and the registration is
/// consumed by the first matching response. This is deliberately not a
/// generalized request-ID multiplexer.
pub struct ResponseDispatcher<'a> {
    pending: Option<(MessageKind, ResponseHandler<'a>)>,
}

impl<'a> ResponseDispatcher<'a> {
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Registers `on_response` as the sole interested party for `kind`.
    ///
    /// A previous registration for a different kind is superseded and its
    /// handler dropped; callers are expected to keep request/response pairs
    /// strictly sequential, so a supersession indicates a caller bug and is
    /// logged.
    pub fn await_once<F>(&mut self, kind: MessageKind, on_response: F)
    where
        F: FnOnce(ResponseEnvelope) + Send + 'a,
    {
        if let Some((pending_kind, _)) = self.pending.as_ref() {
            tracing::warn!(
                superseded_kind = *pending_kind,
                new_kind = kind,
                "superseding a pending response registration"
            );
        }

        self.pending = Some((kind, Box::new(on_response)));
    }

    /// Routes a decoded response to the pending handler.
    ///
    /// Invokes the handler exactly once and deregisters it when the kinds
    /// match. A response with no matching registration is dropped, not
    /// queued; returns whether the envelope was delivered.
    pub fn deliver(&mut self, envelope: ResponseEnvelope) -> bool {
        let matches = self
            .pending
            .as_ref()
            .is_some_and(|(pending_kind, _)| *pending_kind == envelope.kind);

        if !matches {
            tracing::debug!(kind = envelope.kind, "dropping unmatched response");
            return false;
        }

        if let Some((_, handler)) = self.pending.take() {
            handler(envelope);
        }
        true
    }

    pub fn pending_kind(&self) -> Option<MessageKind> {
        self.pending.as_ref().map(|(kind, _)| *kind)
    }

    /// Drops any pending registration.
    ///
    /// Called on disconnect: a response for the in-flight request can no
    /// longer arrive, and holding the handler would leave its caller
    /// waiting forever.
    pub fn clear(&mut self) {
        self.pending = None;
    }
}

impl Default for ResponseDispatcher<'_> {
    fn default() -> Self {
        Self::new()
    }
}
