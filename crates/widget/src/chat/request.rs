/// Correlation token for one outbound chat request.
///
/// A new token is minted per send so that superseded responses can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(pub u64);

impl RequestToken {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// How a settled request relates to the most recent one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The response belongs to the most recent request and should be rendered.
    Current,
    /// A newer request was sent (or the chat was reset) since this one started.
    Stale,
}

/// Latest-wins bookkeeping for chat requests.
#[derive(Debug, Default)]
pub struct RequestTracker {
    next_id: u64,
    latest: Option<RequestToken>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> RequestToken {
        self.next_id += 1;
        let token = RequestToken::new(self.next_id);
        self.latest = Some(token);
        token
    }

    /// True while the most recent request has not settled.
    pub fn awaiting_response(&self) -> bool {
        self.latest.is_some()
    }

    pub fn settle(&mut self, token: RequestToken) -> Settlement {
        if self.latest == Some(token) {
            self.latest = None;
            Settlement::Current
        } else {
            Settlement::Stale
        }
    }

    /// Marks every outstanding request stale.
    pub fn abandon(&mut self) {
        self.latest = None;
    }
}
