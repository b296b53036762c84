//! Request/response correlation token

use crate::transport::RequestHeader;

/// Scratch slot that receives the header of a taken request or response.
///
/// One token is acquired per spin cycle and shared by every service and client
/// processed in that cycle. Each take overwrites it, and the reactor clears it
/// before every take so that a failed take never exposes a stale header.
#[derive(Debug, Default)]
pub struct CorrelationToken {
    header: Option<RequestHeader>,
}

impl CorrelationToken {
    pub fn acquire() -> Self {
        Self { header: None }
    }

    /// Record the header of a successful take. Called by transports.
    pub fn fill(&mut self, header: RequestHeader) {
        self.header = Some(header);
    }

    pub fn clear(&mut self) {
        self.header = None;
    }

    pub fn header(&self) -> Option<RequestHeader> {
        self.header
    }

    /// Sequence number of the last successful take, if any.
    pub fn sequence_number(&self) -> Option<i64> {
        self.header.map(|h| h.sequence_number)
    }

    pub fn is_filled(&self) -> bool {
        self.header.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_lifecycle() {
        let mut token = CorrelationToken::acquire();
        assert_eq!(token.sequence_number(), None);

        token.fill(RequestHeader {
            writer_guid: 7,
            sequence_number: 3,
        });
        assert_eq!(token.sequence_number(), Some(3));
        assert_eq!(token.header().map(|h| h.writer_guid), Some(7));

        token.fill(RequestHeader {
            writer_guid: 9,
            sequence_number: 1,
        });
        assert_eq!(token.sequence_number(), Some(1));

        token.clear();
        assert!(!token.is_filled());
    }
}
