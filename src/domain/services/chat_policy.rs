//! Chat request state machine.

use crate::domain::entities::{ChatRequest, ChatRequestStatus};

/// Something a participant tries to do with a chat request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    /// Accept or reject a pending request
    Respond,
    /// Send a text, complex or transaction message
    SendMessage,
    RequestEnd,
    ApproveEnd,
    Rate,
}

/// Why an action is not allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    #[error("Not a participant of this chat request")]
    NotParticipant,

    #[error("Only the recipient can respond to a chat request")]
    NotRecipient,

    #[error("Chat request is {actual}, expected {expected}")]
    WrongStatus {
        expected: ChatRequestStatus,
        actual: ChatRequestStatus,
    },

    #[error("Ending this chat was already requested")]
    EndAlreadyRequested,

    #[error("No end request to approve")]
    NoEndRequested,

    #[error("The other participant has to approve the end request")]
    OwnEndRequest,
}

impl PolicyViolation {
    /// Who-you-are violations map to Forbidden, state violations to Conflict.
    pub fn is_forbidden(&self) -> bool {
        matches!(
            self,
            Self::NotParticipant | Self::NotRecipient | Self::OwnEndRequest
        )
    }
}

/// Domain service deciding which actions a user may take on a chat request.
pub struct ChatPolicy;

impl ChatPolicy {
    pub fn check(
        request: &ChatRequest,
        actor_id: i64,
        action: ChatAction,
    ) -> Result<(), PolicyViolation> {
        if !request.is_participant(actor_id) {
            return Err(PolicyViolation::NotParticipant);
        }

        match action {
            ChatAction::Respond => {
                if request.recipient_id != actor_id {
                    return Err(PolicyViolation::NotRecipient);
                }
                Self::expect_status(request, ChatRequestStatus::Pending)
            }
            ChatAction::SendMessage => Self::expect_status(request, ChatRequestStatus::Accepted),
            ChatAction::RequestEnd => {
                Self::expect_status(request, ChatRequestStatus::Accepted)?;
                if request.end_requested_by.is_some() {
                    return Err(PolicyViolation::EndAlreadyRequested);
                }
                Ok(())
            }
            ChatAction::ApproveEnd => {
                Self::expect_status(request, ChatRequestStatus::Accepted)?;
                match request.end_requested_by {
                    None => Err(PolicyViolation::NoEndRequested),
                    Some(requested_by) if requested_by == actor_id => {
                        Err(PolicyViolation::OwnEndRequest)
                    }
                    Some(_) => Ok(()),
                }
            }
            ChatAction::Rate => Self::expect_status(request, ChatRequestStatus::Ended),
        }
    }

    fn expect_status(
        request: &ChatRequest,
        expected: ChatRequestStatus,
    ) -> Result<(), PolicyViolation> {
        if request.status == expected {
            Ok(())
        } else {
            Err(PolicyViolation::WrongStatus {
                expected,
                actual: request.status,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const REQUESTER: i64 = 1;
    const RECIPIENT: i64 = 2;
    const OUTSIDER: i64 = 3;

    fn request(status: ChatRequestStatus, end_requested_by: Option<i64>) -> ChatRequest {
        ChatRequest {
            id: 100,
            requester_id: REQUESTER,
            recipient_id: RECIPIENT,
            status,
            end_requested_by,
            ..Default::default()
        }
    }

    #[test_case(ChatAction::Respond)]
    #[test_case(ChatAction::SendMessage)]
    #[test_case(ChatAction::RequestEnd)]
    #[test_case(ChatAction::ApproveEnd)]
    #[test_case(ChatAction::Rate)]
    fn test_outsider_is_always_rejected(action: ChatAction) {
        for status in [
            ChatRequestStatus::Pending,
            ChatRequestStatus::Accepted,
            ChatRequestStatus::Ended,
        ] {
            let result = ChatPolicy::check(&request(status, None), OUTSIDER, action);
            assert_eq!(result, Err(PolicyViolation::NotParticipant));
        }
    }

    #[test]
    fn test_only_recipient_responds_to_pending() {
        let pending = request(ChatRequestStatus::Pending, None);
        assert!(ChatPolicy::check(&pending, RECIPIENT, ChatAction::Respond).is_ok());
        assert_eq!(
            ChatPolicy::check(&pending, REQUESTER, ChatAction::Respond),
            Err(PolicyViolation::NotRecipient)
        );

        let accepted = request(ChatRequestStatus::Accepted, None);
        assert!(matches!(
            ChatPolicy::check(&accepted, RECIPIENT, ChatAction::Respond),
            Err(PolicyViolation::WrongStatus { .. })
        ));
    }

    #[test_case(ChatRequestStatus::Pending, false)]
    #[test_case(ChatRequestStatus::Accepted, true)]
    #[test_case(ChatRequestStatus::Rejected, false)]
    #[test_case(ChatRequestStatus::Ended, false)]
    fn test_messages_need_accepted(status: ChatRequestStatus, allowed: bool) {
        let result = ChatPolicy::check(&request(status, None), REQUESTER, ChatAction::SendMessage);
        assert_eq!(result.is_ok(), allowed);
    }

    #[test]
    fn test_end_flow() {
        let accepted = request(ChatRequestStatus::Accepted, None);
        assert!(ChatPolicy::check(&accepted, REQUESTER, ChatAction::RequestEnd).is_ok());
        assert_eq!(
            ChatPolicy::check(&accepted, RECIPIENT, ChatAction::ApproveEnd),
            Err(PolicyViolation::NoEndRequested)
        );

        let ending = request(ChatRequestStatus::Accepted, Some(REQUESTER));
        assert_eq!(
            ChatPolicy::check(&ending, RECIPIENT, ChatAction::RequestEnd),
            Err(PolicyViolation::EndAlreadyRequested)
        );
        assert_eq!(
            ChatPolicy::check(&ending, REQUESTER, ChatAction::ApproveEnd),
            Err(PolicyViolation::OwnEndRequest)
        );
        assert!(ChatPolicy::check(&ending, RECIPIENT, ChatAction::ApproveEnd).is_ok());
        // Messages may still flow while the end is pending
        assert!(ChatPolicy::check(&ending, RECIPIENT, ChatAction::SendMessage).is_ok());
    }

    #[test]
    fn test_rating_needs_ended() {
        let ended = request(ChatRequestStatus::Ended, None);
        assert!(ChatPolicy::check(&ended, REQUESTER, ChatAction::Rate).is_ok());
        assert!(ChatPolicy::check(&ended, RECIPIENT, ChatAction::Rate).is_ok());

        let accepted = request(ChatRequestStatus::Accepted, None);
        assert!(ChatPolicy::check(&accepted, REQUESTER, ChatAction::Rate).is_err());
    }

    #[test]
    fn test_violation_classification() {
        assert!(PolicyViolation::NotParticipant.is_forbidden());
        assert!(PolicyViolation::OwnEndRequest.is_forbidden());
        assert!(!PolicyViolation::EndAlreadyRequested.is_forbidden());
        assert!(!PolicyViolation::WrongStatus {
            expected: ChatRequestStatus::Accepted,
            actual: ChatRequestStatus::Ended,
        }
        .is_forbidden());
    }
}
