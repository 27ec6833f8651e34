//! Subscription manager: the state machine behind mailing list membership.
//!
//! Not an operation itself. It lives next to the real operations on the
//! backend and is handed out unchanged through the proxy's pass-through list.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    Subscribed,
    Unsubscribed,
    SubscriptionOverride,
    UnsubscriptionOverride,
    Pending,
    Implicit,
}

impl SubscriptionState {
    pub fn is_subscribed(&self) -> bool {
        matches!(self, Self::Subscribed | Self::SubscriptionOverride | Self::Implicit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionAction {
    Subscribe,
    Unsubscribe,
    RequestSubscription,
    CancelRequest,
    ApproveRequest,
    DenyRequest,
    AddSubscriptionOverride,
    AddUnsubscriptionOverride,
    RemoveOverride,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    #[error("action {action:?} is not allowed from state {from:?}")]
    InvalidTransition { from: Option<SubscriptionState>, action: SubscriptionAction },
    #[error("already in state {0:?}")]
    Unchanged(SubscriptionState),
}

#[derive(Debug, Default)]
pub struct SubscriptionManager;

impl SubscriptionManager {
    pub fn new() -> Self { Self }

    /// Target state of `action` applied to `from` (`None` = no relation yet).
    pub fn apply(
        &self,
        from: Option<SubscriptionState>,
        action: SubscriptionAction,
    ) -> Result<SubscriptionState, SubscriptionError> {
        use SubscriptionAction as A;
        use SubscriptionState as S;

        let target = match (from, action) {
            (None | Some(S::Unsubscribed | S::Implicit), A::Subscribe) => S::Subscribed,
            (Some(S::Pending), A::ApproveRequest) => S::Subscribed,
            (Some(S::Subscribed | S::Implicit), A::Unsubscribe) => S::Unsubscribed,
            (None | Some(S::Unsubscribed), A::RequestSubscription) => S::Pending,
            (Some(S::Pending), A::CancelRequest | A::DenyRequest) => S::Unsubscribed,
            (Some(S::SubscriptionOverride | S::UnsubscriptionOverride), A::RemoveOverride) => S::Unsubscribed,
            (Some(S::Pending), A::AddSubscriptionOverride | A::AddUnsubscriptionOverride) => {
                return Err(SubscriptionError::InvalidTransition { from, action });
            }
            (_, A::AddSubscriptionOverride) => S::SubscriptionOverride,
            (_, A::AddUnsubscriptionOverride) => S::UnsubscriptionOverride,
            (Some(s), A::Subscribe) if s.is_subscribed() => return Err(SubscriptionError::Unchanged(s)),
            _ => return Err(SubscriptionError::InvalidTransition { from, action }),
        };
        if from == Some(target) {
            return Err(SubscriptionError::Unchanged(target));
        }
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SubscriptionAction as A;
    use SubscriptionState as S;

    #[test]
    fn request_then_approve() {
        let sm = SubscriptionManager::new();
        let pending = sm.apply(None, A::RequestSubscription).unwrap();
        assert_eq!(pending, S::Pending);
        assert_eq!(sm.apply(Some(pending), A::ApproveRequest).unwrap(), S::Subscribed);
        assert_eq!(sm.apply(Some(pending), A::DenyRequest).unwrap(), S::Unsubscribed);
    }

    #[test]
    fn overrides_trump_plain_states() {
        let sm = SubscriptionManager::new();
        assert_eq!(sm.apply(Some(S::Subscribed), A::AddUnsubscriptionOverride).unwrap(), S::UnsubscriptionOverride);
        assert_eq!(sm.apply(Some(S::UnsubscriptionOverride), A::RemoveOverride).unwrap(), S::Unsubscribed);
        assert!(sm.apply(Some(S::UnsubscriptionOverride), A::Subscribe).is_err());
        assert!(sm.apply(Some(S::Pending), A::AddSubscriptionOverride).is_err());
    }

    #[test]
    fn repeated_actions_are_unchanged() {
        let sm = SubscriptionManager::new();
        assert_eq!(sm.apply(Some(S::Subscribed), A::Subscribe), Err(SubscriptionError::Unchanged(S::Subscribed)));
        assert_eq!(
            sm.apply(Some(S::SubscriptionOverride), A::AddSubscriptionOverride),
            Err(SubscriptionError::Unchanged(S::SubscriptionOverride))
        );
    }

    #[test]
    fn unsubscribe_without_subscription_is_invalid() {
        let sm = SubscriptionManager::new();
        assert!(matches!(sm.apply(None, A::Unsubscribe), Err(SubscriptionError::InvalidTransition { .. })));
    }
}
