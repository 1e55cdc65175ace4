//! Explicit status transition tables.
//!
//! Order status decisions are made by exhaustive matching over (current status, input), never by
//! comparing enum ordinals: cancellation and failure states are not "later" than `Completed` in
//! any meaningful sense, so a numeric inequality over a flat status list cannot express
//! non-regression correctly.

use crate::{
    db_types::{OrderStatus, PaymentStatus},
    events::PaymentEventKind,
};

/// The transaction status implied by a payment event. Applied last-write-wins; the gateway does
/// not emit contradictory terminal events for the same intent.
pub fn transaction_status_for(kind: PaymentEventKind) -> PaymentStatus {
    match kind {
        PaymentEventKind::Succeeded => PaymentStatus::Succeeded,
        PaymentEventKind::Failed => PaymentStatus::Failed,
        PaymentEventKind::Processing => PaymentStatus::Processing,
        PaymentEventKind::Refunded => PaymentStatus::Refunded,
    }
}

/// The order transition implied by a payment event, or `None` when the event must not move the
/// order.
///
/// Webhook deliveries are at-least-once and unordered, so this table prefers terminal outcomes
/// over non-terminal ones: a `processing` event arriving after `succeeded` is a no-op, and a
/// replayed event always maps to `None` the second time. `Completed` and the cancellation
/// branches never regress on payment events; refunds only touch the transaction record.
pub fn order_status_after_payment_event(current: OrderStatus, kind: PaymentEventKind) -> Option<OrderStatus> {
    use OrderStatus::*;
    match (current, kind) {
        (PendingPayment | PendingConfirmation | PaymentProcessing | PaymentFailed, PaymentEventKind::Succeeded) => {
            Some(Confirmed)
        },
        (Confirmed | InProgress | Completed | CancelledByClient | CancelledByProvider, PaymentEventKind::Succeeded) => {
            None
        },

        (PendingPayment | PendingConfirmation | PaymentProcessing, PaymentEventKind::Failed) => Some(PaymentFailed),
        (
            Confirmed | InProgress | Completed | CancelledByClient | CancelledByProvider | PaymentFailed,
            PaymentEventKind::Failed,
        ) => None,

        (PendingPayment | PendingConfirmation, PaymentEventKind::Processing) => Some(PaymentProcessing),
        (
            PaymentProcessing | Confirmed | InProgress | Completed | CancelledByClient | CancelledByProvider
            | PaymentFailed,
            PaymentEventKind::Processing,
        ) => None,

        (_, PaymentEventKind::Refunded) => None,
    }
}

/// Outcome of a requested manual (provider- or admin-driven) status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualTransition {
    Allowed(OrderStatus),
    /// `Completed` was requested before the payment reached `Confirmed`.
    PaymentNotConfirmed,
    Forbidden,
}

/// Manual changes move forward along the happy path or into a cancellation branch; nothing else.
/// Payment-driven states (`PendingConfirmation`, `PaymentProcessing`, `PaymentFailed`,
/// `Confirmed`) are only ever entered by the payment flow itself.
pub fn manual_transition(current: OrderStatus, requested: OrderStatus) -> ManualTransition {
    use OrderStatus::*;
    match (current, requested) {
        (Confirmed, InProgress) => ManualTransition::Allowed(InProgress),
        (Confirmed | InProgress, Completed) => ManualTransition::Allowed(Completed),
        (PendingPayment | PendingConfirmation | PaymentProcessing | PaymentFailed, Completed) => {
            ManualTransition::PaymentNotConfirmed
        },
        (current, CancelledByClient | CancelledByProvider) if is_cancellable(current) => {
            ManualTransition::Allowed(requested)
        },
        (_, _) => ManualTransition::Forbidden,
    }
}

/// Direct cancellation is only possible before the payment is confirmed. From `Confirmed`
/// onwards, cancellation must go through a refund, which is a separate flow.
pub fn is_cancellable(current: OrderStatus) -> bool {
    matches!(
        current,
        OrderStatus::PendingPayment | OrderStatus::PendingConfirmation | OrderStatus::PaymentProcessing
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use OrderStatus::*;

    const ALL_STATUSES: [OrderStatus; 9] = [
        PendingPayment,
        PendingConfirmation,
        PaymentProcessing,
        Confirmed,
        InProgress,
        Completed,
        CancelledByClient,
        CancelledByProvider,
        PaymentFailed,
    ];

    const ALL_KINDS: [PaymentEventKind; 4] = [
        PaymentEventKind::Succeeded,
        PaymentEventKind::Failed,
        PaymentEventKind::Processing,
        PaymentEventKind::Refunded,
    ];

    #[test]
    fn processing_never_regresses_a_confirmed_order() {
        for current in [Confirmed, InProgress, Completed] {
            assert_eq!(order_status_after_payment_event(current, PaymentEventKind::Processing), None);
        }
    }

    #[test]
    fn completed_orders_never_move_on_payment_events() {
        for kind in ALL_KINDS {
            assert_eq!(order_status_after_payment_event(Completed, kind), None);
        }
    }

    #[test]
    fn cancelled_orders_never_move_on_payment_events() {
        for current in [CancelledByClient, CancelledByProvider] {
            for kind in ALL_KINDS {
                assert_eq!(order_status_after_payment_event(current, kind), None);
            }
        }
    }

    #[test]
    fn event_replay_is_idempotent() {
        // Applying the transition implied by an event, then asking again from the resulting
        // state, must be a no-op for every (state, event) pair.
        for current in ALL_STATUSES {
            for kind in ALL_KINDS {
                if let Some(next) = order_status_after_payment_event(current, kind) {
                    assert_eq!(order_status_after_payment_event(next, kind), None, "{current} + {kind:?} replays");
                }
            }
        }
    }

    #[test]
    fn succeeded_confirms_from_any_pre_confirmation_state() {
        for current in [PendingPayment, PendingConfirmation, PaymentProcessing, PaymentFailed] {
            assert_eq!(order_status_after_payment_event(current, PaymentEventKind::Succeeded), Some(Confirmed));
        }
    }

    #[test]
    fn completed_requires_confirmed_payment() {
        for current in [PendingPayment, PendingConfirmation, PaymentProcessing, PaymentFailed] {
            assert_eq!(manual_transition(current, Completed), ManualTransition::PaymentNotConfirmed);
        }
        assert_eq!(manual_transition(Confirmed, Completed), ManualTransition::Allowed(Completed));
        assert_eq!(manual_transition(InProgress, Completed), ManualTransition::Allowed(Completed));
    }

    #[test]
    fn manual_changes_cannot_rewind_or_skip() {
        assert_eq!(manual_transition(Completed, InProgress), ManualTransition::Forbidden);
        assert_eq!(manual_transition(InProgress, Confirmed), ManualTransition::Forbidden);
        assert_eq!(manual_transition(PendingPayment, Confirmed), ManualTransition::Forbidden);
        assert_eq!(manual_transition(Completed, Completed), ManualTransition::Forbidden);
    }

    #[test]
    fn cancellation_is_closed_after_confirmation() {
        for current in [PendingPayment, PendingConfirmation, PaymentProcessing] {
            assert!(is_cancellable(current));
        }
        for current in [Confirmed, InProgress, Completed, CancelledByClient, CancelledByProvider, PaymentFailed] {
            assert!(!is_cancellable(current));
        }
    }
}
