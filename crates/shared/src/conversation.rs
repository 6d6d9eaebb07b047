use std::sync::Arc;

use tracing::error;

use crate::dispatch::{DispatchEngine, DispatchError, DispatchRequest};
use crate::intent::{self, RideSlots};
use crate::llm::prompts::{RIDE_ASSISTANT_GREETING, RIDE_ASSISTANT_SYSTEM_PROMPT};
use crate::llm::{Completer, CompleterError};
use crate::models::{ChatMessage, RideClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationPhase {
    Greeting,
    Collecting,
    Confirming,
    /// Transient while the booking call is in flight; a finished turn always
    /// reports `Done` or `Errored` instead.
    Dispatching,
    Done,
    Errored,
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub response: String,
    pub history: Vec<ChatMessage>,
    pub phase: ConversationPhase,
}

/// Drives a chat session through slot-filling until a booking can be
/// dispatched. Sessions are stateless across calls: the full history comes
/// in with every turn and goes back out with exactly one user and one
/// assistant entry appended.
#[derive(Clone)]
pub struct ConversationManager {
    completer: Arc<dyn Completer>,
    engine: DispatchEngine,
}

impl ConversationManager {
    pub fn new(completer: Arc<dyn Completer>, engine: DispatchEngine) -> Self {
        Self { completer, engine }
    }

    pub fn greeting() -> &'static str {
        RIDE_ASSISTANT_GREETING
    }

    pub async fn take_turn(
        &self,
        history: Vec<ChatMessage>,
        message: &str,
    ) -> Result<TurnOutcome, CompleterError> {
        let starting_fresh = history.is_empty();
        let mut history = history;
        history.push(ChatMessage::user(message));

        let slots = intent::extract_slots(&history);

        if message.trim().is_empty() {
            return Ok(finish_turn(
                history,
                RIDE_ASSISTANT_GREETING.to_string(),
                ConversationPhase::Greeting,
            ));
        }

        // A confirmed proposal goes straight to dispatch; no model round-trip.
        if slots.route_complete() && intent::is_booking_affirmation(message) {
            let (response, phase) = self.dispatch_from_slots(&slots).await;
            return Ok(finish_turn(history, response, phase));
        }

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(RIDE_ASSISTANT_SYSTEM_PROMPT));
        messages.extend(history.iter().cloned());
        let response = self.completer.complete(&messages).await?;

        let phase = if slots.route_complete() {
            ConversationPhase::Confirming
        } else if starting_fresh {
            ConversationPhase::Greeting
        } else {
            ConversationPhase::Collecting
        };

        Ok(finish_turn(history, response, phase))
    }

    async fn dispatch_from_slots(&self, slots: &RideSlots) -> (String, ConversationPhase) {
        let ride_type = slots.ride_class.unwrap_or(RideClass::Economy);
        let request = DispatchRequest {
            pickup_location: slots.pickup.clone().unwrap_or_default(),
            dropoff_location: slots.dropoff.clone().unwrap_or_default(),
            ride_type,
            user_phone: None,
        };

        match self.engine.dispatch(request).await {
            Ok(outcome) => {
                let response = format!(
                    "{}\nVehicle: {}\nFare estimate: {}\nTrack your ride live!",
                    outcome.message, outcome.driver.vehicle_number, outcome.booking.estimated_fare
                );
                (response, ConversationPhase::Done)
            }
            Err(DispatchError::NoDriverAvailable) => (
                format!(
                    "😔 Sorry, there are no {} drivers available right now. \
                     Please try again in a few minutes or pick another ride class.",
                    ride_type.as_str()
                ),
                ConversationPhase::Errored,
            ),
            Err(DispatchError::InvalidRequest) => (
                "😔 Sorry, I couldn't make out both locations. \
                 Could you tell me the pickup and dropoff again?"
                    .to_string(),
                ConversationPhase::Errored,
            ),
            Err(DispatchError::Store(err)) => {
                error!("chat dispatch failed against the store: {err}");
                (
                    "😔 Sorry, something went wrong while booking. Please try again."
                        .to_string(),
                    ConversationPhase::Errored,
                )
            }
        }
    }
}

fn finish_turn(
    mut history: Vec<ChatMessage>,
    response: String,
    phase: ConversationPhase,
) -> TurnOutcome {
    history.push(ChatMessage::assistant(response.clone()));
    TurnOutcome {
        response,
        history,
        phase,
    }
}
