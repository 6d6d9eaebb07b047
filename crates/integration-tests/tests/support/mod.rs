#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_server::http::{AppState, build_router};
use chrono::Utc;
use shared::conversation::ConversationManager;
use shared::dispatch::DispatchEngine;
use shared::llm::{Completer, CompleterError, CompleterFuture};
use shared::models::{ChatMessage, Driver, DriverStatus, RideClass};
use shared::store::MemoryRideStore;
use uuid::Uuid;

pub fn build_test_router(
    store: Arc<MemoryRideStore>,
    completer: Arc<ScriptedCompleter>,
) -> axum::Router {
    let dispatcher = DispatchEngine::new(store.clone());
    let conversation = ConversationManager::new(completer, dispatcher.clone());

    build_router(AppState {
        store,
        dispatcher,
        conversation,
        admin_updates_wait: Duration::from_millis(50),
    })
}

pub fn driver(name: &str, vehicle_number: &str, ride_type: RideClass, rating: f64) -> Driver {
    Driver {
        id: Uuid::new_v4(),
        name: name.to_string(),
        vehicle_number: vehicle_number.to_string(),
        ride_type,
        current_location: "Indiranagar".to_string(),
        phone: "+91 98450 11223".to_string(),
        rating,
        status: DriverStatus::Available,
        created_at: Utc::now(),
    }
}

#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    RateLimited,
    QuotaExceeded,
}

/// Completer fake with a queue of scripted replies; runs out loudly.
pub struct ScriptedCompleter {
    replies: Mutex<VecDeque<ScriptedReply>>,
    calls: Mutex<usize>,
}

impl ScriptedCompleter {
    pub fn with_replies(replies: Vec<ScriptedReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::from(replies)),
            calls: Mutex::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().expect("calls lock")
    }
}

impl Completer for ScriptedCompleter {
    fn complete<'a>(&'a self, _messages: &'a [ChatMessage]) -> CompleterFuture<'a> {
        Box::pin(async move {
            *self.calls.lock().expect("calls lock") += 1;
            let reply = self
                .replies
                .lock()
                .expect("replies lock")
                .pop_front()
                .expect("scripted completer ran out of replies");

            match reply {
                ScriptedReply::Text(text) => Ok(text),
                ScriptedReply::RateLimited => Err(CompleterError::RateLimited),
                ScriptedReply::QuotaExceeded => Err(CompleterError::QuotaExceeded),
            }
        })
    }
}
